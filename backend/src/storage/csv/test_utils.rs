//! Test fixtures for the CSV data directory.
//!
//! The temp directory lives as long as the environment, so test data is
//! removed even when a test panics.

use anyhow::Result;
use shared::UserProfile;
use std::path::PathBuf;
use tempfile::TempDir;

use super::connection::CsvConnection;

pub struct TestEnvironment {
    _temp_dir: TempDir,
    pub connection: CsvConnection,
    pub base_path: PathBuf,
    pub profile: UserProfile,
}

impl TestEnvironment {
    pub fn new() -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let base_path = temp_dir.path().to_path_buf();
        let connection = CsvConnection::new(&base_path)?;

        Ok(TestEnvironment {
            _temp_dir: temp_dir,
            connection,
            base_path,
            profile: UserProfile {
                id: "u1".to_string(),
                display_name: "Grant".to_string(),
            },
        })
    }
}
