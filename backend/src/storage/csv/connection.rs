use anyhow::{bail, Result};
use shared::RecordKind;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

/// Header of `users.csv`
pub const USERS_HEADER: &str = "id,display_name,current_balance\n";
/// Header of every per-user record file
pub const RECORDS_HEADER: &str = "id,date,amount\n";

/// CsvConnection resolves file paths inside the data directory and makes
/// sure files exist with their headers before they are read.
///
/// Layout:
/// ```text
/// <base>/users.csv
/// <base>/<user>/income.csv
/// <base>/<user>/spending.csv
/// ```
#[derive(Debug, Clone)]
pub struct CsvConnection {
    base_directory: PathBuf,
}

impl CsvConnection {
    /// Open a data directory, creating it if needed
    pub fn new<P: AsRef<Path>>(base_directory: P) -> Result<Self> {
        let base_path = base_directory.as_ref().to_path_buf();
        if !base_path.exists() {
            info!("Creating data directory {}", base_path.display());
            fs::create_dir_all(&base_path)?;
        }
        Ok(Self {
            base_directory: base_path,
        })
    }

    pub fn base_directory(&self) -> &Path {
        &self.base_directory
    }

    pub fn users_file_path(&self) -> PathBuf {
        self.base_directory.join("users.csv")
    }

    /// Directory holding one user's record files
    pub fn user_directory(&self, user_id: &str) -> Result<PathBuf> {
        Ok(self.base_directory.join(Self::safe_directory_name(user_id)?))
    }

    pub fn records_file_path(&self, user_id: &str, kind: RecordKind) -> Result<PathBuf> {
        Ok(self
            .user_directory(user_id)?
            .join(format!("{}.csv", kind.collection_name())))
    }

    pub fn ensure_users_file_exists(&self) -> Result<()> {
        let path = self.users_file_path();
        if !path.exists() {
            fs::write(&path, USERS_HEADER)?;
        }
        Ok(())
    }

    pub fn ensure_records_file_exists(&self, user_id: &str, kind: RecordKind) -> Result<()> {
        let user_dir = self.user_directory(user_id)?;
        if !user_dir.exists() {
            fs::create_dir_all(&user_dir)?;
        }
        let path = self.records_file_path(user_id, kind)?;
        if !path.exists() {
            fs::write(&path, RECORDS_HEADER)?;
        }
        Ok(())
    }

    /// Map a user ID onto a directory name that cannot escape the data directory
    pub fn safe_directory_name(user_id: &str) -> Result<String> {
        let name: String = user_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        if name.trim_matches('_').is_empty() {
            bail!("user id '{}' cannot be used as a directory name", user_id);
        }
        Ok(name)
    }
}
