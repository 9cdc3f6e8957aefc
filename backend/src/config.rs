//! # Configuration
//!
//! Dashboard settings loaded from YAML. Every field has a default so an
//! empty or missing file is valid. Resolution order for the data directory:
//! CLI flag, then `EASY_BUDGET_DATA_DIR`, then the file, then
//! `<Documents>/Easy Budget`.

use anyhow::{anyhow, Context, Result};
use chrono::{FixedOffset, Offset};
use serde::{Deserialize, Serialize};
use shared::UserProfile;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

use crate::domain::DEFAULT_WINDOW_DAYS;

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "EASY_BUDGET_DATA_DIR";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UserConfig {
    pub id: String,
    pub display_name: String,
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            id: "local".to_string(),
            display_name: "Friend".to_string(),
        }
    }
}

impl From<&UserConfig> for UserProfile {
    fn from(user: &UserConfig) -> Self {
        UserProfile {
            id: user.id.clone(),
            display_name: user.display_name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardConfig {
    pub data_directory: Option<PathBuf>,
    /// Trailing days shown per chart
    pub window_days: i64,
    /// Offset used for "today" and month boundaries; local offset when unset
    pub utc_offset_minutes: Option<i32>,
    /// Where SVG charts are written; `<data_directory>/charts` when unset
    pub chart_output_directory: Option<PathBuf>,
    /// How often `watch` re-reads the data directory
    pub refresh_interval_secs: u64,
    pub user: UserConfig,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            data_directory: None,
            window_days: DEFAULT_WINDOW_DAYS,
            utc_offset_minutes: None,
            chart_output_directory: None,
            refresh_interval_secs: 5,
            user: UserConfig::default(),
        }
    }
}

impl DashboardConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        if yaml.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(yaml)?)
    }

    /// Load from `path`, or from the default config file if it exists, then
    /// apply environment overrides
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = path.map(Path::to_path_buf).or_else(|| {
            Self::default_config_path().filter(|candidate| candidate.exists())
        });

        let mut config = match path {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                let yaml = fs::read_to_string(&path)
                    .with_context(|| format!("reading config {}", path.display()))?;
                Self::from_yaml_str(&yaml).with_context(|| format!("parsing config {}", path.display()))?
            }
            None => {
                debug!("No configuration file, using defaults");
                Self::default()
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// `<config dir>/easy-budget/config.yaml`
    pub fn default_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("easy-budget").join("config.yaml"))
    }

    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|value| !value.trim().is_empty()) {
            debug!("{} overrides data directory: {}", DATA_DIR_ENV, dir);
            self.data_directory = Some(PathBuf::from(dir));
        }
    }

    pub fn data_directory(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.data_directory {
            return Ok(dir.clone());
        }
        dirs::document_dir()
            .or_else(dirs::home_dir)
            .map(|dir| dir.join("Easy Budget"))
            .ok_or_else(|| anyhow!("could not determine a data directory; set {}", DATA_DIR_ENV))
    }

    pub fn chart_output_directory(&self) -> Result<PathBuf> {
        match &self.chart_output_directory {
            Some(dir) => Ok(dir.clone()),
            None => Ok(self.data_directory()?.join("charts")),
        }
    }

    pub fn offset(&self) -> Result<FixedOffset> {
        match self.utc_offset_minutes {
            Some(minutes) => FixedOffset::east_opt(minutes * 60)
                .ok_or_else(|| anyhow!("utc_offset_minutes {} is out of range", minutes)),
            None => Ok(chrono::Local::now().offset().fix()),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs.max(1))
    }

    pub fn profile(&self) -> UserProfile {
        UserProfile::from(&self.user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_yaml_gives_defaults() {
        let config = DashboardConfig::from_yaml_str("").unwrap();
        assert_eq!(config, DashboardConfig::default());
        assert_eq!(config.window_days, 30);
        assert_eq!(config.refresh_interval(), Duration::from_secs(5));
    }

    #[test]
    fn test_partial_yaml() {
        let config = DashboardConfig::from_yaml_str(
            "data_directory: /srv/budget\nutc_offset_minutes: -300\nuser:\n  id: g1\n  display_name: Grant\n",
        )
        .unwrap();
        assert_eq!(config.data_directory().unwrap(), PathBuf::from("/srv/budget"));
        assert_eq!(config.chart_output_directory().unwrap(), PathBuf::from("/srv/budget/charts"));
        assert_eq!(config.offset().unwrap().local_minus_utc(), -300 * 60);
        assert_eq!(config.profile().display_name, "Grant");
        assert_eq!(config.window_days, 30);
    }

    #[test]
    fn test_rejects_unknown_types() {
        assert!(DashboardConfig::from_yaml_str("window_days: many").is_err());
    }

    #[test]
    fn test_env_overrides_data_directory() {
        let mut config = DashboardConfig::default();
        config.apply_env(|key| (key == DATA_DIR_ENV).then(|| "/env/dir".to_string()));
        assert_eq!(config.data_directory, Some(PathBuf::from("/env/dir")));

        config.apply_env(|_| Some("  ".to_string()));
        assert_eq!(config.data_directory, Some(PathBuf::from("/env/dir")));
    }

    #[test]
    fn test_out_of_range_offset() {
        let config = DashboardConfig {
            utc_offset_minutes: Some(24 * 60),
            ..DashboardConfig::default()
        };
        assert!(config.offset().is_err());
    }

    #[test]
    fn test_load_from_file() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("config.yaml");
        fs::write(&path, "window_days: 14\nrefresh_interval_secs: 0\n").unwrap();

        let config = DashboardConfig::load(Some(&path)).unwrap();
        assert_eq!(config.window_days, 14);
        assert_eq!(config.refresh_interval(), Duration::from_secs(1));
    }
}
