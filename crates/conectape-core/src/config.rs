//! Application configuration management.
//!
//! Holds the Firebase project coordinates, the last phone number used to sign
//! in and the listener poll interval. Stored at
//! `~/.config/conectape/config.json`; `CONECTAPE_API_KEY` and
//! `CONECTAPE_PROJECT_ID` override the file.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::backend::firebase::DEFAULT_POLL_INTERVAL_SECS;
use crate::backend::FirebaseSettings;

/// Application name used for config/cache directory paths
const APP_NAME: &str = "conectape";

/// Config file name
const CONFIG_FILE: &str = "config.json";

const API_KEY_ENV: &str = "CONECTAPE_API_KEY";
const PROJECT_ID_ENV: &str = "CONECTAPE_PROJECT_ID";

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub last_phone: Option<String>,
    pub poll_interval_secs: Option<u64>,
}

impl Config {
    pub fn load() -> Result<Self> {
        let path = Self::config_path()?;
        let config = if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            serde_json::from_str(&contents)?
        } else {
            Self::default()
        };
        Ok(config.with_env_overrides(|key| std::env::var(key).ok()))
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::config_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = serde_json::to_string_pretty(self)?;
        std::fs::write(path, contents)?;
        Ok(())
    }

    fn config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find config directory"))?;
        Ok(config_dir.join(APP_NAME).join(CONFIG_FILE))
    }

    fn with_env_overrides(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        if let Some(key) = lookup(API_KEY_ENV).filter(|v| !v.trim().is_empty()) {
            self.api_key = Some(key);
        }
        if let Some(project) = lookup(PROJECT_ID_ENV).filter(|v| !v.trim().is_empty()) {
            self.project_id = Some(project);
        }
        self
    }

    /// Session file and log directory.
    pub fn cache_dir(&self) -> Result<PathBuf> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find cache directory"))?;
        Ok(cache_dir.join(APP_NAME))
    }

    /// Directory for user-visible files such as `ip.txt`.
    pub fn data_dir(&self) -> Result<PathBuf> {
        let data_dir = dirs::data_dir()
            .ok_or_else(|| anyhow::anyhow!("Could not find data directory"))?;
        Ok(data_dir.join(APP_NAME))
    }

    pub fn poll_interval(&self) -> Duration {
        let secs = self
            .poll_interval_secs
            .filter(|s| *s > 0)
            .unwrap_or(DEFAULT_POLL_INTERVAL_SECS);
        Duration::from_secs(secs)
    }

    /// Backend settings, or `None` until both the API key and project id are known.
    pub fn firebase_settings(&self) -> Result<Option<FirebaseSettings>> {
        let (Some(api_key), Some(project_id)) = (&self.api_key, &self.project_id) else {
            return Ok(None);
        };
        Ok(Some(FirebaseSettings {
            api_key: api_key.clone(),
            project_id: project_id.clone(),
            poll_interval: self.poll_interval(),
            cache_dir: self.cache_dir()?,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_env_overrides_file_values() {
        let config = Config {
            api_key: Some("from-file".into()),
            project_id: None,
            ..Default::default()
        };
        let config = config.with_env_overrides(|key| match key {
            API_KEY_ENV => Some("from-env".into()),
            PROJECT_ID_ENV => Some("demo-project".into()),
            _ => None,
        });
        assert_eq!(config.api_key.as_deref(), Some("from-env"));
        assert_eq!(config.project_id.as_deref(), Some("demo-project"));
    }

    #[test]
    fn test_blank_env_is_ignored() {
        let config = Config {
            api_key: Some("from-file".into()),
            ..Default::default()
        };
        let config = config.with_env_overrides(|_| Some("  ".into()));
        assert_eq!(config.api_key.as_deref(), Some("from-file"));
        assert!(config.project_id.is_none());
    }

    #[test]
    fn test_poll_interval_defaults() {
        let mut config = Config::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS));
        config.poll_interval_secs = Some(0);
        assert_eq!(config.poll_interval(), Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS));
        config.poll_interval_secs = Some(12);
        assert_eq!(config.poll_interval(), Duration::from_secs(12));
    }

    #[test]
    fn test_firebase_settings_need_key_and_project() {
        let config = Config {
            api_key: Some("key".into()),
            ..Default::default()
        };
        assert!(config.firebase_settings().unwrap().is_none());
    }

    #[test]
    fn test_missing_fields_deserialize() {
        let config: Config = serde_json::from_str(r#"{"last_phone": "987654321"}"#).unwrap();
        assert_eq!(config.last_phone.as_deref(), Some("987654321"));
        assert!(config.api_key.is_none());
    }
}
