//! Controller configuration.
//!
//! Read from a JSON file with camelCase keys. Missing keys fall back to defaults, and a
//! missing or broken file falls back to [`ControllerConfig::default`].

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_DIR_NAME: &str = "vault-batch";
const CONFIG_FILE_NAME: &str = "config.json";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ControllerConfig {
    /// How long 100% stays on screen before the report replaces it (default: 600)
    #[serde(default = "default_done_display_delay")]
    pub done_display_delay_ms: u64,
    /// Extension (without the dot) of files the backend produces when encrypting
    #[serde(default = "default_encrypted_extension")]
    pub encrypted_extension: String,
    /// Minimum master password length for vault creation and password changes
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,
    /// Buffer size of the notice broadcast channel
    #[serde(default = "default_notice_capacity")]
    pub notice_capacity: usize,
}

impl ControllerConfig {
    pub fn done_display_delay(&self) -> Duration {
        Duration::from_millis(self.done_display_delay_ms)
    }

    /// Whether `path` carries the encrypted extension.
    pub fn is_encrypted_path(&self, path: &str) -> bool {
        path.strip_suffix(self.encrypted_extension.as_str())
            .is_some_and(|stem| stem.ends_with('.'))
    }
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            done_display_delay_ms: default_done_display_delay(),
            encrypted_extension: default_encrypted_extension(),
            min_password_length: default_min_password_length(),
            notice_capacity: default_notice_capacity(),
        }
    }
}

fn default_done_display_delay() -> u64 {
    600
}

fn default_encrypted_extension() -> String {
    "enc".to_string()
}

fn default_min_password_length() -> usize {
    8
}

fn default_notice_capacity() -> usize {
    64
}

/// `<platform config dir>/vault-batch/config.json`, if the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
}

/// Loads the config at `path`. Returns defaults if the file doesn't exist or can't be parsed.
pub fn load_config(path: &Path) -> ControllerConfig {
    let contents = match fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) => {
            log::debug!("load_config: no config at {:?} ({}), using defaults", path, e);
            return ControllerConfig::default();
        }
    };

    match serde_json::from_str::<ControllerConfig>(&contents) {
        Ok(config) if config.notice_capacity == 0 => {
            log::warn!("load_config: noticeCapacity must be positive, using {}", default_notice_capacity());
            ControllerConfig {
                notice_capacity: default_notice_capacity(),
                ..config
            }
        }
        Ok(config) => config,
        Err(e) => {
            log::warn!("load_config: can't parse {:?}: {}, using defaults", path, e);
            ControllerConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ControllerConfig::default();
        assert_eq!(config.done_display_delay_ms, 600);
        assert_eq!(config.encrypted_extension, "enc");
        assert_eq!(config.min_password_length, 8);
        assert_eq!(config.done_display_delay(), Duration::from_millis(600));
    }

    #[test]
    fn test_partial_config_deserialization() {
        let json = r#"{"doneDisplayDelayMs": 0, "encryptedExtension": "vault"}"#;
        let config: ControllerConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.done_display_delay_ms, 0);
        assert_eq!(config.encrypted_extension, "vault");
        assert_eq!(config.min_password_length, 8);
    }

    #[test]
    fn test_encrypted_path_matching() {
        let config = ControllerConfig::default();
        assert!(config.is_encrypted_path("/data/report.pdf.enc"));
        assert!(!config.is_encrypted_path("/data/report.pdf"));
        assert!(!config.is_encrypted_path("/data/frozen"));
    }

    #[test]
    fn test_load_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = load_config(&dir.path().join("nope.json"));
        assert_eq!(config, ControllerConfig::default());
    }

    #[test]
    fn test_load_broken_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, "{ not json").unwrap();
        assert_eq!(load_config(&path), ControllerConfig::default());
    }

    #[test]
    fn test_load_reads_values_and_fixes_zero_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        fs::write(&path, r#"{"minPasswordLength": 12, "noticeCapacity": 0}"#).unwrap();

        let config = load_config(&path);
        assert_eq!(config.min_password_length, 12);
        assert_eq!(config.notice_capacity, 64);
    }

    #[test]
    fn test_default_path_ends_with_app_dir() {
        if let Some(path) = default_config_path() {
            assert!(path.ends_with("vault-batch/config.json"));
        }
    }
}
