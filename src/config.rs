use std::path::{Path, PathBuf};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{Result, ShortcutError};

/// Environment variable naming a TOML file for the process-wide entry points.
pub const CONFIG_ENV_VAR: &str = "DESKTOP_SHORTCUT_INSTALLER_CONFIG";

pub const DEFAULT_SETTINGS_KEY: &str = "DesktopShortcutCreated";
pub const DEFAULT_MANIFEST_FILE: &str = "AppxManifest.xml";
pub const DEFAULT_APPLICATION_ID: &str = "App";

/// Installer configuration. Every key is optional in the TOML file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct InstallerConfig {
    /// Whether `initialize()` schedules provisioning at all.
    pub auto_init: bool,
    /// Key of the completion flag in the settings store.
    pub settings_key: String,
    /// Manifest file name, relative to the package install root.
    pub manifest_file: String,
    /// Used when the manifest's `Application` element carries no `Id`.
    pub default_application_id: String,
    /// Overrides the user's desktop directory.
    pub desktop_dir: Option<PathBuf>,
    /// Keeps the completion flag in this TOML file instead of the
    /// package's local settings.
    pub settings_file: Option<PathBuf>,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for InstallerConfig {
    fn default() -> Self {
        Self {
            auto_init: true,
            settings_key: DEFAULT_SETTINGS_KEY.to_string(),
            manifest_file: DEFAULT_MANIFEST_FILE.to_string(),
            default_application_id: DEFAULT_APPLICATION_ID.to_string(),
            desktop_dir: None,
            settings_file: None,
            log_level: "info".to_string(),
            log_dir: None,
        }
    }
}

impl InstallerConfig {
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| ShortcutError::Config(e.to_string()))
    }

    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ShortcutError::io("read config file", path, e))?;
        Self::from_toml_str(&content)
    }

    /// Loads the file named by [`CONFIG_ENV_VAR`], falling back to defaults
    /// when the variable is unset or the file cannot be used.
    pub fn load_default() -> Self {
        let Some(path) = std::env::var_os(CONFIG_ENV_VAR) else {
            return Self::default();
        };
        let path = PathBuf::from(path);
        match Self::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Ignoring installer config {}: {}", path.display(), e);
                Self::default()
            }
        }
    }

    /// Default directory for the rolling log files.
    pub fn resolved_log_dir(&self) -> Option<PathBuf> {
        self.log_dir
            .clone()
            .or_else(|| dirs::data_local_dir().map(|p| p.join("desktop-shortcut-installer").join("logs")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        let config = InstallerConfig::from_toml_str("").unwrap();
        assert_eq!(config, InstallerConfig::default());
        assert!(config.auto_init);
        assert_eq!(config.settings_key, "DesktopShortcutCreated");
        assert_eq!(config.manifest_file, "AppxManifest.xml");
        assert_eq!(config.default_application_id, "App");
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let config = InstallerConfig::from_toml_str(
            "auto_init = false\ndesktop_dir = \"/tmp/desk\"\nlog_level = \"debug\"\n",
        )
        .unwrap();
        assert!(!config.auto_init);
        assert_eq!(config.desktop_dir, Some(PathBuf::from("/tmp/desk")));
        assert_eq!(config.log_level, "debug");
        assert_eq!(config.settings_key, DEFAULT_SETTINGS_KEY);
    }

    #[test]
    fn invalid_toml_is_a_config_error() {
        let err = InstallerConfig::from_toml_str("auto_init = \"sometimes\"").unwrap_err();
        assert!(matches!(err, ShortcutError::Config(_)));
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("installer.toml");
        std::fs::write(&path, "settings_key = \"ShortcutDone\"\n").unwrap();

        let config = InstallerConfig::load(&path).unwrap();
        assert_eq!(config.settings_key, "ShortcutDone");

        let missing = InstallerConfig::load(&dir.path().join("missing.toml")).unwrap_err();
        assert!(matches!(missing, ShortcutError::Io { .. }));
    }
}
