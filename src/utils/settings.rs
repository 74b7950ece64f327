use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

#[cfg(not(windows))]
use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::InstallerConfig;
use crate::error::{Result, ShortcutError};

/// Application-scoped key/value settings, reduced to what a flag needs.
pub trait SettingsStore: Send + Sync {
    fn contains(&self, key: &str) -> Result<bool>;
    fn set_flag(&self, key: &str) -> Result<()>;
    /// Removing a key that is not there is not an error.
    fn remove(&self, key: &str) -> Result<()>;
}

/// The persisted "shortcut already created" marker.
#[derive(Clone)]
pub struct CompletionFlag {
    store: Arc<dyn SettingsStore>,
    key: String,
}

impl CompletionFlag {
    pub fn new(store: Arc<dyn SettingsStore>, key: impl Into<String>) -> Self {
        Self { store, key: key.into() }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn is_set(&self) -> Result<bool> {
        self.store.contains(&self.key)
    }

    pub fn set(&self) -> Result<()> {
        self.store.set_flag(&self.key)
    }

    pub fn clear(&self) -> Result<()> {
        self.store.remove(&self.key)
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SettingsFile {
    #[serde(default)]
    modify_time: String,
    #[serde(default)]
    flags: BTreeMap<String, bool>,
}

/// Settings kept in a TOML file, for unpackaged runs and other platforms.
pub struct TomlSettingsStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl TomlSettingsStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<SettingsFile> {
        match fs::read_to_string(&self.path) {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| ShortcutError::Settings(format!("{}: {}", self.path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(SettingsFile::default()),
            Err(e) => Err(ShortcutError::io("read settings file", &self.path, e)),
        }
    }

    fn write(&self, file: &mut SettingsFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(|e| ShortcutError::io("create settings directory", parent, e))?;
        }

        file.modify_time = chrono::Utc::now().timestamp_millis().to_string();
        let content = toml::to_string(file).map_err(|e| ShortcutError::Settings(e.to_string()))?;

        // Write to a sibling file first so a crash never leaves half a file behind.
        let tmp = self.path.with_extension("toml.tmp");
        fs::write(&tmp, content).map_err(|e| ShortcutError::io("write settings file", &tmp, e))?;
        fs::rename(&tmp, &self.path).map_err(|e| ShortcutError::io("replace settings file", &self.path, e))?;
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut SettingsFile) -> bool) -> Result<()> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut file = self.read()?;
        if apply(&mut file) {
            self.write(&mut file)?;
        }
        Ok(())
    }
}

impl SettingsStore for TomlSettingsStore {
    fn contains(&self, key: &str) -> Result<bool> {
        let _guard = self.lock.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(self.read()?.flags.contains_key(key))
    }

    fn set_flag(&self, key: &str) -> Result<()> {
        self.update(|file| file.flags.insert(key.to_string(), true) != Some(true))
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.update(|file| file.flags.remove(key).is_some())
    }
}

/// `ApplicationData.Current.LocalSettings` of the running package.
#[cfg(windows)]
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalSettingsStore;

#[cfg(windows)]
impl LocalSettingsStore {
    fn values() -> Result<windows::Foundation::Collections::IPropertySet> {
        use windows::Storage::ApplicationData;
        Ok(ApplicationData::Current()?.LocalSettings()?.Values()?)
    }
}

#[cfg(windows)]
impl SettingsStore for LocalSettingsStore {
    fn contains(&self, key: &str) -> Result<bool> {
        use windows::core::HSTRING;
        crate::utils::com::with_apartment(|| Ok(Self::values()?.HasKey(&HSTRING::from(key))?))
    }

    fn set_flag(&self, key: &str) -> Result<()> {
        use windows::Foundation::PropertyValue;
        use windows::core::HSTRING;
        crate::utils::com::with_apartment(|| {
            let value = PropertyValue::CreateBoolean(true)?;
            Self::values()?.Insert(&HSTRING::from(key), &value)?;
            Ok(())
        })
    }

    fn remove(&self, key: &str) -> Result<()> {
        use windows::core::HSTRING;
        crate::utils::com::with_apartment(|| {
            let values = Self::values()?;
            let key = HSTRING::from(key);
            if values.HasKey(&key)? {
                values.Remove(&key)?;
            }
            Ok(())
        })
    }
}

/// A [`TomlSettingsStore`] under local app data. The location is looked up
/// on first use, not when the store is built.
#[cfg(not(windows))]
#[derive(Default)]
pub struct DefaultTomlSettingsStore {
    store: OnceCell<TomlSettingsStore>,
}

#[cfg(not(windows))]
impl DefaultTomlSettingsStore {
    fn store(&self) -> Result<&TomlSettingsStore> {
        self.store
            .get_or_try_init(|| Ok(TomlSettingsStore::new(crate::utils::paths::default_settings_file()?)))
    }
}

#[cfg(not(windows))]
impl SettingsStore for DefaultTomlSettingsStore {
    fn contains(&self, key: &str) -> Result<bool> {
        self.store()?.contains(key)
    }

    fn set_flag(&self, key: &str) -> Result<()> {
        self.store()?.set_flag(key)
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.store()?.remove(key)
    }
}

/// Picks the settings store: an explicit `settings_file`, else the package's
/// local settings on Windows, else a TOML file under local app data.
pub fn platform_settings_store(config: &InstallerConfig) -> Arc<dyn SettingsStore> {
    if let Some(path) = &config.settings_file {
        debug!("Using settings file {}", path.display());
        return Arc::new(TomlSettingsStore::new(path));
    }

    #[cfg(windows)]
    {
        Arc::new(LocalSettingsStore)
    }
    #[cfg(not(windows))]
    {
        Arc::new(DefaultTomlSettingsStore::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_file_means_no_flag() {
        let dir = TempDir::new().unwrap();
        let store = TomlSettingsStore::new(dir.path().join("settings.toml"));
        assert!(!store.contains("DesktopShortcutCreated").unwrap());
        assert!(!store.path().exists());
    }

    #[test]
    fn flag_survives_a_new_store_instance() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("settings.toml");

        TomlSettingsStore::new(&path).set_flag("DesktopShortcutCreated").unwrap();

        let reopened = TomlSettingsStore::new(&path);
        assert!(reopened.contains("DesktopShortcutCreated").unwrap());
        assert!(!reopened.contains("SomethingElse").unwrap());

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.contains("modify_time"));
        assert!(content.contains("DesktopShortcutCreated = true"));
    }

    #[test]
    fn remove_clears_and_tolerates_absent_keys() {
        let dir = TempDir::new().unwrap();
        let store = TomlSettingsStore::new(dir.path().join("settings.toml"));
        store.set_flag("DesktopShortcutCreated").unwrap();
        store.remove("DesktopShortcutCreated").unwrap();
        assert!(!store.contains("DesktopShortcutCreated").unwrap());
        store.remove("DesktopShortcutCreated").unwrap();
    }

    #[test]
    fn corrupt_file_is_a_settings_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("settings.toml");
        fs::write(&path, "flags = [not toml").unwrap();
        let err = TomlSettingsStore::new(&path).contains("DesktopShortcutCreated").unwrap_err();
        assert!(matches!(err, ShortcutError::Settings(_)));
    }

    #[test]
    fn completion_flag_uses_its_key() {
        let dir = TempDir::new().unwrap();
        let store: Arc<dyn SettingsStore> =
            Arc::new(TomlSettingsStore::new(dir.path().join("settings.toml")));
        let flag = CompletionFlag::new(store.clone(), "DesktopShortcutCreated");

        assert_eq!(flag.key(), "DesktopShortcutCreated");
        assert!(!flag.is_set().unwrap());
        flag.set().unwrap();
        assert!(flag.is_set().unwrap());
        assert!(store.contains("DesktopShortcutCreated").unwrap());
        flag.clear().unwrap();
        assert!(!flag.is_set().unwrap());
    }

    #[test]
    fn explicit_settings_file_wins() {
        let dir = TempDir::new().unwrap();
        let config = InstallerConfig {
            settings_file: Some(dir.path().join("flags.toml")),
            ..Default::default()
        };
        let store = platform_settings_store(&config);
        store.set_flag("DesktopShortcutCreated").unwrap();
        assert!(dir.path().join("flags.toml").exists());
    }

    #[cfg(not(windows))]
    #[test]
    fn default_store_builds_without_a_data_dir() {
        let store = DefaultTomlSettingsStore::default();
        assert!(store.store.get().is_none());
    }
}
