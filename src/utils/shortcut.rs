use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Result, ShortcutError};
use crate::package::AppIdentity;
use crate::utils::paths;

/// Program that resolves `shell:AppsFolder` references.
pub const APPS_FOLDER_HOST: &str = "explorer.exe";

/// What a shortcut launches.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LaunchTarget {
    pub program: String,
    pub arguments: String,
}

impl LaunchTarget {
    /// Launches a packaged app through the app-list entry
    /// `shell:AppsFolder\<family name>!<application id>`.
    pub fn apps_folder(package_family_name: &str, application_id: &str) -> Self {
        Self {
            program: APPS_FOLDER_HOST.to_string(),
            arguments: format!("shell:AppsFolder\\{}!{}", package_family_name, application_id),
        }
    }
}

/// Everything written into a shell link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkSpec {
    pub target: LaunchTarget,
    pub description: String,
    pub icon: Option<PathBuf>,
}

impl LinkSpec {
    pub fn for_identity(identity: &AppIdentity) -> Self {
        Self {
            target: LaunchTarget::apps_folder(&identity.package_family_name, &identity.application_id),
            description: identity.display_name.clone(),
            // The icon may have disappeared since the manifest was read.
            icon: identity.icon_path.clone().filter(|p| p.is_file()),
        }
    }
}

/// Platform shell integration.
pub trait ShellLinker: Send + Sync {
    fn create_or_update_link(&self, path: &Path, spec: &LinkSpec) -> Result<()>;

    fn delete_link(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ShortcutError::io("delete shortcut", path, e)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Created(PathBuf),
    /// A file was already there and was left untouched.
    AlreadyPresent(PathBuf),
}

/// Creates and removes `<desktop>/<display name>.lnk`.
#[derive(Clone)]
pub struct ShortcutWriter {
    // `None` means the user's desktop, looked up on each use.
    desktop_dir: Option<PathBuf>,
    linker: Arc<dyn ShellLinker>,
}

impl ShortcutWriter {
    pub fn new(desktop_dir: impl Into<PathBuf>, linker: Arc<dyn ShellLinker>) -> Self {
        Self {
            desktop_dir: Some(desktop_dir.into()),
            linker,
        }
    }

    /// Writes to whatever the user's desktop is when a shortcut is needed.
    pub fn on_user_desktop(linker: Arc<dyn ShellLinker>) -> Self {
        Self { desktop_dir: None, linker }
    }

    pub fn desktop_dir(&self) -> Result<PathBuf> {
        match &self.desktop_dir {
            Some(dir) => Ok(dir.clone()),
            None => paths::desktop_dir(),
        }
    }

    pub fn shortcut_path(&self, identity: &AppIdentity) -> Result<PathBuf> {
        Ok(paths::shortcut_path(&self.desktop_dir()?, &identity.display_name))
    }

    /// Writes the shortcut unless something already exists at its path.
    pub fn write_shortcut(&self, identity: &AppIdentity) -> Result<WriteOutcome> {
        let desktop_dir = self.desktop_dir()?;
        let shortcut_path = paths::shortcut_path(&desktop_dir, &identity.display_name);

        if exists(&shortcut_path) {
            debug!("Shortcut already exists at {}, leaving it alone", shortcut_path.display());
            return Ok(WriteOutcome::AlreadyPresent(shortcut_path));
        }

        fs::create_dir_all(&desktop_dir)
            .map_err(|e| ShortcutError::io("create desktop directory", &desktop_dir, e))?;

        let spec = LinkSpec::for_identity(identity);
        self.linker.create_or_update_link(&shortcut_path, &spec)?;

        info!("Shortcut created for {} at {}", identity.display_name, shortcut_path.display());
        Ok(WriteOutcome::Created(shortcut_path))
    }

    /// Deletes the shortcut. Returns the path if there was one to delete.
    pub fn remove_shortcut(&self, identity: &AppIdentity) -> Result<Option<PathBuf>> {
        let shortcut_path = self.shortcut_path(identity)?;
        if !exists(&shortcut_path) {
            return Ok(None);
        }

        self.linker.delete_link(&shortcut_path)?;
        info!("Shortcut removed for {} at {}", identity.display_name, shortcut_path.display());
        Ok(Some(shortcut_path))
    }
}

fn exists(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok()
}

/// The shell linker for the platform this binary was built for.
pub fn platform_linker() -> Arc<dyn ShellLinker> {
    #[cfg(windows)]
    {
        Arc::new(ComShellLinker)
    }
    #[cfg(not(windows))]
    {
        Arc::new(UnsupportedShellLinker)
    }
}

/// Writes `.lnk` files through `IShellLinkW` and `IPersistFile`.
#[cfg(windows)]
#[derive(Debug, Clone, Copy, Default)]
pub struct ComShellLinker;

#[cfg(windows)]
impl ShellLinker for ComShellLinker {
    fn create_or_update_link(&self, path: &Path, spec: &LinkSpec) -> Result<()> {
        crate::utils::com::with_apartment(|| unsafe { save_shell_link(path, spec) }).map_err(|e| match e {
            ShortcutError::Windows(err) => ShortcutError::ShellLink {
                path: path.to_path_buf(),
                message: err.to_string(),
            },
            other => other,
        })
    }
}

#[cfg(windows)]
unsafe fn save_shell_link(path: &Path, spec: &LinkSpec) -> Result<()> {
    use windows::core::{Interface, HSTRING};
    use windows::Win32::System::Com::{CoCreateInstance, IPersistFile, CLSCTX_INPROC_SERVER};
    use windows::Win32::UI::Shell::{IShellLinkW, ShellLink};

    unsafe {
        let link: IShellLinkW = CoCreateInstance(&ShellLink, None, CLSCTX_INPROC_SERVER)?;
        link.SetPath(&HSTRING::from(spec.target.program.as_str()))?;
        link.SetArguments(&HSTRING::from(spec.target.arguments.as_str()))?;
        link.SetDescription(&HSTRING::from(spec.description.as_str()))?;
        if let Some(icon) = &spec.icon {
            link.SetIconLocation(&HSTRING::from(icon.as_os_str()), 0)?;
        }

        let file: IPersistFile = link.cast()?;
        file.Save(&HSTRING::from(path.as_os_str()), false)?;
    }
    Ok(())
}

/// Used where no shell link API exists. Deleting still works.
#[cfg(not(windows))]
#[derive(Debug, Clone, Copy, Default)]
pub struct UnsupportedShellLinker;

#[cfg(not(windows))]
impl ShellLinker for UnsupportedShellLinker {
    fn create_or_update_link(&self, _path: &Path, _spec: &LinkSpec) -> Result<()> {
        Err(ShortcutError::Unsupported)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct FileLinker {
        written: Mutex<Vec<(PathBuf, LinkSpec)>>,
    }

    impl ShellLinker for FileLinker {
        fn create_or_update_link(&self, path: &Path, spec: &LinkSpec) -> Result<()> {
            fs::write(path, spec.target.arguments.as_bytes()).unwrap();
            self.written.lock().unwrap().push((path.to_path_buf(), spec.clone()));
            Ok(())
        }
    }

    fn identity(icon: Option<PathBuf>) -> AppIdentity {
        AppIdentity {
            display_name: "Sample App".to_string(),
            application_id: "App".to_string(),
            package_family_name: "Contoso.Sample_8wekyb3d8bbwe".to_string(),
            icon_path: icon,
        }
    }

    #[test]
    fn apps_folder_target() {
        let target = LaunchTarget::apps_folder("Contoso.Sample_8wekyb3d8bbwe", "App");
        assert_eq!(target.program, "explorer.exe");
        assert_eq!(target.arguments, r"shell:AppsFolder\Contoso.Sample_8wekyb3d8bbwe!App");
    }

    #[test]
    fn link_spec_drops_vanished_icon() {
        let dir = TempDir::new().unwrap();
        let icon = dir.path().join("icon.png");
        assert_eq!(LinkSpec::for_identity(&identity(Some(icon.clone()))).icon, None);

        fs::write(&icon, b"png").unwrap();
        let spec = LinkSpec::for_identity(&identity(Some(icon.clone())));
        assert_eq!(spec.icon, Some(icon));
        assert_eq!(spec.description, "Sample App");
    }

    #[test]
    fn write_then_skip_existing() {
        let dir = TempDir::new().unwrap();
        let linker = Arc::new(FileLinker::default());
        let writer = ShortcutWriter::new(dir.path().join("Desktop"), linker.clone());

        let first = writer.write_shortcut(&identity(None)).unwrap();
        let expected = dir.path().join("Desktop").join("Sample App.lnk");
        assert_eq!(first, WriteOutcome::Created(expected.clone()));

        let second = writer.write_shortcut(&identity(None)).unwrap();
        assert_eq!(second, WriteOutcome::AlreadyPresent(expected));
        assert_eq!(linker.written.lock().unwrap().len(), 1);
    }

    #[test]
    fn remove_reports_whether_anything_was_deleted() {
        let dir = TempDir::new().unwrap();
        let writer = ShortcutWriter::new(dir.path(), Arc::new(FileLinker::default()));
        writer.write_shortcut(&identity(None)).unwrap();

        let removed = writer.remove_shortcut(&identity(None)).unwrap();
        assert_eq!(removed, Some(dir.path().join("Sample App.lnk")));
        assert!(!dir.path().join("Sample App.lnk").exists());
        assert_eq!(writer.remove_shortcut(&identity(None)).unwrap(), None);
    }

    #[test]
    fn default_delete_ignores_missing_file() {
        let dir = TempDir::new().unwrap();
        let linker = FileLinker::default();
        assert!(linker.delete_link(&dir.path().join("nothing.lnk")).is_ok());
    }

    #[test]
    fn explicit_desktop_is_used_as_is() {
        let dir = TempDir::new().unwrap();
        let writer = ShortcutWriter::new(dir.path(), Arc::new(FileLinker::default()));
        assert_eq!(writer.desktop_dir().unwrap(), dir.path());
        assert_eq!(
            writer.shortcut_path(&identity(None)).unwrap(),
            dir.path().join("Sample App.lnk")
        );
    }

    #[test]
    fn user_desktop_writer_builds_without_a_desktop() {
        // Nothing is looked up until a shortcut is written or removed.
        let writer = ShortcutWriter::on_user_desktop(Arc::new(FileLinker::default()));
        assert_eq!(writer.desktop_dir().ok(), dirs::desktop_dir());
    }
}
