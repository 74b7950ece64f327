//! The desktop shortcut provisioner.
//!
//! Every public operation here is best effort: errors and panics from the
//! collaborators are logged and reported as an outcome, never returned or
//! propagated to the host.

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::PathBuf;
use std::sync::Arc;

use tracing::{debug, error, info, warn};

use crate::config::InstallerConfig;
use crate::error::Result;
use crate::package::{AppIdentity, CurrentPackage, ManifestResolver, PackageSource};
use crate::utils::settings::{platform_settings_store, CompletionFlag, SettingsStore};
use crate::utils::shortcut::{platform_linker, ShellLinker, ShortcutWriter, WriteOutcome};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallOutcome {
    /// The process has no package identity.
    NotPackaged,
    /// Automatic creation is turned off in the configuration.
    Disabled,
    /// The completion flag was already set.
    AlreadyProvisioned,
    /// The manifest could not be read or parsed.
    ManifestUnavailable,
    Created { path: PathBuf },
    /// A file already existed at the shortcut path; it was left as is.
    AlreadyExisted { path: PathBuf },
    /// Nothing was recorded, the next run tries again.
    Failed { reason: String },
}

impl InstallOutcome {
    /// Whether the completion flag is set after this outcome.
    pub fn is_provisioned(&self) -> bool {
        matches!(
            self,
            Self::AlreadyProvisioned | Self::Created { .. } | Self::AlreadyExisted { .. }
        )
    }
}

impl fmt::Display for InstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPackaged => write!(f, "Not running as a packaged app, nothing to do"),
            Self::Disabled => write!(f, "Automatic desktop shortcut creation is disabled"),
            Self::AlreadyProvisioned => write!(f, "Desktop shortcut already created"),
            Self::ManifestUnavailable => write!(f, "Could not read app info from the manifest"),
            Self::Created { path } => write!(f, "Desktop shortcut created: {}", path.display()),
            Self::AlreadyExisted { path } => {
                write!(f, "Desktop shortcut already present: {}", path.display())
            }
            Self::Failed { reason } => write!(f, "Desktop shortcut creation failed: {}", reason),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UninstallOutcome {
    NotPackaged,
    Removed { path: PathBuf },
    /// There was no shortcut to delete. The flag is still cleared.
    NotPresent,
    Failed { reason: String },
}

impl fmt::Display for UninstallOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotPackaged => write!(f, "Not running as a packaged app, nothing to do"),
            Self::Removed { path } => write!(f, "Desktop shortcut removed: {}", path.display()),
            Self::NotPresent => write!(f, "No desktop shortcut to remove"),
            Self::Failed { reason } => write!(f, "Desktop shortcut removal failed: {}", reason),
        }
    }
}

/// Read-only snapshot of the provisioning state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProvisionStatus {
    pub packaged: bool,
    /// `None` when the settings store could not be read.
    pub flag_set: Option<bool>,
    pub identity: Option<AppIdentity>,
    pub shortcut_path: Option<PathBuf>,
    pub shortcut_exists: bool,
}

impl fmt::Display for ProvisionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "packaged:        {}", self.packaged)?;
        match self.flag_set {
            Some(set) => writeln!(f, "flag set:        {}", set)?,
            None => writeln!(f, "flag set:        unknown")?,
        }
        if let Some(identity) = &self.identity {
            writeln!(f, "display name:    {}", identity.display_name)?;
            writeln!(f, "application id:  {}", identity.application_id)?;
            writeln!(f, "family name:     {}", identity.package_family_name)?;
            match &identity.icon_path {
                Some(icon) => writeln!(f, "icon:            {}", icon.display())?,
                None => writeln!(f, "icon:            none")?,
            }
        }
        if let Some(path) = &self.shortcut_path {
            writeln!(f, "shortcut:        {} (exists: {})", path.display(), self.shortcut_exists)?;
        }
        Ok(())
    }
}

/// Ensures one desktop shortcut exists for the running packaged app.
#[derive(Clone)]
pub struct ShortcutProvisioner {
    package: Arc<dyn PackageSource>,
    resolver: ManifestResolver,
    writer: ShortcutWriter,
    flag: CompletionFlag,
}

impl ShortcutProvisioner {
    pub fn new(
        config: &InstallerConfig,
        package: Arc<dyn PackageSource>,
        settings: Arc<dyn SettingsStore>,
        linker: Arc<dyn ShellLinker>,
        desktop_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            package,
            resolver: ManifestResolver::from_config(config),
            writer: ShortcutWriter::new(desktop_dir, linker),
            flag: CompletionFlag::new(settings, &config.settings_key),
        }
    }

    /// Wires the provisioner to the real package, settings store, shell and
    /// desktop of this process. Nothing is looked up until an operation runs.
    pub fn for_current_process(config: &InstallerConfig) -> Self {
        let writer = match &config.desktop_dir {
            Some(dir) => ShortcutWriter::new(dir, platform_linker()),
            None => ShortcutWriter::on_user_desktop(platform_linker()),
        };
        Self {
            package: Arc::new(CurrentPackage),
            resolver: ManifestResolver::from_config(config),
            writer,
            flag: CompletionFlag::new(platform_settings_store(config), &config.settings_key),
        }
    }

    /// Creates the shortcut unless that already happened. Safe to call any
    /// number of times, never fails and never panics.
    pub fn install_desktop_shortcut(&self) -> InstallOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.try_install())) {
            Ok(Ok(outcome)) => {
                debug!("Desktop shortcut install: {}", outcome);
                outcome
            }
            Ok(Err(e)) => {
                warn!("Error creating desktop shortcut: {}", e);
                InstallOutcome::Failed { reason: e.to_string() }
            }
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!("Desktop shortcut creation panicked: {}", reason);
                InstallOutcome::Failed { reason }
            }
        }
    }

    /// [`install_desktop_shortcut`](Self::install_desktop_shortcut) on the
    /// blocking thread pool.
    pub async fn install_desktop_shortcut_async(self: Arc<Self>) -> InstallOutcome {
        match tokio::task::spawn_blocking(move || self.install_desktop_shortcut()).await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!("Desktop shortcut task failed: {}", e);
                InstallOutcome::Failed { reason: e.to_string() }
            }
        }
    }

    fn try_install(&self) -> Result<InstallOutcome> {
        let Some(package) = self.package.current() else {
            debug!("Not running as a packaged app. Shortcut creation skipped.");
            return Ok(InstallOutcome::NotPackaged);
        };

        if self.flag.is_set()? {
            debug!("Desktop shortcut already created.");
            return Ok(InstallOutcome::AlreadyProvisioned);
        }

        let identity = match self.resolver.resolve(&package) {
            Ok(identity) => identity,
            Err(e) => {
                warn!("Failed to read app info from manifest: {}", e);
                return Ok(InstallOutcome::ManifestUnavailable);
            }
        };

        let outcome = match self.writer.write_shortcut(&identity)? {
            WriteOutcome::Created(path) => InstallOutcome::Created { path },
            WriteOutcome::AlreadyPresent(path) => InstallOutcome::AlreadyExisted { path },
        };

        self.flag.set()?;
        info!("Desktop shortcut provisioned for {}", identity.display_name);
        Ok(outcome)
    }

    /// Deletes the shortcut and clears the completion flag. Never fails and
    /// never panics.
    pub fn uninstall_desktop_shortcut(&self) -> UninstallOutcome {
        match panic::catch_unwind(AssertUnwindSafe(|| self.try_uninstall())) {
            Ok(outcome) => outcome,
            Err(payload) => {
                let reason = panic_message(payload.as_ref());
                error!("Desktop shortcut removal panicked: {}", reason);
                UninstallOutcome::Failed { reason }
            }
        }
    }

    fn try_uninstall(&self) -> UninstallOutcome {
        let Some(package) = self.package.current() else {
            debug!("Not running as a packaged app. Shortcut removal skipped.");
            return UninstallOutcome::NotPackaged;
        };

        let removal = self
            .resolver
            .resolve(&package)
            .and_then(|identity| self.writer.remove_shortcut(&identity));

        // The flag is reset even when the shortcut could not be dealt with.
        let cleared = self.flag.clear();
        if let Err(e) = &cleared {
            warn!("Failed to reset desktop shortcut flag: {}", e);
        }

        match (removal, cleared) {
            (Ok(Some(path)), Ok(())) => UninstallOutcome::Removed { path },
            (Ok(None), Ok(())) => UninstallOutcome::NotPresent,
            (Err(e), _) => {
                warn!("Error removing desktop shortcut: {}", e);
                UninstallOutcome::Failed { reason: e.to_string() }
            }
            (Ok(_), Err(e)) => UninstallOutcome::Failed { reason: e.to_string() },
        }
    }

    pub fn status(&self) -> ProvisionStatus {
        let Some(package) = self.package.current() else {
            return ProvisionStatus::default();
        };

        let flag_set = match self.flag.is_set() {
            Ok(set) => Some(set),
            Err(e) => {
                warn!("Failed to read desktop shortcut flag: {}", e);
                None
            }
        };

        let identity = match self.resolver.resolve(&package) {
            Ok(identity) => Some(identity),
            Err(e) => {
                warn!("Failed to read app info from manifest: {}", e);
                None
            }
        };
        let shortcut_path = identity.as_ref().and_then(|i| match self.writer.shortcut_path(i) {
            Ok(path) => Some(path),
            Err(e) => {
                warn!("Failed to locate desktop shortcut: {}", e);
                None
            }
        });
        let shortcut_exists = shortcut_path.as_ref().is_some_and(|p| p.exists());

        ProvisionStatus {
            packaged: true,
            flag_set,
            identity,
            shortcut_path,
            shortcut_exists,
        }
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
