//! Creates a desktop shortcut for a packaged Windows application the first
//! time it runs.
//!
//! Hosts call [`initialize`] once from their startup code:
//!
//! ```no_run
//! desktop_shortcut_installer::initialize();
//! ```
//!
//! Provisioning then runs on a background thread. It is a no-op outside a
//! packaged context and once the shortcut has been recorded as created. Hosts
//! that turned automatic initialization off (the `auto-init` feature or the
//! `auto_init` config key) call [`install_desktop_shortcut_async`] or
//! [`install_desktop_shortcut`] themselves, and [`uninstall_desktop_shortcut`]
//! to undo it. None of these functions return errors or panic.

pub mod app;
pub mod cli;
pub mod config;
pub mod error;
pub mod logging;
pub mod package;
pub mod utils;

use std::sync::Arc;
use std::sync::atomic::AtomicBool;

use once_cell::sync::Lazy;
use tracing::{debug, warn};

pub use app::{InstallOutcome, ProvisionStatus, ShortcutProvisioner, UninstallOutcome};
pub use config::InstallerConfig;
pub use error::{Result, ShortcutError};
pub use package::{AppIdentity, FixedPackage, PackageInfo, PackageSource};
pub use utils::settings::{CompletionFlag, SettingsStore, TomlSettingsStore};
pub use utils::shortcut::{LaunchTarget, LinkSpec, ShellLinker};

static CONFIG: Lazy<InstallerConfig> = Lazy::new(InstallerConfig::load_default);
static PROVISIONER: Lazy<Arc<ShortcutProvisioner>> =
    Lazy::new(|| Arc::new(ShortcutProvisioner::for_current_process(&CONFIG)));
static STARTED: AtomicBool = AtomicBool::new(false);

/// Schedules desktop shortcut provisioning in the background and returns
/// immediately. Only the first call in a process does anything.
pub fn initialize() {
    if !cfg!(feature = "auto-init") {
        debug!("Automatic desktop shortcut initialization is compiled out");
        return;
    }

    let started = app::tasks::start_once(&STARTED, || CONFIG.auto_init.then(|| PROVISIONER.clone()));
    if let Err(e) = started {
        warn!("Failed to start desktop shortcut worker: {}", e);
    }
}

/// Creates the desktop shortcut if it has not been created yet, blocking the
/// calling thread.
pub fn install_desktop_shortcut() -> InstallOutcome {
    PROVISIONER.install_desktop_shortcut()
}

/// Async form of [`install_desktop_shortcut`]; the work runs on tokio's
/// blocking pool.
pub async fn install_desktop_shortcut_async() -> InstallOutcome {
    PROVISIONER.clone().install_desktop_shortcut_async().await
}

/// Removes the desktop shortcut and resets the completion flag.
pub fn uninstall_desktop_shortcut() -> UninstallOutcome {
    PROVISIONER.uninstall_desktop_shortcut()
}
