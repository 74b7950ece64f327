use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use tracing::{debug, info};

use crate::app::provisioner::{InstallOutcome, ShortcutProvisioner};

const WORKER_NAME: &str = "desktop-shortcut";

/// Starts the one-time background install unless `started` is already set.
///
/// `prepare` runs on the worker thread and returns `None` when automatic
/// creation is turned off. Returns `Ok(None)` when an earlier call already
/// started the worker.
pub fn start_once<F>(started: &AtomicBool, prepare: F) -> io::Result<Option<JoinHandle<InstallOutcome>>>
where
    F: FnOnce() -> Option<Arc<ShortcutProvisioner>> + Send + 'static,
{
    if started.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
        debug!("Desktop shortcut initialization already started");
        return Ok(None);
    }

    let handle = spawn_background(move || match prepare() {
        Some(provisioner) => provisioner.install_desktop_shortcut(),
        None => {
            info!("Automatic desktop shortcut creation disabled by configuration");
            InstallOutcome::Disabled
        }
    });

    // Let a later call try again if the thread never started.
    if handle.is_err() {
        started.store(false, Ordering::SeqCst);
    }
    handle.map(Some)
}

// Run provisioning on its own thread so host startup is never held up.
fn spawn_background<F>(work: F) -> io::Result<JoinHandle<InstallOutcome>>
where
    F: FnOnce() -> InstallOutcome + Send + 'static,
{
    thread::Builder::new().name(WORKER_NAME.to_string()).spawn(move || {
        debug!("Desktop shortcut worker started");
        let outcome = work();
        debug!("Desktop shortcut worker finished: {}", outcome);
        outcome
    })
}
