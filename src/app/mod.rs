pub mod provisioner;
pub mod tasks;

pub use provisioner::{InstallOutcome, ProvisionStatus, ShortcutProvisioner, UninstallOutcome};
