#[cfg(windows)]
pub(crate) mod com;
pub mod paths;
pub mod settings;
pub mod shortcut;
