//! Error types for the shortcut installer.
//!
//! These never leave the crate through the provisioning entry points; they are
//! turned into log events and outcome values at that boundary.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ShortcutError {
    #[error("IO error at {path:?}: {message}")]
    Io {
        message: String,
        path: Option<PathBuf>,
        #[source]
        source: Option<std::io::Error>,
    },

    #[error("Malformed manifest: {0}")]
    MalformedManifest(String),

    #[error("Manifest XML error: {0}")]
    Xml(#[from] quick_xml::Error),

    #[error("Incomplete app identity: {0}")]
    Identity(String),

    #[error("Settings store error: {0}")]
    Settings(String),

    #[error("Shell link error at {path:?}: {message}")]
    ShellLink { path: PathBuf, message: String },

    #[error("Shell links are not supported on this platform")]
    Unsupported,

    #[error("Configuration error: {0}")]
    Config(String),

    #[cfg(windows)]
    #[error("Windows API error: {0}")]
    Windows(#[from] windows::core::Error),
}

impl ShortcutError {
    pub(crate) fn io(message: impl Into<String>, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            message: message.into(),
            path: Some(path.into()),
            source: Some(source),
        }
    }
}

pub type Result<T> = std::result::Result<T, ShortcutError>;
