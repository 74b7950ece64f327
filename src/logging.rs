use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::InstallerConfig;
use crate::error::{Result, ShortcutError};

const LOG_FILE_PREFIX: &str = "installer";
const LOG_FILE_SUFFIX: &str = "log";

/// Installs the global subscriber for the binary: console output plus a
/// daily rolling file when a log directory is available.
///
/// `RUST_LOG` takes precedence over `log_level` from the config. The
/// returned guard flushes the file writer when dropped, so keep it alive
/// for the life of the process.
pub fn init(config: &InstallerConfig) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.log_level))
        .map_err(|e| ShortcutError::Config(format!("invalid log level '{}': {}", config.log_level, e)))?;

    let mut file_error = None;
    let (file_layer, guard) = match config.resolved_log_dir() {
        Some(dir) => match RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .filename_prefix(LOG_FILE_PREFIX)
            .filename_suffix(LOG_FILE_SUFFIX)
            .build(&dir)
        {
            Ok(appender) => {
                let (writer, guard) = tracing_appender::non_blocking(appender);
                let layer = fmt::layer().with_writer(writer).with_ansi(false).with_target(false);
                (Some(layer), Some(guard))
            }
            Err(e) => {
                file_error = Some(format!("{}: {}", dir.display(), e));
                (None, None)
            }
        },
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(file_layer)
        .try_init()
        .map_err(|e| ShortcutError::Config(format!("failed to install logger: {}", e)))?;

    if let Some(e) = file_error {
        warn!("File logging disabled, cannot open log directory {}", e);
    }

    Ok(guard)
}
