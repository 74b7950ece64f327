use std::process::ExitCode;
use std::sync::Arc;

use tracing::{error, info};

use desktop_shortcut_installer::cli::{CliArgs, Command, USAGE};
use desktop_shortcut_installer::{
    InstallOutcome, InstallerConfig, ShortcutProvisioner, UninstallOutcome, logging,
};

#[tokio::main]
async fn main() -> ExitCode {
    let args = match CliArgs::parse(std::env::args().skip(1)) {
        Ok(args) => args,
        Err(e) => {
            eprintln!("{}\n\n{}", e, USAGE);
            return ExitCode::from(2);
        }
    };

    if args.command == Command::Help {
        println!("{}", USAGE);
        return ExitCode::SUCCESS;
    }

    let config = match &args.config {
        Some(path) => match InstallerConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Failed to load config {}: {}", path.display(), e);
                return ExitCode::from(2);
            }
        },
        None => InstallerConfig::load_default(),
    };

    let _log_guard = match logging::init(&config) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Logging unavailable: {}", e);
            None
        }
    };

    info!("desktop-shortcut-installer {} ({:?})", env!("CARGO_PKG_VERSION"), args.command);

    let provisioner = Arc::new(ShortcutProvisioner::for_current_process(&config));

    match args.command {
        Command::Install => {
            let outcome = provisioner.install_desktop_shortcut_async().await;
            println!("{}", outcome);
            if matches!(outcome, InstallOutcome::Failed { .. }) {
                return ExitCode::FAILURE;
            }
        }
        Command::Uninstall => {
            let outcome = tokio::task::spawn_blocking(move || provisioner.uninstall_desktop_shortcut())
                .await
                .unwrap_or_else(|e| UninstallOutcome::Failed { reason: e.to_string() });
            println!("{}", outcome);
            if matches!(outcome, UninstallOutcome::Failed { .. }) {
                return ExitCode::FAILURE;
            }
        }
        Command::Status => {
            let status = tokio::task::spawn_blocking(move || provisioner.status()).await;
            match status {
                Ok(status) => print!("{}", status),
                Err(e) => {
                    error!("Status check failed: {}", e);
                    return ExitCode::FAILURE;
                }
            }
        }
        Command::Help => {}
    }

    ExitCode::SUCCESS
}
