use std::path::PathBuf;

pub const USAGE: &str = "\
Usage: desktop-shortcut-installer [COMMAND] [--config <FILE>]

Commands:
  install     Create the desktop shortcut if it has not been created yet (default)
  uninstall   Remove the desktop shortcut and reset the completion flag
  status      Show package identity, flag state and shortcut path
  help        Show this message";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Command {
    #[default]
    Install,
    Uninstall,
    Status,
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliArgs {
    pub command: Command,
    pub config: Option<PathBuf>,
}

impl CliArgs {
    /// Parses the arguments that follow the program name.
    pub fn parse<I, S>(args: I) -> Result<Self, String>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut parsed = CliArgs::default();
        let mut command_seen = false;
        let mut args = args.into_iter().map(Into::into);

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" | "-c" => {
                    let path = args.next().ok_or("--config needs a file path")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--help" | "-h" | "/?" => parsed.command = Command::Help,
                other if other.starts_with('-') => return Err(format!("unknown option '{}'", other)),
                other => {
                    if command_seen {
                        return Err(format!("unexpected argument '{}'", other));
                    }
                    command_seen = true;
                    parsed.command = match other.to_lowercase().as_str() {
                        "install" => Command::Install,
                        "uninstall" => Command::Uninstall,
                        "status" => Command::Status,
                        "help" => Command::Help,
                        _ => return Err(format!("unknown command '{}'", other)),
                    };
                }
            }
        }

        Ok(parsed)
    }
}
