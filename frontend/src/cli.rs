use std::path::PathBuf;

use crate::error::{LauncherError, Result};

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Options {
    pub config: Option<PathBuf>,
    pub debug: bool,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CliAction {
    Run(Options),
    Help,
    Version,
}

pub fn usage(program: &str) -> String {
    format!(
        "Usage: {} [OPTIONS]\n\n\
         Options:\n  \
         -c, --config <PATH>  Use this config file instead of the per-user one\n  \
         -d, --debug          Verbose logging\n  \
         -h, --help           Print this help\n  \
         -v, --version        Print the version",
        program
    )
}

/// Parse arguments (without the program name).
pub fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<CliAction> {
    let mut opts = Options::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-h" | "--help" => return Ok(CliAction::Help),
            "-v" | "--version" => return Ok(CliAction::Version),
            "-d" | "--debug" => opts.debug = true,
            "-c" | "--config" => {
                let path = args
                    .next()
                    .ok_or_else(|| LauncherError::Cli(format!("{} requires a path", arg)))?;
                opts.config = Some(PathBuf::from(path));
            }
            other => {
                if let Some(path) = other.strip_prefix("--config=") {
                    opts.config = Some(PathBuf::from(path));
                } else {
                    return Err(LauncherError::Cli(format!("unknown argument '{}'", other)));
                }
            }
        }
    }
    Ok(CliAction::Run(opts))
}
