use std::path::PathBuf;

use thiserror::Error;

/// Errors that can abort startup or surface from a service the session calls.
#[derive(Debug, Error)]
pub enum LauncherError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to read config {path}: {source}")]
    Config {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("failed to parse config: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),
    #[error("sdl error: {0}")]
    Sdl(String),
    #[error("font error: {0}")]
    Font(String),
    #[error("default menu '{0}' is not defined or has no entries")]
    NoDefaultMenu(String),
    #[error("invalid setting: {0}")]
    InvalidValue(String),
    #[error("invalid command '{0}'")]
    InvalidCommand(String),
    #[error("unknown gamepad control '{0}'")]
    InvalidControl(String),
    #[error("failed to launch '{command}': {source}")]
    Launch {
        command: String,
        source: std::io::Error,
    },
    #[error("{0}")]
    Cli(String),
}

pub type Result<T> = std::result::Result<T, LauncherError>;
