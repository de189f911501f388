use std::fmt;

use crate::error::{LauncherError, Result};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PowerAction {
    Shutdown,
    Restart,
    Sleep,
}

/// A parsed entry/hotkey/control command. Anything that is not a `:verb`
/// launches an external application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Launch(String),
    Submenu(String),
    Left,
    Right,
    Select,
    Home,
    Back,
    Quit,
    Power(PowerAction),
}

impl Command {
    pub fn parse(raw: &str) -> Result<Command> {
        let s = raw.trim();
        if s.is_empty() {
            return Err(LauncherError::InvalidCommand(raw.to_string()));
        }
        let Some(verb_line) = s.strip_prefix(':') else {
            return Ok(Command::Launch(s.to_string()));
        };
        let (verb, arg) = match verb_line.split_once(char::is_whitespace) {
            Some((v, a)) => (v, a.trim()),
            None => (verb_line, ""),
        };
        let cmd = match verb.to_ascii_lowercase().as_str() {
            "submenu" if !arg.is_empty() => Command::Submenu(arg.to_string()),
            "left" => Command::Left,
            "right" => Command::Right,
            "select" => Command::Select,
            "home" => Command::Home,
            "back" => Command::Back,
            "quit" => Command::Quit,
            "shutdown" => Command::Power(PowerAction::Shutdown),
            "restart" => Command::Power(PowerAction::Restart),
            "sleep" => Command::Power(PowerAction::Sleep),
            _ => return Err(LauncherError::InvalidCommand(raw.to_string())),
        };
        Ok(cmd)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Launch(cmd) => write!(f, "{}", cmd),
            Command::Submenu(name) => write!(f, ":submenu {}", name),
            Command::Left => write!(f, ":left"),
            Command::Right => write!(f, ":right"),
            Command::Select => write!(f, ":select"),
            Command::Home => write!(f, ":home"),
            Command::Back => write!(f, ":back"),
            Command::Quit => write!(f, ":quit"),
            Command::Power(PowerAction::Shutdown) => write!(f, ":shutdown"),
            Command::Power(PowerAction::Restart) => write!(f, ":restart"),
            Command::Power(PowerAction::Sleep) => write!(f, ":sleep"),
        }
    }
}
