//! Raw input to command mapping.
//!
//! Keys go through the configured hotkeys first, then the built-in
//! bindings. Gamepad controls are polled once per frame; a held control
//! fires on its first frame, again once the repeat delay is reached and then
//! every `rate` frames after that.

use std::str::FromStr;

use crate::command::Command;
use crate::config::Config;
use crate::error::{LauncherError, Result};

/// SDL keycodes for the built-in bindings.
pub mod keys {
    pub const BACKSPACE: i32 = 8;
    pub const RETURN: i32 = 13;
    pub const ESCAPE: i32 = 27;
    pub const RIGHT: i32 = 0x4000_004F;
    pub const LEFT: i32 = 0x4000_0050;
    pub const KP_ENTER: i32 = 0x4000_0058;
}

const BUILTIN_KEYS: [(i32, Command); 6] = [
    (keys::LEFT, Command::Left),
    (keys::RIGHT, Command::Right),
    (keys::RETURN, Command::Select),
    (keys::KP_ENTER, Command::Select),
    (keys::BACKSPACE, Command::Back),
    (keys::ESCAPE, Command::Home),
];

// SDL_GameControllerAxis / SDL_GameControllerButton indices
const AXES: [(&str, u8); 4] = [("lstickx", 0), ("lsticky", 1), ("rstickx", 2), ("rsticky", 3)];
const TRIGGERS: [(&str, u8); 2] = [("ltrigger", 4), ("rtrigger", 5)];
const BUTTONS: [(&str, u8); 15] = [
    ("a", 0),
    ("b", 1),
    ("x", 2),
    ("y", 3),
    ("back", 4),
    ("guide", 5),
    ("start", 6),
    ("leftstick", 7),
    ("rightstick", 8),
    ("leftshoulder", 9),
    ("rightshoulder", 10),
    ("dpadup", 11),
    ("dpaddown", 12),
    ("dpadleft", 13),
    ("dpadright", 14),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum GamepadInput {
    /// One direction of an analog axis.
    Axis { axis: u8, positive: bool },
    Button(u8),
}

impl FromStr for GamepadInput {
    type Err = LauncherError;

    fn from_str(s: &str) -> Result<Self> {
        let name = s.trim().to_ascii_lowercase();
        let invalid = || LauncherError::InvalidControl(s.to_string());

        if let Some(button) = name.strip_prefix("button") {
            return BUTTONS
                .iter()
                .find(|(n, _)| *n == button)
                .map(|&(_, idx)| GamepadInput::Button(idx))
                .ok_or_else(invalid);
        }
        if let Some(&(_, axis)) = TRIGGERS.iter().find(|(n, _)| *n == name) {
            return Ok(GamepadInput::Axis { axis, positive: true });
        }
        let (base, positive) = match name.as_bytes().last() {
            Some(b'+') => (&name[..name.len() - 1], true),
            Some(b'-') => (&name[..name.len() - 1], false),
            _ => return Err(invalid()),
        };
        AXES.iter()
            .find(|(n, _)| *n == base)
            .map(|&(_, axis)| GamepadInput::Axis { axis, positive })
            .ok_or_else(invalid)
    }
}

impl GamepadInput {
    fn is_active(&self, pads: &dyn GamepadSource, controller: usize, deadzone: u16) -> bool {
        match *self {
            GamepadInput::Button(idx) => pads.button(controller, idx),
            GamepadInput::Axis { axis, positive } => {
                let value = pads.axis(controller, axis) as i32;
                let dz = deadzone as i32;
                if positive {
                    value > dz
                } else {
                    value < -dz
                }
            }
        }
    }
}

/// Read access to the connected controllers.
pub trait GamepadSource {
    fn controller_count(&self) -> usize;
    fn axis(&self, controller: usize, axis: u8) -> i16;
    fn button(&self, controller: usize, button: u8) -> bool;
}

/// Used when gamepad support is disabled.
pub struct NoGamepads;

impl GamepadSource for NoGamepads {
    fn controller_count(&self) -> usize {
        0
    }

    fn axis(&self, _controller: usize, _axis: u8) -> i16 {
        0
    }

    fn button(&self, _controller: usize, _button: u8) -> bool {
        false
    }
}

/// Repeat delay and rate in frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct RepeatTiming {
    pub delay: u32,
    pub rate: u32,
}

impl RepeatTiming {
    /// Convert millisecond settings to frames, keeping `delay >= 2` and
    /// `1 <= rate < delay`.
    pub fn from_ms(delay_ms: u64, rate_ms: u64, frame_ms: f32) -> Self {
        let frames = |ms: u64| (ms as f32 / frame_ms.max(0.001)).round() as u32;
        let delay = frames(delay_ms).max(2);
        let rate = frames(rate_ms).clamp(1, delay - 1);
        Self { delay, rate }
    }
}

#[derive(Clone, Debug)]
pub struct GamepadControl {
    pub input: GamepadInput,
    pub command: Command,
    repeat: u32,
}

impl GamepadControl {
    pub fn new(input: GamepadInput, command: Command) -> Self {
        Self { input, command, repeat: 0 }
    }

    /// Advance the repeat counter by one frame. Returns true when the command fires.
    pub fn step(&mut self, active: bool, timing: RepeatTiming) -> bool {
        if !active {
            self.repeat = 0;
            return false;
        }
        self.repeat += 1;
        if self.repeat == 1 {
            return true;
        }
        if self.repeat >= timing.delay {
            self.repeat -= timing.rate;
            return true;
        }
        false
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Hotkey {
    pub key: i32,
    pub command: Command,
}

pub struct InputDispatcher {
    hotkeys: Vec<Hotkey>,
    controls: Vec<GamepadControl>,
    timing: RepeatTiming,
    deadzone: u16,
    gamepad_enabled: bool,
}

impl InputDispatcher {
    /// Build the dispatcher. `key_code` resolves a key name to a keycode;
    /// unknown keys, controls and commands are logged and skipped.
    pub fn from_config(config: &Config, key_code: impl Fn(&str) -> Option<i32>) -> Self {
        let mut hotkeys = Vec::with_capacity(config.hotkeys.len());
        for hk in &config.hotkeys {
            let Some(key) = key_code(&hk.key) else {
                log::error!("Hotkey '{}': unknown key name", hk.key);
                continue;
            };
            match Command::parse(&hk.command) {
                Ok(command) => hotkeys.push(Hotkey { key, command }),
                Err(e) => log::error!("Hotkey '{}': {}", hk.key, e),
            }
        }

        let pad = &config.gamepad;
        let mut controls = Vec::with_capacity(pad.controls.len());
        for c in &pad.controls {
            let parsed = c
                .control
                .parse::<GamepadInput>()
                .and_then(|input| Ok(GamepadControl::new(input, Command::parse(&c.command)?)));
            match parsed {
                Ok(control) => controls.push(control),
                Err(e) => log::error!("Gamepad control '{}': {}", c.control, e),
            }
        }

        let timing = RepeatTiming::from_ms(pad.repeat_delay_ms, pad.repeat_rate_ms, config.general.frame_period_ms());
        log::debug!(
            "Input: {} hotkeys, {} gamepad controls, repeat delay {} rate {} frames",
            hotkeys.len(),
            controls.len(),
            timing.delay,
            timing.rate
        );
        Self { hotkeys, controls, timing, deadzone: pad.deadzone, gamepad_enabled: pad.enabled }
    }

    pub fn timing(&self) -> RepeatTiming {
        self.timing
    }

    pub fn map_key(&self, key: i32) -> Option<Command> {
        self.hotkeys
            .iter()
            .find(|hk| hk.key == key)
            .map(|hk| hk.command.clone())
            .or_else(|| BUILTIN_KEYS.iter().find(|(k, _)| *k == key).map(|(_, c)| c.clone()))
    }

    /// Poll every control across all controllers. Each control fires at most
    /// once per frame, whichever controller activates it first.
    pub fn poll_gamepads(&mut self, pads: &dyn GamepadSource) -> Vec<Command> {
        let mut fired = Vec::new();
        if !self.gamepad_enabled {
            return fired;
        }
        let count = pads.controller_count();
        for control in &mut self.controls {
            let active = (0..count).any(|c| control.input.is_active(pads, c, self.deadzone));
            if control.step(active, self.timing) {
                fired.push(control.command.clone());
            }
        }
        fired
    }

    /// Forget held controls, e.g. after the launcher regains focus.
    pub fn reset_repeat(&mut self) {
        for control in &mut self.controls {
            control.repeat = 0;
        }
    }
}
