//! Suspend/resume around launched applications.
//!
//! `Idle` is the only interactive state. Starting an application moves to
//! `Launching`; losing window focus confirms the application took over
//! (`Running`). Regaining focus or the application exiting resumes. A launch
//! that never steals focus falls back to `Idle` after the timeout.

use std::time::{Duration, Instant};

use crate::config::OnLaunch;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Launching { since: Instant },
    Running,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    Launched,
    FocusLost,
    FocusGained,
    /// The most recently launched application exited.
    AppExited,
    Tick,
}

/// What the caller has to act on after an event.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Unchanged,
    Launching,
    Running,
    /// The launch timed out; restore the normal frame.
    TimedOut,
    /// Focus came back; rebaseline timers and reconnect input devices.
    Resumed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawMode {
    Normal,
    Blank,
    Hidden,
}

pub struct SessionStateMachine {
    state: SessionState,
    timeout: Duration,
    on_launch: OnLaunch,
}

impl SessionStateMachine {
    pub fn new(timeout: Duration, on_launch: OnLaunch) -> Self {
        Self { state: SessionState::Idle, timeout, on_launch }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn on_launch(&self) -> OnLaunch {
        self.on_launch
    }

    pub fn is_interactive(&self) -> bool {
        self.state == SessionState::Idle
    }

    pub fn draw_mode(&self) -> DrawMode {
        if self.is_interactive() {
            return DrawMode::Normal;
        }
        match self.on_launch {
            OnLaunch::None => DrawMode::Normal,
            OnLaunch::Blank => DrawMode::Blank,
            OnLaunch::Hide => DrawMode::Hidden,
        }
    }

    pub fn handle(&mut self, event: SessionEvent, now: Instant) -> Transition {
        let (next, transition) = match (self.state, event) {
            (SessionState::Idle, SessionEvent::Launched) => {
                (SessionState::Launching { since: now }, Transition::Launching)
            }
            (SessionState::Launching { .. }, SessionEvent::FocusLost) => (SessionState::Running, Transition::Running),
            (SessionState::Launching { since }, SessionEvent::Tick)
                if now.saturating_duration_since(since) >= self.timeout =>
            {
                (SessionState::Idle, Transition::TimedOut)
            }
            (SessionState::Running, SessionEvent::FocusGained) => (SessionState::Idle, Transition::Resumed),
            // a hidden window never regains focus
            (SessionState::Launching { .. } | SessionState::Running, SessionEvent::AppExited) => {
                (SessionState::Idle, Transition::Resumed)
            }
            (state, _) => (state, Transition::Unchanged),
        };
        if transition != Transition::Unchanged {
            log::info!("Session {:?} -> {:?} ({:?})", self.state, next, event);
        }
        self.state = next;
        transition
    }
}
