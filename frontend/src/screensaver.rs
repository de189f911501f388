//! Idle dimming. The launcher reports how long the user has been idle each
//! frame; past the threshold a dark overlay fades in, and any input clears it.

use std::time::Duration;

use crate::config::Config;
use crate::style::Color;

const FADE_MS: f32 = 2_000.0;

/// Darkening overlay that fades in once the session has been idle long enough.
pub struct Screensaver {
    enabled: bool,
    idle_after: Duration,
    target: u32,
    rate: u32,
    alpha: u32,
    active: bool,
    pause_slideshow: bool,
}

impl Screensaver {
    pub fn from_config(config: &Config) -> Self {
        let ss = &config.screensaver;
        let target = ss.intensity.to_alpha() as u32;
        let frames = (FADE_MS / config.general.frame_period_ms()).max(1.0);
        let rate = ((target as f32 / frames).ceil() as u32).max(1);
        Self {
            enabled: ss.enabled,
            idle_after: Duration::from_secs(ss.idle_time_s),
            target,
            rate,
            alpha: 0,
            active: false,
            pause_slideshow: ss.pause_slideshow,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn pauses_slideshow(&self) -> bool {
        self.pause_slideshow
    }

    /// Advance one frame. Returns true on the frame the screensaver starts.
    pub fn tick(&mut self, idle_for: Duration) -> bool {
        if !self.enabled {
            return false;
        }
        if !self.active {
            if idle_for >= self.idle_after {
                log::info!("Screensaver on after {}s idle", idle_for.as_secs());
                self.active = true;
                self.alpha = 0;
                return true;
            }
            return false;
        }
        self.alpha = (self.alpha + self.rate).min(self.target);
        false
    }

    /// Any input. Returns true if the screensaver was showing.
    pub fn wake(&mut self) -> bool {
        let was_active = self.active;
        self.active = false;
        self.alpha = 0;
        was_active
    }

    pub fn overlay(&self) -> Option<Color> {
        (self.active && self.alpha > 0).then(|| Color::BLACK.with_alpha(self.alpha as u8))
    }
}
