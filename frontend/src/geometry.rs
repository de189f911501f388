use std::time::Instant;

use serde::Deserialize;

use crate::config::Config;
use crate::error::LauncherError;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub w: u32,
    pub h: u32,
}

impl Rect {
    pub const fn new(x: i32, y: i32, w: u32, h: u32) -> Self {
        Self { x, y, w, h }
    }

    pub fn contains(&self, px: i32, py: i32) -> bool {
        px >= self.x && py >= self.y && px < self.x + self.w as i32 && py < self.y + self.h as i32
    }

    pub fn shifted(self, dx: i32) -> Self {
        Self { x: self.x + dx, ..self }
    }
}

/// A size setting: either absolute pixels or a fraction of some reference
/// dimension. Resolved once at startup, never re-parsed at runtime.
#[derive(Deserialize, Clone, Copy, Debug, PartialEq)]
#[serde(try_from = "RawLength")]
pub enum Length {
    Pixels(i32),
    Percent(f32),
}

impl Length {
    pub fn resolve(self, total: u32) -> i32 {
        match self {
            Length::Pixels(px) => px,
            Length::Percent(pct) => (total as f32 * pct / 100.0).round() as i32,
        }
    }

    /// Resolve against 255 and clamp, for opacity / intensity settings.
    pub fn to_alpha(self) -> u8 {
        self.resolve(255).clamp(0, 255) as u8
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawLength {
    Pixels(i64),
    Text(String),
}

impl TryFrom<RawLength> for Length {
    type Error = LauncherError;

    fn try_from(raw: RawLength) -> Result<Self, Self::Error> {
        match raw {
            RawLength::Pixels(px) => i32::try_from(px)
                .map(Length::Pixels)
                .map_err(|_| LauncherError::InvalidValue(format!("length {} out of range", px))),
            RawLength::Text(text) => parse_length(&text),
        }
    }
}

fn parse_length(text: &str) -> Result<Length, LauncherError> {
    let t = text.trim();
    let invalid = || LauncherError::InvalidValue(format!("invalid length '{}'", text));
    if let Some(pct) = t.strip_suffix('%') {
        let value: f32 = pct.trim().parse().map_err(|_| invalid())?;
        return Ok(Length::Percent(value));
    }
    let px = t.strip_suffix("px").unwrap_or(t).trim();
    px.parse::<i32>().map(Length::Pixels).map_err(|_| invalid())
}

/// Layout constants derived from the screen resolution and the layout settings.
#[derive(Clone, Debug, PartialEq)]
pub struct Geometry {
    pub screen_width: u32,
    pub screen_height: u32,
    pub icon_size: u32,
    pub button_spacing: i32,
    pub max_buttons: usize,
    /// Top of the icon row.
    pub y_margin: i32,
    pub highlight_padding: i32,
    pub title_padding: i32,
    /// Height of a title line, zero when titles are disabled.
    pub title_height: i32,
    pub title_max_width: u32,
    pub clock_margin: i32,
    pub scroll_margin: i32,
}

impl Geometry {
    pub fn new(config: &Config, screen_width: u32, screen_height: u32, title_height: u32) -> Self {
        let layout = &config.layout;
        let icon_size = layout.icon_size.max(1);
        let button_spacing = layout.button_spacing.resolve(screen_width).max(0);
        let title_padding = if config.titles.enabled { config.titles.padding.resolve(icon_size) } else { 0 };
        let title_height = if config.titles.enabled { title_height as i32 } else { 0 };
        let block_height = icon_size as i32 + title_padding + title_height;
        let y_margin = (screen_height as i32 - block_height) / 2
            + layout.vertical_offset.resolve(screen_height);

        Self {
            screen_width,
            screen_height,
            icon_size,
            button_spacing,
            max_buttons: layout.max_buttons.max(1),
            y_margin,
            highlight_padding: layout.highlight_padding.resolve(icon_size).max(0),
            title_padding,
            title_height,
            title_max_width: icon_size + (button_spacing / 2) as u32,
            clock_margin: config.clock.margin.resolve(screen_height),
            scroll_margin: config.scroll_indicators.margin.resolve(screen_width),
        }
    }

    /// Distance between the left edges of two neighbouring buttons.
    pub fn button_advance(&self) -> i32 {
        self.icon_size as i32 + self.button_spacing
    }

    /// Left edge of the first button when `buttons` buttons are centered on screen.
    pub fn x_margin(&self, buttons: usize) -> i32 {
        let n = buttons.max(1) as i32;
        let row = n * self.icon_size as i32 + (n - 1) * self.button_spacing;
        (self.screen_width as i32 - row) / 2
    }

    pub fn icon_rect(&self, slot: usize, buttons: usize) -> Rect {
        let x = self.x_margin(buttons) + slot as i32 * self.button_advance();
        Rect::new(x, self.y_margin, self.icon_size, self.icon_size)
    }

    /// Centered under the icon; `offset` recenters a shrunken title vertically.
    pub fn title_rect(&self, icon: Rect, width: u32, height: u32, offset: i32) -> Rect {
        let x = icon.x + (icon.w as i32 - width as i32) / 2;
        let y = icon.y + icon.h as i32 + self.title_padding + offset;
        Rect::new(x, y, width, height)
    }

    pub fn highlight_rect(&self, icon: Rect) -> Rect {
        let pad = self.highlight_padding;
        let title_extra = if self.title_height > 0 { self.title_padding + self.title_height } else { 0 };
        Rect::new(
            icon.x - pad,
            icon.y - pad,
            (icon.w as i32 + 2 * pad) as u32,
            (icon.h as i32 + 2 * pad + title_extra) as u32,
        )
    }

    pub fn screen_rect(&self) -> Rect {
        Rect::new(0, 0, self.screen_width, self.screen_height)
    }
}

/// Monotonic timestamps shared by the session components.
#[derive(Clone, Copy, Debug)]
pub struct Ticks {
    pub frame_start: Instant,
    pub last_input: Instant,
    pub last_launch: Option<Instant>,
    pub last_background: Instant,
    /// `None` forces a clock refresh on the next frame.
    pub last_clock: Option<Instant>,
}

impl Ticks {
    pub fn new(now: Instant) -> Self {
        Self {
            frame_start: now,
            last_input: now,
            last_launch: None,
            last_background: now,
            last_clock: None,
        }
    }

    /// Restart every timer after the launcher regains focus so nothing fires
    /// immediately from a stale timestamp.
    pub fn rebaseline(&mut self, now: Instant) {
        self.frame_start = now;
        self.last_input = now;
        self.last_background = now;
        self.last_clock = None;
    }
}
