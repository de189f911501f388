//! On-screen clock.
//!
//! A worker formats the current time once per refresh interval. The render
//! thread only rebuilds the text textures when the formatted strings change,
//! since font rasterization has to stay on the thread that owns the fonts.

use std::time::{Duration, Instant};

use chrono::{Local, NaiveDateTime};

use crate::assets::{AssetLoader, TextStyle, TextureInfo};
use crate::config::{ClockAlignment, ClockConfig, DateFormat, TimeFormat};
use crate::geometry::{Geometry, Rect, Ticks};
use crate::pipeline::AssetTask;
use crate::render::DrawCall;

const MAX_CHARS: usize = 20;
const REFRESH: Duration = Duration::from_secs(1);

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClockFace {
    pub time: String,
    pub date: Option<String>,
}

#[derive(Clone, Copy, Debug)]
pub struct ClockFormat {
    pub time: TimeFormat,
    pub date: DateFormat,
    pub show_date: bool,
}

impl From<&ClockConfig> for ClockFormat {
    fn from(cfg: &ClockConfig) -> Self {
        Self { time: cfg.time_format, date: cfg.date_format, show_date: cfg.show_date }
    }
}

fn clip(mut s: String) -> String {
    if let Some((idx, _)) = s.char_indices().nth(MAX_CHARS) {
        s.truncate(idx);
    }
    s
}

pub fn format_face(now: NaiveDateTime, format: ClockFormat) -> ClockFace {
    let time = match format.time {
        TimeFormat::TwentyFourHour => now.format("%H:%M"),
        TimeFormat::TwelveHour => now.format("%-I:%M %p"),
    };
    let date = format.show_date.then(|| {
        let fmt = match format.date {
            DateFormat::LittleEndian => "%d/%m/%Y",
            DateFormat::BigEndian => "%m/%d/%Y",
        };
        clip(now.format(fmt).to_string())
    });
    ClockFace { time: clip(time.to_string()), date }
}

fn local_now() -> NaiveDateTime {
    Local::now().naive_local()
}

pub struct Clock {
    format: ClockFormat,
    style: TextStyle,
    alpha: u8,
    alignment: ClockAlignment,
    margin: i32,
    screen_width: u32,
    source: fn() -> NaiveDateTime,
    task: AssetTask<ClockFace>,
    face: Option<ClockFace>,
    time_tex: Option<TextureInfo>,
    date_tex: Option<TextureInfo>,
    time_rect: Rect,
    date_rect: Rect,
}

impl Clock {
    pub fn new(cfg: &ClockConfig, style: TextStyle, geometry: &Geometry) -> Self {
        Self {
            format: ClockFormat::from(cfg),
            style,
            alpha: cfg.opacity.to_alpha(),
            alignment: cfg.alignment,
            margin: geometry.clock_margin,
            screen_width: geometry.screen_width,
            source: local_now,
            task: AssetTask::new("clock"),
            face: None,
            time_tex: None,
            date_tex: None,
            time_rect: Rect::default(),
            date_rect: Rect::default(),
        }
    }

    pub fn face(&self) -> Option<&ClockFace> {
        self.face.as_ref()
    }

    pub fn tick(&mut self, now: Instant, ticks: &mut Ticks, assets: &mut dyn AssetLoader) {
        if let Some(face) = self.task.take() {
            if self.face.as_ref() != Some(&face) {
                self.render(&face, assets);
                self.face = Some(face);
            }
            return;
        }
        let due = ticks.last_clock.map_or(true, |last| now.saturating_duration_since(last) >= REFRESH);
        if due && self.task.is_idle() {
            let (source, format) = (self.source, self.format);
            if self.task.start(move || format_face(source(), format)) {
                ticks.last_clock = Some(now);
            }
        }
    }

    fn render(&mut self, face: &ClockFace, assets: &mut dyn AssetLoader) {
        for tex in [self.time_tex.take(), self.date_tex.take()].into_iter().flatten() {
            assets.free(tex.id);
        }
        self.time_tex = assets
            .render_text(&face.time, &self.style)
            .map_err(|e| log::error!("Clock render failed: {}", e))
            .ok();
        if let Some(date) = &face.date {
            self.date_tex = assets
                .render_text(date, &self.style)
                .map_err(|e| log::error!("Clock date render failed: {}", e))
                .ok();
        }
        self.layout();
        log::trace!("Clock now {:?}", face);
    }

    fn layout(&mut self) {
        let x_for = |w: u32| match self.alignment {
            ClockAlignment::Left => self.margin,
            ClockAlignment::Right => self.screen_width as i32 - self.margin - w as i32,
        };
        let mut y = self.margin;
        if let Some(t) = self.time_tex {
            self.time_rect = Rect::new(x_for(t.width), y, t.width, t.height);
            y += t.height as i32;
        }
        if let Some(d) = self.date_tex {
            self.date_rect = Rect::new(x_for(d.width), y, d.width, d.height);
        }
    }

    pub fn draw(&self, out: &mut Vec<DrawCall>) {
        if let Some(t) = self.time_tex {
            out.push(DrawCall::Texture { id: t.id, dst: self.time_rect, alpha: self.alpha });
        }
        if let Some(d) = self.date_tex {
            out.push(DrawCall::Texture { id: d.id, dst: self.date_rect, alpha: self.alpha });
        }
    }

    pub fn release(&mut self, assets: &mut dyn AssetLoader) {
        self.task.wait();
        for tex in [self.time_tex.take(), self.date_tex.take()].into_iter().flatten() {
            assets.free(tex.id);
        }
        self.face = None;
    }
}
