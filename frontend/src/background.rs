//! Background layer: solid color, a single image, or a shuffled slideshow
//! whose frames are decoded on a worker and faded in on the render thread.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::{Duration, Instant};

use rand::seq::SliceRandom;
use rand::Rng;

use crate::assets::{decode_cover, AssetLoader, PixelBuffer, TextureInfo};
use crate::config::{BackgroundMode, Config};
use crate::geometry::{Rect, Ticks};
use crate::pipeline::{AssetTask, TaskStatus};
use crate::render::DrawCall;
use crate::scan::scan_images;
use crate::style::Color;

/// Worker output: the first image that decoded and how many candidates were tried.
pub struct SlideshowFrame {
    pub image: Option<PixelBuffer>,
    pub shown: Option<usize>,
    pub consumed: usize,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlideshowStatus {
    Active,
    /// A full pass over the images produced nothing usable.
    Exhausted,
    /// The first full pass decoded only one distinct image.
    SingleImage,
}

/// Alpha added per frame so a fade takes `transition_ms`.
pub fn transition_rate(transition_ms: u64, frame_ms: f32) -> u32 {
    let frames = transition_ms as f32 / frame_ms.max(0.001);
    if frames < 1.0 {
        return 255;
    }
    ((255.0 / frames).round() as u32).clamp(1, 255)
}

pub struct Slideshow {
    images: Vec<PathBuf>,
    order: Vec<usize>,
    cursor: usize,
    task: AssetTask<SlideshowFrame>,
    current: Option<TextureInfo>,
    incoming: Option<TextureInfo>,
    alpha: u32,
    rate: u32,
    duration: Duration,
    size: (u32, u32),
    paused: bool,
    /// Candidates tried and images decoded during the first pass. Cleared
    /// once two distinct images have decoded.
    first_pass: Option<(usize, HashSet<usize>)>,
}

impl Slideshow {
    pub fn new(images: Vec<PathBuf>, duration: Duration, rate: u32, size: (u32, u32)) -> Self {
        let mut order: Vec<usize> = (0..images.len()).collect();
        order.shuffle(&mut rand::thread_rng());
        Self {
            images,
            order,
            cursor: 0,
            task: AssetTask::new("slideshow"),
            current: None,
            incoming: None,
            alpha: 0,
            rate,
            duration,
            size,
            paused: false,
            first_pass: Some((0, HashSet::new())),
        }
    }

    /// Every image in display order starting at the cursor, wrapping once.
    pub fn candidates(&self) -> Vec<(usize, PathBuf)> {
        let n = self.order.len();
        (0..n)
            .map(|i| {
                let idx = self.order[(self.cursor + i) % n];
                (idx, self.images[idx].clone())
            })
            .collect()
    }

    /// Advance past `consumed` candidates, reshuffling at the end of each pass.
    /// A new pass never starts with the image that was just shown.
    pub fn commit(&mut self, consumed: usize, shown: Option<usize>) {
        let n = self.order.len();
        if n == 0 {
            return;
        }
        let mut rng = rand::thread_rng();
        for _ in 0..consumed {
            self.cursor += 1;
            if self.cursor >= n {
                self.cursor = 0;
                self.order.shuffle(&mut rng);
                if n > 1 && shown == Some(self.order[0]) {
                    let j = rng.gen_range(1..n);
                    self.order.swap(0, j);
                }
            }
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    pub fn task_status(&self) -> TaskStatus {
        self.task.status()
    }

    pub fn alpha(&self) -> u8 {
        self.alpha.min(255) as u8
    }

    /// Returns true once every image has been tried and only one decoded.
    fn record_first_pass(&mut self, consumed: usize, shown: Option<usize>) -> bool {
        let Some((tried, decoded)) = &mut self.first_pass else {
            return false;
        };
        *tried += consumed;
        decoded.extend(shown);
        if decoded.len() > 1 {
            self.first_pass = None;
            return false;
        }
        *tried >= self.images.len() && decoded.len() == 1
    }

    fn start_next(&mut self) {
        let candidates = self.candidates();
        let (w, h) = self.size;
        self.task.start(move || {
            let mut consumed = 0;
            for (idx, path) in candidates {
                consumed += 1;
                match decode_cover(&path, w, h) {
                    Ok(image) => return SlideshowFrame { image: Some(image), shown: Some(idx), consumed },
                    Err(e) => log::error!("Slideshow image {} failed: {}", path.display(), e),
                }
            }
            SlideshowFrame { image: None, shown: None, consumed }
        });
    }

    pub fn tick(&mut self, now: Instant, ticks: &mut Ticks, assets: &mut dyn AssetLoader) -> SlideshowStatus {
        if let Some(incoming) = self.incoming {
            self.alpha = (self.alpha + self.rate).min(255);
            if self.alpha >= 255 {
                if let Some(old) = self.current.replace(incoming) {
                    assets.free(old.id);
                }
                self.incoming = None;
                self.alpha = 0;
                ticks.last_background = now;
            }
            return SlideshowStatus::Active;
        }

        if self.task.status() == TaskStatus::Ready {
            let Some(frame) = self.task.take() else {
                return SlideshowStatus::Active;
            };
            self.commit(frame.consumed, frame.shown);
            let single = self.record_first_pass(frame.consumed, frame.shown);
            let Some(pixels) = frame.image else {
                log::error!("No slideshow image could be loaded");
                return SlideshowStatus::Exhausted;
            };
            if single && self.current.is_some() {
                return SlideshowStatus::SingleImage;
            }
            match assets.upload_pixels(&pixels) {
                Ok(tex) if self.current.is_none() => {
                    self.current = Some(tex);
                    ticks.last_background = now;
                    if single {
                        return SlideshowStatus::SingleImage;
                    }
                }
                Ok(tex) => {
                    self.incoming = Some(tex);
                    self.alpha = 0;
                }
                Err(e) => log::error!("Slideshow upload failed: {}", e),
            }
            return SlideshowStatus::Active;
        }

        let due = self.current.is_none() || now.duration_since(ticks.last_background) >= self.duration;
        if due && !self.paused && self.task.is_idle() {
            self.start_next();
        }
        SlideshowStatus::Active
    }

    fn draw(&self, screen: Rect, out: &mut Vec<DrawCall>) {
        if let Some(cur) = self.current {
            out.push(DrawCall::Texture { id: cur.id, dst: screen, alpha: 255 });
        }
        if let Some(inc) = self.incoming {
            out.push(DrawCall::Texture { id: inc.id, dst: screen, alpha: self.alpha() });
        }
    }

    fn release(&mut self, assets: &mut dyn AssetLoader) {
        for tex in [self.current.take(), self.incoming.take()].into_iter().flatten() {
            assets.free(tex.id);
        }
    }
}

pub enum BackgroundKind {
    Color,
    Image(TextureInfo),
    Slideshow(Slideshow),
}

pub struct Background {
    color: Color,
    kind: BackgroundKind,
}

impl Background {
    /// Build the configured background, downgrading to a single image or the
    /// plain color when images are missing or unreadable.
    pub fn from_config(config: &Config, screen: (u32, u32), assets: &mut dyn AssetLoader) -> Self {
        let bg = &config.background;
        let color = bg.color;
        let single = |path: &PathBuf, assets: &mut dyn AssetLoader| -> BackgroundKind {
            match decode_cover(path, screen.0, screen.1).and_then(|px| assets.upload_pixels(&px)) {
                Ok(tex) => BackgroundKind::Image(tex),
                Err(e) => {
                    log::error!("Background image {} failed: {}", path.display(), e);
                    BackgroundKind::Color
                }
            }
        };

        let kind = match bg.mode {
            BackgroundMode::Color => BackgroundKind::Color,
            BackgroundMode::Image => match &bg.image {
                Some(path) => single(path, assets),
                None => {
                    log::error!("Background mode is image but no image is set");
                    BackgroundKind::Color
                }
            },
            BackgroundMode::Slideshow => match &bg.slideshow_directory {
                None => {
                    log::error!("Background mode is slideshow but no directory is set");
                    BackgroundKind::Color
                }
                Some(dir) => {
                    let images = scan_images(dir);
                    match images.len() {
                        0 => {
                            log::error!("No images found in {}", dir.display());
                            BackgroundKind::Color
                        }
                        1 => {
                            log::info!("Only one slideshow image, using it as a static background");
                            single(&images[0], assets)
                        }
                        n => {
                            log::info!("Slideshow with {} images", n);
                            let rate =
                                transition_rate(bg.slideshow_transition_time_ms, config.general.frame_period_ms());
                            BackgroundKind::Slideshow(Slideshow::new(
                                images,
                                Duration::from_millis(bg.slideshow_image_duration_ms),
                                rate,
                                screen,
                            ))
                        }
                    }
                }
            },
        };
        Self { color, kind }
    }

    pub fn kind(&self) -> &BackgroundKind {
        &self.kind
    }

    pub fn slideshow_mut(&mut self) -> Option<&mut Slideshow> {
        match &mut self.kind {
            BackgroundKind::Slideshow(show) => Some(show),
            _ => None,
        }
    }

    pub fn set_paused(&mut self, paused: bool) {
        if let Some(show) = self.slideshow_mut() {
            show.set_paused(paused);
        }
    }

    pub fn tick(&mut self, now: Instant, ticks: &mut Ticks, assets: &mut dyn AssetLoader) {
        let BackgroundKind::Slideshow(show) = &mut self.kind else { return };
        match show.tick(now, ticks, assets) {
            SlideshowStatus::Active => return,
            SlideshowStatus::Exhausted => log::warn!("Slideshow disabled"),
            SlideshowStatus::SingleImage => log::info!("Only one slideshow image loads, using it as a static background"),
        }
        self.kind = match show.current.take() {
            Some(tex) => BackgroundKind::Image(tex),
            None => BackgroundKind::Color,
        };
    }

    pub fn draw(&self, screen: Rect, out: &mut Vec<DrawCall>) {
        out.push(DrawCall::Clear(self.color));
        match &self.kind {
            BackgroundKind::Color => {}
            BackgroundKind::Image(tex) => out.push(DrawCall::Texture { id: tex.id, dst: screen, alpha: 255 }),
            BackgroundKind::Slideshow(show) => show.draw(screen, out),
        }
    }

    pub fn release(&mut self, assets: &mut dyn AssetLoader) {
        match &mut self.kind {
            BackgroundKind::Color => {}
            BackgroundKind::Image(tex) => assets.free(tex.id),
            BackgroundKind::Slideshow(show) => show.release(assets),
        }
        self.kind = BackgroundKind::Color;
    }
}
