//! Interface to the texture/text services the session draws with.
//!
//! The session never touches renderer handles directly: it asks an
//! [`AssetLoader`] for textures and refers to them by [`TextureId`] in the
//! draw list. Decoding helpers here are plain functions so worker threads can
//! call them without a render context.

use std::path::Path;

use image::imageops::{self, FilterType};

use crate::config::OversizeMode;
use crate::error::Result;
use crate::style::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TextureId(pub u32);

/// A texture plus the size it should be drawn at.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TextureInfo {
    pub id: TextureId,
    pub width: u32,
    pub height: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FontSlot {
    Title,
    Clock,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TextStyle {
    pub font: FontSlot,
    pub color: Color,
    pub max_width: Option<u32>,
    pub oversize: OversizeMode,
}

/// Tightly packed RGBA8 pixels produced off the render thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PixelBuffer {
    pub width: u32,
    pub height: u32,
    pub rgba: Vec<u8>,
}

pub trait AssetLoader {
    fn render_text(&mut self, text: &str, style: &TextStyle) -> Result<TextureInfo>;
    fn load_texture(&mut self, path: &Path) -> Result<TextureInfo>;
    fn upload_pixels(&mut self, pixels: &PixelBuffer) -> Result<TextureInfo>;
    fn font_height(&self, font: FontSlot) -> u32;
    fn free(&mut self, id: TextureId);
}

pub fn decode_image(path: &Path) -> Result<PixelBuffer> {
    let img = image::open(path)?.to_rgba8();
    let (width, height) = img.dimensions();
    Ok(PixelBuffer { width, height, rgba: img.into_raw() })
}

/// Decode `path` and scale it to cover a `width` x `height` screen, cropping the
/// overflow evenly on both sides.
pub fn decode_cover(path: &Path, width: u32, height: u32) -> Result<PixelBuffer> {
    let img = image::open(path)?.to_rgba8();
    let (iw, ih) = img.dimensions();
    let (sw, sh) = cover_size(iw, ih, width, height);
    let scaled = if (sw, sh) == (iw, ih) { img } else { imageops::resize(&img, sw, sh, FilterType::Triangle) };
    let x = (sw - width.min(sw)) / 2;
    let y = (sh - height.min(sh)) / 2;
    let cropped = imageops::crop_imm(&scaled, x, y, width.min(sw), height.min(sh)).to_image();
    let (w, h) = cropped.dimensions();
    Ok(PixelBuffer { width: w, height: h, rgba: cropped.into_raw() })
}

/// Smallest size with the image's aspect ratio that covers the target.
pub fn cover_size(iw: u32, ih: u32, tw: u32, th: u32) -> (u32, u32) {
    if iw == 0 || ih == 0 {
        return (tw, th);
    }
    let scale = f64::max(tw as f64 / iw as f64, th as f64 / ih as f64);
    let w = ((iw as f64 * scale).ceil() as u32).max(tw);
    let h = ((ih as f64 * scale).ceil() as u32).max(th);
    (w, h)
}

/// Longest prefix of `text` that fits `max_w` with a trailing ellipsis.
pub fn truncate_to_width(text: &str, max_w: u32, width_of: impl Fn(&str) -> u32) -> String {
    if width_of(text) <= max_w {
        return text.to_string();
    }
    let ell = "...";
    let chars: Vec<char> = text.chars().collect();
    let mut lo = 0usize;
    let mut hi = chars.len();
    while lo < hi {
        let mid = (lo + hi + 1) / 2;
        let cand: String = chars.iter().take(mid).collect::<String>() + ell;
        if width_of(&cand) <= max_w {
            lo = mid;
        } else {
            hi = mid - 1;
        }
    }
    let kept: String = chars.iter().take(lo).collect();
    kept.trim_end().to_string() + ell
}

/// Scale `(w, h)` down proportionally so the width fits `max_w`.
pub fn shrink_to_width(w: u32, h: u32, max_w: u32) -> (u32, u32) {
    if w <= max_w || w == 0 {
        return (w, h);
    }
    let h = (h as u64 * max_w as u64 / w as u64) as u32;
    (max_w, h.max(1))
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashSet;

    use super::*;
    use crate::error::LauncherError;

    /// In-memory loader: text is 10px per char, textures are 64x64 unless the
    /// path contains "missing".
    #[derive(Default)]
    pub struct FakeAssets {
        next_id: u32,
        pub live: HashSet<TextureId>,
        pub text_calls: Vec<String>,
        pub load_calls: usize,
        pub uploads: usize,
    }

    impl FakeAssets {
        fn alloc(&mut self, width: u32, height: u32) -> TextureInfo {
            self.next_id += 1;
            let id = TextureId(self.next_id);
            self.live.insert(id);
            TextureInfo { id, width, height }
        }
    }

    impl AssetLoader for FakeAssets {
        fn render_text(&mut self, text: &str, style: &TextStyle) -> Result<TextureInfo> {
            self.text_calls.push(text.to_string());
            let mut w = text.chars().count() as u32 * 10;
            let mut h = 20;
            if let Some(max) = style.max_width {
                match style.oversize {
                    OversizeMode::Truncate => w = w.min(max),
                    OversizeMode::Shrink => (w, h) = shrink_to_width(w, h, max),
                    OversizeMode::None => {}
                }
            }
            Ok(self.alloc(w, h))
        }

        fn load_texture(&mut self, path: &Path) -> Result<TextureInfo> {
            self.load_calls += 1;
            if path.to_string_lossy().contains("missing") {
                return Err(LauncherError::InvalidValue(format!("no such file {}", path.display())));
            }
            Ok(self.alloc(64, 64))
        }

        fn upload_pixels(&mut self, pixels: &PixelBuffer) -> Result<TextureInfo> {
            self.uploads += 1;
            Ok(self.alloc(pixels.width, pixels.height))
        }

        fn font_height(&self, _font: FontSlot) -> u32 {
            20
        }

        fn free(&mut self, id: TextureId) {
            self.live.remove(&id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ten_px(s: &str) -> u32 {
        s.chars().count() as u32 * 10
    }

    #[test]
    fn test_truncate_keeps_fitting_text() {
        assert_eq!(truncate_to_width("Kodi", 100, ten_px), "Kodi");
    }

    #[test]
    fn test_truncate_adds_ellipsis() {
        let out = truncate_to_width("Steam Big Picture", 100, ten_px);
        assert_eq!(out, "Steam B...");
        assert!(ten_px(&out) <= 100);
    }

    #[test]
    fn test_truncate_tiny_width() {
        assert_eq!(truncate_to_width("Anything", 20, ten_px), "...");
    }

    #[test]
    fn test_shrink_to_width() {
        assert_eq!(shrink_to_width(400, 40, 200), (200, 20));
        assert_eq!(shrink_to_width(100, 40, 200), (100, 40), "fitting sizes are untouched");
    }

    #[test]
    fn test_cover_size() {
        // 4:3 image onto a 16:9 screen is limited by width
        assert_eq!(cover_size(800, 600, 1920, 1080), (1920, 1440));
        // tall image onto a wide screen
        assert_eq!(cover_size(1000, 2000, 1000, 500), (1000, 2000));
        assert_eq!(cover_size(1920, 1080, 1920, 1080), (1920, 1080));
    }

    #[test]
    fn test_decode_cover_crops_to_screen() {
        let dir = std::env::temp_dir().join("kiosk_launcher_decode_cover");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("wide.png");
        image::RgbaImage::from_pixel(40, 10, image::Rgba([1, 2, 3, 255])).save(&path).unwrap();

        let buf = decode_cover(&path, 20, 20).unwrap();
        assert_eq!((buf.width, buf.height), (20, 20));
        assert_eq!(buf.rgba.len(), 20 * 20 * 4);
        for (got, want) in buf.rgba[..4].iter().zip([1u8, 2, 3, 255]) {
            assert!(got.abs_diff(want) <= 1, "uniform color survives scaling, got {}", got);
        }
    }
}
