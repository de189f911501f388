//! SDL2 presentation backend: textures and fonts, draw-list playback, event
//! translation and game controllers.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use sdl2::controller::{Axis, Button, GameController};
use sdl2::event::{Event as SdlEvent, WindowEvent};
use sdl2::keyboard::Keycode;
use sdl2::messagebox::{show_simple_message_box, MessageBoxFlag};
use sdl2::mouse::MouseButton;
use sdl2::pixels::{Color as SdlColor, PixelFormatEnum};
use sdl2::rect::{Point, Rect as SdlRect};
use sdl2::render::{BlendMode, Texture, TextureCreator, WindowCanvas};
use sdl2::ttf::{Font, Sdl2TtfContext};
use sdl2::video::{Window, WindowContext};
use sdl2::GameControllerSubsystem;

use crate::app::Event;
use crate::assets::{
    decode_image, shrink_to_width, truncate_to_width, AssetLoader, FontSlot, PixelBuffer, TextStyle, TextureId,
    TextureInfo,
};
use crate::config::{Config, OversizeMode};
use crate::error::{LauncherError, Result};
use crate::geometry::Rect;
use crate::input::GamepadSource;
use crate::render::DrawCall;
use crate::style::Color;

const FONT_CANDIDATES: [&str; 3] = [
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/freefont/FreeSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
];

fn sdl_color(c: Color) -> SdlColor {
    SdlColor::RGBA(c.r, c.g, c.b, c.a)
}

fn sdl_rect(r: Rect) -> SdlRect {
    SdlRect::new(r.x, r.y, r.w, r.h)
}

/// Load `configured`, falling back to `FONT_PATH` and then the common system fonts.
pub fn load_font<'ttf>(ttf: &'ttf Sdl2TtfContext, configured: Option<&Path>, size: u16) -> Result<Font<'ttf, 'static>> {
    if let Some(path) = configured {
        match ttf.load_font(path, size) {
            Ok(font) => return Ok(font),
            Err(e) => log::error!("Font {} failed, falling back to a system font: {}", path.display(), e),
        }
    }
    let fallback = std::env::var("FONT_PATH")
        .ok()
        .map(PathBuf::from)
        .into_iter()
        .chain(FONT_CANDIDATES.iter().map(PathBuf::from))
        .find(|p| p.exists())
        .ok_or_else(|| {
            LauncherError::Font("no TTF font found; set font_path or install DejaVu/FreeSans or set FONT_PATH".into())
        })?;
    log::debug!("Using font {}", fallback.display());
    ttf.load_font(&fallback, size)
        .map_err(|e| LauncherError::Font(format!("{}: {}", fallback.display(), e)))
}

pub struct SdlAssets<'a, 'ttf> {
    creator: &'a TextureCreator<WindowContext>,
    title_font: Option<Font<'ttf, 'static>>,
    clock_font: Option<Font<'ttf, 'static>>,
    textures: HashMap<TextureId, Texture<'a>>,
    next_id: u32,
}

impl<'a, 'ttf> SdlAssets<'a, 'ttf> {
    /// Fonts are only loaded for the features that are enabled.
    pub fn new(creator: &'a TextureCreator<WindowContext>, ttf: &'ttf Sdl2TtfContext, config: &Config) -> Result<Self> {
        let title_font = if config.titles.enabled {
            Some(load_font(ttf, config.titles.font_path.as_deref(), config.titles.font_size)?)
        } else {
            None
        };
        let clock_font = if config.clock.enabled {
            Some(load_font(ttf, config.clock.font_path.as_deref(), config.clock.font_size)?)
        } else {
            None
        };
        Ok(Self { creator, title_font, clock_font, textures: HashMap::new(), next_id: 0 })
    }

    fn font(&self, slot: FontSlot) -> Option<&Font<'ttf, 'static>> {
        match slot {
            FontSlot::Title => self.title_font.as_ref(),
            FontSlot::Clock => self.clock_font.as_ref(),
        }
    }

    fn store(&mut self, mut texture: Texture<'a>, width: u32, height: u32) -> TextureInfo {
        texture.set_blend_mode(BlendMode::Blend);
        self.next_id += 1;
        let id = TextureId(self.next_id);
        self.textures.insert(id, texture);
        TextureInfo { id, width, height }
    }
}

impl AssetLoader for SdlAssets<'_, '_> {
    fn render_text(&mut self, text: &str, style: &TextStyle) -> Result<TextureInfo> {
        let (texture, w, h) = {
            let font = self
                .font(style.font)
                .ok_or_else(|| LauncherError::Font(format!("no font loaded for {:?}", style.font)))?;
            let mut text = if text.is_empty() { " ".to_string() } else { text.to_string() };
            if let (Some(max), OversizeMode::Truncate) = (style.max_width, style.oversize) {
                text = truncate_to_width(&text, max, |s| font.size_of(s).map(|(w, _)| w).unwrap_or(0));
            }
            let surface = font
                .render(&text)
                .blended(sdl_color(style.color))
                .map_err(|e| LauncherError::Font(e.to_string()))?;
            let (w, h) = (surface.width(), surface.height());
            let texture = self
                .creator
                .create_texture_from_surface(&surface)
                .map_err(|e| LauncherError::Sdl(e.to_string()))?;
            (texture, w, h)
        };
        let (w, h) = match (style.max_width, style.oversize) {
            (Some(max), OversizeMode::Shrink) => shrink_to_width(w, h, max),
            _ => (w, h),
        };
        Ok(self.store(texture, w, h))
    }

    fn load_texture(&mut self, path: &Path) -> Result<TextureInfo> {
        let pixels = decode_image(path)?;
        self.upload_pixels(&pixels)
    }

    fn upload_pixels(&mut self, pixels: &PixelBuffer) -> Result<TextureInfo> {
        // ABGR8888 is R,G,B,A in memory on little-endian
        let mut texture = self
            .creator
            .create_texture_static(PixelFormatEnum::ABGR8888, pixels.width, pixels.height)
            .map_err(|e| LauncherError::Sdl(e.to_string()))?;
        texture
            .update(None, &pixels.rgba, pixels.width as usize * 4)
            .map_err(|e| LauncherError::Sdl(e.to_string()))?;
        Ok(self.store(texture, pixels.width, pixels.height))
    }

    fn font_height(&self, font: FontSlot) -> u32 {
        self.font(font).map(|f| f.height().max(0) as u32).unwrap_or(0)
    }

    fn free(&mut self, id: TextureId) {
        self.textures.remove(&id);
    }
}

/// Replay a frame's draw list and present it.
pub fn present(canvas: &mut WindowCanvas, calls: &[DrawCall], assets: &mut SdlAssets) {
    for call in calls {
        match *call {
            DrawCall::Clear(color) => {
                canvas.set_draw_color(sdl_color(color));
                canvas.clear();
            }
            DrawCall::Texture { id, dst, alpha } => {
                if let Some(tex) = assets.textures.get_mut(&id) {
                    tex.set_alpha_mod(alpha);
                    if let Err(e) = canvas.copy(tex, None, sdl_rect(dst)) {
                        log::trace!("copy failed: {}", e);
                    }
                }
            }
            DrawCall::TextureMirrored { id, dst, alpha } => {
                if let Some(tex) = assets.textures.get_mut(&id) {
                    tex.set_alpha_mod(alpha);
                    if let Err(e) = canvas.copy_ex(tex, None, sdl_rect(dst), 0.0, None::<Point>, true, false) {
                        log::trace!("copy_ex failed: {}", e);
                    }
                }
            }
            DrawCall::FillRect { rect, color } => {
                canvas.set_blend_mode(BlendMode::Blend);
                canvas.set_draw_color(sdl_color(color));
                let _ = canvas.fill_rect(sdl_rect(rect));
            }
        }
    }
    canvas.present();
}

/// SDL keycode for a key name such as "F4" or "Escape".
pub fn key_code(name: &str) -> Option<i32> {
    Keycode::from_name(name).map(|k| k as i32)
}

pub fn translate_event(event: &SdlEvent) -> Option<Event> {
    match *event {
        SdlEvent::Quit { .. } => Some(Event::Quit),
        SdlEvent::KeyDown { keycode: Some(k), .. } => Some(Event::Key(k as i32)),
        SdlEvent::MouseMotion { x, y, .. } => Some(Event::MouseMotion { x, y }),
        SdlEvent::MouseButtonDown { mouse_btn: MouseButton::Left, x, y, .. } => Some(Event::MouseClick { x, y }),
        SdlEvent::Window { win_event: WindowEvent::FocusLost, .. } => Some(Event::FocusLost),
        SdlEvent::Window { win_event: WindowEvent::FocusGained, .. } => Some(Event::FocusGained),
        _ => None,
    }
}

const AXES: [Axis; 6] = [Axis::LeftX, Axis::LeftY, Axis::RightX, Axis::RightY, Axis::TriggerLeft, Axis::TriggerRight];
const BUTTONS: [Button; 15] = [
    Button::A,
    Button::B,
    Button::X,
    Button::Y,
    Button::Back,
    Button::Guide,
    Button::Start,
    Button::LeftStick,
    Button::RightStick,
    Button::LeftShoulder,
    Button::RightShoulder,
    Button::DPadUp,
    Button::DPadDown,
    Button::DPadLeft,
    Button::DPadRight,
];

/// Open game controllers. Kept alive here; SDL closes a controller when its handle drops.
pub struct SdlGamepads {
    subsystem: GameControllerSubsystem,
    controllers: Vec<GameController>,
}

impl SdlGamepads {
    pub fn new(subsystem: GameControllerSubsystem, mapping_file: Option<&Path>) -> Self {
        if let Some(path) = mapping_file {
            match subsystem.load_mappings(path) {
                Ok(n) => log::info!("Loaded {} controller mappings from {}", n, path.display()),
                Err(e) => log::error!("Controller mappings {} failed: {}", path.display(), e),
            }
        }
        let mut pads = Self { subsystem, controllers: Vec::new() };
        pads.reconnect();
        pads
    }

    /// Drop every handle and reopen whatever is connected now.
    pub fn reconnect(&mut self) {
        self.controllers.clear();
        let count = match self.subsystem.num_joysticks() {
            Ok(n) => n,
            Err(e) => {
                log::error!("Cannot enumerate joysticks: {}", e);
                return;
            }
        };
        for id in 0..count {
            if !self.subsystem.is_game_controller(id) {
                continue;
            }
            match self.subsystem.open(id) {
                Ok(gc) => {
                    log::info!("Opened controller: {}", gc.name());
                    self.controllers.push(gc);
                }
                Err(e) => log::error!("Failed opening controller {}: {}", id, e),
            }
        }
    }

    /// Handle hotplug events. Returns true if the event was consumed.
    pub fn handle_event(&mut self, event: &SdlEvent) -> bool {
        match event {
            SdlEvent::ControllerDeviceAdded { .. } | SdlEvent::ControllerDeviceRemoved { .. } => {
                log::debug!("Controller hotplug, reconnecting");
                self.reconnect();
                true
            }
            _ => false,
        }
    }
}

impl GamepadSource for SdlGamepads {
    fn controller_count(&self) -> usize {
        self.controllers.len()
    }

    fn axis(&self, controller: usize, axis: u8) -> i16 {
        match (self.controllers.get(controller), AXES.get(axis as usize)) {
            (Some(gc), Some(&a)) => gc.axis(a),
            _ => 0,
        }
    }

    fn button(&self, controller: usize, button: u8) -> bool {
        match (self.controllers.get(controller), BUTTONS.get(button as usize)) {
            (Some(gc), Some(&b)) => gc.button(b),
            _ => false,
        }
    }
}

pub fn show_error(message: &str) {
    if let Err(e) = show_simple_message_box(MessageBoxFlag::ERROR, "Kiosk Launcher", message, None::<&Window>) {
        log::error!("Could not show error dialog: {:?}", e);
    }
}
