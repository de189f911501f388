//! Frame composition and pacing.
//!
//! The session describes each frame as a list of [`DrawCall`]s in back to
//! front order; the presentation backend only replays them.

use std::time::{Duration, Instant};

use crate::assets::{TextureId, TextureInfo};
use crate::background::Background;
use crate::clock::Clock;
use crate::geometry::{Geometry, Rect};
use crate::menu::MenuGraph;
use crate::session::DrawMode;
use crate::style::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DrawCall {
    Clear(Color),
    Texture { id: TextureId, dst: Rect, alpha: u8 },
    /// Horizontally mirrored texture.
    TextureMirrored { id: TextureId, dst: Rect, alpha: u8 },
    /// Blended fill; the color's alpha is the opacity.
    FillRect { rect: Rect, color: Color },
}

/// Sleeps out the rest of each frame when vsync is off.
pub struct FramePacer {
    period: Duration,
    vsync: bool,
    frame_start: Instant,
}

impl FramePacer {
    pub fn new(fps: u32, vsync: bool, now: Instant) -> Self {
        Self { period: Duration::from_secs(1) / fps.max(1), vsync, frame_start: now }
    }

    /// Mark the start of a frame, returning the time since the previous one.
    pub fn begin(&mut self, now: Instant) -> Duration {
        let elapsed = now.saturating_duration_since(self.frame_start);
        self.frame_start = now;
        elapsed
    }

    /// How long to sleep before the next frame. `None` when the frame was
    /// presented with vsync, which already waited.
    pub fn padding(&self, now: Instant, presented: bool) -> Option<Duration> {
        if self.vsync && presented {
            return None;
        }
        self.period.checked_sub(now.saturating_duration_since(self.frame_start))
    }
}

/// Arrow icon drawn at the screen edges when more pages exist. The left one is mirrored.
pub struct ScrollIndicators {
    pub texture: TextureInfo,
    pub left: Rect,
    pub right: Rect,
}

impl ScrollIndicators {
    pub fn new(texture: TextureInfo, geometry: &Geometry) -> Self {
        let y = geometry.y_margin + (geometry.icon_size as i32 - texture.height as i32) / 2;
        let left = Rect::new(geometry.scroll_margin, y, texture.width, texture.height);
        let right_x = geometry.screen_width as i32 - geometry.scroll_margin - texture.width as i32;
        let right = Rect::new(right_x, y, texture.width, texture.height);
        Self { texture, left, right }
    }
}

/// Borrowed view of everything that appears in a frame.
pub struct Scene<'a> {
    pub mode: DrawMode,
    pub screen: Rect,
    pub blank_color: Color,
    pub background: &'a Background,
    pub overlay: Option<Color>,
    pub indicators: Option<&'a ScrollIndicators>,
    pub clock: Option<&'a Clock>,
    pub highlight: Option<Color>,
    pub title_alpha: u8,
    pub menu: &'a MenuGraph,
    pub screensaver: Option<Color>,
}

impl Scene<'_> {
    pub fn compose(&self) -> Vec<DrawCall> {
        let mut out = Vec::new();
        match self.mode {
            DrawMode::Hidden => return out,
            DrawMode::Blank => {
                out.push(DrawCall::Clear(self.blank_color));
                return out;
            }
            DrawMode::Normal => {}
        }

        self.background.draw(self.screen, &mut out);

        if let Some(color) = self.overlay {
            out.push(DrawCall::FillRect { rect: self.screen, color });
        }

        if let Some(ind) = self.indicators {
            if self.menu.has_more_left() {
                out.push(DrawCall::TextureMirrored { id: ind.texture.id, dst: ind.left, alpha: 255 });
            }
            if self.menu.has_more_right() {
                out.push(DrawCall::Texture { id: ind.texture.id, dst: ind.right, alpha: 255 });
            }
        }

        if let Some(clock) = self.clock {
            clock.draw(&mut out);
        }

        if let Some(color) = self.highlight {
            out.push(DrawCall::FillRect { rect: self.menu.highlight_rect(), color });
        }

        let highlighted = self.menu.highlight();
        for (slot, entry) in self.menu.visible() {
            let icon = match (slot == highlighted, entry.icon_selected) {
                (true, Some(selected)) => Some(selected),
                _ => entry.icon,
            };
            if let Some(tex) = icon {
                out.push(DrawCall::Texture { id: tex.id, dst: entry.icon_rect, alpha: 255 });
            }
            if let Some(tex) = entry.title_texture {
                out.push(DrawCall::Texture { id: tex.id, dst: entry.title_rect, alpha: self.title_alpha });
            }
        }

        if let Some(color) = self.screensaver {
            out.push(DrawCall::FillRect { rect: self.screen, color });
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::testing::FakeAssets;
    use crate::assets::{AssetLoader, FontSlot, TextStyle};
    use crate::config::{Config, EntryConfig, MenuConfig, OversizeMode};
    use std::path::PathBuf;

    const OVERLAY: Color = Color::rgb(1, 1, 1).with_alpha(128);
    const HIGHLIGHT: Color = Color::rgb(2, 2, 2).with_alpha(64);
    const SAVER: Color = Color::BLACK.with_alpha(100);

    struct Fixture {
        config: Config,
        background: Background,
        menu: MenuGraph,
        indicators: ScrollIndicators,
    }

    fn fixture(entries: usize) -> Fixture {
        let mut config = Config::default();
        config.menus = vec![MenuConfig {
            name: "main".to_string(),
            entries: (0..entries)
                .map(|i| EntryConfig {
                    title: format!("App {}", i),
                    icon: Some(PathBuf::from(format!("{}.png", i))),
                    icon_selected: (i == 0).then(|| PathBuf::from("selected.png")),
                    command: format!("app{}", i),
                })
                .collect(),
        }];
        let mut assets = FakeAssets::default();
        let geometry = Geometry::new(&config, 1920, 1080, 20);
        let style = TextStyle { font: FontSlot::Title, color: Color::WHITE, max_width: None, oversize: OversizeMode::None };
        let mut menu = MenuGraph::from_config(&config, geometry.clone(), Some(style));
        menu.load("main", false, true, &mut assets).unwrap();
        let background = Background::from_config(&config, (1920, 1080), &mut assets);
        let arrow = assets.load_texture(std::path::Path::new("arrow.png")).unwrap();
        let indicators = ScrollIndicators::new(arrow, &geometry);
        Fixture { config, background, menu, indicators }
    }

    fn scene<'a>(f: &'a Fixture, mode: DrawMode) -> Scene<'a> {
        Scene {
            mode,
            screen: Rect::new(0, 0, 1920, 1080),
            blank_color: Color::BLACK,
            background: &f.background,
            overlay: Some(OVERLAY),
            indicators: Some(&f.indicators),
            clock: None,
            highlight: Some(HIGHLIGHT),
            title_alpha: 200,
            menu: &f.menu,
            screensaver: Some(SAVER),
        }
    }

    #[test]
    fn test_draw_order() {
        let f = fixture(6);
        let calls = scene(&f, DrawMode::Normal).compose();

        assert_eq!(calls[0], DrawCall::Clear(f.config.background.color), "background first");
        assert!(matches!(calls[1], DrawCall::FillRect { color: OVERLAY, .. }));
        assert!(
            matches!(calls[2], DrawCall::Texture { dst, .. } if dst == f.indicators.right),
            "only the right arrow on the first page"
        );
        assert!(matches!(calls[3], DrawCall::FillRect { color: HIGHLIGHT, .. }));
        // 4 entries, icon + title each
        assert_eq!(calls.len(), 4 + 8 + 1);
        assert!(matches!(calls.last(), Some(DrawCall::FillRect { color: SAVER, .. })), "screensaver last");
    }

    #[test]
    fn test_selected_icon_used_for_highlighted_entry() {
        let f = fixture(2);
        let calls = scene(&f, DrawMode::Normal).compose();
        let first = f.menu.visible().next().unwrap().1;
        let icon_draw = calls
            .iter()
            .find_map(|c| match c {
                DrawCall::Texture { id, dst, .. } if *dst == first.icon_rect => Some(*id),
                _ => None,
            })
            .unwrap();
        assert_eq!(Some(icon_draw), first.icon_selected.map(|t| t.id));
    }

    #[test]
    fn test_indicators_follow_pages() {
        let mut f = fixture(6);
        for _ in 0..4 {
            f.menu.move_right();
        }
        let calls = scene(&f, DrawMode::Normal).compose();
        assert!(calls.iter().any(|c| matches!(c, DrawCall::TextureMirrored { .. })));
        assert!(!calls.iter().any(|c| matches!(c, DrawCall::Texture { dst, .. } if *dst == f.indicators.right)));

        let f = fixture(3);
        let calls = scene(&f, DrawMode::Normal).compose();
        assert!(!calls.iter().any(|c| matches!(c, DrawCall::TextureMirrored { .. })));
    }

    #[test]
    fn test_blank_and_hidden_modes() {
        let f = fixture(3);
        assert_eq!(scene(&f, DrawMode::Blank).compose(), [DrawCall::Clear(Color::BLACK)]);
        assert!(scene(&f, DrawMode::Hidden).compose().is_empty());
    }

    #[test]
    fn test_pacer_padding() {
        let start = Instant::now();
        let mut pacer = FramePacer::new(50, false, start);
        pacer.begin(start);
        assert_eq!(pacer.padding(start + Duration::from_millis(5), true), Some(Duration::from_millis(15)));
        assert_eq!(pacer.padding(start + Duration::from_millis(30), true), None, "late frames do not sleep");
        assert_eq!(pacer.begin(start + Duration::from_millis(25)), Duration::from_millis(25));

        let synced = FramePacer::new(50, true, start);
        assert_eq!(synced.padding(start, true), None);
        assert_eq!(synced.padding(start, false), Some(Duration::from_millis(20)), "hidden frames still pace");
    }
}
