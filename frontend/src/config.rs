use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::{LauncherError, Result};
use crate::geometry::Length;
use crate::style::Color;

const APP_DIR: &str = "kiosk_launcher";

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Config {
    pub default_menu: String,
    pub general: General,
    pub layout: Layout,
    pub background: BackgroundConfig,
    pub titles: TitleConfig,
    pub highlight: HighlightConfig,
    pub clock: ClockConfig,
    pub screensaver: ScreensaverConfig,
    pub scroll_indicators: ScrollIndicatorConfig,
    pub gamepad: GamepadConfig,
    pub hotkeys: Vec<HotkeyConfig>,
    pub menus: Vec<MenuConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_menu: "main".to_string(),
            general: General::default(),
            layout: Layout::default(),
            background: BackgroundConfig::default(),
            titles: TitleConfig::default(),
            highlight: HighlightConfig::default(),
            clock: ClockConfig::default(),
            screensaver: ScreensaverConfig::default(),
            scroll_indicators: ScrollIndicatorConfig::default(),
            gamepad: GamepadConfig::default(),
            hotkeys: Vec::new(),
            menus: Vec::new(),
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OnLaunch {
    /// Keep drawing the menu while the application runs.
    None,
    /// Hide the launcher window.
    Hide,
    /// Replace the frame with a solid fill.
    #[default]
    Blank,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct General {
    pub fps: u32,
    pub vsync: bool,
    pub wrap_entries: bool,
    pub reset_on_back: bool,
    pub mouse_select: bool,
    pub inhibit_os_screensaver: bool,
    pub on_launch: OnLaunch,
    pub application_timeout_ms: u64,
    pub startup_command: Option<String>,
    pub quit_command: Option<String>,
}

impl Default for General {
    fn default() -> Self {
        Self {
            fps: 60,
            vsync: true,
            wrap_entries: false,
            reset_on_back: false,
            mouse_select: false,
            inhibit_os_screensaver: true,
            on_launch: OnLaunch::Blank,
            application_timeout_ms: 15_000,
            startup_command: None,
            quit_command: None,
        }
    }
}

impl General {
    pub fn frame_period_ms(&self) -> f32 {
        1000.0 / self.fps.max(1) as f32
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct Layout {
    pub max_buttons: usize,
    pub icon_size: u32,
    pub button_spacing: Length,
    pub vertical_offset: Length,
    pub highlight_padding: Length,
}

impl Default for Layout {
    fn default() -> Self {
        Self {
            max_buttons: 4,
            icon_size: 256,
            button_spacing: Length::Percent(5.0),
            vertical_offset: Length::Pixels(0),
            highlight_padding: Length::Pixels(20),
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum BackgroundMode {
    #[default]
    Color,
    Image,
    Slideshow,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct BackgroundConfig {
    pub mode: BackgroundMode,
    pub color: Color,
    pub image: Option<PathBuf>,
    pub slideshow_directory: Option<PathBuf>,
    pub slideshow_image_duration_ms: u64,
    pub slideshow_transition_time_ms: u64,
    pub overlay: bool,
    pub overlay_color: Color,
    pub overlay_opacity: Length,
}

impl Default for BackgroundConfig {
    fn default() -> Self {
        Self {
            mode: BackgroundMode::Color,
            color: Color::rgb(0x1a, 0x1a, 0x2e),
            image: None,
            slideshow_directory: None,
            slideshow_image_duration_ms: 30_000,
            slideshow_transition_time_ms: 3_000,
            overlay: false,
            overlay_color: Color::BLACK,
            overlay_opacity: Length::Percent(50.0),
        }
    }
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum OversizeMode {
    #[default]
    Truncate,
    Shrink,
    None,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct TitleConfig {
    pub enabled: bool,
    pub font_path: Option<PathBuf>,
    pub font_size: u16,
    pub color: Color,
    pub opacity: Length,
    pub oversize_mode: OversizeMode,
    pub padding: Length,
}

impl Default for TitleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            font_path: None,
            font_size: 36,
            color: Color::WHITE,
            opacity: Length::Percent(100.0),
            oversize_mode: OversizeMode::Truncate,
            padding: Length::Pixels(20),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct HighlightConfig {
    pub enabled: bool,
    pub color: Color,
    pub opacity: Length,
}

impl Default for HighlightConfig {
    fn default() -> Self {
        Self { enabled: true, color: Color::WHITE, opacity: Length::Percent(25.0) }
    }
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ClockAlignment {
    Left,
    #[default]
    Right,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum TimeFormat {
    #[default]
    #[serde(rename = "24h")]
    TwentyFourHour,
    #[serde(rename = "12h")]
    TwelveHour,
}

#[derive(Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    /// day/month/year
    #[default]
    LittleEndian,
    /// month/day/year
    BigEndian,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ClockConfig {
    pub enabled: bool,
    pub font_path: Option<PathBuf>,
    pub font_size: u16,
    pub color: Color,
    pub opacity: Length,
    pub show_date: bool,
    pub alignment: ClockAlignment,
    pub time_format: TimeFormat,
    pub date_format: DateFormat,
    pub margin: Length,
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            font_path: None,
            font_size: 40,
            color: Color::WHITE,
            opacity: Length::Percent(100.0),
            show_date: false,
            alignment: ClockAlignment::Right,
            time_format: TimeFormat::TwentyFourHour,
            date_format: DateFormat::LittleEndian,
            margin: Length::Percent(5.0),
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ScreensaverConfig {
    pub enabled: bool,
    pub idle_time_s: u64,
    pub intensity: Length,
    pub pause_slideshow: bool,
}

impl Default for ScreensaverConfig {
    fn default() -> Self {
        Self { enabled: false, idle_time_s: 300, intensity: Length::Percent(70.0), pause_slideshow: true }
    }
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct ScrollIndicatorConfig {
    pub enabled: bool,
    pub icon: Option<PathBuf>,
    pub margin: Length,
}

impl Default for ScrollIndicatorConfig {
    fn default() -> Self {
        Self { enabled: false, icon: None, margin: Length::Percent(2.0) }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct ControlConfig {
    pub control: String,
    pub command: String,
}

#[derive(Deserialize, Clone, Debug)]
#[serde(default)]
pub struct GamepadConfig {
    pub enabled: bool,
    pub mapping_file: Option<PathBuf>,
    pub deadzone: u16,
    pub repeat_delay_ms: u64,
    pub repeat_rate_ms: u64,
    pub controls: Vec<ControlConfig>,
}

impl Default for GamepadConfig {
    fn default() -> Self {
        let control = |control: &str, command: &str| ControlConfig {
            control: control.to_string(),
            command: command.to_string(),
        };
        Self {
            enabled: true,
            mapping_file: None,
            deadzone: 10_000,
            repeat_delay_ms: 500,
            repeat_rate_ms: 100,
            controls: vec![
                control("LStickX-", ":left"),
                control("LStickX+", ":right"),
                control("ButtonDPadLeft", ":left"),
                control("ButtonDPadRight", ":right"),
                control("ButtonA", ":select"),
                control("ButtonB", ":back"),
            ],
        }
    }
}

#[derive(Deserialize, Clone, Debug)]
pub struct HotkeyConfig {
    pub key: String,
    pub command: String,
}

#[derive(Deserialize, Clone, Debug)]
pub struct MenuConfig {
    pub name: String,
    #[serde(default)]
    pub entries: Vec<EntryConfig>,
}

#[derive(Deserialize, Clone, Debug)]
pub struct EntryConfig {
    pub title: String,
    pub icon: Option<PathBuf>,
    pub icon_selected: Option<PathBuf>,
    pub command: String,
}

pub fn user_config_path() -> Option<PathBuf> {
    if let Ok(xdg) = std::env::var("XDG_CONFIG_HOME") {
        let mut p = PathBuf::from(xdg);
        p.push(APP_DIR);
        p.push("config.toml");
        Some(p)
    } else if let Some(home) = dirs::home_dir() {
        let mut p = home;
        p.push(".config");
        p.push(APP_DIR);
        p.push("config.toml");
        Some(p)
    } else {
        None
    }
}

fn write_default_config(path: &Path) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp = path.with_extension("toml.tmp");
    std::fs::write(&tmp, SAMPLE_CONFIG.as_bytes())?;
    std::fs::rename(&tmp, path)?;
    Ok(())
}

pub const SAMPLE_CONFIG: &str = include_str!("../config.sample.toml");

pub fn parse_config(contents: &str) -> Result<Config> {
    Ok(toml::from_str::<Config>(contents)?)
}

/// Load the config from `explicit` or from the per-user location, writing the
/// bundled sample there on first run.
pub fn load_config(explicit: Option<&Path>) -> Result<Config> {
    let path = match explicit {
        Some(p) => p.to_path_buf(),
        None => {
            let p = user_config_path()
                .ok_or_else(|| LauncherError::InvalidValue("no config path available".into()))?;
            if !p.exists() {
                log::info!("Writing default config to {}", p.display());
                if let Err(e) = write_default_config(&p) {
                    log::error!("Failed to write default config: {}", e);
                }
            }
            p
        }
    };
    let contents = std::fs::read_to_string(&path)
        .map_err(|source| LauncherError::Config { path: path.clone(), source })?;
    let config = parse_config(&contents)?;
    log::info!("Loaded config from {} ({} menus)", path.display(), config.menus.len());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_config_parses() {
        let config = parse_config(SAMPLE_CONFIG).expect("bundled sample must parse");
        assert!(
            config.menus.iter().any(|m| m.name == config.default_menu),
            "sample must define its default menu"
        );
    }

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.default_menu, "main");
        assert_eq!(config.general.fps, 60);
        assert_eq!(config.general.on_launch, OnLaunch::Blank);
        assert_eq!(config.layout.max_buttons, 4);
        assert!(!config.gamepad.controls.is_empty());
    }

    #[test]
    fn test_partial_section_keeps_other_defaults() {
        let config = parse_config(
            r#"
            [general]
            wrap_entries = true
            on_launch = "hide"

            [clock]
            time_format = "12h"
            date_format = "big_endian"
            "#,
        )
        .unwrap();
        assert!(config.general.wrap_entries);
        assert_eq!(config.general.on_launch, OnLaunch::Hide);
        assert_eq!(config.general.fps, 60, "unset keys fall back to defaults");
        assert_eq!(config.clock.time_format, TimeFormat::TwelveHour);
        assert_eq!(config.clock.date_format, DateFormat::BigEndian);
    }

    #[test]
    fn test_negative_deadzone_is_rejected() {
        let result = parse_config("[gamepad]\ndeadzone = -1");
        assert!(matches!(result, Err(LauncherError::Toml(_))), "a negative deadzone would fire at rest");
        let config = parse_config("[gamepad]\ndeadzone = 40000").unwrap();
        assert_eq!(config.gamepad.deadzone, 40_000);
    }

    #[test]
    fn test_menus_preserve_entry_order() {
        let config = parse_config(
            r#"
            [[menus]]
            name = "main"
            entries = [
                { title = "One", command = "one" },
                { title = "Two", icon = "two.png", command = ":submenu games" },
            ]
            "#,
        )
        .unwrap();
        let titles: Vec<_> = config.menus[0].entries.iter().map(|e| e.title.as_str()).collect();
        assert_eq!(titles, ["One", "Two"]);
        assert_eq!(config.menus[0].entries[1].icon.as_deref(), Some(Path::new("two.png")));
    }

    #[test]
    fn test_load_config_missing_file_is_error() {
        let missing = std::env::temp_dir().join("kiosk_launcher_missing_config.toml");
        let _ = std::fs::remove_file(&missing);
        assert!(matches!(load_config(Some(&missing)), Err(LauncherError::Config { .. })));
    }
}
