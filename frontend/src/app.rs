//! The session context.
//!
//! [`Launcher`] owns every piece of mutable session state and advances it one
//! frame at a time. The presentation backend feeds it translated events and
//! replays the draw list it returns.

use std::time::{Duration, Instant};

use crate::assets::{AssetLoader, FontSlot, TextStyle};
use crate::background::Background;
use crate::clock::Clock;
use crate::command::Command;
use crate::config::{Config, OnLaunch, OversizeMode};
use crate::error::{LauncherError, Result};
use crate::geometry::{Geometry, Ticks};
use crate::input::{GamepadSource, InputDispatcher};
use crate::menu::MenuGraph;
use crate::platform::Platform;
use crate::render::{DrawCall, Scene, ScrollIndicators};
use crate::screensaver::Screensaver;
use crate::session::{SessionEvent, SessionStateMachine, Transition};
use crate::style::Color;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Event {
    Quit,
    Key(i32),
    MouseMotion { x: i32, y: i32 },
    MouseClick { x: i32, y: i32 },
    FocusLost,
    FocusGained,
}

/// Window-level actions the backend performs after a frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Effect {
    HideWindow,
    ShowWindow,
    ReconnectControllers,
}

#[derive(Debug, Default)]
pub struct FrameOutput {
    /// Empty while the window is hidden.
    pub draw: Vec<DrawCall>,
    pub effects: Vec<Effect>,
    pub quit: bool,
}

pub struct Launcher {
    config: Config,
    geometry: Geometry,
    ticks: Ticks,
    menu: MenuGraph,
    input: InputDispatcher,
    background: Background,
    clock: Option<Clock>,
    screensaver: Screensaver,
    session: SessionStateMachine,
    /// Process id of the last launched application.
    app_pid: Option<u32>,
    indicators: Option<ScrollIndicators>,
    overlay: Option<Color>,
    highlight: Option<Color>,
    title_alpha: u8,
}

impl Launcher {
    /// Build the session and show the default menu. Fails only when the
    /// default menu is missing or empty.
    pub fn new(
        config: Config,
        screen: (u32, u32),
        assets: &mut dyn AssetLoader,
        key_code: impl Fn(&str) -> Option<i32>,
        now: Instant,
    ) -> Result<Self> {
        let titles = &config.titles;
        let title_height = if titles.enabled { assets.font_height(FontSlot::Title) } else { 0 };
        let geometry = Geometry::new(&config, screen.0, screen.1, title_height);
        let title_style = titles.enabled.then(|| TextStyle {
            font: FontSlot::Title,
            color: titles.color,
            max_width: (titles.oversize_mode != OversizeMode::None).then_some(geometry.title_max_width),
            oversize: titles.oversize_mode,
        });

        let mut menu = MenuGraph::from_config(&config, geometry.clone(), title_style);
        menu.load(&config.default_menu, false, true, assets)
            .map_err(|_| LauncherError::NoDefaultMenu(config.default_menu.clone()))?;

        let indicators = if config.scroll_indicators.enabled {
            match &config.scroll_indicators.icon {
                Some(path) => match assets.load_texture(path) {
                    Ok(tex) => Some(ScrollIndicators::new(tex, &geometry)),
                    Err(e) => {
                        log::error!("Scroll indicator {} failed, indicators disabled: {}", path.display(), e);
                        None
                    }
                },
                None => {
                    log::error!("Scroll indicators enabled without an icon, indicators disabled");
                    None
                }
            }
        } else {
            None
        };

        let clock = config.clock.enabled.then(|| {
            let style = TextStyle {
                font: FontSlot::Clock,
                color: config.clock.color,
                max_width: None,
                oversize: OversizeMode::None,
            };
            Clock::new(&config.clock, style, &geometry)
        });

        let bg = &config.background;
        let overlay = bg.overlay.then(|| bg.overlay_color.with_alpha(bg.overlay_opacity.to_alpha()));
        let hl = &config.highlight;
        let highlight = hl.enabled.then(|| hl.color.with_alpha(hl.opacity.to_alpha()));

        Ok(Self {
            input: InputDispatcher::from_config(&config, key_code),
            background: Background::from_config(&config, screen, assets),
            screensaver: Screensaver::from_config(&config),
            session: SessionStateMachine::new(
                Duration::from_millis(config.general.application_timeout_ms),
                config.general.on_launch,
            ),
            app_pid: None,
            title_alpha: config.titles.opacity.to_alpha(),
            ticks: Ticks::new(now),
            geometry,
            menu,
            clock,
            indicators,
            overlay,
            highlight,
            config,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn menu(&self) -> &MenuGraph {
        &self.menu
    }

    pub fn session(&self) -> &SessionStateMachine {
        &self.session
    }

    pub fn ticks(&self) -> &Ticks {
        &self.ticks
    }

    pub fn screensaver(&self) -> &Screensaver {
        &self.screensaver
    }

    /// Run the configured startup command.
    pub fn start(&mut self, platform: &mut dyn Platform) {
        if let Some(cmd) = &self.config.general.startup_command {
            if let Err(e) = platform.start_process(cmd, false) {
                log::error!("Startup command failed: {}", e);
            }
        }
    }

    /// Advance the session by one frame: events, launch timeout, gamepads,
    /// screensaver, background jobs, then the draw list.
    pub fn frame(
        &mut self,
        now: Instant,
        events: &[Event],
        pads: &dyn GamepadSource,
        assets: &mut dyn AssetLoader,
        platform: &mut dyn Platform,
    ) -> FrameOutput {
        let mut out = FrameOutput::default();
        self.ticks.frame_start = now;

        for &event in events {
            self.handle_event(event, now, assets, platform, &mut out);
            if out.quit {
                return out;
            }
        }

        let exited = platform.poll_exited();
        if self.app_pid.is_some_and(|pid| exited.contains(&pid)) {
            self.app_pid = None;
            if self.session.handle(SessionEvent::AppExited, now) == Transition::Resumed {
                self.resume(now, &mut out);
            }
        }

        if self.session.handle(SessionEvent::Tick, now) == Transition::TimedOut {
            log::warn!("Application did not take focus, returning to the menu");
            if self.session.on_launch() == OnLaunch::Hide {
                out.effects.push(Effect::ShowWindow);
            }
        }

        if self.session.is_interactive() {
            let fired = self.input.poll_gamepads(pads);
            // one wake-up swallows everything fired this frame
            let woke = !fired.is_empty() && self.user_input(now);
            for cmd in fired {
                if woke || !self.session.is_interactive() {
                    break;
                }
                self.execute(cmd, now, assets, platform, &mut out);
                if out.quit {
                    return out;
                }
            }
        }

        if self.session.is_interactive() {
            self.update_screensaver(now, platform);
            self.background.tick(now, &mut self.ticks, assets);
            if let Some(clock) = &mut self.clock {
                clock.tick(now, &mut self.ticks, assets);
            }
        }

        out.draw = self.compose();
        out
    }

    fn handle_event(
        &mut self,
        event: Event,
        now: Instant,
        assets: &mut dyn AssetLoader,
        platform: &mut dyn Platform,
        out: &mut FrameOutput,
    ) {
        match event {
            Event::Quit => out.quit = true,
            Event::FocusLost => {
                self.session.handle(SessionEvent::FocusLost, now);
            }
            Event::FocusGained => {
                if self.session.handle(SessionEvent::FocusGained, now) == Transition::Resumed {
                    self.resume(now, out);
                }
            }
            _ if !self.session.is_interactive() => {}
            Event::Key(code) => {
                if self.user_input(now) {
                    return;
                }
                if let Some(cmd) = self.input.map_key(code) {
                    self.execute(cmd, now, assets, platform, out);
                }
            }
            Event::MouseMotion { x, y } => {
                if !self.config.general.mouse_select || self.user_input(now) {
                    return;
                }
                if let Some(slot) = self.menu.slot_at(x, y) {
                    self.menu.set_highlight(slot);
                }
            }
            Event::MouseClick { x, y } => {
                if !self.config.general.mouse_select || self.user_input(now) {
                    return;
                }
                if let Some(slot) = self.menu.slot_at(x, y) {
                    self.menu.set_highlight(slot);
                    self.execute(Command::Select, now, assets, platform, out);
                }
            }
        }
    }

    /// Record input. Returns true when the input only woke the screensaver.
    fn user_input(&mut self, now: Instant) -> bool {
        self.ticks.last_input = now;
        if self.screensaver.wake() {
            log::debug!("Screensaver off");
            if self.screensaver.pauses_slideshow() {
                self.background.set_paused(false);
                self.ticks.last_background = now;
            }
            return true;
        }
        false
    }

    fn update_screensaver(&mut self, now: Instant, platform: &dyn Platform) {
        let own = now.saturating_duration_since(self.ticks.last_input);
        let idle = platform.idle_time().map_or(own, |os| os.min(own));
        if self.screensaver.tick(idle) && self.screensaver.pauses_slideshow() {
            self.background.set_paused(true);
        }
    }

    fn resume(&mut self, now: Instant, out: &mut FrameOutput) {
        if let Some(launched) = self.ticks.last_launch.take() {
            log::info!("Back at the menu after {:?}", now.saturating_duration_since(launched));
        }
        self.ticks.rebaseline(now);
        self.input.reset_repeat();
        self.screensaver.wake();
        self.background.set_paused(false);
        out.effects.push(Effect::ReconnectControllers);
        if self.session.on_launch() == OnLaunch::Hide {
            out.effects.push(Effect::ShowWindow);
        }
    }

    pub fn execute(
        &mut self,
        cmd: Command,
        now: Instant,
        assets: &mut dyn AssetLoader,
        platform: &mut dyn Platform,
        out: &mut FrameOutput,
    ) {
        log::debug!("Executing {}", cmd);
        match cmd {
            Command::Left => {
                self.menu.move_left();
            }
            Command::Right => {
                self.menu.move_right();
            }
            Command::Select => {
                let Some(entry_cmd) = self.menu.selected_entry().map(|e| e.command.clone()) else {
                    return;
                };
                if entry_cmd == Command::Select {
                    log::debug!("Ignoring :select bound to an entry");
                    return;
                }
                self.execute(entry_cmd, now, assets, platform, out);
            }
            Command::Submenu(name) => {
                let _ = self.menu.load(&name, true, true, assets);
            }
            Command::Back => match self.menu.back_target() {
                Some(back) => {
                    let _ = self.menu.load_id(back, false, self.config.general.reset_on_back, assets);
                }
                None => log::debug!("No menu to go back to"),
            },
            Command::Home => {
                let home = self.config.default_menu.clone();
                let _ = self.menu.load(&home, false, true, assets);
            }
            Command::Quit => {
                if let Some(cmd) = &self.config.general.quit_command {
                    if let Err(e) = platform.start_process(cmd, false) {
                        log::error!("Quit command failed: {}", e);
                    }
                }
                out.quit = true;
            }
            Command::Power(action) => {
                if let Err(e) = platform.power(action) {
                    log::error!("{:?} failed: {}", action, e);
                }
            }
            Command::Launch(command) => match platform.start_process(&command, true) {
                Ok(pid) => {
                    self.app_pid = Some(pid);
                    self.session.handle(SessionEvent::Launched, now);
                    self.ticks.last_launch = Some(now);
                    if self.session.on_launch() == OnLaunch::Hide {
                        out.effects.push(Effect::HideWindow);
                    }
                }
                Err(e) => log::error!("{}", e),
            },
        }
    }

    fn compose(&self) -> Vec<DrawCall> {
        Scene {
            mode: self.session.draw_mode(),
            screen: self.geometry.screen_rect(),
            blank_color: Color::BLACK,
            background: &self.background,
            overlay: self.overlay,
            indicators: self.indicators.as_ref(),
            clock: self.clock.as_ref(),
            highlight: self.highlight,
            title_alpha: self.title_alpha,
            menu: &self.menu,
            screensaver: self.screensaver.overlay(),
        }
        .compose()
    }

    /// Free every texture the session created.
    pub fn release(&mut self, assets: &mut dyn AssetLoader) {
        self.menu.release(assets);
        self.background.release(assets);
        if let Some(clock) = &mut self.clock {
            clock.release(assets);
        }
        if let Some(ind) = self.indicators.take() {
            assets.free(ind.texture.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assets::testing::FakeAssets;
    use crate::command::PowerAction;
    use crate::config::parse_config;
    use crate::input::{GamepadSource, NoGamepads};
    use crate::session::{DrawMode, SessionState};

    #[derive(Default)]
    struct RecordingPlatform {
        started: Vec<(String, bool)>,
        power: Vec<PowerAction>,
        idle: Option<Duration>,
        exited: Vec<u32>,
    }

    impl RecordingPlatform {
        /// Process ids are 100 plus the launch index.
        fn pid_of(&self, launch: usize) -> u32 {
            100 + launch as u32
        }
    }

    impl Platform for RecordingPlatform {
        fn start_process(&mut self, command: &str, is_application: bool) -> Result<u32> {
            self.started.push((command.to_string(), is_application));
            Ok(self.pid_of(self.started.len() - 1))
        }

        fn poll_exited(&mut self) -> Vec<u32> {
            std::mem::take(&mut self.exited)
        }

        fn idle_time(&self) -> Option<Duration> {
            self.idle
        }

        fn power(&mut self, action: PowerAction) -> Result<()> {
            self.power.push(action);
            Ok(())
        }
    }

    const CONFIG: &str = r#"
        default_menu = "main"

        [general]
        application_timeout_ms = 1000
        quit_command = "echo bye"

        [screensaver]
        enabled = true
        idle_time_s = 10

        [[menus]]
        name = "main"
        entries = [
            { title = "Kodi", command = "kodi" },
            { title = "Tools", command = ":submenu tools" },
            { title = "Sleep", command = ":sleep" },
        ]

        [[menus]]
        name = "tools"
        entries = [
            { title = "Shell", command = "xterm" },
            { title = "Back", command = ":back" },
        ]
    "#;

    struct Harness {
        launcher: Launcher,
        assets: FakeAssets,
        platform: RecordingPlatform,
        start: Instant,
    }

    impl Harness {
        fn new(src: &str) -> Self {
            let start = Instant::now();
            let mut assets = FakeAssets::default();
            let config = parse_config(src).unwrap();
            let launcher = Launcher::new(config, (1280, 720), &mut assets, |_| None, start).unwrap();
            Self { launcher, assets, platform: RecordingPlatform::default(), start }
        }

        fn frame(&mut self, at_ms: u64, events: &[Event]) -> FrameOutput {
            let now = self.start + Duration::from_millis(at_ms);
            self.launcher.frame(now, events, &NoGamepads, &mut self.assets, &mut self.platform)
        }

        fn current_menu(&self) -> &str {
            &self.launcher.menu().current_menu().unwrap().name
        }
    }

    #[test]
    fn test_missing_default_menu_is_fatal() {
        let config = parse_config("default_menu = \"nowhere\"").unwrap();
        let mut assets = FakeAssets::default();
        let result = Launcher::new(config, (800, 600), &mut assets, |_| None, Instant::now());
        assert!(matches!(result, Err(LauncherError::NoDefaultMenu(name)) if name == "nowhere"));
    }

    #[test]
    fn test_submenu_and_back() {
        let mut h = Harness::new(CONFIG);
        h.frame(0, &[Event::Key(crate::input::keys::RIGHT), Event::Key(crate::input::keys::RETURN)]);
        assert_eq!(h.current_menu(), "tools");
        h.frame(16, &[Event::Key(crate::input::keys::BACKSPACE)]);
        assert_eq!(h.current_menu(), "main");
        assert_eq!(h.launcher.menu().selected_id(), Some(1), "back restores the submenu entry");
    }

    #[test]
    fn test_power_and_quit_commands() {
        let mut h = Harness::new(CONFIG);
        let now = h.start;
        let mut out = FrameOutput::default();
        h.launcher.execute(Command::Power(PowerAction::Sleep), now, &mut h.assets, &mut h.platform, &mut out);
        assert_eq!(h.platform.power, [PowerAction::Sleep]);
        h.launcher.execute(Command::Quit, now, &mut h.assets, &mut h.platform, &mut out);
        assert!(out.quit);
        assert_eq!(h.platform.started, [("echo bye".to_string(), false)]);
    }

    #[test]
    fn test_launch_blanks_until_timeout() {
        let mut h = Harness::new(CONFIG);
        let out = h.frame(0, &[Event::Key(crate::input::keys::RETURN)]);
        assert_eq!(h.platform.started, [("kodi".to_string(), true)]);
        assert!(matches!(h.launcher.session().state(), SessionState::Launching { .. }));
        assert_eq!(out.draw, [DrawCall::Clear(Color::BLACK)]);

        // input is ignored while launching
        h.frame(100, &[Event::Key(crate::input::keys::RIGHT)]);
        assert_eq!(h.launcher.menu().highlight(), 0);

        let out = h.frame(1_000, &[]);
        assert!(h.launcher.session().is_interactive());
        assert_eq!(h.launcher.session().draw_mode(), DrawMode::Normal);
        assert!(out.draw.len() > 1, "menu drawn again");
    }

    #[test]
    fn test_focus_cycle_rebaselines_and_reconnects() {
        let mut h = Harness::new(CONFIG);
        h.frame(0, &[Event::Key(crate::input::keys::RETURN)]);
        h.frame(50, &[Event::FocusLost]);
        assert_eq!(h.launcher.session().state(), SessionState::Running);

        // an hour later the app exits
        let out = h.frame(3_600_000, &[Event::FocusGained]);
        assert_eq!(out.effects, [Effect::ReconnectControllers]);
        assert_eq!(h.launcher.ticks().last_input, h.start + Duration::from_millis(3_600_000));
        assert!(!h.launcher.screensaver().is_active(), "no screensaver from the stale input tick");
    }

    #[test]
    fn test_screensaver_wake_input_is_swallowed() {
        let mut h = Harness::new(CONFIG);
        h.frame(10_000, &[]);
        assert!(h.launcher.screensaver().is_active());

        h.frame(10_016, &[Event::Key(crate::input::keys::RIGHT)]);
        assert!(!h.launcher.screensaver().is_active());
        assert_eq!(h.launcher.menu().highlight(), 0, "waking key does not navigate");

        h.frame(10_032, &[Event::Key(crate::input::keys::RIGHT)]);
        assert_eq!(h.launcher.menu().highlight(), 1);
    }

    #[test]
    fn test_os_idle_time_takes_the_minimum() {
        let mut h = Harness::new(CONFIG);
        h.platform.idle = Some(Duration::from_secs(1));
        h.frame(20_000, &[]);
        assert!(!h.launcher.screensaver().is_active(), "recent desktop input keeps the screensaver off");
    }

    #[test]
    fn test_hide_mode_effects() {
        let src = CONFIG.replace("application_timeout_ms = 1000", "application_timeout_ms = 1000\non_launch = \"hide\"");
        let mut h = Harness::new(&src);
        let out = h.frame(0, &[Event::Key(crate::input::keys::RETURN)]);
        assert_eq!(out.effects, [Effect::HideWindow]);
        assert!(out.draw.is_empty());
        h.frame(10, &[Event::FocusLost]);
        let out = h.frame(20, &[Event::FocusGained]);
        assert_eq!(out.effects, [Effect::ReconnectControllers, Effect::ShowWindow]);
    }

    #[test]
    fn test_hide_mode_timeout_shows_window() {
        let src = CONFIG.replace("application_timeout_ms = 1000", "application_timeout_ms = 1000\non_launch = \"hide\"");
        let mut h = Harness::new(&src);
        h.frame(0, &[Event::Key(crate::input::keys::RETURN)]);
        assert_eq!(h.launcher.session().draw_mode(), DrawMode::Hidden);

        let out = h.frame(999, &[]);
        assert!(out.effects.is_empty());
        assert!(out.draw.is_empty());

        let out = h.frame(1_000, &[]);
        assert_eq!(out.effects, [Effect::ShowWindow], "window comes back when the app never took focus");
        assert_eq!(h.launcher.session().state(), SessionState::Idle);
        assert_eq!(h.launcher.session().draw_mode(), DrawMode::Normal);
        assert!(!out.draw.is_empty());
    }

    #[test]
    fn test_application_exit_returns_from_hidden_window() {
        let src = CONFIG.replace("application_timeout_ms = 1000", "application_timeout_ms = 1000\non_launch = \"hide\"");
        let mut h = Harness::new(&src);
        h.frame(0, &[Event::Key(crate::input::keys::RETURN)]);
        h.frame(10, &[Event::FocusLost]);
        let out = h.frame(3_600_000, &[]);
        assert_eq!(h.launcher.session().state(), SessionState::Running);
        assert!(out.effects.is_empty());

        // a hidden window never sees FocusGained; the exit alone brings it back
        h.platform.exited = vec![h.platform.pid_of(0)];
        let out = h.frame(3_600_016, &[]);
        assert_eq!(out.effects, [Effect::ReconnectControllers, Effect::ShowWindow]);
        assert!(h.launcher.session().is_interactive());
        assert!(!out.draw.is_empty(), "menu drawn again");
        assert_eq!(h.launcher.ticks().last_launch, None);
    }

    #[test]
    fn test_stale_application_exit_is_ignored() {
        let mut h = Harness::new(CONFIG);
        h.frame(0, &[Event::Key(crate::input::keys::RETURN)]);
        h.frame(1_000, &[]);
        assert!(h.launcher.session().is_interactive(), "first launch timed out");

        h.frame(1_016, &[Event::Key(crate::input::keys::RETURN)]);
        h.frame(1_032, &[Event::FocusLost]);
        h.platform.exited = vec![h.platform.pid_of(0)];
        h.frame(1_048, &[]);
        assert_eq!(h.launcher.session().state(), SessionState::Running, "exit of the earlier app");

        h.platform.exited = vec![h.platform.pid_of(1)];
        h.frame(1_064, &[]);
        assert!(h.launcher.session().is_interactive());
    }

    /// Every button held on one controller.
    struct AllButtons;

    impl GamepadSource for AllButtons {
        fn controller_count(&self) -> usize {
            1
        }

        fn axis(&self, _controller: usize, _axis: u8) -> i16 {
            0
        }

        fn button(&self, _controller: usize, _button: u8) -> bool {
            true
        }
    }

    #[test]
    fn test_screensaver_wake_swallows_every_gamepad_command() {
        let mut h = Harness::new(CONFIG);
        h.frame(10_000, &[]);
        assert!(h.launcher.screensaver().is_active());

        let now = h.start + Duration::from_millis(10_016);
        h.launcher.frame(now, &[], &AllButtons, &mut h.assets, &mut h.platform);
        assert!(!h.launcher.screensaver().is_active());
        assert_eq!(h.launcher.menu().highlight(), 0, "right/left not applied");
        assert!(h.platform.started.is_empty(), "select not applied");
        assert!(h.launcher.session().is_interactive());
    }

    #[test]
    fn test_mouse_ignored_unless_enabled() {
        let mut h = Harness::new(CONFIG);
        let target = h.launcher.menu().visible().nth(2).unwrap().1.icon_rect;
        h.frame(0, &[Event::MouseClick { x: target.x + 1, y: target.y + 1 }]);
        assert!(h.platform.power.is_empty());

        let src = CONFIG.replace("quit_command = \"echo bye\"", "quit_command = \"echo bye\"\nmouse_select = true");
        let mut h = Harness::new(&src);
        h.frame(0, &[Event::MouseClick { x: target.x + 1, y: target.y + 1 }]);
        assert_eq!(h.platform.power, [PowerAction::Sleep]);
    }

    #[test]
    fn test_release_frees_all_textures() {
        let mut h = Harness::new(CONFIG);
        h.frame(0, &[]);
        assert!(!h.assets.live.is_empty());
        h.launcher.release(&mut h.assets);
        assert!(h.assets.live.is_empty());
    }
}
