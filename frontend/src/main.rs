use std::process::ExitCode;
use std::thread;
use std::time::Instant;

use sdl2::render::BlendMode;

use kiosk_launcher::cli::{self, CliAction, Options};
use kiosk_launcher::config::load_config;
use kiosk_launcher::platform::SystemPlatform;
use kiosk_launcher::render::FramePacer;
use kiosk_launcher::ui::{self, SdlAssets, SdlGamepads};
use kiosk_launcher::{Effect, Launcher, LauncherError, Result};

const PROGRAM: &str = "kiosk-launcher";

fn main() -> ExitCode {
    let opts = match cli::parse_args(std::env::args().skip(1)) {
        Ok(CliAction::Run(opts)) => opts,
        Ok(CliAction::Help) => {
            println!("{}", cli::usage(PROGRAM));
            return ExitCode::SUCCESS;
        }
        Ok(CliAction::Version) => {
            println!("{} {}", PROGRAM, env!("CARGO_PKG_VERSION"));
            return ExitCode::SUCCESS;
        }
        Err(e) => {
            eprintln!("{}\n\n{}", e, cli::usage(PROGRAM));
            return ExitCode::from(2);
        }
    };

    // RUST_LOG still overrides
    let level = if opts.debug { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();

    if let Err(e) = run(&opts) {
        log::error!("{}", e);
        ui::show_error(&e.to_string());
        return ExitCode::from(1);
    }
    ExitCode::SUCCESS
}

fn run(opts: &Options) -> Result<()> {
    let config = load_config(opts.config.as_deref())?;

    let sdl_ctx = sdl2::init().map_err(LauncherError::Sdl)?;
    let video = sdl_ctx.video().map_err(LauncherError::Sdl)?;
    if config.general.inhibit_os_screensaver {
        video.disable_screen_saver();
    }

    let display_mode = video.desktop_display_mode(0).map_err(LauncherError::Sdl)?;
    let (w, h) = (display_mode.w as u32, display_mode.h as u32);
    log::info!("Display is {}x{}", w, h);

    let window = video
        .window("Kiosk Launcher", w, h)
        .position_centered()
        .fullscreen_desktop()
        .build()
        .map_err(|e| LauncherError::Sdl(e.to_string()))?;
    let mut canvas_builder = window.into_canvas().accelerated();
    if config.general.vsync {
        canvas_builder = canvas_builder.present_vsync();
    }
    let mut canvas = canvas_builder.build().map_err(|e| LauncherError::Sdl(e.to_string()))?;
    canvas.set_blend_mode(BlendMode::Blend);
    sdl_ctx.mouse().show_cursor(config.general.mouse_select);

    let ttf_ctx = sdl2::ttf::init().map_err(|e| LauncherError::Sdl(e.to_string()))?;
    let texture_creator = canvas.texture_creator();
    let mut assets = SdlAssets::new(&texture_creator, &ttf_ctx, &config)?;

    let controller_subsystem = sdl_ctx.game_controller().map_err(LauncherError::Sdl)?;
    let mut pads = SdlGamepads::new(controller_subsystem, config.gamepad.mapping_file.as_deref());
    let mut platform = SystemPlatform::new();
    let mut pacer = FramePacer::new(config.general.fps, config.general.vsync, Instant::now());

    let mut launcher = Launcher::new(config, (w, h), &mut assets, ui::key_code, Instant::now())?;
    launcher.start(&mut platform);

    let mut event_pump = sdl_ctx.event_pump().map_err(LauncherError::Sdl)?;
    let mut events = Vec::new();

    'running: loop {
        let now = Instant::now();
        pacer.begin(now);

        events.clear();
        for event in event_pump.poll_iter() {
            if pads.handle_event(&event) {
                continue;
            }
            if let Some(ev) = ui::translate_event(&event) {
                events.push(ev);
            }
        }

        let out = launcher.frame(now, &events, &pads, &mut assets, &mut platform);
        for effect in &out.effects {
            match effect {
                Effect::HideWindow => canvas.window_mut().hide(),
                Effect::ShowWindow => {
                    canvas.window_mut().show();
                    canvas.window_mut().raise();
                }
                Effect::ReconnectControllers => pads.reconnect(),
            }
        }
        if out.quit {
            break 'running;
        }

        let presented = !out.draw.is_empty();
        if presented {
            ui::present(&mut canvas, &out.draw, &mut assets);
        }
        if let Some(pad) = pacer.padding(Instant::now(), presented) {
            thread::sleep(pad);
        }
    }

    launcher.release(&mut assets);
    log::info!("Exiting");
    Ok(())
}
