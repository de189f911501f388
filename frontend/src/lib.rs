//! Full-screen kiosk launcher: a paginated menu of entries that run external
//! commands, with a clock, slideshow background, screensaver and gamepad input.
//!
//! The session core (everything except `ui`) has no SDL dependency; the
//! `sdl` feature adds the window, renderer and controller backend.

pub mod app;
pub mod assets;
pub mod background;
pub mod cli;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod geometry;
pub mod input;
pub mod menu;
pub mod pipeline;
pub mod platform;
pub mod render;
pub mod scan;
pub mod screensaver;
pub mod session;
pub mod style;
#[cfg(feature = "sdl")]
pub mod ui;

pub use app::{Effect, Event, FrameOutput, Launcher};
pub use error::{LauncherError, Result};
