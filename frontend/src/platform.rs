use std::process::{Child, Command};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;
use std::time::Duration;

use crate::command::PowerAction;
use crate::error::{LauncherError, Result};

/// OS services the session calls out to.
pub trait Platform {
    /// Start `command` through the shell and return its process id.
    /// Applications are expected to take over the screen; other commands run
    /// in the background.
    fn start_process(&mut self, command: &str, is_application: bool) -> Result<u32>;
    /// Time since the last user input anywhere on the desktop, if known.
    fn idle_time(&self) -> Option<Duration>;
    fn power(&mut self, action: PowerAction) -> Result<()>;
    /// Process ids of applications that exited since the last call.
    fn poll_exited(&mut self) -> Vec<u32>;
}

pub fn power_verb(action: PowerAction) -> &'static str {
    match action {
        PowerAction::Shutdown => "poweroff",
        PowerAction::Restart => "reboot",
        PowerAction::Sleep => "suspend",
    }
}

/// Reap `child` on its own thread and log how it ended. Applications report
/// their exit on `exited`.
fn watch_child(mut child: Child, label: String, exited: Option<Sender<u32>>) {
    let pid = child.id();
    let spawned = thread::Builder::new().name("child-watch".into()).spawn(move || {
        match child.wait() {
            Ok(status) if exited.is_some() => log::info!("{} exited with {}", label, status),
            Ok(status) if !status.success() => log::warn!("{} exited with {}", label, status),
            Ok(_) => log::debug!("{} finished", label),
            Err(e) => log::error!("Waiting for {} failed: {}", label, e),
        }
        if let Some(tx) = exited {
            // receiver gone means the launcher is shutting down
            let _ = tx.send(pid);
        }
    });
    if let Err(e) = spawned {
        log::error!("Failed to spawn child watcher: {}", e);
    }
}

pub struct SystemPlatform {
    exited_tx: Sender<u32>,
    exited_rx: Receiver<u32>,
    #[cfg(feature = "x11")]
    idle: Option<xidle::XIdle>,
}

impl SystemPlatform {
    pub fn new() -> Self {
        let (exited_tx, exited_rx) = mpsc::channel();
        Self {
            exited_tx,
            exited_rx,
            #[cfg(feature = "x11")]
            idle: xidle::XIdle::open(),
        }
    }
}

impl Default for SystemPlatform {
    fn default() -> Self {
        Self::new()
    }
}

impl Platform for SystemPlatform {
    fn start_process(&mut self, command: &str, is_application: bool) -> Result<u32> {
        let command = command.trim();
        if command.is_empty() {
            return Err(LauncherError::InvalidCommand(command.to_string()));
        }
        let child = Command::new("sh")
            .arg("-c")
            .arg(command)
            .spawn()
            .map_err(|source| LauncherError::Launch { command: command.to_string(), source })?;
        let pid = child.id();
        log::info!("Started '{}' with pid={}", command, pid);
        let exited = is_application.then(|| self.exited_tx.clone());
        watch_child(child, format!("'{}'", command), exited);
        Ok(pid)
    }

    fn idle_time(&self) -> Option<Duration> {
        #[cfg(feature = "x11")]
        {
            self.idle.as_ref().and_then(|x| x.idle())
        }
        #[cfg(not(feature = "x11"))]
        {
            None
        }
    }

    fn power(&mut self, action: PowerAction) -> Result<()> {
        let verb = power_verb(action);
        log::info!("Requesting systemctl {}", verb);
        let child = Command::new("systemctl")
            .arg(verb)
            .spawn()
            .map_err(|source| LauncherError::Launch { command: format!("systemctl {}", verb), source })?;
        watch_child(child, format!("systemctl {}", verb), None);
        Ok(())
    }

    fn poll_exited(&mut self) -> Vec<u32> {
        self.exited_rx.try_iter().collect()
    }
}

#[cfg(feature = "x11")]
mod xidle {
    use std::os::raw::c_void;
    use std::ptr;
    use std::time::Duration;

    use x11::{xlib, xss};

    /// XScreenSaver idle counter for the default display.
    pub struct XIdle {
        display: *mut xlib::Display,
        info: *mut xss::XScreenSaverInfo,
    }

    impl XIdle {
        pub fn open() -> Option<Self> {
            unsafe {
                let display = xlib::XOpenDisplay(ptr::null());
                if display.is_null() {
                    log::warn!("XOpenDisplay failed, OS idle time not available");
                    return None;
                }
                let info = xss::XScreenSaverAllocInfo();
                if info.is_null() {
                    log::warn!("XScreenSaverAllocInfo failed, OS idle time not available");
                    xlib::XCloseDisplay(display);
                    return None;
                }
                Some(Self { display, info })
            }
        }

        pub fn idle(&self) -> Option<Duration> {
            unsafe {
                let root = xlib::XDefaultRootWindow(self.display);
                if xss::XScreenSaverQueryInfo(self.display, root, self.info) == 0 {
                    return None;
                }
                Some(Duration::from_millis((*self.info).idle as u64))
            }
        }
    }

    impl Drop for XIdle {
        fn drop(&mut self) {
            unsafe {
                xlib::XFree(self.info as *mut c_void);
                xlib::XCloseDisplay(self.display);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_verbs() {
        assert_eq!(power_verb(PowerAction::Shutdown), "poweroff");
        assert_eq!(power_verb(PowerAction::Restart), "reboot");
        assert_eq!(power_verb(PowerAction::Sleep), "suspend");
    }

    #[test]
    fn test_start_process_runs_through_shell() {
        let marker = std::env::temp_dir().join("kiosk_launcher_platform_marker");
        let _ = std::fs::remove_file(&marker);
        let mut platform = SystemPlatform::new();
        platform
            .start_process(&format!("echo ok > '{}'", marker.display()), false)
            .expect("sh should be available");

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        while !marker.exists() {
            assert!(std::time::Instant::now() < deadline, "shell command never ran");
            thread::sleep(Duration::from_millis(10));
        }
    }

    #[test]
    fn test_application_exit_is_reported_once() {
        let mut platform = SystemPlatform::new();
        platform.start_process("true", false).expect("sh should be available");
        let pid = platform.start_process("true", true).expect("sh should be available");

        let deadline = std::time::Instant::now() + Duration::from_secs(5);
        let mut exited = Vec::new();
        while exited.is_empty() {
            assert!(std::time::Instant::now() < deadline, "application exit never reported");
            thread::sleep(Duration::from_millis(10));
            exited = platform.poll_exited();
        }
        assert_eq!(exited, [pid], "only applications are reported");
        thread::sleep(Duration::from_millis(50));
        assert!(platform.poll_exited().is_empty(), "an exit is reported once");
    }

    #[test]
    fn test_empty_command_is_rejected() {
        let mut platform = SystemPlatform::new();
        assert!(matches!(platform.start_process("  ", true), Err(LauncherError::InvalidCommand(_))));
    }
}
