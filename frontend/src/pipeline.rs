//! Single-flight background jobs.
//!
//! An [`AssetTask`] runs at most one worker at a time. The worker owns its
//! output until it finishes; the render thread polls the ready flag each
//! frame and only then joins, so the join never waits on real work.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TaskStatus {
    Idle,
    Rendering,
    Ready,
}

/// Sets the ready flag when the worker body returns or unwinds.
struct ReadyGuard(Arc<AtomicBool>);

impl Drop for ReadyGuard {
    fn drop(&mut self) {
        self.0.store(true, Ordering::Release);
    }
}

pub struct AssetTask<T> {
    name: &'static str,
    ready: Arc<AtomicBool>,
    handle: Option<JoinHandle<T>>,
}

impl<T: Send + 'static> AssetTask<T> {
    pub fn new(name: &'static str) -> Self {
        Self { name, ready: Arc::new(AtomicBool::new(false)), handle: None }
    }

    pub fn status(&self) -> TaskStatus {
        match &self.handle {
            None => TaskStatus::Idle,
            Some(_) if self.ready.load(Ordering::Acquire) => TaskStatus::Ready,
            Some(_) => TaskStatus::Rendering,
        }
    }

    pub fn is_idle(&self) -> bool {
        self.handle.is_none()
    }

    /// Spawn `job` on a worker thread. Rejected (returns false) unless idle or
    /// when the thread cannot be created.
    pub fn start<F>(&mut self, job: F) -> bool
    where
        F: FnOnce() -> T + Send + 'static,
    {
        if self.handle.is_some() {
            log::debug!("{} job already in flight", self.name);
            return false;
        }
        self.ready.store(false, Ordering::Release);
        let guard = ReadyGuard(Arc::clone(&self.ready));
        let spawned = thread::Builder::new().name(format!("{}-worker", self.name)).spawn(move || {
            let _guard = guard;
            job()
        });
        match spawned {
            Ok(handle) => {
                log::trace!("{} job started", self.name);
                self.handle = Some(handle);
                true
            }
            Err(e) => {
                log::error!("Failed to spawn {} worker: {}", self.name, e);
                false
            }
        }
    }

    /// Take the finished output and return to Idle. `None` while idle or still
    /// rendering, or when the worker panicked.
    pub fn take(&mut self) -> Option<T> {
        if self.status() != TaskStatus::Ready {
            return None;
        }
        let handle = self.handle.take()?;
        self.ready.store(false, Ordering::Release);
        match handle.join() {
            Ok(output) => Some(output),
            Err(_) => {
                log::error!("{} worker panicked", self.name);
                None
            }
        }
    }

    /// Block until the current job (if any) finishes and drop its output.
    pub fn wait(&mut self) {
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
            self.ready.store(false, Ordering::Release);
        }
    }
}
