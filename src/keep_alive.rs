//! Background-execution capability held while a logging session is active.
//!
//! The host decides what holding it means (an ongoing notification, a wake
//! lock, nothing at all). The sampling loop only acquires it on start and
//! releases it on stop.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

pub trait KeepAlive: Send + Sync {
    /// Called once a session is running; `session` is its file, if one was opened
    fn acquire(&self, session: Option<&Path>);
    fn release(&self);
}

/// Announces background logging through the log, like an ongoing notification
#[derive(Debug, Default)]
pub struct BackgroundNotice {
    held: AtomicBool,
}

impl BackgroundNotice {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn is_held(&self) -> bool {
        self.held.load(Ordering::Acquire)
    }
}

impl KeepAlive for BackgroundNotice {
    fn acquire(&self, session: Option<&Path>) {
        if self.held.swap(true, Ordering::AcqRel) {
            return;
        }
        match session {
            Some(path) => log::info!("Logging in background to {}", path.display()),
            None => log::info!("Sampling in background (no log file)"),
        }
    }

    fn release(&self) {
        if self.held.swap(false, Ordering::AcqRel) {
            log::info!("Background logging ended");
        }
    }
}
