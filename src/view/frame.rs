use std::sync::atomic::{AtomicBool, Ordering};

/// Coalesces any number of scroll notifications into one unit of work per
/// animation frame.
#[derive(Debug, Default)]
pub struct FrameThrottle {
    scheduled: AtomicBool,
}

impl FrameThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` only for the first request since the last frame.
    pub fn schedule(&self) -> bool {
        !self.scheduled.swap(true, Ordering::AcqRel)
    }

    /// Called once per frame; `true` when work was requested.
    pub fn take(&self) -> bool {
        self.scheduled.swap(false, Ordering::AcqRel)
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled.load(Ordering::Acquire)
    }
}
