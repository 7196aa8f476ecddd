//! Hardware synchronization capability consumed by the buffer manager.
//!
//! The manager does not implement the fence protocol itself. It owns one
//! timeline per live buffer, asks it for the next release fence when the
//! buffer is handed out, and drops the whole timeline once the display side
//! reports the fence as signaled.

use std::os::unix::io::RawFd;

/// Opaque release fence value, sync-file style.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncFence(RawFd);

impl SyncFence {
    pub fn new(fd: RawFd) -> Self {
        Self(fd)
    }

    pub fn raw(self) -> RawFd {
        self.0
    }
}

/// Per-frame readiness of a layer's release fence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReleaseFenceState {
    /// No release fence was attached for this frame.
    #[default]
    Unset,
    /// The fence exists but has not signaled yet.
    Pending,
    /// The fence has signaled; the buffer's display usage is over.
    Ready,
}

/// One per-buffer fence timeline.
pub trait SyncTimeline: Send {
    /// Prepares the underlying primitive. Returns `false` when it could not
    /// be created; the buffer then stays usable but never carries a fence.
    fn init(&mut self) -> bool;

    /// Advances the timeline and returns a fence for the new point, or `None`
    /// when the timeline is unavailable.
    fn create_next_fence(&mut self) -> Option<SyncFence>;
}

/// Creates fresh [`SyncTimeline`]s, one per buffer the manager creates.
pub trait SyncProvider: Send + Sync {
    fn create_timeline(&self) -> Box<dyn SyncTimeline>;
}
