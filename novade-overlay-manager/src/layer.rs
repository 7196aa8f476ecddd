//! Per-frame binding between a compositor layer and an overlay buffer.

use crate::buffer::BufferId;
use crate::sync::ReleaseFenceState;

/// Associates one compositor layer with the buffer it scans out this frame
/// and the state of that buffer's release fence.
///
/// The binding is owned by the display pipeline, not the manager; the manager
/// only reads the bound identity and fence state during its per-frame scans,
/// and clears the binding when it returns the buffer's reference.
#[derive(Debug, Default)]
pub struct OverlayLayer {
    buffer: Option<BufferId>,
    release_fence_state: ReleaseFenceState,
}

impl OverlayLayer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A binding already attached to `buffer`, with no fence yet.
    pub fn with_buffer(buffer: BufferId) -> Self {
        Self {
            buffer: Some(buffer),
            release_fence_state: ReleaseFenceState::Unset,
        }
    }

    pub fn buffer(&self) -> Option<BufferId> {
        self.buffer
    }

    pub fn set_buffer(&mut self, buffer: BufferId) {
        self.buffer = Some(buffer);
    }

    pub fn release_fence_state(&self) -> ReleaseFenceState {
        self.release_fence_state
    }

    pub fn set_release_fence_state(&mut self, state: ReleaseFenceState) {
        self.release_fence_state = state;
    }

    /// Called by the manager once the buffer's reference has been returned.
    /// Clears the binding so later scans can no longer match it.
    pub fn mark_buffer_released(&mut self) {
        self.buffer = None;
        self.release_fence_state = ReleaseFenceState::Unset;
    }
}
