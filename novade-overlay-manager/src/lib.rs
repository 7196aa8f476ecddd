//! # NovaDE Overlay Manager
//!
//! This crate manages the lifecycle of hardware-composited ("overlay")
//! buffers for the NovaDE compositor. It tracks every imported or allocated
//! buffer with a reference count, guarantees a buffer is never destroyed
//! while some pipeline stage still holds it, and coordinates readiness and
//! release through per-buffer fence timelines.
//!
//! The device-specific machinery stays outside: allocation/import is behind
//! [`NativeBufferHandler`], fence timelines behind [`SyncProvider`] and
//! [`SyncTimeline`]. The manager only consumes those capabilities, which also
//! makes the whole lifecycle testable with in-memory fakes.

pub mod buffer;
pub mod error;
pub mod layer;
pub mod manager;
pub mod sync;

// Re-export key types for convenience.
pub use buffer::{
    BufferDescriptor, BufferFormat, BufferId, BufferSource, NativeBufferHandler,
    NativeBufferHandlerFactory, NativeHandle, OverlayBuffer,
};
pub use error::{OverlayManagerError, Result};
pub use layer::OverlayLayer;
pub use manager::{ImportedBuffer, OverlayBufferManager};
pub use sync::{ReleaseFenceState, SyncFence, SyncProvider, SyncTimeline};
