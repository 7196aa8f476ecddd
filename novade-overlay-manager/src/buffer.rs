//! Buffer identity, descriptors and the native buffer handler capability.

use std::fmt;
use std::os::unix::io::RawFd;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identity of an overlay buffer tracked by the manager.
///
/// Identities are minted from a process-wide counter and never reused, so a
/// stale `BufferId` held after teardown can never alias a newer buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BufferId(u64);

impl BufferId {
    fn new_unique() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(1);
        BufferId(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value, for logging and debugging.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for BufferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "buffer#{}", self.0)
    }
}

/// Pixel formats understood by the display planes.
///
/// These align with the DRM fourcc formats the hardware planes accept; the
/// list grows as plane capabilities are wired up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferFormat {
    /// 32-bit ARGB, 8 bits per channel, alpha first.
    Argb8888,
    /// 32-bit XRGB, 8 bits per channel, alpha ignored.
    Xrgb8888,
    /// YUV 4:2:0, 2-plane Y followed by interleaved UV.
    Nv12,
}

/// How the underlying image resource came into existence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferSource {
    /// Freshly allocated by the native handler from a descriptor.
    Allocated,
    /// Imported from a handle owned by another process or subsystem.
    Imported,
}

/// Opaque allocation request handed through to the native buffer handler.
#[derive(Debug, Clone, Copy)]
pub struct BufferDescriptor {
    pub width: u32,
    pub height: u32,
    /// Bytes per row of the first plane.
    pub stride: u32,
    pub format: BufferFormat,
}

/// Opaque handle to an image resource that already exists outside the
/// compositor (a dmabuf or prime fd). The manager never interprets it; it is
/// passed through to the native handler's import path.
#[derive(Debug, Clone, Copy)]
pub struct NativeHandle(RawFd);

impl NativeHandle {
    pub fn new(fd: RawFd) -> Self {
        Self(fd)
    }

    pub fn raw(self) -> RawFd {
        self.0
    }
}

/// A GPU-resident image resource scanned out directly by a hardware plane.
///
/// Constructed only by a [`NativeBufferHandler`]; once handed to the manager
/// it is owned exclusively by the registry entry tracking it.
#[derive(Debug)]
pub struct OverlayBuffer {
    id: BufferId,
    width: u32,
    height: u32,
    stride: u32,
    format: BufferFormat,
    source: BufferSource,
}

impl OverlayBuffer {
    /// Creates a buffer record with a fresh unique identity.
    pub fn new(
        width: u32,
        height: u32,
        stride: u32,
        format: BufferFormat,
        source: BufferSource,
    ) -> Self {
        Self {
            id: BufferId::new_unique(),
            width,
            height,
            stride,
            format,
            source,
        }
    }

    pub fn id(&self) -> BufferId {
        self.id
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn stride(&self) -> u32 {
        self.stride
    }

    pub fn format(&self) -> BufferFormat {
        self.format
    }

    pub fn source(&self) -> BufferSource {
        self.source
    }
}

/// Allocation/import backend for overlay buffers.
///
/// Implementations wrap the device-specific machinery (GBM, dumb buffers,
/// dmabuf import); the manager treats descriptors and handles as black boxes
/// and only cares that each call yields a buffer record it can own.
pub trait NativeBufferHandler: Send + Sync {
    /// Allocates a fresh buffer satisfying `descriptor`.
    fn allocate(&self, descriptor: &BufferDescriptor) -> OverlayBuffer;

    /// Imports an externally owned resource as an overlay buffer.
    fn import(&self, handle: &NativeHandle) -> OverlayBuffer;
}

/// Creates the native handler for a given DRM render node.
///
/// Returning `None` means the device cannot host overlay buffers at all;
/// manager initialization fails in that case.
pub trait NativeBufferHandlerFactory: Send + Sync {
    fn create_instance(&self, gpu_fd: RawFd) -> Option<Box<dyn NativeBufferHandler>>;
}
