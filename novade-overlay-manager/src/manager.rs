//! The overlay buffer registry and its RAII import handle.
//!
//! [`OverlayBufferManager`] owns every live overlay buffer together with its
//! fence timeline and a reference count. All lifecycle transitions are
//! serialized by one lightweight lock; critical sections are short linear
//! scans with no I/O, so a single coarse lock is cheaper than per-entry
//! locking for the few tens of buffers a display pipeline keeps alive.

use std::os::unix::io::RawFd;

use parking_lot::Mutex;
use tracing::{error, trace};

use crate::buffer::{
    BufferDescriptor, BufferId, NativeBufferHandler, NativeBufferHandlerFactory, NativeHandle,
    OverlayBuffer,
};
use crate::error::{OverlayManagerError, Result};
use crate::layer::OverlayLayer;
use crate::sync::{ReleaseFenceState, SyncFence, SyncProvider, SyncTimeline};

struct BufferEntry {
    buffer: OverlayBuffer,
    /// Present while a release fence may still be produced for this buffer;
    /// dropped once the display side reports the fence signaled.
    sync: Option<Box<dyn SyncTimeline>>,
    /// Count of outstanding logical holders. Invariant: `>= 1` for any entry
    /// in the registry; the entry is erased the instant a decrement makes it
    /// `<= 0`, from within the operation that caused the transition.
    ref_count: i32,
}

/// Tracks every live overlay buffer and coordinates its teardown.
///
/// The manager is an explicitly owned value shared by reference between the
/// pipeline stages that need it; it is `Sync` and all operations take
/// `&self`.
pub struct OverlayBufferManager {
    handler: Box<dyn NativeBufferHandler>,
    sync_provider: Box<dyn SyncProvider>,
    buffers: Mutex<Vec<BufferEntry>>,
}

impl OverlayBufferManager {
    /// Creates the manager for one DRM device.
    ///
    /// Fails only if the native handler factory cannot produce a handler for
    /// `gpu_fd`; the device then cannot host overlay buffers at all.
    pub fn initialize(
        gpu_fd: RawFd,
        factory: &dyn NativeBufferHandlerFactory,
        sync_provider: Box<dyn SyncProvider>,
    ) -> Result<Self> {
        let Some(handler) = factory.create_instance(gpu_fd) else {
            error!(gpu_fd, "failed to create native buffer handler instance");
            return Err(OverlayManagerError::HandlerUnavailable { gpu_fd });
        };

        Ok(Self {
            handler,
            sync_provider,
            buffers: Mutex::new(Vec::new()),
        })
    }

    /// The native handler backing this manager. Shared with the display
    /// pipeline for plane import queries.
    pub fn handler(&self) -> &dyn NativeBufferHandler {
        self.handler.as_ref()
    }

    /// Allocates a fresh overlay buffer and starts tracking it.
    ///
    /// The returned handle carries the creation's implicit reference; its
    /// drop returns that reference. The handle also carries the buffer's
    /// first release fence, or `None` if the sync object could not be set up
    /// (the buffer is still tracked normally in that case, it just never
    /// produces a fence).
    pub fn create_buffer(&self, descriptor: &BufferDescriptor) -> ImportedBuffer<'_> {
        let buffer = self.handler.allocate(descriptor);
        self.track(buffer)
    }

    /// Imports an externally owned resource and starts tracking it.
    /// Same contract as [`create_buffer`](Self::create_buffer).
    pub fn create_buffer_from_handle(&self, handle: &NativeHandle) -> ImportedBuffer<'_> {
        let buffer = self.handler.import(handle);
        self.track(buffer)
    }

    // Timeline setup may hit the kernel, so it happens before the lock is
    // taken; only the insertion itself needs to be atomic with concurrent
    // register/unregister traffic.
    fn track(&self, buffer: OverlayBuffer) -> ImportedBuffer<'_> {
        let id = buffer.id();

        let mut timeline = self.sync_provider.create_timeline();
        let mut sync = if timeline.init() {
            Some(timeline)
        } else {
            error!(buffer = %id, "failed to create sync object");
            None
        };
        let fence = sync.as_mut().and_then(|timeline| timeline.create_next_fence());

        let mut buffers = self.buffers.lock();
        buffers.push(BufferEntry {
            buffer,
            sync,
            ref_count: 1,
        });
        drop(buffers);

        ImportedBuffer {
            manager: self,
            buffer: Some(id),
            fence,
        }
    }

    /// Adds one reference to `buffer` if it is still tracked.
    ///
    /// An untracked identity is ignored: the caller may simply have raced
    /// with another thread's teardown of the same buffer.
    pub fn register_buffer(&self, buffer: BufferId) {
        let mut buffers = self.buffers.lock();
        Self::register_locked(&mut buffers, buffer);
    }

    /// Batch form of [`register_buffer`](Self::register_buffer), one lock
    /// acquisition for the whole batch. Duplicates count once per occurrence.
    pub fn register_buffers(&self, ids: &[BufferId]) {
        let mut buffers = self.buffers.lock();
        for &id in ids {
            Self::register_locked(&mut buffers, id);
        }
    }

    /// Returns one reference to `buffer`; erases the entry (buffer and sync
    /// object included) when the last reference is returned. Untracked
    /// identities are ignored.
    pub fn unregister_buffer(&self, buffer: BufferId) {
        let mut buffers = self.buffers.lock();
        Self::unregister_locked(&mut buffers, buffer);
    }

    /// Batch form of [`unregister_buffer`](Self::unregister_buffer), one lock
    /// acquisition. An identity erased earlier in the batch is simply not
    /// found by its later occurrences.
    pub fn unregister_buffers(&self, ids: &[BufferId]) {
        let mut buffers = self.buffers.lock();
        for &id in ids {
            Self::unregister_locked(&mut buffers, id);
        }
    }

    fn register_locked(entries: &mut [BufferEntry], id: BufferId) {
        match entries.iter_mut().find(|entry| entry.buffer.id() == id) {
            Some(entry) => entry.ref_count += 1,
            None => trace!(buffer = %id, "register on untracked buffer ignored"),
        }
    }

    fn unregister_locked(entries: &mut Vec<BufferEntry>, id: BufferId) {
        let Some(index) = entries.iter().position(|entry| entry.buffer.id() == id) else {
            trace!(buffer = %id, "unregister on untracked buffer ignored");
            return;
        };

        entries[index].ref_count -= 1;
        if entries[index].ref_count <= 0 {
            entries.remove(index);
        }
    }

    /// Drops the sync object of every buffer whose layer binding reports a
    /// signaled release fence. Reference counts and entry presence are
    /// untouched; running twice over the same bindings is a no-op.
    pub fn signal_buffers_if_ready(&self, layers: &[OverlayLayer]) {
        let mut buffers = self.buffers.lock();
        for layer in layers {
            if layer.release_fence_state() != ReleaseFenceState::Ready {
                continue;
            }
            let Some(id) = layer.buffer() else {
                continue;
            };
            if let Some(entry) = buffers.iter_mut().find(|entry| entry.buffer.id() == id) {
                entry.sync = None;
            }
        }
    }

    /// Per-frame teardown path: returns one reference for every binding that
    /// still holds a buffer, clearing the binding so it cannot be matched by
    /// a later scan. Walks the current layer set rather than remembered
    /// identities, so each bound layer contributes exactly one decrement even
    /// when several bindings name the same buffer.
    pub fn unregister_layer_buffers(&self, layers: &mut [OverlayLayer]) {
        let mut buffers = self.buffers.lock();
        for layer in layers {
            let Some(id) = layer.buffer() else {
                continue;
            };
            let Some(index) = buffers.iter().position(|entry| entry.buffer.id() == id) else {
                trace!(buffer = %id, "layer bound to untracked buffer ignored");
                continue;
            };

            buffers[index].ref_count -= 1;
            layer.mark_buffer_released();
            if buffers[index].ref_count <= 0 {
                buffers.remove(index);
            }
        }
    }

    /// Number of buffers currently tracked.
    pub fn tracked_buffers(&self) -> usize {
        self.buffers.lock().len()
    }

    /// Current reference count of `buffer`, or `None` if it is not tracked.
    pub fn ref_count(&self, buffer: BufferId) -> Option<i32> {
        self.buffers
            .lock()
            .iter()
            .find(|entry| entry.buffer.id() == buffer)
            .map(|entry| entry.ref_count)
    }

    /// Whether `buffer` still owns its sync object, i.e. its release fence
    /// has not been reported signaled yet. `false` for untracked buffers.
    pub fn awaits_release_fence(&self, buffer: BufferId) -> bool {
        self.buffers
            .lock()
            .iter()
            .any(|entry| entry.buffer.id() == buffer && entry.sync.is_some())
    }
}

/// RAII handle for one unit of reference count on a managed overlay buffer.
///
/// Created only by the manager's create operations. The handle does not own
/// the buffer itself; it owns the creation's implicit reference and returns
/// it exactly once when dropped. Moving the handle transfers that obligation;
/// there is deliberately no `Clone`, a copy would double-return the
/// reference.
#[must_use = "dropping the handle returns the buffer reference"]
pub struct ImportedBuffer<'mgr> {
    manager: &'mgr OverlayBufferManager,
    buffer: Option<BufferId>,
    fence: Option<SyncFence>,
}

impl ImportedBuffer<'_> {
    /// Identity of the buffer this handle references. `Some` for the whole
    /// life of the handle; cleared only by the drop itself.
    pub fn id(&self) -> Option<BufferId> {
        self.buffer
    }

    /// The release fence obtained when the buffer was created, or `None`
    /// when sync object setup failed for this buffer.
    pub fn fence(&self) -> Option<SyncFence> {
        self.fence
    }

    /// Returns the reference now instead of at end of scope.
    pub fn release(self) {}
}

impl Drop for ImportedBuffer<'_> {
    fn drop(&mut self) {
        if let Some(id) = self.buffer.take() {
            self.manager.unregister_buffer(id);
        }
    }
}
