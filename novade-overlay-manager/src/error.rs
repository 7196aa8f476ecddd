// Error types for the overlay manager, using `thiserror`.

use std::os::unix::io::RawFd;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum OverlayManagerError {
    #[error("failed to create native buffer handler instance for GPU fd {gpu_fd}")]
    HandlerUnavailable { gpu_fd: RawFd },
}

/// Crate-local result alias. Only manager initialization is fallible;
/// steady-state operations absorb their failure modes locally.
pub type Result<T, E = OverlayManagerError> = std::result::Result<T, E>;
