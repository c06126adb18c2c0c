//! Error types for the Parallax culling engine
//!
//! This module defines the error types used throughout the engine,
//! including device, initialization, and per-frame readback failures.

use std::fmt;

/// Result type for Parallax operations
pub type Result<T> = std::result::Result<T, Error>;

/// Parallax engine errors
#[derive(Debug, Clone)]
pub enum Error {
    /// Backend-specific error (Vulkan, software executor, etc.)
    BackendError(String),

    /// Out of device memory
    OutOfMemory,

    /// Invalid resource (buffer, kernel, binding group, etc.)
    InvalidResource(String),

    /// Initialization failed (device, culling pipeline, bounds build)
    InitializationFailed(String),

    /// Visibility flag readback failed; the frame's apply was skipped
    ReadbackFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of device memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::ReadbackFailed(msg) => write!(f, "Readback failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
