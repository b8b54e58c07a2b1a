//! Error types for the Kokoromi renderer
//!
//! This module defines the error type shared by the core crate and its
//! backends: device setup, resource upload and asset loading.

use std::fmt;

/// Result type for Kokoromi operations
pub type Result<T> = std::result::Result<T, Error>;

/// Kokoromi errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (failed GPU API call, unsupported configuration)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (texture, buffer, mesh range, etc.)
    InvalidResource(String),

    /// Initialization failed (instance, device, swapchain, pipeline)
    InitializationFailed(String),

    /// An asset on disk could not be read or decoded (shader blob, texture image)
    AssetLoad(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::AssetLoad(msg) => write!(f, "Asset load failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
