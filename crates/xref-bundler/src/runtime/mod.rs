//! Platform runtime abstraction for file access
//!
//! The file loader never touches `std::fs` directly. It reads through the
//! `Runtime` trait so embedders without a real filesystem (wasm, editors with
//! unsaved buffers) can supply file contents themselves.

// Platform-specific runtime implementations
#[cfg(not(target_family = "wasm"))]
mod native;

mod memory;

#[cfg(not(target_family = "wasm"))]
pub use native::NativeRuntime;

pub use memory::MemoryRuntime;

use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Result type for runtime operations
pub type RuntimeResult<T> = Result<T, RuntimeError>;

/// Errors that can occur during runtime operations
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(String),

    /// Other runtime error
    #[error("Runtime error: {0}")]
    Other(String),
}

/// Platform runtime trait
///
/// Relative paths are resolved against the implementation's working
/// directory.
// WASM target: futures are not Send
#[cfg(target_family = "wasm")]
#[async_trait(?Send)]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;
}

// Native target: Multi-threaded, requires Send + Sync
#[cfg(not(target_family = "wasm"))]
#[async_trait]
pub trait Runtime: Send + Sync + std::fmt::Debug {
    /// Read a file
    async fn read_file(&self, path: &Path) -> RuntimeResult<Vec<u8>>;
}
