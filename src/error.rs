//! Mesh pipeline error handling
//!
//! Asset-sourcing failures are recoverable by design: the orchestrator
//! substitutes a procedural fallback instead of propagating them, so most
//! of these variants surface only from the low-level loader, parser, and
//! LOD APIs. Errors are `Clone` because a shared in-flight load broadcasts
//! one outcome to every waiter.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used across the mesh pipeline.
pub type MeshResult<T> = Result<T, MeshError>;

/// Errors produced by the mesh pipeline.
#[derive(Debug, Clone, Error)]
pub enum MeshError {
    #[error("unsupported mesh format: {format}")]
    UnsupportedFormat { format: String },

    #[error("no mesh found in '{source_id}'")]
    NoMeshFound { source_id: String },

    #[error("loading '{source_id}' failed: {reason}")]
    LoadingFailed { source_id: String, reason: String },

    #[error("invalid mesh data at line {line}: {message}")]
    InvalidFormat { line: usize, message: String },

    #[error("invalid LOD level {level}, expected a level in 1..{max}")]
    InvalidLodLevel { level: u32, max: u32 },

    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("load cancelled for '{source_id}'")]
    Cancelled { source_id: String },
}

impl MeshError {
    /// Wrap an underlying I/O or decode failure with its source identity.
    pub fn loading_failed(source_id: impl Into<String>, cause: impl std::fmt::Display) -> Self {
        MeshError::LoadingFailed {
            source_id: source_id.into(),
            reason: cause.to_string(),
        }
    }

    /// Malformed directive or reference in a parsed mesh file.
    pub fn invalid_format(line: usize, message: impl Into<String>) -> Self {
        MeshError::InvalidFormat {
            line,
            message: message.into(),
        }
    }
}
