//! Error types for the Neon engine
//!
//! This module defines the error types used throughout the engine,
//! including shader processing, pipeline construction and device management.

use std::fmt;
use std::path::PathBuf;

use crate::shader::ShaderStage;

/// Result type for Neon engine operations
pub type Result<T> = std::result::Result<T, Error>;

/// Neon engine errors
///
/// Every variant is fatal for the operation that produced it: nothing in the
/// shader or pipeline path retries or falls back.
#[derive(Debug, Clone)]
pub enum Error {
    /// Malformed stage marker in a combined shader source
    SyntaxError(String),

    /// Stage marker names a stage that is not vertex, fragment or pixel
    UnknownStage(String),

    /// Shader compiler rejected the source
    CompileError {
        /// Stage being compiled
        stage: ShaderStage,
        /// Compiler output, verbatim
        message: String,
    },

    /// Cache claimed the source was unchanged but the cached binary is absent
    CacheMiss(PathBuf),

    /// Reflected resources do not fit the slot counts of a shader object
    ResourceCountMismatch {
        /// Stage whose counts disagree
        stage: ShaderStage,
        /// What disagreed
        message: String,
    },

    /// Backend rejected a shader object or pipeline, or its inputs were invalid
    PipelineCreation(String),

    /// A shader program lacks a stage required to build a pipeline
    MissingStage(ShaderStage),

    /// File not found
    NotFound(PathBuf),

    /// Backend-specific error (Vulkan, etc.)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (buffer, shader, binary, etc.)
    InvalidResource(String),

    /// Initialization failed (device, renderer, subsystems)
    InitializationFailed(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::SyntaxError(msg) => write!(f, "Shader syntax error: {}", msg),
            Error::UnknownStage(keyword) => write!(f, "Unknown shader stage '{}'", keyword),
            Error::CompileError { stage, message } => {
                write!(f, "Failed to compile {} shader: {}", stage, message)
            }
            Error::CacheMiss(path) => write!(
                f,
                "Cached shader binary missing while source is unchanged: {}",
                path.display()
            ),
            Error::ResourceCountMismatch { stage, message } => {
                write!(f, "Resource count mismatch in {} shader: {}", stage, message)
            }
            Error::PipelineCreation(msg) => write!(f, "Pipeline creation failed: {}", msg),
            Error::MissingStage(stage) => write!(f, "Shader program has no {} stage", stage),
            Error::NotFound(path) => write!(f, "File not found: {}", path.display()),
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
