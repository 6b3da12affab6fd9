//! Unified error handling for sceneport
//!
//! Errors raised while building or validating a scene description. The
//! exporter wraps these in its own error type.

use std::path::PathBuf;
use thiserror::Error;

/// Unified error type for scene operations
#[derive(Error, Debug)]
pub enum Error {
    // ==================== I/O Errors ====================

    /// Standard I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File not found
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// Scene description could not be decoded
    #[error("Invalid scene description: {0}")]
    Decode(#[from] serde_json::Error),

    // ==================== Reference Errors ====================

    /// A handle points outside its arena
    #[error("Dangling {kind} reference: {index}")]
    DanglingReference {
        kind: &'static str,
        index: usize,
    },

    /// A node is reachable from more than one parent, or from itself
    #[error("Node {node} is not part of a tree: {message}")]
    NotATree {
        node: usize,
        message: String,
    },

    // ==================== Geometry Errors ====================

    /// Vertex attribute streams disagree in length
    #[error("Mesh '{mesh}': {attribute} has {found} entries, expected {expected}")]
    AttributeLength {
        mesh: String,
        attribute: String,
        expected: usize,
        found: usize,
    },

    /// Triangle index outside the vertex range
    #[error("Mesh '{mesh}': index {index} out of range for {vertex_count} vertices")]
    IndexOutOfRange {
        mesh: String,
        index: u32,
        vertex_count: usize,
    },

    /// Invalid data structure
    #[error("Invalid data: {message}")]
    InvalidData {
        message: String,
    },

    // ==================== General Errors ====================

    /// Internal error (should not happen)
    #[error("Internal error: {message}")]
    Internal {
        message: String,
    },

    /// Custom error with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<Error>,
    },
}

/// Result type using the unified Error
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Create an error with additional context
    pub fn with_context(self, context: impl Into<String>) -> Self {
        Error::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Error::Internal {
            message: message.into(),
        }
    }

    /// Create an invalid data error
    pub fn invalid_data(message: impl Into<String>) -> Self {
        Error::InvalidData {
            message: message.into(),
        }
    }

    /// Create a dangling reference error
    pub fn dangling(kind: &'static str, index: usize) -> Self {
        Error::DanglingReference { kind, index }
    }

    /// Check if this is a broken reference or hierarchy
    pub fn is_reference_error(&self) -> bool {
        match self {
            Error::DanglingReference { .. } | Error::NotATree { .. } => true,
            Error::WithContext { source, .. } => source.is_reference_error(),
            _ => false,
        }
    }

    /// Check if this is a geometry/format error
    pub fn is_geometry_error(&self) -> bool {
        match self {
            Error::AttributeLength { .. }
            | Error::IndexOutOfRange { .. }
            | Error::InvalidData { .. } => true,
            Error::WithContext { source, .. } => source.is_geometry_error(),
            _ => false,
        }
    }
}

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
