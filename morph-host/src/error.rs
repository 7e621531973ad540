//! Error types for the host loader and interpreter

use morph_core::ast::Position;
use morph_core::source::FileId;
use std::fmt;
use thiserror::Error;

/// Result type for host operations
pub type HostResult<T> = Result<T, HostError>;

/// A unit was rejected before any of it ran
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{file}:{position}: {message}")]
pub struct CompileError {
    pub message: String,
    pub file: FileId,
    pub position: Position,
}

impl CompileError {
    pub fn new(message: impl Into<String>, file: FileId, position: Position) -> Self {
        Self {
            message: message.into(),
            file,
            position,
        }
    }
}

/// Failure while executing host code
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RuntimeError {
    pub message: String,
    /// Where the failing construct sits, when it came from parsed text
    pub location: Option<(FileId, Position)>,
    /// The same location traced back through generated units
    pub origin: Option<(FileId, Position)>,
}

impl RuntimeError {
    /// An error not tied to any source text
    pub fn detached(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            location: None,
            origin: None,
        }
    }
}

impl fmt::Display for RuntimeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some((file, position)) = &self.location {
            write!(f, "{file}:{position}: ")?;
        }
        write!(f, "{}", self.message)?;
        if let Some((file, position)) = &self.origin {
            write!(f, " (originally at {file}:{position})")?;
        }
        Ok(())
    }
}

impl std::error::Error for RuntimeError {}

/// Errors that can occur while compiling or running host code
#[derive(Debug, Error)]
pub enum HostError {
    /// Syntax error or failed static check
    #[error("Compile error: {0}")]
    Compile(#[from] CompileError),

    /// Error raised while running
    #[error("Runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// A macro marker failed to expand its definition
    #[error(transparent)]
    Expansion(anyhow::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Control flow out of a statement list
#[derive(Debug, Clone)]
pub enum ControlFlow {
    /// Fell off the end of the block
    Normal,
    /// Return from function
    Return(morph_core::Value),
}
