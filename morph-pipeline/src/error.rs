//! Error types for compilation passes

use morph_core::ast::Position;
use morph_core::{FileId, SourceRegistry};
use morph_host::{HostError, RuntimeError};
use thiserror::Error;

/// Failure reported by a transformer
#[derive(Error, Debug)]
pub enum TransformError {
    #[error("{message}")]
    Rejected {
        message: String,
        position: Option<Position>,
    },

    #[error("Invalid tree: {0}")]
    InvalidTree(String),

    #[error("Graph error: {0}")]
    Graph(#[from] morph_core::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl TransformError {
    pub fn rejected(message: impl Into<String>) -> Self {
        Self::Rejected {
            message: message.into(),
            position: None,
        }
    }

    /// Rejection citing a position in the original source
    pub fn at(message: impl Into<String>, position: Position) -> Self {
        Self::Rejected {
            message: message.into(),
            position: Some(position),
        }
    }
}

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Source unavailable for '{name}' in {file}: {reason}")]
    SourceUnavailable {
        name: String,
        file: FileId,
        reason: String,
    },

    #[error("Could not reparse '{name}': {error}")]
    ReparseFailure {
        name: String,
        raw: String,
        normalized: String,
        error: String,
    },

    #[error("Unresolved support symbol '{symbol}'")]
    UnresolvedSupportSymbol { symbol: String, generated: String },

    #[error("{file}:{position}: {message}")]
    CompileError {
        message: String,
        file: FileId,
        position: Position,
        /// Source line at `position`, when the registry has it
        citation: Option<String>,
        generated: String,
    },

    #[error(transparent)]
    Runtime(RuntimeError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Compiled unit did not bind '{name}'")]
    MissingTarget { name: String },

    #[error("Virtual module '{0}' already exists")]
    VirtualModuleExists(String),

    #[error(transparent)]
    Expansion(anyhow::Error),
}

impl PipelineError {
    /// Converts a host failure on `generated`, mapping compile positions back
    /// through the registry's origin maps.
    pub fn from_host(err: HostError, sources: &SourceRegistry, generated: &str) -> Self {
        match err {
            HostError::Compile(err) => {
                let (file, position) = sources
                    .resolve_origin(&err.file, err.position)
                    .unwrap_or((err.file, err.position));
                let citation = sources.get_line(&file, position.line);
                PipelineError::CompileError {
                    message: err.message,
                    file,
                    position,
                    citation,
                    generated: generated.to_string(),
                }
            }
            HostError::Runtime(err) => PipelineError::Runtime(err),
            HostError::Expansion(err) => PipelineError::Expansion(err),
            HostError::Io(err) => PipelineError::Expansion(err.into()),
        }
    }

    /// Position in the original source, for errors that carry one
    pub fn position(&self) -> Option<Position> {
        match self {
            PipelineError::CompileError { position, .. } => Some(*position),
            PipelineError::Runtime(err) => err
                .origin
                .as_ref()
                .or(err.location.as_ref())
                .map(|(_, position)| *position),
            PipelineError::Transform(TransformError::Rejected { position, .. }) => *position,
            _ => None,
        }
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;
    use morph_host::CompileError;

    #[test]
    fn test_compile_error_display_hides_generated_text() {
        let err = PipelineError::CompileError {
            message: "name 'x' is not defined".to_string(),
            file: FileId::new("app.mo"),
            position: Position::new(4, 12),
            citation: Some("        return x".to_string()),
            generated: "def f():\n    return x\n".to_string(),
        };
        assert_eq!(err.to_string(), "app.mo:4:12: name 'x' is not defined");
        assert_eq!(err.position(), Some(Position::new(4, 12)));
    }

    #[test]
    fn test_from_host_without_origin_keeps_position() {
        let sources = SourceRegistry::new();
        sources.register(FileId::new("plain.mo"), "a = 1\nb = (\n");
        let host = HostError::Compile(CompileError::new(
            "unexpected end of input",
            FileId::new("plain.mo"),
            Position::new(2, 5),
        ));

        let err = PipelineError::from_host(host, &sources, "a = 1\nb = (\n");
        let PipelineError::CompileError {
            file,
            position,
            citation,
            ..
        } = err
        else {
            panic!("expected compile error");
        };
        assert_eq!(file, FileId::new("plain.mo"));
        assert_eq!(position, Position::new(2, 5));
        assert_eq!(citation.as_deref(), Some("b = ("));
    }

    #[test]
    fn test_transform_error_positions() {
        let err: PipelineError = TransformError::at("bad token", Position::new(3, 1)).into();
        assert_eq!(err.to_string(), "Transform error: bad token");
        assert_eq!(err.position(), Some(Position::new(3, 1)));
        assert_eq!(
            PipelineError::from(TransformError::rejected("no")).position(),
            None
        );
    }
}
