//! Parser error types

use morph_core::ast::Position;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected token at {position}: expected {expected}, found {found}")]
    UnexpectedToken {
        position: Position,
        expected: String,
        found: String,
    },

    #[error("Unexpected end of input at {position}")]
    UnexpectedEof { position: Position },

    #[error("Unexpected indent at {position}")]
    UnexpectedIndent { position: Position },

    #[error("Unindent does not match any outer indentation level at {position}")]
    InconsistentDedent { position: Position },

    #[error("Invalid token at {position}: {text:?}")]
    InvalidToken { position: Position, text: String },

    #[error("Invalid number literal at {position}: {text}")]
    InvalidNumber { position: Position, text: String },

    #[error("Cannot assign to expression at {position}")]
    InvalidAssignmentTarget { position: Position },

    #[error("Maximum parsing depth exceeded at {position}: depth {depth} exceeds limit of {max_depth}")]
    MaxDepthExceeded {
        position: Position,
        depth: usize,
        max_depth: usize,
    },

    #[error("Graph error: {0}")]
    Graph(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    UnexpectedToken,
    UnexpectedEof,
    UnexpectedIndent,
    InconsistentDedent,
    InvalidToken,
    InvalidNumber,
    InvalidAssignmentTarget,
    MaxDepthExceeded,
    Graph,
}

impl ParseError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ParseError::UnexpectedToken { .. } => ErrorKind::UnexpectedToken,
            ParseError::UnexpectedEof { .. } => ErrorKind::UnexpectedEof,
            ParseError::UnexpectedIndent { .. } => ErrorKind::UnexpectedIndent,
            ParseError::InconsistentDedent { .. } => ErrorKind::InconsistentDedent,
            ParseError::InvalidToken { .. } => ErrorKind::InvalidToken,
            ParseError::InvalidNumber { .. } => ErrorKind::InvalidNumber,
            ParseError::InvalidAssignmentTarget { .. } => ErrorKind::InvalidAssignmentTarget,
            ParseError::MaxDepthExceeded { .. } => ErrorKind::MaxDepthExceeded,
            ParseError::Graph(_) => ErrorKind::Graph,
        }
    }

    /// Where the error was detected, if known
    pub fn position(&self) -> Option<Position> {
        match self {
            ParseError::UnexpectedToken { position, .. }
            | ParseError::UnexpectedEof { position }
            | ParseError::UnexpectedIndent { position }
            | ParseError::InconsistentDedent { position }
            | ParseError::InvalidToken { position, .. }
            | ParseError::InvalidNumber { position, .. }
            | ParseError::InvalidAssignmentTarget { position }
            | ParseError::MaxDepthExceeded { position, .. } => Some(*position),
            ParseError::Graph(_) => None,
        }
    }

    /// Message without the position suffix
    pub fn message(&self) -> String {
        match self {
            ParseError::UnexpectedToken {
                expected, found, ..
            } => format!("invalid syntax: expected {expected}, found {found}"),
            ParseError::UnexpectedEof { .. } => "unexpected end of input".to_string(),
            ParseError::UnexpectedIndent { .. } => "unexpected indent".to_string(),
            ParseError::InconsistentDedent { .. } => {
                "unindent does not match any outer indentation level".to_string()
            }
            ParseError::InvalidToken { text, .. } => format!("invalid token {text:?}"),
            ParseError::InvalidNumber { text, .. } => format!("invalid number literal {text}"),
            ParseError::InvalidAssignmentTarget { .. } => {
                "cannot assign to expression".to_string()
            }
            ParseError::MaxDepthExceeded { max_depth, .. } => {
                format!("maximum parsing depth {max_depth} exceeded")
            }
            ParseError::Graph(msg) => msg.clone(),
        }
    }
}

impl From<morph_core::Error> for ParseError {
    fn from(err: morph_core::Error) -> Self {
        ParseError::Graph(err.to_string())
    }
}
