//! Error types for value operations

use std::fmt;

/// Error type for value operations
#[derive(Debug, Clone, PartialEq)]
pub enum ValueError {
    /// Type mismatch error
    TypeError {
        expected: &'static str,
        actual: &'static str,
    },

    /// Unsupported operand combination
    InvalidOperation(String),

    /// Division by zero
    DivisionByZero,

    /// Function arity mismatch
    ArityMismatch { expected: usize, actual: usize },
}

impl fmt::Display for ValueError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValueError::TypeError { expected, actual } => {
                write!(f, "Type error: expected {}, got {}", expected, actual)
            }
            ValueError::InvalidOperation(msg) => {
                write!(f, "Invalid operation: {}", msg)
            }
            ValueError::DivisionByZero => {
                write!(f, "Division by zero")
            }
            ValueError::ArityMismatch { expected, actual } => {
                write!(f, "Function expects {} arguments, got {}", expected, actual)
            }
        }
    }
}

impl std::error::Error for ValueError {}

/// Result type for value operations
pub type ValueResult<T> = Result<T, ValueError>;
