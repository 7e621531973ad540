//! Morph reference host
//!
//! This crate runs the indentation-based host language:
//! - `Loader` compiles units into namespaces and runs modules from disk
//! - `UnitChecker` performs static checks, including eager name resolution
//! - `Interpreter` walks the syntax graph and applies definition markers

pub mod builtins;
pub mod check;
pub mod config;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod loader;

pub use check::UnitChecker;
pub use config::{HostConfig, NameResolution};
pub use environment::Environment;
pub use error::{CompileError, ControlFlow, HostError, HostResult, RuntimeError};
pub use interpreter::Interpreter;
pub use loader::Loader;

// Re-export commonly used types
pub use morph_core::{FileId, Namespace, SourceRegistry, Value};
