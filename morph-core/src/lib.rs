//! Core types and data structures for Morph
//!
//! This crate provides the fundamental building blocks shared by the host
//! language and the compilation pipeline:
//! - Arena syntax tree with per-node source spans
//! - Runtime values and namespaces
//! - Source registry with generated-file origin maps
//! - Error types

pub mod ast;
pub mod error;
pub mod source;
pub mod value;

pub use ast::{Graph, Node, NodeId, Position, Span};
pub use error::{Error, Result};
pub use source::{FileId, OriginMap, SourceRegistry};
pub use value::{
    DefinitionContext, DefinitionRef, Function, MacroHook, Namespace, NativeFunction, Value,
    ValueError,
};
