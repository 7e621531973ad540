//! Definition-time macro/DSL compilation for Morph
//!
//! A marker placed above a host definition triggers a pass that:
//! - Recovers the definition's text and position from the source registry
//! - Normalizes indentation, reparses, and remaps positions onto the file
//! - Strips the triggering marker and runs a pluggable [`Transformer`]
//! - Regenerates host source with any support imports it needs
//! - Compiles the unit into an ambient, private or virtual namespace

pub mod codegen;
pub mod config;
pub mod error;
pub mod extract;
pub mod host;
pub mod marker;
pub mod pipeline;
pub mod remap;
pub mod scope;
pub mod transform;
pub mod virtual_module;

pub use codegen::{CodeGenerator, GeneratedUnit};
pub use config::{PassOptions, ScopeRequest};
pub use error::{PipelineError, Result, TransformError};
pub use extract::{normalize, DefinitionSite, Normalized, SourceExtractor};
pub use host::{Grammar, HostCompiler};
pub use marker::MarkerStripper;
pub use pipeline::{Compiled, Marker, Pipeline};
pub use remap::{repair_spans, ParsedDefinition, PositionedDefinition};
pub use scope::{ScopeBinder, ScopeBinding};
pub use transform::{rewrite_names, Identity, TransformContext, Transformed, Transformer};
pub use virtual_module::VirtualModuleRegistry;
