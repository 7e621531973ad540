//! Parser and unparser for the Morph host language
//!
//! The host language is indentation based:
//! - Lexing with logos, followed by a layout pass for indentation
//! - Recursive descent parsing into a `morph_core::ast::Graph`
//! - Unparsing back to canonical text with a source map

pub mod error;
pub mod lexer;
pub mod parser;
pub mod unparse;


pub use error::{ErrorKind, ParseError};
pub use parser::{ParseResult, Parser};
pub use unparse::{SourceMap, Unparsed, Unparser};

use morph_core::ast::Graph;
use tracing::trace;

/// Parse Morph source code into an AST graph rooted at a `Module` node
pub fn parse(source: &str) -> Result<Graph, ParseError> {
    Parser::new(source)?.parse()
}

/// Parse with custom depth limit to prevent stack overflow
pub fn parse_with_depth_limit(source: &str, max_depth: usize) -> Result<Graph, ParseError> {
    Parser::new(source)?.with_max_depth(max_depth).parse()
}

/// Render a graph as host source text
pub fn unparse(graph: &Graph) -> Result<Unparsed, ParseError> {
    Unparser::new(graph).unparse()
}

/// The host grammar as a reusable value: parse and unparse with one
/// configured depth limit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostGrammar {
    pub max_depth: usize,
}

impl Default for HostGrammar {
    fn default() -> Self {
        Self {
            max_depth: Parser::DEFAULT_MAX_DEPTH,
        }
    }
}

impl HostGrammar {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn parse(&self, source: &str) -> Result<Graph, ParseError> {
        trace!("Parsing {} bytes", source.len());
        parse_with_depth_limit(source, self.max_depth)
    }

    pub fn unparse(&self, graph: &Graph) -> Result<Unparsed, ParseError> {
        unparse(graph)
    }
}
