//! Interfaces the pipeline requires from the host language

use morph_core::{FileId, Graph, Namespace};
use morph_host::{HostResult, Loader};
use morph_parser::{HostGrammar, ParseError, Unparsed};

/// Text to tree and back
pub trait Grammar {
    fn parse(&self, text: &str, file: &FileId) -> Result<Graph, ParseError>;

    fn unparse(&self, graph: &Graph) -> Result<Unparsed, ParseError>;
}

impl Grammar for HostGrammar {
    fn parse(&self, text: &str, _file: &FileId) -> Result<Graph, ParseError> {
        HostGrammar::parse(self, text)
    }

    fn unparse(&self, graph: &Graph) -> Result<Unparsed, ParseError> {
        HostGrammar::unparse(self, graph)
    }
}

/// Compiles text against a lookup and a write namespace
pub trait HostCompiler {
    fn compile(
        &self,
        text: &str,
        file: &FileId,
        lookup: &Namespace,
        write: &Namespace,
    ) -> HostResult<()>;

    /// Whether `name` can be brought in by an `import` statement
    fn has_support(&self, name: &str) -> bool;
}

impl HostCompiler for Loader {
    fn compile(
        &self,
        text: &str,
        file: &FileId,
        lookup: &Namespace,
        write: &Namespace,
    ) -> HostResult<()> {
        Loader::compile(self, text, file, lookup, write)
    }

    fn has_support(&self, name: &str) -> bool {
        Loader::has_support(self, name)
    }
}
