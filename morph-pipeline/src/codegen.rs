//! Regenerating host source for a transformed definition

use morph_core::ast::{Node, Position};
use morph_core::{FileId, Graph, OriginMap};
use tracing::debug;

use crate::error::{PipelineError, Result, TransformError};
use crate::extract::DefinitionSite;
use crate::host::{Grammar, HostCompiler};
use crate::scope::ScopeBinding;

/// Host source produced for one definition
#[derive(Debug, Clone)]
pub struct GeneratedUnit {
    pub file: FileId,
    pub text: String,
    /// Support symbols imported by the prelude, in first-use order
    pub imports: Vec<String>,
    /// Generated positions back to the definition site
    pub origin: OriginMap,
}

impl GeneratedUnit {
    /// Original position of a generated one
    pub fn original_position(&self, generated: Position) -> Option<Position> {
        self.origin.lookup(generated)
    }
}

pub struct CodeGenerator<'a> {
    grammar: &'a dyn Grammar,
    compiler: &'a dyn HostCompiler,
}

impl<'a> CodeGenerator<'a> {
    pub fn new(grammar: &'a dyn Grammar, compiler: &'a dyn HostCompiler) -> Self {
        Self { grammar, compiler }
    }

    /// Unparses `graph` and prepends an `import` for every support symbol the
    /// target scope cannot already see
    pub fn generate(
        &self,
        graph: &Graph,
        site: &DefinitionSite,
        binding: &ScopeBinding,
        file: FileId,
    ) -> Result<GeneratedUnit> {
        let mut unparsed = self
            .grammar
            .unparse(graph)
            .map_err(|err| TransformError::InvalidTree(err.to_string()))?;

        let mut imports: Vec<String> = Vec::new();
        for symbol in support_refs(graph) {
            if binding.is_visible(&symbol) {
                continue;
            }
            if !self.compiler.has_support(&symbol) {
                return Err(PipelineError::UnresolvedSupportSymbol {
                    symbol,
                    generated: unparsed.text,
                });
            }
            imports.push(symbol);
        }

        let prelude_lines = imports.len() as u32;
        let mut text: String = imports.iter().map(|name| format!("import {name}\n")).collect();
        text.push_str(&unparsed.text);
        unparsed.source_map.shift_lines(prelude_lines);

        let mut origin = OriginMap::new(
            site.file.clone(),
            prelude_lines,
            site.start_line.saturating_sub(1),
            site.dedent_columns,
        );
        for &(generated, id) in unparsed.source_map.iter() {
            if let Some(span) = graph.span(id) {
                origin.push(generated, span.start);
            }
        }
        let origin = origin.finish();
        debug!(
            "Generated {} ({} prelude imports, {} origin entries)",
            file,
            imports.len(),
            origin.len()
        );

        Ok(GeneratedUnit {
            file,
            text,
            imports,
            origin,
        })
    }
}

/// Distinct support reference names in first-use order
fn support_refs(graph: &Graph) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    let Some(root) = graph.root_id else {
        return names;
    };
    graph.dfs_from(root, |id, node| {
        if let Node::Name { id: name } = node {
            if graph.is_support_ref(id) && !names.contains(name) {
                names.push(name.clone());
            }
        }
    });
    names
}

#[cfg(test)]
#[path = "codegen_tests.rs"]
mod tests;
