//! Moving parsed positions onto the original file
//!
//! A definition is reparsed from its normalized text, so every span starts out
//! relative to that text. [`ParsedDefinition::remap`] shifts all of them by the
//! same line and column deltas exactly once; the resulting
//! [`PositionedDefinition`] cannot be remapped again.

use morph_core::ast::{Node, NodeId, Span};
use morph_core::Graph;
use tracing::trace;

use crate::extract::DefinitionSite;

/// A freshly reparsed definition whose spans refer to the normalized text
#[derive(Debug)]
pub struct ParsedDefinition {
    graph: Graph,
}

/// A definition whose spans refer to the original file
#[derive(Debug)]
pub struct PositionedDefinition {
    graph: Graph,
}

impl ParsedDefinition {
    /// Takes a parsed module holding exactly one definition named `name` and
    /// re-roots the graph at that definition.
    pub fn from_module(mut graph: Graph, name: &str) -> Result<Self, String> {
        let module = graph.root_id.ok_or("parsed tree has no root")?;
        let definition = match graph.get_node(module) {
            Some(Node::Module { body }) if body.len() == 1 => body[0],
            Some(Node::Module { body }) => {
                return Err(format!("expected one definition, found {} statements", body.len()))
            }
            _ => return Err("parsed tree is not a module".to_string()),
        };
        match graph.get_node(definition) {
            Some(Node::FunctionDef(def)) if def.name == name => {}
            Some(Node::FunctionDef(def)) => {
                return Err(format!("expected definition '{name}', found '{}'", def.name))
            }
            _ => return Err("statement is not a function definition".to_string()),
        }

        graph.nodes.remove(&module);
        graph.metadata.remove(&module);
        graph.root_id = Some(definition);
        Ok(Self { graph })
    }

    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// Shifts every span by `start_line - 1` lines and `dedent_columns` columns
    pub fn remap(mut self, site: &DefinitionSite) -> PositionedDefinition {
        let line_delta = site.start_line.saturating_sub(1);
        let col_delta = site.dedent_columns;
        let mut shifted = 0usize;
        for meta in self.graph.metadata.values_mut() {
            if let Some(span) = meta.span.as_mut() {
                *span = span.shifted(line_delta, col_delta);
                shifted += 1;
            }
        }
        trace!(
            "Remapped {} spans of '{}' by (+{}, +{})",
            shifted,
            site.name,
            line_delta,
            col_delta
        );
        PositionedDefinition { graph: self.graph }
    }
}

impl PositionedDefinition {
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    pub fn graph_mut(&mut self) -> &mut Graph {
        &mut self.graph
    }

    pub fn into_graph(self) -> Graph {
        self.graph
    }
}

/// Gives every spanless node reachable from the root the span of its nearest
/// positioned ancestor. Returns the number of nodes repaired.
pub fn repair_spans(graph: &mut Graph) -> usize {
    let Some(root) = graph.root_id else {
        return 0;
    };
    let mut repairs: Vec<(NodeId, Span)> = Vec::new();
    let mut stack: Vec<(NodeId, Option<Span>)> = vec![(root, None)];
    while let Some((id, inherited)) = stack.pop() {
        let own = graph.span(id);
        if own.is_none() {
            if let Some(span) = inherited {
                repairs.push((id, span));
            }
        }
        let passed = own.or(inherited);
        for child in graph.children(id) {
            stack.push((child, passed));
        }
    }

    let repaired = repairs.len();
    for (id, span) in repairs {
        graph.set_span(id, span);
    }
    trace!("Repaired {} spans", repaired);
    repaired
}
