//! Transformer plugin contract and tree rewriting helpers

use morph_core::ast::{Node, NodeId};
use morph_core::{Graph, Value};

use crate::error::TransformError;
use crate::extract::DefinitionSite;

/// What a transformer hands back to the pipeline
#[derive(Debug)]
pub enum Transformed {
    /// A definition tree to regenerate and compile; its root is a `FunctionDef`
    Definition(Graph),
    /// A finished value that replaces the definition as is
    Value(Value),
}

/// Inputs a transformer may consult besides the tree
#[derive(Debug, Clone, Copy)]
pub struct TransformContext<'a> {
    pub site: &'a DefinitionSite,
    /// Options forwarded from the marker's invocation site
    pub dsl: &'a serde_json::Value,
    /// Whether the definition sits inside another function body
    pub nested: bool,
}

/// DSL semantics: rewrites a marker-stripped, positioned definition tree
pub trait Transformer {
    fn transform(
        &self,
        graph: Graph,
        context: &TransformContext<'_>,
    ) -> Result<Transformed, TransformError>;
}

impl<F> Transformer for F
where
    F: Fn(Graph, &TransformContext<'_>) -> Result<Transformed, TransformError>,
{
    fn transform(
        &self,
        graph: Graph,
        context: &TransformContext<'_>,
    ) -> Result<Transformed, TransformError> {
        self(graph, context)
    }
}

/// Returns the definition unchanged
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl Transformer for Identity {
    fn transform(
        &self,
        graph: Graph,
        _context: &TransformContext<'_>,
    ) -> Result<Transformed, TransformError> {
        Ok(Transformed::Definition(graph))
    }
}

/// Replaces `Name` nodes reachable from the root.
///
/// `replace` sees each name (support references excluded) and may return a
/// node to put in its place. The replacement keeps the original node's id and
/// span, so diagnostics still cite the name as written. Returns the number of
/// replacements.
pub fn rewrite_names<F>(graph: &mut Graph, mut replace: F) -> Result<usize, TransformError>
where
    F: FnMut(&mut Graph, &str) -> Result<Option<Node>, TransformError>,
{
    let root = graph
        .root_id
        .ok_or_else(|| TransformError::InvalidTree("tree has no root".to_string()))?;
    let mut names: Vec<(NodeId, String)> = Vec::new();
    graph.dfs_from(root, |id, node| {
        if let Node::Name { id: name } = node {
            names.push((id, name.clone()));
        }
    });

    let mut replaced = 0;
    for (id, name) in names {
        if graph.is_support_ref(id) {
            continue;
        }
        if let Some(node) = replace(graph, &name)? {
            if let Some(slot) = graph.get_node_mut(id) {
                *slot = node;
                replaced += 1;
            }
        }
    }
    Ok(replaced)
}
