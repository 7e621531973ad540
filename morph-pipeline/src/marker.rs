//! Removing the marker that triggered the current pass

use morph_core::ast::Node;
use morph_core::Graph;
use tracing::debug;

pub struct MarkerStripper;

impl MarkerStripper {
    /// Pops the front marker of the root definition and drops its expression
    /// subtree. Later markers stay for later passes. Returns whether a marker
    /// was removed.
    pub fn strip_front(graph: &mut Graph) -> bool {
        let Some(root) = graph.root_id else {
            return false;
        };
        let marker = match graph.get_node_mut(root) {
            Some(Node::FunctionDef(def)) if !def.markers.is_empty() => def.markers.remove(0),
            _ => return false,
        };
        let removed = graph.remove_subtree(marker);
        debug!("Stripped front marker ({} nodes)", removed);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remap::ParsedDefinition;

    fn definition(text: &str) -> Graph {
        let graph = morph_parser::parse(text).unwrap();
        ParsedDefinition::from_module(graph, "f")
            .unwrap()
            .graph()
            .clone()
    }

    fn markers(graph: &Graph) -> Vec<String> {
        let (_, def) = graph.root_function().unwrap();
        def.markers
            .iter()
            .map(|id| match graph.get_node(*id) {
                Some(Node::Name { id }) => id.clone(),
                Some(Node::Call { .. }) => "<call>".to_string(),
                other => format!("{other:?}"),
            })
            .collect()
    }

    #[test]
    fn test_strips_only_the_front_marker() {
        let mut graph = definition("@first\n@second(1, 2)\ndef f():\n    pass\n");
        assert_eq!(markers(&graph), vec!["first", "<call>"]);

        assert!(MarkerStripper::strip_front(&mut graph));
        assert_eq!(markers(&graph), vec!["<call>"]);
        graph.validate().unwrap();

        assert!(MarkerStripper::strip_front(&mut graph));
        assert!(markers(&graph).is_empty());
        // The call and its arguments are gone from the arena
        assert_eq!(graph.nodes.len(), 2);
        graph.validate().unwrap();
    }

    #[test]
    fn test_unmarked_definition_is_untouched() {
        let mut graph = definition("def f():\n    pass\n");
        let before = graph.nodes.len();
        assert!(!MarkerStripper::strip_front(&mut graph));
        assert_eq!(graph.nodes.len(), before);
    }
}
