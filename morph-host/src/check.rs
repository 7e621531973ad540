//! Static checks run on a parsed unit before it executes

use crate::config::NameResolution;
use crate::error::CompileError;
use morph_core::ast::{Graph, Node, NodeId, Position};
use morph_core::source::FileId;
use rustc_hash::FxHashSet;
use tracing::trace;

type NameSet = FxHashSet<String>;

/// Validates a unit's statements.
///
/// Always rejects `return` outside a function, duplicate parameters,
/// parameters declared `global` and imports of unknown support symbols.
/// With eager resolution every name must also be bound somewhere visible.
pub struct UnitChecker<'a> {
    graph: &'a Graph,
    file: &'a FileId,
    resolution: NameResolution,
    is_support: &'a dyn Fn(&str) -> bool,
    /// Names bound outside the unit (target namespaces and builtins)
    is_visible: &'a dyn Fn(&str) -> bool,
}

impl<'a> UnitChecker<'a> {
    pub fn new(
        graph: &'a Graph,
        file: &'a FileId,
        resolution: NameResolution,
        is_support: &'a dyn Fn(&str) -> bool,
        is_visible: &'a dyn Fn(&str) -> bool,
    ) -> Self {
        Self {
            graph,
            file,
            resolution,
            is_support,
            is_visible,
        }
    }

    pub fn check(&self) -> Result<(), CompileError> {
        let Some(root) = self.graph.root_id else {
            return Ok(());
        };
        let body = match self.graph.get_node(root) {
            Some(Node::Module { body }) => body.clone(),
            _ => vec![root],
        };
        let mut scopes = vec![self.bound_names(&body)];
        self.check_block(&body, &mut scopes, false)?;
        trace!("Checked unit {}", self.file);
        Ok(())
    }

    fn error(&self, id: NodeId, message: String) -> CompileError {
        let position = self
            .graph
            .span(id)
            .map_or(Position::new(1, 0), |span| span.start);
        CompileError::new(message, self.file.clone(), position)
    }

    fn node(&self, id: NodeId) -> Result<&'a Node, CompileError> {
        self.graph
            .get_node(id)
            .ok_or_else(|| self.error(id, format!("node {id} does not exist")))
    }

    /// Names a block binds directly, including inside its `if` and `while`
    /// bodies but not inside nested functions
    fn bound_names(&self, body: &[NodeId]) -> NameSet {
        let mut names = NameSet::default();
        let mut stack: Vec<NodeId> = body.to_vec();
        while let Some(id) = stack.pop() {
            match self.graph.get_node(id) {
                Some(Node::Assign { target, .. }) => {
                    names.insert(target.clone());
                }
                Some(Node::FunctionDef(def)) => {
                    names.insert(def.name.clone());
                }
                Some(Node::Import { name }) => {
                    names.insert(name.clone());
                }
                Some(Node::Global { names: declared }) => {
                    names.extend(declared.iter().cloned());
                }
                Some(Node::If {
                    then_body,
                    else_body,
                    ..
                }) => {
                    stack.extend(then_body);
                    stack.extend(else_body);
                }
                Some(Node::While { body, .. }) => stack.extend(body),
                _ => {}
            }
        }
        names
    }

    fn check_block(
        &self,
        body: &[NodeId],
        scopes: &mut Vec<NameSet>,
        in_function: bool,
    ) -> Result<(), CompileError> {
        for &stmt in body {
            self.check_statement(stmt, scopes, in_function)?;
        }
        Ok(())
    }

    fn check_statement(
        &self,
        id: NodeId,
        scopes: &mut Vec<NameSet>,
        in_function: bool,
    ) -> Result<(), CompileError> {
        match self.node(id)? {
            Node::FunctionDef(def) => {
                for &marker in &def.markers {
                    self.check_expression(marker, scopes)?;
                }

                let mut params = NameSet::default();
                for param in &def.params {
                    if !params.insert(param.clone()) {
                        return Err(self.error(
                            id,
                            format!("duplicate argument '{param}' in function definition"),
                        ));
                    }
                }
                for &stmt in &def.body {
                    if let Some(Node::Global { names }) = self.graph.get_node(stmt) {
                        if let Some(name) = names.iter().find(|n| params.contains(*n)) {
                            return Err(
                                self.error(stmt, format!("name '{name}' is parameter and global"))
                            );
                        }
                    }
                }

                let mut scope = self.bound_names(&def.body);
                scope.extend(params);
                scopes.push(scope);
                let result = self.check_block(&def.body, scopes, true);
                scopes.pop();
                result
            }
            Node::Return { value } => {
                if !in_function {
                    return Err(self.error(id, "'return' outside function".to_string()));
                }
                match value {
                    Some(value) => self.check_expression(*value, scopes),
                    None => Ok(()),
                }
            }
            Node::Assign { value, .. } => self.check_expression(*value, scopes),
            Node::Import { name } => {
                if (self.is_support)(name) {
                    Ok(())
                } else {
                    Err(self.error(id, format!("no support symbol named '{name}'")))
                }
            }
            Node::If {
                condition,
                then_body,
                else_body,
            } => {
                self.check_expression(*condition, scopes)?;
                self.check_block(then_body, scopes, in_function)?;
                self.check_block(else_body, scopes, in_function)
            }
            Node::While { condition, body } => {
                self.check_expression(*condition, scopes)?;
                self.check_block(body, scopes, in_function)
            }
            Node::ExprStmt { expr } => self.check_expression(*expr, scopes),
            Node::Global { .. } | Node::Pass => Ok(()),
            Node::Module { body } => self.check_block(body, scopes, in_function),
            _ => self.check_expression(id, scopes),
        }
    }

    fn check_expression(&self, id: NodeId, scopes: &[NameSet]) -> Result<(), CompileError> {
        if self.resolution != NameResolution::Eager {
            return Ok(());
        }
        let mut unresolved = None;
        self.graph.dfs_from(id, |node_id, node| {
            if unresolved.is_some() {
                return;
            }
            if let Node::Name { id: name } = node {
                let bound = scopes.iter().rev().any(|scope| scope.contains(name))
                    || (self.is_visible)(name);
                if !bound {
                    unresolved = Some((node_id, name.clone()));
                }
            }
        });
        match unresolved {
            Some((node_id, name)) => {
                Err(self.error(node_id, format!("name '{name}' is not defined")))
            }
            None => Ok(()),
        }
    }
}

#[cfg(test)]
#[path = "check_tests.rs"]
mod tests;
