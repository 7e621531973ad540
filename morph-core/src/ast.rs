//! Syntax tree representation using an arena-style graph structure
//!
//! Every node lives in a single [`Graph`] keyed by [`NodeId`]. Children are
//! referenced by id, so a transformer can rewrite, reorder or synthesize
//! subtrees without aliasing hazards. Source positions live in side-table
//! metadata and may be absent on synthetic nodes.

use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::num::NonZeroU32;

/// Type alias for the HashMap implementation used in the AST
pub type AstHashMap<K, V> = FxHashMap<K, V>;

/// Type alias for the HashSet implementation used in the AST
pub type AstHashSet<T> = FxHashSet<T>;

/// Node identifier in the AST graph
///
/// Uses NonZeroU32 internally to enable null pointer optimization for Option<NodeId>.
/// NodeId(0) is reserved as an invalid/null node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub NonZeroU32);

impl NodeId {
    /// Creates a new NodeId from a u32.
    /// Returns None if the value is 0.
    pub fn new(value: u32) -> Option<Self> {
        NonZeroU32::new(value).map(NodeId)
    }

    /// Gets the inner u32 value
    pub fn get(&self) -> u32 {
        self.0.get()
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

/// A point in source text: 1-based line, 0-based byte column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub col: u32,
}

impl Position {
    pub fn new(line: u32, col: u32) -> Self {
        Self { line, col }
    }

    /// Shift by a line and column delta
    pub fn shifted(self, line_delta: u32, col_delta: u32) -> Self {
        Self {
            line: self.line + line_delta,
            col: self.col + col_delta,
        }
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

/// Start and end position of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Span {
    pub start: Position,
    pub end: Position,
}

impl Span {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn shifted(self, line_delta: u32, col_delta: u32) -> Self {
        Self {
            start: self.start.shifted(line_delta, col_delta),
            end: self.end.shifted(line_delta, col_delta),
        }
    }
}

/// Per-node metadata
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Source location, absent on synthetic nodes
    pub span: Option<Span>,
    /// Set on `Name` nodes that refer to a host support symbol
    pub support: bool,
}

/// The AST graph
///
/// # Invariants
/// - `next_id` monotonically increases and is never reused
/// - NodeIds are unique within a graph
/// - All NodeId references in nodes must point to valid nodes in the graph
/// - The root_id, if present, must point to a valid node
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Graph {
    pub nodes: AstHashMap<NodeId, Node>,
    pub root_id: Option<NodeId>,
    /// Next ID to assign. Starts at 1 and monotonically increases.
    next_id: u32,
    pub metadata: AstHashMap<NodeId, NodeMetadata>,
}

impl Default for Graph {
    fn default() -> Self {
        Self::new()
    }
}

impl Graph {
    pub fn new() -> Self {
        Self {
            nodes: AstHashMap::default(),
            root_id: None,
            next_id: 1, // Start at 1 since 0 is reserved for null
            metadata: AstHashMap::default(),
        }
    }

    pub fn add_node(&mut self, node: Node) -> crate::error::Result<NodeId> {
        // Check for overflow before incrementing
        if self.next_id == u32::MAX {
            return Err(crate::error::Error::GraphNodeIdOverflow);
        }
        let id = NodeId::new(self.next_id).ok_or(crate::error::Error::GraphNodeIdOverflow)?;
        self.next_id += 1;
        self.nodes.insert(id, node);
        Ok(id)
    }

    /// Adds a node and records its source span
    pub fn add_node_with_span(&mut self, node: Node, span: Span) -> crate::error::Result<NodeId> {
        let id = self.add_node(node)?;
        self.set_span(id, span);
        Ok(id)
    }

    /// Adds a synthetic `Name` node that refers to a host support symbol.
    ///
    /// Code generation makes sure every support reference is either visible in
    /// the target scope or imported by a prelude statement.
    pub fn add_support_ref(&mut self, name: impl Into<String>) -> crate::error::Result<NodeId> {
        let id = self.add_node(Node::Name { id: name.into() })?;
        self.metadata_mut(id).support = true;
        Ok(id)
    }

    pub fn is_support_ref(&self, id: NodeId) -> bool {
        self.metadata.get(&id).map_or(false, |m| m.support)
    }

    pub fn get_node(&self, id: NodeId) -> Option<&Node> {
        self.nodes.get(&id)
    }

    pub fn get_node_mut(&mut self, id: NodeId) -> Option<&mut Node> {
        self.nodes.get_mut(&id)
    }

    pub fn get_metadata(&self, id: NodeId) -> Option<&NodeMetadata> {
        self.metadata.get(&id)
    }

    /// Gets or creates metadata for a node
    pub fn metadata_mut(&mut self, id: NodeId) -> &mut NodeMetadata {
        self.metadata.entry(id).or_default()
    }

    pub fn span(&self, id: NodeId) -> Option<Span> {
        self.metadata.get(&id).and_then(|m| m.span)
    }

    pub fn set_span(&mut self, id: NodeId, span: Span) {
        self.metadata_mut(id).span = Some(span);
    }

    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.keys().copied()
    }

    /// Returns the root node if it is a function definition
    pub fn root_function(&self) -> Option<(NodeId, &FunctionDef)> {
        let root = self.root_id?;
        match self.get_node(root)? {
            Node::FunctionDef(def) => Some((root, def)),
            _ => None,
        }
    }

    /// Performs a pre-order depth-first traversal starting from the given node
    /// Uses an explicit stack to avoid overflow on deep graphs
    pub fn dfs_from(&self, start: NodeId, mut visitor: impl FnMut(NodeId, &Node)) {
        let mut visited = AstHashSet::default();
        let mut stack = vec![start];

        while let Some(node_id) = stack.pop() {
            if !visited.insert(node_id) {
                continue;
            }
            if let Some(node) = self.get_node(node_id) {
                visitor(node_id, node);
                // Push in reverse so children are visited in source order
                for child in self.children(node_id).into_iter().rev() {
                    stack.push(child);
                }
            }
        }
    }

    /// Collects all child node IDs of a given node, in source order
    pub fn children(&self, node_id: NodeId) -> Vec<NodeId> {
        let mut children = Vec::new();
        if let Some(node) = self.get_node(node_id) {
            match node {
                Node::Module { body } => children.extend(body),
                Node::FunctionDef(def) => {
                    children.extend(&def.markers);
                    children.extend(&def.body);
                }
                Node::Return { value } => children.extend(value),
                Node::Assign { value, .. } => children.push(*value),
                Node::If {
                    condition,
                    then_body,
                    else_body,
                } => {
                    children.push(*condition);
                    children.extend(then_body);
                    children.extend(else_body);
                }
                Node::While { condition, body } => {
                    children.push(*condition);
                    children.extend(body);
                }
                Node::ExprStmt { expr } => children.push(*expr),
                Node::BinOp { left, right, .. } => {
                    children.push(*left);
                    children.push(*right);
                }
                Node::UnaryOp { operand, .. } => children.push(*operand),
                Node::Call { function, args } => {
                    children.push(*function);
                    children.extend(args);
                }
                Node::List { items } => children.extend(items),
                Node::Global { .. }
                | Node::Import { .. }
                | Node::Pass
                | Node::Literal(_)
                | Node::Name { .. } => {}
            }
        }
        children
    }

    /// Removes a node and every node reachable from it, with their metadata
    pub fn remove_subtree(&mut self, node_id: NodeId) -> usize {
        let mut doomed = Vec::new();
        self.dfs_from(node_id, |id, _| doomed.push(id));
        for id in &doomed {
            self.nodes.remove(id);
            self.metadata.remove(id);
        }
        if self.root_id == Some(node_id) {
            self.root_id = None;
        }
        doomed.len()
    }

    /// Validates the graph structure
    ///
    /// # Invariants checked:
    /// - The root_id (if present) points to a valid node
    /// - All NodeId references point to existing nodes
    /// - Metadata only exists for existing nodes
    /// - The tree reachable from the root is acyclic
    pub fn validate(&self) -> crate::error::Result<()> {
        if let Some(root) = self.root_id {
            if !self.nodes.contains_key(&root) {
                return Err(crate::error::Error::InvalidGraph(format!(
                    "root node {root} does not exist"
                )));
            }
        }

        for &node_id in self.nodes.keys() {
            if node_id.get() >= self.next_id {
                return Err(crate::error::Error::InvalidGraph(format!(
                    "node id {} outside valid range 1..{}",
                    node_id, self.next_id
                )));
            }
            for child_id in self.children(node_id) {
                if !self.nodes.contains_key(&child_id) {
                    return Err(crate::error::Error::InvalidGraph(format!(
                        "node {node_id} references non-existent node {child_id}"
                    )));
                }
            }
        }

        for meta_id in self.metadata.keys() {
            if !self.nodes.contains_key(meta_id) {
                return Err(crate::error::Error::InvalidGraph(format!(
                    "metadata exists for non-existent node {meta_id}"
                )));
            }
        }

        if let Some(root) = self.root_id {
            if self.has_cycle_from(root) {
                return Err(crate::error::Error::InvalidGraph(
                    "graph contains a cycle".to_string(),
                ));
            }
        }

        Ok(())
    }

    /// Iterative cycle detection with an explicit on-path set
    fn has_cycle_from(&self, root: NodeId) -> bool {
        let mut done = AstHashSet::default();
        let mut on_path = AstHashSet::default();
        // (node, children already expanded)
        let mut stack = vec![(root, false)];

        while let Some((node_id, expanded)) = stack.pop() {
            if expanded {
                on_path.remove(&node_id);
                done.insert(node_id);
                continue;
            }
            if done.contains(&node_id) {
                continue;
            }
            if !on_path.insert(node_id) {
                return true;
            }
            stack.push((node_id, true));
            for child in self.children(node_id) {
                if on_path.contains(&child) {
                    return true;
                }
                if !done.contains(&child) {
                    stack.push((child, false));
                }
            }
        }
        false
    }
}

/// A function definition together with its marker list
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<NodeId>,
    /// Marker expressions in source order, front entry first
    pub markers: Vec<NodeId>,
}

/// AST node types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    // Statements
    Module {
        body: Vec<NodeId>,
    },
    FunctionDef(FunctionDef),
    Return {
        value: Option<NodeId>,
    },
    Assign {
        target: String,
        value: NodeId,
    },
    Global {
        names: Vec<String>,
    },
    Import {
        name: String,
    },
    If {
        condition: NodeId,
        then_body: Vec<NodeId>,
        else_body: Vec<NodeId>,
    },
    While {
        condition: NodeId,
        body: Vec<NodeId>,
    },
    ExprStmt {
        expr: NodeId,
    },
    Pass,

    // Expressions
    Literal(Literal),
    Name {
        id: String,
    },
    BinOp {
        op: BinOp,
        left: NodeId,
        right: NodeId,
    },
    UnaryOp {
        op: UnaryOp,
        operand: NodeId,
    },
    Call {
        function: NodeId,
        args: Vec<NodeId>,
    },
    List {
        items: Vec<NodeId>,
    },
}

impl Node {
    pub fn is_statement(&self) -> bool {
        matches!(
            self,
            Node::Module { .. }
                | Node::FunctionDef(_)
                | Node::Return { .. }
                | Node::Assign { .. }
                | Node::Global { .. }
                | Node::Import { .. }
                | Node::If { .. }
                | Node::While { .. }
                | Node::ExprStmt { .. }
                | Node::Pass
        )
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Literal {
    Integer(i64),
    Float(f64),
    String(String),
    Boolean(bool),
    None,
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Integer(i) => write!(f, "{i}"),
            Literal::Float(fl) => {
                if fl.is_finite() && fl.fract() == 0.0 {
                    write!(f, "{fl:.1}")
                } else {
                    write!(f, "{fl}")
                }
            }
            Literal::String(s) => write!(f, "\"{}\"", escape_string(s)),
            Literal::Boolean(true) => write!(f, "True"),
            Literal::Boolean(false) => write!(f, "False"),
            Literal::None => write!(f, "None"),
        }
    }
}

/// Escapes a string so that it reads back as the same literal
pub fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\r' => out.push_str("\\r"),
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            c => out.push(c),
        }
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp {
    Or,
    And,
    Eq,
    NotEq,
    Lt,
    LtE,
    Gt,
    GtE,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
}

impl BinOp {
    /// Binding strength, higher binds tighter
    pub fn precedence(self) -> u8 {
        match self {
            BinOp::Or => 1,
            BinOp::And => 2,
            BinOp::Eq | BinOp::NotEq | BinOp::Lt | BinOp::LtE | BinOp::Gt | BinOp::GtE => 4,
            BinOp::Add | BinOp::Sub => 5,
            BinOp::Mul | BinOp::Div | BinOp::Mod => 6,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            BinOp::Or => "or",
            BinOp::And => "and",
            BinOp::Eq => "==",
            BinOp::NotEq => "!=",
            BinOp::Lt => "<",
            BinOp::LtE => "<=",
            BinOp::Gt => ">",
            BinOp::GtE => ">=",
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Mod => "%",
        }
    }

    pub fn is_comparison(self) -> bool {
        self.precedence() == 4
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp {
    Neg,
    Not,
}

impl UnaryOp {
    pub fn precedence(self) -> u8 {
        match self {
            UnaryOp::Not => 3,
            UnaryOp::Neg => 7,
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Not => "not ",
        }
    }
}

#[cfg(test)]
#[path = "ast_tests.rs"]
mod tests;
