//! Converts a syntax graph back into host source text
//!
//! Output uses four-space indentation and inserts parentheses only where
//! operator precedence requires them. The [`SourceMap`] records where each
//! node begins in the produced text.

use crate::error::ParseError;
use crate::parser::ParseResult;
use morph_core::ast::{Graph, Literal, Node, NodeId, Position};

const INDENT: &str = "    ";
const ATOM_PRECEDENCE: u8 = 8;

/// Start positions of nodes in unparsed text, in text order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SourceMap {
    entries: Vec<(Position, NodeId)>,
}

impl SourceMap {
    /// The innermost node starting at or before `pos`
    pub fn lookup(&self, pos: Position) -> Option<NodeId> {
        let idx = self.entries.partition_point(|(start, _)| *start <= pos);
        idx.checked_sub(1).map(|i| self.entries[i].1)
    }

    /// Moves every entry down by `lines`, for text prepended ahead of the unit
    pub fn shift_lines(&mut self, lines: u32) {
        for (start, _) in &mut self.entries {
            start.line += lines;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &(Position, NodeId)> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Unparsed {
    pub text: String,
    pub source_map: SourceMap,
}

pub struct Unparser<'g> {
    graph: &'g Graph,
    out: String,
    line: u32,
    col: u32,
    indent: usize,
    map: SourceMap,
}

impl<'g> Unparser<'g> {
    pub fn new(graph: &'g Graph) -> Self {
        Self {
            graph,
            out: String::new(),
            line: 1,
            col: 0,
            indent: 0,
            map: SourceMap::default(),
        }
    }

    /// Unparses the graph from its root
    pub fn unparse(mut self) -> ParseResult<Unparsed> {
        if let Some(root) = self.graph.root_id {
            self.statement(root)?;
        }
        Ok(Unparsed {
            text: self.out,
            source_map: self.map,
        })
    }

    fn node(&self, id: NodeId) -> ParseResult<&'g Node> {
        self.graph
            .get_node(id)
            .ok_or_else(|| ParseError::Graph(format!("node {id} does not exist")))
    }

    fn write(&mut self, text: &str) {
        for ch in text.chars() {
            if ch == '\n' {
                self.line += 1;
                self.col = 0;
            } else {
                self.col += ch.len_utf8() as u32;
            }
        }
        self.out.push_str(text);
    }

    fn begin_line(&mut self) {
        for _ in 0..self.indent {
            self.write(INDENT);
        }
    }

    fn record(&mut self, id: NodeId) {
        self.map.entries.push((Position::new(self.line, self.col), id));
    }

    fn statement(&mut self, id: NodeId) -> ParseResult<()> {
        match self.node(id)? {
            Node::Module { body } => {
                for stmt in body {
                    self.statement(*stmt)?;
                }
            }
            Node::FunctionDef(def) => {
                self.begin_line();
                self.record(id);
                for (i, marker) in def.markers.iter().enumerate() {
                    if i > 0 {
                        self.begin_line();
                    }
                    self.write("@");
                    self.expression(*marker, 0)?;
                    self.write("\n");
                }
                if !def.markers.is_empty() {
                    self.begin_line();
                }
                self.write("def ");
                self.write(&def.name);
                self.write("(");
                self.write(&def.params.join(", "));
                self.write(")");
                self.block(&def.body)?;
            }
            Node::If { .. } => self.if_chain(id, "if")?,
            Node::While { condition, body } => {
                self.begin_line();
                self.record(id);
                self.write("while ");
                self.expression(*condition, 0)?;
                self.block(body)?;
            }
            Node::Return { value } => {
                self.simple(id, |this| {
                    this.write("return");
                    if let Some(value) = value {
                        this.write(" ");
                        this.expression(*value, 0)?;
                    }
                    Ok(())
                })?;
            }
            Node::Assign { target, value } => {
                self.simple(id, |this| {
                    this.write(target);
                    this.write(" = ");
                    this.expression(*value, 0)
                })?;
            }
            Node::Global { names } => {
                self.simple(id, |this| {
                    this.write("global ");
                    this.write(&names.join(", "));
                    Ok(())
                })?;
            }
            Node::Import { name } => {
                self.simple(id, |this| {
                    this.write("import ");
                    this.write(name);
                    Ok(())
                })?;
            }
            Node::ExprStmt { expr } => {
                self.simple(id, |this| this.expression(*expr, 0))?;
            }
            Node::Pass => {
                self.simple(id, |this| {
                    this.write("pass");
                    Ok(())
                })?;
            }
            _ => {
                // A bare expression at statement level
                self.begin_line();
                self.expression(id, 0)?;
                self.write("\n");
            }
        }
        Ok(())
    }

    fn simple(
        &mut self,
        id: NodeId,
        body: impl FnOnce(&mut Self) -> ParseResult<()>,
    ) -> ParseResult<()> {
        self.begin_line();
        self.record(id);
        body(self)?;
        self.write("\n");
        Ok(())
    }

    fn block(&mut self, body: &[NodeId]) -> ParseResult<()> {
        self.write(":\n");
        self.indent += 1;
        if body.is_empty() {
            self.begin_line();
            self.write("pass\n");
        }
        for stmt in body {
            self.statement(*stmt)?;
        }
        self.indent -= 1;
        Ok(())
    }

    fn if_chain(&mut self, id: NodeId, keyword: &str) -> ParseResult<()> {
        let Node::If {
            condition,
            then_body,
            else_body,
        } = self.node(id)?
        else {
            return Err(ParseError::Graph(format!("node {id} is not an if statement")));
        };

        self.begin_line();
        self.record(id);
        self.write(keyword);
        self.write(" ");
        self.expression(*condition, 0)?;
        self.block(then_body)?;

        match else_body.as_slice() {
            [] => Ok(()),
            [single] if matches!(self.graph.get_node(*single), Some(Node::If { .. })) => {
                self.if_chain(*single, "elif")
            }
            _ => {
                self.begin_line();
                self.write("else");
                self.block(else_body)
            }
        }
    }

    fn expression(&mut self, id: NodeId, min_precedence: u8) -> ParseResult<()> {
        let node = self.node(id)?;
        let parens = precedence_of(node) < min_precedence;
        if parens {
            self.write("(");
        }
        self.record(id);

        match node {
            Node::Literal(literal) => self.write(&literal.to_string()),
            Node::Name { id } => self.write(id),
            Node::BinOp { op, left, right } => {
                let precedence = op.precedence();
                self.expression(*left, precedence)?;
                self.write(" ");
                self.write(op.symbol());
                self.write(" ");
                self.expression(*right, precedence + 1)?;
            }
            Node::UnaryOp { op, operand } => {
                self.write(op.symbol());
                self.expression(*operand, op.precedence())?;
            }
            Node::Call { function, args } => {
                self.expression(*function, ATOM_PRECEDENCE)?;
                self.write("(");
                self.comma_separated(args)?;
                self.write(")");
            }
            Node::List { items } => {
                self.write("[");
                self.comma_separated(items)?;
                self.write("]");
            }
            _ => {
                return Err(ParseError::Graph(format!(
                    "statement node {id} in expression position"
                )))
            }
        }

        if parens {
            self.write(")");
        }
        Ok(())
    }

    fn comma_separated(&mut self, items: &[NodeId]) -> ParseResult<()> {
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.write(", ");
            }
            self.expression(*item, 0)?;
        }
        Ok(())
    }
}

fn precedence_of(node: &Node) -> u8 {
    match node {
        Node::BinOp { op, .. } => op.precedence(),
        Node::UnaryOp { op, .. } => op.precedence(),
        // Reads back as a negation
        Node::Literal(Literal::Integer(i)) if *i < 0 => 7,
        Node::Literal(Literal::Float(f)) if f.is_sign_negative() => 7,
        _ => ATOM_PRECEDENCE,
    }
}
