//! Recursive descent parser for Morph host syntax
//!
//! Statements and expressions become nodes in a [`Graph`] rooted at a
//! `Module` node. Every node records the span from its first token to its
//! last token; parentheses around an expression are not part of its span.

use crate::error::ParseError;
use crate::lexer::{tokenize, Lexeme, Spanned, Token};
use morph_core::ast::{BinOp, FunctionDef, Graph, Literal, Node, NodeId, Position, Span, UnaryOp};
use tracing::trace;

pub type ParseResult<T> = Result<T, ParseError>;

pub struct Parser<'a> {
    tokens: Vec<Spanned<'a>>,
    pos: usize,
    graph: Graph,
    /// Current parsing depth to prevent stack overflow
    depth: usize,
    /// Maximum allowed parsing depth
    max_depth: usize,
    /// End of the last real token consumed
    last_end: Position,
}

impl<'a> Parser<'a> {
    /// Default maximum parsing depth
    pub const DEFAULT_MAX_DEPTH: usize = 256;

    pub fn new(source: &'a str) -> ParseResult<Self> {
        Ok(Self {
            tokens: tokenize(source)?,
            pos: 0,
            graph: Graph::new(),
            depth: 0,
            max_depth: Self::DEFAULT_MAX_DEPTH,
            last_end: Position::new(1, 0),
        })
    }

    /// Set the maximum parsing depth
    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    /// Check and increment depth, returning error if max depth exceeded
    fn enter_recursion(&mut self) -> ParseResult<()> {
        if self.depth >= self.max_depth {
            return Err(ParseError::MaxDepthExceeded {
                position: self.peek_start(),
                depth: self.depth,
                max_depth: self.max_depth,
            });
        }
        self.depth += 1;
        Ok(())
    }

    /// Decrement depth when leaving a recursive call
    fn exit_recursion(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub fn parse(mut self) -> ParseResult<Graph> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                Lexeme::EndOfInput => break,
                Lexeme::Newline => {
                    self.advance();
                }
                _ => body.push(self.parse_statement()?),
            }
        }

        let span = match (body.first(), body.last()) {
            (Some(first), Some(last)) => self
                .graph
                .span(*first)
                .zip(self.graph.span(*last))
                .map(|(a, b)| Span::new(a.start, b.end)),
            _ => None,
        };
        let module = self.graph.add_node(Node::Module { body })?;
        if let Some(span) = span {
            self.graph.set_span(module, span);
        }
        self.graph.root_id = Some(module);
        trace!("Parsed module with {} nodes", self.graph.nodes.len());
        Ok(self.graph)
    }

    // ----- token helpers -----

    fn peek(&self) -> &Lexeme<'a> {
        &self.tokens[self.pos].lexeme
    }

    fn peek_start(&self) -> Position {
        self.tokens[self.pos].start
    }

    fn advance(&mut self) -> Spanned<'a> {
        let current = self.tokens[self.pos].clone();
        if !matches!(current.lexeme, Lexeme::EndOfInput) {
            self.pos += 1;
        }
        if matches!(current.lexeme, Lexeme::Token(_)) {
            self.last_end = current.end;
        }
        current
    }

    fn check(&self, token: &Token<'a>) -> bool {
        matches!(self.peek(), Lexeme::Token(t) if t == token)
    }

    fn eat(&mut self, token: &Token<'a>) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect(&mut self, token: Token<'a>, expected: &str) -> ParseResult<Spanned<'a>> {
        if self.check(&token) {
            Ok(self.advance())
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn expect_newline(&mut self) -> ParseResult<()> {
        if matches!(self.peek(), Lexeme::Newline) {
            self.advance();
            Ok(())
        } else {
            Err(self.unexpected("end of line"))
        }
    }

    fn expect_name(&mut self, expected: &str) -> ParseResult<String> {
        if let Lexeme::Token(Token::Name(name)) = self.peek() {
            let name = name.to_string();
            self.advance();
            Ok(name)
        } else {
            Err(self.unexpected(expected))
        }
    }

    fn unexpected(&self, expected: &str) -> ParseError {
        let current = &self.tokens[self.pos];
        match current.lexeme {
            Lexeme::EndOfInput => ParseError::UnexpectedEof {
                position: current.start,
            },
            Lexeme::Indent => ParseError::UnexpectedIndent {
                position: current.start,
            },
            _ => ParseError::UnexpectedToken {
                position: current.start,
                expected: expected.to_string(),
                found: current.lexeme.describe(),
            },
        }
    }

    /// Adds a node spanning from `start` to the end of the last consumed token
    fn add(&mut self, node: Node, start: Position) -> ParseResult<NodeId> {
        Ok(self
            .graph
            .add_node_with_span(node, Span::new(start, self.last_end))?)
    }

    // ----- statements -----

    fn parse_statement(&mut self) -> ParseResult<NodeId> {
        self.enter_recursion()?;
        let result = self.parse_statement_inner();
        self.exit_recursion();
        result
    }

    fn parse_statement_inner(&mut self) -> ParseResult<NodeId> {
        match self.peek() {
            Lexeme::Token(Token::At) | Lexeme::Token(Token::Def) => self.parse_function_def(),
            Lexeme::Token(Token::If) => {
                let start = self.peek_start();
                self.advance();
                self.parse_if_rest(start)
            }
            Lexeme::Token(Token::While) => self.parse_while(),
            Lexeme::Indent | Lexeme::Dedent | Lexeme::EndOfInput => {
                Err(self.unexpected("statement"))
            }
            _ => self.parse_simple_statement(),
        }
    }

    fn parse_function_def(&mut self) -> ParseResult<NodeId> {
        let start = self.peek_start();
        let mut markers = Vec::new();
        while self.eat(&Token::At) {
            markers.push(self.parse_expression()?);
            self.expect_newline()?;
        }

        self.expect(Token::Def, "'def'")?;
        let name = self.expect_name("function name")?;
        self.expect(Token::LParen, "'('")?;
        let mut params = Vec::new();
        while !self.check(&Token::RParen) {
            params.push(self.expect_name("parameter name")?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(Token::RParen, "')'")?;
        let body = self.parse_block()?;

        self.add(
            Node::FunctionDef(FunctionDef {
                name,
                params,
                body,
                markers,
            }),
            start,
        )
    }

    /// Parses `: <simple statement>` or `:` followed by an indented block
    fn parse_block(&mut self) -> ParseResult<Vec<NodeId>> {
        self.expect(Token::Colon, "':'")?;
        if !matches!(self.peek(), Lexeme::Newline) {
            return Ok(vec![self.parse_simple_statement()?]);
        }
        self.advance();

        if !matches!(self.peek(), Lexeme::Indent) {
            return Err(self.unexpected("an indented block"));
        }
        self.advance();

        let mut body = Vec::new();
        loop {
            match self.peek() {
                Lexeme::Dedent => {
                    self.advance();
                    break;
                }
                Lexeme::EndOfInput => break,
                _ => body.push(self.parse_statement()?),
            }
        }
        Ok(body)
    }

    /// Parses the remainder of an `if` or `elif` after its keyword.
    /// `elif` becomes a nested `If` in the else branch.
    fn parse_if_rest(&mut self, start: Position) -> ParseResult<NodeId> {
        let condition = self.parse_expression()?;
        let then_body = self.parse_block()?;
        let else_body = match self.peek() {
            Lexeme::Token(Token::Elif) => {
                let elif_start = self.peek_start();
                self.advance();
                self.enter_recursion()?;
                let nested = self.parse_if_rest(elif_start);
                self.exit_recursion();
                vec![nested?]
            }
            Lexeme::Token(Token::Else) => {
                self.advance();
                self.parse_block()?
            }
            _ => Vec::new(),
        };
        self.add(
            Node::If {
                condition,
                then_body,
                else_body,
            },
            start,
        )
    }

    fn parse_while(&mut self) -> ParseResult<NodeId> {
        let start = self.peek_start();
        self.expect(Token::While, "'while'")?;
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        self.add(Node::While { condition, body }, start)
    }

    fn parse_simple_statement(&mut self) -> ParseResult<NodeId> {
        let start = self.peek_start();
        let node = match self.peek() {
            Lexeme::Token(Token::Return) => {
                self.advance();
                let value = if matches!(self.peek(), Lexeme::Newline) {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                Node::Return { value }
            }
            Lexeme::Token(Token::Pass) => {
                self.advance();
                Node::Pass
            }
            Lexeme::Token(Token::Global) => {
                self.advance();
                let mut names = vec![self.expect_name("name")?];
                while self.eat(&Token::Comma) {
                    names.push(self.expect_name("name")?);
                }
                Node::Global { names }
            }
            Lexeme::Token(Token::Import) => {
                self.advance();
                let name = self.expect_name("module name")?;
                Node::Import { name }
            }
            _ => {
                let expr = self.parse_expression()?;
                if self.check(&Token::Assign) {
                    let target = match self.graph.get_node(expr) {
                        Some(Node::Name { id }) => id.clone(),
                        _ => return Err(ParseError::InvalidAssignmentTarget { position: start }),
                    };
                    self.advance();
                    self.graph.remove_subtree(expr);
                    let value = self.parse_expression()?;
                    Node::Assign { target, value }
                } else {
                    Node::ExprStmt { expr }
                }
            }
        };
        let id = self.add(node, start)?;
        self.expect_newline()?;
        Ok(id)
    }

    // ----- expressions -----

    pub fn parse_expression(&mut self) -> ParseResult<NodeId> {
        self.enter_recursion()?;
        let result = self.parse_or();
        self.exit_recursion();
        result
    }

    /// Left-associative chain of `operand (op operand)*`
    fn parse_binary(
        &mut self,
        operand: fn(&mut Self) -> ParseResult<NodeId>,
        operator: fn(&Token<'_>) -> Option<BinOp>,
    ) -> ParseResult<NodeId> {
        let start = self.peek_start();
        let mut left = operand(self)?;
        while let Some(op) = self.peek_operator(operator) {
            self.advance();
            let right = operand(self)?;
            left = self.add(Node::BinOp { op, left, right }, start)?;
        }
        Ok(left)
    }

    fn peek_operator(&self, operator: fn(&Token<'_>) -> Option<BinOp>) -> Option<BinOp> {
        match self.peek() {
            Lexeme::Token(token) => operator(token),
            _ => None,
        }
    }

    fn parse_or(&mut self) -> ParseResult<NodeId> {
        self.parse_binary(Self::parse_and, or_operator)
    }

    fn parse_and(&mut self) -> ParseResult<NodeId> {
        self.parse_binary(Self::parse_not, and_operator)
    }

    fn parse_not(&mut self) -> ParseResult<NodeId> {
        if self.check(&Token::Not) {
            return self.parse_unary(UnaryOp::Not, Self::parse_not);
        }
        self.parse_binary(Self::parse_sum, comparison_operator)
    }

    fn parse_sum(&mut self) -> ParseResult<NodeId> {
        self.parse_binary(Self::parse_term, additive_operator)
    }

    fn parse_term(&mut self) -> ParseResult<NodeId> {
        self.parse_binary(Self::parse_factor, multiplicative_operator)
    }

    fn parse_factor(&mut self) -> ParseResult<NodeId> {
        if self.check(&Token::Minus) {
            return self.parse_unary(UnaryOp::Neg, Self::parse_factor);
        }
        self.parse_postfix()
    }

    fn parse_unary(
        &mut self,
        op: UnaryOp,
        operand: fn(&mut Self) -> ParseResult<NodeId>,
    ) -> ParseResult<NodeId> {
        let start = self.peek_start();
        self.advance();
        self.enter_recursion()?;
        let result = operand(self);
        self.exit_recursion();
        let operand = result?;
        self.add(Node::UnaryOp { op, operand }, start)
    }

    fn parse_postfix(&mut self) -> ParseResult<NodeId> {
        let start = self.peek_start();
        let mut expr = self.parse_atom()?;
        while self.eat(&Token::LParen) {
            let args = self.parse_sequence(Token::RParen, "')'")?;
            expr = self.add(Node::Call { function: expr, args }, start)?;
        }
        Ok(expr)
    }

    /// Comma separated expressions up to and including `close`
    fn parse_sequence(&mut self, close: Token<'a>, expected: &str) -> ParseResult<Vec<NodeId>> {
        let mut items = Vec::new();
        while !self.check(&close) {
            items.push(self.parse_expression()?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(close, expected)?;
        Ok(items)
    }

    fn parse_atom(&mut self) -> ParseResult<NodeId> {
        let start = self.peek_start();
        let literal = match self.peek().clone() {
            Lexeme::Token(Token::Integer(text)) => {
                Literal::Integer(text.parse().map_err(|_| ParseError::InvalidNumber {
                    position: start,
                    text: text.to_string(),
                })?)
            }
            Lexeme::Token(Token::Float(text)) => {
                Literal::Float(text.parse().map_err(|_| ParseError::InvalidNumber {
                    position: start,
                    text: text.to_string(),
                })?)
            }
            Lexeme::Token(Token::String(s)) => Literal::String(s),
            Lexeme::Token(Token::True) => Literal::Boolean(true),
            Lexeme::Token(Token::False) => Literal::Boolean(false),
            Lexeme::Token(Token::None) => Literal::None,
            Lexeme::Token(Token::Name(name)) => {
                self.advance();
                return self.add(
                    Node::Name {
                        id: name.to_string(),
                    },
                    start,
                );
            }
            Lexeme::Token(Token::LParen) => {
                self.advance();
                let inner = self.parse_expression()?;
                self.expect(Token::RParen, "')'")?;
                return Ok(inner);
            }
            Lexeme::Token(Token::LBracket) => {
                self.advance();
                let items = self.parse_sequence(Token::RBracket, "']'")?;
                return self.add(Node::List { items }, start);
            }
            _ => return Err(self.unexpected("expression")),
        };
        self.advance();
        self.add(Node::Literal(literal), start)
    }
}

fn or_operator(token: &Token<'_>) -> Option<BinOp> {
    matches!(token, Token::Or).then_some(BinOp::Or)
}

fn and_operator(token: &Token<'_>) -> Option<BinOp> {
    matches!(token, Token::And).then_some(BinOp::And)
}

fn comparison_operator(token: &Token<'_>) -> Option<BinOp> {
    match token {
        Token::EqEq => Some(BinOp::Eq),
        Token::NotEq => Some(BinOp::NotEq),
        Token::Lt => Some(BinOp::Lt),
        Token::LtE => Some(BinOp::LtE),
        Token::Gt => Some(BinOp::Gt),
        Token::GtE => Some(BinOp::GtE),
        _ => None,
    }
}

fn additive_operator(token: &Token<'_>) -> Option<BinOp> {
    match token {
        Token::Plus => Some(BinOp::Add),
        Token::Minus => Some(BinOp::Sub),
        _ => None,
    }
}

fn multiplicative_operator(token: &Token<'_>) -> Option<BinOp> {
    match token {
        Token::Star => Some(BinOp::Mul),
        Token::Slash => Some(BinOp::Div),
        Token::Percent => Some(BinOp::Mod),
        _ => None,
    }
}

#[cfg(test)]
#[path = "parser_tests.rs"]
mod tests;
