//! Lexer for Morph host syntax using logos, plus the indentation layout pass
//!
//! logos produces raw tokens with byte ranges. The layout pass turns line
//! structure into explicit `Newline`, `Indent` and `Dedent` lexemes, ignoring
//! newlines inside brackets.

use crate::error::ParseError;
use logos::Logos;
use morph_core::ast::Position;

#[derive(Logos, Debug, PartialEq, Clone)]
#[logos(skip r"[ \t\r\f]+")]
#[logos(skip r"#[^\n]*")]
pub enum Token<'a> {
    // Keywords
    #[token("def")]
    Def,
    #[token("return")]
    Return,
    #[token("if")]
    If,
    #[token("elif")]
    Elif,
    #[token("else")]
    Else,
    #[token("while")]
    While,
    #[token("global")]
    Global,
    #[token("import")]
    Import,
    #[token("pass")]
    Pass,
    #[token("and")]
    And,
    #[token("or")]
    Or,
    #[token("not")]
    Not,
    #[token("True")]
    True,
    #[token("False")]
    False,
    #[token("None")]
    None,

    // Literals
    #[regex(r"[0-9]+", |lex| lex.slice())]
    Integer(&'a str),

    #[regex(r"[0-9]+\.[0-9]+([eE][+-]?[0-9]+)?", |lex| lex.slice())]
    Float(&'a str),

    #[regex(r#""([^"\\\n]|\\.)*""#, |lex| {
        let s = lex.slice();
        process_string_escapes(&s[1..s.len() - 1])
    })]
    #[regex(r#"'([^'\\\n]|\\.)*'"#, |lex| {
        let s = lex.slice();
        process_string_escapes(&s[1..s.len() - 1])
    })]
    String(String),

    #[regex(r"[A-Za-z_][A-Za-z0-9_]*", |lex| lex.slice())]
    Name(&'a str),

    // Operators
    #[token("==")]
    EqEq,
    #[token("!=")]
    NotEq,
    #[token("<=")]
    LtE,
    #[token(">=")]
    GtE,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("=")]
    Assign,
    #[token("+")]
    Plus,
    #[token("-")]
    Minus,
    #[token("*")]
    Star,
    #[token("/")]
    Slash,
    #[token("%")]
    Percent,

    // Delimiters
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("@")]
    At,

    #[token("\n")]
    Newline,
}

impl Token<'_> {
    /// Human readable description for error messages
    pub fn describe(&self) -> String {
        match self {
            Token::Integer(text) | Token::Float(text) => format!("number {text}"),
            Token::String(s) => format!("string {s:?}"),
            Token::Name(name) => format!("identifier '{name}'"),
            Token::Newline => "newline".to_string(),
            other => format!("'{}'", other.text()),
        }
    }

    fn text(&self) -> &'static str {
        match self {
            Token::Def => "def",
            Token::Return => "return",
            Token::If => "if",
            Token::Elif => "elif",
            Token::Else => "else",
            Token::While => "while",
            Token::Global => "global",
            Token::Import => "import",
            Token::Pass => "pass",
            Token::And => "and",
            Token::Or => "or",
            Token::Not => "not",
            Token::True => "True",
            Token::False => "False",
            Token::None => "None",
            Token::EqEq => "==",
            Token::NotEq => "!=",
            Token::LtE => "<=",
            Token::GtE => ">=",
            Token::Lt => "<",
            Token::Gt => ">",
            Token::Assign => "=",
            Token::Plus => "+",
            Token::Minus => "-",
            Token::Star => "*",
            Token::Slash => "/",
            Token::Percent => "%",
            Token::LParen => "(",
            Token::RParen => ")",
            Token::LBracket => "[",
            Token::RBracket => "]",
            Token::Comma => ",",
            Token::Colon => ":",
            Token::At => "@",
            Token::Integer(_) | Token::Float(_) | Token::String(_) | Token::Name(_) => "",
            Token::Newline => "\\n",
        }
    }
}

/// Process escape sequences in strings
#[doc(hidden)]
pub fn process_string_escapes(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars();

    while let Some(ch) = chars.next() {
        if ch == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('t') => result.push('\t'),
                Some('r') => result.push('\r'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some(c) => {
                    result.push('\\');
                    result.push(c);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(ch);
        }
    }

    result
}

/// A token after layout, with layout-only variants added
#[derive(Debug, Clone, PartialEq)]
pub enum Lexeme<'a> {
    Token(Token<'a>),
    Newline,
    Indent,
    Dedent,
    EndOfInput,
}

impl Lexeme<'_> {
    pub fn describe(&self) -> String {
        match self {
            Lexeme::Token(token) => token.describe(),
            Lexeme::Newline => "newline".to_string(),
            Lexeme::Indent => "indent".to_string(),
            Lexeme::Dedent => "dedent".to_string(),
            Lexeme::EndOfInput => "end of input".to_string(),
        }
    }
}

/// A lexeme with its start and end position
#[derive(Debug, Clone, PartialEq)]
pub struct Spanned<'a> {
    pub lexeme: Lexeme<'a>,
    pub start: Position,
    pub end: Position,
}

/// Converts byte offsets into line/column positions
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(source: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(source.match_indices('\n').map(|(i, _)| i + 1));
        Self { line_starts }
    }

    pub fn position(&self, offset: usize) -> Position {
        let line = self.line_starts.partition_point(|&start| start <= offset);
        let line_start = self.line_starts[line - 1];
        Position::new(line as u32, (offset - line_start) as u32)
    }
}

/// Tokenizes `source` and applies the layout rules
pub fn tokenize(source: &str) -> Result<Vec<Spanned<'_>>, ParseError> {
    let index = LineIndex::new(source);
    let mut lexer = Token::lexer(source);
    let mut out = Vec::new();
    let mut indents = vec![0u32];
    let mut bracket_depth = 0usize;
    let mut at_line_start = true;

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let start = index.position(range.start);
        let end = index.position(range.end);
        let token = match result {
            Ok(token) => token,
            Err(()) => {
                return Err(ParseError::InvalidToken {
                    position: start,
                    text: lexer.slice().to_string(),
                })
            }
        };

        if token == Token::Newline {
            if bracket_depth == 0 && !at_line_start {
                out.push(Spanned {
                    lexeme: Lexeme::Newline,
                    start,
                    end: start,
                });
                at_line_start = true;
            }
            continue;
        }

        if at_line_start && bracket_depth == 0 {
            let col = start.col;
            let top = *indents.last().unwrap_or(&0);
            if col > top {
                indents.push(col);
                out.push(Spanned {
                    lexeme: Lexeme::Indent,
                    start,
                    end: start,
                });
            } else {
                while col < *indents.last().unwrap_or(&0) {
                    indents.pop();
                    out.push(Spanned {
                        lexeme: Lexeme::Dedent,
                        start,
                        end: start,
                    });
                }
                if col != *indents.last().unwrap_or(&0) {
                    return Err(ParseError::InconsistentDedent { position: start });
                }
            }
            at_line_start = false;
        }

        match token {
            Token::LParen | Token::LBracket => bracket_depth += 1,
            Token::RParen | Token::RBracket => bracket_depth = bracket_depth.saturating_sub(1),
            _ => {}
        }

        out.push(Spanned {
            lexeme: Lexeme::Token(token),
            start,
            end,
        });
    }

    let eof = index.position(source.len());
    if !at_line_start && bracket_depth == 0 {
        out.push(Spanned {
            lexeme: Lexeme::Newline,
            start: eof,
            end: eof,
        });
    }
    while indents.len() > 1 {
        indents.pop();
        out.push(Spanned {
            lexeme: Lexeme::Dedent,
            start: eof,
            end: eof,
        });
    }
    out.push(Spanned {
        lexeme: Lexeme::EndOfInput,
        start: eof,
        end: eof,
    });
    Ok(out)
}

#[cfg(test)]
#[path = "lexer_tests.rs"]
mod tests;
