//! Tests for parser error types and error handling

use morph_core::ast::Position;
use morph_parser::error::{ErrorKind, ParseError};
use morph_parser::parse;

#[test]
fn test_unexpected_token_error() {
    let error = ParseError::UnexpectedToken {
        position: Position::new(3, 7),
        expected: "':'".to_string(),
        found: "newline".to_string(),
    };

    // Test Display trait
    let error_msg = error.to_string();
    assert!(error_msg.contains("Unexpected token at 3:7"));
    assert!(error_msg.contains("expected ':'"));
    assert!(error_msg.contains("found newline"));

    // Message omits the position
    assert_eq!(error.message(), "invalid syntax: expected ':', found newline");
    assert_eq!(error.kind(), ErrorKind::UnexpectedToken);
    assert_eq!(error.position(), Some(Position::new(3, 7)));
}

#[test]
fn test_graph_error_has_no_position() {
    let error: ParseError = morph_core::Error::GraphNodeIdOverflow.into();
    assert_eq!(error.kind(), ErrorKind::Graph);
    assert_eq!(error.position(), None);
}

#[test]
fn test_missing_colon() {
    let err = parse("def f()\n    pass\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedToken);
    assert_eq!(err.position(), Some(Position::new(1, 7)));
}

#[test]
fn test_unexpected_indent_inside_block() {
    let err = parse("def f():\n    x = 1\n        y = 2\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedIndent);
    assert_eq!(err.position(), Some(Position::new(3, 8)));
}

#[test]
fn test_unterminated_string_is_invalid_token() {
    let err = parse("x = 'abc\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidToken);
    assert_eq!(err.position().map(|p| p.line), Some(1));
}

#[test]
fn test_marker_without_definition() {
    let err = parse("@trace\nx = 1\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnexpectedToken);
    assert_eq!(err.position(), Some(Position::new(2, 0)));
}
