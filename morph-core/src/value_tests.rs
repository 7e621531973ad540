use super::*;
use crate::ast::BinOp;

#[test]
fn test_truthiness() {
    assert!(!Value::None.is_truthy());
    assert!(!Value::Integer(0).is_truthy());
    assert!(Value::Integer(3).is_truthy());
    assert!(!Value::string("").is_truthy());
    assert!(Value::string("x").is_truthy());
    assert!(!Value::list(vec![]).is_truthy());
}

#[test]
fn test_integer_arithmetic() {
    let a = Value::Integer(7);
    let b = Value::Integer(2);
    assert_eq!(a.binary(BinOp::Add, &b).unwrap(), Value::Integer(9));
    assert_eq!(a.binary(BinOp::Sub, &b).unwrap(), Value::Integer(5));
    assert_eq!(a.binary(BinOp::Mul, &b).unwrap(), Value::Integer(14));
    assert_eq!(a.binary(BinOp::Div, &b).unwrap(), Value::Float(3.5));
    assert_eq!(a.binary(BinOp::Mod, &b).unwrap(), Value::Integer(1));
    assert_eq!(
        Value::Integer(-7).binary(BinOp::Mod, &b).unwrap(),
        Value::Integer(1)
    );
}

#[test]
fn test_division_by_zero() {
    let err = Value::Integer(1)
        .binary(BinOp::Div, &Value::Integer(0))
        .unwrap_err();
    assert_eq!(err, ValueError::DivisionByZero);
    let err = Value::Integer(1)
        .binary(BinOp::Mod, &Value::Integer(0))
        .unwrap_err();
    assert_eq!(err, ValueError::DivisionByZero);
}

#[test]
fn test_string_concatenation_and_repeat() {
    let greeting = Value::string("You are: ").binary(BinOp::Add, &Value::string("alice"));
    assert_eq!(greeting.unwrap(), Value::string("You are: alice"));
    let repeated = Value::string("ab").binary(BinOp::Mul, &Value::Integer(3));
    assert_eq!(repeated.unwrap(), Value::string("ababab"));
}

#[test]
fn test_mixed_operands_rejected() {
    let err = Value::string("a")
        .binary(BinOp::Add, &Value::Integer(1))
        .unwrap_err();
    assert!(matches!(err, ValueError::InvalidOperation(_)));
    assert!(err.to_string().contains("'str' and 'int'"));
}

#[test]
fn test_comparisons() {
    let lt = Value::Integer(1).binary(BinOp::Lt, &Value::Float(1.5)).unwrap();
    assert_eq!(lt, Value::Boolean(true));
    let ge = Value::string("b").binary(BinOp::GtE, &Value::string("a")).unwrap();
    assert_eq!(ge, Value::Boolean(true));
    assert!(Value::string("a")
        .binary(BinOp::Lt, &Value::Integer(1))
        .is_err());
}

#[test]
fn test_equality_across_numeric_types() {
    assert_eq!(Value::Integer(2), Value::Float(2.0));
    assert_ne!(Value::Integer(2), Value::string("2"));
    assert_eq!(
        Value::list(vec![Value::Integer(1)]),
        Value::list(vec![Value::Integer(1)])
    );
}

#[test]
fn test_display_and_repr() {
    assert_eq!(Value::Float(3.0).to_string(), "3.0");
    assert_eq!(Value::Boolean(true).to_string(), "True");
    assert_eq!(Value::string("hi").repr(), "'hi'");
    let list = Value::list(vec![Value::Integer(1), Value::string("x")]);
    assert_eq!(list.to_string(), "[1, 'x']");
}

#[test]
fn test_native_arity_checked() {
    let double = NativeFunction::new("double", Some(1), |args| {
        Ok(Value::Integer(args[0].as_integer()? * 2))
    });
    assert_eq!(double.call(&[Value::Integer(4)]).unwrap(), Value::Integer(8));
    assert_eq!(
        double.call(&[]).unwrap_err(),
        ValueError::ArityMismatch {
            expected: 1,
            actual: 0
        }
    );
}

#[test]
fn test_namespace_aliasing() {
    let ns = Namespace::new("module");
    let alias = ns.clone();
    alias.set("x", Value::Integer(1));
    assert!(ns.contains("x"));
    assert!(ns.ptr_eq(&alias));
    assert!(!ns.ptr_eq(&Namespace::new("module")));
    assert_eq!(ns.names(), vec!["x".to_string()]);
    assert_eq!(ns.remove("x"), Some(Value::Integer(1)));
    assert!(ns.is_empty());
}
