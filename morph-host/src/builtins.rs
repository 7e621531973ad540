//! Built-in functions available to every unit

use morph_core::value::{ValueError, ValueResult};
use morph_core::{Namespace, Value};

/// Namespace holding `print`, `len`, `str` and `int`
pub fn builtins() -> Namespace {
    let ns = Namespace::new("<builtins>");
    ns.set("print", Value::native("print", None, print));
    ns.set("len", Value::native("len", Some(1), len));
    ns.set("str", Value::native("str", Some(1), |args| {
        Ok(Value::string(args[0].to_string()))
    }));
    ns.set("int", Value::native("int", Some(1), int));
    ns
}

fn print(args: &[Value]) -> ValueResult<Value> {
    let line = args
        .iter()
        .map(Value::to_string)
        .collect::<Vec<_>>()
        .join(" ");
    println!("{line}");
    Ok(Value::None)
}

fn len(args: &[Value]) -> ValueResult<Value> {
    let n = match &args[0] {
        Value::String(s) => s.chars().count(),
        Value::List(items) => items.borrow().len(),
        other => {
            return Err(ValueError::TypeError {
                expected: "str or list",
                actual: other.type_name(),
            })
        }
    };
    Ok(Value::Integer(n as i64))
}

fn int(args: &[Value]) -> ValueResult<Value> {
    match &args[0] {
        Value::Integer(i) => Ok(Value::Integer(*i)),
        Value::Boolean(b) => Ok(Value::Integer(i64::from(*b))),
        Value::Float(f) if f.is_finite() => Ok(Value::Integer(f.trunc() as i64)),
        Value::String(s) => s.trim().parse::<i64>().map(Value::Integer).map_err(|_| {
            ValueError::InvalidOperation(format!("invalid literal for int(): {:?}", s))
        }),
        other => Err(ValueError::TypeError {
            expected: "number or str",
            actual: other.type_name(),
        }),
    }
}
