//! Runtime value representation and namespaces

pub mod error;

pub use error::{ValueError, ValueResult};

use crate::ast::{BinOp, Graph, NodeId};
use crate::source::FileId;
use rustc_hash::{FxHashMap, FxHashSet};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::fmt;
use std::rc::Rc;

/// Runtime value types
#[derive(Clone)]
pub enum Value {
    None,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(Rc<str>),
    /// Mutable, shared list
    List(Rc<RefCell<Vec<Value>>>),
    /// Host-language function (closure)
    Function(Rc<Function>),
    /// Native function
    Native(Rc<NativeFunction>),
    /// Marker that triggers a compilation pass when it leads a marker list
    Macro(Rc<dyn MacroHook>),
}

/// A host-language function closed over its defining scopes
pub struct Function {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<NodeId>,
    /// Tree the body ids refer to
    pub graph: Rc<Graph>,
    /// File the tree was parsed from
    pub file: FileId,
    /// Namespaces searched after the call's locals, innermost first
    pub scopes: Vec<Namespace>,
    /// Target of assignments to names declared `global`
    pub globals: Namespace,
    pub declared_globals: FxHashSet<String>,
}

pub type NativeFn = dyn Fn(&[Value]) -> ValueResult<Value>;

/// Function implemented in Rust
pub struct NativeFunction {
    pub name: String,
    /// Exact arity, or `None` for variadic
    pub arity: Option<usize>,
    pub function: Box<NativeFn>,
}

impl NativeFunction {
    pub fn new(
        name: impl Into<String>,
        arity: Option<usize>,
        function: impl Fn(&[Value]) -> ValueResult<Value> + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            arity,
            function: Box::new(function),
        }
    }

    pub fn call(&self, args: &[Value]) -> ValueResult<Value> {
        if let Some(expected) = self.arity {
            if args.len() != expected {
                return Err(ValueError::ArityMismatch {
                    expected,
                    actual: args.len(),
                });
            }
        }
        (self.function)(args)
    }
}

/// Handle to a function definition in registered source text
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DefinitionRef {
    /// Name the definition binds
    pub name: String,
    pub file: FileId,
    /// 1-based line where the definition block starts (its first marker)
    pub line: u32,
}

/// Where a marked definition is being evaluated
#[derive(Debug, Clone)]
pub struct DefinitionContext {
    /// Module-level namespace enclosing the definition
    pub ambient: Namespace,
    /// True when the definition sits inside another function body
    pub nested: bool,
}

/// Invoked by the host when a macro marker leads a definition's marker list.
/// The returned value replaces the definition.
pub trait MacroHook {
    fn name(&self) -> &str;

    fn expand(
        &self,
        definition: &DefinitionRef,
        context: &DefinitionContext,
    ) -> anyhow::Result<Value>;
}

#[derive(Default)]
struct NamespaceInner {
    label: String,
    bindings: FxHashMap<String, Value>,
}

/// A name→value mapping shared by reference.
///
/// Clones alias the same storage; use [`Namespace::ptr_eq`] to test identity.
#[derive(Clone, Default)]
pub struct Namespace {
    inner: Rc<RefCell<NamespaceInner>>,
}

impl Namespace {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(NamespaceInner {
                label: label.into(),
                bindings: FxHashMap::default(),
            })),
        }
    }

    pub fn label(&self) -> String {
        self.inner.borrow().label.clone()
    }

    pub fn get(&self, name: &str) -> Option<Value> {
        self.inner.borrow().bindings.get(name).cloned()
    }

    /// Binds a name, returning the previous value
    pub fn set(&self, name: impl Into<String>, value: Value) -> Option<Value> {
        self.inner.borrow_mut().bindings.insert(name.into(), value)
    }

    pub fn remove(&self, name: &str) -> Option<Value> {
        self.inner.borrow_mut().bindings.remove(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.borrow().bindings.contains_key(name)
    }

    /// Bound names in sorted order
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.inner.borrow().bindings.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().bindings.is_empty()
    }

    pub fn ptr_eq(&self, other: &Namespace) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Namespace")
            .field("label", &self.label())
            .field("names", &self.names())
            .finish()
    }
}

impl Value {
    pub fn string(s: impl Into<Rc<str>>) -> Self {
        Value::String(s.into())
    }

    pub fn list(items: Vec<Value>) -> Self {
        Value::List(Rc::new(RefCell::new(items)))
    }

    pub fn native(
        name: impl Into<String>,
        arity: Option<usize>,
        function: impl Fn(&[Value]) -> ValueResult<Value> + 'static,
    ) -> Self {
        Value::Native(Rc::new(NativeFunction::new(name, arity, function)))
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Boolean(_) => "bool",
            Value::Integer(_) => "int",
            Value::Float(_) => "float",
            Value::String(_) => "str",
            Value::List(_) => "list",
            Value::Function(_) => "function",
            Value::Native(_) => "builtin_function",
            Value::Macro(_) => "marker",
        }
    }

    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Boolean(b) => *b,
            Value::Integer(i) => *i != 0,
            Value::Float(f) => *f != 0.0,
            Value::String(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Function(_) | Value::Native(_) | Value::Macro(_) => true,
        }
    }

    pub fn is_callable(&self) -> bool {
        matches!(self, Value::Function(_) | Value::Native(_))
    }

    pub fn as_integer(&self) -> ValueResult<i64> {
        match self {
            Value::Integer(i) => Ok(*i),
            Value::Boolean(b) => Ok(i64::from(*b)),
            other => Err(ValueError::TypeError {
                expected: "int",
                actual: other.type_name(),
            }),
        }
    }

    pub fn as_str(&self) -> ValueResult<&str> {
        match self {
            Value::String(s) => Ok(s),
            other => Err(ValueError::TypeError {
                expected: "str",
                actual: other.type_name(),
            }),
        }
    }

    fn as_number(&self) -> Option<f64> {
        match self {
            Value::Integer(i) => Some(*i as f64),
            Value::Float(f) => Some(*f),
            Value::Boolean(b) => Some(f64::from(u8::from(*b))),
            _ => None,
        }
    }

    /// Python-style representation, strings quoted
    pub fn repr(&self) -> String {
        match self {
            Value::String(s) => format!("'{}'", s.replace('\\', "\\\\").replace('\'', "\\'")),
            other => other.to_string(),
        }
    }

    /// Applies an arithmetic or comparison operator.
    /// `and`/`or` short-circuit in the evaluator and never reach here.
    pub fn binary(&self, op: BinOp, rhs: &Value) -> ValueResult<Value> {
        use Value::*;
        match op {
            BinOp::Add => match (self, rhs) {
                (Integer(a), Integer(b)) => a
                    .checked_add(*b)
                    .map(Integer)
                    .ok_or_else(|| ValueError::InvalidOperation("integer overflow".into())),
                (String(a), String(b)) => Ok(Value::string(format!("{a}{b}"))),
                (List(a), List(b)) => {
                    let mut items = a.borrow().clone();
                    items.extend(b.borrow().iter().cloned());
                    Ok(Value::list(items))
                }
                _ => self.float_op(op, rhs, |a, b| a + b),
            },
            BinOp::Sub => match (self, rhs) {
                (Integer(a), Integer(b)) => a
                    .checked_sub(*b)
                    .map(Integer)
                    .ok_or_else(|| ValueError::InvalidOperation("integer overflow".into())),
                _ => self.float_op(op, rhs, |a, b| a - b),
            },
            BinOp::Mul => match (self, rhs) {
                (Integer(a), Integer(b)) => a
                    .checked_mul(*b)
                    .map(Integer)
                    .ok_or_else(|| ValueError::InvalidOperation("integer overflow".into())),
                (String(s), Integer(n)) | (Integer(n), String(s)) => {
                    Ok(Value::string(s.repeat((*n).max(0) as usize)))
                }
                _ => self.float_op(op, rhs, |a, b| a * b),
            },
            BinOp::Div => {
                if rhs.as_number() == Some(0.0) {
                    return Err(ValueError::DivisionByZero);
                }
                self.float_op(op, rhs, |a, b| a / b)
            }
            BinOp::Mod => match (self, rhs) {
                (Integer(_), Integer(0)) => Err(ValueError::DivisionByZero),
                (Integer(a), Integer(b)) => Ok(Integer(((a % b) + b) % b)),
                _ => {
                    if rhs.as_number() == Some(0.0) {
                        return Err(ValueError::DivisionByZero);
                    }
                    self.float_op(op, rhs, |a, b| a.rem_euclid(b))
                }
            },
            BinOp::Eq => Ok(Boolean(self == rhs)),
            BinOp::NotEq => Ok(Boolean(self != rhs)),
            BinOp::Lt | BinOp::LtE | BinOp::Gt | BinOp::GtE => {
                let ordering = self.compare(rhs).ok_or_else(|| {
                    ValueError::InvalidOperation(format!(
                        "'{}' not supported between '{}' and '{}'",
                        op.symbol(),
                        self.type_name(),
                        rhs.type_name()
                    ))
                })?;
                Ok(Boolean(match op {
                    BinOp::Lt => ordering == Ordering::Less,
                    BinOp::LtE => ordering != Ordering::Greater,
                    BinOp::Gt => ordering == Ordering::Greater,
                    _ => ordering != Ordering::Less,
                }))
            }
            BinOp::And | BinOp::Or => Err(ValueError::InvalidOperation(format!(
                "'{}' is evaluated lazily",
                op.symbol()
            ))),
        }
    }

    fn float_op(&self, op: BinOp, rhs: &Value, f: impl Fn(f64, f64) -> f64) -> ValueResult<Value> {
        match (self.as_number(), rhs.as_number()) {
            (Some(a), Some(b)) => Ok(Value::Float(f(a, b))),
            _ => Err(ValueError::InvalidOperation(format!(
                "unsupported operand types for {}: '{}' and '{}'",
                op.symbol(),
                self.type_name(),
                rhs.type_name()
            ))),
        }
    }

    /// Ordering between numbers or between strings
    pub fn compare(&self, other: &Value) -> Option<Ordering> {
        match (self, other) {
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => self.as_number()?.partial_cmp(&other.as_number()?),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Function(func) => write!(f, "Function({})", func.name),
            Value::Native(native) => write!(f, "Native({})", native.name),
            Value::Macro(hook) => write!(f, "Macro({})", hook.name()),
            Value::List(items) => f.debug_list().entries(items.borrow().iter()).finish(),
            other => write!(f, "{}", other.repr()),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (None, None) => true,
            (String(a), String(b)) => a == b,
            (List(a), List(b)) => Rc::ptr_eq(a, b) || *a.borrow() == *b.borrow(),
            (Function(a), Function(b)) => Rc::ptr_eq(a, b),
            (Native(a), Native(b)) => Rc::ptr_eq(a, b),
            (Macro(a), Macro(b)) => Rc::ptr_eq(a, b),
            (a, b) => match (a.as_number(), b.as_number()) {
                (Some(x), Some(y)) => x == y,
                _ => false,
            },
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "None"),
            Value::Boolean(true) => write!(f, "True"),
            Value::Boolean(false) => write!(f, "False"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(fl) => {
                if fl.is_finite() && fl.fract() == 0.0 {
                    write!(f, "{fl:.1}")
                } else {
                    write!(f, "{fl}")
                }
            }
            Value::String(s) => write!(f, "{s}"),
            Value::List(items) => {
                let parts: Vec<String> = items.borrow().iter().map(Value::repr).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            Value::Function(func) => write!(f, "<function {}>", func.name),
            Value::Native(native) => write!(f, "<built-in function {}>", native.name),
            Value::Macro(hook) => write!(f, "<marker {}>", hook.name()),
        }
    }
}

impl From<i64> for Value {
    fn from(i: i64) -> Self {
        Value::Integer(i)
    }
}

impl From<f64> for Value {
    fn from(f: f64) -> Self {
        Value::Float(f)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::string(s)
    }
}

#[cfg(test)]
#[path = "../value_tests.rs"]
mod tests;
