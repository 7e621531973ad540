//! Core interpreter implementation
//!
//! Executes a parsed unit statement by statement. Functions close over the
//! namespaces visible where they are defined; markers are applied when a
//! definition executes.

use std::rc::Rc;

use morph_core::ast::{BinOp, FunctionDef, Graph, Literal, Node, NodeId, UnaryOp};
use morph_core::source::FileId;
use morph_core::{DefinitionContext, DefinitionRef, Function, Value};
use rustc_hash::FxHashSet;
use tracing::{debug, warn};

use crate::environment::Environment;
use crate::error::{ControlFlow, HostError, HostResult, RuntimeError};
use crate::loader::Loader;

/// Tree-walking interpreter bound to one parsed unit
pub struct Interpreter<'l> {
    loader: &'l Loader,
    graph: Rc<Graph>,
    file: FileId,
}

impl<'l> Interpreter<'l> {
    pub fn new(loader: &'l Loader, graph: Rc<Graph>, file: FileId) -> Self {
        Self {
            loader,
            graph,
            file,
        }
    }

    /// Runs the unit's top-level statements
    pub fn run_unit(&self, env: &Environment) -> HostResult<()> {
        let Some(root) = self.graph.root_id else {
            return Ok(());
        };
        match self.graph.get_node(root) {
            Some(Node::Module { body }) => self.exec_block(body, env).map(|_| ()),
            Some(_) => self.exec_statement(root, env).map(|_| ()),
            None => Err(self.runtime_error(root, format!("node {root} not found in graph"))),
        }
    }

    /// Runs a function body, yielding its return value
    pub fn call_body(&self, body: &[NodeId], env: &Environment) -> HostResult<Value> {
        match self.exec_block(body, env)? {
            ControlFlow::Return(value) => Ok(value),
            ControlFlow::Normal => Ok(Value::None),
        }
    }

    fn node(&self, id: NodeId) -> HostResult<&Node> {
        self.graph
            .get_node(id)
            .ok_or_else(|| RuntimeError::detached(format!("node {id} not found in graph")).into())
    }

    /// Error located at a node, traced back through generated units
    fn runtime_error(&self, id: NodeId, message: impl Into<String>) -> HostError {
        let mut err = RuntimeError::detached(message);
        self.attach_location(&mut err, id);
        err.into()
    }

    fn attach_location(&self, err: &mut RuntimeError, id: NodeId) {
        if let Some(span) = self.graph.span(id) {
            err.origin = self
                .loader
                .sources()
                .resolve_origin(&self.file, span.start);
            err.location = Some((self.file.clone(), span.start));
        }
    }

    /// Fills in the location of an error raised without one
    fn locate(&self, err: HostError, id: NodeId) -> HostError {
        match err {
            HostError::Runtime(mut runtime) if runtime.location.is_none() => {
                self.attach_location(&mut runtime, id);
                HostError::Runtime(runtime)
            }
            other => other,
        }
    }

    // ----- statements -----

    fn exec_block(&self, body: &[NodeId], env: &Environment) -> HostResult<ControlFlow> {
        for &stmt in body {
            if let ControlFlow::Return(value) = self.exec_statement(stmt, env)? {
                return Ok(ControlFlow::Return(value));
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn exec_statement(&self, id: NodeId, env: &Environment) -> HostResult<ControlFlow> {
        match self.node(id)? {
            Node::FunctionDef(def) => {
                self.define_function(id, def, env)?;
            }
            Node::Return { value } => {
                let value = match value {
                    Some(value) => self.eval(*value, env)?,
                    None => Value::None,
                };
                return Ok(ControlFlow::Return(value));
            }
            Node::Assign { target, value } => {
                let value = self.eval(*value, env)?;
                env.assign(target, value);
            }
            Node::Import { name } => {
                let value = self
                    .loader
                    .support(name)
                    .ok_or_else(|| self.runtime_error(id, format!("no support symbol named '{name}'")))?;
                env.assign(name, value);
            }
            Node::If {
                condition,
                then_body,
                else_body,
            } => {
                let branch = if self.eval(*condition, env)?.is_truthy() {
                    then_body
                } else {
                    else_body
                };
                return self.exec_block(branch, env);
            }
            Node::While { condition, body } => {
                while self.eval(*condition, env)?.is_truthy() {
                    if let ControlFlow::Return(value) = self.exec_block(body, env)? {
                        return Ok(ControlFlow::Return(value));
                    }
                }
            }
            Node::ExprStmt { expr } => {
                self.eval(*expr, env)?;
            }
            // Declarations are collected when the enclosing function is created
            Node::Global { .. } | Node::Pass => {}
            Node::Module { body } => return self.exec_block(body, env),
            _ => {
                self.eval(id, env)?;
            }
        }
        Ok(ControlFlow::Normal)
    }

    fn define_function(&self, id: NodeId, def: &FunctionDef, env: &Environment) -> HostResult<()> {
        let function = Rc::new(Function {
            name: def.name.clone(),
            params: def.params.clone(),
            body: def.body.clone(),
            graph: self.graph.clone(),
            file: self.file.clone(),
            scopes: env.closure_scopes(),
            globals: env.globals.clone(),
            declared_globals: self.declared_globals(&def.body),
        });
        let value = self.apply_markers(id, def, Value::Function(function), env)?;
        env.assign(&def.name, value);
        Ok(())
    }

    /// Names declared `global` anywhere in a body, outside nested functions
    fn declared_globals(&self, body: &[NodeId]) -> FxHashSet<String> {
        let mut names = FxHashSet::default();
        let mut stack = body.to_vec();
        while let Some(id) = stack.pop() {
            match self.graph.get_node(id) {
                Some(Node::Global { names: declared }) => names.extend(declared.iter().cloned()),
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

    /// Applies a definition's markers.
    ///
    /// A macro marker in front receives the whole definition and its result
    /// replaces it. Otherwise every marker is an ordinary callable and they are
    /// applied bottom-up.
    fn apply_markers(
        &self,
        id: NodeId,
        def: &FunctionDef,
        function: Value,
        env: &Environment,
    ) -> HostResult<Value> {
        let Some((&front, rest)) = def.markers.split_first() else {
            return Ok(function);
        };

        let first = self.eval(front, env)?;
        if let Value::Macro(hook) = &first {
            let line = self.graph.span(id).map_or(1, |span| span.start.line);
            let definition = DefinitionRef {
                name: def.name.clone(),
                file: self.file.clone(),
                line,
            };
            let context = DefinitionContext {
                ambient: env.globals.clone(),
                nested: env.in_function,
            };
            debug!(
                "Expanding marker '{}' on '{}' at {}:{}",
                hook.name(),
                def.name,
                self.file,
                line
            );
            return hook
                .expand(&definition, &context)
                .map_err(HostError::Expansion);
        }

        let mut decorators = vec![(front, first)];
        for &marker in rest {
            let value = self.eval(marker, env)?;
            if let Value::Macro(hook) = &value {
                warn!(
                    "Marker '{}' on '{}' is not first in its marker list",
                    hook.name(),
                    def.name
                );
                return Err(self.runtime_error(
                    marker,
                    format!("marker '{}' must lead the marker list", hook.name()),
                ));
            }
            decorators.push((marker, value));
        }

        let mut value = function;
        for (marker, decorator) in decorators.into_iter().rev() {
            value = call_value(self.loader, &decorator, vec![value])
                .map_err(|err| self.locate(err, marker))?;
        }
        Ok(value)
    }

    // ----- expressions -----

    fn eval(&self, id: NodeId, env: &Environment) -> HostResult<Value> {
        match self.node(id)? {
            Node::Literal(literal) => Ok(match literal {
                Literal::Integer(i) => Value::Integer(*i),
                Literal::Float(f) => Value::Float(*f),
                Literal::String(s) => Value::string(s.as_str()),
                Literal::Boolean(b) => Value::Boolean(*b),
                Literal::None => Value::None,
            }),
            Node::Name { id: name } => env
                .lookup(name)
                .or_else(|| self.loader.builtin(name))
                .ok_or_else(|| self.runtime_error(id, format!("name '{name}' is not defined"))),
            Node::BinOp {
                op: BinOp::And,
                left,
                right,
            } => {
                let left = self.eval(*left, env)?;
                if left.is_truthy() {
                    self.eval(*right, env)
                } else {
                    Ok(left)
                }
            }
            Node::BinOp {
                op: BinOp::Or,
                left,
                right,
            } => {
                let left = self.eval(*left, env)?;
                if left.is_truthy() {
                    Ok(left)
                } else {
                    self.eval(*right, env)
                }
            }
            Node::BinOp { op, left, right } => {
                let left = self.eval(*left, env)?;
                let right = self.eval(*right, env)?;
                left.binary(*op, &right)
                    .map_err(|err| self.runtime_error(id, err.to_string()))
            }
            Node::UnaryOp { op, operand } => {
                let operand = self.eval(*operand, env)?;
                self.eval_unary(id, *op, operand)
            }
            Node::Call { function, args } => {
                let callee = self.eval(*function, env)?;
                let args = args
                    .iter()
                    .map(|arg| self.eval(*arg, env))
                    .collect::<HostResult<Vec<_>>>()?;
                call_value(self.loader, &callee, args).map_err(|err| self.locate(err, id))
            }
            Node::List { items } => {
                let items = items
                    .iter()
                    .map(|item| self.eval(*item, env))
                    .collect::<HostResult<Vec<_>>>()?;
                Ok(Value::list(items))
            }
            other => Err(self.runtime_error(
                id,
                format!("cannot evaluate statement {:?} as an expression", other),
            )),
        }
    }

    fn eval_unary(&self, id: NodeId, op: UnaryOp, operand: Value) -> HostResult<Value> {
        match (op, operand) {
            (UnaryOp::Not, value) => Ok(Value::Boolean(!value.is_truthy())),
            (UnaryOp::Neg, Value::Integer(i)) => i
                .checked_neg()
                .map(Value::Integer)
                .ok_or_else(|| self.runtime_error(id, "integer overflow")),
            (UnaryOp::Neg, Value::Boolean(b)) => Ok(Value::Integer(-i64::from(b))),
            (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
            (UnaryOp::Neg, other) => Err(self.runtime_error(
                id,
                format!("bad operand type for unary -: '{}'", other.type_name()),
            )),
        }
    }
}

/// Calls any callable value. Errors carry no location; callers attach one.
pub(crate) fn call_value(loader: &Loader, callee: &Value, args: Vec<Value>) -> HostResult<Value> {
    match callee {
        Value::Function(function) => call_function(loader, function, args),
        Value::Native(native) => native
            .call(&args)
            .map_err(|err| RuntimeError::detached(format!("{}(): {}", native.name, err)).into()),
        Value::Macro(hook) => Err(RuntimeError::detached(format!(
            "marker '{}' can only be applied to a definition",
            hook.name()
        ))
        .into()),
        other => Err(RuntimeError::detached(format!(
            "'{}' object is not callable",
            other.type_name()
        ))
        .into()),
    }
}

fn call_function(loader: &Loader, function: &Rc<Function>, args: Vec<Value>) -> HostResult<Value> {
    if args.len() != function.params.len() {
        return Err(RuntimeError::detached(format!(
            "{}() takes {} arguments but {} were given",
            function.name,
            function.params.len(),
            args.len()
        ))
        .into());
    }

    let _guard = loader.enter_call()?;
    let env = Environment::for_call(function);
    for (param, arg) in function.params.iter().zip(args) {
        env.locals.set(param.as_str(), arg);
    }
    Interpreter::new(loader, function.graph.clone(), function.file.clone())
        .call_body(&function.body, &env)
}

#[cfg(test)]
#[path = "interpreter_tests.rs"]
mod tests;
