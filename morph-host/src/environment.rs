//! Name resolution environment for executing statements

use morph_core::{Function, Namespace, Value};
use rustc_hash::FxHashSet;

/// Scopes visible to a running block
#[derive(Debug, Clone)]
pub struct Environment {
    /// Target of plain assignments
    pub locals: Namespace,
    /// Searched after `locals`, innermost first
    pub scopes: Vec<Namespace>,
    /// Target of names declared `global`
    pub globals: Namespace,
    pub declared_globals: FxHashSet<String>,
    /// True inside a function body
    pub in_function: bool,
}

impl Environment {
    /// Top level of a unit: assignments land in `write`, reads fall back to `lookup`
    pub fn for_unit(lookup: &Namespace, write: &Namespace) -> Self {
        let scopes = if lookup.ptr_eq(write) {
            Vec::new()
        } else {
            vec![lookup.clone()]
        };
        Self {
            locals: write.clone(),
            scopes,
            globals: lookup.clone(),
            declared_globals: FxHashSet::default(),
            in_function: false,
        }
    }

    /// Fresh locals for one call of `function`
    pub fn for_call(function: &Function) -> Self {
        Self {
            locals: Namespace::new(format!("<locals of {}>", function.name)),
            scopes: function.scopes.clone(),
            globals: function.globals.clone(),
            declared_globals: function.declared_globals.clone(),
            in_function: true,
        }
    }

    /// Scopes a function defined here closes over
    pub fn closure_scopes(&self) -> Vec<Namespace> {
        let mut scopes = Vec::with_capacity(self.scopes.len() + 1);
        scopes.push(self.locals.clone());
        scopes.extend(self.scopes.iter().cloned());
        scopes
    }

    /// Look up a name, not consulting builtins
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if self.declared_globals.contains(name) {
            return self.globals.get(name);
        }
        if let Some(value) = self.locals.get(name) {
            return Some(value);
        }
        self.scopes.iter().find_map(|scope| scope.get(name))
    }

    /// Bind a name
    pub fn assign(&self, name: &str, value: Value) {
        if self.declared_globals.contains(name) {
            self.globals.set(name, value);
        } else {
            self.locals.set(name, value);
        }
    }
}
