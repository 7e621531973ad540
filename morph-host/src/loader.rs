//! Module loading and unit compilation
//!
//! The [`Loader`] owns the host's configuration, builtins, support symbols and
//! source registry. Compiling a unit parses it, runs the static checks and then
//! executes its top-level statements against a lookup and a write namespace.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::Rc;

use morph_core::ast::Position;
use morph_core::source::{FileId, SourceRegistry};
use morph_core::{Namespace, Value};
use morph_parser::HostGrammar;
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::builtins::builtins;
use crate::check::UnitChecker;
use crate::config::HostConfig;
use crate::environment::Environment;
use crate::error::{CompileError, HostResult, RuntimeError};
use crate::interpreter::{call_value, Interpreter};

struct LoaderInner {
    config: HostConfig,
    grammar: HostGrammar,
    sources: SourceRegistry,
    builtins: Namespace,
    /// Symbols units may bring in with `import`
    support: RefCell<FxHashMap<String, Value>>,
    call_depth: Cell<usize>,
}

/// Compiles and runs host code. Clones share all state.
#[derive(Clone)]
pub struct Loader {
    inner: Rc<LoaderInner>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

/// Decrements the call depth when a call returns
pub(crate) struct CallGuard<'l> {
    depth: &'l Cell<usize>,
}

impl Drop for CallGuard<'_> {
    fn drop(&mut self) {
        self.depth.set(self.depth.get().saturating_sub(1));
    }
}

impl Loader {
    pub fn new(config: HostConfig) -> Self {
        Self::with_sources(config, SourceRegistry::new())
    }

    /// Loader sharing an existing source registry
    pub fn with_sources(config: HostConfig, sources: SourceRegistry) -> Self {
        Self {
            inner: Rc::new(LoaderInner {
                grammar: HostGrammar::new(config.max_parse_depth),
                config,
                sources,
                builtins: builtins(),
                support: RefCell::new(FxHashMap::default()),
                call_depth: Cell::new(0),
            }),
        }
    }

    pub fn config(&self) -> &HostConfig {
        &self.inner.config
    }

    pub fn sources(&self) -> &SourceRegistry {
        &self.inner.sources
    }

    pub fn grammar(&self) -> HostGrammar {
        self.inner.grammar
    }

    /// Makes `value` importable as `import <name>`
    pub fn register_support(&self, name: impl Into<String>, value: Value) {
        let name = name.into();
        debug!("Registered support symbol '{}'", name);
        self.inner.support.borrow_mut().insert(name, value);
    }

    pub fn has_support(&self, name: &str) -> bool {
        self.inner.support.borrow().contains_key(name)
    }

    pub fn support(&self, name: &str) -> Option<Value> {
        self.inner.support.borrow().get(name).cloned()
    }

    pub fn builtin(&self, name: &str) -> Option<Value> {
        self.inner.builtins.get(name)
    }

    pub fn new_module_namespace(&self, name: &str) -> Namespace {
        Namespace::new(format!("<module {name}>"))
    }

    /// Compiles `text` and runs its top level.
    ///
    /// Reads fall back from `write` to `lookup`; every binding the unit makes
    /// lands in `write`. The text is not registered; callers register it
    /// (with an origin map for generated units) beforehand.
    pub fn compile(
        &self,
        text: &str,
        file: &FileId,
        lookup: &Namespace,
        write: &Namespace,
    ) -> HostResult<()> {
        debug!(
            "Compiling {} (lookup {}, write {})",
            file,
            lookup.label(),
            write.label()
        );
        let graph = self.inner.grammar.parse(text).map_err(|err| {
            CompileError::new(
                err.message(),
                file.clone(),
                err.position().unwrap_or(Position::new(1, 0)),
            )
        })?;

        let is_support = |name: &str| self.has_support(name);
        let is_visible = |name: &str| {
            lookup.contains(name) || write.contains(name) || self.inner.builtins.contains(name)
        };
        UnitChecker::new(
            &graph,
            file,
            self.inner.config.resolution,
            &is_support,
            &is_visible,
        )
        .check()?;

        Interpreter::new(self, Rc::new(graph), file.clone())
            .run_unit(&Environment::for_unit(lookup, write))
    }

    /// Registers `text` under `file` and runs it as a module in `namespace`
    pub fn exec_module(&self, file: FileId, text: &str, namespace: &Namespace) -> HostResult<()> {
        self.inner.sources.register(file.clone(), text);
        self.compile(text, &file, namespace, namespace)?;
        info!("Executed module {}", file);
        Ok(())
    }

    /// Reads a module from disk and runs it in a fresh namespace
    pub fn load_file(&self, path: &Path) -> HostResult<Namespace> {
        let text = std::fs::read_to_string(path)?;
        let file = FileId::new(path.display().to_string());
        let namespace = self.new_module_namespace(file.as_str());
        self.exec_module(file, &text, &namespace)?;
        Ok(namespace)
    }

    /// Calls a host function, native function or decorator result
    pub fn call(&self, callee: &Value, args: &[Value]) -> HostResult<Value> {
        call_value(self, callee, args.to_vec())
    }

    pub(crate) fn enter_call(&self) -> HostResult<CallGuard<'_>> {
        let depth = self.inner.call_depth.get();
        if depth >= self.inner.config.max_call_depth {
            return Err(RuntimeError::detached(format!(
                "maximum call depth of {} exceeded",
                self.inner.config.max_call_depth
            ))
            .into());
        }
        self.inner.call_depth.set(depth + 1);
        Ok(CallGuard {
            depth: &self.inner.call_depth,
        })
    }
}

#[cfg(test)]
#[path = "loader_tests.rs"]
mod tests;
