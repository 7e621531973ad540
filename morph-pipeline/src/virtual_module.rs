//! Persistent named namespaces shared by several generated units
//!
//! Units installed into the same virtual module see each other's bindings,
//! which is what lets nested definitions refer to themselves and to each
//! other. A virtual module is never merged into a module namespace or into
//! another virtual module.

use std::cell::RefCell;
use std::rc::Rc;

use morph_core::{Namespace, SourceRegistry};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

use crate::error::{PipelineError, Result};
use crate::host::HostCompiler;

pub struct VirtualModuleRegistry {
    compiler: Rc<dyn HostCompiler>,
    sources: SourceRegistry,
    modules: RefCell<FxHashMap<String, Namespace>>,
}

impl VirtualModuleRegistry {
    pub fn new(compiler: Rc<dyn HostCompiler>, sources: SourceRegistry) -> Self {
        Self {
            compiler,
            sources,
            modules: RefCell::new(FxHashMap::default()),
        }
    }

    /// Creates an empty module; fails if `name` is taken
    pub fn create(&self, name: &str) -> Result<Namespace> {
        let mut modules = self.modules.borrow_mut();
        if modules.contains_key(name) {
            return Err(PipelineError::VirtualModuleExists(name.to_string()));
        }
        let namespace = Namespace::new(format!("<virtual {name}>"));
        modules.insert(name.to_string(), namespace.clone());
        debug!("Created virtual module '{}'", name);
        Ok(namespace)
    }

    pub fn get(&self, name: &str) -> Option<Namespace> {
        self.modules.borrow().get(name).cloned()
    }

    pub fn get_or_create(&self, name: &str) -> Namespace {
        if let Some(namespace) = self.get(name) {
            return namespace;
        }
        let namespace = Namespace::new(format!("<virtual {name}>"));
        self.modules
            .borrow_mut()
            .insert(name.to_string(), namespace.clone());
        debug!("Created virtual module '{}'", name);
        namespace
    }

    pub fn contains(&self, name: &str) -> bool {
        self.modules.borrow().contains_key(name)
    }

    /// Module names, sorted
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.modules.borrow().keys().cloned().collect();
        names.sort();
        names
    }

    /// Compiles `text` with the module as both lookup and write namespace.
    /// Bindings from earlier installs stay visible; nothing is reset.
    pub fn install(&self, name: &str, text: &str) -> Result<Namespace> {
        let namespace = self.get_or_create(name);
        let file = self.sources.fresh_file(&format!("virtual:{name}"));
        self.sources.register(file.clone(), text);
        self.compiler
            .compile(text, &file, &namespace, &namespace)
            .map_err(|err| PipelineError::from_host(err, &self.sources, text))?;
        info!("Installed {} into virtual module '{}'", file, name);
        Ok(namespace)
    }
}

#[cfg(test)]
#[path = "virtual_module_tests.rs"]
mod tests;
