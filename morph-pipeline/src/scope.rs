//! Namespace tiers a generated unit compiles against

use morph_core::Namespace;
use tracing::debug;

use crate::config::ScopeRequest;
use crate::virtual_module::VirtualModuleRegistry;

/// Lookup and write namespaces for one generated unit
#[derive(Debug, Clone)]
pub enum ScopeBinding {
    /// The enclosing module namespace; bindings are visible to the module.
    /// Support symbols imported by the unit's prelude land there too, so later
    /// units in the same module see them without importing again.
    Ambient(Namespace),
    /// Reads fall back to `lookup`; bindings go to a fresh `write` namespace
    /// that is dropped once the target has been extracted
    Private { lookup: Namespace, write: Namespace },
    /// A persistent namespace from the virtual module registry
    Virtual { id: String, namespace: Namespace },
}

impl ScopeBinding {
    pub fn lookup(&self) -> &Namespace {
        match self {
            ScopeBinding::Ambient(namespace) => namespace,
            ScopeBinding::Private { lookup, .. } => lookup,
            ScopeBinding::Virtual { namespace, .. } => namespace,
        }
    }

    pub fn write(&self) -> &Namespace {
        match self {
            ScopeBinding::Ambient(namespace) => namespace,
            ScopeBinding::Private { write, .. } => write,
            ScopeBinding::Virtual { namespace, .. } => namespace,
        }
    }

    /// Whether `name` is already visible to code compiled in this scope
    pub fn is_visible(&self, name: &str) -> bool {
        self.lookup().contains(name) || self.write().contains(name)
    }

    pub fn tier(&self) -> &'static str {
        match self {
            ScopeBinding::Ambient(_) => "ambient",
            ScopeBinding::Private { .. } => "private",
            ScopeBinding::Virtual { .. } => "virtual",
        }
    }
}

pub struct ScopeBinder<'r> {
    virtual_modules: &'r VirtualModuleRegistry,
}

impl<'r> ScopeBinder<'r> {
    pub fn new(virtual_modules: &'r VirtualModuleRegistry) -> Self {
        Self { virtual_modules }
    }

    /// Builds the binding for a unit defining `target` inside `ambient`
    pub fn bind(&self, request: &ScopeRequest, ambient: &Namespace, target: &str) -> ScopeBinding {
        let binding = match request {
            ScopeRequest::Ambient => ScopeBinding::Ambient(ambient.clone()),
            ScopeRequest::Private => ScopeBinding::Private {
                lookup: ambient.clone(),
                write: Namespace::new(format!("<private {target}>")),
            },
            ScopeRequest::Virtual(id) => ScopeBinding::Virtual {
                id: id.clone(),
                namespace: self.virtual_modules.get_or_create(id),
            },
        };
        debug!("Binding '{}' in {} scope", target, binding.tier());
        binding
    }
}
