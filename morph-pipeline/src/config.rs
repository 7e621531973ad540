//! Invocation-site options for a compilation pass

use serde::{Deserialize, Serialize};

/// Namespace tier a generated unit is compiled against
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScopeRequest {
    /// The enclosing module namespace, for both lookups and bindings
    Ambient,
    /// Lookups in the enclosing module, bindings in a fresh namespace
    #[default]
    Private,
    /// A named persistent namespace from the virtual module registry
    Virtual(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PassOptions {
    /// Write the generated unit to stderr before compiling it
    pub print_codegen: bool,
    pub scope: ScopeRequest,
    /// Forwarded to the transformer uninterpreted
    pub dsl: serde_json::Value,
}

impl PassOptions {
    pub fn with_scope(mut self, scope: ScopeRequest) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_dsl(mut self, dsl: serde_json::Value) -> Self {
        self.dsl = dsl;
        self
    }

    pub fn with_print_codegen(mut self, print_codegen: bool) -> Self {
        self.print_codegen = print_codegen;
        self
    }
}
