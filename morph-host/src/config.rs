//! Host configuration

use morph_parser::Parser;
use serde::{Deserialize, Serialize};

/// When free names in a compiled unit are resolved
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NameResolution {
    /// At call time; an unbound name fails only when evaluated
    #[default]
    Late,
    /// At compile time; every name in a function body must resolve
    Eager,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub resolution: NameResolution,
    /// Maximum nesting of host function calls
    pub max_call_depth: usize,
    /// Maximum parser recursion depth
    pub max_parse_depth: usize,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            resolution: NameResolution::Late,
            max_call_depth: 100,
            max_parse_depth: Parser::DEFAULT_MAX_DEPTH,
        }
    }
}

impl HostConfig {
    /// Default configuration with eager name resolution
    pub fn eager() -> Self {
        Self {
            resolution: NameResolution::Eager,
            ..Self::default()
        }
    }
}
