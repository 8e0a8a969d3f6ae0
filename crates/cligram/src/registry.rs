//! The process-wide node-type registry.
//!
//! Built-in types are registered on first access; library users may add
//! their own with [`register`]. Names are unique: registering a duplicate
//! is an error. After initialization the registry is only read.

use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::error::GrammarError;
use crate::node::NodeType;
use crate::nodes;

static REGISTRY: Lazy<RwLock<Vec<&'static NodeType>>> =
    Lazy::new(|| RwLock::new(nodes::builtin_types().to_vec()));

/// Register a node type. Fails if a type with the same name exists.
pub fn register(kind: &'static NodeType) -> Result<(), GrammarError> {
    let mut registry = REGISTRY
        .write()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    if registry.iter().any(|t| t.name == kind.name) {
        return Err(GrammarError::DuplicateNodeType(kind.name.to_string()));
    }
    registry.push(kind);
    Ok(())
}

/// Look up a node type by name.
pub fn lookup(name: &str) -> Option<&'static NodeType> {
    let registry = REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    registry.iter().copied().find(|t| t.name == name)
}

/// List the registered type names, in registration order.
pub fn type_names() -> Vec<&'static str> {
    let registry = REGISTRY
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    registry.iter().map(|t| t.name).collect()
}
