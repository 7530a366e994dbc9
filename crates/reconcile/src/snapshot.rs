use std::collections::HashMap;

use serde_json::Value;

/// Field carrying the previewable identity on rendered nodes.
pub const DEFAULT_IDENTITY_FIELD: &str = "_previewable";

/// Immutable view of preview nodes keyed by their identity field value.
///
/// Built from the store at a given revision; the merge functions only ever
/// read it.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreviewSnapshot {
    identity_field: String,
    nodes: HashMap<String, Value>,
}

impl PreviewSnapshot {
    pub fn new(identity_field: impl Into<String>) -> Self {
        Self {
            identity_field: identity_field.into(),
            nodes: HashMap::new(),
        }
    }

    /// Collect nodes, skipping any that lack the identity field.
    pub fn from_nodes<I>(identity_field: impl Into<String>, nodes: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        let mut snapshot = Self::new(identity_field);
        for node in nodes {
            snapshot.insert(node);
        }
        snapshot
    }

    /// Add a node. Returns `false` when the node has no usable identity.
    pub fn insert(&mut self, node: Value) -> bool {
        match identity_key(node.get(&self.identity_field)) {
            Some(key) => {
                self.nodes.insert(key, node);
                true
            }
            None => false,
        }
    }

    pub fn identity_field(&self) -> &str {
        &self.identity_field
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.nodes.get(key)
    }

    /// Node whose identity matches the identity field of `candidate`.
    pub fn lookup(&self, candidate: &serde_json::Map<String, Value>) -> Option<&Value> {
        identity_key(candidate.get(&self.identity_field)).and_then(|key| self.nodes.get(&key))
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

fn identity_key(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
