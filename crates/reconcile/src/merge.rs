//! The two merge strategies.
//!
//! Both are pure functions of `(static_data, snapshot)`; recomputing them on
//! every store revision is always safe.
use heck::ToLowerCamelCase;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::snapshot::PreviewSnapshot;

/// Render data plus whether any preview content made it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeOutcome {
    pub data: Value,
    #[serde(rename = "isPreview")]
    pub is_preview: bool,
}

/// How preview nodes are merged into static data. Chosen by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "strategy", rename_all = "kebab-case")]
pub enum MergeStrategy {
    /// Replace every static node whose identity matches a preview node.
    TraverseAndReplace,
    /// Insert the preview node stored under `key` at the root of the static
    /// data. For pages that only exist as unpublished previews.
    RootReplaceOrInsert { key: String },
}

pub fn reconcile(
    static_data: &Value,
    snapshot: &PreviewSnapshot,
    strategy: &MergeStrategy,
) -> MergeOutcome {
    match strategy {
        MergeStrategy::TraverseAndReplace => traverse_and_replace(static_data, snapshot),
        MergeStrategy::RootReplaceOrInsert { key } => {
            root_replace_or_insert(static_data, snapshot.get(key))
        }
    }
}

/// Walk `static_data`, substituting any object whose identity field matches
/// a snapshot node. Substituted nodes are not descended into.
pub fn traverse_and_replace(static_data: &Value, snapshot: &PreviewSnapshot) -> MergeOutcome {
    if snapshot.is_empty() {
        return MergeOutcome {
            data: static_data.clone(),
            is_preview: false,
        };
    }
    let mut replaced = 0usize;
    let data = replace(static_data, snapshot, &mut replaced);
    debug!(replaced, "traverse_and_replace");
    MergeOutcome {
        data,
        is_preview: replaced > 0,
    }
}

fn replace(value: &Value, snapshot: &PreviewSnapshot, replaced: &mut usize) -> Value {
    match value {
        Value::Object(map) => {
            if let Some(node) = snapshot.lookup(map) {
                *replaced += 1;
                return node.clone();
            }
            Value::Object(
                map.iter()
                    .map(|(key, inner)| (key.clone(), replace(inner, snapshot, replaced)))
                    .collect(),
            )
        }
        Value::Array(items) => Value::Array(
            items
                .iter()
                .map(|item| replace(item, snapshot, replaced))
                .collect(),
        ),
        scalar => scalar.clone(),
    }
}

/// Root key for a node: its `__typename` in lower camel case
/// (`PrismicPage` → `prismicPage`, `Page` → `page`).
pub fn root_key(node: &Value) -> Option<String> {
    node.get("__typename")
        .and_then(Value::as_str)
        .filter(|name| !name.is_empty())
        .map(|name| name.to_lower_camel_case())
}

/// Insert or overwrite the node under its root key. Non-object static data
/// is replaced by a fresh object.
pub fn root_replace_or_insert(static_data: &Value, node: Option<&Value>) -> MergeOutcome {
    let unchanged = || MergeOutcome {
        data: static_data.clone(),
        is_preview: false,
    };
    let Some(node) = node else {
        return unchanged();
    };
    let Some(key) = root_key(node) else {
        warn!("preview node has no __typename; nothing inserted");
        return unchanged();
    };
    let mut data = match static_data {
        Value::Object(map) => map.clone(),
        _ => Map::new(),
    };
    data.insert(key, node.clone());
    MergeOutcome {
        data: Value::Object(data),
        is_preview: true,
    }
}
