//! Deterministic node ids.
//!
//! Ids are UUIDv5 values under a namespace derived from the repository name
//! and type prefix, so two repositories never share an id even for the same
//! source document. Scope parts are joined with a `0x00` separator before
//! hashing to keep `("ab", "c")` and `("a", "bc")` apart.
use std::fmt;

use uuid::Uuid;

use crate::error::IdentityError;

/// What kind of node an id is being derived for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeKind {
    Document,
    Slice,
}

impl NodeKind {
    pub fn as_str(self) -> &'static str {
        match self {
            NodeKind::Document => "document",
            NodeKind::Slice => "slice",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-repository id generator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIdentity {
    repository: String,
    type_prefix: Option<String>,
    namespace: Uuid,
}

impl NodeIdentity {
    pub fn for_repository(
        repository: &str,
        type_prefix: Option<&str>,
    ) -> Result<Self, IdentityError> {
        let repository = repository.trim();
        if repository.is_empty() {
            return Err(IdentityError::EmptyRepository);
        }
        let type_prefix = type_prefix
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(str::to_owned);
        let name = format!(
            "livepreview:{repository}:{}",
            type_prefix.as_deref().unwrap_or_default()
        );
        Ok(Self {
            repository: repository.to_owned(),
            type_prefix,
            namespace: Uuid::new_v5(&Uuid::NAMESPACE_URL, name.as_bytes()),
        })
    }

    pub fn repository(&self) -> &str {
        &self.repository
    }

    pub fn type_prefix(&self) -> Option<&str> {
        self.type_prefix.as_deref()
    }

    /// Derive an id for `kind` scoped by `parts`.
    pub fn derive_id(&self, kind: NodeKind, parts: &[&str]) -> Result<String, IdentityError> {
        if parts.is_empty() || parts.iter().all(|p| p.is_empty()) {
            return Err(IdentityError::EmptyScope(kind.as_str()));
        }
        let len = kind.as_str().len() + parts.iter().map(|p| p.len() + 1).sum::<usize>();
        let mut material = Vec::with_capacity(len);
        material.extend_from_slice(kind.as_str().as_bytes());
        for part in parts {
            material.push(0);
            material.extend_from_slice(part.as_bytes());
        }
        Ok(Uuid::new_v5(&self.namespace, &material).to_string())
    }

    /// Node id for a CMS document id.
    pub fn document_id(&self, prismic_id: &str) -> Result<String, IdentityError> {
        self.derive_id(NodeKind::Document, &[prismic_id])
    }

    /// Synthetic slice id from its type name and the digest of its raw value.
    ///
    /// Slices carry no id of their own, so the id is a function of content
    /// alone: identical slices share an id, within one slice zone or across
    /// documents. Key slices by position in their zone, not by this id, when
    /// they must stay distinct.
    pub fn slice_id(&self, type_name: &str, digest: &str) -> Result<String, IdentityError> {
        self.derive_id(NodeKind::Slice, &[type_name, digest])
    }
}
