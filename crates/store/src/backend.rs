use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use model::NormalizedDocument;

use crate::error::StoreError;

/// Storage for normalized documents, keyed by node id with a secondary
/// `(repository, prismic id)` index.
///
/// Writes may fail; reads never do. A poisoned lock on the read path is
/// recovered, so a link lookup always answers "present" or "not yet".
pub trait DocumentBackend: Send + Sync {
    /// Insert or replace a document. Returns the previous version, if any.
    fn put(
        &self,
        document: Arc<NormalizedDocument>,
    ) -> Result<Option<Arc<NormalizedDocument>>, StoreError>;
    /// Insert or replace many documents under a single write.
    fn batch_put(&self, documents: Vec<Arc<NormalizedDocument>>) -> Result<usize, StoreError>;
    fn get(&self, node_id: &str) -> Option<Arc<NormalizedDocument>>;
    fn get_by_prismic_id(&self, repository: &str, prismic_id: &str)
        -> Option<Arc<NormalizedDocument>>;
    fn remove(&self, node_id: &str) -> Result<Option<Arc<NormalizedDocument>>, StoreError>;
    /// Visit every stored document. Order is unspecified.
    fn scan(&self, visitor: &mut dyn FnMut(&Arc<NormalizedDocument>));
    fn len(&self) -> usize;
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
    /// Drop every document of `repository`, or everything when `None`.
    fn clear(&self, repository: Option<&str>) -> Result<usize, StoreError>;
}

#[derive(Default)]
struct Tables {
    documents: HashMap<String, Arc<NormalizedDocument>>,
    by_prismic_id: HashMap<(String, String), String>,
}

impl Tables {
    fn insert(&mut self, document: Arc<NormalizedDocument>) -> Option<Arc<NormalizedDocument>> {
        self.by_prismic_id.insert(
            (document.repository.clone(), document.prismic_id.clone()),
            document.id.clone(),
        );
        self.documents.insert(document.id.clone(), document)
    }

    fn remove(&mut self, node_id: &str) -> Option<Arc<NormalizedDocument>> {
        let removed = self.documents.remove(node_id)?;
        let key = (removed.repository.clone(), removed.prismic_id.clone());
        if self.by_prismic_id.get(&key).map(String::as_str) == Some(node_id) {
            self.by_prismic_id.remove(&key);
        }
        Some(removed)
    }
}

/// `HashMap`-backed document storage.
#[derive(Default)]
pub struct InMemoryBackend {
    tables: RwLock<Tables>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentBackend for InMemoryBackend {
    fn put(
        &self,
        document: Arc<NormalizedDocument>,
    ) -> Result<Option<Arc<NormalizedDocument>>, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.insert(document))
    }

    fn batch_put(&self, documents: Vec<Arc<NormalizedDocument>>) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        let count = documents.len();
        for document in documents {
            tables.insert(document);
        }
        Ok(count)
    }

    fn get(&self, node_id: &str) -> Option<Arc<NormalizedDocument>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        tables.documents.get(node_id).cloned()
    }

    fn get_by_prismic_id(
        &self,
        repository: &str,
        prismic_id: &str,
    ) -> Option<Arc<NormalizedDocument>> {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        let node_id = tables
            .by_prismic_id
            .get(&(repository.to_owned(), prismic_id.to_owned()))?;
        tables.documents.get(node_id).cloned()
    }

    fn remove(&self, node_id: &str) -> Result<Option<Arc<NormalizedDocument>>, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        Ok(tables.remove(node_id))
    }

    fn scan(&self, visitor: &mut dyn FnMut(&Arc<NormalizedDocument>)) {
        let tables = self.tables.read().unwrap_or_else(PoisonError::into_inner);
        for document in tables.documents.values() {
            visitor(document);
        }
    }

    fn len(&self) -> usize {
        self.tables
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .documents
            .len()
    }

    fn clear(&self, repository: Option<&str>) -> Result<usize, StoreError> {
        let mut tables = self.tables.write().map_err(|_| StoreError::Poisoned)?;
        let Some(repository) = repository else {
            let removed = tables.documents.len();
            *tables = Tables::default();
            return Ok(removed);
        };
        let doomed: Vec<String> = tables
            .documents
            .values()
            .filter(|doc| doc.repository == repository)
            .map(|doc| doc.id.clone())
            .collect();
        for node_id in &doomed {
            tables.remove(node_id);
        }
        Ok(doomed.len())
    }
}
