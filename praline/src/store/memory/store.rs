use crate::collection::QueryOptions;
use crate::common::{StoredMap, StoredValue, DOC_ID};
use crate::errors::{ErrorKind, PralineError, PralineResult};
use crate::store::memory::ops::{apply_modifier, matches, order_documents, project};
use crate::store::{
    Backend, BackendProvider, DocId, IndexSpec, Modifier, RawCursor, UpdateOptions,
};
use crossbeam_skiplist::SkipMap;
use dashmap::DashMap;
use itertools::Itertools;
use parking_lot::RwLock;
use std::sync::Arc;

/// In-memory storage collaborator.
///
/// `MemoryBackend` implements the full backend contract against process
/// memory: named collections held in a concurrent map, each collection a
/// concurrent skip list keyed by [DocId] (so iteration order follows id
/// order, which tracks insertion order). It exists for tests and for callers
/// who want an embedded store; real drivers implement the same
/// [BackendProvider] trait.
#[derive(Clone)]
pub struct MemoryBackend {
    inner: Arc<MemoryBackendInner>,
}

struct MemoryBackendInner {
    collections: DashMap<String, MemoryCollection>,
}

#[derive(Clone)]
struct MemoryCollection {
    inner: Arc<MemoryCollectionInner>,
}

struct MemoryCollectionInner {
    docs: SkipMap<DocId, RwLock<StoredMap>>,
    indexes: RwLock<Vec<IndexSpec>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        MemoryBackend {
            inner: Arc::new(MemoryBackendInner {
                collections: DashMap::new(),
            }),
        }
    }

    /// Wraps this backend in a [Backend] handle.
    pub fn into_backend(self) -> Backend {
        Backend::new(self)
    }

    /// The index specifications registered against a collection.
    pub fn indexes(&self, collection: &str) -> Vec<IndexSpec> {
        self.collection(collection).inner.indexes.read().clone()
    }

    fn collection(&self, name: &str) -> MemoryCollection {
        self.inner
            .collections
            .entry(name.to_string())
            .or_insert_with(|| MemoryCollection {
                inner: Arc::new(MemoryCollectionInner {
                    docs: SkipMap::new(),
                    indexes: RwLock::new(Vec::new()),
                }),
            })
            .clone()
    }

    fn matching_ids(
        collection: &MemoryCollection,
        filter: &StoredMap,
        first_only: bool,
    ) -> PralineResult<Vec<DocId>> {
        let mut ids = Vec::new();
        for entry in collection.inner.docs.iter() {
            let document = entry.value().read();
            if matches(&document, filter)? {
                ids.push(*entry.key());
                if first_only {
                    break;
                }
            }
        }
        Ok(ids)
    }

    fn matching_documents(
        collection: &MemoryCollection,
        filter: &StoredMap,
    ) -> PralineResult<Vec<StoredMap>> {
        let mut documents = Vec::new();
        for entry in collection.inner.docs.iter() {
            let document = entry.value().read();
            if matches(&document, filter)? {
                documents.push(document.clone());
            }
        }
        Ok(documents)
    }

    fn seed_from_filter(filter: &StoredMap) -> PralineResult<StoredMap> {
        // an upsert seeds the new document with the filter's equality terms
        let mut equality = StoredMap::new();
        for (path, value) in filter {
            if matches!(value, StoredValue::Regex(_)) {
                continue;
            }
            equality.insert(path.clone(), value.clone());
        }
        apply_modifier(&StoredMap::new(), &Modifier::set(equality))
    }
}

impl Default for MemoryBackend {
    fn default() -> Self {
        MemoryBackend::new()
    }
}

impl BackendProvider for MemoryBackend {
    fn insert(&self, collection: &str, document: StoredMap) -> PralineResult<DocId> {
        let collection = self.collection(collection);
        let mut document = document;
        let id = match document.get(DOC_ID).and_then(|v| v.as_id()) {
            Some(id) => id,
            None => {
                let id = DocId::generate();
                document.insert(DOC_ID.to_string(), StoredValue::Id(id));
                id
            }
        };
        collection.inner.docs.insert(id, RwLock::new(document));
        Ok(id)
    }

    fn update(
        &self,
        collection_name: &str,
        filter: &StoredMap,
        modifier: &Modifier,
        options: &UpdateOptions,
    ) -> PralineResult<()> {
        let collection = self.collection(collection_name);
        let ids = Self::matching_ids(&collection, filter, !options.multi)?;

        if ids.is_empty() {
            if options.upsert {
                let seeded = Self::seed_from_filter(filter)?;
                let document = apply_modifier(&seeded, modifier)?;
                self.insert(collection_name, document)?;
            }
            return Ok(());
        }

        for id in ids {
            if let Some(entry) = collection.inner.docs.get(&id) {
                let mut guard = entry.value().write();
                *guard = apply_modifier(&guard, modifier)?;
            }
        }
        Ok(())
    }

    fn find_one(
        &self,
        collection: &str,
        filter: &StoredMap,
        options: &QueryOptions,
    ) -> PralineResult<Option<StoredMap>> {
        let mut cursor = self.find(collection, filter, options)?;
        cursor.next().transpose()
    }

    fn find(
        &self,
        collection: &str,
        filter: &StoredMap,
        options: &QueryOptions,
    ) -> PralineResult<RawCursor> {
        let collection = self.collection(collection);
        let mut documents = Self::matching_documents(&collection, filter)?;

        let sort = options.sort_spec();
        if !sort.is_empty() {
            documents = documents
                .into_iter()
                .sorted_by(|a, b| order_documents(a, b, sort))
                .collect();
        }

        let skip = options.skip_count().unwrap_or(0) as usize;
        let limit = options.limit_count().map(|n| n as usize).unwrap_or(usize::MAX);
        let projection = options.projection().map(|fields| fields.to_vec());

        let iter = documents
            .into_iter()
            .skip(skip)
            .take(limit)
            .map(move |document| {
                Ok(match &projection {
                    Some(fields) => project(&document, fields),
                    None => document,
                })
            });
        Ok(RawCursor::new(Box::new(iter)))
    }

    fn find_and_modify(
        &self,
        collection_name: &str,
        filter: &StoredMap,
        modifier: &Modifier,
    ) -> PralineResult<Option<StoredMap>> {
        let collection = self.collection(collection_name);
        let ids = Self::matching_ids(&collection, filter, true)?;
        let Some(id) = ids.first() else {
            return Ok(None);
        };
        let entry = collection.inner.docs.get(id).ok_or_else(|| {
            log::error!("Matched document {} disappeared before modification", id);
            PralineError::new(
                "Matched document disappeared before modification",
                ErrorKind::Internal,
            )
        })?;
        let mut guard = entry.value().write();
        let before = guard.clone();
        *guard = apply_modifier(&before, modifier)?;
        Ok(Some(before))
    }

    fn create_index(&self, collection: &str, spec: &IndexSpec) -> PralineResult<()> {
        if spec.field.is_empty() {
            log::error!("Index field name cannot be empty");
            return Err(PralineError::new(
                "Index field name cannot be empty",
                ErrorKind::InvalidOperation,
            ));
        }
        let collection = self.collection(collection);
        let mut indexes = collection.inner.indexes.write();
        if !indexes.iter().any(|existing| existing == spec) {
            indexes.push(spec.clone());
        }
        Ok(())
    }

    fn count(&self, collection: &str, filter: &StoredMap) -> PralineResult<u64> {
        let collection = self.collection(collection);
        Ok(Self::matching_ids(&collection, filter, false)?.len() as u64)
    }
}
