use crate::codec;
use crate::collection::{Cursor, QueryOptions};
use crate::common::{FieldMap, Key, SortOrder, StoredMap, StoredValue, Value, DOC_ID};
use crate::errors::{ErrorKind, PralineError, PralineResult};
use crate::piece::Piece;
use crate::store::{Backend, DocId, IndexSpec, Modifier, UpdateOptions};
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// A handle onto one named collection of documents.
///
/// The binding is explicit: the store collection name is taken exactly as
/// given (no pluralization), and an optional entity kind decides what
/// materialized results and embedded copies call themselves. Handles are
/// cheap clones over shared state and are cached per database handle.
#[derive(Clone)]
pub struct Collection {
    inner: Arc<CollectionInner>,
}

struct CollectionInner {
    backend: Backend,
    database: String,
    name: String,
    kind: Option<String>,
    hydrate_finds: bool,
}

impl Collection {
    pub(crate) fn bind(
        backend: Backend,
        database: &str,
        name: &str,
        kind: Option<String>,
        hydrate_finds: bool,
    ) -> PralineResult<Collection> {
        if name.is_empty() {
            log::error!("Collection name cannot be empty");
            return Err(PralineError::new(
                "Collection name cannot be empty",
                ErrorKind::ConnectionConfig,
            ));
        }
        Ok(Collection {
            inner: Arc::new(CollectionInner {
                backend,
                database: database.to_string(),
                name: name.to_string(),
                kind,
                hydrate_finds,
            }),
        })
    }

    /// The logical collection name.
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// The entity kind bound for materialization, if any.
    pub fn kind(&self) -> Option<String> {
        self.inner.kind.clone()
    }

    /// Creates a brand-new unsaved piece in this collection. Nothing touches
    /// the store until the first attribute write.
    pub fn create(&self) -> Piece {
        Piece::unsaved(self.clone())
    }

    /// Wraps an existing identity without checking the store.
    pub fn piece(&self, id: DocId) -> Piece {
        Piece::shell(self.clone(), id)
    }

    /// Finds a document by id, returning a lazily-hydrated shell, or `None`
    /// when no such document exists.
    pub fn find(&self, id: DocId) -> PralineResult<Option<Piece>> {
        let found = self.inner.backend.find_one(
            &self.qualified_name(),
            &self.id_filter(id),
            &QueryOptions::id_only(),
        )?;
        Ok(found.map(|_| self.piece(id)))
    }

    /// Returns the first document matching the conditions, or `None`.
    ///
    /// By default the query projects the identity only and the piece
    /// hydrates lazily; under the `hydrate_finds` profile the full document
    /// is fetched and decoded immediately.
    pub fn first(&self, conditions: FieldMap) -> PralineResult<Option<Piece>> {
        let filter = codec::encode_filter(&conditions)?;
        if self.inner.hydrate_finds {
            let found =
                self.inner
                    .backend
                    .find_one(&self.qualified_name(), &filter, &QueryOptions::new())?;
            return match found {
                Some(raw) => Ok(Some(Piece::materialize(self.clone(), &raw)?)),
                None => Ok(None),
            };
        }

        let found = self.inner.backend.find_one(
            &self.qualified_name(),
            &filter,
            &QueryOptions::id_only(),
        )?;
        match found {
            Some(raw) => {
                let id = raw.get(DOC_ID).and_then(|v| v.as_id()).ok_or_else(|| {
                    log::error!("Stored document has no id");
                    PralineError::new("Stored document has no id", ErrorKind::Internal)
                })?;
                Ok(Some(self.piece(id)))
            }
            None => Ok(None),
        }
    }

    /// Finds the first document whose `field` equals `value`: the ad hoc
    /// per-field lookup, exposed as an ordinary named function.
    pub fn find_by(&self, field: &str, value: impl Into<Value>) -> PralineResult<Option<Piece>> {
        self.find_by_with(field, value, FieldMap::new())
    }

    /// Like [`Collection::find_by`], merged with extra conditions.
    pub fn find_by_with(
        &self,
        field: &str,
        value: impl Into<Value>,
        extra: FieldMap,
    ) -> PralineResult<Option<Piece>> {
        let mut conditions = FieldMap::new();
        conditions.insert(Key::name(field), value.into());
        for (key, condition) in extra {
            conditions.entry(key).or_insert(condition);
        }
        self.first(conditions)
    }

    /// Upserts: the subset of `values` named by `key_fields` forms the
    /// filter; a matching document is updated in place, otherwise a new
    /// document is inserted with all of `values`.
    pub fn upsert(&self, key_fields: &[&str], values: FieldMap) -> PralineResult<()> {
        let mut filter = FieldMap::new();
        for field in key_fields {
            let key = Key::name(*field);
            match values.get(&key) {
                Some(value) => {
                    filter.insert(key, value.clone());
                }
                None => {
                    log::error!("Upsert key field {} is missing from the values", field);
                    return Err(PralineError::new(
                        &format!("Upsert key field {} is missing from the values", field),
                        ErrorKind::InvalidOperation,
                    ));
                }
            }
        }

        let filter = codec::encode_filter(&filter)?;
        let modifier = Modifier::set(codec::encode_fields(&values)?);
        self.inner.backend.update(
            &self.qualified_name(),
            &filter,
            &modifier,
            &UpdateOptions::upsert(),
        )
    }

    /// Creates an index on one field.
    ///
    /// Deliberately simple; compound or unique indexes go through the
    /// backend directly.
    pub fn index(&self, field: &str, order: SortOrder) -> PralineResult<()> {
        self.inner
            .backend
            .create_index(&self.qualified_name(), &IndexSpec::new(field, order))
    }

    /// Like [`Collection::index`], accepting a direction token
    /// (`asc`/`desc`/`up`/`down`). Unknown tokens fail with
    /// [`ErrorKind::IndexDirection`].
    pub fn index_token(&self, field: &str, direction: &str) -> PralineResult<()> {
        self.index(field, SortOrder::from_token(direction)?)
    }

    /// Opens a cursor over documents matching the filter.
    ///
    /// Recognized option keys (`fields`, `skip`, `limit`, `sort`, `hint`,
    /// `snapshot`, `timeout`) are extracted from the filter into the
    /// cursor's query options.
    pub fn query(&self, filter: FieldMap) -> PralineResult<Cursor> {
        let mut filter = filter;
        let options = QueryOptions::extract_from(&mut filter)?;
        let encoded = codec::encode_filter(&filter)?;
        Ok(Cursor::open(self.clone(), encoded, options))
    }

    /// A cursor over every document in the collection.
    pub fn all(&self) -> PralineResult<Cursor> {
        self.query(FieldMap::new())
    }

    /// Counts all documents in the collection.
    pub fn count(&self) -> PralineResult<u64> {
        self.inner.backend.count(&self.qualified_name(), &StoredMap::new())
    }

    pub(crate) fn backend(&self) -> &Backend {
        &self.inner.backend
    }

    pub(crate) fn qualified_name(&self) -> String {
        format!("{}.{}", self.inner.database, self.inner.name)
    }

    pub(crate) fn id_filter(&self, id: DocId) -> StoredMap {
        let mut filter = StoredMap::new();
        filter.insert(DOC_ID.to_string(), StoredValue::Id(id));
        filter
    }

    pub(crate) fn insert_shell(&self) -> PralineResult<DocId> {
        self.inner.backend.insert(&self.qualified_name(), StoredMap::new())
    }

    pub(crate) fn update_by_id(&self, id: DocId, modifier: &Modifier) -> PralineResult<()> {
        self.inner.backend.update(
            &self.qualified_name(),
            &self.id_filter(id),
            modifier,
            &UpdateOptions::default(),
        )
    }

    pub(crate) fn find_and_modify_by_id(
        &self,
        id: DocId,
        modifier: &Modifier,
    ) -> PralineResult<Option<StoredMap>> {
        self.inner
            .backend
            .find_and_modify(&self.qualified_name(), &self.id_filter(id), modifier)
    }

    pub(crate) fn fetch_by_id(&self, id: DocId) -> PralineResult<Option<StoredMap>> {
        self.inner.backend.find_one(
            &self.qualified_name(),
            &self.id_filter(id),
            &QueryOptions::new(),
        )
    }
}

impl Debug for Collection {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Collection({})", self.qualified_name())
    }
}
