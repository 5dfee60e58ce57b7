use crate::collection::QueryOptions;
use crate::common::{StoredMap, OP_INC, OP_POP, OP_PUSH, OP_SET};
use crate::errors::PralineResult;
use crate::store::DocId;
use std::ops::Deref;
use std::sync::Arc;

/// A store-native atomic partial-update primitive.
///
/// Each operator applies to one dotted field path without rewriting the whole
/// document; the backing store guarantees atomicity per document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AtomicOp {
    /// Set the fields to the given values.
    Set,
    /// Increment numeric fields by the given amounts; unset fields start at
    /// the increment.
    Inc,
    /// Append the given values to array fields.
    Push,
    /// Pop one element off array fields: value `-1` pops the front, `1` the
    /// back.
    Pop,
}

impl AtomicOp {
    /// The operator's wire name.
    pub fn wire(&self) -> &'static str {
        match self {
            AtomicOp::Set => OP_SET,
            AtomicOp::Inc => OP_INC,
            AtomicOp::Push => OP_PUSH,
            AtomicOp::Pop => OP_POP,
        }
    }
}

/// An update modifier: one atomic operator applied to a map of dotted field
/// paths.
#[derive(Debug, Clone, PartialEq)]
pub struct Modifier {
    op: AtomicOp,
    fields: StoredMap,
}

impl Modifier {
    pub fn new(op: AtomicOp, fields: StoredMap) -> Self {
        Modifier { op, fields }
    }

    pub fn set(fields: StoredMap) -> Self {
        Modifier::new(AtomicOp::Set, fields)
    }

    pub fn inc(fields: StoredMap) -> Self {
        Modifier::new(AtomicOp::Inc, fields)
    }

    pub fn push(fields: StoredMap) -> Self {
        Modifier::new(AtomicOp::Push, fields)
    }

    pub fn pop(fields: StoredMap) -> Self {
        Modifier::new(AtomicOp::Pop, fields)
    }

    pub fn op(&self) -> AtomicOp {
        self.op
    }

    pub fn fields(&self) -> &StoredMap {
        &self.fields
    }
}

/// Options for update operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdateOptions {
    /// Insert a new document from filter + modifier when nothing matches.
    pub upsert: bool,
    /// Update every matching document instead of just the first.
    pub multi: bool,
}

impl UpdateOptions {
    pub fn upsert() -> Self {
        UpdateOptions {
            upsert: true,
            multi: false,
        }
    }
}

impl Default for UpdateOptions {
    fn default() -> Self {
        UpdateOptions {
            upsert: false,
            multi: false,
        }
    }
}

/// A single-field index specification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
    pub field: String,
    pub order: crate::common::SortOrder,
}

impl IndexSpec {
    pub fn new(field: impl Into<String>, order: crate::common::SortOrder) -> Self {
        IndexSpec {
            field: field.into(),
            order,
        }
    }
}

/// A lazy stream of raw wire documents produced by a backend query.
///
/// One-pass and non-restartable; re-issue the query to start over.
pub struct RawCursor {
    iter: Box<dyn Iterator<Item = PralineResult<StoredMap>> + Send>,
}

impl RawCursor {
    pub fn new(iter: Box<dyn Iterator<Item = PralineResult<StoredMap>> + Send>) -> Self {
        RawCursor { iter }
    }

    /// An already-exhausted cursor.
    pub fn empty() -> Self {
        RawCursor {
            iter: Box::new(std::iter::empty()),
        }
    }
}

impl Iterator for RawCursor {
    type Item = PralineResult<StoredMap>;

    fn next(&mut self) -> Option<Self::Item> {
        self.iter.next()
    }
}

/// Trait defining the storage collaborator per named collection.
///
/// The mapping layer consumes exactly this surface: document insertion,
/// filtered atomic updates, single/multi document retrieval, atomic
/// find-and-modify, index creation, and counting. Everything else (query
/// planning, durability, replication, transactions) belongs to the store
/// behind the seam.
pub trait BackendProvider: Send + Sync {
    /// Inserts a document, assigning an id when the document carries none.
    fn insert(&self, collection: &str, document: StoredMap) -> PralineResult<DocId>;

    /// Applies an atomic modifier to documents matching the filter.
    fn update(
        &self,
        collection: &str,
        filter: &StoredMap,
        modifier: &Modifier,
        options: &UpdateOptions,
    ) -> PralineResult<()>;

    /// Returns the first matching document, or `None`.
    fn find_one(
        &self,
        collection: &str,
        filter: &StoredMap,
        options: &QueryOptions,
    ) -> PralineResult<Option<StoredMap>>;

    /// Returns a lazy cursor over matching documents.
    fn find(
        &self,
        collection: &str,
        filter: &StoredMap,
        options: &QueryOptions,
    ) -> PralineResult<RawCursor>;

    /// Atomically applies the modifier to the first matching document and
    /// returns the document's pre-modification image, or `None` when nothing
    /// matched.
    fn find_and_modify(
        &self,
        collection: &str,
        filter: &StoredMap,
        modifier: &Modifier,
    ) -> PralineResult<Option<StoredMap>>;

    /// Registers an index on the collection.
    fn create_index(&self, collection: &str, spec: &IndexSpec) -> PralineResult<()>;

    /// Counts documents matching the filter.
    fn count(&self, collection: &str, filter: &StoredMap) -> PralineResult<u64>;
}

/// A storage backend handle.
///
/// `Backend` wraps a [BackendProvider] implementation behind an `Arc`, so
/// handles clone cheaply and every clone talks to the same store.
#[derive(Clone)]
pub struct Backend {
    inner: Arc<dyn BackendProvider>,
}

impl Backend {
    /// Creates a new `Backend` from a provider implementation.
    pub fn new<T: BackendProvider + 'static>(inner: T) -> Self {
        Backend {
            inner: Arc::new(inner),
        }
    }

    /// Wraps an already-shared provider.
    pub fn from_arc(inner: Arc<dyn BackendProvider>) -> Self {
        Backend { inner }
    }
}

impl Deref for Backend {
    type Target = Arc<dyn BackendProvider>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}
