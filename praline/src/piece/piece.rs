use crate::codec::{self, Owner};
use crate::collection::Collection;
use crate::common::{lookup, FieldMap, Key, StoredMap, StoredValue, Value, DOC_ID};
use crate::errors::{ErrorKind, PralineError, PralineResult};
use crate::piece::embed::{adopt_value, OwnerEdge, Propagator};
use crate::store::{AtomicOp, DocId, Modifier};
use parking_lot::RwLock;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// A document: the per-record entity mapped one-to-one to a store record.
///
/// A piece starts in one of three shapes:
///
/// * **unsaved**: created through [`Collection::create`]; it has no identity
///   until the first attribute write, which lazily inserts a shell document
///   and captures the store-assigned id. Reading from an unsaved piece
///   returns [`Value::Null`] without inserting anything.
/// * **shell**: wraps an existing identity and hydrates lazily: the first
///   read fetches the backing document and decodes it into the attribute
///   cache, threading ownership into every embedded container so later
///   mutations write back to the right dotted path.
/// * **embeddable**: created with [`Piece::embed`] (or decoded out of a
///   parent document); it has no collection of its own and delegates every
///   write upward through its owner, with field paths prefixed accordingly.
///
/// Writes go through the store's atomic single-field operators; the local
/// cache may grow stale against concurrent writers until [`Piece::refresh`].
/// Two pieces are equal exactly when both are persisted and share an id.
#[derive(Clone)]
pub struct Piece {
    inner: Arc<PieceInner>,
}

pub(crate) struct PieceInner {
    collection: Option<Collection>,
    kind: Option<String>,
    state: RwLock<PieceState>,
    edge: RwLock<Option<OwnerEdge>>,
}

struct PieceState {
    id: Option<DocId>,
    cache: FieldMap,
    loaded: bool,
}

impl Piece {
    fn build(
        collection: Option<Collection>,
        kind: Option<String>,
        id: Option<DocId>,
    ) -> Piece {
        Piece {
            inner: Arc::new(PieceInner {
                collection,
                kind,
                state: RwLock::new(PieceState {
                    id,
                    cache: FieldMap::new(),
                    loaded: false,
                }),
                edge: RwLock::new(None),
            }),
        }
    }

    /// A brand-new unsaved root piece. Inserts lazily on first write.
    pub(crate) fn unsaved(collection: Collection) -> Piece {
        let kind = collection.kind();
        Piece::build(Some(collection), kind, None)
    }

    /// A shell around an existing identity, hydrated lazily.
    pub(crate) fn shell(collection: Collection, id: DocId) -> Piece {
        let kind = collection.kind();
        Piece::build(Some(collection), kind, Some(id))
    }

    /// A freestanding embeddable document of the given kind, for later
    /// assignment into a parent. Mutations stay local until it is adopted.
    pub fn embed(kind: &str) -> Piece {
        Piece::build(None, Some(kind.to_string()), None)
    }

    /// Wraps a raw stored document into a fully hydrated piece.
    pub(crate) fn materialize(collection: Collection, raw: &StoredMap) -> PralineResult<Piece> {
        let id = raw.get(DOC_ID).and_then(|v| v.as_id()).ok_or_else(|| {
            log::error!("Stored document has no id");
            PralineError::new("Stored document has no id", ErrorKind::Internal)
        })?;
        let piece = Piece::shell(collection, id);
        piece.load_raw(raw)?;
        Ok(piece)
    }

    /// The store-assigned identity, absent until first persisted.
    pub fn id(&self) -> Option<DocId> {
        self.inner.state.read().id
    }

    /// The entity kind this piece materializes as, if any.
    pub fn kind(&self) -> Option<String> {
        self.inner.kind.clone()
    }

    /// Whether this piece currently delegates its writes to an owner.
    pub fn is_embedded(&self) -> bool {
        self.inner.edge.read().is_some()
    }

    /// Reads an attribute.
    ///
    /// The first read on a persisted piece fetches the whole backing
    /// document into the cache; unknown attributes and reads on unsaved
    /// pieces return [`Value::Null`]. Embedded containers in the result are
    /// owned by this piece under the attribute's path segment.
    pub fn get(&self, field: &str) -> PralineResult<Value> {
        self.get_key(&Key::name(field))
    }

    /// Reads an attribute under an explicit key.
    pub fn get_key(&self, key: &Key) -> PralineResult<Value> {
        self.ensure_loaded()?;
        Ok(self
            .inner
            .state
            .read()
            .cache
            .get(key)
            .cloned()
            .unwrap_or(Value::Null))
    }

    /// Writes one attribute. Equivalent to a single-entry [`Piece::set_many`].
    pub fn set(&self, field: &str, value: impl Into<Value>) -> PralineResult<()> {
        let mut fields = FieldMap::new();
        fields.insert(Key::name(field), value.into());
        self.set_many(fields)
    }

    /// Writes several attributes in one atomic `$set`.
    ///
    /// Values are encoded first; an encoding failure aborts before anything
    /// is applied. An unsaved root piece inserts its shell document here,
    /// capturing the new identity; an embedded piece delegates the update to
    /// its owner with prefixed field paths.
    pub fn set_many(&self, fields: FieldMap) -> PralineResult<()> {
        let encoded = codec::encode_fields(&fields)?;

        let owner = self.owner_handle();
        for (key, value) in &fields {
            adopt_value(value, &owner, &codec::encode_key(key));
        }
        {
            let mut state = self.inner.state.write();
            for (key, value) in fields {
                state.cache.insert(key, value);
            }
        }

        self.inner.apply(AtomicOp::Set, encoded)
    }

    /// Applies an arbitrary atomic operator to the given fields.
    ///
    /// `Set` updates the cache in place; other operators invalidate the
    /// touched entries so the next read refetches current store state.
    pub fn operate(&self, op: AtomicOp, fields: FieldMap) -> PralineResult<()> {
        if op == AtomicOp::Set {
            return self.set_many(fields);
        }
        let encoded = codec::encode_fields(&fields)?;
        {
            let mut state = self.inner.state.write();
            for key in fields.keys() {
                state.cache.shift_remove(key);
            }
            state.loaded = false;
        }
        self.inner.apply(op, encoded)
    }

    /// Increments a numeric attribute atomically. An unset attribute starts
    /// at the increment.
    pub fn inc(&self, field: &str, by: i64) -> PralineResult<()> {
        let mut fields = FieldMap::new();
        fields.insert(Key::name(field), Value::Int(by));
        self.operate(AtomicOp::Inc, fields)
    }

    /// Appends a value to an array attribute atomically.
    pub fn push(&self, field: &str, value: impl Into<Value>) -> PralineResult<()> {
        let mut fields = FieldMap::new();
        fields.insert(Key::name(field), value.into());
        self.operate(AtomicOp::Push, fields)
    }

    /// Pops the front of an array attribute atomically and returns it.
    pub fn shift(&self, field: &str) -> PralineResult<Option<Value>> {
        let pre_image = self.inner.pop(field, true)?;
        {
            let mut state = self.inner.state.write();
            state.cache.shift_remove(&Key::name(field));
            state.loaded = false;
        }
        match pre_image {
            Some(StoredValue::Array(values)) => {
                values.first().map(codec::decode).transpose()
            }
            _ => Ok(None),
        }
    }

    /// Drops the attribute cache; the next read reloads from the store and
    /// re-establishes ownership of embedded containers.
    pub fn refresh(&self) {
        let mut state = self.inner.state.write();
        state.cache.clear();
        state.loaded = false;
    }

    fn ensure_loaded(&self) -> PralineResult<()> {
        let Some(collection) = &self.inner.collection else {
            // embeddable pieces hold their state locally
            return Ok(());
        };
        let id = {
            let state = self.inner.state.read();
            if state.loaded {
                return Ok(());
            }
            match state.id {
                Some(id) => id,
                // no identity yet: nothing to load, and reads never insert
                None => return Ok(()),
            }
        };

        match collection.fetch_by_id(id)? {
            Some(raw) => self.load_raw(&raw),
            None => {
                self.inner.state.write().loaded = true;
                Ok(())
            }
        }
    }

    pub(crate) fn load_raw(&self, raw: &StoredMap) -> PralineResult<()> {
        let owner = self.owner_handle();
        let mut cache = FieldMap::new();
        for (raw_key, stored) in raw {
            if raw_key == DOC_ID {
                continue;
            }
            let value = codec::decode_with(
                stored,
                Some(Owner {
                    parent: &owner,
                    segment: raw_key,
                }),
            )?;
            cache.insert(codec::decode_key(raw_key), value);
        }
        let mut state = self.inner.state.write();
        state.cache = cache;
        state.loaded = true;
        Ok(())
    }

    /// Replaces the cache wholesale; used while decoding embedded pieces.
    pub(crate) fn fill_cache(&self, cache: FieldMap) {
        let mut state = self.inner.state.write();
        state.cache = cache;
        state.loaded = true;
    }

    /// A point-in-time copy of the cached attributes.
    pub(crate) fn cache_snapshot(&self) -> FieldMap {
        self.inner.state.read().cache.clone()
    }

    /// Adopts this piece under an owner slot, but only while it is
    /// embeddable. A piece bound to its own collection is snapshot-encoded
    /// instead of re-parented.
    pub(crate) fn adopt_embeddable(&self, owner: &Arc<dyn Propagator>, segment: &str) {
        if self.inner.collection.is_some() {
            return;
        }
        *self.inner.edge.write() = Some(OwnerEdge::new(owner, segment));
    }

    /// This piece as an owner for its embedded containers.
    pub(crate) fn owner_handle(&self) -> Arc<dyn Propagator> {
        self.inner.clone()
    }
}

impl PieceInner {
    fn apply(&self, op: AtomicOp, fields: StoredMap) -> PralineResult<()> {
        if let Some(edge) = self.edge.read().as_ref() {
            return edge.propagate(op, fields);
        }
        let Some(collection) = &self.collection else {
            // freestanding embeddable: mutations stay local until adoption
            return Ok(());
        };
        let id = self.ensure_id(collection)?;
        collection.update_by_id(id, &Modifier::new(op, fields))
    }

    fn ensure_id(&self, collection: &Collection) -> PralineResult<DocId> {
        let mut state = self.state.write();
        if let Some(id) = state.id {
            return Ok(id);
        }
        let id = collection.insert_shell()?;
        state.id = Some(id);
        Ok(id)
    }
}

impl Propagator for PieceInner {
    fn propagate(&self, op: AtomicOp, fields: StoredMap) -> PralineResult<()> {
        self.apply(op, fields)
    }

    fn pop(&self, path: &str, front: bool) -> PralineResult<Option<StoredValue>> {
        if let Some(edge) = self.edge.read().as_ref() {
            return edge.pop(path, front);
        }
        let Some(collection) = &self.collection else {
            return Ok(None);
        };
        let id = match self.state.read().id {
            Some(id) => id,
            None => return Ok(None),
        };

        let mut fields = StoredMap::new();
        fields.insert(path.to_string(), StoredValue::Int(if front { -1 } else { 1 }));
        let pre_image = collection.find_and_modify_by_id(id, &Modifier::pop(fields))?;
        Ok(pre_image.and_then(|document| lookup(&document, path)))
    }
}

impl PartialEq for Piece {
    /// Equality is identity: two pieces are equal iff both are persisted and
    /// their ids match. Unsaved pieces equal nothing, themselves included.
    fn eq(&self, other: &Self) -> bool {
        match (self.id(), other.id()) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Piece {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = self.kind();
        let kind = kind.as_deref().unwrap_or("piece");
        match self.id() {
            Some(id) => write!(f, "{}({})", kind, id),
            None => write!(f, "{}(unsaved)", kind),
        }
    }
}

impl Debug for Piece {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn embeddable_piece_holds_state_locally() {
        let piece = Piece::embed("Zagnut");
        assert!(piece.id().is_none());
        piece.set("licks", 7).unwrap();
        assert_eq!(piece.get("licks").unwrap(), Value::Int(7));
        assert_eq!(piece.get("missing").unwrap(), Value::Null);
    }

    #[test]
    fn unsaved_pieces_are_never_equal() {
        let a = Piece::embed("Zagnut");
        let b = Piece::embed("Zagnut");
        assert_ne!(a, b);
        assert_ne!(a, a.clone());
    }

    #[test]
    fn reserved_attribute_names_are_rejected() {
        let piece = Piece::embed("Zagnut");
        let err = piece.set("_id", 5).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::EncodingType);
        let err = piece.set("_class_", "Zagnut").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::EncodingType);
    }

    #[test]
    fn kind_is_carried() {
        let piece = Piece::embed("Zagnut");
        assert_eq!(piece.kind().as_deref(), Some("Zagnut"));
    }
}
