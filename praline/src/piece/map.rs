use crate::codec;
use crate::common::{FieldMap, Key, StoredMap, StoredValue, Value};
use crate::errors::PralineResult;
use crate::piece::embed::{adopt_value, OwnerEdge, Propagator};
use crate::store::AtomicOp;
use parking_lot::RwLock;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// An embedded mapping.
///
/// Behaves like an ordinary ordered map in memory, but once it is owned,
/// decoded out of a stored document or assigned into a parent slot, every
/// mutation funnels through the ownership edge into a single-field atomic
/// update against the owning root's document. Reads always come from local
/// state.
///
/// Freestanding maps (built directly, or via the
/// [`fields!`](crate::fields!) macro) mutate locally until adopted.
#[derive(Clone)]
pub struct EmbeddedMap {
    inner: Arc<MapInner>,
}

pub(crate) struct MapInner {
    state: RwLock<FieldMap>,
    edge: RwLock<Option<OwnerEdge>>,
}

impl EmbeddedMap {
    /// Creates an empty, unowned map.
    pub fn new() -> Self {
        EmbeddedMap {
            inner: Arc::new(MapInner {
                state: RwLock::new(FieldMap::new()),
                edge: RwLock::new(None),
            }),
        }
    }

    /// Creates an unowned map holding the given fields. Nested containers
    /// inside `fields` are adopted by this map.
    pub fn from_fields(fields: FieldMap) -> Self {
        let map = EmbeddedMap::new();
        let owner = map.owner_handle();
        for (key, value) in fields {
            adopt_value(&value, &owner, &codec::encode_key(&key));
            map.inner.state.write().insert(key, value);
        }
        map
    }

    /// Returns the value under a name key, or [`Value::Null`] when absent.
    pub fn get(&self, name: &str) -> Value {
        self.get_key(&Key::name(name))
    }

    /// Returns the value under a text key, or [`Value::Null`] when absent.
    pub fn get_text(&self, text: &str) -> Value {
        self.get_key(&Key::text(text))
    }

    pub fn get_key(&self, key: &Key) -> Value {
        self.inner
            .state
            .read()
            .get(key)
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Sets a key to a value.
    ///
    /// The value is encoded first (a failed encode leaves both memory and
    /// store untouched), adopted if it is a container, written to local
    /// state, and, when this map is owned, propagated to the root as one
    /// atomic `$set` on the dotted path of this slot.
    pub fn set(&self, key: impl Into<Key>, value: impl Into<Value>) -> PralineResult<()> {
        let key = key.into();
        let value = value.into();
        let stored = codec::encode(&value)?;
        let wire_key = codec::encode_key(&key);

        adopt_value(&value, &self.owner_handle(), &wire_key);
        self.inner.state.write().insert(key, value);

        if let Some(edge) = self.inner.edge.read().as_ref() {
            let mut fields = StoredMap::new();
            fields.insert(wire_key, stored);
            edge.propagate(AtomicOp::Set, fields)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.read().is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.state.read().contains_key(&Key::name(name))
    }

    /// A point-in-time copy of the map's contents.
    pub fn snapshot(&self) -> FieldMap {
        self.inner.state.read().clone()
    }

    pub fn keys(&self) -> Vec<Key> {
        self.inner.state.read().keys().cloned().collect()
    }

    /// Attaches this map to its owner slot. Idempotent; overwrites any
    /// earlier edge.
    pub(crate) fn adopt(&self, owner: &Arc<dyn Propagator>, segment: &str) {
        *self.inner.edge.write() = Some(OwnerEdge::new(owner, segment));
    }

    /// This map as an owner for its own children.
    pub(crate) fn owner_handle(&self) -> Arc<dyn Propagator> {
        self.inner.clone()
    }

    /// Inserts without encoding or propagation; used while decoding.
    pub(crate) fn insert_local(&self, key: Key, value: Value) {
        self.inner.state.write().insert(key, value);
    }
}

impl Default for EmbeddedMap {
    fn default() -> Self {
        EmbeddedMap::new()
    }
}

impl Propagator for MapInner {
    fn propagate(&self, op: AtomicOp, fields: StoredMap) -> PralineResult<()> {
        match self.edge.read().as_ref() {
            Some(edge) => edge.propagate(op, fields),
            None => Ok(()),
        }
    }

    fn pop(&self, path: &str, front: bool) -> PralineResult<Option<StoredValue>> {
        match self.edge.read().as_ref() {
            Some(edge) => edge.pop(path, front),
            None => Ok(None),
        }
    }
}

impl PartialEq for EmbeddedMap {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        self.snapshot() == other.snapshot()
    }
}

impl Display for EmbeddedMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let snapshot = self.snapshot();
        write!(f, "{{")?;
        for (i, (key, value)) in snapshot.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", key, value)?;
        }
        write!(f, "}}")
    }
}

impl Debug for EmbeddedMap {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
