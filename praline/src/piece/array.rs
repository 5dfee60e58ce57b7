use crate::codec;
use crate::common::{StoredMap, StoredValue, Value};
use crate::errors::PralineResult;
use crate::piece::embed::{adopt_value, OwnerEdge, Propagator};
use crate::store::AtomicOp;
use parking_lot::RwLock;
use std::fmt::{Debug, Display, Formatter};
use std::sync::Arc;

/// An embedded sequence.
///
/// The store's atomic array operators are used for every mutation, so
/// individual elements update without rewriting the whole array: `set`
/// targets one index, `push` appends, and `shift` pops the front atomically
/// and resyncs local state from the store's pre-image, so queue-like consumers
/// on different processes never hand out the same element twice.
#[derive(Clone)]
pub struct EmbeddedArray {
    inner: Arc<ArrayInner>,
}

pub(crate) struct ArrayInner {
    state: RwLock<Vec<Value>>,
    edge: RwLock<Option<OwnerEdge>>,
}

impl EmbeddedArray {
    /// Creates an empty, unowned array.
    pub fn new() -> Self {
        EmbeddedArray {
            inner: Arc::new(ArrayInner {
                state: RwLock::new(Vec::new()),
                edge: RwLock::new(None),
            }),
        }
    }

    /// Creates an unowned array holding the given values. Nested containers
    /// are adopted by this array.
    pub fn from_values(values: Vec<Value>) -> Self {
        let array = EmbeddedArray::new();
        let owner = array.owner_handle();
        for (index, value) in values.into_iter().enumerate() {
            adopt_value(&value, &owner, &index.to_string());
            array.inner.state.write().push(value);
        }
        array
    }

    /// Returns the element at `index`, or [`Value::Null`] out of bounds.
    pub fn get(&self, index: usize) -> Value {
        self.inner
            .state
            .read()
            .get(index)
            .cloned()
            .unwrap_or(Value::Null)
    }

    pub fn first(&self) -> Value {
        self.get(0)
    }

    pub fn last(&self) -> Value {
        self.inner
            .state
            .read()
            .last()
            .cloned()
            .unwrap_or(Value::Null)
    }

    /// Sets the element at `index`.
    ///
    /// Targets exactly one index in the store (`$set` on `<path>.<index>`).
    /// Note this does not verify the stored array still matches local state;
    /// a concurrent writer may have shifted elements under us.
    pub fn set(&self, index: usize, value: impl Into<Value>) -> PralineResult<()> {
        let value = value.into();
        let stored = codec::encode(&value)?;
        let segment = index.to_string();

        adopt_value(&value, &self.owner_handle(), &segment);
        {
            let mut state = self.inner.state.write();
            while state.len() < index {
                state.push(Value::Null);
            }
            if index < state.len() {
                state[index] = value;
            } else {
                state.push(value);
            }
        }

        if let Some(edge) = self.inner.edge.read().as_ref() {
            let mut fields = StoredMap::new();
            fields.insert(segment, stored);
            edge.propagate(AtomicOp::Set, fields)?;
        }
        Ok(())
    }

    /// Appends a value, using the store's atomic append on the array's own
    /// slot.
    pub fn push(&self, value: impl Into<Value>) -> PralineResult<()> {
        let value = value.into();
        let stored = codec::encode(&value)?;

        let index = self.inner.state.read().len();
        adopt_value(&value, &self.owner_handle(), &index.to_string());
        self.inner.state.write().push(value);

        if let Some(edge) = self.inner.edge.read().as_ref() {
            edge.propagate_self(AtomicOp::Push, stored)?;
        }
        Ok(())
    }

    /// Pops the front of the stored array atomically and returns it, then
    /// resyncs local state from the store's pre-image.
    pub fn shift(&self) -> PralineResult<Option<Value>> {
        let pre_image = match self.inner.edge.read().as_ref() {
            Some(edge) => edge.pop_self(true)?,
            None => None,
        };

        match pre_image {
            Some(StoredValue::Array(values)) => {
                let Some((first, rest)) = values.split_first() else {
                    self.inner.state.write().clear();
                    return Ok(None);
                };
                let popped = codec::decode(first)?;
                let owner = self.owner_handle();
                let mut remaining = Vec::with_capacity(rest.len());
                for (index, stored) in rest.iter().enumerate() {
                    let segment = index.to_string();
                    remaining.push(codec::decode_with(
                        stored,
                        Some(crate::codec::Owner {
                            parent: &owner,
                            segment: &segment,
                        }),
                    )?);
                }
                *self.inner.state.write() = remaining;
                Ok(Some(popped))
            }
            // unowned (or owner gone): plain local pop
            _ => {
                let mut state = self.inner.state.write();
                if state.is_empty() {
                    Ok(None)
                } else {
                    Ok(Some(state.remove(0)))
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.inner.state.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.state.read().is_empty()
    }

    /// A point-in-time copy of the array's contents.
    pub fn values(&self) -> Vec<Value> {
        self.inner.state.read().clone()
    }

    /// Attaches this array to its owner slot. Idempotent; overwrites any
    /// earlier edge.
    pub(crate) fn adopt(&self, owner: &Arc<dyn Propagator>, segment: &str) {
        *self.inner.edge.write() = Some(OwnerEdge::new(owner, segment));
    }

    /// This array as an owner for its own elements.
    pub(crate) fn owner_handle(&self) -> Arc<dyn Propagator> {
        self.inner.clone()
    }

    /// Appends without encoding or propagation; used while decoding.
    pub(crate) fn push_local(&self, value: Value) {
        self.inner.state.write().push(value);
    }
}

impl Default for EmbeddedArray {
    fn default() -> Self {
        EmbeddedArray::new()
    }
}

impl Propagator for ArrayInner {
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

impl PartialEq for EmbeddedArray {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            return true;
        }
        self.values() == other.values()
    }
}

impl Display for EmbeddedArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "[")?;
        for (i, value) in self.values().iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", value)?;
        }
        write!(f, "]")
    }
}

impl Debug for EmbeddedArray {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}
