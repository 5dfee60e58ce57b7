use crate::common::{join_path, StoredMap, StoredValue, Value};
use crate::errors::PralineResult;
use crate::store::AtomicOp;
use std::sync::{Arc, Weak};

/// Upward mutation routing for embedded containers.
///
/// Every node that can own embedded children (pieces, embedded maps,
/// embedded arrays) implements `Propagator`. A child never writes to the
/// store itself: it prefixes its local field paths with its own segment and
/// hands them to its owner, until the chain reaches a root piece, which
/// issues one atomic update against the accumulated dotted path.
pub(crate) trait Propagator: Send + Sync {
    /// Applies an atomic operator to fields addressed relative to this node.
    fn propagate(&self, op: AtomicOp, fields: StoredMap) -> PralineResult<()>;

    /// Atomically pops one element off the array at `path` (relative to this
    /// node), returning the array's pre-modification image.
    fn pop(&self, path: &str, front: bool) -> PralineResult<Option<StoredValue>>;
}

/// The transient parent link of an embedded container: who owns it and under
/// which path segment it lives.
///
/// The back-pointer is weak: ownership runs strictly downward (roots hold
/// children through their caches), children only look up to compute paths.
/// An edge whose owner has been dropped degrades to local-only mutation.
pub(crate) struct OwnerEdge {
    owner: Weak<dyn Propagator>,
    segment: String,
}

impl OwnerEdge {
    pub(crate) fn new(owner: &Arc<dyn Propagator>, segment: impl Into<String>) -> Self {
        OwnerEdge {
            owner: Arc::downgrade(owner),
            segment: segment.into(),
        }
    }

    pub(crate) fn segment(&self) -> &str {
        &self.segment
    }

    /// Prefixes each local field path with this edge's segment and pushes the
    /// operation up to the owner.
    pub(crate) fn propagate(&self, op: AtomicOp, fields: StoredMap) -> PralineResult<()> {
        match self.owner.upgrade() {
            Some(owner) => owner.propagate(op, prefix_fields(&self.segment, fields)),
            None => {
                log::debug!("Owner of segment {} is gone; keeping mutation local", self.segment);
                Ok(())
            }
        }
    }

    /// Pushes an operation targeting this edge's own slot (not a path inside
    /// it) up to the owner.
    pub(crate) fn propagate_self(&self, op: AtomicOp, value: StoredValue) -> PralineResult<()> {
        match self.owner.upgrade() {
            Some(owner) => {
                let mut fields = StoredMap::new();
                fields.insert(self.segment.clone(), value);
                owner.propagate(op, fields)
            }
            None => Ok(()),
        }
    }

    /// Routes an array pop at `path` (relative to this node) to the root.
    pub(crate) fn pop(&self, path: &str, front: bool) -> PralineResult<Option<StoredValue>> {
        match self.owner.upgrade() {
            Some(owner) => owner.pop(&join_path(&self.segment, path), front),
            None => Ok(None),
        }
    }

    /// Routes an array pop of this edge's own slot to the root.
    pub(crate) fn pop_self(&self, front: bool) -> PralineResult<Option<StoredValue>> {
        match self.owner.upgrade() {
            Some(owner) => owner.pop(&self.segment, front),
            None => Ok(None),
        }
    }
}

/// Prefixes every field path in `fields` with `segment`.
pub(crate) fn prefix_fields(segment: &str, fields: StoredMap) -> StoredMap {
    fields
        .into_iter()
        .map(|(path, value)| (join_path(segment, &path), value))
        .collect()
}

/// Establishes ownership for a value being placed into a parent's slot.
///
/// Embedded maps and arrays always adopt; pieces adopt only while they are
/// embeddable, with no collection of their own (a persisted root piece assigned
/// elsewhere is snapshot-encoded, not re-parented). Primitives have no
/// ownership. Adoption is idempotent and overwrites any earlier edge.
pub(crate) fn adopt_value(value: &Value, owner: &Arc<dyn Propagator>, segment: &str) {
    match value {
        Value::Map(map) => map.adopt(owner, segment),
        Value::Array(array) => array.adopt(owner, segment),
        Value::Piece(piece) => piece.adopt_embeddable(owner, segment),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PralineResult;
    use parking_lot::Mutex;

    struct RecordingRoot {
        seen: Mutex<Vec<(AtomicOp, StoredMap)>>,
    }

    impl Propagator for RecordingRoot {
        fn propagate(&self, op: AtomicOp, fields: StoredMap) -> PralineResult<()> {
            self.seen.lock().push((op, fields));
            Ok(())
        }

        fn pop(&self, path: &str, _front: bool) -> PralineResult<Option<StoredValue>> {
            self.seen.lock().push((AtomicOp::Pop, {
                let mut fields = StoredMap::new();
                fields.insert(path.to_string(), StoredValue::Int(-1));
                fields
            }));
            Ok(Some(StoredValue::Array(vec![StoredValue::Int(1)])))
        }
    }

    fn recording_root() -> (Arc<RecordingRoot>, Arc<dyn Propagator>) {
        let root = Arc::new(RecordingRoot {
            seen: Mutex::new(Vec::new()),
        });
        let as_propagator: Arc<dyn Propagator> = root.clone();
        (root, as_propagator)
    }

    #[test]
    fn edge_prefixes_local_fields() {
        let (root, propagator) = recording_root();
        let edge = OwnerEdge::new(&propagator, "filling");

        let mut fields = StoredMap::new();
        fields.insert("flavor".to_string(), StoredValue::String("nougat".to_string()));
        edge.propagate(AtomicOp::Set, fields).unwrap();

        let seen = root.seen.lock();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].1.contains_key("filling.flavor"));
    }

    #[test]
    fn edge_self_targets_its_own_slot() {
        let (root, propagator) = recording_root();
        let edge = OwnerEdge::new(&propagator, "bits");

        edge.propagate_self(AtomicOp::Push, StoredValue::Int(9)).unwrap();

        let seen = root.seen.lock();
        assert_eq!(seen[0].0, AtomicOp::Push);
        assert!(seen[0].1.contains_key("bits"));
    }

    #[test]
    fn pop_accumulates_path_through_edges() {
        let (root, propagator) = recording_root();
        let edge = OwnerEdge::new(&propagator, "filling");

        edge.pop("bits", true).unwrap();

        let seen = root.seen.lock();
        assert!(seen[0].1.contains_key("filling.bits"));
    }

    #[test]
    fn orphaned_edge_stays_local() {
        let (root, propagator) = recording_root();
        let edge = OwnerEdge::new(&propagator, "filling");
        drop(propagator);
        drop(root);

        let mut fields = StoredMap::new();
        fields.insert("flavor".to_string(), StoredValue::Int(1));
        assert!(edge.propagate(AtomicOp::Set, fields).is_ok());
        assert!(edge.pop_self(true).unwrap().is_none());
    }
}
