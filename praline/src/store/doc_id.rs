use crate::ID_GENERATOR;
use std::fmt::{Debug, Display, Formatter};

/// An opaque, store-assigned document identifier.
///
/// Every persisted document is keyed by a `DocId`. The in-memory backend
/// assigns ids from a snowflake-style generator, so ids are unique and
/// roughly ordered by creation time; other backends may map their native
/// key type onto the same 64-bit space.
///
/// A `DocId` says nothing about the document's contents. Pieces compare
/// equal exactly when both are persisted and their ids match.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DocId {
    id_value: u64,
}

impl DocId {
    /// Generates a fresh unique id.
    pub(crate) fn generate() -> Self {
        DocId {
            id_value: ID_GENERATOR.next_id(),
        }
    }

    /// Wraps a raw 64-bit id value, for backends with their own key scheme.
    pub fn from_value(id_value: u64) -> Self {
        DocId { id_value }
    }

    /// The raw 64-bit id value.
    pub fn value(&self) -> u64 {
        self.id_value
    }
}

impl Display for DocId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.id_value)
    }
}

impl Debug for DocId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "DocId({})", self.id_value)
    }
}
