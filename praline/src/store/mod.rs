//! The seam to the storage collaborator.
//!
//! The mapping layer never talks to a database directly; it consumes the
//! [BackendProvider] trait (insert, filtered atomic update, find/find_one,
//! find-and-modify, index creation, count) through the cloneable [Backend]
//! handle. [MemoryBackend] is the bundled in-process implementation; real
//! drivers supply their own.

mod backend;
mod doc_id;
pub(crate) mod id_generator;
pub mod memory;

pub use backend::*;
pub use doc_id::DocId;
pub use memory::MemoryBackend;
