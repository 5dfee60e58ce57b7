//! Collection binding and query cursors.
//!
//! A [Collection] is the explicit binding of a logical name to a store
//! collection (and optionally an entity kind); a [Cursor] is a lazy,
//! chainable query over it. Single-document lookups (`first`, `find`,
//! `find_by`) report "nothing found" as `Ok(None)`, never as an error.

#[allow(clippy::module_inception)]
mod collection;
mod cursor;
mod query_options;

pub use collection::Collection;
pub use cursor::Cursor;
pub use query_options::*;
