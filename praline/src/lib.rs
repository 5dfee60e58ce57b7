#![allow(
    dead_code,
    unused_imports,
)]
//! # Praline - Transparent Object-Document Mapping
//!
//! Praline binds in-memory values transparently to documents in a schemaless
//! document store. Nested structures (maps in maps, arrays in maps,
//! documents in documents) mutate in memory and propagate minimal atomic
//! updates to the correct dotted field path in the backing store; reads
//! lazily materialize nested structures back into typed containers that know
//! how to write themselves back.
//!
//! ## Key Pieces
//!
//! - **Pieces**: schema-free records with lazy identity (insert on first
//!   write) and a lazy attribute cache
//! - **Embedded containers**: map and array views whose every mutation is a
//!   single-field atomic update, never a full rewrite
//! - **Codec**: bidirectional wrapping between rich in-memory values and
//!   plain wire values, including opt-in opaque-object capture
//! - **Cursors**: lazy, chainable query results that materialize typed
//!   entities
//! - **Backend seam**: the store is an external collaborator behind a trait;
//!   an in-memory implementation ships in the crate
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use praline::{Config, Praline};
//! use praline::fields;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let db = Praline::open(Config::new().database("candy_test"))?;
//! let zagnuts = db.collects("Zagnut", None)?;
//!
//! // unsaved until the first write
//! let piece = zagnuts.create();
//! piece.set_many(fields! {
//!     licks: 7,
//!     bits: ["peanut", "almonds", "titanium"],
//! })?;
//!
//! // atomic partial updates
//! piece.inc("ounces", 5)?;
//! piece.push("bits", "kryptonite")?;
//!
//! // chainable queries
//! let mut red = zagnuts.query(fields! { color: "red" })?
//!     .sort(("weight", praline::common::SortOrder::Descending))?;
//! for result in &mut red {
//!     let piece = result?;
//!     println!("{}", piece.get("weight")?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Concurrency Model
//!
//! Praline is synchronous and blocking. Concurrency safety comes entirely
//! from delegating every mutation to the store's native atomic
//! single-document operators; the in-memory cache may go stale against
//! concurrent writers until an explicit refresh, and no multi-field
//! transaction guarantee exists.
//!
//! ## Module Organization
//!
//! - [`codec`] - Value wrapping/unwrapping between memory and wire form
//! - [`collection`] - Collection bindings and query cursors
//! - [`common`] - Value models, keys, conversion traits, constants
//! - [`config`] - Explicit connection/mapping configuration
//! - [`errors`] - Error types and result definitions
//! - [`piece`] - Documents and embedded containers
//! - [`store`] - The backend seam and the in-memory backend

use crate::store::id_generator::IdGenerator;
use once_cell::sync::Lazy;

pub mod codec;
pub mod collection;
pub mod common;
pub mod config;
pub mod errors;
pub mod piece;
mod praline;
pub mod store;

pub use config::Config;
pub use praline::Praline;

pub(crate) static ID_GENERATOR: Lazy<IdGenerator> = Lazy::new(IdGenerator::new);
