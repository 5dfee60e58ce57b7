use crate::collection::Collection;
use crate::config::Config;
use crate::errors::PralineResult;
use crate::store::{Backend, MemoryBackend};
use dashmap::DashMap;
use std::fmt::{Debug, Formatter};
use std::sync::Arc;

/// The database handle.
///
/// `Praline` owns the configured backend and hands out [Collection] bindings.
/// Handles are cheap clones over shared state; collection bindings are
/// lazily constructed and cached, so repeated lookups of the same name share
/// one handle.
///
/// # Examples
///
/// ```rust,ignore
/// use praline::{Config, Praline};
///
/// let db = Praline::open(Config::new().database("candy_test"))?;
/// let zagnuts = db.collects("Zagnut", None)?;
///
/// let piece = zagnuts.create();
/// piece.set("licks", 7)?;
/// ```
#[derive(Clone)]
pub struct Praline {
    inner: Arc<PralineInner>,
}

struct PralineInner {
    config: Config,
    backend: Backend,
    collections: DashMap<String, Collection>,
}

impl Praline {
    /// Opens a handle against the bundled in-memory backend.
    pub fn open(config: Config) -> PralineResult<Praline> {
        Praline::open_with(config, MemoryBackend::new().into_backend())
    }

    /// Opens a handle against a caller-supplied backend.
    pub fn open_with(config: Config, backend: Backend) -> PralineResult<Praline> {
        config.validate()?;
        Ok(Praline {
            inner: Arc::new(PralineInner {
                config,
                backend,
                collections: DashMap::new(),
            }),
        })
    }

    /// The catch-all binding: documents materialize as generic mapping
    /// entities with no kind.
    pub fn collection(&self, name: &str) -> PralineResult<Collection> {
        self.bind(name, None)
    }

    /// Explicitly binds a collection name and the entity kind used to
    /// materialize its documents. With no kind given, the kind defaults to
    /// the collection name itself.
    pub fn collects(&self, name: &str, kind: Option<&str>) -> PralineResult<Collection> {
        let kind = kind.unwrap_or(name);
        self.bind(name, Some(kind.to_string()))
    }

    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    pub fn backend(&self) -> &Backend {
        &self.inner.backend
    }

    fn bind(&self, name: &str, kind: Option<String>) -> PralineResult<Collection> {
        let cache_key = match &kind {
            Some(kind) => format!("{}#{}", name, kind),
            None => name.to_string(),
        };
        if let Some(existing) = self.inner.collections.get(&cache_key) {
            return Ok(existing.clone());
        }

        let collection = Collection::bind(
            self.inner.backend.clone(),
            self.inner.config.database_name(),
            name,
            kind,
            self.inner.config.hydrates_finds(),
        )?;
        self.inner
            .collections
            .insert(cache_key, collection.clone());
        Ok(collection)
    }
}

impl Debug for Praline {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "Praline({})", self.inner.config.database_name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;

    #[test]
    fn open_validates_config() {
        let err = Praline::open(Config::new().database("")).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConnectionConfig);
    }

    #[test]
    fn collection_handles_are_cached() {
        let db = Praline::open(Config::new()).unwrap();
        let a = db.collection("Zagnut").unwrap();
        let b = db.collection("Zagnut").unwrap();
        // both handles address the same binding
        assert_eq!(a.name(), b.name());
        assert_eq!(db.inner.collections.len(), 1);
    }

    #[test]
    fn collects_defaults_kind_to_the_name() {
        let db = Praline::open(Config::new()).unwrap();
        let bound = db.collects("Zagnut", None).unwrap();
        assert_eq!(bound.kind().as_deref(), Some("Zagnut"));

        let custom = db.collects("Zagnuts", Some("Zagnut")).unwrap();
        assert_eq!(custom.name(), "Zagnuts");
        assert_eq!(custom.kind().as_deref(), Some("Zagnut"));
    }

    #[test]
    fn plain_collection_binding_has_no_kind() {
        let db = Praline::open(Config::new()).unwrap();
        let generic = db.collection("candy").unwrap();
        assert!(generic.kind().is_none());
    }

    #[test]
    fn empty_collection_name_is_rejected() {
        let db = Praline::open(Config::new()).unwrap();
        let err = db.collection("").unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::ConnectionConfig);
    }
}
