use parking_lot::Mutex;
use praline::collection::QueryOptions;
use praline::common::StoredMap;
use praline::errors::PralineResult;
use praline::store::{
    Backend, BackendProvider, DocId, IndexSpec, MemoryBackend, Modifier, RawCursor, UpdateOptions,
};
use praline::{Config, Praline};
use std::sync::Arc;

#[ctor::ctor]
fn init_logging() {
    colog::init();
}

/// Opens a database against a fresh in-memory backend.
pub fn test_db() -> Praline {
    Praline::open(Config::new().database("candy_test")).expect("Failed to open test database")
}

/// Opens a database and keeps a handle on the raw backend, for tests that
/// inspect stored wire documents directly.
pub fn test_db_with_backend() -> (Praline, MemoryBackend) {
    let backend = MemoryBackend::new();
    let db = Praline::open_with(
        Config::new().database("candy_test"),
        Backend::new(backend.clone()),
    )
    .expect("Failed to open test database");
    (db, backend)
}

/// One recorded backend call.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum RecordedOp {
    Insert {
        collection: String,
    },
    Update {
        collection: String,
        operator: String,
        paths: Vec<String>,
    },
    FindOne {
        collection: String,
    },
    Find {
        collection: String,
    },
    FindAndModify {
        collection: String,
        operator: String,
        paths: Vec<String>,
    },
    CreateIndex {
        collection: String,
        field: String,
    },
    Count {
        collection: String,
    },
}

/// Shared log of every call a [RecordingBackend] has seen.
#[derive(Clone, Default)]
pub struct OpLog {
    ops: Arc<Mutex<Vec<RecordedOp>>>,
}

impl OpLog {
    pub fn new() -> Self {
        OpLog::default()
    }

    pub fn all(&self) -> Vec<RecordedOp> {
        self.ops.lock().clone()
    }

    /// Only the write operations: updates and find-and-modifies.
    pub fn writes(&self) -> Vec<RecordedOp> {
        self.all()
            .into_iter()
            .filter(|op| {
                matches!(
                    op,
                    RecordedOp::Update { .. } | RecordedOp::FindAndModify { .. }
                )
            })
            .collect()
    }

    pub fn reads(&self) -> Vec<RecordedOp> {
        self.all()
            .into_iter()
            .filter(|op| matches!(op, RecordedOp::FindOne { .. } | RecordedOp::Find { .. }))
            .collect()
    }

    pub fn clear(&self) {
        self.ops.lock().clear();
    }

    fn record(&self, op: RecordedOp) {
        self.ops.lock().push(op);
    }
}

/// A backend wrapper that records every call before delegating to an
/// in-memory backend. Lets tests assert, e.g., that a nested mutation
/// issued exactly one `$set` against one dotted path.
pub struct RecordingBackend {
    inner: MemoryBackend,
    log: OpLog,
}

impl RecordingBackend {
    pub fn new(log: OpLog) -> Self {
        RecordingBackend {
            inner: MemoryBackend::new(),
            log,
        }
    }
}

fn modifier_paths(modifier: &Modifier) -> Vec<String> {
    modifier.fields().keys().cloned().collect()
}

impl BackendProvider for RecordingBackend {
    fn insert(&self, collection: &str, document: StoredMap) -> PralineResult<DocId> {
        self.log.record(RecordedOp::Insert {
            collection: collection.to_string(),
        });
        self.inner.insert(collection, document)
    }

    fn update(
        &self,
        collection: &str,
        filter: &StoredMap,
        modifier: &Modifier,
        options: &UpdateOptions,
    ) -> PralineResult<()> {
        self.log.record(RecordedOp::Update {
            collection: collection.to_string(),
            operator: modifier.op().wire().to_string(),
            paths: modifier_paths(modifier),
        });
        self.inner.update(collection, filter, modifier, options)
    }

    fn find_one(
        &self,
        collection: &str,
        filter: &StoredMap,
        options: &QueryOptions,
    ) -> PralineResult<Option<StoredMap>> {
        self.log.record(RecordedOp::FindOne {
            collection: collection.to_string(),
        });
        self.inner.find_one(collection, filter, options)
    }

    fn find(
        &self,
        collection: &str,
        filter: &StoredMap,
        options: &QueryOptions,
    ) -> PralineResult<RawCursor> {
        self.log.record(RecordedOp::Find {
            collection: collection.to_string(),
        });
        self.inner.find(collection, filter, options)
    }

    fn find_and_modify(
        &self,
        collection: &str,
        filter: &StoredMap,
        modifier: &Modifier,
    ) -> PralineResult<Option<StoredMap>> {
        self.log.record(RecordedOp::FindAndModify {
            collection: collection.to_string(),
            operator: modifier.op().wire().to_string(),
            paths: modifier_paths(modifier),
        });
        self.inner.find_and_modify(collection, filter, modifier)
    }

    fn create_index(&self, collection: &str, spec: &IndexSpec) -> PralineResult<()> {
        self.log.record(RecordedOp::CreateIndex {
            collection: collection.to_string(),
            field: spec.field.clone(),
        });
        self.inner.create_index(collection, spec)
    }

    fn count(&self, collection: &str, filter: &StoredMap) -> PralineResult<u64> {
        self.log.record(RecordedOp::Count {
            collection: collection.to_string(),
        });
        self.inner.count(collection, filter)
    }
}

/// Opens a database whose backend records every call into the returned log.
pub fn recording_db() -> (Praline, OpLog) {
    recording_db_with(Config::new().database("candy_test"))
}

/// Like [recording_db], with a caller-supplied configuration.
pub fn recording_db_with(config: Config) -> (Praline, OpLog) {
    let log = OpLog::new();
    let backend = RecordingBackend::new(log.clone());
    let db = Praline::open_with(config, Backend::new(backend))
        .expect("Failed to open recording test database");
    (db, log)
}
