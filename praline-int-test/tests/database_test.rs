use praline::common::Value;
use praline::errors::ErrorKind;
use praline::fields;
use praline::{Config, Praline};
use praline_int_test::test_util::{recording_db_with, test_db, RecordedOp};

#[test]
fn opening_with_an_empty_database_name_fails() {
    let err = Praline::open(Config::new().database("")).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ConnectionConfig);
}

#[test]
fn opening_with_port_zero_fails() {
    let err = Praline::open(Config::new().port(0)).unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ConnectionConfig);
}

#[test]
fn empty_collection_names_are_rejected() {
    let db = test_db();
    let err = db.collection("").unwrap_err();
    assert_eq!(err.kind(), &ErrorKind::ConnectionConfig);
}

#[test]
fn collections_are_scoped_by_database() {
    let backend = praline::store::MemoryBackend::new();
    let shared = praline::store::Backend::new(backend.clone());

    let left = Praline::open_with(Config::new().database("left"), shared.clone()).unwrap();
    let right = Praline::open_with(Config::new().database("right"), shared).unwrap();

    let piece = left.collection("candy").unwrap().create();
    piece.set("licks", 1).unwrap();

    assert_eq!(left.collection("candy").unwrap().count().unwrap(), 1);
    assert_eq!(right.collection("candy").unwrap().count().unwrap(), 0);
}

#[test]
fn handles_share_backend_state() {
    let db = test_db();
    let a = db.collects("Zagnut", None).unwrap();
    let b = db.collects("Zagnut", None).unwrap();

    let piece = a.create();
    piece.set("licks", 7).unwrap();
    assert_eq!(b.count().unwrap(), 1);
}

#[test]
fn default_profile_hydrates_lazily() {
    let (db, log) = recording_db_with(Config::new().database("candy_test"));
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece
        .set_many(fields! { color: "red", licks: 7 })
        .unwrap();
    log.clear();

    let found = zagnuts.first(fields! { color: "red" }).unwrap().unwrap();
    // the finder projected the identity only
    assert_eq!(log.reads().len(), 1);

    // the attribute read triggers the real fetch
    assert_eq!(found.get("licks").unwrap(), Value::Int(7));
    assert_eq!(log.reads().len(), 2);
}

#[test]
fn hydrate_profile_fetches_the_full_document_up_front() {
    let (db, log) =
        recording_db_with(Config::new().database("candy_test").hydrate_finds(true));
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece
        .set_many(fields! { color: "red", licks: 7 })
        .unwrap();
    log.clear();

    let found = zagnuts.first(fields! { color: "red" }).unwrap().unwrap();
    assert_eq!(log.reads().len(), 1);

    // already hydrated; no further reads
    assert_eq!(found.get("licks").unwrap(), Value::Int(7));
    assert_eq!(log.reads().len(), 1);
}

#[test]
fn lazy_shell_insert_happens_once() {
    let (db, log) = recording_db_with(Config::new().database("candy_test"));
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece.set("licks", 1).unwrap();
    piece.set("center", 2).unwrap();

    let inserts: Vec<_> = log
        .all()
        .into_iter()
        .filter(|op| matches!(op, RecordedOp::Insert { .. }))
        .collect();
    assert_eq!(inserts.len(), 1);
}
