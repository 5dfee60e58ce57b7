use praline::common::{Key, Value};
use praline::fields;
use praline::piece::{EmbeddedMap, Piece};
use praline_int_test::test_util::{recording_db, test_db, RecordedOp};

fn single_set_path(writes: &[RecordedOp]) -> String {
    assert_eq!(writes.len(), 1, "expected exactly one write, got {:?}", writes);
    match &writes[0] {
        RecordedOp::Update { operator, paths, .. } => {
            assert_eq!(operator, "$set");
            assert_eq!(paths.len(), 1);
            paths[0].clone()
        }
        other => panic!("Expected an update, got {:?}", other),
    }
}

#[test]
fn mutating_an_embedded_map_targets_one_dotted_path() {
    let (db, log) = recording_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece
        .set("filling", fields! { flavor: "butterscotch" })
        .unwrap();

    let filling = piece.get("filling").unwrap();
    let filling = filling.as_map().unwrap();
    log.clear();

    filling.set("brand", "Zagnut Industries").unwrap();

    assert_eq!(single_set_path(&log.writes()), "filling.brand");

    // the nested write is visible from a fresh copy
    let fresh = zagnuts.find(piece.id().unwrap()).unwrap().unwrap();
    let reloaded = fresh.get("filling").unwrap();
    assert_eq!(
        reloaded.as_map().unwrap().get("brand"),
        Value::String("Zagnut Industries".to_string())
    );
}

#[test]
fn doubly_nested_mutations_accumulate_the_full_path() {
    let (db, log) = recording_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece
        .set(
            "a",
            fields! {
                b: { c: 1 },
            },
        )
        .unwrap();

    let outer = piece.get("a").unwrap();
    let inner = outer.as_map().unwrap().get("b");
    let inner = inner.as_map().unwrap();
    log.clear();

    inner.set("c", 2).unwrap();

    assert_eq!(single_set_path(&log.writes()), "a.b.c");

    let fresh = zagnuts.find(piece.id().unwrap()).unwrap().unwrap();
    let a = fresh.get("a").unwrap();
    let b = a.as_map().unwrap().get("b");
    assert_eq!(b.as_map().unwrap().get("c"), Value::Int(2));
}

#[test]
fn containers_decoded_from_a_read_know_their_way_back() {
    let (db, log) = recording_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece
        .set("filling", fields! { flavor: "nougat" })
        .unwrap();

    // a completely fresh handle, hydrated from the store
    let fresh = zagnuts.piece(piece.id().unwrap());
    let filling = fresh.get("filling").unwrap();
    log.clear();

    filling.as_map().unwrap().set("flavor", "caramel").unwrap();

    assert_eq!(single_set_path(&log.writes()), "filling.flavor");
}

#[test]
fn adoption_is_idempotent() {
    let (db, log) = recording_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece.set("filling", fields! { flavor: "nougat" }).unwrap();

    // reading the same attribute twice re-adopts the same slot
    let once = piece.get("filling").unwrap();
    let twice = piece.get("filling").unwrap();
    log.clear();

    twice.as_map().unwrap().set("flavor", "caramel").unwrap();
    assert_eq!(single_set_path(&log.writes()), "filling.flavor");

    log.clear();
    once.as_map().unwrap().set("flavor", "mint").unwrap();
    assert_eq!(single_set_path(&log.writes()), "filling.flavor");
}

#[test]
fn refresh_reestablishes_cascading_writes() {
    let (db, log) = recording_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece.set("filling", fields! { flavor: "nougat" }).unwrap();

    piece.refresh();
    let filling = piece.get("filling").unwrap();
    log.clear();

    filling.as_map().unwrap().set("flavor", "caramel").unwrap();
    assert_eq!(single_set_path(&log.writes()), "filling.flavor");
}

#[test]
fn the_bits_scenario() {
    let (db, log) = recording_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece
        .set_many(fields! {
            bits: ["peanut", "almonds", "titanium"],
        })
        .unwrap();

    // a freshly loaded copy sees the middle element
    let fresh = zagnuts.find(piece.id().unwrap()).unwrap().unwrap();
    let bits = fresh.get("bits").unwrap();
    assert_eq!(
        bits.as_array().unwrap().get(1),
        Value::String("almonds".to_string())
    );

    // appending goes through $push on the array's own slot
    log.clear();
    let original_bits = piece.get("bits").unwrap();
    original_bits.as_array().unwrap().push("kryptonite").unwrap();

    let writes = log.writes();
    assert_eq!(writes.len(), 1);
    match &writes[0] {
        RecordedOp::Update { operator, paths, .. } => {
            assert_eq!(operator, "$push");
            assert_eq!(paths, &vec!["bits".to_string()]);
        }
        other => panic!("Expected an update, got {:?}", other),
    }

    // reloading shows the appended element without indices 0-2 rewritten
    let reloaded = zagnuts.find(piece.id().unwrap()).unwrap().unwrap();
    let bits = reloaded.get("bits").unwrap();
    let bits = bits.as_array().unwrap();
    assert_eq!(bits.len(), 4);
    assert_eq!(bits.get(0), Value::String("peanut".to_string()));
    assert_eq!(bits.last(), Value::String("kryptonite".to_string()));
}

#[test]
fn setting_one_array_index_targets_that_index() {
    let (db, log) = recording_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece
        .set_many(fields! {
            bits: ["peanut", "almonds"],
        })
        .unwrap();

    let bits = piece.get("bits").unwrap();
    log.clear();
    bits.as_array().unwrap().set(1, "cashews").unwrap();

    assert_eq!(single_set_path(&log.writes()), "bits.1");

    let fresh = zagnuts.find(piece.id().unwrap()).unwrap().unwrap();
    let reloaded = fresh.get("bits").unwrap();
    let reloaded = reloaded.as_array().unwrap();
    assert_eq!(reloaded.get(0), Value::String("peanut".to_string()));
    assert_eq!(reloaded.get(1), Value::String("cashews".to_string()));
}

#[test]
fn maps_nested_in_arrays_cascade_through_their_index() {
    let (db, log) = recording_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece
        .set_many(fields! {
            bits: [{ kind: "peanut" }],
        })
        .unwrap();

    let fresh = zagnuts.piece(piece.id().unwrap());
    let bits = fresh.get("bits").unwrap();
    let head = bits.as_array().unwrap().get(0);
    log.clear();

    head.as_map().unwrap().set("kind", "almond").unwrap();

    assert_eq!(single_set_path(&log.writes()), "bits.0.kind");
}

#[test]
fn shift_pops_the_front_atomically() {
    let (db, log) = recording_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece
        .set_many(fields! {
            bits: ["peanut", "almonds"],
        })
        .unwrap();
    log.clear();

    let popped = piece.shift("bits").unwrap();
    assert_eq!(popped, Some(Value::String("peanut".to_string())));

    let writes = log.writes();
    assert_eq!(writes.len(), 1);
    match &writes[0] {
        RecordedOp::FindAndModify { operator, paths, .. } => {
            assert_eq!(operator, "$pop");
            assert_eq!(paths, &vec!["bits".to_string()]);
        }
        other => panic!("Expected a find-and-modify, got {:?}", other),
    }

    let fresh = zagnuts.find(piece.id().unwrap()).unwrap().unwrap();
    let bits = fresh.get("bits").unwrap();
    let bits = bits.as_array().unwrap();
    assert_eq!(bits.len(), 1);
    assert_eq!(bits.get(0), Value::String("almonds".to_string()));
}

#[test]
fn container_shift_resyncs_from_the_pre_image() {
    let db = test_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece
        .set_many(fields! {
            bits: ["peanut", "almonds", "titanium"],
        })
        .unwrap();

    let bits = piece.get("bits").unwrap();
    let bits = bits.as_array().unwrap();
    assert_eq!(bits.shift().unwrap(), Some(Value::String("peanut".to_string())));
    assert_eq!(bits.len(), 2);
    assert_eq!(bits.get(0), Value::String("almonds".to_string()));

    let fresh = zagnuts.find(piece.id().unwrap()).unwrap().unwrap();
    let reloaded = fresh.get("bits").unwrap();
    assert_eq!(reloaded.as_array().unwrap().len(), 2);
}

#[test]
fn embedded_pieces_keep_their_kind_and_cascade() {
    let (db, log) = recording_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let child = Piece::embed("Filling");
    child.set("flavor", "butterscotch").unwrap();

    let piece = zagnuts.create();
    piece.set("filling", child).unwrap();

    let fresh = zagnuts.piece(piece.id().unwrap());
    let decoded = fresh.get("filling").unwrap();
    let embedded = decoded.as_piece().unwrap();
    assert_eq!(embedded.kind().as_deref(), Some("Filling"));
    assert_eq!(
        embedded.get("flavor").unwrap(),
        Value::String("butterscotch".to_string())
    );

    log.clear();
    embedded.set("flavor", "caramel").unwrap();
    assert_eq!(single_set_path(&log.writes()), "filling.flavor");
}

#[test]
fn text_keys_keep_their_quoting_through_the_cascade() {
    let (db, log) = recording_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece.set("filling", fields! { flavor: "nougat" }).unwrap();

    let filling = piece.get("filling").unwrap();
    log.clear();
    filling
        .as_map()
        .unwrap()
        .set(Key::text("crunch factor"), 3)
        .unwrap();

    assert_eq!(single_set_path(&log.writes()), "filling.'crunch factor'");

    let fresh = zagnuts.find(piece.id().unwrap()).unwrap().unwrap();
    let reloaded = fresh.get("filling").unwrap();
    assert_eq!(
        reloaded.as_map().unwrap().get_text("crunch factor"),
        Value::Int(3)
    );
}

#[test]
fn freestanding_maps_only_write_after_adoption() {
    let (db, log) = recording_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let map = EmbeddedMap::new();
    map.set("flavor", "nougat").unwrap();
    assert!(log.writes().is_empty());

    let piece = zagnuts.create();
    piece.set("filling", map.clone()).unwrap();
    log.clear();

    // adopted on assignment: mutations now cascade
    map.set("flavor", "caramel").unwrap();
    assert_eq!(single_set_path(&log.writes()), "filling.flavor");
}
