use praline::collection::QueryOptions;
use praline::common::{Key, StoredValue, Value, DOC_ID};
use praline::fields;
use praline::store::BackendProvider;
use praline_int_test::test_util::{test_db, test_db_with_backend};

fn raw_doc(
    backend: &praline::store::MemoryBackend,
    collection: &str,
    id: praline::store::DocId,
) -> praline::common::StoredMap {
    let mut filter = praline::common::StoredMap::new();
    filter.insert(DOC_ID.to_string(), StoredValue::Id(id));
    backend
        .find_one(collection, &filter, &QueryOptions::new())
        .unwrap()
        .expect("document should exist")
}

#[test]
fn primitives_round_trip_through_the_store() {
    let db = test_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let now = chrono::Utc::now();
    let piece = zagnuts.create();
    piece
        .set_many(fields! {
            name: "Hi",
            licks: 1,
            center: 17.536,
            smushy: true,
            nothing: (Value::Null),
            when: (Value::Time(now)),
            pattern: (Value::regex("ha(l+)elujah?")),
            blob: (Value::bytes(vec![1, 2, 3])),
        })
        .unwrap();

    let fresh = zagnuts.find(piece.id().unwrap()).unwrap().unwrap();
    assert_eq!(fresh.get("name").unwrap(), Value::String("Hi".to_string()));
    assert_eq!(fresh.get("licks").unwrap(), Value::Int(1));
    assert_eq!(fresh.get("center").unwrap(), Value::Float(17.536));
    assert_eq!(fresh.get("smushy").unwrap(), Value::Bool(true));
    assert_eq!(fresh.get("nothing").unwrap(), Value::Null);
    assert_eq!(fresh.get("when").unwrap(), Value::Time(now));
    assert_eq!(fresh.get("pattern").unwrap(), Value::regex("ha(l+)elujah?"));
    assert_eq!(fresh.get("blob").unwrap(), Value::bytes(vec![1, 2, 3]));
}

#[test]
fn name_keys_store_bare_and_text_keys_store_quoted() {
    let (db, backend) = test_db_with_backend();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece
        .set(
            "filling",
            fields! {
                yoo: "yar",
                "foo": "bar",
            },
        )
        .unwrap();

    let raw = raw_doc(&backend, "candy_test.Zagnut", piece.id().unwrap());
    let filling = raw.get("filling").unwrap().as_map().unwrap();
    assert!(filling.contains_key("yoo"));
    assert!(filling.contains_key("'foo'"));
    assert!(!filling.contains_key("foo"));
}

#[test]
fn key_origin_is_recovered_on_read() {
    let db = test_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece
        .set(
            "filling",
            fields! {
                yoo: "yar",
                "foo": "bar",
            },
        )
        .unwrap();

    let fresh = zagnuts.find(piece.id().unwrap()).unwrap().unwrap();
    let filling = fresh.get("filling").unwrap();
    let filling = filling.as_map().unwrap();
    assert_eq!(filling.get("yoo"), Value::String("yar".to_string()));
    assert_eq!(filling.get_text("foo"), Value::String("bar".to_string()));
    // the bare name "foo" was never stored
    assert_eq!(filling.get("foo"), Value::Null);

    let keys = filling.keys();
    assert!(keys.contains(&Key::name("yoo")));
    assert!(keys.contains(&Key::text("foo")));
}

#[test]
fn opaque_objects_store_under_the_envelope() {
    let (db, backend) = test_db_with_backend();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let mut fields = indexmap::IndexMap::new();
    fields.insert("payload".to_string(), Value::String("6 kilotons".to_string()));
    let object = praline::common::OpaqueObject::new("Missile", fields);

    let piece = zagnuts.create();
    piece.set("object", object).unwrap();

    let raw = raw_doc(&backend, "candy_test.Zagnut", piece.id().unwrap());
    let wrapped = raw.get("object").unwrap().as_map().unwrap();
    let envelope = wrapped.get("__object_").unwrap().as_map().unwrap();
    assert_eq!(
        envelope.get("class").unwrap(),
        &StoredValue::String("Missile".to_string())
    );
    let stored_fields = envelope.get("fields").unwrap().as_map().unwrap();
    assert_eq!(
        stored_fields.get("payload").unwrap(),
        &StoredValue::String("6 kilotons".to_string())
    );
}

#[test]
fn embedded_documents_store_their_kind_marker() {
    let (db, backend) = test_db_with_backend();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let child = praline::piece::Piece::embed("Filling");
    child.set("flavor", "nougat").unwrap();

    let piece = zagnuts.create();
    piece.set("filling", child).unwrap();

    let raw = raw_doc(&backend, "candy_test.Zagnut", piece.id().unwrap());
    let filling = raw.get("filling").unwrap().as_map().unwrap();
    assert_eq!(
        filling.get("_class_").unwrap(),
        &StoredValue::String("Filling".to_string())
    );

    // plain embedded maps carry no marker
    let plain = zagnuts.create();
    plain.set("filling", fields! { flavor: "mint" }).unwrap();
    let raw = raw_doc(&backend, "candy_test.Zagnut", plain.id().unwrap());
    let filling = raw.get("filling").unwrap().as_map().unwrap();
    assert!(!filling.contains_key("_class_"));
}

#[test]
fn root_documents_carry_only_their_id() {
    let (db, backend) = test_db_with_backend();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece.set("licks", 7).unwrap();

    let raw = raw_doc(&backend, "candy_test.Zagnut", piece.id().unwrap());
    assert!(raw.contains_key(DOC_ID));
    assert!(!raw.contains_key("_class_"));
}

#[test]
fn arrays_of_mixed_values_round_trip() {
    let db = test_db();
    let zagnuts = db.collects("Zagnut", None).unwrap();

    let piece = zagnuts.create();
    piece
        .set_many(fields! {
            mixed: [5, "hi", [":symbol", 0], (Value::Null)],
        })
        .unwrap();

    let fresh = zagnuts.find(piece.id().unwrap()).unwrap().unwrap();
    let mixed = fresh.get("mixed").unwrap();
    let mixed = mixed.as_array().unwrap();
    assert_eq!(mixed.get(0), Value::Int(5));
    assert_eq!(mixed.get(1), Value::String("hi".to_string()));
    let nested = mixed.get(2);
    let nested = nested.as_array().unwrap();
    assert_eq!(nested.get(1), Value::Int(0));
    assert_eq!(mixed.get(3), Value::Null);
}
