//! The value codec: converts between in-memory [Value]s and wire
//! [StoredValue]s.
//!
//! Encoding is straightforward shrink-wrapping: primitives pass through,
//! containers encode recursively, and anything captured as an opaque object
//! goes under the `__object_` envelope. Decoding is the precise inverse and
//! additionally threads ownership: containers reconstructed from a read adopt
//! the supplied parent and path segment, so later mutations know where to
//! write back.

use crate::common::{
    FieldMap, Key, OpaqueObject, StoredMap, StoredValue, Value, CLASS_KEY, OBJECT_CLASS,
    OBJECT_FIELDS, OBJECT_KEY, RESERVED_FIELDS,
};
use crate::errors::{ErrorKind, PralineError, PralineResult};
use crate::piece::{EmbeddedArray, EmbeddedMap, Piece, Propagator};
use indexmap::IndexMap;
use std::sync::Arc;

/// The parent slot a decoded container is adopted into.
pub(crate) struct Owner<'a> {
    pub(crate) parent: &'a Arc<dyn Propagator>,
    pub(crate) segment: &'a str,
}

/// Encodes a value into its storage-safe representation.
///
/// Fails with [`ErrorKind::EncodingType`] when a map carries a bare name that
/// collides with a reserved field.
pub fn encode(value: &Value) -> PralineResult<StoredValue> {
    match value {
        Value::Null => Ok(StoredValue::Null),
        Value::Bool(b) => Ok(StoredValue::Bool(*b)),
        Value::Int(i) => Ok(StoredValue::Int(*i)),
        Value::Float(x) => Ok(StoredValue::Float(*x)),
        Value::String(s) => Ok(StoredValue::String(s.clone())),
        Value::Time(t) => Ok(StoredValue::Time(*t)),
        Value::Regex(pattern) => Ok(StoredValue::Regex(pattern.clone())),
        Value::Bytes(bytes) => Ok(StoredValue::Bytes(bytes.clone())),
        Value::Id(id) => Ok(StoredValue::Id(*id)),
        Value::Map(map) => Ok(StoredValue::Map(encode_fields(&map.snapshot())?)),
        Value::Array(array) => {
            let values = array
                .values()
                .iter()
                .map(encode)
                .collect::<PralineResult<Vec<StoredValue>>>()?;
            Ok(StoredValue::Array(values))
        }
        Value::Piece(piece) => Ok(StoredValue::Map(encode_piece(piece)?)),
        Value::Object(object) => Ok(StoredValue::Map(encode_object(object)?)),
    }
}

/// Encodes a field map for the write surface, validating that bare names do
/// not collide with reserved fields.
pub fn encode_fields(fields: &FieldMap) -> PralineResult<StoredMap> {
    let mut encoded = StoredMap::new();
    for (key, value) in fields {
        if key.is_name() && RESERVED_FIELDS.contains(&key.as_str()) {
            log::error!("Field name {} is reserved", key);
            return Err(PralineError::new(
                &format!("Field name {} is reserved", key),
                ErrorKind::EncodingType,
            ));
        }
        encoded.insert(encode_key(key), encode(value)?);
    }
    Ok(encoded)
}

/// Encodes a filter map. Unlike [encode_fields] this admits reserved names,
/// so filters can address `_id` directly.
pub fn encode_filter(fields: &FieldMap) -> PralineResult<StoredMap> {
    let mut encoded = StoredMap::new();
    for (key, value) in fields {
        encoded.insert(encode_key(key), encode(value)?);
    }
    Ok(encoded)
}

/// Encodes a map key: names go bare, text keys are single-quoted so origin
/// is recoverable on decode.
pub fn encode_key(key: &Key) -> String {
    match key {
        Key::Name(name) => name.clone(),
        Key::Text(text) => format!("'{}'", text),
    }
}

/// Decodes a wire key back into a [Key], restoring text-vs-name origin.
pub fn decode_key(raw: &str) -> Key {
    if raw.len() >= 2 && raw.starts_with('\'') && raw.ends_with('\'') {
        Key::Text(raw[1..raw.len() - 1].to_string())
    } else {
        Key::Name(raw.to_string())
    }
}

fn encode_piece(piece: &Piece) -> PralineResult<StoredMap> {
    let mut encoded = encode_fields(&piece.cache_snapshot())?;
    if let Some(kind) = piece.kind() {
        encoded.insert(CLASS_KEY.to_string(), StoredValue::String(kind));
    }
    Ok(encoded)
}

fn encode_object(object: &OpaqueObject) -> PralineResult<StoredMap> {
    let mut fields = StoredMap::new();
    for (name, value) in object.fields() {
        fields.insert(name.clone(), encode(value)?);
    }
    let mut envelope = StoredMap::new();
    envelope.insert(
        OBJECT_CLASS.to_string(),
        StoredValue::String(object.class().to_string()),
    );
    if !fields.is_empty() {
        envelope.insert(OBJECT_FIELDS.to_string(), StoredValue::Map(fields));
    }
    let mut wrapped = StoredMap::new();
    wrapped.insert(OBJECT_KEY.to_string(), StoredValue::Map(envelope));
    Ok(wrapped)
}

/// Decodes a stored value into a freestanding in-memory value.
///
/// Containers come back unowned; use the internal owner-threading variant to
/// attach them to a parent slot.
pub fn decode(stored: &StoredValue) -> PralineResult<Value> {
    decode_with(stored, None)
}

/// Decodes a stored value, adopting reconstructed containers under the given
/// parent slot so their mutations propagate back to the root.
pub(crate) fn decode_with(stored: &StoredValue, owner: Option<Owner<'_>>) -> PralineResult<Value> {
    match stored {
        StoredValue::Null => Ok(Value::Null),
        StoredValue::Bool(b) => Ok(Value::Bool(*b)),
        StoredValue::Int(i) => Ok(Value::Int(*i)),
        StoredValue::Float(x) => Ok(Value::Float(*x)),
        StoredValue::String(s) => Ok(Value::String(s.clone())),
        StoredValue::Time(t) => Ok(Value::Time(*t)),
        StoredValue::Regex(pattern) => Ok(Value::Regex(pattern.clone())),
        StoredValue::Bytes(bytes) => Ok(Value::Bytes(bytes.clone())),
        StoredValue::Id(id) => Ok(Value::Id(*id)),
        StoredValue::Array(values) => decode_array(values, owner),
        StoredValue::Map(map) => {
            if map.contains_key(OBJECT_KEY) {
                decode_object(map)
            } else if map.contains_key(CLASS_KEY) {
                decode_piece(map, owner)
            } else {
                decode_map(map, owner)
            }
        }
    }
}

fn decode_array(values: &[StoredValue], owner: Option<Owner<'_>>) -> PralineResult<Value> {
    let array = EmbeddedArray::new();
    if let Some(owner) = &owner {
        array.adopt(owner.parent, owner.segment);
    }
    let array_owner = array.owner_handle();
    for (index, stored) in values.iter().enumerate() {
        let segment = index.to_string();
        let element = decode_with(
            stored,
            Some(Owner {
                parent: &array_owner,
                segment: &segment,
            }),
        )?;
        array.push_local(element);
    }
    Ok(Value::Array(array))
}

fn decode_map(map: &StoredMap, owner: Option<Owner<'_>>) -> PralineResult<Value> {
    let embedded = EmbeddedMap::new();
    if let Some(owner) = &owner {
        embedded.adopt(owner.parent, owner.segment);
    }
    let map_owner = embedded.owner_handle();
    for (raw_key, stored) in map {
        let child = decode_with(
            stored,
            Some(Owner {
                parent: &map_owner,
                segment: raw_key,
            }),
        )?;
        embedded.insert_local(decode_key(raw_key), child);
    }
    Ok(Value::Map(embedded))
}

fn decode_piece(map: &StoredMap, owner: Option<Owner<'_>>) -> PralineResult<Value> {
    let kind = match map.get(CLASS_KEY) {
        Some(StoredValue::String(kind)) => kind.clone(),
        _ => {
            log::error!("Embedded document marker {} is not a type name", CLASS_KEY);
            return Err(PralineError::new(
                "Embedded document marker is not a type name",
                ErrorKind::EncodingType,
            ));
        }
    };

    let piece = Piece::embed(&kind);
    if let Some(owner) = &owner {
        piece.adopt_embeddable(owner.parent, owner.segment);
    }
    let piece_owner = piece.owner_handle();
    let mut cache = FieldMap::new();
    for (raw_key, stored) in map {
        if raw_key == CLASS_KEY {
            continue;
        }
        let child = decode_with(
            stored,
            Some(Owner {
                parent: &piece_owner,
                segment: raw_key,
            }),
        )?;
        cache.insert(decode_key(raw_key), child);
    }
    piece.fill_cache(cache);
    Ok(Value::Piece(piece))
}

fn decode_object(map: &StoredMap) -> PralineResult<Value> {
    let Some(StoredValue::Map(envelope)) = map.get(OBJECT_KEY) else {
        log::error!("Malformed opaque object envelope");
        return Err(PralineError::new(
            "Malformed opaque object envelope",
            ErrorKind::EncodingType,
        ));
    };

    let class = match envelope.get(OBJECT_CLASS) {
        Some(StoredValue::String(class)) => class.clone(),
        _ => {
            log::error!("Opaque object envelope is missing its class name");
            return Err(PralineError::new(
                "Opaque object envelope is missing its class name",
                ErrorKind::EncodingType,
            ));
        }
    };

    let mut fields = IndexMap::new();
    if let Some(StoredValue::Map(stored_fields)) = envelope.get(OBJECT_FIELDS) {
        for (name, stored) in stored_fields {
            // opaque object internals come back unowned; they do not take
            // part in cascading writes
            fields.insert(name.clone(), decode(stored)?);
        }
    }

    Ok(Value::Object(OpaqueObject::new(class, fields)))
}
