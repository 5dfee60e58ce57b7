use crate::piece::{EmbeddedArray, EmbeddedMap, Piece};
use crate::store::DocId;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use std::fmt::{Debug, Display, Formatter};

/// A map key, tagged with its origin.
///
/// Attribute-style keys ([`Key::Name`]) are stored bare on the wire; free-form
/// text keys ([`Key::Text`]) are stored single-quoted so the origin survives a
/// round trip through the store. Any other key shape is unrepresentable by
/// construction.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Key {
    /// An attribute/symbolic name. Stored bare.
    Name(String),
    /// Arbitrary text. Stored single-quoted (`'key'`).
    Text(String),
}

impl Key {
    pub fn name(name: impl Into<String>) -> Key {
        Key::Name(name.into())
    }

    pub fn text(text: impl Into<String>) -> Key {
        Key::Text(text.into())
    }

    /// Parses a `stringify!`-ed macro token: double-quoted tokens become
    /// [`Key::Text`], bare tokens become [`Key::Name`].
    pub fn parse(token: &str) -> Key {
        if token.len() >= 2 && token.starts_with('"') && token.ends_with('"') {
            Key::Text(token[1..token.len() - 1].to_string())
        } else {
            Key::Name(token.to_string())
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Key::Name(s) | Key::Text(s) => s,
        }
    }

    pub fn is_name(&self) -> bool {
        matches!(self, Key::Name(_))
    }
}

impl From<&str> for Key {
    fn from(name: &str) -> Key {
        Key::Name(name.to_string())
    }
}

impl From<String> for Key {
    fn from(name: String) -> Key {
        Key::Name(name)
    }
}

impl Display for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Key::Name(s) => write!(f, "{}", s),
            Key::Text(s) => write!(f, "'{}'", s),
        }
    }
}

impl Debug for Key {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

/// An ordered field map, the building block for filters, bulk writes, and
/// container contents. Usually built with the [`fields!`](crate::fields!)
/// macro.
pub type FieldMap = IndexMap<Key, Value>;

/// The fallback representation of an arbitrary value: its type name plus a
/// flat map of its fields, each itself a [Value].
///
/// Produced by the [`Capture`](crate::common::Capture) trait on the way in
/// and by the codec when it meets the opaque-object envelope on the way out.
#[derive(Clone, PartialEq)]
pub struct OpaqueObject {
    class: String,
    fields: IndexMap<String, Value>,
}

impl OpaqueObject {
    pub fn new(class: impl Into<String>, fields: IndexMap<String, Value>) -> Self {
        OpaqueObject {
            class: class.into(),
            fields,
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn fields(&self) -> &IndexMap<String, Value> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Value> {
        self.fields.get(name)
    }
}

impl Debug for OpaqueObject {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}{:?}", self.class, self.fields.keys().collect::<Vec<_>>())
    }
}

/// An in-memory field value.
///
/// This is the rich side of the codec: container variants carry live
/// [`EmbeddedMap`]/[`EmbeddedArray`]/[`Piece`] handles with ownership edges,
/// so mutating them propagates atomic updates to the backing store. The plain
/// wire counterpart is [`StoredValue`](crate::common::StoredValue).
///
/// Note that [`Value::Piece`] compares by document identity (two unsaved
/// pieces are never equal), while map and array variants compare by contents.
#[derive(Clone)]
pub enum Value {
    /// Absent/null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Signed 64-bit integer.
    Int(i64),
    /// 64-bit floating point.
    Float(f64),
    /// UTF-8 text.
    String(String),
    /// Timestamp with timezone, stored in UTC.
    Time(DateTime<Utc>),
    /// Regular expression pattern source.
    Regex(String),
    /// Pre-serialized opaque binary.
    Bytes(Vec<u8>),
    /// Store-assigned document identifier.
    Id(DocId),
    /// An embedded mapping.
    Map(EmbeddedMap),
    /// An embedded sequence.
    Array(EmbeddedArray),
    /// An embedded document with an entity kind.
    Piece(Piece),
    /// An opaque object captured as type name + field map.
    Object(OpaqueObject),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(x) => Some(*x),
            Value::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<DocId> {
        match self {
            Value::Id(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&EmbeddedMap> {
        match self {
            Value::Map(map) => Some(map),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&EmbeddedArray> {
        match self {
            Value::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn as_piece(&self) -> Option<&Piece> {
        match self {
            Value::Piece(piece) => Some(piece),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&OpaqueObject> {
        match self {
            Value::Object(object) => Some(object),
            _ => None,
        }
    }

    /// Wraps pre-serialized binary data.
    pub fn bytes(bytes: Vec<u8>) -> Value {
        Value::Bytes(bytes)
    }

    /// Wraps a regular expression pattern source.
    pub fn regex(pattern: impl Into<String>) -> Value {
        Value::Regex(pattern.into())
    }
}

impl Default for Value {
    fn default() -> Self {
        Value::Null
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        use Value::*;
        match (self, other) {
            (Null, Null) => true,
            (Bool(a), Bool(b)) => a == b,
            (Int(a), Int(b)) => a == b,
            (Float(a), Float(b)) => a.total_cmp(b).is_eq(),
            (String(a), String(b)) => a == b,
            (Time(a), Time(b)) => a == b,
            (Regex(a), Regex(b)) => a == b,
            (Bytes(a), Bytes(b)) => a == b,
            (Id(a), Id(b)) => a == b,
            (Map(a), Map(b)) => a == b,
            (Array(a), Array(b)) => a == b,
            (Piece(a), Piece(b)) => a == b,
            (Object(a), Object(b)) => a == b,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Int(i) => write!(f, "{}", i),
            Value::Float(x) => write!(f, "{}", x),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Time(t) => write!(f, "{}", t.to_rfc3339()),
            Value::Regex(pattern) => write!(f, "/{}/", pattern),
            Value::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            Value::Id(id) => write!(f, "{}", id),
            Value::Map(map) => write!(f, "{}", map),
            Value::Array(array) => write!(f, "{}", array),
            Value::Piece(piece) => write!(f, "{}", piece),
            Value::Object(object) => write!(f, "{:?}", object),
        }
    }
}

impl Debug for Value {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Value::Bool(value)
    }
}

impl From<i32> for Value {
    fn from(value: i32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Value::Int(value)
    }
}

impl From<u32> for Value {
    fn from(value: u32) -> Self {
        Value::Int(value as i64)
    }
}

impl From<f32> for Value {
    fn from(value: f32) -> Self {
        Value::Float(value as f64)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Value::Float(value)
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Value::String(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Value::String(value)
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(value: DateTime<Utc>) -> Self {
        Value::Time(value)
    }
}

impl From<DocId> for Value {
    fn from(value: DocId) -> Self {
        Value::Id(value)
    }
}

impl From<EmbeddedMap> for Value {
    fn from(value: EmbeddedMap) -> Self {
        Value::Map(value)
    }
}

impl From<EmbeddedArray> for Value {
    fn from(value: EmbeddedArray) -> Self {
        Value::Array(value)
    }
}

impl From<Piece> for Value {
    fn from(value: Piece) -> Self {
        Value::Piece(value)
    }
}

impl From<OpaqueObject> for Value {
    fn from(value: OpaqueObject) -> Self {
        Value::Object(value)
    }
}

impl From<Vec<Value>> for Value {
    fn from(values: Vec<Value>) -> Self {
        Value::Array(EmbeddedArray::from_values(values))
    }
}

impl From<FieldMap> for Value {
    fn from(fields: FieldMap) -> Self {
        Value::Map(EmbeddedMap::from_fields(fields))
    }
}

impl From<()> for Value {
    fn from(_: ()) -> Self {
        Value::Null
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        match value {
            Some(inner) => inner.into(),
            None => Value::Null,
        }
    }
}

/// Builds a [FieldMap] from key/value pairs.
///
/// Bare keys become [`Key::Name`], double-quoted keys become [`Key::Text`].
/// Nested braces build freestanding embedded maps, brackets build embedded
/// arrays, and anything else goes through `Value::from`.
///
/// ```ignore
/// let fields = fields!{
///     licks: 7,
///     "crunch factor": 0.5,
///     filling: { flavor: "butterscotch" },
///     bits: ["peanut", "almonds"],
/// };
/// ```
#[macro_export]
macro_rules! fields {
    () => {
        $crate::common::FieldMap::new()
    };

    ($($key:tt : $value:tt),* $(,)?) => {
        {
            #[allow(unused_imports)]
            use $crate::field_value;

            let mut fields = $crate::common::FieldMap::new();
            $(
                fields.insert(
                    $crate::common::Key::parse(stringify!($key)),
                    $crate::field_value!($value),
                );
            )*
            fields
        }
    };
}

/// Helper macro to convert values for the [`fields!`](crate::fields!) macro.
/// Handles nested maps, arrays, and expressions.
#[macro_export]
macro_rules! field_value {
    ({ $($key:tt : $value:tt),* $(,)? }) => {
        $crate::common::Value::Map($crate::piece::EmbeddedMap::from_fields(
            $crate::fields!{ $($key : $value),* },
        ))
    };

    ([ $($value:tt),* $(,)? ]) => {
        $crate::common::Value::Array($crate::piece::EmbeddedArray::from_values(
            vec![$($crate::field_value!($value)),*],
        ))
    };

    ($value:expr) => {
        $crate::common::Value::from($value)
    };
}
