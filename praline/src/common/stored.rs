use crate::store::DocId;
use chrono::{DateTime, Utc};
use im::OrdMap;
use smallvec::SmallVec;
use std::cmp::Ordering;
use std::fmt::{Debug, Display, Formatter};

use super::constants::FIELD_SEPARATOR;

/// Segment vector for dotted field paths; stack-allocated for shallow paths.
pub(crate) type SegmentVec<'a> = SmallVec<[&'a str; 8]>;

/// The storage-safe representation of a value.
///
/// `StoredValue` is what actually crosses the seam to the backing store:
/// plain primitives, plain arrays, and plain maps. It carries none of the
/// in-memory machinery ([`Value`](crate::common::Value) containers, ownership
/// edges); the codec converts between the two representations.
///
/// Wire maps are persistent ordered maps, so cloning a document is O(1) and
/// mutations share structure with the original.
#[derive(Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StoredValue {
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
    /// Pre-serialized opaque binary. Cannot be indexed or matched against.
    Bytes(Vec<u8>),
    /// Store-assigned document identifier.
    Id(DocId),
    /// Sequence of stored values.
    Array(Vec<StoredValue>),
    /// Mapping of wire keys to stored values.
    Map(StoredMap),
}

/// A wire document: persistent ordered map from wire key to [StoredValue].
pub type StoredMap = OrdMap<String, StoredValue>;

impl StoredValue {
    pub fn is_null(&self) -> bool {
        matches!(self, StoredValue::Null)
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            StoredValue::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            StoredValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            StoredValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_id(&self) -> Option<DocId> {
        match self {
            StoredValue::Id(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&Vec<StoredValue>> {
        match self {
            StoredValue::Array(values) => Some(values),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&StoredMap> {
        match self {
            StoredValue::Map(map) => Some(map),
            _ => None,
        }
    }

    fn type_rank(&self) -> u8 {
        match self {
            StoredValue::Null => 0,
            StoredValue::Bool(_) => 1,
            StoredValue::Int(_) | StoredValue::Float(_) => 2,
            StoredValue::String(_) => 3,
            StoredValue::Time(_) => 4,
            StoredValue::Regex(_) => 5,
            StoredValue::Bytes(_) => 6,
            StoredValue::Id(_) => 7,
            StoredValue::Array(_) => 8,
            StoredValue::Map(_) => 9,
        }
    }
}

/// Total order across stored values, used by the memory backend's sort.
///
/// Values of different types order by a fixed type rank; integers and floats
/// share a numeric rank and compare numerically. Floats compare with
/// `total_cmp`, so NaN sorts deterministically instead of poisoning the order.
pub fn compare(left: &StoredValue, right: &StoredValue) -> Ordering {
    use StoredValue::*;
    match (left, right) {
        (Null, Null) => Ordering::Equal,
        (Bool(a), Bool(b)) => a.cmp(b),
        (Int(a), Int(b)) => a.cmp(b),
        (Float(a), Float(b)) => a.total_cmp(b),
        (Int(a), Float(b)) => (*a as f64).total_cmp(b),
        (Float(a), Int(b)) => a.total_cmp(&(*b as f64)),
        (String(a), String(b)) => a.cmp(b),
        (Time(a), Time(b)) => a.cmp(b),
        (Regex(a), Regex(b)) => a.cmp(b),
        (Bytes(a), Bytes(b)) => a.cmp(b),
        (Id(a), Id(b)) => a.cmp(b),
        (Array(a), Array(b)) => {
            for (x, y) in a.iter().zip(b.iter()) {
                let ordering = compare(x, y);
                if ordering != Ordering::Equal {
                    return ordering;
                }
            }
            a.len().cmp(&b.len())
        }
        (Map(a), Map(b)) => {
            for ((ka, va), (kb, vb)) in a.iter().zip(b.iter()) {
                let key_ordering = ka.cmp(kb);
                if key_ordering != Ordering::Equal {
                    return key_ordering;
                }
                let value_ordering = compare(va, vb);
                if value_ordering != Ordering::Equal {
                    return value_ordering;
                }
            }
            a.len().cmp(&b.len())
        }
        _ => left.type_rank().cmp(&right.type_rank()),
    }
}

/// Splits a dotted field path into its segments.
pub(crate) fn split_path(path: &str) -> SegmentVec<'_> {
    path.split(FIELD_SEPARATOR).collect()
}

/// Joins a leading segment onto a field path.
pub(crate) fn join_path(segment: &str, path: &str) -> String {
    let mut joined = String::with_capacity(segment.len() + 1 + path.len());
    joined.push_str(segment);
    joined.push_str(FIELD_SEPARATOR);
    joined.push_str(path);
    joined
}

/// Navigates a document along a dotted path, descending through nested maps
/// and indexing arrays by numeric segments. Returns `None` when any segment
/// is missing.
pub fn lookup(document: &StoredMap, path: &str) -> Option<StoredValue> {
    let segments = split_path(path);
    let (first, rest) = segments.split_first()?;
    let mut current = document.get(*first)?.clone();
    for segment in rest {
        current = match current {
            StoredValue::Map(ref map) => map.get(*segment)?.clone(),
            StoredValue::Array(ref values) => {
                let index: usize = segment.parse().ok()?;
                values.get(index)?.clone()
            }
            _ => return None,
        };
    }
    Some(current)
}

impl Display for StoredValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            StoredValue::Null => write!(f, "null"),
            StoredValue::Bool(b) => write!(f, "{}", b),
            StoredValue::Int(i) => write!(f, "{}", i),
            StoredValue::Float(x) => write!(f, "{}", x),
            StoredValue::String(s) => write!(f, "{:?}", s),
            StoredValue::Time(t) => write!(f, "{}", t.to_rfc3339()),
            StoredValue::Regex(pattern) => write!(f, "/{}/", pattern),
            StoredValue::Bytes(bytes) => write!(f, "<{} bytes>", bytes.len()),
            StoredValue::Id(id) => write!(f, "{}", id),
            StoredValue::Array(values) => {
                write!(f, "[")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", value)?;
                }
                write!(f, "]")
            }
            StoredValue::Map(map) => {
                write!(f, "{{")?;
                for (i, (key, value)) in map.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}

impl Debug for StoredValue {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        Display::fmt(self, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc() -> StoredMap {
        let mut inner = StoredMap::new();
        inner.insert("zip".to_string(), StoredValue::Int(10001));
        let mut map = StoredMap::new();
        map.insert("city".to_string(), StoredValue::String("New York".to_string()));
        map.insert("address".to_string(), StoredValue::Map(inner));
        map.insert(
            "bits".to_string(),
            StoredValue::Array(vec![
                StoredValue::String("peanut".to_string()),
                StoredValue::String("almonds".to_string()),
            ]),
        );
        map
    }

    #[test]
    fn lookup_top_level() {
        let found = lookup(&doc(), "city").unwrap();
        assert_eq!(found, StoredValue::String("New York".to_string()));
    }

    #[test]
    fn lookup_nested_map() {
        assert_eq!(lookup(&doc(), "address.zip").unwrap(), StoredValue::Int(10001));
    }

    #[test]
    fn lookup_array_index() {
        assert_eq!(
            lookup(&doc(), "bits.1").unwrap(),
            StoredValue::String("almonds".to_string())
        );
    }

    #[test]
    fn lookup_missing_path() {
        assert!(lookup(&doc(), "address.street").is_none());
        assert!(lookup(&doc(), "bits.7").is_none());
        assert!(lookup(&doc(), "city.inner").is_none());
    }

    #[test]
    fn numeric_values_compare_across_types() {
        assert_eq!(
            compare(&StoredValue::Int(2), &StoredValue::Float(2.5)),
            Ordering::Less
        );
        assert_eq!(
            compare(&StoredValue::Float(3.0), &StoredValue::Int(3)),
            Ordering::Equal
        );
    }

    #[test]
    fn mixed_types_order_by_rank() {
        assert_eq!(
            compare(&StoredValue::Null, &StoredValue::Bool(false)),
            Ordering::Less
        );
        assert_eq!(
            compare(
                &StoredValue::String("z".to_string()),
                &StoredValue::Int(100)
            ),
            Ordering::Greater
        );
    }

    #[test]
    fn arrays_compare_elementwise_then_by_length() {
        let short = StoredValue::Array(vec![StoredValue::Int(1)]);
        let long = StoredValue::Array(vec![StoredValue::Int(1), StoredValue::Int(2)]);
        assert_eq!(compare(&short, &long), Ordering::Less);
    }

    #[test]
    fn join_and_split_paths() {
        let joined = join_path("bits", "0");
        assert_eq!(joined, "bits.0");
        let segments = split_path(&joined);
        assert_eq!(segments.as_slice(), &["bits", "0"]);
    }
}
