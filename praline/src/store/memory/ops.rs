use crate::collection::SortSpec;
use crate::common::{compare, lookup, split_path, StoredMap, StoredValue, DOC_ID};
use crate::errors::{ErrorKind, PralineError, PralineResult};
use crate::store::{AtomicOp, Modifier};
use std::cmp::Ordering;

/// Applies an atomic modifier to a document, returning the updated document.
///
/// Every field entry addresses one dotted path; intermediate maps are created
/// on demand and numeric segments index into arrays, so a `$set` on `bits.1`
/// replaces one element without touching its neighbors.
pub(crate) fn apply_modifier(
    document: &StoredMap,
    modifier: &Modifier,
) -> PralineResult<StoredMap> {
    let mut current = document.clone();
    for (path, operand) in modifier.fields() {
        current = apply_one(&current, modifier.op(), path, operand)?;
    }
    Ok(current)
}

fn apply_one(
    document: &StoredMap,
    op: AtomicOp,
    path: &str,
    operand: &StoredValue,
) -> PralineResult<StoredMap> {
    // $pop against a missing field is a no-op; don't materialize the path.
    if op == AtomicOp::Pop && lookup(document, path).is_none() {
        return Ok(document.clone());
    }

    let segments = split_path(path);
    let root = StoredValue::Map(document.clone());
    let updated = descend(Some(&root), &segments, &|current| match op {
        AtomicOp::Set => Ok(operand.clone()),
        AtomicOp::Inc => increment(current, operand, path),
        AtomicOp::Push => append(current, operand, path),
        AtomicOp::Pop => pop(current, operand, path),
    })?;

    match updated {
        StoredValue::Map(map) => Ok(map),
        other => {
            log::error!("Document root degenerated into {} while updating {}", other, path);
            Err(PralineError::new(
                "Document root is not a map",
                ErrorKind::Internal,
            ))
        }
    }
}

type LeafFn<'a> = dyn Fn(Option<&StoredValue>) -> PralineResult<StoredValue> + 'a;

fn descend(
    current: Option<&StoredValue>,
    segments: &[&str],
    leaf: &LeafFn<'_>,
) -> PralineResult<StoredValue> {
    let Some((head, rest)) = segments.split_first() else {
        return leaf(current);
    };

    match current {
        Some(StoredValue::Map(map)) => {
            let child = descend(map.get(*head), rest, leaf)?;
            Ok(StoredValue::Map(map.update(head.to_string(), child)))
        }
        Some(StoredValue::Array(values)) => {
            let index: usize = head.parse().map_err(|_| {
                log::error!("Array segment {} is not an index", head);
                PralineError::new(
                    &format!("Array segment {} is not an index", head),
                    ErrorKind::Backend,
                )
            })?;
            let mut values = values.clone();
            if index < values.len() {
                let updated = descend(Some(&values[index]), rest, leaf)?;
                values[index] = updated;
            } else {
                // the store pads sparse array writes with nulls
                while values.len() < index {
                    values.push(StoredValue::Null);
                }
                values.push(descend(None, rest, leaf)?);
            }
            Ok(StoredValue::Array(values))
        }
        Some(StoredValue::Null) | None => {
            let child = descend(None, rest, leaf)?;
            let mut map = StoredMap::new();
            map.insert(head.to_string(), child);
            Ok(StoredValue::Map(map))
        }
        Some(other) => {
            log::error!("Cannot traverse into {} at segment {}", other, head);
            Err(PralineError::new(
                &format!("Cannot traverse into a non-container value at segment {}", head),
                ErrorKind::Backend,
            ))
        }
    }
}

fn increment(
    current: Option<&StoredValue>,
    operand: &StoredValue,
    path: &str,
) -> PralineResult<StoredValue> {
    match (current, operand) {
        // an unset field starts at the increment
        (None | Some(StoredValue::Null), StoredValue::Int(_) | StoredValue::Float(_)) => {
            Ok(operand.clone())
        }
        (Some(StoredValue::Int(a)), StoredValue::Int(b)) => Ok(StoredValue::Int(a + b)),
        (Some(StoredValue::Int(a)), StoredValue::Float(b)) => {
            Ok(StoredValue::Float(*a as f64 + b))
        }
        (Some(StoredValue::Float(a)), StoredValue::Int(b)) => {
            Ok(StoredValue::Float(a + *b as f64))
        }
        (Some(StoredValue::Float(a)), StoredValue::Float(b)) => Ok(StoredValue::Float(a + b)),
        _ => {
            log::error!("Cannot $inc non-numeric field {}", path);
            Err(PralineError::new(
                &format!("Cannot $inc non-numeric field {}", path),
                ErrorKind::Backend,
            ))
        }
    }
}

fn append(
    current: Option<&StoredValue>,
    operand: &StoredValue,
    path: &str,
) -> PralineResult<StoredValue> {
    match current {
        None | Some(StoredValue::Null) => Ok(StoredValue::Array(vec![operand.clone()])),
        Some(StoredValue::Array(values)) => {
            let mut values = values.clone();
            values.push(operand.clone());
            Ok(StoredValue::Array(values))
        }
        Some(other) => {
            log::error!("Cannot $push onto non-array field {} ({})", path, other);
            Err(PralineError::new(
                &format!("Cannot $push onto non-array field {}", path),
                ErrorKind::Backend,
            ))
        }
    }
}

fn pop(
    current: Option<&StoredValue>,
    operand: &StoredValue,
    path: &str,
) -> PralineResult<StoredValue> {
    match current {
        Some(StoredValue::Array(values)) => {
            let mut values = values.clone();
            if !values.is_empty() {
                // wire convention: -1 pops the front, anything else the back
                if operand.as_int() == Some(-1) {
                    values.remove(0);
                } else {
                    values.pop();
                }
            }
            Ok(StoredValue::Array(values))
        }
        _ => {
            log::error!("Cannot $pop non-array field {}", path);
            Err(PralineError::new(
                &format!("Cannot $pop non-array field {}", path),
                ErrorKind::Backend,
            ))
        }
    }
}

/// Decides whether a document matches a filter.
///
/// Every filter entry must hold: equality on the value at the dotted path,
/// regex match for regex operands against string fields, or array membership
/// when the stored value is an array and the operand a scalar. A missing
/// field matches only a `Null` operand.
pub(crate) fn matches(document: &StoredMap, filter: &StoredMap) -> PralineResult<bool> {
    for (path, expected) in filter {
        let actual = lookup(document, path);
        if !matches_value(actual.as_ref(), expected)? {
            return Ok(false);
        }
    }
    Ok(true)
}

fn matches_value(actual: Option<&StoredValue>, expected: &StoredValue) -> PralineResult<bool> {
    match (actual, expected) {
        (None, StoredValue::Null) => Ok(true),
        (None, _) => Ok(false),
        (Some(StoredValue::Null), StoredValue::Null) => Ok(true),
        (Some(actual), StoredValue::Regex(pattern)) => {
            let regex = regex::Regex::new(pattern).map_err(|err| {
                log::error!("Invalid filter regex {}: {}", pattern, err);
                PralineError::new(
                    &format!("Invalid filter regex {}", pattern),
                    ErrorKind::Backend,
                )
            })?;
            match actual {
                StoredValue::String(s) => Ok(regex.is_match(s)),
                StoredValue::Array(values) => Ok(values
                    .iter()
                    .any(|v| v.as_str().map(|s| regex.is_match(s)).unwrap_or(false))),
                _ => Ok(false),
            }
        }
        (Some(actual), expected) => {
            if actual == expected {
                return Ok(true);
            }
            // scalar operands match array membership
            if let (StoredValue::Array(values), false) =
                (actual, matches!(expected, StoredValue::Array(_)))
            {
                return Ok(values.iter().any(|v| v == expected));
            }
            Ok(false)
        }
    }
}

/// Projects a document down to the requested field paths. The document id is
/// always retained.
pub(crate) fn project(document: &StoredMap, fields: &[String]) -> StoredMap {
    let mut projected = StoredMap::new();
    if let Some(id) = document.get(DOC_ID) {
        projected.insert(DOC_ID.to_string(), id.clone());
    }
    for path in fields {
        if let Some(value) = lookup(document, path) {
            let segments = split_path(path);
            let root = StoredValue::Map(projected.clone());
            // rebuilding along the path keeps nested projections nested
            if let Ok(StoredValue::Map(map)) = descend(Some(&root), &segments, &|_| Ok(value.clone())) {
                projected = map;
            }
        }
    }
    projected
}

/// Orders two documents by a sort specification, comparing the values at
/// each sorted path with the cross-type total order.
pub(crate) fn order_documents(
    left: &StoredMap,
    right: &StoredMap,
    sort: &SortSpec,
) -> Ordering {
    for (path, order) in sort.terms() {
        let a = lookup(left, path).unwrap_or(StoredValue::Null);
        let b = lookup(right, path).unwrap_or(StoredValue::Null);
        let ordering = match order {
            crate::common::SortOrder::Ascending => compare(&a, &b),
            crate::common::SortOrder::Descending => compare(&b, &a),
        };
        if ordering != Ordering::Equal {
            return ordering;
        }
    }
    Ordering::Equal
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collection::{IntoSortTerms, SortSpec};
    use crate::common::SortOrder;

    fn doc_with(path: &str, value: StoredValue) -> StoredMap {
        let modifier = Modifier::set({
            let mut fields = StoredMap::new();
            fields.insert(path.to_string(), value);
            fields
        });
        apply_modifier(&StoredMap::new(), &modifier).unwrap()
    }

    #[test]
    fn set_creates_nested_maps() {
        let doc = doc_with("filling.flavor", StoredValue::String("butterscotch".to_string()));
        assert_eq!(
            lookup(&doc, "filling.flavor").unwrap(),
            StoredValue::String("butterscotch".to_string())
        );
    }

    #[test]
    fn set_replaces_one_array_element() {
        let base = doc_with(
            "bits",
            StoredValue::Array(vec![
                StoredValue::String("peanut".to_string()),
                StoredValue::String("almonds".to_string()),
            ]),
        );
        let modifier = Modifier::set({
            let mut fields = StoredMap::new();
            fields.insert("bits.1".to_string(), StoredValue::String("cashews".to_string()));
            fields
        });
        let updated = apply_modifier(&base, &modifier).unwrap();
        assert_eq!(
            lookup(&updated, "bits.0").unwrap(),
            StoredValue::String("peanut".to_string())
        );
        assert_eq!(
            lookup(&updated, "bits.1").unwrap(),
            StoredValue::String("cashews".to_string())
        );
    }

    #[test]
    fn inc_initializes_unset_field() {
        let modifier = Modifier::inc({
            let mut fields = StoredMap::new();
            fields.insert("ounces".to_string(), StoredValue::Int(5));
            fields
        });
        let updated = apply_modifier(&StoredMap::new(), &modifier).unwrap();
        assert_eq!(lookup(&updated, "ounces").unwrap(), StoredValue::Int(5));
    }

    #[test]
    fn inc_adds_to_existing_value() {
        let base = doc_with("ounces", StoredValue::Int(12));
        let modifier = Modifier::inc({
            let mut fields = StoredMap::new();
            fields.insert("ounces".to_string(), StoredValue::Int(-5));
            fields
        });
        let updated = apply_modifier(&base, &modifier).unwrap();
        assert_eq!(lookup(&updated, "ounces").unwrap(), StoredValue::Int(7));
    }

    #[test]
    fn inc_on_string_is_a_backend_error() {
        let base = doc_with("ounces", StoredValue::String("twelve".to_string()));
        let modifier = Modifier::inc({
            let mut fields = StoredMap::new();
            fields.insert("ounces".to_string(), StoredValue::Int(1));
            fields
        });
        let err = apply_modifier(&base, &modifier).unwrap_err();
        assert_eq!(err.kind(), &ErrorKind::Backend);
    }

    #[test]
    fn push_appends_and_creates() {
        let modifier = Modifier::push({
            let mut fields = StoredMap::new();
            fields.insert("bits".to_string(), StoredValue::String("peanut".to_string()));
            fields
        });
        let first = apply_modifier(&StoredMap::new(), &modifier).unwrap();
        let second = apply_modifier(&first, &modifier).unwrap();
        assert_eq!(
            lookup(&second, "bits").unwrap().as_array().unwrap().len(),
            2
        );
    }

    #[test]
    fn pop_front_and_back() {
        let base = doc_with(
            "bits",
            StoredValue::Array(vec![
                StoredValue::Int(1),
                StoredValue::Int(2),
                StoredValue::Int(3),
            ]),
        );
        let front = Modifier::pop({
            let mut fields = StoredMap::new();
            fields.insert("bits".to_string(), StoredValue::Int(-1));
            fields
        });
        let popped = apply_modifier(&base, &front).unwrap();
        assert_eq!(
            lookup(&popped, "bits").unwrap().as_array().unwrap()[0],
            StoredValue::Int(2)
        );

        let back = Modifier::pop({
            let mut fields = StoredMap::new();
            fields.insert("bits".to_string(), StoredValue::Int(1));
            fields
        });
        let popped = apply_modifier(&base, &back).unwrap();
        assert_eq!(
            lookup(&popped, "bits").unwrap().as_array().unwrap().len(),
            2
        );
    }

    #[test]
    fn pop_on_missing_field_is_a_no_op() {
        let modifier = Modifier::pop({
            let mut fields = StoredMap::new();
            fields.insert("bits".to_string(), StoredValue::Int(-1));
            fields
        });
        let updated = apply_modifier(&StoredMap::new(), &modifier).unwrap();
        assert!(updated.is_empty());
    }

    #[test]
    fn matches_equality_and_membership() {
        let doc = doc_with("color", StoredValue::String("red".to_string()));
        let mut filter = StoredMap::new();
        filter.insert("color".to_string(), StoredValue::String("red".to_string()));
        assert!(matches(&doc, &filter).unwrap());

        let doc = doc_with(
            "bits",
            StoredValue::Array(vec![StoredValue::String("peanut".to_string())]),
        );
        let mut filter = StoredMap::new();
        filter.insert("bits".to_string(), StoredValue::String("peanut".to_string()));
        assert!(matches(&doc, &filter).unwrap());
    }

    #[test]
    fn matches_regex_against_strings() {
        let doc = doc_with("flavor", StoredValue::String("butterscotch".to_string()));
        let mut filter = StoredMap::new();
        filter.insert("flavor".to_string(), StoredValue::Regex("^butter".to_string()));
        assert!(matches(&doc, &filter).unwrap());

        let mut filter = StoredMap::new();
        filter.insert("flavor".to_string(), StoredValue::Regex("^mint".to_string()));
        assert!(!matches(&doc, &filter).unwrap());
    }

    #[test]
    fn missing_field_matches_null_only() {
        let doc = StoredMap::new();
        let mut filter = StoredMap::new();
        filter.insert("color".to_string(), StoredValue::Null);
        assert!(matches(&doc, &filter).unwrap());

        let mut filter = StoredMap::new();
        filter.insert("color".to_string(), StoredValue::Int(1));
        assert!(!matches(&doc, &filter).unwrap());
    }

    #[test]
    fn projection_keeps_id_and_requested_paths() {
        let mut doc = doc_with("filling.flavor", StoredValue::String("nougat".to_string()));
        doc.insert("color".to_string(), StoredValue::String("red".to_string()));
        doc.insert(
            DOC_ID.to_string(),
            StoredValue::Id(crate::store::DocId::from_value(7)),
        );

        let projected = project(&doc, &["filling.flavor".to_string()]);
        assert!(projected.contains_key(DOC_ID));
        assert_eq!(
            lookup(&projected, "filling.flavor").unwrap(),
            StoredValue::String("nougat".to_string())
        );
        assert!(!projected.contains_key("color"));
    }

    #[test]
    fn documents_order_by_sort_spec() {
        let light = doc_with("weight", StoredValue::Float(-5.0));
        let heavy = doc_with("weight", StoredValue::Float(11.8));
        let mut sort = SortSpec::new();
        sort.apply(("weight", SortOrder::Descending).into_terms())
            .unwrap();
        assert_eq!(order_documents(&heavy, &light, &sort), Ordering::Less);
    }
}
