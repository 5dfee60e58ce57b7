use crate::common::{OpaqueObject, Value};
use crate::errors::{ErrorKind, PralineError, PralineResult};
use chrono::{DateTime, Utc};
use indexmap::IndexMap;

/// Custom storage conversion hook.
///
/// A type implementing `Convertible` decides its own [Value] representation;
/// the codec asks for it first and then re-dispatches on the produced value.
/// Primitives are implemented here so typed reads can pull them straight out
/// of a piece:
///
/// ```ignore
/// let licks = i64::from_value(&piece.get("licks")?)?;
/// ```
pub trait Convertible: Sized {
    fn to_value(&self) -> PralineResult<Value>;
    fn from_value(value: &Value) -> PralineResult<Self>;
}

fn mismatch(expected: &str, value: &Value) -> PralineError {
    log::error!("Value {} is not {}", value, expected);
    PralineError::new(
        &format!("Value is not {}", expected),
        ErrorKind::EncodingType,
    )
}

impl Convertible for bool {
    fn to_value(&self) -> PralineResult<Value> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: &Value) -> PralineResult<Self> {
        match value {
            Value::Bool(b) => Ok(*b),
            _ => Err(mismatch("a bool", value)),
        }
    }
}

impl Convertible for i32 {
    fn to_value(&self) -> PralineResult<Value> {
        Ok(Value::Int(*self as i64))
    }

    fn from_value(value: &Value) -> PralineResult<Self> {
        match value {
            Value::Int(i) => i32::try_from(*i).map_err(|_| mismatch("an i32", value)),
            _ => Err(mismatch("an i32", value)),
        }
    }
}

impl Convertible for i64 {
    fn to_value(&self) -> PralineResult<Value> {
        Ok(Value::Int(*self))
    }

    fn from_value(value: &Value) -> PralineResult<Self> {
        match value {
            Value::Int(i) => Ok(*i),
            _ => Err(mismatch("an i64", value)),
        }
    }
}

impl Convertible for f64 {
    fn to_value(&self) -> PralineResult<Value> {
        Ok(Value::Float(*self))
    }

    fn from_value(value: &Value) -> PralineResult<Self> {
        match value {
            Value::Float(x) => Ok(*x),
            Value::Int(i) => Ok(*i as f64),
            _ => Err(mismatch("a float", value)),
        }
    }
}

impl Convertible for String {
    fn to_value(&self) -> PralineResult<Value> {
        Ok(Value::String(self.clone()))
    }

    fn from_value(value: &Value) -> PralineResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            _ => Err(mismatch("a string", value)),
        }
    }
}

impl Convertible for DateTime<Utc> {
    fn to_value(&self) -> PralineResult<Value> {
        Ok(Value::Time(*self))
    }

    fn from_value(value: &Value) -> PralineResult<Self> {
        match value {
            Value::Time(t) => Ok(*t),
            _ => Err(mismatch("a timestamp", value)),
        }
    }
}

impl Convertible for crate::store::DocId {
    fn to_value(&self) -> PralineResult<Value> {
        Ok(Value::Id(*self))
    }

    fn from_value(value: &Value) -> PralineResult<Self> {
        match value {
            Value::Id(id) => Ok(*id),
            _ => Err(mismatch("a document id", value)),
        }
    }
}

impl<T: Convertible> Convertible for Option<T> {
    fn to_value(&self) -> PralineResult<Value> {
        match self {
            Some(inner) => inner.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: &Value) -> PralineResult<Self> {
        match value {
            Value::Null => Ok(None),
            other => Ok(Some(T::from_value(other)?)),
        }
    }
}

impl<T: Convertible> Convertible for Vec<T> {
    fn to_value(&self) -> PralineResult<Value> {
        let values = self
            .iter()
            .map(|item| item.to_value())
            .collect::<PralineResult<Vec<Value>>>()?;
        Ok(Value::from(values))
    }

    fn from_value(value: &Value) -> PralineResult<Self> {
        match value {
            Value::Array(array) => array
                .values()
                .iter()
                .map(T::from_value)
                .collect::<PralineResult<Vec<T>>>(),
            _ => Err(mismatch("an array", value)),
        }
    }
}

/// Opt-in serializable capability for arbitrary types.
///
/// A type implementing `Capture` names itself and returns a flat field map;
/// the codec stores it under the opaque-object envelope and restores it with
/// [`Capture::rebuild`]. This replaces any ambient reflection: only types
/// that opt in can ride along as opaque objects.
///
/// ```ignore
/// struct Missile { payload: String }
///
/// impl Capture for Missile {
///     fn class_name() -> &'static str { "Missile" }
///     fn capture(&self) -> PralineResult<IndexMap<String, Value>> {
///         let mut fields = IndexMap::new();
///         fields.insert("payload".to_string(), Value::from(self.payload.as_str()));
///         Ok(fields)
///     }
///     fn rebuild(fields: &IndexMap<String, Value>) -> PralineResult<Self> {
///         let payload = fields.get("payload").and_then(|v| v.as_str()).unwrap_or_default();
///         Ok(Missile { payload: payload.to_string() })
///     }
/// }
/// ```
pub trait Capture: Sized {
    /// The stored type name, written into the envelope's `class` slot.
    fn class_name() -> &'static str;

    /// The instance's fields, each already converted to a [Value].
    fn capture(&self) -> PralineResult<IndexMap<String, Value>>;

    /// Reconstructs an instance from a captured field map.
    fn rebuild(fields: &IndexMap<String, Value>) -> PralineResult<Self>;

    /// Wraps this instance as an opaque-object [Value].
    fn to_value(&self) -> PralineResult<Value> {
        Ok(Value::Object(OpaqueObject::new(
            Self::class_name(),
            self.capture()?,
        )))
    }

    /// Extracts a typed instance back out of an opaque-object [Value].
    ///
    /// Fails with [`ErrorKind::EncodingType`] when the value is not an opaque
    /// object or was captured from a different type.
    fn from_object(value: &Value) -> PralineResult<Self> {
        match value {
            Value::Object(object) if object.class() == Self::class_name() => {
                Self::rebuild(object.fields())
            }
            Value::Object(object) => {
                log::error!(
                    "Captured object is a {}, not a {}",
                    object.class(),
                    Self::class_name()
                );
                Err(PralineError::new(
                    &format!(
                        "Captured object is a {}, not a {}",
                        object.class(),
                        Self::class_name()
                    ),
                    ErrorKind::EncodingType,
                ))
            }
            other => Err(mismatch("an opaque object", other)),
        }
    }
}
