use crate::common::Value;
use crate::document::{Document, ObjectId};
use crate::errors::{DocRepoError, DocRepoResult, ErrorKind};
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Two-way mapping between a Rust type and a stored [Value].
///
/// Entities, projections and grouping keys all travel through this trait. It is
/// usually derived with `#[derive(Convertible)]`.
pub trait Convertible {
    fn to_value(&self) -> DocRepoResult<Value>;

    fn from_value(value: &Value) -> DocRepoResult<Self>
    where
        Self: Sized;
}

pub(crate) fn mapping_error(value: &Value, expected: &str) -> DocRepoError {
    log::error!("Value {} is not {}", value, expected);
    DocRepoError::new(
        &format!("Value of type {} is not {}", value.type_name(), expected),
        ErrorKind::ObjectMappingError,
    )
}

macro_rules! impl_convertible_for_int {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl Convertible for $ty {
                fn to_value(&self) -> DocRepoResult<Value> {
                    Ok(Value::from(*self))
                }

                fn from_value(value: &Value) -> DocRepoResult<Self> {
                    let wide = match value {
                        Value::F64(f) if f.fract() == 0.0 => Some(*f as i64),
                        _ => value.as_i64(),
                    };
                    match wide {
                        Some(i) => <$ty>::try_from(i).map_err(|_| {
                            log::error!("Value {} is out of range for {}", value, $name);
                            DocRepoError::new(
                                &format!("Value {} is out of range for {}", i, $name),
                                ErrorKind::ObjectMappingError,
                            )
                        }),
                        None => Err(mapping_error(value, $name)),
                    }
                }
            }
        )*
    };
}

impl_convertible_for_int!(
    i8 => "an i8",
    u8 => "a u8",
    i16 => "an i16",
    u16 => "a u16",
    i32 => "an i32",
    u32 => "a u32",
);

impl Convertible for i64 {
    fn to_value(&self) -> DocRepoResult<Value> {
        Ok(Value::I64(*self))
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        match value {
            Value::F64(f) if f.fract() == 0.0 => Ok(*f as i64),
            _ => value.as_i64().ok_or_else(|| mapping_error(value, "an i64")),
        }
    }
}

impl Convertible for u64 {
    fn to_value(&self) -> DocRepoResult<Value> {
        match i64::try_from(*self) {
            Ok(i) => Ok(Value::I64(i)),
            Err(_) => {
                log::error!("u64 value {} does not fit a stored i64", self);
                Err(DocRepoError::new(
                    &format!("u64 value {} does not fit a stored i64", self),
                    ErrorKind::ObjectMappingError,
                ))
            }
        }
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        let i = i64::from_value(value)?;
        u64::try_from(i).map_err(|_| mapping_error(value, "a u64"))
    }
}

impl Convertible for usize {
    fn to_value(&self) -> DocRepoResult<Value> {
        (*self as u64).to_value()
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        let u = u64::from_value(value)?;
        usize::try_from(u).map_err(|_| mapping_error(value, "a usize"))
    }
}

impl Convertible for f32 {
    fn to_value(&self) -> DocRepoResult<Value> {
        Ok(Value::F64(*self as f64))
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        value
            .as_f64()
            .map(|f| f as f32)
            .ok_or_else(|| mapping_error(value, "an f32"))
    }
}

impl Convertible for f64 {
    fn to_value(&self) -> DocRepoResult<Value> {
        Ok(Value::F64(*self))
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        value.as_f64().ok_or_else(|| mapping_error(value, "an f64"))
    }
}

impl Convertible for bool {
    fn to_value(&self) -> DocRepoResult<Value> {
        Ok(Value::Bool(*self))
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        value.as_bool().ok_or_else(|| mapping_error(value, "a bool"))
    }
}

impl Convertible for char {
    fn to_value(&self) -> DocRepoResult<Value> {
        Ok(Value::String(self.to_string()))
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        match value.as_string() {
            Some(s) if s.chars().count() == 1 => s
                .chars()
                .next()
                .ok_or_else(|| mapping_error(value, "a char")),
            _ => Err(mapping_error(value, "a char")),
        }
    }
}

impl Convertible for String {
    fn to_value(&self) -> DocRepoResult<Value> {
        Ok(Value::String(self.clone()))
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        match value {
            Value::String(s) => Ok(s.clone()),
            Value::ObjectId(id) => Ok(id.to_hex()),
            _ => Err(mapping_error(value, "a string")),
        }
    }
}

impl Convertible for DateTime<Utc> {
    fn to_value(&self) -> DocRepoResult<Value> {
        Ok(Value::DateTime(*self))
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        match value {
            Value::DateTime(dt) => Ok(*dt),
            Value::String(s) => Ok(DateTime::parse_from_rfc3339(s)?.with_timezone(&Utc)),
            _ => Err(mapping_error(value, "a datetime")),
        }
    }
}

impl Convertible for ObjectId {
    fn to_value(&self) -> DocRepoResult<Value> {
        Ok(Value::ObjectId(*self))
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        match value {
            Value::ObjectId(id) => Ok(*id),
            Value::String(s) => ObjectId::parse_str(s),
            _ => Err(mapping_error(value, "an object id")),
        }
    }
}

impl Convertible for Uuid {
    fn to_value(&self) -> DocRepoResult<Value> {
        Ok(Value::String(self.hyphenated().to_string()))
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        match value {
            Value::String(s) => Uuid::parse_str(s).map_err(|err| {
                log::error!("Invalid uuid '{}': {}", s, err);
                DocRepoError::new(
                    &format!("Invalid uuid '{}': {}", s, err),
                    ErrorKind::ObjectMappingError,
                )
            }),
            _ => Err(mapping_error(value, "a uuid string")),
        }
    }
}

impl Convertible for Value {
    fn to_value(&self) -> DocRepoResult<Value> {
        Ok(self.clone())
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        Ok(value.clone())
    }
}

impl Convertible for Document {
    fn to_value(&self) -> DocRepoResult<Value> {
        Ok(Value::Document(self.clone()))
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        match value {
            Value::Document(doc) => Ok(doc.clone()),
            _ => Err(mapping_error(value, "a document")),
        }
    }
}

impl Convertible for () {
    fn to_value(&self) -> DocRepoResult<Value> {
        Ok(Value::Null)
    }

    fn from_value(_value: &Value) -> DocRepoResult<Self> {
        Ok(())
    }
}

impl<T: Convertible> Convertible for Option<T> {
    fn to_value(&self) -> DocRepoResult<Value> {
        match self {
            Some(v) => v.to_value(),
            None => Ok(Value::Null),
        }
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        match value {
            Value::Null => Ok(None),
            _ => T::from_value(value).map(Some),
        }
    }
}

impl<T: Convertible> Convertible for Box<T> {
    fn to_value(&self) -> DocRepoResult<Value> {
        self.as_ref().to_value()
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        T::from_value(value).map(Box::new)
    }
}

impl<T: Convertible> Convertible for Vec<T> {
    fn to_value(&self) -> DocRepoResult<Value> {
        let values = self
            .iter()
            .map(Convertible::to_value)
            .collect::<DocRepoResult<Vec<_>>>()?;
        Ok(Value::Array(values))
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        match value {
            Value::Array(items) => items.iter().map(T::from_value).collect(),
            Value::Null => Ok(Vec::new()),
            _ => Err(mapping_error(value, "an array")),
        }
    }
}

impl<T: Convertible> Convertible for BTreeMap<String, T> {
    fn to_value(&self) -> DocRepoResult<Value> {
        let mut doc = Document::new();
        for (key, value) in self {
            doc.put(key, value.to_value()?)?;
        }
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        match value {
            Value::Document(doc) => doc
                .iter()
                .map(|(k, v)| Ok((k.clone(), T::from_value(v)?)))
                .collect(),
            _ => Err(mapping_error(value, "a document map")),
        }
    }
}

impl<T: Convertible> Convertible for HashMap<String, T> {
    fn to_value(&self) -> DocRepoResult<Value> {
        let mut doc = Document::new();
        for (key, value) in self {
            doc.put(key, value.to_value()?)?;
        }
        Ok(Value::Document(doc))
    }

    fn from_value(value: &Value) -> DocRepoResult<Self> {
        match value {
            Value::Document(doc) => doc
                .iter()
                .map(|(k, v)| Ok((k.clone(), T::from_value(v)?)))
                .collect(),
            _ => Err(mapping_error(value, "a document map")),
        }
    }
}

macro_rules! impl_convertible_for_tuple {
    ($len:literal; $($name:ident : $idx:tt),+) => {
        impl<$($name: Convertible),+> Convertible for ($($name,)+) {
            fn to_value(&self) -> DocRepoResult<Value> {
                Ok(Value::Array(vec![$(self.$idx.to_value()?),+]))
            }

            fn from_value(value: &Value) -> DocRepoResult<Self> {
                match value {
                    Value::Array(items) if items.len() == $len => {
                        Ok(($($name::from_value(&items[$idx])?,)+))
                    }
                    _ => Err(mapping_error(value, concat!("a ", $len, "-tuple"))),
                }
            }
        }
    };
}

impl_convertible_for_tuple!(2; A: 0, B: 1);
impl_convertible_for_tuple!(3; A: 0, B: 1, C: 2);
