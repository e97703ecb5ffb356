//! # Wire Conversion
//!
//! The [`Wire`] trait converts typed values to and from the schemaless msgpack
//! value tree. Decoding is schema-driven: every impl knows the shape it expects
//! and reports a structured [`Error`] carrying expected and actual shapes when
//! the data disagrees.
//!
//! ## Invariants
//! - **Panic Safety**: `from_wire` never panics on arbitrary input.
//! - **Nil Collections**: `Vec`, `HashMap` and [`Bytes`] decode nil as empty.
//! - **Absent Fields**: `absent()` names the value a type takes when its field
//!   is missing from a record. Types without one make the field required.

use std::collections::HashMap;
use std::hash::Hash;

use rmpv::Value;

use crate::error::Error;
use crate::error::Result;
use crate::error::Segment;

/// A type with a msgpack wire representation.
pub trait Wire: Sized {
    /// Name used for this type in type errors.
    const NAME: &'static str;

    fn to_wire(&self) -> Value;

    fn from_wire(value: Value) -> Result<Self>;

    /// The value a missing record field decodes to, if the field may be missing.
    fn absent() -> Option<Self> {
        None
    }

    /// Whether an `omitempty` field holding this value is left off the wire.
    fn is_wire_default(&self) -> bool {
        false
    }
}

/// Scalars and their names, passed to the callback macro.
macro_rules! for_each_unsigned {
    ($m:ident) => {
        $m!(u8);
        $m!(u16);
        $m!(u32);
        $m!(u64);
        $m!(usize);
    };
}

macro_rules! for_each_signed {
    ($m:ident) => {
        $m!(i8);
        $m!(i16);
        $m!(i32);
        $m!(i64);
    };
}

macro_rules! wire_unsigned {
    ($ty:ident) => {
        impl Wire for $ty {
            const NAME: &'static str = stringify!($ty);

            fn to_wire(&self) -> Value {
                Value::from(*self as u64)
            }

            fn from_wire(value: Value) -> Result<Self> {
                let int = match value {
                    Value::Integer(int) => int,
                    other => return Err(Error::mismatch(Self::NAME, &other)),
                };
                int.as_u64()
                    .and_then(|v| $ty::try_from(v).ok())
                    .ok_or_else(|| Error::out_of_range(Self::NAME, Value::Integer(int)))
            }

            fn is_wire_default(&self) -> bool {
                *self == 0
            }
        }
    };
}

macro_rules! wire_signed {
    ($ty:ident) => {
        impl Wire for $ty {
            const NAME: &'static str = stringify!($ty);

            fn to_wire(&self) -> Value {
                Value::from(*self as i64)
            }

            fn from_wire(value: Value) -> Result<Self> {
                let int = match value {
                    Value::Integer(int) => int,
                    other => return Err(Error::mismatch(Self::NAME, &other)),
                };
                int.as_i64()
                    .and_then(|v| $ty::try_from(v).ok())
                    .ok_or_else(|| Error::out_of_range(Self::NAME, Value::Integer(int)))
            }

            fn is_wire_default(&self) -> bool {
                *self == 0
            }
        }
    };
}

for_each_unsigned!(wire_unsigned);
for_each_signed!(wire_signed);

impl Wire for bool {
    const NAME: &'static str = "bool";

    fn to_wire(&self) -> Value {
        Value::Boolean(*self)
    }

    fn from_wire(value: Value) -> Result<Self> {
        match value {
            Value::Boolean(b) => Ok(b),
            other => Err(Error::mismatch(Self::NAME, &other)),
        }
    }

    fn is_wire_default(&self) -> bool {
        !*self
    }
}

impl Wire for f64 {
    const NAME: &'static str = "f64";

    fn to_wire(&self) -> Value {
        Value::F64(*self)
    }

    fn from_wire(value: Value) -> Result<Self> {
        match value {
            Value::F64(v) => Ok(v),
            Value::F32(v) => Ok(f64::from(v)),
            Value::Integer(int) => int
                .as_f64()
                .ok_or_else(|| Error::out_of_range(Self::NAME, Value::Integer(int))),
            other => Err(Error::mismatch(Self::NAME, &other)),
        }
    }

    fn is_wire_default(&self) -> bool {
        *self == 0.0
    }
}

impl Wire for f32 {
    const NAME: &'static str = "f32";

    fn to_wire(&self) -> Value {
        Value::F32(*self)
    }

    fn from_wire(value: Value) -> Result<Self> {
        f64::from_wire(value).map(|v| v as f32)
    }

    fn is_wire_default(&self) -> bool {
        *self == 0.0
    }
}

impl Wire for String {
    const NAME: &'static str = "string";

    fn to_wire(&self) -> Value {
        Value::from(self.as_str())
    }

    fn from_wire(value: Value) -> Result<Self> {
        match value {
            // Invalid utf-8 is reported as the raw bytes it really is.
            Value::String(s) => s
                .into_str()
                .ok_or_else(|| Error::mismatch("utf-8 string", &Value::Binary(Vec::new()))),
            other => Err(Error::mismatch(Self::NAME, &other)),
        }
    }

    fn is_wire_default(&self) -> bool {
        self.is_empty()
    }
}

/// The result type of a method that returns nothing; nil on the wire.
impl Wire for () {
    const NAME: &'static str = "nil";

    fn to_wire(&self) -> Value {
        Value::Nil
    }

    fn from_wire(value: Value) -> Result<Self> {
        match value {
            Value::Nil => Ok(()),
            other => Err(Error::mismatch(Self::NAME, &other)),
        }
    }
}

/// Untyped passthrough.
impl Wire for Value {
    const NAME: &'static str = "any";

    fn to_wire(&self) -> Value {
        self.clone()
    }

    fn from_wire(value: Value) -> Result<Self> {
        Ok(value)
    }

    fn is_wire_default(&self) -> bool {
        self.is_nil()
    }
}

/// An opaque byte string, encoded as msgpack binary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Bytes(pub Vec<u8>);

impl Bytes {
    pub fn as_slice(&self) -> &[u8] {
        &self.0
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for Bytes {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

impl Wire for Bytes {
    const NAME: &'static str = "binary";

    fn to_wire(&self) -> Value {
        Value::Binary(self.0.clone())
    }

    fn from_wire(value: Value) -> Result<Self> {
        match value {
            Value::Binary(bytes) => Ok(Self(bytes)),
            Value::Nil => Ok(Self::default()),
            other => Err(Error::mismatch(Self::NAME, &other)),
        }
    }

    fn is_wire_default(&self) -> bool {
        self.0.is_empty()
    }
}

impl<T: Wire> Wire for Option<T> {
    const NAME: &'static str = T::NAME;

    fn to_wire(&self) -> Value {
        match self {
            Some(inner) => inner.to_wire(),
            None => Value::Nil,
        }
    }

    fn from_wire(value: Value) -> Result<Self> {
        match value {
            Value::Nil => Ok(None),
            other => T::from_wire(other).map(Some),
        }
    }

    fn absent() -> Option<Self> {
        Some(None)
    }

    fn is_wire_default(&self) -> bool {
        self.is_none()
    }
}

impl<T: Wire> Wire for Box<T> {
    const NAME: &'static str = T::NAME;

    fn to_wire(&self) -> Value {
        (**self).to_wire()
    }

    fn from_wire(value: Value) -> Result<Self> {
        T::from_wire(value).map(Box::new)
    }

    fn absent() -> Option<Self> {
        T::absent().map(Box::new)
    }

    fn is_wire_default(&self) -> bool {
        (**self).is_wire_default()
    }
}

impl<T: Wire> Wire for Vec<T> {
    const NAME: &'static str = "array";

    fn to_wire(&self) -> Value {
        Value::Array(self.iter().map(Wire::to_wire).collect())
    }

    fn from_wire(value: Value) -> Result<Self> {
        let items = match value {
            Value::Array(items) => items,
            Value::Nil => return Ok(Vec::new()),
            other => return Err(Error::mismatch(Self::NAME, &other)),
        };
        items
            .into_iter()
            .enumerate()
            .map(|(i, item)| T::from_wire(item).map_err(|e| e.within(Segment::Index(i))))
            .collect()
    }

    fn absent() -> Option<Self> {
        Some(Vec::new())
    }

    fn is_wire_default(&self) -> bool {
        self.is_empty()
    }
}

impl<K, V> Wire for HashMap<K, V>
where
    K: Wire + Eq + Hash,
    V: Wire,
{
    const NAME: &'static str = "map";

    fn to_wire(&self) -> Value {
        Value::Map(
            self.iter()
                .map(|(k, v)| (k.to_wire(), v.to_wire()))
                .collect(),
        )
    }

    fn from_wire(value: Value) -> Result<Self> {
        let entries = match value {
            Value::Map(entries) => entries,
            Value::Nil => return Ok(HashMap::new()),
            other => return Err(Error::mismatch(Self::NAME, &other)),
        };
        let mut map = HashMap::with_capacity(entries.len());
        for (key, value) in entries {
            let label = key_label(&key);
            let key = K::from_wire(key).map_err(|e| e.within(Segment::Key(label.clone())))?;
            let value = V::from_wire(value).map_err(|e| e.within(Segment::Key(label)))?;
            map.insert(key, value);
        }
        Ok(map)
    }

    fn absent() -> Option<Self> {
        Some(HashMap::new())
    }

    fn is_wire_default(&self) -> bool {
        self.is_empty()
    }
}

fn key_label(key: &Value) -> String {
    match key.as_str() {
        Some(s) => s.to_string(),
        None => key.to_string(),
    }
}
