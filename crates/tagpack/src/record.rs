//! # Records
//!
//! Structural values travel as msgpack maps keyed by field name.
//!
//! ## Invariants
//! - **Unknown Fields**: keys the schema does not name are ignored on decode.
//! - **Required Fields**: a missing field is a `MissingField` type error unless
//!   its type has an [`absent`](crate::Wire::absent) value (collections,
//!   optionals).
//! - **Wire-Optional Fields**: `omitempty` fields are left off the map when they
//!   hold their default and decode to the default when missing. Never nil.

use rmpv::Value;

use crate::error::Error;
use crate::error::Result;
use crate::error::Segment;
use crate::wire::Wire;

/// Fields of a received record, consumed one key at a time.
pub struct Fields {
    record: &'static str,
    entries: Vec<(Value, Value)>,
}

impl Fields {
    pub fn from_wire(value: Value, record: &'static str) -> Result<Self> {
        match value {
            Value::Map(entries) => Ok(Self { record, entries }),
            other => Err(Error::mismatch(record, &other)),
        }
    }

    fn remove(&mut self, key: &str) -> Option<Value> {
        let index = self
            .entries
            .iter()
            .position(|(k, _)| k.as_str() == Some(key))?;
        Some(self.entries.swap_remove(index).1)
    }

    /// Takes a required field.
    pub fn take<T: Wire>(&mut self, key: &'static str) -> Result<T> {
        match self.remove(key) {
            Some(value) => T::from_wire(value).map_err(|e| e.within(Segment::field(key))),
            None => T::absent().ok_or_else(|| Error::missing(self.record, key)),
        }
    }

    /// Takes a wire-optional field, defaulting when it is missing.
    pub fn take_or_default<T: Wire + Default>(&mut self, key: &'static str) -> Result<T> {
        match self.remove(key) {
            Some(value) => T::from_wire(value).map_err(|e| e.within(Segment::field(key))),
            None => Ok(T::default()),
        }
    }

    /// Keys left over after every known field was taken.
    pub fn unknown_keys(&self) -> impl Iterator<Item = &Value> {
        self.entries.iter().map(|(k, _)| k)
    }
}

/// Builds the map for an outgoing record.
#[derive(Default)]
pub struct RecordEncoder {
    entries: Vec<(Value, Value)>,
}

impl RecordEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field<T: Wire>(&mut self, key: &'static str, value: &T) -> &mut Self {
        self.entries.push((Value::from(key), value.to_wire()));
        self
    }

    /// Writes the field unless it holds its default.
    pub fn optional_field<T: Wire>(&mut self, key: &'static str, value: &T) -> &mut Self {
        if !value.is_wire_default() {
            self.field(key, value);
        }
        self
    }

    pub fn finish(self) -> Value {
        Value::Map(self.entries)
    }
}

/// Defines a record type with its wire encoding and deep copy.
///
/// Each field names its wire key; `(omitempty)` marks it wire-optional.
///
/// ```
/// tagpack::wire_record! {
///     /// A key/value pair.
///     pub struct Pair {
///         pub key: String = "key",
///         pub value: String = "value" (omitempty),
///     }
/// }
/// ```
#[macro_export]
macro_rules! wire_record {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident {
            $(
                $(#[$fmeta:meta])*
                $fvis:vis $field:ident : $ty:ty = $key:literal $( ( $flag:ident ) )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis struct $name {
            $(
                $(#[$fmeta])*
                $fvis $field: $ty,
            )*
        }

        impl $crate::Wire for $name {
            const NAME: &'static str = stringify!($name);

            #[allow(unused_mut)]
            fn to_wire(&self) -> $crate::Value {
                let mut enc = $crate::record::RecordEncoder::new();
                $( $crate::__wire_field!(@encode enc, self.$field, $key $(, $flag)?); )*
                enc.finish()
            }

            #[allow(unused_mut, unused_variables)]
            fn from_wire(value: $crate::Value) -> $crate::Result<Self> {
                let mut fields = $crate::record::Fields::from_wire(value, stringify!($name))?;
                Ok(Self {
                    $( $field: $crate::__wire_field!(@decode fields, $key $(, $flag)?), )*
                })
            }
        }

        impl $crate::DeepCopy for $name {
            fn deep_copy(&self) -> Self {
                Self {
                    $( $field: $crate::DeepCopy::deep_copy(&self.$field), )*
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __wire_field {
    (@encode $enc:ident, $value:expr, $key:literal) => {
        $enc.field($key, &$value)
    };
    (@encode $enc:ident, $value:expr, $key:literal, omitempty) => {
        $enc.optional_field($key, &$value)
    };
    (@decode $fields:ident, $key:literal) => {
        $fields.take($key)?
    };
    (@decode $fields:ident, $key:literal, omitempty) => {
        $fields.take_or_default($key)?
    };
}

/// Defines a single-field wrapper that encodes exactly like its inner type.
///
/// ```
/// tagpack::wire_newtype! {
///     /// A user id.
///     #[derive(Eq, Hash)]
///     pub struct Uid(pub String);
/// }
/// ```
#[macro_export]
macro_rules! wire_newtype {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident($ivis:vis $inner:ty);
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq)]
        $vis struct $name($ivis $inner);

        impl $crate::Wire for $name {
            const NAME: &'static str = stringify!($name);

            fn to_wire(&self) -> $crate::Value {
                $crate::Wire::to_wire(&self.0)
            }

            fn from_wire(value: $crate::Value) -> $crate::Result<Self> {
                <$inner as $crate::Wire>::from_wire(value).map(Self)
            }

            fn absent() -> Option<Self> {
                <$inner as $crate::Wire>::absent().map(Self)
            }

            fn is_wire_default(&self) -> bool {
                $crate::Wire::is_wire_default(&self.0)
            }
        }

        impl $crate::DeepCopy for $name {
            fn deep_copy(&self) -> Self {
                Self($crate::DeepCopy::deep_copy(&self.0))
            }
        }

        impl From<$inner> for $name {
            fn from(inner: $inner) -> Self {
                Self(inner)
            }
        }
    };
}
