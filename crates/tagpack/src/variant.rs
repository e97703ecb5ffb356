//! # Variants
//!
//! A variant is a tagged union carried over a wire that has no union type: a
//! map holding an integer discriminant field plus at most one payload field,
//! named for the active alternative.
//!
//! ```text
//! { "syncType": 1, "incremental": { ... } }
//! ```
//!
//! Typed code sees each variant as a closed Rust enum generated by
//! [`wire_variant!`](crate::wire_variant). The "discriminant plus optional
//! slots" shape exists only here, at the wire boundary, as [`RawVariant`].
//!
//! ## Invariants
//! - **Integrity**: the only populated known slot is the one the discriminant
//!   selects. A violation is an `Integrity` error, never a wrong value.
//! - **Forward Compatibility**: an unrecognised discriminant decodes to the
//!   enum's `Unknown` arm, keeping the raw value. It re-encodes unchanged.
//! - **Unknown Keys**: map keys that are neither the tag nor a known slot are
//!   ignored.

use std::fmt;

use rmpv::Value;

use crate::error::Error;
use crate::error::Result;
use crate::error::Segment;
use crate::wire::Wire;

/// One alternative of a variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Case {
    pub discriminant: i64,
    pub name: &'static str,
    /// Wire key of the payload, or `None` for payload-less alternatives.
    pub slot: Option<&'static str>,
}

/// Static description of a variant type.
#[derive(Debug)]
pub struct VariantSchema {
    pub name: &'static str,
    /// Wire key of the discriminant field.
    pub tag: &'static str,
    pub cases: &'static [Case],
}

impl VariantSchema {
    pub fn case(&self, discriminant: i64) -> Option<&Case> {
        self.cases.iter().find(|c| c.discriminant == discriminant)
    }

    fn slot_named(&self, key: &str) -> Option<&'static str> {
        self.cases
            .iter()
            .filter_map(|c| c.slot)
            .find(|slot| *slot == key)
    }
}

/// A discriminant this build does not know, as received.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct UnknownDiscriminant {
    type_name: &'static str,
    raw: i64,
}

impl UnknownDiscriminant {
    pub fn raw(&self) -> i64 {
        self.raw
    }

    pub fn to_error(&self) -> Error {
        Error::unknown_variant(self.type_name, self.raw)
    }
}

impl fmt::Display for UnknownDiscriminant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.type_name, self.raw)
    }
}

/// A variant map after shape checks, before the payload is decoded.
#[derive(Debug)]
pub struct RawVariant {
    schema: &'static VariantSchema,
    discriminant: i64,
    /// Known slots that carried a non-nil value.
    slots: Vec<(&'static str, Value)>,
}

impl RawVariant {
    pub fn from_wire(value: Value, schema: &'static VariantSchema) -> Result<Self> {
        let entries = match value {
            Value::Map(entries) => entries,
            other => return Err(Error::mismatch(schema.name, &other)),
        };

        let mut discriminant = None;
        let mut slots = Vec::new();
        for (key, value) in entries {
            let Some(key) = key.as_str() else {
                continue;
            };
            if key == schema.tag {
                let raw = i64::from_wire(value).map_err(|e| e.within(Segment::field(schema.tag)))?;
                discriminant = Some(raw);
            } else if let Some(slot) = schema.slot_named(key) {
                if !value.is_nil() {
                    slots.push((slot, value));
                }
            }
        }

        let discriminant = discriminant.ok_or_else(|| Error::missing(schema.name, schema.tag))?;
        Ok(Self {
            schema,
            discriminant,
            slots,
        })
    }

    /// The discriminant as received, without any validation.
    pub fn raw_discriminant(&self) -> i64 {
        self.discriminant
    }

    /// The validated discriminant.
    ///
    /// Fails with `UnknownVariant` when no alternative has this discriminant and
    /// with `Integrity` when the populated slots disagree with it.
    pub fn discriminant(&self) -> Result<i64> {
        let case = self
            .schema
            .case(self.discriminant)
            .ok_or_else(|| Error::unknown_variant(self.schema.name, self.discriminant))?;

        if let Some(slot) = case.slot {
            if !self.slots.iter().any(|(s, _)| *s == slot) {
                return Err(Error::integrity(
                    self.schema.name,
                    format!("{} selects '{}' but that slot is empty", case.name, slot),
                ));
            }
        }

        if let Some((stray, _)) = self.slots.iter().find(|(s, _)| Some(*s) != case.slot) {
            return Err(Error::integrity(
                self.schema.name,
                format!("'{}' is populated but the discriminant is {}", stray, case.name),
            ));
        }

        Ok(self.discriminant)
    }

    /// Decodes the payload held in `slot`.
    pub fn take<T: Wire>(&mut self, slot: &'static str) -> Result<T> {
        let index = self
            .slots
            .iter()
            .position(|(s, _)| *s == slot)
            .ok_or_else(|| Error::integrity(self.schema.name, format!("slot '{}' is empty", slot)))?;
        let (_, value) = self.slots.swap_remove(index);
        T::from_wire(value).map_err(|e| e.within(Segment::field(slot)))
    }

    pub fn into_unknown(self) -> UnknownDiscriminant {
        UnknownDiscriminant {
            type_name: self.schema.name,
            raw: self.discriminant,
        }
    }

    /// Builds the wire map for one alternative.
    pub fn encode(
        schema: &VariantSchema,
        discriminant: i64,
        payload: Option<(&'static str, Value)>,
    ) -> Value {
        let mut entries = Vec::with_capacity(2);
        entries.push((Value::from(schema.tag), Value::from(discriminant)));
        if let Some((slot, value)) = payload {
            entries.push((Value::from(slot), value));
        }
        Value::Map(entries)
    }
}

/// Defines a variant enum over a discriminant enum made with
/// [`wire_enum!`](crate::wire_enum).
///
/// Arms are named after the discriminant values they stand for. Arms with a
/// payload name its type and its wire slot. An `Unknown` arm is added for
/// discriminants this build does not know.
///
/// ```
/// tagpack::wire_enum! {
///     pub enum Kind {
///         Empty = 0 => "EMPTY",
///         Text = 1 => "TEXT",
///     }
/// }
///
/// tagpack::wire_variant! {
///     pub enum Body: Kind = "kind" {
///         Empty,
///         Text(String) = "text",
///     }
/// }
///
/// let body = Body::Text("hi".into());
/// assert_eq!(body.discriminant().unwrap(), Kind::Text);
/// ```
#[macro_export]
macro_rules! wire_variant {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident : $disc:ident = $tag:literal {
            $(
                $(#[$ameta:meta])*
                $arm:ident $( ( $payload:ty ) = $slot:literal )?
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq)]
        $vis enum $name {
            $(
                $(#[$ameta])*
                $arm $( ($payload) )?,
            )*
            /// A discriminant this build does not know.
            Unknown($crate::UnknownDiscriminant),
        }

        impl $name {
            pub const SCHEMA: $crate::VariantSchema = $crate::VariantSchema {
                name: stringify!($name),
                tag: $tag,
                cases: &[
                    $(
                        $crate::Case {
                            discriminant: $disc::$arm.as_i64(),
                            name: $disc::$arm.name(),
                            slot: $crate::__wire_variant!(@slot $($slot)?),
                        },
                    )*
                ],
            };

            /// The active alternative, or `UnknownVariant` for the `Unknown` arm.
            pub fn discriminant(&self) -> $crate::Result<$disc> {
                match self {
                    $( $crate::__wire_variant!(@pat $name, $arm, _payload $(, $slot)?) => Ok($disc::$arm), )*
                    $name::Unknown(unknown) => Err(unknown.to_error()),
                }
            }

            pub fn is_unknown(&self) -> bool {
                matches!(self, $name::Unknown(_))
            }
        }

        impl $crate::Wire for $name {
            const NAME: &'static str = stringify!($name);

            fn to_wire(&self) -> $crate::Value {
                match self {
                    $(
                        $crate::__wire_variant!(@pat $name, $arm, payload $(, $slot)?) => $crate::RawVariant::encode(
                            &Self::SCHEMA,
                            $disc::$arm.as_i64(),
                            $crate::__wire_variant!(@payload payload $(, $slot)?),
                        ),
                    )*
                    $name::Unknown(unknown) => $crate::RawVariant::encode(&Self::SCHEMA, unknown.raw(), None),
                }
            }

            #[allow(unused_mut)]
            fn from_wire(value: $crate::Value) -> $crate::Result<Self> {
                static SCHEMA: $crate::VariantSchema = $name::SCHEMA;
                let mut raw = $crate::RawVariant::from_wire(value, &SCHEMA)?;
                let discriminant = match raw.discriminant() {
                    Ok(discriminant) => discriminant,
                    Err(e) if e.is_unknown_variant() => return Ok($name::Unknown(raw.into_unknown())),
                    Err(e) => return Err(e),
                };
                $(
                    if discriminant == $disc::$arm.as_i64() {
                        return Ok($crate::__wire_variant!(@decode raw, $name, $arm $(, $slot)?));
                    }
                )*
                Ok($name::Unknown(raw.into_unknown()))
            }
        }

        impl $crate::DeepCopy for $name {
            fn deep_copy(&self) -> Self {
                match self {
                    $( $crate::__wire_variant!(@pat $name, $arm, payload $(, $slot)?) => $crate::__wire_variant!(@copy payload, $name, $arm $(, $slot)?), )*
                    $name::Unknown(unknown) => $name::Unknown(*unknown),
                }
            }
        }
    };
}

#[doc(hidden)]
#[macro_export]
macro_rules! __wire_variant {
    (@slot) => {
        None
    };
    (@slot $slot:literal) => {
        Some($slot)
    };
    (@pat $name:ident, $arm:ident, $bind:ident) => {
        $name::$arm
    };
    (@pat $name:ident, $arm:ident, $bind:ident, $slot:literal) => {
        $name::$arm($bind)
    };
    (@payload $bind:ident) => {
        None
    };
    (@payload $bind:ident, $slot:literal) => {
        Some(($slot, $crate::Wire::to_wire($bind)))
    };
    (@decode $raw:ident, $name:ident, $arm:ident) => {
        $name::$arm
    };
    (@decode $raw:ident, $name:ident, $arm:ident, $slot:literal) => {
        $name::$arm($raw.take($slot)?)
    };
    (@copy $bind:ident, $name:ident, $arm:ident) => {
        $name::$arm
    };
    (@copy $bind:ident, $name:ident, $arm:ident, $slot:literal) => {
        $name::$arm($crate::DeepCopy::deep_copy($bind))
    };
}
