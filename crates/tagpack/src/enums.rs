//! Integer enums with canonical names.
//!
//! Discriminants and plain enum fields are integers on the wire. Each value
//! also has an upper-case name used for display and parsing.

/// Defines an integer enum with its wire encoding and name table.
///
/// Decoding an integer that names no value fails with `UnknownVariant`.
///
/// ```
/// tagpack::wire_enum! {
///     pub enum Team {
///         Kbfs = 1 => "KBFS",
///         Chat = 2 => "CHAT",
///     }
/// }
///
/// assert_eq!(Team::Chat.as_i64(), 2);
/// assert_eq!(Team::from_i64(1), Some(Team::Kbfs));
/// assert_eq!(Team::Chat.to_string(), "CHAT");
/// ```
#[macro_export]
macro_rules! wire_enum {
    (
        $(#[$meta:meta])*
        $vis:vis enum $name:ident {
            $(
                $(#[$vmeta:meta])*
                $variant:ident = $value:literal => $label:literal
            ),* $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        $vis enum $name {
            $(
                $(#[$vmeta])*
                $variant = $value,
            )*
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),*];

            pub const fn as_i64(self) -> i64 {
                self as i64
            }

            pub const fn from_i64(value: i64) -> Option<Self> {
                match value {
                    $( $value => Some($name::$variant), )*
                    _ => None,
                }
            }

            pub const fn name(self) -> &'static str {
                match self {
                    $( $name::$variant => $label, )*
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.name())
            }
        }

        impl std::str::FromStr for $name {
            type Err = $crate::Error;

            fn from_str(s: &str) -> $crate::Result<Self> {
                match s {
                    $( $label => Ok($name::$variant), )*
                    _ => Err($crate::Error::mismatch(
                        concat!("name of ", stringify!($name)),
                        &$crate::Value::from(s),
                    )),
                }
            }
        }

        impl $crate::Wire for $name {
            const NAME: &'static str = stringify!($name);

            fn to_wire(&self) -> $crate::Value {
                $crate::Value::from(self.as_i64())
            }

            fn from_wire(value: $crate::Value) -> $crate::Result<Self> {
                let raw = <i64 as $crate::Wire>::from_wire(value)?;
                Self::from_i64(raw).ok_or_else(|| $crate::Error::unknown_variant(stringify!($name), raw))
            }
        }

        impl $crate::DeepCopy for $name {
            fn deep_copy(&self) -> Self {
                *self
            }
        }
    };
}
