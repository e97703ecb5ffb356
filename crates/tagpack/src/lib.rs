//! # Tagpack
//!
//! Typed values over msgpack for generated service bindings.
//!
//! - [`Wire`]: schema-driven conversion to and from `rmpv::Value`.
//! - [`DeepCopy`]: fully independent copies of records and variants.
//! - [`wire_record!`], [`wire_newtype!`], [`wire_enum!`], [`wire_variant!`]:
//!   the glue an IDL compiler emits for each declared type.

pub mod codec;
pub mod copy;
pub mod enums;
pub mod error;
pub mod record;
pub mod variant;
pub mod wire;

pub use copy::DeepCopy;
pub use error::Error;
pub use error::Path;
pub use error::Result;
pub use error::Segment;
pub use error::Shape;
pub use rmpv::Value;
pub use variant::Case;
pub use variant::RawVariant;
pub use variant::UnknownDiscriminant;
pub use variant::VariantSchema;
pub use wire::Bytes;
pub use wire::Wire;
