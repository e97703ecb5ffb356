//! # Error Definitions
//!
//! Every failure the value layer can report while turning wire data into typed
//! values. Errors carry a [`Path`] to the offending field so a bad argument deep
//! inside a nested record is reported where it happened.
//!
//! ## Classes
//! - **Type errors** (`TypeMismatch`, `MissingField`, `OutOfRange`): the data
//!   does not have the shape the schema asks for.
//! - **Unknown variants**: an enum or variant discriminant outside the known set.
//! - **Integrity errors**: a variant whose payload slots disagree with its
//!   discriminant.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;

use rmpv::Value;

/// One step in a path from the root value to the failing one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(Cow<'static, str>),
    Index(usize),
    Key(String),
}

impl Segment {
    pub fn field(name: &'static str) -> Self {
        Self::Field(Cow::Borrowed(name))
    }
}

/// Location of a value inside a decoded tree, root first.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Path(VecDeque<Segment>);

impl Path {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn is_root(&self) -> bool {
        self.0.is_empty()
    }

    pub fn segments(&self) -> impl Iterator<Item = &Segment> {
        self.0.iter()
    }

    fn push_front(&mut self, segment: Segment) {
        self.0.push_front(segment);
    }
}

impl fmt::Display for Path {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            return write!(f, "<root>");
        }
        for (i, segment) in self.0.iter().enumerate() {
            match segment {
                Segment::Field(name) if i == 0 => write!(f, "{}", name)?,
                Segment::Field(name) => write!(f, ".{}", name)?,
                Segment::Index(index) => write!(f, "[{}]", index)?,
                Segment::Key(key) => write!(f, "[{:?}]", key)?,
            }
        }
        Ok(())
    }
}

/// The shape of a wire value as actually received.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shape {
    Nil,
    Bool,
    Int,
    Float,
    Str,
    Bin,
    Array(usize),
    Map(usize),
    Ext,
}

impl Shape {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Nil => Self::Nil,
            Value::Boolean(_) => Self::Bool,
            Value::Integer(_) => Self::Int,
            Value::F32(_) | Value::F64(_) => Self::Float,
            Value::String(_) => Self::Str,
            Value::Binary(_) => Self::Bin,
            Value::Array(items) => Self::Array(items.len()),
            Value::Map(entries) => Self::Map(entries.len()),
            Value::Ext(..) => Self::Ext,
        }
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Nil => write!(f, "nil"),
            Self::Bool => write!(f, "bool"),
            Self::Int => write!(f, "integer"),
            Self::Float => write!(f, "float"),
            Self::Str => write!(f, "string"),
            Self::Bin => write!(f, "binary"),
            Self::Array(len) => write!(f, "array of {}", len),
            Self::Map(len) => write!(f, "map of {}", len),
            Self::Ext => write!(f, "extension"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    #[error("type mismatch at {path}: expected {expected}, found {found}")]
    TypeMismatch {
        path: Path,
        expected: Cow<'static, str>,
        found: Shape,
    },

    #[error("missing field '{field}' of {record} at {path}")]
    MissingField {
        path: Path,
        record: &'static str,
        field: &'static str,
    },

    #[error("integer {value} at {path} does not fit in {target}")]
    OutOfRange {
        path: Path,
        target: &'static str,
        value: String,
    },

    #[error("unknown {type_name} discriminant {value} at {path}")]
    UnknownVariant {
        path: Path,
        type_name: &'static str,
        value: i64,
    },

    #[error("integrity violation in {type_name} at {path}: {detail}")]
    Integrity {
        path: Path,
        type_name: &'static str,
        detail: String,
    },

    #[error("codec error: {0}")]
    Codec(String),
}

impl Error {
    /// A mismatch between the expected shape and the value actually present.
    pub fn mismatch(expected: impl Into<Cow<'static, str>>, found: &Value) -> Self {
        Self::TypeMismatch {
            path: Path::root(),
            expected: expected.into(),
            found: Shape::of(found),
        }
    }

    pub fn missing(record: &'static str, field: &'static str) -> Self {
        Self::MissingField {
            path: Path::root(),
            record,
            field,
        }
    }

    pub fn out_of_range(target: &'static str, value: impl fmt::Display) -> Self {
        Self::OutOfRange {
            path: Path::root(),
            target,
            value: value.to_string(),
        }
    }

    pub fn unknown_variant(type_name: &'static str, value: i64) -> Self {
        Self::UnknownVariant {
            path: Path::root(),
            type_name,
            value,
        }
    }

    pub fn integrity(type_name: &'static str, detail: impl Into<String>) -> Self {
        Self::Integrity {
            path: Path::root(),
            type_name,
            detail: detail.into(),
        }
    }

    /// Prefixes the error location with `segment`.
    ///
    /// Errors are built at the leaf that failed and pick up their path while
    /// unwinding through the enclosing records, arrays and maps.
    pub fn within(mut self, segment: Segment) -> Self {
        if let Some(path) = self.path_mut() {
            path.push_front(segment);
        }
        self
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            Self::TypeMismatch { path, .. }
            | Self::MissingField { path, .. }
            | Self::OutOfRange { path, .. }
            | Self::UnknownVariant { path, .. }
            | Self::Integrity { path, .. } => Some(path),
            Self::Codec(_) => None,
        }
    }

    fn path_mut(&mut self) -> Option<&mut Path> {
        match self {
            Self::TypeMismatch { path, .. }
            | Self::MissingField { path, .. }
            | Self::OutOfRange { path, .. }
            | Self::UnknownVariant { path, .. }
            | Self::Integrity { path, .. } => Some(path),
            Self::Codec(_) => None,
        }
    }

    /// True when the data does not match the declared type.
    pub fn is_type_error(&self) -> bool {
        matches!(
            self,
            Self::TypeMismatch { .. } | Self::MissingField { .. } | Self::OutOfRange { .. }
        )
    }

    pub fn is_unknown_variant(&self) -> bool {
        matches!(self, Self::UnknownVariant { .. })
    }

    pub fn is_integrity(&self) -> bool {
        matches!(self, Self::Integrity { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
