//! # Status
//!
//! The error value a peer sends back in the error slot of a response. Handler
//! failures travel as a `Status` unmodified; dispatch failures are mapped onto
//! one with a framework code.

use std::fmt;

use tagpack::Value;
use tagpack::Wire;

tagpack::wire_record! {
    /// Extra context attached to a status.
    #[derive(Default, Eq)]
    pub struct StatusField {
        pub key: String = "key",
        pub value: String = "value",
    }
}

tagpack::wire_record! {
    #[derive(Default, Eq)]
    pub struct Status {
        pub code: i64 = "code",
        pub name: String = "name",
        pub desc: String = "desc",
        pub fields: Vec<StatusField> = "fields" (omitempty),
    }
}

impl Status {
    pub const GENERIC: i64 = 1;
    pub const METHOD_NOT_FOUND: i64 = 2;
    pub const PROTOCOL_NOT_FOUND: i64 = 3;
    pub const BAD_ARGUMENTS: i64 = 4;
    pub const INTEGRITY: i64 = 5;
    pub const CANCELLED: i64 = 6;

    pub fn new(code: i64, name: impl Into<String>, desc: impl Into<String>) -> Self {
        Self {
            code,
            name: name.into(),
            desc: desc.into(),
            fields: Vec::new(),
        }
    }

    pub fn generic(desc: impl Into<String>) -> Self {
        Self::new(Self::GENERIC, "GENERIC", desc)
    }

    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.fields.push(StatusField {
            key: key.into(),
            value: value.into(),
        });
        self
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map(|f| f.value.as_str())
    }

    /// Reads a status out of a response error slot.
    ///
    /// Peers that report errors in another shape still produce a status: the
    /// raw value is kept as the description.
    pub fn from_error_value(value: Value) -> Self {
        match Status::from_wire(value.clone()) {
            Ok(status) => status,
            Err(_) => match value.as_str() {
                Some(text) => Self::generic(text),
                None => Self::generic(value.to_string()),
            },
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}): {}", self.name, self.code, self.desc)
    }
}

impl std::error::Error for Status {}
