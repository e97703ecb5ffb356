//! # Error Definitions
//!
//! Failures of the dispatch and invocation layers. Local errors that must
//! cross the wire are turned into a [`Status`] by [`Error::to_status`].

use crate::protocol::MethodKind;
use crate::status::Status;
use crate::transport::TransportError;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum Error {
    /// Inbound arguments did not decode as the method's argument type.
    #[error("bad arguments for {method}: {source}")]
    BadArguments {
        method: String,
        source: tagpack::Error,
    },

    /// A response did not decode as the method's declared result type.
    #[error("unexpected result from {method}: {source}")]
    Protocol {
        method: String,
        source: tagpack::Error,
    },

    #[error("protocol '{0}' is not registered")]
    ProtocolNotFound(String),

    #[error("method '{method}' not found in protocol '{protocol}'")]
    MethodNotFound { protocol: String, method: String },

    /// A request for a notification method, or a notification for a call.
    #[error("method '{method}' is registered as {kind:?}")]
    WrongKind { method: String, kind: MethodKind },

    #[error("protocol '{0}' registered twice")]
    DuplicateProtocol(String),

    #[error("method '{method}' registered twice in protocol '{protocol}'")]
    DuplicateMethod { protocol: String, method: String },

    /// The handler on this side failed.
    #[error("handler failed: {0}")]
    Handler(Status),

    /// The peer reported a failure.
    #[error("remote error: {0}")]
    Remote(Status),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("call cancelled")]
    Cancelled,

    /// A frame that is not a valid message.
    #[error("malformed message: {0}")]
    Malformed(String),

    #[error(transparent)]
    Wire(#[from] tagpack::Error),
}

impl Error {
    /// The status reported to a caller for this failure.
    pub fn to_status(&self) -> Status {
        match self {
            Self::Handler(status) | Self::Remote(status) => status.clone(),
            Self::BadArguments { source, .. } if source.is_integrity() => {
                Status::new(Status::INTEGRITY, "INTEGRITY", self.to_string())
            }
            Self::BadArguments { .. } => {
                Status::new(Status::BAD_ARGUMENTS, "BAD_ARGUMENTS", self.to_string())
            }
            Self::ProtocolNotFound(_) => {
                Status::new(Status::PROTOCOL_NOT_FOUND, "PROTOCOL_NOT_FOUND", self.to_string())
            }
            Self::MethodNotFound { .. } | Self::WrongKind { .. } => {
                Status::new(Status::METHOD_NOT_FOUND, "METHOD_NOT_FOUND", self.to_string())
            }
            Self::Cancelled => Status::new(Status::CANCELLED, "CANCELLED", self.to_string()),
            _ => Status::generic(self.to_string()),
        }
    }

    /// True for errors raised because inbound data had the wrong type.
    pub fn is_type_error(&self) -> bool {
        match self {
            Self::BadArguments { source, .. } | Self::Protocol { source, .. } => {
                source.is_type_error()
            }
            _ => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

impl From<Error> for Status {
    fn from(err: Error) -> Self {
        err.to_status()
    }
}
