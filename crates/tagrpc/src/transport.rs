//! # Transport Contract
//!
//! What the invocation layer needs from whatever carries its messages: send a
//! named call and wait for its result, or send a named notification and move
//! on. Reconnection, framing and security belong to the implementor.

use std::fmt;
use std::time::Duration;

use tagpack::Value;

use crate::error::Result;

/// Errors that occur at the network/transport layer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The peer is unreachable or the connection was dropped.
    ConnectionLost(String),
    /// No response arrived before the deadline.
    Timeout,
    /// The payload exceeds what the transport will carry.
    PayloadTooLarge { size: usize, limit: usize },
    Io(String),
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ConnectionLost(msg) => write!(f, "connection lost: {}", msg),
            Self::Timeout => write!(f, "request timed out"),
            Self::PayloadTooLarge { size, limit } => {
                write!(f, "payload of {} bytes exceeds limit of {}", size, limit)
            }
            Self::Io(msg) => write!(f, "i/o error: {}", msg),
        }
    }
}

impl std::error::Error for TransportError {}

/// A connection that can issue calls and notifications.
///
/// Object-safe, so stubs hold it as `Arc<dyn GenericClient>`.
#[async_trait::async_trait]
pub trait GenericClient: Send + Sync + 'static {
    /// Sends `method` with positional `params` and waits for the result.
    ///
    /// A zero `timeout` means the implementor's default deadline.
    async fn call(&self, method: &str, params: Value, timeout: Duration) -> Result<Value>;

    /// Sends `method` without waiting for, or expecting, any reply.
    async fn notify(&self, method: &str, params: Value) -> Result<()>;
}
