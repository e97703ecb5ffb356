//! # Tagrpc
//!
//! Protocol tables, dispatch and client invocation for msgpack-rpc services.
//!
//! Inbound: a [`Message`] names a method; the [`Dispatcher`] finds its
//! [`Protocol`], the method descriptor decodes the arguments, and the typed
//! handler runs. Outbound: a [`Client`] wraps the argument record and calls
//! through any [`GenericClient`].

pub mod client;
pub mod dispatch;
pub mod error;
pub mod message;
pub mod protocol;
pub mod status;
pub mod transport;

pub use client::Client;
pub use dispatch::Dispatcher;
pub use dispatch::DispatcherBuilder;
pub use error::Error;
pub use error::Result;
pub use message::Message;
pub use message::SeqId;
pub use protocol::decode_args;
pub use protocol::encode_args;
pub use protocol::CallContext;
pub use protocol::MethodDescriptor;
pub use protocol::MethodKind;
pub use protocol::Protocol;
pub use protocol::ProtocolBuilder;
pub use status::Status;
pub use status::StatusField;
pub use transport::GenericClient;
pub use transport::TransportError;

#[cfg(test)]
mod tests;
