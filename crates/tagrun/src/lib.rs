//! # Tagrun
//!
//! Runs tagrpc protocols over a connection: a [`Peer`] pumps messages off a
//! [`Transport`], serves inbound calls through a shared dispatcher and issues
//! outbound ones on behalf of client stubs.

pub mod channel;
pub mod config;
pub mod peer;
pub mod telemetry;
pub mod transport;

pub use channel::DuplexChannelTransport;
pub use config::ConfigError;
pub use config::PeerConfig;
pub use peer::Peer;
pub use transport::Transport;
