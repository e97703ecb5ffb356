//! # Transport Abstraction
//!
//! A minimal, async interface for moving whole messages between peers.
//!
//! ## Philosophy
//!
//! - **Byte-Oriented**: the transport knows nothing about frames, methods or
//!   types. It moves opaque buffers.
//! - **Message-Oriented**: one `send` is one `recv` on the other side. Stream
//!   transports bring their own length framing.
//! - **Full Duplex**: both sides send and receive concurrently; requests and
//!   responses are correlated above this layer.

pub use tagrpc::TransportError as Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Object-safe (`Arc<dyn Transport>`).
#[async_trait::async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Sends one message.
    async fn send(&self, payload: &[u8]) -> Result<()>;

    /// Waits for the next message; `Ok(None)` once the other side has closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>>;

    /// Closes the sending half so the other side's `recv` sees the end of the
    /// stream. Sends after this fail.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}
