//! In-memory transports.

use std::sync::Arc;
use std::sync::Mutex as SyncMutex;

use tokio::sync::Mutex;
use tokio::sync::mpsc;

use crate::transport;
use crate::transport::Transport;

/// A duplex channel transport over tokio mpsc channels.
///
/// Messages sent on one end appear on the other end's `recv`. Dropping one end
/// closes the stream for the other, as does [`Transport::close`].
pub struct DuplexChannelTransport {
    tx: SyncMutex<Option<mpsc::UnboundedSender<Vec<u8>>>>,
    rx: Arc<Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

impl DuplexChannelTransport {
    pub fn new(tx: mpsc::UnboundedSender<Vec<u8>>, rx: mpsc::UnboundedReceiver<Vec<u8>>) -> Self {
        Self {
            tx: SyncMutex::new(Some(tx)),
            rx: Arc::new(Mutex::new(rx)),
        }
    }

    /// Creates two connected ends.
    pub fn pair() -> (Self, Self) {
        let (tx_a, rx_a) = mpsc::unbounded_channel();
        let (tx_b, rx_b) = mpsc::unbounded_channel();
        (Self::new(tx_a, rx_b), Self::new(tx_b, rx_a))
    }
}

#[async_trait::async_trait]
impl Transport for DuplexChannelTransport {
    async fn send(&self, payload: &[u8]) -> transport::Result<()> {
        let tx = self.tx.lock().map_err(|_| transport::Error::ConnectionLost("channel poisoned".into()))?;
        let Some(tx) = tx.as_ref() else {
            return Err(transport::Error::ConnectionLost("channel closed".into()));
        };
        tx.send(payload.to_vec())
            .map_err(|_| transport::Error::ConnectionLost("channel closed".into()))
    }

    async fn recv(&self) -> transport::Result<Option<Vec<u8>>> {
        let mut rx = self.rx.lock().await;
        Ok(rx.recv().await)
    }

    async fn close(&self) -> transport::Result<()> {
        if let Ok(mut tx) = self.tx.lock() {
            tx.take();
        }
        Ok(())
    }
}
