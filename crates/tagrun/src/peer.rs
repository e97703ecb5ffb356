//! # RPC Peer with Async Pump
//!
//! A `Peer` is one end of a msgpack-rpc connection. It issues calls and
//! notifications through [`GenericClient`] and serves the ones the other side
//! sends through a shared [`Dispatcher`].
//!
//! A background pump task reads the transport and:
//! - routes each `Response` to the pending call with the same seqid;
//! - spawns one task per inbound `Request` and sends back its result or status;
//! - spawns one task per inbound `Notify`, with no reply;
//! - aborts the matching inbound request on `Cancel`.
//!
//! The pump stops when the stream ends, when [`Peer::close`] is called, or
//! when the last handle to the peer (clients included) is dropped. On the way
//! out it closes the transport, fails every pending call with
//! `ConnectionLost` and cancels every inbound call.
//!
//! ## Invariants
//! - **Pending Cleanup**: every pending entry is removed exactly once, by the
//!   pump (response or disconnect) or by the caller giving up. A caller that
//!   gives up after sending tells the remote with a `Cancel`.
//! - **Bad Frames**: a frame that does not decode is logged and skipped; the
//!   connection stays up.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;

use dashmap::DashMap;
use tagpack::Value;
use tagpack::Wire;
use tagrpc::CallContext;
use tagrpc::Client;
use tagrpc::Dispatcher;
use tagrpc::GenericClient;
use tagrpc::Message;
use tagrpc::SeqId;
use tagrpc::Status;
use tokio::sync::Notify;
use tokio::sync::oneshot;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::PeerConfig;
use crate::transport;
use crate::transport::Transport;

type CallResult = tagrpc::Result<Value>;

struct Inner {
    config: PeerConfig,
    name: Arc<str>,
    transport: Arc<dyn Transport>,
    dispatcher: Arc<Dispatcher>,
    /// Outbound calls waiting for a response.
    pending: DashMap<SeqId, oneshot::Sender<CallResult>>,
    /// Inbound calls still running, by the seqid the remote chose.
    inbound: DashMap<SeqId, oneshot::Sender<()>>,
    seq_gen: AtomicU32,
    closed: AtomicBool,
    shutdown: Notify,
}

/// Cheap to clone; clones share one connection.
#[derive(Clone)]
pub struct Peer {
    inner: Arc<Inner>,
    _handle: Arc<CloseOnDrop>,
}

/// Shared by every handle; the pump only holds `Inner`, so this drops with the
/// last `Peer` clone.
struct CloseOnDrop(Arc<Inner>);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

impl Peer {
    /// Creates a peer and spawns its pump task. Must be called within a tokio
    /// runtime.
    pub fn new(config: PeerConfig, transport: Box<dyn Transport>, dispatcher: Arc<Dispatcher>) -> Self {
        let inner = Arc::new(Inner {
            name: Arc::from(config.name.as_str()),
            config,
            transport: Arc::from(transport),
            dispatcher,
            pending: DashMap::new(),
            inbound: DashMap::new(),
            seq_gen: AtomicU32::new(1),
            closed: AtomicBool::new(false),
            shutdown: Notify::new(),
        });

        tokio::spawn(Inner::pump(inner.clone()));

        Self {
            _handle: Arc::new(CloseOnDrop(inner.clone())),
            inner,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn config(&self) -> &PeerConfig {
        &self.inner.config
    }

    /// A client stub core that calls through this peer.
    pub fn client(&self) -> Client {
        Client::new(Arc::new(self.clone()))
    }

    /// Number of outbound calls still waiting for a response.
    pub fn pending_calls(&self) -> usize {
        self.inner.pending.len()
    }

    /// Number of inbound calls still being served.
    pub fn inbound_calls(&self) -> usize {
        self.inner.inbound.len()
    }

    /// Shuts the connection down. Idempotent.
    ///
    /// New calls and notifications fail with `ConnectionLost` immediately;
    /// pending ones fail once the pump has stopped.
    pub fn close(&self) {
        self.inner.close();
    }

    pub fn is_closed(&self) -> bool {
        self.inner.closed.load(Ordering::SeqCst)
    }
}

impl Inner {
    async fn pump(self: Arc<Self>) {
        let reason = loop {
            tokio::select! {
                _ = self.shutdown.notified() => break "peer closed".to_string(),
                received = self.transport.recv() => match received {
                    Ok(Some(bytes)) => self.handle_frame(&bytes),
                    Ok(None) => break "stream closed".to_string(),
                    Err(e) => {
                        warn!(peer = %self.name, error = %e, "Transport error in pump");
                        break e.to_string();
                    }
                },
            }
        };
        self.closed.store(true, Ordering::SeqCst);
        if let Err(e) = self.transport.close().await {
            debug!(peer = %self.name, error = %e, "Could not close transport");
        }
        info!(peer = %self.name, %reason, "Peer disconnected");
        self.fail_all_pending(&reason);
        self.cancel_all_inbound();
    }

    fn close(&self) {
        if !self.closed.swap(true, Ordering::SeqCst) {
            // Stores a permit if the pump is busy with a frame.
            self.shutdown.notify_one();
        }
    }

    fn cancel_all_inbound(&self) {
        let keys: Vec<SeqId> = self.inbound.iter().map(|e| *e.key()).collect();
        for key in keys {
            if let Some((_, cancel)) = self.inbound.remove(&key) {
                let _ = cancel.send(());
            }
        }
    }

    fn fail_all_pending(&self, reason: &str) {
        let keys: Vec<SeqId> = self.pending.iter().map(|e| *e.key()).collect();
        for key in keys {
            if let Some((_, tx)) = self.pending.remove(&key) {
                let err = transport::Error::ConnectionLost(reason.to_string());
                let _ = tx.send(Err(err.into()));
            }
        }
    }

    fn handle_frame(self: &Arc<Self>, bytes: &[u8]) {
        let message = match Message::decode(bytes) {
            Ok(message) => message,
            Err(e) => {
                warn!(peer = %self.name, error = %e, "Skipping undecodable frame");
                return;
            }
        };

        match message {
            Message::Request { seqid, method, params } => self.serve_call(seqid, method, params),
            Message::Notify { method, params } => {
                let ctx = CallContext::notify(method).with_peer(self.name.clone());
                tokio::spawn(self.dispatcher.notify(ctx, params));
            }
            Message::Response { seqid, error, result } => {
                let Some((_, tx)) = self.pending.remove(&seqid) else {
                    debug!(peer = %self.name, seqid, "Response for a call nobody is waiting on");
                    return;
                };
                let result = match error {
                    Some(error) => Err(tagrpc::Error::Remote(Status::from_error_value(error))),
                    None => Ok(result),
                };
                let _ = tx.send(result);
            }
            Message::Cancel { seqid, method } => {
                if let Some((_, cancel)) = self.inbound.remove(&seqid) {
                    debug!(peer = %self.name, seqid, method = %method, "Remote cancelled call");
                    let _ = cancel.send(());
                }
            }
        }
    }

    fn serve_call(self: &Arc<Self>, seqid: SeqId, method: String, params: Value) {
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.inbound.insert(seqid, cancel_tx);

        let ctx = CallContext::call(method, seqid).with_peer(self.name.clone());
        let call = self.dispatcher.call(ctx, params);
        let inner = self.clone();

        tokio::spawn(async move {
            // A dropped sender means the slot was taken over, not a cancel.
            let result = tokio::select! {
                result = call => result,
                Ok(()) = cancel_rx => Err(tagrpc::Error::Cancelled),
            };
            // A reused seqid may already own the slot; only drop our own entry.
            inner.inbound.remove_if(&seqid, |_, tx| tx.is_closed());

            let response = match result {
                Ok(result) => Message::Response { seqid, error: None, result },
                Err(err) => Message::Response {
                    seqid,
                    error: Some(err.to_status().to_wire()),
                    result: Value::Nil,
                },
            };
            if let Err(e) = inner.send(&response).await {
                warn!(peer = %inner.name, seqid, error = %e, "Failed to send response");
            }
        });
    }

    async fn send(&self, message: &Message) -> tagrpc::Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(transport::Error::ConnectionLost("peer closed".into()).into());
        }
        let bytes = message.encode()?;
        if bytes.len() > self.config.max_message_size {
            return Err(transport::Error::PayloadTooLarge {
                size: bytes.len(),
                limit: self.config.max_message_size,
            }
            .into());
        }
        self.transport.send(&bytes).await?;
        Ok(())
    }

    fn next_seqid(&self) -> SeqId {
        self.seq_gen.fetch_add(1, Ordering::Relaxed)
    }
}

/// Owns a pending entry for the lifetime of one outbound call.
struct PendingCall {
    inner: Arc<Inner>,
    seqid: SeqId,
    method: String,
    sent: bool,
}

impl Drop for PendingCall {
    fn drop(&mut self) {
        let abandoned = self.inner.pending.remove(&self.seqid).is_some();
        if !(abandoned && self.sent) {
            return;
        }
        let Ok(handle) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let inner = self.inner.clone();
        let cancel = Message::Cancel {
            seqid: self.seqid,
            method: std::mem::take(&mut self.method),
        };
        handle.spawn(async move {
            if let Err(e) = inner.send(&cancel).await {
                debug!(peer = %inner.name, error = %e, "Could not send cancel");
            }
        });
    }
}

#[async_trait::async_trait]
impl GenericClient for Peer {
    async fn call(&self, method: &str, params: Value, timeout: Duration) -> tagrpc::Result<Value> {
        let inner = &self.inner;
        let seqid = inner.next_seqid();
        let (tx, rx) = oneshot::channel();
        inner.pending.insert(seqid, tx);

        let mut guard = PendingCall {
            inner: inner.clone(),
            seqid,
            method: method.to_string(),
            sent: false,
        };

        let request = Message::Request {
            seqid,
            method: method.to_string(),
            params,
        };
        inner.send(&request).await?;
        guard.sent = true;

        let deadline = if timeout.is_zero() { inner.config.default_timeout } else { timeout };
        let result = match tokio::time::timeout(deadline, rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => Err(transport::Error::ConnectionLost("response channel closed".into()).into()),
            Err(_) => {
                debug!(peer = %inner.name, seqid, method, "Call timed out");
                Err(transport::Error::Timeout.into())
            }
        };
        drop(guard);
        result
    }

    async fn notify(&self, method: &str, params: Value) -> tagrpc::Result<()> {
        let message = Message::Notify {
            method: method.to_string(),
            params,
        };
        self.inner.send(&message).await
    }
}
