//! # Client Invocation
//!
//! The untyped core under every generated client stub: wrap the argument
//! record into the positional list, hand it to the transport, decode the
//! result as the declared type.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::Either;
use tagpack::Wire;

use crate::error::Error;
use crate::error::Result;
use crate::protocol::encode_args;
use crate::transport::GenericClient;

#[derive(Clone)]
pub struct Client {
    transport: Arc<dyn GenericClient>,
}

impl Client {
    pub fn new(transport: Arc<dyn GenericClient>) -> Self {
        Self { transport }
    }

    pub fn transport(&self) -> &Arc<dyn GenericClient> {
        &self.transport
    }

    /// Invokes `method` and waits for its result.
    ///
    /// A zero `timeout` defers to the transport default.
    pub async fn call<A, R>(&self, method: &str, arg: &A, timeout: Duration) -> Result<R>
    where
        A: Wire,
        R: Wire,
    {
        let raw = self.transport.call(method, encode_args(arg), timeout).await?;
        decode_result(method, raw)
    }

    /// Like [`call`](Self::call), but gives up with `Error::Cancelled` as soon
    /// as `cancel` resolves. Nothing is decoded for a cancelled call.
    pub async fn call_cancellable<A, R, C>(
        &self,
        method: &str,
        arg: &A,
        timeout: Duration,
        cancel: C,
    ) -> Result<R>
    where
        A: Wire,
        R: Wire,
        C: Future<Output = ()>,
    {
        let call = self.transport.call(method, encode_args(arg), timeout);
        futures::pin_mut!(cancel);
        futures::pin_mut!(call);
        match futures::future::select(cancel, call).await {
            Either::Left(((), _)) => Err(Error::Cancelled),
            Either::Right((raw, _)) => decode_result(method, raw?),
        }
    }

    /// Sends `method` without waiting for the handler. Only failures to encode
    /// or send are reported.
    pub async fn notify<A: Wire>(&self, method: &str, arg: &A) -> Result<()> {
        self.transport.notify(method, encode_args(arg)).await
    }
}

fn decode_result<R: Wire>(method: &str, raw: tagpack::Value) -> Result<R> {
    R::from_wire(raw).map_err(|source| Error::Protocol {
        method: method.to_string(),
        source,
    })
}
