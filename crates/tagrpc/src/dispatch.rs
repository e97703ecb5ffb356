//! # Dispatcher
//!
//! Routes inbound method names to the registered protocols. Wire method names
//! are `<protocol>.<method>` and split at the last dot, so protocol names may
//! themselves contain dots (`chat.1.NotifyChat`).
//!
//! The dispatcher is assembled once by [`DispatcherBuilder`] and is read-only
//! afterwards; share it with `Arc` and call it from any number of tasks.

use std::collections::HashMap;

use futures::future::BoxFuture;
use futures::FutureExt;
use tagpack::Value;
use tracing::debug;
use tracing::error;
use tracing::warn;

use crate::error::Error;
use crate::error::Result;
use crate::protocol::CallContext;
use crate::protocol::MethodDescriptor;
use crate::protocol::MethodKind;
use crate::protocol::Protocol;

#[derive(Debug, Default)]
pub struct Dispatcher {
    protocols: HashMap<String, Protocol>,
}

impl Dispatcher {
    pub fn builder() -> DispatcherBuilder {
        DispatcherBuilder::default()
    }

    pub fn protocol(&self, name: &str) -> Option<&Protocol> {
        self.protocols.get(name)
    }

    pub fn protocol_names(&self) -> impl Iterator<Item = &str> {
        self.protocols.keys().map(String::as_str)
    }

    /// Finds the method registered under a full wire name.
    pub fn lookup(&self, full_method: &str) -> Result<&MethodDescriptor> {
        let Some((protocol, method)) = full_method.rsplit_once('.') else {
            return Err(Error::ProtocolNotFound(full_method.to_string()));
        };
        let protocol = self
            .protocols
            .get(protocol)
            .ok_or_else(|| Error::ProtocolNotFound(protocol.to_string()))?;
        protocol.method(method).ok_or_else(|| Error::MethodNotFound {
            protocol: protocol.name().to_string(),
            method: method.to_string(),
        })
    }

    /// Serves an inbound call. The returned future does not borrow the
    /// dispatcher, so it can be spawned.
    pub fn call(&self, ctx: CallContext, params: Value) -> BoxFuture<'static, Result<Value>> {
        let method = match self.lookup_kind(ctx.method(), MethodKind::Call) {
            Ok(method) => method,
            Err(err) => {
                warn!(method = ctx.method(), error = %err, "Rejected call");
                return futures::future::ready(Err(err)).boxed();
            }
        };
        debug!(method = ctx.method(), seqid = ?ctx.seqid(), "Dispatching call");
        let name = ctx.method().to_string();
        method
            .invoke(ctx, params)
            .inspect(move |res| {
                if let Err(err) = res {
                    log_failure(&name, err);
                }
            })
            .boxed()
    }

    /// Serves an inbound notification. Failures have no caller to go back to,
    /// so they are logged and dropped.
    pub fn notify(&self, ctx: CallContext, params: Value) -> BoxFuture<'static, ()> {
        let method = match self.lookup_kind(ctx.method(), MethodKind::Notify) {
            Ok(method) => method,
            Err(err) => {
                warn!(method = ctx.method(), error = %err, "Dropped notification");
                return futures::future::ready(()).boxed();
            }
        };
        debug!(method = ctx.method(), "Dispatching notification");
        let name = ctx.method().to_string();
        method
            .invoke(ctx, params)
            .map(move |res| {
                if let Err(err) = res {
                    log_failure(&name, &err);
                }
            })
            .boxed()
    }

    fn lookup_kind(&self, full_method: &str, kind: MethodKind) -> Result<&MethodDescriptor> {
        let method = self.lookup(full_method)?;
        if method.kind() != kind {
            return Err(Error::WrongKind {
                method: full_method.to_string(),
                kind: method.kind(),
            });
        }
        Ok(method)
    }
}

fn log_failure(method: &str, err: &Error) {
    match err {
        Error::BadArguments { source, .. } if source.is_integrity() => {
            error!(method, error = %err, "Variant integrity violation in arguments");
        }
        Error::Handler(status) => {
            warn!(method, code = status.code, status = %status, "Handler failed");
        }
        _ => warn!(method, error = %err, "Dispatch failed"),
    }
}

/// Collects protocols into a [`Dispatcher`].
#[derive(Default)]
pub struct DispatcherBuilder {
    protocols: HashMap<String, Protocol>,
    error: Option<Error>,
}

impl DispatcherBuilder {
    pub fn register(mut self, protocol: Protocol) -> Self {
        let name = protocol.name().to_string();
        if self.protocols.contains_key(&name) {
            self.error.get_or_insert(Error::DuplicateProtocol(name));
            return self;
        }
        self.protocols.insert(name, protocol);
        self
    }

    /// Registers a protocol straight from a fallible generated constructor.
    pub fn register_with(self, protocol: Result<Protocol>) -> Self {
        match protocol {
            Ok(protocol) => self.register(protocol),
            Err(err) => {
                let mut this = self;
                this.error.get_or_insert(err);
                this
            }
        }
    }

    pub fn build(self) -> Result<Dispatcher> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(Dispatcher {
            protocols: self.protocols,
        })
    }
}
