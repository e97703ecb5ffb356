//! # Protocol Descriptors
//!
//! A protocol is a named table from method names to typed handlers. Generated
//! bindings build one per service interface; the [`Dispatcher`] routes inbound
//! messages through it.
//!
//! ## Invariants
//! - **Build Once**: a [`Protocol`] is immutable after [`ProtocolBuilder::build`]
//!   and is shared by reference across concurrent dispatches.
//! - **Decode Before Invoke**: a handler only ever runs with arguments that
//!   fully decoded as its argument type.
//! - **Positional Arguments**: every method takes exactly one positional
//!   argument, a record holding its named parameters.
//!
//! [`Dispatcher`]: crate::dispatch::Dispatcher

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use tagpack::Error as WireError;
use tagpack::Segment;
use tagpack::Value;
use tagpack::Wire;

use crate::error::Error;
use crate::error::Result;
use crate::message::SeqId;
use crate::status::Status;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// The caller waits for a typed result.
    Call,
    /// Fire and forget.
    Notify,
}

/// What a handler knows about the invocation it is serving.
#[derive(Debug, Clone)]
pub struct CallContext {
    method: String,
    seqid: Option<SeqId>,
    peer: Option<Arc<str>>,
}

impl CallContext {
    pub fn call(method: impl Into<String>, seqid: SeqId) -> Self {
        Self {
            method: method.into(),
            seqid: Some(seqid),
            peer: None,
        }
    }

    pub fn notify(method: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            seqid: None,
            peer: None,
        }
    }

    pub fn with_peer(mut self, peer: Arc<str>) -> Self {
        self.peer = Some(peer);
        self
    }

    /// Full wire name, e.g. `chat.1.NotifyChat.NewChatActivity`.
    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn seqid(&self) -> Option<SeqId> {
        self.seqid
    }

    pub fn peer(&self) -> Option<&str> {
        self.peer.as_deref()
    }

    pub fn is_notify(&self) -> bool {
        self.seqid.is_none()
    }
}

/// Decodes the positional argument list of a method.
///
/// The list must hold exactly one element, which must decode as `A`.
pub fn decode_args<A: Wire>(params: Value) -> tagpack::Result<A> {
    let items = match params {
        Value::Array(items) => items,
        other => return Err(WireError::mismatch(format!("[{}]", A::NAME), &other)),
    };
    if items.len() != 1 {
        return Err(WireError::mismatch(
            format!("[{}]", A::NAME),
            &Value::Array(items),
        ));
    }
    let mut items = items.into_iter();
    match items.next() {
        Some(arg) => A::from_wire(arg).map_err(|e| e.within(Segment::Index(0))),
        None => Err(WireError::mismatch(format!("[{}]", A::NAME), &Value::Array(Vec::new()))),
    }
}

/// Wraps one argument record into the positional list sent on the wire.
pub fn encode_args<A: Wire>(arg: &A) -> Value {
    Value::Array(vec![arg.to_wire()])
}

type Handler = dyn Fn(CallContext, Value) -> BoxFuture<'static, Result<Value>> + Send + Sync;

/// A registered method: its argument type and the erased handler that decodes
/// arguments and invokes the typed implementation.
pub struct MethodDescriptor {
    name: String,
    kind: MethodKind,
    arg_type: &'static str,
    handler: Box<Handler>,
}

impl MethodDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> MethodKind {
        self.kind
    }

    pub fn arg_type(&self) -> &'static str {
        self.arg_type
    }

    /// Decodes `params` and runs the handler.
    ///
    /// Argument decode failures resolve to `Error::BadArguments` without the
    /// handler being called.
    pub fn invoke(&self, ctx: CallContext, params: Value) -> BoxFuture<'static, Result<Value>> {
        (self.handler)(ctx, params)
    }
}

impl fmt::Debug for MethodDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MethodDescriptor")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .field("arg_type", &self.arg_type)
            .finish()
    }
}

/// An immutable method table for one protocol.
#[derive(Debug)]
pub struct Protocol {
    name: String,
    methods: HashMap<String, MethodDescriptor>,
}

impl Protocol {
    pub fn builder(name: impl Into<String>) -> ProtocolBuilder {
        ProtocolBuilder {
            name: name.into(),
            methods: HashMap::new(),
            error: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn method(&self, name: &str) -> Option<&MethodDescriptor> {
        self.methods.get(name)
    }

    pub fn methods(&self) -> impl Iterator<Item = &MethodDescriptor> {
        self.methods.values()
    }

    /// Wire name of one of this protocol's methods.
    pub fn full_name(&self, method: &str) -> String {
        format!("{}.{}", self.name, method)
    }
}

pub struct ProtocolBuilder {
    name: String,
    methods: HashMap<String, MethodDescriptor>,
    error: Option<Error>,
}

impl ProtocolBuilder {
    /// Registers a method whose caller waits for an `R`.
    pub fn call<A, R, F, Fut>(self, method: &str, handler: F) -> Self
    where
        A: Wire + Send + 'static,
        R: Wire + Send + 'static,
        F: Fn(CallContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<R, Status>> + Send + 'static,
    {
        let erased = move |ctx: CallContext, params: Value| -> BoxFuture<'static, Result<Value>> {
            match decode_args::<A>(params) {
                Ok(arg) => handler(ctx, arg)
                    .map(|res| res.map(|ret| ret.to_wire()).map_err(Error::Handler))
                    .boxed(),
                Err(source) => {
                    let err = Error::BadArguments {
                        method: ctx.method().to_string(),
                        source,
                    };
                    futures::future::ready(Err(err)).boxed()
                }
            }
        };
        self.insert(method, MethodKind::Call, A::NAME, Box::new(erased))
    }

    /// Registers a fire-and-forget method.
    pub fn notify<A, F, Fut>(self, method: &str, handler: F) -> Self
    where
        A: Wire + Send + 'static,
        F: Fn(CallContext, A) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<(), Status>> + Send + 'static,
    {
        let erased = move |ctx: CallContext, params: Value| -> BoxFuture<'static, Result<Value>> {
            match decode_args::<A>(params) {
                Ok(arg) => handler(ctx, arg)
                    .map(|res| res.map(|()| Value::Nil).map_err(Error::Handler))
                    .boxed(),
                Err(source) => {
                    let err = Error::BadArguments {
                        method: ctx.method().to_string(),
                        source,
                    };
                    futures::future::ready(Err(err)).boxed()
                }
            }
        };
        self.insert(method, MethodKind::Notify, A::NAME, Box::new(erased))
    }

    fn insert(
        mut self,
        method: &str,
        kind: MethodKind,
        arg_type: &'static str,
        handler: Box<Handler>,
    ) -> Self {
        if self.methods.contains_key(method) {
            self.error.get_or_insert(Error::DuplicateMethod {
                protocol: self.name.clone(),
                method: method.to_string(),
            });
            return self;
        }
        self.methods.insert(
            method.to_string(),
            MethodDescriptor {
                name: method.to_string(),
                kind,
                arg_type,
                handler,
            },
        );
        self
    }

    pub fn build(self) -> Result<Protocol> {
        if let Some(err) = self.error {
            return Err(err);
        }
        Ok(Protocol {
            name: self.name,
            methods: self.methods,
        })
    }
}
