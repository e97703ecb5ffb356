use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::sync::Mutex;
use std::time::Duration;

use tagpack::Value;
use tagpack::Wire;

use crate::*;

// ============================================================================
//  FIXTURES
// ============================================================================

tagpack::wire_record! {
    pub struct EchoArg {
        pub msg: String = "msg",
    }
}

tagpack::wire_record! {
    pub struct EchoRes {
        pub msg: String = "msg",
        pub count: u32 = "count",
    }
}

tagpack::wire_record! {
    pub struct PingArg {}
}

fn echo_protocol(invocations: Arc<AtomicUsize>) -> Protocol {
    Protocol::builder("svc")
        .call("echo", move |_ctx: CallContext, arg: EchoArg| {
            let n = invocations.fetch_add(1, Ordering::SeqCst) as u32 + 1;
            async move {
                if arg.msg == "fail" {
                    return Err(Status::new(42, "ECHO_REFUSED", "will not echo that").with_field("why", "policy"));
                }
                Ok(EchoRes { msg: arg.msg, count: n })
            }
        })
        .notify("ping", |_ctx: CallContext, _arg: PingArg| async { Ok::<_, Status>(()) })
        .build()
        .unwrap()
}

fn dispatcher(invocations: Arc<AtomicUsize>) -> Dispatcher {
    Dispatcher::builder()
        .register(echo_protocol(invocations))
        .build()
        .unwrap()
}

fn args(arg: Value) -> Value {
    Value::Array(vec![arg])
}

fn record(entries: Vec<(&str, Value)>) -> Value {
    Value::Map(entries.into_iter().map(|(k, v)| (Value::from(k), v)).collect())
}

// ============================================================================
//  ARGUMENT DECODING
// ============================================================================

#[test]
fn test_decode_args_single_record() {
    let arg: EchoArg = decode_args(args(record(vec![("msg", Value::from("hi"))]))).unwrap();
    assert_eq!(arg.msg, "hi");
}

#[test]
fn test_decode_args_rejects_wrong_count() {
    let two = Value::Array(vec![Value::Map(vec![]), Value::Map(vec![])]);
    let err = decode_args::<EchoArg>(two).unwrap_err();
    match err {
        tagpack::Error::TypeMismatch { expected, found, .. } => {
            assert_eq!(expected, "[EchoArg]");
            assert_eq!(found, tagpack::Shape::Array(2));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(decode_args::<EchoArg>(Value::Array(vec![])).unwrap_err().is_type_error());
    assert!(decode_args::<EchoArg>(Value::from("x")).unwrap_err().is_type_error());
}

#[test]
fn test_decode_args_reports_field_path() {
    let err = decode_args::<EchoArg>(args(record(vec![("msg", Value::from(5))]))).unwrap_err();
    assert_eq!(err.path().unwrap().to_string(), "[0].msg");
}

// ============================================================================
//  REGISTRY
// ============================================================================

#[test]
fn test_duplicate_method_rejected() {
    let res = Protocol::builder("svc")
        .notify("ping", |_ctx: CallContext, _arg: PingArg| async { Ok::<_, Status>(()) })
        .notify("ping", |_ctx: CallContext, _arg: PingArg| async { Ok::<_, Status>(()) })
        .build();
    assert!(matches!(res, Err(Error::DuplicateMethod { .. })));
}

#[test]
fn test_duplicate_protocol_rejected() {
    let counter = Arc::new(AtomicUsize::new(0));
    let res = Dispatcher::builder()
        .register(echo_protocol(counter.clone()))
        .register(echo_protocol(counter))
        .build();
    assert!(matches!(res, Err(Error::DuplicateProtocol(name)) if name == "svc"));
}

#[test]
fn test_lookup_splits_at_last_dot() {
    let proto = Protocol::builder("chat.1.NotifyChat")
        .notify("ChatInboxStale", |_ctx: CallContext, _arg: PingArg| async { Ok::<_, Status>(()) })
        .build()
        .unwrap();
    let d = Dispatcher::builder().register(proto).build().unwrap();

    let method = d.lookup("chat.1.NotifyChat.ChatInboxStale").unwrap();
    assert_eq!(method.name(), "ChatInboxStale");
    assert_eq!(method.kind(), MethodKind::Notify);
    assert_eq!(method.arg_type(), "PingArg");

    assert!(matches!(d.lookup("chat.1.Other.ChatInboxStale"), Err(Error::ProtocolNotFound(_))));
    assert!(matches!(
        d.lookup("chat.1.NotifyChat.Missing"),
        Err(Error::MethodNotFound { .. })
    ));
    assert!(matches!(d.lookup("nodots"), Err(Error::ProtocolNotFound(_))));
}

// ============================================================================
//  DISPATCH
// ============================================================================

#[tokio::test]
async fn test_dispatch_call_runs_handler() {
    let counter = Arc::new(AtomicUsize::new(0));
    let d = dispatcher(counter.clone());
    let raw = d
        .call(CallContext::call("svc.echo", 1), args(record(vec![("msg", Value::from("hello"))])))
        .await
        .unwrap();
    let res = EchoRes::from_wire(raw).unwrap();
    assert_eq!(res.msg, "hello");
    assert_eq!(res.count, 1);

    // Keys the argument type does not know are ignored.
    let extra = record(vec![("msg", Value::from("hi")), ("extra", Value::from(1))]);
    let raw = d.call(CallContext::call("svc.echo", 2), args(extra)).await.unwrap();
    let res = EchoRes::from_wire(raw).unwrap();
    assert_eq!(res.msg, "hi");
    assert_eq!(res.count, 2);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_dispatch_type_error_skips_handler() {
    let counter = Arc::new(AtomicUsize::new(0));
    let d = dispatcher(counter.clone());

    let err = d
        .call(CallContext::call("svc.echo", 1), args(record(vec![])))
        .await
        .unwrap_err();
    assert!(err.is_type_error());
    assert_eq!(err.to_status().code, Status::BAD_ARGUMENTS);

    let err = d
        .call(CallContext::call("svc.echo", 2), args(record(vec![("msg", Value::from(3))])))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::BadArguments { ref method, .. } if method == "svc.echo"));
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_dispatch_handler_status_passes_through() {
    let d = dispatcher(Arc::new(AtomicUsize::new(0)));
    let err = d
        .call(CallContext::call("svc.echo", 1), args(record(vec![("msg", Value::from("fail"))])))
        .await
        .unwrap_err();
    let status = err.to_status();
    assert_eq!(status.code, 42);
    assert_eq!(status.name, "ECHO_REFUSED");
    assert_eq!(status.field("why"), Some("policy"));
}

#[tokio::test]
async fn test_dispatch_unknown_method_status() {
    let d = dispatcher(Arc::new(AtomicUsize::new(0)));
    let err = d
        .call(CallContext::call("svc.shout", 1), args(record(vec![])))
        .await
        .unwrap_err();
    assert_eq!(err.to_status().code, Status::METHOD_NOT_FOUND);

    let err = d
        .call(CallContext::call("nope.shout", 1), args(record(vec![])))
        .await
        .unwrap_err();
    assert_eq!(err.to_status().code, Status::PROTOCOL_NOT_FOUND);
}

#[tokio::test]
async fn test_dispatch_checks_method_kind() {
    let counter = Arc::new(AtomicUsize::new(0));
    let d = dispatcher(counter.clone());

    let err = d
        .call(CallContext::call("svc.ping", 1), args(record(vec![])))
        .await
        .unwrap_err();
    assert!(matches!(err, Error::WrongKind { kind: MethodKind::Notify, .. }), "{err}");
    assert_eq!(err.to_status().code, Status::METHOD_NOT_FOUND);

    // A notification naming a call method is dropped without running it.
    d.notify(CallContext::notify("svc.echo"), args(record(vec![("msg", Value::from("hi"))])))
        .await;
    assert_eq!(counter.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_dispatch_notify_swallows_errors() {
    let d = dispatcher(Arc::new(AtomicUsize::new(0)));
    d.notify(CallContext::notify("svc.ping"), args(record(vec![]))).await;
    d.notify(CallContext::notify("svc.ping"), Value::Nil).await;
    d.notify(CallContext::notify("svc.missing"), args(record(vec![]))).await;
}

#[tokio::test]
async fn test_dispatch_is_shareable_across_tasks() {
    let counter = Arc::new(AtomicUsize::new(0));
    let d = Arc::new(dispatcher(counter.clone()));
    let mut handles = Vec::new();
    for i in 0..16u32 {
        let d = d.clone();
        handles.push(tokio::spawn(async move {
            let msg = format!("m{}", i);
            d.call(CallContext::call("svc.echo", i), args(record(vec![("msg", Value::from(msg.as_str()))])))
                .await
        }));
    }
    for handle in handles {
        handle.await.unwrap().unwrap();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 16);
}

// ============================================================================
//  MESSAGES
// ============================================================================

#[test]
fn test_message_layout() {
    let msg = Message::Request {
        seqid: 7,
        method: "svc.echo".into(),
        params: args(Value::Map(vec![])),
    };
    let Value::Array(items) = msg.to_value() else {
        panic!("request must be an array");
    };
    assert_eq!(items[0], Value::from(0));
    assert_eq!(items[1], Value::from(7));
    assert_eq!(items[2], Value::from("svc.echo"));

    let bytes = msg.encode().unwrap();
    assert_eq!(Message::decode(&bytes).unwrap(), msg);
}

#[test]
fn test_message_roundtrip_all_kinds() {
    let messages = vec![
        Message::Response {
            seqid: 1,
            error: None,
            result: Value::from("ok"),
        },
        Message::Response {
            seqid: 2,
            error: Some(Status::generic("bad").to_wire()),
            result: Value::Nil,
        },
        Message::Notify {
            method: "svc.ping".into(),
            params: args(Value::Map(vec![])),
        },
        Message::Cancel {
            seqid: 3,
            method: "svc.echo".into(),
        },
    ];
    for msg in messages {
        assert_eq!(Message::from_value(msg.to_value()).unwrap(), msg);
    }
}

#[test]
fn test_message_malformed() {
    let cases = vec![
        Value::from("hello"),
        Value::Array(vec![]),
        Value::Array(vec![Value::from(9)]),
        Value::Array(vec![Value::from(0), Value::from("seq"), Value::from("m")]),
        Value::Array(vec![Value::from(2), Value::from(5)]),
    ];
    for case in cases {
        assert!(matches!(Message::from_value(case), Err(Error::Malformed(_))));
    }
    assert!(matches!(Message::decode(&[0xc1]), Err(Error::Malformed(_))));
}

// ============================================================================
//  CLIENT
// ============================================================================

/// Records what it was asked to send and replays a canned result.
struct ScriptedClient {
    reply: Mutex<Option<Result<Value>>>,
    sent: Mutex<Vec<(String, Value, Duration)>>,
    hang: bool,
}

impl ScriptedClient {
    fn replying(reply: Result<Value>) -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(Some(reply)),
            sent: Mutex::new(Vec::new()),
            hang: false,
        })
    }

    fn hanging() -> Arc<Self> {
        Arc::new(Self {
            reply: Mutex::new(None),
            sent: Mutex::new(Vec::new()),
            hang: true,
        })
    }
}

#[async_trait::async_trait]
impl GenericClient for ScriptedClient {
    async fn call(&self, method: &str, params: Value, timeout: Duration) -> Result<Value> {
        self.sent.lock().unwrap().push((method.to_string(), params, timeout));
        if self.hang {
            futures::future::pending::<()>().await;
        }
        self.reply.lock().unwrap().take().unwrap_or(Ok(Value::Nil))
    }

    async fn notify(&self, method: &str, params: Value) -> Result<()> {
        self.sent.lock().unwrap().push((method.to_string(), params, Duration::ZERO));
        Ok(())
    }
}

#[tokio::test]
async fn test_client_wraps_argument_and_decodes_result() {
    let reply = EchoRes { msg: "hi".into(), count: 3 }.to_wire();
    let transport = ScriptedClient::replying(Ok(reply));
    let client = Client::new(transport.clone());

    let res: EchoRes = client
        .call("svc.echo", &EchoArg { msg: "hi".into() }, Duration::ZERO)
        .await
        .unwrap();
    assert_eq!(res.count, 3);

    let sent = transport.sent.lock().unwrap();
    let (method, params, timeout) = &sent[0];
    assert_eq!(method, "svc.echo");
    assert_eq!(*timeout, Duration::ZERO);
    assert_eq!(params, &Value::Array(vec![EchoArg { msg: "hi".into() }.to_wire()]));
}

#[tokio::test]
async fn test_client_result_mismatch_is_protocol_error() {
    let transport = ScriptedClient::replying(Ok(Value::from(12)));
    let client = Client::new(transport);
    let err = client
        .call::<_, EchoRes>("svc.echo", &EchoArg { msg: "x".into() }, Duration::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Protocol { .. }));
    assert!(err.is_type_error());
}

#[tokio::test]
async fn test_client_remote_error_surfaces() {
    let status = Status::new(42, "NOPE", "nope");
    let transport = ScriptedClient::replying(Err(Error::Remote(status.clone())));
    let client = Client::new(transport);
    let err = client
        .call::<_, EchoRes>("svc.echo", &EchoArg { msg: "x".into() }, Duration::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err, Error::Remote(status));
}

#[tokio::test]
async fn test_client_cancellation() {
    let client = Client::new(ScriptedClient::hanging());
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();
    let arg = EchoArg { msg: "x".into() };
    let call = client.call_cancellable::<_, EchoRes, _>(
        "svc.echo",
        &arg,
        Duration::from_secs(5),
        async move {
            let _ = rx.await;
        },
    );
    tx.send(()).unwrap();
    let err = call.await.unwrap_err();
    assert_eq!(err, Error::Cancelled);
}

#[tokio::test]
async fn test_client_void_result() {
    let client = Client::new(ScriptedClient::replying(Ok(Value::Nil)));
    let () = client
        .call("svc.echo", &EchoArg { msg: "x".into() }, Duration::from_millis(250))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_client_notify() {
    let transport = ScriptedClient::replying(Ok(Value::Nil));
    let client = Client::new(transport.clone());
    client.notify("svc.ping", &PingArg {}).await.unwrap();
    let sent = transport.sent.lock().unwrap();
    assert_eq!(sent[0].0, "svc.ping");
    assert_eq!(sent[0].1, Value::Array(vec![Value::Map(vec![])]));
}

// ============================================================================
//  STATUS
// ============================================================================

#[test]
fn test_status_from_foreign_error_value() {
    let status = Status::from_error_value(Value::from("method not found"));
    assert_eq!(status.code, Status::GENERIC);
    assert_eq!(status.desc, "method not found");

    let original = Status::new(7, "X", "y").with_field("k", "v");
    assert_eq!(Status::from_error_value(original.to_wire()), original);
}

#[test]
fn test_status_omits_empty_fields() {
    let wire = Status::new(1, "A", "b").to_wire();
    assert_eq!(wire.as_map().unwrap().len(), 3);
}

#[test]
fn test_error_converts_to_status() {
    let status: Status = Error::Remote(Status::new(42, "DOWNSTREAM", "nope")).into();
    assert_eq!(status.code, 42);

    let status: Status = Error::Transport(TransportError::Timeout).into();
    assert_eq!(status.code, Status::GENERIC);
    assert!(status.desc.contains("timed out"), "{}", status.desc);

    let status: Status = Error::Cancelled.into();
    assert_eq!(status.name, "CANCELLED");
}
