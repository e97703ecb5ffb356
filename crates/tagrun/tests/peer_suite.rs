//! Integration tests for peers talking over in-memory transports.

use std::sync::Arc;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::time::Duration;

use rand::Rng;
use tokio::sync::Notify;
use tokio::sync::mpsc;

use tagpack::Wire;
use tagrpc::CallContext;
use tagrpc::Dispatcher;
use tagrpc::Error;
use tagrpc::Message;
use tagrpc::Protocol;
use tagrpc::Status;
use tagrpc::TransportError;
use tagrun::DuplexChannelTransport;
use tagrun::Peer;
use tagrun::PeerConfig;
use tagrun::Transport;

tagpack::wire_record! {
    pub struct EchoArg {
        pub msg: String = "msg",
        pub delay_ms: u64 = "delayMs" (omitempty),
    }
}

tagpack::wire_record! {
    pub struct EchoRes {
        pub msg: String = "msg",
        pub served_by: String = "servedBy",
    }
}

tagpack::wire_record! {
    pub struct WaitArg {}
}

/// Shared state the test protocol's handlers report into.
#[derive(Default)]
struct Tally {
    release: Notify,
    notified: AtomicUsize,
    started: AtomicUsize,
    finished: AtomicUsize,
}

fn svc_protocol(tally: Arc<Tally>) -> Protocol {
    let wait_tally = tally.clone();
    let slow_tally = tally.clone();
    Protocol::builder("svc")
        .call("echo", |ctx: CallContext, arg: EchoArg| async move {
            if arg.delay_ms > 0 {
                tokio::time::sleep(Duration::from_millis(arg.delay_ms)).await;
            }
            if arg.msg == "fail" {
                return Err(Status::new(99, "REFUSED", "no"));
            }
            Ok(EchoRes {
                msg: arg.msg,
                served_by: ctx.peer().unwrap_or_default().to_string(),
            })
        })
        .call("slow", move |_ctx: CallContext, _arg: WaitArg| {
            let tally = slow_tally.clone();
            async move {
                tally.started.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_secs(3600)).await;
                tally.finished.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Status>(())
            }
        })
        .notify("wait", move |_ctx: CallContext, _arg: WaitArg| {
            let tally = wait_tally.clone();
            async move {
                tally.release.notified().await;
                tally.notified.fetch_add(1, Ordering::SeqCst);
                Ok::<_, Status>(())
            }
        })
        .build()
        .expect("svc protocol")
}

struct Harness {
    client: Peer,
    server: Peer,
    tally: Arc<Tally>,
}

fn harness_with(client_config: PeerConfig) -> Harness {
    tagrun::telemetry::init();
    let tally = Arc::new(Tally::default());
    let (a, b) = DuplexChannelTransport::pair();
    let served = Dispatcher::builder()
        .register(svc_protocol(tally.clone()))
        .build()
        .expect("dispatcher");
    let empty = Dispatcher::builder().build().expect("dispatcher");

    let client = Peer::new(client_config, Box::new(a), Arc::new(empty));
    let server = Peer::new(PeerConfig::new("server"), Box::new(b), Arc::new(served));
    Harness {
        client,
        server,
        tally,
    }
}

fn harness() -> Harness {
    harness_with(PeerConfig::new("client"))
}

fn echo(msg: &str) -> EchoArg {
    EchoArg {
        msg: msg.into(),
        delay_ms: 0,
    }
}

async fn wait_until(mut check: impl FnMut() -> bool) {
    for _ in 0..200 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached");
}

#[tokio::test]
async fn test_call_round_trip() -> anyhow::Result<()> {
    let h = harness();
    let res: EchoRes = h.client.client().call("svc.echo", &echo("hello"), Duration::ZERO).await?;
    assert_eq!(res.msg, "hello");
    assert_eq!(res.served_by, "server");
    assert_eq!(h.client.pending_calls(), 0);
    Ok(())
}

#[tokio::test]
async fn test_handler_status_reaches_caller() {
    let h = harness();
    let err = h
        .client
        .client()
        .call::<_, EchoRes>("svc.echo", &echo("fail"), Duration::ZERO)
        .await
        .unwrap_err();
    match err {
        Error::Remote(status) => {
            assert_eq!(status.code, 99);
            assert_eq!(status.name, "REFUSED");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_bad_arguments_reported_remotely() {
    let h = harness();
    // Right method, wrong argument type.
    let err = h
        .client
        .client()
        .call::<_, EchoRes>("svc.echo", &WaitArg {}, Duration::ZERO)
        .await
        .unwrap_err();
    let Error::Remote(status) = err else {
        panic!("expected remote error");
    };
    assert_eq!(status.code, Status::BAD_ARGUMENTS);
    assert!(status.desc.contains("msg"), "{}", status.desc);
}

#[tokio::test]
async fn test_unknown_method_reported_remotely() {
    let h = harness();
    let err = h
        .client
        .client()
        .call::<_, ()>("svc.nothing", &WaitArg {}, Duration::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Remote(ref s) if s.code == Status::METHOD_NOT_FOUND));
}

#[tokio::test]
async fn test_notify_does_not_wait_for_handler() {
    let h = harness();
    let client = h.client.client();

    tokio::time::timeout(Duration::from_millis(200), client.notify("svc.wait", &WaitArg {}))
        .await
        .expect("notify must not block on the handler")
        .unwrap();
    assert_eq!(h.tally.notified.load(Ordering::SeqCst), 0);

    // Let the handler finish; it runs on the server without any reply.
    let tally = h.tally.clone();
    wait_until(|| {
        tally.release.notify_waiters();
        tally.notified.load(Ordering::SeqCst) == 1
    })
    .await;
}

#[tokio::test]
async fn test_timeout_cancels_remote_call() {
    let h = harness();
    let err = h
        .client
        .client()
        .call::<_, ()>("svc.slow", &WaitArg {}, Duration::from_millis(50))
        .await
        .unwrap_err();
    assert_eq!(err, Error::Transport(TransportError::Timeout));
    assert_eq!(h.client.pending_calls(), 0);
    assert_eq!(h.tally.started.load(Ordering::SeqCst), 1);

    let server = h.server.clone();
    wait_until(|| server.inbound_calls() == 0).await;
    assert_eq!(h.tally.finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_zero_timeout_uses_configured_default() {
    let h = harness_with(PeerConfig::new("client").with_default_timeout(Duration::from_millis(40)));
    let err = h
        .client
        .client()
        .call::<_, ()>("svc.slow", &WaitArg {}, Duration::ZERO)
        .await
        .unwrap_err();
    assert_eq!(err, Error::Transport(TransportError::Timeout));
}

#[tokio::test]
async fn test_caller_cancellation() {
    let h = harness();
    let client = h.client.client();
    let arg = WaitArg {};
    let (tx, rx) = tokio::sync::oneshot::channel::<()>();

    let tally = h.tally.clone();
    tokio::spawn(async move {
        wait_until(|| tally.started.load(Ordering::SeqCst) == 1).await;
        let _ = tx.send(());
    });

    let err = client
        .call_cancellable::<_, (), _>("svc.slow", &arg, Duration::ZERO, async move {
            let _ = rx.await;
        })
        .await
        .unwrap_err();
    assert_eq!(err, Error::Cancelled);
    assert_eq!(h.client.pending_calls(), 0);

    let server = h.server.clone();
    wait_until(|| server.inbound_calls() == 0).await;
}

#[tokio::test]
async fn test_pending_calls_fail_when_stream_closes() {
    let (a, b) = DuplexChannelTransport::pair();
    let peer = Peer::new(
        PeerConfig::new("lonely"),
        Box::new(a),
        Arc::new(Dispatcher::builder().build().unwrap()),
    );

    let client = peer.client();
    let call = tokio::spawn(async move {
        client.call::<_, ()>("svc.slow", &WaitArg {}, Duration::ZERO).await
    });

    // The request is on the wire; now the other side goes away.
    let bytes = b.recv().await.unwrap().unwrap();
    assert!(matches!(Message::decode(&bytes).unwrap(), Message::Request { .. }));
    drop(b);

    let err = call.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::ConnectionLost(_))));
}

#[tokio::test]
async fn test_undecodable_frames_are_skipped() {
    let (a, b) = DuplexChannelTransport::pair();
    let tally = Arc::new(Tally::default());
    let served = Dispatcher::builder().register(svc_protocol(tally)).build().unwrap();
    let _server = Peer::new(PeerConfig::new("server"), Box::new(b), Arc::new(served));

    a.send(&[0xc1, 0x00]).await.unwrap();
    a.send(&Message::Response { seqid: 77, error: None, result: tagpack::Value::Nil }.encode().unwrap())
        .await
        .unwrap();

    let request = Message::Request {
        seqid: 5,
        method: "svc.echo".into(),
        params: tagrpc::encode_args(&echo("still here")),
    };
    a.send(&request.encode().unwrap()).await.unwrap();

    let reply = Message::decode(&a.recv().await.unwrap().unwrap()).unwrap();
    let Message::Response { seqid, error, result } = reply else {
        panic!("expected a response");
    };
    assert_eq!(seqid, 5);
    assert!(error.is_none());
    assert_eq!(EchoRes::from_wire(result).unwrap().msg, "still here");
}

#[tokio::test]
async fn test_payload_limit_enforced_before_send() {
    let h = harness_with(PeerConfig::new("client").with_max_message_size(64));
    let big = echo(&"x".repeat(256));
    let err = h
        .client
        .client()
        .call::<_, EchoRes>("svc.echo", &big, Duration::ZERO)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::PayloadTooLarge { limit: 64, .. })));
    assert_eq!(h.client.pending_calls(), 0);
}

#[tokio::test]
async fn test_concurrent_calls_are_correlated() {
    let h = harness();
    let (tx, mut rx) = mpsc::unbounded_channel();

    for i in 0..32 {
        let client = h.client.client();
        let tx = tx.clone();
        let delay = rand::thread_rng().gen_range(0..20);
        tokio::spawn(async move {
            let arg = EchoArg {
                msg: format!("call-{}", i),
                delay_ms: delay,
            };
            let res: tagrpc::Result<EchoRes> = client.call("svc.echo", &arg, Duration::ZERO).await;
            let _ = tx.send((i, res));
        });
    }
    drop(tx);

    let mut seen = 0;
    while let Some((i, res)) = rx.recv().await {
        assert_eq!(res.unwrap().msg, format!("call-{}", i));
        seen += 1;
    }
    assert_eq!(seen, 32);
    assert_eq!(h.client.pending_calls(), 0);
}

#[tokio::test]
async fn test_both_sides_can_serve() {
    let tally_a = Arc::new(Tally::default());
    let tally_b = Arc::new(Tally::default());
    let (a, b) = DuplexChannelTransport::pair();
    let left = Peer::new(
        PeerConfig::new("left"),
        Box::new(a),
        Arc::new(Dispatcher::builder().register(svc_protocol(tally_a)).build().unwrap()),
    );
    let right = Peer::new(
        PeerConfig::new("right"),
        Box::new(b),
        Arc::new(Dispatcher::builder().register(svc_protocol(tally_b)).build().unwrap()),
    );

    let (left_client, right_client) = (left.client(), right.client());
    let (req_a, req_b) = (echo("a"), echo("b"));
    let (from_right, from_left) = tokio::join!(
        left_client.call::<_, EchoRes>("svc.echo", &req_a, Duration::ZERO),
        right_client.call::<_, EchoRes>("svc.echo", &req_b, Duration::ZERO),
    );
    assert_eq!(from_right.unwrap().served_by, "right");
    assert_eq!(from_left.unwrap().served_by, "left");
}

#[tokio::test]
async fn test_reused_seqid_does_not_cancel_earlier_call() {
    let (a, b) = DuplexChannelTransport::pair();
    let served = Dispatcher::builder()
        .register(svc_protocol(Arc::new(Tally::default())))
        .build()
        .unwrap();
    let _server = Peer::new(PeerConfig::new("server"), Box::new(b), Arc::new(served));

    for (msg, delay_ms) in [("first", 100), ("second", 0)] {
        let request = Message::Request {
            seqid: 9,
            method: "svc.echo".into(),
            params: tagrpc::encode_args(&EchoArg {
                msg: msg.into(),
                delay_ms,
            }),
        };
        a.send(&request.encode().unwrap()).await.unwrap();
    }

    let mut replies = Vec::new();
    for _ in 0..2 {
        let reply = Message::decode(&a.recv().await.unwrap().unwrap()).unwrap();
        let Message::Response { seqid, error, result } = reply else {
            panic!("expected a response");
        };
        assert_eq!(seqid, 9);
        assert!(error.is_none(), "{error:?}");
        replies.push(EchoRes::from_wire(result).unwrap().msg);
    }
    assert_eq!(replies, vec!["second", "first"]);
}

#[tokio::test]
async fn test_close_fails_pending_calls() {
    let h = harness();
    let client = h.client.client();
    let call = tokio::spawn(async move {
        client.call::<_, ()>("svc.slow", &WaitArg {}, Duration::ZERO).await
    });
    let tally = h.tally.clone();
    wait_until(|| tally.started.load(Ordering::SeqCst) == 1).await;

    h.client.close();
    let err = call.await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::ConnectionLost(_))), "{err}");
    assert!(h.client.is_closed());
    assert_eq!(h.client.pending_calls(), 0);

    let err = h.client.client().notify("svc.wait", &WaitArg {}).await.unwrap_err();
    assert!(matches!(err, Error::Transport(TransportError::ConnectionLost(_))), "{err}");

    // The server sees the stream end and drops the call it was serving.
    let server = h.server.clone();
    wait_until(|| server.is_closed() && server.inbound_calls() == 0).await;
    assert_eq!(h.tally.finished.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_dropping_last_handle_closes_connection() {
    let (a, b) = DuplexChannelTransport::pair();
    let peer = Peer::new(
        PeerConfig::new("short-lived"),
        Box::new(a),
        Arc::new(Dispatcher::builder().build().unwrap()),
    );
    let client = peer.client();
    drop(peer);

    // A client keeps the connection open.
    client.notify("svc.wait", &WaitArg {}).await.unwrap();
    let bytes = b.recv().await.unwrap().unwrap();
    assert!(matches!(Message::decode(&bytes).unwrap(), Message::Notify { .. }));

    drop(client);
    let end = tokio::time::timeout(Duration::from_secs(5), b.recv())
        .await
        .expect("stream did not end");
    assert!(end.unwrap().is_none());
}
