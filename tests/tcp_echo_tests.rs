//! End-to-end TCP echo: acceptor + sessions with a length-prefixed
//! protocol, a client connecting across shards, and clean teardown.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use coreactor::prelude::*;
use rand::Rng;

const MESSAGES: usize = 200;

// ---------------------------------------------------------------------
// Server side
// ---------------------------------------------------------------------

struct EchoDriver;

impl SessionDriver for EchoDriver {
    type Proto = LengthPrefix;

    fn on_message(
        &mut self,
        _ctx: &mut ActorContext<'_>,
        link: &mut SessionLink<'_, LengthPrefix>,
        message: Vec<u8>,
    ) {
        link.send(&message);
    }
}

struct EchoServer {
    client: ActorId,
    closed: Arc<AtomicUsize>,
}

impl Actor for EchoServer {
    fn on_init(&mut self, ctx: &mut ActorContext<'_>) -> bool {
        ctx.register_event::<Listening, Self>();
        ctx.register_event::<NewConnection, Self>();
        ctx.register_event::<SessionClosed, Self>();
        true
    }
}

impl Handle<Listening> for EchoServer {
    fn on(&mut self, ctx: &mut ActorContext<'_>, event: Listening) {
        // Tell the client (on the other shard) where we actually bound.
        ctx.push(self.client, event);
    }
}

impl Handle<NewConnection> for EchoServer {
    fn on(&mut self, ctx: &mut ActorContext<'_>, event: NewConnection) {
        let session = Session::<EchoDriver>::new(
            event.socket,
            LengthPrefix::new(),
            EchoDriver,
            ctx.id(),
        )
        .with_timeout(Duration::from_secs(30));
        if ctx.spawn(session).is_err() {
            panic!("echo session failed to start");
        }
    }
}

impl Handle<SessionClosed> for EchoServer {
    fn on(&mut self, _ctx: &mut ActorContext<'_>, event: SessionClosed) {
        assert_eq!(event.reason, CloseReason::Peer);
        self.closed.fetch_add(1, Ordering::Release);
    }
}

// ---------------------------------------------------------------------
// Client side
// ---------------------------------------------------------------------

struct ClientDriver {
    expected: Vec<Vec<u8>>,
    next: usize,
    echoed: Arc<AtomicUsize>,
    mismatch: Arc<AtomicBool>,
}

impl SessionDriver for ClientDriver {
    type Proto = LengthPrefix;

    fn on_connected(
        &mut self,
        _ctx: &mut ActorContext<'_>,
        link: &mut SessionLink<'_, LengthPrefix>,
    ) {
        link.send(&self.expected[0]);
    }

    fn on_message(
        &mut self,
        _ctx: &mut ActorContext<'_>,
        link: &mut SessionLink<'_, LengthPrefix>,
        message: Vec<u8>,
    ) {
        if message != self.expected[self.next] {
            self.mismatch.store(true, Ordering::Release);
            link.disconnect();
            return;
        }
        self.next += 1;
        self.echoed.fetch_add(1, Ordering::Release);
        if self.next == self.expected.len() {
            link.disconnect();
        } else {
            link.send(&self.expected[self.next]);
        }
    }
}

struct ClientActor {
    messages: Vec<Vec<u8>>,
    echoed: Arc<AtomicUsize>,
    mismatch: Arc<AtomicBool>,
    closed: Arc<AtomicUsize>,
}

impl Actor for ClientActor {
    fn on_init(&mut self, ctx: &mut ActorContext<'_>) -> bool {
        ctx.register_event::<Listening, Self>();
        ctx.register_event::<ConnectResult, Self>();
        ctx.register_event::<SessionClosed, Self>();
        true
    }
}

impl Handle<Listening> for ClientActor {
    fn on(&mut self, ctx: &mut ActorContext<'_>, event: Listening) {
        let uri: Uri = format!("tcp://{}", event.addr).parse().unwrap();
        connect(ctx, &uri, Duration::from_secs(5), 7).unwrap();
    }
}

impl Handle<ConnectResult> for ClientActor {
    fn on(&mut self, ctx: &mut ActorContext<'_>, event: ConnectResult) {
        assert_eq!(event.tag, 7);
        let socket = event.socket.expect("connect failed");
        let session = Session::<ClientDriver>::new(
            socket,
            LengthPrefix::new(),
            ClientDriver {
                expected: self.messages.clone(),
                next: 0,
                echoed: Arc::clone(&self.echoed),
                mismatch: Arc::clone(&self.mismatch),
            },
            ctx.id(),
        );
        ctx.spawn(session).unwrap();
    }
}

impl Handle<SessionClosed> for ClientActor {
    fn on(&mut self, _ctx: &mut ActorContext<'_>, event: SessionClosed) {
        assert_eq!(event.reason, CloseReason::Local);
        self.closed.fetch_add(1, Ordering::Release);
    }
}

#[test]
fn tcp_echo_with_length_prefixed_protocol() {
    let mut rng = rand::thread_rng();
    let messages: Vec<Vec<u8>> = (0..MESSAGES)
        .map(|_| {
            let len = rng.gen_range(1..4000);
            (0..len).map(|_| rng.gen()).collect()
        })
        .collect();

    let echoed = Arc::new(AtomicUsize::new(0));
    let mismatch = Arc::new(AtomicBool::new(false));
    let server_closed = Arc::new(AtomicUsize::new(0));
    let client_closed = Arc::new(AtomicUsize::new(0));

    let mut rt = Runtime::with_config(
        RuntimeConfig::builder()
            .with_shards(2)
            .with_thread_pinning(false)
            .build()
            .unwrap(),
    )
    .unwrap();

    let client = rt
        .add_actor(
            1,
            ClientActor {
                messages: messages.clone(),
                echoed: Arc::clone(&echoed),
                mismatch: Arc::clone(&mismatch),
                closed: Arc::clone(&client_closed),
            },
        )
        .unwrap();
    let server = rt
        .add_actor(
            0,
            EchoServer {
                client,
                closed: Arc::clone(&server_closed),
            },
        )
        .unwrap();
    rt.add_actor(0, Acceptor::new("tcp://127.0.0.1:0".parse().unwrap(), server))
        .unwrap();

    rt.start(false).unwrap();
    let wall = Instant::now();
    while server_closed.load(Ordering::Acquire) == 0
        || client_closed.load(Ordering::Acquire) == 0
    {
        assert!(!mismatch.load(Ordering::Acquire), "echo corrupted a message");
        assert!(
            wall.elapsed() < Duration::from_secs(60),
            "echo run stalled at {} messages",
            echoed.load(Ordering::Acquire)
        );
        std::thread::sleep(Duration::from_millis(2));
    }
    rt.stop();
    rt.join();
    assert!(!rt.has_error());

    assert_eq!(echoed.load(Ordering::Acquire), MESSAGES);
    assert!(!mismatch.load(Ordering::Acquire));
    // Exactly one disconnection notification per side.
    assert_eq!(server_closed.load(Ordering::Acquire), 1);
    assert_eq!(client_closed.load(Ordering::Acquire), 1);
}
