//! Line-based TCP echo server: an acceptor and one session per client,
//! all on shard 0, with a second shard left free for application actors.
//!
//! ```text
//! cargo run --example echo_server
//! ncat 127.0.0.1 7777
//! ```

use std::time::Duration;

use coreactor::prelude::*;

struct EchoDriver;

impl SessionDriver for EchoDriver {
    type Proto = Delimited;

    fn on_message(
        &mut self,
        _ctx: &mut ActorContext<'_>,
        link: &mut SessionLink<'_, Delimited>,
        message: Vec<u8>,
    ) {
        if message == b"quit" {
            link.disconnect();
        } else {
            link.send(&message);
        }
    }

    fn on_disconnected(&mut self, _ctx: &mut ActorContext<'_>, reason: CloseReason) {
        tracing::info!(?reason, "client gone");
    }
}

struct EchoServer {
    live: usize,
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
    fn on(&mut self, _ctx: &mut ActorContext<'_>, event: Listening) {
        tracing::info!(addr = %event.addr, "echo server up");
    }
}

impl Handle<NewConnection> for EchoServer {
    fn on(&mut self, ctx: &mut ActorContext<'_>, event: NewConnection) {
        tracing::info!(peer = %event.peer, "client connected");
        let session = Session::<EchoDriver>::new(
            event.socket,
            Delimited::lines(),
            EchoDriver,
            ctx.id(),
        )
        .with_timeout(Duration::from_secs(60));
        match ctx.spawn(session) {
            Ok(_) => self.live += 1,
            Err(e) => tracing::warn!(error = %e, "session rejected"),
        }
    }
}

impl Handle<SessionClosed> for EchoServer {
    fn on(&mut self, _ctx: &mut ActorContext<'_>, _event: SessionClosed) {
        self.live -= 1;
        tracing::info!(live = self.live, "session closed");
    }
}

fn main() -> Result<(), SystemError> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut rt = Runtime::with_config(
        RuntimeConfig::builder()
            .with_shards(2)
            .with_signals(true)
            .build()?,
    )?;
    let server = rt.add_actor(0, EchoServer { live: 0 })?;
    rt.add_actor(
        0,
        Acceptor::new("tcp://127.0.0.1:7777".parse().map_err(|e| {
            SystemError::Config(format!("bad listen uri: {e}"))
        })?, server),
    )?;

    // Blocks until SIGINT/SIGTERM.
    rt.start(true)?;
    rt.join();
    Ok(())
}
