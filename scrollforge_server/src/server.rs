// TCP front-end for the battle server.
//
// Architecture: three listeners (lookup, lobby, battle — one per session
// kind), thread-per-connection readers, and the single world-tick thread.
//
// - **Accept threads** (one per listener): accept connections, register a
//   `Session` carrying the write half, and spawn a reader thread.
// - **Reader threads** (one per connection): feed raw bytes into a
//   `FrameBuffer` and run each complete frame through
//   `dispatch::dispatch_frame` synchronously. Rejected frames are logged
//   and dropped without a reply; only an unframeable stream closes the
//   connection. Handlers run here and only ever enqueue battle moves.
// - **World-tick thread** (engine): sole mutator of battle state; pushes
//   effect batches back out through the `SessionRegistry` outbox.
//
// Each connection's stream is cloned once: the reader keeps the original,
// the session's writer thread owns the write half. Readers use a short
// read timeout so they notice the shutdown flag.

use std::io::{self, Read};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Duration;

use scrollforge_engine::spawn_world_tick;
use scrollforge_protocol::framing::{FrameBuffer, FrameError};
use scrollforge_protocol::message::ServerMessage;
use scrollforge_protocol::meta::SessionKind;

use crate::context::{AppContext, ServerConfig};
use crate::dispatch;
use crate::session::Session;

const READ_POLL: Duration = Duration::from_millis(250);

/// Handle to a running server: bound addresses plus shutdown control.
pub struct ServerHandle {
    pub lookup_addr: SocketAddr,
    pub lobby_addr: SocketAddr,
    pub battle_addr: SocketAddr,
    pub ctx: Arc<AppContext>,
    keep_running: Arc<AtomicBool>,
    shutdown: Arc<AtomicBool>,
    threads: Vec<thread::JoinHandle<()>>,
}

impl ServerHandle {
    /// Signal every thread to stop and wait for them.
    pub fn stop(self) {
        self.keep_running.store(false, Ordering::SeqCst);
        self.shutdown.store(true, Ordering::SeqCst);
        for handle in self.threads {
            let _ = handle.join();
        }
    }
}

/// Bind all listeners and start the server threads. Returns once everything
/// is listening; port 0 in the config picks free ports (used by tests).
pub fn start_server(config: ServerConfig) -> io::Result<ServerHandle> {
    let lookup = TcpListener::bind(("127.0.0.1", config.lookup_port))?;
    let lobby = TcpListener::bind(("127.0.0.1", config.lobby_port))?;
    let battle = TcpListener::bind(("127.0.0.1", config.battle_port))?;
    let lookup_addr = lookup.local_addr()?;
    let lobby_addr = lobby.local_addr()?;
    let battle_addr = battle.local_addr()?;

    // Lookup replies advertise the actual battle port, which matters when
    // the config asked for port 0.
    let config = ServerConfig {
        battle_port: battle_addr.port(),
        ..config
    };
    let ctx = AppContext::new(config);
    let keep_running = Arc::new(AtomicBool::new(true));
    // `spawn_world_tick` takes a shutdown flag (true = stop), the inverse of
    // `keep_running`; give it its own flag so the polarity stays correct.
    let shutdown = Arc::new(AtomicBool::new(false));

    let mut threads = Vec::new();
    for (listener, kind) in [
        (lookup, SessionKind::Lookup),
        (lobby, SessionKind::Lobby),
        (battle, SessionKind::Battle),
    ] {
        listener.set_nonblocking(true)?;
        let ctx = ctx.clone();
        let keep_running = keep_running.clone();
        threads.push(thread::spawn(move || {
            accept_loop(listener, kind, ctx, keep_running);
        }));
    }

    threads.push(spawn_world_tick(
        ctx.battles.clone(),
        ctx.sessions.clone(),
        shutdown.clone(),
    ));

    tracing::info!(%lookup_addr, %lobby_addr, %battle_addr, "server started");
    Ok(ServerHandle {
        lookup_addr,
        lobby_addr,
        battle_addr,
        ctx,
        keep_running,
        shutdown,
        threads,
    })
}

fn accept_loop(
    listener: TcpListener,
    kind: SessionKind,
    ctx: Arc<AppContext>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match listener.accept() {
            Ok((stream, peer)) => {
                stream.set_nonblocking(false).ok();
                stream.set_read_timeout(Some(READ_POLL)).ok();
                let write_half = match stream.try_clone() {
                    Ok(half) => half,
                    Err(error) => {
                        tracing::warn!(%peer, %error, "stream clone failed");
                        continue;
                    }
                };
                let session = ctx.sessions.open(kind, write_half);
                tracing::debug!(conn = session.conn.0, ?kind, %peer, "connection accepted");
                let ctx = ctx.clone();
                let keep_running = keep_running.clone();
                thread::spawn(move || {
                    reader_loop(stream, session, ctx, keep_running);
                });
            }
            Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                thread::sleep(Duration::from_millis(50));
            }
            Err(error) => {
                tracing::warn!(?kind, %error, "accept failed");
                break;
            }
        }
    }
}

/// Read bytes, extract frames, dispatch. Runs until EOF, a fatal protocol
/// error, or shutdown.
fn reader_loop(
    mut stream: TcpStream,
    session: Arc<Session>,
    ctx: Arc<AppContext>,
    keep_running: Arc<AtomicBool>,
) {
    let mut buffer = FrameBuffer::new();
    let mut chunk = [0u8; 4096];

    'outer: while keep_running.load(Ordering::SeqCst) {
        let n = match stream.read(&mut chunk) {
            Ok(0) => break,
            Ok(n) => n,
            Err(ref e)
                if e.kind() == io::ErrorKind::WouldBlock
                    || e.kind() == io::ErrorKind::TimedOut =>
            {
                continue;
            }
            Err(error) => {
                tracing::debug!(conn = session.conn.0, %error, "read failed");
                break;
            }
        };
        buffer.push(&chunk[..n]);

        loop {
            match buffer.next_frame() {
                Ok(Some(frame)) => {
                    // Rejected frames are logged and dropped with no reply;
                    // an error packet would let a client probe the protocol
                    // surface, and the connection stays usable.
                    if let Err(error) = dispatch::dispatch_frame(&ctx, &session, &frame) {
                        tracing::debug!(conn = session.conn.0, %error, "message dropped");
                    }
                }
                Ok(None) => break,
                Err(FrameError::Oversized { len }) => {
                    // The buffer drops the oversized object and resyncs at
                    // the next one; the connection survives.
                    tracing::warn!(conn = session.conn.0, len, "oversized message dropped");
                }
                Err(error @ FrameError::NotAnObject { .. }) => {
                    // No object boundary left to resync on; this is the one
                    // inbound failure that closes the connection.
                    tracing::warn!(conn = session.conn.0, %error, "unframeable input");
                    session.send(&ServerMessage::FatalFail {
                        op: "unknown".to_owned(),
                        info: error.to_string(),
                    });
                    break 'outer;
                }
            }
        }
    }

    disconnect(&ctx, &session);
}

/// Tear down a closed connection: free the session and name, withdraw any
/// matchmaking offer, and flag the player's battle seat as disconnected.
/// The seat itself survives so the player can sign back in and rejoin.
fn disconnect(ctx: &AppContext, session: &Session) {
    let Some(player) = ctx.sessions.close(session) else {
        tracing::debug!(conn = session.conn.0, "connection closed");
        return;
    };
    tracing::info!(conn = session.conn.0, player = player.0, "player disconnected");
    ctx.matchmaker.withdraw(player);
    if let Some((handle, _color)) = ctx.battles.find_for_player(player) {
        // Rare enough to take the state lock from here; the tick holds it
        // only in short bursts.
        handle.state.lock().unwrap().mark_disconnected(player);
    }
}
