// Per-connection sessions and the player-id write registry.
//
// A `Session` is one TCP connection: its kind (which listener accepted it),
// the authenticated player once `SignIn` succeeds, and a bounded outbound
// queue drained by a dedicated writer thread. `send` only serializes and
// enqueues, so the world tick never touches the socket: a peer that stops
// reading fills its own queue and loses frames, while every other battle
// keeps ticking. Write errors stop the writer; the reader thread notices
// the broken pipe and tears the connection down.
//
// `SessionRegistry` maps connections and signed-in players to sessions and
// is the server's `Outbox`: the tick addresses players by id, the registry
// routes to the queue.

use std::io::BufWriter;
use std::net::TcpStream;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, SyncSender, TrySendError};
use std::sync::{Arc, RwLock};
use std::thread;
use std::time::Duration;

use rustc_hash::FxHashMap;
use scrollforge_engine::Outbox;
use scrollforge_protocol::framing::write_frame;
use scrollforge_protocol::message::ServerMessage;
use scrollforge_protocol::meta::{SessionKind, outbound_meta};
use scrollforge_protocol::types::PlayerId;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct ConnId(pub u64);

/// Frames queued per connection before `send` starts dropping new ones.
const OUTBOUND_QUEUE: usize = 256;
/// A peer that cannot take a buffered frame within this window is dead.
const WRITE_TIMEOUT: Duration = Duration::from_secs(5);

/// One live connection.
#[derive(Debug)]
pub struct Session {
    pub conn: ConnId,
    pub kind: SessionKind,
    /// Set exactly once, by a successful sign-in.
    player: RwLock<Option<PlayerId>>,
    name: RwLock<Option<String>>,
    /// Serialized frames headed for the writer thread.
    outbound: SyncSender<Vec<u8>>,
}

impl Session {
    pub fn new(conn: ConnId, kind: SessionKind, stream: TcpStream) -> Self {
        stream.set_write_timeout(Some(WRITE_TIMEOUT)).ok();
        let (outbound, frames) = mpsc::sync_channel(OUTBOUND_QUEUE);
        thread::spawn(move || writer_loop(conn, stream, frames));
        Self {
            conn,
            kind,
            player: RwLock::new(None),
            name: RwLock::new(None),
            outbound,
        }
    }

    pub fn player(&self) -> Option<PlayerId> {
        *self.player.read().unwrap()
    }

    pub fn is_authenticated(&self) -> bool {
        self.player().is_some()
    }

    pub fn name(&self) -> Option<String> {
        self.name.read().unwrap().clone()
    }

    /// Serialize and enqueue one message; never blocks. Outbound messages
    /// carry session-kind metadata symmetric to the inbound table; a message
    /// not registered for this session's kind is logged and dropped instead
    /// of sent. A full queue also drops, which treats a peer that stopped
    /// reading as good as disconnected.
    pub fn send(&self, message: &ServerMessage) {
        let op = message.discriminator();
        match outbound_meta(op) {
            Some(meta) if meta.kinds.contains(self.kind) => {}
            Some(_) => {
                tracing::warn!(conn = self.conn.0, op, kind = ?self.kind, "outbound message not valid for session kind, dropped");
                return;
            }
            None => {
                tracing::warn!(conn = self.conn.0, op, "outbound message missing metadata, dropped");
                return;
            }
        }
        let bytes = match serde_json::to_vec(message) {
            Ok(bytes) => bytes,
            Err(error) => {
                tracing::warn!(conn = self.conn.0, op, %error, "serialize failed");
                return;
            }
        };
        match self.outbound.try_send(bytes) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                tracing::warn!(conn = self.conn.0, op, "outbound queue full, message dropped");
            }
            Err(TrySendError::Disconnected(_)) => {
                tracing::debug!(conn = self.conn.0, op, "writer gone, message dropped");
            }
        }
    }
}

/// Drain a session's outbound queue onto the socket. Exits when every sender
/// is gone (the session closed) or the socket fails.
fn writer_loop(conn: ConnId, stream: TcpStream, frames: Receiver<Vec<u8>>) {
    let mut writer = BufWriter::new(stream);
    while let Ok(frame) = frames.recv() {
        if let Err(error) = write_frame(&mut writer, &frame) {
            tracing::debug!(conn = conn.0, %error, "write failed, writer stopping");
            return;
        }
    }
}

/// All live sessions, addressable by connection or signed-in player.
#[derive(Debug)]
pub struct SessionRegistry {
    next_conn: AtomicU64,
    /// Player ids start at 1; 0 is the built-in AI.
    next_player: AtomicU64,
    by_conn: RwLock<FxHashMap<ConnId, Arc<Session>>>,
    by_player: RwLock<FxHashMap<PlayerId, Arc<Session>>>,
    names: RwLock<FxHashMap<String, PlayerId>>,
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            next_conn: AtomicU64::new(1),
            next_player: AtomicU64::new(1),
            by_conn: RwLock::new(FxHashMap::default()),
            by_player: RwLock::new(FxHashMap::default()),
            names: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn open(&self, kind: SessionKind, stream: TcpStream) -> Arc<Session> {
        let conn = ConnId(self.next_conn.fetch_add(1, Ordering::Relaxed));
        let session = Arc::new(Session::new(conn, kind, stream));
        self.by_conn.write().unwrap().insert(conn, session.clone());
        session
    }

    /// Authenticate a session under `name`. Names are exclusive while their
    /// owner is connected; the first writer wins and later claimants are
    /// rejected deterministically.
    pub fn sign_in(&self, session: &Arc<Session>, name: &str) -> Result<PlayerId, SignInError> {
        if session.is_authenticated() {
            return Err(SignInError::AlreadySignedIn);
        }
        if name.is_empty() {
            return Err(SignInError::EmptyName);
        }
        let mut names = self.names.write().unwrap();
        if names.contains_key(name) {
            return Err(SignInError::NameTaken);
        }
        let player = PlayerId(self.next_player.fetch_add(1, Ordering::Relaxed));
        names.insert(name.to_owned(), player);
        drop(names);

        *session.player.write().unwrap() = Some(player);
        *session.name.write().unwrap() = Some(name.to_owned());
        self.by_player
            .write()
            .unwrap()
            .insert(player, session.clone());
        Ok(player)
    }

    pub fn session_for(&self, player: PlayerId) -> Option<Arc<Session>> {
        self.by_player.read().unwrap().get(&player).cloned()
    }

    /// Drop a closed connection. The name is released so the player can sign
    /// back in; their battle seat survives via the battle registry.
    pub fn close(&self, session: &Session) -> Option<PlayerId> {
        self.by_conn.write().unwrap().remove(&session.conn);
        let player = session.player()?;
        self.by_player.write().unwrap().remove(&player);
        if let Some(name) = session.name() {
            self.names.write().unwrap().remove(&name);
        }
        Some(player)
    }

    pub fn connection_count(&self) -> usize {
        self.by_conn.read().unwrap().len()
    }
}

impl Outbox for SessionRegistry {
    fn send(&self, player: PlayerId, message: &ServerMessage) {
        match self.session_for(player) {
            Some(session) => session.send(message),
            // Disconnected players miss effect batches; the join snapshot
            // resynchronizes them when they come back.
            None => tracing::debug!(player = player.0, "no session for player, message dropped"),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SignInError {
    #[error("session already signed in")]
    AlreadySignedIn,
    #[error("name must not be empty")]
    EmptyName,
    #[error("name already in use")]
    NameTaken,
}
