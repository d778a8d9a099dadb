// TCP client for talking to a scrollforge server.
//
// Non-blocking interface for tests and tooling:
// - `connect()` opens the TCP connection and spawns a background reader
//   thread feeding a `FrameBuffer`.
// - The reader thread deserializes `ServerMessage`s and pushes them into an
//   `mpsc` channel.
// - The caller holds the write half; `poll()` drains the inbox without
//   blocking.
//
// This lives in the server crate rather than the integration-test crate so
// any consumer gets it without extra plumbing; it has no dependency on the
// server internals, only on the protocol.

use std::io::{self, BufWriter, Read};
use std::net::{SocketAddr, TcpStream};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use scrollforge_protocol::framing::{FrameBuffer, write_frame};
use scrollforge_protocol::message::{ClientMessage, ServerMessage};

/// A connected client with a background reader.
pub struct NetClient {
    writer: BufWriter<TcpStream>,
    inbox: Receiver<ServerMessage>,
    _reader_thread: JoinHandle<()>,
}

impl NetClient {
    /// Connect to one of the server's listeners.
    pub fn connect(addr: SocketAddr) -> io::Result<Self> {
        let stream = TcpStream::connect(addr)?;
        let reader_stream = stream.try_clone()?;
        let writer = BufWriter::new(stream);

        let (tx, inbox) = mpsc::channel();
        let reader_thread = thread::spawn(move || {
            reader_loop(reader_stream, tx);
        });

        Ok(Self {
            writer,
            inbox,
            _reader_thread: reader_thread,
        })
    }

    /// Serialize and send one message.
    pub fn send(&mut self, message: &ClientMessage) -> io::Result<()> {
        let bytes = serde_json::to_vec(message)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;
        write_frame(&mut self.writer, &bytes)
    }

    /// Send raw bytes, bypassing serialization. For protocol-violation tests.
    pub fn send_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        use std::io::Write;
        self.writer.write_all(bytes)?;
        self.writer.flush()
    }

    /// Drain every message received so far without blocking.
    pub fn poll(&mut self) -> Vec<ServerMessage> {
        let mut messages = Vec::new();
        loop {
            match self.inbox.try_recv() {
                Ok(message) => messages.push(message),
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        messages
    }

    /// Block until a message satisfying `pred` arrives or the timeout
    /// elapses. Intervening messages are discarded.
    pub fn wait_for(
        &mut self,
        timeout: Duration,
        mut pred: impl FnMut(&ServerMessage) -> bool,
    ) -> Option<ServerMessage> {
        let deadline = std::time::Instant::now() + timeout;
        loop {
            let remaining = deadline.checked_duration_since(std::time::Instant::now())?;
            match self.inbox.recv_timeout(remaining) {
                Ok(message) if pred(&message) => return Some(message),
                Ok(_) => {}
                Err(_) => return None,
            }
        }
    }
}

fn reader_loop(mut stream: TcpStream, tx: mpsc::Sender<ServerMessage>) {
    let mut buffer = FrameBuffer::new();
    let mut chunk = [0u8; 4096];
    loop {
        let n = match stream.read(&mut chunk) {
            Ok(0) | Err(_) => return,
            Ok(n) => n,
        };
        buffer.push(&chunk[..n]);
        loop {
            match buffer.next_frame() {
                Ok(Some(frame)) => match serde_json::from_slice::<ServerMessage>(&frame) {
                    Ok(message) => {
                        if tx.send(message).is_err() {
                            return;
                        }
                    }
                    Err(error) => {
                        tracing::debug!(%error, "client failed to parse server message");
                    }
                },
                Ok(None) => break,
                Err(_) => return,
            }
        }
    }
}
