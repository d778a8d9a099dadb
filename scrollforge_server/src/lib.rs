//! The scrollforge battle server.
//!
//! Network front-end over the engine: three TCP listeners (lookup, lobby,
//! battle), per-connection sessions with framed JSON messaging, a statically
//! registered dispatch table, and handlers that translate validated client
//! messages into engine moves. All shared state travels through an explicit
//! [`context::AppContext`].
//!
//! `client::NetClient` is a small blocking client used by the integration
//! tests and handy for manual poking.

pub mod client;
pub mod context;
pub mod dispatch;
pub mod handlers;
pub mod matchmaker;
pub mod server;
pub mod session;

pub use client::NetClient;
pub use context::{AppContext, SERVER_VERSION, ServerConfig};
pub use server::{ServerHandle, start_server};
pub use session::{Session, SessionRegistry};
