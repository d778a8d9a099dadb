// Inbound message dispatch.
//
// One framed JSON object in, at most one synchronous handler call out, on
// the network thread that read it. The pipeline, in order:
//
//   1. parse the frame as a JSON object (size was already capped by framing)
//   2. read the `msg` discriminator
//   3. look up its metadata and its explicitly registered handler
//   4. check the session kind against the metadata
//   5. check authentication against the metadata
//   6. deserialize the typed payload
//   7. call the handler
//
// A failure at any step is logged and the frame is dropped: no error packet
// goes back to the peer and the connection stays open, so a probing client
// learns nothing about the protocol surface. Handlers themselves may answer
// game-rule violations with `Fail` (deck not found, not in a battle).
// Handlers are registered in a plain static table keyed by discriminator;
// nothing is discovered at runtime.

use std::sync::Arc;

use scrollforge_protocol::message::ClientMessage;
use scrollforge_protocol::meta::inbound_meta;

use crate::context::AppContext;
use crate::handlers;
use crate::session::Session;

pub type Handler = fn(&AppContext, &Arc<Session>, ClientMessage);

static HANDLERS: &[(&str, Handler)] = &[
    ("SignIn", handlers::sign_in),
    ("ServerInfo", handlers::server_info),
    ("Ping", handlers::ping),
    ("QuickMatch", handlers::quick_match),
    ("PlayAi", handlers::play_ai),
    ("JoinBattle", handlers::join_battle),
    ("EndPhase", handlers::end_phase),
    ("PlayScroll", handlers::play_scroll),
    ("Surrender", handlers::surrender),
    ("LeaveGame", handlers::leave_game),
];

fn handler_for(discriminator: &str) -> Option<Handler> {
    HANDLERS
        .iter()
        .find(|(name, _)| *name == discriminator)
        .map(|(_, h)| *h)
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("malformed json: {0}")]
    Malformed(serde_json::Error),
    #[error("missing msg discriminator")]
    MissingDiscriminator,
    #[error("unknown message {0:?}")]
    Unknown(String),
    #[error("{0} not accepted on this session kind")]
    WrongKind(String),
    #[error("sign-in required")]
    Unauthenticated(String),
    #[error("invalid payload: {1}")]
    BadPayload(String, serde_json::Error),
}

/// Run one frame through the pipeline. The caller logs the error and drops
/// the frame; the connection stays open either way.
pub fn dispatch_frame(
    ctx: &AppContext,
    session: &Arc<Session>,
    frame: &[u8],
) -> Result<(), DispatchError> {
    let value: serde_json::Value =
        serde_json::from_slice(frame).map_err(DispatchError::Malformed)?;
    let op = value
        .get("msg")
        .and_then(|v| v.as_str())
        .ok_or(DispatchError::MissingDiscriminator)?
        .to_owned();

    let meta = inbound_meta(&op).ok_or_else(|| DispatchError::Unknown(op.clone()))?;
    let handler = handler_for(&op).ok_or_else(|| DispatchError::Unknown(op.clone()))?;

    if !meta.kinds.contains(session.kind) {
        return Err(DispatchError::WrongKind(op));
    }
    if meta.requires_auth && !session.is_authenticated() {
        return Err(DispatchError::Unauthenticated(op));
    }

    let message: ClientMessage =
        serde_json::from_value(value).map_err(|e| DispatchError::BadPayload(op, e))?;

    tracing::trace!(conn = session.conn.0, op = message.discriminator(), "dispatch");
    handler(ctx, session, message);
    Ok(())
}
