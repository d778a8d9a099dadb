// Per-message dispatch metadata: allowed session kinds and auth requirement.
//
// The server keeps two registries keyed by the `msg` discriminator — one for
// inbound (client→server) messages, one for outbound — each declaring which
// session kinds may carry the message and whether an authenticated player is
// required. The tables are plain static slices built at compile time; the
// handler side of dispatch is registered explicitly at startup in the server
// crate. There is no runtime type scanning anywhere.
//
// A connection has exactly one `SessionKind` (one TCP listener per kind), but
// a message may be valid on several kinds, hence the bitmask.

use serde::{Deserialize, Serialize};

/// What a TCP listener (and every connection accepted from it) is for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Server discovery: answers `ServerInfo` and nothing else.
    Lookup,
    /// Chat / rooms / deck building. Out of battle-core scope, but sign-in
    /// and matchmaking messages are valid here.
    Lobby,
    /// Battle play: everything from sign-in to effects.
    Battle,
}

impl SessionKind {
    fn bit(self) -> u8 {
        match self {
            SessionKind::Lookup => 0b001,
            SessionKind::Lobby => 0b010,
            SessionKind::Battle => 0b100,
        }
    }
}

/// Bitmask of session kinds a message is allowed on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SessionKinds(u8);

impl SessionKinds {
    pub const LOOKUP: SessionKinds = SessionKinds(0b001);
    pub const LOBBY: SessionKinds = SessionKinds(0b010);
    pub const BATTLE: SessionKinds = SessionKinds(0b100);
    pub const LOBBY_AND_BATTLE: SessionKinds = SessionKinds(0b110);
    pub const ALL: SessionKinds = SessionKinds(0b111);

    pub fn contains(self, kind: SessionKind) -> bool {
        self.0 & kind.bit() != 0
    }
}

/// Dispatch metadata for one message discriminator.
#[derive(Clone, Copy, Debug)]
pub struct MessageMeta {
    pub kinds: SessionKinds,
    pub requires_auth: bool,
}

const fn meta(kinds: SessionKinds, requires_auth: bool) -> MessageMeta {
    MessageMeta {
        kinds,
        requires_auth,
    }
}

/// Inbound (client→server) message metadata, keyed by discriminator.
static INBOUND: &[(&str, MessageMeta)] = &[
    ("SignIn", meta(SessionKinds::LOBBY_AND_BATTLE, false)),
    ("ServerInfo", meta(SessionKinds::LOOKUP, false)),
    ("Ping", meta(SessionKinds::ALL, false)),
    ("QuickMatch", meta(SessionKinds::BATTLE, true)),
    ("PlayAi", meta(SessionKinds::BATTLE, true)),
    ("JoinBattle", meta(SessionKinds::BATTLE, true)),
    ("EndPhase", meta(SessionKinds::BATTLE, true)),
    ("PlayScroll", meta(SessionKinds::BATTLE, true)),
    ("Surrender", meta(SessionKinds::BATTLE, true)),
    ("LeaveGame", meta(SessionKinds::BATTLE, true)),
];

/// Outbound (server→client) message metadata, keyed by discriminator.
static OUTBOUND: &[(&str, MessageMeta)] = &[
    ("Ok", meta(SessionKinds::ALL, false)),
    ("Fail", meta(SessionKinds::ALL, false)),
    ("FatalFail", meta(SessionKinds::ALL, false)),
    ("ServerInfo", meta(SessionKinds::LOOKUP, false)),
    ("Pong", meta(SessionKinds::ALL, false)),
    ("SignInOk", meta(SessionKinds::LOBBY_AND_BATTLE, false)),
    ("GameInfo", meta(SessionKinds::BATTLE, true)),
    ("GameState", meta(SessionKinds::BATTLE, true)),
    ("NewEffects", meta(SessionKinds::BATTLE, true)),
];

/// Look up inbound metadata by discriminator. `None` means the discriminator
/// is unknown and the message must be dropped.
pub fn inbound_meta(discriminator: &str) -> Option<&'static MessageMeta> {
    INBOUND
        .iter()
        .find(|(name, _)| *name == discriminator)
        .map(|(_, m)| m)
}

/// Look up outbound metadata by discriminator.
pub fn outbound_meta(discriminator: &str) -> Option<&'static MessageMeta> {
    OUTBOUND
        .iter()
        .find(|(name, _)| *name == discriminator)
        .map(|(_, m)| m)
}
