// Protocol messages for client-server communication.
//
// Two enums define the full protocol vocabulary:
// - `ClientMessage`: sent by game clients to the server.
// - `ServerMessage`: sent by the server to game clients.
//
// Every wire object carries a `msg` discriminator string; serde's internal
// tagging (`#[serde(tag = "msg")]`) both stamps it on the way out and selects
// the variant on the way in. Supporting snapshot structs (`IdolState`,
// `UnitState`, `ScrollState`) describe battle state for mid-battle join.
//
// Request/response is not strictly correlated: one inbound message can yield
// zero, one, or many outbound messages (a single played card produces a whole
// `NewEffects` batch).

use serde::{Deserialize, Serialize};

use crate::effect::Effect;
use crate::types::{
    AiDifficulty, BattleId, Phase, PlayerId, ScrollId, SideColor, TemplateId, TileRef,
};

/// Messages sent by a client to the server.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg")]
pub enum ClientMessage {
    /// Authenticate this connection under a player name.
    SignIn { name: String },
    /// Ask a lookup listener what it is serving.
    ServerInfo,
    /// Keepalive probe.
    Ping,
    /// Enter the quick-match queue with a deck of template ids.
    QuickMatch { deck: Vec<TemplateId> },
    /// Start a single-player battle against the AI.
    PlayAi {
        deck: Vec<TemplateId>,
        difficulty: AiDifficulty,
    },
    /// Attach to the caller's current battle and request a state snapshot.
    JoinBattle,
    /// Acknowledge / end the named phase. Server-authoritative: the named
    /// phase is checked against the battle's actual phase, not trusted.
    EndPhase { phase: Phase },
    /// Play a scroll from hand onto a board tile.
    PlayScroll { scroll: ScrollId, tile: TileRef },
    /// Concede the battle.
    Surrender,
    /// Leave a finished battle. Only honored once the battle has ended.
    LeaveGame,
}

impl ClientMessage {
    /// The `msg` discriminator this message serializes under.
    pub fn discriminator(&self) -> &'static str {
        match self {
            ClientMessage::SignIn { .. } => "SignIn",
            ClientMessage::ServerInfo => "ServerInfo",
            ClientMessage::Ping => "Ping",
            ClientMessage::QuickMatch { .. } => "QuickMatch",
            ClientMessage::PlayAi { .. } => "PlayAi",
            ClientMessage::JoinBattle => "JoinBattle",
            ClientMessage::EndPhase { .. } => "EndPhase",
            ClientMessage::PlayScroll { .. } => "PlayScroll",
            ClientMessage::Surrender => "Surrender",
            ClientMessage::LeaveGame => "LeaveGame",
        }
    }
}

/// Messages sent by the server to a client.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "msg")]
pub enum ServerMessage {
    /// Generic success acknowledgement for the named operation.
    Ok { op: String },
    /// Recoverable failure; the connection stays open.
    Fail { op: String, info: String },
    /// Fatal per-connection failure; the connection is expected to close.
    FatalFail { op: String, info: String },
    /// Lookup reply: what this server is and where the battle port lives.
    ServerInfo {
        name: String,
        version: String,
        battle_port: u16,
    },
    /// Keepalive reply.
    Pong,
    /// Sign-in accepted; carries the server-assigned player id.
    SignInOk { id: PlayerId },
    /// A match formed. Sent to both participants.
    GameInfo {
        battle: BattleId,
        color: SideColor,
        white: String,
        black: String,
    },
    /// Full battle snapshot, sent in response to `JoinBattle`.
    GameState {
        phase: Phase,
        round: u32,
        turn: SideColor,
        idols: Vec<IdolState>,
        units: Vec<UnitState>,
        hand: Vec<ScrollState>,
    },
    /// An ordered batch of state changes from one world-tick reaction.
    NewEffects { effects: Vec<Effect> },
}

impl ServerMessage {
    /// The `msg` discriminator this message serializes under.
    pub fn discriminator(&self) -> &'static str {
        match self {
            ServerMessage::Ok { .. } => "Ok",
            ServerMessage::Fail { .. } => "Fail",
            ServerMessage::FatalFail { .. } => "FatalFail",
            ServerMessage::ServerInfo { .. } => "ServerInfo",
            ServerMessage::Pong => "Pong",
            ServerMessage::SignInOk { .. } => "SignInOk",
            ServerMessage::GameInfo { .. } => "GameInfo",
            ServerMessage::GameState { .. } => "GameState",
            ServerMessage::NewEffects { .. } => "NewEffects",
        }
    }
}

/// Snapshot of one idol for `GameState`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdolState {
    pub color: SideColor,
    pub position: u8,
    pub hp: i32,
    pub max_hp: i32,
}

/// Snapshot of one board unit for `GameState`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitState {
    pub color: SideColor,
    pub row: u8,
    pub col: u8,
    pub template: TemplateId,
    pub health: i32,
    pub attack: i32,
    pub cooldown: i32,
}

/// Snapshot of one hand scroll for `GameState`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollState {
    pub id: ScrollId,
    pub template: TemplateId,
}
