// scrollforge_protocol — wire protocol for the battle server.
//
// This crate defines the message types, framing, and dispatch metadata used
// by the server (`scrollforge_server`) and game clients to communicate over
// TCP. It is shared between both sides and has no dependency on the engine
// crate — the engine depends on it for the wire vocabulary.
//
// Module overview:
// - `types.rs`:   Core IDs and board types — `PlayerId`, `BattleId`,
//                 `SideColor`, `Phase`, `TileRef` (validated on parse).
// - `message.rs`: Client-to-server and server-to-client message enums, tagged
//                 with the `msg` discriminator field, plus state snapshots.
// - `effect.rs`:  `Effect` records — the observable state changes streamed to
//                 clients in ordered batches.
// - `meta.rs`:    Per-discriminator dispatch metadata (session-kind bitmask,
//                 auth flag) as statically built tables.
// - `framing.rs`: Splitting the delimiter-free back-to-back JSON stream into
//                 frames with a string-aware brace scanner.
//
// Design decisions:
// - **Internally tagged JSON.** Every wire object carries `"msg": "<Name>"`;
//   serde stamps and selects on it, so the discriminator is never assembled
//   by hand.
// - **No async runtime.** Framing works over `std::io::Read`/`Write`,
//   compatible with blocking TCP streams and buffered wrappers.
// - **Metadata without reflection.** Allowed session kinds and auth flags
//   live in static tables keyed by discriminator; handlers are registered
//   explicitly in the server crate.

pub mod effect;
pub mod framing;
pub mod message;
pub mod meta;
pub mod types;

pub use effect::{Effect, SideStats};
pub use framing::{FrameBuffer, FrameError, MAX_MESSAGE_SIZE, write_frame};
pub use message::{ClientMessage, IdolState, ScrollState, ServerMessage, UnitState};
pub use meta::{MessageMeta, SessionKind, SessionKinds, inbound_meta, outbound_meta};
pub use types::{
    AiDifficulty, BattleId, BattleKind, Phase, PlayerId, ScrollId, SideColor, TemplateId, TileRef,
};
