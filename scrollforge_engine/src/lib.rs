//! Battle engine for the scrollforge server.
//!
//! The engine is deterministic and single-threaded at its core: a `Battle`
//! mutates only on the world-tick thread, fed by per-side `MoveQueue`s that
//! network handlers fill. All randomness flows through a seeded `GameRng`,
//! so a battle's full course is reproducible from its seed and move stream.
//!
//! Layering, bottom up:
//!
//! - [`template`]: immutable card definitions and player-owned instances.
//! - [`idol`], [`unit`], [`board`]: the pieces on one side's 3x5 board and
//!   the pure targeting resolver.
//! - [`side`]: one player's full holdings (hand, library, graveyard, board,
//!   idols, stats).
//! - [`behavior`]: the named-slot table non-summon scrolls act through.
//! - [`battle`]: the phase and turn state machine.
//! - [`moves`], [`registry`], [`tick`]: the concurrency shell around it.

pub mod battle;
pub mod behavior;
pub mod board;
pub mod idol;
pub mod moves;
pub mod registry;
pub mod side;
pub mod template;
pub mod tick;
pub mod unit;

pub use battle::{Battle, Reaction, SideSpec};
pub use board::{TargetCategory, eligible_tiles};
pub use moves::{MoveQueue, PendingMove};
pub use registry::{BattleHandle, BattleRegistry};
pub use template::{ScrollInstance, ScrollKind, ScrollTemplate, TemplateStore};
pub use tick::{Outbox, spawn_world_tick, tick_battle};
