// Observable game-state changes streamed to clients.
//
// Every mutation the battle engine makes is mirrored as an `Effect` record.
// Effects accumulate into an ordered batch per world-tick reaction and go out
// as a single `NewEffects` message; the order within a batch is append order,
// which must match causal order (damage before death, draws before
// `TurnBegin`, `Surrender` before the idol updates it causes).
//
// Each effect serializes with an `effect` tag field, mirroring the `msg` tag
// on the outer message envelope.

use serde::{Deserialize, Serialize};

use crate::types::{ScrollId, SideColor, TemplateId};

/// One serialized unit of observable game-state change.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "effect")]
pub enum Effect {
    /// A side drew a card into its hand.
    CardDrawn {
        color: SideColor,
        scroll: ScrollId,
        template: TemplateId,
    },
    /// A new round began. Emitted once per round, after the round's draws.
    TurnBegin { round: u32, color: SideColor },
    /// An idol's hit points changed. Emitted even when the idol died.
    IdolUpdate {
        color: SideColor,
        position: u8,
        hp: i32,
    },
    /// A creature or structure entered the board.
    UnitSummoned {
        color: SideColor,
        row: u8,
        col: u8,
        template: TemplateId,
        health: i32,
        attack: i32,
        cooldown: i32,
    },
    /// A board unit's stats changed.
    StatsUpdate {
        color: SideColor,
        row: u8,
        col: u8,
        health: i32,
        attack: i32,
        cooldown: i32,
    },
    /// A board unit was destroyed.
    UnitDestroyed { color: SideColor, row: u8, col: u8 },
    /// A side conceded. Precedes the idol updates it causes.
    Surrender { color: SideColor },
    /// The battle ended. Carries both sides' aggregate stats.
    EndGame {
        winner: SideColor,
        white: SideStats,
        black: SideStats,
    },
}

/// Aggregate per-side statistics reported in `EndGame`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SideStats {
    pub scrolls_played: u32,
    pub damage_dealt: u32,
    pub units_lost: u32,
}
