// Core ID and board types for the battle protocol.
//
// These are lightweight newtypes and enums used by both `message.rs` (wire
// messages) and the engine crate's battle state. They are server-scoped
// identifiers: the server assigns compact integer IDs to players, battles and
// scroll instances for efficient wire representation.
//
// `TileRef` carries its validation with it: deserialization goes through
// `WireTile`, so an out-of-range coordinate or unknown color code is a
// deserialize error (malformed input), never a panic deeper in the engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Board width in columns (per side).
pub const BOARD_COLS: u8 = 3;
/// Board height in rows (per side). Rows align with the five idol positions.
pub const BOARD_ROWS: u8 = 5;
/// Idols per side, one per board row.
pub const IDOL_COUNT: usize = 5;
/// Starting and maximum idol hit points.
pub const IDOL_MAX_HP: i32 = 10;
/// Cards drawn by each side at the start of the first round.
pub const INITIAL_HAND_SIZE: usize = 4;

/// Server-assigned player ID. `PlayerId::AI` (0) marks an AI-controlled side.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u64);

impl PlayerId {
    pub const AI: PlayerId = PlayerId(0);

    pub fn is_ai(self) -> bool {
        self == Self::AI
    }
}

/// Registry-assigned battle ID, monotonically increasing.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BattleId(pub u64);

/// Per-battle scroll instance ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ScrollId(pub u64);

/// Card definition ID (immutable template, looked up in the template store).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TemplateId(pub u32);

/// One of the two competing sides in a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SideColor {
    Black,
    White,
}

impl SideColor {
    pub fn opposite(self) -> SideColor {
        match self {
            SideColor::Black => SideColor::White,
            SideColor::White => SideColor::Black,
        }
    }

    /// Side slot in a battle's two-element side array.
    pub fn index(self) -> usize {
        match self {
            SideColor::Black => 0,
            SideColor::White => 1,
        }
    }
}

impl fmt::Display for SideColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SideColor::Black => write!(f, "black"),
            SideColor::White => write!(f, "white"),
        }
    }
}

/// The ordered stages a battle round passes through. `End` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Phase {
    Init,
    PreMain,
    Main,
    End,
}

/// AI opponent difficulty for single-player battles.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AiDifficulty {
    #[default]
    Easy,
    Medium,
    Hard,
}

/// What kind of match a battle is.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BattleKind {
    Ranked,
    Unranked,
    SinglePlayer,
}

/// A validated board tile reference: side color, row, column.
///
/// Wire identity is the 3-tuple `(color, row, col)`. Construction and
/// deserialization both reject out-of-range coordinates, so any `TileRef`
/// held by the engine is a legal board cell.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "WireTile", into = "WireTile")]
pub struct TileRef {
    color: SideColor,
    row: u8,
    col: u8,
}

impl TileRef {
    /// Build a tile reference, rejecting coordinates off the 3x5 grid.
    pub fn new(color: SideColor, row: u8, col: u8) -> Result<TileRef, TileError> {
        if row >= BOARD_ROWS || col >= BOARD_COLS {
            return Err(TileError::OutOfRange { row, col });
        }
        Ok(TileRef { color, row, col })
    }

    pub fn color(self) -> SideColor {
        self.color
    }

    pub fn row(self) -> u8 {
        self.row
    }

    pub fn col(self) -> u8 {
        self.col
    }
}

/// Raw wire shape for `TileRef`, validated on the way in.
#[derive(Serialize, Deserialize)]
struct WireTile {
    color: SideColor,
    row: u8,
    col: u8,
}

impl TryFrom<WireTile> for TileRef {
    type Error = TileError;

    fn try_from(raw: WireTile) -> Result<TileRef, TileError> {
        TileRef::new(raw.color, raw.row, raw.col)
    }
}

impl From<TileRef> for WireTile {
    fn from(tile: TileRef) -> WireTile {
        WireTile {
            color: tile.color,
            row: tile.row,
            col: tile.col,
        }
    }
}

/// Rejection reason for a malformed tile reference.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TileError {
    OutOfRange { row: u8, col: u8 },
}

impl fmt::Display for TileError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TileError::OutOfRange { row, col } => {
                write!(f, "tile ({row}, {col}) is off the {BOARD_ROWS}x{BOARD_COLS} board")
            }
        }
    }
}

impl std::error::Error for TileError {}
