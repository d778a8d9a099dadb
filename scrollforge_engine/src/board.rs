// Per-side board grid and the targeting resolver.
//
// Each side owns a 3-column by 5-row grid of cells; rows align with the five
// idol positions. `eligible_tiles` is a pure function over two board
// snapshots: given the scroll being played it returns every tile the scroll
// may legally land on. The resolver never mutates anything — the battle state
// machine consults it, then performs the placement itself.

use scrollforge_protocol::types::{BOARD_COLS, BOARD_ROWS, SideColor, TemplateId, TileRef};

use crate::template::{ScrollKind, ScrollTemplate};
use crate::unit::Unit;

pub const ROWS: usize = BOARD_ROWS as usize;
pub const COLS: usize = BOARD_COLS as usize;

/// The six target categories a scroll can declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TargetCategory {
    /// Any empty tile on either side.
    AnyEmpty,
    /// An empty tile on the caster's side.
    OwnEmpty,
    /// An empty tile on the opponent's side.
    OppEmpty,
    /// Any occupied tile on either side.
    AnyOccupied,
    /// An occupied tile on the caster's side.
    OwnOccupied,
    /// An occupied tile on the opponent's side.
    OppOccupied,
}

impl TargetCategory {
    /// Default category for a card kind, used when the template registers no
    /// explicit target.
    pub fn default_for(kind: ScrollKind) -> TargetCategory {
        match kind {
            ScrollKind::Spell | ScrollKind::Enchantment => TargetCategory::AnyOccupied,
            ScrollKind::Creature | ScrollKind::Structure => TargetCategory::OwnEmpty,
        }
    }
}

/// One side's half of the battlefield.
#[derive(Clone, Debug, Default)]
pub struct Board {
    cells: [[Option<Unit>; COLS]; ROWS],
}

impl Board {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, row: u8, col: u8) -> Option<&Unit> {
        self.cells[row as usize][col as usize].as_ref()
    }

    pub fn get_mut(&mut self, row: u8, col: u8) -> Option<&mut Unit> {
        self.cells[row as usize][col as usize].as_mut()
    }

    pub fn is_empty_at(&self, row: u8, col: u8) -> bool {
        self.cells[row as usize][col as usize].is_none()
    }

    /// Place a unit. The caller has already checked the cell is empty; a
    /// previous occupant would be a rules violation, so it is returned for
    /// the caller to treat as an error rather than silently dropped.
    pub fn place(&mut self, row: u8, col: u8, unit: Unit) -> Option<Unit> {
        self.cells[row as usize][col as usize].replace(unit)
    }

    pub fn remove(&mut self, row: u8, col: u8) -> Option<Unit> {
        self.cells[row as usize][col as usize].take()
    }

    /// Iterate all units with their positions.
    pub fn units(&self) -> impl Iterator<Item = (u8, u8, &Unit)> {
        self.cells.iter().enumerate().flat_map(|(row, cols)| {
            cols.iter().enumerate().filter_map(move |(col, cell)| {
                cell.as_ref().map(|unit| (row as u8, col as u8, unit))
            })
        })
    }

    pub fn unit_count(&self) -> usize {
        self.units().count()
    }

    /// Positions of all units, optionally filtered to one template id (used
    /// by abilities that target only a specific summon type).
    fn occupied_tiles(
        &self,
        color: SideColor,
        filter: Option<TemplateId>,
        out: &mut Vec<TileRef>,
    ) {
        for (row, col, unit) in self.units() {
            if filter.is_some_and(|t| unit.template != t) {
                continue;
            }
            if let Ok(tile) = TileRef::new(color, row, col) {
                out.push(tile);
            }
        }
    }

    /// Complement of the occupied cells.
    fn empty_tiles(&self, color: SideColor, out: &mut Vec<TileRef>) {
        for row in 0..BOARD_ROWS {
            for col in 0..BOARD_COLS {
                if self.is_empty_at(row, col) {
                    if let Ok(tile) = TileRef::new(color, row, col) {
                        out.push(tile);
                    }
                }
            }
        }
    }
}

/// Resolve the set of tiles `template` may target, given both boards.
///
/// Policy, in priority order: the template's explicit target category if it
/// registered one, otherwise the default for its kind. `filter` narrows
/// occupied searches to a single template id and is ignored for empty
/// searches.
pub fn eligible_tiles(
    own: &Board,
    opp: &Board,
    own_color: SideColor,
    template: &ScrollTemplate,
    filter: Option<TemplateId>,
) -> Vec<TileRef> {
    let category = template
        .target
        .unwrap_or_else(|| TargetCategory::default_for(template.kind));
    let opp_color = own_color.opposite();
    let mut out = Vec::new();

    match category {
        TargetCategory::AnyEmpty => {
            own.empty_tiles(own_color, &mut out);
            opp.empty_tiles(opp_color, &mut out);
        }
        TargetCategory::OwnEmpty => own.empty_tiles(own_color, &mut out),
        TargetCategory::OppEmpty => opp.empty_tiles(opp_color, &mut out),
        TargetCategory::AnyOccupied => {
            own.occupied_tiles(own_color, filter, &mut out);
            opp.occupied_tiles(opp_color, filter, &mut out);
        }
        TargetCategory::OwnOccupied => own.occupied_tiles(own_color, filter, &mut out),
        TargetCategory::OppOccupied => opp.occupied_tiles(opp_color, filter, &mut out),
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::{ScrollInstance, TemplateStore};
    use scrollforge_protocol::types::ScrollId;

    fn store() -> TemplateStore {
        TemplateStore::builtin()
    }

    fn summon_at(board: &mut Board, color: SideColor, template: TemplateId, row: u8, col: u8) {
        let t = store().get(template).unwrap().clone();
        let inst = ScrollInstance::from_template(ScrollId(u64::from(row) * 10 + u64::from(col)), &t);
        assert!(board.place(row, col, Unit::summon(color, &inst)).is_none());
    }

    #[test]
    fn empty_board_has_fifteen_own_empty_tiles() {
        let own = Board::new();
        let opp = Board::new();
        let creature = store().get(TemplateId(1)).unwrap().clone();

        let tiles = eligible_tiles(&own, &opp, SideColor::Black, &creature, None);
        assert_eq!(tiles.len(), 15);
        assert!(tiles.iter().all(|t| t.color() == SideColor::Black));
    }

    #[test]
    fn placing_a_unit_removes_its_tile_from_empty_search() {
        let mut own = Board::new();
        let opp = Board::new();
        summon_at(&mut own, SideColor::Black, TemplateId(1), 2, 1);
        let creature = store().get(TemplateId(1)).unwrap().clone();

        let tiles = eligible_tiles(&own, &opp, SideColor::Black, &creature, None);
        assert_eq!(tiles.len(), 14);
        assert!(!tiles.contains(&TileRef::new(SideColor::Black, 2, 1).unwrap()));
    }

    #[test]
    fn own_occupied_finds_exactly_the_placed_unit() {
        let mut own = Board::new();
        let opp = Board::new();
        summon_at(&mut own, SideColor::Black, TemplateId(1), 2, 1);
        let rally = store().get(TemplateId(4)).unwrap().clone();

        let tiles = eligible_tiles(&own, &opp, SideColor::Black, &rally, None);
        assert_eq!(tiles, vec![TileRef::new(SideColor::Black, 2, 1).unwrap()]);
    }

    #[test]
    fn opp_occupied_looks_at_the_other_board() {
        let mut own = Board::new();
        let mut opp = Board::new();
        summon_at(&mut own, SideColor::Black, TemplateId(1), 0, 0);
        summon_at(&mut opp, SideColor::White, TemplateId(5), 4, 2);
        let bolt = store().get(TemplateId(3)).unwrap().clone();

        let tiles = eligible_tiles(&own, &opp, SideColor::Black, &bolt, None);
        assert_eq!(tiles, vec![TileRef::new(SideColor::White, 4, 2).unwrap()]);
    }

    #[test]
    fn spell_without_explicit_target_defaults_to_any_occupied() {
        let mut spell = store().get(TemplateId(3)).unwrap().clone();
        spell.target = None;

        let mut own = Board::new();
        let mut opp = Board::new();
        summon_at(&mut own, SideColor::Black, TemplateId(1), 0, 0);
        summon_at(&mut opp, SideColor::White, TemplateId(1), 1, 1);

        let tiles = eligible_tiles(&own, &opp, SideColor::Black, &spell, None);
        assert_eq!(tiles.len(), 2);
    }

    #[test]
    fn template_filter_narrows_occupied_search() {
        let mut own = Board::new();
        let opp = Board::new();
        summon_at(&mut own, SideColor::Black, TemplateId(1), 0, 0);
        summon_at(&mut own, SideColor::Black, TemplateId(2), 1, 0);
        let rally = store().get(TemplateId(4)).unwrap().clone();

        let tiles = eligible_tiles(&own, &opp, SideColor::Black, &rally, Some(TemplateId(2)));
        assert_eq!(tiles, vec![TileRef::new(SideColor::Black, 1, 0).unwrap()]);
    }

    #[test]
    fn full_board_yields_no_empty_tiles() {
        let mut own = Board::new();
        let opp = Board::new();
        for row in 0..BOARD_ROWS {
            for col in 0..BOARD_COLS {
                summon_at(&mut own, SideColor::Black, TemplateId(1), row, col);
            }
        }
        let creature = store().get(TemplateId(1)).unwrap().clone();
        let tiles = eligible_tiles(&own, &opp, SideColor::Black, &creature, None);
        assert!(tiles.is_empty());
    }
}
