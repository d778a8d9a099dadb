// Card behavior slots.
//
// Non-summon scrolls act through a named behavior looked up in a static
// table. Templates carry the behavior name as data; adding a card means
// adding a table row, not a type.

use scrollforge_protocol::effect::Effect;
use scrollforge_protocol::types::{SideColor, TileRef};

use crate::battle::Battle;

pub type OnPlay = fn(&mut Battle, SideColor, TileRef, &mut Vec<Effect>);

pub struct ScrollBehavior {
    pub on_play: OnPlay,
}

const BOLT_DAMAGE: i32 = 3;

static TABLE: &[(&str, ScrollBehavior)] = &[
    ("bolt", ScrollBehavior { on_play: bolt }),
    ("rally", ScrollBehavior { on_play: rally }),
];

pub fn lookup(name: &str) -> Option<&'static ScrollBehavior> {
    TABLE
        .iter()
        .find(|(n, _)| *n == name)
        .map(|(_, slot)| slot)
}

fn bolt(battle: &mut Battle, caster: SideColor, tile: TileRef, effects: &mut Vec<Effect>) {
    battle.damage_unit_at(tile, BOLT_DAMAGE, caster, effects);
}

fn rally(battle: &mut Battle, _caster: SideColor, tile: TileRef, effects: &mut Vec<Effect>) {
    battle.buff_unit_at(tile, 1, 1, effects);
}
