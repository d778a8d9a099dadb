// Board units.
//
// A `Unit` is a scroll instance placed on the board: it keeps the instance id
// (the card never stops existing, it just changes container) plus current and
// maximum combat stats. Position is held by the owning `Board` cell; the unit
// itself only knows its side.

use scrollforge_protocol::types::{ScrollId, SideColor, TemplateId};

use crate::template::ScrollInstance;

/// A card instance standing on the board.
#[derive(Clone, Debug)]
pub struct Unit {
    pub owner: SideColor,
    pub scroll: ScrollId,
    pub template: TemplateId,
    pub health: i32,
    pub max_health: i32,
    pub attack: i32,
    pub max_attack: i32,
    pub cooldown: i32,
    pub max_cooldown: i32,
}

impl Unit {
    pub fn summon(owner: SideColor, instance: &ScrollInstance) -> Self {
        Self {
            owner,
            scroll: instance.id,
            template: instance.template,
            health: instance.health,
            max_health: instance.health,
            attack: instance.attack,
            max_attack: instance.attack,
            cooldown: instance.cooldown,
            max_cooldown: instance.cooldown,
        }
    }

    /// Apply damage. Returns true if the unit died.
    pub fn damage(&mut self, amount: i32) -> bool {
        self.health -= amount.max(0);
        self.health <= 0
    }

    /// Count down toward the unit's attack; at zero the unit strikes and the
    /// counter resets. Returns true when the strike is due.
    pub fn tick_cooldown(&mut self) -> bool {
        if self.cooldown > 0 {
            self.cooldown -= 1;
        }
        if self.cooldown == 0 && self.max_cooldown > 0 {
            self.cooldown = self.max_cooldown;
            true
        } else {
            false
        }
    }
}
