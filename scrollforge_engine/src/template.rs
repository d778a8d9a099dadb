// Scroll templates and instances.
//
// A `ScrollTemplate` is the immutable definition of a card: base stats, kind,
// an optional explicit target category, and an optional behavior slot name
// (see `behavior.rs`). A `ScrollInstance` is one player-owned mutable copy of
// a template; it lives in exactly one container at a time — hand, library,
// graveyard, or (as a `Unit`) the board.
//
// The real asset pipeline is an external collaborator: templates reach the
// engine as an immutable lookup-by-id table. `TemplateStore::builtin()`
// provides the small set the server ships with.

use rustc_hash::FxHashMap;
use scrollforge_protocol::types::{ScrollId, TemplateId};

use crate::board::TargetCategory;

/// Card kind. Determines the default target category when a template does
/// not register an explicit one.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ScrollKind {
    Creature,
    Spell,
    Structure,
    Enchantment,
}

/// Immutable card definition.
#[derive(Clone, Debug)]
pub struct ScrollTemplate {
    pub id: TemplateId,
    pub name: &'static str,
    pub kind: ScrollKind,
    pub attack: i32,
    pub health: i32,
    pub cooldown: i32,
    /// Explicit target category; `None` falls back to the kind default.
    pub target: Option<TargetCategory>,
    /// Behavior slot name looked up in the behavior table on play.
    pub behavior: Option<&'static str>,
}

/// Immutable lookup-by-id table of card definitions.
#[derive(Clone, Debug, Default)]
pub struct TemplateStore {
    templates: FxHashMap<TemplateId, ScrollTemplate>,
}

impl TemplateStore {
    /// The built-in template set.
    pub fn builtin() -> Self {
        let mut templates = FxHashMap::default();
        for t in BUILTIN {
            templates.insert(t.id, t.clone());
        }
        Self { templates }
    }

    pub fn get(&self, id: TemplateId) -> Option<&ScrollTemplate> {
        self.templates.get(&id)
    }

    pub fn contains(&self, id: TemplateId) -> bool {
        self.templates.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}

static BUILTIN: &[ScrollTemplate] = &[
    ScrollTemplate {
        id: TemplateId(1),
        name: "Thornling",
        kind: ScrollKind::Creature,
        attack: 2,
        health: 3,
        cooldown: 2,
        target: None,
        behavior: None,
    },
    ScrollTemplate {
        id: TemplateId(2),
        name: "Barkwall",
        kind: ScrollKind::Structure,
        attack: 0,
        health: 5,
        cooldown: 0,
        target: None,
        behavior: None,
    },
    ScrollTemplate {
        id: TemplateId(3),
        name: "Hex Bolt",
        kind: ScrollKind::Spell,
        attack: 0,
        health: 0,
        cooldown: 0,
        target: Some(TargetCategory::OppOccupied),
        behavior: Some("bolt"),
    },
    ScrollTemplate {
        id: TemplateId(4),
        name: "Rallying Cry",
        kind: ScrollKind::Enchantment,
        attack: 0,
        health: 0,
        cooldown: 0,
        target: Some(TargetCategory::OwnOccupied),
        behavior: Some("rally"),
    },
    ScrollTemplate {
        id: TemplateId(5),
        name: "Emberwing",
        kind: ScrollKind::Creature,
        attack: 3,
        health: 2,
        cooldown: 3,
        target: None,
        behavior: None,
    },
];

/// One player-owned copy of a template with mutable lifetime stats.
#[derive(Clone, Debug)]
pub struct ScrollInstance {
    pub id: ScrollId,
    pub template: TemplateId,
    pub attack: i32,
    pub health: i32,
    pub cooldown: i32,
}

impl ScrollInstance {
    pub fn from_template(id: ScrollId, template: &ScrollTemplate) -> Self {
        Self {
            id,
            template: template.id,
            attack: template.attack,
            health: template.health,
            cooldown: template.cooldown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtin_store_resolves_ids() {
        let store = TemplateStore::builtin();
        assert!(!store.is_empty());
        let bolt = store.get(TemplateId(3)).unwrap();
        assert_eq!(bolt.name, "Hex Bolt");
        assert_eq!(bolt.kind, ScrollKind::Spell);
        assert_eq!(bolt.target, Some(TargetCategory::OppOccupied));
    }

    #[test]
    fn unknown_template_is_absent() {
        let store = TemplateStore::builtin();
        assert!(store.get(TemplateId(9999)).is_none());
        assert!(!store.contains(TemplateId(9999)));
    }

    #[test]
    fn instance_copies_template_stats() {
        let store = TemplateStore::builtin();
        let thornling = store.get(TemplateId(1)).unwrap();
        let inst = ScrollInstance::from_template(ScrollId(7), thornling);
        assert_eq!(inst.attack, 2);
        assert_eq!(inst.health, 3);
        assert_eq!(inst.cooldown, 2);
        assert_eq!(inst.template, TemplateId(1));
    }
}
