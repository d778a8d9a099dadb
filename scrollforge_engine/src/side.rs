// One player's (or the AI's) half of a battle.
//
// `BattleSide` owns the side's hand, library, graveyard, board, idols, and
// aggregate stats. Cards move between the containers but never vanish: the
// hand + library + graveyard multiset (plus anything standing on the board)
// always equals the original deck.
//
// Drawing from an empty library reshuffles the graveyard back in; drawing
// with both empty silently yields no card.

use scrollforge_prng::GameRng;
use scrollforge_protocol::effect::SideStats;
use scrollforge_protocol::types::{IDOL_COUNT, PlayerId, ScrollId, SideColor, TemplateId};

use crate::board::Board;
use crate::idol::Idol;
use crate::template::{ScrollInstance, TemplateStore};

/// One of the two competing sides in a battle.
#[derive(Debug)]
pub struct BattleSide {
    pub player_id: PlayerId,
    pub name: String,
    pub color: SideColor,
    pub hand: Vec<ScrollInstance>,
    /// Draw pile; the top of the library is the last element.
    pub library: Vec<ScrollInstance>,
    pub graveyard: Vec<ScrollInstance>,
    pub board: Board,
    pub idols: [Idol; IDOL_COUNT],
    pub stats: SideStats,
    /// Set once the client has attached to the battle for the first time.
    pub initial_connect: bool,
    /// Network drop — the side stays in the battle and may reattach.
    pub disconnected: bool,
    /// Explicit post-game departure.
    pub left: bool,
}

impl BattleSide {
    /// Build a side from a validated deck. Instance ids are allocated from
    /// the battle's counter; the library is shuffled before play.
    pub fn new(
        player_id: PlayerId,
        name: String,
        color: SideColor,
        deck: &[TemplateId],
        templates: &TemplateStore,
        next_scroll_id: &mut u64,
        rng: &mut GameRng,
    ) -> Self {
        let mut library: Vec<ScrollInstance> = deck
            .iter()
            .filter_map(|id| templates.get(*id))
            .map(|template| {
                let id = ScrollId(*next_scroll_id);
                *next_scroll_id += 1;
                ScrollInstance::from_template(id, template)
            })
            .collect();
        rng.shuffle(&mut library);

        let position = |i: usize| Idol::new(color, i as u8);
        Self {
            player_id,
            name,
            color,
            hand: Vec::new(),
            library,
            graveyard: Vec::new(),
            board: Board::new(),
            idols: [position(0), position(1), position(2), position(3), position(4)],
            stats: SideStats::default(),
            initial_connect: false,
            disconnected: false,
            left: false,
        }
    }

    pub fn is_ai(&self) -> bool {
        self.player_id.is_ai()
    }

    /// Draw one card into the hand. An empty library pulls the graveyard
    /// back in (shuffled) first; if both are empty the draw silently yields
    /// nothing. Returns the drawn card's ids for the `CardDrawn` effect.
    pub fn draw(&mut self, rng: &mut GameRng) -> Option<(ScrollId, TemplateId)> {
        if self.library.is_empty() && !self.graveyard.is_empty() {
            self.library.append(&mut self.graveyard);
            rng.shuffle(&mut self.library);
        }
        let card = self.library.pop()?;
        let ids = (card.id, card.template);
        self.hand.push(card);
        Some(ids)
    }

    /// Remove a scroll from the hand by id, if present.
    pub fn take_from_hand(&mut self, scroll: ScrollId) -> Option<ScrollInstance> {
        let index = self.hand.iter().position(|s| s.id == scroll)?;
        Some(self.hand.remove(index))
    }

    pub fn all_idols_destroyed(&self) -> bool {
        self.idols.iter().all(Idol::is_destroyed)
    }
}
