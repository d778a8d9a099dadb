// The battle state machine.
//
// `Battle` owns two `BattleSide`s and drives the `Init → PreMain → Main`
// round cycle until a terminal `End`. Every mutation entry point appends the
// observable changes to an effect batch in causal order; the world tick
// forwards finished batches to both players.
//
// Protocol-level phase assertions are server-authoritative: a phase-end that
// names the wrong phase, or arrives from the inactive side, is logged and
// produces no state change. Stale moves drain as no-ops rather than errors.
//
// All mutation happens on the world-tick thread (see `tick.rs`); nothing in
// here locks.

use std::sync::Arc;

use scrollforge_prng::GameRng;
use scrollforge_protocol::effect::Effect;
use scrollforge_protocol::message::{IdolState, ScrollState, ServerMessage, UnitState};
use scrollforge_protocol::types::{
    AiDifficulty, BattleId, BattleKind, INITIAL_HAND_SIZE, Phase, PlayerId, ScrollId, SideColor,
    TemplateId, TileRef,
};

use crate::behavior;
use crate::board::eligible_tiles;
use crate::moves::PendingMove;
use crate::side::BattleSide;
use crate::template::{ScrollInstance, ScrollKind, TemplateStore};
use crate::unit::Unit;

/// Time each round may run before the tick force-ends it.
pub const ROUND_TIME_MS: i64 = 90_000;

/// Everything needed to seat one side of a new battle.
#[derive(Clone, Debug)]
pub struct SideSpec {
    pub player: PlayerId,
    pub name: String,
    pub deck: Vec<TemplateId>,
}

/// The output of applying one pending move: effects broadcast to both
/// players plus any per-player direct replies (e.g. a join snapshot).
#[derive(Debug, Default)]
pub struct Reaction {
    pub effects: Vec<Effect>,
    pub replies: Vec<(PlayerId, ServerMessage)>,
}

/// One match between two sides.
#[derive(Debug)]
pub struct Battle {
    pub id: BattleId,
    pub kind: BattleKind,
    pub difficulty: AiDifficulty,
    pub phase: Phase,
    /// Whose turn it is. Always one of the two side colors.
    pub turn: SideColor,
    pub round: u32,
    pub round_timer_ms: i64,
    sides: [BattleSide; 2],
    templates: Arc<TemplateStore>,
    rng: GameRng,
}

impl Battle {
    pub fn new(
        id: BattleId,
        kind: BattleKind,
        difficulty: AiDifficulty,
        black: SideSpec,
        white: SideSpec,
        templates: Arc<TemplateStore>,
        seed: u64,
    ) -> Self {
        let mut rng = GameRng::new(seed);
        let mut next_scroll_id = 1;
        let sides = [
            BattleSide::new(
                black.player,
                black.name,
                SideColor::Black,
                &black.deck,
                &templates,
                &mut next_scroll_id,
                &mut rng,
            ),
            BattleSide::new(
                white.player,
                white.name,
                SideColor::White,
                &white.deck,
                &templates,
                &mut next_scroll_id,
                &mut rng,
            ),
        ];
        Self {
            id,
            kind,
            difficulty,
            phase: Phase::Init,
            turn: SideColor::Black,
            round: 0,
            round_timer_ms: ROUND_TIME_MS,
            sides,
            templates,
            rng,
        }
    }

    pub fn side(&self, color: SideColor) -> &BattleSide {
        &self.sides[color.index()]
    }

    pub fn side_mut(&mut self, color: SideColor) -> &mut BattleSide {
        &mut self.sides[color.index()]
    }

    /// Both sides, active side first.
    fn sides_mut_pair(&mut self, first: SideColor) -> (&mut BattleSide, &mut BattleSide) {
        let [black, white] = &mut self.sides;
        match first {
            SideColor::Black => (black, white),
            SideColor::White => (white, black),
        }
    }

    pub fn players(&self) -> [PlayerId; 2] {
        [self.sides[0].player_id, self.sides[1].player_id]
    }

    pub fn color_of(&self, player: PlayerId) -> Option<SideColor> {
        self.sides
            .iter()
            .find(|s| s.player_id == player && !player.is_ai())
            .map(|s| s.color)
    }

    // -----------------------------------------------------------------
    // Round cycle
    // -----------------------------------------------------------------

    /// Begin the next round. The very first round coin-flips the starting
    /// color and deals both initial hands; every later round passes the turn
    /// to the side that was not active and draws one card for it. Draw
    /// effects precede the round's single `TurnBegin`.
    pub fn start_round(&mut self, effects: &mut Vec<Effect>) {
        self.round += 1;
        if self.round == 1 {
            self.turn = if self.rng.coin_flip() {
                SideColor::White
            } else {
                SideColor::Black
            };
            for color in [SideColor::Black, SideColor::White] {
                for _ in 0..INITIAL_HAND_SIZE {
                    self.draw_for(color, effects);
                }
            }
        } else {
            self.turn = self.turn.opposite();
            self.draw_for(self.turn, effects);
        }
        self.round_timer_ms = ROUND_TIME_MS;
        // AI sides need no client round-begin acknowledgment.
        self.phase = if self.side(self.turn).is_ai() {
            Phase::Main
        } else {
            Phase::PreMain
        };
        effects.push(Effect::TurnBegin {
            round: self.round,
            color: self.turn,
        });
    }

    fn draw_for(&mut self, color: SideColor, effects: &mut Vec<Effect>) {
        let Battle { sides, rng, .. } = self;
        if let Some((scroll, template)) = sides[color.index()].draw(rng) {
            effects.push(Effect::CardDrawn {
                color,
                scroll,
                template,
            });
        }
    }

    /// Handle a phase-end acknowledgment. The reported phase and the sender
    /// are both checked against the battle's actual state; mismatches are
    /// logged and ignored.
    pub fn end_phase(&mut self, color: SideColor, reported: Phase, effects: &mut Vec<Effect>) {
        if self.phase == Phase::End {
            return;
        }
        if color != self.turn {
            tracing::debug!(battle = self.id.0, %color, "phase-end from inactive side ignored");
            return;
        }
        if reported != self.phase {
            tracing::debug!(
                battle = self.id.0,
                ?reported,
                actual = ?self.phase,
                "phase-end naming wrong phase ignored"
            );
            return;
        }
        match self.phase {
            Phase::PreMain => self.phase = Phase::Main,
            Phase::Main => {
                self.finalize_round(effects);
                if self.phase != Phase::End {
                    self.start_round(effects);
                }
            }
            Phase::Init | Phase::End => {}
        }
    }

    /// End-of-round resolution: the active side's units count down their
    /// cooldowns; a unit reaching zero strikes the nearest opposing unit in
    /// its row, or the idol behind an empty row.
    fn finalize_round(&mut self, effects: &mut Vec<Effect>) {
        let attacker_color = self.turn;
        let defender_color = attacker_color.opposite();
        let (attacker, defender) = self.sides_mut_pair(attacker_color);

        let positions: Vec<(u8, u8)> = attacker
            .board
            .units()
            .map(|(row, col, _)| (row, col))
            .collect();

        for (row, col) in positions {
            let Some(unit) = attacker.board.get_mut(row, col) else {
                continue;
            };
            let strikes = unit.tick_cooldown();
            let attack = unit.attack;
            effects.push(Effect::StatsUpdate {
                color: attacker_color,
                row,
                col,
                health: unit.health,
                attack: unit.attack,
                cooldown: unit.cooldown,
            });
            if !strikes || attack <= 0 {
                continue;
            }

            // Nearest opposing unit in the same row, else the idol.
            let target_col = defender
                .board
                .units()
                .filter(|(r, _, _)| *r == row)
                .map(|(_, c, _)| c)
                .min();
            match target_col {
                Some(tcol) => {
                    let died = defender
                        .board
                        .get_mut(row, tcol)
                        .is_some_and(|target| target.damage(attack));
                    attacker.stats.damage_dealt += attack.max(0) as u32;
                    if died {
                        if let Some(dead) = defender.board.remove(row, tcol) {
                            defender.graveyard.push(instance_of(&dead));
                            defender.stats.units_lost += 1;
                        }
                        effects.push(Effect::UnitDestroyed {
                            color: defender_color,
                            row,
                            col: tcol,
                        });
                    } else if let Some(target) = defender.board.get(row, tcol) {
                        effects.push(Effect::StatsUpdate {
                            color: defender_color,
                            row,
                            col: tcol,
                            health: target.health,
                            attack: target.attack,
                            cooldown: target.cooldown,
                        });
                    }
                }
                None => {
                    let idol = &mut defender.idols[row as usize];
                    let absorbed = idol.damage(attack);
                    attacker.stats.damage_dealt += absorbed.max(0) as u32;
                    effects.push(Effect::IdolUpdate {
                        color: defender_color,
                        position: row,
                        hp: idol.hp,
                    });
                }
            }
        }
        self.check_win(effects);
    }

    // -----------------------------------------------------------------
    // Playing scrolls
    // -----------------------------------------------------------------

    /// Play a scroll from the active side's hand onto a tile. Illegal
    /// requests (wrong phase, wrong side, scroll not in hand, ineligible
    /// tile) are logged and ignored.
    pub fn play_scroll(
        &mut self,
        color: SideColor,
        scroll: ScrollId,
        tile: TileRef,
        effects: &mut Vec<Effect>,
    ) {
        if self.phase != Phase::Main || color != self.turn {
            tracing::debug!(battle = self.id.0, %color, phase = ?self.phase, "play out of turn ignored");
            return;
        }
        let Some(template_id) = self
            .side(color)
            .hand
            .iter()
            .find(|s| s.id == scroll)
            .map(|s| s.template)
        else {
            tracing::debug!(battle = self.id.0, scroll = scroll.0, "scroll not in hand");
            return;
        };
        let Some(template) = self.templates.get(template_id).cloned() else {
            tracing::warn!(battle = self.id.0, template = template_id.0, "unknown template in hand");
            return;
        };

        let (own, opp) = self.sides_mut_pair(color);
        let legal = eligible_tiles(&own.board, &opp.board, color, &template, None);
        if !legal.contains(&tile) {
            tracing::debug!(battle = self.id.0, ?tile, "ineligible target tile ignored");
            return;
        }

        let Some(instance) = self.side_mut(color).take_from_hand(scroll) else {
            return;
        };
        self.side_mut(color).stats.scrolls_played += 1;

        match template.kind {
            ScrollKind::Creature | ScrollKind::Structure => {
                let unit = Unit::summon(color, &instance);
                effects.push(Effect::UnitSummoned {
                    color: tile.color(),
                    row: tile.row(),
                    col: tile.col(),
                    template: unit.template,
                    health: unit.health,
                    attack: unit.attack,
                    cooldown: unit.cooldown,
                });
                self.side_mut(tile.color()).board.place(tile.row(), tile.col(), unit);
            }
            ScrollKind::Spell | ScrollKind::Enchantment => {
                if let Some(slot) = template.behavior.and_then(behavior::lookup) {
                    (slot.on_play)(self, color, tile, effects);
                }
                self.side_mut(color).graveyard.push(instance);
            }
        }
        self.check_win(effects);
    }

    /// Damage the unit on `tile`, crediting `source` with the damage.
    /// Invoked by behavior slots.
    pub fn damage_unit_at(
        &mut self,
        tile: TileRef,
        amount: i32,
        source: SideColor,
        effects: &mut Vec<Effect>,
    ) {
        let board_color = tile.color();
        let side = self.side_mut(board_color);
        let Some(unit) = side.board.get_mut(tile.row(), tile.col()) else {
            return;
        };
        let died = unit.damage(amount);
        if died {
            if let Some(dead) = side.board.remove(tile.row(), tile.col()) {
                side.graveyard.push(instance_of(&dead));
                side.stats.units_lost += 1;
            }
            effects.push(Effect::UnitDestroyed {
                color: board_color,
                row: tile.row(),
                col: tile.col(),
            });
        } else if let Some(unit) = side.board.get(tile.row(), tile.col()) {
            effects.push(Effect::StatsUpdate {
                color: board_color,
                row: tile.row(),
                col: tile.col(),
                health: unit.health,
                attack: unit.attack,
                cooldown: unit.cooldown,
            });
        }
        self.side_mut(source).stats.damage_dealt += amount.max(0) as u32;
    }

    /// Permanently raise the stats of the unit on `tile`. Invoked by
    /// behavior slots.
    pub fn buff_unit_at(
        &mut self,
        tile: TileRef,
        attack: i32,
        health: i32,
        effects: &mut Vec<Effect>,
    ) {
        let side = self.side_mut(tile.color());
        let Some(unit) = side.board.get_mut(tile.row(), tile.col()) else {
            return;
        };
        unit.attack += attack;
        unit.max_attack += attack;
        unit.health += health;
        unit.max_health += health;
        effects.push(Effect::StatsUpdate {
            color: tile.color(),
            row: tile.row(),
            col: tile.col(),
            health: unit.health,
            attack: unit.attack,
            cooldown: unit.cooldown,
        });
    }

    // -----------------------------------------------------------------
    // Endgame
    // -----------------------------------------------------------------

    /// Concede. Emits the `Surrender` effect first, then the idol updates it
    /// causes, then the `EndGame`.
    pub fn surrender(&mut self, color: SideColor, effects: &mut Vec<Effect>) {
        if self.phase == Phase::End {
            return;
        }
        effects.push(Effect::Surrender { color });
        let side = self.side_mut(color);
        for position in 0..side.idols.len() {
            let idol = &mut side.idols[position];
            idol.damage(idol.hp);
            effects.push(Effect::IdolUpdate {
                color,
                position: position as u8,
                hp: idol.hp,
            });
        }
        self.end_game(color.opposite(), effects);
    }

    /// Enter the terminal phase. Idempotent: once ended, later calls (with
    /// any winner) change nothing and emit nothing.
    pub fn end_game(&mut self, winner: SideColor, effects: &mut Vec<Effect>) {
        if self.phase == Phase::End {
            return;
        }
        self.phase = Phase::End;
        effects.push(Effect::EndGame {
            winner,
            white: self.side(SideColor::White).stats,
            black: self.side(SideColor::Black).stats,
        });
    }

    fn check_win(&mut self, effects: &mut Vec<Effect>) {
        if self.phase == Phase::End {
            return;
        }
        for color in [SideColor::Black, SideColor::White] {
            if self.side(color).all_idols_destroyed() {
                self.end_game(color.opposite(), effects);
                return;
            }
        }
    }

    /// Leave the battle. Only honored once the battle has ended; an earlier
    /// leave is a protocol violation and is ignored. Returns true when the
    /// departure was recorded.
    pub fn leave(&mut self, color: SideColor) -> bool {
        if self.phase != Phase::End {
            tracing::debug!(battle = self.id.0, %color, "leave before game end rejected");
            return false;
        }
        self.side_mut(color).left = true;
        true
    }

    /// True once every human side has explicitly left a finished battle.
    pub fn ready_to_expire(&self) -> bool {
        self.phase == Phase::End && self.sides.iter().all(|s| s.left || s.is_ai())
    }

    pub fn mark_disconnected(&mut self, player: PlayerId) {
        if let Some(color) = self.color_of(player) {
            self.side_mut(color).disconnected = true;
        }
    }

    // -----------------------------------------------------------------
    // Tick integration
    // -----------------------------------------------------------------

    /// Apply one drained pending move for the given side.
    pub fn apply(&mut self, color: SideColor, mv: PendingMove) -> Reaction {
        let mut reaction = Reaction::default();
        match mv {
            PendingMove::EndPhase { reported } => {
                self.end_phase(color, reported, &mut reaction.effects);
            }
            PendingMove::PlayScroll { scroll, tile } => {
                self.play_scroll(color, scroll, tile, &mut reaction.effects);
            }
            PendingMove::Surrender => {
                self.surrender(color, &mut reaction.effects);
            }
            PendingMove::Leave => {
                self.leave(color);
            }
            PendingMove::Join => {
                let side = self.side_mut(color);
                side.initial_connect = true;
                side.disconnected = false;
                let player = side.player_id;
                reaction.replies.push((player, self.snapshot_for(color)));
            }
        }
        reaction
    }

    /// Advance the AI's turn in a single-player battle: put down the first
    /// summonable card, then end the round. Harder difficulties are content
    /// layer; the engine's built-in opponent only exercises the turn cycle.
    pub fn run_ai_turn(&mut self, effects: &mut Vec<Effect>) {
        if self.phase != Phase::Main || !self.side(self.turn).is_ai() {
            return;
        }
        let color = self.turn;
        let pick = self.side(color).hand.iter().find_map(|inst| {
            let template = self.templates.get(inst.template)?;
            matches!(template.kind, ScrollKind::Creature | ScrollKind::Structure)
                .then_some((inst.id, template.clone()))
        });
        if let Some((scroll, template)) = pick {
            let (own, opp) = self.sides_mut_pair(color);
            let legal = eligible_tiles(&own.board, &opp.board, color, &template, None);
            if let Some(tile) = legal.first().copied() {
                self.play_scroll(color, scroll, tile, effects);
            }
        }
        if self.phase == Phase::Main {
            self.end_phase(color, Phase::Main, effects);
        }
    }

    /// Count down the round timer. At zero the active side's round is
    /// force-ended so an absent player cannot stall the battle.
    pub fn tick_timer(&mut self, elapsed_ms: i64, effects: &mut Vec<Effect>) {
        if !matches!(self.phase, Phase::PreMain | Phase::Main) {
            return;
        }
        self.round_timer_ms -= elapsed_ms;
        if self.round_timer_ms > 0 {
            return;
        }
        tracing::debug!(battle = self.id.0, round = self.round, "round timer expired");
        self.finalize_round(effects);
        if self.phase != Phase::End {
            self.start_round(effects);
        }
    }

    /// Build the full-state snapshot sent in response to a join.
    pub fn snapshot_for(&self, color: SideColor) -> ServerMessage {
        let mut idols = Vec::new();
        let mut units = Vec::new();
        for side in &self.sides {
            for idol in &side.idols {
                idols.push(IdolState {
                    color: idol.color,
                    position: idol.position,
                    hp: idol.hp,
                    max_hp: idol.max_hp,
                });
            }
            for (row, col, unit) in side.board.units() {
                units.push(UnitState {
                    color: side.color,
                    row,
                    col,
                    template: unit.template,
                    health: unit.health,
                    attack: unit.attack,
                    cooldown: unit.cooldown,
                });
            }
        }
        let hand = self
            .side(color)
            .hand
            .iter()
            .map(|s| ScrollState {
                id: s.id,
                template: s.template,
            })
            .collect();
        ServerMessage::GameState {
            phase: self.phase,
            round: self.round,
            turn: self.turn,
            idols,
            units,
            hand,
        }
    }

    /// Targeting helper for handlers and tests: what may this hand scroll
    /// target right now?
    pub fn targets_for(&self, color: SideColor, scroll: ScrollId) -> Vec<TileRef> {
        let Some(template_id) = self
            .side(color)
            .hand
            .iter()
            .find(|s| s.id == scroll)
            .map(|s| s.template)
        else {
            return Vec::new();
        };
        let Some(template) = self.templates.get(template_id) else {
            return Vec::new();
        };
        let own = &self.side(color).board;
        let opp = &self.side(color.opposite()).board;
        eligible_tiles(own, opp, color, template, None)
    }
}

/// Rebuild the graveyard instance for a unit leaving the board. The card's
/// lifetime stats are its maxima; current combat damage does not follow it.
fn instance_of(unit: &Unit) -> ScrollInstance {
    ScrollInstance {
        id: unit.scroll,
        template: unit.template,
        attack: unit.max_attack,
        health: unit.max_health,
        cooldown: unit.max_cooldown,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn creature_deck(n: usize) -> Vec<TemplateId> {
        (0..n).map(|_| TemplateId(1)).collect()
    }

    fn new_battle(seed: u64) -> Battle {
        Battle::new(
            BattleId(1),
            BattleKind::Unranked,
            AiDifficulty::Easy,
            SideSpec {
                player: PlayerId(10),
                name: "ada".into(),
                deck: creature_deck(12),
            },
            SideSpec {
                player: PlayerId(20),
                name: "grace".into(),
                deck: creature_deck(12),
            },
            Arc::new(TemplateStore::builtin()),
            seed,
        )
    }

    fn turn_begin_color(effects: &[Effect]) -> SideColor {
        effects
            .iter()
            .find_map(|e| match e {
                Effect::TurnBegin { color, .. } => Some(*color),
                _ => None,
            })
            .expect("no TurnBegin effect")
    }

    fn draws_for(effects: &[Effect], color: SideColor) -> usize {
        effects
            .iter()
            .filter(|e| matches!(e, Effect::CardDrawn { color: c, .. } if *c == color))
            .count()
    }

    #[test]
    fn first_round_deals_initial_hands_then_turn_begin() {
        let mut battle = new_battle(42);
        let mut effects = Vec::new();
        battle.start_round(&mut effects);

        assert_eq!(battle.round, 1);
        assert_eq!(draws_for(&effects, SideColor::Black), INITIAL_HAND_SIZE);
        assert_eq!(draws_for(&effects, SideColor::White), INITIAL_HAND_SIZE);
        assert_eq!(battle.side(SideColor::Black).hand.len(), INITIAL_HAND_SIZE);

        // TurnBegin comes after every draw and names round 1.
        let last = effects.last().unwrap();
        assert!(matches!(last, Effect::TurnBegin { round: 1, .. }));
        assert_eq!(turn_begin_color(&effects), battle.turn);
        assert_eq!(battle.phase, Phase::PreMain);
    }

    #[test]
    fn turn_strictly_alternates_after_round_one() {
        let mut battle = new_battle(7);
        let mut effects = Vec::new();
        battle.start_round(&mut effects);
        let first = battle.turn;

        for expected_round in 2..8 {
            let mut effects = Vec::new();
            battle.start_round(&mut effects);
            assert_eq!(battle.round, expected_round);
            let expected = if expected_round % 2 == 0 {
                first.opposite()
            } else {
                first
            };
            assert_eq!(battle.turn, expected);
            // Only the incoming side draws, exactly one card.
            assert_eq!(draws_for(&effects, expected), 1);
            assert_eq!(draws_for(&effects, expected.opposite()), 0);
        }
    }

    #[test]
    fn seeded_coin_flip_is_reproducible() {
        let a = {
            let mut battle = new_battle(1234);
            battle.start_round(&mut Vec::new());
            battle.turn
        };
        let b = {
            let mut battle = new_battle(1234);
            battle.start_round(&mut Vec::new());
            battle.turn
        };
        assert_eq!(a, b);
    }

    #[test]
    fn pre_main_ack_advances_only_from_active_side() {
        let mut battle = new_battle(42);
        battle.start_round(&mut Vec::new());
        assert_eq!(battle.phase, Phase::PreMain);
        let active = battle.turn;

        // Inactive side acking is ignored.
        let mut effects = Vec::new();
        battle.end_phase(active.opposite(), Phase::PreMain, &mut effects);
        assert_eq!(battle.phase, Phase::PreMain);
        assert!(effects.is_empty());

        // Active side naming the wrong phase is ignored.
        battle.end_phase(active, Phase::Main, &mut effects);
        assert_eq!(battle.phase, Phase::PreMain);
        assert!(effects.is_empty());

        // Correct ack advances.
        battle.end_phase(active, Phase::PreMain, &mut effects);
        assert_eq!(battle.phase, Phase::Main);
    }

    #[test]
    fn ending_main_rolls_into_next_round() {
        let mut battle = new_battle(42);
        battle.start_round(&mut Vec::new());
        let first = battle.turn;
        battle.end_phase(first, Phase::PreMain, &mut Vec::new());

        let mut effects = Vec::new();
        battle.end_phase(first, Phase::Main, &mut effects);
        assert_eq!(battle.round, 2);
        assert_eq!(battle.turn, first.opposite());
        assert_eq!(turn_begin_color(&effects), first.opposite());
    }

    #[test]
    fn play_scroll_summons_creature() {
        let mut battle = new_battle(42);
        battle.start_round(&mut Vec::new());
        let active = battle.turn;
        battle.end_phase(active, Phase::PreMain, &mut Vec::new());

        let scroll = battle.side(active).hand[0].id;
        let targets = battle.targets_for(active, scroll);
        assert_eq!(targets.len(), 15);
        let tile = targets[0];

        let mut effects = Vec::new();
        battle.play_scroll(active, scroll, tile, &mut effects);
        assert!(matches!(effects[0], Effect::UnitSummoned { .. }));
        assert_eq!(battle.side(active).board.unit_count(), 1);
        assert_eq!(battle.side(active).hand.len(), INITIAL_HAND_SIZE - 1);
        assert_eq!(battle.side(active).stats.scrolls_played, 1);
    }

    #[test]
    fn play_scroll_rejected_out_of_turn_and_phase() {
        let mut battle = new_battle(42);
        battle.start_round(&mut Vec::new());
        let active = battle.turn;
        let inactive = active.opposite();

        // Still PreMain: even the active side cannot play.
        let scroll = battle.side(active).hand[0].id;
        let tile = TileRef::new(active, 0, 0).unwrap();
        let mut effects = Vec::new();
        battle.play_scroll(active, scroll, tile, &mut effects);
        assert!(effects.is_empty());

        battle.end_phase(active, Phase::PreMain, &mut Vec::new());

        // Inactive side cannot play in Main either.
        let other_scroll = battle.side(inactive).hand[0].id;
        let other_tile = TileRef::new(inactive, 0, 0).unwrap();
        battle.play_scroll(inactive, other_scroll, other_tile, &mut effects);
        assert!(effects.is_empty());
        assert_eq!(battle.side(inactive).board.unit_count(), 0);
    }

    #[test]
    fn surrender_zeros_idols_in_causal_order() {
        let mut battle = new_battle(42);
        battle.start_round(&mut Vec::new());
        let loser = battle.turn;

        let mut effects = Vec::new();
        battle.surrender(loser, &mut effects);

        assert!(matches!(effects[0], Effect::Surrender { color } if color == loser));
        // Five idol updates, all zero, before the EndGame.
        let updates: Vec<_> = effects
            .iter()
            .filter_map(|e| match e {
                Effect::IdolUpdate { hp, .. } => Some(*hp),
                _ => None,
            })
            .collect();
        assert_eq!(updates, vec![0, 0, 0, 0, 0]);
        assert!(matches!(
            effects.last(),
            Some(Effect::EndGame { winner, .. }) if *winner == loser.opposite()
        ));
        assert_eq!(battle.phase, Phase::End);
        assert!(battle.side(loser).all_idols_destroyed());
    }

    #[test]
    fn end_game_is_idempotent() {
        let mut battle = new_battle(42);
        battle.start_round(&mut Vec::new());

        let mut effects = Vec::new();
        battle.end_game(SideColor::Black, &mut effects);
        assert_eq!(effects.len(), 1);
        assert_eq!(battle.phase, Phase::End);

        // Second call with a different winner changes nothing.
        let mut second = Vec::new();
        battle.end_game(SideColor::White, &mut second);
        assert!(second.is_empty());
        assert!(matches!(
            effects[0],
            Effect::EndGame { winner: SideColor::Black, .. }
        ));
    }

    #[test]
    fn leave_only_honored_after_end() {
        let mut battle = new_battle(42);
        battle.start_round(&mut Vec::new());

        assert!(!battle.leave(SideColor::Black));
        assert!(!battle.side(SideColor::Black).left);

        battle.end_game(SideColor::White, &mut Vec::new());
        assert!(battle.leave(SideColor::Black));
        assert!(!battle.ready_to_expire());
        assert!(battle.leave(SideColor::White));
        assert!(battle.ready_to_expire());
    }

    #[test]
    fn stale_moves_drain_as_noops() {
        let mut battle = new_battle(42);
        battle.start_round(&mut Vec::new());
        let active = battle.turn;
        battle.end_phase(active, Phase::PreMain, &mut Vec::new());

        // A duplicate PreMain ack queued earlier now names a stale phase.
        let reaction = battle.apply(
            active,
            PendingMove::EndPhase {
                reported: Phase::PreMain,
            },
        );
        assert!(reaction.effects.is_empty());
        assert_eq!(battle.phase, Phase::Main);
    }

    #[test]
    fn join_returns_snapshot_for_that_side() {
        let mut battle = new_battle(42);
        battle.start_round(&mut Vec::new());
        let color = battle.turn;
        let player = battle.side(color).player_id;

        let reaction = battle.apply(color, PendingMove::Join);
        assert_eq!(reaction.replies.len(), 1);
        let (to, msg) = &reaction.replies[0];
        assert_eq!(*to, player);
        match msg {
            ServerMessage::GameState { idols, hand, round, .. } => {
                assert_eq!(idols.len(), 10);
                assert_eq!(hand.len(), INITIAL_HAND_SIZE);
                assert_eq!(*round, 1);
            }
            other => panic!("expected GameState, got {other:?}"),
        }
        assert!(battle.side(color).initial_connect);
    }

    #[test]
    fn bolt_spell_damages_target_unit() {
        let mut battle = Battle::new(
            BattleId(2),
            BattleKind::Unranked,
            AiDifficulty::Easy,
            SideSpec {
                player: PlayerId(10),
                name: "ada".into(),
                deck: vec![TemplateId(3); 12],
            },
            SideSpec {
                player: PlayerId(20),
                name: "grace".into(),
                deck: vec![TemplateId(2); 12],
            },
            Arc::new(TemplateStore::builtin()),
            99,
        );
        battle.start_round(&mut Vec::new());

        // Give white a Barkwall (5 hp) to shoot at, regardless of whose turn
        // it is — drive the phases until black holds the turn.
        while battle.turn != SideColor::Black {
            let c = battle.turn;
            if battle.phase == Phase::PreMain {
                battle.end_phase(c, Phase::PreMain, &mut Vec::new());
            }
            battle.end_phase(c, Phase::Main, &mut Vec::new());
        }
        if battle.phase == Phase::PreMain {
            battle.end_phase(SideColor::Black, Phase::PreMain, &mut Vec::new());
        }

        let templates = TemplateStore::builtin();
        let wall = templates.get(TemplateId(2)).unwrap();
        let inst = ScrollInstance::from_template(ScrollId(900), wall);
        battle
            .side_mut(SideColor::White)
            .board
            .place(2, 0, Unit::summon(SideColor::White, &inst));

        let scroll = battle.side(SideColor::Black).hand[0].id;
        let tile = TileRef::new(SideColor::White, 2, 0).unwrap();
        let mut effects = Vec::new();
        battle.play_scroll(SideColor::Black, scroll, tile, &mut effects);

        // Bolt deals 3: the 5 hp wall survives at 2.
        assert!(effects.iter().any(|e| matches!(
            e,
            Effect::StatsUpdate { color: SideColor::White, health: 2, .. }
        )));
        // The spent spell went to the graveyard.
        assert_eq!(battle.side(SideColor::Black).graveyard.len(), 1);
        assert_eq!(battle.side(SideColor::Black).stats.damage_dealt, 3);
    }

    #[test]
    fn ai_side_skips_pre_main_and_takes_its_turn() {
        let mut battle = Battle::new(
            BattleId(3),
            BattleKind::SinglePlayer,
            AiDifficulty::Easy,
            SideSpec {
                player: PlayerId(10),
                name: "ada".into(),
                deck: creature_deck(12),
            },
            SideSpec {
                player: PlayerId::AI,
                name: "Construct".into(),
                deck: creature_deck(12),
            },
            Arc::new(TemplateStore::builtin()),
            5,
        );
        battle.start_round(&mut Vec::new());

        // Drive to the AI's turn.
        if battle.turn == SideColor::Black {
            battle.end_phase(SideColor::Black, Phase::PreMain, &mut Vec::new());
            battle.end_phase(SideColor::Black, Phase::Main, &mut Vec::new());
        }
        assert_eq!(battle.turn, SideColor::White);
        // AI side entered Main directly, no PreMain ack required.
        assert_eq!(battle.phase, Phase::Main);

        let mut effects = Vec::new();
        battle.run_ai_turn(&mut effects);
        // AI summoned something and handed the turn back.
        assert!(effects.iter().any(|e| matches!(e, Effect::UnitSummoned { .. })));
        assert_eq!(battle.turn, SideColor::Black);
        assert_eq!(battle.phase, Phase::PreMain);
    }

    #[test]
    fn round_timer_forces_round_end() {
        let mut battle = new_battle(42);
        battle.start_round(&mut Vec::new());
        let first = battle.turn;

        let mut effects = Vec::new();
        battle.tick_timer(ROUND_TIME_MS / 2, &mut effects);
        assert_eq!(battle.round, 1);
        assert!(effects.is_empty());

        battle.tick_timer(ROUND_TIME_MS, &mut effects);
        assert_eq!(battle.round, 2);
        assert_eq!(battle.turn, first.opposite());
    }

    #[test]
    fn unit_strikes_idol_behind_empty_row() {
        let mut battle = new_battle(42);
        battle.start_round(&mut Vec::new());
        let active = battle.turn;
        battle.end_phase(active, Phase::PreMain, &mut Vec::new());

        // Summon a Thornling (attack 2, cooldown 2) at row 1.
        let scroll = battle.side(active).hand[0].id;
        let tile = TileRef::new(active, 1, 0).unwrap();
        battle.play_scroll(active, scroll, tile, &mut Vec::new());

        // Round 1 end: cooldown 2 → 1, no strike.
        battle.end_phase(active, Phase::Main, &mut Vec::new());
        // Opponent's round passes.
        let other = battle.turn;
        battle.end_phase(other, Phase::PreMain, &mut Vec::new());
        battle.end_phase(other, Phase::Main, &mut Vec::new());
        // Back to the summoner: cooldown 1 → 0, strike fires.
        assert_eq!(battle.turn, active);
        battle.end_phase(active, Phase::PreMain, &mut Vec::new());
        let mut effects = Vec::new();
        battle.end_phase(active, Phase::Main, &mut effects);

        let hit = effects.iter().find_map(|e| match e {
            Effect::IdolUpdate { color, position, hp } => Some((*color, *position, *hp)),
            _ => None,
        });
        assert_eq!(hit, Some((active.opposite(), 1, 8)));
        assert_eq!(battle.side(active).stats.damage_dealt, 2);
    }
}
