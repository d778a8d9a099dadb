// The world tick.
//
// A single thread owns every battle mutation. Each pass it drains the
// per-side move queues, lets AI sides act, counts down round timers, and
// hands the accumulated effect batch to the outbox for delivery. Battles
// whose players have all left a finished game are expired and dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use scrollforge_protocol::message::ServerMessage;
use scrollforge_protocol::types::{Phase, PlayerId, SideColor};

use crate::registry::{BattleHandle, BattleRegistry};

/// Delivery seam between the engine and the session layer. The tick only
/// ever addresses players by id; routing to a socket (or a test buffer) is
/// the implementor's concern.
pub trait Outbox: Send + Sync + 'static {
    fn send(&self, player: PlayerId, message: &ServerMessage);
}

pub const TICK_INTERVAL: Duration = Duration::from_millis(25);

/// Run one pass over a single battle: seed the first round, drain queued
/// moves, advance any AI turn, tick the timer, and broadcast the resulting
/// effect batch to both human seats.
pub fn tick_battle(handle: &BattleHandle, elapsed_ms: i64, outbox: &dyn Outbox) {
    let mut battle = handle.state.lock().unwrap();
    let mut effects = Vec::new();

    if battle.phase == Phase::Init {
        battle.start_round(&mut effects);
    }

    for color in [SideColor::Black, SideColor::White] {
        while let Some(mv) = handle.queue(color).pop() {
            let reaction = battle.apply(color, mv);
            effects.extend(reaction.effects);
            for (player, message) in reaction.replies {
                outbox.send(player, &message);
            }
        }
    }

    battle.run_ai_turn(&mut effects);
    battle.tick_timer(elapsed_ms, &mut effects);

    if !effects.is_empty() {
        let batch = ServerMessage::NewEffects { effects };
        for player in battle.players() {
            if !player.is_ai() {
                outbox.send(player, &batch);
            }
        }
    }
}

/// Spawn the world-tick thread. It runs until `shutdown` is raised.
pub fn spawn_world_tick(
    battles: Arc<BattleRegistry>,
    outbox: Arc<dyn Outbox>,
    shutdown: Arc<AtomicBool>,
) -> JoinHandle<()> {
    thread::spawn(move || {
        tracing::info!("world tick started");
        let mut last = Instant::now();
        while !shutdown.load(Ordering::Acquire) {
            let now = Instant::now();
            let elapsed_ms = now.duration_since(last).as_millis() as i64;
            last = now;

            for handle in battles.all() {
                tick_battle(&handle, elapsed_ms, outbox.as_ref());
                let finished = handle.state.lock().unwrap().ready_to_expire();
                if finished {
                    tracing::info!(battle = handle.id.0, "battle expired");
                    battles.remove(handle.id);
                }
            }
            thread::sleep(TICK_INTERVAL);
        }
        tracing::info!("world tick stopped");
    })
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use super::*;
    use crate::battle::{Battle, SideSpec};
    use crate::moves::PendingMove;
    use crate::template::TemplateStore;
    use scrollforge_protocol::effect::Effect;
    use scrollforge_protocol::types::{AiDifficulty, BattleId, BattleKind, TemplateId};

    #[derive(Default)]
    struct RecordingOutbox {
        sent: Mutex<Vec<(PlayerId, ServerMessage)>>,
    }

    impl Outbox for RecordingOutbox {
        fn send(&self, player: PlayerId, message: &ServerMessage) {
            self.sent.lock().unwrap().push((player, message.clone()));
        }
    }

    impl RecordingOutbox {
        fn take(&self) -> Vec<(PlayerId, ServerMessage)> {
            std::mem::take(&mut self.sent.lock().unwrap())
        }
    }

    fn seeded_handle(black: PlayerId, white: PlayerId) -> Arc<BattleHandle> {
        let deck = vec![TemplateId(1); 10];
        BattleHandle::new(Battle::new(
            BattleId(1),
            BattleKind::Unranked,
            AiDifficulty::Easy,
            SideSpec {
                player: black,
                name: "ada".into(),
                deck: deck.clone(),
            },
            SideSpec {
                player: white,
                name: "grace".into(),
                deck,
            },
            Arc::new(TemplateStore::builtin()),
            42,
        ))
    }

    #[test]
    fn first_tick_starts_round_and_broadcasts() {
        let handle = seeded_handle(PlayerId(10), PlayerId(20));
        let outbox = RecordingOutbox::default();

        tick_battle(&handle, 25, &outbox);

        let sent = outbox.take();
        let recipients: Vec<PlayerId> = sent.iter().map(|(p, _)| *p).collect();
        assert_eq!(recipients, vec![PlayerId(10), PlayerId(20)]);
        for (_, message) in &sent {
            match message {
                ServerMessage::NewEffects { effects } => {
                    assert!(matches!(effects.last(), Some(Effect::TurnBegin { round: 1, .. })));
                }
                other => panic!("expected NewEffects, got {other:?}"),
            }
        }
        assert_eq!(handle.state.lock().unwrap().round, 1);
    }

    #[test]
    fn ai_battle_never_sends_to_the_ai_seat() {
        let handle = seeded_handle(PlayerId(10), PlayerId::AI);
        let outbox = RecordingOutbox::default();

        // Several ticks so the AI gets at least one full turn.
        for _ in 0..4 {
            tick_battle(&handle, 25, &outbox);
        }

        let sent = outbox.take();
        assert!(!sent.is_empty());
        assert!(sent.iter().all(|(p, _)| *p == PlayerId(10)));
    }

    #[test]
    fn queued_join_is_answered_with_a_snapshot() {
        let handle = seeded_handle(PlayerId(10), PlayerId(20));
        let outbox = RecordingOutbox::default();
        tick_battle(&handle, 25, &outbox);
        outbox.take();

        handle.enqueue(SideColor::White, PendingMove::Join);
        tick_battle(&handle, 25, &outbox);

        let sent = outbox.take();
        let snapshot = sent
            .iter()
            .find(|(p, m)| *p == PlayerId(20) && matches!(m, ServerMessage::GameState { .. }));
        assert!(snapshot.is_some(), "no GameState reply to the joiner: {sent:?}");
    }

    #[test]
    fn finished_and_abandoned_battle_expires() {
        let registry = Arc::new(BattleRegistry::new());
        let handle = seeded_handle(PlayerId(10), PlayerId(20));
        registry.insert(
            handle.clone(),
            &[
                (PlayerId(10), SideColor::Black),
                (PlayerId(20), SideColor::White),
            ],
        );
        let outbox = RecordingOutbox::default();
        tick_battle(&handle, 25, &outbox);

        handle.enqueue(SideColor::Black, PendingMove::Surrender);
        handle.enqueue(SideColor::Black, PendingMove::Leave);
        handle.enqueue(SideColor::White, PendingMove::Leave);
        tick_battle(&handle, 25, &outbox);

        let finished = handle.state.lock().unwrap().ready_to_expire();
        assert!(finished);
        registry.remove(handle.id);
        assert!(handle.is_expired());
        assert!(registry.is_empty());
    }
}
