// Pending moves — queued player intents awaiting the world tick.
//
// All external mutation of battle state goes through `PendingMove`. Handlers
// on the network threads construct one and enqueue it; the world tick drains
// each side's queue in FIFO order and applies the moves one at a time. A move
// is consumed exactly once. Moves that no longer make sense when drained (a
// stale phase-end, a scroll already gone from hand) simply have no effect.
//
// The queue is the only structure written concurrently during a live battle:
// enqueue happens on arbitrary network threads, drain only on the tick loop.

use std::collections::VecDeque;
use std::sync::Mutex;

use scrollforge_protocol::types::{Phase, ScrollId, TileRef};

/// One immutable player intent.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PendingMove {
    /// Acknowledge / end the named phase. `reported` is the phase the client
    /// believes the battle is in; it is checked, never trusted.
    EndPhase { reported: Phase },
    /// Play a scroll from hand onto a tile.
    PlayScroll { scroll: ScrollId, tile: TileRef },
    /// Concede.
    Surrender,
    /// Leave a finished battle.
    Leave,
    /// Attach to the battle and request a state snapshot.
    Join,
}

/// Single-producer, single-consumer FIFO of pending moves.
///
/// The mutex is held only for a push or a pop — the tick never holds it
/// while applying a move, so enqueuing from network threads cannot stall on
/// game-state work.
#[derive(Debug, Default)]
pub struct MoveQueue {
    inner: Mutex<VecDeque<PendingMove>>,
}

impl MoveQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueue a move. Safe to call from any thread.
    pub fn push(&self, mv: PendingMove) {
        if let Ok(mut queue) = self.inner.lock() {
            queue.push_back(mv);
        }
    }

    /// Dequeue the oldest move, if any. Called only from the tick loop.
    pub fn pop(&self) -> Option<PendingMove> {
        self.inner.lock().ok().and_then(|mut queue| queue.pop_front())
    }

    pub fn len(&self) -> usize {
        self.inner.lock().map(|queue| queue.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fifo_order_preserved() {
        let queue = MoveQueue::new();
        queue.push(PendingMove::Join);
        queue.push(PendingMove::EndPhase {
            reported: Phase::PreMain,
        });
        queue.push(PendingMove::Surrender);

        assert_eq!(queue.pop(), Some(PendingMove::Join));
        assert_eq!(
            queue.pop(),
            Some(PendingMove::EndPhase {
                reported: Phase::PreMain
            })
        );
        assert_eq!(queue.pop(), Some(PendingMove::Surrender));
        assert_eq!(queue.pop(), None);
    }

    #[test]
    fn cross_thread_enqueue() {
        use std::sync::Arc;

        let queue = Arc::new(MoveQueue::new());
        let producer = {
            let queue = Arc::clone(&queue);
            std::thread::spawn(move || {
                for _ in 0..100 {
                    queue.push(PendingMove::Surrender);
                }
            })
        };
        producer.join().unwrap();

        let mut drained = 0;
        while queue.pop().is_some() {
            drained += 1;
        }
        assert_eq!(drained, 100);
    }
}
