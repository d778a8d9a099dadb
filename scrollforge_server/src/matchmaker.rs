// Quick-match pairing.
//
// One waiting slot: the first quick-match request parks, the second pairs
// with it. A player re-requesting while parked just refreshes their deck.

use std::sync::Mutex;

use scrollforge_protocol::types::{PlayerId, TemplateId};

#[derive(Clone, Debug)]
pub struct WaitingPlayer {
    pub player: PlayerId,
    pub name: String,
    pub deck: Vec<TemplateId>,
}

#[derive(Debug, Default)]
pub struct Matchmaker {
    waiting: Mutex<Option<WaitingPlayer>>,
}

impl Matchmaker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Offer a player for pairing. Returns the opponent when a pair formed;
    /// `None` means the caller is now the one waiting.
    pub fn offer(&self, candidate: WaitingPlayer) -> Option<WaitingPlayer> {
        let mut waiting = self.waiting.lock().unwrap();
        match waiting.take() {
            Some(parked) if parked.player != candidate.player => Some(parked),
            _ => {
                *waiting = Some(candidate);
                None
            }
        }
    }

    /// Withdraw a player, typically on disconnect.
    pub fn withdraw(&self, player: PlayerId) {
        let mut waiting = self.waiting.lock().unwrap();
        if waiting.as_ref().is_some_and(|w| w.player == player) {
            *waiting = None;
        }
    }

    pub fn is_waiting(&self, player: PlayerId) -> bool {
        self.waiting
            .lock()
            .unwrap()
            .as_ref()
            .is_some_and(|w| w.player == player)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn candidate(id: u64) -> WaitingPlayer {
        WaitingPlayer {
            player: PlayerId(id),
            name: format!("player-{id}"),
            deck: vec![TemplateId(1); 10],
        }
    }

    #[test]
    fn second_offer_pairs_with_first() {
        let mm = Matchmaker::new();
        assert!(mm.offer(candidate(1)).is_none());
        assert!(mm.is_waiting(PlayerId(1)));

        let opponent = mm.offer(candidate(2)).unwrap();
        assert_eq!(opponent.player, PlayerId(1));
        assert!(!mm.is_waiting(PlayerId(1)));
        assert!(!mm.is_waiting(PlayerId(2)));
    }

    #[test]
    fn re_offer_refreshes_instead_of_self_pairing() {
        let mm = Matchmaker::new();
        assert!(mm.offer(candidate(1)).is_none());
        let mut refreshed = candidate(1);
        refreshed.deck = vec![TemplateId(5); 10];
        assert!(mm.offer(refreshed).is_none());
        assert!(mm.is_waiting(PlayerId(1)));
    }

    #[test]
    fn withdraw_clears_only_the_named_player() {
        let mm = Matchmaker::new();
        mm.offer(candidate(1));
        mm.withdraw(PlayerId(2));
        assert!(mm.is_waiting(PlayerId(1)));
        mm.withdraw(PlayerId(1));
        assert!(!mm.is_waiting(PlayerId(1)));
    }
}
