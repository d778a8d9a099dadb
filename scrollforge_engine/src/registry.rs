// Live battle tracking.
//
// A `BattleHandle` is the shared face of one battle: network threads see
// only the expiry flag and the per-side move queues; the `Battle` itself
// sits behind a mutex that the world tick alone locks. The registry maps
// battle ids and player ids to handles under short reader-writer sections.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use rustc_hash::FxHashMap;
use scrollforge_protocol::types::{BattleId, PlayerId, SideColor};

use crate::battle::Battle;
use crate::moves::{MoveQueue, PendingMove};

/// Shared handle to one live battle.
#[derive(Debug)]
pub struct BattleHandle {
    pub id: BattleId,
    expired: AtomicBool,
    queues: [MoveQueue; 2],
    /// Locked only by the world-tick thread after construction.
    pub state: Mutex<Battle>,
}

impl BattleHandle {
    pub fn new(battle: Battle) -> Arc<Self> {
        Arc::new(Self {
            id: battle.id,
            expired: AtomicBool::new(false),
            queues: [MoveQueue::new(), MoveQueue::new()],
            state: Mutex::new(battle),
        })
    }

    /// Enqueue a move for the given side. Rejected once the battle has
    /// expired; the caller reports the stale battle to the client.
    pub fn enqueue(&self, color: SideColor, mv: PendingMove) -> bool {
        if self.is_expired() {
            return false;
        }
        self.queues[color.index()].push(mv);
        true
    }

    pub fn queue(&self, color: SideColor) -> &MoveQueue {
        &self.queues[color.index()]
    }

    pub fn is_expired(&self) -> bool {
        self.expired.load(Ordering::Acquire)
    }

    pub fn expire(&self) {
        self.expired.store(true, Ordering::Release);
    }
}

/// All live battles, addressable by battle id or participant.
#[derive(Debug)]
pub struct BattleRegistry {
    next_id: AtomicU64,
    battles: RwLock<FxHashMap<BattleId, Arc<BattleHandle>>>,
    by_player: RwLock<FxHashMap<PlayerId, (BattleId, SideColor)>>,
}

impl Default for BattleRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl BattleRegistry {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            battles: RwLock::new(FxHashMap::default()),
            by_player: RwLock::new(FxHashMap::default()),
        }
    }

    pub fn allocate_id(&self) -> BattleId {
        BattleId(self.next_id.fetch_add(1, Ordering::Relaxed))
    }

    /// Register a freshly created battle and its human participants.
    pub fn insert(&self, handle: Arc<BattleHandle>, seats: &[(PlayerId, SideColor)]) {
        let id = handle.id;
        self.battles.write().unwrap().insert(id, handle);
        let mut by_player = self.by_player.write().unwrap();
        for (player, color) in seats {
            if !player.is_ai() {
                by_player.insert(*player, (id, *color));
            }
        }
    }

    pub fn get(&self, id: BattleId) -> Option<Arc<BattleHandle>> {
        self.battles.read().unwrap().get(&id).cloned()
    }

    /// The battle a player is seated in, with their side color.
    pub fn find_for_player(&self, player: PlayerId) -> Option<(Arc<BattleHandle>, SideColor)> {
        let (id, color) = *self.by_player.read().unwrap().get(&player)?;
        let handle = self.get(id)?;
        Some((handle, color))
    }

    /// Drop a battle and its seat entries. The handle stays alive for any
    /// thread still holding an `Arc`, but is flagged expired first.
    pub fn remove(&self, id: BattleId) {
        if let Some(handle) = self.battles.write().unwrap().remove(&id) {
            handle.expire();
        }
        self.by_player
            .write()
            .unwrap()
            .retain(|_, (battle, _)| *battle != id);
    }

    pub fn all(&self) -> Vec<Arc<BattleHandle>> {
        self.battles.read().unwrap().values().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.battles.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.battles.read().unwrap().is_empty()
    }
}
