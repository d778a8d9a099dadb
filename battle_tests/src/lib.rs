// Test-only battle client for end-to-end integration tests.
//
// Wraps the real `NetClient` from `scrollforge_server::client` with
// synchronous polling helpers so test scenarios read top to bottom:
// connect → sign in → match → drive rounds → assert on effects. Everything
// under the wrappers is the same code path real clients use.
//
// See `tests/full_pipeline.rs` for the scenarios.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use scrollforge_protocol::effect::Effect;
use scrollforge_protocol::message::{ClientMessage, ServerMessage};
use scrollforge_protocol::types::{PlayerId, SideColor, TemplateId};
use scrollforge_server::NetClient;

/// Default timeout for blocking poll operations.
const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// A test battle client with blocking helpers.
pub struct TestClient {
    client: NetClient,
    /// Effects from consumed `NewEffects` batches, in arrival order.
    pub effects: Vec<Effect>,
    pub player: Option<PlayerId>,
    pub color: Option<SideColor>,
}

impl TestClient {
    pub fn connect(addr: SocketAddr) -> Self {
        Self {
            client: NetClient::connect(addr).expect("TestClient::connect failed"),
            effects: Vec::new(),
            player: None,
            color: None,
        }
    }

    pub fn send(&mut self, message: &ClientMessage) {
        self.client.send(message).expect("send failed");
    }

    pub fn send_raw(&mut self, bytes: &[u8]) {
        self.client.send_raw(bytes).expect("send_raw failed");
    }

    /// Sign in and record the assigned player id.
    pub fn sign_in(&mut self, name: &str) {
        self.send(&ClientMessage::SignIn { name: name.into() });
        let reply = self.expect(|m| {
            matches!(m, ServerMessage::SignInOk { .. } | ServerMessage::Fail { .. })
        });
        match reply {
            ServerMessage::SignInOk { id } => self.player = Some(id),
            other => panic!("sign-in rejected: {other:?}"),
        }
    }

    /// A deck of the given template repeated to a playable size.
    pub fn deck(template: u32) -> Vec<TemplateId> {
        vec![TemplateId(template); 12]
    }

    /// Block until a message satisfying `pred` arrives; effect batches seen
    /// along the way are accumulated into `self.effects`, everything else is
    /// discarded. Panics on timeout.
    pub fn expect(&mut self, mut pred: impl FnMut(&ServerMessage) -> bool) -> ServerMessage {
        let deadline = Instant::now() + POLL_TIMEOUT;
        loop {
            let Some(remaining) = deadline.checked_duration_since(Instant::now()) else {
                panic!("timed out waiting for message");
            };
            let Some(message) = self.client.wait_for(remaining, |_| true) else {
                panic!("timed out waiting for message");
            };
            if let ServerMessage::NewEffects { effects } = &message {
                self.effects.extend(effects.clone());
            }
            if pred(&message) {
                return message;
            }
        }
    }

    /// Block until an accumulated effect satisfies `pred`; returns a clone.
    pub fn expect_effect(&mut self, mut pred: impl FnMut(&Effect) -> bool) -> Effect {
        let deadline = Instant::now() + POLL_TIMEOUT;
        loop {
            if let Some(effect) = self.effects.iter().find(|e| pred(e)) {
                return effect.clone();
            }
            assert!(Instant::now() < deadline, "timed out waiting for effect");
            if let Some(ServerMessage::NewEffects { effects }) = self
                .client
                .wait_for(Duration::from_millis(200), |m| {
                    matches!(m, ServerMessage::NewEffects { .. })
                })
            {
                self.effects.extend(effects);
            }
        }
    }

    /// Wait for `GameInfo` and record this client's side color.
    pub fn expect_game_info(&mut self) -> ServerMessage {
        let info = self.expect(|m| matches!(m, ServerMessage::GameInfo { .. }));
        if let ServerMessage::GameInfo { color, .. } = &info {
            self.color = Some(*color);
        }
        info
    }

    /// The round's active color, from the most recent `TurnBegin`.
    pub fn current_turn(&self) -> Option<SideColor> {
        self.effects.iter().rev().find_map(|e| match e {
            Effect::TurnBegin { color, .. } => Some(*color),
            _ => None,
        })
    }

    /// Drain anything already buffered without blocking.
    pub fn drain(&mut self) {
        for message in self.client.poll() {
            if let ServerMessage::NewEffects { effects } = message {
                self.effects.extend(effects);
            }
        }
    }
}
