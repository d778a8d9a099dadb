// Message handlers.
//
// Dispatch has already verified session kind, auth, and the payload shape;
// handlers validate domain rules. Battle handlers run on network threads
// and therefore do exactly one thing with battle state: enqueue a
// `PendingMove`. Everything that mutates a battle happens on the world
// tick.

use std::sync::Arc;

use scrollforge_engine::{Battle, BattleHandle, PendingMove, SideSpec};
use scrollforge_protocol::message::{ClientMessage, ServerMessage};
use scrollforge_protocol::types::{
    AiDifficulty, BattleKind, PlayerId, SideColor, TemplateId,
};

use crate::context::{AppContext, SERVER_VERSION};
use crate::matchmaker::WaitingPlayer;
use crate::session::Session;

fn fail(session: &Session, op: &str, info: impl Into<String>) {
    session.send(&ServerMessage::Fail {
        op: op.to_owned(),
        info: info.into(),
    });
}

pub fn sign_in(ctx: &AppContext, session: &Arc<Session>, message: ClientMessage) {
    let ClientMessage::SignIn { name } = message else {
        return;
    };
    match ctx.sessions.sign_in(session, &name) {
        Ok(id) => {
            tracing::info!(conn = session.conn.0, player = id.0, name = %name, "signed in");
            session.send(&ServerMessage::SignInOk { id });
        }
        Err(error) => {
            tracing::debug!(conn = session.conn.0, name = %name, %error, "sign-in rejected");
            fail(session, "SignIn", error.to_string());
        }
    }
}

pub fn server_info(ctx: &AppContext, session: &Arc<Session>, _message: ClientMessage) {
    session.send(&ServerMessage::ServerInfo {
        name: ctx.config.name.clone(),
        version: SERVER_VERSION.to_owned(),
        battle_port: ctx.config.battle_port,
    });
}

pub fn ping(_ctx: &AppContext, session: &Arc<Session>, _message: ClientMessage) {
    session.send(&ServerMessage::Pong);
}

fn validate_deck(ctx: &AppContext, deck: &[TemplateId]) -> Result<(), String> {
    if deck.is_empty() {
        return Err("deck must not be empty".into());
    }
    if let Some(unknown) = deck.iter().find(|id| !ctx.templates.contains(**id)) {
        return Err(format!("unknown template id {}", unknown.0));
    }
    Ok(())
}

/// Seat two players, register the battle, and tell both about it.
fn start_battle(
    ctx: &AppContext,
    kind: BattleKind,
    difficulty: AiDifficulty,
    black: SideSpec,
    white: SideSpec,
) {
    let id = ctx.battles.allocate_id();
    let black_name = black.name.clone();
    let white_name = white.name.clone();
    let seats = [
        (black.player, SideColor::Black),
        (white.player, SideColor::White),
    ];
    let battle = Battle::new(
        id,
        kind,
        difficulty,
        black,
        white,
        ctx.templates.clone(),
        ctx.next_seed(),
    );
    ctx.battles.insert(BattleHandle::new(battle), &seats);
    tracing::info!(battle = id.0, ?kind, black = %black_name, white = %white_name, "battle created");

    for (player, color) in seats {
        if player.is_ai() {
            continue;
        }
        if let Some(peer) = ctx.sessions.session_for(player) {
            peer.send(&ServerMessage::GameInfo {
                battle: id,
                color,
                white: white_name.clone(),
                black: black_name.clone(),
            });
        }
    }
}

pub fn quick_match(ctx: &AppContext, session: &Arc<Session>, message: ClientMessage) {
    let ClientMessage::QuickMatch { deck } = message else {
        return;
    };
    if let Err(info) = validate_deck(ctx, &deck) {
        fail(session, "QuickMatch", info);
        return;
    }
    let (Some(player), Some(name)) = (session.player(), session.name()) else {
        return;
    };
    if ctx.battles.find_for_player(player).is_some() {
        fail(session, "QuickMatch", "already in a battle");
        return;
    }
    let candidate = WaitingPlayer {
        player,
        name: name.clone(),
        deck: deck.clone(),
    };
    match ctx.matchmaker.offer(candidate) {
        Some(opponent) => {
            // Earlier arrival takes black; who moves first is the engine's
            // coin flip, not the seat order.
            start_battle(
                ctx,
                BattleKind::Unranked,
                AiDifficulty::Easy,
                SideSpec {
                    player: opponent.player,
                    name: opponent.name,
                    deck: opponent.deck,
                },
                SideSpec { player, name, deck },
            );
        }
        None => {
            tracing::debug!(player = player.0, "quick-match queued");
            session.send(&ServerMessage::Ok {
                op: "QuickMatch".to_owned(),
            });
        }
    }
}

pub fn play_ai(ctx: &AppContext, session: &Arc<Session>, message: ClientMessage) {
    let ClientMessage::PlayAi { deck, difficulty } = message else {
        return;
    };
    if let Err(info) = validate_deck(ctx, &deck) {
        fail(session, "PlayAi", info);
        return;
    }
    let (Some(player), Some(name)) = (session.player(), session.name()) else {
        return;
    };
    if ctx.battles.find_for_player(player).is_some() {
        fail(session, "PlayAi", "already in a battle");
        return;
    }
    // The AI mirrors the challenger's deck.
    start_battle(
        ctx,
        BattleKind::SinglePlayer,
        difficulty,
        SideSpec {
            player,
            name,
            deck: deck.clone(),
        },
        SideSpec {
            player: PlayerId::AI,
            name: "Construct".to_owned(),
            deck,
        },
    );
}

/// Look up the caller's battle seat and enqueue, or fail.
fn enqueue(ctx: &AppContext, session: &Arc<Session>, op: &str, mv: PendingMove) {
    let Some(player) = session.player() else {
        return;
    };
    let Some((handle, color)) = ctx.battles.find_for_player(player) else {
        fail(session, op, "not in a battle");
        return;
    };
    if !handle.enqueue(color, mv) {
        fail(session, op, "battle is over");
    }
}

pub fn join_battle(ctx: &AppContext, session: &Arc<Session>, _message: ClientMessage) {
    enqueue(ctx, session, "JoinBattle", PendingMove::Join);
}

pub fn end_phase(ctx: &AppContext, session: &Arc<Session>, message: ClientMessage) {
    let ClientMessage::EndPhase { phase } = message else {
        return;
    };
    enqueue(ctx, session, "EndPhase", PendingMove::EndPhase { reported: phase });
}

pub fn play_scroll(ctx: &AppContext, session: &Arc<Session>, message: ClientMessage) {
    let ClientMessage::PlayScroll { scroll, tile } = message else {
        return;
    };
    enqueue(ctx, session, "PlayScroll", PendingMove::PlayScroll { scroll, tile });
}

pub fn surrender(ctx: &AppContext, session: &Arc<Session>, message: ClientMessage) {
    let ClientMessage::Surrender = message else {
        return;
    };
    enqueue(ctx, session, "Surrender", PendingMove::Surrender);
}

pub fn leave_game(ctx: &AppContext, session: &Arc<Session>, message: ClientMessage) {
    let ClientMessage::LeaveGame = message else {
        return;
    };
    enqueue(ctx, session, "LeaveGame", PendingMove::Leave);
}
