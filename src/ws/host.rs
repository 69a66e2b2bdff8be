//! Host-only command handlers
//!
//! All handlers in this module require the Host role. Authorization is
//! checked in the main dispatch layer before calling these.

use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::*;
use crate::ws::handlers::error_reply;
use std::sync::Arc;

/// Wrap a state machine outcome for the wire. Blocked transitions are an
/// expected part of hosting flow, so they come back as a tagged result,
/// not as an error.
pub fn transition(action: &str, result: TransitionResult) -> Option<ServerMessage> {
    if result.success {
        tracing::info!("Transition {} -> {:?}", action, result.next_state);
    } else {
        tracing::debug!("Transition {} blocked: {:?}", action, result.reason);
    }
    Some(ServerMessage::Transition {
        action: action.to_string(),
        result,
    })
}

fn ack(action: &str) -> Option<ServerMessage> {
    Some(ServerMessage::Ack {
        action: action.to_string(),
    })
}

// ===== Game library =====

pub async fn handle_create_game(
    state: &Arc<AppState>,
    title: Option<String>,
    description: Option<String>,
) -> Option<ServerMessage> {
    let game = state.create_game(title, description).await;
    tracing::info!("Host created game {} ({})", game.id, game.join_code);
    Some(ServerMessage::GameCreated { game })
}

pub async fn handle_list_games(
    state: &Arc<AppState>,
    include_archived: bool,
) -> Option<ServerMessage> {
    let list = state.list_games(include_archived).await;
    Some(ServerMessage::Games { list })
}

pub async fn handle_update_game_meta(
    state: &Arc<AppState>,
    game_id: GameId,
    title: Option<String>,
    description: Option<String>,
) -> Option<ServerMessage> {
    match state.update_game_meta(&game_id, title, description).await {
        Ok(()) => ack("update_game_meta"),
        Err(e) => error_reply(e),
    }
}

pub async fn handle_archive_game(
    state: &Arc<AppState>,
    game_id: GameId,
    archive: bool,
) -> Option<ServerMessage> {
    let result = if archive {
        state.archive_game(&game_id).await
    } else {
        state.restore_game(&game_id).await
    };
    match result {
        Ok(()) => ack(if archive { "archive_game" } else { "restore_game" }),
        Err(e) => error_reply(e),
    }
}

pub async fn handle_delete_game(state: &Arc<AppState>, game_id: GameId) -> Option<ServerMessage> {
    match state.hard_delete_game(&game_id).await {
        Ok(()) => {
            tracing::info!("Host deleted game {}", game_id);
            ack("delete_game")
        }
        Err(e) => error_reply(e),
    }
}

pub async fn handle_duplicate_game(
    state: &Arc<AppState>,
    game_id: GameId,
) -> Option<ServerMessage> {
    match state.duplicate_game(&game_id).await {
        Ok(game) => Some(ServerMessage::GameCreated { game }),
        Err(e) => error_reply(e),
    }
}

pub async fn handle_toggle_lobby_lock(
    state: &Arc<AppState>,
    game_id: GameId,
) -> Option<ServerMessage> {
    match state.toggle_lobby_lock(&game_id).await {
        Ok(locked) => {
            tracing::info!("Game {} lobby locked: {}", game_id, locked);
            ack("toggle_lobby_lock")
        }
        Err(e) => error_reply(e),
    }
}

pub async fn handle_set_max_teams(
    state: &Arc<AppState>,
    game_id: GameId,
    max_teams: u32,
) -> Option<ServerMessage> {
    match state.set_max_teams(&game_id, max_teams).await {
        Ok(()) => ack("set_max_teams"),
        Err(e) => error_reply(e),
    }
}

pub async fn handle_reset_game(
    state: &Arc<AppState>,
    game_id: GameId,
    preserve_teams: bool,
) -> Option<ServerMessage> {
    match state.reset_game(&game_id, preserve_teams).await {
        Ok(()) => {
            tracing::info!(
                "Host reset game {} (preserve_teams: {})",
                game_id,
                preserve_teams
            );
            state.broadcast_game_state(&game_id).await;
            ack("reset_game")
        }
        Err(e) => error_reply(e),
    }
}

pub async fn handle_remove_team(state: &Arc<AppState>, team_id: TeamId) -> Option<ServerMessage> {
    let game_id = state.get_team(&team_id).await.map(|t| t.game_id);
    match state.remove_team(&team_id).await {
        Ok(()) => {
            if let Some(game_id) = game_id {
                let list = state.get_teams_for_game(&game_id).await;
                state.broadcast_to_all(ServerMessage::Teams { game_id, list });
            }
            ack("remove_team")
        }
        Err(e) => error_reply(e),
    }
}

// ===== Authoring =====

pub async fn handle_create_round(
    state: &Arc<AppState>,
    game_id: GameId,
    title: String,
    round_type: RoundType,
) -> Option<ServerMessage> {
    match state.create_round(&game_id, title, round_type).await {
        Ok(round) => Some(ServerMessage::RoundCreated { round }),
        Err(e) => error_reply(e),
    }
}

pub async fn handle_update_round(
    state: &Arc<AppState>,
    round_id: RoundId,
    title: Option<String>,
    round_type: Option<RoundType>,
) -> Option<ServerMessage> {
    match state.update_round(&round_id, title, round_type).await {
        Ok(()) => ack("update_round"),
        Err(e) => error_reply(e),
    }
}

pub async fn handle_delete_round(state: &Arc<AppState>, round_id: RoundId) -> Option<ServerMessage> {
    match state.delete_round(&round_id).await {
        Ok(()) => ack("delete_round"),
        Err(e) => error_reply(e),
    }
}

pub async fn handle_reorder_rounds(
    state: &Arc<AppState>,
    game_id: GameId,
    round_ids: Vec<RoundId>,
) -> Option<ServerMessage> {
    match state.reorder_rounds(&game_id, &round_ids).await {
        Ok(()) => {
            let list = state.get_rounds_for_game(&game_id).await;
            Some(ServerMessage::Rounds { game_id, list })
        }
        Err(e) => error_reply(e),
    }
}

pub async fn handle_create_question(
    state: &Arc<AppState>,
    round_id: RoundId,
    prompt: String,
    points: u32,
    kind: QuestionKind,
) -> Option<ServerMessage> {
    match state.create_question(&round_id, prompt, points, kind).await {
        Ok(question) => Some(ServerMessage::QuestionCreated { question }),
        Err(e) => error_reply(e),
    }
}

pub async fn handle_update_question(
    state: &Arc<AppState>,
    question_id: QuestionId,
    prompt: Option<String>,
    points: Option<u32>,
    kind: Option<QuestionKind>,
) -> Option<ServerMessage> {
    match state.update_question(&question_id, prompt, points, kind).await {
        Ok(()) => ack("update_question"),
        Err(e) => error_reply(e),
    }
}

pub async fn handle_delete_question(
    state: &Arc<AppState>,
    question_id: QuestionId,
) -> Option<ServerMessage> {
    match state.delete_question(&question_id).await {
        Ok(()) => ack("delete_question"),
        Err(e) => error_reply(e),
    }
}

pub async fn handle_reorder_questions(
    state: &Arc<AppState>,
    round_id: RoundId,
    question_ids: Vec<QuestionId>,
) -> Option<ServerMessage> {
    match state.reorder_questions(&round_id, &question_ids).await {
        Ok(()) => {
            let list = state.get_questions_for_round(&round_id).await;
            Some(ServerMessage::Questions { round_id, list })
        }
        Err(e) => error_reply(e),
    }
}

pub async fn handle_duplicate_question(
    state: &Arc<AppState>,
    question_id: QuestionId,
) -> Option<ServerMessage> {
    match state.duplicate_question(&question_id).await {
        Ok(question) => Some(ServerMessage::QuestionCreated { question }),
        Err(e) => error_reply(e),
    }
}

// ===== Flow and grading =====

pub async fn handle_go_to_between_rounds(
    state: &Arc<AppState>,
    game_id: GameId,
) -> Option<ServerMessage> {
    let result = state.go_to_between_rounds(&game_id).await;
    if result.success {
        // Recap the round that just ended for every screen
        if let Some(summary) = state.get_completed_round_summary(&game_id).await {
            state.broadcast_to_all(ServerMessage::RoundSummary { summary });
        }
        state.broadcast_to_all(ServerMessage::Standings {
            entries: state.get_standings(&game_id).await,
        });
    }
    transition("go_to_between_rounds", result)
}

pub async fn handle_auto_grade(
    state: &Arc<AppState>,
    question_id: QuestionId,
) -> Option<ServerMessage> {
    match state.auto_grade_question(&question_id).await {
        Ok(graded) => {
            broadcast_answers_to_host(state, &question_id).await;
            Some(ServerMessage::AutoGraded { question_id, graded })
        }
        Err(e) => error_reply(e),
    }
}

pub async fn handle_set_final_score(
    state: &Arc<AppState>,
    answer_id: AnswerId,
    score: i64,
) -> Option<ServerMessage> {
    let question_id = state.get_answer(&answer_id).await.map(|a| a.question_id);
    match state.set_final_score(&answer_id, score).await {
        Ok(()) => {
            tracing::info!("Host set final score {} on answer {}", score, answer_id);
            if let Some(question_id) = question_id {
                broadcast_answers_to_host(state, &question_id).await;
            }
            ack("set_final_score")
        }
        Err(e) => error_reply(e),
    }
}

/// Refresh every host screen's grading view for a question
async fn broadcast_answers_to_host(state: &Arc<AppState>, question_id: &str) {
    let list = state.get_answers_for_question(question_id).await;
    state.broadcast_to_host(ServerMessage::HostAnswers {
        question_id: question_id.to_string(),
        list,
    });
}
