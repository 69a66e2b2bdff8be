//! Team and spectator message handlers

use crate::error::GameError;
use crate::protocol::ServerMessage;
use crate::state::AppState;
use crate::types::*;
use crate::ws::handlers::error_reply;
use std::collections::HashMap;
use std::sync::Arc;

/// Resolve a join code to its game and greet the client
pub async fn handle_join(
    state: &Arc<AppState>,
    role: &Role,
    join_code: String,
) -> Option<ServerMessage> {
    match state.get_game_by_join_code(&join_code).await {
        Some(game) => {
            tracing::info!("Client joined game {} via code {}", game.id, join_code);
            Some(ServerMessage::Welcome {
                protocol: "1.0".to_string(),
                role: role.clone(),
                game,
                server_now: chrono::Utc::now().to_rfc3339(),
            })
        }
        None => error_reply(GameError::GameNotFound),
    }
}

pub async fn handle_register_team(
    state: &Arc<AppState>,
    game_id: GameId,
    team_name: String,
) -> Option<ServerMessage> {
    match state.join_team(&game_id, team_name).await {
        Ok(team_id) => {
            let team = state.get_team(&team_id).await?;
            Some(ServerMessage::TeamRegistered { team })
        }
        Err(e) => error_reply(e),
    }
}

pub async fn handle_submit_answer(
    state: &Arc<AppState>,
    question_id: QuestionId,
    team_id: TeamId,
    raw_answer: Option<String>,
    answers: Option<HashMap<String, String>>,
) -> Option<ServerMessage> {
    match state
        .submit_answer(&question_id, &team_id, raw_answer, answers)
        .await
    {
        Ok(answer_id) => Some(ServerMessage::SubmissionConfirmed { answer_id }),
        Err(e) => error_reply(e),
    }
}
