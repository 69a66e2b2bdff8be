//! WebSocket message dispatch
//!
//! Authorization is checked here, then dispatched to role-specific handler
//! modules. Read queries are answered inline.

use crate::error::GameError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::types::Role;
use std::sync::Arc;

use super::{host, team};

/// Macro to check host authorization and return early if unauthorized
macro_rules! check_host {
    ($role:expr, $action:expr) => {
        if *$role != Role::Host {
            return Some(ServerMessage::Error {
                code: "UNAUTHORIZED".to_string(),
                msg: format!("Only host can {}", $action),
            });
        }
    };
}

/// Map a state-layer error onto the wire
pub fn error_reply(e: GameError) -> Option<ServerMessage> {
    Some(ServerMessage::Error {
        code: e.code().to_string(),
        msg: e.to_string(),
    })
}

/// The same game-state snapshot `broadcast_game_state` pushes, as a direct
/// reply for polling clients and reconnects
pub async fn game_state_reply(state: &Arc<AppState>, game_id: &str) -> Option<ServerMessage> {
    let game = match state.get_game(game_id).await {
        Some(g) => g,
        None => return error_reply(GameError::GameNotFound),
    };
    let current_question = state.get_current_question(game_id).await;

    Some(ServerMessage::GameState {
        game_id: game.id,
        state: game.state,
        current_round_id: game.current_round_id,
        current_question_index: game.current_question_index,
        current_question: current_question.map(Box::new),
        server_now: chrono::Utc::now().to_rfc3339(),
    })
}

/// Handle client messages and return optional response
pub async fn handle_message(
    msg: ClientMessage,
    role: &Role,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    match msg {
        // Connection and team messages
        ClientMessage::Join { join_code } => team::handle_join(state, role, join_code).await,

        ClientMessage::RegisterTeam { game_id, team_name } => {
            team::handle_register_team(state, game_id, team_name).await
        }

        ClientMessage::SubmitAnswer {
            question_id,
            team_id,
            raw_answer,
            answers,
        } => team::handle_submit_answer(state, question_id, team_id, raw_answer, answers).await,

        // Read queries, any role
        ClientMessage::GetGameState { game_id } => game_state_reply(state, &game_id).await,

        ClientMessage::GetRounds { game_id } => {
            let list = state.get_rounds_for_game(&game_id).await;
            Some(ServerMessage::Rounds { game_id, list })
        }

        ClientMessage::GetQuestions { round_id } => {
            let list = state.get_questions_for_round(&round_id).await;
            Some(ServerMessage::Questions { round_id, list })
        }

        ClientMessage::GetTeams { game_id } => {
            let list = state.get_teams_for_game(&game_id).await;
            Some(ServerMessage::Teams { game_id, list })
        }

        ClientMessage::GetStandings { game_id } => Some(ServerMessage::Standings {
            entries: state.get_standings(&game_id).await,
        }),

        ClientMessage::GetRoundSummary { game_id } => {
            match state.get_completed_round_summary(&game_id).await {
                Some(summary) => Some(ServerMessage::RoundSummary { summary }),
                None => error_reply(GameError::RoundNotFound),
            }
        }

        ClientMessage::GetSubmissionStatus { game_id } => {
            let status = state.submission_status_for_game(&game_id).await;
            Some(ServerMessage::SubmissionStatus { game_id, status })
        }

        ClientMessage::GetTeamHistory { team_id } => {
            if state.get_team(&team_id).await.is_none() {
                return error_reply(GameError::TeamNotFound);
            }
            let entries = state.get_team_history(&team_id).await;
            Some(ServerMessage::TeamHistory { team_id, entries })
        }

        // Host-only: game library
        ClientMessage::HostCreateGame { title, description } => {
            check_host!(role, "create games");
            host::handle_create_game(state, title, description).await
        }

        ClientMessage::HostListGames { include_archived } => {
            check_host!(role, "list games");
            host::handle_list_games(state, include_archived).await
        }

        ClientMessage::HostUpdateGameMeta {
            game_id,
            title,
            description,
        } => {
            check_host!(role, "edit games");
            host::handle_update_game_meta(state, game_id, title, description).await
        }

        ClientMessage::HostArchiveGame { game_id } => {
            check_host!(role, "archive games");
            host::handle_archive_game(state, game_id, true).await
        }

        ClientMessage::HostRestoreGame { game_id } => {
            check_host!(role, "restore games");
            host::handle_archive_game(state, game_id, false).await
        }

        ClientMessage::HostDeleteGame { game_id } => {
            check_host!(role, "delete games");
            host::handle_delete_game(state, game_id).await
        }

        ClientMessage::HostDuplicateGame { game_id } => {
            check_host!(role, "duplicate games");
            host::handle_duplicate_game(state, game_id).await
        }

        ClientMessage::HostToggleLobbyLock { game_id } => {
            check_host!(role, "lock the lobby");
            host::handle_toggle_lobby_lock(state, game_id).await
        }

        ClientMessage::HostSetMaxTeams { game_id, max_teams } => {
            check_host!(role, "set the team limit");
            host::handle_set_max_teams(state, game_id, max_teams).await
        }

        ClientMessage::HostResetGame {
            game_id,
            preserve_teams,
        } => {
            check_host!(role, "reset games");
            host::handle_reset_game(state, game_id, preserve_teams).await
        }

        ClientMessage::HostRemoveTeam { team_id } => {
            check_host!(role, "remove teams");
            host::handle_remove_team(state, team_id).await
        }

        // Host-only: authoring
        ClientMessage::HostCreateRound {
            game_id,
            title,
            round_type,
        } => {
            check_host!(role, "create rounds");
            host::handle_create_round(state, game_id, title, round_type).await
        }

        ClientMessage::HostUpdateRound {
            round_id,
            title,
            round_type,
        } => {
            check_host!(role, "edit rounds");
            host::handle_update_round(state, round_id, title, round_type).await
        }

        ClientMessage::HostDeleteRound { round_id } => {
            check_host!(role, "delete rounds");
            host::handle_delete_round(state, round_id).await
        }

        ClientMessage::HostReorderRounds { game_id, round_ids } => {
            check_host!(role, "reorder rounds");
            host::handle_reorder_rounds(state, game_id, round_ids).await
        }

        ClientMessage::HostCreateQuestion {
            round_id,
            prompt,
            points,
            kind,
        } => {
            check_host!(role, "create questions");
            host::handle_create_question(state, round_id, prompt, points, kind).await
        }

        ClientMessage::HostUpdateQuestion {
            question_id,
            prompt,
            points,
            kind,
        } => {
            check_host!(role, "edit questions");
            host::handle_update_question(state, question_id, prompt, points, kind).await
        }

        ClientMessage::HostDeleteQuestion { question_id } => {
            check_host!(role, "delete questions");
            host::handle_delete_question(state, question_id).await
        }

        ClientMessage::HostReorderQuestions {
            round_id,
            question_ids,
        } => {
            check_host!(role, "reorder questions");
            host::handle_reorder_questions(state, round_id, question_ids).await
        }

        ClientMessage::HostDuplicateQuestion { question_id } => {
            check_host!(role, "duplicate questions");
            host::handle_duplicate_question(state, question_id).await
        }

        // Host-only: game flow
        ClientMessage::HostStartRound { game_id, round_id } => {
            check_host!(role, "start rounds");
            host::transition("start_round", state.start_round(&game_id, &round_id).await)
        }

        ClientMessage::HostCloseSubmissions { game_id } => {
            check_host!(role, "close submissions");
            host::transition(
                "close_submissions",
                state.close_submissions(&game_id).await,
            )
        }

        ClientMessage::HostAdvanceQuestion { game_id } => {
            check_host!(role, "advance questions");
            host::transition(
                "advance_question",
                state.advance_question(&game_id).await,
            )
        }

        ClientMessage::HostFinalizeAndAdvance { game_id } => {
            check_host!(role, "finalize questions");
            host::transition(
                "finalize_and_advance",
                state.finalize_and_advance(&game_id).await,
            )
        }

        ClientMessage::HostGoToBetweenRounds { game_id } => {
            check_host!(role, "end rounds");
            host::handle_go_to_between_rounds(state, game_id).await
        }

        ClientMessage::HostStartNextRound { game_id } => {
            check_host!(role, "start rounds");
            host::transition(
                "start_next_round",
                state.start_next_round(&game_id).await,
            )
        }

        ClientMessage::HostAdvanceRound { game_id } => {
            check_host!(role, "advance rounds");
            host::transition("advance_round", state.advance_round(&game_id).await)
        }

        ClientMessage::HostEndGame { game_id } => {
            check_host!(role, "end games");
            host::transition("end_game", state.end_game(&game_id).await)
        }

        // Host-only: grading
        ClientMessage::HostAutoGrade { question_id } => {
            check_host!(role, "grade answers");
            host::handle_auto_grade(state, question_id).await
        }

        ClientMessage::HostGetAnswers { question_id } => {
            check_host!(role, "view answers");
            let list = state.get_answers_for_question(&question_id).await;
            Some(ServerMessage::HostAnswers { question_id, list })
        }

        ClientMessage::HostGetNeedsReview { question_id } => {
            check_host!(role, "view answers");
            let list = state.get_needs_review(&question_id).await;
            Some(ServerMessage::HostAnswers { question_id, list })
        }

        ClientMessage::HostSetFinalScore { answer_id, score } => {
            check_host!(role, "override scores");
            host::handle_set_final_score(state, answer_id, score).await
        }
    }
}
