//! Game progression state machine.
//!
//! All transitions validate before mutating: a blocked transition returns a
//! tagged `TransitionResult` and leaves the game untouched. The finalizer
//! is only reachable through `finalize_and_advance`, the single edge out of
//! the grading state, which is what makes the commit at-most-once per
//! question (backed up by the `finalized` flag on the question itself).

use super::AppState;
use crate::types::*;

impl AppState {
    /// lobby -> in_round: host selects a round to play
    pub async fn start_round(&self, game_id: &str, round_id: &str) -> TransitionResult {
        let round = match self.rounds.read().await.get(round_id) {
            Some(r) if r.game_id == game_id => r.clone(),
            _ => return TransitionResult::blocked(TransitionReason::NoRound),
        };

        let mut games = self.games.write().await;
        let game = match games.get_mut(game_id) {
            Some(g) => g,
            None => return TransitionResult::blocked(TransitionReason::NoGame),
        };
        if game.state != GameState::Lobby {
            return TransitionResult::blocked(TransitionReason::WrongState);
        }

        game.state = GameState::InRound;
        game.current_round_id = Some(round.id.clone());
        game.current_question_index = Some(0);
        drop(games);

        tracing::info!("Game {} started round {}", game_id, round.round_number);
        self.broadcast_game_state(game_id).await;
        TransitionResult::ok(GameState::InRound)
    }

    /// in_round -> grading: host closes submissions for the current
    /// question. The question index does not change.
    pub async fn close_submissions(&self, game_id: &str) -> TransitionResult {
        {
            let mut games = self.games.write().await;
            let game = match games.get_mut(game_id) {
                Some(g) => g,
                None => return TransitionResult::blocked(TransitionReason::NoGame),
            };
            if game.state != GameState::InRound {
                return TransitionResult::blocked(TransitionReason::WrongState);
            }
            game.state = GameState::Grading;
        }

        self.broadcast_game_state(game_id).await;
        TransitionResult::ok(GameState::Grading)
    }

    /// in_round -> in_round: step to the next question without grading
    pub async fn advance_question(&self, game_id: &str) -> TransitionResult {
        let (round_id, current_index) = {
            let games = self.games.read().await;
            let game = match games.get(game_id) {
                Some(g) => g,
                None => return TransitionResult::blocked(TransitionReason::NoGame),
            };
            let round_id = match &game.current_round_id {
                Some(rid) => rid.clone(),
                None => return TransitionResult::blocked(TransitionReason::NoRound),
            };
            if game.state != GameState::InRound && game.state != GameState::Grading {
                return TransitionResult::blocked(TransitionReason::WrongState);
            }
            (round_id, game.current_question_index.unwrap_or(0))
        };

        let question_count = self.get_questions_for_round(&round_id).await.len();
        let next_index = current_index + 1;
        if next_index >= question_count {
            return TransitionResult::blocked(TransitionReason::EndOfRound);
        }

        {
            let mut games = self.games.write().await;
            if let Some(game) = games.get_mut(game_id) {
                game.current_question_index = Some(next_index);
                game.state = GameState::InRound;
            }
        }

        self.broadcast_game_state(game_id).await;
        TransitionResult::ok(GameState::InRound)
    }

    /// grading -> in_round | between_rounds | finished: commit the current
    /// question's scores into team totals, then advance. This is the only
    /// call site of the finalizer.
    pub async fn finalize_and_advance(&self, game_id: &str) -> TransitionResult {
        let (round_id, current_index) = {
            let games = self.games.read().await;
            let game = match games.get(game_id) {
                Some(g) => g,
                None => return TransitionResult::blocked(TransitionReason::NoGame),
            };
            if game.state != GameState::Grading {
                return TransitionResult::blocked(TransitionReason::WrongState);
            }
            match &game.current_round_id {
                Some(rid) => (rid.clone(), game.current_question_index.unwrap_or(0)),
                None => return TransitionResult::blocked(TransitionReason::NoRound),
            }
        };

        let questions = self.get_questions_for_round(&round_id).await;
        let question = match questions.iter().find(|q| q.index_in_round == current_index) {
            Some(q) => q.clone(),
            None => return TransitionResult::blocked(TransitionReason::NoRound),
        };

        if !question.finalized {
            match self.finalize_question(&question.id).await {
                Ok(count) => {
                    tracing::info!(
                        "Finalized question {} ({} answers committed)",
                        question.id,
                        count
                    );
                }
                Err(e) => {
                    // AlreadyFinalized lost a race with a concurrent call;
                    // the commit happened exactly once either way.
                    tracing::warn!("Finalize for question {} refused: {}", question.id, e);
                }
            }
        }

        let is_last_question = current_index >= questions.len().saturating_sub(1);
        let result = if is_last_question {
            self.leave_round(game_id, &round_id).await
        } else {
            let mut games = self.games.write().await;
            if let Some(game) = games.get_mut(game_id) {
                game.current_question_index = Some(current_index + 1);
                game.state = GameState::InRound;
            }
            TransitionResult::ok(GameState::InRound)
        };

        self.broadcast_game_state(game_id).await;
        self.broadcast_to_all(crate::protocol::ServerMessage::Standings {
            entries: self.get_standings(game_id).await,
        });
        result
    }

    /// grading -> between_rounds | finished, depending on whether any
    /// round follows the current one
    pub async fn go_to_between_rounds(&self, game_id: &str) -> TransitionResult {
        let (state, round_id) = {
            let games = self.games.read().await;
            let game = match games.get(game_id) {
                Some(g) => g,
                None => return TransitionResult::blocked(TransitionReason::NoGame),
            };
            (game.state, game.current_round_id.clone())
        };
        if state != GameState::Grading {
            return TransitionResult::blocked(TransitionReason::WrongState);
        }
        let round_id = match round_id {
            Some(rid) => rid,
            None => return TransitionResult::blocked(TransitionReason::NoRound),
        };

        let result = self.leave_round(game_id, &round_id).await;
        self.broadcast_game_state(game_id).await;
        result
    }

    /// Shared tail of the end-of-round transitions: between_rounds if more
    /// rounds exist, otherwise finished.
    async fn leave_round(&self, game_id: &str, round_id: &str) -> TransitionResult {
        let rounds = self.get_rounds_for_game(game_id).await;
        let current_position = rounds.iter().position(|r| r.id == round_id);
        let has_more_rounds = match current_position {
            Some(pos) => pos + 1 < rounds.len(),
            None => false,
        };

        let next_state = if has_more_rounds {
            GameState::BetweenRounds
        } else {
            GameState::Finished
        };

        let mut games = self.games.write().await;
        if let Some(game) = games.get_mut(game_id) {
            game.state = next_state;
        }
        TransitionResult::ok(next_state)
    }

    /// between_rounds -> in_round: start the next round in play order.
    /// If no round remains the game auto-finishes and the caller gets
    /// `no_more_rounds`.
    pub async fn start_next_round(&self, game_id: &str) -> TransitionResult {
        let (state, current_round_id) = {
            let games = self.games.read().await;
            let game = match games.get(game_id) {
                Some(g) => g,
                None => return TransitionResult::blocked(TransitionReason::NoGame),
            };
            (game.state, game.current_round_id.clone())
        };
        if state != GameState::BetweenRounds {
            return TransitionResult::blocked(TransitionReason::NotBetweenRounds);
        }

        let result = self.enter_next_round(game_id, current_round_id.as_deref()).await;
        self.broadcast_game_state(game_id).await;
        result
    }

    /// Move straight to the next round by play order, regardless of where
    /// grading stands (host "skip ahead"). With no active round this
    /// starts the first round.
    pub async fn advance_round(&self, game_id: &str) -> TransitionResult {
        let current_round_id = {
            let games = self.games.read().await;
            match games.get(game_id) {
                Some(g) => g.current_round_id.clone(),
                None => return TransitionResult::blocked(TransitionReason::NoGame),
            }
        };

        let result = self.enter_next_round(game_id, current_round_id.as_deref()).await;
        self.broadcast_game_state(game_id).await;
        if !result.success && result.reason == Some(TransitionReason::NoMoreRounds) {
            return TransitionResult::blocked(TransitionReason::EndOfGame);
        }
        result
    }

    async fn enter_next_round(
        &self,
        game_id: &str,
        current_round_id: Option<&str>,
    ) -> TransitionResult {
        let rounds = self.get_rounds_for_game(game_id).await;
        if rounds.is_empty() {
            return TransitionResult::blocked(TransitionReason::NoRounds);
        }

        // Rounds are ordered by round_number; "next" is positional, not by
        // id. No current round means we start from the top.
        let next_index = match current_round_id {
            Some(rid) => match rounds.iter().position(|r| r.id == rid) {
                Some(pos) => pos + 1,
                None => 0,
            },
            None => 0,
        };

        let mut games = self.games.write().await;
        let game = match games.get_mut(game_id) {
            Some(g) => g,
            None => return TransitionResult::blocked(TransitionReason::NoGame),
        };

        if next_index >= rounds.len() {
            game.state = GameState::Finished;
            return TransitionResult::blocked(TransitionReason::NoMoreRounds);
        }

        game.state = GameState::InRound;
        game.current_round_id = Some(rounds[next_index].id.clone());
        game.current_question_index = Some(0);
        TransitionResult::ok(GameState::InRound)
    }

    /// Early end, available from any non-finished state
    pub async fn end_game(&self, game_id: &str) -> TransitionResult {
        {
            let mut games = self.games.write().await;
            let game = match games.get_mut(game_id) {
                Some(g) => g,
                None => return TransitionResult::blocked(TransitionReason::NoGame),
            };
            game.state = GameState::Finished;
        }

        tracing::info!("Game {} ended by host", game_id);
        self.broadcast_game_state(game_id).await;
        TransitionResult::ok(GameState::Finished)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::game_with_text_round;

    async fn two_round_game(state: &AppState) -> (GameId, Vec<RoundId>, Vec<QuestionId>) {
        let (game_id, round1, mut questions) =
            game_with_text_round(state, &["alpha", "beta"], 10).await;
        let round2 = state
            .create_round(&game_id, "Round Two".into(), RoundType::Media)
            .await
            .unwrap();
        let q = state
            .create_question(
                &round2.id,
                "Final question".into(),
                20,
                QuestionKind::Text {
                    correct_answer: "gamma".into(),
                    accepted_answers: Vec::new(),
                },
            )
            .await
            .unwrap();
        questions.push(q.id);
        (game_id, vec![round1, round2.id], questions)
    }

    #[tokio::test]
    async fn test_start_round_requires_lobby() {
        let state = AppState::new();
        let (game_id, rounds, _) = two_round_game(&state).await;

        let result = state.start_round(&game_id, &rounds[0]).await;
        assert!(result.success);
        assert_eq!(result.next_state, Some(GameState::InRound));

        // Already in a round now
        let result = state.start_round(&game_id, &rounds[1]).await;
        assert_eq!(result, TransitionResult::blocked(TransitionReason::WrongState));
    }

    #[tokio::test]
    async fn test_start_round_rejects_foreign_round() {
        let state = AppState::new();
        let (game_id, _, _) = two_round_game(&state).await;
        let (_, other_round, _) = game_with_text_round(&state, &["z"], 5).await;

        let result = state.start_round(&game_id, &other_round).await;
        assert_eq!(result, TransitionResult::blocked(TransitionReason::NoRound));
    }

    #[tokio::test]
    async fn test_close_submissions_only_from_in_round() {
        let state = AppState::new();
        let (game_id, rounds, _) = two_round_game(&state).await;

        let result = state.close_submissions(&game_id).await;
        assert_eq!(result, TransitionResult::blocked(TransitionReason::WrongState));

        state.start_round(&game_id, &rounds[0]).await;
        let result = state.close_submissions(&game_id).await;
        assert_eq!(result.next_state, Some(GameState::Grading));
    }

    #[tokio::test]
    async fn test_advance_question_end_of_round_does_not_mutate() {
        let state = AppState::new();
        let (game_id, rounds, _) = two_round_game(&state).await;
        state.start_round(&game_id, &rounds[0]).await;

        assert!(state.advance_question(&game_id).await.success);

        // Index 1 is the last question of round 1
        let result = state.advance_question(&game_id).await;
        assert_eq!(result, TransitionResult::blocked(TransitionReason::EndOfRound));

        let game = state.get_game(&game_id).await.unwrap();
        assert_eq!(game.current_question_index, Some(1));
        assert_eq!(game.state, GameState::InRound);
    }

    #[tokio::test]
    async fn test_advance_question_without_round() {
        let state = AppState::new();
        let game = state.create_game(None, None).await;

        // No active round yet, distinct from being in the wrong state
        let result = state.advance_question(&game.id).await;
        assert_eq!(result, TransitionResult::blocked(TransitionReason::NoRound));
    }

    #[tokio::test]
    async fn test_advance_question_wrong_state_with_round() {
        let state = AppState::new();
        let (game_id, rounds, _) = two_round_game(&state).await;
        state.start_round(&game_id, &rounds[0]).await;
        state.advance_question(&game_id).await;
        state.close_submissions(&game_id).await;
        state.finalize_and_advance(&game_id).await;

        // between_rounds still points at the finished round
        let game = state.get_game(&game_id).await.unwrap();
        assert_eq!(game.state, GameState::BetweenRounds);
        assert!(game.current_round_id.is_some());

        let result = state.advance_question(&game_id).await;
        assert_eq!(result, TransitionResult::blocked(TransitionReason::WrongState));
    }

    #[tokio::test]
    async fn test_finalize_and_advance_walks_the_round() {
        let state = AppState::new();
        let (game_id, rounds, _) = two_round_game(&state).await;
        state.start_round(&game_id, &rounds[0]).await;

        // Question 0: grade then finalize-and-advance -> question 1
        state.close_submissions(&game_id).await;
        let result = state.finalize_and_advance(&game_id).await;
        assert_eq!(result.next_state, Some(GameState::InRound));
        let game = state.get_game(&game_id).await.unwrap();
        assert_eq!(game.current_question_index, Some(1));

        // Question 1 is the round's last -> between_rounds
        state.close_submissions(&game_id).await;
        let result = state.finalize_and_advance(&game_id).await;
        assert_eq!(result.next_state, Some(GameState::BetweenRounds));

        // Next round, single question, last round -> finished
        assert!(state.start_next_round(&game_id).await.success);
        state.close_submissions(&game_id).await;
        let result = state.finalize_and_advance(&game_id).await;
        assert_eq!(result.next_state, Some(GameState::Finished));
    }

    #[tokio::test]
    async fn test_finalize_and_advance_requires_grading() {
        let state = AppState::new();
        let (game_id, rounds, _) = two_round_game(&state).await;
        state.start_round(&game_id, &rounds[0]).await;

        let result = state.finalize_and_advance(&game_id).await;
        assert_eq!(result, TransitionResult::blocked(TransitionReason::WrongState));
    }

    #[tokio::test]
    async fn test_grading_not_reentrant_for_finalized_question() {
        // Guard-rail: once a question is finalized the machine can only
        // re-enter grading after advancing to a new question.
        let state = AppState::new();
        let (game_id, rounds, questions) = two_round_game(&state).await;
        let team_id = state.join_team(&game_id, "Alpha".into()).await.unwrap();
        state.start_round(&game_id, &rounds[0]).await;
        state
            .submit_answer(&questions[0], &team_id, Some("alpha".into()), None)
            .await
            .unwrap();
        state.auto_grade_question(&questions[0]).await.unwrap();
        state.close_submissions(&game_id).await;
        state.finalize_and_advance(&game_id).await;

        let total = state.teams.read().await.get(&team_id).unwrap().total_score;
        assert_eq!(total, 10);

        // The machine is now on question 1; closing and finalizing again
        // touches question 1, never question 0.
        state.close_submissions(&game_id).await;
        state.finalize_and_advance(&game_id).await;
        let total = state.teams.read().await.get(&team_id).unwrap().total_score;
        assert_eq!(total, 10);

        // A direct second finalize of question 0 is a hard error
        let result = state.finalize_question(&questions[0]).await;
        assert_eq!(result, Err(crate::error::GameError::AlreadyFinalized));
        let total = state.teams.read().await.get(&team_id).unwrap().total_score;
        assert_eq!(total, 10);
    }

    #[tokio::test]
    async fn test_start_next_round_requires_between_rounds() {
        let state = AppState::new();
        let (game_id, rounds, _) = two_round_game(&state).await;
        state.start_round(&game_id, &rounds[0]).await;

        let result = state.start_next_round(&game_id).await;
        assert_eq!(
            result,
            TransitionResult::blocked(TransitionReason::NotBetweenRounds)
        );
    }

    #[tokio::test]
    async fn test_start_next_round_exhausted_finishes_game() {
        let state = AppState::new();
        let (game_id, round_id, _) = game_with_text_round(&state, &["only"], 5).await;
        state.start_round(&game_id, &round_id).await;

        // Force between_rounds on the last round; normal flow would have
        // gone straight to finished.
        state.games.write().await.get_mut(&game_id).unwrap().state = GameState::BetweenRounds;

        let result = state.start_next_round(&game_id).await;
        assert_eq!(
            result,
            TransitionResult::blocked(TransitionReason::NoMoreRounds)
        );
        let game = state.get_game(&game_id).await.unwrap();
        assert_eq!(game.state, GameState::Finished);
    }

    #[tokio::test]
    async fn test_go_to_between_rounds_last_round_finishes() {
        let state = AppState::new();
        let (game_id, round_id, _) = game_with_text_round(&state, &["only"], 5).await;
        state.start_round(&game_id, &round_id).await;
        state.close_submissions(&game_id).await;

        let result = state.go_to_between_rounds(&game_id).await;
        assert!(result.success);
        assert_eq!(result.next_state, Some(GameState::Finished));
    }

    #[tokio::test]
    async fn test_advance_round_skips_ahead() {
        let state = AppState::new();
        let (game_id, rounds, _) = two_round_game(&state).await;
        state.start_round(&game_id, &rounds[0]).await;

        let result = state.advance_round(&game_id).await;
        assert!(result.success);
        let game = state.get_game(&game_id).await.unwrap();
        assert_eq!(game.current_round_id, Some(rounds[1].clone()));
        assert_eq!(game.current_question_index, Some(0));

        // Past the last round: end_of_game, state flips to finished
        let result = state.advance_round(&game_id).await;
        assert_eq!(result, TransitionResult::blocked(TransitionReason::EndOfGame));
        let game = state.get_game(&game_id).await.unwrap();
        assert_eq!(game.state, GameState::Finished);
    }

    #[tokio::test]
    async fn test_end_game_always_available() {
        let state = AppState::new();
        let (game_id, rounds, _) = two_round_game(&state).await;

        assert!(state.end_game(&game_id).await.success);
        let game = state.get_game(&game_id).await.unwrap();
        assert_eq!(game.state, GameState::Finished);
        let _ = rounds;
    }
}
