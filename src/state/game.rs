use super::AppState;
use crate::error::GameError;
use crate::types::*;
use rand::Rng;

/// Generate a random 6-character join code
fn generate_join_code() -> String {
    let mut rng = rand::rng();
    (0..JOIN_CODE_LENGTH)
        .map(|_| JOIN_CODE_CHARS[rng.random_range(0..JOIN_CODE_CHARS.len())] as char)
        .collect()
}

impl AppState {
    /// Create a new game in the lobby state with a collision-checked join
    /// code. The whole generate-check-insert runs under the games write
    /// lock.
    pub async fn create_game(&self, title: Option<String>, description: Option<String>) -> Game {
        let mut games = self.games.write().await;

        let join_code = loop {
            let code = generate_join_code();
            if !games.values().any(|g| g.join_code == code) {
                break code;
            }
            // Collision - try again (32^6 combinations, so this is rare)
        };

        let game = Game {
            id: ulid::Ulid::new().to_string(),
            join_code,
            title: title.unwrap_or_else(|| "Untitled Game".to_string()),
            description,
            state: GameState::Lobby,
            current_round_id: None,
            current_question_index: None,
            is_archived: false,
            is_lobby_locked: false,
            max_teams: DEFAULT_MAX_TEAMS,
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        games.insert(game.id.clone(), game.clone());
        tracing::info!("Created game {} with join code {}", game.id, game.join_code);
        game
    }

    pub async fn get_game(&self, game_id: &str) -> Option<Game> {
        self.games.read().await.get(game_id).cloned()
    }

    /// Case-insensitive lookup: codes are stored and compared uppercased
    pub async fn get_game_by_join_code(&self, code: &str) -> Option<Game> {
        let code = code.to_uppercase();
        self.games
            .read()
            .await
            .values()
            .find(|g| g.join_code == code)
            .cloned()
    }

    /// All games, newest first, with round/question counts. Archived games
    /// are hidden unless asked for.
    pub async fn list_games(&self, include_archived: bool) -> Vec<GameListEntry> {
        let games = self.games.read().await;
        let rounds = self.rounds.read().await;
        let questions = self.questions.read().await;

        let mut entries: Vec<GameListEntry> = games
            .values()
            .filter(|g| include_archived || !g.is_archived)
            .map(|game| {
                let round_ids: Vec<&RoundId> = rounds
                    .values()
                    .filter(|r| r.game_id == game.id)
                    .map(|r| &r.id)
                    .collect();
                let question_count = questions
                    .values()
                    .filter(|q| round_ids.contains(&&q.round_id))
                    .count();
                GameListEntry {
                    game: game.clone(),
                    round_count: round_ids.len(),
                    question_count,
                }
            })
            .collect();

        entries.sort_by(|a, b| b.game.created_at.cmp(&a.game.created_at));
        entries
    }

    /// Edit title/description, only while still in the lobby
    pub async fn update_game_meta(
        &self,
        game_id: &str,
        title: Option<String>,
        description: Option<String>,
    ) -> Result<(), GameError> {
        let mut games = self.games.write().await;
        let game = games.get_mut(game_id).ok_or(GameError::GameNotFound)?;
        if game.state != GameState::Lobby {
            return Err(GameError::GameAlreadyStarted);
        }
        if let Some(title) = title {
            game.title = title;
        }
        if let Some(description) = description {
            game.description = Some(description);
        }
        Ok(())
    }

    pub async fn archive_game(&self, game_id: &str) -> Result<(), GameError> {
        let mut games = self.games.write().await;
        let game = games.get_mut(game_id).ok_or(GameError::GameNotFound)?;
        game.is_archived = true;
        Ok(())
    }

    pub async fn restore_game(&self, game_id: &str) -> Result<(), GameError> {
        let mut games = self.games.write().await;
        let game = games.get_mut(game_id).ok_or(GameError::GameNotFound)?;
        game.is_archived = false;
        Ok(())
    }

    /// Flip the lobby lock; only meaningful (and only allowed) in lobby
    pub async fn toggle_lobby_lock(&self, game_id: &str) -> Result<bool, GameError> {
        let mut games = self.games.write().await;
        let game = games.get_mut(game_id).ok_or(GameError::GameNotFound)?;
        if game.state != GameState::Lobby {
            return Err(GameError::GameAlreadyStarted);
        }
        game.is_lobby_locked = !game.is_lobby_locked;
        Ok(game.is_lobby_locked)
    }

    pub async fn set_max_teams(&self, game_id: &str, max_teams: u32) -> Result<(), GameError> {
        if !(MIN_TEAMS..=MAX_TEAMS).contains(&max_teams) {
            return Err(GameError::MaxTeamsOutOfRange);
        }
        let mut games = self.games.write().await;
        let game = games.get_mut(game_id).ok_or(GameError::GameNotFound)?;
        game.max_teams = max_teams;
        Ok(())
    }

    /// Permanently delete a game and everything under it. Only allowed
    /// while the game is still in the lobby.
    pub async fn hard_delete_game(&self, game_id: &str) -> Result<(), GameError> {
        {
            let games = self.games.read().await;
            let game = games.get(game_id).ok_or(GameError::GameNotFound)?;
            if game.state != GameState::Lobby {
                return Err(GameError::GameAlreadyStarted);
            }
        }

        // Cascade top-down: rounds -> questions -> answers, then teams.
        // Sequential, best-effort; partial failure is accepted for this
        // admin-only path.
        let round_ids: Vec<RoundId> = {
            let rounds = self.rounds.read().await;
            rounds
                .values()
                .filter(|r| r.game_id == game_id)
                .map(|r| r.id.clone())
                .collect()
        };

        let question_ids: Vec<QuestionId> = {
            let questions = self.questions.read().await;
            questions
                .values()
                .filter(|q| round_ids.contains(&q.round_id))
                .map(|q| q.id.clone())
                .collect()
        };

        self.answers
            .write()
            .await
            .retain(|_, a| !question_ids.contains(&a.question_id));
        self.questions
            .write()
            .await
            .retain(|id, _| !question_ids.contains(id));
        self.rounds
            .write()
            .await
            .retain(|id, _| !round_ids.contains(id));
        self.teams.write().await.retain(|_, t| t.game_id != game_id);
        self.games.write().await.remove(game_id);

        tracing::info!("Hard-deleted game {}", game_id);
        Ok(())
    }

    /// Copy a game's metadata, rounds and questions into a fresh lobby
    /// game under a new join code. Teams and answers are not copied.
    pub async fn duplicate_game(&self, game_id: &str) -> Result<Game, GameError> {
        let source = self
            .get_game(game_id)
            .await
            .ok_or(GameError::GameNotFound)?;

        let copy = self
            .create_game(Some(format!("{} (Copy)", source.title)), source.description)
            .await;

        let source_rounds: Vec<Round> = {
            let rounds = self.rounds.read().await;
            rounds
                .values()
                .filter(|r| r.game_id == game_id)
                .cloned()
                .collect()
        };

        for round in source_rounds {
            let new_round = Round {
                id: ulid::Ulid::new().to_string(),
                game_id: copy.id.clone(),
                title: round.title.clone(),
                round_number: round.round_number,
                round_type: round.round_type,
            };

            let source_questions: Vec<Question> = {
                let questions = self.questions.read().await;
                questions
                    .values()
                    .filter(|q| q.round_id == round.id)
                    .cloned()
                    .collect()
            };

            let mut questions = self.questions.write().await;
            for question in source_questions {
                let new_question = Question {
                    id: ulid::Ulid::new().to_string(),
                    round_id: new_round.id.clone(),
                    index_in_round: question.index_in_round,
                    prompt: question.prompt.clone(),
                    points: question.points,
                    kind: question.kind.clone(),
                    finalized: false,
                };
                questions.insert(new_question.id.clone(), new_question);
            }
            drop(questions);

            self.rounds
                .write()
                .await
                .insert(new_round.id.clone(), new_round);
        }

        Ok(copy)
    }

    /// Return a game to the lobby: delete all its answers, clear finalize
    /// flags, and either zero team scores (preserve) or drop the teams.
    pub async fn reset_game(&self, game_id: &str, preserve_teams: bool) -> Result<(), GameError> {
        if self.get_game(game_id).await.is_none() {
            return Err(GameError::GameNotFound);
        }

        let round_ids: Vec<RoundId> = {
            let rounds = self.rounds.read().await;
            rounds
                .values()
                .filter(|r| r.game_id == game_id)
                .map(|r| r.id.clone())
                .collect()
        };

        let question_ids: Vec<QuestionId> = {
            let mut questions = self.questions.write().await;
            questions
                .values_mut()
                .filter(|q| round_ids.contains(&q.round_id))
                .map(|q| {
                    q.finalized = false;
                    q.id.clone()
                })
                .collect()
        };

        self.answers
            .write()
            .await
            .retain(|_, a| !question_ids.contains(&a.question_id));

        {
            let mut teams = self.teams.write().await;
            if preserve_teams {
                for team in teams.values_mut().filter(|t| t.game_id == game_id) {
                    team.total_score = 0;
                }
            } else {
                teams.retain(|_, t| t.game_id != game_id);
            }
        }

        {
            let mut games = self.games.write().await;
            if let Some(game) = games.get_mut(game_id) {
                game.state = GameState::Lobby;
                game.current_round_id = None;
                game.current_question_index = None;
            }
        }

        tracing::info!(
            "Reset game {} (preserve_teams: {})",
            game_id,
            preserve_teams
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::game_with_text_round;

    #[tokio::test]
    async fn test_list_games_hides_archived_by_default() {
        let state = AppState::new();
        let kept = state.create_game(Some("Kept".into()), None).await;
        let archived = state.create_game(Some("Archived".into()), None).await;
        state.archive_game(&archived.id).await.unwrap();

        let listed = state.list_games(false).await;
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].game.id, kept.id);

        let all = state.list_games(true).await;
        assert_eq!(all.len(), 2);
    }

    #[tokio::test]
    async fn test_update_meta_rejected_after_start() {
        let state = AppState::new();
        let (game_id, round_id, _) = game_with_text_round(&state, &["x"], 5).await;
        state.start_round(&game_id, &round_id).await;

        let result = state
            .update_game_meta(&game_id, Some("New Title".into()), None)
            .await;
        assert_eq!(result, Err(GameError::GameAlreadyStarted));
    }

    #[tokio::test]
    async fn test_set_max_teams_bounds() {
        let state = AppState::new();
        let game = state.create_game(None, None).await;

        assert_eq!(
            state.set_max_teams(&game.id, 0).await,
            Err(GameError::MaxTeamsOutOfRange)
        );
        assert_eq!(
            state.set_max_teams(&game.id, 101).await,
            Err(GameError::MaxTeamsOutOfRange)
        );
        assert!(state.set_max_teams(&game.id, 100).await.is_ok());
    }

    #[tokio::test]
    async fn test_hard_delete_only_in_lobby() {
        let state = AppState::new();
        let (game_id, round_id, _) = game_with_text_round(&state, &["x"], 5).await;
        state.start_round(&game_id, &round_id).await;

        assert_eq!(
            state.hard_delete_game(&game_id).await,
            Err(GameError::GameAlreadyStarted)
        );
    }

    #[tokio::test]
    async fn test_hard_delete_cascades() {
        let state = AppState::new();
        let (game_id, _, question_ids) = game_with_text_round(&state, &["x", "y"], 5).await;
        let team_id = state.join_team(&game_id, "Alpha".into()).await.unwrap();
        state
            .submit_answer(&question_ids[0], &team_id, Some("x".into()), None)
            .await
            .unwrap();

        state.hard_delete_game(&game_id).await.unwrap();

        assert!(state.games.read().await.is_empty());
        assert!(state.rounds.read().await.is_empty());
        assert!(state.questions.read().await.is_empty());
        assert!(state.answers.read().await.is_empty());
        assert!(state.teams.read().await.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_game_copies_structure_not_teams() {
        let state = AppState::new();
        let (game_id, _, _) = game_with_text_round(&state, &["x", "y"], 5).await;
        state.join_team(&game_id, "Alpha".into()).await.unwrap();

        let copy = state.duplicate_game(&game_id).await.unwrap();
        assert_ne!(copy.id, game_id);
        assert_eq!(copy.state, GameState::Lobby);
        assert!(copy.title.ends_with("(Copy)"));

        let copied_rounds = state.get_rounds_for_game(&copy.id).await;
        assert_eq!(copied_rounds.len(), 1);
        let copied_questions = state.get_questions_for_round(&copied_rounds[0].id).await;
        assert_eq!(copied_questions.len(), 2);
        assert!(state.get_teams_for_game(&copy.id).await.is_empty());
    }

    #[tokio::test]
    async fn test_reset_game_preserving_teams() {
        let state = AppState::new();
        let (game_id, round_id, question_ids) = game_with_text_round(&state, &["fast"], 10).await;
        let team_id = state.join_team(&game_id, "Alpha".into()).await.unwrap();

        state.start_round(&game_id, &round_id).await;
        state
            .submit_answer(&question_ids[0], &team_id, Some("fast".into()), None)
            .await
            .unwrap();
        state.auto_grade_question(&question_ids[0]).await.unwrap();
        state.close_submissions(&game_id).await;
        state.finalize_and_advance(&game_id).await;

        let team = state.teams.read().await.get(&team_id).cloned().unwrap();
        assert_eq!(team.total_score, 10);

        state.reset_game(&game_id, true).await.unwrap();

        let game = state.get_game(&game_id).await.unwrap();
        assert_eq!(game.state, GameState::Lobby);
        assert!(game.current_round_id.is_none());
        assert!(state.answers.read().await.is_empty());
        let team = state.teams.read().await.get(&team_id).cloned().unwrap();
        assert_eq!(team.total_score, 0);
        // Finalize flags cleared so the game can be replayed
        let question = state
            .questions
            .read()
            .await
            .get(&question_ids[0])
            .cloned()
            .unwrap();
        assert!(!question.finalized);
    }

    #[tokio::test]
    async fn test_reset_game_dropping_teams() {
        let state = AppState::new();
        let (game_id, _, _) = game_with_text_round(&state, &["x"], 5).await;
        state.join_team(&game_id, "Alpha".into()).await.unwrap();
        state.join_team(&game_id, "Beta".into()).await.unwrap();

        state.reset_game(&game_id, false).await.unwrap();
        assert!(state.get_teams_for_game(&game_id).await.is_empty());
    }
}
