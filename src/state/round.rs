use super::AppState;
use crate::error::GameError;
use crate::types::*;

impl AppState {
    /// Append a round to a game. Round numbers stay a contiguous 1..N
    /// sequence, so the new round gets N+1.
    pub async fn create_round(
        &self,
        game_id: &str,
        title: String,
        round_type: RoundType,
    ) -> Result<Round, GameError> {
        self.require_lobby(game_id).await?;

        let mut rounds = self.rounds.write().await;
        let next_number = rounds
            .values()
            .filter(|r| r.game_id == game_id)
            .map(|r| r.round_number)
            .max()
            .unwrap_or(0)
            + 1;

        let round = Round {
            id: ulid::Ulid::new().to_string(),
            game_id: game_id.to_string(),
            title,
            round_number: next_number,
            round_type,
        };
        rounds.insert(round.id.clone(), round.clone());
        Ok(round)
    }

    /// Rounds of a game in play order
    pub async fn get_rounds_for_game(&self, game_id: &str) -> Vec<Round> {
        let mut rounds: Vec<Round> = self
            .rounds
            .read()
            .await
            .values()
            .filter(|r| r.game_id == game_id)
            .cloned()
            .collect();
        rounds.sort_by_key(|r| r.round_number);
        rounds
    }

    pub async fn update_round(
        &self,
        round_id: &str,
        title: Option<String>,
        round_type: Option<RoundType>,
    ) -> Result<(), GameError> {
        let game_id = self.game_id_of_round(round_id).await?;
        self.require_lobby(&game_id).await?;

        let mut rounds = self.rounds.write().await;
        let round = rounds.get_mut(round_id).ok_or(GameError::RoundNotFound)?;
        if let Some(title) = title {
            round.title = title;
        }
        if let Some(round_type) = round_type {
            round.round_type = round_type;
        }
        Ok(())
    }

    /// Delete a round, cascading its questions and their answers, then
    /// close the gap in the remaining round numbers.
    pub async fn delete_round(&self, round_id: &str) -> Result<(), GameError> {
        let game_id = self.game_id_of_round(round_id).await?;
        self.require_lobby(&game_id).await?;

        let question_ids: Vec<QuestionId> = {
            let questions = self.questions.read().await;
            questions
                .values()
                .filter(|q| q.round_id == round_id)
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

        let mut rounds = self.rounds.write().await;
        rounds.remove(round_id).ok_or(GameError::RoundNotFound)?;

        // Re-index survivors to 1..N
        let mut remaining: Vec<&mut Round> = rounds
            .values_mut()
            .filter(|r| r.game_id == game_id)
            .collect();
        remaining.sort_by_key(|r| r.round_number);
        for (i, round) in remaining.into_iter().enumerate() {
            round.round_number = (i + 1) as u32;
        }

        Ok(())
    }

    /// Reorder a game's rounds to the given id sequence (1-based numbers
    /// assigned in order)
    pub async fn reorder_rounds(
        &self,
        game_id: &str,
        round_ids: &[RoundId],
    ) -> Result<(), GameError> {
        self.require_lobby(game_id).await?;

        let mut rounds = self.rounds.write().await;
        for (i, round_id) in round_ids.iter().enumerate() {
            let round = rounds.get_mut(round_id).ok_or(GameError::RoundNotFound)?;
            if round.game_id != game_id {
                return Err(GameError::RoundNotFound);
            }
            round.round_number = (i + 1) as u32;
        }
        Ok(())
    }

    /// Hard error unless the owning game is still in the lobby; authoring
    /// mutations are forbidden once play has started.
    pub(super) async fn require_lobby(&self, game_id: &str) -> Result<(), GameError> {
        let games = self.games.read().await;
        let game = games.get(game_id).ok_or(GameError::GameNotFound)?;
        if game.state != GameState::Lobby {
            return Err(GameError::GameAlreadyStarted);
        }
        Ok(())
    }

    pub(super) async fn game_id_of_round(&self, round_id: &str) -> Result<GameId, GameError> {
        self.rounds
            .read()
            .await
            .get(round_id)
            .map(|r| r.game_id.clone())
            .ok_or(GameError::RoundNotFound)
    }
}
