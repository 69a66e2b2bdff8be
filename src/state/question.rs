use super::AppState;
use crate::error::GameError;
use crate::types::*;

impl AppState {
    /// Append a question to a round (0-based indices stay contiguous)
    pub async fn create_question(
        &self,
        round_id: &str,
        prompt: String,
        points: u32,
        kind: QuestionKind,
    ) -> Result<Question, GameError> {
        let game_id = self.game_id_of_round(round_id).await?;
        self.require_lobby(&game_id).await?;

        let mut questions = self.questions.write().await;
        let next_index = questions
            .values()
            .filter(|q| q.round_id == round_id)
            .map(|q| q.index_in_round + 1)
            .max()
            .unwrap_or(0);

        let question = Question {
            id: ulid::Ulid::new().to_string(),
            round_id: round_id.to_string(),
            index_in_round: next_index,
            prompt,
            points,
            kind,
            finalized: false,
        };
        questions.insert(question.id.clone(), question.clone());
        Ok(question)
    }

    /// Questions of a round in play order
    pub async fn get_questions_for_round(&self, round_id: &str) -> Vec<Question> {
        let mut questions: Vec<Question> = self
            .questions
            .read()
            .await
            .values()
            .filter(|q| q.round_id == round_id)
            .cloned()
            .collect();
        questions.sort_by_key(|q| q.index_in_round);
        questions
    }

    pub async fn get_question(&self, question_id: &str) -> Option<Question> {
        self.questions.read().await.get(question_id).cloned()
    }

    /// The question the game's (round, index) pointer currently selects,
    /// annotated for display
    pub async fn get_current_question(&self, game_id: &str) -> Option<CurrentQuestionView> {
        let game = self.get_game(game_id).await?;
        let round_id = game.current_round_id?;
        let index = game.current_question_index?;

        let round = self.rounds.read().await.get(&round_id).cloned()?;
        let questions = self.get_questions_for_round(&round_id).await;
        let total_questions = questions.len();
        let question = questions.into_iter().find(|q| q.index_in_round == index)?;

        Some(CurrentQuestionView {
            question,
            round_title: round.title,
            round_number: round.round_number,
            question_number: index + 1,
            total_questions,
        })
    }

    pub async fn update_question(
        &self,
        question_id: &str,
        prompt: Option<String>,
        points: Option<u32>,
        kind: Option<QuestionKind>,
    ) -> Result<(), GameError> {
        let round_id = self.round_id_of_question(question_id).await?;
        let game_id = self.game_id_of_round(&round_id).await?;
        self.require_lobby(&game_id).await?;

        let mut questions = self.questions.write().await;
        let question = questions
            .get_mut(question_id)
            .ok_or(GameError::QuestionNotFound)?;
        if let Some(prompt) = prompt {
            question.prompt = prompt;
        }
        if let Some(points) = points {
            question.points = points;
        }
        if let Some(kind) = kind {
            question.kind = kind;
        }
        Ok(())
    }

    /// Delete a question, cascading its answers and re-indexing the
    /// round's survivors to 0..N-1
    pub async fn delete_question(&self, question_id: &str) -> Result<(), GameError> {
        let round_id = self.round_id_of_question(question_id).await?;
        let game_id = self.game_id_of_round(&round_id).await?;
        self.require_lobby(&game_id).await?;

        self.answers
            .write()
            .await
            .retain(|_, a| a.question_id != question_id);

        let mut questions = self.questions.write().await;
        questions
            .remove(question_id)
            .ok_or(GameError::QuestionNotFound)?;

        let mut remaining: Vec<&mut Question> = questions
            .values_mut()
            .filter(|q| q.round_id == round_id)
            .collect();
        remaining.sort_by_key(|q| q.index_in_round);
        for (i, question) in remaining.into_iter().enumerate() {
            question.index_in_round = i;
        }

        Ok(())
    }

    /// Reorder a round's questions to the given id sequence
    pub async fn reorder_questions(
        &self,
        round_id: &str,
        question_ids: &[QuestionId],
    ) -> Result<(), GameError> {
        let game_id = self.game_id_of_round(round_id).await?;
        self.require_lobby(&game_id).await?;

        let mut questions = self.questions.write().await;
        for (i, question_id) in question_ids.iter().enumerate() {
            let question = questions
                .get_mut(question_id)
                .ok_or(GameError::QuestionNotFound)?;
            if question.round_id != round_id {
                return Err(GameError::QuestionNotFound);
            }
            question.index_in_round = i;
        }
        Ok(())
    }

    /// Copy a question to the end of its round
    pub async fn duplicate_question(&self, question_id: &str) -> Result<Question, GameError> {
        let source = self
            .get_question(question_id)
            .await
            .ok_or(GameError::QuestionNotFound)?;
        let game_id = self.game_id_of_round(&source.round_id).await?;
        self.require_lobby(&game_id).await?;

        let mut questions = self.questions.write().await;
        let next_index = questions
            .values()
            .filter(|q| q.round_id == source.round_id)
            .map(|q| q.index_in_round + 1)
            .max()
            .unwrap_or(0);

        let copy = Question {
            id: ulid::Ulid::new().to_string(),
            round_id: source.round_id.clone(),
            index_in_round: next_index,
            prompt: format!("{} (Copy)", source.prompt),
            points: source.points,
            kind: source.kind.clone(),
            finalized: false,
        };
        questions.insert(copy.id.clone(), copy.clone());
        Ok(copy)
    }

    pub(super) async fn round_id_of_question(
        &self,
        question_id: &str,
    ) -> Result<RoundId, GameError> {
        self.questions
            .read()
            .await
            .get(question_id)
            .map(|q| q.round_id.clone())
            .ok_or(GameError::QuestionNotFound)
    }
}
