use super::AppState;
use crate::error::GameError;
use crate::grading::normalize;
use crate::types::*;
use std::collections::HashMap;

impl AppState {
    /// Submit (or re-submit) a team's answer to a question. Upsert by
    /// (question, team): the second submission overwrites the first, there
    /// is never more than one row per pair. The lookup and the write
    /// happen under one write lock.
    pub async fn submit_answer(
        &self,
        question_id: &str,
        team_id: &str,
        raw_answer: Option<String>,
        answers: Option<HashMap<String, String>>,
    ) -> Result<AnswerId, GameError> {
        let question = self
            .get_question(question_id)
            .await
            .ok_or(GameError::QuestionNotFound)?;
        if question.finalized {
            return Err(GameError::AlreadyFinalized);
        }
        if self.get_team(team_id).await.is_none() {
            return Err(GameError::TeamNotFound);
        }
        let raw_answer = match (raw_answer, answers.as_ref()) {
            (Some(raw), _) => raw,
            (None, Some(map)) => serde_json::to_string(map).unwrap_or_default(),
            (None, None) => return Err(GameError::EmptySubmission),
        };
        let normalized_answer = normalize(&raw_answer);
        let normalized_answers = answers.as_ref().map(|map| {
            map.iter()
                .map(|(k, v)| (k.clone(), normalize(v)))
                .collect()
        });
        let submitted_at = chrono::Utc::now().to_rfc3339();

        let answer_id = {
            let mut all = self.answers.write().await;
            let existing = all
                .values_mut()
                .find(|a| a.question_id == question_id && a.team_id == team_id);

            match existing {
                Some(answer) => {
                    answer.raw_answer = raw_answer;
                    answer.normalized_answer = normalized_answer;
                    answer.answers = answers;
                    answer.normalized_answers = normalized_answers;
                    answer.submitted_at = submitted_at;
                    answer.id.clone()
                }
                None => {
                    let answer = Answer {
                        id: ulid::Ulid::new().to_string(),
                        question_id: question_id.to_string(),
                        team_id: team_id.to_string(),
                        raw_answer,
                        normalized_answer,
                        answers,
                        normalized_answers,
                        auto_score: None,
                        needs_review: true,
                        final_score: None,
                        submitted_at,
                    };
                    let id = answer.id.clone();
                    all.insert(answer.id.clone(), answer);
                    id
                }
            }
        };

        tracing::debug!("Answer {} stored for team {}", answer_id, team_id);
        self.broadcast_submission_status(question_id).await;
        Ok(answer_id)
    }

    pub async fn get_answer(&self, answer_id: &str) -> Option<Answer> {
        self.answers.read().await.get(answer_id).cloned()
    }

    /// A team's submissions so far, annotated with each question's prompt
    /// and points, oldest first
    pub async fn get_team_history(&self, team_id: &str) -> Vec<TeamHistoryEntry> {
        let answers = self.answers.read().await;
        let questions = self.questions.read().await;

        let mut entries: Vec<TeamHistoryEntry> = answers
            .values()
            .filter(|a| a.team_id == team_id)
            .filter_map(|a| {
                questions.get(&a.question_id).map(|q| TeamHistoryEntry {
                    answer: a.clone(),
                    prompt: q.prompt.clone(),
                    points: q.points,
                })
            })
            .collect();
        entries.sort_by(|a, b| a.answer.submitted_at.cmp(&b.answer.submitted_at));
        entries
    }

    /// All answers to a question, annotated with team names (host view)
    pub async fn get_answers_for_question(&self, question_id: &str) -> Vec<AnswerWithTeam> {
        let answers = self.answers.read().await;
        let teams = self.teams.read().await;

        answers
            .values()
            .filter(|a| a.question_id == question_id)
            .map(|a| AnswerWithTeam {
                answer: a.clone(),
                team_name: teams
                    .get(&a.team_id)
                    .map(|t| t.name.clone())
                    .unwrap_or_else(|| "Unknown Team".to_string()),
            })
            .collect()
    }

    /// Which teams have submitted the game's current question
    pub async fn submission_status_for_game(&self, game_id: &str) -> GameSubmissionStatus {
        let current = match self.get_current_question(game_id).await {
            Some(view) => view.question,
            None => return GameSubmissionStatus::default(),
        };

        let teams = self.get_teams_for_game(game_id).await;
        let answers = self.answers.read().await;
        let submitted: std::collections::HashSet<&TeamId> = answers
            .values()
            .filter(|a| a.question_id == current.id)
            .map(|a| &a.team_id)
            .collect();

        let statuses: Vec<TeamSubmissionStatus> = teams
            .iter()
            .map(|t| TeamSubmissionStatus {
                team_id: t.id.clone(),
                team_name: t.name.clone(),
                has_submitted: submitted.contains(&t.id),
            })
            .collect();

        GameSubmissionStatus {
            submitted_count: submitted.len(),
            total_teams: teams.len(),
            teams: statuses,
        }
    }

    /// Push the submission tally for the question's game to all clients
    async fn broadcast_submission_status(&self, question_id: &str) {
        let game_id = match self.round_id_of_question(question_id).await {
            Ok(round_id) => match self.game_id_of_round(&round_id).await {
                Ok(game_id) => game_id,
                Err(_) => return,
            },
            Err(_) => return,
        };

        let status = self.submission_status_for_game(&game_id).await;
        self.broadcast_to_all(crate::protocol::ServerMessage::SubmissionStatus {
            game_id,
            status,
        });
    }
}
