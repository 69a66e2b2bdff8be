//! Auto-grading, host overrides and the finalize commit.
//!
//! Scores live in two places with a strict flow between them: per-answer
//! `auto_score`/`final_score` stay mutable while a question is open, and
//! `finalize_question` commits them additively into team totals exactly
//! once. Nothing else writes `total_score`.

use super::AppState;
use crate::error::GameError;
use crate::grading::{grade_text_field_with_accepted, normalize_for_comparison, Grade};
use crate::types::*;

impl AppState {
    /// Grade every submitted answer to a question by its type's strategy.
    /// Idempotent: reruns recompute from the stored submissions and never
    /// touch team totals. Answers flagged for review get no final score
    /// until the host confirms or overrides.
    pub async fn auto_grade_question(&self, question_id: &str) -> Result<usize, GameError> {
        let question = self
            .get_question(question_id)
            .await
            .ok_or(GameError::QuestionNotFound)?;
        if question.finalized {
            return Err(GameError::AlreadyFinalized);
        }

        let mut answers = self.answers.write().await;
        let mut graded = 0;
        for answer in answers.values_mut().filter(|a| a.question_id == question_id) {
            let (auto_score, needs_review) = grade_answer(&question, answer);
            answer.auto_score = auto_score;
            answer.needs_review = needs_review;
            answer.final_score = if needs_review { None } else { auto_score };
            graded += 1;
        }
        drop(answers);

        tracing::debug!("Auto-graded {} answers for question {}", graded, question_id);
        Ok(graded)
    }

    /// Host override for one answer. Clears the review flag; the score
    /// sticks through finalize.
    pub async fn set_final_score(&self, answer_id: &str, score: i64) -> Result<(), GameError> {
        let question_id = {
            let answers = self.answers.read().await;
            answers
                .get(answer_id)
                .map(|a| a.question_id.clone())
                .ok_or(GameError::AnswerNotFound)?
        };
        let question = self
            .get_question(&question_id)
            .await
            .ok_or(GameError::QuestionNotFound)?;
        if question.finalized {
            return Err(GameError::AlreadyFinalized);
        }

        let mut answers = self.answers.write().await;
        let answer = answers.get_mut(answer_id).ok_or(GameError::AnswerNotFound)?;
        answer.final_score = Some(score);
        answer.needs_review = false;
        Ok(())
    }

    /// Commit a question's scores into team totals. Each answer's effective
    /// score is `final_score`, falling back to `auto_score`, falling back
    /// to zero; unset final scores are persisted and review flags cleared.
    /// The `finalized` flag is checked and set under the questions write
    /// lock, so the additive commit happens at most once per question.
    pub async fn finalize_question(&self, question_id: &str) -> Result<usize, GameError> {
        {
            let mut questions = self.questions.write().await;
            let question = questions
                .get_mut(question_id)
                .ok_or(GameError::QuestionNotFound)?;
            if question.finalized {
                return Err(GameError::AlreadyFinalized);
            }
            question.finalized = true;
        }

        let committed: Vec<(TeamId, i64)> = {
            let mut answers = self.answers.write().await;
            answers
                .values_mut()
                .filter(|a| a.question_id == question_id)
                .map(|a| {
                    let effective = a.final_score.or(a.auto_score).unwrap_or(0);
                    a.final_score = Some(effective);
                    a.needs_review = false;
                    (a.team_id.clone(), effective)
                })
                .collect()
        };

        let count = committed.len();
        let mut teams = self.teams.write().await;
        for (team_id, score) in committed {
            if let Some(team) = teams.get_mut(&team_id) {
                team.total_score += score;
            }
        }

        Ok(count)
    }

    /// Current leaderboard: total score descending, name ascending on ties,
    /// 1-based sequential ranks.
    pub async fn get_standings(&self, game_id: &str) -> Vec<StandingsEntry> {
        let mut teams = self.get_teams_for_game(game_id).await;
        teams.sort_by(|a, b| {
            b.total_score
                .cmp(&a.total_score)
                .then_with(|| a.name.cmp(&b.name))
        });

        teams
            .into_iter()
            .enumerate()
            .map(|(i, team)| StandingsEntry {
                rank: (i + 1) as u32,
                team_id: team.id,
                team_name: team.name,
                total_score: team.total_score,
            })
            .collect()
    }

    /// Per-team recap of the game's current round: each team's score over
    /// the round's questions next to its running total.
    pub async fn get_completed_round_summary(&self, game_id: &str) -> Option<RoundSummary> {
        let game = self.get_game(game_id).await?;
        let round_id = game.current_round_id?;
        let round = self.rounds.read().await.get(&round_id).cloned()?;

        let question_ids: Vec<QuestionId> = self
            .get_questions_for_round(&round_id)
            .await
            .into_iter()
            .map(|q| q.id)
            .collect();

        let mut round_scores: std::collections::HashMap<TeamId, i64> =
            std::collections::HashMap::new();
        {
            let answers = self.answers.read().await;
            for answer in answers
                .values()
                .filter(|a| question_ids.contains(&a.question_id))
            {
                let effective = answer.final_score.or(answer.auto_score).unwrap_or(0);
                *round_scores.entry(answer.team_id.clone()).or_insert(0) += effective;
            }
        }

        let mut entries: Vec<RoundSummaryEntry> = self
            .get_teams_for_game(game_id)
            .await
            .into_iter()
            .map(|team| RoundSummaryEntry {
                round_score: round_scores.get(&team.id).copied().unwrap_or(0),
                team_id: team.id,
                team_name: team.name,
                total_score: team.total_score,
            })
            .collect();
        entries.sort_by(|a, b| {
            b.round_score
                .cmp(&a.round_score)
                .then_with(|| a.team_name.cmp(&b.team_name))
        });

        let top_team_id = entries.first().map(|e| e.team_id.clone());
        Some(RoundSummary {
            round_id,
            round_number: round.round_number,
            round_title: round.title,
            entries,
            top_team_id,
        })
    }

    /// Answers the auto-grader could not settle, for the host review queue
    pub async fn get_needs_review(&self, question_id: &str) -> Vec<AnswerWithTeam> {
        self.get_answers_for_question(question_id)
            .await
            .into_iter()
            .filter(|a| a.answer.needs_review)
            .collect()
    }
}

/// One answer's (auto_score, needs_review) under its question's strategy
fn grade_answer(question: &Question, answer: &Answer) -> (Option<i64>, bool) {
    let points = question.points as f64;

    match &question.kind {
        QuestionKind::Text {
            correct_answer,
            accepted_answers,
        } => {
            let grade = grade_text_field_with_accepted(
                &answer.raw_answer,
                correct_answer,
                accepted_answers,
                points,
            );
            (Some(grade.score.round() as i64), grade.needs_review)
        }

        QuestionKind::Media {
            correct_answer,
            accepted_answers,
            ..
        } => {
            let grade = grade_text_field_with_accepted(
                &answer.raw_answer,
                correct_answer,
                accepted_answers,
                points,
            );
            (Some(grade.score.round() as i64), grade.needs_review)
        }

        // Options are fixed strings, so equality (modulo a leading
        // article) is decisive; never flagged
        QuestionKind::MultipleChoice { correct_answer, .. } => {
            let correct = normalize_for_comparison(&answer.raw_answer)
                == normalize_for_comparison(correct_answer);
            (Some(if correct { points as i64 } else { 0 }), false)
        }

        QuestionKind::Numeric { correct_answer } => {
            let submitted: Result<f64, _> = answer.raw_answer.trim().parse();
            let expected: Result<f64, _> = correct_answer.trim().parse();
            match (submitted, expected) {
                (Ok(s), Ok(e)) => (Some(if s == e { points as i64 } else { 0 }), false),
                // Not a number; scored zero until the host eyeballs it
                _ => (Some(0), true),
            }
        }

        QuestionKind::MultiField { fields } => {
            let submitted = match &answer.answers {
                Some(map) => map,
                None => return (None, true),
            };
            let per_field = points / fields.len().max(1) as f64;

            let mut total = 0.0;
            let mut needs_review = false;
            for field in fields {
                let value = submitted.get(&field.id).map(String::as_str).unwrap_or("");
                let grade: Grade = grade_text_field_with_accepted(
                    value,
                    &field.correct_answer,
                    &field.accepted_answers,
                    per_field,
                );
                total += grade.score;
                needs_review |= grade.needs_review;
            }
            (Some(total.round() as i64), needs_review)
        }
    }
}
