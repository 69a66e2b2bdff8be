use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Opaque ID types for type safety
pub type GameId = String;
pub type RoundId = String;
pub type QuestionId = String;
pub type AnswerId = String;
pub type TeamId = String;

/// Join code character set (excludes ambiguous I, O, 0, 1)
pub const JOIN_CODE_CHARS: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const JOIN_CODE_LENGTH: usize = 6;

pub const MIN_TEAMS: u32 = 1;
pub const MAX_TEAMS: u32 = 100;
pub const DEFAULT_MAX_TEAMS: u32 = 20;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GameState {
    Lobby,
    InRound,
    Grading,
    BetweenRounds,
    Finished,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RoundType {
    Standard,
    Listening,
    Media,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum MediaType {
    Image,
    Video,
    Audio,
    Youtube,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    pub join_code: String,
    pub title: String,
    pub description: Option<String>,
    pub state: GameState,
    pub current_round_id: Option<RoundId>,
    pub current_question_index: Option<usize>,
    pub is_archived: bool,
    pub is_lobby_locked: bool,
    pub max_teams: u32,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Round {
    pub id: RoundId,
    pub game_id: GameId,
    pub title: String,
    /// 1-based play order, contiguous within a game
    pub round_number: u32,
    #[serde(rename = "type")]
    pub round_type: RoundType,
}

/// One field of a compound answer ("name the composer AND the piece")
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerField {
    pub id: String,
    pub label: String,
    pub correct_answer: String,
    #[serde(default)]
    pub accepted_answers: Vec<String>,
}

/// Question shape, one constructor per grading strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum QuestionKind {
    Text {
        correct_answer: String,
        #[serde(default)]
        accepted_answers: Vec<String>,
    },
    MultipleChoice {
        options: Vec<String>,
        correct_answer: String,
    },
    Numeric {
        correct_answer: String,
    },
    Media {
        correct_answer: String,
        #[serde(default)]
        accepted_answers: Vec<String>,
        media_url: Option<String>,
        media_type: Option<MediaType>,
    },
    MultiField {
        fields: Vec<AnswerField>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,
    pub round_id: RoundId,
    /// 0-based order within the round, contiguous
    pub index_in_round: usize,
    pub prompt: String,
    pub points: u32,
    #[serde(flatten)]
    pub kind: QuestionKind,
    /// Set once by the finalizer; guards against double commits
    pub finalized: bool,
}

/// One row per (question, team), enforced by upsert-on-submit
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Answer {
    pub id: AnswerId,
    pub question_id: QuestionId,
    pub team_id: TeamId,
    pub raw_answer: String,
    pub normalized_answer: String,
    pub answers: Option<HashMap<String, String>>,
    pub normalized_answers: Option<HashMap<String, String>>,
    pub auto_score: Option<i64>,
    pub needs_review: bool,
    pub final_score: Option<i64>,
    pub submitted_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Team {
    pub id: TeamId,
    pub game_id: GameId,
    pub name: String,
    /// Only ever mutated by the finalizer's additive commit or reset
    pub total_score: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Team,
    Spectator,
}

/// Expected, recoverable reasons a transition can be refused
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransitionReason {
    NoGame,
    NoRound,
    NoRounds,
    WrongState,
    EndOfRound,
    EndOfGame,
    NotBetweenRounds,
    NoMoreRounds,
}

/// Tagged outcome of a state machine transition. Callers branch on this;
/// a blocked transition leaves the game untouched.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TransitionResult {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<TransitionReason>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_state: Option<GameState>,
}

impl TransitionResult {
    pub fn ok(next_state: GameState) -> Self {
        Self {
            success: true,
            reason: None,
            next_state: Some(next_state),
        }
    }

    pub fn blocked(reason: TransitionReason) -> Self {
        Self {
            success: false,
            reason: Some(reason),
            next_state: None,
        }
    }
}

// ========== Read models ==========

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StandingsEntry {
    /// 1-based dense rank (ties get sequential ranks in sort order)
    pub rank: u32,
    pub team_id: TeamId,
    pub team_name: String,
    pub total_score: i64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RoundSummaryEntry {
    pub team_id: TeamId,
    pub team_name: String,
    /// Sum of finalScore (or autoScore fallback) over the round's questions
    pub round_score: i64,
    pub total_score: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoundSummary {
    pub round_id: RoundId,
    pub round_number: u32,
    pub round_title: String,
    pub entries: Vec<RoundSummaryEntry>,
    /// Highest round score, first encountered on ties
    pub top_team_id: Option<TeamId>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CurrentQuestionView {
    #[serde(flatten)]
    pub question: Question,
    pub round_title: String,
    pub round_number: u32,
    /// 1-based position shown to players
    pub question_number: usize,
    pub total_questions: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct TeamSubmissionStatus {
    pub team_id: TeamId,
    pub team_name: String,
    pub has_submitted: bool,
}

#[derive(Debug, Clone, Serialize, Default)]
pub struct GameSubmissionStatus {
    pub teams: Vec<TeamSubmissionStatus>,
    pub submitted_count: usize,
    pub total_teams: usize,
}

/// Answer annotated with its team's name (host grading view)
#[derive(Debug, Clone, Serialize)]
pub struct AnswerWithTeam {
    #[serde(flatten)]
    pub answer: Answer,
    pub team_name: String,
}

/// Answer annotated with its question's prompt and points (team history)
#[derive(Debug, Clone, Serialize)]
pub struct TeamHistoryEntry {
    #[serde(flatten)]
    pub answer: Answer,
    pub prompt: String,
    pub points: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameListEntry {
    #[serde(flatten)]
    pub game: Game,
    pub round_count: usize,
    pub question_count: usize,
}
