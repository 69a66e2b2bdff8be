//! Integrity errors: hard failures that abort a mutation outright.
//!
//! Expected gameplay outcomes (end of round, not between rounds, ...) are
//! NOT errors; those are `TransitionResult` values in `types`.

use thiserror::Error;

use crate::types::{MAX_TEAMS, MIN_TEAMS};

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GameError {
    #[error("Game not found")]
    GameNotFound,
    #[error("Round not found")]
    RoundNotFound,
    #[error("Question not found")]
    QuestionNotFound,
    #[error("Answer not found")]
    AnswerNotFound,
    #[error("Team not found")]
    TeamNotFound,
    #[error("Game has already started")]
    GameAlreadyStarted,
    #[error("Lobby is locked")]
    LobbyLocked,
    #[error("Game is full")]
    LobbyFull,
    #[error("Team name already taken")]
    NameTaken,
    #[error("Max teams must be between {MIN_TEAMS} and {MAX_TEAMS}")]
    MaxTeamsOutOfRange,
    #[error("Question has already been finalized")]
    AlreadyFinalized,
    #[error("Answer must contain text or field values")]
    EmptySubmission,
}

impl GameError {
    /// Stable wire code, used in `ServerMessage::Error`
    pub fn code(&self) -> &'static str {
        match self {
            GameError::GameNotFound => "GAME_NOT_FOUND",
            GameError::RoundNotFound => "ROUND_NOT_FOUND",
            GameError::QuestionNotFound => "QUESTION_NOT_FOUND",
            GameError::AnswerNotFound => "ANSWER_NOT_FOUND",
            GameError::TeamNotFound => "TEAM_NOT_FOUND",
            GameError::GameAlreadyStarted => "GAME_STARTED",
            GameError::LobbyLocked => "LOBBY_LOCKED",
            GameError::LobbyFull => "LOBBY_FULL",
            GameError::NameTaken => "NAME_TAKEN",
            GameError::MaxTeamsOutOfRange => "MAX_TEAMS_OUT_OF_RANGE",
            GameError::AlreadyFinalized => "ALREADY_FINALIZED",
            GameError::EmptySubmission => "EMPTY_SUBMISSION",
        }
    }
}
