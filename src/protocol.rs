use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Look up a game by its join code (lobby screen)
    Join {
        join_code: String,
    },
    RegisterTeam {
        game_id: GameId,
        team_name: String,
    },
    SubmitAnswer {
        question_id: QuestionId,
        team_id: TeamId,
        raw_answer: Option<String>,
        /// Field-id to value map for multi-field questions
        answers: Option<HashMap<String, String>>,
    },
    // Read queries, any role
    GetGameState {
        game_id: GameId,
    },
    GetRounds {
        game_id: GameId,
    },
    GetQuestions {
        round_id: RoundId,
    },
    GetTeams {
        game_id: GameId,
    },
    GetStandings {
        game_id: GameId,
    },
    GetRoundSummary {
        game_id: GameId,
    },
    GetSubmissionStatus {
        game_id: GameId,
    },
    /// A team's past submissions with each question's prompt and points
    GetTeamHistory {
        team_id: TeamId,
    },
    // Host-only: game library
    HostCreateGame {
        title: Option<String>,
        description: Option<String>,
    },
    HostListGames {
        #[serde(default)]
        include_archived: bool,
    },
    HostUpdateGameMeta {
        game_id: GameId,
        title: Option<String>,
        description: Option<String>,
    },
    HostArchiveGame {
        game_id: GameId,
    },
    HostRestoreGame {
        game_id: GameId,
    },
    /// Permanently delete a lobby game and everything under it
    HostDeleteGame {
        game_id: GameId,
    },
    HostDuplicateGame {
        game_id: GameId,
    },
    HostToggleLobbyLock {
        game_id: GameId,
    },
    HostSetMaxTeams {
        game_id: GameId,
        max_teams: u32,
    },
    HostResetGame {
        game_id: GameId,
        #[serde(default)]
        preserve_teams: bool,
    },
    HostRemoveTeam {
        team_id: TeamId,
    },
    // Host-only: authoring (lobby only, rejected once play starts)
    HostCreateRound {
        game_id: GameId,
        title: String,
        round_type: RoundType,
    },
    HostUpdateRound {
        round_id: RoundId,
        title: Option<String>,
        round_type: Option<RoundType>,
    },
    HostDeleteRound {
        round_id: RoundId,
    },
    HostReorderRounds {
        game_id: GameId,
        round_ids: Vec<RoundId>,
    },
    HostCreateQuestion {
        round_id: RoundId,
        prompt: String,
        points: u32,
        #[serde(flatten)]
        kind: QuestionKind,
    },
    HostUpdateQuestion {
        question_id: QuestionId,
        prompt: Option<String>,
        points: Option<u32>,
        kind: Option<QuestionKind>,
    },
    HostDeleteQuestion {
        question_id: QuestionId,
    },
    HostReorderQuestions {
        round_id: RoundId,
        question_ids: Vec<QuestionId>,
    },
    HostDuplicateQuestion {
        question_id: QuestionId,
    },
    // Host-only: game flow
    HostStartRound {
        game_id: GameId,
        round_id: RoundId,
    },
    HostCloseSubmissions {
        game_id: GameId,
    },
    HostAdvanceQuestion {
        game_id: GameId,
    },
    HostFinalizeAndAdvance {
        game_id: GameId,
    },
    HostGoToBetweenRounds {
        game_id: GameId,
    },
    HostStartNextRound {
        game_id: GameId,
    },
    /// Skip ahead to the next round regardless of grading progress
    HostAdvanceRound {
        game_id: GameId,
    },
    HostEndGame {
        game_id: GameId,
    },
    // Host-only: grading
    HostAutoGrade {
        question_id: QuestionId,
    },
    HostGetAnswers {
        question_id: QuestionId,
    },
    HostGetNeedsReview {
        question_id: QuestionId,
    },
    HostSetFinalScore {
        answer_id: AnswerId,
        score: i64,
    },
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    Welcome {
        protocol: String,
        role: Role,
        game: Game,
        server_now: String,
    },
    /// The game's state pointer, broadcast on every transition
    GameState {
        game_id: GameId,
        state: GameState,
        current_round_id: Option<RoundId>,
        current_question_index: Option<usize>,
        current_question: Option<Box<CurrentQuestionView>>,
        server_now: String,
    },
    /// Host ack for a flow command; blocked transitions come back here,
    /// not as errors
    Transition {
        action: String,
        result: TransitionResult,
    },
    GameCreated {
        game: Game,
    },
    Games {
        list: Vec<GameListEntry>,
    },
    Rounds {
        game_id: GameId,
        list: Vec<Round>,
    },
    RoundCreated {
        round: Round,
    },
    Questions {
        round_id: RoundId,
        list: Vec<Question>,
    },
    QuestionCreated {
        question: Question,
    },
    /// Broadcast when a team enters the lobby
    TeamJoined {
        team_id: TeamId,
        team_name: String,
    },
    /// Sent to the registering client with its team credentials
    TeamRegistered {
        team: Team,
    },
    Teams {
        game_id: GameId,
        list: Vec<Team>,
    },
    /// Who has answered the current question, broadcast on every submit
    SubmissionStatus {
        game_id: GameId,
        status: GameSubmissionStatus,
    },
    /// Sent to the submitting team
    SubmissionConfirmed {
        answer_id: AnswerId,
    },
    /// A team's submissions in order, annotated with question context
    TeamHistory {
        team_id: TeamId,
        entries: Vec<TeamHistoryEntry>,
    },
    /// Host-only: all answers to a question with team names
    HostAnswers {
        question_id: QuestionId,
        list: Vec<AnswerWithTeam>,
    },
    AutoGraded {
        question_id: QuestionId,
        graded: usize,
    },
    Standings {
        entries: Vec<StandingsEntry>,
    },
    RoundSummary {
        summary: crate::types::RoundSummary,
    },
    /// Generic ack for host mutations that return nothing
    Ack {
        action: String,
    },
    Error {
        code: String,
        msg: String,
    },
}
