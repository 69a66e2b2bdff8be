mod answer;
mod game;
mod machine;
mod question;
mod round;
mod scoring;
mod team;

use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, RwLock};

/// Shared application state: one RwLock'd collection per entity.
///
/// Every read-check-then-write sequence (join code uniqueness, team name
/// uniqueness, answer upsert, finalize flag) holds the relevant write lock
/// for the whole read-modify-write, which is what makes those checks safe
/// under concurrent submissions.
#[derive(Clone)]
pub struct AppState {
    pub games: Arc<RwLock<HashMap<GameId, Game>>>,
    pub rounds: Arc<RwLock<HashMap<RoundId, Round>>>,
    pub questions: Arc<RwLock<HashMap<QuestionId, Question>>>,
    pub answers: Arc<RwLock<HashMap<AnswerId, Answer>>>,
    pub teams: Arc<RwLock<HashMap<TeamId, Team>>>,
    /// Broadcast channel reaching every connected client
    pub broadcast: broadcast::Sender<ServerMessage>,
    /// Host-only channel (grading views, raw answers)
    pub host_broadcast: broadcast::Sender<ServerMessage>,
}

impl AppState {
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(100);
        let (host_tx, _host_rx) = broadcast::channel(100);
        Self {
            games: Arc::new(RwLock::new(HashMap::new())),
            rounds: Arc::new(RwLock::new(HashMap::new())),
            questions: Arc::new(RwLock::new(HashMap::new())),
            answers: Arc::new(RwLock::new(HashMap::new())),
            teams: Arc::new(RwLock::new(HashMap::new())),
            broadcast: tx,
            host_broadcast: host_tx,
        }
    }

    /// Send to all connected clients. Send errors mean no receivers, which
    /// is fine.
    pub fn broadcast_to_all(&self, msg: ServerMessage) {
        let _ = self.broadcast.send(msg);
    }

    pub fn broadcast_to_host(&self, msg: ServerMessage) {
        let _ = self.host_broadcast.send(msg);
    }

    /// Broadcast the game's current state pointer to everyone watching it
    pub async fn broadcast_game_state(&self, game_id: &str) {
        let game = match self.games.read().await.get(game_id).cloned() {
            Some(g) => g,
            None => return,
        };
        let current_question = self.get_current_question(game_id).await;

        self.broadcast_to_all(ServerMessage::GameState {
            game_id: game.id.clone(),
            state: game.state,
            current_round_id: game.current_round_id.clone(),
            current_question_index: game.current_question_index,
            current_question: current_question.map(Box::new),
            server_now: chrono::Utc::now().to_rfc3339(),
        });
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
