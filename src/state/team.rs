use super::AppState;
use crate::error::GameError;
use crate::types::*;

impl AppState {
    /// Join a team into a game's lobby. Each gate fails with its own
    /// error so the player sees why: started, locked, full, name taken.
    /// The count and uniqueness checks run under the teams write lock.
    pub async fn join_team(&self, game_id: &str, name: String) -> Result<TeamId, GameError> {
        let game = {
            let games = self.games.read().await;
            games.get(game_id).cloned().ok_or(GameError::GameNotFound)?
        };

        if game.state != GameState::Lobby {
            return Err(GameError::GameAlreadyStarted);
        }
        if game.is_lobby_locked {
            return Err(GameError::LobbyLocked);
        }

        let name = name.trim().to_string();
        let mut teams = self.teams.write().await;

        let team_count = teams.values().filter(|t| t.game_id == game_id).count();
        if team_count >= game.max_teams as usize {
            return Err(GameError::LobbyFull);
        }

        let name_lower = name.to_lowercase();
        if teams
            .values()
            .any(|t| t.game_id == game_id && t.name.to_lowercase() == name_lower)
        {
            return Err(GameError::NameTaken);
        }

        let team = Team {
            id: ulid::Ulid::new().to_string(),
            game_id: game_id.to_string(),
            name,
            total_score: 0,
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let team_id = team.id.clone();
        teams.insert(team.id.clone(), team.clone());
        drop(teams);

        tracing::info!("Team '{}' joined game {}", team.name, game_id);
        self.broadcast_to_all(crate::protocol::ServerMessage::TeamJoined {
            team_id: team_id.clone(),
            team_name: team.name,
        });
        Ok(team_id)
    }

    pub async fn get_team(&self, team_id: &str) -> Option<Team> {
        self.teams.read().await.get(team_id).cloned()
    }

    /// Teams of a game, highest score first
    pub async fn get_teams_for_game(&self, game_id: &str) -> Vec<Team> {
        let mut teams: Vec<Team> = self
            .teams
            .read()
            .await
            .values()
            .filter(|t| t.game_id == game_id)
            .cloned()
            .collect();
        teams.sort_by(|a, b| b.total_score.cmp(&a.total_score));
        teams
    }

    /// Remove a team (lobby only), cascading its answers
    pub async fn remove_team(&self, team_id: &str) -> Result<(), GameError> {
        let game_id = {
            let teams = self.teams.read().await;
            teams
                .get(team_id)
                .map(|t| t.game_id.clone())
                .ok_or(GameError::TeamNotFound)?
        };
        self.require_lobby(&game_id).await?;

        self.answers
            .write()
            .await
            .retain(|_, a| a.team_id != team_id);
        self.teams.write().await.remove(team_id);
        Ok(())
    }
}
