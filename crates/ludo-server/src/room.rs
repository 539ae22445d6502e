//! Game room management.
//!
//! A room maps connected sessions to seats. Once started it owns one
//! [`TurnCoordinator`]; all rule checks happen there, never in the room.

use ludo_core::board::PLAYER_COUNT;
use ludo_core::{BotDifficulty, PlayerId, TurnCoordinator};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::protocol::{PlayerInfo, RoomInfo, RoomStatus};

#[derive(Debug, Error)]
pub enum RoomError {
    #[error("Room not found")]
    RoomNotFound,

    #[error("Room is full")]
    RoomFull,

    #[error("Player not in room")]
    PlayerNotInRoom,

    #[error("Not the host")]
    NotHost,

    #[error("Game already started")]
    GameAlreadyStarted,

    #[error("Game not started")]
    GameNotStarted,

    #[error("You do not hold a seat")]
    NotSeated,

    #[error("Invalid piece: {0}")]
    InvalidPiece(u8),
}

/// A player in a game room.
#[derive(Debug, Clone)]
pub struct RoomPlayer {
    pub id: Uuid,
    pub name: String,
    pub connected: bool,
    /// Seat in the game (0-3), assigned when game starts
    pub seat: Option<PlayerId>,
}

impl RoomPlayer {
    pub fn new(id: Uuid, name: String) -> Self {
        Self {
            id,
            name,
            connected: true,
            seat: None,
        }
    }

    pub fn to_info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            name: self.name.clone(),
            connected: self.connected,
            seat: self.seat,
        }
    }
}

/// A game room with four seats.
pub struct GameRoom {
    pub id: Uuid,
    pub name: String,
    pub host_id: Uuid,
    pub status: RoomStatus,
    pub players: HashMap<Uuid, RoomPlayer>,
    /// Join order; decides seat assignment
    pub player_order: Vec<Uuid>,
    /// Difficulty for bots filling empty seats
    pub bot_difficulty: BotDifficulty,
    /// The live game (once started)
    pub game: Option<Arc<TurnCoordinator>>,
    /// Sessions that joined a running game without a seat to reclaim
    pub observers: Vec<RoomPlayer>,
}

impl GameRoom {
    pub fn new(id: Uuid, host_id: Uuid, host_name: String, bot_difficulty: BotDifficulty) -> Self {
        let mut players = HashMap::new();
        players.insert(host_id, RoomPlayer::new(host_id, host_name.clone()));

        Self {
            id,
            name: format!("{}'s Game", host_name),
            host_id,
            status: RoomStatus::Waiting,
            players,
            player_order: vec![host_id],
            bot_difficulty,
            game: None,
            observers: Vec::new(),
        }
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn is_full(&self) -> bool {
        self.players.len() >= PLAYER_COUNT
    }

    pub fn add_player(&mut self, player_id: Uuid, name: String) -> Result<(), RoomError> {
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }
        if self.is_full() {
            return Err(RoomError::RoomFull);
        }

        self.players.insert(player_id, RoomPlayer::new(player_id, name));
        self.player_order.push(player_id);
        Ok(())
    }

    /// Join a game that is already running.
    ///
    /// A session whose name matches a disconnected seated player takes that
    /// seat back; anyone else watches. Returns the reclaimed seat.
    pub fn join_running(
        &mut self,
        player_id: Uuid,
        name: String,
    ) -> Result<Option<PlayerId>, RoomError> {
        if self.status == RoomStatus::Waiting {
            return Err(RoomError::GameNotStarted);
        }

        let away = self
            .players
            .values()
            .find(|p| !p.connected && p.seat.is_some() && p.name == name)
            .map(|p| p.id);

        let Some(old_id) = away else {
            self.observers.push(RoomPlayer::new(player_id, name));
            return Ok(None);
        };

        let Some(old) = self.players.remove(&old_id) else {
            return Err(RoomError::PlayerNotInRoom);
        };
        let seat = old.seat;
        self.players.insert(
            player_id,
            RoomPlayer {
                seat,
                ..RoomPlayer::new(player_id, name)
            },
        );
        for id in self.player_order.iter_mut().filter(|id| **id == old_id) {
            *id = player_id;
        }
        if self.host_id == old_id {
            self.host_id = player_id;
        }
        Ok(seat)
    }

    pub fn remove_player(&mut self, player_id: Uuid) -> Result<bool, RoomError> {
        if let Some(pos) = self.observers.iter().position(|o| o.id == player_id) {
            self.observers.remove(pos);
            return Ok(self.players.is_empty() && self.observers.is_empty());
        }
        if !self.players.contains_key(&player_id) {
            return Err(RoomError::PlayerNotInRoom);
        }

        self.players.remove(&player_id);
        self.player_order.retain(|&id| id != player_id);

        // If host left, assign new host
        if player_id == self.host_id && !self.player_order.is_empty() {
            self.host_id = self.player_order[0];
        }

        // Return true if room is now empty
        Ok(self.players.is_empty() && self.observers.is_empty())
    }

    pub fn set_player_connected(&mut self, player_id: Uuid, connected: bool) {
        if let Some(player) = self.players.get_mut(&player_id) {
            player.connected = connected;
        }
    }

    /// Assign seats in join order and create the game.
    ///
    /// Seats without a human are played by bots.
    pub fn start_game(&mut self, requester_id: Uuid) -> Result<Arc<TurnCoordinator>, RoomError> {
        if requester_id != self.host_id {
            return Err(RoomError::NotHost);
        }
        if self.status != RoomStatus::Waiting {
            return Err(RoomError::GameAlreadyStarted);
        }

        for (seat, player_id) in self.player_order.iter().enumerate() {
            if let Some(player) = self.players.get_mut(player_id) {
                player.seat = Some(seat as PlayerId);
            }
        }

        let game = Arc::new(TurnCoordinator::new());
        self.game = Some(Arc::clone(&game));
        self.status = RoomStatus::InGame;

        Ok(game)
    }

    /// Replace the running game with a fresh one (host only)
    pub fn reset_game(&mut self, requester_id: Uuid) -> Result<Arc<TurnCoordinator>, RoomError> {
        if requester_id != self.host_id {
            return Err(RoomError::NotHost);
        }
        let game = self.coordinator()?;
        self.status = RoomStatus::InGame;
        Ok(game)
    }

    /// The live game
    pub fn coordinator(&self) -> Result<Arc<TurnCoordinator>, RoomError> {
        self.game.clone().ok_or(RoomError::GameNotStarted)
    }

    /// Seat held by a session
    pub fn seat_of(&self, player_id: Uuid) -> Result<PlayerId, RoomError> {
        if self.is_observer(player_id) {
            return Err(RoomError::NotSeated);
        }
        let player = self
            .players
            .get(&player_id)
            .ok_or(RoomError::PlayerNotInRoom)?;
        player.seat.ok_or(RoomError::GameNotStarted)
    }

    pub fn is_observer(&self, player_id: Uuid) -> bool {
        self.observers.iter().any(|o| o.id == player_id)
    }

    /// Display name of a session in this room
    pub fn name_of(&self, player_id: Uuid) -> Option<String> {
        self.players
            .get(&player_id)
            .or_else(|| self.observers.iter().find(|o| o.id == player_id))
            .map(|p| p.name.clone())
    }

    /// Whether any seated player is still connected
    pub fn has_connected_player(&self) -> bool {
        self.players.values().any(|p| p.connected && p.seat.is_some())
    }

    /// Seats played by bots.
    ///
    /// Covers empty seats and seats whose player is disconnected.
    pub fn bot_seats(&self) -> HashMap<PlayerId, BotDifficulty> {
        let humans: Vec<PlayerId> = self
            .players
            .values()
            .filter(|p| p.connected)
            .filter_map(|p| p.seat)
            .collect();
        (0..PLAYER_COUNT as PlayerId)
            .filter(|seat| !humans.contains(seat))
            .map(|seat| (seat, self.bot_difficulty))
            .collect()
    }

    /// Display name of a seat
    pub fn seat_name(&self, seat: PlayerId) -> String {
        self.players
            .values()
            .find(|p| p.seat == Some(seat))
            .map(|p| p.name.clone())
            .unwrap_or_else(|| format!("Bot {}", seat + 1))
    }

    /// Sessions to notify about this room
    pub fn session_ids(&self) -> Vec<Uuid> {
        self.player_order
            .iter()
            .copied()
            .chain(self.observers.iter().map(|o| o.id))
            .collect()
    }

    pub fn to_info(&self) -> RoomInfo {
        RoomInfo {
            id: self.id,
            name: self.name.clone(),
            players: self
                .player_order
                .iter()
                .filter_map(|id| self.players.get(id).map(|p| p.to_info()))
                .collect(),
            observers: self.observers.iter().map(|o| o.to_info()).collect(),
            host_id: self.host_id,
            status: self.status,
            bot_difficulty: self.bot_difficulty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn room_with_host() -> (GameRoom, Uuid) {
        let host_id = Uuid::new_v4();
        let room = GameRoom::new(Uuid::new_v4(), host_id, "Host".to_string(), BotDifficulty::Easy);
        (room, host_id)
    }

    #[test]
    fn test_create_room() {
        let (room, host_id) = room_with_host();

        assert_eq!(room.player_count(), 1);
        assert!(!room.is_full());
        assert_eq!(room.host_id, host_id);
        assert_eq!(room.status, RoomStatus::Waiting);
    }

    #[test]
    fn test_add_remove_players() {
        let (mut room, host_id) = room_with_host();

        for i in 2..=4 {
            room.add_player(Uuid::new_v4(), format!("Player {}", i)).unwrap();
        }
        assert_eq!(room.player_count(), 4);
        assert!(room.is_full());

        // Can't add more players
        assert!(matches!(
            room.add_player(Uuid::new_v4(), "Player 5".to_string()),
            Err(RoomError::RoomFull)
        ));

        // Host leaves, next in order takes over
        let next = room.player_order[1];
        let empty = room.remove_player(host_id).unwrap();
        assert!(!empty);
        assert_eq!(room.host_id, next);
    }

    #[test]
    fn test_start_game_assigns_seats_and_bots() {
        let (mut room, host_id) = room_with_host();
        let player2 = Uuid::new_v4();
        room.add_player(player2, "Player 2".to_string()).unwrap();

        // Non-host can't start
        assert!(matches!(room.start_game(player2), Err(RoomError::NotHost)));

        room.start_game(host_id).unwrap();
        assert_eq!(room.status, RoomStatus::InGame);
        assert_eq!(room.seat_of(host_id).unwrap(), 0);
        assert_eq!(room.seat_of(player2).unwrap(), 1);

        let bots = room.bot_seats();
        assert_eq!(bots.len(), 2);
        assert!(bots.contains_key(&2) && bots.contains_key(&3));
        assert_eq!(room.seat_name(3), "Bot 4");

        // No joining once started
        assert!(room.add_player(Uuid::new_v4(), "Late".to_string()).is_err());
    }

    #[test]
    fn test_disconnected_seat_is_played_by_bot_until_reclaimed() {
        let (mut room, host_id) = room_with_host();
        let guest = Uuid::new_v4();
        room.add_player(guest, "Guest".to_string()).unwrap();
        room.start_game(host_id).unwrap();
        assert!(!room.bot_seats().contains_key(&1));

        room.set_player_connected(guest, false);
        assert!(room.bot_seats().contains_key(&1));
        assert!(room.has_connected_player());

        // Same name, new session: the seat comes back
        let rejoined = Uuid::new_v4();
        let seat = room.join_running(rejoined, "Guest".to_string()).unwrap();
        assert_eq!(seat, Some(1));
        assert_eq!(room.seat_of(rejoined).unwrap(), 1);
        assert!(room.seat_of(guest).is_err());
        assert!(!room.bot_seats().contains_key(&1));
        assert_eq!(room.player_order, vec![host_id, rejoined]);
    }

    #[test]
    fn test_late_joiner_watches() {
        let (mut room, host_id) = room_with_host();
        let late = Uuid::new_v4();
        assert!(matches!(
            room.join_running(late, "Late".to_string()),
            Err(RoomError::GameNotStarted)
        ));

        room.start_game(host_id).unwrap();
        // Connected players cannot be impersonated
        assert_eq!(room.join_running(late, "Host".to_string()).unwrap(), None);
        assert!(room.is_observer(late));
        assert!(matches!(room.seat_of(late), Err(RoomError::NotSeated)));
        assert!(room.session_ids().contains(&late));
        assert_eq!(room.name_of(late).as_deref(), Some("Host"));
        assert_eq!(room.to_info().observers.len(), 1);

        assert!(!room.remove_player(late).unwrap());
        assert!(!room.is_observer(late));
    }

    #[test]
    fn test_reset_requires_started_game() {
        let (mut room, host_id) = room_with_host();
        assert!(matches!(room.reset_game(host_id), Err(RoomError::GameNotStarted)));
        room.start_game(host_id).unwrap();
        assert!(room.reset_game(host_id).is_ok());
    }
}
