//! WebSocket protocol messages for Ludo multiplayer.

use ludo_core::{
    BotDifficulty, GameAction, GameEvent, MoveResult, PieceId, PlayerId, RollOutcome, Snapshot,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ClientMessage {
    /// Create a new game room
    CreateRoom { player_name: String },

    /// Join an existing room; joining a running game reclaims a seat held
    /// under the same name by a disconnected player, or watches
    JoinRoom { room_id: Uuid, player_name: String },

    /// Leave current room
    LeaveRoom,

    /// Start the game (host only); empty seats are taken by bots
    StartGame,

    /// Roll the die for your seat
    RollDice,

    /// Move one of your pieces by the current roll
    MovePiece { piece: PieceId },

    /// Replace the running game with a fresh one (host only)
    ResetGame,

    /// Request a snapshot of the game, e.g. after joining late
    GetState,

    /// Send chat message
    Chat { message: String },

    /// Request room list
    ListRooms,

    /// Ping for keepalive
    Ping,
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload")]
pub enum ServerMessage {
    /// Welcome message with assigned session ID
    Welcome { player_id: Uuid },

    /// Room created successfully
    RoomCreated { room_id: Uuid },

    /// Joined room successfully
    JoinedRoom { room: RoomInfo },

    /// Left room successfully
    LeftRoom,

    /// Room state updated (player joined/left)
    RoomUpdated { room: RoomInfo },

    /// Game started
    GameStarted { snapshot: Snapshot },

    /// Full game state
    GameState { snapshot: Snapshot },

    /// Result of your roll
    RollResult { outcome: RollOutcome },

    /// Result of your move request
    MoveResult { result: MoveResult },

    /// Events from an applied action, in order
    Events {
        events: Vec<GameEvent>,
        generation: u64,
    },

    /// Valid actions for your seat
    ValidActions { actions: Vec<GameAction> },

    /// Current seat changed
    TurnChanged { seat: PlayerId },

    /// Chat message received
    ChatMessage { player_name: String, message: String },

    /// List of available rooms
    RoomList { rooms: Vec<RoomInfo> },

    /// Error occurred
    Error { message: String },

    /// Pong response
    Pong,

    /// Game finished
    GameOver { winner: PlayerId, winner_name: String },
}

/// Room information for clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomInfo {
    pub id: Uuid,
    pub name: String,
    pub players: Vec<PlayerInfo>,
    /// Sessions watching a running game without a seat
    pub observers: Vec<PlayerInfo>,
    pub host_id: Uuid,
    pub status: RoomStatus,
    pub bot_difficulty: BotDifficulty,
}

/// Player information in a room.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: Uuid,
    pub name: String,
    pub connected: bool,
    /// Seat index (0-3), assigned when the game starts
    pub seat: Option<PlayerId>,
}

/// Room status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomStatus {
    Waiting,
    InGame,
    Finished,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_message_wire_format() {
        let msg: ClientMessage =
            serde_json::from_str(r#"{"type":"MovePiece","payload":{"piece":2}}"#).unwrap();
        assert!(matches!(msg, ClientMessage::MovePiece { piece: 2 }));

        let msg: ClientMessage = serde_json::from_str(r#"{"type":"RollDice"}"#).unwrap();
        assert!(matches!(msg, ClientMessage::RollDice));
    }

    #[test]
    fn test_server_message_tagging() {
        let text = serde_json::to_string(&ServerMessage::TurnChanged { seat: 3 }).unwrap();
        assert_eq!(text, r#"{"type":"TurnChanged","payload":{"seat":3}}"#);
    }
}
