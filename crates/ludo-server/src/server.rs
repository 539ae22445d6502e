//! WebSocket server and connection handling.

use crate::protocol::{ClientMessage, RoomInfo, RoomStatus, ServerMessage};
use crate::room::{GameRoom, RoomError};
use dashmap::DashMap;
use futures_util::{SinkExt, StreamExt};
use ludo_core::board::PIECES_PER_PLAYER;
use ludo_core::{Bot, BotDifficulty, GameEvent, PlayerId, TurnCoordinator};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::{accept_async, tungstenite::Message};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Upper bound on bot actions between two human actions
const MAX_BOT_ACTIONS: usize = 1_000;

/// Server state shared across all connections.
pub struct ServerState {
    /// All active rooms
    pub rooms: DashMap<Uuid, GameRoom>,
    /// Mapping from player ID to their room ID
    pub player_rooms: DashMap<Uuid, Uuid>,
    /// Mapping from player ID to their message sender
    pub player_senders: DashMap<Uuid, mpsc::UnboundedSender<ServerMessage>>,
    /// Difficulty for bots in newly created rooms
    pub bot_difficulty: BotDifficulty,
}

impl ServerState {
    pub fn new(bot_difficulty: BotDifficulty) -> Self {
        Self {
            rooms: DashMap::new(),
            player_rooms: DashMap::new(),
            player_senders: DashMap::new(),
            bot_difficulty,
        }
    }

    /// Send a message to a specific player.
    pub fn send_to_player(&self, player_id: Uuid, msg: ServerMessage) {
        if let Some(sender) = self.player_senders.get(&player_id) {
            let _ = sender.send(msg);
        }
    }

    /// Send an error message to a specific player.
    fn send_error(&self, player_id: Uuid, message: impl ToString) {
        self.send_to_player(
            player_id,
            ServerMessage::Error {
                message: message.to_string(),
            },
        );
    }

    /// Broadcast a message to all players in a room.
    pub fn broadcast_to_room(&self, room_id: Uuid, msg: ServerMessage) {
        let sessions = match self.rooms.get(&room_id) {
            Some(room) => room.session_ids(),
            None => return,
        };
        for player_id in sessions {
            self.send_to_player(player_id, msg.clone());
        }
    }

    /// Broadcast a message to all players in a room except one.
    pub fn broadcast_to_room_except(&self, room_id: Uuid, except: Uuid, msg: ServerMessage) {
        let sessions = match self.rooms.get(&room_id) {
            Some(room) => room.session_ids(),
            None => return,
        };
        for player_id in sessions.into_iter().filter(|id| *id != except) {
            self.send_to_player(player_id, msg.clone());
        }
    }

    /// Get list of waiting rooms.
    pub fn get_waiting_rooms(&self) -> Vec<RoomInfo> {
        self.rooms
            .iter()
            .filter(|r| r.status == RoomStatus::Waiting)
            .map(|r| r.to_info())
            .collect()
    }

    /// Resolve a session to its room, seat and live game.
    ///
    /// Room locks are released before returning so the caller can act on the
    /// game without holding them.
    fn game_for(
        &self,
        player_id: Uuid,
    ) -> Result<(Uuid, PlayerId, Arc<TurnCoordinator>), RoomError> {
        let room_id = *self
            .player_rooms
            .get(&player_id)
            .ok_or(RoomError::PlayerNotInRoom)?;
        let room = self.rooms.get(&room_id).ok_or(RoomError::RoomNotFound)?;
        let seat = room.seat_of(player_id)?;
        let game = room.coordinator()?;
        Ok((room_id, seat, game))
    }
}

/// Run the WebSocket server.
pub async fn run_server(addr: SocketAddr, state: Arc<ServerState>) -> anyhow::Result<()> {
    let listener = TcpListener::bind(addr).await?;
    info!("Ludo server listening on {}", addr);

    while let Ok((stream, peer_addr)) = listener.accept().await {
        let state = Arc::clone(&state);
        tokio::spawn(async move {
            if let Err(e) = handle_connection(stream, peer_addr, state).await {
                error!("Connection error from {}: {}", peer_addr, e);
            }
        });
    }

    Ok(())
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<ServerState>,
) -> anyhow::Result<()> {
    let ws_stream = accept_async(stream).await?;
    info!("New WebSocket connection from {}", addr);

    let (mut ws_sender, mut ws_receiver) = ws_stream.split();

    // Assign a session ID
    let player_id = Uuid::new_v4();

    // Create channel for outgoing messages
    let (tx, mut rx) = mpsc::unbounded_channel::<ServerMessage>();
    state.player_senders.insert(player_id, tx);

    // Send welcome message
    let welcome = ServerMessage::Welcome { player_id };
    let msg_text = serde_json::to_string(&welcome)?;
    ws_sender.send(Message::Text(msg_text)).await?;

    // Forward messages from channel to WebSocket
    let send_task = tokio::spawn(async move {
        while let Some(msg) = rx.recv().await {
            if let Ok(text) = serde_json::to_string(&msg) {
                if ws_sender.send(Message::Text(text)).await.is_err() {
                    break;
                }
            }
        }
    });

    // Handle incoming messages
    while let Some(msg) = ws_receiver.next().await {
        match msg {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMessage>(&text) {
                Ok(client_msg) => handle_message(player_id, client_msg, &state),
                Err(e) => {
                    warn!("Invalid message from {}: {} ({})", player_id, text, e);
                    state.send_error(player_id, format!("Invalid message: {}", e));
                }
            },
            Ok(Message::Close(_)) => {
                info!("Client {} closing connection", player_id);
                break;
            }
            Ok(Message::Ping(_)) => {
                state.send_to_player(player_id, ServerMessage::Pong);
            }
            Err(e) => {
                error!("WebSocket error from {}: {}", player_id, e);
                break;
            }
            _ => {}
        }
    }

    // Clean up on disconnect
    handle_disconnect(player_id, &state);
    state.player_senders.remove(&player_id);
    send_task.abort();

    info!("Connection closed for {}", player_id);
    Ok(())
}

/// Handle a client message.
fn handle_message(player_id: Uuid, msg: ClientMessage, state: &Arc<ServerState>) {
    match msg {
        ClientMessage::CreateRoom { player_name } => {
            let room_id = Uuid::new_v4();
            let room = GameRoom::new(room_id, player_id, player_name, state.bot_difficulty);
            let room_info = room.to_info();

            state.rooms.insert(room_id, room);
            state.player_rooms.insert(player_id, room_id);
            info!(%room_id, %player_id, "room created");

            state.send_to_player(player_id, ServerMessage::RoomCreated { room_id });
            state.send_to_player(player_id, ServerMessage::JoinedRoom { room: room_info });
        }

        ClientMessage::JoinRoom {
            room_id,
            player_name,
        } => {
            let Some(mut room) = state.rooms.get_mut(&room_id) else {
                state.send_error(player_id, RoomError::RoomNotFound);
                return;
            };
            if room.status != RoomStatus::Waiting {
                drop(room);
                return join_running_game(player_id, room_id, player_name, state);
            }
            match room.add_player(player_id, player_name) {
                Ok(()) => {
                    let room_info = room.to_info();
                    state.player_rooms.insert(player_id, room_id);

                    // Release lock before broadcasting
                    drop(room);
                    state.send_to_player(
                        player_id,
                        ServerMessage::JoinedRoom {
                            room: room_info.clone(),
                        },
                    );
                    state.broadcast_to_room_except(
                        room_id,
                        player_id,
                        ServerMessage::RoomUpdated { room: room_info },
                    );
                }
                Err(e) => {
                    drop(room);
                    state.send_error(player_id, e);
                }
            }
        }

        ClientMessage::LeaveRoom => {
            if let Some((_, room_id)) = state.player_rooms.remove(&player_id) {
                leave_room(player_id, room_id, state);
                state.send_to_player(player_id, ServerMessage::LeftRoom);
            }
        }

        ClientMessage::StartGame => {
            let Some(room_id) = state.player_rooms.get(&player_id).map(|r| *r) else {
                state.send_error(player_id, RoomError::PlayerNotInRoom);
                return;
            };
            let started = match state.rooms.get_mut(&room_id) {
                Some(mut room) => room.start_game(player_id),
                None => Err(RoomError::RoomNotFound),
            };
            match started {
                Ok(game) => {
                    info!(%room_id, "game started");
                    state.broadcast_to_room(
                        room_id,
                        ServerMessage::GameStarted {
                            snapshot: game.snapshot(),
                        },
                    );
                    state.broadcast_to_room(
                        room_id,
                        ServerMessage::TurnChanged {
                            seat: game.current_player(),
                        },
                    );
                    drive_bots(room_id, &game, state);
                }
                Err(e) => state.send_error(player_id, e),
            }
        }

        ClientMessage::RollDice => {
            let (room_id, seat, game) = match state.game_for(player_id) {
                Ok(ctx) => ctx,
                Err(e) => return state.send_error(player_id, e),
            };
            match game.roll(Some(seat)) {
                Ok(update) => {
                    state.send_to_player(
                        player_id,
                        ServerMessage::RollResult {
                            outcome: update.result,
                        },
                    );
                    publish(room_id, &game, update.events, update.generation, state);
                    drive_bots(room_id, &game, state);
                }
                Err(e) => state.send_error(player_id, e),
            }
        }

        ClientMessage::MovePiece { piece } => {
            if piece as usize >= PIECES_PER_PLAYER {
                return state.send_error(player_id, RoomError::InvalidPiece(piece));
            }
            let (room_id, seat, game) = match state.game_for(player_id) {
                Ok(ctx) => ctx,
                Err(e) => return state.send_error(player_id, e),
            };
            let update = game.move_piece(seat, piece);
            state.send_to_player(
                player_id,
                ServerMessage::MoveResult {
                    result: update.result,
                },
            );
            if update.result.applied {
                publish(room_id, &game, update.events, update.generation, state);
                drive_bots(room_id, &game, state);
            }
        }

        ClientMessage::ResetGame => {
            let Some(room_id) = state.player_rooms.get(&player_id).map(|r| *r) else {
                state.send_error(player_id, RoomError::PlayerNotInRoom);
                return;
            };
            let game = match state.rooms.get_mut(&room_id) {
                Some(mut room) => room.reset_game(player_id),
                None => Err(RoomError::RoomNotFound),
            };
            match game {
                Ok(game) => {
                    let update = game.reset();
                    info!(%room_id, "game reset");
                    publish(room_id, &game, update.events, update.generation, state);
                    drive_bots(room_id, &game, state);
                }
                Err(e) => state.send_error(player_id, e),
            }
        }

        ClientMessage::GetState => send_game_state(player_id, state),

        ClientMessage::Chat { message } => {
            if let Some(room_id) = state.player_rooms.get(&player_id).map(|r| *r) {
                let player_name = state
                    .rooms
                    .get(&room_id)
                    .and_then(|r| r.name_of(player_id))
                    .unwrap_or_else(|| "Unknown".to_string());

                state.broadcast_to_room(
                    room_id,
                    ServerMessage::ChatMessage {
                        player_name,
                        message,
                    },
                );
            }
        }

        ClientMessage::ListRooms => {
            let rooms = state.get_waiting_rooms();
            state.send_to_player(player_id, ServerMessage::RoomList { rooms });
        }

        ClientMessage::Ping => {
            state.send_to_player(player_id, ServerMessage::Pong);
        }
    }
}

/// Join a room whose game is already running, as the returning holder of a
/// seat or as an observer.
fn join_running_game(player_id: Uuid, room_id: Uuid, player_name: String, state: &ServerState) {
    let joined = match state.rooms.get_mut(&room_id) {
        Some(mut room) => room
            .join_running(player_id, player_name)
            .map(|seat| (seat, room.to_info(), room.coordinator().ok())),
        None => Err(RoomError::RoomNotFound),
    };
    let (seat, room_info, game) = match joined {
        Ok(joined) => joined,
        Err(e) => return state.send_error(player_id, e),
    };

    state.player_rooms.insert(player_id, room_id);
    info!(%room_id, %player_id, ?seat, "joined running game");
    state.send_to_player(
        player_id,
        ServerMessage::JoinedRoom {
            room: room_info.clone(),
        },
    );
    state.broadcast_to_room_except(
        room_id,
        player_id,
        ServerMessage::RoomUpdated { room: room_info },
    );
    send_game_state(player_id, state);

    if let Some(game) = game {
        drive_bots(room_id, &game, state);
    }
}

/// Send the game snapshot to any session in the room, plus its valid
/// actions when it holds a seat.
fn send_game_state(player_id: Uuid, state: &ServerState) {
    let Some(room_id) = state.player_rooms.get(&player_id).map(|r| *r) else {
        return state.send_error(player_id, RoomError::PlayerNotInRoom);
    };
    let found = match state.rooms.get(&room_id) {
        Some(room) => room
            .coordinator()
            .map(|game| (game, room.seat_of(player_id).ok())),
        None => Err(RoomError::RoomNotFound),
    };
    let (game, seat) = match found {
        Ok(found) => found,
        Err(e) => return state.send_error(player_id, e),
    };

    state.send_to_player(
        player_id,
        ServerMessage::GameState {
            snapshot: game.snapshot(),
        },
    );
    if let Some(seat) = seat {
        state.send_to_player(
            player_id,
            ServerMessage::ValidActions {
                actions: game.valid_actions(seat),
            },
        );
    }
}

/// Fan out the events of one applied action to the whole room.
fn publish(
    room_id: Uuid,
    game: &TurnCoordinator,
    events: Vec<GameEvent>,
    generation: u64,
    state: &ServerState,
) {
    let winner = events.iter().find_map(|e| match e {
        GameEvent::GameOver { winner } => Some(*winner),
        _ => None,
    });

    state.broadcast_to_room(room_id, ServerMessage::Events { events, generation });
    state.broadcast_to_room(
        room_id,
        ServerMessage::GameState {
            snapshot: game.snapshot(),
        },
    );

    if let Some(winner) = winner {
        let winner_name = match state.rooms.get_mut(&room_id) {
            Some(mut room) => {
                room.status = RoomStatus::Finished;
                room.seat_name(winner)
            }
            None => return,
        };
        info!(%room_id, winner, "game over");
        state.broadcast_to_room(
            room_id,
            ServerMessage::GameOver {
                winner,
                winner_name,
            },
        );
    } else {
        state.broadcast_to_room(
            room_id,
            ServerMessage::TurnChanged {
                seat: game.current_player(),
            },
        );
    }
}

/// Let bots act until a human seat is to play or the game ends.
///
/// Seat ownership is re-read before every action, so a player who leaves,
/// drops or returns while bots are playing is picked up at once.
fn drive_bots(room_id: Uuid, game: &TurnCoordinator, state: &ServerState) {
    for _ in 0..MAX_BOT_ACTIONS {
        let bot_seats = match state.rooms.get(&room_id) {
            Some(room) if room.has_connected_player() => room.bot_seats(),
            _ => return,
        };
        let snapshot = game.snapshot().state;
        if snapshot.game_over {
            return;
        }
        let seat = snapshot.current_player;
        let Some(&difficulty) = bot_seats.get(&seat) else {
            return;
        };

        let mut bot = Bot::new(seat, difficulty);
        let Some(action) = bot.choose_action(&snapshot) else {
            return;
        };
        match game.apply(seat, action) {
            Ok(update) => {
                debug!(%room_id, seat, ?action, "bot acted");
                publish(room_id, game, update.events, update.generation, state);
            }
            Err(e) => {
                // Another session changed the game first; re-read and retry
                debug!(%room_id, seat, error = %e, "bot action rejected");
            }
        }
    }

    warn!(%room_id, "bot action limit reached");
}

/// Remove a session from a room, deleting the room once empty.
///
/// A seat left during a game goes to a bot, which plays at once if that
/// seat is to move.
fn leave_room(player_id: Uuid, room_id: Uuid, state: &ServerState) {
    let (should_remove, game) = match state.rooms.get_mut(&room_id) {
        Some(mut room) => {
            let is_empty = room.remove_player(player_id).unwrap_or(false);
            let game = match room.status {
                RoomStatus::InGame => room.coordinator().ok(),
                _ => None,
            };
            if !is_empty {
                let room_info = room.to_info();
                drop(room);
                state.broadcast_to_room(room_id, ServerMessage::RoomUpdated { room: room_info });
            }
            (is_empty, game)
        }
        None => (false, None),
    };

    if should_remove {
        state.rooms.remove(&room_id);
        info!(%room_id, "room removed");
    } else if let Some(game) = game {
        drive_bots(room_id, &game, state);
    }
}

/// Handle player disconnect.
fn handle_disconnect(player_id: Uuid, state: &ServerState) {
    if let Some((_, room_id)) = state.player_rooms.remove(&player_id) {
        let in_game = state
            .rooms
            .get(&room_id)
            .is_some_and(|room| room.status == RoomStatus::InGame);

        let seated = state
            .rooms
            .get(&room_id)
            .is_some_and(|room| !room.is_observer(player_id));

        if in_game && seated {
            // Keep the seat for a returning player; a bot plays it meanwhile
            let game = match state.rooms.get_mut(&room_id) {
                Some(mut room) => {
                    room.set_player_connected(player_id, false);
                    let room_info = room.to_info();
                    let game = room.coordinator().ok();
                    drop(room);
                    state.broadcast_to_room(
                        room_id,
                        ServerMessage::RoomUpdated { room: room_info },
                    );
                    game
                }
                None => None,
            };
            if let Some(game) = game {
                drive_bots(room_id, &game, state);
            }
        } else {
            leave_room(player_id, room_id, state);
        }
    }
}
