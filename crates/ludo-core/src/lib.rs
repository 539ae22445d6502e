//! Ludo - a four-seat race game engine
//!
//! This crate provides the core game logic, including:
//! - Board topology: the shared path, entry squares, safe squares and finishing lanes
//! - Player and piece state
//! - Game state machine with full rule enforcement (captures, bonus rolls,
//!   the three-sixes penalty, win detection)
//! - A turn coordinator that serializes actions from concurrent sessions
//!
//! # Architecture
//!
//! The rules in [`game`] are pure and single-threaded. All concurrency lives in
//! [`coordinator`], one instance per live game. The engine can be compiled to:
//! - Native Rust for server-side game hosting
//! - WebAssembly for client-side local play
//!
//! # Modules
//!
//! - [`board`]: Path geometry and constants
//! - [`player`]: Players and pieces
//! - [`game`]: Game state machine
//! - [`coordinator`]: Serialized access and event emission
//! - [`bot`]: Computer players

pub mod actions;
pub mod board;
pub mod bot;
pub mod coordinator;
pub mod game;
pub mod player;
#[cfg(feature = "wasm")]
pub mod wasm;

// Re-export commonly used types
pub use actions::{GameAction, GameEvent};
pub use board::{PieceId, PlayerColor, PlayerId, BASE, LANE_LENGTH, LAST_SLOT, PATH_LENGTH};
pub use bot::{Bot, BotDifficulty};
pub use coordinator::{MoveResult, RollOutcome, Snapshot, TurnCoordinator, Update};
pub use game::{GameError, GameState, TurnPhase};
pub use player::{Piece, Player};
