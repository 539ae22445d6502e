//! Game actions that players can take.
//!
//! This module defines all possible actions in the game and the events
//! that result from those actions.

use crate::board::{PieceId, PlayerId};
use serde::{Deserialize, Serialize};

/// All possible actions a player can take
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameAction {
    /// Roll the die (must be done before any move)
    RollDice,
    /// Move one of your pieces by the rolled value
    MovePiece(PieceId),
}

/// Events that occur as a result of actions.
///
/// Events are emitted in the order they happened and are meant to be
/// broadcast to every connected session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum GameEvent {
    /// The die was rolled
    DiceRolled { player: PlayerId, value: u8 },

    /// A piece changed position
    PieceMoved {
        player: PlayerId,
        piece: PieceId,
        from: i8,
        to: i8,
    },

    /// A piece was sent back to base by an opponent landing on it
    PieceCaptured {
        player: PlayerId,
        piece: PieceId,
        by: PlayerId,
    },

    /// A piece reached the last slot of its finishing lane
    PieceFinished { player: PlayerId, piece: PieceId },

    /// Third six in a row; `piece` is the piece sent back to base, if any
    SixesPenalty {
        player: PlayerId,
        piece: Option<PieceId>,
    },

    /// The roll could not be used by any piece
    NoLegalMove { player: PlayerId, value: u8 },

    /// The given player must roll next (may be the same player on a bonus turn)
    NextPlayer { player: PlayerId },

    /// A player finished all four pieces
    GameOver { winner: PlayerId },

    /// The game was replaced by a fresh one
    GameReset,
}
