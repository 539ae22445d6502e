//! Core game state machine.
//!
//! This module contains the main `GameState` struct and all rule enforcement.
//! Nothing here locks or performs I/O; callers serialize access (see
//! [`crate::coordinator`]) and inject the random source for dice rolls.

use crate::actions::{GameAction, GameEvent};
use crate::board::{
    absolute_square, is_on_path, is_safe_square, PieceId, PlayerId, BASE, LAST_SLOT,
    PIECES_PER_PLAYER, PLAYER_COUNT,
};
use crate::player::Player;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

/// Die value that lets a piece leave base and grants a bonus roll
pub const SIX: u8 = 6;

/// Consecutive sixes that trigger the penalty
pub const MAX_CONSECUTIVE_SIXES: u8 = 3;

/// Turn phase, derived from the state flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnPhase {
    /// The current player owes a roll
    AwaitingRoll,
    /// The current player has rolled and must move a piece
    AwaitingMove,
    /// A player has finished all pieces
    GameOver,
}

/// Errors that can occur when applying actions.
///
/// Every variant is an illegal action: the state is left untouched and the
/// caller may simply re-check and try again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
pub enum GameError {
    #[error("Game is over")]
    GameOver,

    #[error("Not your turn")]
    NotYourTurn,

    #[error("You must roll the die first")]
    MustRollFirst,

    #[error("Die already rolled, move a piece")]
    AlreadyRolled,

    #[error("Piece already moved this roll")]
    PieceAlreadyMoved,

    #[error("Piece has already finished")]
    PieceFinished,

    #[error("A six is needed to leave base")]
    NeedSixToEnter,

    #[error("Move would overshoot the last slot")]
    Overshoot,

    #[error("A legal move is available")]
    MoveAvailable,
}

/// The complete game state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameState {
    /// All four seats, in turn order
    pub players: Vec<Player>,
    /// Seat whose turn it is
    pub current_player: PlayerId,
    /// Last roll, 0 before the first roll
    pub dice_value: u8,
    /// The current player owes a roll before any move is legal
    pub must_roll: bool,
    /// Terminal flag
    pub game_over: bool,
    /// Set only once `game_over` is true
    pub winner: Option<PlayerId>,
    /// (player, piece) pairs moved since the last roll
    pub pieces_moved_this_roll: BTreeSet<(PlayerId, PieceId)>,
    /// Run of sixes rolled by the current player
    pub consecutive_sixes: u8,
}

impl Default for GameState {
    fn default() -> Self {
        Self::new()
    }
}

impl GameState {
    /// Create a fresh game with every piece in base and seat 0 to roll
    pub fn new() -> Self {
        Self {
            players: (0..PLAYER_COUNT as PlayerId).map(Player::new).collect(),
            current_player: 0,
            dice_value: 0,
            must_roll: true,
            game_over: false,
            winner: None,
            pieces_moved_this_roll: BTreeSet::new(),
            consecutive_sixes: 0,
        }
    }

    /// Current turn phase
    pub fn phase(&self) -> TurnPhase {
        if self.game_over {
            TurnPhase::GameOver
        } else if self.must_roll {
            TurnPhase::AwaitingRoll
        } else {
            TurnPhase::AwaitingMove
        }
    }

    /// Get a player by seat.
    ///
    /// # Panics
    ///
    /// Panics if `id` is not a valid seat.
    pub fn player(&self, id: PlayerId) -> &Player {
        assert!((id as usize) < PLAYER_COUNT, "invalid player id {}", id);
        &self.players[id as usize]
    }

    fn player_mut(&mut self, id: PlayerId) -> &mut Player {
        assert!((id as usize) < PLAYER_COUNT, "invalid player id {}", id);
        &mut self.players[id as usize]
    }

    /// Check if the game is finished
    pub fn is_finished(&self) -> bool {
        self.game_over
    }

    /// Get the winner if the game is finished
    pub fn get_winner(&self) -> Option<PlayerId> {
        self.winner
    }

    // ==================== Rolling ====================

    /// Roll the die for the current player.
    pub fn roll<R: Rng>(&mut self, rng: &mut R) -> Result<Vec<GameEvent>, GameError> {
        self.check_roll()?;
        let value = rng.gen_range(1..=SIX);
        self.apply_roll(value)
    }

    fn check_roll(&self) -> Result<(), GameError> {
        if self.game_over {
            return Err(GameError::GameOver);
        }
        if !self.must_roll {
            return Err(GameError::AlreadyRolled);
        }
        Ok(())
    }

    /// Apply an already drawn die value for the current player.
    ///
    /// The third six in a row sends the roller's first active piece back to
    /// base and voids the roll: the counter resets and the same player owes a
    /// fresh roll.
    ///
    /// # Panics
    ///
    /// Panics if `value` is not in `1..=6`.
    pub fn apply_roll(&mut self, value: u8) -> Result<Vec<GameEvent>, GameError> {
        assert!((1..=SIX).contains(&value), "invalid die value {}", value);
        self.check_roll()?;

        let player = self.current_player;
        let mut events = vec![GameEvent::DiceRolled { player, value }];

        self.dice_value = value;
        self.must_roll = false;
        self.pieces_moved_this_roll.clear();

        if value != SIX {
            self.consecutive_sixes = 0;
            return Ok(events);
        }

        self.consecutive_sixes += 1;
        if self.consecutive_sixes < MAX_CONSECUTIVE_SIXES {
            return Ok(events);
        }

        // Third six: penalty, then the roll is void
        let sent_home = self.player(player).first_active_piece();
        events.push(GameEvent::SixesPenalty {
            player,
            piece: sent_home,
        });
        if let Some(piece_id) = sent_home {
            let piece = self.player_mut(player).piece_mut(piece_id);
            let from = piece.position;
            piece.position = BASE;
            events.push(GameEvent::PieceMoved {
                player,
                piece: piece_id,
                from,
                to: BASE,
            });
        }
        self.consecutive_sixes = 0;
        self.must_roll = true;
        events.push(GameEvent::NextPlayer { player });

        Ok(events)
    }

    // ==================== Moving ====================

    /// Check whether a piece may move with the current roll.
    ///
    /// # Panics
    ///
    /// Panics on a player or piece id outside `0..4`.
    pub fn check_move(&self, player: PlayerId, piece: PieceId) -> Result<(), GameError> {
        assert!((player as usize) < PLAYER_COUNT, "invalid player id {}", player);
        assert!((piece as usize) < PIECES_PER_PLAYER, "invalid piece id {}", piece);

        if self.game_over {
            return Err(GameError::GameOver);
        }
        if player != self.current_player {
            return Err(GameError::NotYourTurn);
        }
        if self.must_roll {
            return Err(GameError::MustRollFirst);
        }
        if self.pieces_moved_this_roll.contains(&(player, piece)) {
            return Err(GameError::PieceAlreadyMoved);
        }

        let p = self.player(player).piece(piece);
        if p.finished {
            return Err(GameError::PieceFinished);
        }
        if p.is_at_base() {
            if self.dice_value != SIX {
                return Err(GameError::NeedSixToEnter);
            }
        } else if p.position + self.dice_value as i8 > LAST_SLOT {
            return Err(GameError::Overshoot);
        }

        Ok(())
    }

    /// Whether a piece may move with the current roll
    pub fn can_move(&self, player: PlayerId, piece: PieceId) -> bool {
        self.check_move(player, piece).is_ok()
    }

    /// Pieces of `player` that may move with the current roll
    pub fn movable_pieces(&self, player: PlayerId) -> Vec<PieceId> {
        (0..PIECES_PER_PLAYER as PieceId)
            .filter(|&piece| self.can_move(player, piece))
            .collect()
    }

    /// Whether `player` has at least one legal move
    pub fn has_legal_move(&self, player: PlayerId) -> bool {
        (0..PIECES_PER_PLAYER as PieceId).any(|piece| self.can_move(player, piece))
    }

    /// Move a piece by the current roll.
    ///
    /// Handles entering from base, finishing, winning, captures on non-safe
    /// squares and turn advancement.
    pub fn move_piece(
        &mut self,
        player: PlayerId,
        piece_id: PieceId,
    ) -> Result<Vec<GameEvent>, GameError> {
        self.check_move(player, piece_id)?;

        let dice = self.dice_value;
        let mut events = Vec::new();

        let piece = self.player_mut(player).piece_mut(piece_id);
        let from = piece.position;
        let to = if piece.is_at_base() {
            0
        } else {
            from + dice as i8
        };
        piece.position = to;
        let finished = to == LAST_SLOT;
        if finished {
            piece.finished = true;
        }
        self.pieces_moved_this_roll.insert((player, piece_id));

        events.push(GameEvent::PieceMoved {
            player,
            piece: piece_id,
            from,
            to,
        });

        if finished {
            events.push(GameEvent::PieceFinished {
                player,
                piece: piece_id,
            });
            if self.player(player).has_finished() {
                self.game_over = true;
                self.winner = Some(player);
                self.pieces_moved_this_roll.clear();
                events.push(GameEvent::GameOver { winner: player });
                return Ok(events);
            }
        }

        if is_on_path(to) {
            events.extend(self.capture_at(player, to));
        }

        // One move consumes the roll
        self.pieces_moved_this_roll.clear();
        events.extend(self.finish_roll());

        Ok(events)
    }

    /// Send every opposing, unfinished piece on the mover's square back to base
    fn capture_at(&mut self, mover: PlayerId, step: i8) -> Vec<GameEvent> {
        let mut events = Vec::new();
        let Some(square) = absolute_square(self.player(mover).color, step) else {
            return events;
        };
        if is_safe_square(square) {
            return events;
        }

        for other in self.players.iter_mut().filter(|p| p.id != mover) {
            let color = other.color;
            for piece in other.pieces.iter_mut() {
                if piece.finished || absolute_square(color, piece.position) != Some(square) {
                    continue;
                }
                let from = piece.position;
                piece.position = BASE;
                events.push(GameEvent::PieceCaptured {
                    player: other.id,
                    piece: piece.id,
                    by: mover,
                });
                events.push(GameEvent::PieceMoved {
                    player: other.id,
                    piece: piece.id,
                    from,
                    to: BASE,
                });
            }
        }

        events
    }

    /// Close the current roll: bonus roll after a six, otherwise next seat
    fn finish_roll(&mut self) -> Vec<GameEvent> {
        self.must_roll = true;
        if self.dice_value == SIX && self.consecutive_sixes < MAX_CONSECUTIVE_SIXES {
            return vec![GameEvent::NextPlayer {
                player: self.current_player,
            }];
        }
        self.advance_turn()
    }

    fn advance_turn(&mut self) -> Vec<GameEvent> {
        self.current_player = (self.current_player + 1) % PLAYER_COUNT as PlayerId;
        self.consecutive_sixes = 0;
        self.must_roll = true;
        self.pieces_moved_this_roll.clear();
        vec![GameEvent::NextPlayer {
            player: self.current_player,
        }]
    }

    /// Give up a roll that no piece can use.
    ///
    /// A non-six hands the turn to the next seat exactly as a move would. A six
    /// with no usable piece still earns the bonus roll.
    pub fn pass_turn(&mut self) -> Result<Vec<GameEvent>, GameError> {
        if self.game_over {
            return Err(GameError::GameOver);
        }
        if self.must_roll {
            return Err(GameError::MustRollFirst);
        }
        let player = self.current_player;
        if self.has_legal_move(player) {
            return Err(GameError::MoveAvailable);
        }

        let mut events = vec![GameEvent::NoLegalMove {
            player,
            value: self.dice_value,
        }];
        events.extend(self.finish_roll());
        Ok(events)
    }

    // ==================== Dispatch ====================

    /// Get all currently valid actions for a player
    pub fn valid_actions(&self, player: PlayerId) -> Vec<GameAction> {
        if self.game_over || player != self.current_player {
            return Vec::new();
        }
        if self.must_roll {
            return vec![GameAction::RollDice];
        }
        self.movable_pieces(player)
            .into_iter()
            .map(GameAction::MovePiece)
            .collect()
    }

    /// Apply an action on behalf of `player`
    pub fn apply_action<R: Rng>(
        &mut self,
        player: PlayerId,
        action: GameAction,
        rng: &mut R,
    ) -> Result<Vec<GameEvent>, GameError> {
        match action {
            GameAction::RollDice => {
                if self.game_over {
                    return Err(GameError::GameOver);
                }
                if player != self.current_player {
                    return Err(GameError::NotYourTurn);
                }
                self.roll(rng)
            }
            GameAction::MovePiece(piece) => self.move_piece(player, piece),
        }
    }
}
