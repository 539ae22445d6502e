//! Players and their pieces.

use crate::board::{
    absolute_square, is_on_path, PieceId, PlayerColor, PlayerId, BASE, LAST_SLOT,
    PIECES_PER_PLAYER,
};
use serde::{Deserialize, Serialize};

/// A single playing piece
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Piece {
    pub id: PieceId,
    /// Logical step relative to the owner's entry square, `-1` while in base
    pub position: i8,
    /// Set once the piece reaches the last finishing-lane slot
    pub finished: bool,
}

impl Piece {
    /// Create a piece waiting in base
    pub fn new(id: PieceId) -> Self {
        Self {
            id,
            position: BASE,
            finished: false,
        }
    }

    /// Whether the piece is still in base
    pub fn is_at_base(&self) -> bool {
        self.position == BASE
    }

    /// Whether the piece is on the board and can still move
    pub fn is_active(&self) -> bool {
        !self.is_at_base() && !self.finished
    }

    /// Number of steps left until the last finishing-lane slot
    pub fn steps_to_finish(&self) -> i8 {
        if self.is_at_base() {
            LAST_SLOT + 1
        } else {
            LAST_SLOT - self.position
        }
    }
}

/// A seat at the table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub id: PlayerId,
    pub color: PlayerColor,
    pub pieces: [Piece; PIECES_PER_PLAYER],
}

impl Player {
    /// Create a player with every piece in base
    pub fn new(id: PlayerId) -> Self {
        Self {
            id,
            color: PlayerColor::for_player(id),
            pieces: [Piece::new(0), Piece::new(1), Piece::new(2), Piece::new(3)],
        }
    }

    /// Get a piece by id
    pub fn piece(&self, id: PieceId) -> &Piece {
        &self.pieces[id as usize]
    }

    pub(crate) fn piece_mut(&mut self, id: PieceId) -> &mut Piece {
        &mut self.pieces[id as usize]
    }

    /// Whether all four pieces have finished
    pub fn has_finished(&self) -> bool {
        self.pieces.iter().all(|p| p.finished)
    }

    /// Number of finished pieces
    pub fn finished_count(&self) -> usize {
        self.pieces.iter().filter(|p| p.finished).count()
    }

    /// Absolute shared-path square of a piece, if it is on the path
    pub fn square_of(&self, id: PieceId) -> Option<i8> {
        let piece = self.piece(id);
        if piece.finished || !is_on_path(piece.position) {
            return None;
        }
        absolute_square(self.color, piece.position)
    }

    /// First piece that is on the board and not finished
    pub fn first_active_piece(&self) -> Option<PieceId> {
        self.pieces.iter().find(|p| p.is_active()).map(|p| p.id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_player_all_at_base() {
        let player = Player::new(2);
        assert_eq!(player.color, PlayerColor::Green);
        assert!(player.pieces.iter().all(|p| p.is_at_base()));
        assert_eq!(player.finished_count(), 0);
        assert!(!player.has_finished());
        assert_eq!(player.first_active_piece(), None);
    }

    #[test]
    fn test_square_of_uses_offset() {
        let mut player = Player::new(1);
        player.piece_mut(0).position = 35;
        player.piece_mut(1).position = 41;
        assert_eq!(player.square_of(0), Some(5));
        assert_eq!(player.square_of(1), None);
        assert_eq!(player.square_of(2), None);
    }

    #[test]
    fn test_steps_to_finish() {
        let mut piece = Piece::new(0);
        assert_eq!(piece.steps_to_finish(), LAST_SLOT + 1);
        piece.position = 42;
        assert_eq!(piece.steps_to_finish(), 1);
    }
}
