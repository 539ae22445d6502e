//! Board topology.
//!
//! The board is a shared circular path of [`PATH_LENGTH`] squares. Every color
//! enters the path at its own offset and, after one full lap, turns into a
//! private finishing lane of [`LANE_LENGTH`] squares.
//!
//! Piece positions are stored as *logical steps* relative to the owner's entry
//! square:
//! - `-1` ([`BASE`]): waiting in the base, not on the board
//! - `0..PATH_LENGTH`: on the shared path, `step` squares past the entry
//! - `PATH_LENGTH..=LAST_SLOT`: inside the finishing lane
//!
//! Only the shared path has absolute coordinates, see [`absolute_square`].

use serde::{Deserialize, Serialize};

/// Player identifier (seat index 0-3)
pub type PlayerId = u8;

/// Piece identifier within a player (0-3)
pub type PieceId = u8;

/// Number of squares on the shared circular path
pub const PATH_LENGTH: i8 = 40;

/// Number of squares in each finishing lane
pub const LANE_LENGTH: i8 = 4;

/// Logical step of the terminal finishing-lane slot
pub const LAST_SLOT: i8 = PATH_LENGTH + LANE_LENGTH - 1;

/// Position of a piece that has not entered the board
pub const BASE: i8 = -1;

/// Number of seats at the table
pub const PLAYER_COUNT: usize = 4;

/// Number of pieces owned by each player
pub const PIECES_PER_PLAYER: usize = 4;

/// Seat colors, in turn order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerColor {
    Red,
    Blue,
    Green,
    Yellow,
}

impl PlayerColor {
    /// All colors in seat order
    pub const ALL: [PlayerColor; PLAYER_COUNT] = [
        PlayerColor::Red,
        PlayerColor::Blue,
        PlayerColor::Green,
        PlayerColor::Yellow,
    ];

    /// Color bound to a seat
    pub fn for_player(id: PlayerId) -> Self {
        match id % 4 {
            0 => PlayerColor::Red,
            1 => PlayerColor::Blue,
            2 => PlayerColor::Green,
            _ => PlayerColor::Yellow,
        }
    }

    /// Seat index of this color
    pub fn seat(&self) -> PlayerId {
        match self {
            PlayerColor::Red => 0,
            PlayerColor::Blue => 1,
            PlayerColor::Green => 2,
            PlayerColor::Yellow => 3,
        }
    }

    /// Lowercase name used by clients
    pub fn name(&self) -> &'static str {
        match self {
            PlayerColor::Red => "red",
            PlayerColor::Blue => "blue",
            PlayerColor::Green => "green",
            PlayerColor::Yellow => "yellow",
        }
    }

    /// Hex color code for rendering
    pub fn hex_code(&self) -> u32 {
        match self {
            PlayerColor::Red => 0xE74C3C,
            PlayerColor::Blue => 0x3498DB,
            PlayerColor::Green => 0x27AE60,
            PlayerColor::Yellow => 0xF1C40F,
        }
    }
}

/// Absolute path square where a color enters the board.
///
/// Entry squares are spread evenly around the path: 0, 10, 20, 30.
pub fn entry_offset(color: PlayerColor) -> i8 {
    color.seat() as i8 * (PATH_LENGTH / PLAYER_COUNT as i8)
}

/// Whether an absolute path square is safe from captures.
///
/// The four entry squares are the only safe squares.
pub fn is_safe_square(square: i8) -> bool {
    (0..PATH_LENGTH).contains(&square) && square % (PATH_LENGTH / PLAYER_COUNT as i8) == 0
}

/// Whether a logical step lies on the shared path
pub fn is_on_path(step: i8) -> bool {
    (0..PATH_LENGTH).contains(&step)
}

/// Whether a logical step lies inside the finishing lane
pub fn is_in_lane(step: i8) -> bool {
    (PATH_LENGTH..=LAST_SLOT).contains(&step)
}

/// Translate a logical step into an absolute shared-path square.
///
/// Returns `None` for base and finishing-lane positions, which are private to
/// their owner.
pub fn absolute_square(color: PlayerColor, step: i8) -> Option<i8> {
    if !is_on_path(step) {
        return None;
    }
    Some((step + entry_offset(color)) % PATH_LENGTH)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_offsets() {
        let offsets: Vec<i8> = PlayerColor::ALL.iter().map(|&c| entry_offset(c)).collect();
        assert_eq!(offsets, vec![0, 10, 20, 30]);
    }

    #[test]
    fn test_safe_squares_are_entries() {
        let safe: Vec<i8> = (0..PATH_LENGTH).filter(|&s| is_safe_square(s)).collect();
        assert_eq!(safe, vec![0, 10, 20, 30]);
        assert!(!is_safe_square(-1));
        assert!(!is_safe_square(PATH_LENGTH));
    }

    #[test]
    fn test_absolute_square_wraps() {
        assert_eq!(absolute_square(PlayerColor::Red, 5), Some(5));
        assert_eq!(absolute_square(PlayerColor::Blue, 35), Some(5));
        assert_eq!(absolute_square(PlayerColor::Yellow, 39), Some(29));
        assert_eq!(absolute_square(PlayerColor::Green, BASE), None);
        assert_eq!(absolute_square(PlayerColor::Green, PATH_LENGTH), None);
    }

    #[test]
    fn test_lane_bounds() {
        assert_eq!(LAST_SLOT, 43);
        assert!(is_in_lane(40));
        assert!(is_in_lane(43));
        assert!(!is_in_lane(44));
        assert!(!is_in_lane(39));
        assert!(is_on_path(0));
        assert!(!is_on_path(BASE));
    }

    #[test]
    fn test_color_seats_round_trip() {
        for id in 0..PLAYER_COUNT as PlayerId {
            assert_eq!(PlayerColor::for_player(id).seat(), id);
        }
    }
}
