//! AI bot players.
//!
//! Bots fill empty seats. Difficulty levels:
//! - Easy: always moves the first movable piece
//! - Medium: random movable piece
//! - Hard: greedy heuristic (finish, capture, leave base, safety, progress)

use crate::actions::{GameAction, GameEvent};
use crate::board::{absolute_square, is_safe_square, PieceId, PlayerId};
use crate::game::GameState;
use rand::prelude::*;
use serde::{Deserialize, Serialize};

/// Bot difficulty level
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BotDifficulty {
    Easy,
    Medium,
    Hard,
}

impl std::str::FromStr for BotDifficulty {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(BotDifficulty::Easy),
            "medium" => Ok(BotDifficulty::Medium),
            "hard" => Ok(BotDifficulty::Hard),
            other => Err(format!("unknown bot difficulty: {}", other)),
        }
    }
}

/// A bot player that can decide on actions
pub struct Bot {
    pub player_id: PlayerId,
    pub difficulty: BotDifficulty,
    rng: StdRng,
}

impl Bot {
    pub fn new(player_id: PlayerId, difficulty: BotDifficulty) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::from_entropy(),
        }
    }

    pub fn with_seed(player_id: PlayerId, difficulty: BotDifficulty, seed: u64) -> Self {
        Self {
            player_id,
            difficulty,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Choose the next action, or `None` when it is not this bot's turn
    pub fn choose_action(&mut self, game: &GameState) -> Option<GameAction> {
        if game.game_over || game.current_player != self.player_id {
            return None;
        }
        if game.must_roll {
            return Some(GameAction::RollDice);
        }

        let movable = game.movable_pieces(self.player_id);
        let piece = match self.difficulty {
            BotDifficulty::Easy => movable.first().copied(),
            BotDifficulty::Medium => movable.choose(&mut self.rng).copied(),
            BotDifficulty::Hard => movable
                .iter()
                .copied()
                .max_by_key(|&piece| self.score_move(game, piece)),
        }?;

        Some(GameAction::MovePiece(piece))
    }

    /// Score a move by playing it on a copy of the state
    fn score_move(&self, game: &GameState, piece: PieceId) -> i32 {
        let mut sim = game.clone();
        let from = game.player(self.player_id).piece(piece).position;
        let Ok(events) = sim.move_piece(self.player_id, piece) else {
            return i32::MIN;
        };

        let mut score = 0;
        for event in &events {
            match event {
                GameEvent::GameOver { .. } => score += 10_000,
                GameEvent::PieceFinished { .. } => score += 1_000,
                GameEvent::PieceCaptured { .. } => score += 500,
                _ => {}
            }
        }

        let moved = sim.player(self.player_id).piece(piece);
        if from < 0 {
            score += 300;
        }
        let color = sim.player(self.player_id).color;
        if absolute_square(color, moved.position).is_some_and(is_safe_square) {
            score += 100;
        }
        score + moved.position as i32
    }
}
