//! Turn coordinator.
//!
//! A [`TurnCoordinator`] is the single authority over one live game. Every
//! mutating call takes the game lock for the whole check-then-apply sequence,
//! so actions from concurrent sessions are applied one at a time and each one
//! sees the state left by the previous one. The die is drawn inside the lock.
//!
//! Share a coordinator between sessions with `Arc<TurnCoordinator>`; create
//! one per game.

use crate::actions::{GameAction, GameEvent};
use crate::board::{PieceId, PlayerId};
use crate::game::{GameError, GameState};
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

/// Result of a mutating call plus the events to broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Update<T> {
    pub result: T,
    /// Events in the order they happened
    pub events: Vec<GameEvent>,
    /// State generation after the call
    pub generation: u64,
}

/// Outcome of a successful roll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RollOutcome {
    pub player: PlayerId,
    pub value: u8,
}

/// Outcome of a move request.
///
/// Rejected moves are reported here rather than as errors; the state is
/// unchanged and `new_position == old_position`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveResult {
    pub applied: bool,
    pub old_position: i8,
    pub new_position: i8,
    pub rejected: Option<GameError>,
}

/// Read-only copy of the game for late joiners
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub generation: u64,
    pub state: GameState,
}

struct Inner {
    state: GameState,
    rng: StdRng,
    generation: u64,
}

/// Serializes all reads and writes of one game
pub struct TurnCoordinator {
    inner: Mutex<Inner>,
}

impl Default for TurnCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl TurnCoordinator {
    /// Start a fresh game with an entropy-seeded die
    pub fn new() -> Self {
        Self::with_rng(GameState::new(), StdRng::from_entropy())
    }

    /// Start a fresh game with a deterministic die
    pub fn with_seed(seed: u64) -> Self {
        Self::with_rng(GameState::new(), StdRng::seed_from_u64(seed))
    }

    /// Take over an existing state, e.g. a prepared test position
    pub fn from_state(state: GameState, seed: u64) -> Self {
        Self::with_rng(state, StdRng::seed_from_u64(seed))
    }

    fn with_rng(state: GameState, rng: StdRng) -> Self {
        Self {
            inner: Mutex::new(Inner {
                state,
                rng,
                generation: 0,
            }),
        }
    }

    // A panic can only happen on an id assertion, before any mutation, so a
    // poisoned lock still guards a consistent state.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Roll the die for the current player.
    ///
    /// When `player_hint` is given it must name the current player. If the
    /// roll leaves no legal move, the roll is given up in the same call and
    /// the resulting turn change is part of the returned events.
    pub fn roll(&self, player_hint: Option<PlayerId>) -> Result<Update<RollOutcome>, GameError> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let state = &mut inner.state;

        if state.game_over {
            return Err(GameError::GameOver);
        }
        let player = state.current_player;
        if player_hint.is_some_and(|hint| hint != player) {
            return Err(GameError::NotYourTurn);
        }

        let mut events = state.roll(&mut inner.rng)?;
        let value = state.dice_value;
        debug!(player, value, "dice rolled");

        if !state.must_roll && !state.has_legal_move(player) {
            debug!(player, value, "no legal move, passing");
            events.extend(state.pass_turn()?);
        }

        inner.generation += 1;
        Ok(Update {
            result: RollOutcome { player, value },
            events,
            generation: inner.generation,
        })
    }

    /// Move a piece by the current roll.
    ///
    /// # Panics
    ///
    /// Panics on a player or piece id outside `0..4`.
    pub fn move_piece(&self, player: PlayerId, piece: PieceId) -> Update<MoveResult> {
        let mut guard = self.lock();
        let inner = &mut *guard;
        let state = &mut inner.state;

        let old_position = state.player(player).piece(piece).position;

        match state.move_piece(player, piece) {
            Ok(events) => {
                let new_position = state.player(player).piece(piece).position;
                inner.generation += 1;
                debug!(player, piece, old_position, new_position, "piece moved");
                if let Some(winner) = state.winner {
                    info!(winner, "game over");
                }
                Update {
                    result: MoveResult {
                        applied: true,
                        old_position,
                        new_position,
                        rejected: None,
                    },
                    events,
                    generation: inner.generation,
                }
            }
            Err(e) => {
                debug!(player, piece, error = %e, "move rejected");
                Update {
                    result: MoveResult {
                        applied: false,
                        old_position,
                        new_position: old_position,
                        rejected: Some(e),
                    },
                    events: Vec::new(),
                    generation: inner.generation,
                }
            }
        }
    }

    /// Apply an action on behalf of `player`.
    ///
    /// The returned generation is the one the events were produced under.
    pub fn apply(&self, player: PlayerId, action: GameAction) -> Result<Update<()>, GameError> {
        match action {
            GameAction::RollDice => self.roll(Some(player)).map(|update| Update {
                result: (),
                events: update.events,
                generation: update.generation,
            }),
            GameAction::MovePiece(piece) => {
                let update = self.move_piece(player, piece);
                match update.result.rejected {
                    Some(e) => Err(e),
                    None => Ok(Update {
                        result: (),
                        events: update.events,
                        generation: update.generation,
                    }),
                }
            }
        }
    }

    /// Replace the game with a fresh one
    pub fn reset(&self) -> Update<()> {
        let mut guard = self.lock();
        guard.state = GameState::new();
        guard.generation += 1;
        info!(generation = guard.generation, "game reset");
        Update {
            result: (),
            events: vec![GameEvent::GameReset],
            generation: guard.generation,
        }
    }

    /// Copy of the current state
    pub fn snapshot(&self) -> Snapshot {
        let guard = self.lock();
        Snapshot {
            generation: guard.generation,
            state: guard.state.clone(),
        }
    }

    /// Valid actions for a player in the current state
    pub fn valid_actions(&self, player: PlayerId) -> Vec<GameAction> {
        self.lock().state.valid_actions(player)
    }

    /// Seat whose turn it is
    pub fn current_player(&self) -> PlayerId {
        self.lock().state.current_player
    }

    /// Winner, once the game is over
    pub fn winner(&self) -> Option<PlayerId> {
        self.lock().state.get_winner()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::BASE;

    #[test]
    fn test_roll_with_wrong_hint_rejected() {
        let coordinator = TurnCoordinator::with_seed(7);
        assert_eq!(coordinator.roll(Some(2)), Err(GameError::NotYourTurn));
        assert_eq!(coordinator.snapshot().generation, 0);
    }

    #[test]
    fn test_roll_from_fresh_game() {
        let coordinator = TurnCoordinator::with_seed(7);
        let update = coordinator.roll(Some(0)).unwrap();
        assert_eq!(update.result.player, 0);
        assert!((1..=6).contains(&update.result.value));
        assert_eq!(update.generation, 1);

        let snapshot = coordinator.snapshot();
        if update.result.value == 6 {
            assert!(!snapshot.state.must_roll);
            assert_eq!(snapshot.state.current_player, 0);
        } else {
            // Nothing can leave base, so the roll is given up automatically
            assert!(snapshot.state.must_roll);
            assert_eq!(snapshot.state.current_player, 1);
            assert!(update.events.contains(&GameEvent::NoLegalMove {
                player: 0,
                value: update.result.value
            }));
        }
    }

    #[test]
    fn test_rejected_move_reports_positions() {
        let coordinator = TurnCoordinator::with_seed(1);
        let update = coordinator.move_piece(0, 0);
        assert_eq!(
            update.result,
            MoveResult {
                applied: false,
                old_position: BASE,
                new_position: BASE,
                rejected: Some(GameError::MustRollFirst),
            }
        );
        assert!(update.events.is_empty());
        assert_eq!(update.generation, 0);
    }

    #[test]
    fn test_applied_move() {
        let mut state = GameState::new();
        state.players[0].pieces[3].position = 12;
        state.apply_roll(4).unwrap();
        let coordinator = TurnCoordinator::from_state(state, 3);

        let update = coordinator.move_piece(0, 3);
        assert!(update.result.applied);
        assert_eq!(update.result.old_position, 12);
        assert_eq!(update.result.new_position, 16);
        assert_eq!(update.events.last(), Some(&GameEvent::NextPlayer { player: 1 }));
        assert_eq!(coordinator.current_player(), 1);
    }

    #[test]
    fn test_reset_replaces_state() {
        let mut state = GameState::new();
        state.players[2].pieces[0].position = 20;
        state.current_player = 2;
        let coordinator = TurnCoordinator::from_state(state, 3);

        let update = coordinator.reset();
        assert_eq!(update.events, vec![GameEvent::GameReset]);
        let snapshot = coordinator.snapshot();
        assert_eq!(snapshot.state, GameState::new());
        assert_eq!(snapshot.generation, 1);
    }

    #[test]
    fn test_apply_maps_rejection_to_error() {
        let coordinator = TurnCoordinator::with_seed(5);
        assert_eq!(
            coordinator.apply(0, GameAction::MovePiece(1)),
            Err(GameError::MustRollFirst)
        );
        let update = coordinator.apply(0, GameAction::RollDice).unwrap();
        assert_eq!(update.generation, 1);
        assert_eq!(coordinator.snapshot().generation, 1);
    }
}
