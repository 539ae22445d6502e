//! WebAssembly bindings for the Ludo game engine.
//!
//! This module exposes a local hot-seat game to JavaScript through wasm-bindgen.

#[cfg(feature = "wasm")]
use wasm_bindgen::prelude::*;

#[cfg(feature = "wasm")]
use crate::actions::GameAction;
#[cfg(feature = "wasm")]
use crate::board::{PIECES_PER_PLAYER, PLAYER_COUNT};
#[cfg(feature = "wasm")]
use crate::bot::{Bot, BotDifficulty};
#[cfg(feature = "wasm")]
use crate::coordinator::TurnCoordinator;

/// Initialize panic hook for better error messages in browser console
#[cfg(feature = "wasm")]
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// WASM-exposed game wrapper
#[cfg(feature = "wasm")]
#[wasm_bindgen]
pub struct WasmGame {
    game: TurnCoordinator,
}

#[cfg(feature = "wasm")]
#[wasm_bindgen]
impl WasmGame {
    /// Create a new four-player game
    #[wasm_bindgen(constructor)]
    pub fn new() -> WasmGame {
        WasmGame {
            game: TurnCoordinator::new(),
        }
    }

    /// Get the current game state as JSON
    #[wasm_bindgen(js_name = getState)]
    pub fn get_state(&self) -> String {
        serde_json::to_string(&self.game.snapshot()).unwrap_or_else(|_| "{}".to_string())
    }

    /// Get the current player ID
    #[wasm_bindgen(js_name = getCurrentPlayer)]
    pub fn get_current_player(&self) -> u8 {
        self.game.current_player()
    }

    /// Get valid actions for the current player as JSON array
    #[wasm_bindgen(js_name = getValidActions)]
    pub fn get_valid_actions(&self) -> String {
        let actions = self.game.valid_actions(self.game.current_player());
        serde_json::to_string(&actions).unwrap_or_else(|_| "[]".to_string())
    }

    /// Roll for the current player, returns the update JSON or error
    pub fn roll(&mut self) -> Result<String, JsValue> {
        let update = self
            .game
            .roll(None)
            .map_err(|e| JsValue::from_str(&format!("Roll failed: {}", e)))?;
        Ok(serde_json::to_string(&update).unwrap_or_else(|_| "{}".to_string()))
    }

    /// Move a piece of the current player, returns the update JSON
    #[wasm_bindgen(js_name = movePiece)]
    pub fn move_piece(&mut self, piece: u8) -> Result<String, JsValue> {
        if piece as usize >= PIECES_PER_PLAYER {
            return Err(JsValue::from_str("Invalid piece id"));
        }
        let update = self.game.move_piece(self.game.current_player(), piece);
        Ok(serde_json::to_string(&update).unwrap_or_else(|_| "{}".to_string()))
    }

    /// Apply an action from JSON, returns events JSON or error
    #[wasm_bindgen(js_name = applyAction)]
    pub fn apply_action(&mut self, player: u8, action_json: &str) -> Result<String, JsValue> {
        let action: GameAction = serde_json::from_str(action_json)
            .map_err(|e| JsValue::from_str(&format!("Invalid action JSON: {}", e)))?;
        if player as usize >= PLAYER_COUNT {
            return Err(JsValue::from_str("Invalid player id"));
        }
        if let GameAction::MovePiece(piece) = action {
            if piece as usize >= PIECES_PER_PLAYER {
                return Err(JsValue::from_str("Invalid piece id"));
            }
        }

        match self.game.apply(player, action) {
            Ok(update) => Ok(serde_json::to_string(&update.events)
                .unwrap_or_else(|_| "[]".to_string())),
            Err(e) => Err(JsValue::from_str(&format!("Action failed: {}", e))),
        }
    }

    /// Start over with a fresh game
    pub fn reset(&mut self) {
        self.game.reset();
    }

    /// Check if the game is finished
    #[wasm_bindgen(js_name = isFinished)]
    pub fn is_finished(&self) -> bool {
        self.game.winner().is_some()
    }

    /// Get the winner (if game is finished)
    #[wasm_bindgen(js_name = getWinner)]
    pub fn get_winner(&self) -> Option<u8> {
        self.game.winner()
    }

    /// Get a bot's suggested action for a player
    /// difficulty: "Easy", "Medium", or "Hard"
    #[wasm_bindgen(js_name = getBotAction)]
    pub fn get_bot_action(&self, player: u8, difficulty: &str) -> String {
        let diff = difficulty.parse().unwrap_or(BotDifficulty::Medium);
        let mut bot = Bot::new(player, diff);
        match bot.choose_action(&self.game.snapshot().state) {
            Some(action) => serde_json::to_string(&action).unwrap_or_else(|_| "null".to_string()),
            None => "null".to_string(),
        }
    }
}

#[cfg(feature = "wasm")]
impl Default for WasmGame {
    fn default() -> Self {
        Self::new()
    }
}
