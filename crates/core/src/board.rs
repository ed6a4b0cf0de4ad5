use crate::Result;
use std::fmt::Debug;

/// A mutable game position the search engine can drive.
///
/// The board is the only component that knows the rules. It holds exactly one
/// position and is mutated in place; the engine brings it into other positions
/// by replaying moves and restores it afterwards with [`Board::reset`] followed
/// by a replay of the saved [`Board::move_history`].
pub trait Board {
    /// A game move (e.g., a cell index)
    type Move: Clone + Eq + Debug;

    /// A participant in the game
    type Player: Clone + Eq + Debug;

    /// Returns the legal moves from the current position. Empty iff terminal.
    fn possible_moves(&self) -> Vec<Self::Move>;

    /// Returns the player who acts from the current position
    fn current_player(&self) -> Self::Player;

    /// Turn order: the player acting after `player`. Must be pure.
    fn next_player(&self, player: &Self::Player) -> Self::Player;

    /// Plays a move on the current position.
    ///
    /// # Errors
    /// Returns `BoardError::IllegalMove` if the move is not legal here.
    fn apply_move(&mut self, mv: &Self::Move) -> Result<()>;

    /// Returns true if the game has ended
    fn is_terminal(&self) -> bool;

    /// Returns the outcome for `player` in `[0, 1]`:
    /// - `1.0` for a win
    /// - `0.0` for a loss
    /// - anything in between for a draw or partial credit
    ///
    /// # Errors
    /// Returns `BoardError::NotTerminal` if the game is still running.
    fn score(&self, player: &Self::Player) -> Result<f64>;

    /// Returns the board to the initial position, clearing the move history
    fn reset(&mut self);

    /// Moves applied since the initial position, oldest first
    fn move_history(&self) -> Vec<Self::Move>;

    /// Plays a sequence of moves, stopping at the first illegal one.
    fn apply_moves(&mut self, moves: &[Self::Move]) -> Result<()> {
        for mv in moves {
            self.apply_move(mv)?;
        }
        Ok(())
    }
}
