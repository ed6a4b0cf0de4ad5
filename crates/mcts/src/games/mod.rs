//! Reference boards for MCTS validation.
//!
//! These games are small enough to check search behavior exactly and
//! are used by the tests and the command-line arena.

pub mod race;
pub mod tictactoe;

pub use race::{RaceBoard, Seat, Step};
pub use tictactoe::{Mark, TicTacToeBoard, TicTacToeMove};
