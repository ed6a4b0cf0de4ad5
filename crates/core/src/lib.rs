//! UCT Core - Board abstraction and common types
//!
//! This crate provides the `Board` trait that any game must implement to be
//! searched by the UCT engine in `uct_mcts`.
//!
//! # Types
//!
//! - [`Board`] - Trait for mutable game positions
//! - [`Score`] - Game outcome for one player in [0, 1]
//! - [`BoardError`] - Contract violations reported by a board

mod board;
mod error;
mod types;

pub use board::Board;
pub use error::{BoardError, Result};
pub use types::Score;
