//! Monte Carlo Tree Search with UCB1 selection.
//!
//! This crate provides a game-agnostic UCT engine for any board implementing
//! the `uct_core::Board` trait. One controller follows one game: it learns by
//! running search passes, proposes the most visited move, and keeps the
//! relevant part of its tree when the game advances.
//!
//! # Features
//!
//! - **Generic**: Works with any `Board` implementation
//! - **UCB1 Selection**: Unvisited children are tried before any revisit
//! - **Evaluator Abstraction**: Random playouts by default, with an injected RNG
//! - **Tree Reuse**: Statistics below the played move survive root advancement
//! - **Persistence**: Trees are saved as MessagePack and realigned on load
//!
//! # Example
//!
//! ```
//! use uct_mcts::{Mcts, MctsConfig, RolloutEvaluator, games::TicTacToeBoard};
//! use rand::SeedableRng;
//! use rand_chacha::ChaCha8Rng;
//!
//! let evaluator = RolloutEvaluator::new(ChaCha8Rng::seed_from_u64(42));
//! let mut mcts = Mcts::new(TicTacToeBoard::new(), MctsConfig::default(), evaluator)?;
//!
//! mcts.learn(200, 5)?;
//! let mv = mcts.best_known_move().expect("the opening position has moves");
//! mcts.advance_root(&mv)?;
//! println!("Played {mv}, root visits: {}", mcts.root_stats().visit_count);
//! # Ok::<(), uct_mcts::MctsError>(())
//! ```

pub mod config;
pub mod error;
pub mod evaluator;
pub mod games;
pub mod node;
mod replay;
pub mod search;
pub mod store;
pub mod tree;

pub use config::MctsConfig;
pub use error::{MctsError, Result};
pub use evaluator::{Evaluator, RolloutEvaluator};
pub use node::{Node, NodeId, NodeStats};
pub use search::{ChildSummary, Mcts};
pub use store::TreeStore;
pub use tree::Tree;
