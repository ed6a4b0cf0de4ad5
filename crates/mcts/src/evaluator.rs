//! Evaluation abstraction for MCTS.
//!
//! The `Evaluator` trait is the simulation phase's strategy: given the board
//! in some position, produce a [0, 1] score for each player whose results the
//! search is about to record. The search ships
//! with `RolloutEvaluator`, a uniform-random playout; other policies plug in
//! without touching the search loop.

use rand::Rng;
use uct_core::{Board, Score};

/// Trait for evaluating positions by simulation.
pub trait Evaluator<B: Board> {
    /// Estimate the value of the board's current position for each of
    /// `players`, returned in the same order.
    ///
    /// The board may be left in any position; the caller restores it.
    ///
    /// # Errors
    /// Propagates board contract violations (illegal move, score out of range).
    fn evaluate(&mut self, board: &mut B, players: &[B::Player]) -> uct_core::Result<Vec<Score>>;
}

/// Evaluator using uniformly random playouts.
///
/// Plays uniformly random legal moves until the board reports a terminal
/// position, then reads the board's score for every requested player.
#[derive(Clone, Debug)]
pub struct RolloutEvaluator<R: Rng> {
    /// Random number generator, injected so that tests can seed it.
    rng: R,
}

impl<R: Rng> RolloutEvaluator<R> {
    /// Create a new rollout evaluator.
    pub fn new(rng: R) -> Self {
        Self { rng }
    }
}

impl<B: Board, R: Rng> Evaluator<B> for RolloutEvaluator<R> {
    fn evaluate(&mut self, board: &mut B, players: &[B::Player]) -> uct_core::Result<Vec<Score>> {
        while !board.is_terminal() {
            let moves = board.possible_moves();
            if moves.is_empty() {
                // score() reports the broken contract below
                break;
            }

            // Random move
            let idx = self.rng.gen_range(0..moves.len());
            board.apply_move(&moves[idx])?;
        }

        players
            .iter()
            .map(|player| board.score(player).and_then(Score::new))
            .collect()
    }
}
