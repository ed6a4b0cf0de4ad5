//! MCTS configuration parameters.
//!
//! These parameters control the behavior of the Monte Carlo Tree Search algorithm.
//! They are passed explicitly to each controller; there is no process-wide state.

use std::f64::consts::SQRT_2;

/// Default UCB1 exploration constant.
pub const DEFAULT_EXPLORATION: f64 = SQRT_2;

/// Default number of random playouts per simulated child.
pub const DEFAULT_ROLLOUTS: u32 = 5;

/// MCTS configuration parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct MctsConfig {
    /// UCB1 exploration constant `c`.
    /// Part of the formula: mean + c * sqrt(ln(N_parent) / N_child)
    pub exploration_constant: f64,

    /// Random playouts run for each simulated child by `Mcts::learn_default`.
    pub rollouts_per_expansion: u32,

    /// Simulate every child created by an expansion.
    /// When false only the UCB-best new child is simulated.
    pub simulate_all_children: bool,

    /// Keep the whole tree from the very first root when the root advances.
    /// Required for saving a tree that can be realigned to any point of a game.
    /// When false, ancestors and siblings are reclaimed on every advance.
    pub retain_history: bool,
}

impl Default for MctsConfig {
    fn default() -> Self {
        Self {
            exploration_constant: DEFAULT_EXPLORATION,
            rollouts_per_expansion: DEFAULT_ROLLOUTS,
            simulate_all_children: true,
            retain_history: false,
        }
    }
}

impl MctsConfig {
    /// Create a new config with the specified exploration constant.
    pub fn with_exploration(exploration_constant: f64) -> Self {
        Self {
            exploration_constant,
            ..Default::default()
        }
    }

    /// Create a config that keeps the full tree so it can be saved and reloaded.
    pub fn for_persistence() -> Self {
        Self {
            retain_history: true,
            ..Default::default()
        }
    }

    /// Set the number of playouts per simulated child.
    pub fn rollouts(mut self, rollouts_per_expansion: u32) -> Self {
        self.rollouts_per_expansion = rollouts_per_expansion;
        self
    }

    /// Simulate only the UCB-best child of each expansion.
    pub fn simulate_best_child_only(mut self) -> Self {
        self.simulate_all_children = false;
        self
    }
}
