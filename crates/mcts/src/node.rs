//! MCTS node types for tree storage.
//!
//! Uses arena allocation with indices for cache locality and simpler memory management.
//! A node never stores a board; its position is rebuilt by replaying moves.

use serde::{Deserialize, Serialize};

/// Exploitation term of an unvisited node.
pub const K_EXPLOIT_INIT: f64 = 1.0;

/// Exploration term of an unvisited node.
pub const K_EXPLORE_INIT: f64 = 1.0;

/// Index into the node arena.
///
/// This is a lightweight handle that references a node in the tree.
/// Using indices instead of pointers avoids Rc/RefCell overhead.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    /// The first node of the arena. It never has a parent.
    pub const ORIGIN: NodeId = NodeId(0);

    /// Position of the node in the arena.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Statistics for a single MCTS node.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NodeStats {
    /// Number of playouts accounted to this node.
    pub visit_count: u32,

    /// Sum of the [0, 1] scores of those playouts.
    pub score_sum: f64,
}

impl NodeStats {
    /// Mean score, or None if the node has never been visited.
    pub fn mean_score(&self) -> Option<f64> {
        if self.visit_count == 0 {
            None
        } else {
            Some(self.score_sum / self.visit_count as f64)
        }
    }
}

/// A node in the MCTS tree.
///
/// Each node represents the position reached by its path of moves and stores
/// statistics about the playouts run through it.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Node<M, P> {
    /// Move that led to this node (None for the first root).
    #[serde(rename = "move")]
    pub(crate) mv: Option<M>,

    /// Non-owning back-reference, used for replay and backpropagation.
    pub(crate) parent: Option<NodeId>,

    /// Player who acts from this position.
    pub(crate) player: P,

    /// Children in the order the board listed their moves.
    pub(crate) children: Vec<NodeId>,

    pub(crate) stats: NodeStats,

    /// Whether children have been generated (possibly none).
    pub(crate) explored: bool,
}

impl<M, P> Node<M, P> {
    /// Create a root node.
    pub fn root(player: P) -> Self {
        Self {
            mv: None,
            parent: None,
            player,
            children: Vec::new(),
            stats: NodeStats::default(),
            explored: false,
        }
    }

    /// Create a new unexplored child node.
    pub fn child(mv: M, parent: NodeId, player: P) -> Self {
        Self {
            mv: Some(mv),
            parent: Some(parent),
            ..Self::root(player)
        }
    }

    pub fn mv(&self) -> Option<&M> {
        self.mv.as_ref()
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn player(&self) -> &P {
        &self.player
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    pub fn stats(&self) -> &NodeStats {
        &self.stats
    }

    pub fn is_explored(&self) -> bool {
        self.explored
    }

    /// A leaf has been explored and has no children: a terminal position.
    pub fn is_leaf(&self) -> bool {
        self.explored && self.children.is_empty()
    }

    /// Add `simulations` playouts worth `score` in total.
    pub fn record_result(&mut self, score: f64, simulations: u32) {
        debug_assert!(score >= 0.0, "negative score {score}");
        self.stats.score_sum += score;
        self.stats.visit_count += simulations;
    }

    /// Forget the parent. Used when this node becomes a new root.
    pub fn detach_from_parent(&mut self) {
        self.parent = None;
    }

    /// Average observed score, or `K_EXPLOIT_INIT` when unvisited.
    pub fn exploitation_score(&self) -> f64 {
        self.stats.mean_score().unwrap_or(K_EXPLOIT_INIT)
    }

    /// Uncertainty bonus, or `K_EXPLORE_INIT` when unvisited.
    ///
    /// A parent with no visits is treated as visited once, giving no bonus.
    pub fn exploration_score(&self, parent_visits: u32, c: f64) -> f64 {
        if self.stats.visit_count == 0 {
            return K_EXPLORE_INIT;
        }
        let parent_visits = parent_visits.max(1) as f64;
        c * (parent_visits.ln() / self.stats.visit_count as f64).sqrt()
    }

    /// UCB1 = exploitation + exploration, given the parent's visit count.
    pub fn ucb_score(&self, parent_visits: u32, c: f64) -> f64 {
        self.exploitation_score() + self.exploration_score(parent_visits, c)
    }
}
