//! Arena-allocated MCTS tree.
//!
//! Using a Vec<Node> with indices provides better cache locality
//! and simpler ownership compared to Rc<RefCell<Node>>. Children are owned
//! through the arena; parents are plain indices.
//!
//! The tree tracks two special nodes:
//! - the origin (`NodeId::ORIGIN`), the first node kept in the arena, reached
//!   from the game's initial position by the `prefix` moves;
//! - the search root, the node matching the live board position.
//!
//! With history retained the origin is the very first root and `prefix` is
//! empty. Otherwise every root advancement compacts the arena so that the new
//! root becomes the origin and the discarded moves move into `prefix`.

use crate::error::Result;
use crate::node::{Node, NodeId};
use crate::replay::ReplayGuard;
use std::collections::VecDeque;
use std::fmt::Debug;
use uct_core::Board;

/// Arena-allocated MCTS tree.
#[derive(Clone, Debug)]
pub struct Tree<M, P> {
    nodes: Vec<Node<M, P>>,
    root: NodeId,
    prefix: Vec<M>,
    /// Player whose results the origin holds.
    origin_mover: P,
}

impl<M, P> Tree<M, P>
where
    M: Clone + Eq + Debug,
    P: Clone + Eq + Debug,
{
    /// Create a tree holding a single unexplored root.
    pub fn new(player: P) -> Self {
        Self {
            nodes: vec![Node::root(player.clone())],
            root: NodeId::ORIGIN,
            prefix: Vec::new(),
            origin_mover: player,
        }
    }

    /// Build a chain of unexplored nodes following the board's move history.
    ///
    /// The first node is the initial position; the last one, matching the live
    /// position, becomes the search root.
    pub fn from_history<B>(board: &mut B) -> Result<Self>
    where
        B: Board<Move = M, Player = P>,
    {
        let history = board.move_history();
        let initial_player = {
            let guard = ReplayGuard::from_initial(board, &[])?;
            guard.current_player()
        };

        let mut tree = Self::new(initial_player);
        let mut node = NodeId::ORIGIN;
        for mv in history {
            let player = board.next_player(tree.get(node).player());
            node = tree.add_child(node, mv, player);
        }
        tree.root = node;
        Ok(tree)
    }

    /// Reassemble a tree from deserialized parts. Indices must already be valid.
    pub(crate) fn from_parts(nodes: Vec<Node<M, P>>, prefix: Vec<M>, origin_mover: P) -> Self {
        Self {
            nodes,
            root: NodeId::ORIGIN,
            prefix,
            origin_mover,
        }
    }

    /// Get a reference to a node by ID.
    ///
    /// # Panics
    /// Panics if the NodeId is invalid.
    pub fn get(&self, id: NodeId) -> &Node<M, P> {
        &self.nodes[id.0]
    }

    pub(crate) fn get_mut(&mut self, id: NodeId) -> &mut Node<M, P> {
        &mut self.nodes[id.0]
    }

    /// The node matching the live board position.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn set_root(&mut self, id: NodeId) {
        self.root = id;
    }

    /// Moves from the game's initial position to the origin.
    pub fn prefix(&self) -> &[M] {
        &self.prefix
    }

    pub(crate) fn nodes(&self) -> &[Node<M, P>] {
        &self.nodes
    }

    /// Get the number of nodes in the tree.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if the tree is empty (should never be true as the origin always exists).
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// All node IDs, origin first.
    pub fn node_ids(&self) -> impl Iterator<Item = NodeId> {
        (0..self.nodes.len()).map(NodeId)
    }

    /// Append an unexplored child without touching the parent's `explored` flag.
    pub(crate) fn add_child(&mut self, parent: NodeId, mv: M, player: P) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node::child(mv, parent, player));
        self.get_mut(parent).children.push(id);
        id
    }

    /// Child of `id` reached by `mv`, if any.
    pub fn find_child(&self, id: NodeId, mv: &M) -> Option<NodeId> {
        self.get(id)
            .children
            .iter()
            .copied()
            .find(|&child| self.get(child).mv.as_ref() == Some(mv))
    }

    /// UCB1 score of a node. None for a node without a parent.
    pub fn ucb_score(&self, id: NodeId, c: f64) -> Option<f64> {
        let node = self.get(id);
        let parent = self.get(node.parent?);
        Some(node.ucb_score(parent.stats.visit_count, c))
    }

    /// Child with the highest UCB1 score, first one on ties.
    /// Returns `id` itself when it has no children.
    pub fn best_child_by_ucb(&self, id: NodeId, c: f64) -> NodeId {
        let node = self.get(id);
        let parent_visits = node.stats.visit_count;

        let mut best = id;
        let mut best_ucb = f64::NEG_INFINITY;
        for &child_id in &node.children {
            let ucb = self.get(child_id).ucb_score(parent_visits, c);
            if ucb > best_ucb {
                best_ucb = ucb;
                best = child_id;
            }
        }
        best
    }

    /// Move of the most visited child, first one on ties.
    pub fn best_known_move(&self, id: NodeId) -> Option<&M> {
        let mut best: Option<&Node<M, P>> = None;
        for &child_id in &self.get(id).children {
            let child = self.get(child_id);
            if best.map_or(true, |b| child.stats.visit_count > b.stats.visit_count) {
                best = Some(child);
            }
        }
        best.and_then(|node| node.mv.as_ref())
    }

    /// Moves from the search root down to `id`, oldest first.
    ///
    /// For a node outside the root's subtree the walk ends at the origin.
    pub fn path_moves(&self, id: NodeId) -> Vec<M> {
        self.collect_path(id, Some(self.root))
    }

    /// Moves from the game's initial position down to `id`, oldest first.
    pub fn full_path(&self, id: NodeId) -> Vec<M> {
        let mut moves = self.prefix.clone();
        moves.extend(self.collect_path(id, None));
        moves
    }

    fn collect_path(&self, id: NodeId, stop: Option<NodeId>) -> Vec<M> {
        let mut moves = Vec::new();
        let mut current = id;
        while Some(current) != stop {
            let node = self.get(current);
            match (node.parent, &node.mv) {
                (Some(parent), Some(mv)) => {
                    moves.push(mv.clone());
                    current = parent;
                }
                _ => break,
            }
        }
        moves.reverse();
        moves
    }

    /// Create one child per legal move of the node's position.
    ///
    /// The board must be at the search root's position; it is back there when
    /// this returns. Does nothing on an explored node. Returns the number of
    /// children created, zero for a terminal position. Existing children are kept.
    pub fn expand<B>(&mut self, id: NodeId, board: &mut B) -> Result<usize>
    where
        B: Board<Move = M, Player = P>,
    {
        if self.get(id).explored {
            return Ok(0);
        }

        let path = self.path_moves(id);
        let moves = {
            let guard = ReplayGuard::enter(board, &path)?;
            guard.possible_moves()
        };

        // A root advanced before it was explored already holds the played move.
        let child_player = board.next_player(self.get(id).player());
        let mut created = 0;
        for mv in moves {
            if self.find_child(id, &mv).is_none() {
                self.add_child(id, mv, child_player.clone());
                created += 1;
            }
        }
        self.get_mut(id).explored = true;
        Ok(created)
    }

    pub fn record_result(&mut self, id: NodeId, score: f64, simulations: u32) {
        self.get_mut(id).record_result(score, simulations);
    }

    /// Record a result on every strict ancestor of `id`, up to the search root.
    ///
    /// Nodes above the root are positions already played; they keep the
    /// statistics they had when the root moved past them.
    pub fn propagate_to_ancestors(&mut self, id: NodeId, score: f64, simulations: u32) {
        self.propagate_scored(id, simulations, |_| score);
    }

    /// Like [`Tree::propagate_to_ancestors`], but each ancestor records the
    /// score of the player who moved into it.
    pub fn propagate_scored<F>(&mut self, id: NodeId, simulations: u32, mut score_for: F)
    where
        F: FnMut(&P) -> f64,
    {
        let mut current = id;
        while current != self.root {
            let Some(ancestor) = self.get(current).parent else {
                break;
            };
            let score = score_for(self.mover(ancestor));
            self.get_mut(ancestor).record_result(score, simulations);
            current = ancestor;
        }
    }

    /// Player whose results a node's statistics hold: the one who played the
    /// move into it. The first root of a game uses its own player; a rerooted
    /// origin keeps the mover it had before.
    pub fn mover(&self, id: NodeId) -> &P {
        match self.get(id).parent {
            Some(parent) => &self.get(parent).player,
            None => &self.origin_mover,
        }
    }

    pub(crate) fn origin_mover(&self) -> &P {
        &self.origin_mover
    }

    pub fn detach_from_parent(&mut self, id: NodeId) {
        self.get_mut(id).detach_from_parent();
    }

    /// Make `id` the origin and the root, reclaiming everything outside its subtree.
    ///
    /// The subtree keeps its statistics and child order; the moves leading
    /// to `id` are appended to the prefix.
    pub fn reroot(&mut self, id: NodeId) {
        let discarded = self.collect_path(id, None);
        self.prefix.extend(discarded);
        self.origin_mover = self.mover(id).clone();
        self.detach_from_parent(id);
        self.compact(id);
    }

    /// Copy the subtree under `keep` into a fresh arena in breadth-first order.
    fn compact(&mut self, keep: NodeId) {
        let mut old: Vec<Option<Node<M, P>>> =
            std::mem::take(&mut self.nodes).into_iter().map(Some).collect();
        let mut nodes = Vec::new();
        let mut queue = VecDeque::from([(keep, None)]);

        while let Some((old_id, new_parent)) = queue.pop_front() {
            let Some(mut node) = old.get_mut(old_id.0).and_then(Option::take) else {
                continue;
            };
            let new_id = NodeId(nodes.len());
            for child in std::mem::take(&mut node.children) {
                queue.push_back((child, Some(new_id)));
            }
            node.parent = new_parent;
            if let Some(parent) = new_parent {
                let parent: &mut Node<M, P> = &mut nodes[parent.0];
                parent.children.push(new_id);
            }
            nodes.push(node);
        }

        self.nodes = nodes;
        self.root = NodeId::ORIGIN;
    }
}
