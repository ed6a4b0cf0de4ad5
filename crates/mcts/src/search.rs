//! Monte Carlo Tree Search controller.
//!
//! Implements UCT: UCB1 selection, one expansion per pass, random playouts
//! from the new children, and backpropagation of the aggregated result.
//! One controller follows one game: it owns the board, and the root is
//! advanced as real moves are played so the accumulated statistics are reused.

use crate::{
    config::MctsConfig,
    error::{MctsError, Result},
    evaluator::Evaluator,
    node::{NodeId, NodeStats},
    replay::ReplayGuard,
    store::TreeStore,
    tree::Tree,
};
use serde::{de::DeserializeOwned, Serialize};
use std::fs;
use std::path::Path;
use tracing::{debug, trace, warn};
use uct_core::{Board, Score};

/// Statistics of one root child, as reported to callers.
#[derive(Clone, Debug, PartialEq)]
pub struct ChildSummary<M> {
    pub mv: M,
    pub visit_count: u32,
    pub score_sum: f64,
}

/// Score sums of one pass, kept per player since each node records results
/// for the player who moved into it.
struct PassTotals<P> {
    players: Vec<P>,
    sums: Vec<f64>,
    simulations: u32,
}

impl<P: PartialEq> PassTotals<P> {
    fn new(players: Vec<P>) -> Self {
        let sums = vec![0.0; players.len()];
        Self {
            players,
            sums,
            simulations: 0,
        }
    }

    /// Add `scores`, aligned with `players`, counted `times` times.
    fn add(&mut self, scores: &[Score], times: u32) {
        for (sum, score) in self.sums.iter_mut().zip(scores) {
            *sum += score.get() * f64::from(times);
        }
        self.simulations += times;
    }

    /// The entry of `scores` belonging to `player`.
    fn pick(&self, player: &P, scores: &[Score]) -> f64 {
        self.players
            .iter()
            .position(|p| p == player)
            .and_then(|i| scores.get(i))
            .map_or(0.0, |score| score.get())
    }

    fn sum_for(&self, player: &P) -> f64 {
        self.players
            .iter()
            .position(|p| p == player)
            .map_or(0.0, |i| self.sums[i])
    }
}

/// Monte Carlo Tree Search controller.
///
/// Generic over:
/// - `B`: The board being played
/// - `E`: The simulation strategy (random rollouts by default)
pub struct Mcts<B: Board, E> {
    config: MctsConfig,
    evaluator: E,
    board: B,
    tree: Tree<B::Move, B::Player>,
}

impl<B, E> Mcts<B, E>
where
    B: Board,
    E: Evaluator<B>,
{
    /// Create a controller for the game currently on `board`.
    ///
    /// Moves already played on the board become a chain of unexplored nodes
    /// from the initial position; the last one is the search root.
    pub fn new(mut board: B, config: MctsConfig, evaluator: E) -> Result<Self> {
        let mut tree = Tree::from_history(&mut board)?;
        if !config.retain_history {
            tree.reroot(tree.root());
        }
        let mut mcts = Self {
            config,
            evaluator,
            board,
            tree,
        };
        mcts.settle_terminal_root()?;
        Ok(mcts)
    }

    /// Expand the root of a finished game so that it reads as a leaf.
    fn settle_terminal_root(&mut self) -> Result<()> {
        if self.board.is_terminal() {
            let root = self.tree.root();
            self.tree.expand(root, &mut self.board)?;
        }
        Ok(())
    }

    pub fn config(&self) -> &MctsConfig {
        &self.config
    }

    /// The live board. It always sits at the search root's position.
    pub fn board(&self) -> &B {
        &self.board
    }

    pub fn tree(&self) -> &Tree<B::Move, B::Player> {
        &self.tree
    }

    /// Give back the board, dropping the tree.
    pub fn into_board(self) -> B {
        self.board
    }

    /// Number of nodes held in the arena.
    pub fn tree_size(&self) -> usize {
        self.tree.len()
    }

    pub fn root_stats(&self) -> &NodeStats {
        self.tree.get(self.tree.root()).stats()
    }

    /// Per-child statistics of the root, in child order.
    pub fn root_children(&self) -> Vec<ChildSummary<B::Move>> {
        let root = self.tree.get(self.tree.root());
        root.children()
            .iter()
            .filter_map(|&id| {
                let child = self.tree.get(id);
                child.mv().map(|mv| ChildSummary {
                    mv: mv.clone(),
                    visit_count: child.stats().visit_count,
                    score_sum: child.stats().score_sum,
                })
            })
            .collect()
    }

    /// Move of the most visited root child, None if the root has no children.
    pub fn best_known_move(&self) -> Option<B::Move> {
        self.tree.best_known_move(self.tree.root()).cloned()
    }

    /// Run `iterations` passes with the configured number of playouts.
    pub fn learn_default(&mut self, iterations: usize) -> Result<()> {
        self.learn(iterations, self.config.rollouts_per_expansion)
    }

    /// Run `iterations` passes of selection, expansion, simulation and
    /// backpropagation, with `rollouts_per_expansion` playouts per simulated child.
    ///
    /// # Errors
    /// Only board contract violations; they leave the tree usable but are
    /// not expected from a correct board.
    pub fn learn(&mut self, iterations: usize, rollouts_per_expansion: u32) -> Result<()> {
        for _ in 0..iterations {
            self.learn_once(rollouts_per_expansion)?;
        }
        debug!(
            iterations,
            rollouts_per_expansion,
            root_visits = self.root_stats().visit_count,
            tree_size = self.tree.len(),
            "learn finished"
        );
        Ok(())
    }

    fn learn_once(&mut self, rollouts: u32) -> Result<()> {
        let c = self.config.exploration_constant;

        // SELECT: descend until an unexplored node or a terminal leaf
        let mut node = self.tree.root();
        let mut depth = 0usize;
        loop {
            let current = self.tree.get(node);
            if !current.is_explored() || current.is_leaf() {
                break;
            }
            node = self.tree.best_child_by_ucb(node, c);
            depth += 1;
        }

        // EXPAND
        let created = self.tree.expand(node, &mut self.board)?;

        // SIMULATE
        let mut totals = PassTotals::new(self.perspectives(node));
        if self.tree.get(node).is_leaf() {
            self.score_terminal(node, rollouts, &mut totals)?;
        } else if self.config.simulate_all_children {
            let children = self.tree.get(node).children().to_vec();
            for child in children {
                self.simulate(child, rollouts, &mut totals)?;
            }
        } else {
            let child = self.tree.best_child_by_ucb(node, c);
            self.simulate(child, rollouts, &mut totals)?;
        }

        // BACKPROPAGATE: the expanded node, then every ancestor up to the root
        let simulations = totals.simulations;
        let own = totals.sum_for(self.tree.mover(node));
        self.tree.record_result(node, own, simulations);
        self.tree
            .propagate_scored(node, simulations, |mover| totals.sum_for(mover));

        trace!(depth, created, own, simulations, "learn pass");
        Ok(())
    }

    /// Players whose results are recorded by a pass ending at `node`: the
    /// movers of `node` and of each of its ancestors, plus the player to act
    /// at `node`, who moves into its children.
    fn perspectives(&self, node: NodeId) -> Vec<B::Player> {
        let mut players = vec![self.tree.get(node).player().clone()];
        let mut current = Some(node);
        while let Some(id) = current {
            let mover = self.tree.mover(id);
            if !players.contains(mover) {
                players.push(mover.clone());
            }
            current = if id == self.tree.root() {
                None
            } else {
                self.tree.get(id).parent()
            };
        }
        players
    }

    /// Random playouts from a child, each recorded on the child for its mover.
    fn simulate(
        &mut self,
        child: NodeId,
        rollouts: u32,
        totals: &mut PassTotals<B::Player>,
    ) -> Result<()> {
        let path = self.tree.path_moves(child);
        let mover = self.tree.mover(child).clone();

        for _ in 0..rollouts {
            let scores = {
                let mut guard = ReplayGuard::enter(&mut self.board, &path)?;
                self.evaluator.evaluate(&mut *guard, &totals.players)?
            };
            self.tree.record_result(child, totals.pick(&mover, &scores), 1);
            totals.add(&scores, 1);
        }
        Ok(())
    }

    /// Exact outcome of a terminal leaf, counted as `rollouts` playouts.
    /// Nothing is recorded here; the caller backpropagates.
    fn score_terminal(
        &mut self,
        leaf: NodeId,
        rollouts: u32,
        totals: &mut PassTotals<B::Player>,
    ) -> Result<()> {
        let path = self.tree.path_moves(leaf);
        let scores = {
            let guard = ReplayGuard::enter(&mut self.board, &path)?;
            totals
                .players
                .iter()
                .map(|player| guard.score(player).and_then(Score::new))
                .collect::<uct_core::Result<Vec<_>>>()?
        };
        totals.add(&scores, rollouts);
        Ok(())
    }

    /// Follow a move actually played in the game, by either side.
    ///
    /// The move is applied to the board. An explored root keeps the matching
    /// child's subtree and statistics; an unexplored root gets a fresh child.
    ///
    /// # Errors
    /// - `MctsError::TerminalRoot` if the root is a terminal leaf
    /// - `MctsError::UnknownMove` if the root is explored and has no such child
    /// - `MctsError::Board` if the board rejects the move
    pub fn advance_root(&mut self, mv: &B::Move) -> Result<()> {
        let root = self.tree.root();
        let root_node = self.tree.get(root);
        if root_node.is_leaf() {
            return Err(MctsError::TerminalRoot);
        }

        let existing = self.tree.find_child(root, mv);
        if existing.is_none() && root_node.is_explored() {
            return Err(MctsError::UnknownMove(format!("{mv:?}")));
        }
        let child_player = self.board.next_player(root_node.player());

        self.board.apply_move(mv)?;

        let new_root = match existing {
            Some(child) => child,
            None => self.tree.add_child(root, mv.clone(), child_player),
        };
        // A retained root keeps its parent link for saving; backpropagation
        // stops at it.
        if self.config.retain_history {
            self.tree.set_root(new_root);
        } else {
            self.tree.reroot(new_root);
        }

        self.settle_terminal_root()?;

        debug!(
            mv = ?mv,
            reused = existing.is_some(),
            root_visits = self.root_stats().visit_count,
            tree_size = self.tree.len(),
            "root advanced"
        );
        Ok(())
    }

    /// Serialize the tree from its origin, see [`TreeStore::save`].
    pub fn save_to_bytes(&self) -> Result<Vec<u8>>
    where
        B::Move: Serialize,
        B::Player: Serialize,
    {
        TreeStore::save(&self.tree)
    }

    /// Write the tree to `path`.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()>
    where
        B::Move: Serialize,
        B::Player: Serialize,
    {
        let bytes = self.save_to_bytes()?;
        fs::write(path.as_ref(), bytes)?;
        debug!(path = %path.as_ref().display(), nodes = self.tree.len(), "tree saved");
        Ok(())
    }

    /// Replace the tree with a saved one, realigned to the board's move history.
    ///
    /// A tree from a different game is discarded: the controller continues
    /// with a fresh tree for the current history.
    ///
    /// # Errors
    /// Decoding failures and corrupt trees. A mismatching tree is not an error.
    pub fn load_from_bytes(&mut self, bytes: &[u8]) -> Result<()>
    where
        B::Move: DeserializeOwned,
        B::Player: DeserializeOwned,
    {
        let history = self.board.move_history();
        let board = &self.board;
        let mut tree = match TreeStore::load(bytes, &history, |player| board.next_player(player)) {
            Ok(tree) => tree,
            Err(MctsError::LoadMismatch) => {
                warn!(
                    history_len = history.len(),
                    "saved tree does not match this game, starting a fresh tree"
                );
                Tree::from_history(&mut self.board)?
            }
            Err(err) => return Err(err),
        };
        if !self.config.retain_history {
            tree.reroot(tree.root());
        }
        self.tree = tree;
        self.settle_terminal_root()?;
        debug!(
            root_visits = self.root_stats().visit_count,
            tree_size = self.tree.len(),
            "tree loaded"
        );
        Ok(())
    }

    /// Read a tree from `path`, see [`Mcts::load_from_bytes`].
    pub fn load(&mut self, path: impl AsRef<Path>) -> Result<()>
    where
        B::Move: DeserializeOwned,
        B::Player: DeserializeOwned,
    {
        let bytes = fs::read(path.as_ref())?;
        self.load_from_bytes(&bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::RolloutEvaluator;
    use crate::games::{Mark, RaceBoard, Seat, Step, TicTacToeBoard, TicTacToeMove};
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    type RaceMcts = Mcts<RaceBoard, RolloutEvaluator<ChaCha8Rng>>;

    fn race(board: RaceBoard, config: MctsConfig, seed: u64) -> RaceMcts {
        let evaluator = RolloutEvaluator::new(ChaCha8Rng::seed_from_u64(seed));
        Mcts::new(board, config, evaluator).unwrap()
    }

    fn tictactoe(
        config: MctsConfig,
        seed: u64,
    ) -> Mcts<TicTacToeBoard, RolloutEvaluator<ChaCha8Rng>> {
        let evaluator = RolloutEvaluator::new(ChaCha8Rng::seed_from_u64(seed));
        Mcts::new(TicTacToeBoard::new(), config, evaluator).unwrap()
    }

    #[test]
    fn test_first_pass_expands_root_and_backpropagates() {
        let mut mcts = race(RaceBoard::reach_three(), MctsConfig::with_exploration(1.41), 42);

        mcts.learn(1, 1).unwrap();

        let children = mcts.root_children();
        assert_eq!(children.len(), 1);
        assert_eq!(children[0].mv, Step(1));
        assert_eq!(children[0].visit_count, 1);
        assert_eq!(children[0].score_sum, 1.0);
        assert_eq!(mcts.root_stats().visit_count, 1);
        assert_eq!(mcts.root_stats().score_sum, 1.0);
        assert_eq!(mcts.best_known_move(), Some(Step(1)));
    }

    #[test]
    fn test_reach_three_until_terminal_root() {
        let mut mcts = race(RaceBoard::reach_three(), MctsConfig::with_exploration(1.41), 42);

        mcts.learn(1, 1).unwrap();
        mcts.advance_root(&Step(1)).unwrap();
        assert_eq!(mcts.root_stats().visit_count, 1);
        assert_eq!(mcts.board().count(), 1);

        for _ in 0..2 {
            mcts.learn(1, 1).unwrap();
            let best = mcts.best_known_move().unwrap();
            mcts.advance_root(&best).unwrap();
        }

        assert_eq!(mcts.board().count(), 3);
        assert!(mcts.tree().get(mcts.tree().root()).is_leaf());
        assert_eq!(mcts.best_known_move(), None);
        assert!(matches!(
            mcts.advance_root(&Step(1)),
            Err(MctsError::TerminalRoot)
        ));
    }

    #[test]
    fn test_board_restored_after_learning() {
        let mut mcts = tictactoe(MctsConfig::default(), 3);
        mcts.advance_root(&TicTacToeMove(4)).unwrap();

        mcts.learn(200, 2).unwrap();

        assert_eq!(mcts.board().move_history(), vec![TicTacToeMove(4)]);
    }

    #[test]
    fn test_selection_stays_on_terminal_leaf_without_looping() {
        // Race to 1: the root's only child is terminal.
        let mut mcts = race(RaceBoard::new(1, 1, 1), MctsConfig::default(), 0);

        mcts.learn(10, 2).unwrap();

        let children = mcts.root_children();
        assert_eq!(children.len(), 1);
        // 2 playouts on expansion, then 9 terminal passes of 2 each.
        assert_eq!(children[0].visit_count, 20);
        assert_eq!(mcts.root_stats().visit_count, 20);
    }

    #[test]
    fn test_simulate_best_child_only() {
        let config = MctsConfig::default().simulate_best_child_only();
        let mut mcts = tictactoe(config, 5);

        mcts.learn(1, 3).unwrap();

        let visits: Vec<u32> = mcts.root_children().iter().map(|c| c.visit_count).collect();
        assert_eq!(visits.len(), 9);
        assert_eq!(visits[0], 3);
        assert!(visits[1..].iter().all(|&v| v == 0));
        assert_eq!(mcts.root_stats().visit_count, 3);
    }

    #[test]
    fn test_simulate_all_children() {
        let mut mcts = tictactoe(MctsConfig::default(), 5);

        mcts.learn(1, 3).unwrap();

        assert!(mcts.root_children().iter().all(|c| c.visit_count == 3));
        assert_eq!(mcts.root_stats().visit_count, 27);
    }

    #[test]
    fn test_advance_unexplored_root_creates_fresh_child() {
        let mut mcts = tictactoe(MctsConfig::default(), 1);

        mcts.advance_root(&TicTacToeMove(0)).unwrap();

        let root = mcts.tree().get(mcts.tree().root());
        assert_eq!(root.stats().visit_count, 0);
        assert!(!root.is_explored());
        assert_eq!(root.player(), &Mark::O);
        assert_eq!(mcts.tree().len(), 1);
        assert_eq!(mcts.tree().prefix(), &[TicTacToeMove(0)]);
    }

    #[test]
    fn test_advance_preserves_subtree_statistics() {
        let mut mcts = tictactoe(MctsConfig::default(), 9);
        mcts.learn(100, 2).unwrap();

        let tree = mcts.tree();
        let child = tree.find_child(tree.root(), &TicTacToeMove(4)).unwrap();
        let expected_stats = tree.get(child).stats().clone();
        let expected_moves: Vec<_> = tree
            .get(child)
            .children()
            .iter()
            .map(|&id| tree.get(id).mv().cloned())
            .collect();

        mcts.advance_root(&TicTacToeMove(4)).unwrap();

        let tree = mcts.tree();
        let root = tree.get(tree.root());
        assert_eq!(root.stats(), &expected_stats);
        assert_eq!(root.parent(), None);
        let moves: Vec<_> = root.children().iter().map(|&id| tree.get(id).mv().cloned()).collect();
        assert_eq!(moves, expected_moves);
        // Siblings are gone.
        assert!(tree.node_ids().all(|id| tree.full_path(id).first() == Some(&TicTacToeMove(4))));
    }

    #[test]
    fn test_advance_unknown_move_on_explored_root() {
        let mut mcts = tictactoe(MctsConfig::default(), 2);
        mcts.advance_root(&TicTacToeMove(4)).unwrap();
        mcts.learn(5, 1).unwrap();

        let err = mcts.advance_root(&TicTacToeMove(4)).unwrap_err();
        assert!(matches!(err, MctsError::UnknownMove(_)));
        // Nothing changed.
        assert_eq!(mcts.board().move_history(), vec![TicTacToeMove(4)]);
    }

    #[test]
    fn test_advance_illegal_move_on_unexplored_root() {
        let mut mcts = tictactoe(MctsConfig::default(), 2);
        mcts.advance_root(&TicTacToeMove(4)).unwrap();

        let err = mcts.advance_root(&TicTacToeMove(4)).unwrap_err();
        assert!(matches!(err, MctsError::Board(_)));
        assert_eq!(mcts.tree().len(), 1);
    }

    #[test]
    fn test_retained_history_keeps_ancestors() {
        let mut mcts = tictactoe(MctsConfig::for_persistence(), 4);
        mcts.learn(50, 1).unwrap();
        let size = mcts.tree().len();

        mcts.advance_root(&TicTacToeMove(0)).unwrap();

        let tree = mcts.tree();
        assert_eq!(tree.len(), size);
        assert_ne!(tree.root(), NodeId::ORIGIN);
        assert!(tree.prefix().is_empty());
        assert!(tree.path_moves(tree.root()).is_empty());
        assert_eq!(tree.full_path(tree.root()), vec![TicTacToeMove(0)]);
    }

    #[test]
    fn test_retained_root_stops_backpropagation() {
        let mut mcts = tictactoe(MctsConfig::for_persistence(), 4);
        mcts.learn(50, 1).unwrap();
        let mv = mcts.best_known_move().unwrap();
        mcts.advance_root(&mv).unwrap();

        let origin = mcts.tree().get(NodeId::ORIGIN).stats().clone();
        let root_visits = mcts.root_stats().visit_count;
        mcts.learn(50, 1).unwrap();

        let tree = mcts.tree();
        assert_eq!(tree.get(tree.root()).parent(), Some(NodeId::ORIGIN));
        assert_eq!(tree.get(NodeId::ORIGIN).stats(), &origin);
        assert!(mcts.root_stats().visit_count > root_visits);
    }

    #[test]
    fn test_root_stats_independent_of_retained_history() {
        // Race to 2 with single steps: seat 1 always reaches the target.
        let play = |config: MctsConfig| {
            let mut mcts = race(RaceBoard::new(2, 1, 2), config, 9);
            mcts.learn(1, 1).unwrap();
            mcts.advance_root(&Step(1)).unwrap();
            mcts.learn(1, 1).unwrap();
            mcts.root_stats().clone()
        };

        // The root holds seat 0's results: the move into it was seat 0's.
        let expected = NodeStats {
            visit_count: 2,
            score_sum: 0.0,
        };
        assert_eq!(play(MctsConfig::default()), expected);
        assert_eq!(play(MctsConfig::for_persistence()), expected);
    }

    #[test]
    fn test_new_with_existing_history() {
        let mut board = TicTacToeBoard::new();
        board.apply_moves(&[TicTacToeMove(0), TicTacToeMove(4)]).unwrap();
        let evaluator = RolloutEvaluator::new(ChaCha8Rng::seed_from_u64(0));

        let mut mcts = Mcts::new(board, MctsConfig::default(), evaluator).unwrap();
        assert_eq!(mcts.tree().prefix(), &[TicTacToeMove(0), TicTacToeMove(4)]);
        assert_eq!(mcts.tree().get(mcts.tree().root()).player(), &Mark::X);

        mcts.learn(10, 1).unwrap();
        let moves: Vec<_> = mcts.root_children().iter().map(|c| c.mv).collect();
        assert_eq!(moves.len(), 7);
        assert!(!moves.contains(&TicTacToeMove(0)));
        assert!(!moves.contains(&TicTacToeMove(4)));
    }

    #[test]
    fn test_two_player_race_finds_winning_step() {
        // Race to 4 with steps 1-2: the first player wins by moving to 1.
        let mut mcts = race(RaceBoard::new(4, 2, 2), MctsConfig::default(), 11);

        mcts.learn(300, 5).unwrap();

        assert_eq!(mcts.best_known_move(), Some(Step(1)));
        assert_eq!(mcts.board().current_player(), Seat(0));
    }

    #[test]
    fn test_deterministic_with_seed() {
        let run = |seed: u64| {
            let mut mcts = tictactoe(MctsConfig::default(), seed);
            mcts.learn(60, 2).unwrap();
            mcts.root_children()
        };

        assert_eq!(run(12345), run(12345));
    }
}
