//! Property-based tests for the MCTS controller.
//!
//! These tests check the tree invariants over random tic-tac-toe positions:
//! - the live board is never left mid-replay
//! - statistics are conserved between a node and its children
//! - scores stay within [0, visits]
//! - every node's path replays to a legal position
//! - root advancement keeps the chosen subtree intact
//! - same seed, same tree

use proptest::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use uct_core::Board;
use uct_mcts::{
    games::{TicTacToeBoard, TicTacToeMove},
    Mcts, MctsConfig, NodeId, RolloutEvaluator,
};

type TicTacToeMcts = Mcts<TicTacToeBoard, RolloutEvaluator<ChaCha8Rng>>;

// =============================================================================
// Strategies for generating test inputs
// =============================================================================

/// Generate a random seed for the rollout RNG
fn arb_seed() -> impl Strategy<Value = u64> {
    any::<u64>()
}

/// Generate a number of learn passes (small for fast tests)
fn arb_iterations() -> impl Strategy<Value = usize> {
    1usize..80
}

fn arb_rollouts() -> impl Strategy<Value = u32> {
    1u32..4
}

/// Generate a random non-terminal tic-tac-toe position.
///
/// Each entry picks one of the legal moves by index; choices that would end
/// the game are skipped.
fn arb_position() -> impl Strategy<Value = TicTacToeBoard> {
    prop::collection::vec(any::<prop::sample::Index>(), 0..7).prop_map(|choices| {
        let mut board = TicTacToeBoard::new();
        for choice in choices {
            let moves = board.possible_moves();
            let mv = *choice.get(&moves);
            let mut next = board.clone();
            next.apply_move(&mv).unwrap();
            if !next.is_terminal() {
                board = next;
            }
        }
        board
    })
}

fn create_mcts(board: TicTacToeBoard, config: MctsConfig, seed: u64) -> TicTacToeMcts {
    let evaluator = RolloutEvaluator::new(ChaCha8Rng::seed_from_u64(seed));
    Mcts::new(board, config, evaluator).unwrap()
}

// =============================================================================
// Board restoration and path determinism
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Learning never leaves the live board away from the root position
    #[test]
    fn prop_board_restored_after_learn(
        seed in arb_seed(),
        iterations in arb_iterations(),
        rollouts in arb_rollouts(),
        board in arb_position()
    ) {
        let history = board.move_history();
        let mut mcts = create_mcts(board, MctsConfig::default(), seed);

        mcts.learn(iterations, rollouts).unwrap();

        prop_assert_eq!(mcts.board().move_history(), history);
    }

    /// Every node's path is legal from the initial position and reaches a
    /// position where the node's player is to act
    #[test]
    fn prop_paths_replay_to_node_position(
        seed in arb_seed(),
        iterations in arb_iterations(),
        board in arb_position()
    ) {
        let mut mcts = create_mcts(board, MctsConfig::default(), seed);
        mcts.learn(iterations, 1).unwrap();

        let tree = mcts.tree();
        for id in tree.node_ids() {
            let mut replay = TicTacToeBoard::new();
            prop_assert!(replay.apply_moves(&tree.full_path(id)).is_ok());
            prop_assert_eq!(&replay.current_player(), tree.get(id).player());
        }
    }
}

// =============================================================================
// Statistics
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    /// Visits are never double counted: the first root holds exactly its
    /// children's visits, and any other expanded node holds its own playouts
    /// plus its children's visits
    #[test]
    fn prop_statistics_conservation(
        seed in arb_seed(),
        iterations in arb_iterations(),
        rollouts in arb_rollouts(),
        board in arb_position()
    ) {
        let mut mcts = create_mcts(board, MctsConfig::default(), seed);
        mcts.learn(iterations, rollouts).unwrap();

        let tree = mcts.tree();
        for id in tree.node_ids() {
            let node = tree.get(id);
            if !node.is_explored() || node.is_leaf() {
                continue;
            }
            let children: u32 = node
                .children()
                .iter()
                .map(|&child| tree.get(child).stats().visit_count)
                .sum();
            let own = if id == tree.root() { 0 } else { rollouts };
            prop_assert_eq!(node.stats().visit_count, own + children, "node {:?}", id);
        }
    }

    /// Score sums stay within [0, visit_count]
    #[test]
    fn prop_scores_bounded(
        seed in arb_seed(),
        iterations in arb_iterations(),
        rollouts in arb_rollouts(),
        board in arb_position()
    ) {
        let mut mcts = create_mcts(board, MctsConfig::default(), seed);
        mcts.learn(iterations, rollouts).unwrap();

        let tree = mcts.tree();
        for id in tree.node_ids() {
            let stats = tree.get(id).stats();
            prop_assert!(stats.score_sum >= 0.0);
            prop_assert!(stats.score_sum <= stats.visit_count as f64 + 1e-9);
            if stats.visit_count == 0 {
                prop_assert_eq!(stats.score_sum, 0.0);
            }
        }
    }

    /// The proposed move is the most visited root child, first on ties
    #[test]
    fn prop_best_move_is_max_visits(
        seed in arb_seed(),
        iterations in arb_iterations(),
        board in arb_position()
    ) {
        let mut mcts = create_mcts(board, MctsConfig::default(), seed);
        mcts.learn(iterations, 1).unwrap();

        let children = mcts.root_children();
        let max_visits = children.iter().map(|c| c.visit_count).max();
        let expected = children
            .iter()
            .find(|c| Some(c.visit_count) == max_visits)
            .map(|c| c.mv);

        prop_assert_eq!(mcts.best_known_move(), expected);
    }
}

// =============================================================================
// Root advancement and determinism
// =============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    /// Advancing to an explored child keeps its statistics and children
    #[test]
    fn prop_advance_preserves_subtree(
        seed in arb_seed(),
        iterations in arb_iterations(),
        choice in any::<prop::sample::Index>(),
        board in arb_position()
    ) {
        let mut mcts = create_mcts(board, MctsConfig::default(), seed);
        mcts.learn(iterations, 1).unwrap();

        let children = mcts.root_children();
        let picked = choice.get(&children).clone();
        let tree = mcts.tree();
        let child = tree.find_child(tree.root(), &picked.mv).unwrap();
        let expected_children: Vec<Option<TicTacToeMove>> = tree
            .get(child)
            .children()
            .iter()
            .map(|&id| tree.get(id).mv().copied())
            .collect();

        mcts.advance_root(&picked.mv).unwrap();

        let tree = mcts.tree();
        let root = tree.get(tree.root());
        prop_assert_eq!(tree.root(), NodeId::ORIGIN);
        prop_assert_eq!(root.stats().visit_count, picked.visit_count);
        prop_assert_eq!(root.stats().score_sum, picked.score_sum);
        let children: Vec<Option<TicTacToeMove>> =
            root.children().iter().map(|&id| tree.get(id).mv().copied()).collect();
        prop_assert_eq!(children, expected_children);
        prop_assert_eq!(tree.prefix().last(), Some(&picked.mv));
    }

    /// Same seed produces the same tree
    #[test]
    fn prop_deterministic(
        seed in arb_seed(),
        iterations in arb_iterations(),
        board in arb_position()
    ) {
        let run = |board: TicTacToeBoard| {
            let mut mcts = create_mcts(board, MctsConfig::default(), seed);
            mcts.learn(iterations, 2).unwrap();
            (mcts.root_children(), mcts.tree_size())
        };

        prop_assert_eq!(run(board.clone()), run(board));
    }
}
