//! Command-line arena for the UCT search engine.
//!
//! Plays tic-tac-toe games between the engine and an opponent, trains a
//! persistent tree by self-play, and inspects saved trees.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};
use uct_core::Board;
use uct_mcts::{
    games::{Mark, TicTacToeBoard, TicTacToeMove},
    ChildSummary, Mcts, MctsConfig, RolloutEvaluator,
};

type Engine = Mcts<TicTacToeBoard, RolloutEvaluator<ChaCha8Rng>>;

/// UCT search arena, trainer and tree inspector.
#[derive(Parser)]
#[command(name = "uct-play")]
#[command(about = "Play, train and inspect UCT search trees on tic-tac-toe")]
struct Cli {
    /// Log level used when RUST_LOG is not set.
    #[arg(long, default_value = "info", global = true)]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Play games between the engine and an opponent.
    Arena {
        /// Number of games to play. The engine alternates between X and O.
        #[arg(short, long, default_value = "20")]
        games: usize,

        /// Learn passes before each engine move.
        #[arg(short, long, default_value = "500")]
        iterations: usize,

        /// Random playouts per simulated child.
        #[arg(short, long, default_value = "5")]
        rollouts: u32,

        /// Random seed for reproducibility.
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Who the engine plays against.
        #[arg(long, value_enum, default_value = "random")]
        opponent: Opponent,

        /// UCB1 exploration constant.
        #[arg(long, default_value_t = std::f64::consts::SQRT_2)]
        exploration: f64,
    },

    /// Self-play games with a persistent tree, then save it.
    Train {
        /// Number of self-play games. An existing tree file is extended.
        #[arg(short, long, default_value = "1")]
        games: usize,

        /// Learn passes before each move.
        #[arg(short, long, default_value = "500")]
        iterations: usize,

        /// Random playouts per simulated child.
        #[arg(short, long, default_value = "5")]
        rollouts: u32,

        /// Random seed for reproducibility.
        #[arg(long, default_value = "42")]
        seed: u64,

        /// Output file for the saved tree.
        #[arg(short, long, default_value = "tree.msgpack")]
        out: PathBuf,
    },

    /// Print root statistics of a saved tree after a sequence of moves.
    Inspect {
        /// Saved tree file.
        #[arg(short, long)]
        tree: PathBuf,

        /// Cells played so far, comma separated (0-8, row-major).
        #[arg(short, long, value_delimiter = ',')]
        moves: Vec<u8>,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Opponent {
    /// Another engine with its own seed.
    Mcts,
    /// Uniformly random legal moves.
    Random,
}

/// Result of one arena game, from the engine's side.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum GameOutcome {
    EngineWin,
    OpponentWin,
    Draw,
}

enum Rival {
    Mcts(Box<Engine>),
    Random(ChaCha8Rng),
}

fn init_tracing(level: &str) -> Result<()> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    Ok(())
}

fn new_engine(board: TicTacToeBoard, config: MctsConfig, seed: u64) -> Result<Engine> {
    let evaluator = RolloutEvaluator::new(ChaCha8Rng::seed_from_u64(seed));
    Ok(Mcts::new(board, config, evaluator)?)
}

/// Learn, then return the most visited move.
fn think(engine: &mut Engine, iterations: usize, rollouts: u32) -> Result<TicTacToeMove> {
    engine.learn(iterations, rollouts)?;
    engine
        .best_known_move()
        .context("Engine has no move in a live position")
}

/// Play a single arena game. Both sides see every move through `advance_root`.
fn play_arena_game(
    config: &MctsConfig,
    engine_mark: Mark,
    opponent: Opponent,
    iterations: usize,
    rollouts: u32,
    seed: u64,
) -> Result<GameOutcome> {
    let mut engine = new_engine(TicTacToeBoard::new(), config.clone(), seed)?;
    let mut rival = match opponent {
        Opponent::Mcts => Rival::Mcts(Box::new(new_engine(
            TicTacToeBoard::new(),
            config.clone(),
            seed.wrapping_add(500),
        )?)),
        Opponent::Random => Rival::Random(ChaCha8Rng::seed_from_u64(seed.wrapping_add(1000))),
    };

    while !engine.board().is_terminal() {
        let mv = if engine.board().current_player() == engine_mark {
            think(&mut engine, iterations, rollouts)?
        } else {
            match &mut rival {
                Rival::Mcts(other) => think(other, iterations, rollouts)?,
                Rival::Random(rng) => {
                    let moves = engine.board().possible_moves();
                    moves[rng.gen_range(0..moves.len())]
                }
            }
        };

        debug!(%mv, player = %engine.board().current_player(), "move played");
        engine.advance_root(&mv)?;
        if let Rival::Mcts(other) = &mut rival {
            other.advance_root(&mv)?;
        }
    }

    let board = engine.into_board();
    Ok(match board.winner() {
        Some(winner) if winner == engine_mark => GameOutcome::EngineWin,
        Some(_) => GameOutcome::OpponentWin,
        None => GameOutcome::Draw,
    })
}

/// Run the arena command.
fn cmd_arena(
    games: usize,
    iterations: usize,
    rollouts: u32,
    seed: u64,
    opponent: Opponent,
    exploration: f64,
) -> Result<Vec<GameOutcome>> {
    info!(games, iterations, rollouts, seed, ?opponent, exploration, "Arena starting");
    let start = Instant::now();

    let config = MctsConfig::with_exploration(exploration).rollouts(rollouts);
    let outcomes = (0..games)
        .into_par_iter()
        .map(|i| {
            // Alternate sides for fairness
            let engine_mark = if i % 2 == 0 { Mark::X } else { Mark::O };
            let game_seed = seed.wrapping_add(i as u64 * 1000);
            play_arena_game(&config, engine_mark, opponent, iterations, rollouts, game_seed)
                .with_context(|| format!("Arena game {} failed", i))
        })
        .collect::<Result<Vec<_>>>()?;

    let count = |outcome: GameOutcome| outcomes.iter().filter(|&&o| o == outcome).count();
    println!(
        "Engine wins: {}, Opponent wins: {}, Draws: {} ({} games in {:.2}s)",
        count(GameOutcome::EngineWin),
        count(GameOutcome::OpponentWin),
        count(GameOutcome::Draw),
        games,
        start.elapsed().as_secs_f64()
    );

    Ok(outcomes)
}

/// Run the train command.
fn cmd_train(games: usize, iterations: usize, rollouts: u32, seed: u64, out: &Path) -> Result<()> {
    let config = MctsConfig::for_persistence().rollouts(rollouts);

    for game in 0..games {
        let game_seed = seed.wrapping_add(game as u64 * 1000);
        let mut mcts = new_engine(TicTacToeBoard::new(), config.clone(), game_seed)?;
        if out.exists() {
            mcts.load(out)
                .with_context(|| format!("Failed to load tree from {}", out.display()))?;
        }

        while !mcts.board().is_terminal() {
            let mv = think(&mut mcts, iterations, rollouts)?;
            mcts.advance_root(&mv)?;
        }

        info!(
            game,
            winner = ?mcts.board().winner(),
            moves = mcts.board().move_history().len(),
            tree_size = mcts.tree_size(),
            "Self-play game finished"
        );
        mcts.save(out)
            .with_context(|| format!("Failed to save tree to {}", out.display()))?;
    }

    println!("Tree saved to {}", out.display());
    Ok(())
}

/// Load a saved tree realigned to `moves` and return the root children.
fn inspect_tree(
    tree: &Path,
    moves: &[u8],
) -> Result<(TicTacToeBoard, Vec<ChildSummary<TicTacToeMove>>)> {
    let mut board = TicTacToeBoard::new();
    for &cell in moves {
        board
            .apply_move(&TicTacToeMove(cell))
            .with_context(|| format!("Illegal move {} in --moves", cell))?;
    }

    let mut mcts = new_engine(board, MctsConfig::for_persistence(), 0)?;
    mcts.load(tree)
        .with_context(|| format!("Failed to load tree from {}", tree.display()))?;

    let mut children = mcts.root_children();
    children.sort_by(|a, b| b.visit_count.cmp(&a.visit_count));
    Ok((mcts.into_board(), children))
}

/// Run the inspect command.
fn cmd_inspect(tree: &Path, moves: &[u8]) -> Result<()> {
    let (board, children) = inspect_tree(tree, moves)?;

    println!("{}", board);
    println!("{} to move", board.current_player());
    if children.is_empty() {
        println!("No statistics for this position");
        return Ok(());
    }

    println!("{:<8} {:>8} {:>8}", "move", "visits", "mean");
    for child in &children {
        let mean = if child.visit_count == 0 {
            0.0
        } else {
            child.score_sum / child.visit_count as f64
        };
        println!("{:<8} {:>8} {:>8.3}", child.mv.to_string(), child.visit_count, mean);
    }
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(&cli.log_level)?;

    match cli.command {
        Commands::Arena {
            games,
            iterations,
            rollouts,
            seed,
            opponent,
            exploration,
        } => {
            cmd_arena(games, iterations, rollouts, seed, opponent, exploration)?;
            Ok(())
        }

        Commands::Train {
            games,
            iterations,
            rollouts,
            seed,
            out,
        } => cmd_train(games, iterations, rollouts, seed, &out),

        Commands::Inspect { tree, moves } => cmd_inspect(&tree, &moves),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arena_game_against_random() {
        let config = MctsConfig::default();
        let outcome = play_arena_game(&config, Mark::X, Opponent::Random, 200, 2, 42).unwrap();
        assert_ne!(outcome, GameOutcome::OpponentWin);
    }

    #[test]
    fn test_arena_game_between_engines() {
        let config = MctsConfig::default();
        // Both sides only need to finish the game consistently.
        play_arena_game(&config, Mark::O, Opponent::Mcts, 30, 1, 7).unwrap();
    }

    #[test]
    fn test_arena_runs_all_games() {
        let outcomes = cmd_arena(4, 20, 1, 3, Opponent::Random, 1.0).unwrap();
        assert_eq!(outcomes.len(), 4);
    }

    #[test]
    fn test_train_then_inspect() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.msgpack");

        cmd_train(2, 30, 1, 42, &path).unwrap();
        assert!(path.exists());

        let (board, children) = inspect_tree(&path, &[]).unwrap();
        assert!(board.move_history().is_empty());
        assert_eq!(children.len(), 9);
        assert!(children.windows(2).all(|w| w[0].visit_count >= w[1].visit_count));

        let (_, children) = inspect_tree(&path, &[4]).unwrap();
        assert!(children.iter().all(|c| c.mv != TicTacToeMove(4)));
    }

    #[test]
    fn test_inspect_rejects_illegal_moves() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tree.msgpack");
        cmd_train(1, 10, 1, 1, &path).unwrap();

        assert!(inspect_tree(&path, &[4, 4]).is_err());
    }

    #[test]
    fn test_cli_parses_move_list() {
        let cli = Cli::parse_from([
            "uct-play",
            "inspect",
            "--tree",
            "t.msgpack",
            "--moves",
            "4,0,8",
        ]);
        match cli.command {
            Commands::Inspect { moves, .. } => assert_eq!(moves, vec![4, 0, 8]),
            _ => panic!("expected inspect"),
        }
    }
}
