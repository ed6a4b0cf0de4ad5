//! Tic-tac-toe board for MCTS validation.
//!
//! Tic-tac-toe is a solved game where perfect play always results in a draw.
//! This makes it ideal for validating MCTS correctness:
//! - MCTS should never lose against a random opponent
//! - MCTS should take an immediate win and block an immediate loss

use serde::{Deserialize, Serialize};
use std::fmt;
use uct_core::{Board, BoardError, Result, Score};

/// Tic-tac-toe player.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl Mark {
    /// Get the opposing player.
    pub fn opposite(self) -> Self {
        match self {
            Mark::X => Mark::O,
            Mark::O => Mark::X,
        }
    }
}

impl fmt::Display for Mark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Mark::X => write!(f, "X"),
            Mark::O => write!(f, "O"),
        }
    }
}

/// Tic-tac-toe move (cell index 0-8).
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct TicTacToeMove(pub u8);

impl TicTacToeMove {
    /// Get the row (0-2).
    pub fn row(self) -> u8 {
        self.0 / 3
    }

    /// Get the column (0-2).
    pub fn col(self) -> u8 {
        self.0 % 3
    }
}

impl fmt::Display for TicTacToeMove {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row(), self.col())
    }
}

/// Mutable tic-tac-toe board with move history.
#[derive(Clone, PartialEq, Eq, Debug, Hash)]
pub struct TicTacToeBoard {
    /// Board: 9 cells, indexed 0-8 (row-major).
    /// ```text
    /// 0 | 1 | 2
    /// ---------
    /// 3 | 4 | 5
    /// ---------
    /// 6 | 7 | 8
    /// ```
    cells: [Option<Mark>; 9],

    /// Current player to move.
    current: Mark,

    /// Cached winner (if any).
    winner: Option<Mark>,

    history: Vec<TicTacToeMove>,
}

impl TicTacToeBoard {
    /// Create a new empty board with X to move.
    pub fn new() -> Self {
        Self {
            cells: [None; 9],
            current: Mark::X,
            winner: None,
            history: Vec::new(),
        }
    }

    /// Get the winner, if any.
    pub fn winner(&self) -> Option<Mark> {
        self.winner
    }

    /// Get the mark at a cell, if any.
    pub fn get(&self, cell: usize) -> Option<Mark> {
        self.cells.get(cell).copied().flatten()
    }

    /// Check for a winner on the current board.
    fn check_winner(&self) -> Option<Mark> {
        const LINES: [[usize; 3]; 8] = [
            [0, 1, 2], // top row
            [3, 4, 5], // middle row
            [6, 7, 8], // bottom row
            [0, 3, 6], // left column
            [1, 4, 7], // center column
            [2, 5, 8], // right column
            [0, 4, 8], // main diagonal
            [2, 4, 6], // anti-diagonal
        ];

        for line in LINES {
            if let Some(mark) = self.cells[line[0]] {
                if self.cells[line[1]] == Some(mark) && self.cells[line[2]] == Some(mark) {
                    return Some(mark);
                }
            }
        }
        None
    }

    /// Check if the board is full (draw if no winner).
    fn is_full(&self) -> bool {
        self.cells.iter().all(|c| c.is_some())
    }
}

impl Default for TicTacToeBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for TicTacToeBoard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..3 {
            if row > 0 {
                writeln!(f, "-----------")?;
            }
            for col in 0..3 {
                if col > 0 {
                    write!(f, " | ")?;
                }
                match self.cells[row * 3 + col] {
                    Some(mark) => write!(f, " {} ", mark)?,
                    None => write!(f, "   ")?,
                }
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl Board for TicTacToeBoard {
    type Move = TicTacToeMove;
    type Player = Mark;

    fn possible_moves(&self) -> Vec<Self::Move> {
        if self.winner.is_some() {
            return Vec::new();
        }
        self.cells
            .iter()
            .enumerate()
            .filter(|(_, cell)| cell.is_none())
            .map(|(i, _)| TicTacToeMove(i as u8))
            .collect()
    }

    fn current_player(&self) -> Self::Player {
        self.current
    }

    fn next_player(&self, player: &Self::Player) -> Self::Player {
        player.opposite()
    }

    fn apply_move(&mut self, mv: &Self::Move) -> Result<()> {
        let cell = mv.0 as usize;
        if self.winner.is_some() || self.get(cell).is_some() || cell >= 9 {
            return Err(BoardError::IllegalMove(format!("{mv} on\n{self}")));
        }
        self.cells[cell] = Some(self.current);
        self.current = self.current.opposite();
        self.winner = self.check_winner();
        self.history.push(*mv);
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        self.winner.is_some() || self.is_full()
    }

    fn score(&self, player: &Self::Player) -> Result<f64> {
        match self.winner {
            Some(winner) if winner == *player => Ok(Score::WIN.get()),
            Some(_) => Ok(Score::LOSS.get()),
            None if self.is_full() => Ok(Score::DRAW.get()),
            None => Err(BoardError::NotTerminal),
        }
    }

    fn reset(&mut self) {
        *self = Self::new();
    }

    fn move_history(&self) -> Vec<Self::Move> {
        self.history.clone()
    }
}
