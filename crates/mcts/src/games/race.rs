//! Counting race: players take turns adding 1..=max_step to a shared counter.
//! Whoever brings the counter exactly to the target wins.
//!
//! With one player and `max_step = 1` this is the "reach 3" game: a single
//! path from 0 to the target, always scored as a win.

use serde::{Deserialize, Serialize};
use uct_core::{Board, BoardError, Result, Score};

/// Seat index of a player, 0-based.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Seat(pub u8);

/// Amount added to the counter.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Step(pub u8);

#[derive(Clone, PartialEq, Eq, Debug)]
pub struct RaceBoard {
    target: u8,
    max_step: u8,
    players: u8,
    count: u8,
    history: Vec<Step>,
}

impl RaceBoard {
    /// Create a race to `target` with steps of 1..=max_step among `players` seats.
    ///
    /// # Panics
    /// Panics if `max_step` or `players` is zero.
    pub fn new(target: u8, max_step: u8, players: u8) -> Self {
        assert!(max_step > 0, "max_step must be positive");
        assert!(players > 0, "at least one player is required");
        Self {
            target,
            max_step,
            players,
            count: 0,
            history: Vec::new(),
        }
    }

    /// Single-player race to 3 with a single `+1` move.
    pub fn reach_three() -> Self {
        Self::new(3, 1, 1)
    }

    /// Current counter value.
    pub fn count(&self) -> u8 {
        self.count
    }

    fn seat_after(&self, moves_played: usize) -> Seat {
        Seat((moves_played % self.players as usize) as u8)
    }
}

impl Board for RaceBoard {
    type Move = Step;
    type Player = Seat;

    fn possible_moves(&self) -> Vec<Self::Move> {
        let remaining = self.target.saturating_sub(self.count);
        (1..=self.max_step.min(remaining)).map(Step).collect()
    }

    fn current_player(&self) -> Self::Player {
        self.seat_after(self.history.len())
    }

    fn next_player(&self, player: &Self::Player) -> Self::Player {
        Seat((player.0 + 1) % self.players)
    }

    fn apply_move(&mut self, mv: &Self::Move) -> Result<()> {
        if mv.0 == 0 || mv.0 > self.max_step || self.count.saturating_add(mv.0) > self.target {
            return Err(BoardError::IllegalMove(format!(
                "step {} at count {} (target {})",
                mv.0, self.count, self.target
            )));
        }
        self.count += mv.0;
        self.history.push(*mv);
        Ok(())
    }

    fn is_terminal(&self) -> bool {
        self.count >= self.target
    }

    fn score(&self, player: &Self::Player) -> Result<f64> {
        if !self.is_terminal() {
            return Err(BoardError::NotTerminal);
        }
        // The player who made the last move reached the target.
        let last_mover = self.seat_after(self.history.len().saturating_sub(1));
        if last_mover == *player {
            Ok(Score::WIN.get())
        } else {
            Ok(Score::LOSS.get())
        }
    }

    fn reset(&mut self) {
        self.count = 0;
        self.history.clear();
    }

    fn move_history(&self) -> Vec<Self::Move> {
        self.history.clone()
    }
}
