//! Domain types with enforced invariants.
//!
//! - Score: game outcome for one player in range [0, 1]

use crate::{BoardError, Result};

/// A game outcome from one player's point of view.
///
/// Invariant: Value is in range [0, 1] where:
/// - 1 means the player won
/// - 0 means the player lost
/// - anything in between is a draw or partial credit
///
/// # Example
/// ```
/// use uct_core::Score;
///
/// let score = Score::new(0.5).unwrap();
/// assert_eq!(score, Score::DRAW);
/// ```
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd)]
pub struct Score(f64);

impl Score {
    /// Create a new score.
    ///
    /// # Errors
    /// Returns `BoardError::ScoreOutOfRange` if the value is outside [0, 1] or NaN.
    pub fn new(value: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&value) {
            return Err(BoardError::ScoreOutOfRange(value));
        }
        Ok(Self(value))
    }

    /// Create a score by clamping to [0, 1]. NaN becomes a loss.
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self::LOSS;
        }
        Self(value.clamp(0.0, 1.0))
    }

    /// Score for a win.
    pub const WIN: Self = Self(1.0);

    /// Score for a loss.
    pub const LOSS: Self = Self(0.0);

    /// Score for a draw.
    pub const DRAW: Self = Self(0.5);

    /// Get the underlying value.
    pub fn get(self) -> f64 {
        self.0
    }

    /// The same outcome seen by the opponent in a two-player zero-sum game.
    pub fn complement(self) -> Self {
        Self(1.0 - self.0)
    }
}

impl std::fmt::Display for Score {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:.3}", self.0)
    }
}

impl From<Score> for f64 {
    fn from(s: Score) -> f64 {
        s.0
    }
}

impl TryFrom<f64> for Score {
    type Error = BoardError;

    fn try_from(value: f64) -> Result<Self> {
        Self::new(value)
    }
}
