use thiserror::Error;

/// Errors a board raises when the engine breaks its side of the contract.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoardError {
    #[error("Illegal move: {0}")]
    IllegalMove(String),

    #[error("Position is not terminal")]
    NotTerminal,

    #[error("Score {0} is outside [0, 1]")]
    ScoreOutOfRange(f64),
}

/// Convenience Result type for board operations
pub type Result<T> = std::result::Result<T, BoardError>;
