use thiserror::Error;
use uct_core::BoardError;

/// Errors raised by the search controller and the tree store.
#[derive(Error, Debug)]
pub enum MctsError {
    /// The root is a terminal leaf: the game is over.
    #[error("Cannot advance a terminal root (game is over)")]
    TerminalRoot,

    /// The move is absent from an already explored root.
    #[error("Move {0} is not a child of the explored root")]
    UnknownMove(String),

    /// A saved tree does not belong to the live game.
    #[error("Saved tree does not match the current move history")]
    LoadMismatch,

    #[error("Corrupt saved tree: {0}")]
    CorruptTree(String),

    #[error("Board contract violation: {0}")]
    Board(#[from] BoardError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to encode tree: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    #[error("Failed to decode tree: {0}")]
    Decode(#[from] rmp_serde::decode::Error),
}

/// Convenience Result type for search operations
pub type Result<T> = std::result::Result<T, MctsError>;
