//! Scoped board replay.
//!
//! Every time the search needs a position other than the live one, it takes a
//! [`ReplayGuard`]. The guard remembers the board's move history, plays the
//! requested moves, and puts the original position back when it is dropped,
//! on every exit path.

use std::ops::{Deref, DerefMut};
use tracing::error;
use uct_core::Board;

/// Exclusive access to a board temporarily moved to another position.
pub(crate) struct ReplayGuard<'a, B: Board> {
    board: &'a mut B,
    saved: Vec<B::Move>,
}

impl<'a, B: Board> ReplayGuard<'a, B> {
    /// Play `path` on top of the board's current position.
    pub(crate) fn enter(board: &'a mut B, path: &[B::Move]) -> uct_core::Result<Self> {
        let saved = board.move_history();
        let mut guard = Self { board, saved };
        guard.board.apply_moves(path)?;
        Ok(guard)
    }

    /// Play `path` from the initial position.
    pub(crate) fn from_initial(board: &'a mut B, path: &[B::Move]) -> uct_core::Result<Self> {
        let saved = board.move_history();
        let mut guard = Self { board, saved };
        guard.board.reset();
        guard.board.apply_moves(path)?;
        Ok(guard)
    }
}

impl<B: Board> Deref for ReplayGuard<'_, B> {
    type Target = B;

    fn deref(&self) -> &B {
        &*self.board
    }
}

impl<B: Board> DerefMut for ReplayGuard<'_, B> {
    fn deref_mut(&mut self) -> &mut B {
        &mut *self.board
    }
}

impl<B: Board> Drop for ReplayGuard<'_, B> {
    fn drop(&mut self) {
        if self.board.move_history() == self.saved {
            return;
        }
        self.board.reset();
        if let Err(err) = self.board.apply_moves(&self.saved) {
            // The saved moves were legal when recorded; a failure here means
            // the board does not replay deterministically.
            error!(%err, "failed to restore board after replay");
        }
    }
}
