//! Error types for store mutations.

use thiserror::Error;

use quire_types::BlockId;

/// Errors that can occur mutating the block tree.
#[derive(Error, Debug)]
pub enum TreeError {
    /// Insert collided with an existing block id. Silent overwrite is
    /// rejected; the remote never legitimately re-adds a live id.
    #[error("block already exists: {0:?}")]
    DuplicateId(BlockId),

    /// Mutation referenced an id absent from the tree. Surfaced (not
    /// swallowed) because event translation branches on it.
    #[error("block not found: {0:?}")]
    NotFound(BlockId),
}
