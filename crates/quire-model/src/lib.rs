//! In-memory document model for Quire.
//!
//! Two stores back an open document: the [`BlockTree`] (blocks plus a derived
//! position view) and the [`DetailsStore`] (per-object metadata records).
//! Both are plain in-memory state; the remote is the source of truth, and
//! the event pipeline in `quire-sync` replays its mutations here.
//!
//! # Design
//!
//! - Structure lives in `children_ids` arrays only; positions (parent, depth,
//!   sibling index, indent) are derived and rebuilt on structural change.
//! - Mutations are single-entry and never cascade. The remote sends paired
//!   events (a delete plus a children update) and the model applies them
//!   one by one.
//! - Details are lazily created on write so out-of-order events land on an
//!   empty record instead of being dropped. Reads never materialize.
//!
//! # Stores
//!
//! | Store | Keyed by | Holds |
//! |-------|----------|-------|
//! | [`BlockTree`] | [`quire_types::BlockId`] | block content + structure |
//! | [`DetailsStore`] | [`quire_types::ObjectId`] | loose key/value metadata |

mod details;
mod error;
mod tree;

pub use details::{DetailsStore, SharedDetails, shared_details};
pub use error::TreeError;
pub use tree::{BlockTree, MAX_TREE_DEPTH, NodePosition};

/// Result type for model operations.
pub type Result<T> = std::result::Result<T, TreeError>;
