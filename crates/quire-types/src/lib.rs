//! Shared identity, block, and details types for Quire.
//!
//! This crate is the data foundation: typed string ids, the block content
//! union with its wire-code enums, details records, and the sync status
//! value. It has **no internal quire dependencies**; it is the leaf crate the
//! stores and the sync layer build on.
//!
//! # Entity-Relationship Overview
//!
//! ```text
//! Document (ContextId) ← an open editor surface
//!     └── root Block (BlockId = the document's ObjectId)
//!     └── Blocks form a tree via children_ids (authoritative order)
//!
//! Object (ObjectId) ← anything the remote store indexes
//!     └── described by a Details record (open key→value map)
//!     └── layout key selects the editor chrome
//!
//! Subscription (SubscriptionId) ← a live filtered query
//!     └── well-known tab id, or generated ad-hoc id
//!     └── companion "<id>/dep" dependency id (diagnostic-only)
//! ```
//!
//! # Key Types
//!
//! | Type               | Purpose                                      |
//! |--------------------|----------------------------------------------|
//! | [`BlockId`]        | Block address within a document              |
//! | [`ObjectId`]       | Details-record key                           |
//! | [`SubscriptionId`] | Live-query identity                          |
//! | [`ContextId`]      | Event-batch scope                            |
//! | [`Block`]          | Content unit (payload + children + fields)   |
//! | [`BlockContent`]   | Closed 10-variant content union              |
//! | [`Details`]        | Object metadata record                       |
//! | [`DetailsLayout`]  | Derived layout (editor chrome selector)      |
//! | [`SyncStatus`]     | Remote link health                           |

pub mod block;
pub mod details;
pub mod ids;
pub mod status;

// Re-export primary types at crate root for convenience.
pub use block::{
    Alignment, BackgroundColor, Block, BlockContent, BookmarkState, DividerStyle, FileKind,
    FileState, LayoutStyle, LinkStyle, Restrictions, TextStyle,
};
pub use details::{detail_keys, Details, DetailsLayout};
pub use ids::{BlockId, ContextId, ObjectId, SubscriptionId, DEPENDENT_SUFFIX};
pub use status::SyncStatus;
