//! Synchronization pipeline for Quire documents and live queries.
//!
//! The remote store is authoritative; this crate keeps local state
//! consistent with it by replaying an ordered broadcast of change events
//! and by running live, paginated queries ("subscriptions") whose result
//! sets update incrementally.
//!
//! ```text
//!                       broadcast of EventBatch
//!                                 │
//!                         EventDispatcher          (single consumer,
//!                          │            │           arrival order)
//!              document context     registry match
//!                          │            │
//!                  EventConverter   SubscriptionManager
//!                    │       │              │
//!               BlockTree  DetailsStore ◄───┤ (shared)
//!                    │                      │
//!              UpdateSignal          SubscriptionUpdate
//!                    │                      │
//!               SignalSink          SubscriptionHandler
//! ```
//!
//! # Key types
//!
//! | Type | Role |
//! |------|------|
//! | [`EventBatch`] / [`RemoteEvent`] | what the remote pushes |
//! | [`EventConverter`] | event → store mutation → [`UpdateSignal`] |
//! | [`SubscriptionManager`] | live-query registry and routing |
//! | [`SubscriptionToggler`] / [`RemoteStore`] | start/stop seam to the remote |
//! | [`EventDispatcher`] | the one loop that drains the broadcast |
//!
//! # Ordering
//!
//! Batches are processed strictly in arrival order and events in listed
//! order within a batch; anchor-based list commands (`add after X`) are
//! meaningless under reordering. Handler and sink callbacks run on the
//! dispatch path and are expected to hop off it themselves.

mod converter;
mod dispatch;
mod error;
mod events;
mod manager;
mod subscription;
mod toggler;

pub use converter::{EventConverter, UpdateSignal};
pub use dispatch::{EventDispatcher, SignalSink};
pub use error::{RemoteError, SyncError};
pub use events::{EventBatch, RemoteEvent};
pub use manager::{SharedManager, StartOutcome, SubscriptionManager, shared_manager};
pub use subscription::{
    FilterCondition, FilterExpr, OrderedRecords, PAGE_SIZE, SortExpr, SortOrder,
    SubscriptionHandler, SubscriptionSpec, SubscriptionUpdate, default_keys, page_count,
    page_offset, tabs,
};
pub use toggler::{
    RemoteStore, SearchSubscribeRequest, SearchSubscribeResponse, SubscriptionToggler,
};

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;
