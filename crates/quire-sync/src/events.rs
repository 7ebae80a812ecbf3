//! Remote change events and the batch envelope that carries them.
//!
//! The remote store pushes batches over a single broadcast stream. Each
//! batch names a context (the document or subscription that triggered it)
//! and carries an ordered list of [`RemoteEvent`]s. The union is closed:
//! consumers match exhaustively, so adding a variant is a compile-visible
//! change everywhere it matters.
//!
//! Wire codes (style, alignment, file state, ...) arrive as raw integers or
//! strings and are decoded at application time by the converter. Optional
//! sub-fields mean "no change" when absent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use quire_types::{Block, BlockId, ContextId, Details, ObjectId, SubscriptionId};

// ============================================================================
// Batch envelope
// ============================================================================

/// One ordered batch of remote events.
///
/// `context_id` names the document or subscription the batch belongs to.
/// An empty context marks a generic batch: it matches every active
/// subscription, which is how dependency updates that do not carry the
/// triggering subscription's id get delivered.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventBatch {
    #[serde(default)]
    pub context_id: ContextId,
    #[serde(default)]
    pub events: Vec<RemoteEvent>,
}

impl EventBatch {
    pub fn new(context_id: impl Into<ContextId>, events: Vec<RemoteEvent>) -> Self {
        Self { context_id: context_id.into(), events }
    }

    /// A batch with no owning context.
    pub fn generic(events: Vec<RemoteEvent>) -> Self {
        Self { context_id: ContextId::none(), events }
    }

    /// Whether this batch matches every active subscription.
    pub fn is_generic(&self) -> bool {
        self.context_id.is_empty()
    }
}

// ============================================================================
// Event union
// ============================================================================

/// Events pushed from the remote store, one variant per mutation kind.
///
/// Block-scoped variants name the block they touch; details variants name
/// an object; subscription variants reposition entries of a live query's
/// result set. Undecodable wire codes never fail deserialization; they are
/// carried raw and rejected at application time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RemoteEvent {
    /// Merge entries into a block's extension fields.
    SetFields {
        id: BlockId,
        #[serde(default)]
        fields: BTreeMap<String, Value>,
    },
    /// New blocks stored. Carries no ordering: the remote pairs this with a
    /// `SetChildrenIds` for the affected parent in the same batch.
    BlockAdd {
        #[serde(default)]
        blocks: Vec<Block>,
    },
    /// Blocks deleted. Ordering fixed up by the paired `SetChildrenIds`.
    BlockDelete {
        #[serde(default)]
        ids: Vec<BlockId>,
    },
    /// Replace a parent's child list verbatim.
    SetChildrenIds {
        id: BlockId,
        #[serde(default)]
        children_ids: Vec<BlockId>,
    },
    /// Update a text block. Absent sub-fields mean "no change".
    SetText {
        id: BlockId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
        /// Raw style code, decoded via [`quire_types::TextStyle::from_code`].
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        checked: Option<bool>,
    },
    /// Set a block's background tint (raw color name).
    SetBackgroundColor {
        id: BlockId,
        color: String,
    },
    /// Set a block's horizontal alignment (raw code).
    SetAlign {
        id: BlockId,
        align: i32,
    },
    /// Update a file block's upload metadata.
    SetFile {
        id: BlockId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        hash: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        kind: Option<i32>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<i32>,
    },
    /// Update a bookmark block's fetched metadata.
    SetBookmark {
        id: BlockId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        title: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        description: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        state: Option<i32>,
    },
    /// Set a divider block's style (raw code).
    SetDiv {
        id: BlockId,
        style: i32,
    },
    /// Update a link block's target or presentation style.
    SetLink {
        id: BlockId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<ObjectId>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        style: Option<i32>,
    },
    /// Full replace of an object's details record. An absent payload is a
    /// remote-side artifact and applies nothing.
    ObjectDetailsSet {
        id: ObjectId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        details: Option<Details>,
    },
    /// Merge entries into an object's details record (amend).
    /// `subscription_ids` names the live queries whose result sets contain
    /// the object; ids with the dependency suffix are diagnostic-only.
    ObjectDetailsAmend {
        id: ObjectId,
        #[serde(default)]
        entries: Vec<(String, Value)>,
        #[serde(default)]
        subscription_ids: Vec<SubscriptionId>,
    },
    /// Remove keys from an object's details record (unset).
    ObjectDetailsUnset {
        id: ObjectId,
        #[serde(default)]
        keys: Vec<String>,
    },
    /// Sync pipeline status change (raw code).
    ThreadStatus {
        status: i32,
    },
    /// The remote finished materializing an already-open root; the client
    /// should re-render from current state.
    ObjectShow {
        root_id: ObjectId,
    },
    /// An entry of the subscription's result set moved. `after_id == None`
    /// means "front of the list".
    SubscriptionPosition {
        id: ObjectId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after_id: Option<ObjectId>,
    },
    /// An object entered the subscription's result set. Its details record
    /// arrives via a preceding amend in the same batch.
    SubscriptionAdd {
        id: ObjectId,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        after_id: Option<ObjectId>,
    },
    /// An object left the subscription's result set.
    SubscriptionRemove {
        id: ObjectId,
    },
    /// The subscription's total record count changed.
    SubscriptionCounters {
        total: u64,
    },
}

impl RemoteEvent {
    /// Short tag for logging.
    pub fn kind_str(&self) -> &'static str {
        match self {
            RemoteEvent::SetFields { .. } => "set_fields",
            RemoteEvent::BlockAdd { .. } => "block_add",
            RemoteEvent::BlockDelete { .. } => "block_delete",
            RemoteEvent::SetChildrenIds { .. } => "set_children_ids",
            RemoteEvent::SetText { .. } => "set_text",
            RemoteEvent::SetBackgroundColor { .. } => "set_background_color",
            RemoteEvent::SetAlign { .. } => "set_align",
            RemoteEvent::SetFile { .. } => "set_file",
            RemoteEvent::SetBookmark { .. } => "set_bookmark",
            RemoteEvent::SetDiv { .. } => "set_div",
            RemoteEvent::SetLink { .. } => "set_link",
            RemoteEvent::ObjectDetailsSet { .. } => "object_details_set",
            RemoteEvent::ObjectDetailsAmend { .. } => "object_details_amend",
            RemoteEvent::ObjectDetailsUnset { .. } => "object_details_unset",
            RemoteEvent::ThreadStatus { .. } => "thread_status",
            RemoteEvent::ObjectShow { .. } => "object_show",
            RemoteEvent::SubscriptionPosition { .. } => "subscription_position",
            RemoteEvent::SubscriptionAdd { .. } => "subscription_add",
            RemoteEvent::SubscriptionRemove { .. } => "subscription_remove",
            RemoteEvent::SubscriptionCounters { .. } => "subscription_counters",
        }
    }

    /// Whether the manager routes this variant (instead of the converter).
    pub fn is_subscription_scoped(&self) -> bool {
        matches!(
            self,
            RemoteEvent::ObjectDetailsAmend { .. }
                | RemoteEvent::SubscriptionPosition { .. }
                | RemoteEvent::SubscriptionAdd { .. }
                | RemoteEvent::SubscriptionRemove { .. }
                | RemoteEvent::SubscriptionCounters { .. }
        )
    }
}

// ============================================================================
// Tests
// ============================================================================
