//! Event converter: translates remote events into store mutations.
//!
//! One converter per open document. [`EventConverter::apply`] is a total
//! function over the event union: it mutates the block tree and details
//! store through their primitives and yields at most one [`UpdateSignal`]
//! describing the minimal scope a view needs to refresh.
//!
//! Failure policy, in order of precedence:
//! - unknown block / wrong content shape: skip with a diagnostic, no signal
//! - present-but-undecodable wire code: keep the existing value and signal a
//!   general rebuild (a safe scoped default cannot be determined)
//! - `BlockAdd`/`BlockDelete` never signal on their own; the remote pairs
//!   them with a `SetChildrenIds` for the affected parent in the same batch,
//!   and that event carries the rebuild. If the pairing is ever violated the
//!   tree silently diverges until the next rebuild, so the pairing is a
//!   remote-side contract, not a hint.

use quire_model::{BlockTree, SharedDetails};
use quire_types::{
    Alignment, BackgroundColor, Block, BlockContent, BlockId, BookmarkState, ContextId,
    Details, DividerStyle, FileKind, FileState, LinkStyle, ObjectId, SyncStatus, TextStyle,
};

use crate::events::{EventBatch, RemoteEvent};

// ============================================================================
// Update signal
// ============================================================================

/// The minimal UI-relevant scope of one applied event.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum UpdateSignal {
    /// Sync pipeline status changed.
    SyncStatus(SyncStatus),
    /// Only these blocks changed; a scoped re-render suffices.
    BlocksChanged(Vec<BlockId>),
    /// One object's metadata changed without affecting layout.
    DetailsChanged(ObjectId),
    /// Structure changed, or the change scope could not be determined.
    GeneralRebuild,
}

// ============================================================================
// Converter
// ============================================================================

/// Stateful per-document translator from remote events to store mutations.
pub struct EventConverter {
    /// Context the owning document was opened under.
    context_id: ContextId,

    /// The document's block tree (exclusively owned; single writer).
    tree: BlockTree,

    /// Details store shared with the subscription side.
    details: SharedDetails,
}

impl EventConverter {
    /// Create a converter for a document rooted at `root`.
    pub fn new(context_id: impl Into<ContextId>, root: Block, details: SharedDetails) -> Self {
        Self {
            context_id: context_id.into(),
            tree: BlockTree::new(root),
            details,
        }
    }

    pub fn context_id(&self) -> &ContextId {
        &self.context_id
    }

    /// Read access to the document's tree.
    pub fn tree(&self) -> &BlockTree {
        &self.tree
    }

    /// Apply every event of a batch in listed order, collecting the signals.
    ///
    /// A batch scoped to a different context is not this document's to apply
    /// and is dropped whole; generic (unscoped) batches pass through.
    pub fn apply_batch(&mut self, batch: &EventBatch) -> Vec<UpdateSignal> {
        if !batch.context_id.is_empty() && batch.context_id != self.context_id {
            tracing::trace!(
                batch = %batch.context_id,
                document = %self.context_id,
                "batch for another context ignored"
            );
            return Vec::new();
        }
        let mut signals = Vec::new();
        for event in &batch.events {
            if let Some(signal) = self.apply(event) {
                signals.push(signal);
            }
        }
        signals
    }

    /// Apply one event. Returns the update signal, or `None` when the event
    /// warrants no refresh (or could not be applied).
    pub fn apply(&mut self, event: &RemoteEvent) -> Option<UpdateSignal> {
        match event {
            RemoteEvent::SetFields { id, fields } => {
                match self.tree.update(id, |b| b.merge_fields(fields.clone())) {
                    Ok(()) => Some(UpdateSignal::BlocksChanged(vec![id.clone()])),
                    Err(err) => {
                        tracing::warn!(error = %err, "set_fields skipped");
                        None
                    }
                }
            }

            RemoteEvent::BlockAdd { blocks } => {
                for block in blocks {
                    if let Err(err) = self.tree.insert(block.clone()) {
                        tracing::warn!(error = %err, "block add skipped");
                    }
                }
                None
            }

            RemoteEvent::BlockDelete { ids } => {
                for id in ids {
                    if let Err(err) = self.tree.remove(id) {
                        tracing::warn!(error = %err, "block delete skipped");
                    }
                }
                None
            }

            RemoteEvent::SetChildrenIds { id, children_ids } => {
                self.tree.set_children(id, children_ids.clone());
                Some(UpdateSignal::GeneralRebuild)
            }

            RemoteEvent::SetText { id, text, style, checked } => {
                self.apply_set_text(id, text.as_deref(), *style, *checked)
            }

            RemoteEvent::SetBackgroundColor { id, color } => {
                if !self.tree.contains(id) {
                    tracing::warn!(block = %id, "set_background_color on unknown block, skipping");
                    return None;
                }
                match BackgroundColor::from_str(color) {
                    Some(decoded) => {
                        self.tree.update(id, |b| b.background_color = decoded).ok()?;
                        Some(UpdateSignal::BlocksChanged(vec![id.clone()]))
                    }
                    None => {
                        tracing::warn!(color, "unknown background color, keeping current");
                        Some(UpdateSignal::GeneralRebuild)
                    }
                }
            }

            RemoteEvent::SetAlign { id, align } => {
                if !self.tree.contains(id) {
                    tracing::warn!(block = %id, "set_align on unknown block, skipping");
                    return None;
                }
                match Alignment::from_code(*align) {
                    Some(decoded) => {
                        self.tree.update(id, |b| b.align = decoded).ok()?;
                        Some(UpdateSignal::BlocksChanged(vec![id.clone()]))
                    }
                    None => {
                        tracing::warn!(code = align, "unknown alignment code, keeping current");
                        Some(UpdateSignal::GeneralRebuild)
                    }
                }
            }

            RemoteEvent::SetFile { id, name, hash, kind, state } => {
                self.require_shape(id, "file", |c| matches!(c, BlockContent::File { .. }))?;

                let mut failed = false;
                let new_kind = decode_code(*kind, FileKind::from_code, "file kind", &mut failed);
                let new_state =
                    decode_code(*state, FileState::from_code, "file state", &mut failed);

                self.tree
                    .update(id, |b| {
                        if let BlockContent::File { name: n, hash: h, kind: k, state: s } =
                            &mut b.content
                        {
                            if let Some(name) = name {
                                *n = name.clone();
                            }
                            if let Some(hash) = hash {
                                *h = hash.clone();
                            }
                            if let Some(kind) = new_kind {
                                *k = kind;
                            }
                            if let Some(state) = new_state {
                                *s = state;
                            }
                        }
                    })
                    .ok()?;
                Some(self.scoped_or_rebuild(id, failed))
            }

            RemoteEvent::SetBookmark { id, url, title, description, state } => {
                self.require_shape(id, "bookmark", |c| matches!(c, BlockContent::Bookmark { .. }))?;

                let mut failed = false;
                let new_state =
                    decode_code(*state, BookmarkState::from_code, "bookmark state", &mut failed);

                self.tree
                    .update(id, |b| {
                        if let BlockContent::Bookmark { url: u, title: t, description: d, state: s } =
                            &mut b.content
                        {
                            if let Some(url) = url {
                                *u = url.clone();
                            }
                            if let Some(title) = title {
                                *t = title.clone();
                            }
                            if let Some(description) = description {
                                *d = description.clone();
                            }
                            if let Some(state) = new_state {
                                *s = state;
                            }
                        }
                    })
                    .ok()?;
                Some(self.scoped_or_rebuild(id, failed))
            }

            RemoteEvent::SetDiv { id, style } => {
                self.require_shape(id, "divider", |c| matches!(c, BlockContent::Divider { .. }))?;

                match DividerStyle::from_code(*style) {
                    Some(decoded) => {
                        self.tree
                            .update(id, |b| {
                                if let BlockContent::Divider { style } = &mut b.content {
                                    *style = decoded;
                                }
                            })
                            .ok()?;
                        Some(UpdateSignal::BlocksChanged(vec![id.clone()]))
                    }
                    None => {
                        tracing::warn!(code = style, "unknown divider style, keeping current");
                        Some(UpdateSignal::GeneralRebuild)
                    }
                }
            }

            RemoteEvent::SetLink { id, target, style } => {
                self.require_shape(id, "link", |c| matches!(c, BlockContent::Link { .. }))?;

                let mut failed = false;
                let new_style = decode_code(*style, LinkStyle::from_code, "link style", &mut failed);

                self.tree
                    .update(id, |b| {
                        if let BlockContent::Link { target: t, style: s } = &mut b.content {
                            if let Some(target) = target {
                                *t = target.clone();
                            }
                            if let Some(style) = new_style {
                                *s = style;
                            }
                        }
                    })
                    .ok()?;
                Some(self.scoped_or_rebuild(id, failed))
            }

            RemoteEvent::ObjectDetailsSet { id, details } => {
                // The event id is authoritative; the payload is stored under it
                // even if the remote filled the embedded id inconsistently.
                let mut record = details.clone()?;
                record.id = id.clone();
                self.details.write().add(record);
                Some(UpdateSignal::DetailsChanged(id.clone()))
            }

            RemoteEvent::ObjectDetailsAmend { id, entries, .. } => {
                let mut store = self.details.write();
                let old_layout = store.get(id).map(Details::layout).unwrap_or_default();
                let merged = store.merge(id, entries.iter().cloned());
                drop(store);
                Some(layout_sensitive_signal(id, old_layout, merged.layout()))
            }

            RemoteEvent::ObjectDetailsUnset { id, keys } => {
                let mut store = self.details.write();
                let old_layout = store.get(id).map(Details::layout).unwrap_or_default();
                let updated = store.unset(id, keys);
                drop(store);
                Some(layout_sensitive_signal(id, old_layout, updated.layout()))
            }

            RemoteEvent::ThreadStatus { status } => match SyncStatus::from_code(*status) {
                Some(decoded) => Some(UpdateSignal::SyncStatus(decoded)),
                None => {
                    tracing::warn!(code = status, "unknown sync status code, ignoring");
                    None
                }
            },

            RemoteEvent::ObjectShow { .. } => Some(UpdateSignal::GeneralRebuild),

            // Result-set bookkeeping is routed by the subscription manager,
            // not applied to document state.
            RemoteEvent::SubscriptionPosition { .. }
            | RemoteEvent::SubscriptionAdd { .. }
            | RemoteEvent::SubscriptionRemove { .. }
            | RemoteEvent::SubscriptionCounters { .. } => None,
        }
    }

    fn apply_set_text(
        &mut self,
        id: &BlockId,
        text: Option<&str>,
        style: Option<i32>,
        checked: Option<bool>,
    ) -> Option<UpdateSignal> {
        let Some(block) = self.tree.get(id) else {
            tracing::warn!(block = %id, "set_text on unknown block, skipping");
            return None;
        };
        let Some(old_style) = block.text_style() else {
            tracing::warn!(block = %id, kind = block.content.kind_str(), "set_text on non-text block, skipping");
            return None;
        };

        let mut failed = false;
        let new_style = decode_code(style, TextStyle::from_code, "text style", &mut failed);

        self.tree
            .update(id, |b| {
                if let BlockContent::Text { text: t, style: s, checked: c } = &mut b.content {
                    if let Some(text) = text {
                        *t = text.to_string();
                    }
                    if let Some(style) = new_style {
                        *s = style;
                    }
                    if let Some(checked) = checked {
                        *c = checked;
                    }
                }
            })
            .ok()?;

        if failed {
            return Some(UpdateSignal::GeneralRebuild);
        }
        // A toggle gained or lost its fold, so descendants change shape.
        let effective = new_style.unwrap_or(old_style);
        if effective.is_toggle() != old_style.is_toggle() {
            Some(UpdateSignal::GeneralRebuild)
        } else {
            Some(UpdateSignal::BlocksChanged(vec![id.clone()]))
        }
    }

    /// Probe that `id` exists and its content matches the event's kind.
    fn require_shape(
        &self,
        id: &BlockId,
        expected: &'static str,
        matches: impl Fn(&BlockContent) -> bool,
    ) -> Option<()> {
        let Some(block) = self.tree.get(id) else {
            tracing::warn!(block = %id, expected, "event targets unknown block, skipping");
            return None;
        };
        if !matches(&block.content) {
            tracing::warn!(
                block = %id,
                expected,
                actual = block.content.kind_str(),
                "event targets block of the wrong kind, skipping"
            );
            return None;
        }
        Some(())
    }

    fn scoped_or_rebuild(&self, id: &BlockId, decode_failed: bool) -> UpdateSignal {
        if decode_failed {
            UpdateSignal::GeneralRebuild
        } else {
            UpdateSignal::BlocksChanged(vec![id.clone()])
        }
    }
}

/// Decode an optional wire code. A present-but-unknown code flags `failed`
/// and decodes to `None` so the existing value stays untouched.
fn decode_code<T>(
    code: Option<i32>,
    decode: impl Fn(i32) -> Option<T>,
    what: &'static str,
    failed: &mut bool,
) -> Option<T> {
    let code = code?;
    match decode(code) {
        Some(value) => Some(value),
        None => {
            tracing::warn!(code, field = what, "unknown wire code, keeping current value");
            *failed = true;
            None
        }
    }
}

/// Details mutations escalate to a rebuild when they move the layout, since
/// layout selects the document chrome.
fn layout_sensitive_signal(
    id: &ObjectId,
    old: quire_types::DetailsLayout,
    new: quire_types::DetailsLayout,
) -> UpdateSignal {
    if old != new {
        UpdateSignal::GeneralRebuild
    } else {
        UpdateSignal::DetailsChanged(id.clone())
    }
}

// ============================================================================
// Tests
// ============================================================================
