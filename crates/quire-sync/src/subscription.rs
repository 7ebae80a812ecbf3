//! Subscription vocabulary: query specs, update events, and result tracking.
//!
//! A subscription is a live, paginated, filtered query against the remote
//! store. The well-known tab ids cover the fixed home-screen queries; ad-hoc
//! queries mint their own id via [`quire_types::SubscriptionId::generate`].
//! Updates arrive as anchor-based list commands (`add after X`, `move to
//! front`) that [`OrderedRecords`] can replay into an ordered result set.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use quire_types::{Details, ObjectId, SubscriptionId, detail_keys};

/// Fixed page size for subscription queries.
pub const PAGE_SIZE: u64 = 100;

/// Well-known subscription ids for the home-screen tabs.
pub mod tabs {
    pub const FAVORITES: &str = "tab.favorites";
    pub const RECENT: &str = "tab.recent";
    pub const SETS: &str = "tab.sets";
    pub const BIN: &str = "tab.bin";
}

// ============================================================================
// Page math
// ============================================================================

/// Number of pages for `total` records. Integer arithmetic, never below 1:
/// an empty result set still renders one (empty) page.
pub fn page_count(total: u64, page_size: u64) -> u64 {
    total.div_ceil(page_size.max(1)).max(1)
}

/// Record offset of a 1-based page number.
pub fn page_offset(page: u64, page_size: u64) -> u64 {
    page.saturating_sub(1) * page_size
}

// ============================================================================
// Query expressions
// ============================================================================

/// One predicate over a details key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FilterExpr {
    pub key: String,
    pub condition: FilterCondition,
    pub value: Value,
}

impl FilterExpr {
    pub fn equal(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { key: key.into(), condition: FilterCondition::Equal, value: value.into() }
    }

    pub fn not_equal(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self { key: key.into(), condition: FilterCondition::NotEqual, value: value.into() }
    }

    pub fn one_of(key: impl Into<String>, values: impl Into<Value>) -> Self {
        Self { key: key.into(), condition: FilterCondition::In, value: values.into() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterCondition {
    Equal,
    NotEqual,
    Greater,
    Less,
    GreaterOrEqual,
    LessOrEqual,
    Like,
    In,
    NotIn,
    Empty,
    NotEmpty,
}

/// One sort key with direction.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SortExpr {
    pub key: String,
    pub order: SortOrder,
}

impl SortExpr {
    pub fn asc(key: impl Into<String>) -> Self {
        Self { key: key.into(), order: SortOrder::Asc }
    }

    pub fn desc(key: impl Into<String>) -> Self {
        Self { key: key.into(), order: SortOrder::Desc }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortOrder {
    Asc,
    Desc,
}

// ============================================================================
// Subscription spec
// ============================================================================

/// Everything needed to start a live query.
#[derive(Clone, Debug, PartialEq)]
pub struct SubscriptionSpec {
    pub id: SubscriptionId,
    pub filters: Vec<FilterExpr>,
    pub sorts: Vec<SortExpr>,
    pub full_text: String,
    /// Details keys to project into the returned records.
    pub keys: Vec<String>,
    /// Restrict the query to these sources (empty = all).
    pub source: Vec<String>,
    pub page_size: u64,
    /// 1-based page to fetch on start.
    pub current_page: u64,
    pub after_id: Option<ObjectId>,
    pub before_id: Option<ObjectId>,
}

impl SubscriptionSpec {
    pub fn new(id: impl Into<SubscriptionId>) -> Self {
        Self {
            id: id.into(),
            filters: Vec::new(),
            sorts: Vec::new(),
            full_text: String::new(),
            keys: default_keys(),
            source: Vec::new(),
            page_size: PAGE_SIZE,
            current_page: 1,
            after_id: None,
            before_id: None,
        }
    }

    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_sort(mut self, sort: SortExpr) -> Self {
        self.sorts.push(sort);
        self
    }

    pub fn with_full_text(mut self, text: impl Into<String>) -> Self {
        self.full_text = text.into();
        self
    }

    pub fn with_keys<I, S>(mut self, keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keys = keys.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_source<I, S>(mut self, source: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.source = source.into_iter().map(Into::into).collect();
        self
    }

    pub fn on_page(mut self, page: u64) -> Self {
        self.current_page = page;
        self
    }

    /// Record offset of `current_page`.
    pub fn offset(&self) -> u64 {
        page_offset(self.current_page, self.page_size)
    }
}

/// Default projection: the keys every list view renders.
pub fn default_keys() -> Vec<String> {
    [
        detail_keys::NAME,
        detail_keys::LAYOUT,
        detail_keys::ICON_EMOJI,
        detail_keys::TYPE,
        detail_keys::DONE,
        detail_keys::IS_ARCHIVED,
        detail_keys::LAST_MODIFIED,
    ]
    .iter()
    .map(|k| k.to_string())
    .collect()
}

// ============================================================================
// Updates and handlers
// ============================================================================

/// One ordered list command delivered to a subscription's handler.
///
/// `after_id == None` anchors at the front of the result set.
#[derive(Clone, Debug, PartialEq)]
pub enum SubscriptionUpdate {
    /// The first page, delivered once on start.
    InitialData(Vec<Details>),
    /// An existing record's details changed in place.
    Update(Details),
    /// A record entered the result set.
    Add { record: Details, after_id: Option<ObjectId> },
    /// A record moved within the result set.
    Move { id: ObjectId, after_id: Option<ObjectId> },
    /// A record left the result set.
    Remove(ObjectId),
    /// Page count recomputed from the remote total.
    PageCount(u64),
}

/// Receiver for a subscription's updates.
///
/// Invoked from the single event-processing path; implementations that feed
/// a UI hop off themselves, fire-and-forget.
pub trait SubscriptionHandler: Send + Sync {
    fn on_update(&self, id: &SubscriptionId, update: SubscriptionUpdate);
}

// ============================================================================
// Ordered result tracking
// ============================================================================

/// An ordered result set maintained by replaying [`SubscriptionUpdate`]s.
#[derive(Debug, Default)]
pub struct OrderedRecords {
    records: Vec<Details>,
}

impl OrderedRecords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> &[Details] {
        &self.records
    }

    pub fn ids(&self) -> Vec<ObjectId> {
        self.records.iter().map(|r| r.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Replay one update into the ordered set.
    pub fn apply(&mut self, update: &SubscriptionUpdate) {
        match update {
            SubscriptionUpdate::InitialData(records) => {
                self.records = records.clone();
            }
            SubscriptionUpdate::Update(record) => {
                match self.records.iter_mut().find(|r| r.id == record.id) {
                    Some(slot) => *slot = record.clone(),
                    None => {
                        tracing::debug!(object = %record.id, "update for untracked record, ignoring")
                    }
                }
            }
            SubscriptionUpdate::Add { record, after_id } => {
                // Replayed adds replace rather than duplicate.
                self.records.retain(|r| r.id != record.id);
                let index = self.anchor_index(after_id.as_ref());
                self.records.insert(index, record.clone());
            }
            SubscriptionUpdate::Move { id, after_id } => {
                let Some(current) = self.records.iter().position(|r| r.id == *id) else {
                    tracing::debug!(object = %id, "move for untracked record, ignoring");
                    return;
                };
                let record = self.records.remove(current);
                let index = self.anchor_index(after_id.as_ref());
                self.records.insert(index, record);
            }
            SubscriptionUpdate::Remove(id) => {
                self.records.retain(|r| r.id != *id);
            }
            SubscriptionUpdate::PageCount(_) => {}
        }
    }

    /// Insertion index for an anchor: after the anchor record, front when the
    /// anchor is `None`, end when the anchor is not tracked.
    fn anchor_index(&self, after_id: Option<&ObjectId>) -> usize {
        match after_id {
            None => 0,
            Some(anchor) => match self.records.iter().position(|r| r.id == *anchor) {
                Some(index) => index + 1,
                None => {
                    tracing::debug!(anchor = %anchor, "anchor not tracked, appending");
                    self.records.len()
                }
            },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> Details {
        Details::new(ObjectId::new(id)).with(detail_keys::NAME, id)
    }

    fn tracked(ids: &[&str]) -> OrderedRecords {
        let mut records = OrderedRecords::new();
        records.apply(&SubscriptionUpdate::InitialData(
            ids.iter().map(|id| record(id)).collect(),
        ));
        records
    }

    fn object_ids(ids: &[&str]) -> Vec<ObjectId> {
        ids.iter().map(ObjectId::new).collect()
    }

    // ── Page math ───────────────────────────────────────────────────────

    #[test]
    fn test_page_count_edges() {
        assert_eq!(page_count(0, 100), 1);
        assert_eq!(page_count(1, 100), 1);
        assert_eq!(page_count(100, 100), 1);
        assert_eq!(page_count(101, 100), 2);
        assert_eq!(page_count(250, 100), 3);
    }

    #[test]
    fn test_page_offset_is_one_based() {
        assert_eq!(page_offset(1, 100), 0);
        assert_eq!(page_offset(3, 100), 200);
        // Page 0 is treated as page 1 rather than underflowing.
        assert_eq!(page_offset(0, 100), 0);
    }

    #[test]
    fn test_spec_offset_follows_current_page() {
        let spec = SubscriptionSpec::new("tab.recent").on_page(2);
        assert_eq!(spec.offset(), PAGE_SIZE);
    }

    // ── Spec builder ────────────────────────────────────────────────────

    #[test]
    fn test_spec_defaults() {
        let spec = SubscriptionSpec::new(tabs::FAVORITES);
        assert_eq!(spec.page_size, PAGE_SIZE);
        assert_eq!(spec.current_page, 1);
        assert!(spec.keys.contains(&detail_keys::NAME.to_string()));
        assert!(spec.filters.is_empty());
    }

    #[test]
    fn test_spec_builder_accumulates() {
        let spec = SubscriptionSpec::new(tabs::SETS)
            .with_filter(FilterExpr::equal(detail_keys::IS_ARCHIVED, false))
            .with_filter(FilterExpr::not_equal(detail_keys::TYPE, "template"))
            .with_sort(SortExpr::desc(detail_keys::LAST_MODIFIED))
            .with_full_text("roadmap");

        assert_eq!(spec.filters.len(), 2);
        assert_eq!(spec.sorts.len(), 1);
        assert_eq!(spec.full_text, "roadmap");
    }

    // ── Ordered replay ──────────────────────────────────────────────────

    #[test]
    fn test_move_to_front_with_no_anchor() {
        let mut records = tracked(&["a", "b", "c"]);
        records.apply(&SubscriptionUpdate::Move { id: ObjectId::new("c"), after_id: None });
        assert_eq!(records.ids(), object_ids(&["c", "a", "b"]));
    }

    #[test]
    fn test_move_after_anchor() {
        let mut records = tracked(&["a", "b", "c"]);
        records.apply(&SubscriptionUpdate::Move {
            id: ObjectId::new("a"),
            after_id: Some(ObjectId::new("b")),
        });
        assert_eq!(records.ids(), object_ids(&["b", "a", "c"]));
    }

    #[test]
    fn test_add_anchored_and_front() {
        let mut records = tracked(&["a", "b"]);

        records.apply(&SubscriptionUpdate::Add {
            record: record("x"),
            after_id: Some(ObjectId::new("a")),
        });
        assert_eq!(records.ids(), object_ids(&["a", "x", "b"]));

        records.apply(&SubscriptionUpdate::Add { record: record("y"), after_id: None });
        assert_eq!(records.ids(), object_ids(&["y", "a", "x", "b"]));
    }

    #[test]
    fn test_add_with_unknown_anchor_appends() {
        let mut records = tracked(&["a"]);
        records.apply(&SubscriptionUpdate::Add {
            record: record("x"),
            after_id: Some(ObjectId::new("ghost")),
        });
        assert_eq!(records.ids(), object_ids(&["a", "x"]));
    }

    #[test]
    fn test_replayed_add_does_not_duplicate() {
        let mut records = tracked(&["a", "b"]);
        records.apply(&SubscriptionUpdate::Add {
            record: record("a"),
            after_id: Some(ObjectId::new("b")),
        });
        assert_eq!(records.ids(), object_ids(&["b", "a"]));
    }

    #[test]
    fn test_remove_and_untracked_move() {
        let mut records = tracked(&["a", "b"]);

        records.apply(&SubscriptionUpdate::Remove(ObjectId::new("a")));
        assert_eq!(records.ids(), object_ids(&["b"]));

        // Late move for the removed record must not reintroduce it.
        records.apply(&SubscriptionUpdate::Move { id: ObjectId::new("a"), after_id: None });
        assert_eq!(records.ids(), object_ids(&["b"]));
    }

    #[test]
    fn test_update_replaces_in_place() {
        let mut records = tracked(&["a", "b"]);
        let renamed = Details::new(ObjectId::new("b")).with(detail_keys::NAME, "Renamed");

        records.apply(&SubscriptionUpdate::Update(renamed));

        assert_eq!(records.ids(), object_ids(&["a", "b"]));
        assert_eq!(records.records()[1].name(), "Renamed");
    }
}
