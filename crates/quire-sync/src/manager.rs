//! Subscription manager: the registry of active live queries.
//!
//! Per subscription id the state machine is `Inactive → Active` (successful
//! `start`) `→ Inactive` (`stop`), nothing else. The manager consumes the
//! shared event broadcast via [`SubscriptionManager::route_batch`]: batches
//! whose context names an active subscription route to its handler, batches
//! with an empty context are generic and match every active subscription,
//! and everything else is dropped by the membership check. That check is
//! also the cancellation story: a batch already read from the broadcast when
//! `stop` lands simply finds no registration and is discarded.
//!
//! Result-set events arrive as low-level remote notifications and leave as
//! ordered, anchor-based list commands ([`SubscriptionUpdate`]).

use std::sync::Arc;

use indexmap::IndexMap;

use quire_model::SharedDetails;
use quire_types::SubscriptionId;

use crate::error::SyncError;
use crate::events::{EventBatch, RemoteEvent};
use crate::subscription::{
    SubscriptionHandler, SubscriptionSpec, SubscriptionUpdate, page_count,
};
use crate::toggler::{RemoteStore, SubscriptionToggler};

/// Manager handle shared between the dispatch loop and subscription owners.
///
/// An async mutex because `start`/`stop` hold the registry across their
/// remote call.
pub type SharedManager = Arc<tokio::sync::Mutex<SubscriptionManager>>;

/// Create a fresh shared manager.
pub fn shared_manager(store: Arc<dyn RemoteStore>, details: SharedDetails) -> SharedManager {
    Arc::new(tokio::sync::Mutex::new(SubscriptionManager::new(store, details)))
}

/// What a `start` call did.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StartOutcome {
    /// The remote query was started and its first page delivered.
    Started,
    /// The id already had an active registration; the existing one was kept
    /// and no remote call was made.
    AlreadyActive,
}

struct ActiveSubscription {
    spec: SubscriptionSpec,
    handler: Arc<dyn SubscriptionHandler>,
}

/// Stateful registry of active subscriptions plus the routing loop body.
pub struct SubscriptionManager {
    toggler: SubscriptionToggler,

    /// Details store shared with the document converters.
    details: SharedDetails,

    /// Active registrations in registration order. At most one per id.
    active: IndexMap<SubscriptionId, ActiveSubscription>,
}

impl SubscriptionManager {
    pub fn new(store: Arc<dyn RemoteStore>, details: SharedDetails) -> Self {
        Self {
            toggler: SubscriptionToggler::new(store),
            details,
            active: IndexMap::new(),
        }
    }

    pub fn is_active(&self, id: &SubscriptionId) -> bool {
        self.active.contains_key(id)
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    /// Active ids in registration order.
    pub fn active_ids(&self) -> Vec<SubscriptionId> {
        self.active.keys().cloned().collect()
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Start a live query and register `handler` for its updates.
    ///
    /// Ingests the first page into the details store, then synchronously
    /// delivers `InitialData` followed by `PageCount` to the handler. A
    /// duplicate start is a caller bug: it is reported and the existing
    /// registration is left untouched.
    pub async fn start(
        &mut self,
        spec: SubscriptionSpec,
        handler: Arc<dyn SubscriptionHandler>,
    ) -> Result<StartOutcome, SyncError> {
        if self.active.contains_key(&spec.id) {
            tracing::warn!(subscription = %spec.id, "start on already-active subscription, keeping existing registration");
            return Ok(StartOutcome::AlreadyActive);
        }

        let id = spec.id.clone();
        let response = self
            .toggler
            .start(&spec)
            .await
            .map_err(|err| SyncError::Remote(id.clone(), err))?;

        {
            let mut store = self.details.write();
            for record in &response.records {
                store.add(record.clone());
            }
        }

        let pages = page_count(response.total_count, spec.page_size);
        tracing::debug!(
            subscription = %id,
            records = response.records.len(),
            total = response.total_count,
            "subscription active"
        );
        self.active.insert(id.clone(), ActiveSubscription { spec, handler: handler.clone() });

        handler.on_update(&id, SubscriptionUpdate::InitialData(response.records));
        handler.on_update(&id, SubscriptionUpdate::PageCount(pages));
        Ok(StartOutcome::Started)
    }

    /// Tear down the live query for `id`. Idempotent: stopping an inactive
    /// id does nothing, remotely or locally.
    pub async fn stop(&mut self, id: &SubscriptionId) -> Result<(), SyncError> {
        if self.active.shift_remove(id).is_none() {
            tracing::debug!(subscription = %id, "stop on inactive subscription, nothing to do");
            return Ok(());
        }
        // Registration is gone either way; in-flight events for the id now
        // fall through the membership check.
        self.toggler
            .stop(id)
            .await
            .map_err(|err| SyncError::Remote(id.clone(), err))
    }

    // =========================================================================
    // Event routing
    // =========================================================================

    /// Route one batch from the shared broadcast.
    ///
    /// Scoped batches (non-empty context) must name an active subscription
    /// or the whole batch is dropped. Generic batches match every active
    /// subscription.
    pub fn route_batch(&self, batch: &EventBatch) {
        if batch.is_generic() {
            for event in &batch.events {
                self.route_event(event, None);
            }
            return;
        }

        let target = batch.context_id.as_subscription();
        if !self.active.contains_key(&target) {
            // Document batches and late events for stopped ids both land
            // here; neither is an error.
            tracing::trace!(context = %batch.context_id, "batch does not name an active subscription");
            return;
        }
        for event in &batch.events {
            self.route_event(event, Some(&target));
        }
    }

    fn route_event(&self, event: &RemoteEvent, target: Option<&SubscriptionId>) {
        match event {
            // Amends fan out by the event's own id list, not the batch
            // context: one record can sit in several result sets.
            RemoteEvent::ObjectDetailsAmend { id, entries, subscription_ids } => {
                let merged = self.details.write().merge(id, entries.iter().cloned());
                for sub_id in subscription_ids {
                    if sub_id.is_dependent() {
                        continue;
                    }
                    self.deliver(sub_id, SubscriptionUpdate::Update(merged.clone()));
                }
            }

            RemoteEvent::SubscriptionPosition { id, after_id } => {
                for sub_id in self.targets(target) {
                    self.deliver(
                        &sub_id,
                        SubscriptionUpdate::Move { id: id.clone(), after_id: after_id.clone() },
                    );
                }
            }

            RemoteEvent::SubscriptionAdd { id, after_id } => {
                // The record must have landed via an amend earlier in the
                // stream; recovering here would hide a remote-side bug.
                let Some(record) = self.details.read().get(id).cloned() else {
                    tracing::error!(object = %id, "subscription add for a record never amended, skipping");
                    return;
                };
                for sub_id in self.targets(target) {
                    self.deliver(
                        &sub_id,
                        SubscriptionUpdate::Add {
                            record: record.clone(),
                            after_id: after_id.clone(),
                        },
                    );
                }
            }

            RemoteEvent::SubscriptionRemove { id } => {
                for sub_id in self.targets(target) {
                    self.deliver(&sub_id, SubscriptionUpdate::Remove(id.clone()));
                }
            }

            RemoteEvent::SubscriptionCounters { total } => {
                for sub_id in self.targets(target) {
                    if let Some(active) = self.active.get(&sub_id) {
                        let pages = page_count(*total, active.spec.page_size);
                        self.deliver(&sub_id, SubscriptionUpdate::PageCount(pages));
                    }
                }
            }

            // Document-scoped events are the converter's business.
            _ => {}
        }
    }

    /// Ids an event addresses: the batch's subscription, or every active one
    /// for generic batches.
    fn targets(&self, target: Option<&SubscriptionId>) -> Vec<SubscriptionId> {
        match target {
            Some(id) => vec![id.clone()],
            None => self.active.keys().cloned().collect(),
        }
    }

    /// Hand one update to the handler for `id`, if still registered.
    fn deliver(&self, id: &SubscriptionId, update: SubscriptionUpdate) {
        match self.active.get(id) {
            Some(active) => active.handler.on_update(id, update),
            None => {
                tracing::debug!(subscription = %id, "dropping update for inactive subscription")
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
