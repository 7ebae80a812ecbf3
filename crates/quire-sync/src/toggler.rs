//! Subscription toggler: the thin layer over the remote store's query calls.
//!
//! The remote store is an opaque collaborator behind [`RemoteStore`]: it
//! accepts a start request, answers with the first page and a total, and
//! keeps pushing result-set events until told to stop. The toggler maps a
//! [`SubscriptionSpec`] onto the wire request and nothing more. Failures
//! propagate to the caller untouched: no retry, no backoff at this layer.

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use quire_types::{Details, ObjectId, SubscriptionId};

use crate::error::RemoteError;
use crate::subscription::{FilterExpr, SortExpr, SubscriptionSpec};

// ============================================================================
// Wire shapes
// ============================================================================

/// Start request for a live query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SearchSubscribeRequest {
    pub subscription_id: SubscriptionId,
    #[serde(default)]
    pub filters: Vec<FilterExpr>,
    #[serde(default)]
    pub sorts: Vec<SortExpr>,
    #[serde(default)]
    pub full_text: String,
    pub limit: u64,
    pub offset: u64,
    #[serde(default)]
    pub keys: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_id: Option<ObjectId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_id: Option<ObjectId>,
    #[serde(default)]
    pub source: Vec<String>,
}

/// First page of a started query.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchSubscribeResponse {
    #[serde(default)]
    pub records: Vec<Details>,
    #[serde(default)]
    pub total_count: u64,
}

// ============================================================================
// Remote store seam
// ============================================================================

/// The remote store's subscription surface.
///
/// Calls are request/response from the caller's perspective; the event
/// stream that a started query feeds arrives separately over the shared
/// broadcast.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn search_subscribe(
        &self,
        request: SearchSubscribeRequest,
    ) -> Result<SearchSubscribeResponse, RemoteError>;

    async fn search_unsubscribe(&self, id: SubscriptionId) -> Result<(), RemoteError>;
}

// ============================================================================
// Toggler
// ============================================================================

/// Starts and stops live queries against the remote store.
pub struct SubscriptionToggler {
    store: Arc<dyn RemoteStore>,
}

impl SubscriptionToggler {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    /// Issue the start call for `spec` and return its first page.
    pub async fn start(&self, spec: &SubscriptionSpec) -> Result<SearchSubscribeResponse, RemoteError> {
        let request = SearchSubscribeRequest {
            subscription_id: spec.id.clone(),
            filters: spec.filters.clone(),
            sorts: spec.sorts.clone(),
            full_text: spec.full_text.clone(),
            limit: spec.page_size,
            offset: spec.offset(),
            keys: spec.keys.clone(),
            after_id: spec.after_id.clone(),
            before_id: spec.before_id.clone(),
            source: spec.source.clone(),
        };
        tracing::debug!(subscription = %spec.id, offset = request.offset, "starting live query");
        self.store.search_subscribe(request).await
    }

    /// Tear down the live query for `id`.
    pub async fn stop(&self, id: &SubscriptionId) -> Result<(), RemoteError> {
        tracing::debug!(subscription = %id, "stopping live query");
        self.store.search_unsubscribe(id.clone()).await
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::subscription::PAGE_SIZE;
    use parking_lot::Mutex;
    use quire_types::detail_keys;

    #[derive(Default)]
    struct CapturingStore {
        requests: Mutex<Vec<SearchSubscribeRequest>>,
        stopped: Mutex<Vec<SubscriptionId>>,
    }

    #[async_trait]
    impl RemoteStore for CapturingStore {
        async fn search_subscribe(
            &self,
            request: SearchSubscribeRequest,
        ) -> Result<SearchSubscribeResponse, RemoteError> {
            self.requests.lock().push(request);
            Ok(SearchSubscribeResponse { records: vec![], total_count: 0 })
        }

        async fn search_unsubscribe(&self, id: SubscriptionId) -> Result<(), RemoteError> {
            self.stopped.lock().push(id);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_start_maps_spec_onto_request() {
        let store = Arc::new(CapturingStore::default());
        let toggler = SubscriptionToggler::new(store.clone());

        let spec = SubscriptionSpec::new("tab.recent")
            .with_sort(SortExpr::desc(detail_keys::LAST_MODIFIED))
            .with_full_text("roadmap")
            .on_page(3);
        toggler.start(&spec).await.unwrap();

        let requests = store.requests.lock();
        assert_eq!(requests.len(), 1);
        let request = &requests[0];
        assert_eq!(request.subscription_id, SubscriptionId::new("tab.recent"));
        assert_eq!(request.limit, PAGE_SIZE);
        assert_eq!(request.offset, 2 * PAGE_SIZE);
        assert_eq!(request.full_text, "roadmap");
        assert_eq!(request.sorts, vec![SortExpr::desc(detail_keys::LAST_MODIFIED)]);
    }

    #[tokio::test]
    async fn test_stop_names_the_subscription() {
        let store = Arc::new(CapturingStore::default());
        let toggler = SubscriptionToggler::new(store.clone());

        toggler.stop(&SubscriptionId::new("tab.recent")).await.unwrap();

        assert_eq!(store.stopped.lock().as_slice(), &[SubscriptionId::new("tab.recent")]);
    }

    #[tokio::test]
    async fn test_remote_failure_propagates() {
        struct FailingStore;

        #[async_trait]
        impl RemoteStore for FailingStore {
            async fn search_subscribe(
                &self,
                _request: SearchSubscribeRequest,
            ) -> Result<SearchSubscribeResponse, RemoteError> {
                Err(RemoteError::Transport("connection reset".into()))
            }

            async fn search_unsubscribe(&self, _id: SubscriptionId) -> Result<(), RemoteError> {
                Err(RemoteError::Rejected("unknown subscription".into()))
            }
        }

        let toggler = SubscriptionToggler::new(Arc::new(FailingStore));
        let err = toggler.start(&SubscriptionSpec::new("tab.sets")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Transport(_)));

        let err = toggler.stop(&SubscriptionId::new("tab.sets")).await.unwrap_err();
        assert!(matches!(err, RemoteError::Rejected(_)));
    }
}
