//! End-to-end tests for the remote event pipeline.
//!
//! # Tiers
//!
//! - **Tier 0:** hand-driven dispatch. Batches go through
//!   `EventDispatcher::dispatch` one at a time, asserting tree state, result
//!   set order, and emitted signals after each step.
//! - **Tier 1:** stream lifecycle. The dispatcher runs as a spawned task
//!   draining a broadcast channel until the sender closes, and every batch
//!   sent before the close must land, in order.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::broadcast;

use quire_model::shared_details;
use quire_sync::{
    EventBatch, EventConverter, EventDispatcher, OrderedRecords, RemoteError, RemoteEvent,
    RemoteStore, SearchSubscribeRequest, SearchSubscribeResponse, SharedManager, SignalSink,
    StartOutcome, SubscriptionHandler, SubscriptionSpec, SubscriptionUpdate, UpdateSignal,
    shared_manager, tabs,
};
use quire_types::{Block, BlockId, ContextId, Details, ObjectId, SubscriptionId, detail_keys};

// ============================================================================
// Shared test doubles
// ============================================================================

/// Remote that serves one canned first page and records unsubscribe calls.
struct MockRemote {
    response: SearchSubscribeResponse,
    unsubscribes: Mutex<Vec<SubscriptionId>>,
}

impl MockRemote {
    fn serving(records: Vec<Details>, total_count: u64) -> Arc<Self> {
        Arc::new(Self {
            response: SearchSubscribeResponse { records, total_count },
            unsubscribes: Mutex::new(Vec::new()),
        })
    }
}

#[async_trait::async_trait]
impl RemoteStore for MockRemote {
    async fn search_subscribe(
        &self,
        _request: SearchSubscribeRequest,
    ) -> Result<SearchSubscribeResponse, RemoteError> {
        Ok(self.response.clone())
    }

    async fn search_unsubscribe(&self, id: SubscriptionId) -> Result<(), RemoteError> {
        self.unsubscribes.lock().push(id);
        Ok(())
    }
}

/// Handler that replays every update into an [`OrderedRecords`] mirror and
/// keeps the page counts it was told about.
#[derive(Default)]
struct TrackingHandler {
    records: Mutex<OrderedRecords>,
    page_counts: Mutex<Vec<u64>>,
}

impl TrackingHandler {
    fn ids(&self) -> Vec<String> {
        self.records
            .lock()
            .ids()
            .iter()
            .map(|id| id.as_str().to_string())
            .collect()
    }
}

impl SubscriptionHandler for TrackingHandler {
    fn on_update(&self, _id: &SubscriptionId, update: SubscriptionUpdate) {
        if let SubscriptionUpdate::PageCount(pages) = &update {
            self.page_counts.lock().push(*pages);
        }
        self.records.lock().apply(&update);
    }
}

/// Sink that records each signal with the context it was emitted for.
#[derive(Default)]
struct RecordingSink {
    signals: Mutex<Vec<(ContextId, UpdateSignal)>>,
}

impl SignalSink for RecordingSink {
    fn on_signal(&self, context: &ContextId, signal: UpdateSignal) {
        self.signals.lock().push((context.clone(), signal));
    }
}

fn record(id: &str, name: &str) -> Details {
    Details::new(id).with(detail_keys::NAME, name)
}

/// Start a "recent" subscription over `first_page` and open document `doc-1`
/// with a bare page root, all plumbed through one dispatcher.
async fn setup_pipeline(
    first_page: Vec<Details>,
    total_count: u64,
) -> (
    EventDispatcher,
    SharedManager,
    Arc<TrackingHandler>,
    Arc<RecordingSink>,
    Arc<MockRemote>,
) {
    let details = shared_details();
    let remote = MockRemote::serving(first_page, total_count);
    let manager = shared_manager(remote.clone(), details.clone());

    let handler = Arc::new(TrackingHandler::default());
    let outcome = manager
        .lock()
        .await
        .start(SubscriptionSpec::new(tabs::RECENT), handler.clone())
        .await
        .expect("start failed");
    assert_eq!(outcome, StartOutcome::Started);

    let sink = Arc::new(RecordingSink::default());
    let mut dispatcher = EventDispatcher::new(manager.clone(), sink.clone());
    dispatcher.open_document(EventConverter::new("doc-1", Block::page("root"), details));

    (dispatcher, manager, handler, sink, remote)
}

// ============================================================================
// Tier 0: hand-driven dispatch
// ============================================================================

#[tokio::test]
async fn test_mixed_traffic_on_one_stream() {
    let (mut dispatcher, _manager, handler, sink, _remote) =
        setup_pipeline(vec![record("o1", "First")], 1).await;

    // Document traffic: a new block wired under the root.
    dispatcher
        .dispatch(&EventBatch::new(
            "doc-1",
            vec![
                RemoteEvent::BlockAdd { blocks: vec![Block::text("b1", "hello")] },
                RemoteEvent::SetChildrenIds {
                    id: BlockId::new("root"),
                    children_ids: vec![BlockId::new("b1")],
                },
            ],
        ))
        .await;

    // Subscription traffic: o2 enters the result set after o1.
    dispatcher
        .dispatch(&EventBatch::new(
            tabs::RECENT,
            vec![
                RemoteEvent::ObjectDetailsAmend {
                    id: ObjectId::new("o2"),
                    entries: vec![(detail_keys::NAME.into(), json!("Second"))],
                    subscription_ids: vec![SubscriptionId::new(tabs::RECENT)],
                },
                RemoteEvent::SubscriptionAdd {
                    id: ObjectId::new("o2"),
                    after_id: Some(ObjectId::new("o1")),
                },
            ],
        ))
        .await;

    // Generic traffic: a count change with no batch context.
    dispatcher
        .dispatch(&EventBatch::generic(vec![RemoteEvent::SubscriptionCounters {
            total: 150,
        }]))
        .await;

    let tree = dispatcher
        .document(&ContextId::new("doc-1"))
        .expect("document open")
        .tree();
    assert!(tree.contains(&BlockId::new("b1")));
    assert_eq!(tree.parent(&BlockId::new("b1")), Some(&BlockId::new("root")));

    assert_eq!(handler.ids(), ["o1", "o2"]);
    assert_eq!(*handler.page_counts.lock(), vec![1, 2]);

    // The subscription batches never reach the document converter.
    assert_eq!(
        *sink.signals.lock(),
        vec![(ContextId::new("doc-1"), UpdateSignal::GeneralRebuild)]
    );
}

#[tokio::test]
async fn test_result_set_reconciliation_sequence() {
    let (mut dispatcher, _manager, handler, _sink, _remote) = setup_pipeline(
        vec![
            record("o1", "First"),
            record("o2", "Second"),
            record("o3", "Third"),
        ],
        3,
    )
    .await;

    let sub = |events| EventBatch::new(tabs::RECENT, events);

    // o3 moves to the front.
    dispatcher
        .dispatch(&sub(vec![RemoteEvent::SubscriptionPosition {
            id: ObjectId::new("o3"),
            after_id: None,
        }]))
        .await;
    assert_eq!(handler.ids(), ["o3", "o1", "o2"]);

    // o4 appears after o1: its record lands via the amend, then the add
    // places it.
    dispatcher
        .dispatch(&sub(vec![
            RemoteEvent::ObjectDetailsAmend {
                id: ObjectId::new("o4"),
                entries: vec![(detail_keys::NAME.into(), json!("Fourth"))],
                subscription_ids: vec![SubscriptionId::new(tabs::RECENT)],
            },
            RemoteEvent::SubscriptionAdd {
                id: ObjectId::new("o4"),
                after_id: Some(ObjectId::new("o1")),
            },
        ]))
        .await;
    assert_eq!(handler.ids(), ["o3", "o1", "o4", "o2"]);

    // o2 falls out.
    dispatcher
        .dispatch(&sub(vec![RemoteEvent::SubscriptionRemove {
            id: ObjectId::new("o2"),
        }]))
        .await;
    assert_eq!(handler.ids(), ["o3", "o1", "o4"]);

    // o1 renamed in place, order untouched.
    dispatcher
        .dispatch(&sub(vec![RemoteEvent::ObjectDetailsAmend {
            id: ObjectId::new("o1"),
            entries: vec![(detail_keys::NAME.into(), json!("First, renamed"))],
            subscription_ids: vec![SubscriptionId::new(tabs::RECENT)],
        }]))
        .await;
    assert_eq!(handler.ids(), ["o3", "o1", "o4"]);
    assert_eq!(handler.records.lock().records()[1].name(), "First, renamed");

    // The total grows past three pages.
    dispatcher
        .dispatch(&sub(vec![RemoteEvent::SubscriptionCounters { total: 301 }]))
        .await;
    assert_eq!(handler.page_counts.lock().last(), Some(&4));
}

#[tokio::test]
async fn test_stop_discards_in_flight_batches() {
    let (mut dispatcher, manager, handler, _sink, remote) =
        setup_pipeline(vec![record("o1", "First")], 1).await;

    manager
        .lock()
        .await
        .stop(&SubscriptionId::new(tabs::RECENT))
        .await
        .expect("stop failed");

    // A batch that was already in the stream when the stop landed.
    dispatcher
        .dispatch(&EventBatch::new(
            tabs::RECENT,
            vec![
                RemoteEvent::ObjectDetailsAmend {
                    id: ObjectId::new("o2"),
                    entries: vec![(detail_keys::NAME.into(), json!("Second"))],
                    subscription_ids: vec![SubscriptionId::new(tabs::RECENT)],
                },
                RemoteEvent::SubscriptionAdd {
                    id: ObjectId::new("o2"),
                    after_id: None,
                },
            ],
        ))
        .await;

    assert_eq!(handler.ids(), ["o1"]);
    assert_eq!(
        *remote.unsubscribes.lock(),
        vec![SubscriptionId::new(tabs::RECENT)]
    );

    // Stopping again is a no-op, remotely and locally.
    manager
        .lock()
        .await
        .stop(&SubscriptionId::new(tabs::RECENT))
        .await
        .expect("second stop failed");
    assert_eq!(remote.unsubscribes.lock().len(), 1);
}

// ============================================================================
// Tier 1: stream lifecycle
// ============================================================================

#[tokio::test]
async fn test_stream_lifecycle_drains_until_close() {
    let (dispatcher, _manager, handler, sink, _remote) =
        setup_pipeline(vec![record("o1", "First")], 1).await;

    let (tx, rx) = broadcast::channel(16);
    let task = tokio::spawn(dispatcher.run(rx));

    tx.send(EventBatch::new(
        "doc-1",
        vec![
            RemoteEvent::BlockAdd { blocks: vec![Block::text("b1", "hello")] },
            RemoteEvent::SetChildrenIds {
                id: BlockId::new("root"),
                children_ids: vec![BlockId::new("b1")],
            },
        ],
    ))
    .expect("send failed");
    tx.send(EventBatch::new(
        tabs::RECENT,
        vec![RemoteEvent::SubscriptionRemove { id: ObjectId::new("o1") }],
    ))
    .expect("send failed");
    tx.send(EventBatch::generic(vec![RemoteEvent::SubscriptionCounters {
        total: 205,
    }]))
    .expect("send failed");

    // Closing the channel is the shutdown signal; batches sent before the
    // close must still be processed, in order.
    drop(tx);
    task.await.expect("dispatcher task panicked");

    assert!(handler.ids().is_empty());
    assert_eq!(*handler.page_counts.lock(), vec![1, 3]);
    assert_eq!(
        *sink.signals.lock(),
        vec![(ContextId::new("doc-1"), UpdateSignal::GeneralRebuild)]
    );
}
