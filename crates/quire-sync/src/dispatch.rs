//! Event dispatcher: the single consumer of the remote broadcast.
//!
//! Exactly one dispatcher drains the event stream, so batches are processed
//! strictly in arrival order and the stores see a single writer. Each batch
//! goes two ways: the subscription manager routes result-set events by its
//! registry, and the converter registered for the batch's context applies
//! document events. Signals cross to the owning view through [`SignalSink`],
//! fire-and-forget.
//!
//! A lagged broadcast (consumer slower than producer) drops the oldest
//! batches; the dispatcher logs how many and keeps going with the newest.
//! Processing correctness is per delivered batch; delivery itself is the
//! transport's problem.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::broadcast;

use quire_types::ContextId;

use crate::converter::{EventConverter, UpdateSignal};
use crate::events::EventBatch;
use crate::manager::SharedManager;

/// Receiver for document update signals.
///
/// Called from the dispatch loop; implementations hop to their own
/// execution context and never block.
pub trait SignalSink: Send + Sync {
    fn on_signal(&self, context: &ContextId, signal: UpdateSignal);
}

/// Routes remote event batches to document converters and the subscription
/// manager.
pub struct EventDispatcher {
    /// Converters for open documents, keyed by context.
    documents: HashMap<ContextId, EventConverter>,

    manager: SharedManager,

    sink: Arc<dyn SignalSink>,
}

impl EventDispatcher {
    pub fn new(manager: SharedManager, sink: Arc<dyn SignalSink>) -> Self {
        Self {
            documents: HashMap::new(),
            manager,
            sink,
        }
    }

    /// Register a converter for an open document. Re-opening a context
    /// replaces the previous converter (the remote resends the document
    /// snapshot on open).
    pub fn open_document(&mut self, converter: EventConverter) {
        let context = converter.context_id().clone();
        if self.documents.insert(context.clone(), converter).is_some() {
            tracing::debug!(context = %context, "reopened document, replacing converter");
        }
    }

    /// Drop the converter for a closed document.
    pub fn close_document(&mut self, context: &ContextId) -> Option<EventConverter> {
        self.documents.remove(context)
    }

    /// The converter for an open document.
    pub fn document(&self, context: &ContextId) -> Option<&EventConverter> {
        self.documents.get(context)
    }

    pub fn open_count(&self) -> usize {
        self.documents.len()
    }

    /// Drain `events` until the channel closes.
    pub async fn run(mut self, mut events: broadcast::Receiver<EventBatch>) {
        loop {
            match events.recv().await {
                Ok(batch) => self.dispatch(&batch).await,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    tracing::warn!(missed, "event broadcast lagged, continuing with newest");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::debug!("event broadcast closed, dispatcher exiting");
                    return;
                }
            }
        }
    }

    /// Apply one batch: subscription routing first, then the owning
    /// document's converter, events in listed order within each.
    pub async fn dispatch(&mut self, batch: &EventBatch) {
        tracing::trace!(
            context = %batch.context_id,
            events = batch.events.len(),
            "dispatching batch"
        );
        self.manager.lock().await.route_batch(batch);

        if let Some(converter) = self.documents.get_mut(&batch.context_id) {
            for signal in converter.apply_batch(batch) {
                self.sink.on_signal(&batch.context_id, signal);
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
