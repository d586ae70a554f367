use bastion_dns_application::ports::{QueryEvent, QueryEventSink};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Hot-path side of query event hand-off: a bounded channel written with
/// `try_send`. When the consumer lags, events are dropped and counted —
/// the resolver is never backpressured.
#[derive(Clone)]
pub struct QueryEventEmitter {
    sender: Option<mpsc::Sender<QueryEvent>>,
    dropped: Arc<AtomicU64>,
}

impl QueryEventEmitter {
    pub fn disabled() -> Self {
        Self {
            sender: None,
            dropped: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn bounded(capacity: usize) -> (Self, mpsc::Receiver<QueryEvent>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender: Some(tx),
                dropped: Arc::new(AtomicU64::new(0)),
            },
            rx,
        )
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }

    pub fn is_enabled(&self) -> bool {
        self.sender.is_some()
    }
}

impl QueryEventSink for QueryEventEmitter {
    fn deliver(&self, event: QueryEvent) {
        if let Some(ref tx) = self.sender {
            if tx.try_send(event).is_err() {
                self.dropped.fetch_add(1, Ordering::Relaxed);
            }
        }
    }
}

/// Drains the channel into the actual consumer off the hot path.
pub fn spawn_event_drain(
    mut rx: mpsc::Receiver<QueryEvent>,
    consumer: Arc<dyn QueryEventSink>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            consumer.deliver(event);
        }
        debug!("Query event drain stopped");
    })
}
