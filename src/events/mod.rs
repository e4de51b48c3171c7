use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Queues an event for a change that has already been committed without
    /// waiting for channel capacity. A full or closed channel drops the event
    /// with a warning.
    pub fn send_or_log(&self, event: Event) {
        let kind = event.action();
        match self.sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                warn!(event = kind, "Event channel full; dropping event after commit");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!(event = kind, "Event channel closed; dropping event after commit");
            }
        }
    }
}

/// Creates a bounded event channel.
pub fn channel(capacity: usize) -> (EventSender, mpsc::Receiver<Event>) {
    let (tx, rx) = mpsc::channel(capacity);
    (EventSender::new(tx), rx)
}

/// Domain events emitted after a successful commit.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub enum Event {
    FeedConsumed {
        consumption_id: i32,
        flock_id: i32,
        feed_type: String,
        quantity: Decimal,
        batches_touched: usize,
        recorded_by: Uuid,
    },
    FeedBatchReceived {
        batch_id: i32,
        feed_type: String,
        quantity: Decimal,
        received_by: Uuid,
    },
    FlockCreated {
        flock_id: i32,
        name: String,
        bird_count: i32,
        created_by: Uuid,
    },
}

impl Event {
    /// Short action key stored alongside the activity entry.
    pub fn action(&self) -> &'static str {
        match self {
            Event::FeedConsumed { .. } => "feed_consumption",
            Event::FeedBatchReceived { .. } => "feed_receipt",
            Event::FlockCreated { .. } => "flock_created",
        }
    }

    /// The user the event is attributed to.
    pub fn actor(&self) -> Uuid {
        match self {
            Event::FeedConsumed { recorded_by, .. } => *recorded_by,
            Event::FeedBatchReceived { received_by, .. } => *received_by,
            Event::FlockCreated { created_by, .. } => *created_by,
        }
    }

    /// Human-readable activity description.
    pub fn description(&self) -> String {
        match self {
            Event::FeedConsumed {
                flock_id,
                feed_type,
                quantity,
                ..
            } => format!(
                "Recorded feed consumption of {} kg {} for flock #{}",
                quantity.normalize(),
                feed_type,
                flock_id
            ),
            Event::FeedBatchReceived {
                batch_id,
                feed_type,
                quantity,
                ..
            } => format!(
                "Received {} kg of {} as batch #{}",
                quantity.normalize(),
                feed_type,
                batch_id
            ),
            Event::FlockCreated {
                flock_id,
                name,
                bird_count,
                ..
            } => format!(
                "Registered flock #{} '{}' with {} birds",
                flock_id, name, bird_count
            ),
        }
    }
}

// Handlers implementing this trait consume events off the channel.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle_event(&self, event: Event) -> Result<(), String>;
}

/// Drains the channel, dispatching every event to each handler in turn.
pub async fn process_events(mut rx: mpsc::Receiver<Event>, handlers: Vec<Arc<dyn EventHandler>>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        info!(event = event.action(), "Received event");

        for handler in &handlers {
            if let Err(e) = handler.handle_event(event.clone()).await {
                error!(
                    event = event.action(),
                    error = %e,
                    "Event handler failed"
                );
            }
        }
    }

    warn!("Event processing loop has ended");
}
