//! Batch progress events
//!
//! The batch orchestrator reports item transitions on an [`EventBus`]; the
//! HTTP layer forwards them to SSE clients. Events are informational: the
//! authoritative item status lives in the result store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use uuid::Uuid;

/// Lifecycle status of one batch item
///
/// `Pending` → `Processing` → `Completed`, or `Failed` (terminal) from any
/// non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ItemStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl ItemStatus {
    /// Storage/wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            ItemStatus::Pending => "pending",
            ItemStatus::Processing => "processing",
            ItemStatus::Completed => "completed",
            ItemStatus::Failed => "failed",
        }
    }

    /// Parse the storage representation
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(ItemStatus::Pending),
            "processing" => Some(ItemStatus::Processing),
            "completed" => Some(ItemStatus::Completed),
            "failed" => Some(ItemStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ItemStatus::Completed | ItemStatus::Failed)
    }
}

impl std::fmt::Display for ItemStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Events broadcast while a batch runs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum EchotagEvent {
    /// A batch request was accepted and validated
    BatchStarted {
        batch_id: Uuid,
        total_files: usize,
        timestamp: DateTime<Utc>,
    },

    /// One item moved to a new status
    ItemStatusChanged {
        batch_id: Uuid,
        file_path: String,
        status: ItemStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
        timestamp: DateTime<Utc>,
    },

    /// All items finished (or the batch was cancelled)
    BatchCompleted {
        batch_id: Uuid,
        total_files: usize,
        processed: usize,
        errors: usize,
        execution_time_seconds: f64,
        timestamp: DateTime<Utc>,
    },
}

impl EchotagEvent {
    /// Get event type as string for SSE `event:` lines
    pub fn event_type(&self) -> &'static str {
        match self {
            EchotagEvent::BatchStarted { .. } => "BatchStarted",
            EchotagEvent::ItemStatusChanged { .. } => "ItemStatusChanged",
            EchotagEvent::BatchCompleted { .. } => "BatchCompleted",
        }
    }

    pub fn batch_id(&self) -> Uuid {
        match self {
            EchotagEvent::BatchStarted { batch_id, .. }
            | EchotagEvent::ItemStatusChanged { batch_id, .. }
            | EchotagEvent::BatchCompleted { batch_id, .. } => *batch_id,
        }
    }
}

/// Broadcast bus for [`EchotagEvent`]s
///
/// Cloning is cheap; all clones share one channel.
#[derive(Debug, Clone)]
pub struct EventBus {
    tx: broadcast::Sender<EchotagEvent>,
    capacity: usize,
}

impl EventBus {
    /// Creates a new EventBus with specified channel capacity
    ///
    /// # Arguments
    ///
    /// * `capacity` - Number of events to buffer before slow subscribers lag
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx, capacity }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<EchotagEvent> {
        self.tx.subscribe()
    }

    /// Emit an event to all subscribers
    ///
    /// Returns `Err` if no subscribers are listening.
    #[allow(clippy::result_large_err)]
    pub fn emit(
        &self,
        event: EchotagEvent,
    ) -> Result<usize, broadcast::error::SendError<EchotagEvent>> {
        self.tx.send(event)
    }

    /// Emit an event, ignoring if no subscribers are listening
    ///
    /// Progress events are advisory, so this is what the orchestrator uses.
    pub fn emit_lossy(&self, event: EchotagEvent) {
        let _ = self.tx.send(event);
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_item_status_round_trips_through_storage_form() {
        for status in [
            ItemStatus::Pending,
            ItemStatus::Processing,
            ItemStatus::Completed,
            ItemStatus::Failed,
        ] {
            assert_eq!(ItemStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(ItemStatus::parse("error"), None);
    }

    #[test]
    fn test_terminal_states() {
        assert!(ItemStatus::Completed.is_terminal());
        assert!(ItemStatus::Failed.is_terminal());
        assert!(!ItemStatus::Pending.is_terminal());
        assert!(!ItemStatus::Processing.is_terminal());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&ItemStatus::Processing).unwrap();
        assert_eq!(json, "\"processing\"");
    }

    #[tokio::test]
    async fn test_subscriber_receives_emitted_event() {
        let bus = EventBus::new(16);
        let mut rx = bus.subscribe();
        let batch_id = Uuid::new_v4();

        bus.emit(EchotagEvent::BatchStarted {
            batch_id,
            total_files: 2,
            timestamp: Utc::now(),
        })
        .unwrap();

        let event = rx.recv().await.unwrap();
        assert_eq!(event.event_type(), "BatchStarted");
        assert_eq!(event.batch_id(), batch_id);
    }

    #[test]
    fn test_emit_without_subscribers() {
        let bus = EventBus::new(4);
        assert_eq!(bus.subscriber_count(), 0);
        assert!(bus
            .emit(EchotagEvent::BatchStarted {
                batch_id: Uuid::new_v4(),
                total_files: 0,
                timestamp: Utc::now(),
            })
            .is_err());
        // Lossy emission never fails
        bus.emit_lossy(EchotagEvent::BatchStarted {
            batch_id: Uuid::new_v4(),
            total_files: 0,
            timestamp: Utc::now(),
        });
    }

    #[test]
    fn test_event_json_carries_type_tag() {
        let event = EchotagEvent::ItemStatusChanged {
            batch_id: Uuid::nil(),
            file_path: "files/a/2025-01-01/00-00/audio.wav".to_string(),
            status: ItemStatus::Failed,
            error: Some("not found".to_string()),
            timestamp: Utc::now(),
        };
        let json: serde_json::Value = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "ItemStatusChanged");
        assert_eq!(json["status"], "failed");
        assert_eq!(json["error"], "not found");
    }
}
