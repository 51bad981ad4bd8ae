use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Number of events shown alongside a device
pub const DEFAULT_RECENT_EVENTS_LIMIT: i64 = 10;

/// Immutable audit entry. `device_id` is a plain reference: events outlive
/// the device they describe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    pub id: i64,
    pub device_id: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Input for appending an event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordEventRepoInput {
    pub device_id: String,
    pub message: String,
}

/// Input for reading the newest events of one device
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRecentEventsRepoInput {
    pub device_id: String,
    pub limit: i64,
}

/// Repository trait for the append-only event log
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait EventRepository: Send + Sync {
    /// Append an event
    async fn record_event(&self, input: RecordEventRepoInput) -> DomainResult<Event>;

    /// Newest first, at most `limit` entries
    async fn list_recent_events(&self, input: ListRecentEventsRepoInput)
        -> DomainResult<Vec<Event>>;
}
