use crate::domain::{
    DomainError, DomainResult, Event, EventRepository, ListRecentEventsRepoInput,
    RecordEventRepoInput,
};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use tracing::{debug, instrument};

/// PostgreSQL implementation of EventRepository trait.
/// The `events.device_id` column carries no foreign key, so events survive
/// device deletion.
#[derive(Clone)]
pub struct PostgresEventRepository {
    client: PostgresClient,
}

impl PostgresEventRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    #[instrument(skip(self, input), fields(device_id = %input.device_id))]
    async fn record_event(&self, input: RecordEventRepoInput) -> DomainResult<Event> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let row = conn
            .query_one(
                "INSERT INTO events (device_id, message, created_at) VALUES ($1, $2, now())
                 RETURNING id, device_id, message, created_at",
                &[&input.device_id, &input.message],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        debug!(message = %input.message, "recorded event");

        Ok(Event {
            id: row.get("id"),
            device_id: row.get("device_id"),
            message: row.get("message"),
            created_at: row.get("created_at"),
        })
    }

    #[instrument(skip(self, input), fields(device_id = %input.device_id, limit = input.limit))]
    async fn list_recent_events(
        &self,
        input: ListRecentEventsRepoInput,
    ) -> DomainResult<Vec<Event>> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let rows = conn
            .query(
                "SELECT id, device_id, message, created_at FROM events
                 WHERE device_id = $1
                 ORDER BY id DESC
                 LIMIT $2",
                &[&input.device_id, &input.limit],
            )
            .await
            .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(rows
            .iter()
            .map(|row| Event {
                id: row.get("id"),
                device_id: row.get("device_id"),
                message: row.get("message"),
                created_at: row.get("created_at"),
            })
            .collect())
    }
}
