use crate::domain::{
    AddCommentRepoInput, CommentRepository, DeviceComment, DomainError, DomainResult,
};
use crate::postgres::PostgresClient;
use async_trait::async_trait;
use chrono::Utc;
use tracing::instrument;

/// PostgreSQL implementation of CommentRepository trait
#[derive(Clone)]
pub struct PostgresCommentRepository {
    client: PostgresClient,
}

impl PostgresCommentRepository {
    pub fn new(client: PostgresClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CommentRepository for PostgresCommentRepository {
    #[instrument(skip(self, input), fields(device_id = %input.device_id, author = %input.author))]
    async fn add_comment(&self, input: AddCommentRepoInput) -> DomainResult<DeviceComment> {
        let conn = self
            .client
            .get_connection()
            .await
            .map_err(DomainError::RepositoryError)?;

        let now = Utc::now();
        conn.execute(
            "INSERT INTO device_comments (id, device_id, author, body, created_at)
             VALUES ($1, $2, $3, $4, $5)",
            &[
                &input.comment_id,
                &input.device_id,
                &input.author,
                &input.body,
                &now,
            ],
        )
        .await
        .map_err(|e| DomainError::RepositoryError(e.into()))?;

        Ok(DeviceComment {
            id: input.comment_id,
            device_id: input.device_id,
            author: input.author,
            body: input.body,
            created_at: Some(now),
        })
    }
}
