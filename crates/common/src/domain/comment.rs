use crate::domain::result::DomainResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Free-text comment attached to a device update
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceComment {
    pub id: String,
    pub device_id: String,
    pub author: String,
    pub body: String,
    pub created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddCommentRepoInput {
    pub comment_id: String,
    pub device_id: String,
    pub author: String,
    pub body: String,
}

/// Repository trait for update comments, kept apart from the event log
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn add_comment(&self, input: AddCommentRepoInput) -> DomainResult<DeviceComment>;
}
