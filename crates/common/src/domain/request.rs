use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A user's request to take a device from its owner
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Request {
    pub id: String,
    pub device_id: String,
    pub owner: String,
    pub requestor: String,
    pub note: Option<String>,
    pub closed_at: Option<DateTime<Utc>>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Request columns written alongside the ask transition.
/// `owner` comes from the device and is required by the store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateRequestRepoInput {
    pub request_id: String,
    pub owner: Option<String>,
    pub requestor: String,
    pub note: Option<String>,
}
