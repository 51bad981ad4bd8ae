use crate::domain::LifecycleAction;
use thiserror::Error;

pub type DomainResult<T> = Result<T, DomainError>;

#[derive(Error, Debug)]
pub enum DomainError {
    #[error("Device not found: {0}")]
    DeviceNotFound(String),

    #[error("Device already exists: {0}")]
    DeviceAlreadyExists(String),

    #[error("Device type already exists: {0}")]
    DeviceTypeAlreadyExists(String),

    #[error("{} (device {})", .action.failure_message(), .device_id)]
    InvalidStateTransition {
        device_id: String,
        action: LifecycleAction,
    },

    /// The ask transaction was rolled back. The cause is logged, not carried.
    #[error("Unable to add a request.")]
    RequestNotCreated,

    #[error("No file uploaded")]
    NoImportFile,

    #[error("No worksheets in the Excel sheet provided")]
    NoWorksheets,

    #[error("Spreadsheet error: {0}")]
    SpreadsheetError(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Unauthenticated: {0}")]
    Unauthenticated(String),

    #[error("Repository error: {0}")]
    RepositoryError(#[from] anyhow::Error),

    #[error("Validation error: {}", .0.join(", "))]
    ValidationError(Vec<String>),
}

impl DomainError {
    /// Flat, user-facing message in the style of a flash notice
    pub fn user_message(&self) -> String {
        match self {
            DomainError::InvalidStateTransition { action, .. } => {
                action.failure_message().to_string()
            }
            DomainError::RepositoryError(_) => "Internal error".to_string(),
            other => other.to_string(),
        }
    }
}
