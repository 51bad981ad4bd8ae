use crate::domain::DomainError;
use axum::response::{IntoResponse, Response};
use axum::Json;
use http::StatusCode;
use serde_json::json;
use tracing::error;

/// Status code a domain error is reported with
pub fn domain_error_status(error: &DomainError) -> StatusCode {
    match error {
        DomainError::ValidationError(_) => StatusCode::UNPROCESSABLE_ENTITY,

        DomainError::DeviceNotFound(_) => StatusCode::NOT_FOUND,

        DomainError::DeviceAlreadyExists(_) | DomainError::DeviceTypeAlreadyExists(_) => {
            StatusCode::CONFLICT
        }

        DomainError::InvalidStateTransition { .. } => StatusCode::CONFLICT,

        DomainError::PermissionDenied(_) => StatusCode::FORBIDDEN,

        DomainError::Unauthenticated(_) => StatusCode::UNAUTHORIZED,

        DomainError::NoImportFile
        | DomainError::NoWorksheets
        | DomainError::SpreadsheetError(_) => StatusCode::BAD_REQUEST,

        DomainError::RequestNotCreated | DomainError::RepositoryError(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Convert domain error to a JSON HTTP response
pub fn domain_error_to_response(error: DomainError) -> Response {
    let status = domain_error_status(&error);

    if let DomainError::RepositoryError(e) = &error {
        error!(error = %e, "Repository error while handling request");
    }

    let body = match &error {
        DomainError::ValidationError(messages) => json!({ "errors": messages }),
        other => json!({ "error": other.user_message() }),
    };

    (status, Json(body)).into_response()
}

/// Wrapper so handlers can return `Result<_, ApiError>` and use `?`
#[derive(Debug)]
pub struct ApiError(pub DomainError);

impl From<DomainError> for ApiError {
    fn from(error: DomainError) -> Self {
        Self(error)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        domain_error_to_response(self.0)
    }
}
