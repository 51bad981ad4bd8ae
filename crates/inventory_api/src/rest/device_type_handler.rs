use axum::extract::State;
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::domain::{DeviceType, DeviceTypeFields};
use common::rest::ApiError;
use http::StatusCode;
use tracing::instrument;

use super::{AppState, CurrentActor};

#[instrument(name = "ListDeviceTypes", skip_all)]
pub async fn list_device_types(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
) -> Result<Json<Vec<DeviceType>>, ApiError> {
    Ok(Json(state.device_type_service.list_device_types().await?))
}

#[instrument(name = "CreateDeviceType", skip_all)]
pub async fn create_device_type(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<DeviceTypeFields>,
) -> Result<Response, ApiError> {
    let device_type = state
        .device_type_service
        .create_device_type(&actor, &body.name)
        .await?;
    Ok((StatusCode::CREATED, Json(device_type)).into_response())
}
