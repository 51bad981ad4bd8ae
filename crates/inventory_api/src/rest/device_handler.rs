use axum::body::Bytes;
use axum::extract::{Multipart, Path, Query, State};
use axum::response::{IntoResponse, Response};
use axum::Json;
use common::domain::{Device, DeviceFields, DomainError, LifecycleAction};
use common::rest::ApiError;
use http::{header, StatusCode};
use inventory_sheet::{EXPORT_CONTENT_TYPE, EXPORT_FILE_NAME};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, instrument};

use super::{AppState, CurrentActor};
use crate::domain::{
    AskDeviceRequest, CreateDeviceRequest, DeviceDetails, DeviceRequest, ImportReport,
    UpdateDeviceRequest,
};

/// Multipart field carrying the uploaded workbook
pub const IMPORT_FILE_FIELD: &str = "device_import_file";

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct CreateDeviceBody {
    pub device: DeviceFields,
}

#[derive(Debug, Deserialize)]
pub struct UpdateDeviceBody {
    #[serde(default)]
    pub device: DeviceFields,
    pub comment: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AskDeviceBody {
    #[serde(default)]
    pub request: AskRequestFields,
}

#[derive(Debug, Default, Deserialize)]
pub struct AskRequestFields {
    pub note: Option<String>,
}

/// A flash-style notice alongside the affected record
#[derive(Debug, Serialize)]
pub struct Notice<T> {
    pub notice: String,
    #[serde(flatten)]
    pub body: T,
}

#[derive(Debug, Serialize)]
pub struct DeviceBody {
    pub device: Device,
}

fn device_notice(notice: &str, device: Device) -> Json<Notice<DeviceBody>> {
    Json(Notice {
        notice: notice.to_string(),
        body: DeviceBody { device },
    })
}

#[instrument(name = "ListDevices", skip_all)]
pub async fn list_devices(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<Device>>, ApiError> {
    Ok(Json(state.device_service.list_for(&actor).await?))
}

#[instrument(name = "ListUnavailableDevices", skip_all)]
pub async fn list_unavailable_devices(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<Vec<Device>>, ApiError> {
    Ok(Json(state.device_service.unavailable(&actor).await?))
}

#[instrument(name = "SearchDevices", skip_all, fields(q = ?params.q))]
pub async fn search_devices(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    Query(params): Query<SearchParams>,
) -> Result<Json<Vec<Device>>, ApiError> {
    Ok(Json(
        state.device_service.search(params.q.as_deref()).await?,
    ))
}

#[instrument(name = "ShowDevice", skip_all, fields(device_id = %id))]
pub async fn show_device(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<DeviceDetails>, ApiError> {
    Ok(Json(state.device_service.show(&id).await?))
}

#[instrument(name = "NewDevice", skip_all)]
pub async fn new_device(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Json<DeviceFields>, ApiError> {
    Ok(Json(state.device_service.new_template(&actor)?))
}

#[instrument(name = "EditDevice", skip_all, fields(device_id = %id))]
pub async fn edit_device(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<Device>, ApiError> {
    let device = state
        .device_service
        .edit(DeviceRequest {
            actor,
            device_id: id,
        })
        .await?;
    Ok(Json(device))
}

#[instrument(name = "CreateDevice", skip_all)]
pub async fn create_device(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Json(body): Json<CreateDeviceBody>,
) -> Result<Response, ApiError> {
    let device = state
        .device_service
        .create(CreateDeviceRequest {
            actor,
            fields: body.device,
        })
        .await?;

    debug!(device_id = %device.id, "Device created successfully");
    Ok((
        StatusCode::CREATED,
        device_notice("Device was successfully created.", device),
    )
        .into_response())
}

#[instrument(name = "UpdateDevice", skip_all, fields(device_id = %id))]
pub async fn update_device(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    Json(body): Json<UpdateDeviceBody>,
) -> Result<Json<Notice<DeviceBody>>, ApiError> {
    let device = state
        .device_service
        .update(UpdateDeviceRequest {
            actor,
            device_id: id,
            fields: body.device,
            comment: body.comment,
        })
        .await?;

    Ok(device_notice("Device was successfully updated.", device))
}

#[instrument(name = "DestroyDevice", skip_all, fields(device_id = %id))]
pub async fn destroy_device(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .device_service
        .destroy(DeviceRequest {
            actor,
            device_id: id,
        })
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(name = "AskDevice", skip_all, fields(device_id = %id))]
pub async fn ask_device(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let body: AskDeviceBody = if body.iter().all(u8::is_ascii_whitespace) {
        AskDeviceBody::default()
    } else {
        serde_json::from_slice(&body)
            .map_err(|e| DomainError::ValidationError(vec![format!("request: {}", e)]))?
    };

    let request = state
        .device_service
        .ask(AskDeviceRequest {
            actor,
            device_id: id,
            note: body.request.note,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "notice": LifecycleAction::Ask.success_notice(),
            "request": request,
        })),
    )
        .into_response())
}

#[instrument(name = "ReceiveDevice", skip_all, fields(device_id = %id))]
pub async fn receive_device(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<Notice<DeviceBody>>, ApiError> {
    let device = state
        .device_service
        .receive(DeviceRequest {
            actor,
            device_id: id,
        })
        .await?;
    Ok(device_notice(LifecycleAction::Receive.success_notice(), device))
}

#[instrument(name = "MakeDeviceUnavailable", skip_all, fields(device_id = %id))]
pub async fn make_unavailable(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<Notice<DeviceBody>>, ApiError> {
    let device = state
        .device_service
        .make_unavailable(DeviceRequest {
            actor,
            device_id: id,
        })
        .await?;
    Ok(device_notice(
        LifecycleAction::MakeUnavailable.success_notice(),
        device,
    ))
}

#[instrument(name = "MakeDeviceAvailable", skip_all, fields(device_id = %id))]
pub async fn make_available(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<Notice<DeviceBody>>, ApiError> {
    let device = state
        .device_service
        .make_available(DeviceRequest {
            actor,
            device_id: id,
        })
        .await?;
    Ok(device_notice(
        LifecycleAction::MakeAvailable.success_notice(),
        device,
    ))
}

#[instrument(name = "ExportDevices", skip_all)]
pub async fn export_device_sheet(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<Response, ApiError> {
    let bytes = state.device_sheet_service.export(&actor).await?;
    let disposition = format!("attachment; filename=\"{}\"", EXPORT_FILE_NAME);

    Ok((
        [
            (header::CONTENT_TYPE, EXPORT_CONTENT_TYPE.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

#[instrument(name = "ImportDevices", skip_all)]
pub async fn import_device_sheet(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    mut multipart: Multipart,
) -> Result<Json<ImportReport>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DomainError::SpreadsheetError(e.body_text()))?
    {
        if field.name() == Some(IMPORT_FILE_FIELD) {
            let bytes = field
                .bytes()
                .await
                .map_err(|e| DomainError::SpreadsheetError(e.body_text()))?;
            upload = Some(bytes);
            break;
        }
    }

    let bytes = upload.ok_or(DomainError::NoImportFile)?;
    let report = state.device_sheet_service.import(&actor, &bytes).await?;
    Ok(Json(report))
}
