use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};
use std::sync::Arc;

use super::{
    ask_device, create_device, create_device_type, destroy_device, edit_device, export_device_sheet,
    import_device_sheet, list_device_types, list_devices, list_unavailable_devices, make_available,
    make_unavailable, new_device, receive_device, search_devices, show_device, update_device,
};
use crate::domain::{DeviceService, DeviceSheetService, DeviceTypeService};

/// Services shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub device_service: Arc<DeviceService>,
    pub device_sheet_service: Arc<DeviceSheetService>,
    pub device_type_service: Arc<DeviceTypeService>,
}

/// Every inventory route, bound to its state
pub fn build_inventory_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/devices", get(list_devices).post(create_device))
        .route("/devices/unavailable", get(list_unavailable_devices))
        .route("/devices/export", get(export_device_sheet))
        .route("/devices/import", post(import_device_sheet))
        .route("/devices/search", get(search_devices))
        .route("/devices/new", get(new_device))
        .route(
            "/devices/{id}",
            get(show_device).put(update_device).delete(destroy_device),
        )
        .route("/devices/{id}/edit", get(edit_device))
        .route("/devices/{id}/ask", put(ask_device))
        .route("/devices/{id}/receive", put(receive_device))
        .route("/devices/{id}/make_unavailable", put(make_unavailable))
        .route("/devices/{id}/make_available", put(make_available))
        .route(
            "/device_types",
            get(list_device_types).post(create_device_type),
        )
        .with_state(state)
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ImportConfig;
    use axum::body::Body;
    use common::auth::{RoleAuthorizationProvider, USER_ID_HEADER, USER_ROLE_HEADER};
    use common::domain::DeviceRepository;
    use common::memory::InMemoryInventoryStore;
    use common::testing::sample_device_fields;
    use http::{header, Request, StatusCode};
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn app(store: &InMemoryInventoryStore) -> Router {
        let authorization = Arc::new(RoleAuthorizationProvider::new());
        let repo = Arc::new(store.clone());
        build_inventory_routes(AppState {
            device_service: Arc::new(DeviceService::new(
                repo.clone(),
                repo.clone(),
                repo.clone(),
                authorization.clone(),
            )),
            device_sheet_service: Arc::new(DeviceSheetService::new(
                repo.clone(),
                repo.clone(),
                ImportConfig {
                    skip_header_row: true,
                    default_device_type: Some("phone".to_string()),
                },
            )),
            device_type_service: Arc::new(DeviceTypeService::new(repo, authorization)),
        })
    }

    fn request(method: &str, uri: &str, role: &str, body: Option<Value>) -> Request<Body> {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header(USER_ID_HEADER, format!("{}-1", role))
            .header(USER_ROLE_HEADER, role);
        match body {
            Some(body) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        }
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };
        (status, body)
    }

    async fn create(app: &Router) -> String {
        let (status, body) = send(
            app,
            request(
                "POST",
                "/devices",
                "admin",
                Some(json!({ "device": sample_device_fields() })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        body["device"]["id"].as_str().unwrap().to_string()
    }

    #[tokio::test]
    async fn test_health_needs_no_actor() {
        let store = InMemoryInventoryStore::new();
        let response = app(&store)
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_actor_is_unauthorized() {
        let store = InMemoryInventoryStore::new();
        let response = app(&store)
            .oneshot(Request::get("/devices").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn test_create_then_show_with_created_event() {
        let store = InMemoryInventoryStore::new();
        let app = app(&store);
        let id = create(&app).await;

        let (status, body) =
            send(&app, request("GET", &format!("/devices/{}", id), "user", None)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["device"]["serial_num"], "SN1");
        assert!(body["device"]["state"].is_null());
        assert_eq!(body["events"].as_array().unwrap().len(), 1);
        assert_eq!(body["events"][0]["message"], "Device has been created by admin-1");
    }

    #[tokio::test]
    async fn test_create_with_missing_fields_is_unprocessable() {
        let store = InMemoryInventoryStore::new();
        let (status, body) = send(
            &app(&store),
            request(
                "POST",
                "/devices",
                "admin",
                Some(json!({ "device": { "make": "Acme" } })),
            ),
        )
        .await;

        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["errors"].as_array().unwrap().len() >= 10);
        assert!(store.list_devices().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_users_cannot_create_devices() {
        let store = InMemoryInventoryStore::new();
        let (status, _) = send(
            &app(&store),
            request(
                "POST",
                "/devices",
                "user",
                Some(json!({ "device": sample_device_fields() })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_unknown_device_is_not_found() {
        let store = InMemoryInventoryStore::new();
        let (status, _) = send(&app(&store), request("GET", "/devices/nope", "user", None)).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_make_unavailable_then_available() {
        let store = InMemoryInventoryStore::new();
        let app = app(&store);
        let id = create(&app).await;

        let (status, body) = send(
            &app,
            request("PUT", &format!("/devices/{}/make_unavailable", id), "admin", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["device"]["state"], "unavailable");

        let (status, _) = send(
            &app,
            request("PUT", &format!("/devices/{}/make_unavailable", id), "admin", None),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &app,
            request("PUT", &format!("/devices/{}/make_available", id), "user", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["device"]["state"], "available");

        let (_, body) = send(
            &app,
            request("GET", &format!("/devices/{}", id), "admin", None),
        )
        .await;
        let messages: Vec<&str> = body["events"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|e| e["message"].as_str())
            .collect();
        assert_eq!(
            messages,
            vec![
                "Device has been made available to other users by user-1",
                "Device has been made unavailable to other users by admin-1",
                "Device has been created by admin-1",
            ]
        );
    }

    #[tokio::test]
    async fn test_ask_without_owner_reports_generic_failure() {
        let store = InMemoryInventoryStore::new();
        let app = app(&store);
        let id = create(&app).await;

        let (status, body) = send(
            &app,
            request("PUT", &format!("/devices/{}/ask", id), "user", None),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Unable to add a request.");

        let (_, body) = send(&app, request("GET", &format!("/devices/{}", id), "user", None)).await;
        assert!(body["device"]["state"].is_null());
        assert_eq!(body["events"].as_array().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_ask_and_receive_with_owner() {
        let store = InMemoryInventoryStore::new();
        let app = app(&store);
        let id = create(&app).await;

        let (status, _) = send(
            &app,
            request(
                "PUT",
                &format!("/devices/{}", id),
                "admin",
                Some(json!({ "device": { "owner": "alice" }, "comment": "assigned" })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(store.comments_for(&id).await.len(), 1);

        let (status, body) = send(
            &app,
            request(
                "PUT",
                &format!("/devices/{}/ask", id),
                "user",
                Some(json!({ "request": { "note": "for testing" } })),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["notice"], "Sent a request successfully.");
        assert_eq!(body["request"]["owner"], "alice");

        let (status, body) = send(
            &app,
            request("PUT", &format!("/devices/{}/receive", id), "user", None),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["device"]["state"], "available");
        assert!(store
            .requests_for(&id)
            .await
            .iter()
            .all(|r| r.closed_at.is_some()));
    }

    #[tokio::test]
    async fn test_search_and_destroy() {
        let store = InMemoryInventoryStore::new();
        let app = app(&store);
        let id = create(&app).await;

        let (_, body) = send(&app, request("GET", "/devices/search?q=ACME", "user", None)).await;
        assert_eq!(body.as_array().unwrap().len(), 1);

        let (_, body) = send(&app, request("GET", "/devices/search?q=zzz", "user", None)).await;
        assert!(body.as_array().unwrap().is_empty());

        let (status, _) =
            send(&app, request("DELETE", &format!("/devices/{}", id), "admin", None)).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (_, body) = send(&app, request("GET", "/devices/search", "user", None)).await;
        assert!(body.as_array().unwrap().is_empty());
        assert_eq!(store.event_count().await, 1);
    }

    #[tokio::test]
    async fn test_export_headers() {
        let store = InMemoryInventoryStore::new();
        let app = app(&store);
        create(&app).await;

        let response = app
            .oneshot(request("GET", "/devices/export", "user", None))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::CONTENT_TYPE],
            "application/vnd.ms-excel"
        );
        assert_eq!(
            response.headers()[header::CONTENT_DISPOSITION],
            "attachment; filename=\"Mobile Devices List.xls\""
        );
    }

    fn multipart_request(field: &str, bytes: &[u8]) -> Request<Body> {
        let boundary = "inventory-boundary";
        let mut body = Vec::new();
        body.extend_from_slice(
            format!(
                "--{boundary}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"devices.xlsx\"\r\nContent-Type: application/octet-stream\r\n\r\n"
            )
            .as_bytes(),
        );
        body.extend_from_slice(bytes);
        body.extend_from_slice(format!("\r\n--{boundary}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/devices/import")
            .header(USER_ID_HEADER, "user-1")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={boundary}"),
            )
            .body(Body::from(body))
            .unwrap()
    }

    #[tokio::test]
    async fn test_import_without_file_field() {
        let store = InMemoryInventoryStore::new();
        let (status, body) = send(&app(&store), multipart_request("other", b"data")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "No file uploaded");
    }

    #[tokio::test]
    async fn test_import_reports_notice_and_rows() {
        let store = InMemoryInventoryStore::new();
        let mut device = common::testing::sample_device(
            "src-1",
            Some(common::domain::DeviceState::Available),
        );
        device.attributes.label = Some("Lab".to_string());
        device.attributes.imei = Some("3530000".to_string());
        let bytes = inventory_sheet::export_devices(&[device]).unwrap();

        let (status, body) =
            send(&app(&store), multipart_request(crate::rest::IMPORT_FILE_FIELD, &bytes)).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(
            body["notice"],
            "Import successful, new records added to the database."
        );
        assert_eq!(body["imported"], 1);
        assert_eq!(body["rows"][0]["status"], "imported");
    }
}
