//! REST API endpoints for the AgroX device.
//!
//! Handlers are thin: they translate HTTP to [`ControlSurface`] calls and
//! archive lookups and never touch hardware.
//!
//! ## Error Handling
//!
//! All endpoints return structured JSON errors via [`ControlError`]:
//! `{"success": false, "error": "..."}`.
//!
//! # Example
//!
//! ```ignore
//! use axum::Router;
//! use agrox_service::api;
//!
//! let app = api::router().with_state(state);
//! ```
//!
//! [`ControlSurface`]: crate::control::ControlSurface

use std::path::PathBuf;
use std::sync::Arc;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use agrox_core::AcquisitionStatus;
use agrox_types::ActivationFlags;

use crate::control::{
    ActivationOutcome, ControlError, NO_CHANGE_MESSAGE, UploadResult, with_archive,
};
use crate::state::AppState;

/// Create the API router.
pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(root))
        .route("/api/health", get(health))
        // Activation
        .route("/api/control", post(control))
        .route("/api/control/on", get(control_on))
        .route("/api/control/off", get(control_off))
        .route("/api/control/status", get(control_status))
        // Readings
        .route("/api/sensor", get(latest_reading))
        // Archive pass-through
        .route("/api/images/list", get(list_images))
        .route("/api/images/latest", get(latest_image))
        .route("/api/images/{name}", get(get_image))
        .route("/api/logs/list", get(list_logs))
        .route("/api/logs/today", get(today_log))
        .route("/api/logs/{name}", get(get_log))
        // Remote upload
        .route("/api/manual-upload", get(manual_upload).post(manual_upload))
        .route("/api/manual-upload/get", get(manual_upload))
        .route(
            "/api/server/settings",
            get(get_server_settings).post(update_server_settings),
        )
}

async fn root() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "message": "AgroX-IoT System API is running" }))
}

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub uptime_seconds: i64,
}

/// Health check endpoint.
async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let now = OffsetDateTime::now_utc();
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: now,
        uptime_seconds: (now - state.started_at).whole_seconds(),
    })
}

// ==========================================================================
// Activation
// ==========================================================================

/// Body of `POST /api/control`. Omitted flags are left unchanged.
#[derive(Debug, Default, Deserialize)]
pub struct ControlRequest {
    pub sensor: Option<bool>,
    pub camera: Option<bool>,
}

/// Flags plus a human-readable summary.
#[derive(Debug, Serialize)]
pub struct ControlResponse {
    pub sensor_active: bool,
    pub camera_active: bool,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub acquisition: Option<AcquisitionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_available: Option<bool>,
}

impl ControlResponse {
    fn new(flags: ActivationFlags, message: impl Into<String>) -> Self {
        Self {
            sensor_active: flags.sensor,
            camera_active: flags.camera,
            message: message.into(),
            acquisition: None,
            camera_available: None,
        }
    }
}

impl From<ActivationOutcome> for ControlResponse {
    fn from(outcome: ActivationOutcome) -> Self {
        Self::new(outcome.flags, outcome.message)
    }
}

async fn control(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Response, ControlError> {
    let flags = state.control.query_status();
    let Some(request) = parse_json_body::<ControlRequest>(&body)? else {
        let response = ControlResponse::new(flags, "No data provided");
        return Ok((StatusCode::BAD_REQUEST, Json(response)).into_response());
    };

    if request.sensor.is_none() && request.camera.is_none() {
        let response = ControlResponse::new(flags, NO_CHANGE_MESSAGE);
        return Ok((StatusCode::BAD_REQUEST, Json(response)).into_response());
    }

    let outcome = state
        .control
        .activate(request.sensor, request.camera)
        .await;
    Ok(Json(ControlResponse::from(outcome)).into_response())
}

async fn control_on(State(state): State<Arc<AppState>>) -> Json<ControlResponse> {
    Json(state.control.turn_on().await.into())
}

async fn control_off(State(state): State<Arc<AppState>>) -> Json<ControlResponse> {
    Json(state.control.turn_off().await.into())
}

async fn control_status(State(state): State<Arc<AppState>>) -> Json<ControlResponse> {
    let report = state.control.status_report();
    let mut response = ControlResponse::new(report.flags, "Current system status");
    response.acquisition = Some(report.acquisition);
    response.camera_available = Some(report.camera_available);
    Json(response)
}

// ==========================================================================
// Readings
// ==========================================================================

/// Latest reading with its age.
#[derive(Debug, Serialize)]
pub struct ReadingResponse {
    pub temperature_c: f32,
    pub temperature_f: f32,
    pub humidity: f32,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
    pub age_seconds: i64,
}

async fn latest_reading(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ReadingResponse>, ControlError> {
    let reading = state.control.query_latest_reading()?;
    Ok(Json(ReadingResponse {
        temperature_c: reading.temperature_c,
        temperature_f: reading.temperature_f(),
        humidity: reading.humidity,
        timestamp: reading.observed_at,
        age_seconds: reading.age(OffsetDateTime::now_utc()).whole_seconds(),
    }))
}

// ==========================================================================
// Archive
// ==========================================================================

async fn list_images(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ControlError> {
    let images = with_archive(state.archive(), |archive| archive.list_images()).await?;
    Ok(Json(serde_json::json!({ "images": images })))
}

async fn latest_image(State(state): State<Arc<AppState>>) -> Result<Response, ControlError> {
    let path = with_archive(state.archive(), |archive| archive.latest_image())
        .await?
        .ok_or_else(|| ControlError::NotFound("No images available".to_string()))?;
    send_file(path).await
}

async fn get_image(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ControlError> {
    let path = with_archive(state.archive(), move |archive| archive.image_path(&name)).await?;
    send_file(path).await
}

async fn list_logs(
    State(state): State<Arc<AppState>>,
) -> Result<Json<serde_json::Value>, ControlError> {
    let logs = with_archive(state.archive(), |archive| archive.list_logs()).await?;
    Ok(Json(serde_json::json!({ "logs": logs })))
}

async fn today_log(State(state): State<Arc<AppState>>) -> Result<Response, ControlError> {
    let now = OffsetDateTime::now_utc();
    let path = with_archive(state.archive(), move |archive| archive.today_log_path(now)).await?;
    send_file(path).await
}

async fn get_log(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<Response, ControlError> {
    let path = with_archive(state.archive(), move |archive| archive.log_path(&name)).await?;
    send_file(path).await
}

fn content_type(path: &std::path::Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("csv") => "text/csv",
        _ => "application/octet-stream",
    }
}

async fn send_file(path: PathBuf) -> Result<Response, ControlError> {
    let bytes = tokio::fs::read(&path).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ControlError::NotFound(format!("File not found: {}", path.display()))
        } else {
            ControlError::Internal(format!("Failed to read {}: {}", path.display(), e))
        }
    })?;
    Ok(([(header::CONTENT_TYPE, content_type(&path))], bytes).into_response())
}

// ==========================================================================
// Remote upload
// ==========================================================================

async fn manual_upload(
    State(state): State<Arc<AppState>>,
) -> Result<Json<UploadResult>, ControlError> {
    Ok(Json(state.control.manual_upload().await?))
}

/// Body of `POST /api/server/settings`.
#[derive(Debug, Default, Deserialize)]
pub struct ServerSettingsRequest {
    pub server_url: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ServerSettings {
    pub server_url: String,
}

#[derive(Debug, Serialize)]
pub struct ServerSettingsResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    pub settings: ServerSettings,
}

async fn get_server_settings(State(state): State<Arc<AppState>>) -> Json<ServerSettingsResponse> {
    let settings = state.control.upload_settings().await;
    Json(ServerSettingsResponse {
        success: true,
        message: None,
        settings: ServerSettings {
            server_url: settings.server_url,
        },
    })
}

async fn update_server_settings(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Result<Json<ServerSettingsResponse>, ControlError> {
    let request = parse_json_body::<ServerSettingsRequest>(&body)?.unwrap_or_default();

    let changed = match request.server_url.as_deref() {
        Some(url) => state.control.update_upload_settings(url).await?,
        None => false,
    };

    let settings = state.control.upload_settings().await;
    let message = if changed {
        format!("Server URL set to {}", settings.server_url)
    } else {
        "No changes made to server settings".to_string()
    };
    Ok(Json(ServerSettingsResponse {
        success: true,
        message: Some(message),
        settings: ServerSettings {
            server_url: settings.server_url,
        },
    }))
}

/// Parse an optional JSON body. Empty bodies, `null` and `{}` yield `None`.
fn parse_json_body<T: DeserializeOwned>(body: &[u8]) -> Result<Option<T>, ControlError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    let value: serde_json::Value = serde_json::from_slice(body)
        .map_err(|e| ControlError::BadRequest(format!("Invalid JSON: {e}")))?;
    let empty = match &value {
        serde_json::Value::Null => true,
        serde_json::Value::Object(map) => map.is_empty(),
        _ => false,
    };
    if empty {
        return Ok(None);
    }
    serde_json::from_value(value)
        .map(Some)
        .map_err(|e| ControlError::BadRequest(format!("Invalid request: {e}")))
}

// ==========================================================================
// Errors
// ==========================================================================

impl IntoResponse for ControlError {
    fn into_response(self) -> Response {
        let status = match &self {
            ControlError::DataUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ControlError::PreconditionFailed(_) => StatusCode::BAD_REQUEST,
            ControlError::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
            ControlError::NotFound(_) => StatusCode::NOT_FOUND,
            ControlError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ControlError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        let body = serde_json::json!({
            "success": false,
            "error": self.to_string(),
        });

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Method, Request, StatusCode},
    };
    use http_body_util::BodyExt;
    use std::sync::atomic::Ordering;
    use tempfile::TempDir;
    use time::macros::datetime;
    use tower::ServiceExt;

    use agrox_core::{MockIndicator, SharedState};
    use agrox_store::Archive;
    use agrox_types::{SensorReading, SensorSample};

    use crate::control::tests::{Fixture, RecordingUploader, fixture};

    struct TestApp {
        _dir: TempDir,
        shared: Arc<SharedState>,
        archive: Arc<Archive>,
        indicator: Arc<MockIndicator>,
        uploader: Arc<RecordingUploader>,
        state: Arc<AppState>,
    }

    fn create_test_app() -> TestApp {
        let Fixture {
            _dir,
            shared,
            archive,
            indicator,
            uploader,
            control,
        } = fixture();
        TestApp {
            _dir,
            shared,
            archive,
            indicator,
            uploader,
            state: AppState::new(control),
        }
    }

    impl TestApp {
        async fn send(&self, request: Request<Body>) -> Response {
            router()
                .with_state(Arc::clone(&self.state))
                .oneshot(request)
                .await
                .unwrap()
        }

        async fn get(&self, uri: &str) -> Response {
            self.send(Request::builder().uri(uri).body(Body::empty()).unwrap())
                .await
        }

        async fn post(&self, uri: &str, body: &str) -> Response {
            self.send(
                Request::builder()
                    .method(Method::POST)
                    .uri(uri)
                    .header("content-type", "application/json")
                    .body(Body::from(body.to_string()))
                    .unwrap(),
            )
            .await
        }

        fn publish(&self) {
            self.shared.publish_reading(SensorReading::new(
                SensorSample::new(22.5, 55.0),
                datetime!(2025-03-07 10:00:00 UTC),
            ));
        }
    }

    async fn response_body(response: Response) -> String {
        let body = response.into_body();
        let bytes = body.collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    async fn response_json(response: Response) -> serde_json::Value {
        serde_json::from_str(&response_body(response).await).unwrap()
    }

    #[tokio::test]
    async fn test_root_endpoint() {
        let app = create_test_app();
        let response = app.get("/").await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["message"], "AgroX-IoT System API is running");
    }

    #[tokio::test]
    async fn test_health_endpoint() {
        let app = create_test_app();
        let response = app.get("/api/health").await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["status"], "ok");
        assert!(json["version"].is_string());
        assert!(json["timestamp"].is_string());
        assert!(json["uptime_seconds"].as_i64().unwrap() >= 0);
    }

    #[tokio::test]
    async fn test_control_status() {
        let app = create_test_app();
        let response = app.get("/api/control/status").await;

        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["sensor_active"], false);
        assert_eq!(json["camera_active"], false);
        assert_eq!(json["message"], "Current system status");
        assert_eq!(json["acquisition"]["state"], "starting");
        assert_eq!(json["camera_available"], false);
    }

    #[tokio::test]
    async fn test_control_on_off() {
        let app = create_test_app();

        let json = response_json(app.get("/api/control/on").await).await;
        assert_eq!(json["sensor_active"], true);
        assert_eq!(json["camera_active"], true);
        assert_eq!(json["message"], "All systems turned on");
        assert!(json.get("acquisition").is_none());

        let json = response_json(app.get("/api/control/off").await).await;
        assert_eq!(json["sensor_active"], false);
        assert_eq!(json["camera_active"], false);
        assert_eq!(json["message"], "All systems turned off");
        assert_eq!(app.indicator.states().len(), 2);
    }

    #[tokio::test]
    async fn test_control_partial_update() {
        let app = create_test_app();

        let response = app.post("/api/control", r#"{"sensor": true}"#).await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["sensor_active"], true);
        assert_eq!(json["camera_active"], false);
        assert_eq!(json["message"], "Sensor data collection started");

        let json = response_json(app.post("/api/control", r#"{"camera": false}"#).await).await;
        assert_eq!(json["sensor_active"], true);
        assert_eq!(json["message"], NO_CHANGE_MESSAGE);
    }

    #[tokio::test]
    async fn test_control_without_flags() {
        let app = create_test_app();
        app.state.control.turn_on().await;

        for (body, message) in [
            ("", "No data provided"),
            ("{}", "No data provided"),
            (r#"{"led": true}"#, NO_CHANGE_MESSAGE),
        ] {
            let response = app.post("/api/control", body).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{body:?}");
            let json = response_json(response).await;
            assert_eq!(json["sensor_active"], true);
            assert_eq!(json["camera_active"], true);
            assert_eq!(json["message"], message);
        }
        assert_eq!(app.state.control.query_status(), ActivationFlags::ALL_ON);
    }

    #[tokio::test]
    async fn test_control_invalid_body() {
        let app = create_test_app();

        for body in ["not json", r#"{"sensor": "yes"}"#] {
            let response = app.post("/api/control", body).await;
            assert_eq!(response.status(), StatusCode::BAD_REQUEST);
            let json = response_json(response).await;
            assert_eq!(json["success"], false);
            assert!(json["error"].is_string());
        }
        assert_eq!(app.state.control.query_status(), ActivationFlags::PAUSED);
    }

    #[tokio::test]
    async fn test_sensor_unavailable() {
        let app = create_test_app();
        let response = app.get("/api/sensor").await;

        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        let json = response_json(response).await;
        assert_eq!(json["success"], false);
        assert_eq!(
            json["error"],
            "No sensor data available. Please wait for sensor readings."
        );
    }

    #[tokio::test]
    async fn test_sensor_reading() {
        let app = create_test_app();
        app.publish();

        let response = app.get("/api/sensor").await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["temperature_c"], 22.5);
        assert_eq!(json["temperature_f"], 72.5);
        assert_eq!(json["humidity"], 55.0);
        assert_eq!(json["timestamp"], "2025-03-07T10:00:00Z");
        assert!(json["age_seconds"].as_i64().unwrap() > 0);
    }

    #[tokio::test]
    async fn test_sensor_after_acquisition_failure() {
        let app = create_test_app();
        app.publish();
        app.shared.mark_failed("iio:device0: hardware fault: gone");

        let response = app.get("/api/sensor").await;
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let json = response_json(app.get("/api/control/status").await).await;
        assert_eq!(json["acquisition"]["state"], "failed");
        assert_eq!(
            json["acquisition"]["reason"],
            "iio:device0: hardware fault: gone"
        );
    }

    #[tokio::test]
    async fn test_image_routes() {
        let app = create_test_app();

        let response = app.get("/api/images/latest").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        for at in [
            datetime!(2025-03-07 10:00:00 UTC),
            datetime!(2025-03-07 10:01:00 UTC),
        ] {
            std::fs::write(app.archive.image_path_for(at).unwrap(), at.to_string()).unwrap();
        }

        let json = response_json(app.get("/api/images/list").await).await;
        assert_eq!(
            json["images"],
            serde_json::json!(["image_20250307_100000.jpg", "image_20250307_100100.jpg"])
        );

        let response = app.get("/api/images/latest").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "image/jpeg");
        assert!(response_body(response).await.contains("10:01"));

        let response = app.get("/api/images/image_20250307_100000.jpg").await;
        assert_eq!(response.status(), StatusCode::OK);

        let response = app.get("/api/images/image_20990101_000000.jpg").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_image_route_rejects_traversal() {
        let app = create_test_app();
        let response = app.get("/api/images/..%2F..%2Fetc%2Fpasswd").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_log_routes() {
        let app = create_test_app();

        let response = app.get("/api/logs/today").await;
        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        app.archive
            .append_reading(&SensorReading::new(
                SensorSample::new(22.5, 55.0),
                OffsetDateTime::now_utc(),
            ))
            .unwrap();

        let json = response_json(app.get("/api/logs/list").await).await;
        let logs = json["logs"].as_array().unwrap();
        assert_eq!(logs.len(), 1);
        let name = logs[0].as_str().unwrap().to_string();

        let response = app.get("/api/logs/today").await;
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[header::CONTENT_TYPE], "text/csv");
        let body = response_body(response).await;
        assert!(body.starts_with("timestamp,temperature_c,temperature_f,humidity"));

        let response = app.get(&format!("/api/logs/{name}")).await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_manual_upload_precondition() {
        let app = create_test_app();
        app.publish();

        let response = app.post("/api/manual-upload", "").await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let json = response_json(response).await;
        assert_eq!(
            json["error"],
            "Sensor is inactive. Please activate the sensor first."
        );
        assert_eq!(app.uploader.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_manual_upload_routes() {
        let app = create_test_app();
        app.state.control.activate(Some(true), None).await;
        app.publish();

        for response in [
            app.post("/api/manual-upload", "").await,
            app.get("/api/manual-upload").await,
            app.get("/api/manual-upload/get").await,
        ] {
            assert_eq!(response.status(), StatusCode::OK);
            let json = response_json(response).await;
            assert_eq!(json["success"], true);
            assert_eq!(json["message"], "Data uploaded successfully");
            assert_eq!(json["temperature"], 22.5);
            assert_eq!(json["humidity"], 55.0);
            assert!(json["image_url"].is_null());
        }
        assert_eq!(app.uploader.calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_manual_upload_upstream_failure() {
        let app = create_test_app();
        app.state.control.activate(Some(true), None).await;
        app.publish();
        *app.uploader.fail_with.lock().unwrap() = Some("Server error".into());

        let response = app.post("/api/manual-upload", "").await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
        let json = response_json(response).await;
        assert_eq!(json["error"], "Server error");
    }

    #[tokio::test]
    async fn test_server_settings() {
        let app = create_test_app();

        let json = response_json(app.get("/api/server/settings").await).await;
        assert_eq!(json["settings"]["server_url"], "http://192.168.1.26:3005");

        let json = response_json(app.post("/api/server/settings", "{}").await).await;
        assert_eq!(json["message"], "No changes made to server settings");

        let response = app
            .post("/api/server/settings", r#"{"server_url": "ftp://x"}"#)
            .await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);

        let response = app
            .post(
                "/api/server/settings",
                r#"{"server_url": "https://agrox.example.org"}"#,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        let json = response_json(response).await;
        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Server URL set to https://agrox.example.org");
        assert_eq!(json["settings"]["server_url"], "https://agrox.example.org");
    }

    #[test]
    fn test_error_status_codes() {
        let cases = [
            (
                ControlError::DataUnavailable("x".into()),
                StatusCode::SERVICE_UNAVAILABLE,
            ),
            (
                ControlError::PreconditionFailed("x".into()),
                StatusCode::BAD_REQUEST,
            ),
            (
                ControlError::UpstreamFailure("x".into()),
                StatusCode::BAD_GATEWAY,
            ),
            (ControlError::NotFound("x".into()), StatusCode::NOT_FOUND),
            (ControlError::BadRequest("x".into()), StatusCode::BAD_REQUEST),
            (
                ControlError::Internal("x".into()),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];
        for (error, status) in cases {
            assert_eq!(error.into_response().status(), status);
        }
    }

    #[test]
    fn test_parse_json_body() {
        assert!(parse_json_body::<ControlRequest>(b"").unwrap().is_none());
        assert!(parse_json_body::<ControlRequest>(b" \n").unwrap().is_none());
        assert!(parse_json_body::<ControlRequest>(b"null").unwrap().is_none());
        assert!(parse_json_body::<ControlRequest>(b"{}").unwrap().is_none());

        let request = parse_json_body::<ControlRequest>(br#"{"camera": true}"#)
            .unwrap()
            .unwrap();
        assert_eq!(request.sensor, None);
        assert_eq!(request.camera, Some(true));

        assert!(matches!(
            parse_json_body::<ControlRequest>(b"[1, 2]"),
            Err(ControlError::BadRequest(_))
        ));
    }
}
