//! Acquisition loop and HTTP control API for the AgroX field device.
//!
//! This crate provides a service that:
//! - Reads temperature/humidity every few seconds while the sensor is enabled
//! - Captures a still image at most once per capture interval while the camera is enabled
//! - Logs readings to a daily CSV file and archives images
//! - Exposes a REST API to toggle acquisition, read the latest values and
//!   push a reading to the remote upload server
//!
//! # REST API Endpoints
//!
//! - `GET /api/health` - Service health check
//! - `POST /api/control` - Set `sensor` and/or `camera` flags
//! - `GET /api/control/on`, `GET /api/control/off` - Toggle both flags
//! - `GET /api/control/status` - Flags and acquisition status
//! - `GET /api/sensor` - Latest reading (503 when none is available)
//! - `GET /api/images/list`, `/api/images/latest`, `/api/images/{name}`
//! - `GET /api/logs/list`, `/api/logs/today`, `/api/logs/{name}`
//! - `POST /api/manual-upload` (also `GET /api/manual-upload[/get]`)
//! - `GET|POST /api/server/settings` - Upload server URL
//!
//! # Configuration
//!
//! The service reads configuration from `~/.config/agrox/device.toml`:
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:8000"
//!
//! [storage]
//! data_dir = "/var/lib/agrox"
//!
//! [acquisition]
//! capture_interval_secs = 60
//!
//! [upload]
//! server_url = "http://192.168.1.26:3005"
//! ```
//!
//! `SERVER_URL` in the environment overrides `upload.server_url`.

use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub mod acquisition;
pub mod api;
pub mod config;
pub mod control;
pub mod state;
pub mod upload;

pub use acquisition::{AcquisitionLoop, AcquisitionPeriods};
pub use config::{Config, ConfigError};
pub use control::{ActivationOutcome, ControlError, ControlSurface, UploadResult, UploadSettings};
pub use state::AppState;
pub use upload::{HttpUploader, UploadError, UploadReceipt, UploadRequest, Uploader};

/// The full HTTP application: API routes with request tracing and open CORS.
pub fn app(state: Arc<AppState>) -> Router {
    Router::new()
        .merge(api::router())
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .with_state(state)
}
