//! Operations behind the HTTP control API.
//!
//! [`ControlSurface`] only touches [`SharedState`] through its short critical
//! sections. The one long call, the remote upload, runs with no lock held.
//! Archive file system access runs on the blocking pool via [`with_archive`].

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use time::OffsetDateTime;
use time::format_description::well_known::Rfc3339;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};

use agrox_core::{AcquisitionHealth, AcquisitionStatus, SharedState, StatusIndicator};
use agrox_store::Archive;
use agrox_types::{ActivationFlags, SensorReading};

use crate::config::{UploadConfig, validate_server_url};
use crate::upload::{UploadError, UploadRequest, Uploader};

/// Summary returned when an update names neither flag.
pub const NO_CHANGE_MESSAGE: &str =
    "No changes made. Specify 'sensor' and/or 'camera' with boolean values.";
pub const NO_READING_MESSAGE: &str = "No sensor data available. Please wait for sensor readings.";
pub const SENSOR_INACTIVE_MESSAGE: &str = "Sensor is inactive. Please activate the sensor first.";
pub const UPLOAD_SUCCESS_MESSAGE: &str = "Data uploaded successfully";

/// Errors surfaced to control callers.
#[derive(Debug, thiserror::Error)]
pub enum ControlError {
    /// No reading to report.
    #[error("{0}")]
    DataUnavailable(String),
    /// The operation cannot run in the current state.
    #[error("{0}")]
    PreconditionFailed(String),
    /// The remote upload server failed.
    #[error("{0}")]
    UpstreamFailure(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Internal(String),
}

impl From<UploadError> for ControlError {
    fn from(err: UploadError) -> Self {
        match err {
            UploadError::Rejected { message, .. } | UploadError::Failed(message) => {
                Self::UpstreamFailure(message)
            }
            other => Self::UpstreamFailure(other.to_string()),
        }
    }
}

impl From<agrox_store::Error> for ControlError {
    fn from(err: agrox_store::Error) -> Self {
        match err {
            agrox_store::Error::InvalidName(_) => Self::BadRequest(err.to_string()),
            agrox_store::Error::NotFound(_) => Self::NotFound(err.to_string()),
            other => Self::Internal(other.to_string()),
        }
    }
}

/// Run a file system operation on the archive without blocking the runtime.
pub async fn with_archive<T, F>(archive: &Arc<Archive>, op: F) -> Result<T, ControlError>
where
    F: FnOnce(&Archive) -> agrox_store::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let archive = Arc::clone(archive);
    tokio::task::spawn_blocking(move || op(&archive))
        .await
        .map_err(|e| ControlError::Internal(format!("Archive task failed: {e}")))?
        .map_err(ControlError::from)
}

/// Result of an activation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationOutcome {
    /// Flags after the update.
    pub flags: ActivationFlags,
    /// Which flags changed and in which direction.
    pub message: String,
    pub changed: bool,
}

/// Flags together with acquisition health.
#[derive(Debug, Clone, Serialize)]
pub struct StatusReport {
    pub flags: ActivationFlags,
    pub acquisition: AcquisitionStatus,
    pub camera_available: bool,
    pub health: AcquisitionHealth,
}

/// Result of a successful manual upload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UploadResult {
    pub success: bool,
    pub message: String,
    pub temperature: f32,
    pub humidity: f32,
    pub image_url: Option<String>,
    pub timestamp: String,
}

/// Runtime-adjustable upload settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadSettings {
    pub server_url: String,
    pub machine_id: String,
    pub timeout: Duration,
}

impl From<&UploadConfig> for UploadSettings {
    fn from(config: &UploadConfig) -> Self {
        Self {
            server_url: config.server_url.clone(),
            machine_id: config.machine_id.clone(),
            timeout: config.timeout(),
        }
    }
}

/// Control operations over the shared device state.
pub struct ControlSurface {
    shared: Arc<SharedState>,
    archive: Arc<Archive>,
    indicator: Arc<dyn StatusIndicator>,
    uploader: Arc<dyn Uploader>,
    upload: RwLock<UploadSettings>,
    /// Keeps the LEDs in the order flag updates were applied.
    indicator_sync: Mutex<()>,
}

impl ControlSurface {
    pub fn new(
        shared: Arc<SharedState>,
        archive: Arc<Archive>,
        indicator: Arc<dyn StatusIndicator>,
        uploader: Arc<dyn Uploader>,
        upload: UploadSettings,
    ) -> Self {
        Self {
            shared,
            archive,
            indicator,
            uploader,
            upload: RwLock::new(upload),
            indicator_sync: Mutex::new(()),
        }
    }

    pub fn shared(&self) -> &Arc<SharedState> {
        &self.shared
    }

    pub fn archive(&self) -> &Arc<Archive> {
        &self.archive
    }

    /// Apply a partial flag update.
    ///
    /// With neither flag given nothing is changed and the summary says so.
    /// Changes take effect at the acquisition loop's next iteration.
    pub async fn activate(&self, sensor: Option<bool>, camera: Option<bool>) -> ActivationOutcome {
        if sensor.is_none() && camera.is_none() {
            return ActivationOutcome {
                flags: self.shared.flags(),
                message: NO_CHANGE_MESSAGE.to_string(),
                changed: false,
            };
        }

        let _guard = self.indicator_sync.lock().await;
        let update = self.shared.set_flags(sensor, camera);

        let mut changes = Vec::new();
        if let Some(on) = update.sensor_change() {
            changes.push(format!("Sensor data collection {}", started_or_stopped(on)));
        }
        if let Some(on) = update.camera_change() {
            changes.push(format!("Camera capture {}", started_or_stopped(on)));
        }

        let message = if changes.is_empty() {
            NO_CHANGE_MESSAGE.to_string()
        } else {
            info!("Flags {} -> {}", update.previous, update.current);
            changes.join(". ")
        };

        let state = update.current.indicator_state();
        if let Err(e) = self.indicator.set_state(state).await {
            warn!("Failed to show indicator state {}: {}", state, e);
        }

        ActivationOutcome {
            flags: update.current,
            message,
            changed: update.changed(),
        }
    }

    /// Turn sensor and camera on.
    pub async fn turn_on(&self) -> ActivationOutcome {
        let mut outcome = self.activate(Some(true), Some(true)).await;
        outcome.message = "All systems turned on".to_string();
        outcome
    }

    /// Turn sensor and camera off.
    pub async fn turn_off(&self) -> ActivationOutcome {
        let mut outcome = self.activate(Some(false), Some(false)).await;
        outcome.message = "All systems turned off".to_string();
        outcome
    }

    pub fn query_status(&self) -> ActivationFlags {
        self.shared.flags()
    }

    pub fn status_report(&self) -> StatusReport {
        let health = self.shared.health();
        StatusReport {
            flags: self.shared.flags(),
            acquisition: health.status.clone(),
            camera_available: health.camera_available,
            health,
        }
    }

    /// The latest published reading.
    ///
    /// A reading from before the sensor was disabled is still returned; its
    /// `observed_at` shows how old it is. After acquisition has failed no
    /// reading is reported.
    pub fn query_latest_reading(&self) -> Result<SensorReading, ControlError> {
        if let AcquisitionStatus::Failed { reason, .. } = self.shared.health().status {
            return Err(ControlError::DataUnavailable(format!(
                "Sensor acquisition stopped: {reason}"
            )));
        }
        self.shared
            .latest_reading()
            .ok_or_else(|| ControlError::DataUnavailable(NO_READING_MESSAGE.to_string()))
    }

    /// Send the latest reading, and the newest image if the camera is in use,
    /// to the upload server.
    pub async fn manual_upload(&self) -> Result<UploadResult, ControlError> {
        let (flags, reading) = self.shared.snapshot();
        if !flags.sensor {
            return Err(ControlError::PreconditionFailed(
                SENSOR_INACTIVE_MESSAGE.to_string(),
            ));
        }
        if let AcquisitionStatus::Failed { reason, .. } = self.shared.health().status {
            return Err(ControlError::PreconditionFailed(format!(
                "Sensor acquisition stopped: {reason}"
            )));
        }
        let reading = reading
            .ok_or_else(|| ControlError::PreconditionFailed(NO_READING_MESSAGE.to_string()))?;

        let image_path = if flags.camera && self.shared.camera_available() {
            match with_archive(&self.archive, |archive| archive.latest_image()).await {
                Ok(image) => image.map(|path| self.archive.relative_image_path(&path)),
                Err(e) => {
                    warn!("Uploading without image, listing failed: {}", e);
                    None
                }
            }
        } else {
            None
        };

        let settings = self.upload.read().await.clone();
        let request = UploadRequest {
            temperature: reading.temperature_c,
            humidity: reading.humidity,
            image_path,
            machine_id: settings.machine_id,
        };

        info!(
            "Manual upload to {} (image: {})",
            settings.server_url,
            request.image_path.as_deref().unwrap_or("none")
        );
        let receipt = tokio::time::timeout(
            settings.timeout,
            self.uploader.send(&settings.server_url, &request),
        )
        .await
        .map_err(|_| UploadError::Timeout(settings.timeout))?
        .inspect_err(|e| warn!("Manual upload failed: {}", e))?;

        let timestamp = match receipt.timestamp {
            Some(ts) => ts,
            None => OffsetDateTime::now_utc()
                .format(&Rfc3339)
                .map_err(|e| ControlError::Internal(e.to_string()))?,
        };

        Ok(UploadResult {
            success: true,
            message: UPLOAD_SUCCESS_MESSAGE.to_string(),
            temperature: request.temperature,
            humidity: request.humidity,
            image_url: receipt.image_url,
            timestamp,
        })
    }

    pub async fn upload_settings(&self) -> UploadSettings {
        self.upload.read().await.clone()
    }

    /// Point subsequent uploads at `server_url`.
    ///
    /// Returns whether the URL changed.
    pub async fn update_upload_settings(&self, server_url: &str) -> Result<bool, ControlError> {
        let server_url = server_url.trim().trim_end_matches('/');
        validate_server_url(server_url).map_err(ControlError::BadRequest)?;

        let mut settings = self.upload.write().await;
        if settings.server_url == server_url {
            return Ok(false);
        }
        info!(
            "Upload server changed from {} to {}",
            settings.server_url, server_url
        );
        settings.server_url = server_url.to_string();
        Ok(true)
    }
}

fn started_or_stopped(on: bool) -> &'static str {
    if on { "started" } else { "stopped" }
}
