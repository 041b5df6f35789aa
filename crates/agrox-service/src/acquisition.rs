//! The acquisition loop.
//!
//! One long-lived task owns the sensor, the camera and the capture schedule.
//! Each iteration snapshots the activation flags once and acts on that
//! snapshot:
//!
//! | Flags         | Sensor | Camera (when due) | Next iteration      |
//! |---------------|--------|-------------------|---------------------|
//! | both off      | -      | -                 | `idle` after start  |
//! | sensor only   | read   | -                 | `active` after start|
//! | camera only   | -      | capture           | `active` after start|
//! | both on       | read   | capture           | `active` after start|
//!
//! A transient sensor fault skips the rest of the iteration and retries after
//! `transient_backoff`. Any other sensor fault ends the task. A camera fault
//! disables the camera for the rest of the process lifetime.

use std::sync::Arc;
use std::time::Duration;

use time::OffsetDateTime;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use agrox_core::{AcquisitionStatus, Camera, CaptureSchedule, Sensor, SharedState, StatusIndicator};
use agrox_store::Archive;
use agrox_types::SensorReading;

use crate::control::with_archive;

/// Loop timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AcquisitionPeriods {
    /// Iteration period while any subsystem is enabled.
    pub active: Duration,
    /// Poll period while both subsystems are disabled.
    pub idle: Duration,
    /// Delay before retrying after a transient sensor fault.
    pub transient_backoff: Duration,
}

impl Default for AcquisitionPeriods {
    fn default() -> Self {
        Self {
            active: Duration::from_secs(3),
            idle: Duration::from_secs(5),
            transient_backoff: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Idle,
    Completed,
    Backoff,
}

/// The background acquisition task.
pub struct AcquisitionLoop {
    sensor: Arc<dyn Sensor>,
    camera: Option<Arc<dyn Camera>>,
    indicator: Arc<dyn StatusIndicator>,
    shared: Arc<SharedState>,
    archive: Arc<Archive>,
    schedule: CaptureSchedule,
    periods: AcquisitionPeriods,
    cleaned_up: bool,
}

impl AcquisitionLoop {
    /// Create a loop. `camera` is `None` when no camera hardware was found.
    pub fn new(
        sensor: Arc<dyn Sensor>,
        camera: Option<Arc<dyn Camera>>,
        indicator: Arc<dyn StatusIndicator>,
        shared: Arc<SharedState>,
        archive: Arc<Archive>,
    ) -> Self {
        shared.set_camera_available(camera.is_some());
        Self {
            sensor,
            camera,
            indicator,
            shared,
            archive,
            schedule: CaptureSchedule::default(),
            periods: AcquisitionPeriods::default(),
            cleaned_up: false,
        }
    }

    pub fn with_periods(mut self, periods: AcquisitionPeriods) -> Self {
        self.periods = periods;
        self
    }

    pub fn with_capture_interval(mut self, interval: Duration) -> Self {
        self.schedule = CaptureSchedule::new(interval);
        self
    }

    /// Run the loop on its own task until `cancel` fires or the sensor fails.
    pub fn spawn(self, cancel: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Run the loop until `cancel` fires or the sensor fails.
    ///
    /// Hardware is released on every exit path.
    pub async fn run(mut self, cancel: CancellationToken) {
        info!(
            "Acquisition started (sensor: {}, camera: {}, capture every {}s)",
            self.sensor.name(),
            self.camera.as_ref().map_or("none", |c| c.name()),
            self.schedule.interval().as_secs()
        );
        self.shared.set_status(AcquisitionStatus::Running);

        loop {
            let started = Instant::now();
            let step = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                step = self.run_iteration() => step,
            };

            let wake = match step {
                Ok(Step::Idle) => started + self.periods.idle,
                Ok(Step::Completed) => started + self.periods.active,
                Ok(Step::Backoff) => Instant::now() + self.periods.transient_backoff,
                Err(e) => {
                    error!("Sensor fault, stopping acquisition: {}", e);
                    self.shared.mark_failed(e.to_string());
                    self.cleanup().await;
                    return;
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                _ = sleep_until(wake) => {}
            }
        }

        info!("Acquisition stopping");
        self.cleanup().await;
        self.shared.set_status(AcquisitionStatus::Stopped);
    }

    async fn run_iteration(&mut self) -> agrox_core::Result<Step> {
        let flags = self.shared.flags();
        if flags.is_paused() {
            debug!("Paused, leaving hardware idle");
            return Ok(Step::Idle);
        }

        if flags.sensor {
            match self.sensor.read().await {
                Ok(sample) => {
                    let reading = SensorReading::new(sample, OffsetDateTime::now_utc());
                    self.shared.publish_reading(reading);
                    debug!("{}", reading);
                    let logged = with_archive(&self.archive, move |archive| {
                        archive.append_reading(&reading)
                    })
                    .await;
                    if let Err(e) = logged {
                        warn!("Failed to log reading: {}", e);
                    }
                }
                Err(e) if e.is_transient() => {
                    warn!("Transient sensor fault: {}", e);
                    self.shared.record_transient_fault(e.to_string());
                    return Ok(Step::Backoff);
                }
                Err(e) => return Err(e),
            }
        }

        if flags.camera {
            self.maybe_capture().await;
        }

        Ok(Step::Completed)
    }

    async fn maybe_capture(&mut self) {
        let Some(camera) = self.camera.clone() else {
            return;
        };
        let now = Instant::now();
        if !self.schedule.is_due(now) {
            return;
        }

        if let Err(e) = self.indicator.signal_capture().await {
            warn!("Failed to signal capture: {}", e);
        }

        // The flag may have been cleared since the top of the iteration.
        if !self.shared.flags().camera {
            info!("Camera disabled before capture, skipping");
            return;
        }

        let captured_at = OffsetDateTime::now_utc();
        let path = match self.archive.image_path_for(captured_at) {
            Ok(path) => path,
            Err(e) => {
                warn!("Failed to name image: {}", e);
                return;
            }
        };

        match camera.capture_to(&path).await {
            Ok(()) => {
                self.schedule.mark(now);
                self.shared.record_capture(captured_at);
                info!("Captured {}", path.display());
                if let Some(next) = self.schedule.next_due() {
                    debug!(
                        "Next capture due in {}s",
                        next.saturating_duration_since(now).as_secs()
                    );
                }
            }
            Err(e) => {
                error!("Camera fault, disabling camera: {}", e);
                self.shared.record_camera_failure(e.to_string());
                if let Err(e) = camera.release().await {
                    warn!("Failed to release camera: {}", e);
                }
                self.camera = None;
            }
        }
    }

    /// Release the sensor and camera, then reset the indicator. Runs once.
    async fn cleanup(&mut self) {
        if self.cleaned_up {
            return;
        }
        self.cleaned_up = true;

        if let Err(e) = self.sensor.release().await {
            warn!("Failed to release sensor: {}", e);
        }
        if let Some(camera) = self.camera.take()
            && let Err(e) = camera.release().await
        {
            warn!("Failed to release camera: {}", e);
        }
        if let Err(e) = self.indicator.reset().await {
            warn!("Failed to reset indicator: {}", e);
        }
        info!("Hardware released");
    }
}
