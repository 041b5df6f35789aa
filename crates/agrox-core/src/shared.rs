//! Shared state between the acquisition loop and request handlers.
//!
//! [`SharedState`] is the single source of truth for the activation flags and
//! the latest sensor reading. Both live behind one mutex so a reader never
//! pairs a flag with a reading from a different moment. Every critical
//! section is a field copy or assignment; no I/O happens under the lock.
//!
//! Acquisition health lives behind its own mutex. It is informational and is
//! written far more often than the flags are read.

use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use time::OffsetDateTime;

use agrox_types::{ActivationFlags, SensorReading};

/// Result of a partial flag update.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlagUpdate {
    /// Flags before the update.
    pub previous: ActivationFlags,
    /// Flags after the update.
    pub current: ActivationFlags,
}

impl FlagUpdate {
    /// New sensor value if the update changed it.
    pub fn sensor_change(&self) -> Option<bool> {
        (self.previous.sensor != self.current.sensor).then_some(self.current.sensor)
    }

    /// New camera value if the update changed it.
    pub fn camera_change(&self) -> Option<bool> {
        (self.previous.camera != self.current.camera).then_some(self.current.camera)
    }

    /// Whether any flag changed.
    pub fn changed(&self) -> bool {
        self.previous != self.current
    }
}

/// Lifecycle of the acquisition task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AcquisitionStatus {
    /// Not started yet.
    Starting,
    /// Loop is running.
    Running,
    /// Loop exited on shutdown.
    Stopped,
    /// Loop terminated after an unexpected sensor fault.
    Failed {
        reason: String,
        #[serde(with = "time::serde::rfc3339")]
        at: OffsetDateTime,
    },
}

impl AcquisitionStatus {
    /// Whether acquisition has terminated abnormally.
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Informational counters and availability of the acquisition task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AcquisitionHealth {
    pub status: AcquisitionStatus,
    pub camera_available: bool,
    pub readings: u64,
    pub transient_faults: u64,
    pub captures: u64,
    #[serde(with = "time::serde::rfc3339::option")]
    pub last_capture_at: Option<OffsetDateTime>,
    pub last_error: Option<String>,
}

impl Default for AcquisitionHealth {
    fn default() -> Self {
        Self {
            status: AcquisitionStatus::Starting,
            camera_available: false,
            readings: 0,
            transient_faults: 0,
            captures: 0,
            last_capture_at: None,
            last_error: None,
        }
    }
}

#[derive(Debug, Default)]
struct Inner {
    flags: ActivationFlags,
    latest: Option<SensorReading>,
}

/// Flags, latest reading and acquisition health.
///
/// # Example
///
/// ```
/// use agrox_core::SharedState;
///
/// let state = SharedState::new();
/// state.set_flags(Some(true), None);
/// let update = state.set_flags(None, Some(false));
///
/// assert!(update.current.sensor);
/// assert!(!update.current.camera);
/// assert!(!update.changed());
/// ```
#[derive(Debug, Default)]
pub struct SharedState {
    inner: Mutex<Inner>,
    health: Mutex<AcquisitionHealth>,
}

// Poisoning is recovered: every critical section is a single copy or
// assignment, so a panicking holder cannot leave a value half-written.
fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl SharedState {
    /// Both flags off, no reading.
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with the given flags.
    pub fn with_flags(flags: ActivationFlags) -> Self {
        let state = Self::default();
        lock(&state.inner).flags = flags;
        state
    }

    /// Snapshot of the activation flags.
    pub fn flags(&self) -> ActivationFlags {
        lock(&self.inner).flags
    }

    /// Update the provided flags and leave the others unchanged.
    ///
    /// Setting a flag to its current value succeeds and reports no change.
    pub fn set_flags(&self, sensor: Option<bool>, camera: Option<bool>) -> FlagUpdate {
        let mut inner = lock(&self.inner);
        let previous = inner.flags;
        inner.flags = previous.with_update(sensor, camera);
        FlagUpdate {
            previous,
            current: inner.flags,
        }
    }

    /// The last published reading, if any.
    pub fn latest_reading(&self) -> Option<SensorReading> {
        lock(&self.inner).latest
    }

    /// Flags and reading from the same instant.
    pub fn snapshot(&self) -> (ActivationFlags, Option<SensorReading>) {
        let inner = lock(&self.inner);
        (inner.flags, inner.latest)
    }

    /// Replace the latest reading.
    ///
    /// Only the acquisition loop calls this, and only while the sensor flag
    /// was set at the top of its iteration.
    pub fn publish_reading(&self, reading: SensorReading) {
        lock(&self.inner).latest = Some(reading);
        lock(&self.health).readings += 1;
    }

    // ---- Acquisition health ----

    /// Copy of the current health record.
    pub fn health(&self) -> AcquisitionHealth {
        lock(&self.health).clone()
    }

    pub fn set_status(&self, status: AcquisitionStatus) {
        lock(&self.health).status = status;
    }

    /// Mark acquisition as terminated by `reason`.
    pub fn mark_failed(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut health = lock(&self.health);
        health.last_error = Some(reason.clone());
        health.status = AcquisitionStatus::Failed {
            reason,
            at: OffsetDateTime::now_utc(),
        };
    }

    pub fn set_camera_available(&self, available: bool) {
        lock(&self.health).camera_available = available;
    }

    /// Whether camera hardware is usable.
    pub fn camera_available(&self) -> bool {
        lock(&self.health).camera_available
    }

    pub fn record_transient_fault(&self, reason: impl Into<String>) {
        let mut health = lock(&self.health);
        health.transient_faults += 1;
        health.last_error = Some(reason.into());
    }

    pub fn record_capture(&self, at: OffsetDateTime) {
        let mut health = lock(&self.health);
        health.captures += 1;
        health.last_capture_at = Some(at);
    }

    /// Record a camera fault. The camera stays unavailable from now on.
    pub fn record_camera_failure(&self, reason: impl Into<String>) {
        let mut health = lock(&self.health);
        health.camera_available = false;
        health.last_error = Some(reason.into());
    }
}
