//! Mock hardware for testing and bench simulation.
//!
//! The mocks implement [`Sensor`], [`Camera`] and [`StatusIndicator`], so the
//! acquisition loop and control surface run unchanged against them.
//!
//! # Features
//!
//! - **Failure injection**: scripted transient faults, fatal faults, camera failure
//! - **Latency simulation**: artificial delays to mimic slow bus reads
//! - **Drift**: slowly varying readings for `--simulate` runs
//! - **Inspection**: call counters and recorded indicator states

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, AtomicU32, AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use agrox_types::{IndicatorState, SensorSample};

use crate::error::{Error, Result};
use crate::traits::{Camera, Sensor, StatusIndicator};

/// Smallest byte sequence image viewers accept as a JPEG (SOI, APP0 stub, EOI).
pub const PLACEHOLDER_JPEG: &[u8] = &[
    0xFF, 0xD8, 0xFF, 0xE0, 0x00, 0x10, b'J', b'F', b'I', b'F', 0x00, 0x01, 0x01, 0x00, 0x00,
    0x01, 0x00, 0x01, 0x00, 0x00, 0xFF, 0xD9,
];

/// A mock temperature/humidity sensor.
///
/// # Example
///
/// ```
/// use agrox_core::{MockSensor, Sensor};
/// use agrox_types::SensorSample;
///
/// # #[tokio::main]
/// # async fn main() {
/// let sensor = MockSensor::with_sample(SensorSample::new(19.0, 70.0));
/// sensor.set_transient_failures(1);
///
/// assert!(sensor.read().await.unwrap_err().is_transient());
/// assert_eq!(sensor.read().await.unwrap().temperature_c, 19.0);
/// # }
/// ```
#[derive(Debug)]
pub struct MockSensor {
    name: String,
    sample: RwLock<SensorSample>,
    drifting: AtomicBool,
    read_count: AtomicU32,
    /// Number of reads that fail transiently before reads succeed again.
    remaining_transient: AtomicU32,
    should_fail: AtomicBool,
    read_latency_ms: AtomicU64,
    release_count: AtomicU32,
}

impl Default for MockSensor {
    fn default() -> Self {
        Self::new()
    }
}

impl MockSensor {
    /// Create a mock returning 22.5°C / 55%.
    pub fn new() -> Self {
        Self::with_sample(SensorSample::new(22.5, 55.0))
    }

    /// Create a mock returning `sample` on every successful read.
    pub fn with_sample(sample: SensorSample) -> Self {
        Self {
            name: "mock-dht22".to_string(),
            sample: RwLock::new(sample),
            drifting: AtomicBool::new(false),
            read_count: AtomicU32::new(0),
            remaining_transient: AtomicU32::new(0),
            should_fail: AtomicBool::new(false),
            read_latency_ms: AtomicU64::new(0),
            release_count: AtomicU32::new(0),
        }
    }

    /// Create a mock whose readings drift slowly around a daytime climate.
    pub fn drifting() -> Self {
        let sensor = Self::new();
        sensor.drifting.store(true, Ordering::Relaxed);
        sensor
    }

    /// Replace the value returned by successful reads.
    pub async fn set_sample(&self, sample: SensorSample) {
        *self.sample.write().await = sample;
    }

    /// Make the next `count` reads fail with a transient fault.
    pub fn set_transient_failures(&self, count: u32) {
        self.remaining_transient.store(count, Ordering::Relaxed);
    }

    /// Make every read fail with a hardware fault.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Add artificial latency to every read.
    pub fn set_read_latency(&self, latency: Duration) {
        self.read_latency_ms
            .store(latency.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of read attempts, successful or not.
    pub fn read_count(&self) -> u32 {
        self.read_count.load(Ordering::Relaxed)
    }

    /// Number of times [`Sensor::release`] was called.
    pub fn release_count(&self) -> u32 {
        self.release_count.load(Ordering::Relaxed)
    }

    fn drift(base: SensorSample, step: u32) -> SensorSample {
        let t = step as f32;
        SensorSample::new(
            base.temperature_c + 2.5 * (t / 20.0).sin(),
            (base.humidity + 8.0 * (t / 30.0).cos()).clamp(0.0, 100.0),
        )
    }
}

#[async_trait]
impl Sensor for MockSensor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> Result<SensorSample> {
        let step = self.read_count.fetch_add(1, Ordering::Relaxed);

        let latency = self.read_latency_ms.load(Ordering::Relaxed);
        if latency > 0 {
            tokio::time::sleep(Duration::from_millis(latency)).await;
        }

        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::hardware(&self.name, "mock sensor failure"));
        }

        // Check for transient failures
        if self
            .remaining_transient
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |n| n.checked_sub(1))
            .is_ok()
        {
            return Err(Error::transient(&self.name, "checksum did not validate"));
        }

        let sample = *self.sample.read().await;
        if self.drifting.load(Ordering::Relaxed) {
            Ok(Self::drift(sample, step))
        } else {
            Ok(sample)
        }
    }

    async fn release(&self) -> Result<()> {
        self.release_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// A mock camera that writes a placeholder JPEG.
#[derive(Debug, Default)]
pub struct MockCamera {
    should_fail: AtomicBool,
    capture_count: AtomicU32,
    release_count: AtomicU32,
    captured: Mutex<Vec<PathBuf>>,
}

impl MockCamera {
    /// Create a working mock camera.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every capture fail with a hardware fault.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Number of capture attempts, successful or not.
    pub fn capture_count(&self) -> u32 {
        self.capture_count.load(Ordering::Relaxed)
    }

    /// Number of times [`Camera::release`] was called.
    pub fn release_count(&self) -> u32 {
        self.release_count.load(Ordering::Relaxed)
    }

    /// Paths of successful captures, oldest first.
    pub fn captured_paths(&self) -> Vec<PathBuf> {
        self.captured
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl Camera for MockCamera {
    fn name(&self) -> &str {
        "mock-camera"
    }

    async fn capture_to(&self, path: &Path) -> Result<()> {
        self.capture_count.fetch_add(1, Ordering::Relaxed);
        if self.should_fail.load(Ordering::Relaxed) {
            return Err(Error::hardware("mock-camera", "no camera detected"));
        }

        std::fs::write(path, PLACEHOLDER_JPEG)?;
        self.captured
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(path.to_path_buf());
        Ok(())
    }

    async fn release(&self) -> Result<()> {
        self.release_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// A mock indicator that records what it was asked to show.
#[derive(Debug, Default)]
pub struct MockIndicator {
    should_fail: AtomicBool,
    states: Mutex<Vec<IndicatorState>>,
    capture_signals: AtomicU32,
    reset_count: AtomicU32,
}

impl MockIndicator {
    /// Create a working mock indicator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every call fail with a hardware fault.
    pub fn set_should_fail(&self, fail: bool) {
        self.should_fail.store(fail, Ordering::Relaxed);
    }

    /// Every state written, oldest first.
    pub fn states(&self) -> Vec<IndicatorState> {
        self.states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .clone()
    }

    /// The most recent state written.
    pub fn last_state(&self) -> Option<IndicatorState> {
        self.states().last().copied()
    }

    /// Number of capture blinks requested.
    pub fn capture_signals(&self) -> u32 {
        self.capture_signals.load(Ordering::Relaxed)
    }

    /// Number of times [`StatusIndicator::reset`] was called.
    pub fn reset_count(&self) -> u32 {
        self.reset_count.load(Ordering::Relaxed)
    }

    fn check_should_fail(&self) -> Result<()> {
        if self.should_fail.load(Ordering::Relaxed) {
            Err(Error::hardware("mock-indicator", "gpio write failed"))
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl StatusIndicator for MockIndicator {
    async fn set_state(&self, state: IndicatorState) -> Result<()> {
        self.check_should_fail()?;
        self.states
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .push(state);
        Ok(())
    }

    async fn signal_capture(&self) -> Result<()> {
        self.check_should_fail()?;
        self.capture_signals.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        self.reset_count.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
