//! Trait abstractions for the device's hardware.
//!
//! The acquisition loop and control surface only ever talk to these traits,
//! so real Linux devices and the mocks in [`crate::mock`] are interchangeable.

use std::path::Path;

use async_trait::async_trait;

use agrox_types::{IndicatorState, SensorSample};

use crate::error::Result;

/// A temperature/humidity sensor.
///
/// # Example
///
/// ```
/// use agrox_core::{MockSensor, Sensor};
///
/// # #[tokio::main]
/// # async fn main() {
/// let sensor = MockSensor::new();
/// let sample = sensor.read().await.unwrap();
/// println!("{:.1}°C {:.1}%", sample.temperature_c, sample.humidity);
/// # }
/// ```
#[async_trait]
pub trait Sensor: Send + Sync {
    /// Human-readable device name used in logs and errors.
    fn name(&self) -> &str;

    /// Perform one hardware read.
    ///
    /// Fails with [`crate::Error::Transient`] for expected protocol noise and
    /// with any other variant for faults the caller must not retry.
    async fn read(&self) -> Result<SensorSample>;

    /// Release the device. Must tolerate repeated calls.
    async fn release(&self) -> Result<()> {
        Ok(())
    }
}

/// A still camera.
#[async_trait]
pub trait Camera: Send + Sync {
    /// Human-readable device name used in logs and errors.
    fn name(&self) -> &str;

    /// Capture one still image to `path`.
    async fn capture_to(&self, path: &Path) -> Result<()>;

    /// Release the device. Must tolerate repeated calls.
    async fn release(&self) -> Result<()> {
        Ok(())
    }
}

/// The LEDs a person standing at the device looks at.
#[async_trait]
pub trait StatusIndicator: Send + Sync {
    /// Show the given state.
    async fn set_state(&self, state: IndicatorState) -> Result<()>;

    /// Signal that an image capture is about to happen.
    async fn signal_capture(&self) -> Result<()> {
        Ok(())
    }

    /// Turn all outputs off and release them. Must tolerate repeated calls.
    async fn reset(&self) -> Result<()>;
}
