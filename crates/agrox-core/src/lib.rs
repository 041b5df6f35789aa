//! Hardware access and shared acquisition state for the AgroX field device.
//!
//! This crate provides the pieces the device service is assembled from:
//!
//! - **Capabilities**: [`Sensor`], [`Camera`] and [`StatusIndicator`] traits
//! - **Linux hardware**: DHT11/DHT22 over IIO sysfs, `rpicam-still` captures,
//!   sysfs GPIO LEDs
//! - **Mocks**: scriptable stand-ins for tests and bench simulation
//! - **Shared state**: activation flags, latest reading and acquisition health
//! - **Capture schedule**: the image throttle owned by the acquisition loop
//!
//! # Quick Start
//!
//! ```no_run
//! use agrox_core::{IioSensor, Sensor};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let sensor = IioSensor::discover().await?;
//!
//!     match sensor.read().await {
//!         Ok(sample) => println!("{:.1}°C {:.1}%", sample.temperature_c, sample.humidity),
//!         Err(e) if e.is_transient() => println!("Bus noise, try again: {e}"),
//!         Err(e) => return Err(e.into()),
//!     }
//!     Ok(())
//! }
//! ```

pub mod camera;
pub mod error;
pub mod indicator;
pub mod mock;
pub mod schedule;
pub mod sensor;
pub mod shared;
pub mod traits;

pub use agrox_types::types;

pub use camera::StillCamera;
pub use error::{Error, Result};
pub use indicator::{BlinkPattern, GpioIndicator, IndicatorPins, NoIndicator};
pub use mock::{MockCamera, MockIndicator, MockSensor};
pub use schedule::CaptureSchedule;
pub use sensor::IioSensor;
pub use shared::{AcquisitionHealth, AcquisitionStatus, FlagUpdate, SharedState};
pub use traits::{Camera, Sensor, StatusIndicator};
