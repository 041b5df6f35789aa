//! Core types for AgroX device state and sensor data.

use core::fmt;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::error::ValidationError;

/// The two independent activation flags of the device.
///
/// There is no coupling between the flags: either subsystem may be enabled
/// while the other is disabled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ActivationFlags {
    /// Whether temperature/humidity acquisition is permitted.
    pub sensor: bool,
    /// Whether periodic image capture is permitted.
    pub camera: bool,
}

impl ActivationFlags {
    /// Both subsystems disabled.
    pub const PAUSED: Self = Self {
        sensor: false,
        camera: false,
    };

    /// Both subsystems enabled.
    pub const ALL_ON: Self = Self {
        sensor: true,
        camera: true,
    };

    /// Create a new set of flags.
    #[must_use]
    pub const fn new(sensor: bool, camera: bool) -> Self {
        Self { sensor, camera }
    }

    /// Apply a partial update. Omitted fields keep their current value.
    ///
    /// # Examples
    ///
    /// ```
    /// use agrox_types::ActivationFlags;
    ///
    /// let flags = ActivationFlags::PAUSED.with_update(Some(true), None);
    /// assert_eq!(flags, ActivationFlags::new(true, false));
    ///
    /// let flags = flags.with_update(None, Some(true));
    /// assert_eq!(flags, ActivationFlags::ALL_ON);
    /// ```
    #[must_use]
    pub fn with_update(self, sensor: Option<bool>, camera: Option<bool>) -> Self {
        Self {
            sensor: sensor.unwrap_or(self.sensor),
            camera: camera.unwrap_or(self.camera),
        }
    }

    /// The acquisition mode these flags select.
    #[must_use]
    pub fn mode(&self) -> AcquisitionMode {
        AcquisitionMode::from(*self)
    }

    /// The status indicator output for these flags.
    #[must_use]
    pub fn indicator_state(&self) -> IndicatorState {
        match (self.sensor, self.camera) {
            (true, true) => IndicatorState::Active,
            (false, false) => IndicatorState::Inactive,
            (sensor, camera) => IndicatorState::Mixed { sensor, camera },
        }
    }

    /// Returns true when neither subsystem is enabled.
    #[must_use]
    pub fn is_paused(&self) -> bool {
        !self.sensor && !self.camera
    }
}

impl fmt::Display for ActivationFlags {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Sensor={}, Camera={}", self.sensor, self.camera)
    }
}

/// States of the acquisition loop, selected purely by the activation flags.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "SCREAMING_SNAKE_CASE"))]
pub enum AcquisitionMode {
    /// Both flags false; hardware is left untouched.
    Paused,
    /// Only the sensor is read.
    SensorOnly,
    /// Only the camera captures.
    CameraOnly,
    /// Sensor and camera are both active.
    BothActive,
}

impl From<ActivationFlags> for AcquisitionMode {
    fn from(flags: ActivationFlags) -> Self {
        match (flags.sensor, flags.camera) {
            (false, false) => AcquisitionMode::Paused,
            (true, false) => AcquisitionMode::SensorOnly,
            (false, true) => AcquisitionMode::CameraOnly,
            (true, true) => AcquisitionMode::BothActive,
        }
    }
}

impl fmt::Display for AcquisitionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AcquisitionMode::Paused => "PAUSED",
            AcquisitionMode::SensorOnly => "SENSOR_ONLY",
            AcquisitionMode::CameraOnly => "CAMERA_ONLY",
            AcquisitionMode::BothActive => "BOTH_ACTIVE",
        };
        f.write_str(name)
    }
}

/// Visual signal shown by the status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum IndicatorState {
    /// Everything on (green).
    Active,
    /// Everything off (red).
    Inactive,
    /// Exactly one subsystem enabled. Each LED mirrors one flag.
    Mixed { sensor: bool, camera: bool },
}

impl fmt::Display for IndicatorState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndicatorState::Active => write!(f, "active"),
            IndicatorState::Inactive => write!(f, "inactive"),
            IndicatorState::Mixed { sensor, camera } => {
                write!(f, "mixed (sensor={}, camera={})", sensor, camera)
            }
        }
    }
}

/// Convert degrees Celsius to degrees Fahrenheit.
#[must_use]
pub fn celsius_to_fahrenheit(celsius: f32) -> f32 {
    celsius * 9.0 / 5.0 + 32.0
}

/// A raw temperature/humidity sample as returned by the sensor hardware.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorSample {
    /// Temperature in degrees Celsius.
    pub temperature_c: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
}

impl SensorSample {
    /// Lowest temperature the DHT22 can report.
    pub const MIN_TEMPERATURE_C: f32 = -40.0;
    /// Highest temperature the DHT22 can report.
    pub const MAX_TEMPERATURE_C: f32 = 80.0;

    /// Create a new sample.
    #[must_use]
    pub const fn new(temperature_c: f32, humidity: f32) -> Self {
        Self {
            temperature_c,
            humidity,
        }
    }

    /// Check that the sample lies within the sensor's physical range.
    ///
    /// Values outside that range come from corrupted frames on the signal line.
    ///
    /// # Examples
    ///
    /// ```
    /// use agrox_types::SensorSample;
    ///
    /// assert!(SensorSample::new(21.4, 55.0).validate().is_ok());
    /// assert!(SensorSample::new(3276.7, 55.0).validate().is_err());
    /// assert!(SensorSample::new(21.4, -1.0).validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ValidationError> {
        if !self.temperature_c.is_finite() {
            return Err(ValidationError::NotANumber {
                field: "temperature",
            });
        }
        if !self.humidity.is_finite() {
            return Err(ValidationError::NotANumber { field: "humidity" });
        }
        if !(Self::MIN_TEMPERATURE_C..=Self::MAX_TEMPERATURE_C).contains(&self.temperature_c) {
            return Err(ValidationError::TemperatureOutOfRange {
                value: self.temperature_c,
            });
        }
        if !(0.0..=100.0).contains(&self.humidity) {
            return Err(ValidationError::HumidityOutOfRange {
                value: self.humidity,
            });
        }
        Ok(())
    }

    /// Temperature in degrees Fahrenheit.
    #[must_use]
    pub fn temperature_f(&self) -> f32 {
        celsius_to_fahrenheit(self.temperature_c)
    }
}

/// The latest published sensor reading.
///
/// Fahrenheit is always derived from the Celsius value and never stored.
/// `observed_at` lets consumers judge staleness themselves.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SensorReading {
    /// Temperature in degrees Celsius.
    pub temperature_c: f32,
    /// Relative humidity in percent.
    pub humidity: f32,
    /// When the hardware read completed.
    #[cfg_attr(feature = "serde", serde(with = "time::serde::rfc3339"))]
    pub observed_at: OffsetDateTime,
}

impl SensorReading {
    /// Create a reading from a hardware sample.
    #[must_use]
    pub fn new(sample: SensorSample, observed_at: OffsetDateTime) -> Self {
        Self {
            temperature_c: sample.temperature_c,
            humidity: sample.humidity,
            observed_at,
        }
    }

    /// Temperature in degrees Fahrenheit.
    #[must_use]
    pub fn temperature_f(&self) -> f32 {
        celsius_to_fahrenheit(self.temperature_c)
    }

    /// The raw sample this reading was built from.
    #[must_use]
    pub fn sample(&self) -> SensorSample {
        SensorSample::new(self.temperature_c, self.humidity)
    }

    /// Age of the reading relative to `now`. Never negative.
    #[must_use]
    pub fn age(&self, now: OffsetDateTime) -> time::Duration {
        (now - self.observed_at).max(time::Duration::ZERO)
    }
}

impl fmt::Display for SensorReading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Temp={:.1}°C, Temp={:.1}°F, Humidity={:.1}%",
            self.temperature_c,
            self.temperature_f(),
            self.humidity
        )
    }
}
