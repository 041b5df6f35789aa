//! Error types for sample validation in agrox-types.

use thiserror::Error;

/// Reasons a raw sensor sample is rejected as implausible.
///
/// This enum is marked `#[non_exhaustive]` to allow adding new checks
/// without breaking downstream code.
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum ValidationError {
    /// A field was NaN or infinite.
    #[error("{field} is not a number")]
    NotANumber { field: &'static str },

    /// Temperature outside the sensor's physical range.
    #[error("temperature {value}°C is outside the sensor range")]
    TemperatureOutOfRange { value: f32 },

    /// Humidity outside 0-100%.
    #[error("humidity {value}% is outside 0-100%")]
    HumidityOutOfRange { value: f32 },
}
