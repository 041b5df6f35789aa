//! Platform-agnostic types for the AgroX field monitoring device.
//!
//! This crate holds the data model shared by the hardware layer
//! (agrox-core), the archive (agrox-store) and the service.
//!
//! # Example
//!
//! ```
//! use agrox_types::{ActivationFlags, AcquisitionMode, IndicatorState};
//!
//! let flags = ActivationFlags::new(true, false);
//! assert_eq!(flags.mode(), AcquisitionMode::SensorOnly);
//! assert_eq!(
//!     flags.indicator_state(),
//!     IndicatorState::Mixed { sensor: true, camera: false }
//! );
//! ```

pub mod error;
pub mod types;

pub use error::ValidationError;
pub use types::{
    AcquisitionMode, ActivationFlags, IndicatorState, SensorReading, SensorSample,
    celsius_to_fahrenheit,
};

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use time::macros::datetime;

    #[test]
    fn test_fahrenheit_conversion() {
        assert!((celsius_to_fahrenheit(0.0) - 32.0).abs() < f32::EPSILON);
        assert!((celsius_to_fahrenheit(100.0) - 212.0).abs() < 0.001);
        assert!((celsius_to_fahrenheit(-40.0) - -40.0).abs() < 0.001);
        assert!((celsius_to_fahrenheit(22.5) - 72.5).abs() < 0.001);
    }

    #[test]
    fn test_modes_from_flags() {
        assert_eq!(ActivationFlags::PAUSED.mode(), AcquisitionMode::Paused);
        assert_eq!(
            ActivationFlags::new(true, false).mode(),
            AcquisitionMode::SensorOnly
        );
        assert_eq!(
            ActivationFlags::new(false, true).mode(),
            AcquisitionMode::CameraOnly
        );
        assert_eq!(ActivationFlags::ALL_ON.mode(), AcquisitionMode::BothActive);
    }

    #[test]
    fn test_indicator_states_are_distinct() {
        let on = ActivationFlags::ALL_ON.indicator_state();
        let off = ActivationFlags::PAUSED.indicator_state();
        let mixed = ActivationFlags::new(false, true).indicator_state();

        assert_eq!(on, IndicatorState::Active);
        assert_eq!(off, IndicatorState::Inactive);
        assert_eq!(
            mixed,
            IndicatorState::Mixed {
                sensor: false,
                camera: true
            }
        );
        assert_ne!(mixed, on);
        assert_ne!(mixed, off);
    }

    #[test]
    fn test_default_flags_are_paused() {
        let flags = ActivationFlags::default();
        assert!(flags.is_paused());
        assert_eq!(flags.to_string(), "Sensor=false, Camera=false");
    }

    #[test]
    fn test_update_without_fields_is_identity() {
        let flags = ActivationFlags::new(true, false);
        assert_eq!(flags.with_update(None, None), flags);
    }

    #[test]
    fn test_reading_derives_fahrenheit() {
        let reading = SensorReading::new(
            SensorSample::new(25.0, 40.0),
            datetime!(2025-03-01 12:00:00 UTC),
        );
        assert!((reading.temperature_f() - 77.0).abs() < 0.001);
        assert_eq!(reading.sample(), SensorSample::new(25.0, 40.0));
    }

    #[test]
    fn test_reading_age_is_never_negative() {
        let reading = SensorReading::new(
            SensorSample::new(25.0, 40.0),
            datetime!(2025-03-01 12:00:00 UTC),
        );
        let later = datetime!(2025-03-01 12:00:30 UTC);
        let earlier = datetime!(2025-03-01 11:59:00 UTC);

        assert_eq!(reading.age(later), time::Duration::seconds(30));
        assert_eq!(reading.age(earlier), time::Duration::ZERO);
    }

    #[test]
    fn test_reading_display() {
        let reading = SensorReading::new(
            SensorSample::new(22.5, 45.0),
            datetime!(2025-03-01 12:00:00 UTC),
        );
        assert_eq!(
            reading.to_string(),
            "Temp=22.5°C, Temp=72.5°F, Humidity=45.0%"
        );
    }

    #[test]
    fn test_sample_validation() {
        assert!(SensorSample::new(-40.0, 0.0).validate().is_ok());
        assert!(SensorSample::new(80.0, 100.0).validate().is_ok());

        assert!(matches!(
            SensorSample::new(80.1, 50.0).validate(),
            Err(ValidationError::TemperatureOutOfRange { .. })
        ));
        assert!(matches!(
            SensorSample::new(20.0, 100.5).validate(),
            Err(ValidationError::HumidityOutOfRange { .. })
        ));
        assert!(matches!(
            SensorSample::new(f32::NAN, 50.0).validate(),
            Err(ValidationError::NotANumber {
                field: "temperature"
            })
        ));
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_reading_serialization_omits_fahrenheit() {
        let reading = SensorReading::new(
            SensorSample::new(22.5, 45.0),
            datetime!(2025-03-01 12:00:00 UTC),
        );
        let json = serde_json::to_value(reading).unwrap();
        assert_eq!(json["temperature_c"], 22.5);
        assert_eq!(json["humidity"], 45.0);
        assert_eq!(json["observed_at"], "2025-03-01T12:00:00Z");
        assert!(json.get("temperature_f").is_none());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_indicator_state_serialization() {
        let json = serde_json::to_string(&IndicatorState::Active).unwrap();
        assert_eq!(json, "\"active\"");

        let mixed = IndicatorState::Mixed {
            sensor: true,
            camera: false,
        };
        let json = serde_json::to_value(mixed).unwrap();
        assert_eq!(json["mixed"]["sensor"], true);
    }

    proptest! {
        #[test]
        fn prop_partial_updates_keep_last_value(
            updates in proptest::collection::vec(
                (proptest::option::of(any::<bool>()), proptest::option::of(any::<bool>())),
                0..32,
            )
        ) {
            let mut flags = ActivationFlags::PAUSED;
            let mut expected_sensor = false;
            let mut expected_camera = false;

            for (sensor, camera) in updates {
                flags = flags.with_update(sensor, camera);
                if let Some(s) = sensor {
                    expected_sensor = s;
                }
                if let Some(c) = camera {
                    expected_camera = c;
                }
            }

            prop_assert_eq!(flags, ActivationFlags::new(expected_sensor, expected_camera));
        }

        #[test]
        fn prop_valid_samples_stay_valid(
            temp in SensorSample::MIN_TEMPERATURE_C..=SensorSample::MAX_TEMPERATURE_C,
            humidity in 0.0f32..=100.0,
        ) {
            prop_assert!(SensorSample::new(temp, humidity).validate().is_ok());
        }
    }
}
