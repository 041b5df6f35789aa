//! Status LEDs driven through the sysfs GPIO interface.
//!
//! Three LEDs are wired to the header:
//! - green: system on
//! - red: system off
//! - capture: blinks right before each image capture
//!
//! With exactly one subsystem enabled, green and red are both lit.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use agrox_types::IndicatorState;

use crate::error::{Error, Result};
use crate::traits::StatusIndicator;

/// Root of the sysfs GPIO interface.
pub const GPIO_ROOT: &str = "/sys/class/gpio";

/// BCM pin numbers of the three LEDs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndicatorPins {
    pub green: u32,
    pub red: u32,
    pub capture: u32,
}

impl Default for IndicatorPins {
    fn default() -> Self {
        Self {
            green: 22,
            red: 27,
            capture: 17,
        }
    }
}

/// How the capture LED blinks before a capture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlinkPattern {
    pub count: u32,
    pub delay: Duration,
}

impl Default for BlinkPattern {
    fn default() -> Self {
        Self {
            count: 3,
            delay: Duration::from_millis(200),
        }
    }
}

/// Output levels (green, red) for a state.
pub fn led_levels(state: IndicatorState) -> (bool, bool) {
    match state {
        IndicatorState::Active => (true, false),
        IndicatorState::Inactive => (false, true),
        IndicatorState::Mixed { .. } => (true, true),
    }
}

#[derive(Debug)]
struct GpioPin {
    number: u32,
    root: PathBuf,
}

impl GpioPin {
    fn dir(&self) -> PathBuf {
        self.root.join(format!("gpio{}", self.number))
    }

    async fn export(&self) -> Result<()> {
        if tokio::fs::metadata(self.dir()).await.is_err() {
            tokio::fs::write(self.root.join("export"), self.number.to_string())
                .await
                .map_err(|e| self.fault("export", e))?;
            // udev needs a moment to fix permissions on the new node
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        tokio::fs::write(self.dir().join("direction"), "out")
            .await
            .map_err(|e| self.fault("set direction", e))
    }

    async fn write(&self, high: bool) -> Result<()> {
        tokio::fs::write(self.dir().join("value"), if high { "1" } else { "0" })
            .await
            .map_err(|e| self.fault("write", e))
    }

    async fn unexport(&self) -> Result<()> {
        tokio::fs::write(self.root.join("unexport"), self.number.to_string())
            .await
            .map_err(|e| self.fault("unexport", e))
    }

    fn fault(&self, action: &str, err: std::io::Error) -> Error {
        Error::hardware(format!("gpio{}", self.number), format!("{action}: {err}"))
    }
}

/// LEDs on sysfs GPIO pins.
#[derive(Debug)]
pub struct GpioIndicator {
    green: GpioPin,
    red: GpioPin,
    capture: GpioPin,
    blink: BlinkPattern,
    released: AtomicBool,
    last_state: Mutex<Option<IndicatorState>>,
}

impl GpioIndicator {
    /// Export the pins under [`GPIO_ROOT`] and drive them low.
    pub async fn open(pins: IndicatorPins, blink: BlinkPattern) -> Result<Self> {
        Self::open_at(GPIO_ROOT, pins, blink).await
    }

    /// Export the pins under a custom sysfs root.
    pub async fn open_at(
        root: impl AsRef<Path>,
        pins: IndicatorPins,
        blink: BlinkPattern,
    ) -> Result<Self> {
        if pins.green == pins.red || pins.green == pins.capture || pins.red == pins.capture {
            return Err(Error::invalid_config(format!(
                "indicator pins must be distinct, got {pins:?}"
            )));
        }

        let root = root.as_ref().to_path_buf();
        let pin = |number| GpioPin {
            number,
            root: root.clone(),
        };
        let indicator = Self {
            green: pin(pins.green),
            red: pin(pins.red),
            capture: pin(pins.capture),
            blink,
            released: AtomicBool::new(false),
            last_state: Mutex::new(None),
        };

        for pin in indicator.pins() {
            pin.export().await?;
            pin.write(false).await?;
        }
        debug!("Exported indicator pins {:?}", pins);

        Ok(indicator)
    }

    /// The last state successfully written.
    pub fn last_state(&self) -> Option<IndicatorState> {
        *self
            .last_state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    fn pins(&self) -> [&GpioPin; 3] {
        [&self.green, &self.red, &self.capture]
    }

    fn ensure_open(&self) -> Result<()> {
        if self.released.load(Ordering::Acquire) {
            return Err(Error::Unavailable("indicator already released".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl StatusIndicator for GpioIndicator {
    async fn set_state(&self, state: IndicatorState) -> Result<()> {
        self.ensure_open()?;
        let (green, red) = led_levels(state);
        self.green.write(green).await?;
        self.red.write(red).await?;
        *self
            .last_state
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(state);
        Ok(())
    }

    async fn signal_capture(&self) -> Result<()> {
        self.ensure_open()?;
        for _ in 0..self.blink.count {
            self.capture.write(true).await?;
            tokio::time::sleep(self.blink.delay).await;
            self.capture.write(false).await?;
            tokio::time::sleep(self.blink.delay).await;
        }
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        if self.released.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        for pin in self.pins() {
            if let Err(e) = pin.write(false).await {
                warn!("Failed to switch off LED: {}", e);
            }
            if let Err(e) = pin.unexport().await {
                warn!("Failed to release LED pin: {}", e);
            }
        }
        Ok(())
    }
}

/// Indicator used when no LEDs are fitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIndicator;

#[async_trait]
impl StatusIndicator for NoIndicator {
    async fn set_state(&self, _state: IndicatorState) -> Result<()> {
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn fake_sysfs(pins: IndicatorPins) -> TempDir {
        let root = TempDir::new().unwrap();
        for n in [pins.green, pins.red, pins.capture] {
            let dir = root.path().join(format!("gpio{n}"));
            std::fs::create_dir_all(&dir).unwrap();
            std::fs::write(dir.join("direction"), "in").unwrap();
            std::fs::write(dir.join("value"), "1").unwrap();
        }
        root
    }

    fn level(root: &Path, pin: u32) -> String {
        std::fs::read_to_string(root.join(format!("gpio{pin}")).join("value")).unwrap()
    }

    #[test]
    fn test_led_levels() {
        assert_eq!(led_levels(IndicatorState::Active), (true, false));
        assert_eq!(led_levels(IndicatorState::Inactive), (false, true));
        assert_eq!(
            led_levels(IndicatorState::Mixed {
                sensor: true,
                camera: false
            }),
            (true, true)
        );
    }

    #[test]
    fn test_mixed_levels_differ_from_active_and_inactive() {
        let active = led_levels(IndicatorState::Active);
        let inactive = led_levels(IndicatorState::Inactive);
        for (sensor, camera) in [(true, false), (false, true)] {
            let mixed = led_levels(IndicatorState::Mixed { sensor, camera });
            assert_ne!(mixed, active, "sensor={sensor} camera={camera}");
            assert_ne!(mixed, inactive, "sensor={sensor} camera={camera}");
        }
    }

    #[tokio::test]
    async fn test_open_drives_pins_low() {
        let pins = IndicatorPins::default();
        let root = fake_sysfs(pins);

        let _indicator = GpioIndicator::open_at(root.path(), pins, BlinkPattern::default())
            .await
            .unwrap();

        for pin in [pins.green, pins.red, pins.capture] {
            assert_eq!(level(root.path(), pin), "0");
            let direction =
                std::fs::read_to_string(root.path().join(format!("gpio{pin}/direction")))
                    .unwrap();
            assert_eq!(direction, "out");
        }
    }

    #[tokio::test]
    async fn test_set_state_writes_levels() {
        let pins = IndicatorPins::default();
        let root = fake_sysfs(pins);
        let indicator = GpioIndicator::open_at(root.path(), pins, BlinkPattern::default())
            .await
            .unwrap();

        indicator.set_state(IndicatorState::Inactive).await.unwrap();
        assert_eq!(level(root.path(), pins.green), "0");
        assert_eq!(level(root.path(), pins.red), "1");

        indicator.set_state(IndicatorState::Active).await.unwrap();
        assert_eq!(level(root.path(), pins.green), "1");
        assert_eq!(level(root.path(), pins.red), "0");
        assert_eq!(indicator.last_state(), Some(IndicatorState::Active));

        indicator
            .set_state(IndicatorState::Mixed {
                sensor: true,
                camera: false,
            })
            .await
            .unwrap();
        assert_eq!(level(root.path(), pins.green), "1");
        assert_eq!(level(root.path(), pins.red), "1");
    }

    #[tokio::test(start_paused = true)]
    async fn test_signal_capture_leaves_led_off() {
        let pins = IndicatorPins::default();
        let root = fake_sysfs(pins);
        let indicator = GpioIndicator::open_at(root.path(), pins, BlinkPattern::default())
            .await
            .unwrap();

        indicator.signal_capture().await.unwrap();
        assert_eq!(level(root.path(), pins.capture), "0");
    }

    #[tokio::test]
    async fn test_reset_is_idempotent() {
        let pins = IndicatorPins::default();
        let root = fake_sysfs(pins);
        let indicator = GpioIndicator::open_at(root.path(), pins, BlinkPattern::default())
            .await
            .unwrap();
        indicator.set_state(IndicatorState::Active).await.unwrap();

        indicator.reset().await.unwrap();
        indicator.reset().await.unwrap();

        assert_eq!(level(root.path(), pins.green), "0");
        assert!(indicator.set_state(IndicatorState::Active).await.is_err());
    }

    #[tokio::test]
    async fn test_duplicate_pins_rejected() {
        let pins = IndicatorPins {
            green: 22,
            red: 22,
            capture: 17,
        };
        let root = TempDir::new().unwrap();
        let err = GpioIndicator::open_at(root.path(), pins, BlinkPattern::default())
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidConfig(_)));
    }
}
