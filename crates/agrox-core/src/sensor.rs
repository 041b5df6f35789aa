//! DHT11/DHT22 access through the Linux IIO subsystem.
//!
//! With the `dht11` device-tree overlay loaded, the kernel driver (which also
//! serves the DHT22) exposes the sensor as `/sys/bus/iio/devices/iio:deviceN/`:
//!
//! | File | Unit |
//! |------|------|
//! | `name` | driver name, `dht11` |
//! | `in_temp_input` | milli-degrees Celsius |
//! | `in_humidityrelative_input` | milli-percent relative humidity |
//!
//! The driver reports checksum and timing failures on the single-wire bus as
//! `EIO` or `ETIMEDOUT`. Those are mapped to [`Error::Transient`]; a device
//! that disappears or cannot be opened is an [`Error::Hardware`] fault.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tracing::debug;

use agrox_types::SensorSample;

use crate::error::{Error, Result};
use crate::traits::Sensor;

/// Where the kernel lists IIO devices.
pub const IIO_DEVICES_DIR: &str = "/sys/bus/iio/devices";

const SUPPORTED_DRIVERS: &[&str] = &["dht11", "dht22"];
const TEMPERATURE_CHANNEL: &str = "in_temp_input";
const HUMIDITY_CHANNEL: &str = "in_humidityrelative_input";

const EIO: i32 = 5;
const EAGAIN: i32 = 11;
const ETIMEDOUT: i32 = 110;

/// A DHT sensor read through its IIO sysfs directory.
#[derive(Debug, Clone)]
pub struct IioSensor {
    name: String,
    device_dir: PathBuf,
}

impl IioSensor {
    /// Open the IIO device at `device_dir`.
    pub async fn open(device_dir: impl Into<PathBuf>) -> Result<Self> {
        let device_dir = device_dir.into();
        let driver = match tokio::fs::read_to_string(device_dir.join("name")).await {
            Ok(driver) => driver.trim().to_string(),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::Unavailable(format!(
                    "no IIO device at {}",
                    device_dir.display()
                )));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let node = device_dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let name = format!("{driver} ({node})");
        debug!("Opened IIO sensor {} at {}", name, device_dir.display());

        Ok(Self { name, device_dir })
    }

    /// Find the first DHT device registered with the kernel.
    pub async fn discover() -> Result<Self> {
        Self::discover_in(IIO_DEVICES_DIR).await
    }

    /// Find the first DHT device below `root`.
    pub async fn discover_in(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();
        let mut entries = match tokio::fs::read_dir(root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(Error::Unavailable(format!(
                    "{} does not exist; is the dht11 overlay loaded?",
                    root.display()
                )));
            }
            Err(e) => return Err(Error::Io(e)),
        };

        let mut candidates = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            candidates.push(entry.path());
        }
        candidates.sort();

        for dir in candidates {
            let Ok(driver) = tokio::fs::read_to_string(dir.join("name")).await else {
                continue;
            };
            if SUPPORTED_DRIVERS.contains(&driver.trim()) {
                return Self::open(dir).await;
            }
        }

        Err(Error::Unavailable(format!(
            "no DHT sensor registered under {}",
            root.display()
        )))
    }

    /// The sysfs directory of this device.
    pub fn device_dir(&self) -> &Path {
        &self.device_dir
    }

    async fn read_channel(&self, channel: &str) -> Result<f32> {
        let raw = tokio::fs::read_to_string(self.device_dir.join(channel))
            .await
            .map_err(|e| classify_io_error(&self.name, channel, e))?;

        let milli: i64 = raw.trim().parse().map_err(|_| {
            Error::transient(&self.name, format!("{channel}: unparseable value {raw:?}"))
        })?;

        Ok(milli as f32 / 1000.0)
    }
}

fn classify_io_error(device: &str, channel: &str, err: io::Error) -> Error {
    let transient = matches!(err.raw_os_error(), Some(EIO | EAGAIN | ETIMEDOUT))
        || matches!(
            err.kind(),
            io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
        );

    if transient {
        Error::transient(device, format!("{channel}: {err}"))
    } else {
        Error::hardware(device, format!("{channel}: {err}"))
    }
}

#[async_trait]
impl Sensor for IioSensor {
    fn name(&self) -> &str {
        &self.name
    }

    async fn read(&self) -> Result<SensorSample> {
        let temperature_c = self.read_channel(TEMPERATURE_CHANNEL).await?;
        let humidity = self.read_channel(HUMIDITY_CHANNEL).await?;

        let sample = SensorSample::new(temperature_c, humidity);
        // Corrupted frames that slip past the checksum show up as absurd values.
        sample
            .validate()
            .map_err(|e| Error::transient(&self.name, e.to_string()))?;

        Ok(sample)
    }
}
