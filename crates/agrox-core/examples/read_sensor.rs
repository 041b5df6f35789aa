//! Example: Reading the DHT sensor
//!
//! Discovers the first DHT11/DHT22 registered with the kernel IIO subsystem
//! (or opens the directory given on the command line) and prints a few
//! readings, retrying through transient bus faults the same way the device
//! service does.
//!
//! Run with: `cargo run --example read_sensor -- [/sys/bus/iio/devices/iio:device0]`

use std::env;
use std::time::Duration;

use agrox_core::{IioSensor, Sensor};
use agrox_types::SensorReading;
use time::OffsetDateTime;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    let sensor = match env::args().nth(1) {
        Some(dir) => IioSensor::open(dir).await?,
        None => IioSensor::discover().await?,
    };
    println!("Using {} at {}", sensor.name(), sensor.device_dir().display());
    println!();

    let mut good = 0;
    while good < 5 {
        match sensor.read().await {
            Ok(sample) => {
                let reading = SensorReading::new(sample, OffsetDateTime::now_utc());
                println!("{reading}");
                good += 1;
                tokio::time::sleep(Duration::from_secs(3)).await;
            }
            Err(e) if e.is_transient() => {
                println!("  (transient: {e})");
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
            Err(e) => return Err(e.into()),
        }
    }

    sensor.release().await?;
    Ok(())
}
