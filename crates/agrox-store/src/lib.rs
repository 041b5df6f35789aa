//! Local persistence for the AgroX field device.
//!
//! Readings are appended to one CSV file per UTC day and images are stored
//! under timestamped names, so both directories can be browsed, copied off
//! the SD card, or served as-is.
//!
//! # Example
//!
//! ```no_run
//! use agrox_store::{Archive, default_data_dir};
//!
//! let archive = Archive::open(default_data_dir())?;
//! for name in archive.list_images()? {
//!     println!("{name}");
//! }
//! # Ok::<(), agrox_store::Error>(())
//! ```

mod archive;
mod error;

pub use archive::{Archive, LOG_HEADER, validate_file_name};
pub use error::{Error, Result};

/// Default data directory following platform conventions.
///
/// - Linux: `~/.local/share/agrox`
/// - macOS: `~/Library/Application Support/agrox`
pub fn default_data_dir() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("agrox")
}
