//! Reading log and image archive on the local filesystem.

use std::fs::OpenOptions;
use std::io;
use std::path::{Path, PathBuf};

use time::macros::format_description;
use time::{Date, OffsetDateTime, UtcOffset};
use tracing::{debug, info};

use agrox_types::SensorReading;

use crate::error::{Error, Result};

/// Column names of the daily reading log.
pub const LOG_HEADER: [&str; 4] = ["timestamp", "temperature_c", "temperature_f", "humidity"];

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png"];
const LOG_EXTENSION: &str = "csv";

/// Archive rooted at one data directory.
///
/// ```text
/// <root>/
///   images/image_YYYYMMDD_HHMMSS.jpg
///   logs/sensor_log_YYYYMMDD.csv
/// ```
///
/// The acquisition loop is the only writer; request handlers only read.
#[derive(Debug, Clone)]
pub struct Archive {
    images_dir: PathBuf,
    logs_dir: PathBuf,
}

impl Archive {
    /// Open or create an archive under `root`.
    pub fn open<P: AsRef<Path>>(root: P) -> Result<Self> {
        let root = root.as_ref();
        let images_dir = root.join("images");
        let logs_dir = root.join("logs");

        for dir in [&images_dir, &logs_dir] {
            std::fs::create_dir_all(dir).map_err(|e| Error::CreateDirectory {
                path: dir.clone(),
                source: e,
            })?;
        }

        info!("Opened archive at {}", root.display());
        Ok(Self {
            images_dir,
            logs_dir,
        })
    }

    pub fn images_dir(&self) -> &Path {
        &self.images_dir
    }

    pub fn logs_dir(&self) -> &Path {
        &self.logs_dir
    }

    // === Reading log ===

    /// Path of the log file for `date`.
    pub fn log_path_for(&self, date: Date) -> Result<PathBuf> {
        let stamp = date.format(format_description!("[year][month][day]"))?;
        Ok(self.logs_dir.join(format!("sensor_log_{stamp}.{LOG_EXTENSION}")))
    }

    /// Append a reading to the log of its UTC day.
    ///
    /// The header is written only when the file is new or empty.
    pub fn append_reading(&self, reading: &SensorReading) -> Result<PathBuf> {
        let observed_at = reading.observed_at.to_offset(UtcOffset::UTC);
        let path = self.log_path_for(observed_at.date())?;

        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        let needs_header = file.metadata()?.len() == 0;

        let mut writer = csv::WriterBuilder::new()
            .has_headers(false)
            .from_writer(file);
        if needs_header {
            writer.write_record(LOG_HEADER)?;
        }

        let timestamp =
            observed_at.format(format_description!("[year]-[month]-[day] [hour]:[minute]:[second]"))?;
        writer.write_record([
            timestamp,
            format!("{:.1}", reading.temperature_c),
            format!("{:.1}", reading.temperature_f()),
            format!("{:.1}", reading.humidity),
        ])?;
        writer.flush()?;

        debug!("Appended reading to {}", path.display());
        Ok(path)
    }

    /// Log file names, oldest first.
    pub fn list_logs(&self) -> Result<Vec<String>> {
        list_files(&self.logs_dir, &[LOG_EXTENSION])
    }

    /// Full path of an existing log file.
    pub fn log_path(&self, name: &str) -> Result<PathBuf> {
        existing_file(&self.logs_dir, name)
    }

    /// Path of the log for the UTC day of `now`, if it exists.
    pub fn today_log_path(&self, now: OffsetDateTime) -> Result<PathBuf> {
        let path = self.log_path_for(now.to_offset(UtcOffset::UTC).date())?;
        if path.is_file() {
            Ok(path)
        } else {
            Err(Error::NotFound(file_name_of(&path)))
        }
    }

    // === Images ===

    /// Path for an image captured at `at` (UTC).
    pub fn image_path_for(&self, at: OffsetDateTime) -> Result<PathBuf> {
        let stamp = at
            .to_offset(UtcOffset::UTC)
            .format(format_description!("[year][month][day]_[hour][minute][second]"))?;
        Ok(self.images_dir.join(format!("image_{stamp}.jpg")))
    }

    /// Image file names, oldest first.
    pub fn list_images(&self) -> Result<Vec<String>> {
        list_files(&self.images_dir, IMAGE_EXTENSIONS)
    }

    /// Most recent image, if any.
    pub fn latest_image(&self) -> Result<Option<PathBuf>> {
        Ok(self
            .list_images()?
            .pop()
            .map(|name| self.images_dir.join(name)))
    }

    /// Full path of an existing image.
    pub fn image_path(&self, name: &str) -> Result<PathBuf> {
        existing_file(&self.images_dir, name)
    }

    /// Archive-relative path of an image, as reported to the upload server.
    pub fn relative_image_path(&self, path: &Path) -> String {
        format!("images/{}", file_name_of(path))
    }
}

/// Reject anything that is not a plain file name inside one directory.
pub fn validate_file_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name.contains("..")
        || name.contains('/')
        || name.contains('\\')
        || name.contains('\0');
    if invalid {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

fn existing_file(dir: &Path, name: &str) -> Result<PathBuf> {
    validate_file_name(name)?;
    let path = dir.join(name);
    if path.is_file() {
        Ok(path)
    } else {
        Err(Error::NotFound(name.to_string()))
    }
}

fn list_files(dir: &Path, extensions: &[&str]) -> Result<Vec<String>> {
    let entries = match std::fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let mut names = Vec::new();
    for entry in entries {
        let entry = entry?;
        if !entry.file_type()?.is_file() {
            continue;
        }
        let path = entry.path();
        let matches = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|e| ext.eq_ignore_ascii_case(e)));
        if matches {
            names.push(file_name_of(&path));
        }
    }
    // Timestamped names sort chronologically.
    names.sort();
    Ok(names)
}

fn file_name_of(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default()
}
