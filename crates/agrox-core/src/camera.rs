//! Still capture through the `rpicam-still` command line tool.

use std::io;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::debug;

use crate::error::{Error, Result};
use crate::traits::Camera;

/// Default capture program on Raspberry Pi OS Bookworm and later.
pub const DEFAULT_PROGRAM: &str = "rpicam-still";

/// Default upper bound for one capture, including sensor warm-up.
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(15);

/// A camera driven by spawning one capture process per image.
///
/// The child is spawned with `kill_on_drop`, so a capture that exceeds the
/// timeout is killed rather than left holding the camera.
#[derive(Debug, Clone)]
pub struct StillCamera {
    program: String,
    extra_args: Vec<String>,
    timeout: Duration,
}

impl StillCamera {
    /// Create a camera using `program` with the default timeout.
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            extra_args: Vec::new(),
            timeout: DEFAULT_CAPTURE_TIMEOUT,
        }
    }

    /// Extra arguments appended to every capture command.
    #[must_use]
    pub fn with_args(mut self, args: Vec<String>) -> Self {
        self.extra_args = args;
        self
    }

    /// Upper bound for a single capture.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Check that the program exists and reports at least one camera.
    pub async fn probe(&self) -> Result<()> {
        let child = Command::new(&self.program)
            .arg("--list-cameras")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::timeout("camera probe", self.timeout))??;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !output.status.success() || stdout.contains("No cameras available") {
            return Err(Error::Unavailable(format!(
                "{} reports no camera attached",
                self.program
            )));
        }
        Ok(())
    }

    fn spawn_error(&self, err: io::Error) -> Error {
        if err.kind() == io::ErrorKind::NotFound {
            Error::Unavailable(format!("{} is not installed", self.program))
        } else {
            Error::hardware(&self.program, format!("failed to start: {err}"))
        }
    }
}

#[async_trait]
impl Camera for StillCamera {
    fn name(&self) -> &str {
        &self.program
    }

    async fn capture_to(&self, path: &Path) -> Result<()> {
        debug!("Capturing {} with {}", path.display(), self.program);

        let child = Command::new(&self.program)
            .arg("--nopreview")
            .arg("--immediate")
            .arg("-o")
            .arg(path)
            .args(&self.extra_args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let output = tokio::time::timeout(self.timeout, child.wait_with_output())
            .await
            .map_err(|_| Error::timeout("image capture", self.timeout))??;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let detail = stderr.lines().last().unwrap_or("").trim();
            return Err(Error::hardware(
                &self.program,
                format!("{} {}", output.status, detail).trim_end().to_string(),
            ));
        }

        if tokio::fs::metadata(path).await.is_err() {
            return Err(Error::hardware(
                &self.program,
                format!("exited successfully but wrote no image to {}", path.display()),
            ));
        }

        Ok(())
    }
}
