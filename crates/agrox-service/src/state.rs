//! Application state shared across handlers.

use std::sync::Arc;

use time::OffsetDateTime;

use agrox_store::Archive;

use crate::control::ControlSurface;

/// Shared application state.
pub struct AppState {
    /// Control operations; also owns the handles to the shared device state.
    pub control: ControlSurface,
    /// When the service started.
    pub started_at: OffsetDateTime,
}

impl AppState {
    /// Create new application state.
    pub fn new(control: ControlSurface) -> Arc<Self> {
        Arc::new(Self {
            control,
            started_at: OffsetDateTime::now_utc(),
        })
    }

    pub fn archive(&self) -> &Arc<Archive> {
        self.control.archive()
    }
}
