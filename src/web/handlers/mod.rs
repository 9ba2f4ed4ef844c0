//! API handlers for the drive.

pub mod drive;
pub mod health;

pub use drive::*;
pub use health::*;

use std::sync::Arc;

use crate::drive::DriveService;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Drive operations.
    pub drive: Arc<DriveService>,
    /// Deployment environment reported by the health check.
    pub environment: String,
}

impl AppState {
    /// Create a new application state.
    pub fn new(drive: Arc<DriveService>, environment: impl Into<String>) -> Self {
        Self {
            drive,
            environment: environment.into(),
        }
    }
}
