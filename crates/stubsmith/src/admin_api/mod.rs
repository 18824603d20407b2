//! Admin REST API served under `/__admin` on the stub port.
//!
//! - `GET /__admin/requests`: paginated request journal
//! - `DELETE /__admin/requests`: clear the journal
//! - `GET|POST /__admin/settings`: global delay settings
//! - `GET /__admin/health`, `GET /__admin/metrics`

mod handlers;
mod router;
mod types;

pub use router::route_request;
pub use types::{error_response, json_response, validation_response, ErrorDetail, ErrorResponse};

use crate::delay::SettingsStore;
use crate::journal::RequestJournal;
use std::sync::Arc;

/// Path prefix for admin routes
pub const ADMIN_PREFIX: &str = "/__admin";

/// Shared state the admin handlers operate on
#[derive(Clone)]
pub struct AdminState {
    pub journal: Arc<dyn RequestJournal>,
    pub settings: Arc<dyn SettingsStore>,
}

impl AdminState {
    pub fn new(journal: Arc<dyn RequestJournal>, settings: Arc<dyn SettingsStore>) -> Self {
        Self { journal, settings }
    }
}
