//! Global delay settings handlers.

use crate::admin_api::types::*;
use crate::delay::{GlobalSettings, SettingsStore};
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use tracing::info;

/// GET /__admin/settings
pub fn handle_get(settings: &dyn SettingsStore) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, settings.get().as_ref())
}

/// POST /__admin/settings - Replace the global settings
pub fn handle_update(body: &[u8], settings: &dyn SettingsStore) -> Response<Full<Bytes>> {
    let update: GlobalSettings = match serde_json::from_slice(body) {
        Ok(update) => update,
        Err(e) => {
            return error_response(StatusCode::BAD_REQUEST, &format!("Invalid settings: {e}"))
        }
    };
    if let Some(distribution) = &update.delay_distribution {
        if let Err(message) = distribution.validate() {
            return error_response(StatusCode::BAD_REQUEST, &message);
        }
    }

    info!(
        fixed_delay = ?update.fixed_delay,
        distribution = ?update.delay_distribution,
        "Global delay settings updated"
    );
    settings.set(update);
    json_response(StatusCode::OK, settings.get().as_ref())
}
