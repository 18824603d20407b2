//! Route dispatch logic for the Admin API.

use crate::admin_api::handlers::{requests, settings, system};
use crate::admin_api::types::not_found;
use crate::admin_api::AdminState;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Method, Response};
use tracing::debug;

/// Dispatch an admin request; `path` is relative to `/__admin`
pub fn route_request(
    method: &Method,
    path: &str,
    query: Option<&str>,
    body: &[u8],
    state: &AdminState,
) -> Response<Full<Bytes>> {
    debug!("Admin API: {} {}", method, path);

    match (method, path.trim_end_matches('/')) {
        (&Method::GET, "/requests") => requests::handle_list(query, state.journal.as_ref()),
        (&Method::DELETE, "/requests") => requests::handle_reset(state.journal.as_ref()),
        (&Method::GET, "/settings") => settings::handle_get(state.settings.as_ref()),
        (&Method::POST, "/settings") | (&Method::PUT, "/settings") => {
            settings::handle_update(body, state.settings.as_ref())
        }
        (&Method::GET, "/health") => system::handle_health(),
        (&Method::GET, "/metrics") => system::handle_metrics(),
        _ => not_found(),
    }
}
