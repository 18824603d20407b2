//! Request journal handlers.

use crate::admin_api::types::*;
use crate::journal::{paginate, parse_journal_request, RequestJournal};
use crate::model::parse_query_string;
use bytes::Bytes;
use http_body_util::Full;
use hyper::{Response, StatusCode};
use tracing::{debug, warn};

/// GET /__admin/requests - Paginated journal
pub fn handle_list(query: Option<&str>, journal: &dyn RequestJournal) -> Response<Full<Bytes>> {
    let params = parse_query_string(query);
    let (event_query, page_query) = match parse_journal_request(&params) {
        Ok(parsed) => parsed,
        Err(errors) => {
            warn!("Rejected journal query: {}", errors);
            return validation_response(&errors);
        }
    };

    let snapshot = journal.serve_events(&event_query);
    let page = paginate(snapshot.events, &page_query, snapshot.journal_disabled);
    debug!(
        returned = page.len(),
        total = page.meta.total_matching,
        "Serving journal page"
    );
    json_response(StatusCode::OK, &page)
}

/// DELETE /__admin/requests - Clear the journal
pub fn handle_reset(journal: &dyn RequestJournal) -> Response<Full<Bytes>> {
    let cleared = journal.count();
    journal.reset();
    json_response(StatusCode::OK, &serde_json::json!({ "cleared": cleared }))
}
