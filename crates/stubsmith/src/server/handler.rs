//! Per-request handling: admin dispatch, stub lookup, render, journal, write.

use super::transport::{self, HttpBody, TransportError};
use super::ServerState;
use crate::admin_api::{self, ADMIN_PREFIX};
use crate::metrics;
use crate::model::{HttpHeaders, LoggedRequest, LoggedResponse, Response};
use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::{Request, StatusCode};
use std::fmt::Display;
use tracing::{debug, error, warn};

/// Handle one inbound request
///
/// `Err` means the connection must be dropped without a response.
pub async fn handle_request<B>(
    state: &ServerState,
    req: Request<B>,
    client_ip: Option<String>,
) -> Result<hyper::Response<HttpBody>, TransportError>
where
    B: Body<Data = Bytes>,
    B::Error: Display,
{
    let (parts, body) = req.into_parts();
    let body = match body.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!("Failed to read request body: {}", e);
            return Ok(boxed(admin_api::error_response(
                StatusCode::BAD_REQUEST,
                &format!("Failed to read request body: {e}"),
            )));
        }
    };

    if let Some(admin_path) = parts.uri.path().strip_prefix(ADMIN_PREFIX) {
        let response = admin_api::route_request(
            &parts.method,
            admin_path,
            parts.uri.query(),
            &body,
            &state.admin,
        );
        return Ok(boxed(response));
    }

    let request = LoggedRequest::from_parts(&parts, body, client_ip);
    let event = state.stubs.serve_event(request);
    debug!(
        method = %event.request.method,
        url = %event.request.url,
        matched = event.was_matched,
        "Serving request"
    );

    let response = match state.renderer.render(&event).await {
        Ok(response) => response,
        Err(e) => {
            error!(url = %event.request.url, kind = e.kind(), "Failed to render response: {}", e);
            metrics::record_render_error(e.kind());
            metrics::record_request(&event.request.method, 500, event.was_matched);
            state.journal.record(event.with_response(LoggedResponse {
                status: 500,
                headers: HttpHeaders::new(),
                fault: None,
                from_proxy: false,
            }));
            return Ok(render_failure(&e.to_string()));
        }
    };

    metrics::record_request(&event.request.method, response.status, event.was_matched);
    let not_configured = !response.was_configured();
    let description = format!("{} {}", event.request.method, event.request.url);
    state.journal.record(event.with_response(LoggedResponse {
        status: response.status,
        headers: response.headers.clone(),
        fault: response.fault,
        from_proxy: response.from_proxy,
    }));

    if not_configured {
        return Ok(boxed(admin_api::error_response(
            StatusCode::NOT_FOUND,
            &format!("No stub matched {description}"),
        )));
    }

    write(response).await
}

async fn write(response: Response) -> Result<hyper::Response<HttpBody>, TransportError> {
    match transport::write_response(response).await {
        Err(TransportError::Body(e)) => {
            error!("Failed to open response body: {}", e);
            metrics::record_render_error("blob");
            Ok(render_failure(&e.to_string()))
        }
        other => other,
    }
}

fn render_failure(message: &str) -> hyper::Response<HttpBody> {
    boxed(admin_api::error_response(
        StatusCode::INTERNAL_SERVER_ERROR,
        message,
    ))
}

fn boxed(response: hyper::Response<Full<Bytes>>) -> hyper::Response<HttpBody> {
    response.map(|body| body.map_err(|never| match never {}).boxed_unsync())
}
