//! Writes a rendered [`Response`] to the wire.
//!
//! Delays, dribbling and faults are carried by the response as data; this is
//! where they turn into behavior.

use crate::backends::{BlobError, BodyStream};
use crate::delay::ChunkedDribbleDelay;
use crate::fault::{random_data, Fault, FaultAction, FAULT_HEADER, GARBAGE_BYTES};
use crate::metrics;
use crate::model::{Response, ResponseBody};
use bytes::Bytes;
use futures::stream::{self, StreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, Empty, Full, StreamBody};
use hyper::body::Frame;
use hyper::ext::ReasonPhrase;
use hyper::header::{HeaderName, HeaderValue};
use hyper::StatusCode;
use std::io;
use tracing::{debug, warn};

pub type HttpBody = UnsyncBoxBody<Bytes, io::Error>;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection is dropped on purpose to emulate a fault
    #[error("Connection closed to emulate {0}")]
    Fault(Fault),
    #[error(transparent)]
    Body(#[from] BlobError),
}

/// Headers computed from the body actually sent
const FRAMING_HEADERS: &[&str] = &["content-length", "transfer-encoding"];

/// Sleep for the initial delay, then build the HTTP response
pub async fn write_response(response: Response) -> Result<hyper::Response<HttpBody>, TransportError> {
    if !response.initial_delay.is_zero() {
        let millis = response.initial_delay.as_millis() as u64;
        debug!(delay_ms = millis, "Applying initial delay");
        metrics::record_delay("initial", millis);
        tokio::time::sleep(response.initial_delay).await;
    }

    if let Some(fault) = response.fault {
        warn!(fault = %fault, "Emulating transport fault");
        metrics::record_fault(fault.as_str());
        match fault.action() {
            FaultAction::CloseWithoutResponse => return Err(TransportError::Fault(fault)),
            FaultAction::GarbageThenClose => return Ok(garbage_response(fault)),
            FaultAction::AbortAfterGarbageChunk => {
                let body = stream::iter([
                    Ok(Frame::data(Bytes::from_static(GARBAGE_BYTES))),
                    Err(io::Error::new(
                        io::ErrorKind::ConnectionAborted,
                        "malformed response chunk",
                    )),
                ]);
                return Ok(http_response(&response, StreamBody::new(body).boxed_unsync()));
            }
        }
    }

    let body = match (&response.body, response.chunked_dribble_delay) {
        (ResponseBody::Empty, _) => empty_body(),
        (body, Some(dribble)) if dribble.number_of_chunks > 0 => {
            metrics::record_delay("dribble", dribble.total_duration);
            dribble_body(body.read_all().await?, dribble)
        }
        (ResponseBody::Bytes(bytes), _) => full_body(bytes.clone()),
        (ResponseBody::Stream(source), _) => stream_body(source.open().await?),
    };

    Ok(http_response(&response, body))
}

fn http_response(response: &Response, body: HttpBody) -> hyper::Response<HttpBody> {
    let status = StatusCode::from_u16(response.status).unwrap_or_else(|_| {
        warn!("Invalid status {}, answering 500", response.status);
        StatusCode::INTERNAL_SERVER_ERROR
    });

    let mut http = hyper::Response::new(body);
    *http.status_mut() = status;

    let headers = http.headers_mut();
    for header in response.headers.iter() {
        if FRAMING_HEADERS.contains(&header.key.to_ascii_lowercase().as_str()) {
            continue;
        }
        let Ok(name) = HeaderName::from_bytes(header.key.as_bytes()) else {
            warn!("Skipping invalid header name {:?}", header.key);
            continue;
        };
        for value in &header.values {
            match HeaderValue::from_str(value) {
                Ok(value) => {
                    headers.append(name.clone(), value);
                }
                Err(_) => warn!("Skipping invalid value for header {}", name),
            }
        }
    }

    if let Some(message) = &response.status_message {
        if let Ok(reason) = ReasonPhrase::try_from(message.clone()) {
            http.extensions_mut().insert(reason);
        }
    }

    http
}

fn garbage_response(fault: Fault) -> hyper::Response<HttpBody> {
    let mut http = hyper::Response::new(full_body(random_data()));
    *http.status_mut() = StatusCode::BAD_GATEWAY;
    let headers = http.headers_mut();
    headers.insert(FAULT_HEADER, HeaderValue::from_static(fault.as_str()));
    headers.insert(hyper::header::CONNECTION, HeaderValue::from_static("close"));
    http
}

pub fn full_body(bytes: Bytes) -> HttpBody {
    Full::new(bytes).map_err(|never| match never {}).boxed_unsync()
}

fn empty_body() -> HttpBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

fn stream_body(stream: BodyStream) -> HttpBody {
    StreamBody::new(stream.map(|chunk| chunk.map(Frame::data))).boxed_unsync()
}

/// Send `body` in `number_of_chunks` pieces spaced evenly over the total duration
fn dribble_body(body: Bytes, dribble: ChunkedDribbleDelay) -> HttpBody {
    let interval = dribble.chunk_interval();
    let chunks = split_chunks(body, dribble.number_of_chunks);
    let frames = stream::iter(chunks.into_iter().enumerate()).then(move |(i, chunk)| async move {
        if i > 0 {
            tokio::time::sleep(interval).await;
        }
        Ok::<_, io::Error>(Frame::data(chunk))
    });
    StreamBody::new(frames).boxed_unsync()
}

/// Split into at most `count` contiguous pieces of near-equal size
pub fn split_chunks(body: Bytes, count: u32) -> Vec<Bytes> {
    if body.is_empty() {
        return Vec::new();
    }
    let count = (count.max(1) as usize).min(body.len());
    let size = body.len().div_ceil(count);
    (0..body.len())
        .step_by(size)
        .map(|start| body.slice(start..(start + size).min(body.len())))
        .collect()
}
