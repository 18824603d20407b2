//! Rendered response handed to the transport layer.

use super::headers::{HttpHeader, HttpHeaders};
use crate::backends::{BlobError, StreamSource};
use crate::delay::ChunkedDribbleDelay;
use crate::fault::Fault;
use bytes::Bytes;
use std::time::Duration;

#[derive(Debug, Clone, Default)]
pub enum ResponseBody {
    #[default]
    Empty,
    Bytes(Bytes),
    /// Opened lazily when the response is written
    Stream(StreamSource),
}

impl ResponseBody {
    /// Materialize the body, reading streamed content in full
    pub async fn read_all(&self) -> Result<Bytes, BlobError> {
        match self {
            ResponseBody::Empty => Ok(Bytes::new()),
            ResponseBody::Bytes(bytes) => Ok(bytes.clone()),
            ResponseBody::Stream(source) => source.read_all().await,
        }
    }

    /// In-memory content, `None` for streamed bodies
    pub fn as_bytes(&self) -> Option<&Bytes> {
        match self {
            ResponseBody::Bytes(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn is_stream(&self) -> bool {
        matches!(self, ResponseBody::Stream(_))
    }
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub status_message: Option<String>,
    pub headers: HttpHeaders,
    pub body: ResponseBody,
    pub fault: Option<Fault>,
    /// Pause before anything is written
    pub initial_delay: Duration,
    pub chunked_dribble_delay: Option<ChunkedDribbleDelay>,
    pub from_proxy: bool,
    configured: bool,
}

impl Response {
    pub fn builder() -> ResponseBuilder {
        ResponseBuilder::default()
    }

    /// Placeholder for requests that reached no configured stub
    pub fn not_configured() -> Self {
        Self {
            configured: false,
            ..ResponseBuilder::default().status(404).build()
        }
    }

    pub fn was_configured(&self) -> bool {
        self.configured
    }

    /// Body as text if it is held in memory and valid UTF-8
    pub fn body_text(&self) -> Option<&str> {
        self.body
            .as_bytes()
            .and_then(|b| std::str::from_utf8(b).ok())
    }
}

#[derive(Debug)]
pub struct ResponseBuilder {
    status: u16,
    status_message: Option<String>,
    headers: HttpHeaders,
    body: ResponseBody,
    fault: Option<Fault>,
    initial_delay: Duration,
    chunked_dribble_delay: Option<ChunkedDribbleDelay>,
    from_proxy: bool,
}

impl Default for ResponseBuilder {
    fn default() -> Self {
        Self {
            status: 200,
            status_message: None,
            headers: HttpHeaders::new(),
            body: ResponseBody::Empty,
            fault: None,
            initial_delay: Duration::ZERO,
            chunked_dribble_delay: None,
            from_proxy: false,
        }
    }
}

impl ResponseBuilder {
    pub fn status(mut self, status: u16) -> Self {
        self.status = status;
        self
    }

    pub fn status_message(mut self, message: Option<String>) -> Self {
        self.status_message = message;
        self
    }

    pub fn headers(mut self, headers: HttpHeaders) -> Self {
        self.headers = headers;
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push(HttpHeader::new(name, value));
        self
    }

    pub fn fault(mut self, fault: Option<Fault>) -> Self {
        self.fault = fault;
        self
    }

    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn chunked_dribble_delay(mut self, dribble: Option<ChunkedDribbleDelay>) -> Self {
        self.chunked_dribble_delay = dribble;
        self
    }

    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = ResponseBody::Bytes(body.into());
        self
    }

    pub fn stream(mut self, source: StreamSource) -> Self {
        self.body = ResponseBody::Stream(source);
        self
    }

    pub fn from_proxy(mut self, from_proxy: bool) -> Self {
        self.from_proxy = from_proxy;
        self
    }

    pub fn build(self) -> Response {
        Response {
            status: self.status,
            status_message: self.status_message,
            headers: self.headers,
            body: self.body,
            fault: self.fault,
            initial_delay: self.initial_delay,
            chunked_dribble_delay: self.chunked_dribble_delay,
            from_proxy: self.from_proxy,
            configured: true,
        }
    }
}
