//! Inbound request snapshot shared by the render pipeline, scripts and the journal.

use super::headers::{HttpHeader, HttpHeaders};
use base64::Engine as _;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use std::collections::HashMap;
use uuid::Uuid;

/// Immutable record of a request as received by the stub server
#[derive(Debug, Clone)]
pub struct LoggedRequest {
    pub id: Uuid,
    pub method: String,
    /// Path plus query string, as sent by the client
    pub url: String,
    pub absolute_url: String,
    pub client_ip: Option<String>,
    pub headers: HttpHeaders,
    pub query: HashMap<String, String>,
    pub body: Bytes,
    pub logged_date: DateTime<Utc>,
}

impl LoggedRequest {
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        let url = url.into();
        let query = parse_query_string(url.split_once('?').map(|(_, q)| q));
        Self {
            id: Uuid::new_v4(),
            method: method.into().to_uppercase(),
            absolute_url: format!("http://localhost{url}"),
            url,
            client_ip: None,
            headers: HttpHeaders::new(),
            query,
            body: Bytes::new(),
            logged_date: Utc::now(),
        }
    }

    /// Build from hyper request parts and the collected body
    pub fn from_parts(
        parts: &hyper::http::request::Parts,
        body: Bytes,
        client_ip: Option<String>,
    ) -> Self {
        let url = parts
            .uri
            .path_and_query()
            .map(|pq| pq.as_str().to_string())
            .unwrap_or_else(|| parts.uri.path().to_string());

        let host = parts
            .headers
            .get(hyper::header::HOST)
            .and_then(|h| h.to_str().ok())
            .unwrap_or("localhost");

        let mut headers = HttpHeaders::new();
        for name in parts.headers.keys() {
            let values: Vec<String> = parts
                .headers
                .get_all(name)
                .iter()
                .filter_map(|v| v.to_str().ok().map(str::to_string))
                .collect();
            if !values.is_empty() {
                headers.push(HttpHeader::with_values(name.as_str(), values));
            }
        }

        Self {
            id: Uuid::new_v4(),
            method: parts.method.as_str().to_string(),
            absolute_url: format!("http://{host}{url}"),
            query: parse_query_string(parts.uri.query()),
            url,
            client_ip,
            headers,
            body,
            logged_date: Utc::now(),
        }
    }

    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        self.headers.push(HttpHeader::new(name, value));
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    pub fn with_logged_date(mut self, logged_date: DateTime<Utc>) -> Self {
        self.logged_date = logged_date;
        self
    }

    /// Path component of the url, without the query string
    pub fn path(&self) -> &str {
        self.url.split_once('?').map(|(p, _)| p).unwrap_or(&self.url)
    }

    pub fn body_as_string(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.first_value(name)
    }
}

fn decode_component(raw: &str) -> String {
    urlencoding::decode(raw)
        .map(|v| v.into_owned())
        .unwrap_or_else(|_| raw.to_string())
}

/// Parse a raw query string into decoded key/value pairs
pub fn parse_query_string(query: Option<&str>) -> HashMap<String, String> {
    let mut params = HashMap::new();
    if let Some(q) = query {
        for pair in q.split('&') {
            if let Some((key, value)) = pair.split_once('=') {
                params.insert(decode_component(key), decode_component(value));
            } else if !pair.is_empty() {
                params.insert(decode_component(pair), String::new());
            }
        }
    }
    params
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoggedRequestOut<'a> {
    id: &'a Uuid,
    url: &'a str,
    absolute_url: &'a str,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    client_ip: Option<&'a str>,
    headers: &'a HttpHeaders,
    query_params: &'a HashMap<String, String>,
    body: String,
    body_as_base64: String,
    logged_date: &'a DateTime<Utc>,
}

impl Serialize for LoggedRequest {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        LoggedRequestOut {
            id: &self.id,
            url: &self.url,
            absolute_url: &self.absolute_url,
            method: &self.method,
            client_ip: self.client_ip.as_deref(),
            headers: &self.headers,
            query_params: &self.query,
            body: self.body_as_string(),
            body_as_base64: base64::engine::general_purpose::STANDARD.encode(&self.body),
            logged_date: &self.logged_date,
        }
        .serialize(serializer)
    }
}
