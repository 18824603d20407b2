//! Request-aware body templating.
//!
//! # Supported variables
//!
//! - `${request.path}`, `${request.method}`, `${request.url}`, `${request.body}`
//! - `${request.query.<name>}`: query parameter value
//! - `${request.headers.<name>}`: header value (case-insensitive)
//! - `${parameters.<name>}`: entry of the definition's transformer parameters,
//!   dotted names descend into objects
//!
//! Unknown variables render as the empty string.

use super::{ResponseTransformer, TransformerError};
use crate::backends::BlobStore;
use crate::model::{LoggedRequest, Parameters, Response, ResponseBody};
use async_trait::async_trait;
use bytes::Bytes;
use regex::Regex;
use serde_json::Value;
use std::sync::OnceLock;
use tracing::debug;

static TEMPLATE_REGEX: OnceLock<Regex> = OnceLock::new();

fn get_template_regex() -> &'static Regex {
    TEMPLATE_REGEX.get_or_init(|| {
        Regex::new(r"\$\{(request|parameters)\.([a-zA-Z_][a-zA-Z0-9_]*(?:\.[a-zA-Z0-9_-]+)*)\}")
            .unwrap()
    })
}

/// Check if a string contains template variables
pub fn has_template_variables(s: &str) -> bool {
    get_template_regex().is_match(s)
}

/// Substitute every template variable in `template`
pub fn render_template(template: &str, request: &LoggedRequest, parameters: &Parameters) -> String {
    get_template_regex()
        .replace_all(template, |caps: &regex::Captures| {
            let path = &caps[2];
            let value = match &caps[1] {
                "request" => request_value(request, path),
                _ => parameter_value(parameters, path),
            };
            value.unwrap_or_default()
        })
        .into_owned()
}

fn request_value(request: &LoggedRequest, path: &str) -> Option<String> {
    let parts: Vec<&str> = path.splitn(2, '.').collect();
    match parts.as_slice() {
        ["path"] => Some(request.path().to_string()),
        ["method"] => Some(request.method.clone()),
        ["url"] => Some(request.url.clone()),
        ["body"] => Some(request.body_as_string()),
        ["query", name] => request.query.get(*name).cloned(),
        ["headers", name] => request.header(name).map(str::to_string),
        _ => None,
    }
}

fn parameter_value(parameters: &Parameters, path: &str) -> Option<String> {
    let mut segments = path.split('.');
    let mut value = parameters.get(segments.next()?)?;
    for segment in segments {
        value = value.get(segment)?;
    }
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => None,
        other => Some(other.to_string()),
    }
}

/// Templating transformer, registered as `response-template`
#[derive(Debug, Clone, Default)]
pub struct ResponseTemplateTransformer {
    global: bool,
}

impl ResponseTemplateTransformer {
    pub const NAME: &'static str = "response-template";

    /// Opt-in: only definitions listing `response-template` are templated
    pub fn new() -> Self {
        Self { global: false }
    }

    /// Applies to every rendered response
    pub fn global() -> Self {
        Self { global: true }
    }
}

#[async_trait]
impl ResponseTransformer for ResponseTemplateTransformer {
    fn name(&self) -> &str {
        Self::NAME
    }

    fn applies_globally(&self) -> bool {
        self.global
    }

    async fn transform(
        &self,
        request: &LoggedRequest,
        response: Response,
        _files: &dyn BlobStore,
        parameters: &Parameters,
    ) -> Result<Response, TransformerError> {
        let bytes = match &response.body {
            ResponseBody::Empty => return Ok(response),
            ResponseBody::Bytes(bytes) => bytes.clone(),
            ResponseBody::Stream(source) => source.read_all().await.map_err(|e| {
                TransformerError::with_source("cannot read body for templating", e)
            })?,
        };

        let Ok(text) = std::str::from_utf8(&bytes) else {
            debug!("Body is not UTF-8, skipping templating");
            return Ok(response);
        };
        if !has_template_variables(text) {
            return Ok(response);
        }

        let rendered = render_template(text, request, parameters);
        let mut response = response;
        response.body = ResponseBody::Bytes(Bytes::from(rendered));
        Ok(response)
    }
}
