//! Declarative description of the response a stub should produce.

use super::headers::{HttpHeader, HttpHeaders};
use crate::delay::{ChunkedDribbleDelay, DelayDistribution};
use crate::fault::Fault;
use base64::Engine as _;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Free-form transformer parameters (a JSON object)
pub type Parameters = serde_json::Map<String, Value>;

/// Where the body of a directly rendered response comes from
#[derive(Debug, Clone, PartialEq, Default)]
pub enum ResponseBodySpec {
    #[default]
    Empty,
    /// File in the blob store, streamed as-is
    File { name: String },
    /// File in the blob store holding a script whose result is the body
    Script { name: String },
    Text(String),
    Binary(Bytes),
}

/// Upstream the response is fetched from instead of being rendered locally
#[derive(Debug, Clone, PartialEq)]
pub struct ProxyTarget {
    pub base_url: String,
    pub additional_request_headers: HttpHeaders,
}

/// A definition either renders a body locally or proxies; never both
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseSource {
    Body(ResponseBodySpec),
    Proxy(ProxyTarget),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum DefinitionError {
    #[error("Response declares more than one body source: {}", .0.join(", "))]
    MultipleBodySources(Vec<&'static str>),
    #[error("A proxied response cannot also declare a body ({0})")]
    ProxyWithBody(&'static str),
    #[error("bodyFileIsScript requires bodyFileName")]
    ScriptWithoutFile,
    #[error("Invalid base64Body: {0}")]
    InvalidBase64(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ResponseDefinitionRaw", into = "ResponseDefinitionRaw")]
pub struct ResponseDefinition {
    pub status: u16,
    pub status_message: Option<String>,
    pub headers: HttpHeaders,
    pub fault: Option<Fault>,
    pub fixed_delay_milliseconds: Option<u64>,
    pub delay_distribution: Option<DelayDistribution>,
    pub chunked_dribble_delay: Option<ChunkedDribbleDelay>,
    /// Names of opt-in transformers this definition selects
    pub transformers: Vec<String>,
    pub transformer_parameters: Parameters,
    pub source: ResponseSource,
    was_configured: bool,
}

impl Default for ResponseDefinition {
    fn default() -> Self {
        Self::ok()
    }
}

impl ResponseDefinition {
    /// 200 with an empty body
    pub fn ok() -> Self {
        Self::with_status(200)
    }

    pub fn with_status(status: u16) -> Self {
        Self {
            status,
            status_message: None,
            headers: HttpHeaders::new(),
            fault: None,
            fixed_delay_milliseconds: None,
            delay_distribution: None,
            chunked_dribble_delay: None,
            transformers: Vec::new(),
            transformer_parameters: Parameters::new(),
            source: ResponseSource::Body(ResponseBodySpec::Empty),
            was_configured: true,
        }
    }

    /// Placeholder used when no stub matched the request
    pub fn not_configured() -> Self {
        Self {
            was_configured: false,
            ..Self::with_status(404)
        }
    }

    pub fn proxied_to(base_url: impl Into<String>) -> Self {
        Self {
            source: ResponseSource::Proxy(ProxyTarget {
                base_url: base_url.into(),
                additional_request_headers: HttpHeaders::new(),
            }),
            ..Self::ok()
        }
    }

    pub fn was_configured(&self) -> bool {
        self.was_configured
    }

    pub fn is_proxy_response(&self) -> bool {
        matches!(self.source, ResponseSource::Proxy(_))
    }

    pub fn proxy_target(&self) -> Option<&ProxyTarget> {
        match &self.source {
            ResponseSource::Proxy(target) => Some(target),
            ResponseSource::Body(_) => None,
        }
    }

    /// Body spec of a locally rendered response; `Empty` for proxies
    pub fn body(&self) -> &ResponseBodySpec {
        static EMPTY: ResponseBodySpec = ResponseBodySpec::Empty;
        match &self.source {
            ResponseSource::Body(spec) => spec,
            ResponseSource::Proxy(_) => &EMPTY,
        }
    }

    pub fn has_transformer(&self, name: &str) -> bool {
        self.transformers.iter().any(|t| t == name)
    }

    pub fn status_message(mut self, message: impl Into<String>) -> Self {
        self.status_message = Some(message.into());
        self
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push(HttpHeader::new(name, value));
        self
    }

    pub fn body_spec(mut self, spec: ResponseBodySpec) -> Self {
        self.source = ResponseSource::Body(spec);
        self
    }

    pub fn text_body(self, body: impl Into<String>) -> Self {
        self.body_spec(ResponseBodySpec::Text(body.into()))
    }

    pub fn binary_body(self, body: impl Into<Bytes>) -> Self {
        self.body_spec(ResponseBodySpec::Binary(body.into()))
    }

    pub fn body_file(self, name: impl Into<String>) -> Self {
        self.body_spec(ResponseBodySpec::File { name: name.into() })
    }

    pub fn script_file(self, name: impl Into<String>) -> Self {
        self.body_spec(ResponseBodySpec::Script { name: name.into() })
    }

    pub fn fault(mut self, fault: Fault) -> Self {
        self.fault = Some(fault);
        self
    }

    pub fn fixed_delay(mut self, millis: u64) -> Self {
        self.fixed_delay_milliseconds = Some(millis);
        self
    }

    pub fn random_delay(mut self, distribution: DelayDistribution) -> Self {
        self.delay_distribution = Some(distribution);
        self
    }

    pub fn chunked_dribble(mut self, dribble: ChunkedDribbleDelay) -> Self {
        self.chunked_dribble_delay = Some(dribble);
        self
    }

    pub fn transformer(mut self, name: impl Into<String>) -> Self {
        self.transformers.push(name.into());
        self
    }

    pub fn transformer_parameter(mut self, key: impl Into<String>, value: Value) -> Self {
        self.transformer_parameters.insert(key.into(), value);
        self
    }
}

fn default_status() -> u16 {
    200
}

fn is_false(value: &bool) -> bool {
    !*value
}

/// Wire representation with independently nullable body fields
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResponseDefinitionRaw {
    #[serde(default = "default_status")]
    status: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    status_message: Option<String>,
    #[serde(default, skip_serializing_if = "HttpHeaders::is_empty")]
    headers: HttpHeaders,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    json_body: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    base64_body: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    body_file_name: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    body_file_is_script: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fault: Option<Fault>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    fixed_delay_milliseconds: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    delay_distribution: Option<DelayDistribution>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    chunked_dribble_delay: Option<ChunkedDribbleDelay>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    transformers: Vec<String>,
    #[serde(default, skip_serializing_if = "serde_json::Map::is_empty")]
    transformer_parameters: Parameters,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proxy_base_url: Option<String>,
    #[serde(default, skip_serializing_if = "HttpHeaders::is_empty")]
    additional_proxy_request_headers: HttpHeaders,
}

impl TryFrom<ResponseDefinitionRaw> for ResponseDefinition {
    type Error = DefinitionError;

    fn try_from(raw: ResponseDefinitionRaw) -> Result<Self, Self::Error> {
        let mut declared = Vec::new();
        if raw.body.is_some() {
            declared.push("body");
        }
        if raw.json_body.is_some() {
            declared.push("jsonBody");
        }
        if raw.base64_body.is_some() {
            declared.push("base64Body");
        }
        if raw.body_file_name.is_some() {
            declared.push("bodyFileName");
        }
        if declared.len() > 1 {
            return Err(DefinitionError::MultipleBodySources(declared));
        }
        if raw.body_file_is_script && raw.body_file_name.is_none() {
            return Err(DefinitionError::ScriptWithoutFile);
        }

        let source = match raw.proxy_base_url {
            Some(base_url) => {
                if let Some(&field) = declared.first() {
                    return Err(DefinitionError::ProxyWithBody(field));
                }
                ResponseSource::Proxy(ProxyTarget {
                    base_url,
                    additional_request_headers: raw.additional_proxy_request_headers,
                })
            }
            None => {
                let spec = if let Some(name) = raw.body_file_name {
                    if raw.body_file_is_script {
                        ResponseBodySpec::Script { name }
                    } else {
                        ResponseBodySpec::File { name }
                    }
                } else if let Some(text) = raw.body {
                    ResponseBodySpec::Text(text)
                } else if let Some(json) = raw.json_body {
                    ResponseBodySpec::Text(json.to_string())
                } else if let Some(encoded) = raw.base64_body {
                    let bytes = base64::engine::general_purpose::STANDARD
                        .decode(encoded.trim())
                        .map_err(|e| DefinitionError::InvalidBase64(e.to_string()))?;
                    ResponseBodySpec::Binary(Bytes::from(bytes))
                } else {
                    ResponseBodySpec::Empty
                };
                ResponseSource::Body(spec)
            }
        };

        Ok(Self {
            status: raw.status,
            status_message: raw.status_message,
            headers: raw.headers,
            fault: raw.fault,
            fixed_delay_milliseconds: raw.fixed_delay_milliseconds,
            delay_distribution: raw.delay_distribution,
            chunked_dribble_delay: raw.chunked_dribble_delay,
            transformers: raw.transformers,
            transformer_parameters: raw.transformer_parameters,
            source,
            was_configured: true,
        })
    }
}

impl From<ResponseDefinition> for ResponseDefinitionRaw {
    fn from(def: ResponseDefinition) -> Self {
        let mut raw = ResponseDefinitionRaw {
            status: def.status,
            status_message: def.status_message,
            headers: def.headers,
            body: None,
            json_body: None,
            base64_body: None,
            body_file_name: None,
            body_file_is_script: false,
            fault: def.fault,
            fixed_delay_milliseconds: def.fixed_delay_milliseconds,
            delay_distribution: def.delay_distribution,
            chunked_dribble_delay: def.chunked_dribble_delay,
            transformers: def.transformers,
            transformer_parameters: def.transformer_parameters,
            proxy_base_url: None,
            additional_proxy_request_headers: HttpHeaders::new(),
        };
        match def.source {
            ResponseSource::Proxy(target) => {
                raw.proxy_base_url = Some(target.base_url);
                raw.additional_proxy_request_headers = target.additional_request_headers;
            }
            ResponseSource::Body(ResponseBodySpec::Empty) => {}
            ResponseSource::Body(ResponseBodySpec::File { name }) => {
                raw.body_file_name = Some(name);
            }
            ResponseSource::Body(ResponseBodySpec::Script { name }) => {
                raw.body_file_name = Some(name);
                raw.body_file_is_script = true;
            }
            ResponseSource::Body(ResponseBodySpec::Text(text)) => raw.body = Some(text),
            ResponseSource::Body(ResponseBodySpec::Binary(bytes)) => {
                raw.base64_body = Some(base64::engine::general_purpose::STANDARD.encode(bytes));
            }
        }
        raw
    }
}
