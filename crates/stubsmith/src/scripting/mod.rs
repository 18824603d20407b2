//! Script-generated response bodies.
//!
//! A stub may point its body at a script file. The script source is loaded
//! from the blob store once per name, cached for the life of the process, and
//! evaluated per request with a single `request` binding. The value the
//! script returns becomes the response body text.

use crate::backends::BlobError;
use crate::model::LoggedRequest;
use serde_json::{json, Map, Value};
use std::sync::Arc;

mod executor;
mod rhai_engine;
mod script_cache;

#[cfg(feature = "javascript")]
mod js_engine;

pub use executor::ScriptExecutor;
pub use rhai_engine::RhaiEvaluator;
pub use script_cache::ScriptCache;

#[cfg(feature = "javascript")]
pub use js_engine::JsEvaluator;

#[derive(Debug, thiserror::Error)]
pub enum ScriptError {
    #[error("Failed to load script {name}: {source}")]
    Load {
        name: String,
        #[source]
        source: BlobError,
    },
    #[error("Script {name} is not valid UTF-8")]
    Decode { name: String },
    #[error("Script {name} failed: {message}")]
    Evaluation { name: String, message: String },
    #[error("Script {name} did not complete: {message}")]
    Runtime { name: String, message: String },
    #[error("Unknown script engine: {0}")]
    UnsupportedEngine(String),
}

/// Evaluates script source against a request
///
/// Implementations must not carry state from one evaluation to the next.
pub trait ScriptEvaluator: Send + Sync {
    fn engine_name(&self) -> &'static str;

    fn evaluate(
        &self,
        name: &str,
        source: &str,
        request: &ScriptRequest,
    ) -> Result<String, ScriptError>;
}

/// Request view exposed to scripts as `request`
#[derive(Debug, Clone)]
pub struct ScriptRequest {
    pub method: String,
    pub url: String,
    pub path: String,
    pub absolute_url: String,
    pub headers: Map<String, Value>,
    pub query: Map<String, Value>,
    pub body: String,
}

impl ScriptRequest {
    pub fn to_json(&self) -> Value {
        json!({
            "method": self.method,
            "url": self.url,
            "path": self.path,
            "absoluteUrl": self.absolute_url,
            "headers": self.headers,
            "query": self.query,
            "body": self.body,
        })
    }
}

impl From<&LoggedRequest> for ScriptRequest {
    fn from(request: &LoggedRequest) -> Self {
        let headers = request
            .headers
            .iter()
            .filter_map(|h| {
                h.first_value()
                    .map(|v| (h.key.to_lowercase(), Value::String(v.to_string())))
            })
            .collect();
        let query = request
            .query
            .iter()
            .map(|(k, v)| (k.clone(), Value::String(v.clone())))
            .collect();

        Self {
            method: request.method.clone(),
            url: request.url.clone(),
            path: request.path().to_string(),
            absolute_url: request.absolute_url.clone(),
            headers,
            query,
            body: request.body_as_string(),
        }
    }
}

/// Build the evaluator for a configured engine name
pub fn create_evaluator(
    engine: &str,
    max_operations: u64,
) -> Result<Arc<dyn ScriptEvaluator>, ScriptError> {
    match engine {
        "rhai" => Ok(Arc::new(RhaiEvaluator::new(max_operations))),
        #[cfg(feature = "javascript")]
        "javascript" | "js" => Ok(Arc::new(JsEvaluator::new())),
        #[cfg(not(feature = "javascript"))]
        "javascript" | "js" => Err(ScriptError::UnsupportedEngine(
            "javascript (enable the 'javascript' feature flag)".to_string(),
        )),
        other => Err(ScriptError::UnsupportedEngine(other.to_string())),
    }
}
