use super::{ScriptCache, ScriptError, ScriptEvaluator, ScriptRequest};
use crate::backends::BlobStore;
use crate::metrics;
use crate::model::LoggedRequest;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Loads, caches and runs body scripts
///
/// Source text is read from the blob store on the first use of a name and
/// kept in the shared [`ScriptCache`]. A failed load leaves no cache entry,
/// so the next request retries it.
#[derive(Clone)]
pub struct ScriptExecutor {
    files: Arc<dyn BlobStore>,
    cache: Arc<ScriptCache>,
    evaluator: Arc<dyn ScriptEvaluator>,
}

impl ScriptExecutor {
    pub fn new(files: Arc<dyn BlobStore>, evaluator: Arc<dyn ScriptEvaluator>) -> Self {
        Self::with_cache(files, evaluator, Arc::new(ScriptCache::new()))
    }

    pub fn with_cache(
        files: Arc<dyn BlobStore>,
        evaluator: Arc<dyn ScriptEvaluator>,
        cache: Arc<ScriptCache>,
    ) -> Self {
        Self {
            files,
            cache,
            evaluator,
        }
    }

    pub fn cache(&self) -> &Arc<ScriptCache> {
        &self.cache
    }

    pub fn engine_name(&self) -> &'static str {
        self.evaluator.engine_name()
    }

    /// Run the named script against `request` and return the body text
    pub async fn execute(&self, name: &str, request: &LoggedRequest) -> Result<String, ScriptError> {
        let source = self.load(name).await?;
        let evaluator = self.evaluator.clone();
        let script_request = ScriptRequest::from(request);
        let script_name = name.to_string();

        let start = Instant::now();
        let result = tokio::task::spawn_blocking(move || {
            evaluator.evaluate(&script_name, &source, &script_request)
        })
        .await
        .map_err(|e| ScriptError::Runtime {
            name: name.to_string(),
            message: e.to_string(),
        })?;
        let elapsed_ms = start.elapsed().as_secs_f64() * 1000.0;

        metrics::record_script_execution(
            name,
            elapsed_ms,
            if result.is_ok() { "ok" } else { "error" },
        );
        debug!(
            script = name,
            engine = self.evaluator.engine_name(),
            elapsed_ms,
            ok = result.is_ok(),
            "Script evaluated"
        );

        result
    }

    async fn load(&self, name: &str) -> Result<Arc<str>, ScriptError> {
        if let Some(source) = self.cache.get(name) {
            metrics::record_script_cache(true);
            return Ok(source);
        }
        metrics::record_script_cache(false);

        let bytes = self
            .files
            .read_all(name)
            .await
            .map_err(|source| ScriptError::Load {
                name: name.to_string(),
                source,
            })?;
        let text = String::from_utf8(bytes.to_vec()).map_err(|_| ScriptError::Decode {
            name: name.to_string(),
        })?;

        debug!(script = name, bytes = text.len(), "Script source cached");
        Ok(self.cache.insert_if_absent(name, text))
    }
}
