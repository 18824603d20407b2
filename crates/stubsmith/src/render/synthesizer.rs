use super::RenderError;
use crate::backends::BlobStore;
use crate::delay::{resolve_initial_delay, SettingsStore};
use crate::model::{
    HttpHeader, Response, ResponseBodySpec, ResponseBuilder, ResponseDefinition, ServedEvent,
};
use crate::scripting::ScriptExecutor;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

pub const MATCHED_STUB_ID_HEADER: &str = "Matched-Stub-Id";
pub const MATCHED_STUB_NAME_HEADER: &str = "Matched-Stub-Name";

/// Builds responses directly from a response definition
pub struct ResponseSynthesizer {
    files: Arc<dyn BlobStore>,
    settings: Arc<dyn SettingsStore>,
    scripts: ScriptExecutor,
}

impl ResponseSynthesizer {
    pub fn new(
        files: Arc<dyn BlobStore>,
        settings: Arc<dyn SettingsStore>,
        scripts: ScriptExecutor,
    ) -> Self {
        Self {
            files,
            settings,
            scripts,
        }
    }

    /// Initial delay for `definition`, falling back to the global settings
    pub fn initial_delay(&self, definition: &ResponseDefinition) -> Duration {
        resolve_initial_delay(
            &self.settings.get(),
            definition.fixed_delay_milliseconds,
            definition.delay_distribution.as_ref(),
        )
    }

    /// Resolve headers, delays and body for `event`
    ///
    /// File bodies are not read here; the builder carries a stream source that
    /// is opened when the response is written.
    pub async fn build(&self, event: &ServedEvent) -> Result<ResponseBuilder, RenderError> {
        let definition = &event.response_definition;

        let mut headers = definition.headers.clone();
        if let Some(stub) = event.matched_stub() {
            headers = headers.plus(HttpHeader::new(MATCHED_STUB_ID_HEADER, stub.id.to_string()));
            if let Some(name) = &stub.name {
                headers = headers.plus(HttpHeader::new(MATCHED_STUB_NAME_HEADER, name.clone()));
            }
        }

        let builder = Response::builder()
            .status(definition.status)
            .status_message(definition.status_message.clone())
            .headers(headers)
            .fault(definition.fault)
            .initial_delay(self.initial_delay(definition))
            .chunked_dribble_delay(definition.chunked_dribble_delay);

        let builder = match definition.body() {
            ResponseBodySpec::Script { name } => {
                debug!(script = %name, "Rendering script body");
                builder.body(self.scripts.execute(name, &event.request).await?)
            }
            ResponseBodySpec::File { name } => {
                builder.stream(self.files.stream_source(name).await?)
            }
            ResponseBodySpec::Binary(bytes) => builder.body(bytes.clone()),
            ResponseBodySpec::Text(text) => builder.body(text.clone()),
            ResponseBodySpec::Empty => builder,
        };

        Ok(builder)
    }
}
