use super::{ProxyResponseRenderer, RenderError, ResponseSynthesizer};
use crate::backends::BlobStore;
use crate::metrics;
use crate::model::{Response, ServedEvent};
use crate::transform::TransformerChain;
use std::sync::Arc;
use tracing::debug;

/// Top-level renderer for served events
pub struct StubResponseRenderer {
    files: Arc<dyn BlobStore>,
    synthesizer: ResponseSynthesizer,
    proxy: Arc<dyn ProxyResponseRenderer>,
    transformers: TransformerChain,
}

impl StubResponseRenderer {
    pub fn new(
        files: Arc<dyn BlobStore>,
        synthesizer: ResponseSynthesizer,
        proxy: Arc<dyn ProxyResponseRenderer>,
        transformers: TransformerChain,
    ) -> Self {
        Self {
            files,
            synthesizer,
            proxy,
            transformers,
        }
    }

    pub fn transformers(&self) -> &TransformerChain {
        &self.transformers
    }

    /// Render the response for `event`
    ///
    /// Unmatched events short-circuit to [`Response::not_configured`] and skip
    /// the transformer chain. Proxied responses keep the upstream status,
    /// headers and body but take their timing from the definition.
    pub async fn render(&self, event: &ServedEvent) -> Result<Response, RenderError> {
        let definition = &event.response_definition;
        if !definition.was_configured() {
            debug!(url = %event.request.url, "No stub configured for request");
            metrics::record_rendered("not_configured");
            return Ok(Response::not_configured());
        }

        let response = if definition.is_proxy_response() {
            debug!(url = %event.request.url, "Rendering proxied response");
            metrics::record_rendered("proxy");
            let mut response = self.proxy.render(event).await?;
            response.initial_delay = self.synthesizer.initial_delay(definition);
            response.chunked_dribble_delay = definition.chunked_dribble_delay;
            response
        } else {
            metrics::record_rendered("direct");
            self.synthesizer.build(event).await?.build()
        };

        self.transformers
            .apply(&event.request, definition, response, self.files.as_ref())
            .await
    }
}
