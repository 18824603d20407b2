use super::ResponseTransformer;
use crate::backends::BlobStore;
use crate::metrics;
use crate::model::{LoggedRequest, Response, ResponseDefinition};
use crate::render::RenderError;
use std::sync::Arc;
use tracing::debug;

/// Ordered transformer sequence
///
/// Order is exactly the insertion order. Every stage sees the original
/// request and definition together with the response produced by the stage
/// before it.
#[derive(Clone, Default)]
pub struct TransformerChain {
    transformers: Vec<Arc<dyn ResponseTransformer>>,
}

impl TransformerChain {
    pub fn new(transformers: Vec<Arc<dyn ResponseTransformer>>) -> Self {
        Self { transformers }
    }

    pub fn with(mut self, transformer: Arc<dyn ResponseTransformer>) -> Self {
        self.transformers.push(transformer);
        self
    }

    pub fn len(&self) -> usize {
        self.transformers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transformers.is_empty()
    }

    pub fn names(&self) -> Vec<&str> {
        self.transformers.iter().map(|t| t.name()).collect()
    }

    /// Fold `response` through every transformer that applies to `definition`
    ///
    /// The first failure aborts the chain and is returned as is.
    pub async fn apply(
        &self,
        request: &LoggedRequest,
        definition: &ResponseDefinition,
        response: Response,
        files: &dyn BlobStore,
    ) -> Result<Response, RenderError> {
        let mut response = response;
        for transformer in &self.transformers {
            let name = transformer.name();
            if !(transformer.applies_globally() || transformer.selects(definition)) {
                debug!(transformer = name, "Transformer skipped");
                continue;
            }

            response = match transformer
                .transform(request, response, files, &definition.transformer_parameters)
                .await
            {
                Ok(next) => next,
                Err(source) => {
                    metrics::record_transformer(name, false);
                    return Err(RenderError::Transformer {
                        name: name.to_string(),
                        source,
                    });
                }
            };
            metrics::record_transformer(name, true);
            debug!(transformer = name, "Transformer applied");
        }
        Ok(response)
    }
}
