//! Response transformers and the ordered chain that applies them.

use crate::backends::BlobStore;
use crate::model::{LoggedRequest, Parameters, Response, ResponseDefinition};
use async_trait::async_trait;
use std::error::Error as StdError;

mod chain;
mod stamp;
mod template;

pub use chain::TransformerChain;
pub use stamp::HeaderStampTransformer;
pub use template::{render_template, ResponseTemplateTransformer};

#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct TransformerError {
    message: String,
    #[source]
    source: Option<Box<dyn StdError + Send + Sync>>,
}

impl TransformerError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            source: None,
        }
    }

    pub fn with_source(
        message: impl Into<String>,
        source: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// A post-processing stage for rendered responses
///
/// A transformer runs when it applies globally or when the definition being
/// rendered selects it. The default selection is by name, against the
/// definition's `transformers` list.
#[async_trait]
pub trait ResponseTransformer: Send + Sync {
    fn name(&self) -> &str;

    fn applies_globally(&self) -> bool {
        false
    }

    fn selects(&self, definition: &ResponseDefinition) -> bool {
        definition.has_transformer(self.name())
    }

    async fn transform(
        &self,
        request: &LoggedRequest,
        response: Response,
        files: &dyn BlobStore,
        parameters: &Parameters,
    ) -> Result<Response, TransformerError>;
}
