//! Response rendering pipeline.
//!
//! [`StubResponseRenderer`] turns a [`ServedEvent`](crate::model::ServedEvent)
//! into a [`Response`](crate::model::Response): proxied or synthesized locally,
//! then passed through the transformer chain.

use crate::backends::BlobError;
use crate::scripting::ScriptError;
use crate::transform::TransformerError;
use std::error::Error as StdError;

mod proxy;
mod renderer;
mod synthesizer;

pub use proxy::{ProxyResponseRenderer, UpstreamProxyRenderer};
pub use renderer::StubResponseRenderer;
pub use synthesizer::{ResponseSynthesizer, MATCHED_STUB_ID_HEADER, MATCHED_STUB_NAME_HEADER};

#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    #[error(transparent)]
    Blob(#[from] BlobError),
    #[error(transparent)]
    Script(#[from] ScriptError),
    #[error("Transformer {name} failed: {source}")]
    Transformer {
        name: String,
        #[source]
        source: TransformerError,
    },
    #[error(transparent)]
    Proxy(Box<dyn StdError + Send + Sync>),
}

impl RenderError {
    pub fn proxy(error: impl StdError + Send + Sync + 'static) -> Self {
        RenderError::Proxy(Box::new(error))
    }

    /// Short label used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            RenderError::Blob(_) => "blob",
            RenderError::Script(_) => "script",
            RenderError::Transformer { .. } => "transformer",
            RenderError::Proxy(_) => "proxy",
        }
    }
}
