//! HTTP server: accepts connections and serves stubs and the admin API.

mod handler;
mod stubs;
mod transport;

pub use handler::handle_request;
pub use stubs::{RequestPattern, StubMapping, StubMappings};
pub use transport::{split_chunks, write_response, HttpBody, TransportError};

use crate::admin_api::AdminState;
use crate::backends::{BlobStore, FileSystemBlobStore};
use crate::config::Config;
use crate::delay::{InMemorySettingsStore, SettingsStore};
use crate::journal::{InMemoryRequestJournal, RequestJournal};
use crate::render::{ResponseSynthesizer, StubResponseRenderer, UpstreamProxyRenderer};
use crate::scripting::{create_evaluator, ScriptExecutor};
use crate::transform::{HeaderStampTransformer, ResponseTemplateTransformer, TransformerChain};
use anyhow::Context;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tracing::{debug, info};

/// Everything a request handler needs
pub struct ServerState {
    pub renderer: StubResponseRenderer,
    pub stubs: Arc<StubMappings>,
    pub journal: Arc<dyn RequestJournal>,
    pub admin: AdminState,
}

impl ServerState {
    /// Wire the pipeline together from configuration
    pub fn from_config(config: &Config) -> Result<Self, anyhow::Error> {
        let files: Arc<dyn BlobStore> = Arc::new(FileSystemBlobStore::new(config.files.root.clone()));
        let settings: Arc<dyn SettingsStore> =
            Arc::new(InMemorySettingsStore::new(config.settings.clone()));
        let journal: Arc<dyn RequestJournal> = if config.journal.disabled {
            Arc::new(InMemoryRequestJournal::disabled())
        } else {
            Arc::new(InMemoryRequestJournal::new(config.journal.max_entries))
        };

        let evaluator = create_evaluator(&config.scripting.engine, config.scripting.max_operations)
            .context("Failed to create script engine")?;
        let scripts = ScriptExecutor::new(files.clone(), evaluator);
        let proxy = UpstreamProxyRenderer::new(Duration::from_millis(config.proxy.timeout_ms))
            .context("Failed to create proxy client")?;

        let transformers = TransformerChain::default()
            .with(Arc::new(ResponseTemplateTransformer::new()))
            .with(Arc::new(HeaderStampTransformer));

        let renderer = StubResponseRenderer::new(
            files.clone(),
            ResponseSynthesizer::new(files, settings.clone(), scripts),
            Arc::new(proxy),
            transformers,
        );

        Ok(Self {
            renderer,
            stubs: Arc::new(StubMappings::new(config.stubs.clone())),
            admin: AdminState::new(journal.clone(), settings),
            journal,
        })
    }
}

pub struct StubServer {
    addr: SocketAddr,
    state: Arc<ServerState>,
}

impl StubServer {
    pub fn new(addr: SocketAddr, state: ServerState) -> Self {
        Self {
            addr,
            state: Arc::new(state),
        }
    }

    pub fn state(&self) -> &Arc<ServerState> {
        &self.state
    }

    /// Bind the configured address and serve forever
    pub async fn run(self) -> Result<(), anyhow::Error> {
        let listener = TcpListener::bind(self.addr)
            .await
            .with_context(|| format!("Failed to bind {}", self.addr))?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(self, listener: TcpListener) -> Result<(), anyhow::Error> {
        info!("Stub server listening on http://{}", listener.local_addr()?);
        info!("Loaded {} stub mappings", self.state.stubs.len());
        info!(
            "Transformers: [{}]",
            self.state.renderer.transformers().names().join(", ")
        );

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);
            let state = Arc::clone(&self.state);

            tokio::spawn(async move {
                let service = service_fn(move |req| {
                    let state = Arc::clone(&state);
                    async move {
                        handle_request(&state, req, Some(remote_addr.ip().to_string())).await
                    }
                });

                // Emulated faults end connections with an error on purpose
                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    debug!("Connection from {} closed: {}", remote_addr, err);
                }
            });
        }
    }
}
