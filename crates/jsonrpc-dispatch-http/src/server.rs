//! HTTP JSON-RPC server
//!
//! Accepts connections with hyper's HTTP/1.1 server and routes every request
//! through a shared [`JsonRpcHttpHandler`].

use std::net::SocketAddr;
use std::sync::Arc;

use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::Request;
use hyper_util::rt::TokioIo;
use jsonrpc_dispatch::{JsonRpcSite, ProcedureBuilder, SiteConfig};
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::{HttpError, JsonRpcHttpHandler, Result};

/// Configuration for the HTTP JSON-RPC server
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_address: SocketAddr,
    /// Path for the JSON-RPC endpoint
    pub path: String,
    /// Enable CORS
    pub enable_cors: bool,
    /// Maximum request body size
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 8000)),
            path: "/api".to_string(),
            enable_cors: true,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Builder for the HTTP JSON-RPC server
pub struct JsonRpcHttpServerBuilder {
    config: ServerConfig,
    site_config: SiteConfig,
    site: Option<Arc<JsonRpcSite>>,
    procedures: Vec<ProcedureBuilder>,
}

impl JsonRpcHttpServerBuilder {
    pub fn new() -> Self {
        Self {
            config: ServerConfig::default(),
            site_config: SiteConfig::default(),
            site: None,
            procedures: Vec::new(),
        }
    }

    /// Set the bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.config.bind_address = addr;
        self
    }

    /// Set the JSON-RPC endpoint path
    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.config.path = path.into();
        self
    }

    /// Enable or disable CORS
    pub fn cors(mut self, enable: bool) -> Self {
        self.config.enable_cors = enable;
        self
    }

    /// Set maximum request body size
    pub fn max_body_size(mut self, size: usize) -> Self {
        self.config.max_body_size = size;
        self
    }

    /// Configure the site created at build time; its path follows the endpoint path
    pub fn site_config(mut self, config: SiteConfig) -> Self {
        self.site_config = config;
        self
    }

    /// Serve an existing site instead of creating one
    pub fn site(mut self, site: Arc<JsonRpcSite>) -> Self {
        self.site = Some(site);
        self
    }

    /// Register a procedure on the site at build time
    pub fn procedure(mut self, builder: ProcedureBuilder) -> Self {
        self.procedures.push(builder);
        self
    }

    /// Build the HTTP JSON-RPC server
    pub fn build(self) -> Result<JsonRpcHttpServer> {
        let site = match self.site {
            Some(site) => site,
            None => Arc::new(JsonRpcSite::new(
                self.site_config.path(self.config.path.clone()),
            )),
        };
        for builder in self.procedures {
            site.register(builder).map_err(HttpError::Registration)?;
        }

        let handler = JsonRpcHttpHandler::new(self.config.clone(), Arc::clone(&site));
        Ok(JsonRpcHttpServer {
            config: self.config,
            site,
            handler,
        })
    }
}

impl Default for JsonRpcHttpServerBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// HTTP JSON-RPC server
#[derive(Clone)]
pub struct JsonRpcHttpServer {
    config: ServerConfig,
    site: Arc<JsonRpcSite>,
    handler: JsonRpcHttpHandler,
}

impl JsonRpcHttpServer {
    pub fn builder() -> JsonRpcHttpServerBuilder {
        JsonRpcHttpServerBuilder::new()
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn site(&self) -> &Arc<JsonRpcSite> {
        &self.site
    }

    pub fn handler(&self) -> &JsonRpcHttpHandler {
        &self.handler
    }

    /// Bind the configured address and serve until an accept error occurs
    pub async fn run(&self) -> Result<()> {
        let listener = TcpListener::bind(self.config.bind_address).await?;
        self.serve(listener).await
    }

    /// Serve connections from an already bound listener
    pub async fn serve(&self, listener: TcpListener) -> Result<()> {
        info!("HTTP JSON-RPC server listening on {}", listener.local_addr()?);
        info!("JSON-RPC endpoint available at: {}", self.config.path);

        loop {
            let (stream, peer_addr) = listener.accept().await?;
            debug!("New connection from {}", peer_addr);

            let handler = self.handler.clone();
            tokio::spawn(async move {
                let io = TokioIo::new(stream);
                let service = service_fn(move |req: Request<Incoming>| {
                    let handler = handler.clone();
                    async move { handler.handle(req).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    if err.is_incomplete_message() {
                        debug!("Client disconnected (normal): {}", err);
                    } else {
                        error!("Error serving connection: {}", err);
                    }
                }
            });
        }
    }
}
