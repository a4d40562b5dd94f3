//! # HTTP JSON-RPC Server
//!
//! HTTP transport for the `jsonrpc-dispatch` engine. A single endpoint
//! accepts JSON-RPC bodies over POST and hands them to a
//! [`JsonRpcSite`]; status code, headers and body of the dispatch result are
//! written back unchanged.
//!
//! ## Features
//! - hyper 1.x HTTP/1.1 server, one task per connection
//! - Request body size limit
//! - CORS support for browser-based clients

pub mod cors;
pub mod handler;
pub mod server;

#[cfg(test)]
mod tests;

// Re-export main types
pub use cors::CorsLayer;
pub use handler::JsonRpcHttpHandler;
pub use server::{JsonRpcHttpServer, JsonRpcHttpServerBuilder, ServerConfig};

// Re-export foundational types
pub use jsonrpc_dispatch::{JsonRpcSite, SiteConfig};

/// Result type for HTTP JSON-RPC operations
pub type Result<T> = std::result::Result<T, HttpError>;

/// HTTP transport errors
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    #[error("HTTP error: {0}")]
    Http(#[from] hyper::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Procedure registration failed: {0}")]
    Registration(String),
}
