//! # Greeting JSON-RPC Server Example
//!
//! Serves a handful of procedures over HTTP.
//!
//! ## Usage
//! ```bash
//! cargo run -p jsonrpc-dispatch-http --example greeting_server -- --port 5000
//! ```
//!
//! ```bash
//! curl -i -X POST http://127.0.0.1:5000/api \
//!   -H "Content-Type: application/json" \
//!   -d '{"jsonrpc":"2.0","id":1,"method":"greeting","params":["Rust"]}'
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use anyhow::Result;
use clap::Parser;
use jsonrpc_dispatch::prelude::*;
use jsonrpc_dispatch_http::JsonRpcHttpServer;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Port to listen on
    #[arg(short, long, default_value = "5000")]
    port: u16,

    /// JSON-RPC endpoint path
    #[arg(long, default_value = "/api")]
    path: String,

    /// Include stack and executable in error objects
    #[arg(long, default_value = "false")]
    debug: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let bind_address = SocketAddr::from(([127, 0, 0, 1], args.port));

    let server = JsonRpcHttpServer::builder()
        .bind_address(bind_address)
        .path(args.path)
        .site_config(
            SiteConfig::new()
                .name("greeting-server")
                .version(env!("CARGO_PKG_VERSION"))
                .debug(args.debug)
                .procedure_timeout(Duration::from_secs(10)),
        )
        .procedure(
            ProcedureBuilder::new("greeting")
                .summary("Greet someone by name")
                .param_with_default("name", ParamType::String, json!("world"))
                .returns(ParamType::String)
                .handler_fn(|args| {
                    let name: String = args.get("name")?;
                    Ok(json!(format!("Hello {name}")))
                }),
        )
        .procedure(
            ProcedureBuilder::new("echo")
                .param(
                    "text",
                    ParamType::String.with(Metadata::MaxLength(256)),
                )
                .returns(ParamType::String)
                .handler(|args| async move {
                    let text: String = args.get("text")?;
                    Ok::<_, ProcedureError>(json!(text))
                }),
        )
        .procedure(
            ProcedureBuilder::new("notify")
                .param("message", ParamType::String)
                .handler_fn(|args| {
                    let message: String = args.get("message")?;
                    info!("notification received: {}", message);
                    Ok(())
                }),
        )
        .build()?;

    info!("Starting greeting server on {}", bind_address);
    server.run().await?;
    Ok(())
}
