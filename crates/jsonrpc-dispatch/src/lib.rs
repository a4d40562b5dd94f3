//! # JSON-RPC 2.0 Dispatch Engine
//!
//! A transport-agnostic JSON-RPC 2.0 dispatch engine. Procedures are
//! registered with an explicit parameter schema; incoming envelopes are
//! validated, their parameters coerced into the declared types, and the
//! results shaped into response envelopes.
//!
//! ## Features
//! - Single and batch requests, notifications
//! - Typed parameter coercion with constraint metadata
//! - Error handlers resolved along an exception kind chain
//! - `(body, status, headers)` style replies
//! - A built-in `rpc.describe` method
//!
//! ```rust
//! use jsonrpc_dispatch::prelude::*;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let site = JsonRpcSite::new(SiteConfig::default());
//! site.register(
//!     ProcedureBuilder::new("sum")
//!         .param("a", ParamType::Number)
//!         .param("b", ParamType::Number)
//!         .returns(ParamType::Number)
//!         .handler_fn(|args| {
//!             let a: f64 = args.get("a")?;
//!             let b: f64 = args.get("b")?;
//!             Ok(json!(a + b))
//!         }),
//! )
//! .unwrap();
//!
//! let body = br#"{"id": 1, "jsonrpc": "2.0", "method": "sum", "params": [1, 3]}"#;
//! let response = site.dispatch_request(body, "application/json").await;
//! assert_eq!(response.status_code, 200);
//! assert_eq!(response.json().unwrap()["result"], json!(4.0));
//! # }
//! ```

pub mod coerce;
pub mod config;
pub mod decimal;
pub mod describe;
pub mod error;
pub mod exception;
pub mod handlers;
pub mod prelude;
pub mod procedure;
pub mod registry;
pub mod reply;
pub mod request;
pub mod response;
pub mod schema;
pub mod site;

pub use coerce::{BoundArgs, bind, coerce};
pub use config::SiteConfig;
pub use decimal::Decimal;
pub use describe::{MethodDescribe, ServiceDescribe};
pub use error::{ErrorKind, RpcError};
pub use exception::{Exception, Fault, PanicError, ProcedureError, TimeoutError};
pub use handlers::ErrorHandlerRegistry;
pub use procedure::{Procedure, ProcedureBuilder, ProcedureDescriptor};
pub use registry::ProcedureRegistry;
pub use reply::{Headers, Reply};
pub use request::JsonRpcRequest;
pub use response::{DispatchResponse, JsonRpcResponse, ResponseBody};
pub use schema::{Metadata, ParamType, RecordSchema, TypeOf};
pub use site::JsonRpcSite;

/// JSON-RPC 2.0 version constant
pub const JSONRPC_VERSION: &str = "2.0";

/// Standard JSON-RPC 2.0 error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    pub const SERVER_ERROR: i64 = -32000;
}
