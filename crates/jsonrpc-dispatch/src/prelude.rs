//! # JSON-RPC Dispatch Prelude
//!
//! Re-exports of the types needed to declare procedures and run a site.
//!
//! ```rust
//! use jsonrpc_dispatch::prelude::*;
//! ```

pub use crate::coerce::BoundArgs;
pub use crate::config::SiteConfig;
pub use crate::decimal::Decimal;
pub use crate::error::{ErrorKind, RpcError};
pub use crate::exception::{Exception, Fault, ProcedureError};
pub use crate::procedure::{Procedure, ProcedureBuilder};
pub use crate::reply::{Headers, Reply};
pub use crate::response::DispatchResponse;
pub use crate::schema::{Metadata, ParamType, RecordSchema, TypeOf};
pub use crate::site::JsonRpcSite;

pub use serde_json::json;
