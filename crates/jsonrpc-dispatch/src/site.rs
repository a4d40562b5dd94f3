//! The dispatch engine.
//!
//! [`JsonRpcSite::dispatch_request`] runs one HTTP body through the whole
//! protocol pipeline: mime check, decode, batch detection, envelope
//! validation, lookup, binding, invocation and response shaping. Every
//! failure inside a single envelope is turned into an error response for
//! that envelope only.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::join_all;
use serde_json::Value;
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::coerce::bind;
use crate::config::SiteConfig;
use crate::describe::{DescribeProcedure, ServiceDescribe};
use crate::error::RpcError;
use crate::exception::{Exception, Fault, PanicError, ProcedureError, TimeoutError};
use crate::handlers::ErrorHandlerRegistry;
use crate::procedure::{ProcedureBuilder, ProcedureDescriptor};
use crate::registry::ProcedureRegistry;
use crate::reply::{Headers, Reply, Shaped};
use crate::request::{JsonRpcRequest, correlation};
use crate::response::{DispatchResponse, JsonRpcResponse, ResponseBody};
use crate::schema::{ParamType, json_kind};

const DEFAULT_STATUS: u16 = 200;
const FAULT_STATUS: u16 = 500;
const NO_CONTENT: u16 = 204;

/// Outcome of one envelope: body (absent for notifications), status, headers
struct Dispatched {
    body: Option<JsonRpcResponse>,
    status_code: u16,
    headers: Headers,
}

/// A JSON-RPC service: procedures, error handlers and the dispatch pipeline
pub struct JsonRpcSite {
    config: Arc<SiteConfig>,
    registry: Arc<ProcedureRegistry>,
    handlers: ErrorHandlerRegistry,
    uuid: Uuid,
}

impl Default for JsonRpcSite {
    fn default() -> Self {
        Self::new(SiteConfig::default())
    }
}

impl JsonRpcSite {
    /// Create a site with the describe method already registered
    pub fn new(config: SiteConfig) -> Self {
        let config = Arc::new(config);
        let registry = Arc::new(ProcedureRegistry::new());
        let uuid = Uuid::new_v4();

        let describe = ProcedureBuilder::new(config.describe_method.clone())
            .returns(ParamType::map(ParamType::String, ParamType::Any))
            .summary("Describe the service and its procedures")
            .procedure(DescribeProcedure {
                id: uuid.to_string(),
                config: Arc::clone(&config),
                registry: Arc::downgrade(&registry),
            })
            .build_with_defaults(false, false);
        match describe {
            Ok(descriptor) => {
                registry.register(descriptor);
            }
            Err(e) => error!(error = %e, "failed to register the describe method"),
        }

        Self {
            config,
            registry,
            handlers: ErrorHandlerRegistry::new(),
            uuid,
        }
    }

    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ProcedureRegistry> {
        &self.registry
    }

    pub fn handlers(&self) -> &ErrorHandlerRegistry {
        &self.handlers
    }

    pub fn uuid(&self) -> Uuid {
        self.uuid
    }

    /// Build and register a procedure, filling unset options from the config
    pub fn register(&self, builder: ProcedureBuilder) -> Result<(), String> {
        let descriptor = builder.build_with_defaults(
            self.config.default_validate,
            self.config.default_notification,
        )?;
        self.registry.register(descriptor);
        Ok(())
    }

    pub fn register_descriptor(
        &self,
        descriptor: ProcedureDescriptor,
    ) -> Option<Arc<ProcedureDescriptor>> {
        self.registry.register(descriptor)
    }

    /// Register a recovery handler for faults of kind `E` and its descendants
    pub fn register_error_handler<E, F>(&self, handler: F)
    where
        E: Exception,
        F: Fn(&Fault) -> Reply + Send + Sync + 'static,
    {
        self.handlers.register::<E, F>(handler);
    }

    pub fn register_error_handler_kind<F>(&self, kind: impl Into<String>, handler: F)
    where
        F: Fn(&Fault) -> Reply + Send + Sync + 'static,
    {
        self.handlers.register_kind(kind, handler);
    }

    pub fn describe(&self) -> ServiceDescribe {
        ServiceDescribe::build(&self.uuid.to_string(), &self.config, &self.registry)
    }

    /// Run a raw HTTP body through the pipeline
    pub async fn dispatch_request(&self, body: &[u8], content_type: &str) -> DispatchResponse {
        let mime = mime_essence(content_type);
        if !is_json_mime(&mime) {
            warn!(content_type, "invalid mimetype");
            let error = RpcError::parse_error(None).with_data_message(format!(
                "Invalid mime type for JSON: {mime}, use header Content-Type: application/json"
            ));
            return self.top_level_error(error);
        }

        let decoded: Value = match serde_json::from_slice(body) {
            Ok(value) => value,
            Err(e) => {
                let text = String::from_utf8_lossy(body);
                error!(error = %e, body = %text, "invalid json");
                let error =
                    RpcError::parse_error(None).with_data_message(format!("Invalid JSON: {text:?}"));
                return self.top_level_error(error);
            }
        };

        match decoded {
            Value::Array(items) => self.dispatch_batch(items).await,
            single => {
                let dispatched = self.dispatch_one(single).await;
                DispatchResponse {
                    body: dispatched
                        .body
                        .map_or(ResponseBody::Empty, ResponseBody::Single),
                    status_code: dispatched.status_code,
                    headers: dispatched.headers,
                }
            }
        }
    }

    async fn dispatch_batch(&self, items: Vec<Value>) -> DispatchResponse {
        if items.is_empty() {
            return self.top_level_error(RpcError::invalid_request(None).with_data_message("Empty array"));
        }

        let results = if self.config.concurrent_batches {
            join_all(items.into_iter().map(|item| self.dispatch_one(item))).await
        } else {
            let mut results = Vec::with_capacity(items.len());
            for item in items {
                results.push(self.dispatch_one(item).await);
            }
            results
        };

        let mut headers = Headers::new();
        let mut responses = Vec::with_capacity(results.len());
        for dispatched in results {
            headers.extend(dispatched.headers);
            if let Some(body) = dispatched.body {
                responses.push(body);
            }
        }

        if responses.is_empty() {
            DispatchResponse {
                body: ResponseBody::Empty,
                status_code: NO_CONTENT,
                headers,
            }
        } else {
            DispatchResponse {
                body: ResponseBody::Batch(responses),
                status_code: DEFAULT_STATUS,
                headers,
            }
        }
    }

    /// Dispatch one envelope, turning every failure into an error response
    async fn dispatch_one(&self, value: Value) -> Dispatched {
        let (id, version) = correlation(&value);

        let mut request = match JsonRpcRequest::from_value(value) {
            Ok(request) => request,
            Err(value) => {
                let error = RpcError::invalid_request(None)
                    .with_data_message(format!("Invalid JSON: {value}"));
                return self.rpc_error_response(id, version, error);
            }
        };

        let descriptor = match self.registry.lookup(&request.method) {
            Some(descriptor) => descriptor,
            None => {
                let error = RpcError::method_not_found(None)
                    .with_data_message(format!("Method not found: {}", request.method));
                return self.rpc_error_response(id, version, error);
            }
        };

        if request.is_notification() && !descriptor.allow_notification() {
            let error = RpcError::invalid_request(None).with_data_message(format!(
                "The method '{}' doesn't allow Notification Request object (without an 'id' member)",
                request.method
            ));
            return self.rpc_error_response(id, version, error);
        }

        debug!(method = %request.method, notification = request.is_notification(), "dispatching");

        let outcome = match self.call(&descriptor, request.params.take()).await {
            Ok(shaped) => Ok(shaped),
            Err(ProcedureError::Rpc(error)) => Err(self.rpc_error_response(id, version, error)),
            Err(ProcedureError::Fault(fault)) => Err(self.fault_response(id, version, fault)),
        };

        match outcome {
            Ok(shaped) if request.is_notification() => Dispatched {
                body: None,
                status_code: NO_CONTENT,
                headers: shaped.headers,
            },
            Ok(shaped) => Dispatched {
                body: Some(JsonRpcResponse::success(
                    request.response_id(),
                    request.response_version(),
                    shaped.body,
                )),
                status_code: shaped.status_code,
                headers: shaped.headers,
            },
            Err(failed) if request.is_notification() => Dispatched {
                body: None,
                status_code: NO_CONTENT,
                headers: failed.headers,
            },
            Err(failed) => failed,
        }
    }

    /// Bind, invoke, check the return value and shape the reply
    async fn call(
        &self,
        descriptor: &ProcedureDescriptor,
        params: Option<Value>,
    ) -> Result<Shaped, ProcedureError> {
        let args = bind(descriptor, params)?;

        let invocation = AssertUnwindSafe(descriptor.invoke(args)).catch_unwind();
        let caught = match self.config.timeout() {
            Some(timeout) => match tokio::time::timeout(timeout, invocation).await {
                Ok(caught) => caught,
                Err(_) => {
                    return Err(TimeoutError {
                        method: descriptor.name().to_string(),
                        timeout,
                    }
                    .into());
                }
            },
            None => invocation.await,
        };
        let reply = match caught {
            Ok(result) => result?,
            Err(payload) => {
                return Err(PanicError {
                    method: descriptor.name().to_string(),
                    message: panic_message(payload.as_ref()),
                }
                .into());
            }
        };

        if descriptor.validate() && descriptor.returns().is_none() {
            let returned = match &reply {
                Reply::Value(Value::Null) => None,
                Reply::Value(value) => Some(json_kind(value)),
                Reply::Tuple(_) => Some("tuple"),
            };
            if let Some(kind) = returned {
                return Err(RpcError::invalid_params(None)
                    .with_data_message(format!(
                        "return type of {kind} must be a type; got null instead"
                    ))
                    .into());
            }
        }

        Ok(reply.unpack(DEFAULT_STATUS)?)
    }

    fn rpc_error_response(&self, id: Value, version: Value, error: RpcError) -> Dispatched {
        error!(
            code = error.code(),
            name = %error.name(),
            data = %error.data(),
            "jsonrpc error"
        );
        let stack = self.config.debug.then(|| Backtrace::force_capture().to_string());
        Dispatched {
            status_code: error.status_code(),
            body: Some(JsonRpcResponse::error(
                id,
                version,
                self.error_object(&error, stack),
            )),
            headers: Headers::new(),
        }
    }

    /// Resolve an error handler for the fault or fall back to a plain `ServerError`
    fn fault_response(&self, id: Value, version: Value, fault: Fault) -> Dispatched {
        error!(kind = fault.kind(), error = %fault, "unexpected error");
        let stack = self.config.debug.then(|| render_backtrace(fault.backtrace()));
        let message = fault.message();

        let handled = match panic::catch_unwind(AssertUnwindSafe(|| self.handlers.handle(fault))) {
            Ok(handled) => handled,
            Err(payload) => {
                error!(panic = %panic_message(payload.as_ref()), "error handler panicked");
                None
            }
        };

        let (error, headers) = match handled {
            Some(reply) => match reply.unpack(FAULT_STATUS) {
                Ok(shaped) => (
                    RpcError::server_error(Some(shaped.body)).with_status_code(shaped.status_code),
                    shaped.headers,
                ),
                Err(error) => (error, Headers::new()),
            },
            None => (
                RpcError::server_error(None).with_data_message(message),
                Headers::new(),
            ),
        };

        Dispatched {
            status_code: error.status_code(),
            body: Some(JsonRpcResponse::error(
                id,
                version,
                self.error_object(&error, stack),
            )),
            headers,
        }
    }

    fn error_object(&self, error: &RpcError, stack: Option<String>) -> Value {
        let mut object = error.to_error_object();
        if let (Some(stack), Value::Object(map)) = (stack, &mut object) {
            map.insert("stack".to_string(), Value::String(stack));
            let executable = std::env::current_exe()
                .map(|path| path.display().to_string())
                .unwrap_or_default();
            map.insert("executable".to_string(), Value::String(executable));
        }
        object
    }

    /// Errors raised before any envelope is read carry a null id
    fn top_level_error(&self, error: RpcError) -> DispatchResponse {
        let (id, version) = correlation(&Value::Null);
        let dispatched = self.rpc_error_response(id, version, error);
        DispatchResponse {
            body: dispatched
                .body
                .map_or(ResponseBody::Empty, ResponseBody::Single),
            status_code: dispatched.status_code,
            headers: dispatched.headers,
        }
    }
}

/// The media type without parameters, lowercased
fn mime_essence(content_type: &str) -> String {
    content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

fn is_json_mime(mime: &str) -> bool {
    matches!(
        mime,
        "application/json" | "application/json-rpc" | "application/jsonrequest"
    ) || (mime.starts_with("application/") && mime.ends_with("+json"))
}

fn render_backtrace(backtrace: &Backtrace) -> String {
    match backtrace.status() {
        BacktraceStatus::Captured => backtrace.to_string(),
        _ => Backtrace::force_capture().to_string(),
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "procedure panicked".to_string()
    }
}
