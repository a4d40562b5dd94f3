//! HTTP request handler for JSON-RPC bodies

use std::sync::Arc;

use bytes::Bytes;
use http_body::Body;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::header::{ALLOW, CONTENT_TYPE, HeaderName, HeaderValue};
use hyper::{Method, Request, Response, StatusCode};
use jsonrpc_dispatch::JsonRpcSite;
use jsonrpc_dispatch::response::DispatchResponse;
use tracing::{debug, error, warn};

use crate::{CorsLayer, Result, ServerConfig};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// HTTP handler that routes one endpoint into a [`JsonRpcSite`]
#[derive(Clone)]
pub struct JsonRpcHttpHandler {
    pub(crate) config: Arc<ServerConfig>,
    pub(crate) site: Arc<JsonRpcSite>,
}

impl JsonRpcHttpHandler {
    /// Create a new handler
    pub fn new(config: ServerConfig, site: Arc<JsonRpcSite>) -> Self {
        Self {
            config: Arc::new(config),
            site,
        }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn site(&self) -> &Arc<JsonRpcSite> {
        &self.site
    }

    /// Handle an HTTP request, applying CORS headers when enabled
    pub async fn handle<B>(&self, req: Request<B>) -> Result<Response<Full<Bytes>>>
    where
        B: Body + Send,
        B::Data: Send,
        B::Error: Into<BoxError>,
    {
        debug!("Handling {} {}", req.method(), req.uri().path());

        let mut response = if req.uri().path() != self.config.path {
            plain(StatusCode::NOT_FOUND, "Not Found")
        } else {
            match req.method() {
                &Method::POST => self.handle_json_rpc_request(req).await?,
                &Method::OPTIONS => self.handle_preflight(),
                _ => self.method_not_allowed(),
            }
        };

        if self.config.enable_cors {
            CorsLayer::apply_cors_headers(response.headers_mut());
        }
        Ok(response)
    }

    /// Handle JSON-RPC requests over HTTP POST
    async fn handle_json_rpc_request<B>(&self, req: Request<B>) -> Result<Response<Full<Bytes>>>
    where
        B: Body + Send,
        B::Error: Into<BoxError>,
    {
        // Mime validation is part of dispatch, so the raw header is passed on
        let content_type = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|ct| ct.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = Limited::new(req.into_body(), self.config.max_body_size);
        let body_bytes = match body.collect().await {
            Ok(collected) => collected.to_bytes(),
            Err(err) if err.downcast_ref::<LengthLimitError>().is_some() => {
                warn!("Request body larger than {} bytes", self.config.max_body_size);
                return Ok(plain(StatusCode::PAYLOAD_TOO_LARGE, "Request body too large"));
            }
            Err(err) => {
                error!("Failed to read request body: {}", err);
                return Ok(plain(StatusCode::BAD_REQUEST, "Failed to read request body"));
            }
        };

        let dispatched = self.site.dispatch_request(&body_bytes, &content_type).await;
        debug!("Sending JSON-RPC response with status {}", dispatched.status_code);
        to_http_response(dispatched)
    }

    /// Handle OPTIONS preflight requests
    fn handle_preflight(&self) -> Response<Full<Bytes>> {
        let mut response = plain(StatusCode::NO_CONTENT, "");
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static("POST, OPTIONS"));
        response
    }

    /// Return method not allowed response
    fn method_not_allowed(&self) -> Response<Full<Bytes>> {
        let mut response = plain(StatusCode::METHOD_NOT_ALLOWED, "Method not allowed");
        response
            .headers_mut()
            .insert(ALLOW, HeaderValue::from_static("POST, OPTIONS"));
        response
    }
}

/// Write status, headers and JSON body of a dispatch result
fn to_http_response(dispatched: DispatchResponse) -> Result<Response<Full<Bytes>>> {
    let body = match dispatched.json() {
        Some(value) => Bytes::from(serde_json::to_vec(&value)?),
        None => Bytes::new(),
    };
    let has_body = !body.is_empty();

    let mut response = Response::new(Full::new(body));
    *response.status_mut() =
        StatusCode::from_u16(dispatched.status_code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

    let headers = response.headers_mut();
    for (name, value) in dispatched.headers.iter() {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => {
                headers.append(name, value);
            }
            _ => warn!("Dropping invalid response header {}: {}", name, value),
        }
    }
    if has_body && !headers.contains_key(CONTENT_TYPE) {
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    }
    Ok(response)
}

fn plain(status: StatusCode, text: &'static str) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from_static(text.as_bytes())));
    *response.status_mut() = status;
    response
}
