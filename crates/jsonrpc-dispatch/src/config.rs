use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Configuration for a [`JsonRpcSite`](crate::JsonRpcSite)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SiteConfig {
    /// Service name reported by the describe method
    pub name: String,
    /// Service version reported by the describe method
    pub version: String,
    /// Path the service is mounted on
    pub path: String,
    /// Public base URL, used for the describe `servers` entry
    pub base_url: Option<String>,
    /// Validation for procedures that don't set it
    pub default_validate: bool,
    /// Notification permission for procedures that don't set it
    pub default_notification: bool,
    /// Attach `stack` and `executable` to error objects
    pub debug: bool,
    pub describe_method: String,
    /// List the describe method in its own output
    pub describe_include_self: bool,
    /// Run batch elements concurrently (output order is unchanged)
    pub concurrent_batches: bool,
    /// Per-invocation timeout in milliseconds
    pub procedure_timeout_ms: Option<u64>,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "jsonrpc-dispatch".to_string(),
            version: crate::JSONRPC_VERSION.to_string(),
            path: "/api".to_string(),
            base_url: None,
            default_validate: true,
            default_notification: true,
            debug: false,
            describe_method: "rpc.describe".to_string(),
            describe_include_self: false,
            concurrent_batches: false,
            procedure_timeout_ms: None,
        }
    }
}

impl SiteConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn path(mut self, path: impl Into<String>) -> Self {
        self.path = path.into();
        self
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = Some(base_url.into());
        self
    }

    pub fn default_validate(mut self, validate: bool) -> Self {
        self.default_validate = validate;
        self
    }

    pub fn default_notification(mut self, allow: bool) -> Self {
        self.default_notification = allow;
        self
    }

    pub fn debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    pub fn describe_method(mut self, name: impl Into<String>) -> Self {
        self.describe_method = name.into();
        self
    }

    pub fn describe_include_self(mut self, include: bool) -> Self {
        self.describe_include_self = include;
        self
    }

    pub fn concurrent_batches(mut self, enable: bool) -> Self {
        self.concurrent_batches = enable;
        self
    }

    pub fn procedure_timeout(mut self, timeout: Duration) -> Self {
        self.procedure_timeout_ms = Some(timeout.as_millis() as u64);
        self
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.procedure_timeout_ms.map(Duration::from_millis)
    }

    /// URL advertised in the describe `servers` list
    pub fn server_url(&self) -> String {
        let path = self.path.trim_start_matches('/');
        match &self.base_url {
            Some(base) => format!("{}/{}", base.trim_end_matches('/'), path),
            None => format!("/{path}"),
        }
    }
}
