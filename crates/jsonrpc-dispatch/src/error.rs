use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Value, json};
use std::borrow::Cow;
use std::fmt;
use thiserror::Error;

/// The protocol error kinds reserved by JSON-RPC 2.0
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    ParseError,
    InvalidRequest,
    MethodNotFound,
    InvalidParams,
    InternalError,
    ServerError,
}

impl ErrorKind {
    pub fn code(&self) -> i64 {
        match self {
            ErrorKind::ParseError => -32700,
            ErrorKind::InvalidRequest => -32600,
            ErrorKind::MethodNotFound => -32601,
            ErrorKind::InvalidParams => -32602,
            ErrorKind::InternalError => -32603,
            ErrorKind::ServerError => -32000,
        }
    }

    /// Name written to the `error.name` member
    pub fn name(&self) -> &'static str {
        match self {
            ErrorKind::ParseError => "ParseError",
            ErrorKind::InvalidRequest => "InvalidRequestError",
            ErrorKind::MethodNotFound => "MethodNotFoundError",
            ErrorKind::InvalidParams => "InvalidParamsError",
            ErrorKind::InternalError => "InternalError",
            ErrorKind::ServerError => "ServerError",
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ErrorKind::ParseError => "Parse error",
            ErrorKind::InvalidRequest => "Invalid Request",
            ErrorKind::MethodNotFound => "Method not found",
            ErrorKind::InvalidParams => "Invalid params",
            ErrorKind::InternalError => "Internal error",
            ErrorKind::ServerError => "Server error",
        }
    }

    /// Default HTTP status for responses carrying this kind
    pub fn status_code(&self) -> u16 {
        match self {
            ErrorKind::ServerError => 500,
            _ => 400,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            -32700 => Some(ErrorKind::ParseError),
            -32600 => Some(ErrorKind::InvalidRequest),
            -32601 => Some(ErrorKind::MethodNotFound),
            -32602 => Some(ErrorKind::InvalidParams),
            -32603 => Some(ErrorKind::InternalError),
            -32000 => Some(ErrorKind::ServerError),
            _ => None,
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code(), self.message())
    }
}

/// A protocol-level error, serialized as the `error` member of a response.
///
/// Every field can be overridden, so application specific errors (for example
/// codes in the `-32000..=-32099` server range) are plain `RpcError` values
/// built with [`RpcError::custom`]; they serialize to the same
/// `{name, code, message, data}` shape as the predefined kinds.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{name} ({code}): {message}")]
pub struct RpcError {
    name: Cow<'static, str>,
    code: i64,
    message: String,
    data: Value,
    status_code: u16,
}

impl RpcError {
    pub fn new(kind: ErrorKind, data: Option<Value>) -> Self {
        Self {
            name: Cow::Borrowed(kind.name()),
            code: kind.code(),
            message: kind.message().to_string(),
            data: data.unwrap_or(Value::Null),
            status_code: kind.status_code(),
        }
    }

    /// An application defined error kind
    pub fn custom(name: impl Into<Cow<'static, str>>, code: i64, message: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            code,
            message: message.into(),
            data: Value::Null,
            status_code: 400,
        }
    }

    pub fn parse_error(data: Option<Value>) -> Self {
        Self::new(ErrorKind::ParseError, data)
    }

    pub fn invalid_request(data: Option<Value>) -> Self {
        Self::new(ErrorKind::InvalidRequest, data)
    }

    pub fn method_not_found(data: Option<Value>) -> Self {
        Self::new(ErrorKind::MethodNotFound, data)
    }

    pub fn invalid_params(data: Option<Value>) -> Self {
        Self::new(ErrorKind::InvalidParams, data)
    }

    pub fn internal_error(data: Option<Value>) -> Self {
        Self::new(ErrorKind::InternalError, data)
    }

    pub fn server_error(data: Option<Value>) -> Self {
        Self::new(ErrorKind::ServerError, data)
    }

    /// Shorthand for the common `{"message": ...}` data payload
    pub fn with_data_message(self, message: impl Into<String>) -> Self {
        self.with_data(message_data(message))
    }

    pub fn with_name(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_code(mut self, code: i64) -> Self {
        self.code = code;
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_data(mut self, data: Value) -> Self {
        self.data = data;
        self
    }

    pub fn with_status_code(mut self, status_code: u16) -> Self {
        self.status_code = status_code;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn code(&self) -> i64 {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn data(&self) -> &Value {
        &self.data
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    /// The predefined kind this error's code belongs to, if any
    pub fn kind(&self) -> Option<ErrorKind> {
        ErrorKind::from_code(self.code)
    }

    /// The `error` member of a response envelope
    pub fn to_error_object(&self) -> Value {
        json!({
            "name": self.name,
            "code": self.code,
            "message": self.message,
            "data": self.data,
        })
    }
}

impl Serialize for RpcError {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(4))?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("code", &self.code)?;
        map.serialize_entry("message", &self.message)?;
        map.serialize_entry("data", &self.data)?;
        map.end()
    }
}

impl From<ErrorKind> for RpcError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind, None)
    }
}

pub(crate) fn message_data(message: impl Into<String>) -> Value {
    json!({ "message": message.into() })
}
