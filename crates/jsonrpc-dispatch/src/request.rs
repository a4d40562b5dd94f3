use serde::Serialize;
use serde_json::{Map, Value};

use crate::JSONRPC_VERSION;

/// A decoded request envelope.
///
/// `id` keeps the difference between an absent member (a notification) and
/// an explicit `null`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct JsonRpcRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jsonrpc: Option<Value>,
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    pub fn new(id: impl Into<Value>, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: Some(id.into()),
            jsonrpc: Some(Value::from(JSONRPC_VERSION)),
            method: method.into(),
            params,
        }
    }

    /// A request without an `id` member
    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            id: None,
            jsonrpc: Some(Value::from(JSONRPC_VERSION)),
            method: method.into(),
            params,
        }
    }

    /// Read an envelope out of a decoded value; anything that is not an
    /// object with a `method` member is handed back unchanged.
    pub fn from_value(value: Value) -> Result<Self, Value> {
        let mut object = match value {
            Value::Object(object) if object.contains_key("method") => object,
            other => return Err(other),
        };
        // A non-string method can never match a registration
        let method = match object.remove("method") {
            Some(Value::String(name)) => name,
            Some(other) => other.to_string(),
            None => String::new(),
        };
        Ok(Self {
            id: object.remove("id"),
            jsonrpc: object.remove("jsonrpc"),
            method,
            params: object.remove("params"),
        })
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// The `id` to echo back, `null` for notifications
    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }

    /// The `jsonrpc` member to echo back, defaulting to `"2.0"`
    pub fn response_version(&self) -> Value {
        self.jsonrpc
            .clone()
            .unwrap_or_else(|| Value::from(JSONRPC_VERSION))
    }

    pub fn to_value(&self) -> Value {
        let mut object = Map::new();
        if let Some(id) = &self.id {
            object.insert("id".to_string(), id.clone());
        }
        object.insert("jsonrpc".to_string(), self.response_version());
        object.insert("method".to_string(), Value::String(self.method.clone()));
        if let Some(params) = &self.params {
            object.insert("params".to_string(), params.clone());
        }
        Value::Object(object)
    }
}

/// The `id` and `jsonrpc` members to echo for any decoded value
pub(crate) fn correlation(value: &Value) -> (Value, Value) {
    let object = value.as_object();
    let id = object
        .and_then(|o| o.get("id"))
        .cloned()
        .unwrap_or(Value::Null);
    let version = object
        .and_then(|o| o.get("jsonrpc"))
        .cloned()
        .unwrap_or_else(|| Value::from(JSONRPC_VERSION));
    (id, version)
}
