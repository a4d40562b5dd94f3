use serde::ser::{Serialize, SerializeMap, Serializer};
use serde_json::{Map, Value};

use crate::reply::Headers;

/// Either the `result` or the `error` member of a response
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseOutcome {
    Result(Value),
    Error(Value),
}

/// A response envelope: `{id, jsonrpc, result}` or `{id, jsonrpc, error}`
#[derive(Debug, Clone, PartialEq)]
pub struct JsonRpcResponse {
    pub id: Value,
    pub jsonrpc: Value,
    pub outcome: ResponseOutcome,
}

impl JsonRpcResponse {
    pub fn success(id: Value, jsonrpc: Value, result: Value) -> Self {
        Self {
            id,
            jsonrpc,
            outcome: ResponseOutcome::Result(result),
        }
    }

    pub fn error(id: Value, jsonrpc: Value, error: Value) -> Self {
        Self {
            id,
            jsonrpc,
            outcome: ResponseOutcome::Error(error),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self.outcome, ResponseOutcome::Error(_))
    }

    pub fn result(&self) -> Option<&Value> {
        match &self.outcome {
            ResponseOutcome::Result(value) => Some(value),
            ResponseOutcome::Error(_) => None,
        }
    }

    pub fn error_object(&self) -> Option<&Value> {
        match &self.outcome {
            ResponseOutcome::Error(value) => Some(value),
            ResponseOutcome::Result(_) => None,
        }
    }

    pub fn to_value(&self) -> Value {
        let mut object = Map::with_capacity(3);
        object.insert("id".to_string(), self.id.clone());
        object.insert("jsonrpc".to_string(), self.jsonrpc.clone());
        match &self.outcome {
            ResponseOutcome::Result(value) => object.insert("result".to_string(), value.clone()),
            ResponseOutcome::Error(value) => object.insert("error".to_string(), value.clone()),
        };
        Value::Object(object)
    }
}

impl Serialize for JsonRpcResponse {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(3))?;
        map.serialize_entry("id", &self.id)?;
        map.serialize_entry("jsonrpc", &self.jsonrpc)?;
        match &self.outcome {
            ResponseOutcome::Result(value) => map.serialize_entry("result", value)?,
            ResponseOutcome::Error(value) => map.serialize_entry("error", value)?,
        }
        map.end()
    }
}

/// Body of a dispatch result
#[derive(Debug, Clone, PartialEq)]
pub enum ResponseBody {
    /// No body, sent with status 204
    Empty,
    Single(JsonRpcResponse),
    Batch(Vec<JsonRpcResponse>),
}

impl ResponseBody {
    pub fn is_empty(&self) -> bool {
        matches!(self, ResponseBody::Empty)
    }

    pub fn to_value(&self) -> Option<Value> {
        match self {
            ResponseBody::Empty => None,
            ResponseBody::Single(response) => Some(response.to_value()),
            ResponseBody::Batch(responses) => Some(Value::Array(
                responses.iter().map(JsonRpcResponse::to_value).collect(),
            )),
        }
    }
}

impl Serialize for ResponseBody {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            ResponseBody::Empty => serializer.serialize_unit(),
            ResponseBody::Single(response) => response.serialize(serializer),
            ResponseBody::Batch(responses) => serializer.collect_seq(responses),
        }
    }
}

/// What the dispatch engine hands back to the transport
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchResponse {
    pub body: ResponseBody,
    pub status_code: u16,
    pub headers: Headers,
}

impl DispatchResponse {
    pub fn json(&self) -> Option<Value> {
        self.body.to_value()
    }
}
