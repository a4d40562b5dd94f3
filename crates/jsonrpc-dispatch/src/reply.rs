use serde_json::Value;

use crate::error::RpcError;

const INVALID_TUPLE: &str = "the view function did not return a valid response tuple. \
     The tuple must have the form (body, status, headers), (body, status), or (body, headers).";

/// Ordered response headers, duplicates allowed
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Headers(Vec<(String, String)>);

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.0.push((name.into(), value.into()));
    }

    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.append(name, value);
        self
    }

    /// Append every pair of `other`, keeping existing entries
    pub fn extend(&mut self, other: Headers) {
        self.0.extend(other.0);
    }

    /// First value for `name`, compared case-insensitively
    pub fn get(&self, name: &str) -> Option<&str> {
        self.0
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn get_all<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.0
            .iter()
            .filter(move |(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Read headers out of a JSON object or an array of `[name, value]` pairs
    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(
                map.iter()
                    .map(|(k, v)| (k.clone(), header_text(v)))
                    .collect(),
            ),
            Value::Array(items) => items
                .iter()
                .map(|pair| match pair.as_array().map(Vec::as_slice) {
                    Some([Value::String(k), v]) => Some((k.clone(), header_text(v))),
                    _ => None,
                })
                .collect(),
            _ => None,
        }
    }
}

fn header_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Headers {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl IntoIterator for Headers {
    type Item = (String, String);
    type IntoIter = std::vec::IntoIter<(String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// One element of a tuple reply
#[derive(Debug, Clone, PartialEq)]
pub enum ReplyElement {
    Value(Value),
    Status(u16),
    Headers(Headers),
}

impl ReplyElement {
    fn as_headers(&self) -> Option<Headers> {
        match self {
            ReplyElement::Headers(headers) => Some(headers.clone()),
            ReplyElement::Value(value @ (Value::Object(_) | Value::Array(_))) => {
                Headers::from_json(value)
            }
            _ => None,
        }
    }

    fn as_status(&self) -> Option<u16> {
        match self {
            ReplyElement::Status(status) => Some(*status),
            ReplyElement::Value(Value::Number(n)) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
            _ => None,
        }
    }

    fn into_body(self) -> Value {
        match self {
            ReplyElement::Value(value) => value,
            ReplyElement::Status(status) => Value::from(status),
            ReplyElement::Headers(headers) => Value::Array(
                headers
                    .into_iter()
                    .map(|(k, v)| Value::Array(vec![Value::String(k), Value::String(v)]))
                    .collect(),
            ),
        }
    }
}

/// What a procedure or error handler produced
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    Value(Value),
    /// `(body)`, `(body, status | headers)` or `(body, status, headers)`
    Tuple(Vec<ReplyElement>),
}

/// A reply resolved into body, status and headers
#[derive(Debug, Clone, PartialEq)]
pub struct Shaped {
    pub body: Value,
    pub status_code: u16,
    pub headers: Headers,
}

impl Reply {
    pub fn null() -> Self {
        Reply::Value(Value::Null)
    }

    pub fn with_status(body: impl Into<Value>, status: u16) -> Self {
        Reply::Tuple(vec![
            ReplyElement::Value(body.into()),
            ReplyElement::Status(status),
        ])
    }

    pub fn with_headers(body: impl Into<Value>, headers: Headers) -> Self {
        Reply::Tuple(vec![
            ReplyElement::Value(body.into()),
            ReplyElement::Headers(headers),
        ])
    }

    pub fn full(body: impl Into<Value>, status: u16, headers: Headers) -> Self {
        Reply::Tuple(vec![
            ReplyElement::Value(body.into()),
            ReplyElement::Status(status),
            ReplyElement::Headers(headers),
        ])
    }

    /// The body as it would be unpacked, without status or headers
    pub fn body(&self) -> Option<&Value> {
        match self {
            Reply::Value(value) => Some(value),
            Reply::Tuple(elements) => match elements.first() {
                Some(ReplyElement::Value(value)) => Some(value),
                _ => None,
            },
        }
    }

    /// Resolve into body, status and headers.
    ///
    /// A two element tuple carries headers when its second element looks
    /// like headers, otherwise a status. Any arity other than one to three is
    /// a `ServerError`.
    pub fn unpack(self, default_status: u16) -> Result<Shaped, RpcError> {
        let elements = match self {
            Reply::Value(body) => {
                return Ok(Shaped {
                    body,
                    status_code: default_status,
                    headers: Headers::new(),
                });
            }
            Reply::Tuple(elements) => elements,
        };

        let invalid = || RpcError::server_error(None).with_data_message(INVALID_TUPLE);

        let mut elements = elements.into_iter();
        match (elements.next(), elements.next(), elements.next(), elements.next()) {
            (Some(body), None, None, None) => Ok(Shaped {
                body: body.into_body(),
                status_code: default_status,
                headers: Headers::new(),
            }),
            (Some(body), Some(second), None, None) => {
                if let Some(headers) = second.as_headers() {
                    Ok(Shaped {
                        body: body.into_body(),
                        status_code: default_status,
                        headers,
                    })
                } else {
                    let status_code = second.as_status().ok_or_else(invalid)?;
                    Ok(Shaped {
                        body: body.into_body(),
                        status_code,
                        headers: Headers::new(),
                    })
                }
            }
            (Some(body), Some(status), Some(headers), None) => {
                let status_code = status.as_status().ok_or_else(invalid)?;
                let headers = headers.as_headers().ok_or_else(invalid)?;
                Ok(Shaped {
                    body: body.into_body(),
                    status_code,
                    headers,
                })
            }
            _ => Err(invalid()),
        }
    }
}

impl From<Value> for Reply {
    fn from(value: Value) -> Self {
        Reply::Value(value)
    }
}

impl From<()> for Reply {
    fn from(_: ()) -> Self {
        Reply::null()
    }
}

impl From<(Value, u16)> for Reply {
    fn from((body, status): (Value, u16)) -> Self {
        Reply::with_status(body, status)
    }
}

impl From<(Value, Headers)> for Reply {
    fn from((body, headers): (Value, Headers)) -> Self {
        Reply::with_headers(body, headers)
    }
}

impl From<(Value, u16, Headers)> for Reply {
    fn from((body, status, headers): (Value, u16, Headers)) -> Self {
        Reply::full(body, status, headers)
    }
}
