//! Parameter binding and recursive type coercion
//!
//! [`coerce`] turns a loosely typed decoded value into the shape declared by
//! a [`ParamType`], and [`bind`] applies it to every declared parameter of a
//! procedure. Every failure is an `InvalidParamsError`.

use indexmap::IndexMap;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value, json};

use crate::decimal::Decimal;
use crate::error::{RpcError, message_data};
use crate::procedure::ProcedureDescriptor;
use crate::schema::{ArrayKind, MapKind, ParamType, RecordSchema, json_kind};

const UNION_UNSUPPORTED: &str = "the only type of union that is supported is: Optional[T]";

fn invalid(message: impl Into<String>) -> RpcError {
    RpcError::invalid_params(Some(message_data(message)))
}

fn mismatch(param: &str, expected: &ParamType, value: &Value) -> RpcError {
    invalid(format!(
        "type of argument \"{param}\" must be {expected}; got {} instead",
        json_kind(value)
    ))
}

/// Coerce `value` of parameter `param` into the declared type
pub fn coerce(param: &str, ty: &ParamType, value: Value) -> Result<Value, RpcError> {
    if value.is_null() {
        if let ParamType::Annotated { metadata, .. } = ty {
            for constraint in metadata.iter().filter(|m| m.checks_null()) {
                if let Err(message) = constraint.check(param, &value) {
                    return Err(constraint_failure(constraint.name(), param, value, message));
                }
            }
        }
        return Ok(Value::Null);
    }

    match ty {
        ParamType::Any => Ok(value),
        ParamType::Annotated { inner, metadata } => {
            let value = coerce(param, inner, value)?;
            for constraint in metadata {
                if let Err(message) = constraint.check(param, &value) {
                    return Err(constraint_failure(constraint.name(), param, value, message));
                }
            }
            Ok(value)
        }
        ParamType::Optional(inner) => coerce(param, inner, value),
        ParamType::Union(arms) => match optional_arm(arms) {
            Some(inner) => coerce(param, inner, value),
            None => Err(invalid(UNION_UNSUPPORTED)),
        },
        ParamType::Map {
            key,
            value: value_ty,
            container,
        } => {
            let Value::Object(entries) = value else {
                return Err(mismatch(param, ty, &value));
            };
            let mut loaded = Map::with_capacity(entries.len());
            for (k, v) in entries {
                let k = coerce_key(param, key, k)?;
                let v = match (container, v) {
                    (MapKind::Default(default), Value::Null) => default.clone(),
                    (_, v) => coerce(param, value_ty, v)?,
                };
                loaded.insert(k, v);
            }
            Ok(Value::Object(loaded))
        }
        ParamType::Array { item, container } => {
            let Value::Array(items) = value else {
                return Err(mismatch(param, ty, &value));
            };
            let mut loaded: Vec<Value> = Vec::with_capacity(items.len());
            for v in items {
                let v = coerce(param, item, v)?;
                if *container == ArrayKind::Set && loaded.contains(&v) {
                    continue;
                }
                loaded.push(v);
            }
            Ok(Value::Array(loaded))
        }
        ParamType::Enum(schema) => {
            if schema.values.contains(&value) {
                Ok(value)
            } else {
                Err(invalid(format!("{value} is not a valid {}", schema.name)))
            }
        }
        ParamType::Record(schema) => coerce_record(param, ty, schema, value),
        ParamType::Decimal => {
            let text = match &value {
                Value::Number(n) => n.to_string(),
                Value::String(s) => s.clone(),
                _ => return Err(mismatch(param, ty, &value)),
            };
            let decimal: Decimal = text.parse().map_err(|e| invalid(format!("{e}")))?;
            Ok(Value::String(decimal.to_string()))
        }
        ParamType::Bytes => match value {
            Value::String(s) => Ok(Value::Array(
                s.into_bytes().into_iter().map(Value::from).collect(),
            )),
            other => Err(mismatch(param, ty, &other)),
        },
        ParamType::String => match value {
            Value::String(_) => Ok(value),
            other => Err(mismatch(param, ty, &other)),
        },
        ParamType::Integer => match &value {
            Value::Number(n) if n.is_i64() || n.is_u64() => Ok(value),
            _ => Err(mismatch(param, ty, &value)),
        },
        ParamType::Number => match value {
            Value::Number(_) => Ok(value),
            other => Err(mismatch(param, ty, &other)),
        },
        ParamType::Boolean => match value {
            Value::Bool(_) => Ok(value),
            other => Err(mismatch(param, ty, &other)),
        },
        ParamType::Null => Err(mismatch(param, ty, &value)),
    }
}

/// The non-null arm of a two-armed union with exactly one null arm
fn optional_arm(arms: &[ParamType]) -> Option<&ParamType> {
    match arms {
        [a, b] => match (a.unannotated(), b.unannotated()) {
            (ParamType::Null, ParamType::Null) => None,
            (_, ParamType::Null) => Some(a),
            (ParamType::Null, _) => Some(b),
            _ => None,
        },
        _ => None,
    }
}

fn constraint_failure(constraint: &str, param: &str, value: Value, message: String) -> RpcError {
    RpcError::invalid_params(Some(json!({
        "constraint": constraint,
        "param": param,
        "value": value,
        "message": message,
    })))
}

// JSON object keys are always strings; numeric key types accept numeric text
fn coerce_key(param: &str, ty: &ParamType, key: String) -> Result<String, RpcError> {
    let candidate = match ty.unannotated() {
        ParamType::Integer | ParamType::Number | ParamType::Decimal => {
            match serde_json::from_str::<Value>(&key) {
                Ok(n @ Value::Number(_)) => n,
                _ => Value::String(key),
            }
        }
        _ => Value::String(key),
    };
    Ok(match coerce(param, ty, candidate)? {
        Value::String(s) => s,
        other => other.to_string(),
    })
}

fn coerce_record(
    param: &str,
    ty: &ParamType,
    schema: &RecordSchema,
    value: Value,
) -> Result<Value, RpcError> {
    let Value::Object(mut entries) = value else {
        return Err(mismatch(param, ty, &value));
    };

    if let Some(unknown) = entries.keys().find(|k| schema.get(k).is_none()) {
        return Err(invalid(format!(
            "{} got an unexpected field '{unknown}'",
            schema.name
        )));
    }

    let mut record = Map::with_capacity(schema.fields.len());
    for field in &schema.fields {
        let raw = match (entries.remove(&field.name), &field.default) {
            (Some(v), _) => v,
            (None, Some(default)) => default.clone(),
            (None, None) => {
                return Err(invalid(format!(
                    "{} missing required field '{}'",
                    schema.name, field.name
                )));
            }
        };
        let path = format!("{param}.{}", field.name);
        record.insert(field.name.clone(), coerce(&path, &field.ty, raw)?);
    }
    Ok(Value::Object(record))
}

/// Bind the supplied `params` member against a procedure's declared parameters
pub fn bind(descriptor: &ProcedureDescriptor, params: Option<Value>) -> Result<BoundArgs, RpcError> {
    let declared = descriptor.params();
    let raw = params.clone();

    let supplied: Vec<Option<Value>> = match params {
        None => vec![None; declared.len()],
        Some(Value::Array(items)) => {
            if items.len() > declared.len() {
                return Err(invalid(format!(
                    "method '{}' takes {} positional parameters but {} were given",
                    descriptor.name(),
                    declared.len(),
                    items.len()
                )));
            }
            let mut items = items.into_iter();
            declared.iter().map(|_| items.next()).collect()
        }
        Some(Value::Object(mut entries)) => {
            if let Some(unknown) = entries
                .keys()
                .find(|k| !declared.iter().any(|p| &p.name == *k))
            {
                return Err(invalid(format!(
                    "method '{}' got an unexpected parameter '{unknown}'",
                    descriptor.name()
                )));
            }
            declared.iter().map(|p| entries.remove(&p.name)).collect()
        }
        Some(other) => {
            return Err(invalid(format!(
                "Parameter structures are by-position (list) or by-name (dict): {other}"
            )));
        }
    };

    let mut values = IndexMap::with_capacity(declared.len());
    for (schema, value) in declared.iter().zip(supplied) {
        let value = value
            .or_else(|| schema.default.clone())
            .unwrap_or(Value::Null);
        let value = if descriptor.validate() {
            coerce(&schema.name, &schema.ty, value)?
        } else {
            value
        };
        values.insert(schema.name.clone(), value);
    }

    Ok(BoundArgs { values, raw })
}

/// Arguments bound to a procedure's declared parameters, in declaration order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BoundArgs {
    values: IndexMap<String, Value>,
    raw: Option<Value>,
}

impl BoundArgs {
    pub fn new(values: IndexMap<String, Value>) -> Self {
        Self { values, raw: None }
    }

    /// Deserialize a bound argument, absent arguments read as null
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Result<T, RpcError> {
        let value = self.values.get(name).cloned().unwrap_or(Value::Null);
        serde_json::from_value(value)
            .map_err(|e| invalid(format!("failed to read parameter '{name}': {e}")))
    }

    /// Like [`BoundArgs::get`], mapping absent and null arguments to `None`
    pub fn get_opt<T: DeserializeOwned>(&self, name: &str) -> Result<Option<T>, RpcError> {
        match self.values.get(name) {
            None | Some(Value::Null) => Ok(None),
            Some(_) => self.get(name).map(Some),
        }
    }

    pub fn value(&self, name: &str) -> Option<&Value> {
        self.values.get(name)
    }

    /// The `params` member exactly as the client sent it
    pub fn raw(&self) -> Option<&Value> {
        self.raw.as_ref()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn to_value(&self) -> Value {
        Value::Object(
            self.values
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    pub fn into_values(self) -> IndexMap<String, Value> {
        self.values
    }
}
