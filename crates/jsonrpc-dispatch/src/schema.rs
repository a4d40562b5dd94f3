//! Declared parameter and return types
//!
//! Procedures declare their signature with [`ParamType`] values built at
//! registration time. The coercion engine walks these descriptors
//! recursively, and the describe method renders them.

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

use indexmap::IndexMap;
use regex::Regex;
use serde_json::Value;

use crate::decimal::Decimal;

/// Trait for mapping Rust types to their declared parameter type
pub trait TypeOf {
    fn param_type() -> ParamType;
}

/// Container flavor of an array parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrayKind {
    List,
    /// Duplicates are dropped, first occurrence wins
    Set,
    Tuple,
}

/// Container flavor of a mapping parameter
#[derive(Debug, Clone, PartialEq)]
pub enum MapKind {
    Dict,
    Ordered,
    /// Mapping whose missing entries read as the given value
    Default(Value),
}

#[derive(Debug, Clone, PartialEq)]
pub struct EnumSchema {
    pub name: String,
    pub values: Vec<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct FieldSchema {
    pub name: String,
    pub ty: ParamType,
    pub default: Option<Value>,
}

/// A structured record with named typed fields
#[derive(Debug, Clone, PartialEq)]
pub struct RecordSchema {
    pub name: String,
    pub fields: Vec<FieldSchema>,
}

impl RecordSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    pub fn field(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.fields.push(FieldSchema {
            name: name.into(),
            ty,
            default: None,
        });
        self
    }

    pub fn field_with_default(
        mut self,
        name: impl Into<String>,
        ty: ParamType,
        default: Value,
    ) -> Self {
        self.fields.push(FieldSchema {
            name: name.into(),
            ty,
            default: Some(default),
        });
        self
    }

    pub fn get(&self, name: &str) -> Option<&FieldSchema> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A declared semantic type
#[derive(Debug, Clone, PartialEq)]
pub enum ParamType {
    /// Accepts anything unchanged
    Any,
    String,
    Integer,
    Number,
    Boolean,
    Null,
    /// UTF-8 bytes of a string value
    Bytes,
    Decimal,
    Optional(Box<ParamType>),
    Union(Vec<ParamType>),
    Array {
        item: Box<ParamType>,
        container: ArrayKind,
    },
    Map {
        key: Box<ParamType>,
        value: Box<ParamType>,
        container: MapKind,
    },
    Enum(EnumSchema),
    Record(RecordSchema),
    Annotated {
        inner: Box<ParamType>,
        metadata: Vec<Metadata>,
    },
}

impl ParamType {
    pub fn optional(inner: ParamType) -> Self {
        Self::Optional(Box::new(inner))
    }

    pub fn union(arms: impl IntoIterator<Item = ParamType>) -> Self {
        Self::Union(arms.into_iter().collect())
    }

    pub fn list(item: ParamType) -> Self {
        Self::Array {
            item: Box::new(item),
            container: ArrayKind::List,
        }
    }

    pub fn set(item: ParamType) -> Self {
        Self::Array {
            item: Box::new(item),
            container: ArrayKind::Set,
        }
    }

    pub fn tuple(item: ParamType) -> Self {
        Self::Array {
            item: Box::new(item),
            container: ArrayKind::Tuple,
        }
    }

    pub fn map(key: ParamType, value: ParamType) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
            container: MapKind::Dict,
        }
    }

    pub fn ordered_map(key: ParamType, value: ParamType) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
            container: MapKind::Ordered,
        }
    }

    pub fn default_map(key: ParamType, value: ParamType, default: Value) -> Self {
        Self::Map {
            key: Box::new(key),
            value: Box::new(value),
            container: MapKind::Default(default),
        }
    }

    pub fn enumeration(name: impl Into<String>, values: impl IntoIterator<Item = Value>) -> Self {
        Self::Enum(EnumSchema {
            name: name.into(),
            values: values.into_iter().collect(),
        })
    }

    pub fn record(schema: RecordSchema) -> Self {
        Self::Record(schema)
    }

    /// Attach a piece of metadata, wrapping into `Annotated` on first use
    pub fn with(self, metadata: Metadata) -> Self {
        match self {
            Self::Annotated {
                inner,
                metadata: mut existing,
            } => {
                existing.push(metadata);
                Self::Annotated {
                    inner,
                    metadata: existing,
                }
            }
            other => Self::Annotated {
                inner: Box::new(other),
                metadata: vec![metadata],
            },
        }
    }

    /// Metadata attached at the top level, empty for plain types
    pub fn metadata(&self) -> &[Metadata] {
        match self {
            Self::Annotated { metadata, .. } => metadata,
            _ => &[],
        }
    }

    /// The type with any top-level annotation removed
    pub fn unannotated(&self) -> &ParamType {
        match self {
            Self::Annotated { inner, .. } => inner.unannotated(),
            other => other,
        }
    }

    /// Name used by the describe method
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::String | Self::Bytes => "String",
            Self::Integer | Self::Number | Self::Decimal => "Number",
            Self::Boolean => "Boolean",
            Self::Null => "Null",
            Self::Array { .. } => "Array",
            Self::Any | Self::Map { .. } | Self::Record(_) | Self::Union(_) => "Object",
            Self::Optional(inner) => inner.type_name(),
            Self::Annotated { inner, .. } => inner.type_name(),
            Self::Enum(schema) => match schema.values.first() {
                Some(Value::String(_)) => "String",
                Some(Value::Number(_)) => "Number",
                Some(Value::Bool(_)) => "Boolean",
                _ => "Object",
            },
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("any"),
            Self::String => f.write_str("string"),
            Self::Integer => f.write_str("integer"),
            Self::Number => f.write_str("number"),
            Self::Boolean => f.write_str("boolean"),
            Self::Null => f.write_str("null"),
            Self::Bytes => f.write_str("bytes"),
            Self::Decimal => f.write_str("decimal"),
            Self::Optional(inner) => write!(f, "optional<{inner}>"),
            Self::Union(arms) => {
                f.write_str("union<")?;
                for (i, arm) in arms.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{arm}")?;
                }
                f.write_str(">")
            }
            Self::Array { item, container } => match container {
                ArrayKind::List => write!(f, "list<{item}>"),
                ArrayKind::Set => write!(f, "set<{item}>"),
                ArrayKind::Tuple => write!(f, "tuple<{item}>"),
            },
            Self::Map { key, value, .. } => write!(f, "map<{key}, {value}>"),
            Self::Enum(schema) => f.write_str(&schema.name),
            Self::Record(schema) => f.write_str(&schema.name),
            Self::Annotated { inner, .. } => write!(f, "{inner}"),
        }
    }
}

/// A regular expression matched against the start of a string
#[derive(Debug, Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        Regex::new(pattern).map(Pattern)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn matches_start(&self, text: &str) -> bool {
        self.0.find(text).is_some_and(|m| m.start() == 0)
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

/// Extra information attached to a type through [`ParamType::with`].
///
/// The first group are constraints checked after coercion; the rest only
/// feed the describe output.
#[derive(Debug, Clone, PartialEq)]
pub enum Metadata {
    Required(bool),
    Nullable(bool),
    Minimum(f64),
    Maximum(f64),
    MultipleOf(f64),
    MinLength(usize),
    MaxLength(usize),
    Pattern(Pattern),
    AllowInfNan(bool),
    MaxDigits(usize),
    DecimalPlaces(usize),
    Summary(String),
    Description(String),
    Example { name: String, value: Value },
    Deprecated(bool),
}

impl Metadata {
    pub fn pattern(pattern: &str) -> Result<Self, regex::Error> {
        Pattern::new(pattern).map(Metadata::Pattern)
    }

    pub fn name(&self) -> &'static str {
        match self {
            Metadata::Required(_) => "required",
            Metadata::Nullable(_) => "nullable",
            Metadata::Minimum(_) => "minimum",
            Metadata::Maximum(_) => "maximum",
            Metadata::MultipleOf(_) => "multiple_of",
            Metadata::MinLength(_) => "min_length",
            Metadata::MaxLength(_) => "max_length",
            Metadata::Pattern(_) => "pattern",
            Metadata::AllowInfNan(_) => "allow_inf_nan",
            Metadata::MaxDigits(_) => "max_digits",
            Metadata::DecimalPlaces(_) => "decimal_places",
            Metadata::Summary(_) => "summary",
            Metadata::Description(_) => "description",
            Metadata::Example { .. } => "example",
            Metadata::Deprecated(_) => "deprecated",
        }
    }

    /// Constraints that still apply when the value is null
    pub fn checks_null(&self) -> bool {
        matches!(self, Metadata::Required(_) | Metadata::Nullable(_))
    }

    /// Check `value` of parameter `param`, returning the failure message
    pub fn check(&self, param: &str, value: &Value) -> Result<(), String> {
        match self {
            Metadata::Required(true) if is_empty_value(value) => Err(format!(
                "ensure the value of the parameter '{param}' is not empty"
            )),
            Metadata::Nullable(false) if value.is_null() => {
                Err(format!("ensure the parameter '{param}' is not null"))
            }
            Metadata::Minimum(minimum) => match numeric(value) {
                Some(n) if n < *minimum => Err(format!(
                    "ensure the value of the parameter '{param}' is greater than or equal to {minimum}"
                )),
                _ => Ok(()),
            },
            Metadata::Maximum(maximum) => match numeric(value) {
                Some(n) if n > *maximum => Err(format!(
                    "ensure the value of the parameter '{param}' is less than or equal to {maximum}"
                )),
                _ => Ok(()),
            },
            Metadata::MultipleOf(step) => match numeric(value) {
                Some(n) if n % step != 0.0 => Err(format!(
                    "ensure the value of the parameter '{param}' is a multiple of {step}"
                )),
                _ => Ok(()),
            },
            Metadata::MinLength(min) => match length(value) {
                Some(len) if len < *min => Err(format!(
                    "ensure the value of the parameter '{param}' is greater than or equal to {min}"
                )),
                _ => Ok(()),
            },
            Metadata::MaxLength(max) => match length(value) {
                Some(len) if len > *max => Err(format!(
                    "ensure the value of the parameter '{param}' is less than or equal to {max}"
                )),
                _ => Ok(()),
            },
            Metadata::Pattern(pattern) => match value.as_str() {
                Some(text) if !pattern.matches_start(text) => Err(format!(
                    "ensure the value of the parameter '{param}' matches the valid pattern '{}'",
                    pattern.as_str()
                )),
                _ => Ok(()),
            },
            Metadata::AllowInfNan(false) if is_inf_or_nan(value) => Err(format!(
                "ensure the value of the parameter '{param}' is not infinity, negative infinity, or NaN"
            )),
            Metadata::MaxDigits(max) => match decimal(value) {
                Some(d) => {
                    let (digits, decimals) = d.digits_and_decimals();
                    if digits - decimals > *max {
                        Err(format!(
                            "ensure the value of the parameter '{param}' has a maximum of {max} digits"
                        ))
                    } else {
                        Ok(())
                    }
                }
                None => Ok(()),
            },
            Metadata::DecimalPlaces(places) => match decimal(value) {
                Some(d) if d.digits_and_decimals().1 > *places => Err(format!(
                    "ensure the value of the parameter '{param}' has a maximum of {places} decimal places"
                )),
                _ => Ok(()),
            },
            _ => Ok(()),
        }
    }
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        Value::Object(o) => o.is_empty(),
        _ => false,
    }
}

// Decimal-typed values arrive here as strings after coercion
fn numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.parse::<Decimal>().ok().map(|d| d.to_f64()),
        _ => None,
    }
}

fn decimal(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => n.to_string().parse().ok(),
        Value::String(s) => s.parse().ok(),
        _ => None,
    }
}

fn length(value: &Value) -> Option<usize> {
    match value {
        Value::String(s) => Some(s.chars().count()),
        Value::Array(a) => Some(a.len()),
        Value::Object(o) => Some(o.len()),
        _ => None,
    }
}

fn is_inf_or_nan(value: &Value) -> bool {
    match value {
        Value::Number(n) => n.as_f64().is_some_and(|f| !f.is_finite()),
        Value::String(s) => matches!(
            s.trim().to_ascii_lowercase().trim_start_matches(['+', '-']),
            "inf" | "infinity" | "nan"
        ),
        _ => false,
    }
}

/// Name of a JSON value's kind as used in type mismatch messages
pub fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(n) if n.is_i64() || n.is_u64() => "integer",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

macro_rules! impl_type_of {
    ($ty:expr => $($t:ty),+) => {
        $(impl TypeOf for $t {
            fn param_type() -> ParamType {
                $ty
            }
        })+
    };
}

impl_type_of!(ParamType::Integer => i8, i16, i32, i64, isize, u8, u16, u32, u64, usize);
impl_type_of!(ParamType::Number => f32, f64);
impl_type_of!(ParamType::String => String, &str);
impl_type_of!(ParamType::Boolean => bool);
impl_type_of!(ParamType::Null => ());
impl_type_of!(ParamType::Any => Value);
impl_type_of!(ParamType::Decimal => Decimal);

impl<T: TypeOf> TypeOf for Option<T> {
    fn param_type() -> ParamType {
        ParamType::optional(T::param_type())
    }
}

impl<T: TypeOf> TypeOf for Vec<T> {
    fn param_type() -> ParamType {
        ParamType::list(T::param_type())
    }
}

impl<T: TypeOf> TypeOf for HashSet<T> {
    fn param_type() -> ParamType {
        ParamType::set(T::param_type())
    }
}

impl<T: TypeOf> TypeOf for BTreeSet<T> {
    fn param_type() -> ParamType {
        ParamType::set(T::param_type())
    }
}

impl<K: TypeOf, V: TypeOf> TypeOf for HashMap<K, V> {
    fn param_type() -> ParamType {
        ParamType::map(K::param_type(), V::param_type())
    }
}

impl<K: TypeOf, V: TypeOf> TypeOf for BTreeMap<K, V> {
    fn param_type() -> ParamType {
        ParamType::map(K::param_type(), V::param_type())
    }
}

impl<K: TypeOf, V: TypeOf> TypeOf for IndexMap<K, V> {
    fn param_type() -> ParamType {
        ParamType::ordered_map(K::param_type(), V::param_type())
    }
}
