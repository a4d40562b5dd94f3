//! Service description returned by the built-in describe method

use std::sync::{Arc, Weak};

use async_trait::async_trait;
use indexmap::IndexMap;
use serde::Serialize;

use crate::coerce::BoundArgs;
use crate::config::SiteConfig;
use crate::error::RpcError;
use crate::exception::ProcedureError;
use crate::procedure::{ParamSchema, Procedure, ProcedureDescriptor};
use crate::registry::ProcedureRegistry;
use crate::reply::Reply;
use crate::schema::Metadata;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServiceDescribe {
    pub id: String,
    pub version: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub servers: Vec<ServerDescribe>,
    pub methods: IndexMap<String, MethodDescribe>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ServerDescribe {
    pub url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MethodDescribe {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub params: Vec<ParamDescribe>,
    pub returns: ReturnsDescribe,
    pub notification: bool,
    pub validation: bool,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deprecated: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<serde_json::Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub examples: Vec<serde_json::Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ParamDescribe {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nullable: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub minimum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub maximum: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnsDescribe {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: String,
}

impl ParamDescribe {
    fn from_schema(param: &ParamSchema) -> Self {
        let mut describe = ParamDescribe {
            name: param.name.clone(),
            kind: param.ty.type_name().to_string(),
            ..Default::default()
        };
        for metadata in param.ty.metadata() {
            match metadata {
                Metadata::Required(required) => describe.required = Some(*required),
                Metadata::Nullable(nullable) => describe.nullable = Some(*nullable),
                Metadata::Minimum(minimum) => describe.minimum = Some(*minimum),
                Metadata::Maximum(maximum) => describe.maximum = Some(*maximum),
                Metadata::Pattern(pattern) => describe.pattern = Some(pattern.as_str().to_string()),
                Metadata::MaxLength(length) => describe.length = Some(*length),
                Metadata::Description(text) => describe.description = Some(text.clone()),
                _ => {}
            }
        }
        describe
    }
}

impl MethodDescribe {
    pub fn from_descriptor(descriptor: &ProcedureDescriptor) -> Self {
        let meta = descriptor.meta();
        MethodDescribe {
            name: descriptor.name().to_string(),
            kind: "method".to_string(),
            summary: meta.summary.clone(),
            description: meta.description.clone(),
            params: descriptor
                .params()
                .iter()
                .map(ParamDescribe::from_schema)
                .collect(),
            returns: ReturnsDescribe {
                name: "default".to_string(),
                kind: descriptor
                    .returns()
                    .map_or("Null", |ty| ty.type_name())
                    .to_string(),
            },
            notification: descriptor.allow_notification(),
            validation: descriptor.validate(),
            deprecated: meta.deprecated,
            tags: meta.tags.clone(),
            errors: meta.errors.clone(),
            examples: meta.examples.clone(),
        }
    }
}

impl ServiceDescribe {
    /// Describe every registered procedure in registration order
    pub fn build(id: &str, config: &SiteConfig, registry: &ProcedureRegistry) -> Self {
        let exclude = (!config.describe_include_self).then_some(config.describe_method.as_str());
        let methods = registry
            .descriptors(exclude)
            .iter()
            .map(|d| (d.name().to_string(), MethodDescribe::from_descriptor(d)))
            .collect();

        ServiceDescribe {
            id: format!("urn:uuid:{id}"),
            version: config.version.clone(),
            name: config.name.clone(),
            description: None,
            servers: vec![ServerDescribe {
                url: config.server_url(),
                description: None,
            }],
            methods,
        }
    }
}

/// The built-in describe procedure.
///
/// Holds the registry weakly since the registry owns this procedure.
pub(crate) struct DescribeProcedure {
    pub(crate) id: String,
    pub(crate) config: Arc<SiteConfig>,
    pub(crate) registry: Weak<ProcedureRegistry>,
}

#[async_trait]
impl Procedure for DescribeProcedure {
    async fn invoke(&self, _args: BoundArgs) -> Result<Reply, ProcedureError> {
        let registry = self
            .registry
            .upgrade()
            .ok_or_else(|| RpcError::internal_error(None).with_data_message("site is shutting down"))?;
        let describe = ServiceDescribe::build(&self.id, &self.config, &registry);
        let value = serde_json::to_value(describe)
            .map_err(|e| RpcError::internal_error(None).with_data_message(e.to_string()))?;
        Ok(Reply::Value(value))
    }
}
