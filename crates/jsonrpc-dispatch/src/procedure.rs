//! Procedure descriptors and the builder that declares them
//!
//! A procedure is registered once at startup with its parameter schema,
//! return type and options. The descriptor is immutable afterwards and
//! shared behind an `Arc` by the registry.

use std::collections::HashSet;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::coerce::BoundArgs;
use crate::exception::ProcedureError;
use crate::reply::Reply;
use crate::schema::{ParamType, TypeOf};

/// Something that can be invoked with bound arguments
#[async_trait]
pub trait Procedure: Send + Sync {
    async fn invoke(&self, args: BoundArgs) -> Result<Reply, ProcedureError>;
}

pub type ProcedureFuture = Pin<Box<dyn Future<Output = Result<Reply, ProcedureError>> + Send>>;

/// Type alias for closure-backed procedures
pub type DynamicProcedureFn = Box<dyn Fn(BoundArgs) -> ProcedureFuture + Send + Sync>;

struct FnProcedure {
    call: DynamicProcedureFn,
}

#[async_trait]
impl Procedure for FnProcedure {
    async fn invoke(&self, args: BoundArgs) -> Result<Reply, ProcedureError> {
        (self.call)(args).await
    }
}

/// A declared parameter
#[derive(Debug, Clone, PartialEq)]
pub struct ParamSchema {
    pub name: String,
    pub ty: ParamType,
    pub default: Option<Value>,
}

/// Descriptive metadata rendered by the describe method
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MethodMeta {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub deprecated: bool,
    pub tags: Vec<String>,
    pub errors: Vec<Value>,
    pub examples: Vec<Value>,
}

/// One registered remote procedure
pub struct ProcedureDescriptor {
    name: String,
    procedure: Arc<dyn Procedure>,
    params: Vec<ParamSchema>,
    returns: Option<ParamType>,
    validate: bool,
    allow_notification: bool,
    meta: MethodMeta,
}

impl ProcedureDescriptor {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn params(&self) -> &[ParamSchema] {
        &self.params
    }

    pub fn returns(&self) -> Option<&ParamType> {
        self.returns.as_ref()
    }

    pub fn validate(&self) -> bool {
        self.validate
    }

    pub fn allow_notification(&self) -> bool {
        self.allow_notification
    }

    pub fn meta(&self) -> &MethodMeta {
        &self.meta
    }

    pub fn procedure(&self) -> &Arc<dyn Procedure> {
        &self.procedure
    }

    pub async fn invoke(&self, args: BoundArgs) -> Result<Reply, ProcedureError> {
        self.procedure.invoke(args).await
    }
}

impl std::fmt::Debug for ProcedureDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcedureDescriptor")
            .field("name", &self.name)
            .field("params", &self.params)
            .field("returns", &self.returns)
            .field("validate", &self.validate)
            .field("allow_notification", &self.allow_notification)
            .finish_non_exhaustive()
    }
}

/// Builder for declaring procedures at registration time
///
/// ```rust
/// use jsonrpc_dispatch::prelude::*;
///
/// let sum = ProcedureBuilder::new("sum")
///     .param("a", ParamType::Number)
///     .param("b", ParamType::Number)
///     .returns(ParamType::Number)
///     .handler_fn(|args| {
///         let a: f64 = args.get("a")?;
///         let b: f64 = args.get("b")?;
///         Ok(serde_json::json!(a + b))
///     })
///     .build()
///     .unwrap();
/// assert_eq!(sum.params().len(), 2);
/// ```
pub struct ProcedureBuilder {
    name: String,
    params: Vec<ParamSchema>,
    returns: Option<ParamType>,
    validate: Option<bool>,
    notification: Option<bool>,
    meta: MethodMeta,
    procedure: Option<Arc<dyn Procedure>>,
}

impl ProcedureBuilder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            params: Vec::new(),
            returns: None,
            validate: None,
            notification: None,
            meta: MethodMeta::default(),
            procedure: None,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Declare the next parameter
    pub fn param(mut self, name: impl Into<String>, ty: ParamType) -> Self {
        self.params.push(ParamSchema {
            name: name.into(),
            ty,
            default: None,
        });
        self
    }

    /// Declare a parameter used with `default` when the caller omits it
    pub fn param_with_default(mut self, name: impl Into<String>, ty: ParamType, default: Value) -> Self {
        self.params.push(ParamSchema {
            name: name.into(),
            ty,
            default: Some(default),
        });
        self
    }

    /// Declare a parameter whose type is derived from `T`
    pub fn typed_param<T: TypeOf>(self, name: impl Into<String>) -> Self {
        self.param(name, T::param_type())
    }

    pub fn returns(mut self, ty: ParamType) -> Self {
        self.returns = Some(ty);
        self
    }

    pub fn returns_type<T: TypeOf>(self) -> Self {
        self.returns(T::param_type())
    }

    pub fn validate(mut self, validate: bool) -> Self {
        self.validate = Some(validate);
        self
    }

    /// Whether requests without an `id` may call this procedure
    pub fn notification(mut self, allow: bool) -> Self {
        self.notification = Some(allow);
        self
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.meta.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.meta.description = Some(description.into());
        self
    }

    pub fn deprecated(mut self, deprecated: bool) -> Self {
        self.meta.deprecated = deprecated;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.meta.tags.push(tag.into());
        self
    }

    /// Document an error this procedure may return
    pub fn error(mut self, error: Value) -> Self {
        self.meta.errors.push(error);
        self
    }

    pub fn example(mut self, example: Value) -> Self {
        self.meta.examples.push(example);
        self
    }

    /// Set an async handler
    pub fn handler<F, Fut, R>(mut self, f: F) -> Self
    where
        F: Fn(BoundArgs) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, ProcedureError>> + Send + 'static,
        R: Into<Reply>,
    {
        let call: DynamicProcedureFn = Box::new(move |args| {
            let fut = f(args);
            Box::pin(async move { fut.await.map(Into::into) })
        });
        self.procedure = Some(Arc::new(FnProcedure { call }));
        self
    }

    /// Set a synchronous handler
    pub fn handler_fn<F, R>(self, f: F) -> Self
    where
        F: Fn(BoundArgs) -> Result<R, ProcedureError> + Send + Sync + 'static,
        R: Into<Reply> + Send + 'static,
    {
        self.handler(move |args| std::future::ready(f(args)))
    }

    /// Use an existing [`Procedure`] implementation
    pub fn procedure(mut self, procedure: impl Procedure + 'static) -> Self {
        self.procedure = Some(Arc::new(procedure));
        self
    }

    /// Build with validation and notification enabled unless set
    pub fn build(self) -> Result<ProcedureDescriptor, String> {
        self.build_with_defaults(true, true)
    }

    /// Build, taking unset options from the given defaults
    pub fn build_with_defaults(
        self,
        validate: bool,
        notification: bool,
    ) -> Result<ProcedureDescriptor, String> {
        let procedure = self
            .procedure
            .ok_or_else(|| format!("Handler is required for method '{}'", self.name))?;

        let mut seen = HashSet::new();
        if let Some(dup) = self.params.iter().find(|p| !seen.insert(p.name.as_str())) {
            return Err(format!(
                "Parameter '{}' is declared more than once for method '{}'",
                dup.name, self.name
            ));
        }

        Ok(ProcedureDescriptor {
            name: self.name,
            procedure,
            params: self.params,
            returns: self.returns,
            validate: self.validate.unwrap_or(validate),
            allow_notification: self.notification.unwrap_or(notification),
            meta: self.meta,
        })
    }
}
