use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::exception::{Exception, Fault, ServerFault};
use crate::reply::Reply;

/// Recovery callable for an application error kind
pub type ErrorHandlerFn = Arc<dyn Fn(&Fault) -> Reply + Send + Sync>;

/// Kind under which the last-chance handler is registered
pub const SERVER_ERROR_KIND: &str = "ServerError";

/// Maps exception kinds to recovery handlers.
///
/// Resolution walks a fault's kind chain most derived first, so a handler
/// registered for a parent kind also catches its descendants.
#[derive(Default)]
pub struct ErrorHandlerRegistry {
    handlers: RwLock<HashMap<String, ErrorHandlerFn>>,
}

impl ErrorHandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register<E, F>(&self, handler: F)
    where
        E: Exception,
        F: Fn(&Fault) -> Reply + Send + Sync + 'static,
    {
        self.register_kind(E::KIND, handler);
    }

    /// Register by kind name, for ancestor kinds without a Rust type
    pub fn register_kind<F>(&self, kind: impl Into<String>, handler: F)
    where
        F: Fn(&Fault) -> Reply + Send + Sync + 'static,
    {
        self.handlers.write().insert(kind.into(), Arc::new(handler));
    }

    pub fn resolve(&self, fault: &Fault) -> Option<ErrorHandlerFn> {
        let handlers = self.handlers.read();
        if handlers.is_empty() {
            return None;
        }
        fault
            .kind_chain()
            .iter()
            .find_map(|kind| handlers.get(*kind).cloned())
    }

    /// Run the matching handler, falling back to a `ServerError` handler
    /// invoked with a synthesized fault wrapping the original.
    pub fn handle(&self, fault: Fault) -> Option<Reply> {
        if let Some(handler) = self.resolve(&fault) {
            return Some(handler(&fault));
        }
        let fallback = self.handlers.read().get(SERVER_ERROR_KIND).cloned()?;
        let wrapped = Fault::new(ServerFault { original: fault });
        Some(fallback(&wrapped))
    }

    pub fn contains(&self, kind: &str) -> bool {
        self.handlers.read().contains_key(kind)
    }

    pub fn len(&self) -> usize {
        self.handlers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.handlers.read().is_empty()
    }
}
