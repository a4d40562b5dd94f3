use std::sync::Arc;

use indexmap::IndexMap;
use parking_lot::RwLock;
use tracing::{debug, warn};

use crate::procedure::ProcedureDescriptor;

/// Method name to procedure mapping, in registration order
#[derive(Default)]
pub struct ProcedureRegistry {
    procedures: RwLock<IndexMap<String, Arc<ProcedureDescriptor>>>,
}

impl ProcedureRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace the procedure registered under the descriptor's name.
    ///
    /// Replacing keeps the original registration position and returns the
    /// previous descriptor.
    pub fn register(&self, descriptor: ProcedureDescriptor) -> Option<Arc<ProcedureDescriptor>> {
        let name = descriptor.name().to_string();
        let previous = self
            .procedures
            .write()
            .insert(name.clone(), Arc::new(descriptor));
        if previous.is_some() {
            warn!(method = %name, "procedure registered twice, replacing the earlier registration");
        } else {
            debug!(method = %name, "registered procedure");
        }
        previous
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<ProcedureDescriptor>> {
        self.procedures.read().get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.procedures.read().contains_key(name)
    }

    pub fn names(&self) -> Vec<String> {
        self.procedures.read().keys().cloned().collect()
    }

    /// Registered descriptors in registration order, skipping `exclude`
    pub fn descriptors(&self, exclude: Option<&str>) -> Vec<Arc<ProcedureDescriptor>> {
        self.procedures
            .read()
            .iter()
            .filter(|(name, _)| Some(name.as_str()) != exclude)
            .map(|(_, descriptor)| Arc::clone(descriptor))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.procedures.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.procedures.read().is_empty()
    }
}
