//! # Modules
//!
//! The unit of work the scheduler stages and runs, and the type-erased
//! handle the executor passes around once a module is constructed.

use std::any::{Any, type_name};
use std::fmt;
use std::sync::Arc;

/// A unit of work with one execution entry point.
///
/// A module is constructed once per run, after every module it depends on,
/// and then executed exactly once.
pub trait Module: Send + Sync + 'static {
    /// Run the module.
    fn execute(&self);
}

/// A constructed module.
///
/// Holds the module both as `dyn Module`, for execution, and as `dyn Any`,
/// so later constructors can recover the concrete type from a registry.
#[derive(Clone)]
pub struct ModuleInstance {
    module: Arc<dyn Module>,
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

impl ModuleInstance {
    pub fn new<T: Module>(module: T) -> Self {
        Self::from_arc(Arc::new(module))
    }

    pub fn from_arc<T: Module>(module: Arc<T>) -> Self {
        Self {
            module: module.clone(),
            value: module,
            type_name: type_name::<T>(),
        }
    }

    #[must_use]
    pub fn module(&self) -> &dyn Module {
        &*self.module
    }

    /// Run the module's entry point.
    pub fn execute(&self) {
        self.module.execute();
    }

    /// The concrete module, if it is a `T`.
    #[must_use]
    pub fn downcast<T: Module>(&self) -> Option<Arc<T>> {
        self.value.clone().downcast::<T>().ok()
    }

    #[must_use]
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    pub(crate) fn value(&self) -> Arc<dyn Any + Send + Sync> {
        Arc::clone(&self.value)
    }
}

impl fmt::Debug for ModuleInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleInstance")
            .field("type_name", &self.type_name)
            .finish()
    }
}
