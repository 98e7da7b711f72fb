//! # Instantiation
//!
//! The constructor-resolution seam. The executor asks an [`Instantiator`]
//! for each staged module and hands it a [`Dependencies`] view over the
//! registries visible at that point of the run.

use crate::{DependencySource, InstantiationError, ModuleInstance, ModuleKey, Registry};
use std::any::{Any, type_name};
use std::sync::Arc;

// =============================================================================
// DEPENDENCIES VIEW
// =============================================================================

/// Read-only view over the registries a constructor may draw from.
///
/// Lookups search the temporary registry of the current run first, then the
/// input registries in the order they were supplied.
#[derive(Debug, Clone, Copy)]
pub struct Dependencies<'r> {
    inputs: &'r [Registry],
    temporary: &'r Registry,
}

impl<'r> Dependencies<'r> {
    #[must_use]
    pub fn new(inputs: &'r [Registry], temporary: &'r Registry) -> Self {
        Self { inputs, temporary }
    }

    fn registries(&self) -> impl Iterator<Item = &'r Registry> {
        std::iter::once(self.temporary).chain(self.inputs.iter())
    }

    #[must_use]
    pub fn contains(&self, key: &ModuleKey) -> bool {
        self.registries().any(|registry| registry.contains(key))
    }

    /// The first value under `key` of type `T`.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &ModuleKey) -> Option<Arc<T>> {
        self.registries().find_map(|registry| registry.get::<T>(key))
    }

    /// Like [`get`](Self::get), but tells a missing value apart from one of
    /// another type.
    pub fn require<T: Any + Send + Sync>(
        &self,
        key: &ModuleKey,
    ) -> Result<Arc<T>, InstantiationError> {
        if let Some(value) = self.get::<T>(key) {
            return Ok(value);
        }
        if self.contains(key) {
            Err(InstantiationError::TypeMismatch {
                dependency: key.clone(),
                expected: type_name::<T>(),
            })
        } else {
            Err(InstantiationError::MissingDependency {
                dependency: key.clone(),
            })
        }
    }

    /// Shorthand for `require` keyed by the type's own name.
    pub fn require_module<T: Any + Send + Sync>(&self) -> Result<Arc<T>, InstantiationError> {
        self.require(&ModuleKey::of::<T>())
    }
}

// =============================================================================
// INSTANTIATOR
// =============================================================================

/// Constructs a module from its already available dependencies.
pub trait Instantiator {
    fn instantiate(
        &self,
        module: &ModuleKey,
        dependencies: &Dependencies<'_>,
    ) -> Result<ModuleInstance, InstantiationError>;
}

/// Both strategies a scheduler run needs: dependency discovery and
/// construction.
pub trait ModuleProvider: DependencySource + Instantiator {}

impl<T> ModuleProvider for T where T: DependencySource + Instantiator + ?Sized {}
