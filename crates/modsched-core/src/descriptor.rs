//! # Module Descriptor
//!
//! The graph node for one module kind. A descriptor records both edge
//! directions so the leveler can propagate forward from roots while the
//! executor and diagnostics read the declared dependencies.

use crate::ModuleKey;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Graph node for one module kind.
///
/// Equality and ordering consider only the key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleDescriptor {
    key: ModuleKey,
    /// Modules this one requires before it can run (outgoing edges).
    dependencies: BTreeSet<ModuleKey>,
    /// Modules that require this one (incoming edges).
    dependents: BTreeSet<ModuleKey>,
}

impl ModuleDescriptor {
    /// Create a descriptor with no edges.
    #[must_use]
    pub fn new(key: ModuleKey) -> Self {
        Self {
            key,
            dependencies: BTreeSet::new(),
            dependents: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    #[must_use]
    pub fn dependencies(&self) -> &BTreeSet<ModuleKey> {
        &self.dependencies
    }

    #[must_use]
    pub fn dependents(&self) -> &BTreeSet<ModuleKey> {
        &self.dependents
    }

    /// Record that this module requires `dependency`.
    ///
    /// Returns `false` for a self-reference or an edge that already exists.
    pub fn add_dependency(&mut self, dependency: ModuleKey) -> bool {
        if dependency == self.key {
            return false;
        }
        self.dependencies.insert(dependency)
    }

    /// Record that `dependent` requires this module.
    ///
    /// Returns `false` for a self-reference or an edge that already exists.
    pub fn add_dependent(&mut self, dependent: ModuleKey) -> bool {
        if dependent == self.key {
            return false;
        }
        self.dependents.insert(dependent)
    }

    /// No dependencies and no dependents: stage 0.
    #[must_use]
    pub fn is_isolated(&self) -> bool {
        self.dependencies.is_empty() && self.dependents.is_empty()
    }

    /// No dependencies but at least one dependent: stage 1 and a propagation seed.
    #[must_use]
    pub fn is_root(&self) -> bool {
        self.dependencies.is_empty() && !self.dependents.is_empty()
    }
}

impl PartialEq for ModuleDescriptor {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for ModuleDescriptor {}

impl PartialOrd for ModuleDescriptor {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ModuleDescriptor {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}
