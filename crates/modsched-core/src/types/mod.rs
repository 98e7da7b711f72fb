//! # Core Type Definitions
//!
//! This module contains the shared types of the modsched staging engine:
//! - Module identity (`ModuleKey`)
//! - Cycle representation (`DependencyCycle`)
//! - Error types (`SchedulerError`, `InstantiationError`)
//!
//! ## Determinism Guarantees
//!
//! Every type here implements `Ord` so it can live in `BTreeMap`/`BTreeSet`
//! and produce reproducible iteration order.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

// =============================================================================
// MODULE IDENTITY
// =============================================================================

/// Unique identifier for a kind of module.
///
/// Equality and ordering are by the underlying name, so descriptors, stages
/// and registries keyed by `ModuleKey` iterate lexicographically.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModuleKey(String);

impl ModuleKey {
    /// Create a key from a module name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Key derived from a Rust type's fully qualified name.
    #[must_use]
    pub fn of<T: ?Sized>() -> Self {
        Self(std::any::type_name::<T>().to_string())
    }

    /// Get the key as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for ModuleKey {
    fn from(name: String) -> Self {
        Self(name)
    }
}

// =============================================================================
// DEPENDENCY CYCLE
// =============================================================================

/// A closed chain of modules, listed in traversal order.
///
/// The chain does not repeat its first module; `Display` closes the loop:
/// `a -> b -> c -> a`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DependencyCycle(Vec<ModuleKey>);

impl DependencyCycle {
    /// Create a cycle from the modules on the chain.
    #[must_use]
    pub fn new(modules: Vec<ModuleKey>) -> Self {
        Self(modules)
    }

    /// The modules on the chain, in traversal order.
    #[must_use]
    pub fn modules(&self) -> &[ModuleKey] {
        &self.0
    }

    /// Number of modules on the chain.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Check whether the chain is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Check whether a module is part of the chain.
    #[must_use]
    pub fn contains(&self, key: &ModuleKey) -> bool {
        self.0.contains(key)
    }

    /// The same chain rotated to start at its smallest key.
    ///
    /// Two reports of one cycle entered from different modules compare equal
    /// after canonicalization.
    #[must_use]
    pub fn canonical(&self) -> Self {
        let start = self
            .0
            .iter()
            .enumerate()
            .min_by(|(_, a), (_, b)| a.cmp(b))
            .map(|(i, _)| i)
            .unwrap_or(0);
        let mut modules = self.0.clone();
        modules.rotate_left(start);
        Self(modules)
    }
}

impl fmt::Display for DependencyCycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for key in &self.0 {
            write!(f, "{} -> ", key)?;
        }
        match self.0.first() {
            Some(first) => write!(f, "{}", first),
            None => f.write_str("(empty)"),
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Run-level errors. Any of these stops leveling or execution.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// The run requested no modules at all.
    #[error("There is no module to be ordered")]
    NoModules,

    /// No module could be placed at stage 0 or 1.
    #[error(
        "There needs to be a zeroth or first stage to start the loading process{}",
        cycle_suffix(.cycle)
    )]
    NoStartingStage {
        /// A cycle found in the graph, when there is one.
        cycle: Option<DependencyCycle>,
    },

    /// Leveling ran into a dependency cycle.
    #[error("Dependency cycle detected: {0}")]
    Cycle(DependencyCycle),

    /// A module failed to instantiate while the failure policy is `Abort`.
    #[error("Module {module} could not be instantiated: {source}")]
    Instantiation {
        /// The module that failed.
        module: ModuleKey,
        /// Why it failed.
        #[source]
        source: InstantiationError,
    },

    /// The scheduler configuration is invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(String),

    /// A serialization or deserialization error occurred.
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// A background task panicked or was cancelled.
    #[error("Background task failed: {0}")]
    TaskFailed(String),
}

fn cycle_suffix(cycle: &Option<DependencyCycle>) -> String {
    match cycle {
        Some(cycle) => format!(" (dependency cycle: {})", cycle),
        None => String::new(),
    }
}

/// Per-module instantiation failures.
///
/// Under the default failure policy these are logged and recorded, and the
/// run continues without the module.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InstantiationError {
    /// Nothing knows how to construct this module.
    #[error("no constructor is registered for module {0}")]
    UnknownModule(ModuleKey),

    /// A constructor parameter is in none of the registries.
    #[error("dependency {dependency} is not available")]
    MissingDependency {
        /// The absent dependency.
        dependency: ModuleKey,
    },

    /// A registered dependency has a different type than requested.
    #[error("dependency {dependency} is not a {expected}")]
    TypeMismatch {
        /// The dependency that was looked up.
        dependency: ModuleKey,
        /// The requested type name.
        expected: &'static str,
    },

    /// The constructor itself reported an error.
    #[error("constructor failed: {0}")]
    Constructor(String),
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct Marker;

    #[test]
    fn key_ordering_is_lexicographic() {
        let mut keys = vec![ModuleKey::new("c"), ModuleKey::new("a"), ModuleKey::new("b")];
        keys.sort();
        let names: Vec<_> = keys.iter().map(ModuleKey::as_str).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }

    #[test]
    fn key_of_type_uses_type_name() {
        let key = ModuleKey::of::<Marker>();
        assert!(key.as_str().ends_with("Marker"));
        assert_eq!(key, ModuleKey::of::<Marker>());
    }

    #[test]
    fn cycle_display_closes_the_loop() {
        let cycle = DependencyCycle::new(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(cycle.to_string(), "a -> b -> c -> a");
    }

    #[test]
    fn cycle_canonical_rotates_to_smallest() {
        let entered_late = DependencyCycle::new(vec!["c".into(), "a".into(), "b".into()]);
        let entered_early = DependencyCycle::new(vec!["a".into(), "b".into(), "c".into()]);
        assert_eq!(entered_late.canonical(), entered_early);
    }

    #[test]
    fn no_starting_stage_names_the_cycle() {
        let err = SchedulerError::NoStartingStage {
            cycle: Some(DependencyCycle::new(vec!["x".into(), "y".into()])),
        };
        assert!(err.to_string().ends_with("(dependency cycle: x -> y -> x)"));

        let bare = SchedulerError::NoStartingStage { cycle: None };
        assert!(bare.to_string().ends_with("loading process"));
    }
}
