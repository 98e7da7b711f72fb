//! # Scheduler Settings
//!
//! Everything one run needs besides the provider: which modules to stage,
//! the input registries constructors may read, the output registry the run
//! fills, and the policies for cycles and failed constructions.

use crate::{ModuleKey, Registry};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

// =============================================================================
// POLICIES
// =============================================================================

/// What leveling does when it meets a dependency cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CyclePolicy {
    /// Stop leveling and return the cycle as an error.
    #[default]
    Abort,
    /// Log the cycle, skip the edge that closes it, keep leveling.
    Report,
}

/// What the executor does when a module cannot be constructed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure, skip the module, run the remaining stages.
    #[default]
    Continue,
    /// Stop the run at the first failure.
    Abort,
}

// =============================================================================
// SETTINGS
// =============================================================================

/// Per-run scheduler settings.
#[derive(Debug, Clone, Default)]
pub struct SchedulerSettings {
    modules: BTreeSet<ModuleKey>,
    registries: Vec<Registry>,
    output: Registry,
    cycle_policy: CyclePolicy,
    failure_policy: FailurePolicy,
}

impl SchedulerSettings {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request a module. Returns `false` if it was already requested.
    pub fn add_module(&mut self, key: impl Into<ModuleKey>) -> bool {
        self.modules.insert(key.into())
    }

    /// Request module type `T`, keyed by its type name.
    pub fn add_module_type<T: ?Sized>(&mut self) -> bool {
        self.add_module(ModuleKey::of::<T>())
    }

    #[must_use]
    pub fn modules(&self) -> &BTreeSet<ModuleKey> {
        &self.modules
    }

    /// Add an input registry. Earlier registries win on lookups.
    pub fn add_registry(&mut self, registry: Registry) {
        self.registries.push(registry);
    }

    #[must_use]
    pub fn registries(&self) -> &[Registry] {
        &self.registries
    }

    /// Registry the run starts its output from.
    pub fn set_output_registry(&mut self, registry: Registry) {
        self.output = registry;
    }

    /// A snapshot of the output registry.
    #[must_use]
    pub fn output_registry(&self) -> Registry {
        self.output.clone()
    }

    pub fn set_cycle_policy(&mut self, policy: CyclePolicy) {
        self.cycle_policy = policy;
    }

    #[must_use]
    pub fn cycle_policy(&self) -> CyclePolicy {
        self.cycle_policy
    }

    pub fn set_failure_policy(&mut self, policy: FailurePolicy) {
        self.failure_policy = policy;
    }

    #[must_use]
    pub fn failure_policy(&self) -> FailurePolicy {
        self.failure_policy
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;

    #[test]
    fn defaults() {
        let settings = SchedulerSettings::new();
        assert!(settings.modules().is_empty());
        assert_eq!(settings.cycle_policy(), CyclePolicy::Abort);
        assert_eq!(settings.failure_policy(), FailurePolicy::Continue);
    }

    #[test]
    fn modules_deduplicated() {
        let mut settings = SchedulerSettings::new();
        assert!(settings.add_module_type::<Probe>());
        assert!(!settings.add_module(ModuleKey::of::<Probe>()));
        assert_eq!(settings.modules().len(), 1);
    }

    #[test]
    fn output_registry_is_a_snapshot() {
        let mut settings = SchedulerSettings::new();
        let mut snapshot = settings.output_registry();
        snapshot.insert("x", 1u8);
        assert!(settings.output_registry().is_empty());

        settings.set_output_registry(snapshot);
        assert_eq!(settings.output_registry().len(), 1);
    }
}
