//! # Manifest Configuration
//!
//! A TOML manifest describes a module set the CLI can plan and run:
//!
//! ```toml
//! [scheduler]
//! modules = ["api"]
//! provided = ["clock"]
//! cycle_policy = "abort"
//! failure_policy = "continue"
//!
//! [[module]]
//! name = "api"
//! depends_on = ["db"]
//! requires = ["clock"]
//! message = "serving"
//!
//! [[module]]
//! name = "db"
//! ```
//!
//! `modules` defaults to every declared module. `provided` names values seeded
//! into the input registry before the run; they satisfy `requires` entries
//! without being staged themselves.

use crate::scheduler::ModuleScheduler;
use modsched_core::{
    CyclePolicy, Dependencies, DependencyGraph, ExecutionObserver, FailurePolicy,
    InstantiationError, Module, ModuleCatalog, ModuleDefinition, ModuleInstance, ModuleKey,
    Registry, SchedulerError, SchedulerSettings,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Mutex;
use tracing::{debug, info};

/// Maximum manifest size (1 MB).
const MAX_MANIFEST_SIZE: u64 = 1024 * 1024;

// =============================================================================
// MANIFEST FORMAT
// =============================================================================

/// Parsed manifest file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default, rename = "module")]
    pub modules: Vec<ModuleEntry>,
}

/// The `[scheduler]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerSection {
    /// Modules to request. `None` requests every declared module.
    #[serde(default)]
    pub modules: Option<Vec<String>>,
    #[serde(default)]
    pub provided: Vec<String>,
    #[serde(default)]
    pub cycle_policy: CyclePolicy,
    #[serde(default)]
    pub failure_policy: FailurePolicy,
}

/// One `[[module]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModuleEntry {
    pub name: String,
    /// Ordering-only dependencies.
    #[serde(default)]
    pub depends_on: Vec<String>,
    /// Values the constructor reads: declared modules or provided names.
    #[serde(default)]
    pub requires: Vec<String>,
    #[serde(default)]
    pub message: Option<String>,
    /// Make the constructor fail.
    #[serde(default)]
    pub fail: bool,
}

impl Manifest {
    /// Parse and validate a manifest.
    pub fn from_toml_str(source: &str) -> Result<Self, SchedulerError> {
        let manifest: Manifest = toml::from_str(source)
            .map_err(|e| SchedulerError::Config(format!("Invalid manifest: {}", e)))?;
        manifest.validate()?;
        Ok(manifest)
    }

    /// Read, parse and validate a manifest file.
    pub fn load(path: &Path) -> Result<Self, SchedulerError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            SchedulerError::IoError(format!("Cannot read manifest '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_MANIFEST_SIZE {
            return Err(SchedulerError::Config(format!(
                "Manifest size {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_MANIFEST_SIZE
            )));
        }

        let source = std::fs::read_to_string(path).map_err(|e| {
            SchedulerError::IoError(format!("Cannot read manifest '{}': {}", path.display(), e))
        })?;
        let manifest = Self::from_toml_str(&source)?;
        debug!(
            path = %path.display(),
            modules = manifest.modules.len(),
            "Manifest loaded"
        );
        Ok(manifest)
    }

    fn validate(&self) -> Result<(), SchedulerError> {
        let mut declared = BTreeSet::new();
        for entry in &self.modules {
            if entry.name.trim().is_empty() {
                return Err(SchedulerError::Config(
                    "Module name must not be empty".to_string(),
                ));
            }
            if !declared.insert(entry.name.as_str()) {
                return Err(SchedulerError::Config(format!(
                    "Module '{}' is declared twice",
                    entry.name
                )));
            }
        }

        let mut provided = BTreeSet::new();
        for name in &self.scheduler.provided {
            if declared.contains(name.as_str()) {
                return Err(SchedulerError::Config(format!(
                    "'{}' is both a module and a provided value",
                    name
                )));
            }
            provided.insert(name.as_str());
        }

        for entry in &self.modules {
            for target in entry.depends_on.iter().chain(entry.requires.iter()) {
                if !declared.contains(target.as_str()) && !provided.contains(target.as_str()) {
                    return Err(SchedulerError::Config(format!(
                        "Module '{}' depends on undeclared '{}'",
                        entry.name, target
                    )));
                }
            }
        }

        let undeclared = self
            .scheduler
            .modules
            .iter()
            .flatten()
            .find(|name| !declared.contains(name.as_str()));
        if let Some(unknown) = undeclared {
            return Err(SchedulerError::Config(format!(
                "Requested module '{}' is not declared",
                unknown
            )));
        }

        Ok(())
    }

    /// The modules a run requests.
    #[must_use]
    pub fn requested(&self) -> BTreeSet<ModuleKey> {
        match &self.scheduler.modules {
            Some(names) => names.iter().map(|n| ModuleKey::from(n.as_str())).collect(),
            None => self.modules.iter().map(|m| ModuleKey::from(m.name.as_str())).collect(),
        }
    }

    /// Catalog constructing the declared modules. Provided names are not
    /// modules of the catalog, so they are read from the input registry
    /// instead of staged.
    #[must_use]
    pub fn provider(&self) -> ModuleCatalog {
        let mut catalog = ModuleCatalog::new();
        for entry in &self.modules {
            catalog.register(entry.definition());
        }
        catalog
    }

    /// Scheduler filling each run from this manifest.
    #[must_use]
    pub fn scheduler(&self) -> ManifestScheduler {
        ManifestScheduler {
            requested: self.requested(),
            provided: self.scheduler.provided.clone(),
            cycle_policy: self.scheduler.cycle_policy,
            failure_policy: self.scheduler.failure_policy,
            executed: Mutex::new(Vec::new()),
        }
    }

    /// Dependency graph of the requested modules.
    #[must_use]
    pub fn graph(&self) -> DependencyGraph {
        DependencyGraph::resolve(self.requested(), &self.provider())
    }
}

impl ModuleEntry {
    fn definition(&self) -> ModuleDefinition {
        let name = self.name.clone();
        let message = self.message.clone();
        let requires: Vec<ModuleKey> = self
            .requires
            .iter()
            .map(|n| ModuleKey::from(n.as_str()))
            .collect();
        let fail = self.fail;

        let constructor_requires = requires.clone();
        let mut definition = ModuleDefinition::new(self.name.as_str(), move |deps| {
            if fail {
                return Err(InstantiationError::Constructor(format!(
                    "module '{}' is configured to fail",
                    name
                )));
            }
            let inputs = constructor_requires
                .iter()
                .map(|key| input_label(deps, key))
                .collect::<Result<Vec<_>, _>>()?;
            Ok(ModuleInstance::new(ManifestModule {
                name: name.clone(),
                message: message.clone(),
                inputs,
            }))
        });

        for dependency in &self.depends_on {
            definition = definition.depends_on(dependency.as_str());
        }
        for parameter in requires {
            definition = definition.parameter(parameter);
        }
        definition
    }
}

/// What a required key resolved to: a constructed module or a provided value.
fn input_label(deps: &Dependencies<'_>, key: &ModuleKey) -> Result<String, InstantiationError> {
    if let Some(module) = deps.get::<ManifestModule>(key) {
        return Ok(module.name.clone());
    }
    let value = deps.require::<ProvidedValue>(key)?;
    Ok(value.name.clone())
}

// =============================================================================
// MANIFEST MODULES
// =============================================================================

/// A module declared in a manifest. Executing it logs its message.
#[derive(Debug)]
pub struct ManifestModule {
    name: String,
    message: Option<String>,
    inputs: Vec<String>,
}

impl ManifestModule {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Names of the values the constructor received, in `requires` order.
    #[must_use]
    pub fn inputs(&self) -> &[String] {
        &self.inputs
    }
}

impl Module for ManifestModule {
    fn execute(&self) {
        match &self.message {
            Some(message) => info!(module = %self.name, inputs = ?self.inputs, "{}", message),
            None => info!(module = %self.name, inputs = ?self.inputs, "Module executed"),
        }
    }
}

/// A value seeded into the input registry by `provided`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvidedValue {
    pub name: String,
}

// =============================================================================
// SCHEDULER
// =============================================================================

/// Fills run settings from a manifest and records what executed.
#[derive(Debug)]
pub struct ManifestScheduler {
    requested: BTreeSet<ModuleKey>,
    provided: Vec<String>,
    cycle_policy: CyclePolicy,
    failure_policy: FailurePolicy,
    executed: Mutex<Vec<ModuleKey>>,
}

impl ManifestScheduler {
    /// Modules whose `after` hook has fired, in order, across all runs.
    #[must_use]
    pub fn executed(&self) -> Vec<ModuleKey> {
        self.executed
            .lock()
            .map(|executed| executed.clone())
            .unwrap_or_default()
    }
}

impl ExecutionObserver for ManifestScheduler {
    fn before_module_execute(&self, module: &ModuleKey, instance: &ModuleInstance) {
        debug!(module = %module, type_name = instance.type_name(), "Executing module");
    }

    fn after_module_execute(&self, module: &ModuleKey, _instance: &ModuleInstance) {
        if let Ok(mut executed) = self.executed.lock() {
            executed.push(module.clone());
        }
    }
}

impl ModuleScheduler for ManifestScheduler {
    fn update_settings(&self, settings: &mut SchedulerSettings) {
        for module in &self.requested {
            settings.add_module(module.clone());
        }

        let mut inputs = Registry::new();
        for name in &self.provided {
            inputs.insert(name.as_str(), ProvidedValue { name: name.clone() });
        }
        settings.add_registry(inputs);

        settings.set_cycle_policy(self.cycle_policy);
        settings.set_failure_policy(self.failure_policy);
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[scheduler]
provided = ["clock"]
failure_policy = "abort"

[[module]]
name = "api"
depends_on = ["db"]
requires = ["clock", "db"]
message = "serving"

[[module]]
name = "db"
"#;

    #[test]
    fn parses_sections_and_defaults() {
        let manifest = Manifest::from_toml_str(SAMPLE).expect("valid manifest");

        assert_eq!(manifest.modules.len(), 2);
        assert_eq!(manifest.scheduler.cycle_policy, CyclePolicy::Abort);
        assert_eq!(manifest.scheduler.failure_policy, FailurePolicy::Abort);
        assert_eq!(manifest.modules[0].depends_on, vec!["db".to_string()]);
        assert!(!manifest.modules[1].fail);
        assert_eq!(manifest.modules[1].message, None);
    }

    #[test]
    fn requested_defaults_to_every_module() {
        let manifest = Manifest::from_toml_str(SAMPLE).expect("valid manifest");
        let requested: Vec<_> = manifest.requested().into_iter().collect();
        assert_eq!(requested, vec![ModuleKey::new("api"), ModuleKey::new("db")]);
    }

    #[test]
    fn provided_values_stay_out_of_the_graph() {
        let manifest = Manifest::from_toml_str(SAMPLE).expect("valid manifest");
        let graph = manifest.graph();

        assert_eq!(graph.len(), 2);
        assert!(!graph.contains(&"clock".into()));
        let api = graph.get(&"api".into()).expect("api");
        assert_eq!(api.dependencies().len(), 1);
    }

    #[test]
    fn update_settings_seeds_inputs_and_policies() {
        let manifest = Manifest::from_toml_str(SAMPLE).expect("valid manifest");
        let scheduler = manifest.scheduler();
        let mut settings = SchedulerSettings::new();

        scheduler.update_settings(&mut settings);

        assert_eq!(settings.modules().len(), 2);
        assert_eq!(settings.failure_policy(), FailurePolicy::Abort);
        let clock = settings.registries()[0]
            .get::<ProvidedValue>(&"clock".into())
            .expect("clock seeded");
        assert_eq!(clock.name, "clock");
    }

    #[test]
    fn rejects_duplicate_names() {
        let source = "[[module]]\nname = \"a\"\n\n[[module]]\nname = \"a\"\n";
        let result = Manifest::from_toml_str(source);
        assert!(matches!(result, Err(SchedulerError::Config(ref msg)) if msg.contains("twice")));
    }

    #[test]
    fn rejects_empty_name() {
        let result = Manifest::from_toml_str("[[module]]\nname = \" \"\n");
        assert!(matches!(result, Err(SchedulerError::Config(_))));
    }

    #[test]
    fn rejects_undeclared_requested_module() {
        let source = "[scheduler]\nmodules = [\"ghost\"]\n\n[[module]]\nname = \"a\"\n";
        let result = Manifest::from_toml_str(source);
        assert!(matches!(result, Err(SchedulerError::Config(ref msg)) if msg.contains("ghost")));
    }

    #[test]
    fn rejects_undeclared_dependency() {
        let source = "[[module]]\nname = \"a\"\ndepends_on = [\"b\"]\n";
        let result = Manifest::from_toml_str(source);
        assert!(matches!(result, Err(SchedulerError::Config(ref msg)) if msg.contains("'b'")));
    }

    #[test]
    fn rejects_unknown_policy() {
        let source = "[scheduler]\ncycle_policy = \"ignore\"\n";
        let result = Manifest::from_toml_str(source);
        assert!(matches!(result, Err(SchedulerError::Config(_))));
    }

    #[test]
    fn rejects_unknown_fields() {
        let result = Manifest::from_toml_str("[[module]]\nname = \"a\"\nretries = 3\n");
        assert!(matches!(result, Err(SchedulerError::Config(_))));
    }
}
