//! # Stage Runner
//!
//! Walks a [`StagePlan`] in order. Each module is constructed from the
//! registries visible at its stage, registered so later stages can use it,
//! and executed between the observer's hooks. Everything happens on the
//! calling thread, one module at a time.

use crate::{
    Dependencies, FailurePolicy, InstantiationError, Instantiator, ModuleInstance, ModuleKey,
    Registry, SchedulerError, SchedulerSettings, StagePlan,
};
use tracing::{debug, info, warn};

// =============================================================================
// OBSERVER
// =============================================================================

/// Hooks invoked around every module's execution.
pub trait ExecutionObserver: Send + Sync {
    /// Called after the module is registered, right before it executes.
    fn before_module_execute(&self, _module: &ModuleKey, _instance: &ModuleInstance) {}

    /// Called right after the module returns from `execute`.
    fn after_module_execute(&self, _module: &ModuleKey, _instance: &ModuleInstance) {}
}

/// Observer with no hooks.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ExecutionObserver for NoopObserver {}

// =============================================================================
// RUN REPORT
// =============================================================================

/// A module that could not be constructed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleFailure {
    pub module: ModuleKey,
    pub level: u32,
    pub error: InstantiationError,
}

/// Outcome of running a plan.
#[derive(Debug, Clone, Default)]
pub struct RunReport {
    executed: Vec<ModuleKey>,
    failures: Vec<ModuleFailure>,
    output: Registry,
}

impl RunReport {
    /// Modules that executed, in order.
    #[must_use]
    pub fn executed(&self) -> &[ModuleKey] {
        &self.executed
    }

    /// Modules skipped because construction failed, in stage order.
    #[must_use]
    pub fn failures(&self) -> &[ModuleFailure] {
        &self.failures
    }

    /// Snapshot of the output registry at the end of the run.
    #[must_use]
    pub fn output(&self) -> &Registry {
        &self.output
    }

    #[must_use]
    pub fn into_output(self) -> Registry {
        self.output
    }

    /// `true` when every staged module executed.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

// =============================================================================
// STAGE RUNNER
// =============================================================================

/// Runs the stages of one plan.
pub struct StageRunner<'a> {
    instantiator: &'a dyn Instantiator,
    observer: &'a dyn ExecutionObserver,
    inputs: &'a [Registry],
    /// Modules constructed during this run.
    temporary: Registry,
    output: Registry,
    policy: FailurePolicy,
}

impl<'a> StageRunner<'a> {
    #[must_use]
    pub fn new(
        instantiator: &'a dyn Instantiator,
        observer: &'a dyn ExecutionObserver,
        inputs: &'a [Registry],
    ) -> Self {
        Self {
            instantiator,
            observer,
            inputs,
            temporary: Registry::new(),
            output: Registry::new(),
            policy: FailurePolicy::default(),
        }
    }

    /// Runner configured from `settings`: its input registries, a snapshot
    /// of its output registry, and its failure policy.
    #[must_use]
    pub fn from_settings(
        instantiator: &'a dyn Instantiator,
        observer: &'a dyn ExecutionObserver,
        settings: &'a SchedulerSettings,
    ) -> Self {
        Self::new(instantiator, observer, settings.registries())
            .with_output(settings.output_registry())
            .with_policy(settings.failure_policy())
    }

    #[must_use]
    pub fn with_output(mut self, output: Registry) -> Self {
        self.output = output;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Construct and execute every stage of `plan`, in order.
    pub fn run(mut self, plan: &StagePlan) -> Result<RunReport, SchedulerError> {
        let mut executed = Vec::with_capacity(plan.len());
        let mut failures = Vec::new();

        for stage in plan {
            let constructed = {
                let deps = Dependencies::new(self.inputs, &self.temporary);
                self.instantiator.instantiate(&stage.module, &deps)
            };

            let instance = match constructed {
                Ok(instance) => instance,
                Err(error) => {
                    warn!(
                        module = %stage.module,
                        level = stage.level,
                        error = %error,
                        "Module skipped: instantiation failed"
                    );
                    if self.policy == FailurePolicy::Abort {
                        return Err(SchedulerError::Instantiation {
                            module: stage.module.clone(),
                            source: error,
                        });
                    }
                    failures.push(ModuleFailure {
                        module: stage.module.clone(),
                        level: stage.level,
                        error,
                    });
                    continue;
                }
            };

            self.temporary.register(stage.module.clone(), &instance);
            self.output.register(stage.module.clone(), &instance);

            self.observer.before_module_execute(&stage.module, &instance);
            instance.execute();
            self.observer.after_module_execute(&stage.module, &instance);

            debug!(module = %stage.module, level = stage.level, "Module executed");
            executed.push(stage.module.clone());
        }

        info!(
            executed = executed.len(),
            failed = failures.len(),
            "Stages run"
        );
        Ok(RunReport {
            executed,
            failures,
            output: self.output,
        })
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::{
        CyclePolicy, DependencyGraph, Module, ModuleCatalog, ModuleDefinition, stage_modules,
    };
    use std::sync::{Arc, Mutex};

    /// Records hook and execution events in order.
    #[derive(Default)]
    struct Journal {
        events: Mutex<Vec<String>>,
    }

    impl Journal {
        fn push(&self, event: String) {
            if let Ok(mut events) = self.events.lock() {
                events.push(event);
            }
        }

        fn events(&self) -> Vec<String> {
            self.events.lock().map(|e| e.clone()).unwrap_or_default()
        }
    }

    impl ExecutionObserver for Journal {
        fn before_module_execute(&self, module: &ModuleKey, _instance: &ModuleInstance) {
            self.push(format!("before {}", module));
        }

        fn after_module_execute(&self, module: &ModuleKey, _instance: &ModuleInstance) {
            self.push(format!("after {}", module));
        }
    }

    struct Step {
        name: &'static str,
        journal: Arc<Journal>,
    }

    impl Module for Step {
        fn execute(&self) {
            self.journal.push(format!("execute {}", self.name));
        }
    }

    fn step(name: &'static str, journal: &Arc<Journal>) -> ModuleDefinition {
        let journal = Arc::clone(journal);
        ModuleDefinition::new(name, move |_| {
            Ok(ModuleInstance::new(Step {
                name,
                journal: Arc::clone(&journal),
            }))
        })
    }

    fn plan_for(catalog: &ModuleCatalog) -> StagePlan {
        let graph = DependencyGraph::resolve(catalog.keys().cloned().collect::<Vec<_>>(), catalog);
        stage_modules(&graph, CyclePolicy::Abort).expect("plan")
    }

    #[test]
    fn hooks_wrap_execution_in_stage_order() {
        let journal = Arc::new(Journal::default());
        let catalog = ModuleCatalog::new()
            .with(step("b", &journal).depends_on("a"))
            .with(step("a", &journal));
        let plan = plan_for(&catalog);

        let report = StageRunner::new(&catalog, &*journal, &[])
            .run(&plan)
            .expect("run");

        assert_eq!(report.executed(), &[ModuleKey::new("a"), ModuleKey::new("b")]);
        assert_eq!(
            journal.events(),
            vec![
                "before a",
                "execute a",
                "after a",
                "before b",
                "execute b",
                "after b"
            ]
        );
        assert_eq!(report.output().len(), 2);
    }

    #[test]
    fn failed_module_is_skipped_and_run_continues() {
        let journal = Arc::new(Journal::default());
        let catalog = ModuleCatalog::new()
            .with(step("a", &journal))
            .with(ModuleDefinition::new("broken", |_| {
                Err(InstantiationError::Constructor("boom".to_string()))
            }))
            .with(step("c", &journal).depends_on("a"));
        let plan = plan_for(&catalog);

        let report = StageRunner::new(&catalog, &NoopObserver, &[])
            .run(&plan)
            .expect("run");

        assert_eq!(report.executed(), &[ModuleKey::new("a"), ModuleKey::new("c")]);
        assert_eq!(report.failures().len(), 1);
        assert_eq!(report.failures()[0].module, ModuleKey::new("broken"));
        assert_eq!(report.failures()[0].level, 0);
        assert!(!report.output().contains(&"broken".into()));
        assert!(!report.is_complete());
    }

    #[test]
    fn abort_policy_stops_at_first_failure() {
        let journal = Arc::new(Journal::default());
        let catalog = ModuleCatalog::new()
            .with(step("a", &journal))
            .with(step("b", &journal).depends_on("a").parameter("missing"));
        let graph = DependencyGraph::resolve(["b"], &catalog);
        let plan = stage_modules(&graph, CyclePolicy::Abort).expect("plan");

        let result = StageRunner::new(&catalog, &NoopObserver, &[])
            .with_policy(FailurePolicy::Abort)
            .run(&plan);

        // "missing" names no module, so only "a" and "b" are staged.
        let Err(SchedulerError::Instantiation { module, source }) = result else {
            panic!("expected an instantiation error, got {:?}", result);
        };
        assert_eq!(plan.len(), 2);
        assert_eq!(module, ModuleKey::new("b"));
        assert_eq!(
            source,
            InstantiationError::MissingDependency {
                dependency: "missing".into()
            }
        );
        assert_eq!(journal.events(), vec!["execute a"]);
    }

    #[test]
    fn inputs_feed_constructors_and_output_starts_from_settings() {
        struct Greeter {
            greeting: Arc<String>,
        }
        impl Module for Greeter {
            fn execute(&self) {}
        }

        let catalog = ModuleCatalog::new().with(
            ModuleDefinition::new("greeter", |deps| {
                let greeting = deps.require::<String>(&"greeting".into())?;
                Ok(ModuleInstance::new(Greeter { greeting }))
            })
            .parameter("greeting"),
        );

        let mut input = Registry::new();
        input.insert("greeting", "hello".to_string());
        let mut output = Registry::new();
        output.insert("preexisting", 7u32);

        let mut settings = SchedulerSettings::new();
        settings.add_module("greeter");
        settings.add_registry(input);
        settings.set_output_registry(output);
        settings.set_failure_policy(FailurePolicy::Abort);

        let graph = DependencyGraph::resolve(settings.modules().iter().cloned(), &catalog);
        let plan = stage_modules(&graph, settings.cycle_policy()).expect("plan");

        let report = StageRunner::from_settings(&catalog, &NoopObserver, &settings)
            .run(&plan)
            .expect("run");

        // "greeting" names no module: it stays out of the plan and the
        // constructor reads it from the input registry.
        assert_eq!(plan.len(), 1);
        assert_eq!(plan.level_of(&"greeter".into()), Some(0));
        assert!(report.is_complete());
        assert_eq!(report.executed(), &[ModuleKey::new("greeter")]);
        let greeter = report
            .output()
            .get::<Greeter>(&"greeter".into())
            .expect("greeter registered");
        assert_eq!(greeter.greeting.as_str(), "hello");
        assert!(report.output().contains(&"preexisting".into()));
        assert!(settings.output_registry().get::<Greeter>(&"greeter".into()).is_none());
    }
}
