//! # Scheduler Pipeline
//!
//! Runs one scheduling pass in the background:
//!
//! ```text
//! spawn ──► [tokio task] update_settings ─► resolve ─► stage
//!                                                        │
//!                              [blocking task] run ◄─────┘
//! ```
//!
//! The caller gets a [`RunHandle`] back immediately and may await it for the
//! run report. Every run builds fresh settings, so runs never share registries.

use modsched_core::{
    DependencyGraph, ExecutionObserver, ModuleProvider, RunReport, SchedulerError,
    SchedulerSettings, StageRunner, stage_modules,
};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

// =============================================================================
// MODULE SCHEDULER
// =============================================================================

/// Observer that also decides what a run contains.
pub trait ModuleScheduler: ExecutionObserver + 'static {
    /// Fill a fresh settings object: requested modules, registries, policies.
    fn update_settings(&self, settings: &mut SchedulerSettings);
}

// =============================================================================
// SCHEDULER
// =============================================================================

/// Entry point for background runs.
pub struct Scheduler;

impl Scheduler {
    /// Start a run and return without waiting for it.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn<S, P>(scheduler: Arc<S>, provider: Arc<P>) -> RunHandle
    where
        S: ModuleScheduler,
        P: ModuleProvider + Send + Sync + 'static,
    {
        let handle = tokio::spawn(plan_and_run(scheduler, provider));
        RunHandle { handle }
    }
}

async fn plan_and_run<S, P>(scheduler: Arc<S>, provider: Arc<P>) -> Result<RunReport, SchedulerError>
where
    S: ModuleScheduler,
    P: ModuleProvider + Send + Sync + 'static,
{
    let mut settings = SchedulerSettings::new();
    scheduler.update_settings(&mut settings);
    debug!(
        requested = settings.modules().len(),
        registries = settings.registries().len(),
        "Settings updated"
    );

    let graph = DependencyGraph::resolve(settings.modules().iter().cloned(), &*provider);
    let plan = stage_modules(&graph, settings.cycle_policy())?;
    info!(
        modules = graph.len(),
        stages = plan.len(),
        "Plan ready, starting execution"
    );

    let execution = tokio::task::spawn_blocking(move || {
        StageRunner::from_settings(&*provider, &*scheduler, &settings).run(&plan)
    });

    execution
        .await
        .map_err(|e| SchedulerError::TaskFailed(e.to_string()))?
}

// =============================================================================
// RUN HANDLE
// =============================================================================

/// Handle to a run started by [`Scheduler::spawn`].
#[derive(Debug)]
pub struct RunHandle {
    handle: JoinHandle<Result<RunReport, SchedulerError>>,
}

impl RunHandle {
    /// Wait for the run to finish.
    pub async fn wait(self) -> Result<RunReport, SchedulerError> {
        self.handle
            .await
            .map_err(|e| SchedulerError::TaskFailed(e.to_string()))?
    }

    /// `true` once the run has completed, successfully or not.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }
}
