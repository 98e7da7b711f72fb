//! # Staging
//!
//! Levels a [`DependencyGraph`] into a [`StagePlan`].
//!
//! ## Algorithm
//!
//! 1. Every module without dependencies is placed directly: level 0 when
//!    nothing depends on it either, level 1 otherwise. Level-1 modules are
//!    the roots propagation starts from.
//! 2. With nothing placed at level 0 or 1 there is no starting point and
//!    staging fails.
//! 3. From each root, a depth-first walk over dependents assigns
//!    `level + 1` to each dependent. A module keeps the highest level any
//!    path gives it; a lower assignment is ignored and its subtree is not
//!    walked again, since it was already walked at least that deep.
//! 4. Reaching a module that is still on the open branch closes a cycle.
//!    The edge is not followed; what happens next is the [`CyclePolicy`].
//! 5. Modules still unplaced after every walk sit behind a cycle no root
//!    reaches; the cycle among them is looked up and handled by the same
//!    policy.

use crate::path::PathTrace;
use crate::{
    CyclePolicy, DependencyCycle, DependencyGraph, ModuleDescriptor, ModuleKey, SchedulerError,
    StagePlan,
};
use std::collections::{BTreeMap, BTreeSet, btree_set};
use tracing::{debug, info, warn};

/// Level for modules with no dependencies and no dependents.
pub const ISOLATED_LEVEL: u32 = 0;

/// Level for modules with no dependencies but at least one dependent.
pub const ROOT_LEVEL: u32 = 1;

/// Level `graph` with the given cycle policy.
pub fn stage_modules(
    graph: &DependencyGraph,
    policy: CyclePolicy,
) -> Result<StagePlan, SchedulerError> {
    Staging::new(graph, policy).stage()
}

/// A module on the open branch and the dependents still to visit from it.
struct Frame<'g> {
    level: u32,
    dependents: btree_set::Iter<'g, ModuleKey>,
}

/// One leveling pass over a graph.
pub struct Staging<'g> {
    graph: &'g DependencyGraph,
    policy: CyclePolicy,
    /// Highest level assigned so far, per module.
    highest: BTreeMap<ModuleKey, u32>,
    cycles: Vec<DependencyCycle>,
    /// Canonical forms of the reported cycles.
    seen_cycles: BTreeSet<DependencyCycle>,
}

impl<'g> Staging<'g> {
    #[must_use]
    pub fn new(graph: &'g DependencyGraph, policy: CyclePolicy) -> Self {
        Self {
            graph,
            policy,
            highest: BTreeMap::new(),
            cycles: Vec::new(),
            seen_cycles: BTreeSet::new(),
        }
    }

    /// Run the pass.
    pub fn stage(mut self) -> Result<StagePlan, SchedulerError> {
        let graph = self.graph;
        if graph.is_empty() {
            return Err(SchedulerError::NoModules);
        }

        let mut roots = Vec::new();
        for descriptor in graph.descriptors() {
            if descriptor.is_isolated() {
                self.record(ISOLATED_LEVEL, descriptor.key());
            } else if descriptor.is_root() {
                self.record(ROOT_LEVEL, descriptor.key());
                roots.push(descriptor);
            }
        }

        if self.highest.is_empty() {
            return Err(SchedulerError::NoStartingStage {
                cycle: graph.find_cycle(),
            });
        }

        for root in roots {
            self.propagate(root)?;
        }

        let unstaged: BTreeSet<ModuleKey> = graph
            .keys()
            .filter(|key| !self.highest.contains_key(*key))
            .cloned()
            .collect();
        if !unstaged.is_empty() {
            if let Some(cycle) = graph.find_cycle_among(&unstaged) {
                self.report_cycle(cycle)?;
            }
            warn!(
                count = unstaged.len(),
                "Modules left unstaged: no root reaches them"
            );
        }

        info!(
            modules = self.highest.len(),
            levels = self.highest.values().max().copied().unwrap_or(0),
            cycles = self.cycles.len(),
            "Modules staged"
        );
        Ok(StagePlan::new(self.highest, self.cycles, unstaged))
    }

    /// Assign `level` to `key` unless it already has that level or higher.
    ///
    /// Returns `true` when the assignment took effect.
    fn record(&mut self, level: u32, key: &ModuleKey) -> bool {
        match self.highest.get(key) {
            Some(current) if *current >= level => false,
            _ => {
                self.highest.insert(key.clone(), level);
                debug!(module = %key, level, "Stage assigned");
                true
            }
        }
    }

    /// Depth-first walk over dependents from one root, on an explicit stack
    /// of frames so chain length is bounded by the heap, not the thread stack.
    fn propagate(&mut self, root: &'g ModuleDescriptor) -> Result<(), SchedulerError> {
        let graph = self.graph;
        let mut trace = PathTrace::starting_at(root.key().clone());
        let mut frames = vec![Frame {
            level: ROOT_LEVEL,
            dependents: root.dependents().iter(),
        }];

        while let Some(frame) = frames.last_mut() {
            let level = frame.level;
            let Some(key) = frame.dependents.next() else {
                frames.pop();
                trace.pop();
                continue;
            };

            if let Some(cycle) = trace.cycle_from(key) {
                self.report_cycle(cycle)?;
                continue;
            }
            let next = level.saturating_add(1);
            if !self.record(next, key) {
                continue;
            }
            let Some(dependent) = graph.get(key) else {
                continue;
            };

            trace.push(key.clone());
            frames.push(Frame {
                level: next,
                dependents: dependent.dependents().iter(),
            });
        }
        Ok(())
    }

    fn report_cycle(&mut self, cycle: DependencyCycle) -> Result<(), SchedulerError> {
        match self.policy {
            CyclePolicy::Abort => Err(SchedulerError::Cycle(cycle)),
            CyclePolicy::Report => {
                if self.seen_cycles.insert(cycle.canonical()) {
                    warn!(cycle = %cycle, "Dependency cycle detected");
                    self.cycles.push(cycle);
                }
                Ok(())
            }
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================
