//! # Property-Based Tests
//!
//! Leveling invariants checked with proptest over random acyclic graphs and
//! random dependency rings.

#![allow(clippy::panic)]

use modsched_core::{
    CyclePolicy, DependencyGraph, ModuleKey, SchedulerError, StagePlan, stage_modules,
};
use proptest::collection::vec;
use proptest::prelude::*;
use std::collections::{BTreeMap, BTreeSet};

// =============================================================================
// HELPERS
// =============================================================================

fn key(index: usize) -> ModuleKey {
    ModuleKey::new(format!("m{:02}", index))
}

/// Graph over `n` modules. A pair `(a, b)` with `a > b` means "a depends on b".
/// `a == b` declares a self-edge, which the graph must drop; `a < b` is ignored
/// so the graph stays acyclic.
fn acyclic_graph(n: usize, pairs: &[(usize, usize)]) -> DependencyGraph {
    let mut graph = DependencyGraph::new();
    for i in 0..n {
        graph.insert_module(key(i));
    }
    for &(a, b) in pairs {
        if a >= b {
            graph.add_dependency(&key(a), key(b));
        }
    }
    graph
}

/// Level computed straight from the definition, independent of the leveler.
fn expected_level(
    graph: &DependencyGraph,
    module: &ModuleKey,
    memo: &mut BTreeMap<ModuleKey, u32>,
) -> u32 {
    if let Some(level) = memo.get(module) {
        return *level;
    }
    let descriptor = graph.get(module).expect("module in graph");
    let level = if descriptor.is_isolated() {
        0
    } else if descriptor.is_root() {
        1
    } else {
        let deepest = descriptor
            .dependencies()
            .iter()
            .map(|dep| expected_level(graph, dep, memo))
            .max()
            .unwrap_or(0);
        deepest + 1
    };
    memo.insert(module.clone(), level);
    level
}

fn level(plan: &StagePlan, module: &ModuleKey) -> u32 {
    plan.level_of(module).expect("module staged")
}

fn dag() -> impl Strategy<Value = (usize, Vec<(usize, usize)>)> {
    (1usize..24).prop_flat_map(|n| (Just(n), vec((0..n, 0..n), 0..64)))
}

// =============================================================================
// PROPERTY TESTS
// =============================================================================

proptest! {
    /// Every module's level matches the isolated / root / longest-chain rule.
    #[test]
    fn levels_follow_longest_dependency_chain((n, pairs) in dag()) {
        let graph = acyclic_graph(n, &pairs);
        let plan = stage_modules(&graph, CyclePolicy::Abort).expect("acyclic graph stages");

        let mut memo = BTreeMap::new();
        for module in graph.keys() {
            prop_assert_eq!(level(&plan, module), expected_level(&graph, module, &mut memo));
        }
    }

    /// Exactly one stage per module, in (level, key) order.
    #[test]
    fn one_ordered_stage_per_module((n, pairs) in dag()) {
        let graph = acyclic_graph(n, &pairs);
        let plan = stage_modules(&graph, CyclePolicy::Abort).expect("plan");

        prop_assert_eq!(plan.len(), graph.len());
        let modules: BTreeSet<_> = plan.iter().map(|stage| stage.module.clone()).collect();
        prop_assert_eq!(modules.len(), graph.len());

        let stages: Vec<_> = plan.iter().collect();
        for pair in stages.windows(2) {
            prop_assert!((pair[0].level, &pair[0].module) < (pair[1].level, &pair[1].module));
        }
        prop_assert!(plan.cycles().is_empty());
        prop_assert!(plan.unstaged().is_empty());
    }

    /// A dependency always runs in an earlier stage than its dependent.
    #[test]
    fn dependencies_precede_dependents((n, pairs) in dag()) {
        let graph = acyclic_graph(n, &pairs);
        let plan = stage_modules(&graph, CyclePolicy::Abort).expect("plan");

        for descriptor in graph.descriptors() {
            for dependency in descriptor.dependencies() {
                prop_assert!(level(&plan, dependency) < level(&plan, descriptor.key()));
            }
        }
    }

    /// Staging the same graph twice gives the same plan.
    #[test]
    fn staging_is_idempotent((n, pairs) in dag()) {
        let graph = acyclic_graph(n, &pairs);
        let first = stage_modules(&graph, CyclePolicy::Abort).expect("first");
        let second = stage_modules(&graph, CyclePolicy::Abort).expect("second");
        prop_assert_eq!(first, second);
    }

    /// No descriptor ever lists itself.
    #[test]
    fn graph_never_holds_self_edges((n, pairs) in dag()) {
        let graph = acyclic_graph(n, &pairs);
        for descriptor in graph.descriptors() {
            prop_assert!(!descriptor.dependencies().contains(descriptor.key()));
            prop_assert!(!descriptor.dependents().contains(descriptor.key()));
        }
    }

    /// A ring with no way in has no starting stage; the error names exactly
    /// the ring's modules.
    #[test]
    fn ring_reports_exactly_its_members(size in 2usize..10) {
        let mut graph = DependencyGraph::new();
        for i in 0..size {
            graph.add_dependency(&key(i), key((i + 1) % size));
        }

        let result = stage_modules(&graph, CyclePolicy::Abort);
        let Err(SchedulerError::NoStartingStage { cycle: Some(cycle) }) = result else {
            panic!("expected NoStartingStage with a cycle, got {:?}", result);
        };
        let members: BTreeSet<_> = cycle.modules().iter().cloned().collect();
        let expected: BTreeSet<_> = (0..size).map(key).collect();
        prop_assert_eq!(cycle.len(), size);
        prop_assert_eq!(members, expected);
    }

    /// A ring fed by a root is caught while propagating.
    #[test]
    fn ring_behind_root_is_caught(size in 2usize..10) {
        let mut graph = DependencyGraph::new();
        for i in 0..size {
            graph.add_dependency(&key(i), key((i + 1) % size));
        }
        graph.add_dependency(&key(0), ModuleKey::new("root"));

        let aborted = stage_modules(&graph, CyclePolicy::Abort);
        prop_assert!(matches!(aborted, Err(SchedulerError::Cycle(ref c)) if c.len() == size));

        let plan = stage_modules(&graph, CyclePolicy::Report).expect("reported plan");
        prop_assert_eq!(plan.cycles().len(), 1);
        prop_assert_eq!(plan.len(), size + 1);
    }
}
