//! # Dependency Resolver
//!
//! Builds the [`DependencyGraph`] for a set of requested modules.
//!
//! The declared dependencies of each module come from an injected
//! [`DependencySource`]. Dependencies discovered along the way are resolved
//! too, so the graph is closed under "depends on". Every edge is stored in both
//! directions.

use crate::path::PathTrace;
use crate::{DependencyCycle, ModuleDescriptor, ModuleKey};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use tracing::debug;

// =============================================================================
// DEPENDENCY SOURCE
// =============================================================================

/// Supplies the declared dependencies of a module.
///
/// Implementations return the union of every declaration mechanism they
/// support, without duplicates. An unknown module has no dependencies.
pub trait DependencySource {
    fn declared_dependencies(&self, module: &ModuleKey) -> Vec<ModuleKey>;
}

impl<F> DependencySource for F
where
    F: Fn(&ModuleKey) -> Vec<ModuleKey>,
{
    fn declared_dependencies(&self, module: &ModuleKey) -> Vec<ModuleKey> {
        self(module)
    }
}

// =============================================================================
// DEPENDENCY GRAPH
// =============================================================================

/// Map from module key to descriptor, iterated in key order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct DependencyGraph {
    descriptors: BTreeMap<ModuleKey, ModuleDescriptor>,
}

impl DependencyGraph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve `modules` and everything they transitively depend on.
    pub fn resolve<I, K, S>(modules: I, source: &S) -> Self
    where
        I: IntoIterator<Item = K>,
        K: Into<ModuleKey>,
        S: DependencySource + ?Sized,
    {
        let mut graph = Self::new();
        let mut pending = VecDeque::new();
        let mut resolved = BTreeSet::new();

        for module in modules {
            let key = module.into();
            graph.insert_module(key.clone());
            pending.push_back(key);
        }

        while let Some(key) = pending.pop_front() {
            if !resolved.insert(key.clone()) {
                continue;
            }
            for dependency in source.declared_dependencies(&key) {
                if graph.add_dependency(&key, dependency.clone()) {
                    debug!(module = %key, dependency = %dependency, "Dependency declared");
                }
                if !resolved.contains(&dependency) {
                    pending.push_back(dependency);
                }
            }
        }

        debug!(modules = graph.len(), "Dependency graph resolved");
        graph
    }

    /// Add a module with no edges. Returns `false` if it already exists.
    pub fn insert_module(&mut self, key: ModuleKey) -> bool {
        if self.descriptors.contains_key(&key) {
            return false;
        }
        self.descriptors
            .insert(key.clone(), ModuleDescriptor::new(key));
        true
    }

    /// Record that `module` depends on `dependency`, creating either
    /// descriptor on first reference.
    ///
    /// Returns `false` for a self-reference (which is dropped) or an edge
    /// that already exists.
    pub fn add_dependency(&mut self, module: &ModuleKey, dependency: ModuleKey) -> bool {
        self.insert_module(module.clone());
        if *module == dependency {
            return false;
        }
        self.insert_module(dependency.clone());

        let added = self
            .descriptors
            .get_mut(module)
            .is_some_and(|descriptor| descriptor.add_dependency(dependency.clone()));
        if let Some(descriptor) = self.descriptors.get_mut(&dependency) {
            descriptor.add_dependent(module.clone());
        }
        added
    }

    #[must_use]
    pub fn get(&self, key: &ModuleKey) -> Option<&ModuleDescriptor> {
        self.descriptors.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &ModuleKey) -> bool {
        self.descriptors.contains_key(key)
    }

    /// All descriptors in key order.
    pub fn descriptors(&self) -> impl Iterator<Item = &ModuleDescriptor> {
        self.descriptors.values()
    }

    /// All module keys in order.
    pub fn keys(&self) -> impl Iterator<Item = &ModuleKey> {
        self.descriptors.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }

    /// Total number of dependency edges.
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.descriptors
            .values()
            .map(|descriptor| descriptor.dependencies().len())
            .sum()
    }

    /// First cycle found anywhere in the graph, following dependency edges.
    #[must_use]
    pub fn find_cycle(&self) -> Option<DependencyCycle> {
        let all: BTreeSet<ModuleKey> = self.descriptors.keys().cloned().collect();
        self.find_cycle_among(&all)
    }

    /// First cycle whose modules all belong to `among`.
    ///
    /// The search starts from the smallest key and follows dependencies in
    /// key order, so the result is deterministic.
    #[must_use]
    pub fn find_cycle_among(&self, among: &BTreeSet<ModuleKey>) -> Option<DependencyCycle> {
        let mut finished = BTreeSet::new();
        for key in among {
            if finished.contains(key) {
                continue;
            }
            if let Some(cycle) = self.search_cycle(key, among, &mut finished) {
                return Some(cycle);
            }
        }
        None
    }

    /// Depth-first search from `start` over dependencies inside `among`,
    /// with an explicit stack of dependency iterators.
    fn search_cycle(
        &self,
        start: &ModuleKey,
        among: &BTreeSet<ModuleKey>,
        finished: &mut BTreeSet<ModuleKey>,
    ) -> Option<DependencyCycle> {
        let Some(descriptor) = self.descriptors.get(start) else {
            finished.insert(start.clone());
            return None;
        };
        let mut trace = PathTrace::starting_at(start.clone());
        let mut frames = vec![descriptor.dependencies().iter()];

        while let Some(dependencies) = frames.last_mut() {
            let Some(dependency) = dependencies.next() else {
                frames.pop();
                if let Some(done) = trace.pop() {
                    finished.insert(done);
                }
                continue;
            };

            if let Some(cycle) = trace.cycle_from(dependency) {
                return Some(cycle);
            }
            if finished.contains(dependency) || !among.contains(dependency) {
                continue;
            }
            match self.descriptors.get(dependency) {
                Some(next) => {
                    trace.push(dependency.clone());
                    frames.push(next.dependencies().iter());
                }
                None => {
                    finished.insert(dependency.clone());
                }
            }
        }
        None
    }
}

// =============================================================================
// TESTS
// =============================================================================
