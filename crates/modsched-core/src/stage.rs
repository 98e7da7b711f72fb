//! # Stages
//!
//! A [`Stage`] pairs a module with its load level. A [`StagePlan`] is the
//! ordered outcome of leveling: one stage per staged module, plus whatever
//! the leveler reported along the way.
//!
//! ## Level Semantics
//!
//! | Level | Meaning |
//! |-------|---------|
//! | 0 | No dependencies and no dependents |
//! | 1 | No dependencies, at least one dependent |
//! | n > 1 | 1 + the longest dependency chain ending at the module |

use crate::{DependencyCycle, ModuleKey};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// =============================================================================
// STAGE
// =============================================================================

/// A module at a load level.
///
/// Ordered by level, then by module key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct Stage {
    /// Load level.
    pub level: u32,
    /// Module loaded at this level.
    pub module: ModuleKey,
}

impl Stage {
    #[must_use]
    pub fn new(level: u32, module: ModuleKey) -> Self {
        Self { level, module }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stage {}: {}", self.level, self.module)
    }
}

// =============================================================================
// STAGE PLAN
// =============================================================================

/// The ordered result of leveling a dependency graph.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StagePlan {
    stages: BTreeSet<Stage>,
    /// Level per staged module.
    #[serde(skip)]
    levels_by_module: BTreeMap<ModuleKey, u32>,
    /// Cycles reported while leveling under `CyclePolicy::Report`.
    cycles: Vec<DependencyCycle>,
    /// Modules no root reaches; only possible behind a reported cycle.
    unstaged: BTreeSet<ModuleKey>,
}

impl StagePlan {
    /// Plan from the final level of each staged module.
    pub(crate) fn new(
        levels_by_module: BTreeMap<ModuleKey, u32>,
        cycles: Vec<DependencyCycle>,
        unstaged: BTreeSet<ModuleKey>,
    ) -> Self {
        let stages = levels_by_module
            .iter()
            .map(|(module, level)| Stage::new(*level, module.clone()))
            .collect();
        Self {
            stages,
            levels_by_module,
            cycles,
            unstaged,
        }
    }

    /// Stages in execution order.
    pub fn iter(&self) -> impl Iterator<Item = &Stage> {
        self.stages.iter()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Level assigned to `module`, if it was staged.
    #[must_use]
    pub fn level_of(&self, module: &ModuleKey) -> Option<u32> {
        self.levels_by_module.get(module).copied()
    }

    /// Modules grouped by level, each group in key order.
    #[must_use]
    pub fn levels(&self) -> BTreeMap<u32, Vec<ModuleKey>> {
        let mut levels: BTreeMap<u32, Vec<ModuleKey>> = BTreeMap::new();
        for stage in &self.stages {
            levels
                .entry(stage.level)
                .or_default()
                .push(stage.module.clone());
        }
        levels
    }

    /// Highest level in the plan.
    #[must_use]
    pub fn max_level(&self) -> Option<u32> {
        self.stages.iter().map(|stage| stage.level).max()
    }

    /// Modules in execution order.
    #[must_use]
    pub fn execution_order(&self) -> Vec<ModuleKey> {
        self.stages.iter().map(|stage| stage.module.clone()).collect()
    }

    #[must_use]
    pub fn cycles(&self) -> &[DependencyCycle] {
        &self.cycles
    }

    #[must_use]
    pub fn unstaged(&self) -> &BTreeSet<ModuleKey> {
        &self.unstaged
    }
}

impl<'a> IntoIterator for &'a StagePlan {
    type Item = &'a Stage;
    type IntoIter = std::collections::btree_set::Iter<'a, Stage>;

    fn into_iter(self) -> Self::IntoIter {
        self.stages.iter()
    }
}

impl fmt::Display for StagePlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (level, modules) in self.levels() {
            let names: Vec<&str> = modules.iter().map(ModuleKey::as_str).collect();
            writeln!(f, "stage {}: {}", level, names.join(", "))?;
        }
        Ok(())
    }
}
