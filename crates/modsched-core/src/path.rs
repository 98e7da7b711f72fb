//! # Path Tracing
//!
//! The open branch of a depth-first walk, kept as an explicit stack plus a
//! membership set. Revisiting a module that is still on the stack closes a
//! cycle; the slice of the stack from that module onward is the chain.

use crate::{DependencyCycle, ModuleKey};
use std::collections::BTreeSet;

/// The currently open DFS branch.
#[derive(Debug, Clone, Default)]
pub struct PathTrace {
    path: Vec<ModuleKey>,
    open: BTreeSet<ModuleKey>,
}

impl PathTrace {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A trace whose branch starts at `key`.
    #[must_use]
    pub fn starting_at(key: ModuleKey) -> Self {
        let mut trace = Self::new();
        trace.push(key);
        trace
    }

    /// Extend the branch. Returns `false`, leaving the trace untouched, when
    /// the module is already open.
    pub fn push(&mut self, key: ModuleKey) -> bool {
        if !self.open.insert(key.clone()) {
            return false;
        }
        self.path.push(key);
        true
    }

    /// Close the innermost module of the branch.
    pub fn pop(&mut self) -> Option<ModuleKey> {
        let key = self.path.pop()?;
        self.open.remove(&key);
        Some(key)
    }

    #[must_use]
    pub fn contains(&self, key: &ModuleKey) -> bool {
        self.open.contains(key)
    }

    #[must_use]
    pub fn depth(&self) -> usize {
        self.path.len()
    }

    /// The open branch, outermost first.
    #[must_use]
    pub fn modules(&self) -> &[ModuleKey] {
        &self.path
    }

    /// The cycle closed by revisiting `key`, or `None` if `key` is not open.
    #[must_use]
    pub fn cycle_from(&self, key: &ModuleKey) -> Option<DependencyCycle> {
        if !self.contains(key) {
            return None;
        }
        let start = self.path.iter().position(|k| k == key)?;
        Some(DependencyCycle::new(self.path[start..].to_vec()))
    }
}
