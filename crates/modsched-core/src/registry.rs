//! # Registries
//!
//! Keyed stores of constructed modules and input values. A run reads its
//! input registries, accumulates a temporary registry of modules it has
//! constructed, and hands back a snapshot of its output registry.
//!
//! Cloning a registry copies the map, not the values: the clone shares the
//! `Arc`s but later inserts into one are invisible to the other.

use crate::{ModuleInstance, ModuleKey};
use std::any::{Any, type_name};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

#[derive(Clone)]
struct Entry {
    value: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
}

/// A keyed store of shared values.
#[derive(Clone, Default)]
pub struct Registry {
    entries: BTreeMap<ModuleKey, Entry>,
}

impl Registry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`. Returns `true` if a previous value was replaced.
    pub fn insert<T: Any + Send + Sync>(&mut self, key: impl Into<ModuleKey>, value: T) -> bool {
        self.insert_arc(key, Arc::new(value))
    }

    /// Store an already shared value under `key`.
    pub fn insert_arc<T: Any + Send + Sync>(
        &mut self,
        key: impl Into<ModuleKey>,
        value: Arc<T>,
    ) -> bool {
        let entry = Entry {
            value,
            type_name: type_name::<T>(),
        };
        self.entries.insert(key.into(), entry).is_some()
    }

    /// Store a constructed module under `key`.
    pub fn register(&mut self, key: ModuleKey, instance: &ModuleInstance) -> bool {
        let entry = Entry {
            value: instance.value(),
            type_name: instance.type_name(),
        };
        self.entries.insert(key, entry).is_some()
    }

    /// The value under `key`, if present and of type `T`.
    #[must_use]
    pub fn get<T: Any + Send + Sync>(&self, key: &ModuleKey) -> Option<Arc<T>> {
        let entry = self.entries.get(key)?;
        Arc::clone(&entry.value).downcast::<T>().ok()
    }

    #[must_use]
    pub fn contains(&self, key: &ModuleKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Type name of the value under `key`.
    #[must_use]
    pub fn type_name_of(&self, key: &ModuleKey) -> Option<&'static str> {
        self.entries.get(key).map(|entry| entry.type_name)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ModuleKey> {
        self.entries.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(
                self.entries
                    .iter()
                    .map(|(key, entry)| (key.as_str(), entry.type_name)),
            )
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Module;

    #[derive(Debug, PartialEq)]
    struct Port(u16);

    struct Server;

    impl Module for Server {
        fn execute(&self) {}
    }

    #[test]
    fn typed_lookup() {
        let mut registry = Registry::new();
        assert!(!registry.insert("port", Port(8080)));

        let port = registry.get::<Port>(&"port".into()).expect("port");
        assert_eq!(*port, Port(8080));
        assert!(registry.get::<String>(&"port".into()).is_none());
        assert!(registry.get::<Port>(&"missing".into()).is_none());
    }

    #[test]
    fn insert_reports_replacement() {
        let mut registry = Registry::new();
        registry.insert("port", Port(1));
        assert!(registry.insert("port", Port(2)));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn registered_module_is_retrievable_by_type() {
        let mut registry = Registry::new();
        let instance = ModuleInstance::new(Server);
        registry.register("server".into(), &instance);

        assert!(registry.get::<Server>(&"server".into()).is_some());
        assert!(
            registry
                .type_name_of(&"server".into())
                .expect("type name")
                .ends_with("Server")
        );
    }

    #[test]
    fn clone_is_a_snapshot() {
        let mut live = Registry::new();
        live.insert("a", Port(1));
        let snapshot = live.clone();
        live.insert("b", Port(2));

        assert_eq!(snapshot.len(), 1);
        assert!(!snapshot.contains(&"b".into()));
    }
}
