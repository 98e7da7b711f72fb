//! # Module Catalog
//!
//! The stock [`DependencySource`] + [`Instantiator`] pair.
//!
//! A [`ModuleDefinition`] declares a module's dependencies two ways: an
//! explicit "depends on" list (ordering only) and a list of constructor
//! parameters (values the constructor reads from the registries). Explicit
//! dependencies always count for staging; a parameter counts only when it
//! names a module the catalog can construct; any other parameter is an
//! input read from the registries. Before the constructor runs, the catalog
//! checks that every parameter is available.

use crate::{
    DependencySource, Dependencies, InstantiationError, Instantiator, Module, ModuleInstance,
    ModuleKey,
};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

type Constructor =
    Box<dyn Fn(&Dependencies<'_>) -> Result<ModuleInstance, InstantiationError> + Send + Sync>;

// =============================================================================
// MODULE DEFINITION
// =============================================================================

/// How to stage and construct one module.
pub struct ModuleDefinition {
    key: ModuleKey,
    depends_on: Vec<ModuleKey>,
    parameters: Vec<ModuleKey>,
    constructor: Constructor,
}

impl ModuleDefinition {
    /// Define a module under an explicit key.
    pub fn new<F>(key: impl Into<ModuleKey>, constructor: F) -> Self
    where
        F: Fn(&Dependencies<'_>) -> Result<ModuleInstance, InstantiationError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            key: key.into(),
            depends_on: Vec::new(),
            parameters: Vec::new(),
            constructor: Box::new(constructor),
        }
    }

    /// Define module type `T`, keyed by its type name.
    pub fn of<T, F>(constructor: F) -> Self
    where
        T: Module,
        F: Fn(&Dependencies<'_>) -> Result<T, InstantiationError> + Send + Sync + 'static,
    {
        Self::new(ModuleKey::of::<T>(), move |deps| {
            constructor(deps).map(ModuleInstance::new)
        })
    }

    /// Declare an ordering dependency.
    #[must_use]
    pub fn depends_on(mut self, key: impl Into<ModuleKey>) -> Self {
        self.depends_on.push(key.into());
        self
    }

    /// Declare an ordering dependency on module type `T`.
    #[must_use]
    pub fn depends_on_type<T: ?Sized>(self) -> Self {
        self.depends_on(ModuleKey::of::<T>())
    }

    /// Declare a constructor parameter.
    #[must_use]
    pub fn parameter(mut self, key: impl Into<ModuleKey>) -> Self {
        self.parameters.push(key.into());
        self
    }

    /// Declare a constructor parameter keyed by type `T`.
    #[must_use]
    pub fn parameter_type<T: ?Sized>(self) -> Self {
        self.parameter(ModuleKey::of::<T>())
    }

    #[must_use]
    pub fn key(&self) -> &ModuleKey {
        &self.key
    }

    #[must_use]
    pub fn parameters(&self) -> &[ModuleKey] {
        &self.parameters
    }

    /// Explicit dependencies followed by parameters, first occurrence kept.
    #[must_use]
    pub fn declared_dependencies(&self) -> Vec<ModuleKey> {
        let mut seen = BTreeSet::new();
        self.depends_on
            .iter()
            .chain(self.parameters.iter())
            .filter(|key| seen.insert(*key))
            .cloned()
            .collect()
    }

    fn construct(&self, deps: &Dependencies<'_>) -> Result<ModuleInstance, InstantiationError> {
        if let Some(missing) = self.parameters.iter().find(|key| !deps.contains(key)) {
            return Err(InstantiationError::MissingDependency {
                dependency: missing.clone(),
            });
        }
        (self.constructor)(deps)
    }
}

impl fmt::Debug for ModuleDefinition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleDefinition")
            .field("key", &self.key)
            .field("depends_on", &self.depends_on)
            .field("parameters", &self.parameters)
            .finish()
    }
}

// =============================================================================
// MODULE CATALOG
// =============================================================================

/// A set of module definitions, keyed by module.
#[derive(Debug, Default)]
pub struct ModuleCatalog {
    definitions: BTreeMap<ModuleKey, ModuleDefinition>,
}

impl ModuleCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a definition. Returns `true` if it replaced one with the same key.
    pub fn register(&mut self, definition: ModuleDefinition) -> bool {
        self.definitions
            .insert(definition.key.clone(), definition)
            .is_some()
    }

    /// Builder form of [`register`](Self::register).
    #[must_use]
    pub fn with(mut self, definition: ModuleDefinition) -> Self {
        self.register(definition);
        self
    }

    #[must_use]
    pub fn get(&self, key: &ModuleKey) -> Option<&ModuleDefinition> {
        self.definitions.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &ModuleKey) -> bool {
        self.definitions.contains_key(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &ModuleKey> {
        self.definitions.keys()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

impl DependencySource for ModuleCatalog {
    fn declared_dependencies(&self, module: &ModuleKey) -> Vec<ModuleKey> {
        let Some(definition) = self.definitions.get(module) else {
            return Vec::new();
        };
        definition
            .declared_dependencies()
            .into_iter()
            .filter(|key| definition.depends_on.contains(key) || self.definitions.contains_key(key))
            .collect()
    }
}

impl Instantiator for ModuleCatalog {
    fn instantiate(
        &self,
        module: &ModuleKey,
        dependencies: &Dependencies<'_>,
    ) -> Result<ModuleInstance, InstantiationError> {
        let definition = self
            .definitions
            .get(module)
            .ok_or_else(|| InstantiationError::UnknownModule(module.clone()))?;
        definition.construct(dependencies)
    }
}
