//! # modsched-core
//!
//! The deterministic staging engine for modsched - THE LOGIC.
//!
//! Given a set of interdependent modules, this crate:
//! - builds the dependency graph (`resolver`)
//! - levels it into load stages and detects cycles (`staging`)
//! - constructs and executes each module in stage order (`executor`)
//!
//! ## Architectural Constraints
//!
//! - No async, no network dependencies (pure Rust)
//! - `BTreeMap`/`BTreeSet` only: stage output is reproducible
//! - Dependency discovery and construction are injected strategies
//!   (`DependencySource`, `Instantiator`); `ModuleCatalog` is the stock pair
//!
//! ## Example
//!
//! ```
//! use modsched_core::{
//!     CyclePolicy, DependencyGraph, Module, ModuleCatalog, ModuleDefinition, NoopObserver,
//!     StageRunner, stage_modules,
//! };
//!
//! struct Storage;
//! impl Module for Storage {
//!     fn execute(&self) {}
//! }
//!
//! struct Api;
//! impl Module for Api {
//!     fn execute(&self) {}
//! }
//!
//! let catalog = ModuleCatalog::new()
//!     .with(ModuleDefinition::of(|_| Ok(Storage)))
//!     .with(ModuleDefinition::of(|_| Ok(Api)).depends_on_type::<Storage>());
//!
//! let graph = DependencyGraph::resolve(catalog.keys().cloned().collect::<Vec<_>>(), &catalog);
//! let plan = stage_modules(&graph, CyclePolicy::Abort).expect("acyclic");
//! assert_eq!(plan.max_level(), Some(2));
//!
//! let report = StageRunner::new(&catalog, &NoopObserver, &[]).run(&plan).expect("run");
//! assert_eq!(report.executed().len(), 2);
//! ```

// =============================================================================
// MODULES
// =============================================================================

pub mod catalog;
pub mod descriptor;
pub mod executor;
pub mod instantiate;
pub mod module;
pub mod path;
pub mod registry;
pub mod resolver;
pub mod settings;
pub mod stage;
pub mod staging;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{DependencyCycle, InstantiationError, ModuleKey, SchedulerError};

// =============================================================================
// RE-EXPORTS: Graph & Staging
// =============================================================================

pub use descriptor::ModuleDescriptor;
pub use path::PathTrace;
pub use resolver::{DependencyGraph, DependencySource};
pub use stage::{Stage, StagePlan};
pub use staging::{ISOLATED_LEVEL, ROOT_LEVEL, Staging, stage_modules};

// =============================================================================
// RE-EXPORTS: Execution
// =============================================================================

pub use catalog::{ModuleCatalog, ModuleDefinition};
pub use executor::{ExecutionObserver, ModuleFailure, NoopObserver, RunReport, StageRunner};
pub use instantiate::{Dependencies, Instantiator, ModuleProvider};
pub use module::{Module, ModuleInstance};
pub use registry::Registry;
pub use settings::{CyclePolicy, FailurePolicy, SchedulerSettings};
