//! # modsched
//!
//! The async and configuration layer around `modsched-core`:
//!
//! - `scheduler` - background pipeline (`Scheduler::spawn` → `RunHandle`)
//! - `config` - TOML manifests describing a module set
//! - `cli` - the `modsched` command line

pub mod cli;
pub mod config;
pub mod scheduler;

pub use config::{Manifest, ManifestModule, ManifestScheduler, ProvidedValue};
pub use scheduler::{ModuleScheduler, RunHandle, Scheduler};
