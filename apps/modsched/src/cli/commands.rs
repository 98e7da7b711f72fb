//! # CLI Command Implementations
//!
//! This module contains the actual implementations of CLI commands.

use crate::config::Manifest;
use crate::scheduler::Scheduler;
use modsched_core::{SchedulerError, StagePlan, stage_modules};
use std::path::Path;
use std::sync::Arc;

fn render_json(value: &serde_json::Value) -> Result<String, SchedulerError> {
    serde_json::to_string_pretty(value)
        .map_err(|e| SchedulerError::SerializationError(format!("Cannot render JSON: {}", e)))
}

fn print_json(value: &serde_json::Value) -> Result<(), SchedulerError> {
    println!("{}", render_json(value)?);
    Ok(())
}

fn plan_for(manifest: &Manifest) -> Result<StagePlan, SchedulerError> {
    let graph = manifest.graph();
    stage_modules(&graph, manifest.scheduler.cycle_policy)
}

// =============================================================================
// PLAN COMMAND
// =============================================================================

/// Print the stage plan of a manifest.
pub fn cmd_plan(manifest_path: &Path, json_mode: bool) -> Result<(), SchedulerError> {
    let manifest = Manifest::load(manifest_path)?;
    let plan = plan_for(&manifest)?;

    if json_mode {
        print_json(&serde_json::json!({
            "manifest": manifest_path.to_string_lossy(),
            "stage_count": plan.len(),
            "max_level": plan.max_level(),
            "levels": plan.levels(),
            "cycles": plan.cycles(),
            "unstaged": plan.unstaged(),
        }))?;
        return Ok(());
    }

    println!("modsched Stage Plan");
    println!("===================");
    println!("Manifest: {:?}", manifest_path);
    println!();
    print!("{}", plan);

    if !plan.cycles().is_empty() {
        println!();
        println!("Cycles (reported):");
        for cycle in plan.cycles() {
            println!("  {}", cycle);
        }
    }

    if !plan.unstaged().is_empty() {
        println!();
        println!("Unstaged:");
        for module in plan.unstaged() {
            println!("  {}", module);
        }
    }

    Ok(())
}

// =============================================================================
// GRAPH COMMAND
// =============================================================================

/// Print every resolved module with its dependencies and dependents.
pub fn cmd_graph(manifest_path: &Path, json_mode: bool) -> Result<(), SchedulerError> {
    let manifest = Manifest::load(manifest_path)?;
    let graph = manifest.graph();

    if json_mode {
        print_json(&serde_json::json!({
            "module_count": graph.len(),
            "edge_count": graph.edge_count(),
            "modules": graph,
        }))?;
        return Ok(());
    }

    println!("modsched Dependency Graph");
    println!("=========================");
    println!("Modules: {}", graph.len());
    println!("Edges:   {}", graph.edge_count());
    println!();

    for descriptor in graph.descriptors() {
        println!("{}", descriptor.key());
        let dependencies: Vec<_> = descriptor.dependencies().iter().map(|k| k.as_str()).collect();
        let dependents: Vec<_> = descriptor.dependents().iter().map(|k| k.as_str()).collect();
        println!("  depends on:  [{}]", dependencies.join(", "));
        println!("  needed by:   [{}]", dependents.join(", "));
    }

    Ok(())
}

// =============================================================================
// RUN COMMAND
// =============================================================================

/// Run the manifest through the scheduler pipeline and report the outcome.
pub async fn cmd_run(manifest_path: &Path, json_mode: bool) -> Result<(), SchedulerError> {
    let manifest = Manifest::load(manifest_path)?;
    let scheduler = Arc::new(manifest.scheduler());
    let provider = Arc::new(manifest.provider());

    let report = Scheduler::spawn(scheduler, provider)
        .wait()
        .await?;

    if json_mode {
        let failures: Vec<_> = report
            .failures()
            .iter()
            .map(|failure| {
                serde_json::json!({
                    "module": failure.module,
                    "level": failure.level,
                    "error": failure.error.to_string(),
                })
            })
            .collect();
        print_json(&serde_json::json!({
            "complete": report.is_complete(),
            "executed": report.executed(),
            "failures": failures,
            "output": report.output().keys().collect::<Vec<_>>(),
        }))?;
        return Ok(());
    }

    println!("modsched Run");
    println!("============");
    println!("Executed: {}", report.executed().len());
    for (position, module) in report.executed().iter().enumerate() {
        println!("  {}. {}", position + 1, module);
    }

    if !report.is_complete() {
        println!();
        println!("Failed: {}", report.failures().len());
        for failure in report.failures() {
            println!(
                "  stage {}: {} ({})",
                failure.level, failure.module, failure.error
            );
        }
    }

    Ok(())
}

// =============================================================================
// TESTS
// =============================================================================
