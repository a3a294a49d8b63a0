//! Implementation of the default `jig [TARGETS]` invocation.

use std::path::Path;
use std::time::Instant;

use anyhow::{Context, Result};
use jig_lib::execute::{self, ExecuteConfig};
use jig_lib::manifest::BuildFile;
use tracing::info;

use crate::output;

/// Execute the requested tasks and their dependencies.
///
/// Prints a summary on success. On failure, prints the failed task and every
/// task skipped because of it, then exits non-zero.
pub fn cmd_run(file: &Path, targets: &[String], rebuild: bool, jobs: Option<usize>) -> Result<()> {
  let build = BuildFile::load(file).with_context(|| format!("failed to load '{}'", file.display()))?;

  let mut config = ExecuteConfig {
    force: rebuild,
    root: super::build_root(file),
    ..ExecuteConfig::default()
  };
  if let Some(jobs) = jobs {
    config.parallelism = jobs.max(1);
  }

  info!(targets = ?targets, rebuild, "running tasks");

  let started = Instant::now();

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let result = rt.block_on(execute::run(&build, targets, &config))?;

  if !result.failed.is_empty() {
    for (name, err) in &result.failed {
      output::print_error(&format!("{}: {}", name, err));
    }
    for (task, dep) in &result.skipped {
      output::print_warning(&format!("{} skipped: dependency '{}' failed", task, dep));
    }
    std::process::exit(1);
  }

  output::print_success(&format!(
    "{} task(s) complete, {} cached ({})",
    result.completed.len(),
    result.cached(),
    output::format_duration(started.elapsed())
  ));

  Ok(())
}
