//! Implementation of the `jig --clean` invocation.

use std::path::Path;

use anyhow::{Context, Result};
use jig_lib::execute;
use jig_lib::manifest::BuildFile;

use crate::output;

/// Remove the targets of the named tasks.
///
/// Only the requested tasks are cleaned; their dependencies keep whatever
/// they produced.
pub fn cmd_clean(file: &Path, targets: &[String]) -> Result<()> {
  let build = BuildFile::load(file).with_context(|| format!("failed to load '{}'", file.display()))?;

  let removed = execute::clean(&build, targets, &super::build_root(file)).context("Clean failed")?;

  for path in &removed {
    println!("  removed {}", path.display());
  }
  output::print_success(&format!("{} target(s) removed", removed.len()));

  Ok(())
}
