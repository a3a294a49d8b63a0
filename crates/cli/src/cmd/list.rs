//! Implementation of the `jig --list` invocation.

use std::path::Path;

use anyhow::{Context, Result};
use jig_lib::manifest::BuildFile;
use owo_colors::{OwoColorize, Stream};

/// List the tasks defined in the build file.
///
/// The default task is marked with `*`; keep and factory flags are shown
/// after the name, dependencies after that.
pub fn cmd_list(file: &Path) -> Result<()> {
  let build = BuildFile::load(file).with_context(|| format!("failed to load '{}'", file.display()))?;

  for (name, task) in &build.tasks {
    let marker = if build.default.as_deref() == Some(name.as_str()) { "*" } else { " " };

    let mut flags = Vec::new();
    if task.keep {
      flags.push("keep");
    }
    if task.factory {
      flags.push("factory");
    }
    let flags = if flags.is_empty() {
      String::new()
    } else {
      format!(" [{}]", flags.join(", "))
    };

    let deps = if task.deps.is_empty() {
      String::new()
    } else {
      format!(" <- {}", task.deps.join(", "))
    };

    println!(
      "{} {}{}{}",
      marker,
      name.if_supports_color(Stream::Stdout, |s| s.bold()),
      flags.if_supports_color(Stream::Stdout, |s| s.dimmed()),
      deps.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    );
  }

  Ok(())
}
