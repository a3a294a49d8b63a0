//! Types for task execution.

use std::collections::HashMap;
use std::path::PathBuf;
use std::thread;

use thiserror::Error;

use crate::placeholder::PlaceholderError;

use super::actions::checkout::CheckoutError;

/// Errors that can occur during task execution.
#[derive(Debug, Error)]
pub enum ExecuteError {
  /// A placeholder could not be parsed or resolved.
  #[error("placeholder error: {0}")]
  Placeholder(#[from] PlaceholderError),

  /// A shell command exited non-zero.
  #[error("command failed with exit code {code:?}: {cmd}{}", fmt_stderr(.stderr))]
  CmdFailed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  /// The compiler exited non-zero.
  #[error("compile failed with exit code {code:?}: {src}{}", fmt_stderr(.stderr))]
  CompileFailed {
    src: String,
    code: Option<i32>,
    stderr: String,
  },

  /// A dependency checkout failed.
  #[error("checkout error: {0}")]
  Checkout(#[from] CheckoutError),

  /// I/O error during execution.
  #[error("io error: {0}")]
  Io(#[from] std::io::Error),

  /// A requested task is not defined in the build file.
  #[error("unknown task: {0}")]
  UnknownTask(String),

  /// No targets were requested and the build file declares no default.
  #[error("no task requested and no default task declared")]
  NoDefaultTask,

  /// Cycle detected in the dependency graph.
  #[error("dependency cycle detected")]
  CycleDetected,
}

/// Cap on carried diagnostics so a runaway tool cannot flood the report.
const STDERR_LIMIT: usize = 4096;

/// Prepare captured stderr for an error report: trim, and truncate long
/// output at a char boundary.
pub(crate) fn trim_stderr(raw: &str) -> String {
  let trimmed = raw.trim();
  if trimmed.len() <= STDERR_LIMIT {
    return trimmed.to_string();
  }

  let mut end = STDERR_LIMIT;
  while !trimmed.is_char_boundary(end) {
    end -= 1;
  }
  format!("{}...", &trimmed[..end])
}

fn fmt_stderr(stderr: &str) -> String {
  if stderr.is_empty() {
    String::new()
  } else {
    format!("\n{}", stderr)
  }
}

/// Result of executing a single task.
#[derive(Debug, Clone, Default)]
pub struct TaskResult {
  /// Trimmed stdout of the last capture step, if any.
  pub output: Option<String>,

  /// Declared targets produced or verified by the task's steps.
  pub targets: Vec<PathBuf>,

  /// True when every step was skipped as already up to date.
  pub cached: bool,
}

impl TaskResult {
  /// The value dependents see through a `$${task}` placeholder.
  ///
  /// Captured stdout wins; otherwise the first target path.
  pub fn value(&self) -> Option<&str> {
    self
      .output
      .as_deref()
      .or_else(|| self.targets.first().and_then(|p| p.to_str()))
  }
}

/// Result of executing a task chain.
#[derive(Debug, Default)]
pub struct RunResult {
  /// Successfully executed tasks.
  pub completed: HashMap<String, TaskResult>,

  /// Tasks that failed during execution. Independent tasks in the same wave
  /// can fail together, so there may be more than one.
  pub failed: Vec<(String, ExecuteError)>,

  /// Tasks skipped because a dependency failed.
  /// Maps skipped task name -> the failed dependency's name.
  pub skipped: HashMap<String, String>,
}

impl RunResult {
  /// Returns true if every resolved task completed.
  pub fn is_success(&self) -> bool {
    self.failed.is_empty() && self.skipped.is_empty()
  }

  /// Total number of tasks processed.
  pub fn total(&self) -> usize {
    self.completed.len() + self.failed.len() + self.skipped.len()
  }

  /// Number of completed tasks that were served from existing targets.
  pub fn cached(&self) -> usize {
    self.completed.values().filter(|r| r.cached).count()
  }
}

/// Configuration for task execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of tasks to execute in parallel within a wave.
  pub parallelism: usize,

  /// Re-run steps even when their targets already exist.
  pub force: bool,

  /// Shell override for sh steps; defaults to the platform shell.
  pub shell: Option<String>,

  /// Directory relative paths resolve against (the build file's directory).
  pub root: PathBuf,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
      force: false,
      shell: None,
      root: PathBuf::from("."),
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
