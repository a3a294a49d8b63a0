//! Build file schema types.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::env::Environment;

/// A parsed build file.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BuildFile {
  /// Task to run when the invocation names no targets.
  #[serde(default)]
  pub default: Option<String>,

  /// Base environment layered onto the process context for every task.
  #[serde(default)]
  pub env: Environment,

  /// Task definitions, keyed by task name.
  ///
  /// The TOML table enforces name uniqueness.
  #[serde(default)]
  pub tasks: BTreeMap<String, TaskDef>,
}

/// A named unit of build work.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TaskDef {
  /// Names of tasks that must complete before this one runs.
  #[serde(default)]
  pub deps: Vec<String>,

  /// Persist results: steps whose target already exists are not re-run.
  #[serde(default)]
  pub keep: bool,

  /// Always produce fresh results; never considered up to date.
  #[serde(default)]
  pub factory: bool,

  /// Environment layered on top of the build file's `[env]` for this task.
  #[serde(default)]
  pub env: Environment,

  /// Steps executed in order when the task runs.
  #[serde(default)]
  pub steps: Vec<Step>,
}

/// A deferred external action.
///
/// The variant is chosen by the step's distinguishing key (`checkout`,
/// `compile`, or `sh`).
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Step {
  /// Fetch a git repository into a local working directory.
  Checkout {
    /// Repository URL.
    checkout: String,

    /// Destination directory; defaults to `./deps/<repo name>`.
    #[serde(default)]
    dest: Option<PathBuf>,
  },

  /// Compile a C++ source file into a binary.
  Compile {
    /// Source file.
    compile: PathBuf,

    /// Output binary path.
    target: PathBuf,

    /// Extra compiler flags, appended to the environment's `CFLAGS`.
    /// May contain `$${task}` placeholders.
    #[serde(default)]
    cflags: Option<String>,

    /// Extra linker flags, appended to the environment's `LDFLAGS`.
    /// May contain `$${task}` placeholders.
    #[serde(default)]
    ldflags: Option<String>,

    /// Header files the source depends on, for up-to-date checks.
    #[serde(default)]
    headers: Vec<PathBuf>,
  },

  /// Run a shell command.
  Sh {
    /// Command line, passed to the shell. May contain `$${task}`
    /// placeholders.
    sh: String,

    /// Output path the command produces, if any.
    #[serde(default)]
    target: Option<PathBuf>,

    /// Record trimmed stdout as the task's result instead of a path.
    #[serde(default)]
    capture: bool,
  },
}

impl Step {
  /// The step's declared output path, if any.
  pub fn target(&self) -> Option<&Path> {
    match self {
      Step::Checkout { dest, .. } => dest.as_deref(),
      Step::Compile { target, .. } => Some(target),
      Step::Sh { target, .. } => target.as_deref(),
    }
  }

  /// Strings that may contain `$${task}` placeholders.
  pub fn templates(&self) -> Vec<&str> {
    match self {
      Step::Checkout { .. } => Vec::new(),
      Step::Compile { cflags, ldflags, .. } => cflags.iter().chain(ldflags.iter()).map(String::as_str).collect(),
      Step::Sh { sh, .. } => vec![sh.as_str()],
    }
  }
}
