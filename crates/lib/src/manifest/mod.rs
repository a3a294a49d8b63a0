//! Build file loading and validation.
//!
//! A build file (`jig.toml`) declares named tasks with dependency edges and
//! the steps each task performs. Tasks are the unit of scheduling; steps are
//! the deferred external actions (checkouts, shell commands, compiles) run
//! when the task executes.

mod types;

pub use types::{BuildFile, Step, TaskDef};

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use crate::placeholder::{self, PlaceholderError};

/// Errors that can occur while loading or validating a build file.
#[derive(Debug, Error)]
pub enum ManifestError {
  /// The build file could not be read.
  #[error("failed to read build file '{0}': {1}")]
  Read(PathBuf, #[source] std::io::Error),

  /// The build file is not valid TOML (or does not match the schema).
  #[error("failed to parse build file '{0}': {1}")]
  Parse(PathBuf, #[source] Box<toml::de::Error>),

  /// A task depends on a task that is not defined.
  #[error("task '{task}' depends on unknown task '{dep}'")]
  UnknownDependency { task: String, dep: String },

  /// A step references a task that is not among its task's dependencies.
  #[error("task '{task}' references '{reference}', which is not one of its dependencies")]
  UndeclaredReference { task: String, reference: String },

  /// A step contains a malformed placeholder.
  #[error("invalid placeholder in task '{task}': {source}")]
  Placeholder {
    task: String,
    #[source]
    source: PlaceholderError,
  },

  /// The declared default task is not defined.
  #[error("default task '{0}' is not defined")]
  UnknownDefault(String),
}

impl BuildFile {
  /// Load and validate a build file from disk.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let text = fs::read_to_string(path).map_err(|e| ManifestError::Read(path.to_path_buf(), e))?;

    let build: BuildFile =
      toml::from_str(&text).map_err(|e| ManifestError::Parse(path.to_path_buf(), Box::new(e)))?;

    build.validate()?;

    debug!(path = %path.display(), tasks = build.tasks.len(), "loaded build file");
    Ok(build)
  }

  /// Validate dependency references and step placeholders.
  ///
  /// Task name uniqueness is structural (tasks are a TOML table); this checks
  /// the remaining invariants: every `deps` entry names a defined task, every
  /// step placeholder names a declared dependency, and the default task (if
  /// any) exists.
  pub fn validate(&self) -> Result<(), ManifestError> {
    for (name, task) in &self.tasks {
      for dep in &task.deps {
        if !self.tasks.contains_key(dep) {
          return Err(ManifestError::UnknownDependency {
            task: name.clone(),
            dep: dep.clone(),
          });
        }
      }

      let declared: BTreeSet<&str> = task.deps.iter().map(String::as_str).collect();
      for step in &task.steps {
        for template in step.templates() {
          let refs = placeholder::task_refs(template).map_err(|e| ManifestError::Placeholder {
            task: name.clone(),
            source: e,
          })?;

          for reference in refs {
            if !declared.contains(reference.as_str()) {
              return Err(ManifestError::UndeclaredReference {
                task: name.clone(),
                reference,
              });
            }
          }
        }
      }
    }

    if let Some(ref default) = self.default
      && !self.tasks.contains_key(default)
    {
      return Err(ManifestError::UnknownDefault(default.clone()));
    }

    Ok(())
  }

  /// Look up a task definition by name.
  pub fn task(&self, name: &str) -> Option<&TaskDef> {
    self.tasks.get(name)
  }
}
