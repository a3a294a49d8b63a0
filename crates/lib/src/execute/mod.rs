//! Task execution engine.
//!
//! This module turns a build file into work:
//! - Plans parallel execution waves over the task DAG
//! - Runs each wave's tasks concurrently, bounded by a semaphore
//! - Skips steps whose persisted targets are already present
//! - Tracks failures and skips transitive dependents

pub mod actions;
pub mod dag;
mod resolver;
pub mod types;

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::env::Environment;
use crate::manifest::{BuildFile, Step, TaskDef};
use crate::placeholder;

use actions::checkout::repo_dir_name;
use dag::TaskDag;
use resolver::TaskOutputs;
pub use types::{ExecuteConfig, ExecuteError, RunResult, TaskResult};

/// Directory checkouts land in when a step declares no destination.
const CHECKOUT_DIR: &str = "deps";

/// Execute the requested tasks and everything they depend on.
///
/// With no explicit targets the build file's default task runs. Tasks are
/// grouped into waves by the DAG; each wave runs concurrently up to the
/// configured parallelism. A failed task stops nothing already running, but
/// its transitive dependents are skipped and recorded.
pub async fn run(build: &BuildFile, targets: &[String], config: &ExecuteConfig) -> Result<RunResult, ExecuteError> {
  let targets = resolve_targets(build, targets)?;

  let dag = TaskDag::from_build_file(build)?;
  let closure = dag.closure(&targets)?;
  let waves = dag.waves(&closure)?;

  info!(tasks = closure.len(), waves = waves.len(), "computed execution plan");

  // The process context and the build file's [env] are shared by every task.
  let base_env = Environment::context().layered(&build.env);

  let mut result = RunResult::default();
  let mut failed_tasks: HashSet<String> = HashSet::new();

  let semaphore = Arc::new(Semaphore::new(config.parallelism.max(1)));

  for (wave_idx, wave) in waves.iter().enumerate() {
    debug!(wave = wave_idx, tasks = wave.len(), "executing wave");

    // Partition the wave into ready and skipped tasks.
    let mut ready = Vec::new();
    for name in wave {
      let deps = dag.dependencies(name);
      if let Some(failed_dep) = deps.iter().find(|dep| failed_tasks.contains(*dep)) {
        warn!(task = %name, failed_dep = %failed_dep, "skipping task due to failed dependency");
        failed_tasks.insert(name.clone());
        result.skipped.insert(name.clone(), failed_dep.clone());
      } else {
        ready.push(name.clone());
      }
    }

    if ready.is_empty() {
      continue;
    }

    for (name, task_result) in execute_wave(&ready, build, &base_env, &result.completed, config, &semaphore).await {
      match task_result {
        Ok(r) => {
          info!(task = %name, cached = r.cached, "task complete");
          result.completed.insert(name, r);
        }
        Err(e) => {
          error!(task = %name, error = %e, "task failed");
          failed_tasks.insert(name.clone());
          result.failed.push((name, e));
        }
      }
    }
  }

  info!(
    completed = result.completed.len(),
    failed = result.failed.len(),
    skipped = result.skipped.len(),
    "execution complete"
  );

  Ok(result)
}

/// Remove the targets of the requested tasks.
///
/// Only the named tasks are cleaned; dependencies are left alone. Missing
/// targets are not an error. Returns the paths that were removed.
pub fn clean(build: &BuildFile, targets: &[String], root: &Path) -> Result<Vec<PathBuf>, ExecuteError> {
  let targets = resolve_targets(build, targets)?;

  let mut removed = Vec::new();
  for name in &targets {
    let task = build
      .task(name)
      .ok_or_else(|| ExecuteError::UnknownTask(name.clone()))?;

    for step in &task.steps {
      let Some(target) = effective_target(step) else {
        continue;
      };
      let path = resolve_path(root, &target);

      let removal = if path.is_dir() {
        std::fs::remove_dir_all(&path)
      } else {
        std::fs::remove_file(&path)
      };

      match removal {
        Ok(()) => {
          info!(task = %name, path = %path.display(), "removed target");
          removed.push(path);
        }
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => return Err(ExecuteError::Io(e)),
      }
    }
  }

  Ok(removed)
}

/// Resolve the requested target list, falling back to the default task.
fn resolve_targets(build: &BuildFile, targets: &[String]) -> Result<Vec<String>, ExecuteError> {
  if !targets.is_empty() {
    return Ok(targets.to_vec());
  }

  match &build.default {
    Some(default) => Ok(vec![default.clone()]),
    None => Err(ExecuteError::NoDefaultTask),
  }
}

/// A step's output path, with the checkout default applied.
fn effective_target(step: &Step) -> Option<PathBuf> {
  match step {
    Step::Checkout { checkout, dest } => Some(
      dest
        .clone()
        .unwrap_or_else(|| PathBuf::from(CHECKOUT_DIR).join(repo_dir_name(checkout))),
    ),
    _ => step.target().map(Path::to_path_buf),
  }
}

fn resolve_path(root: &Path, path: &Path) -> PathBuf {
  if path.is_absolute() { path.to_path_buf() } else { root.join(path) }
}

/// Execute a wave of tasks in parallel.
async fn execute_wave(
  ready: &[String],
  build: &BuildFile,
  base_env: &Environment,
  completed: &HashMap<String, TaskResult>,
  config: &ExecuteConfig,
  semaphore: &Arc<Semaphore>,
) -> Vec<(String, Result<TaskResult, ExecuteError>)> {
  let mut join_set = JoinSet::new();

  for name in ready {
    let name = name.clone();
    let task = build.tasks[&name].clone();
    let base_env = base_env.clone();
    let completed = completed.clone();
    let config = config.clone();
    let semaphore = semaphore.clone();

    join_set.spawn(async move {
      // The semaphore is never closed, so acquisition cannot fail.
      let _permit = semaphore.acquire().await.unwrap();
      let result = run_task(&name, &task, &base_env, &completed, &config).await;
      (name, result)
    });
  }

  let mut results = Vec::new();
  while let Some(joined) = join_set.join_next().await {
    match joined {
      Ok(entry) => results.push(entry),
      Err(e) => error!(error = %e, "task panicked"),
    }
  }
  results
}

/// Run a single task's steps in order.
async fn run_task(
  name: &str,
  task: &TaskDef,
  base_env: &Environment,
  completed: &HashMap<String, TaskResult>,
  config: &ExecuteConfig,
) -> Result<TaskResult, ExecuteError> {
  debug!(task = %name, steps = task.steps.len(), "running task");

  let task_env = base_env.layered(&task.env);
  let outputs = TaskOutputs::new(completed);

  let mut result = TaskResult {
    cached: !task.steps.is_empty(),
    ..TaskResult::default()
  };

  for step in &task.steps {
    if let Some(target) = effective_target(step) {
      result.targets.push(target);
    }

    match step {
      Step::Checkout { checkout, dest } => {
        let declared = dest
          .clone()
          .unwrap_or_else(|| PathBuf::from(CHECKOUT_DIR).join(repo_dir_name(checkout)));
        let path = resolve_path(&config.root, &declared);

        if task.keep && !task.factory && !config.force && path.exists() {
          debug!(task = %name, path = %path.display(), "checkout already present");
          continue;
        }
        result.cached = false;

        let url = checkout.clone();
        tokio::task::spawn_blocking(move || actions::checkout::checkout(&url, &path))
          .await
          .map_err(std::io::Error::other)??;
      }

      Step::Sh { sh, target, capture } => {
        if let Some(target) = target {
          let path = resolve_path(&config.root, target);
          if task.keep && !task.factory && !config.force && path.exists() {
            debug!(task = %name, path = %path.display(), "target already present");
            continue;
          }
        }
        result.cached = false;

        let cmd = placeholder::substitute(sh, &outputs)?;
        let stdout = actions::sh::run_sh(&cmd, &task_env.render(), &config.root, config.shell.as_deref()).await?;

        if *capture {
          result.output = Some(stdout);
        }
      }

      Step::Compile {
        compile,
        target,
        cflags,
        ldflags,
        headers,
      } => {
        let src = resolve_path(&config.root, compile);
        let out = resolve_path(&config.root, target);

        let mut inputs: Vec<&Path> = vec![&src];
        let headers: Vec<PathBuf> = headers.iter().map(|h| resolve_path(&config.root, h)).collect();
        inputs.extend(headers.iter().map(PathBuf::as_path));

        if task.keep && !task.factory && !config.force && actions::compile::is_up_to_date(&out, &inputs) {
          debug!(task = %name, target = %out.display(), "target is up to date");
          continue;
        }
        result.cached = false;

        // Step-level flags stack on top of the composed environment.
        let mut compile_env = task_env.clone();
        if let Some(cflags) = cflags {
          compile_env.push("CFLAGS", placeholder::substitute(cflags, &outputs)?);
        }
        if let Some(ldflags) = ldflags {
          compile_env.push("LDFLAGS", placeholder::substitute(ldflags, &outputs)?);
        }

        actions::compile::run_compile(&src, &out, &compile_env, &config.root).await?;
      }
    }
  }

  Ok(result)
}
