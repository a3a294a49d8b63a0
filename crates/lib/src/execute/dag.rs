//! Task dependency graph and wave planning.
//!
//! Tasks form a directed acyclic graph via their `deps` lists. The graph
//! supports computing the transitive closure of the requested targets and
//! grouping that closure into parallel execution waves.

use std::collections::{HashMap, HashSet};

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};

use crate::manifest::BuildFile;

use super::types::ExecuteError;

/// A DAG over task names for execution planning.
///
/// Edges run from a dependency to its dependents, so incoming neighbors are
/// the tasks a node waits on.
pub struct TaskDag {
  /// The underlying graph.
  graph: DiGraph<String, ()>,

  /// Map from task name to node index.
  nodes: HashMap<String, NodeIndex>,
}

impl TaskDag {
  /// Build a task DAG from a validated build file.
  ///
  /// # Errors
  ///
  /// Returns `CycleDetected` if the dependency edges contain a cycle. Unknown
  /// dependency names are a load-time error and never reach this point.
  pub fn from_build_file(build: &BuildFile) -> Result<Self, ExecuteError> {
    let mut graph = DiGraph::new();
    let mut nodes = HashMap::new();

    for name in build.tasks.keys() {
      let idx = graph.add_node(name.clone());
      nodes.insert(name.clone(), idx);
    }

    for (name, task) in &build.tasks {
      let dependent_idx = nodes[name];
      for dep in &task.deps {
        if let Some(&dep_idx) = nodes.get(dep) {
          // Edge from dependency to dependent
          graph.add_edge(dep_idx, dependent_idx, ());
        }
      }
    }

    let dag = Self { graph, nodes };
    dag.verify_acyclic()?;

    Ok(dag)
  }

  /// Verify that the graph is acyclic.
  fn verify_acyclic(&self) -> Result<(), ExecuteError> {
    toposort(&self.graph, None).map_err(|_| ExecuteError::CycleDetected)?;
    Ok(())
  }

  /// Get the direct dependencies of a task.
  pub fn dependencies(&self, name: &str) -> Vec<String> {
    let Some(&idx) = self.nodes.get(name) else {
      return Vec::new();
    };

    self
      .graph
      .neighbors_directed(idx, Direction::Incoming)
      .map(|dep_idx| self.graph[dep_idx].clone())
      .collect()
  }

  /// Check if a task has any dependencies.
  pub fn has_dependencies(&self, name: &str) -> bool {
    let Some(&idx) = self.nodes.get(name) else {
      return false;
    };

    self.graph.neighbors_directed(idx, Direction::Incoming).next().is_some()
  }

  /// Compute the transitive dependency closure of the requested targets.
  ///
  /// The returned set contains the targets themselves plus every task they
  /// depend on, directly or indirectly.
  ///
  /// # Errors
  ///
  /// Returns `UnknownTask` if a requested target is not defined.
  pub fn closure(&self, targets: &[String]) -> Result<HashSet<String>, ExecuteError> {
    let mut resolved = HashSet::new();
    let mut stack = Vec::new();

    for target in targets {
      let &idx = self
        .nodes
        .get(target)
        .ok_or_else(|| ExecuteError::UnknownTask(target.clone()))?;
      stack.push(idx);
    }

    while let Some(idx) = stack.pop() {
      if !resolved.insert(self.graph[idx].clone()) {
        continue;
      }
      stack.extend(self.graph.neighbors_directed(idx, Direction::Incoming));
    }

    Ok(resolved)
  }

  /// Group a closure of tasks into parallel execution waves.
  ///
  /// Each wave contains tasks whose dependencies (within the closure) all
  /// sit in earlier waves, so every task in a wave can run concurrently.
  pub fn waves(&self, within: &HashSet<String>) -> Result<Vec<Vec<String>>, ExecuteError> {
    let members: HashSet<NodeIndex> = within.iter().filter_map(|name| self.nodes.get(name)).copied().collect();

    // Kahn levels restricted to the closure
    let mut in_degree: HashMap<NodeIndex, usize> = HashMap::new();
    for &idx in &members {
      let degree = self
        .graph
        .neighbors_directed(idx, Direction::Incoming)
        .filter(|dep| members.contains(dep))
        .count();
      in_degree.insert(idx, degree);
    }

    let mut waves = Vec::new();
    let mut remaining = members.clone();

    while !remaining.is_empty() {
      let mut ready: Vec<NodeIndex> = remaining.iter().filter(|idx| in_degree[idx] == 0).copied().collect();

      if ready.is_empty() {
        return Err(ExecuteError::CycleDetected);
      }

      // Deterministic order within a wave.
      ready.sort_by(|a, b| self.graph[*a].cmp(&self.graph[*b]));

      for &idx in &ready {
        remaining.remove(&idx);
        for neighbor in self.graph.neighbors_directed(idx, Direction::Outgoing) {
          if let Some(deg) = in_degree.get_mut(&neighbor) {
            *deg = deg.saturating_sub(1);
          }
        }
      }

      waves.push(ready.into_iter().map(|idx| self.graph[idx].clone()).collect());
    }

    Ok(waves)
  }

  /// Get all task names in topological order.
  pub fn topological(&self) -> Result<Vec<String>, ExecuteError> {
    let sorted = toposort(&self.graph, None).map_err(|_| ExecuteError::CycleDetected)?;
    Ok(sorted.into_iter().map(|idx| self.graph[idx].clone()).collect())
  }

  /// Get the number of tasks in the DAG.
  pub fn task_count(&self) -> usize {
    self.nodes.len()
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::manifest::TaskDef;

  fn make_task(deps: &[&str]) -> TaskDef {
    TaskDef {
      deps: deps.iter().map(|d| d.to_string()).collect(),
      ..TaskDef::default()
    }
  }

  fn make_build(tasks: &[(&str, &[&str])]) -> BuildFile {
    let mut build = BuildFile::default();
    for (name, deps) in tasks {
      build.tasks.insert(name.to_string(), make_task(deps));
    }
    build
  }

  fn names(targets: &[&str]) -> Vec<String> {
    targets.iter().map(|t| t.to_string()).collect()
  }

  #[test]
  fn empty_build_file() {
    let dag = TaskDag::from_build_file(&BuildFile::default()).unwrap();

    assert_eq!(dag.task_count(), 0);
    assert!(dag.topological().unwrap().is_empty());
  }

  #[test]
  fn single_task_no_deps() {
    let build = make_build(&[("basic", &[])]);
    let dag = TaskDag::from_build_file(&build).unwrap();

    assert_eq!(dag.task_count(), 1);
    assert!(!dag.has_dependencies("basic"));

    let closure = dag.closure(&names(&["basic"])).unwrap();
    let waves = dag.waves(&closure).unwrap();
    assert_eq!(waves, vec![vec!["basic".to_string()]]);
  }

  #[test]
  fn linear_dependency_chain() {
    // sdl -> sdl_exts -> sdl_cflags
    let build = make_build(&[("sdl", &[]), ("sdl_exts", &["sdl"]), ("sdl_cflags", &["sdl_exts"])]);
    let dag = TaskDag::from_build_file(&build).unwrap();

    assert!(!dag.has_dependencies("sdl"));
    assert!(dag.has_dependencies("sdl_exts"));
    assert_eq!(dag.dependencies("sdl_cflags"), vec!["sdl_exts"]);

    let topo = dag.topological().unwrap();
    let pos_sdl = topo.iter().position(|t| t == "sdl").unwrap();
    let pos_exts = topo.iter().position(|t| t == "sdl_exts").unwrap();
    let pos_cflags = topo.iter().position(|t| t == "sdl_cflags").unwrap();
    assert!(pos_sdl < pos_exts);
    assert!(pos_exts < pos_cflags);

    let closure = dag.closure(&names(&["sdl_cflags"])).unwrap();
    let waves = dag.waves(&closure).unwrap();
    assert_eq!(waves.len(), 3);
    assert_eq!(waves[0], vec!["sdl"]);
    assert_eq!(waves[1], vec!["sdl_exts"]);
    assert_eq!(waves[2], vec!["sdl_cflags"]);
  }

  #[test]
  fn diamond_dependency() {
    //     sdl_exts
    //      /    \
    // sdl_cflags sdl_ldflags
    //      \    /
    //      basic
    let build = make_build(&[
      ("sdl_exts", &[]),
      ("sdl_cflags", &["sdl_exts"]),
      ("sdl_ldflags", &["sdl_exts"]),
      ("basic", &["sdl_cflags", "sdl_ldflags"]),
    ]);
    let dag = TaskDag::from_build_file(&build).unwrap();

    let closure = dag.closure(&names(&["basic"])).unwrap();
    assert_eq!(closure.len(), 4);

    let waves = dag.waves(&closure).unwrap();
    assert_eq!(waves.len(), 3);
    assert_eq!(waves[0], vec!["sdl_exts"]);

    // Middle wave runs both flag queries in parallel.
    assert_eq!(waves[1], vec!["sdl_cflags", "sdl_ldflags"]);
    assert_eq!(waves[2], vec!["basic"]);
  }

  #[test]
  fn parallel_independent_tasks() {
    let build = make_build(&[("deps", &[]), ("sdl", &[]), ("assets", &[])]);
    let dag = TaskDag::from_build_file(&build).unwrap();

    let closure = dag.closure(&names(&["deps", "sdl", "assets"])).unwrap();
    let waves = dag.waves(&closure).unwrap();

    assert_eq!(waves.len(), 1);
    assert_eq!(waves[0].len(), 3);
  }

  #[test]
  fn closure_excludes_unrequested_tasks() {
    let build = make_build(&[("deps", &[]), ("sdl", &[]), ("sdl_exts", &["sdl"]), ("cc_json", &[])]);
    let dag = TaskDag::from_build_file(&build).unwrap();

    let closure = dag.closure(&names(&["sdl_exts"])).unwrap();
    assert_eq!(closure.len(), 2);
    assert!(closure.contains("sdl"));
    assert!(closure.contains("sdl_exts"));
    assert!(!closure.contains("deps"));
    assert!(!closure.contains("cc_json"));
  }

  #[test]
  fn waves_respect_closure_boundary() {
    // sdl is outside the closure, so sdl_exts sits in wave 0 of the
    // restricted plan even though it has a dependency in the full graph.
    let build = make_build(&[("sdl", &[]), ("sdl_exts", &["sdl"])]);
    let dag = TaskDag::from_build_file(&build).unwrap();

    let only_exts: HashSet<String> = ["sdl_exts".to_string()].into();
    let waves = dag.waves(&only_exts).unwrap();

    assert_eq!(waves, vec![vec!["sdl_exts".to_string()]]);
  }

  #[test]
  fn unknown_target_is_an_error() {
    let build = make_build(&[("basic", &[])]);
    let dag = TaskDag::from_build_file(&build).unwrap();

    let result = dag.closure(&names(&["nonexistent"]));
    assert!(matches!(result, Err(ExecuteError::UnknownTask(ref name)) if name == "nonexistent"));
  }

  #[test]
  fn cycle_is_detected() {
    // Mutual deps are constructible in a raw BuildFile.
    let build = make_build(&[("a", &["b"]), ("b", &["a"])]);
    let result = TaskDag::from_build_file(&build);

    assert!(matches!(result, Err(ExecuteError::CycleDetected)));
  }

  #[test]
  fn self_dependency_is_a_cycle() {
    let build = make_build(&[("a", &["a"])]);
    let result = TaskDag::from_build_file(&build);

    assert!(matches!(result, Err(ExecuteError::CycleDetected)));
  }
}
