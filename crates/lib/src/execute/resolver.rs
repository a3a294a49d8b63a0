//! Placeholder resolution against completed task results.

use std::collections::HashMap;

use crate::placeholder::{PlaceholderError, Resolver};

use super::types::TaskResult;

/// Resolves `$${task}` placeholders from the results of completed tasks.
///
/// A dependency's value is its captured stdout, or its first target path when
/// nothing was captured. Referencing a task that has not completed, or that
/// produced neither, is an error.
pub struct TaskOutputs<'a> {
  completed: &'a HashMap<String, TaskResult>,
}

impl<'a> TaskOutputs<'a> {
  pub fn new(completed: &'a HashMap<String, TaskResult>) -> Self {
    Self { completed }
  }
}

impl Resolver for TaskOutputs<'_> {
  fn resolve_task(&self, name: &str) -> Result<&str, PlaceholderError> {
    self
      .completed
      .get(name)
      .and_then(TaskResult::value)
      .ok_or_else(|| PlaceholderError::UnresolvedTask(name.to_string()))
  }
}

#[cfg(test)]
mod tests {
  use std::path::PathBuf;

  use super::*;
  use crate::placeholder::substitute;

  #[test]
  fn resolves_captured_output() {
    let mut completed = HashMap::new();
    completed.insert(
      "sdl_cflags".to_string(),
      TaskResult {
        output: Some("-I/pfx/include/SDL3".to_string()),
        targets: Vec::new(),
        cached: false,
      },
    );

    let outputs = TaskOutputs::new(&completed);
    let result = substitute("c++ $${sdl_cflags} basic.cpp", &outputs).unwrap();

    assert_eq!(result, "c++ -I/pfx/include/SDL3 basic.cpp");
  }

  #[test]
  fn resolves_target_path_when_nothing_captured() {
    let mut completed = HashMap::new();
    completed.insert(
      "deps".to_string(),
      TaskResult {
        output: None,
        targets: vec![PathBuf::from("./deps/moonlight")],
        cached: true,
      },
    );

    let outputs = TaskOutputs::new(&completed);
    let result = substitute("ls $${deps}/include", &outputs).unwrap();

    assert_eq!(result, "ls ./deps/moonlight/include");
  }

  #[test]
  fn incomplete_task_is_unresolved() {
    let completed = HashMap::new();
    let outputs = TaskOutputs::new(&completed);

    let result = substitute("$${sdl}", &outputs);
    assert!(matches!(result, Err(PlaceholderError::UnresolvedTask(ref name)) if name == "sdl"));
  }

  #[test]
  fn task_with_no_output_or_target_is_unresolved() {
    let mut completed = HashMap::new();
    completed.insert("noop".to_string(), TaskResult::default());

    let outputs = TaskOutputs::new(&completed);
    let result = substitute("$${noop}", &outputs);

    assert!(matches!(result, Err(PlaceholderError::UnresolvedTask(_))));
  }
}
