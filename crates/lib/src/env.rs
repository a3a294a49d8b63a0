//! Composable process environments.
//!
//! An [`Environment`] maps variable names to ordered lists of values. Layering
//! one environment onto another appends to the lists and never overwrites, so
//! a build file can extend `CFLAGS` or `PKG_CONFIG_PATH` without clobbering
//! whatever the calling process already declared.
//!
//! Rendering flattens each list to a single string: variables whose name ends
//! in `PATH` are joined with the platform path separator, everything else
//! with spaces.

use std::collections::BTreeMap;
use std::env;

use serde::Deserialize;

/// A single entry in a build file's `[env]` table.
///
/// Accepts either a bare string or a list of strings.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum EnvValue {
  Single(String),
  List(Vec<String>),
}

/// An append-only mapping of environment variables to ordered value lists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(from = "BTreeMap<String, EnvValue>")]
pub struct Environment {
  vars: BTreeMap<String, Vec<String>>,
}

impl From<BTreeMap<String, EnvValue>> for Environment {
  fn from(map: BTreeMap<String, EnvValue>) -> Self {
    let mut environment = Environment::new();
    for (key, value) in map {
      match value {
        EnvValue::Single(v) => environment.push(key, v),
        EnvValue::List(vs) => {
          for v in vs {
            environment.push(key.clone(), v);
          }
        }
      }
    }
    environment
  }
}

impl Environment {
  /// Create an empty environment.
  pub fn new() -> Self {
    Self::default()
  }

  /// Capture the calling process environment.
  ///
  /// Each variable becomes a single-element list, so later layers append
  /// after the inherited value rather than replacing it.
  pub fn context() -> Self {
    let mut environment = Environment::new();
    for (key, value) in env::vars() {
      environment.push(key, value);
    }
    environment
  }

  /// Append a single value to a variable's list.
  pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
    self.vars.entry(key.into()).or_default().push(value.into());
  }

  /// Layer another environment onto this one.
  ///
  /// Every entry of `other` is appended after this environment's existing
  /// entries for the same variable. Prior entries are never dropped.
  pub fn append(&mut self, other: &Environment) -> &mut Self {
    for (key, values) in &other.vars {
      self.vars.entry(key.clone()).or_default().extend(values.iter().cloned());
    }
    self
  }

  /// Return a copy of this environment with `other` layered on top.
  pub fn layered(&self, other: &Environment) -> Environment {
    let mut combined = self.clone();
    combined.append(other);
    combined
  }

  /// Get the value list for a variable.
  pub fn get(&self, key: &str) -> Option<&[String]> {
    self.vars.get(key).map(Vec::as_slice)
  }

  /// Get the most recently appended value for a variable.
  pub fn last(&self, key: &str) -> Option<&str> {
    self.vars.get(key).and_then(|values| values.last()).map(String::as_str)
  }

  pub fn is_empty(&self) -> bool {
    self.vars.is_empty()
  }

  pub fn len(&self) -> usize {
    self.vars.len()
  }

  /// Flatten to plain `name=value` pairs suitable for a child process.
  pub fn render(&self) -> BTreeMap<String, String> {
    self
      .vars
      .iter()
      .map(|(key, values)| (key.clone(), values.join(separator_for(key))))
      .collect()
  }
}

/// Join rule for a rendered variable.
///
/// Search-path variables (`PATH`, `PKG_CONFIG_PATH`, `CMAKE_PREFIX_PATH`, ...)
/// use the platform path-list separator; flag variables use spaces.
fn separator_for(key: &str) -> &'static str {
  if key.ends_with("PATH") {
    PATH_SEPARATOR
  } else {
    " "
  }
}

#[cfg(unix)]
const PATH_SEPARATOR: &str = ":";

#[cfg(windows)]
const PATH_SEPARATOR: &str = ";";
