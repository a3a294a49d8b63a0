//! C++ compile steps.
//!
//! A compile step invokes the toolchain directly rather than going through
//! the shell: the compiler comes from the composed environment's `CXX`, the
//! flags from `CFLAGS` and `LDFLAGS`. Step-level flag strings are appended
//! by the orchestrator before the environment reaches this module.

use std::path::Path;
use std::time::SystemTime;

use tokio::process::Command;
use tracing::{debug, info};

use crate::env::Environment;
use crate::execute::types::{ExecuteError, trim_stderr};

const DEFAULT_COMPILER: &str = "c++";

/// Compose the compiler invocation for a source file.
///
/// Returns the program and its argument list: rendered `CFLAGS`, then
/// `-o <target>`, then the source, then rendered `LDFLAGS`. The compiler is
/// the last `CXX` value in the environment, falling back to `c++`.
pub fn compile_args(src: &Path, target: &Path, env: &Environment) -> (String, Vec<String>) {
  let program = env.last("CXX").unwrap_or(DEFAULT_COMPILER).to_string();

  let mut args = Vec::new();
  args.extend(flag_words(env, "CFLAGS"));
  args.push("-o".to_string());
  args.push(target.display().to_string());
  args.push(src.display().to_string());
  args.extend(flag_words(env, "LDFLAGS"));

  (program, args)
}

/// Split a flag variable's accumulated values into individual words.
///
/// Captured pkg-config output arrives as one space-separated string, so each
/// list entry is split on whitespace before being handed to the compiler.
fn flag_words(env: &Environment, key: &str) -> Vec<String> {
  env
    .get(key)
    .unwrap_or_default()
    .iter()
    .flat_map(|value| value.split_whitespace())
    .map(str::to_string)
    .collect()
}

/// Run a compile step.
pub async fn run_compile(src: &Path, target: &Path, env: &Environment, cwd: &Path) -> Result<(), ExecuteError> {
  let (program, args) = compile_args(src, target, env);

  info!(compiler = %program, src = %src.display(), target = %target.display(), "compiling");
  debug!(args = ?args, "compiler arguments");

  let output = Command::new(&program)
    .args(&args)
    .current_dir(cwd)
    .envs(env.render())
    .output()
    .await?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    if !stderr.is_empty() {
      debug!(stderr = %stderr, "compiler stderr");
    }

    return Err(ExecuteError::CompileFailed {
      src: src.display().to_string(),
      code: output.status.code(),
      stderr: trim_stderr(&stderr),
    });
  }

  Ok(())
}

/// Check whether a target is newer than all of its inputs.
///
/// Returns false when the target is missing or any input has a later
/// modification time. Missing inputs count as stale so the compiler gets to
/// produce the real diagnostic.
pub fn is_up_to_date(target: &Path, inputs: &[&Path]) -> bool {
  let Ok(target_mtime) = mtime(target) else {
    return false;
  };

  inputs.iter().all(|input| match mtime(input) {
    Ok(input_mtime) => input_mtime <= target_mtime,
    Err(_) => false,
  })
}

fn mtime(path: &Path) -> std::io::Result<SystemTime> {
  path.metadata()?.modified()
}

#[cfg(test)]
mod tests {
  use std::fs;
  use std::path::PathBuf;

  use super::*;
  use tempfile::TempDir;

  #[test]
  fn compile_args_default_compiler() {
    let env = Environment::new();
    let (program, args) = compile_args(Path::new("./src/basic.cpp"), Path::new("basic"), &env);

    assert_eq!(program, "c++");
    assert_eq!(args, vec!["-o", "basic", "./src/basic.cpp"]);
  }

  #[test]
  fn compile_args_uses_last_cxx_value() {
    let mut env = Environment::new();
    env.push("CXX", "g++");
    env.push("CXX", "clang++");

    let (program, _) = compile_args(Path::new("a.cpp"), Path::new("a"), &env);
    assert_eq!(program, "clang++");
  }

  #[test]
  fn compile_args_splits_flag_words() {
    let mut env = Environment::new();
    env.push("CFLAGS", "-I./deps/moonlight/include");
    env.push("CFLAGS", "-I/pfx/include/SDL3 -D_REENTRANT");
    env.push("LDFLAGS", "-L/pfx/lib -lSDL3");

    let (_, args) = compile_args(Path::new("./src/basic.cpp"), Path::new("basic"), &env);

    assert_eq!(
      args,
      vec![
        "-I./deps/moonlight/include",
        "-I/pfx/include/SDL3",
        "-D_REENTRANT",
        "-o",
        "basic",
        "./src/basic.cpp",
        "-L/pfx/lib",
        "-lSDL3",
      ]
    );
  }

  #[test]
  fn up_to_date_when_target_newer() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("basic.cpp");
    let target = temp.path().join("basic");

    fs::write(&src, "int main() {}").unwrap();
    fs::write(&target, "binary").unwrap();

    let older = SystemTime::now() - std::time::Duration::from_secs(60);
    filetime_set(&src, older);

    assert!(is_up_to_date(&target, &[&src]));
  }

  #[test]
  fn stale_when_target_missing() {
    let temp = TempDir::new().unwrap();
    let src = temp.path().join("basic.cpp");
    fs::write(&src, "int main() {}").unwrap();

    assert!(!is_up_to_date(&temp.path().join("basic"), &[&src]));
  }

  #[test]
  fn stale_when_input_missing() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("basic");
    fs::write(&target, "binary").unwrap();

    let missing = temp.path().join("gone.hpp");
    assert!(!is_up_to_date(&target, &[&missing]));
  }

  #[test]
  fn stale_when_header_newer_than_target() {
    let temp = TempDir::new().unwrap();
    let target = temp.path().join("basic");
    let header = temp.path().join("basic.hpp");

    fs::write(&target, "binary").unwrap();
    fs::write(&header, "#pragma once").unwrap();

    let older = SystemTime::now() - std::time::Duration::from_secs(60);
    filetime_set(&target, older);

    assert!(!is_up_to_date(&target, &[&header]));
  }

  #[tokio::test]
  #[cfg(unix)]
  async fn run_compile_reports_failure() {
    let temp = TempDir::new().unwrap();

    let mut env = Environment::new();
    // "false" ignores its arguments and exits 1.
    env.push("CXX", "false");

    let result = run_compile(Path::new("missing.cpp"), Path::new("out"), &env, temp.path()).await;
    assert!(matches!(result, Err(ExecuteError::CompileFailed { .. })));
  }

  fn filetime_set(path: &PathBuf, to: SystemTime) {
    let file = fs::File::options().append(true).open(path).unwrap();
    file.set_modified(to).unwrap();
  }
}
