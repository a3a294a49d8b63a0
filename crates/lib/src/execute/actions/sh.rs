//! Shell command steps.

use std::collections::BTreeMap;
use std::path::Path;

use tokio::process::Command;
use tracing::{debug, info};

use crate::execute::types::{ExecuteError, trim_stderr};

/// Run a shell command step.
///
/// The command inherits the composed build environment on top of the process
/// environment; build tooling like compilers and pkg-config must see the
/// caller's PATH to be found at all. The working directory is the build
/// file's directory.
///
/// Returns the command's trimmed stdout.
pub async fn run_sh(
  cmd: &str,
  env: &BTreeMap<String, String>,
  cwd: &Path,
  shell: Option<&str>,
) -> Result<String, ExecuteError> {
  info!(cmd = %cmd, "running command");

  let (shell_cmd, shell_args) = get_shell(shell);

  let mut command = Command::new(&shell_cmd);
  command.args(&shell_args).arg(cmd).current_dir(cwd).envs(env);

  debug!(shell = %shell_cmd, cwd = %cwd.display(), "spawning process");

  let output = command.output().await?;

  if !output.status.success() {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);

    if !stderr.is_empty() {
      debug!(stderr = %stderr, "command stderr");
    }
    if !stdout.is_empty() {
      debug!(stdout = %stdout, "command stdout");
    }

    return Err(ExecuteError::CmdFailed {
      cmd: cmd.to_string(),
      code: output.status.code(),
      stderr: trim_stderr(&stderr),
    });
  }

  let stdout = String::from_utf8_lossy(&output.stdout).trim().to_string();

  if !stdout.is_empty() {
    debug!(stdout = %stdout, "command output");
  }

  Ok(stdout)
}

/// Get the shell command and arguments for the current platform.
///
/// A configured override is inspected for its flavor: powershell and cmd take
/// different command flags than Unix-style shells.
pub fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      vec!["-NoProfile".to_string(), "-Command".to_string()]
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    (
      "powershell.exe".to_string(),
      vec![
        "-NoProfile".to_string(),
        "-ExecutionPolicy".to_string(),
        "Bypass".to_string(),
        "-Command".to_string(),
      ],
    )
  }
}
