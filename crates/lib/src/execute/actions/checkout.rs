//! Git checkout steps.
//!
//! A checkout step clones a repository into a working directory under the
//! build root. When the directory already holds a clone, the step fetches
//! updates instead, so repeated runs stay incremental.

use std::fs;
use std::path::{Path, PathBuf};

use gix::remote::Direction;
use thiserror::Error;
use tracing::{debug, info};

/// Errors that can occur during checkout operations.
#[derive(Debug, Error)]
pub enum CheckoutError {
  /// Failed to create the destination's parent directory.
  #[error("failed to create directory '{0}': {1}")]
  CreateDir(PathBuf, #[source] std::io::Error),

  /// Failed to clone a git repository.
  #[error("failed to clone repository '{url}': {source}")]
  Clone {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// Failed to open an existing git repository.
  #[error("failed to open repository at '{path}': {source}")]
  Open {
    path: PathBuf,
    #[source]
    source: Box<gix::open::Error>,
  },

  /// Failed to fetch from the remote.
  #[error("failed to fetch from '{url}': {source}")]
  Fetch {
    url: String,
    #[source]
    source: Box<dyn std::error::Error + Send + Sync>,
  },

  /// No remote configured for an existing clone.
  #[error("no remote configured for repository at '{0}'")]
  NoRemote(PathBuf),
}

/// Derive the working-directory name for a repository URL.
///
/// Takes the last path component, dropping any `.git` suffix and trailing
/// slashes.
pub fn repo_dir_name(url: &str) -> String {
  let trimmed = url.trim_end_matches('/');
  let basename = trimmed.rsplit(['/', ':']).next().unwrap_or(trimmed);
  basename.trim_end_matches(".git").to_string()
}

/// Clone or update a repository at `dest`.
///
/// Blocking: callers on the async executor should wrap this in
/// `spawn_blocking`.
pub fn checkout(url: &str, dest: &Path) -> Result<(), CheckoutError> {
  if dest.join(".git").exists() {
    debug!(path = %dest.display(), "opening existing repository");
    let repo = gix::open(dest).map_err(|e| CheckoutError::Open {
      path: dest.to_path_buf(),
      source: Box::new(e),
    })?;

    return fetch_updates(&repo, url, dest);
  }

  if let Some(parent) = dest.parent()
    && !parent.as_os_str().is_empty()
  {
    fs::create_dir_all(parent).map_err(|e| CheckoutError::CreateDir(parent.to_path_buf(), e))?;
  }

  info!(url, path = %dest.display(), "cloning repository");
  clone_repo(url, dest)
}

/// Clone a git repository to the specified path.
fn clone_repo(url: &str, dest: &Path) -> Result<(), CheckoutError> {
  let mut prepared = gix::prepare_clone(url, dest).map_err(|e| CheckoutError::Clone {
    url: url.to_string(),
    source: Box::new(e),
  })?;

  let (mut checkout, _outcome) = prepared
    .fetch_then_checkout(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| CheckoutError::Clone {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  let (_repo, _outcome) = checkout
    .main_worktree(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| CheckoutError::Clone {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  Ok(())
}

/// Fetch updates from the remote into an existing clone.
fn fetch_updates(repo: &gix::Repository, url: &str, dest: &Path) -> Result<(), CheckoutError> {
  debug!(url, "fetching updates");

  let remote = repo
    .find_default_remote(Direction::Fetch)
    .ok_or_else(|| CheckoutError::NoRemote(dest.to_path_buf()))?
    .map_err(|e| CheckoutError::Fetch {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  let connection = remote.connect(Direction::Fetch).map_err(|e| CheckoutError::Fetch {
    url: url.to_string(),
    source: Box::new(e),
  })?;

  connection
    .prepare_fetch(gix::progress::Discard, Default::default())
    .map_err(|e| CheckoutError::Fetch {
      url: url.to_string(),
      source: Box::new(e),
    })?
    .receive(gix::progress::Discard, &gix::interrupt::IS_INTERRUPTED)
    .map_err(|e| CheckoutError::Fetch {
      url: url.to_string(),
      source: Box::new(e),
    })?;

  Ok(())
}
