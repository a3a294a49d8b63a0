mod clean;
mod list;
mod run;

pub use clean::cmd_clean;
pub use list::cmd_list;
pub use run::cmd_run;

use std::path::{Path, PathBuf};

/// The directory relative build paths resolve against.
///
/// Steps run from the build file's directory, so `jig -f sub/jig.toml` behaves
/// the same as running `jig` inside `sub/`.
pub(crate) fn build_root(file: &Path) -> PathBuf {
  match file.parent() {
    Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
    _ => PathBuf::from("."),
  }
}
