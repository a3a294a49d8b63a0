use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cmd;
mod output;

/// jig - dependency-ordered task runner for C++ projects
#[derive(Parser)]
#[command(name = "jig")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Tasks to run; the build file's default task when empty
  targets: Vec<String>,

  /// Path to the build file
  #[arg(short, long, default_value = "jig.toml")]
  file: PathBuf,

  /// Re-run tasks even when their targets already exist
  #[arg(short = 'R', long)]
  rebuild: bool,

  /// Remove the named tasks' targets instead of running them
  #[arg(short, long)]
  clean: bool,

  /// List the tasks defined in the build file
  #[arg(short, long)]
  list: bool,

  /// Maximum number of tasks to run in parallel
  #[arg(short, long)]
  jobs: Option<usize>,

  /// Enable verbose output
  #[arg(short, long)]
  verbose: bool,
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  // RUST_LOG wins when set; -v lowers the default filter to debug.
  let filter = EnvFilter::try_from_default_env()
    .unwrap_or_else(|_| EnvFilter::new(if cli.verbose { "debug" } else { "warn" }));
  tracing_subscriber::fmt().with_env_filter(filter).without_time().init();

  if cli.list {
    cmd::cmd_list(&cli.file)
  } else if cli.clean {
    cmd::cmd_clean(&cli.file, &cli.targets)
  } else {
    cmd::cmd_run(&cli.file, &cli.targets, cli.rebuild, cli.jobs)
  }
}
