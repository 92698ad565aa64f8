use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use static_optimizer::logging::{LogLevel, init_logging};
use static_optimizer::{BuildContext, ServerDescriptor, StaticBuilder};

/// Bundle, fingerprint and rewrite the static assets of a module-tree server.
#[derive(Debug, Parser)]
#[command(name = "static-optimizer", version, about)]
struct Args {
  /// Server descriptor JSON declaring the package directory and module tree.
  descriptor: PathBuf,
  /// Directory receiving the optimized package. Replaced only when the build succeeds.
  #[arg(short, long)]
  out: PathBuf,
  /// Path of the alias map inside the output directory.
  #[arg(long, default_value = "static-aliases.json")]
  alias_map: String,
  /// Log verbosity (silent, error, warn, info, debug).
  #[arg(long, default_value = "info")]
  log_level: LogLevel,
}

fn main() -> ExitCode {
  let args = Args::parse();
  init_logging(args.log_level);

  match run(&args) {
    Ok(()) => ExitCode::SUCCESS,
    Err(err) => {
      error!("{err:#}");
      ExitCode::FAILURE
    }
  }
}

fn run(args: &Args) -> Result<()> {
  let descriptor = ServerDescriptor::load(&args.descriptor)
    .with_context(|| format!("failed to load descriptor {}", args.descriptor.display()))?;
  let layout = descriptor.optimizer.to_layout();
  let tree = descriptor.module_tree()?;
  let loader = descriptor.loader();

  let builder = StaticBuilder::new(BuildContext {
    layout: &layout,
    root: &tree,
    loader: &loader,
    package_path: &descriptor.package_path,
  });
  let report = builder
    .build(&args.out, &args.alias_map)
    .context("optimization failed")?;

  info!(
    routes = report.routes.len(),
    fingerprinted = report.fingerprints.len(),
    rewritten = report.files_rewritten,
    written = report.files_written,
    "build complete"
  );
  Ok(())
}
