//! Logging setup for the command line tool.
//!
//! The library only emits `tracing` events; embedders install their own subscriber.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

static INIT: Once = Once::new();

/// Verbosity of the command line output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogLevel {
  /// No output.
  Silent,
  /// Errors only.
  Error,
  /// Errors and warnings.
  Warn,
  /// Phase summaries and minified files.
  #[default]
  Info,
  /// Per-module and per-file detail.
  Debug,
}

impl LogLevel {
  fn as_filter(&self) -> &'static str {
    match self {
      LogLevel::Silent => "off",
      LogLevel::Error => "error",
      LogLevel::Warn => "warn",
      LogLevel::Info => "info",
      LogLevel::Debug => "debug",
    }
  }
}

impl std::str::FromStr for LogLevel {
  type Err = String;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s.to_lowercase().as_str() {
      "silent" | "off" => Ok(LogLevel::Silent),
      "error" => Ok(LogLevel::Error),
      "warn" | "warning" => Ok(LogLevel::Warn),
      "info" => Ok(LogLevel::Info),
      "debug" => Ok(LogLevel::Debug),
      other => Err(format!("invalid log level: {other}")),
    }
  }
}

impl std::fmt::Display for LogLevel {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.write_str(self.as_filter())
  }
}

/// Install a compact stderr subscriber. `RUST_LOG` takes precedence over `level`.
///
/// Only the first call in a process has an effect.
pub fn init_logging(level: LogLevel) {
  INIT.call_once(|| {
    let filter = EnvFilter::try_from_default_env()
      .unwrap_or_else(|_| EnvFilter::new(level.as_filter()));

    tracing_subscriber::registry()
      .with(filter)
      .with(
        fmt::layer()
          .compact()
          .with_target(false)
          .without_time()
          .with_writer(std::io::stderr),
      )
      .init();
  });
}
