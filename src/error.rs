//! Error type shared by every stage of the optimizer.

use std::path::PathBuf;

use thiserror::Error;

/// Result alias used across the crate.
pub type BuildResult<T> = Result<T, BuildError>;

/// Failure that aborts a build. Each variant names the file or module that triggered it.
#[derive(Debug, Error)]
pub enum BuildError {
  /// A source file could not be read.
  #[error("failed to read {}: {source}", path.display())]
  Read {
    /// File that could not be read.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// A version token could not be derived from a file's digest.
  #[error("failed to fingerprint {path}: {message}")]
  Hash {
    /// Snapshot path being fingerprinted.
    path: String,
    /// Description of the failure.
    message: String,
  },
  /// A module or its resources could not be resolved.
  #[error("failed to load module `{module_path}`: {message}")]
  Loader {
    /// Module path that failed to load.
    module_path: String,
    /// Description of the failure.
    message: String,
  },
  /// A script could not be parsed for minification.
  #[error("failed to minify {path}: {message}")]
  Minify {
    /// Snapshot path of the script.
    path: String,
    /// Parser diagnostics.
    message: String,
  },
  /// An output file or directory could not be written.
  #[error("failed to write {}: {source}", path.display())]
  Write {
    /// Destination that could not be written.
    path: PathBuf,
    /// Underlying I/O error.
    #[source]
    source: std::io::Error,
  },
  /// Configuration or descriptor is unreadable or inconsistent.
  #[error("invalid configuration in {}: {message}", path.display())]
  Config {
    /// File the configuration came from.
    path: PathBuf,
    /// Description of the problem.
    message: String,
  },
  /// The reference pattern built from static basenames failed to compile.
  #[error("failed to compile reference pattern: {0}")]
  Pattern(#[from] regex::Error),
  /// The alias map could not be serialised.
  #[error("failed to serialise alias map: {0}")]
  Serialize(#[from] serde_json::Error),
}

impl BuildError {
  /// Shorthand for a [`BuildError::Loader`] error.
  pub fn loader(module_path: impl Into<String>, message: impl Into<String>) -> Self {
    Self::Loader {
      module_path: module_path.into(),
      message: message.into(),
    }
  }

  /// Shorthand for a [`BuildError::Config`] error.
  pub fn config(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
    Self::Config {
      path: path.into(),
      message: message.into(),
    }
  }
}
