//! Materialise a rewritten snapshot into the output directory.

use std::ffi::{OsStr, OsString};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::info;

use crate::error::{BuildError, BuildResult};
use crate::fingerprint::FingerprintIndex;
use crate::minify::minify_js;
use crate::project::OptimizerLayout;
use crate::snapshot::{ContentSnapshot, FileContent};

/// Counts reported after a successful write.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WriteSummary {
  /// Files written.
  pub files_written: usize,
  /// Scripts minified before writing.
  pub files_minified: usize,
}

/// Write every snapshot entry below `out_dir`, using versioned names for static entries.
///
/// Files are written into a sibling staging directory that replaces `out_dir` only once every
/// entry was written. On failure the staging directory is removed and `out_dir` is untouched.
pub fn write_snapshot(
  snapshot: &ContentSnapshot,
  index: &FingerprintIndex,
  layout: &OptimizerLayout,
  out_dir: &Path,
) -> BuildResult<WriteSummary> {
  let staging = staging_dir_for(out_dir);
  remove_dir_if_present(&staging)?;
  create_dir(&staging)?;

  let summary = match write_entries(snapshot, index, layout, &staging) {
    Ok(summary) => summary,
    Err(err) => {
      let _ = fs::remove_dir_all(&staging);
      return Err(err);
    }
  };

  remove_dir_if_present(out_dir)?;
  fs::rename(&staging, out_dir).map_err(|source| BuildError::Write {
    path: out_dir.to_path_buf(),
    source,
  })?;

  info!(
    files = summary.files_written,
    minified = summary.files_minified,
    out_dir = %out_dir.display(),
    "wrote optimized package"
  );
  Ok(summary)
}

fn write_entries(
  snapshot: &ContentSnapshot,
  index: &FingerprintIndex,
  layout: &OptimizerLayout,
  root: &Path,
) -> BuildResult<WriteSummary> {
  let mut summary = WriteSummary::default();

  for (path, content) in snapshot.entries() {
    let destination_path = index.get(path).unwrap_or(path);
    let destination = root.join(destination_path.trim_start_matches('/'));
    if let Some(parent) = destination.parent() {
      create_dir(parent)?;
    }

    let minified = match content {
      FileContent::Text(text) if should_minify(layout, path) => {
        info!(path = %path, "minifying");
        summary.files_minified += 1;
        Some(minify_js(path, text)?)
      }
      _ => None,
    };
    let bytes = minified
      .as_deref()
      .map_or_else(|| content.as_bytes(), str::as_bytes);

    fs::write(&destination, bytes).map_err(|source| BuildError::Write {
      path: destination.clone(),
      source,
    })?;
    summary.files_written += 1;
  }

  Ok(summary)
}

fn should_minify(layout: &OptimizerLayout, path: &str) -> bool {
  layout.minify_scripts && path.ends_with(".js") && layout.is_static_path(path)
}

fn staging_dir_for(out_dir: &Path) -> PathBuf {
  let mut name = OsString::from(".");
  name.push(out_dir.file_name().unwrap_or_else(|| OsStr::new("output")));
  name.push(".staging");
  out_dir.with_file_name(name)
}

fn create_dir(path: &Path) -> BuildResult<()> {
  fs::create_dir_all(path).map_err(|source| BuildError::Write {
    path: path.to_path_buf(),
    source,
  })
}

fn remove_dir_if_present(path: &Path) -> BuildResult<()> {
  match fs::remove_dir_all(path) {
    Ok(()) => Ok(()),
    Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
    Err(source) => Err(BuildError::Write {
      path: path.to_path_buf(),
      source,
    }),
  }
}
