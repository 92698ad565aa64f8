//! In-memory snapshot of the source package, partitioned into static and passthrough entries.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io;
use std::path::{Component, Path};

use tracing::{info, warn};
use walkdir::WalkDir;

use crate::error::{BuildError, BuildResult};
use crate::models::CombinedBundles;
use crate::project::OptimizerLayout;

/// Content of a snapshot entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileContent {
  /// Content that decoded cleanly as UTF-8.
  Text(String),
  /// Content kept byte-for-byte.
  Binary(Vec<u8>),
}

impl FileContent {
  /// Classify raw bytes as text or binary.
  ///
  /// Bytes are text only when they decode as UTF-8 without producing a replacement character.
  pub fn from_bytes(bytes: Vec<u8>) -> Self {
    match String::from_utf8(bytes) {
      Ok(text) if !text.contains(char::REPLACEMENT_CHARACTER) => Self::Text(text),
      Ok(text) => Self::Binary(text.into_bytes()),
      Err(err) => Self::Binary(err.into_bytes()),
    }
  }

  /// Raw bytes that would be written for this entry.
  pub fn as_bytes(&self) -> &[u8] {
    match self {
      Self::Text(text) => text.as_bytes(),
      Self::Binary(bytes) => bytes,
    }
  }

  /// Text content, when the entry is text.
  pub fn as_text(&self) -> Option<&str> {
    match self {
      Self::Text(text) => Some(text),
      Self::Binary(_) => None,
    }
  }
}

/// Snapshot of every file of a build, keyed by slash-separated path rooted at `/`.
#[derive(Debug, Clone, Default)]
pub struct ContentSnapshot {
  entries: BTreeMap<String, FileContent>,
  static_paths: BTreeSet<String>,
}

impl ContentSnapshot {
  /// Read every non-hidden file below `source_root` into memory.
  pub fn capture(source_root: &Path, layout: &OptimizerLayout) -> BuildResult<Self> {
    let mut snapshot = Self::default();

    for entry in WalkDir::new(source_root).follow_links(true).sort_by_file_name() {
      let entry = entry.map_err(|err| BuildError::Read {
        path: err
          .path()
          .map(Path::to_path_buf)
          .unwrap_or_else(|| source_root.to_path_buf()),
        source: io::Error::from(err),
      })?;
      if !entry.file_type().is_file() {
        continue;
      }
      if entry.file_name().to_string_lossy().starts_with('.') {
        continue;
      }

      let path = entry.path();
      let relative = path.strip_prefix(source_root).unwrap_or(path);
      let key = snapshot_key(relative);
      let bytes = fs::read(path).map_err(|source| BuildError::Read {
        path: path.to_path_buf(),
        source,
      })?;

      let is_static = layout.is_static_path(&key);
      snapshot.insert(key, FileContent::from_bytes(bytes), is_static);
    }

    info!(
      files = snapshot.len(),
      static_files = snapshot.static_paths.len(),
      root = %source_root.display(),
      "captured package snapshot"
    );
    Ok(snapshot)
  }

  /// Insert or replace an entry.
  pub fn insert(&mut self, path: impl Into<String>, content: FileContent, is_static: bool) {
    let path = path.into();
    if is_static {
      self.static_paths.insert(path.clone());
    } else {
      self.static_paths.remove(&path);
    }
    self.entries.insert(path, content);
  }

  /// Add the combined bundles as static entries and the serialised alias map as a passthrough entry.
  pub fn merge_bundles(
    &mut self,
    layout: &OptimizerLayout,
    bundles: &CombinedBundles,
    alias_map_path: &str,
  ) -> BuildResult<()> {
    for (path, body) in [
      (&layout.script_bundle_path, &bundles.script),
      (&layout.stylesheet_bundle_path, &bundles.stylesheet),
    ] {
      if self.entries.contains_key(path) {
        warn!(path = %path, "combined bundle replaces a file from the package");
      }
      self.insert(path.clone(), FileContent::Text(body.clone()), true);
    }

    let alias_json = serde_json::to_string_pretty(&bundles.alias_map)?;
    self.insert(
      normalise_entry_path(alias_map_path)?,
      FileContent::Text(alias_json),
      false,
    );
    Ok(())
  }

  /// Content stored at `path`.
  pub fn get(&self, path: &str) -> Option<&FileContent> {
    self.entries.get(path)
  }

  /// Whether `path` is eligible for fingerprinting.
  pub fn is_static(&self, path: &str) -> bool {
    self.static_paths.contains(path)
  }

  /// Static entries in path order.
  pub fn static_entries(&self) -> impl Iterator<Item = (&str, &FileContent)> {
    self
      .static_paths
      .iter()
      .filter_map(|path| self.entries.get(path).map(|content| (path.as_str(), content)))
  }

  /// Every entry in path order.
  pub fn entries(&self) -> impl Iterator<Item = (&str, &FileContent)> {
    self
      .entries
      .iter()
      .map(|(path, content)| (path.as_str(), content))
  }

  /// Mutable access to every entry in path order.
  pub fn entries_mut(&mut self) -> impl Iterator<Item = (&str, &mut FileContent)> {
    self
      .entries
      .iter_mut()
      .map(|(path, content)| (path.as_str(), content))
  }

  /// Number of entries.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Whether the snapshot holds no entries.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}

/// Convert a path relative to the package root into a snapshot key.
fn snapshot_key(relative: &Path) -> String {
  let segments: Vec<String> = relative
    .components()
    .filter_map(|component| match component {
      Component::Normal(segment) => Some(segment.to_string_lossy().into_owned()),
      _ => None,
    })
    .collect();
  format!("/{}", segments.join("/"))
}

/// Root a caller-supplied entry path at `/` with forward slashes.
///
/// `.` segments are dropped. Paths leaving the package through `..`, or naming no file, are
/// rejected.
pub fn normalise_entry_path(path: &str) -> BuildResult<String> {
  let unified = path.replace('\\', "/");
  let mut segments = Vec::new();
  for segment in unified.split('/') {
    match segment {
      "" | "." => {}
      ".." => {
        return Err(BuildError::config(path, "entry path must stay inside the output directory"));
      }
      segment => segments.push(segment),
    }
  }
  if segments.is_empty() {
    return Err(BuildError::config(path, "entry path names no file"));
  }
  Ok(format!("/{}", segments.join("/")))
}
