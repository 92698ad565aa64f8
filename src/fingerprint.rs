//! Content-addressed file names for static entries.

use std::collections::BTreeMap;

use md5::{Digest, Md5};
use tracing::info;

use crate::error::{BuildError, BuildResult};
use crate::snapshot::ContentSnapshot;

/// Insert a `-v<digest>` token derived from `content` before the extension of `path`.
///
/// Only the final extension of the last path segment is considered; names without an extension
/// get the token appended.
pub fn versioned_filename(path: &str, content: &[u8], digest_length: usize) -> BuildResult<String> {
  if digest_length == 0 {
    return Err(BuildError::Hash {
      path: path.to_string(),
      message: "digest length must be at least one hex character".into(),
    });
  }
  let digest = hex::encode(Md5::digest(content));
  let token = digest.get(..digest_length).ok_or_else(|| BuildError::Hash {
    path: path.to_string(),
    message: format!(
      "digest length {digest_length} exceeds the {} available hex characters",
      digest.len()
    ),
  })?;

  let name_start = path.rfind('/').map_or(0, |index| index + 1);
  let extension_start = path[name_start..]
    .rfind('.')
    .filter(|&offset| offset > 0)
    .map(|offset| name_start + offset);

  Ok(match extension_start {
    Some(index) => format!("{}-v{token}{}", &path[..index], &path[index..]),
    None => format!("{path}-v{token}"),
  })
}

/// Original path to versioned path for every static snapshot entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FingerprintIndex {
  entries: BTreeMap<String, String>,
}

impl FingerprintIndex {
  /// Fingerprint every static entry of the snapshot.
  ///
  /// Must run after the combined bundles are merged and before any reference is rewritten.
  pub fn build(snapshot: &ContentSnapshot, digest_length: usize) -> BuildResult<Self> {
    let mut entries = BTreeMap::new();
    for (path, content) in snapshot.static_entries() {
      let versioned = versioned_filename(path, content.as_bytes(), digest_length)?;
      entries.insert(path.to_string(), versioned);
    }
    info!(files = entries.len(), "fingerprinted static files");
    Ok(Self { entries })
  }

  /// Versioned path for `path`, if it is static.
  pub fn get(&self, path: &str) -> Option<&str> {
    self.entries.get(path).map(String::as_str)
  }

  /// Whether `path` has a versioned name.
  pub fn contains(&self, path: &str) -> bool {
    self.entries.contains_key(path)
  }

  /// Distinct basenames of every indexed path, sorted.
  pub fn basenames(&self) -> Vec<&str> {
    let mut names: Vec<&str> = self
      .entries
      .keys()
      .map(|path| path.rsplit('/').next().unwrap_or(path))
      .collect();
    names.sort_unstable();
    names.dedup();
    names
  }

  /// Pairs of original and versioned paths in path order.
  pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
    self
      .entries
      .iter()
      .map(|(original, versioned)| (original.as_str(), versioned.as_str()))
  }

  /// Number of indexed paths.
  pub fn len(&self) -> usize {
    self.entries.len()
  }

  /// Whether nothing was indexed.
  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }
}
