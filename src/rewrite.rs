//! Rewrite quoted references to static files so they point at versioned names.
//!
//! Matching is textual: a reference is a path literal wrapped in `'`, `"` or `(` whose final
//! segment is the basename of a known static file. Literals of any other shape are left alone.

use std::borrow::Cow;

use regex::{Captures, Regex};
use tracing::{debug, info};

use crate::error::BuildResult;
use crate::fingerprint::FingerprintIndex;
use crate::snapshot::{ContentSnapshot, FileContent};

const REWRITABLE_EXTENSIONS: [&str; 4] = ["js", "css", "html", "json"];

/// Whether entries at `path` are scanned for references.
pub fn is_rewritable(path: &str) -> bool {
  let name = path.rsplit('/').next().unwrap_or(path);
  name
    .rsplit_once('.')
    .is_some_and(|(_, extension)| {
      REWRITABLE_EXTENSIONS
        .iter()
        .any(|candidate| extension.eq_ignore_ascii_case(candidate))
    })
}

/// Rewrites references using a fully built [`FingerprintIndex`].
pub struct ReferenceRewriter<'a> {
  index: &'a FingerprintIndex,
  pattern: Option<Regex>,
}

impl<'a> ReferenceRewriter<'a> {
  /// Compile the reference pattern over every basename in the index.
  pub fn new(index: &'a FingerprintIndex) -> BuildResult<Self> {
    let basenames = index.basenames();
    if basenames.is_empty() {
      return Ok(Self {
        index,
        pattern: None,
      });
    }

    let alternation = basenames
      .iter()
      .map(|name| regex::escape(name))
      .collect::<Vec<_>>()
      .join("|");
    let pattern = Regex::new(&format!(
      r#"(['"(])(/?(?:[\w.-]+/)*(?:{alternation}))(\\?['")])"#
    ))?;

    Ok(Self {
      index,
      pattern: Some(pattern),
    })
  }

  /// Rewrite references inside `text`, resolving relative ones against `containing_path`.
  pub fn rewrite_text<'t>(&self, containing_path: &str, text: &'t str) -> Cow<'t, str> {
    let Some(pattern) = &self.pattern else {
      return Cow::Borrowed(text);
    };

    pattern.replace_all(text, |caps: &Captures| {
      let reference = &caps[2];
      let replacement = self
        .versioned_reference(containing_path, reference)
        .unwrap_or_else(|| reference.to_string());
      format!("{}{}{}", &caps[1], replacement, &caps[3])
    })
  }

  /// Rewrite every text entry with a rewritable extension. Returns the number of entries changed.
  pub fn rewrite_snapshot(&self, snapshot: &mut ContentSnapshot) -> usize {
    let mut changed = 0;
    for (path, content) in snapshot.entries_mut() {
      if !is_rewritable(path) {
        continue;
      }
      let FileContent::Text(text) = content else {
        continue;
      };

      let rewritten = match self.rewrite_text(path, text) {
        Cow::Owned(updated) if updated != *text => Some(updated),
        _ => None,
      };
      if let Some(updated) = rewritten {
        debug!(path = %path, "rewrote static references");
        *text = updated;
        changed += 1;
      }
    }
    info!(files = changed, "rewrote references to static files");
    changed
  }

  fn versioned_reference(&self, containing_path: &str, reference: &str) -> Option<String> {
    if reference.contains("://") {
      return None;
    }
    if reference.starts_with('/') {
      return self.index.get(reference).map(str::to_string);
    }

    let resolved = resolve_relative(containing_path, reference);
    let versioned = self.index.get(&resolved)?;
    let versioned_name = versioned.rsplit('/').next().unwrap_or(versioned);
    Some(match reference.rfind('/') {
      Some(index) => format!("{}{}", &reference[..=index], versioned_name),
      None => versioned_name.to_string(),
    })
  }
}

/// Join `reference` onto the directory of `containing_path`, collapsing `.` and `..` segments.
fn resolve_relative(containing_path: &str, reference: &str) -> String {
  let directory = containing_path
    .rsplit_once('/')
    .map_or("", |(directory, _)| directory);

  let mut segments: Vec<&str> = Vec::new();
  for segment in directory.split('/').chain(reference.split('/')) {
    match segment {
      "" | "." => {}
      ".." => {
        segments.pop();
      }
      other => segments.push(other),
    }
  }
  format!("/{}", segments.join("/"))
}
