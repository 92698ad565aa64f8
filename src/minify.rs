//! Script minification.
//!
//! Uses oxc. Combined bundles are classic browser scripts, so sources are parsed in script mode
//! and top-level names are left unmangled.

use oxc::allocator::Allocator;
use oxc::codegen::{Codegen, CodegenOptions, CommentOptions};
use oxc::mangler::MangleOptions;
use oxc::minifier::{CompressOptions, Minifier, MinifierOptions};
use oxc::parser::Parser;
use oxc::span::SourceType;

use crate::error::{BuildError, BuildResult};

/// Minify the script stored at snapshot path `path`.
pub fn minify_js(path: &str, source: &str) -> BuildResult<String> {
  let allocator = Allocator::default();
  let ret = Parser::new(&allocator, source, SourceType::script()).parse();
  if !ret.errors.is_empty() {
    let message = ret
      .errors
      .iter()
      .map(ToString::to_string)
      .collect::<Vec<_>>()
      .join("; ");
    return Err(BuildError::Minify {
      path: path.to_string(),
      message,
    });
  }

  let mut program = ret.program;
  let options = MinifierOptions {
    mangle: Some(MangleOptions::default()),
    compress: Some(CompressOptions::default()),
  };
  let ret = Minifier::new(options).minify(&allocator, &mut program);
  let code = Codegen::new()
    .with_options(CodegenOptions {
      minify: true,
      comments: CommentOptions::disabled(),
      ..CodegenOptions::default()
    })
    .with_scoping(ret.scoping)
    .build(&program)
    .code;
  Ok(code)
}
