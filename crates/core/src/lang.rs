//! Seam between the generic engine and a concrete language front end.

use crate::node::Tree;

/// A language provides a deterministic parser and an unparser whose output
/// re-parses to a structurally equivalent tree.
pub trait SourceLang {
  fn parse(&self, source: &str) -> Result<Tree, ParseError>;
  fn unparse(&self, tree: &Tree) -> String;
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("parse error at line {line}: {message}")]
pub struct ParseError {
  pub line: usize,
  pub message: String,
}

impl ParseError {
  pub fn new<S: Into<String>>(line: usize, message: S) -> Self {
    Self {
      line,
      message: message.into(),
    }
  }
}
