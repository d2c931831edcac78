use std::fmt;
use std::path::PathBuf;

/// User-facing context attached to errors on the way out of the CLI.
#[derive(Debug, Clone)]
pub enum ErrorContext {
  ReadFile(PathBuf),
  ParseSource(PathBuf),
  ReadTests(PathBuf),
  ReadCorpus(PathBuf),
  LearnFailed,
}

impl fmt::Display for ErrorContext {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    use ErrorContext::*;
    match self {
      ReadFile(path) => write!(f, "Cannot read file {}.", path.display()),
      ParseSource(path) => write!(f, "Cannot parse source file {}.", path.display()),
      ReadTests(path) => write!(f, "Cannot read test suite {}.", path.display()),
      ReadCorpus(path) => write!(f, "Cannot read example corpus {}.", path.display()),
      LearnFailed => write!(f, "No transformation could be learned from the examples."),
    }
  }
}
