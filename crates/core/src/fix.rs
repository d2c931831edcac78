//! The fix loop: run ranked candidate programs against a broken tree,
//! filter statically, test dynamically, return the first repair.
//!
//! The loop is total. Candidates that fail to apply, fail the static
//! filter, crash the oracle or time out are skipped; the loop either
//! returns a repaired source string or `None`.

use crate::kind::NodeKind;
use crate::lang::{ParseError, SourceLang};
use crate::learn::{learn, Example, LearnOptions};
use crate::node::{Node, Tree, Visit};
use crate::program::Program;

use tracing::{debug, warn};

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::str::FromStr;
use std::sync::Mutex;
use std::thread;
use std::time::{Duration, Instant};

/// Upper bound on candidates tried per program invocation.
const CANDIDATE_CAP: usize = 200;

/// Test fragments mapped to their expected exit status.
pub type TestSuite = BTreeMap<String, i32>;

/// Decides whether a rewritten source passes the submission's tests.
pub trait TestOracle {
  fn run(&self, source: &str, tests: &TestSuite) -> bool;
}

/// Adapter turning a closure into an oracle; handy for tests and for
/// callers with their own test harness.
pub struct OracleFn<F>(pub F);

impl<F> TestOracle for OracleFn<F>
where
  F: Fn(&str, &TestSuite) -> bool,
{
  fn run(&self, source: &str, tests: &TestSuite) -> bool {
    (self.0)(source, tests)
  }
}

/// Runs the rewritten program plus the test fragments in an interpreter
/// subprocess. Exit code 0 within the time budget is a pass; everything
/// else, including spawn failure and timeout, is a fail.
pub struct InterpreterOracle {
  interpreter: PathBuf,
  timeout: Duration,
}

impl InterpreterOracle {
  pub fn new() -> Self {
    Self::with_interpreter("python3")
  }

  pub fn with_interpreter<P: Into<PathBuf>>(interpreter: P) -> Self {
    Self {
      interpreter: interpreter.into(),
      timeout: Duration::from_millis(1500),
    }
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }
}

impl Default for InterpreterOracle {
  fn default() -> Self {
    Self::new()
  }
}

impl TestOracle for InterpreterOracle {
  fn run(&self, source: &str, tests: &TestSuite) -> bool {
    let mut merged = String::from(source);
    if !merged.ends_with('\n') {
      merged.push('\n');
    }
    for test in tests.keys() {
      merged.push_str(test);
      merged.push('\n');
    }
    let child = Command::new(&self.interpreter)
      .arg("-c")
      .arg(&merged)
      .stdin(Stdio::null())
      .stdout(Stdio::null())
      .stderr(Stdio::null())
      .spawn();
    let mut child = match child {
      Ok(child) => child,
      Err(err) => {
        warn!(error = %err, "failed to spawn test interpreter");
        return false;
      }
    };
    let deadline = Instant::now() + self.timeout;
    loop {
      match child.try_wait() {
        Ok(Some(status)) => return status.success(),
        Ok(None) => {
          if Instant::now() >= deadline {
            debug!(timeout = ?self.timeout, "test run timed out, killing child");
            let _ = child.kill();
            let _ = child.wait();
            return false;
          }
          thread::sleep(Duration::from_millis(10));
        }
        Err(err) => {
          warn!(error = %err, "failed to wait for test interpreter");
          let _ = child.kill();
          let _ = child.wait();
          return false;
        }
      }
    }
  }
}

/// Syntactic features an assignment may forbid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StaticFeature {
  Recursion,
  For,
  While,
  Assign,
  AugAssign,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown static feature: {0}")]
pub struct UnknownFeature(String);

impl FromStr for StaticFeature {
  type Err = UnknownFeature;
  fn from_str(s: &str) -> Result<Self, Self::Err> {
    match s {
      "recursion" => Ok(Self::Recursion),
      "for" => Ok(Self::For),
      "while" => Ok(Self::While),
      "assign" | "Assign" => Ok(Self::Assign),
      "aug-assign" | "AugAssign" => Ok(Self::AugAssign),
      other => Err(UnknownFeature(other.to_string())),
    }
  }
}

/// Requires a named function to exist and to avoid the forbidden features.
pub struct StaticTests {
  pub function_name: String,
  pub forbidden: Vec<StaticFeature>,
}

impl StaticTests {
  pub fn new<S: Into<String>>(function_name: S, forbidden: Vec<StaticFeature>) -> Self {
    Self {
      function_name: function_name.into(),
      forbidden,
    }
  }

  pub fn check(&self, tree: &Tree) -> bool {
    let mut def = None;
    tree.root().walk(&mut |node| {
      if node.kind() == NodeKind::FunctionDef && node.value() == Some(self.function_name.as_str())
      {
        def = Some(node.id());
        Visit::Stop
      } else {
        Visit::Continue
      }
    });
    let Some(def) = def else {
      return false;
    };
    let def = tree.get(def);
    self
      .forbidden
      .iter()
      .all(|feature| !contains_feature(def, *feature, &self.function_name))
  }
}

fn contains_feature(def: Node, feature: StaticFeature, function_name: &str) -> bool {
  let mut found = false;
  def.walk(&mut |node| {
    let hit = match feature {
      StaticFeature::Recursion => {
        node.kind() == NodeKind::Call
          && node.child(0).is_some_and(|callee| {
            callee.kind() == NodeKind::Name && callee.value() == Some(function_name)
          })
      }
      StaticFeature::For => node.kind() == NodeKind::For,
      StaticFeature::While => node.kind() == NodeKind::While,
      StaticFeature::Assign => node.kind() == NodeKind::Assign,
      StaticFeature::AugAssign => node.kind() == NodeKind::AugAssign,
    };
    if hit {
      found = true;
      Visit::Stop
    } else {
      Visit::Continue
    }
  });
  found
}

/// Success histogram of applied programs, keyed by display form. Updated
/// only on success; takes a mutex so concurrent fixers stay safe.
#[derive(Default)]
pub struct UsedPrograms(Mutex<HashMap<String, usize>>);

impl UsedPrograms {
  pub fn record(&self, program: &Program) {
    let mut counts = self.0.lock().expect("histogram lock poisoned");
    *counts.entry(program.to_string()).or_insert(0) += 1;
  }

  pub fn counts(&self) -> HashMap<String, usize> {
    self.0.lock().expect("histogram lock poisoned").clone()
  }
}

/// Applies learned programs to broken submissions.
pub struct Fixer<'l, L: SourceLang, O: TestOracle> {
  lang: &'l L,
  oracle: O,
  static_tests: Option<StaticTests>,
  used: UsedPrograms,
}

impl<'l, L: SourceLang, O: TestOracle> Fixer<'l, L, O> {
  pub fn new(lang: &'l L, oracle: O) -> Self {
    Self {
      lang,
      oracle,
      static_tests: None,
      used: UsedPrograms::default(),
    }
  }

  pub fn static_tests(mut self, tests: StaticTests) -> Self {
    self.static_tests = Some(tests);
    self
  }

  pub fn used_programs(&self) -> &UsedPrograms {
    &self.used
  }

  /// Try each ranked program in turn; return the first repaired source that
  /// passes the filters and the oracle.
  pub fn fix(
    &self,
    source: &str,
    programs: &[Program],
    tests: &TestSuite,
  ) -> Result<Option<String>, ParseError> {
    let broken = self.lang.parse(source)?;
    for program in programs {
      debug!(program = %program, "trying candidate program");
      if let Some(fixed) = self.try_program(&broken, program, tests) {
        self.used.record(program);
        return Ok(Some(fixed));
      }
    }
    Ok(None)
  }

  /// Leave-one-out evaluation: learn each cluster with the held-out mistake
  /// removed, skipping clusters left without examples.
  pub fn fix_excluding(
    &self,
    source: &str,
    clusters: &[Vec<Example>],
    exclude: Option<(usize, usize)>,
    options: &LearnOptions,
    tests: &TestSuite,
  ) -> Result<Option<String>, ParseError> {
    let broken = self.lang.parse(source)?;
    for (cluster_index, cluster) in clusters.iter().enumerate() {
      let examples: Vec<Example> = match exclude {
        Some((c, e)) if c == cluster_index => cluster
          .iter()
          .enumerate()
          .filter(|(i, _)| *i != e)
          .map(|(_, example)| example.clone())
          .collect(),
        _ => cluster.clone(),
      };
      if examples.is_empty() {
        continue;
      }
      let Ok(programs) = learn(&examples, options) else {
        continue;
      };
      for program in &programs {
        debug!(cluster = cluster_index, program = %program, "trying candidate program");
        if let Some(fixed) = self.try_program(&broken, program, tests) {
          self.used.record(program);
          return Ok(Some(fixed));
        }
      }
    }
    Ok(None)
  }

  fn try_program(&self, broken: &Tree, program: &Program, tests: &TestSuite) -> Option<String> {
    for candidate in program.run(broken).take(CANDIDATE_CAP) {
      if let Some(static_tests) = &self.static_tests {
        if !static_tests.check(&candidate) {
          continue;
        }
      }
      let source = self.lang.unparse(&candidate);
      if self.oracle.run(&source, tests) {
        return Some(source);
      }
    }
    None
  }
}
