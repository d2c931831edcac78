mod error;

use error::ErrorContext as EC;

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use codemend_core::{
  learn, Example, Fixer, InterpreterOracle, LearnError, LearnOptions, SourceLang,
  StaticFeature, StaticTests, TestSuite, Tree,
};
use codemend_python::Python;

use std::fs::read_to_string;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[clap(version, about = "Learn AST fixes from examples and repair similar submissions")]
struct App {
  #[clap(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Learn a transformation from one before/after pair and verify it
  #[clap(display_order = 1)]
  Learn(LearnArg),
  /// Repair a broken submission with transformations learned from examples
  #[clap(display_order = 2)]
  Fix(FixArg),
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum Mode {
  /// Prefer templates that pin the surrounding context
  Specific,
  /// Prefer bare-node templates that transfer more widely
  General,
}

impl Mode {
  fn options(self) -> LearnOptions {
    match self {
      Mode::Specific => LearnOptions::specific(),
      Mode::General => LearnOptions::general(),
    }
  }
}

#[derive(Args)]
struct LearnArg {
  /// Path to the broken submission
  #[clap(long)]
  before: PathBuf,
  /// Path to the corrected submission
  #[clap(long)]
  after: PathBuf,
  /// Ranking mode
  #[clap(long, value_enum, default_value = "specific")]
  mode: Mode,
}

#[derive(Args)]
struct FixArg {
  /// Before/after example pair, comma separated (repeatable)
  #[clap(long = "example", value_name = "BEFORE,AFTER")]
  examples: Vec<String>,
  /// JSON corpus: a list of {"before": path, "after": path} pairs
  #[clap(long)]
  corpus: Option<PathBuf>,
  /// The broken submission to repair
  #[clap(long)]
  target: PathBuf,
  /// JSON object mapping test fragments to expected exit status
  #[clap(long)]
  tests: Option<PathBuf>,
  /// Function name the static tests apply to
  #[clap(long, value_name = "FUNCTION")]
  require: Option<String>,
  /// Forbidden syntactic feature, e.g. recursion or while (repeatable)
  #[clap(long = "forbid", value_name = "FEATURE")]
  forbid: Vec<String>,
  /// Ranking mode
  #[clap(long, value_enum, default_value = "specific")]
  mode: Mode,
  /// Interpreter used to run the test suite
  #[clap(long, default_value = "python3")]
  interpreter: String,
}

#[derive(Deserialize)]
struct CorpusEntry {
  before: PathBuf,
  after: PathBuf,
}

fn main() -> Result<ExitCode> {
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::from_default_env())
    .with_writer(std::io::stderr)
    .init();
  let app = App::parse();
  match app.command {
    Commands::Learn(arg) => run_learn(arg),
    Commands::Fix(arg) => run_fix(arg),
  }
}

fn read_source(path: &Path) -> Result<String> {
  read_to_string(path).with_context(|| EC::ReadFile(path.to_path_buf()))
}

fn parse_source(path: &Path) -> Result<Tree> {
  let source = read_source(path)?;
  Python
    .parse(&source)
    .with_context(|| EC::ParseSource(path.to_path_buf()))
}

fn run_learn(arg: LearnArg) -> Result<ExitCode> {
  let before = parse_source(&arg.before)?;
  let after = parse_source(&arg.after)?;
  let canonical = Python.unparse(&after);
  let examples = vec![Example::new(before, after)];
  let programs = learn(&examples, &arg.mode.options()).context(EC::LearnFailed)?;
  let top = &programs[0];
  println!("{top}");
  let reproduces = top
    .run(&examples[0].before)
    .any(|candidate| Python.unparse(&candidate) == canonical);
  println!(
    "reproduces the corrected program: {}",
    if reproduces { "yes" } else { "no" }
  );
  Ok(ExitCode::SUCCESS)
}

fn run_fix(arg: FixArg) -> Result<ExitCode> {
  let examples = collect_examples(&arg)?;
  if examples.is_empty() {
    bail!("no examples given; use --example or --corpus");
  }
  let programs = match learn(&examples, &arg.mode.options()) {
    Ok(programs) => programs,
    Err(LearnError::NoProgram) => {
      eprintln!("not fixed");
      return Ok(ExitCode::from(2));
    }
    Err(err) => return Err(err).context(EC::LearnFailed),
  };
  let tests: TestSuite = match &arg.tests {
    Some(path) => serde_json::from_str(&read_source(path)?)
      .with_context(|| EC::ReadTests(path.clone()))?,
    None => TestSuite::new(),
  };

  let oracle = InterpreterOracle::with_interpreter(&arg.interpreter);
  let mut fixer = Fixer::new(&Python, oracle);
  match (&arg.require, arg.forbid.is_empty()) {
    (Some(function), _) => {
      let features = arg
        .forbid
        .iter()
        .map(|f| f.parse::<StaticFeature>())
        .collect::<Result<Vec<_>, _>>()?;
      fixer = fixer.static_tests(StaticTests::new(function.clone(), features));
    }
    (None, false) => bail!("--forbid requires --require"),
    (None, true) => {}
  }

  let target = read_source(&arg.target)?;
  let fixed = fixer
    .fix(&target, &programs, &tests)
    .with_context(|| EC::ParseSource(arg.target.clone()))?;
  match fixed {
    Some(source) => {
      print!("{source}");
      Ok(ExitCode::SUCCESS)
    }
    None => {
      eprintln!("not fixed");
      Ok(ExitCode::from(2))
    }
  }
}

fn collect_examples(arg: &FixArg) -> Result<Vec<Example>> {
  let mut examples = Vec::new();
  for pair in &arg.examples {
    let Some((before, after)) = pair.split_once(',') else {
      bail!("--example expects BEFORE,AFTER, got `{pair}`");
    };
    examples.push(Example::new(
      parse_source(Path::new(before))?,
      parse_source(Path::new(after))?,
    ));
  }
  if let Some(path) = &arg.corpus {
    let entries: Vec<CorpusEntry> = serde_json::from_str(&read_source(path)?)
      .with_context(|| EC::ReadCorpus(path.clone()))?;
    for entry in entries {
      examples.push(Example::new(
        parse_source(&entry.before)?,
        parse_source(&entry.after)?,
      ));
    }
  }
  Ok(examples)
}
