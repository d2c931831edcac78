//! End-to-end repair scenarios: learn from one submission's fix, repair
//! other submissions that made the same mistake.

use codemend_core::{
  learn, Example, Fixer, InterpreterOracle, LearnOptions, OracleFn, SourceLang,
  StaticFeature, StaticTests, TestOracle, TestSuite,
};
use codemend_python::Python;

use std::process::Command;
use std::time::{Duration, Instant};

fn example(before: &str, after: &str) -> Example {
  Example::new(
    Python.parse(before).expect("before must parse"),
    Python.parse(after).expect("after must parse"),
  )
}

fn pass_all(_: &str, _: &TestSuite) -> bool {
  true
}

#[test]
fn constant_rewrite_transfers_to_other_variables() {
  let examples = vec![example("x = 0", "x = 1")];
  let programs = learn(&examples, &LearnOptions::general()).unwrap();
  let fixer = Fixer::new(&Python, OracleFn(pass_all));
  let fixed = fixer.fix("y = 0", &programs, &TestSuite::new()).unwrap();
  assert_eq!(fixed.as_deref(), Some("y = 1\n"));
}

#[test]
fn constant_rewrite_specific_mode_requires_matching_context() {
  let examples = vec![example("x = 0", "x = 1")];
  let programs = learn(&examples, &LearnOptions::specific()).unwrap();
  // the top-ranked template pins the assignment context, so a different
  // right-hand side stays untouched
  let top = &programs[0];
  assert!(top.template().has_parent_context());
  let broken = Python.parse("x = 5").unwrap();
  assert_eq!(top.run(&broken).count(), 0);
}

#[test]
fn operator_fix_transfers_with_general_ranking() {
  let examples = vec![example("return a - b", "return a + b")];
  let programs = learn(&examples, &LearnOptions::general()).unwrap();
  let fixer = Fixer::new(&Python, OracleFn(pass_all));
  let fixed = fixer
    .fix("return x - y", &programs, &TestSuite::new())
    .unwrap();
  assert_eq!(fixed.as_deref(), Some("return x + y\n"));
}

#[test]
fn operator_fix_specific_template_does_not_transfer() {
  let examples = vec![example("return a - b", "return a + b")];
  let programs = learn(&examples, &LearnOptions::specific()).unwrap();
  let broken = Python.parse("return x - y").unwrap();
  assert_eq!(programs[0].run(&broken).count(), 0);
}

#[test]
fn learned_program_reproduces_its_example() {
  let before = "def double(n):\n    return n * 3";
  let after = "def double(n):\n    return n * 2";
  let examples = vec![example(before, after)];
  let programs = learn(&examples, &LearnOptions::specific()).unwrap();
  let broken = Python.parse(before).unwrap();
  let replayed = programs[0].run(&broken).next().expect("must re-apply");
  let canonical = Python.unparse(&Python.parse(after).unwrap());
  assert_eq!(Python.unparse(&replayed), canonical);
}

#[test]
fn leave_one_out_cluster_fixes_each_held_out_mistake() {
  let cluster = vec![
    example("x = 0", "x = 1"),
    example("y = 0", "y = 1"),
    example("count = 0", "count = 1"),
  ];
  let sources = ["x = 0", "y = 0", "count = 0"];
  let expected = ["x = 1\n", "y = 1\n", "count = 1\n"];
  for held in 0..cluster.len() {
    let want = expected[held].to_string();
    let fixer = Fixer::new(&Python, OracleFn(move |source: &str, _: &TestSuite| source == want));
    let fixed = fixer
      .fix_excluding(
        sources[held],
        std::slice::from_ref(&cluster),
        Some((0, held)),
        &LearnOptions::general(),
        &TestSuite::new(),
      )
      .unwrap();
    assert_eq!(fixed.as_deref(), Some(expected[held]), "held-out {held}");
  }
}

#[test]
fn static_filter_blocks_rewrites_that_introduce_recursion() {
  let before = "def factorial(n):\n    return fact(n - 1)";
  let after = "def factorial(n):\n    return factorial(n - 1)";
  let examples = vec![example(before, after)];
  let programs = learn(&examples, &LearnOptions::general()).unwrap();
  // the oracle accepts exactly the recursive rewrite
  let target = "def factorial(n):\n    return factorial(n - 1)\n";
  let oracle = |source: &str, _: &TestSuite| source == target;

  let unrestricted = Fixer::new(&Python, OracleFn(oracle));
  let fixed = unrestricted
    .fix(before, &programs, &TestSuite::new())
    .unwrap();
  assert_eq!(fixed.as_deref(), Some(target));

  let filtered = Fixer::new(&Python, OracleFn(oracle))
    .static_tests(StaticTests::new("factorial", vec![StaticFeature::Recursion]));
  let rejected = filtered.fix(before, &programs, &TestSuite::new()).unwrap();
  assert!(rejected.is_none());
}

fn python3_available() -> bool {
  Command::new("python3")
    .arg("-c")
    .arg("pass")
    .status()
    .map(|s| s.success())
    .unwrap_or(false)
}

#[test]
fn python_oracle_accepts_only_passing_fixes() {
  if !python3_available() {
    return;
  }
  let examples = vec![example("x = 0", "x = 1")];
  let programs = learn(&examples, &LearnOptions::general()).unwrap();
  let mut tests = TestSuite::new();
  tests.insert("assert y == 1".to_string(), 0);
  let fixer = Fixer::new(&Python, InterpreterOracle::new());
  let fixed = fixer.fix("y = 0", &programs, &tests).unwrap();
  assert_eq!(fixed.as_deref(), Some("y = 1\n"));

  let mut impossible = TestSuite::new();
  impossible.insert("assert y == 2".to_string(), 0);
  let unfixed = fixer.fix("y = 0", &programs, &impossible).unwrap();
  assert!(unfixed.is_none());
}

#[test]
fn python_oracle_kills_infinite_loops() {
  if !python3_available() {
    return;
  }
  let oracle = InterpreterOracle::new().timeout(Duration::from_millis(300));
  let started = Instant::now();
  let looping = "while True:\n    pass";
  assert!(!oracle.run(looping, &TestSuite::new()));
  assert!(started.elapsed() < Duration::from_secs(5));
}
