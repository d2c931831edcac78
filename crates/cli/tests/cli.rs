use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use std::fs;
use std::path::PathBuf;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
  let path = dir.path().join(name);
  fs::write(&path, content).unwrap();
  path
}

fn bin() -> Command {
  Command::cargo_bin("codemend").unwrap()
}

#[test]
fn learn_reports_reproduction() {
  let dir = TempDir::new().unwrap();
  let before = write(&dir, "before.py", "x = 0\n");
  let after = write(&dir, "after.py", "x = 1\n");
  bin()
    .arg("learn")
    .arg("--before")
    .arg(&before)
    .arg("--after")
    .arg(&after)
    .assert()
    .success()
    .stdout(predicate::str::contains(
      "reproduces the corrected program: yes",
    ));
}

#[test]
fn learn_fails_on_identical_pair() {
  let dir = TempDir::new().unwrap();
  let before = write(&dir, "before.py", "x = 0\n");
  let after = write(&dir, "after.py", "x = 0\n");
  bin()
    .arg("learn")
    .arg("--before")
    .arg(&before)
    .arg("--after")
    .arg(&after)
    .assert()
    .failure()
    .stderr(predicate::str::contains("No transformation"));
}

#[test]
fn fix_prints_repaired_source() {
  let dir = TempDir::new().unwrap();
  let before = write(&dir, "before.py", "x = 0\n");
  let after = write(&dir, "after.py", "x = 1\n");
  let target = write(&dir, "target.py", "y = 0\n");
  // `true` exits 0 for any candidate, so the first rewrite is accepted
  bin()
    .arg("fix")
    .arg("--example")
    .arg(format!("{},{}", before.display(), after.display()))
    .arg("--target")
    .arg(&target)
    .arg("--mode")
    .arg("general")
    .arg("--interpreter")
    .arg("true")
    .assert()
    .success()
    .stdout("y = 1\n");
}

#[test]
fn fix_reports_not_fixed() {
  let dir = TempDir::new().unwrap();
  let before = write(&dir, "before.py", "x = 0\n");
  let after = write(&dir, "after.py", "x = 1\n");
  let target = write(&dir, "target.py", "y = 0\n");
  bin()
    .arg("fix")
    .arg("--example")
    .arg(format!("{},{}", before.display(), after.display()))
    .arg("--target")
    .arg(&target)
    .arg("--interpreter")
    .arg("false")
    .assert()
    .code(2)
    .stderr(predicate::str::contains("not fixed"));
}

#[test]
fn fix_reads_examples_from_corpus() {
  let dir = TempDir::new().unwrap();
  let before = write(&dir, "before.py", "x = 0\n");
  let after = write(&dir, "after.py", "x = 1\n");
  let target = write(&dir, "target.py", "y = 0\n");
  let corpus = write(
    &dir,
    "corpus.json",
    &format!(
      r#"[{{"before": "{}", "after": "{}"}}]"#,
      before.display(),
      after.display()
    ),
  );
  bin()
    .arg("fix")
    .arg("--corpus")
    .arg(&corpus)
    .arg("--target")
    .arg(&target)
    .arg("--mode")
    .arg("general")
    .arg("--interpreter")
    .arg("true")
    .assert()
    .success()
    .stdout("y = 1\n");
}

#[test]
fn forbid_requires_a_function_name() {
  let dir = TempDir::new().unwrap();
  let before = write(&dir, "before.py", "x = 0\n");
  let after = write(&dir, "after.py", "x = 1\n");
  let target = write(&dir, "target.py", "y = 0\n");
  bin()
    .arg("fix")
    .arg("--example")
    .arg(format!("{},{}", before.display(), after.display()))
    .arg("--target")
    .arg(&target)
    .arg("--forbid")
    .arg("recursion")
    .assert()
    .failure()
    .stderr(predicate::str::contains("--forbid requires --require"));
}
