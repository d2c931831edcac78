/*!
Python front end for codemend.

Parses the beginner subset of Python into `codemend-core` trees and prints
trees back as canonical source. Round-trips are stable: unparsing a parsed
tree and re-parsing the result yields a structurally equivalent tree.
*/

mod lexer;
mod parser;
mod unparser;

use codemend_core::{ParseError, SourceLang, Tree};

/// The Python language instantiation.
#[derive(Debug, Clone, Copy, Default)]
pub struct Python;

impl SourceLang for Python {
  fn parse(&self, source: &str) -> Result<Tree, ParseError> {
    let tokens = lexer::tokenize(source)?;
    let parsed = parser::parse_module(tokens)?;
    Ok(Tree::wrap(parsed))
  }

  fn unparse(&self, tree: &Tree) -> String {
    unparser::unparse(tree)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use codemend_core::diff;

  fn parse(source: &str) -> Tree {
    Python.parse(source).expect("fixture must parse")
  }

  const ROUND_TRIPS: &[&str] = &[
    "x = 0",
    "x += 1",
    "return",
    "f(1, 2,)",
    "print('hello')",
    "x = (a + b) * c",
    "x, y = y, x",
    "biggest = a if a > b else b",
    "def f(n):\n    return n - 1",
    "def gcd(a, b):\n    while b > 0:\n        a, b = b, a % b\n    return a",
    "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3",
    "for i in range(10):\n    total += i ** 2",
    "if x: return 1",
    "while not done:\n    step()",
  ];

  #[test]
  fn test_roundtrip_is_structurally_stable() {
    for source in ROUND_TRIPS {
      let tree = parse(source);
      let printed = Python.unparse(&tree);
      let reparsed = Python
        .parse(&printed)
        .unwrap_or_else(|e| panic!("unparse of {source:?} must re-parse: {e}\n{printed}"));
      assert_eq!(
        diff(&reparsed, &tree).cost(),
        0,
        "round trip changed {source:?}:\n{printed}"
      );
    }
  }

  #[test]
  fn test_canonical_formatting() {
    assert_eq!(Python.unparse(&parse("x=1")), "x = 1\n");
    assert_eq!(
      Python.unparse(&parse("def f( n ):\n    return n")),
      "def f(n):\n    return n\n"
    );
  }

  #[test]
  fn test_elif_is_reconstructed() {
    let source = "if a:\n    x = 1\nelif b:\n    x = 2\nelse:\n    x = 3\n";
    assert_eq!(Python.unparse(&parse(source)), source);
  }

  #[test]
  fn test_parse_error_carries_line() {
    let err = Python.parse("x = 1\noops =").unwrap_err();
    assert_eq!(err.line, 2);
  }

  #[test]
  fn test_empty_source_is_empty_module() {
    let tree = parse("");
    assert_eq!(tree.node_count(), 1);
    assert_eq!(Python.unparse(&tree), "");
  }
}
