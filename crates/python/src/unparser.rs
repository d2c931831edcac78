//! Canonical source printer.
//!
//! Prints trees back as Python with four-space indentation, one statement
//! per line. `elif` chains are reconstructed from nested `If` nodes, and an
//! empty suite prints `pass` so the output always re-parses.

use codemend_core::{Node, NodeKind, Tree};

pub fn unparse(tree: &Tree) -> String {
  let mut out = String::new();
  for stmt in tree.root().children() {
    write_statement(stmt, 0, &mut out);
  }
  out
}

fn push_indent(out: &mut String, level: usize) {
  for _ in 0..level {
    out.push_str("    ");
  }
}

fn simple(out: &mut String, level: usize, text: &str) {
  push_indent(out, level);
  out.push_str(text);
  out.push('\n');
}

fn write_statement(node: Node, level: usize, out: &mut String) {
  use NodeKind::*;
  match node.kind() {
    Assign => {
      let target = node.child(0).map(expr).unwrap_or_default();
      let value = node.child(1).map(expr).unwrap_or_default();
      simple(out, level, &format!("{target} = {value}"));
    }
    AugAssign => {
      let target = node.child(0).map(expr).unwrap_or_default();
      let value = node.child(1).map(expr).unwrap_or_default();
      let op = node.value().unwrap_or("+");
      simple(out, level, &format!("{target} {op}= {value}"));
    }
    ExpressionStatement => {
      let value = node.child(0).map(expr).unwrap_or_default();
      simple(out, level, &value);
    }
    Return => match node.child(0) {
      Some(value) => simple(out, level, &format!("return {}", expr(value))),
      None => simple(out, level, "return"),
    },
    Pass => simple(out, level, "pass"),
    If => write_if(node, level, out, "if"),
    While => {
      let test = node.child(0).map(expr).unwrap_or_default();
      simple(out, level, &format!("while {test}:"));
      write_body(node.child(1), level + 1, out);
    }
    For => {
      let target = node.child(0).map(expr).unwrap_or_default();
      let iterable = node.child(1).map(expr).unwrap_or_default();
      simple(out, level, &format!("for {target} in {iterable}:"));
      write_body(node.child(2), level + 1, out);
    }
    FunctionDef => {
      let params: Vec<_> = node
        .children()
        .filter(|c| c.kind() == Parameter)
        .map(|p| p.value().unwrap_or("_").to_string())
        .collect();
      simple(
        out,
        level,
        &format!("def {}({}):", node.value().unwrap_or("_"), params.join(", ")),
      );
      write_body(node.children().find(|c| c.kind() == Suite), level + 1, out);
    }
    // anything else in statement position prints as a bare expression
    _ => {
      let text = expr(node);
      simple(out, level, &text);
    }
  }
}

fn write_if(node: Node, level: usize, out: &mut String, keyword: &str) {
  let test = node.child(0).map(expr).unwrap_or_default();
  simple(out, level, &format!("{keyword} {test}:"));
  write_body(node.child(1), level + 1, out);
  if let Some(orelse) = node.child(2) {
    let only_child = if orelse.child_count() == 1 {
      orelse.child(0)
    } else {
      None
    };
    match only_child {
      Some(nested) if nested.kind() == NodeKind::If => write_if(nested, level, out, "elif"),
      _ => {
        simple(out, level, "else:");
        write_suite(orelse, level + 1, out);
      }
    }
  }
}

fn write_body(suite: Option<Node>, level: usize, out: &mut String) {
  match suite {
    Some(suite) if suite.kind() == NodeKind::Suite => write_suite(suite, level, out),
    Some(stmt) => write_statement(stmt, level, out),
    None => simple(out, level, "pass"),
  }
}

fn write_suite(node: Node, level: usize, out: &mut String) {
  if node.child_count() == 0 {
    simple(out, level, "pass");
    return;
  }
  for stmt in node.children() {
    write_statement(stmt, level, out);
  }
}

fn expr(node: Node) -> String {
  use NodeKind::*;
  match node.kind() {
    Name | Constant | Parameter => node.value().unwrap_or("_").to_string(),
    BinaryOp => {
      let left = node.child(0).map(expr).unwrap_or_default();
      let right = node.child(1).map(expr).unwrap_or_default();
      format!("{left} {} {right}", node.value().unwrap_or("?"))
    }
    UnaryOp => {
      let operand = node.child(0).map(expr).unwrap_or_default();
      match node.value() {
        Some("not") => format!("not {operand}"),
        Some(op) => format!("{op}{operand}"),
        None => operand,
      }
    }
    Call => {
      let callee = node.child(0).map(expr).unwrap_or_default();
      let args: Vec<_> = node.children().skip(1).map(expr).collect();
      format!("{callee}({})", args.join(", "))
    }
    Arg | IfTest => node.child(0).map(expr).unwrap_or_default(),
    Parenthesis => format!("({})", node.child(0).map(expr).unwrap_or_default()),
    Tuple => {
      let items: Vec<_> = node.children().map(expr).collect();
      if items.len() == 1 {
        format!("{},", items[0])
      } else {
        items.join(", ")
      }
    }
    Conditional => {
      let body = node.child(0).map(expr).unwrap_or_default();
      let test = node.child(1).map(expr).unwrap_or_default();
      let orelse = node.child(2).map(expr).unwrap_or_default();
      format!("{body} if {test} else {orelse}")
    }
    _ => node.value().unwrap_or_default().to_string(),
  }
}
