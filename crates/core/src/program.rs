//! The transformation DSL: `Apply(Patch(edit, Match(template)), ast)`.
//!
//! A `Program` pairs a bound edit with a context template. Invoked on an
//! input tree it yields one rewritten tree per template match, in match
//! order. Rewrites build fresh trees; the input is never mutated.

use crate::kind::NodeKind;
use crate::node::{Node, NodeId, Parsed, Tree};
use crate::template::Template;

use std::fmt;

/// An edit detached from the example trees it was learned from, ready to be
/// replayed at any matched locus.
#[derive(Clone)]
pub struct Edit {
  action: EditAction,
}

#[derive(Clone)]
enum EditAction {
  /// Relabel the locus: new kind and value, children preserved.
  Update {
    kind: NodeKind,
    value: Option<String>,
  },
  /// Insert a copy of the payload under the locus at `index`.
  Insert { payload: Tree, index: usize },
  /// Remove the locus from its parent.
  Delete,
}

impl Edit {
  pub fn update(kind: NodeKind, value: Option<String>) -> Self {
    Self {
      action: EditAction::Update { kind, value },
    }
  }

  pub fn insert(payload: Tree, index: usize) -> Self {
    Self {
      action: EditAction::Insert { payload, index },
    }
  }

  pub fn delete() -> Self {
    Self {
      action: EditAction::Delete,
    }
  }

  /// Whether two witnessed edits agree, which is required before examples
  /// can be merged into one program.
  pub fn compatible(&self, other: &Edit) -> bool {
    use EditAction::*;
    match (&self.action, &other.action) {
      (
        Update { kind, value },
        Update {
          kind: other_kind,
          value: other_value,
        },
      ) => kind == other_kind && value == other_value,
      (
        Insert { payload, index },
        Insert {
          payload: other_payload,
          index: other_index,
        },
      ) => index == other_index && payload.root().deep_equal(&other_payload.root()),
      (Delete, Delete) => true,
      _ => false,
    }
  }

  /// Apply this edit at `locus`, producing a new tree. Returns `None` when
  /// the edit cannot apply there (deleting the root, breaking a fixed
  /// arity).
  pub fn run(&self, ast: &Tree, locus: NodeId) -> Option<Tree> {
    let parsed = match &self.action {
      EditAction::Update { kind, value } => {
        let node = ast.get(locus);
        if let Some(arity) = kind.fixed_arity() {
          if node.child_count() != arity {
            return None;
          }
        }
        relabel(ast.root(), locus, *kind, value.as_deref())
      }
      EditAction::Insert { payload, index } => {
        let node = ast.get(locus);
        if let Some(arity) = node.kind().fixed_arity() {
          if node.child_count() + 1 != arity {
            return None;
          }
        }
        splice(ast.root(), locus, payload, *index)
      }
      EditAction::Delete => {
        let node = ast.get(locus);
        let parent = node.parent()?;
        if let Some(arity) = parent.kind().fixed_arity() {
          if parent.child_count() - 1 != arity {
            return None;
          }
        }
        prune(ast.root(), locus)
      }
    };
    Some(Tree::wrap(parsed))
  }
}

fn shallow(node: Node) -> Parsed {
  match node.value() {
    Some(v) => Parsed::with_value(node.kind(), v),
    None => Parsed::new(node.kind()),
  }
}

fn relabel(node: Node, locus: NodeId, kind: NodeKind, value: Option<&str>) -> Parsed {
  let mut parsed = if node.id() == locus {
    match value {
      Some(v) => Parsed::with_value(kind, v),
      None => Parsed::new(kind),
    }
  } else {
    shallow(node)
  };
  parsed.children = node
    .children()
    .map(|c| relabel(c, locus, kind, value))
    .collect();
  parsed
}

fn splice(node: Node, locus: NodeId, payload: &Tree, index: usize) -> Parsed {
  let mut parsed = shallow(node);
  parsed.children = node
    .children()
    .map(|c| splice(c, locus, payload, index))
    .collect();
  if node.id() == locus {
    let at = index.min(parsed.children.len());
    parsed.children.insert(at, payload.root().to_parsed());
  }
  parsed
}

fn prune(node: Node, locus: NodeId) -> Parsed {
  let mut parsed = shallow(node);
  parsed.children = node
    .children()
    .filter(|c| c.id() != locus)
    .map(|c| prune(c, locus))
    .collect();
  parsed
}

impl fmt::Display for Edit {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match &self.action {
      EditAction::Update { kind, value } => match value {
        Some(v) => write!(f, "Update({kind} {v})"),
        None => write!(f, "Update({kind})"),
      },
      EditAction::Insert { payload, index } => {
        write!(f, "Insert({} @ {index})", payload.root().to_sexp())
      }
      EditAction::Delete => f.write_str("Delete"),
    }
  }
}

/// A learned transformation with its ranking score.
#[derive(Clone)]
pub struct Program {
  edit: Edit,
  template: Template,
  score: i32,
}

impl Program {
  pub fn new(edit: Edit, template: Template, score: i32) -> Self {
    Self {
      edit,
      template,
      score,
    }
  }

  pub fn edit(&self) -> &Edit {
    &self.edit
  }

  pub fn template(&self) -> &Template {
    &self.template
  }

  pub fn score(&self) -> i32 {
    self.score
  }

  /// Lazily rewrite `ast` once per template match, in match order.
  pub fn run<'a>(&'a self, ast: &'a Tree) -> impl Iterator<Item = Tree> + 'a {
    self
      .template
      .find_all(ast.root())
      .filter_map(move |locus| self.edit.run(ast, locus.id()))
  }
}

impl fmt::Display for Program {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "Apply(Patch({}, Match({})))", self.edit, self.template)
  }
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::kind::NodeKind::*;
  use crate::node::fixture::*;

  #[test]
  fn test_update_relabels_value() {
    let tree = assign_module("x", "0");
    let rhs = tree.root().child(0).unwrap().child(1).unwrap();
    let edit = Edit::update(Constant, Some("1".into()));
    let rewritten = edit.run(&tree, rhs.id()).unwrap();
    let expected = assign_module("x", "1");
    assert!(rewritten.root().deep_equal(&expected.root()));
  }

  #[test]
  fn test_update_preserves_children() {
    let tree = return_binop_module("-", "a", "b");
    let binop = tree.root().child(0).unwrap().child(0).unwrap();
    let edit = Edit::update(BinaryOp, Some("+".into()));
    let rewritten = edit.run(&tree, binop.id()).unwrap();
    let expected = return_binop_module("+", "a", "b");
    assert!(rewritten.root().deep_equal(&expected.root()));
  }

  #[test]
  fn test_update_rejects_arity_mismatch() {
    let tree = assign_module("x", "0");
    let rhs = tree.root().child(0).unwrap().child(1).unwrap();
    // a constant has no children, so it cannot become a binary op
    let edit = Edit::update(BinaryOp, Some("+".into()));
    assert!(edit.run(&tree, rhs.id()).is_none());
  }

  #[test]
  fn test_insert_at_clamped_index() {
    let before = assign_module("x", "0");
    let module = before.root();
    let payload = assign_module("y", "1");
    let stmt = payload.root().child(0).unwrap().extract();
    let edit = Edit::insert(stmt, 9);
    let rewritten = edit.run(&before, module.id()).unwrap();
    assert_eq!(rewritten.root().child_count(), 2);
    let second = rewritten.root().child(1).unwrap();
    assert_eq!(second.child(0).unwrap().value(), Some("y"));
  }

  #[test]
  fn test_delete_root_fails() {
    let tree = assign_module("x", "0");
    let edit = Edit::delete();
    assert!(edit.run(&tree, tree.root().id()).is_none());
  }

  #[test]
  fn test_delete_statement() {
    let tree = assign_module("x", "0");
    let stmt = tree.root().child(0).unwrap();
    let edit = Edit::delete();
    let rewritten = edit.run(&tree, stmt.id()).unwrap();
    assert_eq!(rewritten.root().child_count(), 0);
    assert_eq!(rewritten.node_count(), 1);
  }

  #[test]
  fn test_delete_rejects_fixed_arity_parent() {
    let tree = assign_module("x", "0");
    let rhs = tree.root().child(0).unwrap().child(1).unwrap();
    let edit = Edit::delete();
    assert!(edit.run(&tree, rhs.id()).is_none());
  }

  #[test]
  fn test_program_runs_once_per_match() {
    let pattern = assign_module("x", "0");
    let rhs = pattern.root().child(0).unwrap().child(1).unwrap();
    let template = Template::of_node(&rhs);
    let program = Program::new(Edit::update(Constant, Some("1".into())), template, 0);
    let input = assign_module("y", "0");
    let candidates: Vec<_> = program.run(&input).collect();
    assert_eq!(candidates.len(), 1);
    let expected = assign_module("y", "1");
    assert!(candidates[0].root().deep_equal(&expected.root()));
  }
}
