//! Zhang–Shasha tree edit distance.
//!
//! Computes the minimal-cost edit script (insert/delete/update) between two
//! trees, plus a partial node mapping from the after-tree to the before-tree.
//! The DP table is dense, so accumulated edit scripts share tails through a
//! persistent cons list and mappings are snapshot-on-write behind `Rc`.

use crate::node::{Node, NodeId, Tree};

use std::collections::{HashMap, HashSet};
use std::rc::Rc;

/// A single edit-script entry. `Insert`/`Update` ids refer to the after-tree,
/// `Delete` ids to the before-tree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Operation {
  Insert {
    node: NodeId,
    parent: Option<NodeId>,
    index: usize,
  },
  Delete {
    node: NodeId,
    parent: Option<NodeId>,
  },
  Update {
    new: NodeId,
    old: NodeId,
  },
}

/// Partial bijection from after-tree nodes to before-tree nodes.
#[derive(Debug, Clone, Default)]
pub struct Mapping(Rc<HashMap<NodeId, NodeId>>);

impl Mapping {
  pub fn get(&self, after: NodeId) -> Option<NodeId> {
    self.0.get(&after).copied()
  }

  pub fn len(&self) -> usize {
    self.0.len()
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  fn inserted(&self, after: NodeId, before: NodeId) -> Self {
    let mut map = (*self.0).clone();
    map.insert(after, before);
    Self(Rc::new(map))
  }

  /// Bijective merge: the incoming (inner-subtree) mapping wins, evicting
  /// any entry that shares a key or a value with it.
  fn merged(&self, inner: &Mapping) -> Self {
    let mut map = (*self.0).clone();
    for (&after, &before) in inner.0.iter() {
      map.retain(|&k, &mut v| k != after && v != before);
      map.insert(after, before);
    }
    Self(Rc::new(map))
  }
}

#[derive(Clone, Default)]
struct EditList(Option<Rc<EditCell>>);

struct EditCell {
  op: Operation,
  prev: EditList,
}

impl EditList {
  fn pushed(&self, op: Operation) -> Self {
    Self(Some(Rc::new(EditCell {
      op,
      prev: self.clone(),
    })))
  }

  fn to_vec(&self) -> Vec<Operation> {
    let mut ops = Vec::new();
    let mut cell = &self.0;
    while let Some(c) = cell {
      ops.push(c.op.clone());
      cell = &c.prev.0;
    }
    ops.reverse();
    ops
  }
}

/// Accumulated result of a diff: total cost, ordered edit script, and the
/// after-to-before node mapping.
#[derive(Clone, Default)]
pub struct EditDistance {
  cost: usize,
  edits: EditList,
  mapping: Mapping,
}

impl EditDistance {
  pub fn cost(&self) -> usize {
    self.cost
  }

  pub fn edits(&self) -> Vec<Operation> {
    self.edits.to_vec()
  }

  pub fn mapping(&self) -> &Mapping {
    &self.mapping
  }

  /// The edit locus in the before-tree: the old node for updates and
  /// deletes, the before-counterpart of the parent for inserts.
  pub fn target(&self, before: &Tree, after: &Tree, op: &Operation) -> Option<NodeId> {
    match op {
      Operation::Update { old, .. } => Some(*old),
      Operation::Delete { node, .. } => Some(*node),
      Operation::Insert { parent, .. } => {
        counterpart(before, after, &self.mapping, (*parent)?)
      }
    }
  }

  fn with_op(&self, op: Operation) -> Self {
    Self {
      cost: self.cost + 1,
      edits: self.edits.pushed(op),
      mapping: self.mapping.clone(),
    }
  }

  fn with_update(&self, new: Node, old: Node) -> Self {
    if new.similar(&old) {
      // similar nodes cost nothing and leave no trace in the script
      return self.clone();
    }
    Self {
      cost: self.cost + 1,
      edits: self.edits.pushed(Operation::Update {
        new: new.id(),
        old: old.id(),
      }),
      mapping: self.mapping.inserted(new.id(), old.id()),
    }
  }

  fn split(&self, inner: &EditDistance) -> Self {
    let mut edits = self.edits.clone();
    for op in inner.edits.to_vec() {
      edits = edits.pushed(op);
    }
    Self {
      cost: self.cost + inner.cost,
      edits,
      mapping: self.mapping.merged(&inner.mapping),
    }
  }
}

/// Resolve the before-tree counterpart of an after-tree node: by mapping
/// first, then positionally down from the root along similar ancestors.
pub fn counterpart(
  before: &Tree,
  after: &Tree,
  mapping: &Mapping,
  target: NodeId,
) -> Option<NodeId> {
  if let Some(found) = mapping.get(target) {
    return Some(found);
  }
  let node = after.get(target);
  match node.parent() {
    None => {
      let root = before.root();
      root.similar(&node).then(|| root.id())
    }
    Some(parent) => {
      let parent_counterpart = counterpart(before, after, mapping, parent.id())?;
      let index = node.child_index()?;
      let candidate = before.get(parent_counterpart).child(index)?;
      candidate.similar(&node).then(|| candidate.id())
    }
  }
}

/// Zhang–Shasha edit distance between two trees.
pub fn diff(before: &Tree, after: &Tree) -> EditDistance {
  Differ::new(before, after).run()
}

struct Differ<'t> {
  a: Vec<Node<'t>>,
  b: Vec<Node<'t>>,
  // 1-based postorder index of each node's leftmost leaf descendant
  l1: Vec<usize>,
  l2: Vec<usize>,
  treedists: Vec<Vec<EditDistance>>,
}

impl<'t> Differ<'t> {
  fn new(before: &'t Tree, after: &'t Tree) -> Self {
    let a: Vec<_> = before.root().postorder().collect();
    let b: Vec<_> = after.root().postorder().collect();
    let l1 = leftmost_leaves(&a);
    let l2 = leftmost_leaves(&b);
    let treedists = vec![vec![EditDistance::default(); b.len() + 1]; a.len() + 1];
    Self {
      a,
      b,
      l1,
      l2,
      treedists,
    }
  }

  fn run(mut self) -> EditDistance {
    let k1 = keyroots(&self.l1);
    let k2 = keyroots(&self.l2);
    for &i in &k1 {
      for &j in &k2 {
        self.forest_dist(i, j);
      }
    }
    self.treedists[self.a.len()][self.b.len()].clone()
  }

  fn delete(&self, base: &EditDistance, x: usize) -> EditDistance {
    let node = self.a[x - 1];
    base.with_op(Operation::Delete {
      node: node.id(),
      parent: node.parent().map(|p| p.id()),
    })
  }

  fn insert(&self, base: &EditDistance, y: usize) -> EditDistance {
    let node = self.b[y - 1];
    base.with_op(Operation::Insert {
      node: node.id(),
      parent: node.parent().map(|p| p.id()),
      index: node.child_index().unwrap_or(0),
    })
  }

  fn forest_dist(&mut self, i: usize, j: usize) {
    let m = i - self.l1[i] + 2;
    let n = j - self.l2[j] + 2;
    let ioff = self.l1[i] - 1;
    let joff = self.l2[j] - 1;
    let mut fd = vec![vec![EditDistance::default(); n]; m];
    for x in 1..m {
      fd[x][0] = self.delete(&fd[x - 1][0], x + ioff);
    }
    for y in 1..n {
      fd[0][y] = self.insert(&fd[0][y - 1], y + joff);
    }
    for x in 1..m {
      for y in 1..n {
        let del_cost = fd[x - 1][y].cost + 1;
        let ins_cost = fd[x][y - 1].cost + 1;
        if self.l1[x + ioff] == self.l1[i] && self.l2[y + joff] == self.l2[j] {
          // both forests are whole subtrees aligned at the keyroot
          let anode = self.a[x + ioff - 1];
          let bnode = self.b[y + joff - 1];
          let upd_cost = fd[x - 1][y - 1].cost + usize::from(!anode.similar(&bnode));
          let entry = if upd_cost <= del_cost && upd_cost <= ins_cost {
            fd[x - 1][y - 1].with_update(bnode, anode)
          } else if del_cost <= ins_cost {
            self.delete(&fd[x - 1][y], x + ioff)
          } else {
            self.insert(&fd[x][y - 1], y + joff)
          };
          self.treedists[x + ioff][y + joff] = entry.clone();
          fd[x][y] = entry;
        } else {
          let p = self.l1[x + ioff] - 1 - ioff;
          let q = self.l2[y + joff] - 1 - joff;
          let inner = &self.treedists[x + ioff][y + joff];
          let split_cost = fd[p][q].cost + inner.cost;
          fd[x][y] = if split_cost <= del_cost && split_cost <= ins_cost {
            fd[p][q].split(inner)
          } else if del_cost <= ins_cost {
            self.delete(&fd[x - 1][y], x + ioff)
          } else {
            self.insert(&fd[x][y - 1], y + joff)
          };
        }
      }
    }
  }
}

fn leftmost_leaves(nodes: &[Node]) -> Vec<usize> {
  let positions: HashMap<NodeId, usize> = nodes
    .iter()
    .enumerate()
    .map(|(i, n)| (n.id(), i + 1))
    .collect();
  let mut l = vec![0; nodes.len() + 1];
  for (i, node) in nodes.iter().enumerate() {
    l[i + 1] = positions[&node.leftmost_descendant().id()];
  }
  l
}

fn keyroots(l: &[usize]) -> Vec<usize> {
  let mut seen = HashSet::new();
  let mut roots = Vec::new();
  for i in (1..l.len()).rev() {
    if seen.insert(l[i]) {
      roots.push(i);
    }
  }
  roots.reverse();
  roots
}

#[cfg(test)]
mod test {
  use super::*;
  use crate::kind::NodeKind::{self, *};
  use crate::node::fixture::*;
  use crate::node::Parsed;

  fn call_module(name: &str, arg: &str) -> Tree {
    Tree::wrap(
      Parsed::new(Module).child(
        Parsed::new(ExpressionStatement).child(
          Parsed::new(Call)
            .child(Parsed::with_value(Name, name))
            .child(Parsed::new(Arg).child(Parsed::with_value(Constant, arg))),
        ),
      ),
    )
  }

  #[test]
  fn test_identical_trees_have_empty_script_and_mapping() {
    let one = assign_module("x", "0");
    let two = assign_module("x", "0");
    let dist = diff(&one, &two);
    assert_eq!(dist.cost(), 0);
    assert!(dist.edits().is_empty());
    assert!(dist.mapping().is_empty());
  }

  #[test]
  fn test_zero_cost_iff_postorders_similar() {
    let one = assign_module("x", "0");
    let two = assign_module("x", "1");
    assert_ne!(diff(&one, &two).cost(), 0);
    let three = assign_module("x", "0");
    assert_eq!(diff(&one, &three).cost(), 0);
    let post1: Vec<_> = one.root().postorder().collect();
    let post3: Vec<_> = three.root().postorder().collect();
    assert!(post1.iter().zip(&post3).all(|(a, b)| a.similar(b)));
  }

  #[test]
  fn test_single_update_script() {
    // f(1) -> f(2): cost 1, exactly one constant update
    let before = call_module("f", "1");
    let after = call_module("f", "2");
    let dist = diff(&before, &after);
    assert_eq!(dist.cost(), 1);
    let edits = dist.edits();
    assert_eq!(edits.len(), 1);
    match &edits[0] {
      Operation::Update { new, old } => {
        assert_eq!(after.get(*new).value(), Some("2"));
        assert_eq!(before.get(*old).value(), Some("1"));
      }
      other => panic!("expected update, got {other:?}"),
    }
  }

  #[test]
  fn test_update_target_is_old_node() {
    let before = call_module("f", "1");
    let after = call_module("f", "2");
    let dist = diff(&before, &after);
    let op = &dist.edits()[0];
    let target = dist.target(&before, &after, op).unwrap();
    assert_eq!(before.get(target).value(), Some("1"));
  }

  #[test]
  fn test_empty_module_grows_by_inserts_only() {
    let before = Tree::wrap(Parsed::new(Module));
    let after = assign_module("x", "1");
    let dist = diff(&before, &after);
    assert_eq!(dist.cost(), 3);
    assert!(dist
      .edits()
      .iter()
      .all(|op| matches!(op, Operation::Insert { .. })));
  }

  #[test]
  fn test_delete_script() {
    let before = assign_module("x", "1");
    let after = Tree::wrap(Parsed::new(Module));
    let dist = diff(&before, &after);
    assert_eq!(dist.cost(), 3);
    assert!(dist
      .edits()
      .iter()
      .all(|op| matches!(op, Operation::Delete { .. })));
  }

  #[test]
  fn test_insert_parent_counterpart_resolves_positionally() {
    // f(1) -> f(1, 2): the new Arg's parent is the call, found by position
    let before = call_module("f", "1");
    let after = Tree::wrap(
      Parsed::new(Module).child(
        Parsed::new(ExpressionStatement).child(
          Parsed::new(Call)
            .child(Parsed::with_value(Name, "f"))
            .child(Parsed::new(Arg).child(Parsed::with_value(Constant, "1")))
            .child(Parsed::new(Arg).child(Parsed::with_value(Constant, "2"))),
        ),
      ),
    );
    let dist = diff(&before, &after);
    assert_eq!(dist.cost(), 2);
    let inserted_arg = dist
      .edits()
      .iter()
      .find_map(|op| match op {
        Operation::Insert { node, parent, .. } if after.get(*node).kind() == NodeKind::Arg => {
          Some((*node, parent.unwrap()))
        }
        _ => None,
      })
      .expect("an Arg must be inserted");
    let call = counterpart(&before, &after, dist.mapping(), inserted_arg.1).unwrap();
    assert_eq!(before.get(call).kind(), NodeKind::Call);
  }

  #[test]
  fn test_cross_statement_update() {
    // return a - b -> return a + b
    let before = return_binop_module("-", "a", "b");
    let after = return_binop_module("+", "a", "b");
    let dist = diff(&before, &after);
    assert_eq!(dist.cost(), 1);
    match &dist.edits()[0] {
      Operation::Update { new, old } => {
        assert_eq!(after.get(*new).value(), Some("+"));
        assert_eq!(before.get(*old).value(), Some("-"));
      }
      other => panic!("expected update, got {other:?}"),
    }
  }
}
