use crate::kind::NodeKind;
use crate::traversal::{Post, Pre};

/// Parser-facing nested tree value. `Tree::wrap` turns it into an arena
/// tree with ids and parent links filled in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Parsed {
  pub kind: NodeKind,
  pub value: Option<String>,
  pub children: Vec<Parsed>,
  pub(crate) is_abstract: bool,
  pub(crate) edit_id: u32,
}

impl Parsed {
  pub fn new(kind: NodeKind) -> Self {
    Self {
      kind,
      value: None,
      children: Vec::new(),
      is_abstract: false,
      edit_id: 0,
    }
  }

  pub fn with_value<S: Into<String>>(kind: NodeKind, value: S) -> Self {
    Self {
      value: Some(value.into()),
      ..Self::new(kind)
    }
  }

  pub fn child(mut self, child: Parsed) -> Self {
    self.children.push(child);
    self
  }
}

/// Identity of a node within its tree. Assigned in construction order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
  pub fn index(&self) -> usize {
    self.0 as usize
  }
}

#[derive(Debug, Clone)]
struct NodeData {
  kind: NodeKind,
  value: Option<String>,
  children: Vec<NodeId>,
  parent: Option<NodeId>,
  is_abstract: bool,
  edit_id: u32,
}

/// An AST. Owns all nodes in an arena; parent back-references are arena
/// indices so the ownership graph stays acyclic. Immutable once built:
/// every rewrite produces a new `Tree`.
#[derive(Debug, Clone)]
pub struct Tree {
  nodes: Vec<NodeData>,
  root: NodeId,
}

impl Tree {
  /// Recursively wraps a parser-produced value, assigning fresh ids in
  /// construction order and filling parent links.
  pub fn wrap(parsed: Parsed) -> Self {
    let mut tree = Self {
      nodes: Vec::new(),
      root: NodeId(0),
    };
    tree.root = tree.add(parsed, None);
    tree
  }

  fn add(&mut self, parsed: Parsed, parent: Option<NodeId>) -> NodeId {
    let id = NodeId(self.nodes.len() as u32);
    self.nodes.push(NodeData {
      kind: parsed.kind,
      value: parsed.value,
      children: Vec::new(),
      parent,
      is_abstract: parsed.is_abstract,
      edit_id: parsed.edit_id,
    });
    let children: Vec<_> = parsed
      .children
      .into_iter()
      .map(|c| self.add(c, Some(id)))
      .collect();
    self.nodes[id.index()].children = children;
    id
  }

  pub fn root(&self) -> Node<'_> {
    Node {
      tree: self,
      id: self.root,
    }
  }

  pub fn get(&self, id: NodeId) -> Node<'_> {
    debug_assert!(id.index() < self.nodes.len());
    Node { tree: self, id }
  }

  pub fn node_count(&self) -> usize {
    self.nodes.len()
  }

  fn data(&self, id: NodeId) -> &NodeData {
    &self.nodes[id.index()]
  }
}

/// Outcome of a visitor step in `walk`/`post_walk`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Visit {
  Continue,
  Stop,
}

/// A cheap handle pairing a tree with a node id.
#[derive(Clone, Copy)]
pub struct Node<'t> {
  pub(crate) tree: &'t Tree,
  pub(crate) id: NodeId,
}

/// APIs for Node inspection
impl<'t> Node<'t> {
  pub fn id(&self) -> NodeId {
    self.id
  }

  pub fn kind(&self) -> NodeKind {
    self.tree.data(self.id).kind
  }

  pub fn value(&self) -> Option<&'t str> {
    self.tree.data(self.id).value.as_deref()
  }

  pub fn is_abstract(&self) -> bool {
    self.tree.data(self.id).is_abstract
  }

  pub fn edit_id(&self) -> u32 {
    self.tree.data(self.id).edit_id
  }

  pub fn is_leaf(&self) -> bool {
    self.tree.data(self.id).children.is_empty()
  }

  pub fn child_count(&self) -> usize {
    self.tree.data(self.id).children.len()
  }

  /// Same kind and same value for concrete nodes; same kind suffices when
  /// either side is abstract.
  pub fn similar(&self, other: &Node) -> bool {
    if self.kind() != other.kind() {
      return false;
    }
    if self.is_abstract() || other.is_abstract() {
      return true;
    }
    self.value() == other.value()
  }

  /// Structural equality over the whole subtree, values included.
  pub fn deep_equal(&self, other: &Node) -> bool {
    if self.kind() != other.kind()
      || self.is_abstract() != other.is_abstract()
      || self.value() != other.value()
      || self.child_count() != other.child_count()
    {
      return false;
    }
    self
      .children()
      .zip(other.children())
      .all(|(a, b)| a.deep_equal(&b))
  }

  /// Node's tree structure dumped in a Lisp-like S-expression.
  /// Abstract nodes print a `*` after the kind, the edit locus a `!` prefix.
  pub fn to_sexp(&self) -> String {
    let mut out = String::new();
    self.write_sexp(&mut out);
    out
  }

  fn write_sexp(&self, out: &mut String) {
    if self.edit_id() == 1 {
      out.push('!');
    }
    out.push('(');
    out.push_str(self.kind().as_str());
    if self.is_abstract() {
      out.push('*');
    }
    if let Some(v) = self.value() {
      out.push(' ');
      out.push_str(v);
    }
    for child in self.children() {
      out.push(' ');
      child.write_sexp(out);
    }
    out.push(')');
  }
}

/// tree traversal API
impl<'t> Node<'t> {
  #[must_use]
  pub fn parent(&self) -> Option<Node<'t>> {
    let parent = self.tree.data(self.id).parent?;
    Some(Node {
      tree: self.tree,
      id: parent,
    })
  }

  pub fn children(&self) -> impl ExactSizeIterator<Item = Node<'t>> + '_ {
    let tree = self.tree;
    tree
      .data(self.id)
      .children
      .iter()
      .map(move |id| Node { tree, id: *id })
  }

  #[must_use]
  pub fn child(&self, nth: usize) -> Option<Node<'t>> {
    let id = *self.tree.data(self.id).children.get(nth)?;
    Some(Node {
      tree: self.tree,
      id,
    })
  }

  /// Position of this node in its parent's child list.
  pub fn child_index(&self) -> Option<usize> {
    let parent = self.parent()?;
    let pos = parent.children().position(|c| c.id == self.id);
    pos
  }

  pub fn ancestors(&self) -> impl Iterator<Item = Node<'t>> + '_ {
    let mut current = self.parent();
    std::iter::from_fn(move || {
      let node = current?;
      current = node.parent();
      Some(node)
    })
  }

  /// The leaf reached by always descending into the first child.
  pub fn leftmost_descendant(&self) -> Node<'t> {
    let mut node = *self;
    while let Some(first) = node.child(0) {
      node = first;
    }
    node
  }

  /// Left-to-right pre-order over this subtree, self included.
  pub fn dfs(&self) -> Pre<'t> {
    Pre::new(*self)
  }

  /// Left-to-right post-order over this subtree, self included.
  pub fn postorder(&self) -> Post<'t> {
    Post::new(*self)
  }

  /// Pre-order visitor walk. The visitor can stop the walk early.
  pub fn walk<F: FnMut(Node<'t>) -> Visit>(&self, visitor: &mut F) -> Visit {
    if visitor(*self) == Visit::Stop {
      return Visit::Stop;
    }
    for child in self.children() {
      if child.walk(visitor) == Visit::Stop {
        return Visit::Stop;
      }
    }
    Visit::Continue
  }

  /// Post-order visitor walk.
  pub fn post_walk<F: FnMut(Node<'t>) -> Visit>(&self, visitor: &mut F) -> Visit {
    for child in self.children() {
      if child.post_walk(visitor) == Visit::Stop {
        return Visit::Stop;
      }
    }
    visitor(*self)
  }
}

/// copying API
impl Node<'_> {
  /// Deep copy of this subtree as a parser-facing value.
  pub fn to_parsed(&self) -> Parsed {
    Parsed {
      kind: self.kind(),
      value: self.value().map(String::from),
      children: self.children().map(|c| c.to_parsed()).collect(),
      is_abstract: self.is_abstract(),
      edit_id: self.edit_id(),
    }
  }

  /// Concrete deep copy of this subtree as a standalone tree.
  pub fn extract(&self) -> Tree {
    Tree::wrap(self.to_parsed())
  }

  /// Structurally isomorphic copy with the value cleared and the abstract
  /// flag set on the copied root. Children remain concrete.
  pub fn abstract_copy(&self) -> Tree {
    let mut parsed = self.to_parsed();
    parsed.value = None;
    parsed.is_abstract = true;
    Tree::wrap(parsed)
  }
}

#[cfg(test)]
pub(crate) mod fixture {
  use super::*;
  use crate::kind::NodeKind::*;

  /// `Module [ Assign [ Name target, Constant value ] ]`
  pub fn assign_module(target: &str, value: &str) -> Tree {
    Tree::wrap(
      Parsed::new(Module).child(
        Parsed::new(Assign)
          .child(Parsed::with_value(Name, target))
          .child(Parsed::with_value(Constant, value)),
      ),
    )
  }

  /// `Module [ Return [ BinaryOp op [ Name left, Name right ] ] ]`
  pub fn return_binop_module(op: &str, left: &str, right: &str) -> Tree {
    Tree::wrap(
      Parsed::new(Module).child(
        Parsed::new(Return).child(
          Parsed::with_value(BinaryOp, op)
            .child(Parsed::with_value(Name, left))
            .child(Parsed::with_value(Name, right)),
        ),
      ),
    )
  }
}
