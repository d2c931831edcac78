//! Templates: AST fragments, possibly abstract, with a single marked edit
//! locus. Matching a template against a tree yields the nodes bound by the
//! marker, in pre-order.
//!
//! A concrete template node matches only similar nodes and requires its
//! child list to match positionally. An abstract template node matches any
//! node of the same kind, with no structural requirement on its children;
//! the marker is still bound by following the same child indices.

use crate::kind::NodeKind;
use crate::node::{Node, Tree};

use bit_set::BitSet;
use std::fmt;

#[derive(Clone)]
pub struct Template {
  tree: Tree,
  // child indices from the template root down to the edit marker
  marker_path: Vec<usize>,
}

impl Template {
  /// The witnessed node itself, concrete, marker at the root.
  pub fn of_node(node: &Node) -> Self {
    let mut parsed = node.to_parsed();
    parsed.edit_id = 1;
    Self::build(Tree::wrap(parsed))
  }

  /// The witnessed node with its value abstracted away.
  pub fn of_node_abstract(node: &Node) -> Self {
    let mut parsed = node.to_parsed();
    parsed.value = None;
    parsed.is_abstract = true;
    parsed.edit_id = 1;
    Self::build(Tree::wrap(parsed))
  }

  /// The witnessed node's parent, concrete, marker on the witnessed child.
  pub fn of_parent(node: &Node) -> Option<Self> {
    let parent = node.parent()?;
    let index = node.child_index()?;
    let mut parsed = parent.to_parsed();
    parsed.children[index].edit_id = 1;
    Some(Self::build(Tree::wrap(parsed)))
  }

  /// The witnessed node's parent with its value abstracted away.
  pub fn of_parent_abstract(node: &Node) -> Option<Self> {
    let parent = node.parent()?;
    let index = node.child_index()?;
    let mut parsed = parent.to_parsed();
    parsed.value = None;
    parsed.is_abstract = true;
    parsed.children[index].edit_id = 1;
    Some(Self::build(Tree::wrap(parsed)))
  }

  fn build(tree: Tree) -> Self {
    let marker = tree
      .root()
      .dfs()
      .find(|n| n.edit_id() == 1)
      .expect("template must carry an edit marker");
    let mut path = Vec::new();
    let mut node = marker;
    while let Some(index) = node.child_index() {
      path.push(index);
      node = node.parent().expect("child_index implies a parent");
    }
    path.reverse();
    Self {
      tree,
      marker_path: path,
    }
  }

  pub fn root_kind(&self) -> NodeKind {
    self.tree.root().kind()
  }

  /// Bit set of node kinds this template can match at, indexed by
  /// [`NodeKind::id`]. Used to prune candidates before a full match.
  pub fn potential_kinds(&self) -> BitSet {
    let mut kinds = BitSet::new();
    kinds.insert(self.root_kind().id());
    kinds
  }

  /// Whether the marker sits below the root, i.e. the template carries
  /// surrounding parent context.
  pub fn has_parent_context(&self) -> bool {
    !self.marker_path.is_empty()
  }

  pub fn size(&self) -> usize {
    self.tree.node_count()
  }

  pub fn abstract_count(&self) -> usize {
    self.tree.root().dfs().filter(|n| n.is_abstract()).count()
  }

  fn marker(&self) -> Node<'_> {
    let mut node = self.tree.root();
    for &index in &self.marker_path {
      node = node.child(index).expect("marker path is within the template");
    }
    node
  }

  /// Match this template at `candidate`, returning the node bound by the
  /// edit marker.
  pub fn match_node<'t>(&self, candidate: Node<'t>) -> Option<Node<'t>> {
    if !node_matches(self.tree.root(), candidate) {
      return None;
    }
    // bind the marker by following its child path into the candidate
    let mut bound = candidate;
    for &index in &self.marker_path {
      bound = bound.child(index)?;
    }
    if bound.kind() != self.marker().kind() {
      return None;
    }
    Some(bound)
  }

  /// All marker bindings of this template over `root`'s subtree, in
  /// pre-order of the matched position.
  pub fn find_all<'s, 't: 's>(
    &'s self,
    root: Node<'t>,
  ) -> impl Iterator<Item = Node<'t>> + 's {
    let kinds = self.potential_kinds();
    root
      .dfs()
      .filter(move |n| kinds.contains(n.kind().id()))
      .filter_map(move |n| self.match_node(n))
  }

  pub fn to_sexp(&self) -> String {
    self.tree.root().to_sexp()
  }
}

fn node_matches(goal: Node, candidate: Node) -> bool {
  if goal.kind() != candidate.kind() {
    return false;
  }
  if goal.is_abstract() {
    return true;
  }
  if goal.value() != candidate.value() {
    return false;
  }
  if goal.child_count() != candidate.child_count() {
    return false;
  }
  goal
    .children()
    .zip(candidate.children())
    .all(|(g, c)| node_matches(g, c))
}

impl fmt::Display for Template {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.to_sexp())
  }
}
