//! Pre- and post-order iterators over tree nodes.
//!
//! Both are implemented with explicit state instead of recursion so they can
//! be consumed lazily by matching and by the diff's postorder numbering.

use crate::node::Node;

use std::iter::FusedIterator;

/// Left-to-right pre-order traversal, start node included.
pub struct Pre<'t> {
  stack: Vec<Node<'t>>,
}

impl<'t> Pre<'t> {
  pub fn new(node: Node<'t>) -> Self {
    Self { stack: vec![node] }
  }
}

impl<'t> Iterator for Pre<'t> {
  type Item = Node<'t>;
  fn next(&mut self) -> Option<Self::Item> {
    let node = self.stack.pop()?;
    // push children reversed so the first child pops first
    let children: Vec<_> = node.children().collect();
    self.stack.extend(children.into_iter().rev());
    Some(node)
  }
}

impl FusedIterator for Pre<'_> {}

/// Left-to-right post-order traversal, start node included.
pub struct Post<'t> {
  // (node, whether its children are already expanded)
  stack: Vec<(Node<'t>, bool)>,
}

impl<'t> Post<'t> {
  pub fn new(node: Node<'t>) -> Self {
    Self {
      stack: vec![(node, false)],
    }
  }
}

impl<'t> Iterator for Post<'t> {
  type Item = Node<'t>;
  fn next(&mut self) -> Option<Self::Item> {
    loop {
      let (node, expanded) = self.stack.pop()?;
      if expanded || node.is_leaf() {
        return Some(node);
      }
      self.stack.push((node, true));
      let children: Vec<_> = node.children().collect();
      self
        .stack
        .extend(children.into_iter().rev().map(|c| (c, false)));
    }
  }
}

impl FusedIterator for Post<'_> {}
