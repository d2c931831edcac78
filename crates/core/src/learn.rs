//! Witness-driven synthesis of transformation programs.
//!
//! Each example contributes one witnessed edit: the first operation of the
//! minimal edit script between its before- and after-tree, together with the
//! edit locus in the before-tree. Four context templates are derived per
//! witnessed locus; the ones that match every example's locus survive and
//! are ranked into the top-k programs.

use crate::diff::{diff, Operation};
use crate::node::{NodeId, Tree};
use crate::program::{Edit, Program};
use crate::template::Template;

use bit_set::BitSet;
use std::collections::HashSet;

/// One before/after pair.
#[derive(Clone)]
pub struct Example {
  pub before: Tree,
  pub after: Tree,
}

impl Example {
  pub fn new(before: Tree, after: Tree) -> Self {
    Self { before, after }
  }
}

/// Learner configuration. The context bias is explicit config, created
/// before learning and read-only afterwards.
#[derive(Debug, Clone)]
pub struct LearnOptions {
  /// Positive values prefer templates with parent context (more specific),
  /// negative values prefer bare-node templates (more general).
  pub score_for_context: i32,
  /// How many ranked programs to return.
  pub k: usize,
}

impl Default for LearnOptions {
  fn default() -> Self {
    Self::specific()
  }
}

impl LearnOptions {
  pub fn specific() -> Self {
    Self {
      score_for_context: 100,
      k: 10,
    }
  }

  pub fn general() -> Self {
    Self {
      score_for_context: -100,
      k: 10,
    }
  }
}

#[derive(Debug, thiserror::Error)]
pub enum LearnError {
  #[error("no examples provided")]
  NoExamples,
  #[error("before and after trees are identical, nothing to learn")]
  DiffEmpty,
  #[error("no transformation is consistent with all examples")]
  NoProgram,
}

struct Witnessed<'e> {
  example: &'e Example,
  target: NodeId,
  edit: Edit,
}

/// Learn the top-k programs consistent with all examples.
pub fn learn(examples: &[Example], options: &LearnOptions) -> Result<Vec<Program>, LearnError> {
  if examples.is_empty() {
    return Err(LearnError::NoExamples);
  }
  let witnessed = examples
    .iter()
    .map(witness_edit)
    .collect::<Result<Vec<_>, _>>()?;

  // the witnessed edits must agree before examples can merge
  let edit = witnessed[0].edit.clone();
  if !witnessed.iter().all(|w| w.edit.compatible(&edit)) {
    return Err(LearnError::NoProgram);
  }

  // gather candidate templates from every example, deduplicated
  let mut templates: Vec<Template> = Vec::new();
  let mut seen = HashSet::new();
  for w in &witnessed {
    for template in candidate_templates(w) {
      if seen.insert(template.to_sexp()) {
        templates.push(template);
      }
    }
  }

  // a template survives only if it binds the witnessed locus in every example
  let mut survivors: BitSet = (0..templates.len()).collect();
  for w in &witnessed {
    let mut matched = BitSet::new();
    for (i, template) in templates.iter().enumerate() {
      if template
        .find_all(w.example.before.root())
        .any(|bound| bound.id() == w.target)
      {
        matched.insert(i);
      }
    }
    survivors.intersect_with(&matched);
  }

  let mut programs: Vec<Program> = survivors
    .iter()
    .map(|i| {
      let template = templates[i].clone();
      let score = score(&template, options);
      Program::new(edit.clone(), template, score)
    })
    .collect();
  programs.sort_by(|a, b| {
    b.score()
      .cmp(&a.score())
      .then_with(|| a.to_string().cmp(&b.to_string()))
  });
  programs.truncate(options.k);
  if programs.is_empty() {
    return Err(LearnError::NoProgram);
  }
  Ok(programs)
}

/// Witness for `Apply`: the first operation of the minimal edit script,
/// resolved to an edit locus in the before-tree.
fn witness_edit(example: &Example) -> Result<Witnessed<'_>, LearnError> {
  let dist = diff(&example.before, &example.after);
  let ops = dist.edits();
  let Some(mut op) = ops.first().cloned() else {
    return Err(LearnError::DiffEmpty);
  };

  // an insert whose parent is itself inserted carries no usable locus;
  // lift to the topmost inserted ancestor so the whole new subtree is the
  // payload
  if let Operation::Insert { node, .. } = &op {
    let inserted: HashSet<NodeId> = ops
      .iter()
      .filter_map(|o| match o {
        Operation::Insert { node, .. } => Some(*node),
        _ => None,
      })
      .collect();
    let mut top = *node;
    while let Some(parent) = example.after.get(top).parent() {
      if inserted.contains(&parent.id()) {
        top = parent.id();
      } else {
        break;
      }
    }
    if top != *node {
      op = ops
        .iter()
        .find(|o| matches!(o, Operation::Insert { node, .. } if *node == top))
        .cloned()
        .ok_or(LearnError::NoProgram)?;
    }
  }

  let target = dist
    .target(&example.before, &example.after, &op)
    .ok_or(LearnError::NoProgram)?;
  let edit = match op {
    Operation::Update { new, .. } => {
      let node = example.after.get(new);
      Edit::update(node.kind(), node.value().map(String::from))
    }
    Operation::Insert { node, index, .. } => {
      Edit::insert(example.after.get(node).extract(), index)
    }
    Operation::Delete { .. } => Edit::delete(),
  };
  Ok(Witnessed {
    example,
    target,
    edit,
  })
}

/// Witness for `Match`: the four context templates around a witnessed locus.
fn candidate_templates(witnessed: &Witnessed) -> Vec<Template> {
  let node = witnessed.example.before.get(witnessed.target);
  let mut templates = vec![Template::of_node(&node), Template::of_node_abstract(&node)];
  if let Some(parent) = Template::of_parent(&node) {
    templates.push(parent);
  }
  if let Some(parent) = Template::of_parent_abstract(&node) {
    templates.push(parent);
  }
  templates
}

fn score(template: &Template, options: &LearnOptions) -> i32 {
  let context = if template.has_parent_context() {
    options.score_for_context
  } else {
    0
  };
  context - template.size() as i32 - template.abstract_count() as i32
}
