/*!
This crate is the core engine of codemend.

It learns small syntactic transformations from before/after example pairs of
student submissions and replays them on other, structurally similar broken
programs. The pipeline: a Zhang–Shasha tree diff extracts the minimal edit
between the example trees, witness functions generalize that edit into
context templates, a ranked top-k of candidate programs comes out of the
learner, and the fix loop tries each program's rewrites against a test
oracle until one passes.

Language front ends (parser and unparser) plug in through [`SourceLang`];
see the `codemend-python` crate for the Python instantiation.
*/

pub mod diff;
pub mod fix;
pub mod kind;
pub mod lang;
pub mod learn;
pub mod program;
pub mod template;

mod node;
mod traversal;

pub use diff::{diff, EditDistance, Mapping, Operation};
pub use fix::{
  Fixer, InterpreterOracle, OracleFn, StaticFeature, StaticTests, TestOracle, TestSuite,
  UsedPrograms,
};
pub use kind::NodeKind;
pub use lang::{ParseError, SourceLang};
pub use learn::{learn, Example, LearnError, LearnOptions};
pub use node::{Node, NodeId, Parsed, Tree, Visit};
pub use program::{Edit, Program};
pub use traversal::{Post, Pre};
