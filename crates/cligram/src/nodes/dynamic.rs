//! `dynamic`: a child built by a callback at parse time.

use std::any::Any;
use std::rc::Rc;

use crate::complete::{complete_child, Completions};
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{parse_child, ParseNode, ParseResult};

pub(crate) static DYNAMIC_TYPE: NodeType = NodeType {
    name: "dynamic",
    schema: &[],
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::<DynamicOps>::default()
}

/// Builds the effective node, possibly inspecting what has already been
/// parsed through the given parse state.
type BuildFn = dyn Fn(&ParseNode) -> Result<Node, GrammarError>;

#[derive(Default)]
struct DynamicOps {
    build: Option<Rc<BuildFn>>,
}

impl DynamicOps {
    fn build(&self, state: &ParseNode) -> Result<Node, GrammarError> {
        let build = self
            .build
            .as_ref()
            .ok_or_else(|| GrammarError::config("dynamic node has no builder"))?;
        build(state)
    }
}

impl NodeOps for DynamicOps {
    fn parse(
        &self,
        _node: &Node,
        state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        let built = self.build(state)?;
        parse_child(&built, state, tokens)
    }

    fn complete(
        &self,
        _node: &Node,
        comp: &mut Completions,
        tokens: &[String],
    ) -> Result<(), GrammarError> {
        let built = self.build(&comp.parse_state())?;
        complete_child(&built, comp, tokens)
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node whose effective child is built by `build` once per parse and
/// once per completion. The built node may depend on the current parse
/// state.
pub fn dynamic(
    build: impl Fn(&ParseNode) -> Result<Node, GrammarError> + 'static,
) -> Node {
    let node = Node::from_type(&DYNAMIC_TYPE);
    node.with_ops_mut(|ops: &mut DynamicOps| ops.build = Some(Rc::new(build)))
        .expect("a fresh dynamic node accepts a builder");
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{literal, many, seq};
    use crate::test_support::{check_complete, check_parse};

    #[test]
    fn builds_a_fresh_child_per_invocation() {
        let node = dynamic(|_state| Ok(literal("foo")));
        check_parse(&node, Some(1), &["foo"]);
        check_parse(&node, None, &["bar"]);
        check_complete(&node, &["f"], &["foo"]);
    }

    #[test]
    fn the_builder_can_inspect_the_parse_state() {
        // The second word must repeat the first one.
        let echo = dynamic(|state| {
            let first = state
                .root()
                .find_first("first")
                .map(|p| p.tokens().join(""));
            Ok(literal(first.unwrap_or_default()))
        });
        let node = seq([literal("foo").with_id("first"), echo]);
        check_parse(&node, Some(2), &["foo", "foo"]);
        check_parse(&node, None, &["foo", "bar"]);
        check_complete(&node, &["foo", "f"], &["foo"]);
    }

    #[test]
    fn builder_errors_abort_the_parse() {
        let node = many(
            dynamic(|_state| Err(GrammarError::eval("nope"))),
            0,
            0,
        );
        assert!(node.parse(&["x"]).is_err());
    }
}
