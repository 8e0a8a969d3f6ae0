//! `option`: optional single occurrence of one child.

use std::any::Any;

use crate::complete::{complete_child, Completions};
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{parse_child, ParseNode, ParseResult};

pub(crate) static OPTION_TYPE: NodeType = NodeType {
    name: "option",
    schema: &[],
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::<OptionOps>::default()
}

#[derive(Default)]
struct OptionOps {
    child: Option<Node>,
}

impl NodeOps for OptionOps {
    fn parse(
        &self,
        _node: &Node,
        state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        let child = self
            .child
            .as_ref()
            .ok_or_else(|| GrammarError::config("option node has no child"))?;
        match parse_child(child, state, tokens)? {
            ParseResult::NoMatch => Ok(ParseResult::Match(0)),
            matched => Ok(matched),
        }
    }

    fn complete(
        &self,
        _node: &Node,
        comp: &mut Completions,
        tokens: &[String],
    ) -> Result<(), GrammarError> {
        let child = self
            .child
            .as_ref()
            .ok_or_else(|| GrammarError::config("option node has no child"))?;
        complete_child(child, comp, tokens)
    }

    fn children(&self) -> Vec<Node> {
        self.child.iter().cloned().collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node matching its child, or nothing.
pub fn option(child: Node) -> Node {
    let node = Node::from_type(&OPTION_TYPE);
    option_set_child(&node, child).expect("a fresh option node accepts a child");
    node
}

/// Set the child of an `option` node.
pub fn option_set_child(node: &Node, child: Node) -> Result<(), GrammarError> {
    if child.same(node) {
        return Err(GrammarError::SelfReference);
    }
    node.with_ops_mut(|ops: &mut OptionOps| ops.child = Some(child))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::literal;
    use crate::test_support::{check_complete, check_parse};

    #[test]
    fn the_child_is_optional() {
        let node = option(literal("foo"));
        check_parse(&node, Some(1), &["foo"]);
        check_parse(&node, Some(0), &["bar"]);
        check_parse(&node, Some(0), &[]);
    }

    #[test]
    fn a_skipped_child_leaves_no_trace() {
        let node = option(literal("foo"));
        let tree = node.parse(&["bar"]).expect("parse");
        assert_eq!(tree.matched_len(), Some(0));
        let option_node = tree.first().expect("option parse node");
        assert_eq!(option_node.child_count(), 0);
    }

    #[test]
    fn completion_forwards_to_the_child() {
        let node = option(literal("toto"));
        check_complete(&node, &["t"], &["toto"]);
        check_complete(&node, &["x"], &[]);
    }
}
