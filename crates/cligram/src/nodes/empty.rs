//! `empty`: always match, consuming nothing.

use std::any::Any;

use crate::complete::Completions;
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{ParseNode, ParseResult};

pub(crate) static EMPTY_TYPE: NodeType = NodeType {
    name: "empty",
    schema: &[],
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::new(EmptyOps)
}

struct EmptyOps;

impl NodeOps for EmptyOps {
    fn parse(
        &self,
        _node: &Node,
        _state: &ParseNode,
        _tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        Ok(ParseResult::Match(0))
    }

    fn complete(
        &self,
        _node: &Node,
        _comp: &mut Completions,
        _tokens: &[String],
    ) -> Result<(), GrammarError> {
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node that always matches an empty sequence of tokens.
pub fn empty() -> Node {
    Node::from_type(&EMPTY_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::check_parse;

    #[test]
    fn always_matches_zero_tokens() {
        let node = empty();
        check_parse(&node, Some(0), &[]);
        check_parse(&node, Some(0), &["foo"]);
    }
}
