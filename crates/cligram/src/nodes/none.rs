//! `none`: never match.

use std::any::Any;

use crate::complete::Completions;
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{ParseNode, ParseResult};

pub(crate) static NONE_TYPE: NodeType = NodeType {
    name: "none",
    schema: &[],
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::new(NoneOps)
}

struct NoneOps;

impl NodeOps for NoneOps {
    fn parse(
        &self,
        _node: &Node,
        _state: &ParseNode,
        _tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        Ok(ParseResult::NoMatch)
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

/// A node that never matches anything.
pub fn none() -> Node {
    Node::from_type(&NONE_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::check_parse;

    #[test]
    fn never_matches() {
        let node = none();
        check_parse(&node, None, &[]);
        check_parse(&node, None, &["foo"]);
    }
}
