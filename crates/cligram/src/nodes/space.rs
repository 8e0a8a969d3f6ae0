//! `space`: match one token made of whitespace only.

use std::any::Any;

use crate::complete::Completions;
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{ParseNode, ParseResult};

pub(crate) static SPACE_TYPE: NodeType = NodeType {
    name: "space",
    schema: &[],
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::new(SpaceOps)
}

struct SpaceOps;

impl NodeOps for SpaceOps {
    fn parse(
        &self,
        _node: &Node,
        _state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        match tokens.first() {
            Some(token) if !token.is_empty() && token.chars().all(char::is_whitespace) => {
                Ok(ParseResult::Match(1))
            }
            _ => Ok(ParseResult::NoMatch),
        }
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

/// A node matching one token composed only of whitespace.
pub fn space() -> Node {
    Node::from_type(&SPACE_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::check_parse;

    #[test]
    fn matches_whitespace_tokens_only() {
        let node = space();
        check_parse(&node, Some(1), &[" "]);
        check_parse(&node, Some(1), &[" \t ", "foo"]);
        check_parse(&node, None, &[""]);
        check_parse(&node, None, &[" x "]);
        check_parse(&node, None, &[]);
    }
}
