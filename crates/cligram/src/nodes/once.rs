//! `once`: at most one occurrence of the child in the enclosing parse.

use std::any::Any;

use crate::complete::{complete_child, Completions};
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{parse_child, ParseNode, ParseResult};

pub(crate) static ONCE_TYPE: NodeType = NodeType {
    name: "once",
    schema: &[],
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::<OnceOps>::default()
}

#[derive(Default)]
struct OnceOps {
    child: Option<Node>,
}

impl OnceOps {
    fn child(&self) -> Result<&Node, GrammarError> {
        self.child
            .as_ref()
            .ok_or_else(|| GrammarError::config("once node has no child"))
    }
}

impl NodeOps for OnceOps {
    fn parse(
        &self,
        _node: &Node,
        state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        let child = self.child()?;
        // The child may already have matched somewhere in the tree being
        // built; grammar nodes are compared by identity.
        if state.root().count_occurrences(child) > 0 {
            return Ok(ParseResult::NoMatch);
        }
        parse_child(child, state, tokens)
    }

    fn complete(
        &self,
        _node: &Node,
        comp: &mut Completions,
        tokens: &[String],
    ) -> Result<(), GrammarError> {
        let child = self.child()?;
        if comp.parse_state().root().count_occurrences(child) > 0 {
            return Ok(());
        }
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

/// A node matching its child only if the child has not matched yet in
/// the parse being built.
pub fn once(child: Node) -> Node {
    let node = Node::from_type(&ONCE_TYPE);
    once_set_child(&node, child).expect("a fresh once node accepts a child");
    node
}

/// Set the child of a `once` node.
pub fn once_set_child(node: &Node, child: Node) -> Result<(), GrammarError> {
    if child.same(node) {
        return Err(GrammarError::SelfReference);
    }
    node.with_ops_mut(|ops: &mut OnceOps| ops.child = Some(child))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{alt, literal, many};
    use crate::test_support::{check_complete, check_parse};

    fn once_under_many() -> Node {
        many(
            alt([once(literal("foo")), literal("bar")]),
            0,
            0,
        )
    }

    #[test]
    fn the_child_matches_at_most_once() {
        let node = once_under_many();
        check_parse(&node, Some(0), &[]);
        check_parse(&node, Some(1), &["foo"]);
        check_parse(&node, Some(1), &["bar"]);
        check_parse(&node, Some(2), &["foo", "bar"]);
        check_parse(&node, Some(3), &["foo", "bar", "bar"]);
        check_parse(&node, Some(3), &["bar", "foo", "bar"]);
        check_parse(&node, Some(2), &["bar", "foo", "foo"]);
        check_parse(&node, Some(1), &["foo", "foo"]);
        check_parse(&node, Some(0), &["foox"]);
    }

    #[test]
    fn a_seen_child_stops_contributing_completions() {
        let node = once_under_many();
        check_complete(&node, &[""], &["foo", "bar"]);
        check_complete(&node, &["f"], &["foo"]);
        check_complete(&node, &["b"], &["bar"]);
        check_complete(&node, &["foo", ""], &["bar"]);
        check_complete(&node, &["bar", ""], &["foo", "bar"]);
    }
}
