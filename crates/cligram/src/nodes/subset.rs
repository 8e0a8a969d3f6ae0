//! `subset`: any non-empty subset of the children, in any order.

use std::any::Any;

use crate::complete::{complete_child, Completions};
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{parse_child, ParseNode, ParseResult};

pub(crate) static SUBSET_TYPE: NodeType = NodeType {
    name: "subset",
    schema: &[],
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::<SubsetOps>::default()
}

#[derive(Default)]
struct SubsetOps {
    table: Vec<Node>,
}

/// The best permutation found so far: how many children matched, how
/// many tokens they consumed, and their parse nodes in match order.
#[derive(Default)]
struct BestMatch {
    count: usize,
    len: usize,
    chain: Vec<ParseNode>,
}

/// Depth-first search for the permutation matching the most children,
/// consumption breaking no ties: the first permutation found wins them.
/// Leaves `state` unchanged; the winning chain is returned unlinked.
fn subset_search(
    table: &mut [Option<Node>],
    state: &ParseNode,
    tokens: &[String],
) -> Result<BestMatch, GrammarError> {
    let mut best = BestMatch::default();

    for i in 0..table.len() {
        let Some(child) = table[i].clone() else {
            continue;
        };
        let ParseResult::Match(n) = parse_child(&child, state, tokens)? else {
            continue;
        };

        // Keep the tentative match linked while searching deeper, so the
        // children can see it in the parse state.
        table[i] = None;
        let sub = subset_search(table, state, &tokens[n..]);
        table[i] = Some(child);
        let matched = state
            .del_last_child()
            .unwrap_or_else(|| unreachable!("the tentative match was just linked"));
        let sub = sub?;

        if 1 + sub.count > best.count {
            let mut chain = Vec::with_capacity(1 + sub.chain.len());
            chain.push(matched);
            chain.extend(sub.chain);
            best = BestMatch {
                count: 1 + sub.count,
                len: n + sub.len,
                chain,
            };
        }
    }

    Ok(best)
}

impl NodeOps for SubsetOps {
    fn parse(
        &self,
        _node: &Node,
        state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        if tokens.is_empty() {
            return Ok(ParseResult::NoMatch);
        }

        let mut table: Vec<Option<Node>> = self.table.iter().cloned().map(Some).collect();
        let best = subset_search(&mut table, state, tokens)?;

        // No child matched: succeed without consuming anything.
        if best.count == 0 {
            return Ok(ParseResult::Match(0));
        }

        for matched in best.chain {
            state.link_child(matched);
        }
        Ok(ParseResult::Match(best.len))
    }

    fn complete(
        &self,
        _node: &Node,
        comp: &mut Completions,
        tokens: &[String],
    ) -> Result<(), GrammarError> {
        let mut table: Vec<Option<Node>> = self.table.iter().cloned().map(Some).collect();
        subset_complete(&mut table, comp, tokens)
    }

    fn children(&self) -> Vec<Node> {
        self.table.clone()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// Completions from every remaining child, plus, for each child that
/// matches a prefix, completions of the remaining subset against the
/// remainder.
fn subset_complete(
    table: &mut [Option<Node>],
    comp: &mut Completions,
    tokens: &[String],
) -> Result<(), GrammarError> {
    for i in 0..table.len() {
        let Some(child) = table[i].clone() else {
            continue;
        };
        complete_child(&child, comp, tokens)?;
    }

    let state = comp.parse_state();
    for i in 0..table.len() {
        let Some(child) = table[i].clone() else {
            continue;
        };
        let ParseResult::Match(n) = parse_child(&child, &state, tokens)? else {
            continue;
        };
        table[i] = None;
        let result = subset_complete(table, comp, &tokens[n..]);
        table[i] = Some(child);
        state.del_last_child();
        result?;
    }
    Ok(())
}

/// A node matching any non-empty combination of its children, each at
/// most once, in any order. If no child matches, the subset matches
/// zero tokens.
pub fn subset<I>(children: I) -> Node
where
    I: IntoIterator<Item = Node>,
{
    let node = Node::from_type(&SUBSET_TYPE);
    for child in children {
        subset_add(&node, child).expect("a fresh subset node accepts children");
    }
    node
}

/// Append a child to an existing `subset` node.
pub fn subset_add(node: &Node, child: Node) -> Result<(), GrammarError> {
    insert_child(node, child, false)
}

pub(crate) fn subset_prepend(node: &Node, child: Node) -> Result<(), GrammarError> {
    insert_child(node, child, true)
}

fn insert_child(node: &Node, child: Node, front: bool) -> Result<(), GrammarError> {
    if child.same(node) {
        return Err(GrammarError::SelfReference);
    }
    node.with_ops_mut(|ops: &mut SubsetOps| {
        if front {
            ops.table.insert(0, child);
        } else {
            ops.table.push(child);
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{alt, literal};
    use crate::test_support::{check_complete, check_parse};

    #[test]
    fn any_order_any_subset() {
        let node = subset([
            alt([literal("foo"), literal("bar")]),
            literal("bar"),
            literal("toto"),
        ]);
        check_parse(&node, None, &[]);
        check_parse(&node, Some(1), &["foo"]);
        check_parse(&node, Some(1), &["bar"]);
        check_parse(&node, Some(2), &["foo", "bar", "titi"]);
        check_parse(&node, Some(3), &["bar", "foo", "toto"]);
        check_parse(&node, Some(1), &["foo", "foo"]);
        check_parse(&node, Some(2), &["bar", "bar"]);
        check_parse(&node, Some(2), &["bar", "foo"]);
        check_parse(&node, Some(0), &[" "]);
        check_parse(&node, Some(0), &["foox"]);
    }

    #[test]
    fn the_match_count_is_maximized() {
        // Taking "bar" with the alternative first would leave the
        // dedicated "bar" child without a token; the search must give
        // the alternative "foo" instead.
        let node = subset([alt([literal("bar"), literal("foo")]), literal("bar")]);
        check_parse(&node, Some(2), &["bar", "foo"]);
        check_parse(&node, Some(2), &["foo", "bar"]);
    }

    #[test]
    fn matched_children_appear_in_match_order() {
        let node = subset([literal("foo"), literal("bar")]);
        let tree = node.parse(&["bar", "foo"]).expect("parse");
        let tokens: Vec<_> = tree
            .first()
            .expect("subset parse node")
            .children()
            .iter()
            .map(|child| child.tokens().join(""))
            .collect();
        assert_eq!(tokens, ["bar", "foo"]);
    }

    #[test]
    fn completion_excludes_children_already_used() {
        let node = subset([
            literal("foo"),
            literal("bar"),
            literal("bar2"),
            literal("toto"),
            literal("titi"),
        ]);
        check_complete(&node, &[""], &["foo", "bar", "bar2", "toto", "titi"]);
        check_complete(&node, &["bar", "bar2", ""], &["foo", "toto", "titi"]);
        check_complete(&node, &["f"], &["foo"]);
        check_complete(&node, &["b"], &["bar", "bar2"]);
        check_complete(&node, &["bar"], &["bar", "bar2"]);
        check_complete(&node, &["bar", "b"], &["bar2"]);
        check_complete(&node, &["t"], &["toto", "titi"]);
        check_complete(&node, &["to"], &["toto"]);
        check_complete(&node, &["x"], &[]);
    }
}
