//! `many`: bounded greedy repetition of one child.

use std::any::Any;

use crate::complete::{complete_child, Completions};
use crate::config::{ConfigKind, ConfigValue, Schema, SchemaEntry};
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{parse_child, ParseNode, ParseResult};

const MANY_SCHEMA: &Schema = &[
    SchemaEntry::required("child", "The node to repeat.", ConfigKind::Node),
    SchemaEntry::new("min", "Minimum number of repetitions.", ConfigKind::U64),
    SchemaEntry::new(
        "max",
        "Maximum number of repetitions; 0 means unbounded.",
        ConfigKind::U64,
    ),
];

pub(crate) static MANY_TYPE: NodeType = NodeType {
    name: "many",
    schema: MANY_SCHEMA,
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::<ManyOps>::default()
}

#[derive(Default)]
struct ManyOps {
    child: Option<Node>,
    min: usize,
    max: usize,
}

impl ManyOps {
    fn child(&self) -> Result<&Node, GrammarError> {
        self.child
            .as_ref()
            .ok_or_else(|| GrammarError::config("many node has no child"))
    }
}

impl NodeOps for ManyOps {
    fn parse(
        &self,
        _node: &Node,
        state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        let child = self.child()?;
        let mut consumed = 0;
        let mut count = 0;
        loop {
            if self.max > 0 && count >= self.max {
                break;
            }
            match parse_child(child, state, &tokens[consumed..])? {
                ParseResult::NoMatch => break,
                ParseResult::Match(0) => {
                    // An empty match would repeat forever: keep it and
                    // stop here.
                    count += 1;
                    break;
                }
                ParseResult::Match(n) => {
                    consumed += n;
                    count += 1;
                }
            }
        }
        if count < self.min {
            state.clear_children();
            return Ok(ParseResult::NoMatch);
        }
        Ok(ParseResult::Match(consumed))
    }

    fn complete(
        &self,
        _node: &Node,
        comp: &mut Completions,
        tokens: &[String],
    ) -> Result<(), GrammarError> {
        complete_many(self.child()?, comp, tokens)
    }

    fn set_config(&mut self, config: &ConfigValue) -> Result<(), GrammarError> {
        let child = config
            .get("child")
            .and_then(ConfigValue::as_node)
            .cloned()
            .ok_or_else(|| GrammarError::config("many node needs a `child` entry"))?;
        self.child = Some(child);
        self.min = config.get("min").and_then(ConfigValue::as_u64).unwrap_or(0) as usize;
        self.max = config.get("max").and_then(ConfigValue::as_u64).unwrap_or(0) as usize;
        Ok(())
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

/// Completions for zero repetitions, plus, for every non-empty prefix
/// the child fully matches, completions of the repetition against the
/// remainder. Skipping the empty prefix is what terminates the
/// recursion.
fn complete_many(
    child: &Node,
    comp: &mut Completions,
    tokens: &[String],
) -> Result<(), GrammarError> {
    complete_child(child, comp, tokens)?;

    let state = comp.parse_state();
    for i in 1..tokens.len() {
        match parse_child(child, &state, &tokens[..i])? {
            ParseResult::Match(n) if n == i => {
                let result = complete_many(child, comp, &tokens[i..]);
                state.del_last_child();
                result?;
            }
            ParseResult::Match(_) => {
                state.del_last_child();
            }
            ParseResult::NoMatch => {}
        }
    }
    Ok(())
}

/// A node matching `child` repeatedly, between `min` and `max` times.
/// `max` 0 means unbounded.
pub fn many(child: Node, min: usize, max: usize) -> Node {
    let node = Node::from_type(&MANY_TYPE);
    node.set_config(ConfigValue::dict([
        ("child", ConfigValue::Node(child)),
        ("min", ConfigValue::U64(min as u64)),
        ("max", ConfigValue::U64(max as u64)),
    ]))
    .expect("a repetition configuration is always schema-valid");
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{empty, literal, option};
    use crate::test_support::{check_complete, check_parse};

    #[test]
    fn unbounded_repetition() {
        let node = many(literal("foo"), 0, 0);
        check_parse(&node, Some(0), &[]);
        check_parse(&node, Some(1), &["foo"]);
        check_parse(&node, Some(3), &["foo", "foo", "foo"]);
        check_parse(&node, Some(2), &["foo", "foo", "bar"]);
        check_parse(&node, Some(0), &["bar"]);
    }

    #[test]
    fn minimum_is_enforced() {
        let node = many(literal("foo"), 2, 0);
        check_parse(&node, None, &["foo"]);
        check_parse(&node, Some(2), &["foo", "foo"]);
        check_parse(&node, Some(3), &["foo", "foo", "foo"]);
    }

    #[test]
    fn maximum_stops_the_loop() {
        let node = many(literal("foo"), 0, 2);
        check_parse(&node, Some(2), &["foo", "foo", "foo"]);
    }

    #[test]
    fn an_empty_child_match_ends_the_loop() {
        let node = many(option(literal("foo")), 0, 0);
        check_parse(&node, Some(0), &["bar"]);
        check_parse(&node, Some(1), &["foo", "bar"]);

        let node = many(empty(), 1, 0);
        check_parse(&node, Some(0), &["bar"]);
    }

    #[test]
    fn completion_covers_later_repetitions() {
        let node = many(literal("foo"), 0, 0);
        check_complete(&node, &[""], &["foo"]);
        check_complete(&node, &["f"], &["foo"]);
        check_complete(&node, &["foo", "f"], &["foo"]);
        check_complete(&node, &["bar", "f"], &[]);
    }
}
