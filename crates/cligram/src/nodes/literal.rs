//! `str`: match one exact token.

use std::any::Any;

use crate::complete::{CompKind, Completions};
use crate::config::{ConfigKind, ConfigValue, Schema, SchemaEntry};
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{ParseNode, ParseResult};

const STR_SCHEMA: &Schema = &[SchemaEntry::required(
    "string",
    "The string to match.",
    ConfigKind::String,
)];

pub(crate) static STR_TYPE: NodeType = NodeType {
    name: "str",
    schema: STR_SCHEMA,
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::<StrOps>::default()
}

#[derive(Default)]
struct StrOps {
    string: String,
}

impl NodeOps for StrOps {
    fn parse(
        &self,
        _node: &Node,
        _state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        match tokens.first() {
            Some(token) if *token == self.string => Ok(ParseResult::Match(1)),
            _ => Ok(ParseResult::NoMatch),
        }
    }

    fn complete(
        &self,
        node: &Node,
        comp: &mut Completions,
        tokens: &[String],
    ) -> Result<(), GrammarError> {
        match tokens {
            [] => {
                comp.add_item(node, CompKind::Full, Some(""), Some(&self.string))?;
            }
            [token] if self.string.starts_with(token.as_str()) => {
                comp.add_item(node, CompKind::Full, Some(token), Some(&self.string))?;
            }
            _ => {}
        }
        Ok(())
    }

    fn set_config(&mut self, config: &ConfigValue) -> Result<(), GrammarError> {
        let string = config
            .get("string")
            .and_then(ConfigValue::as_str)
            .ok_or_else(|| GrammarError::config("str node needs a `string` entry"))?;
        self.string = string.to_string();
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node matching one token equal to `string`.
pub fn literal(string: impl Into<String>) -> Node {
    let node = Node::from_type(&STR_TYPE);
    node.set_config(ConfigValue::dict([(
        "string",
        ConfigValue::String(string.into()),
    )]))
    .expect("a literal configuration is always schema-valid");
    node
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{check_complete, check_parse};

    #[test]
    fn matches_exactly_one_token() {
        let node = literal("foo");
        check_parse(&node, Some(1), &["foo"]);
        check_parse(&node, Some(1), &["foo", "bar"]);
        check_parse(&node, None, &["foobar"]);
        check_parse(&node, None, &[" foo"]);
        check_parse(&node, None, &[]);
    }

    #[test]
    fn matches_non_ascii_tokens() {
        let node = literal("Здравствуйте");
        check_parse(&node, Some(1), &["Здравствуйте"]);
        check_parse(&node, Some(1), &["Здравствуйте", "John!"]);
        check_parse(&node, None, &["foo"]);
    }

    #[test]
    fn empty_literal_matches_an_empty_token() {
        let node = literal("");
        check_parse(&node, Some(1), &[""]);
        check_parse(&node, Some(1), &["", "foo"]);
        check_parse(&node, None, &["foo"]);
    }

    #[test]
    fn completes_prefixes() {
        let node = literal("foo");
        check_complete(&node, &[""], &["foo"]);
        check_complete(&node, &["f"], &["foo"]);
        check_complete(&node, &["foo"], &["foo"]);
        check_complete(&node, &["x"], &[]);
    }

    #[test]
    fn completion_tail_is_the_missing_suffix() {
        let node = literal("foo");
        let comp = node.complete(&["f"]).expect("complete");
        let item = comp
            .iter(crate::CompMask::FULL)
            .next()
            .expect("one candidate");
        assert_eq!(item.full(), Some("foo"));
        assert_eq!(item.completion(), Some("oo"));
        assert_eq!(item.display(), Some("foo"));
    }

    #[test]
    fn reconfiguration_replaces_the_string() {
        let node = literal("foo");
        node.set_config(ConfigValue::dict([(
            "string",
            ConfigValue::String("bar".into()),
        )]))
        .expect("reconfigure");
        check_parse(&node, None, &["foo"]);
        check_parse(&node, Some(1), &["bar"]);
    }
}
