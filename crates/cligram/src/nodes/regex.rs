//! `re`: match one token against a regular expression.

use std::any::Any;

use regex::Regex;

use crate::config::{ConfigKind, ConfigValue, Schema, SchemaEntry};
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{ParseNode, ParseResult};

const RE_SCHEMA: &Schema = &[SchemaEntry::required(
    "pattern",
    "The regular expression the token must fully match.",
    ConfigKind::String,
)];

pub(crate) static RE_TYPE: NodeType = NodeType {
    name: "re",
    schema: RE_SCHEMA,
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::<ReOps>::default()
}

#[derive(Default)]
struct ReOps {
    regex: Option<Regex>,
}

impl NodeOps for ReOps {
    fn parse(
        &self,
        _node: &Node,
        _state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        let regex = self
            .regex
            .as_ref()
            .ok_or_else(|| GrammarError::config("re node has no pattern"))?;
        match tokens.first() {
            Some(token) if regex.is_match(token) => Ok(ParseResult::Match(1)),
            _ => Ok(ParseResult::NoMatch),
        }
    }

    fn set_config(&mut self, config: &ConfigValue) -> Result<(), GrammarError> {
        let pattern = config
            .get("pattern")
            .and_then(ConfigValue::as_str)
            .ok_or_else(|| GrammarError::config("re node needs a `pattern` entry"))?;
        // The whole token must match, not just a substring.
        self.regex = Some(Regex::new(&format!("^(?:{pattern})$"))?);
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node matching one token that fully matches `pattern`.
pub fn re(pattern: impl Into<String>) -> Result<Node, GrammarError> {
    let node = Node::from_type(&RE_TYPE);
    node.set_config(ConfigValue::dict([(
        "pattern",
        ConfigValue::String(pattern.into()),
    )]))?;
    Ok(node)
}
