//! `or`: leftmost-first alternative.

use std::any::Any;

use crate::complete::{complete_child, Completions};
use crate::config::{ConfigKind, ConfigValue, Schema, SchemaEntry};
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{parse_child, ParseNode, ParseResult};

const OR_SUBSCHEMA: &Schema = &[SchemaEntry::element(
    "A child node, one of the alternatives.",
    ConfigKind::Node,
)];

const OR_SCHEMA: &Schema = &[SchemaEntry::list(
    "children",
    "The alternatives, tried in order; the first match wins.",
    OR_SUBSCHEMA,
)];

pub(crate) static OR_TYPE: NodeType = NodeType {
    name: "or",
    schema: OR_SCHEMA,
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::<OrOps>::default()
}

#[derive(Default)]
struct OrOps {
    table: Vec<Node>,
}

impl NodeOps for OrOps {
    fn parse(
        &self,
        _node: &Node,
        state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        // First match wins, not longest: declaration order is the
        // tie-break.
        for child in &self.table {
            match parse_child(child, state, tokens)? {
                ParseResult::NoMatch => continue,
                matched => return Ok(matched),
            }
        }
        Ok(ParseResult::NoMatch)
    }

    fn complete(
        &self,
        _node: &Node,
        comp: &mut Completions,
        tokens: &[String],
    ) -> Result<(), GrammarError> {
        for child in &self.table {
            complete_child(child, comp, tokens)?;
        }
        Ok(())
    }

    fn set_config(&mut self, config: &ConfigValue) -> Result<(), GrammarError> {
        let table = match config.get("children") {
            Some(children) => children.node_table()?,
            None => Vec::new(),
        };
        self.table = table;
        Ok(())
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

/// A node matching the first of its children that accepts the input.
pub fn alt<I>(children: I) -> Node
where
    I: IntoIterator<Item = Node>,
{
    let node = Node::from_type(&OR_TYPE);
    node.set_config(ConfigValue::dict([(
        "children",
        ConfigValue::node_list(children),
    )]))
    .expect("an alternative configuration is always schema-valid");
    node
}

/// Append an alternative to an existing `or` node.
pub fn alt_add(node: &Node, child: Node) -> Result<(), GrammarError> {
    insert_child(node, child, false)
}

pub(crate) fn alt_prepend(node: &Node, child: Node) -> Result<(), GrammarError> {
    insert_child(node, child, true)
}

fn insert_child(node: &Node, child: Node, front: bool) -> Result<(), GrammarError> {
    if node.type_name() != OR_TYPE.name {
        return Err(GrammarError::InvalidArgument("not an or node"));
    }
    let mut children: Vec<ConfigValue> = node
        .config()
        .and_then(|config| config.get("children").cloned())
        .and_then(|children| match children {
            ConfigValue::List(items) => Some(items),
            _ => None,
        })
        .unwrap_or_default();
    if front {
        children.insert(0, ConfigValue::Node(child));
    } else {
        children.push(ConfigValue::Node(child));
    }
    node.set_config(ConfigValue::dict([(
        "children",
        ConfigValue::List(children),
    )]))
}
