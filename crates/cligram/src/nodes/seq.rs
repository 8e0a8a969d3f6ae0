//! `seq`: ordered concatenation of children.

use std::any::Any;

use crate::complete::{complete_child, Completions};
use crate::config::{ConfigKind, ConfigValue, Schema, SchemaEntry};
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{parse_child, ParseNode, ParseResult};

const SEQ_SUBSCHEMA: &Schema = &[SchemaEntry::element(
    "A child node, part of the sequence.",
    ConfigKind::Node,
)];

const SEQ_SCHEMA: &Schema = &[SchemaEntry::list(
    "children",
    "The children, to be parsed in order.",
    SEQ_SUBSCHEMA,
)];

pub(crate) static SEQ_TYPE: NodeType = NodeType {
    name: "seq",
    schema: SEQ_SCHEMA,
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::<SeqOps>::default()
}

#[derive(Default)]
struct SeqOps {
    table: Vec<Node>,
}

impl NodeOps for SeqOps {
    fn parse(
        &self,
        _node: &Node,
        state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        let mut consumed = 0;
        for child in &self.table {
            match parse_child(child, state, &tokens[consumed..])? {
                ParseResult::Match(n) => consumed += n,
                ParseResult::NoMatch => {
                    state.clear_children();
                    return Ok(ParseResult::NoMatch);
                }
            }
        }
        Ok(ParseResult::Match(consumed))
    }

    fn complete(
        &self,
        _node: &Node,
        comp: &mut Completions,
        tokens: &[String],
    ) -> Result<(), GrammarError> {
        complete_table(&self.table, comp, tokens)
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

/// Completion of a sequence `[c1, c2, ...]` against `tokens`:
///
/// ```text
/// complete(c1, tokens)
///   + complete([c2, ...], tokens[i..])   for every prefix of length i
///                                        that c1 fully matches
/// ```
///
/// Each tentative prefix match stays linked in the parse state while the
/// rest of the sequence completes (so nodes like `once` can see it), and
/// is rolled back afterwards.
fn complete_table(
    table: &[Node],
    comp: &mut Completions,
    tokens: &[String],
) -> Result<(), GrammarError> {
    let Some((head, rest)) = table.split_first() else {
        return Ok(());
    };

    complete_child(head, comp, tokens)?;

    let state = comp.parse_state();
    for i in 0..tokens.len() {
        match parse_child(head, &state, &tokens[..i])? {
            ParseResult::Match(n) if n == i => {
                let result = complete_table(rest, comp, &tokens[i..]);
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

/// A node matching its children one after the other. An empty sequence
/// matches zero tokens.
pub fn seq<I>(children: I) -> Node
where
    I: IntoIterator<Item = Node>,
{
    let node = Node::from_type(&SEQ_TYPE);
    node.set_config(ConfigValue::dict([(
        "children",
        ConfigValue::node_list(children),
    )]))
    .expect("a sequence configuration is always schema-valid");
    node
}

/// Append a child to an existing `seq` node.
pub fn seq_add(node: &Node, child: Node) -> Result<(), GrammarError> {
    insert_child(node, child, false)
}

/// Prepend a child to an existing `seq` node. The command DSL uses this
/// to flatten nested sequences while keeping token order.
pub(crate) fn seq_prepend(node: &Node, child: Node) -> Result<(), GrammarError> {
    insert_child(node, child, true)
}

fn insert_child(node: &Node, child: Node, front: bool) -> Result<(), GrammarError> {
    if node.type_name() != SEQ_TYPE.name {
        return Err(GrammarError::InvalidArgument("not a seq node"));
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{literal, option};
    use crate::test_support::{check_complete, check_parse};

    #[test]
    fn matches_children_in_order() {
        let node = seq([literal("foo"), literal("bar")]);
        check_parse(&node, Some(2), &["foo", "bar"]);
        check_parse(&node, Some(2), &["foo", "bar", "toto"]);
        check_parse(&node, None, &["foo"]);
        check_parse(&node, None, &["foox", "bar"]);
        check_parse(&node, None, &["foo", "barx"]);
        check_parse(&node, None, &["bar", "foo"]);
        check_parse(&node, None, &["", "foo"]);
    }

    #[test]
    fn children_can_be_appended() {
        let node = seq([literal("foo"), literal("bar")]);
        seq_add(&node, literal("grr")).expect("seq_add");
        check_parse(&node, Some(3), &["foo", "bar", "grr"]);
        check_parse(&node, None, &["foo", "bar"]);
    }

    #[test]
    fn an_empty_sequence_matches_zero_tokens() {
        let node = seq([]);
        check_parse(&node, Some(0), &[]);
        check_parse(&node, Some(0), &["foo"]);
    }

    #[test]
    fn attaching_the_node_to_itself_is_refused() {
        let node = seq([literal("foo")]);
        assert!(matches!(
            seq_add(&node, node.clone()),
            Err(GrammarError::SelfReference)
        ));
        check_parse(&node, Some(1), &["foo"]);
    }

    #[test]
    fn completion_walks_matched_prefixes() {
        let node = seq([
            literal("foo"),
            option(literal("toto")),
            literal("bar"),
        ]);
        check_complete(&node, &[""], &["foo"]);
        check_complete(&node, &["f"], &["foo"]);
        check_complete(&node, &["foo"], &["foo"]);
        check_complete(&node, &["foo", ""], &["bar", "toto"]);
        check_complete(&node, &["foo", "t"], &["toto"]);
        check_complete(&node, &["foo", "b"], &["bar"]);
        check_complete(&node, &["foo", "bar"], &["bar"]);
        check_complete(&node, &["x"], &[]);
        check_complete(&node, &["foobarx"], &[]);
    }
}
