//! `cmd`: build a grammar from a small description language.
//!
//! The description string composes named child nodes and literal words:
//!
//! | token           | meaning                                   |
//! |-----------------|-------------------------------------------|
//! | identifier      | child node with this id, else a literal   |
//! | `a b`           | sequence                                  |
//! | `a\|b`          | alternative                               |
//! | `a,b`           | subset (any order, each at most once)     |
//! | `a+` / `a*`     | repeat once-or-more / zero-or-more        |
//! | `[a]`           | optional                                  |
//! | `(a)`           | grouping                                  |
//!
//! The description is parsed by a process-wide expression grammar built
//! on first use, then evaluated into a node tree that becomes the cmd
//! node's sole child.

use std::any::Any;
use std::cell::OnceCell;

use crate::complete::{complete_child, Completions};
use crate::config::{ConfigKind, ConfigValue, Schema, SchemaEntry};
use crate::error::GrammarError;
use crate::limit::DEFAULT_RECURSION_LIMIT;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{parse_child, ParseNode, ParseResult};

use super::alt::{alt, alt_prepend};
use super::empty::empty;
use super::expr::{
    eval, expr, expr_add_bin_op, expr_add_parens, expr_add_post_op, expr_set_val, ExprEvaluator,
};
use super::literal::literal;
use super::many::many;
use super::option::option;
use super::re_lex::{re_lex, re_lex_add};
use super::regex::re;
use super::seq::{seq, seq_prepend};
use super::subset::{subset, subset_prepend};

const CMD_SUBSCHEMA: &Schema = &[SchemaEntry::element(
    "A child node whose id is referenced in the expression.",
    ConfigKind::Node,
)];

const CMD_SCHEMA: &Schema = &[
    SchemaEntry::required(
        "expr",
        "The command expression. Operators: or `|`, subset `,`, \
         many `+`, many-or-zero `*`, option `[]`, group `()`. An \
         identifier references the child node with a matching id, and \
         is otherwise matched literally.",
        ConfigKind::String,
    ),
    SchemaEntry::list("children", "The referenced child nodes.", CMD_SUBSCHEMA),
];

pub(crate) static CMD_TYPE: NodeType = NodeType {
    name: "cmd",
    schema: CMD_SCHEMA,
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::<CmdOps>::default()
}

#[derive(Default)]
struct CmdOps {
    cmd: Option<Node>,
}

struct DslGrammar {
    /// The expression grammar wrapped in its lexer.
    parser: Node,
    /// The bare expression node, for evaluation.
    expr: Node,
}

thread_local! {
    static DSL: OnceCell<DslGrammar> = OnceCell::new();
}

fn build_dsl() -> Result<DslGrammar, GrammarError> {
    let e = expr();
    expr_set_val(&e, re("[a-zA-Z0-9_-]+")?)?;
    expr_add_bin_op(&e, literal(","))?;
    expr_add_bin_op(&e, literal("|"))?;
    expr_add_bin_op(&e, empty())?;
    expr_add_post_op(&e, literal("+"))?;
    expr_add_post_op(&e, literal("*"))?;
    expr_add_parens(&e, literal("["), literal("]"))?;
    expr_add_parens(&e, literal("("), literal(")"))?;

    let lex = re_lex(e.clone());
    re_lex_add(&lex, "[a-zA-Z0-9_-]+", true)?;
    re_lex_add(&lex, "[*+|,()]", true)?;
    re_lex_add(&lex, r"\[", true)?;
    re_lex_add(&lex, r"\]", true)?;
    re_lex_add(&lex, "[ \t]+", false)?;

    Ok(DslGrammar { parser: lex, expr: e })
}

/// The node builder behind the DSL evaluation.
struct CmdBuilder<'a> {
    table: &'a [Node],
}

impl CmdBuilder<'_> {
    fn op_token(operator: &ParseNode) -> Vec<String> {
        operator.tokens()
    }
}

impl ExprEvaluator for CmdBuilder<'_> {
    type Value = Node;

    fn eval_var(&self, var: &ParseNode) -> Result<Node, GrammarError> {
        let tokens = var.tokens();
        let [word] = tokens.as_slice() else {
            return Err(GrammarError::eval("an identifier is a single token"));
        };
        for candidate in self.table {
            if candidate.id().as_deref() == Some(word.as_str()) {
                return Ok(candidate.clone());
            }
        }
        Ok(literal(word.clone()))
    }

    fn eval_pre_op(&self, _operand: Node, _operator: &ParseNode) -> Result<Node, GrammarError> {
        Err(GrammarError::eval("the command language has no prefix operators"))
    }

    fn eval_post_op(&self, operand: Node, operator: &ParseNode) -> Result<Node, GrammarError> {
        match Self::op_token(operator).first().map(String::as_str) {
            Some("*") => Ok(many(operand, 0, 0)),
            Some("+") => Ok(many(operand, 1, 0)),
            _ => Err(GrammarError::eval("unknown postfix operator")),
        }
    }

    fn eval_bin_op(
        &self,
        lhs: Node,
        operator: &ParseNode,
        rhs: Node,
    ) -> Result<Node, GrammarError> {
        let tokens = Self::op_token(operator);
        let kind = match tokens.first().map(String::as_str) {
            None => "seq",
            Some("|") => "or",
            Some(",") => "subset",
            _ => return Err(GrammarError::eval("unknown binary operator")),
        };

        // When one operand is already a composite of the same kind, the
        // other is folded into it instead of nesting.
        if rhs.type_name() == kind {
            match kind {
                "seq" => seq_prepend(&rhs, lhs)?,
                "or" => alt_prepend(&rhs, lhs)?,
                _ => subset_prepend(&rhs, lhs)?,
            }
            return Ok(rhs);
        }
        if lhs.type_name() == kind {
            match kind {
                "seq" => super::seq::seq_add(&lhs, rhs)?,
                "or" => super::alt::alt_add(&lhs, rhs)?,
                _ => super::subset::subset_add(&lhs, rhs)?,
            }
            return Ok(lhs);
        }
        Ok(match kind {
            "seq" => seq([lhs, rhs]),
            "or" => alt([lhs, rhs]),
            _ => subset([lhs, rhs]),
        })
    }

    fn eval_paren(
        &self,
        open: &ParseNode,
        _close: &ParseNode,
        value: Node,
    ) -> Result<Node, GrammarError> {
        match Self::op_token(open).first().map(String::as_str) {
            Some("[") => Ok(option(value)),
            Some("(") => Ok(value),
            _ => Err(GrammarError::eval("unknown parenthesis")),
        }
    }
}

fn build_cmd(cmd_str: &str, table: &[Node]) -> Result<Node, GrammarError> {
    DSL.with(|cell| {
        if cell.get().is_none() {
            let dsl = build_dsl().expect("the builtin command grammar is statically valid");
            let _ = cell.set(dsl);
        }
        let dsl = cell
            .get()
            .unwrap_or_else(|| unreachable!("the grammar was just initialized"));

        let tree = crate::parse::parse_tokens(
            &dsl.parser,
            &[cmd_str.to_string()],
            DEFAULT_RECURSION_LIMIT,
        )?;
        if !tree.matches() {
            return Err(GrammarError::config(format!(
                "cannot parse command expression `{cmd_str}`"
            )));
        }
        let parse = tree
            .first()
            .unwrap_or_else(|| unreachable!("a matching tree has a first node"));

        let builder = CmdBuilder { table };
        eval(&dsl.expr, &parse, &builder)
    })
}

impl NodeOps for CmdOps {
    fn parse(
        &self,
        _node: &Node,
        state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        let cmd = self
            .cmd
            .as_ref()
            .ok_or_else(|| GrammarError::config("cmd node is not configured"))?;
        parse_child(cmd, state, tokens)
    }

    fn complete(
        &self,
        _node: &Node,
        comp: &mut Completions,
        tokens: &[String],
    ) -> Result<(), GrammarError> {
        let cmd = self
            .cmd
            .as_ref()
            .ok_or_else(|| GrammarError::config("cmd node is not configured"))?;
        complete_child(cmd, comp, tokens)
    }

    fn set_config(&mut self, config: &ConfigValue) -> Result<(), GrammarError> {
        let cmd_str = config
            .get("expr")
            .and_then(ConfigValue::as_str)
            .ok_or_else(|| GrammarError::config("cmd node needs an `expr` entry"))?;
        let table = match config.get("children") {
            Some(children) => children.node_table()?,
            None => Vec::new(),
        };

        let cmd = build_cmd(cmd_str, &table)?;

        self.cmd = Some(cmd);
        Ok(())
    }

    fn children(&self) -> Vec<Node> {
        self.cmd.iter().cloned().collect()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node built from a command description and the child nodes its
/// identifiers reference.
pub fn cmd<I>(expression: &str, children: I) -> Result<Node, GrammarError>
where
    I: IntoIterator<Item = Node>,
{
    let node = Node::from_type(&CMD_TYPE);
    node.set_config(ConfigValue::dict([
        ("expr", ConfigValue::String(expression.to_string())),
        ("children", ConfigValue::node_list(children)),
    ]))?;
    Ok(node)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::int;
    use crate::test_support::{check_complete, check_parse};

    #[test]
    fn operators_compose() {
        let node = cmd(
            "command [option] (subset1, subset2, subset3, subset4) x|y z*",
            [
                int(0, 10, 10).expect("int").with_id("x"),
                int(20, 30, 10).expect("int").with_id("y"),
            ],
        )
        .expect("cmd node");

        check_parse(&node, Some(2), &["command", "1"]);
        check_parse(&node, Some(3), &["command", "subset1", "1"]);
        check_parse(&node, Some(4), &["command", "subset3", "subset2", "1"]);
        check_parse(
            &node,
            Some(5),
            &["command", "subset2", "subset3", "subset1", "1"],
        );
        check_parse(
            &node,
            Some(6),
            &["command", "subset3", "subset1", "subset4", "subset2", "4"],
        );
        check_parse(&node, Some(2), &["command", "23"]);
        check_parse(&node, Some(3), &["command", "option", "23"]);
        check_parse(&node, Some(5), &["command", "option", "23", "z", "z"]);
        check_parse(&node, None, &["command", "15"]);
        check_parse(&node, None, &["foo"]);
    }

    #[test]
    fn identifiers_bind_children_and_literals() {
        let node = cmd(
            "good morning [count] bob|bobby|michael",
            [int(0, 10, 10).expect("int").with_id("count")],
        )
        .expect("cmd node");

        check_parse(&node, Some(4), &["good", "morning", "1", "bob"]);
        check_complete(&node, &[""], &["good"]);
        check_complete(&node, &["g"], &["good"]);
        check_complete(
            &node,
            &["good", "morning", ""],
            &["bob", "bobby", "michael"],
        );
    }

    #[test]
    fn nested_options() {
        let node = cmd("[foo [bar]]", []).expect("cmd node");
        check_parse(&node, Some(0), &[]);
        check_parse(&node, Some(1), &["foo"]);
        check_parse(&node, Some(2), &["foo", "bar"]);
        check_parse(&node, Some(0), &["x"]);
    }

    #[test]
    fn a_broken_expression_is_a_config_error() {
        assert!(cmd("foo | | bar", []).is_err());
        assert!(cmd("(foo", []).is_err());
    }
}
