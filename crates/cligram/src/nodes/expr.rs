//! `expr`: operator-precedence expressions over grammar nodes.
//!
//! The node is configured with a value (terminal) node, prefix, postfix
//! and binary operator nodes, and parenthesis pairs. At configuration
//! time an internal grammar is materialized from the other compound
//! nodes:
//!
//! ```text
//! atom := pre_op* ( "(" expr ")" | value ) post_op*
//! expr := atom (bin_op atom)*
//! ```
//!
//! with the parenthesized recursion routed through a bypass node. All
//! binary operators share one precedence level; distinct precedences are
//! expressed by nesting expr nodes.
//!
//! [`eval`] walks a parse tree produced by this grammar with
//! user-supplied callbacks, building one value per sub-expression.

use std::any::Any;

use crate::complete::{complete_child, Completions};
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{parse_child, ParseNode, ParseResult};

use super::alt::alt;
use super::bypass::{bypass_set_child, BYPASS_TYPE};
use super::many::many;
use super::seq::seq;

pub(crate) static EXPR_TYPE: NodeType = NodeType {
    name: "expr",
    schema: &[],
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::<ExprOps>::default()
}

struct ParenSeq {
    seq: Node,
}

struct ExprGrammar {
    root: Node,
    choice: Node,
    pre_chain: Option<Node>,
    post_chain: Option<Node>,
    bin_chain: Option<Node>,
    paren_seqs: Vec<ParenSeq>,
}

#[derive(Default)]
struct ExprOps {
    val: Option<Node>,
    bin_ops: Vec<Node>,
    pre_ops: Vec<Node>,
    post_ops: Vec<Node>,
    parens: Vec<(Node, Node)>,
    grammar: Option<ExprGrammar>,
}

impl ExprOps {
    /// Rebuild the internal grammar. A node without a value node keeps
    /// no grammar and refuses to parse.
    fn rebuild(&mut self) -> Result<(), GrammarError> {
        let Some(val) = self.val.clone() else {
            self.grammar = None;
            return Ok(());
        };

        let bypass_node = Node::from_type(&BYPASS_TYPE);

        let mut paren_seqs = Vec::new();
        let mut choices = Vec::new();
        for (open, close) in &self.parens {
            let group = seq([open.clone(), bypass_node.clone(), close.clone()]);
            choices.push(group.clone());
            paren_seqs.push(ParenSeq { seq: group });
        }
        let choice = if choices.is_empty() {
            val
        } else {
            choices.push(val);
            alt(choices)
        };

        let pre_chain = (!self.pre_ops.is_empty())
            .then(|| many(alt(self.pre_ops.clone()), 0, 0));
        let post_chain = (!self.post_ops.is_empty())
            .then(|| many(alt(self.post_ops.clone()), 0, 0));

        let atom = if pre_chain.is_none() && post_chain.is_none() {
            choice.clone()
        } else {
            let mut parts = Vec::new();
            parts.extend(pre_chain.clone());
            parts.push(choice.clone());
            parts.extend(post_chain.clone());
            seq(parts)
        };

        let (root, bin_chain) = if self.bin_ops.is_empty() {
            (atom, None)
        } else {
            let item = seq([alt(self.bin_ops.clone()), atom.clone()]);
            let chain = many(item, 0, 0);
            (seq([atom, chain.clone()]), Some(chain))
        };

        bypass_set_child(&bypass_node, &root)?;

        self.grammar = Some(ExprGrammar {
            root,
            choice,
            pre_chain,
            post_chain,
            bin_chain,
            paren_seqs,
        });
        Ok(())
    }

    fn root(&self) -> Result<&Node, GrammarError> {
        self.grammar
            .as_ref()
            .map(|grammar| &grammar.root)
            .ok_or_else(|| GrammarError::config("expr node has no value node"))
    }

    fn refs(&self) -> Result<GrammarRefs, GrammarError> {
        let grammar = self
            .grammar
            .as_ref()
            .ok_or_else(|| GrammarError::config("expr node has no value node"))?;
        let val = self
            .val
            .clone()
            .ok_or_else(|| GrammarError::config("expr node has no value node"))?;
        Ok(GrammarRefs {
            root: grammar.root.clone(),
            choice: grammar.choice.clone(),
            val,
            pre_chain: grammar.pre_chain.clone(),
            post_chain: grammar.post_chain.clone(),
            bin_chain: grammar.bin_chain.clone(),
            paren_seqs: grammar.paren_seqs.iter().map(|p| p.seq.clone()).collect(),
        })
    }
}

impl NodeOps for ExprOps {
    fn parse(
        &self,
        _node: &Node,
        state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        parse_child(self.root()?, state, tokens)
    }

    fn complete(
        &self,
        _node: &Node,
        comp: &mut Completions,
        tokens: &[String],
    ) -> Result<(), GrammarError> {
        complete_child(self.root()?, comp, tokens)
    }

    fn children(&self) -> Vec<Node> {
        let mut children = Vec::new();
        children.extend(self.val.clone());
        children.extend(self.pre_ops.iter().cloned());
        children.extend(self.post_ops.iter().cloned());
        children.extend(self.bin_ops.iter().cloned());
        for (open, close) in &self.parens {
            children.push(open.clone());
            children.push(close.clone());
        }
        children
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// An expression node with no configuration yet. Set a value node and
/// operators before parsing.
pub fn expr() -> Node {
    Node::from_type(&EXPR_TYPE)
}

fn configure(
    node: &Node,
    added: &[&Node],
    f: impl FnOnce(&mut ExprOps),
) -> Result<(), GrammarError> {
    for op in added {
        if op.same(node) {
            return Err(GrammarError::SelfReference);
        }
    }
    node.with_ops_mut(|ops: &mut ExprOps| {
        f(ops);
        ops.rebuild()
    })?
}

/// Set the value (terminal) node of an `expr` node.
pub fn expr_set_val(node: &Node, val: Node) -> Result<(), GrammarError> {
    configure(node, &[&val.clone()], move |ops| ops.val = Some(val))
}

/// Add a binary operator. All binary operators share one precedence
/// level; nest expr nodes for more.
pub fn expr_add_bin_op(node: &Node, op: Node) -> Result<(), GrammarError> {
    configure(node, &[&op.clone()], move |ops| ops.bin_ops.push(op))
}

/// Add a prefix operator.
pub fn expr_add_pre_op(node: &Node, op: Node) -> Result<(), GrammarError> {
    configure(node, &[&op.clone()], move |ops| ops.pre_ops.push(op))
}

/// Add a postfix operator.
pub fn expr_add_post_op(node: &Node, op: Node) -> Result<(), GrammarError> {
    configure(node, &[&op.clone()], move |ops| ops.post_ops.push(op))
}

/// Add a parenthesis pair enclosing a nested expression.
pub fn expr_add_parens(node: &Node, open: Node, close: Node) -> Result<(), GrammarError> {
    configure(node, &[&open.clone(), &close.clone()], move |ops| {
        ops.parens.push((open, close))
    })
}

/// Callbacks evaluating an expression parse tree.
///
/// Operand values are moved into the callbacks; on failure, values still
/// held by the walk are dropped during unwind.
pub trait ExprEvaluator {
    type Value;

    /// Evaluate a terminal.
    fn eval_var(&self, var: &ParseNode) -> Result<Self::Value, GrammarError>;

    /// Apply a prefix operator. Stacked operators apply from the one
    /// nearest the atom outward.
    fn eval_pre_op(
        &self,
        operand: Self::Value,
        operator: &ParseNode,
    ) -> Result<Self::Value, GrammarError>;

    /// Apply a postfix operator, nearest the atom first.
    fn eval_post_op(
        &self,
        operand: Self::Value,
        operator: &ParseNode,
    ) -> Result<Self::Value, GrammarError>;

    /// Combine two operands with a binary operator.
    fn eval_bin_op(
        &self,
        lhs: Self::Value,
        operator: &ParseNode,
        rhs: Self::Value,
    ) -> Result<Self::Value, GrammarError>;

    /// Evaluate a parenthesized sub-expression.
    fn eval_paren(
        &self,
        open: &ParseNode,
        close: &ParseNode,
        value: Self::Value,
    ) -> Result<Self::Value, GrammarError>;
}

struct GrammarRefs {
    root: Node,
    choice: Node,
    val: Node,
    pre_chain: Option<Node>,
    post_chain: Option<Node>,
    bin_chain: Option<Node>,
    paren_seqs: Vec<Node>,
}

fn malformed() -> GrammarError {
    GrammarError::eval("parse tree does not belong to this expression node")
}

/// Evaluate the parse tree of an expression node in postorder.
///
/// `parse` may be the tree node of the expr node itself or any ancestor
/// wrapper around it (e.g. a lexer node).
pub fn eval<E: ExprEvaluator>(
    node: &Node,
    parse: &ParseNode,
    evaluator: &E,
) -> Result<E::Value, GrammarError> {
    let refs = node.with_ops(|ops: &ExprOps| ops.refs())??;

    let mut cur = Some(parse.clone());
    let target = loop {
        let Some(p) = cur else {
            return Err(malformed());
        };
        if p.node().is_some_and(|n| n.same(&refs.root)) {
            break p;
        }
        cur = p.first_child();
    };

    eval_expr(&refs, &target, evaluator)
}

fn eval_expr<E: ExprEvaluator>(
    refs: &GrammarRefs,
    p: &ParseNode,
    evaluator: &E,
) -> Result<E::Value, GrammarError> {
    if refs.bin_chain.is_none() {
        return eval_atom(refs, p, evaluator);
    }

    let atom_p = p.child_at(0).ok_or_else(malformed)?;
    let chain_p = p.child_at(1).ok_or_else(malformed)?;

    let mut operations = Vec::new();
    for item in chain_p.children() {
        let op_choice = item.child_at(0).ok_or_else(malformed)?;
        let op = op_choice.first_child().ok_or_else(malformed)?;
        let rhs = item.child_at(1).ok_or_else(malformed)?;
        operations.push((op, rhs));
    }

    let Some((_, last_atom)) = operations.last() else {
        return eval_atom(refs, &atom_p, evaluator);
    };

    // Fold the operator chain from the right: for the flattening rules
    // of associative grammar operators this reconstructs flat,
    // declaration-ordered composites.
    let mut value = eval_atom(refs, last_atom, evaluator)?;
    for index in (0..operations.len()).rev() {
        let lhs_p = if index == 0 {
            &atom_p
        } else {
            &operations[index - 1].1
        };
        let lhs = eval_atom(refs, lhs_p, evaluator)?;
        value = evaluator.eval_bin_op(lhs, &operations[index].0, value)?;
    }
    Ok(value)
}

fn eval_atom<E: ExprEvaluator>(
    refs: &GrammarRefs,
    p: &ParseNode,
    evaluator: &E,
) -> Result<E::Value, GrammarError> {
    if refs.pre_chain.is_none() && refs.post_chain.is_none() {
        return eval_choice(refs, p, evaluator);
    }

    let mut pre_p = None;
    let mut post_p = None;
    let mut choice_p = None;
    for child in p.children() {
        let Some(node) = child.node() else { continue };
        if refs.pre_chain.as_ref().is_some_and(|c| c.same(&node)) {
            pre_p = Some(child);
        } else if refs.post_chain.as_ref().is_some_and(|c| c.same(&node)) {
            post_p = Some(child);
        } else {
            choice_p = Some(child);
        }
    }
    let choice_p = choice_p.ok_or_else(malformed)?;

    let mut value = eval_choice(refs, &choice_p, evaluator)?;

    if let Some(post_p) = post_p {
        for op_choice in post_p.children() {
            let op = op_choice.first_child().ok_or_else(malformed)?;
            value = evaluator.eval_post_op(value, &op)?;
        }
    }
    if let Some(pre_p) = pre_p {
        for op_choice in pre_p.children().iter().rev() {
            let op = op_choice.first_child().ok_or_else(malformed)?;
            value = evaluator.eval_pre_op(value, &op)?;
        }
    }
    Ok(value)
}

fn eval_choice<E: ExprEvaluator>(
    refs: &GrammarRefs,
    p: &ParseNode,
    evaluator: &E,
) -> Result<E::Value, GrammarError> {
    let node = p.node().ok_or_else(malformed)?;

    // Without parentheses the choice position holds the value directly.
    if node.same(&refs.val) {
        return evaluator.eval_var(p);
    }
    if !node.same(&refs.choice) {
        return Err(malformed());
    }

    let inner = p.first_child().ok_or_else(malformed)?;
    let inner_node = inner.node().ok_or_else(malformed)?;
    if inner_node.same(&refs.val) {
        return evaluator.eval_var(&inner);
    }
    if refs.paren_seqs.iter().any(|s| s.same(&inner_node)) {
        let open = inner.child_at(0).ok_or_else(malformed)?;
        let sub = inner
            .child_at(1)
            .and_then(|bypass_p| bypass_p.first_child())
            .ok_or_else(malformed)?;
        let close = inner.child_at(2).ok_or_else(malformed)?;
        let value = eval_expr(refs, &sub, evaluator)?;
        return evaluator.eval_paren(&open, &close, value);
    }
    Err(malformed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{literal, re};
    use crate::test_support::{check_complete, check_parse};

    fn arith() -> Node {
        let node = expr();
        expr_set_val(&node, re("[0-9]+").expect("value pattern")).expect("set value");
        expr_add_bin_op(&node, literal("+")).expect("add op");
        expr_add_pre_op(&node, literal("-")).expect("add op");
        expr_add_post_op(&node, literal("!")).expect("add op");
        expr_add_parens(&node, literal("("), literal(")")).expect("add parens");
        node
    }

    #[test]
    fn parses_operator_chains() {
        let node = arith();
        check_parse(&node, Some(1), &["1"]);
        check_parse(&node, Some(3), &["1", "+", "2"]);
        check_parse(&node, Some(5), &["1", "+", "2", "+", "3"]);
        check_parse(&node, Some(4), &["-", "1", "+", "2"]);
        check_parse(&node, Some(5), &["(", "1", "+", "2", ")"]);
        check_parse(&node, Some(1), &["1", "+"]);
        check_parse(&node, None, &["+", "1"]);
    }

    #[test]
    fn completion_offers_operators_and_parens() {
        let node = arith();
        check_complete(&node, &["1", ""], &["+", "!"]);
        check_complete(&node, &["1", "+", ""], &["-", "("]);
    }

    #[test]
    fn an_unconfigured_node_refuses_to_parse() {
        let node = expr();
        assert!(node.parse(&["1"]).is_err());
    }

    struct Calc;

    impl ExprEvaluator for Calc {
        type Value = i64;

        fn eval_var(&self, var: &ParseNode) -> Result<i64, GrammarError> {
            let tokens = var.tokens();
            tokens
                .first()
                .and_then(|t| t.parse().ok())
                .ok_or_else(|| GrammarError::eval("not a number"))
        }

        fn eval_pre_op(&self, operand: i64, _operator: &ParseNode) -> Result<i64, GrammarError> {
            Ok(-operand)
        }

        fn eval_post_op(&self, operand: i64, _operator: &ParseNode) -> Result<i64, GrammarError> {
            Ok(operand * 2)
        }

        fn eval_bin_op(
            &self,
            lhs: i64,
            _operator: &ParseNode,
            rhs: i64,
        ) -> Result<i64, GrammarError> {
            Ok(lhs + rhs)
        }

        fn eval_paren(
            &self,
            _open: &ParseNode,
            _close: &ParseNode,
            value: i64,
        ) -> Result<i64, GrammarError> {
            Ok(value)
        }
    }

    fn eval_tokens(node: &Node, tokens: &[&str]) -> i64 {
        let tree = node.parse(tokens).expect("parse");
        assert!(tree.matches());
        let parse = tree.first().expect("parse node");
        eval(node, &parse, &Calc).expect("eval")
    }

    #[test]
    fn evaluates_with_callbacks() {
        let node = arith();
        assert_eq!(eval_tokens(&node, &["4"]), 4);
        assert_eq!(eval_tokens(&node, &["1", "+", "2", "+", "3"]), 6);
        assert_eq!(eval_tokens(&node, &["-", "3"]), -3);
        assert_eq!(eval_tokens(&node, &["2", "!"]), 4);
        assert_eq!(eval_tokens(&node, &["(", "1", "+", "2", ")", "!"]), 6);
    }

    #[test]
    fn stacked_unary_operators_apply_nearest_first() {
        let node = arith();
        // -(3!) = -6, not (-3)! = -6... use an asymmetric stack:
        // -(-(3!)) doubles before the two negations.
        assert_eq!(eval_tokens(&node, &["-", "-", "3", "!"]), 6);
        assert_eq!(eval_tokens(&node, &["-", "3", "!", "!"]), -12);
    }
}
