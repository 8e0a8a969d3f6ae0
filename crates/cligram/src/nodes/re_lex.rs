//! `re_lex`: tokenize one raw token with an ordered list of regular
//! expressions and hand the result to the child grammar.

use std::any::Any;

use regex::Regex;

use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{parse_child, ParseNode, ParseResult};

pub(crate) static RE_LEX_TYPE: NodeType = NodeType {
    name: "re_lex",
    schema: &[],
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::<ReLexOps>::default()
}

struct LexPattern {
    regex: Regex,
    keep: bool,
}

#[derive(Default)]
struct ReLexOps {
    child: Option<Node>,
    table: Vec<LexPattern>,
}

/// Scan `input` left to right. At each position the patterns are tried
/// in order and the first one matching wins; tokens of discarded
/// patterns are dropped. A position where nothing matches is a hard
/// error, not a refusal.
fn tokenize(table: &[LexPattern], input: &str) -> Result<Vec<String>, GrammarError> {
    let mut tokens = Vec::new();
    let mut offset = 0;
    while offset < input.len() {
        let matched = table.iter().find_map(|pattern| {
            pattern
                .regex
                .find(&input[offset..])
                .filter(|m| !m.is_empty())
                .map(|m| (m.end(), pattern.keep))
        });
        let Some((len, keep)) = matched else {
            return Err(GrammarError::LexicalMismatch { offset });
        };
        if keep {
            let token = &input[offset..offset + len];
            log::debug!("re_lex match <{token}>");
            tokens.push(token.to_string());
        }
        offset += len;
    }
    Ok(tokens)
}

impl NodeOps for ReLexOps {
    fn parse(
        &self,
        _node: &Node,
        state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        let child = self
            .child
            .as_ref()
            .ok_or_else(|| GrammarError::config("re_lex node has no child"))?;

        let lexed = match tokens.first() {
            None => Vec::new(),
            Some(line) => tokenize(&self.table, line)?,
        };

        match parse_child(child, state, &lexed)? {
            ParseResult::Match(n) if n == lexed.len() => {
                Ok(ParseResult::Match(usize::from(!tokens.is_empty())))
            }
            ParseResult::Match(_) => {
                state.del_last_child();
                Ok(ParseResult::NoMatch)
            }
            ParseResult::NoMatch => Ok(ParseResult::NoMatch),
        }
    }

    // Completion keeps the default unknown behavior: token definitions
    // are not inverted.

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

/// A node tokenizing its single input token with regular expressions
/// and matching the child against the result.
pub fn re_lex(child: Node) -> Node {
    let node = Node::from_type(&RE_LEX_TYPE);
    node.with_ops_mut(|ops: &mut ReLexOps| ops.child = Some(child))
        .expect("a fresh re_lex node accepts a child");
    node
}

/// Append a token pattern. `keep` decides whether matched text becomes
/// a token or is discarded (e.g. whitespace).
pub fn re_lex_add(node: &Node, pattern: &str, keep: bool) -> Result<(), GrammarError> {
    // Patterns must match at the scan position, not anywhere later.
    let regex = Regex::new(&format!("^(?:{pattern})"))?;
    node.with_ops_mut(|ops: &mut ReLexOps| ops.table.push(LexPattern { regex, keep }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{alt, int, literal, many};
    use crate::test_support::{check_complete, check_parse};

    fn grammar() -> Node {
        let node = re_lex(many(
            alt([
                literal("foo"),
                literal("bar"),
                int(0, 1000, 0).expect("int node"),
            ]),
            0,
            0,
        ));
        re_lex_add(&node, "[a-zA-Z]+", true).expect("add pattern");
        re_lex_add(&node, "[0-9]+", true).expect("add pattern");
        re_lex_add(&node, "=", true).expect("add pattern");
        re_lex_add(&node, "-", true).expect("add pattern");
        re_lex_add(&node, r"\+", true).expect("add pattern");
        re_lex_add(&node, "[ \t]+", false).expect("add pattern");
        node
    }

    #[test]
    fn tokenizes_and_feeds_the_child() {
        let node = grammar();
        check_parse(&node, Some(1), &["  foo bar  324 bar234"]);
        check_parse(&node, Some(1), &["foo bar324"]);
        check_parse(&node, Some(1), &[""]);
        check_parse(&node, None, &["foobar"]);
    }

    #[test]
    fn a_lexical_mismatch_is_a_hard_error() {
        let node = grammar();
        let err = node.parse(&["foo :"]).expect_err("no pattern matches `:`");
        assert!(matches!(err, GrammarError::LexicalMismatch { offset: 4 }));
    }

    #[test]
    fn invalid_patterns_are_rejected() {
        let node = grammar();
        assert!(re_lex_add(&node, "(", true).is_err());
    }

    #[test]
    fn completion_is_unknown_only() {
        let node = grammar();
        check_complete(&node, &[""], &[]);
    }
}
