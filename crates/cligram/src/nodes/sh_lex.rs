//! `sh_lex`: re-lex one raw token with shell quoting rules and hand the
//! result to the child grammar.

use std::any::Any;

use crate::complete::{complete_child, expand_tokens, CompKind, Completions};
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{parse_child, ParseNode, ParseResult};
use crate::shlex::{tokenize, LexMode};

pub(crate) static SH_LEX_TYPE: NodeType = NodeType {
    name: "sh_lex",
    schema: &[],
    new_ops: new_ops,
};

fn new_ops() -> Box<dyn NodeOps> {
    Box::<ShLexOps>::default()
}

#[derive(Default)]
struct ShLexOps {
    child: Option<Node>,
    expand: bool,
}

impl ShLexOps {
    fn child(&self) -> Result<&Node, GrammarError> {
        self.child
            .as_ref()
            .ok_or_else(|| GrammarError::config("sh_lex node has no child"))
    }
}

/// Length of the common prefix of two strings, in bytes of whole
/// characters.
fn common_prefix_len(a: &str, b: &str) -> usize {
    a.char_indices()
        .zip(b.chars())
        .find(|((_, ca), cb)| ca != cb)
        .map(|((i, _), _)| i)
        .unwrap_or_else(|| a.len().min(b.len()))
}

impl NodeOps for ShLexOps {
    fn parse(
        &self,
        _node: &Node,
        state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        let child = self.child()?;

        let mut lexed = match tokens.first() {
            None => Vec::new(),
            Some(line) => match tokenize(line, LexMode::Strict) {
                Ok(lexed) => lexed.tokens,
                Err(GrammarError::UnterminatedQuote) => return Ok(ParseResult::NoMatch),
                Err(err) => return Err(err),
            },
        };

        if self.expand {
            let limit = state.limits().get().limit;
            lexed = expand_tokens(child, &lexed, limit)?;
        }

        match parse_child(child, state, &lexed)? {
            // The child must consume the whole lexed vector; a partial
            // match is a refusal.
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

    fn complete(
        &self,
        _node: &Node,
        comp: &mut Completions,
        tokens: &[String],
    ) -> Result<(), GrammarError> {
        let child = self.child()?;
        let [line] = tokens else {
            return Ok(());
        };

        let lexed = tokenize(line, LexMode::Trailing)?;
        let watermark = comp.group_watermark();

        let vec = if self.expand {
            let limit = comp.parse_state().limits().get().limit;
            expand_tokens(child, &lexed.tokens, limit)?
        } else {
            lexed.tokens.clone()
        };

        complete_child(child, comp, &vec)?;

        // What the user actually typed for the token being completed;
        // the expanded vector may already contain more.
        let last = lexed.tokens.last().cloned();
        for item in comp.items_since(watermark) {
            if item.kind() != CompKind::Full {
                continue;
            }

            // The expansion may have typed characters on the user's
            // behalf; drop them from the completion tail.
            if self.expand {
                if let (Some(full), Some(last)) = (item.full(), last.as_deref()) {
                    let skip = common_prefix_len(full, last);
                    let tail = full[skip..].to_string();
                    item.set_completion(tail)?;
                }
            }

            // Re-wrap candidates in the quote the user left open.
            if let Some(quote) = lexed.missing_quote {
                if let Some(full) = item.full() {
                    let quoted = format!("{quote}{full}{quote}");
                    item.set_full(quoted)?;
                }
                if let Some(tail) = item.completion() {
                    let closed = format!("{tail}{quote}");
                    item.set_completion(closed)?;
                }
            }
        }
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

/// A node lexing its single input token with shell quoting rules and
/// matching the child against the result. The child must consume every
/// produced token.
pub fn sh_lex(child: Node) -> Node {
    let node = Node::from_type(&SH_LEX_TYPE);
    sh_lex_set_child(&node, child, false).expect("a fresh sh_lex node accepts a child");
    node
}

/// Like [`sh_lex`], but tokens that are unambiguous prefixes of exactly
/// one completion are expanded to their full form before matching.
pub fn sh_lex_expand(child: Node) -> Node {
    let node = Node::from_type(&SH_LEX_TYPE);
    sh_lex_set_child(&node, child, true).expect("a fresh sh_lex node accepts a child");
    node
}

fn sh_lex_set_child(node: &Node, child: Node, expand: bool) -> Result<(), GrammarError> {
    if child.same(node) {
        return Err(GrammarError::SelfReference);
    }
    node.with_ops_mut(|ops: &mut ShLexOps| {
        ops.child = Some(child);
        ops.expand = expand;
    })
}
