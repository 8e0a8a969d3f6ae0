//! Composable grammars for interactive command lines.
//!
//! A grammar is a tree of [`Node`]s describing the set of acceptable
//! command lines. Two operations work on any token vector:
//!
//! * **parse** — is this input accepted, and what does its parse tree
//!   look like?
//! * **complete** — given a possibly-partial input, what tokens can come
//!   next?
//!
//! ## Example
//!
//! ```rust
//! use cligram::nodes::{literal, option, seq, sh_lex};
//! use cligram::CompMask;
//!
//! // foo [toto] bar, lexed with shell quoting rules.
//! let grammar = sh_lex(seq([
//!     literal("foo"),
//!     option(literal("toto")),
//!     literal("bar"),
//! ]));
//!
//! let tree = grammar.parse_line("foo toto bar").unwrap();
//! assert!(tree.matches());
//!
//! let completions = grammar.complete_line("foo ").unwrap();
//! let candidates: Vec<_> = completions
//!     .iter(CompMask::FULL)
//!     .filter_map(|item| item.full())
//!     .collect();
//! assert_eq!(candidates, ["toto", "bar"]);
//! ```
//!
//! Grammars can also be written in a small description language through
//! the [`nodes::cmd`] node, and evaluated with user callbacks through
//! the [`nodes::expr`] node.
//!
//! The engine prints nothing; diagnostics go through the [`log`] facade.

mod complete;
mod config;
mod error;
mod limit;
mod node;
pub mod nodes;
mod parse;
pub mod registry;
mod shlex;

pub use crate::complete::{
    complete_child, complete_unknown, CompGroup, CompItem, CompKind, CompMask, Completions,
};
pub use crate::config::{ConfigKind, ConfigValue, Schema, SchemaEntry};
pub use crate::error::GrammarError;
pub use crate::limit::LimitTracker;
pub use crate::node::{Node, NodeOps, NodeType, WeakNode};
pub use crate::parse::{parse_child, ParseNode, ParseResult, ParseTree};

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{CompMask, Node};

    /// Assert the parsed length of a token vector, `None` meaning the
    /// grammar refuses it.
    pub(crate) fn check_parse(node: &Node, expected: Option<usize>, tokens: &[&str]) {
        let tree = node.parse(tokens).expect("parse must not error");
        assert_eq!(
            tree.matched_len(),
            expected,
            "parse of {tokens:?}\n{}",
            tree.dump()
        );
    }

    /// Assert the set of full completions of a token vector, in any
    /// order.
    pub(crate) fn check_complete(node: &Node, tokens: &[&str], expected: &[&str]) {
        let comp = node.complete(tokens).expect("complete must not error");
        let mut actual: Vec<String> = comp
            .iter(CompMask::FULL)
            .filter_map(|item| item.full().map(str::to_string))
            .collect();
        let mut expected: Vec<String> = expected.iter().map(|s| s.to_string()).collect();
        actual.sort();
        expected.sort();
        assert_eq!(actual, expected, "completion of {tokens:?}\n{}", comp.dump());
    }
}
