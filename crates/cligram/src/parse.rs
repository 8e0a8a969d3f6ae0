//! The parse tree and the parse protocol.
//!
//! A parse invocation builds a tree of [`ParseNode`]s, one per grammar
//! node that matched (or is in the middle of matching). Each tree node
//! records the grammar node that produced it and the slice of input it
//! consumed. A refusal is reported as [`ParseResult::NoMatch`] and leaves
//! no trace in the tree — distinct from a match of length zero, which
//! does.
//!
//! Node parse functions receive their own tree node as `state` and call
//! [`parse_child`] on their children, temporarily linking and unlinking
//! child results to implement backtracking.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::fmt::Write as _;
use std::rc::{Rc, Weak};

use crate::error::GrammarError;
use crate::limit::{LimitTracker, DEFAULT_RECURSION_LIMIT};
use crate::node::Node;

/// Outcome of a parse operation: how many leading tokens were consumed,
/// or a refusal. Never conflated with [`GrammarError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseResult {
    /// The node matched, consuming exactly this many leading tokens.
    /// Zero is a legal match.
    Match(usize),
    /// The node refused the input.
    NoMatch,
}

impl ParseResult {
    pub fn is_match(&self) -> bool {
        matches!(self, ParseResult::Match(_))
    }

    /// The consumed length, or `None` on refusal.
    pub fn len(&self) -> Option<usize> {
        match self {
            ParseResult::Match(n) => Some(*n),
            ParseResult::NoMatch => None,
        }
    }
}

struct PNodeData {
    node: Option<Node>,
    tokens: Vec<String>,
    matched: bool,
    children: Vec<ParseNode>,
    parent: Weak<RefCell<PNodeData>>,
    limits: Rc<Cell<LimitTracker>>,
}

/// A shared handle to one node of a parse tree.
#[derive(Clone)]
pub struct ParseNode {
    inner: Rc<RefCell<PNodeData>>,
}

impl ParseNode {
    pub(crate) fn new_root(limit: usize) -> ParseNode {
        ParseNode {
            inner: Rc::new(RefCell::new(PNodeData {
                node: None,
                tokens: Vec::new(),
                matched: false,
                children: Vec::new(),
                parent: Weak::new(),
                limits: Rc::new(Cell::new(LimitTracker::new(limit))),
            })),
        }
    }

    /// A tree node not yet linked anywhere, sharing a limit tracker.
    /// Completion uses this to build tentative parse states.
    pub(crate) fn new_detached(node: &Node, limits: Rc<Cell<LimitTracker>>) -> ParseNode {
        ParseNode {
            inner: Rc::new(RefCell::new(PNodeData {
                node: Some(node.clone()),
                tokens: Vec::new(),
                matched: false,
                children: Vec::new(),
                parent: Weak::new(),
                limits,
            })),
        }
    }

    fn new_child(node: &Node, parent: &ParseNode) -> ParseNode {
        ParseNode {
            inner: Rc::new(RefCell::new(PNodeData {
                node: Some(node.clone()),
                tokens: Vec::new(),
                matched: false,
                children: Vec::new(),
                parent: Rc::downgrade(&parent.inner),
                limits: parent.inner.borrow().limits.clone(),
            })),
        }
    }

    /// The grammar node that produced this tree node. `None` only for the
    /// synthetic root of a [`ParseTree`].
    pub fn node(&self) -> Option<Node> {
        self.inner.borrow().node.clone()
    }

    /// Did the grammar node match here? In-flight tree nodes report
    /// `false` until their match is recorded.
    pub fn matches(&self) -> bool {
        self.inner.borrow().matched
    }

    /// The tokens consumed by this match.
    pub fn tokens(&self) -> Vec<String> {
        self.inner.borrow().tokens.clone()
    }

    /// Number of tokens consumed by this match.
    pub fn len(&self) -> usize {
        self.inner.borrow().tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn child_count(&self) -> usize {
        self.inner.borrow().children.len()
    }

    pub fn child_at(&self, i: usize) -> Option<ParseNode> {
        self.inner.borrow().children.get(i).cloned()
    }

    pub fn children(&self) -> Vec<ParseNode> {
        self.inner.borrow().children.clone()
    }

    pub fn first_child(&self) -> Option<ParseNode> {
        self.child_at(0)
    }

    pub fn last_child(&self) -> Option<ParseNode> {
        let data = self.inner.borrow();
        data.children.last().cloned()
    }

    pub fn parent(&self) -> Option<ParseNode> {
        self.inner
            .borrow()
            .parent
            .upgrade()
            .map(|inner| ParseNode { inner })
    }

    /// Climb parent links to the root of the tree.
    pub fn root(&self) -> ParseNode {
        let mut cur = self.clone();
        while let Some(parent) = cur.parent() {
            cur = parent;
        }
        cur
    }

    /// Depth-first search, starting at this tree node, for a match
    /// produced by a grammar node with the given identifier.
    pub fn find_first(&self, id: &str) -> Option<ParseNode> {
        if let Some(node) = self.node() {
            if node.id().as_deref() == Some(id) {
                return Some(self.clone());
            }
        }
        for child in self.children() {
            if let Some(found) = child.find_first(id) {
                return Some(found);
            }
        }
        None
    }

    pub(crate) fn same(&self, other: &ParseNode) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    pub(crate) fn set_match(&self, tokens: &[String]) {
        let mut data = self.inner.borrow_mut();
        data.tokens = tokens.to_vec();
        data.matched = true;
    }

    pub(crate) fn link_child(&self, child: ParseNode) {
        child.inner.borrow_mut().parent = Rc::downgrade(&self.inner);
        self.inner.borrow_mut().children.push(child);
    }

    pub(crate) fn unlink_child(&self, child: &ParseNode) {
        let mut data = self.inner.borrow_mut();
        if let Some(pos) = data.children.iter().position(|c| c.same(child)) {
            let removed = data.children.remove(pos);
            removed.inner.borrow_mut().parent = Weak::new();
        }
    }

    /// Drop every linked child. Used by all-or-nothing nodes when a
    /// later element refuses after earlier ones matched.
    pub(crate) fn clear_children(&self) {
        let children = std::mem::take(&mut self.inner.borrow_mut().children);
        for child in children {
            child.inner.borrow_mut().parent = Weak::new();
        }
    }

    /// Remove and return the most recently linked child, if any. Used by
    /// completion look-ahead to roll tentative matches back.
    pub(crate) fn del_last_child(&self) -> Option<ParseNode> {
        let removed = self.inner.borrow_mut().children.pop();
        if let Some(child) = &removed {
            child.inner.borrow_mut().parent = Weak::new();
        }
        removed
    }

    /// Count the matches produced by `node` in this subtree, comparing
    /// grammar nodes by identity.
    pub(crate) fn count_occurrences(&self, node: &Node) -> usize {
        let mut count = usize::from(self.node().is_some_and(|n| n.same(node)));
        for child in self.children() {
            count += child.count_occurrences(node);
        }
        count
    }

    pub(crate) fn limits(&self) -> Rc<Cell<LimitTracker>> {
        self.inner.borrow().limits.clone()
    }

    /// Deep-clone the whole tree this node belongs to, returning the
    /// clone that corresponds to `self`. Completion groups use this to
    /// snapshot the parse state they were produced under.
    pub(crate) fn duplicate(&self) -> ParseNode {
        let mut path = Vec::new();
        let mut cur = self.clone();
        while let Some(parent) = cur.parent() {
            let pos = parent
                .inner
                .borrow()
                .children
                .iter()
                .position(|c| c.same(&cur));
            match pos {
                Some(pos) => path.push(pos),
                None => break,
            }
            cur = parent;
        }
        path.reverse();

        let mut clone = cur.deep_clone();
        for pos in path {
            let child = clone.child_at(pos);
            match child {
                Some(child) => clone = child,
                None => break,
            }
        }
        clone
    }

    fn deep_clone(&self) -> ParseNode {
        let data = self.inner.borrow();
        let clone = ParseNode {
            inner: Rc::new(RefCell::new(PNodeData {
                node: data.node.clone(),
                tokens: data.tokens.clone(),
                matched: data.matched,
                children: Vec::new(),
                parent: Weak::new(),
                limits: Rc::new(Cell::new(data.limits.get())),
            })),
        };
        for child in &data.children {
            clone.link_child(child.deep_clone());
        }
        clone
    }

    /// Render this subtree as an indented listing.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        self.dump_inner(&mut out, 0);
        out
    }

    fn dump_inner(&self, out: &mut String, depth: usize) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        match self.node() {
            Some(node) => {
                let _ = write!(out, "{}", node.type_name());
                if let Some(id) = node.id() {
                    let _ = write!(out, " id={id}");
                }
            }
            None => out.push_str("<root>"),
        }
        let data = self.inner.borrow();
        if data.matched {
            let _ = write!(out, " {:?}", data.tokens);
        } else {
            out.push_str(" (no match)");
        }
        out.push('\n');
        for child in &data.children {
            child.dump_inner(out, depth + 1);
        }
    }
}

impl fmt::Debug for ParseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dump().trim_end())
    }
}

/// The result of a top-level parse: the tree plus the overall outcome.
pub struct ParseTree {
    root: ParseNode,
    result: ParseResult,
}

impl ParseTree {
    /// The overall outcome.
    pub fn result(&self) -> ParseResult {
        self.result
    }

    pub fn matches(&self) -> bool {
        self.result.is_match()
    }

    /// Number of tokens consumed, or `None` on refusal.
    pub fn matched_len(&self) -> Option<usize> {
        self.result.len()
    }

    /// The synthetic root holding the matched tree.
    pub fn root(&self) -> ParseNode {
        self.root.clone()
    }

    /// The tree node of the parsed grammar, when the parse matched.
    pub fn first(&self) -> Option<ParseNode> {
        self.root.first_child()
    }

    /// Search the tree for a match produced by the grammar node with the
    /// given identifier.
    pub fn find_first(&self, id: &str) -> Option<ParseNode> {
        self.first().and_then(|node| node.find_first(id))
    }

    /// Recursion usage observed while parsing.
    pub fn recursion(&self) -> LimitTracker {
        self.root.limits().get()
    }

    pub fn dump(&self) -> String {
        match self.first() {
            Some(first) => first.dump(),
            None => "no match\n".to_string(),
        }
    }
}

impl fmt::Debug for ParseTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dump().trim_end())
    }
}

/// The parse protocol entry point used by compound nodes.
///
/// Allocates the child tree node, links it under `parent`, and invokes
/// the type's parse function. On a match, the consumed slice is recorded
/// and the child stays linked; on refusal or error the child is unlinked
/// and dropped, leaving `parent` untouched. Custom node types call this
/// to parse their children.
pub fn parse_child(
    node: &Node,
    parent: &ParseNode,
    tokens: &[String],
) -> Result<ParseResult, GrammarError> {
    let limits = parent.limits();
    let mut tracker = limits.get();
    tracker.consume();
    limits.set(tracker);
    if tracker.limited() {
        let mut tracker = limits.get();
        tracker.release();
        limits.set(tracker);
        return Err(GrammarError::RecursionLimit(tracker.limit));
    }

    let child = ParseNode::new_child(node, parent);
    parent.link_child(child.clone());

    let outcome = match node.invoke_parse(&child, tokens) {
        Ok(ParseResult::Match(n)) if n <= tokens.len() => {
            child.set_match(&tokens[..n]);
            Ok(ParseResult::Match(n))
        }
        Ok(ParseResult::Match(_)) => {
            parent.unlink_child(&child);
            Err(GrammarError::InvalidArgument(
                "node consumed more tokens than available",
            ))
        }
        Ok(ParseResult::NoMatch) => {
            parent.unlink_child(&child);
            Ok(ParseResult::NoMatch)
        }
        Err(err) => {
            parent.unlink_child(&child);
            Err(err)
        }
    };

    let mut tracker = limits.get();
    tracker.release();
    limits.set(tracker);

    outcome
}

pub(crate) fn parse_tokens(
    node: &Node,
    tokens: &[String],
    limit: usize,
) -> Result<ParseTree, GrammarError> {
    log::debug!("parse {:?} with {} token(s)", node, tokens.len());
    let root = ParseNode::new_root(limit);
    let result = parse_child(node, &root, tokens)?;
    Ok(ParseTree { root, result })
}

#[cfg(test)]
mod tests {
    use expect_test::expect;

    use crate::nodes::{literal, none, option, seq};
    use crate::ParseResult;

    #[test]
    fn dump_shows_the_consumed_slices() {
        let grammar = seq([
            literal("foo").with_id("head"),
            option(literal("toto")),
            literal("bar"),
        ]);
        let tree = grammar.parse(&["foo", "toto", "bar"]).expect("parse");
        expect![[r#"
            seq ["foo", "toto", "bar"]
              str id=head ["foo"]
              option ["toto"]
                str ["toto"]
              str ["bar"]
        "#]]
        .assert_eq(&tree.dump());
    }

    #[test]
    fn no_match_is_not_an_empty_match() {
        let tree = none().parse(&["x"]).expect("parse");
        assert_eq!(tree.result(), ParseResult::NoMatch);
        assert_eq!(tree.matched_len(), None);

        let tree = option(literal("foo")).parse(&["x"]).expect("parse");
        assert_eq!(tree.result(), ParseResult::Match(0));
        assert_eq!(tree.matched_len(), Some(0));
    }

    #[test]
    fn find_first_searches_by_identifier() {
        let grammar = seq([literal("foo"), literal("bar").with_id("tail")]);
        let tree = grammar.parse(&["foo", "bar"]).expect("parse");
        let found = tree.find_first("tail").expect("a match with this id");
        assert_eq!(found.tokens(), ["bar"]);
        assert!(tree.find_first("missing").is_none());
    }

    #[test]
    fn parent_links_climb_to_the_root() {
        let grammar = seq([literal("foo")]);
        let tree = grammar.parse(&["foo"]).expect("parse");
        let leaf = tree
            .first()
            .and_then(|seq| seq.first_child())
            .expect("leaf parse node");
        let root = leaf.root();
        assert!(root.same(&tree.root()));
    }

    #[test]
    fn duplicate_clones_the_whole_tree_and_keeps_the_position() {
        let grammar = seq([literal("foo"), literal("bar")]);
        let tree = grammar.parse(&["foo", "bar"]).expect("parse");
        let leaf = tree
            .first()
            .and_then(|seq| seq.child_at(1))
            .expect("second leaf");

        let copy = leaf.duplicate();
        assert!(!copy.same(&leaf));
        assert_eq!(copy.tokens(), ["bar"]);
        assert_eq!(copy.root().dump(), leaf.root().dump());
    }

    #[test]
    fn recursion_usage_is_reported() {
        let grammar = seq([literal("foo")]);
        let tree = grammar.parse(&["foo"]).expect("parse");
        assert!(tree.recursion().high >= 2);
        assert!(!tree.recursion().limited());
    }
}

impl Node {
    /// Parse a token vector against this grammar.
    pub fn parse<S: AsRef<str>>(&self, tokens: &[S]) -> Result<ParseTree, GrammarError> {
        self.parse_with_limit(tokens, DEFAULT_RECURSION_LIMIT)
    }

    /// Like [`Node::parse`], with an explicit recursion limit.
    pub fn parse_with_limit<S: AsRef<str>>(
        &self,
        tokens: &[S],
        limit: usize,
    ) -> Result<ParseTree, GrammarError> {
        let tokens: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
        parse_tokens(self, &tokens, limit)
    }

    /// Parse a whole command line as a single token. This is the entry
    /// point for grammars rooted in a lexer node.
    pub fn parse_line(&self, line: &str) -> Result<ParseTree, GrammarError> {
        self.parse(&[line])
    }
}
