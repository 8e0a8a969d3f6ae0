//! Completion: given a possibly-partial input, what can come next?
//!
//! A complete invocation fills a [`Completions`] container with candidate
//! [`CompItem`]s. Items are grouped by the node context that produced
//! them: the container threads the current tentative parse state and the
//! current group across the recursion, and every [`complete_child`] call
//! opens a fresh group scope so a node's own candidates never mix with
//! its children's.

use std::cell::Cell;
use std::fmt;
use std::fmt::Write as _;
use std::ops::BitOr;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::error::GrammarError;
use crate::limit::{LimitTracker, DEFAULT_RECURSION_LIMIT};
use crate::node::Node;
use crate::parse::ParseNode;

/// The kind of a completion candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompKind {
    /// A complete replacement token is known.
    Full,
    /// A known prefix of a longer token, e.g. a directory component.
    Partial,
    /// The node can consume a token here but cannot enumerate options.
    Unknown,
}

impl CompKind {
    fn bit(self) -> u8 {
        match self {
            CompKind::Full => 1,
            CompKind::Partial => 2,
            CompKind::Unknown => 4,
        }
    }
}

/// A set of completion kinds, used to filter iteration and counting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompMask(u8);

impl CompMask {
    pub const FULL: CompMask = CompMask(1);
    pub const PARTIAL: CompMask = CompMask(2);
    pub const UNKNOWN: CompMask = CompMask(4);
    pub const ALL: CompMask = CompMask(7);

    pub fn contains(self, kind: CompKind) -> bool {
        self.0 & kind.bit() != 0
    }
}

impl BitOr for CompMask {
    type Output = CompMask;

    fn bitor(self, rhs: CompMask) -> CompMask {
        CompMask(self.0 | rhs.0)
    }
}

impl From<CompKind> for CompMask {
    fn from(kind: CompKind) -> CompMask {
        CompMask(kind.bit())
    }
}

/// One completion candidate.
#[derive(Debug, Clone)]
pub struct CompItem {
    kind: CompKind,
    node: Node,
    start: Option<String>,
    full: Option<String>,
    completion: Option<String>,
    display: Option<String>,
    attrs: IndexMap<String, String>,
}

impl CompItem {
    fn new(
        kind: CompKind,
        node: &Node,
        start: Option<&str>,
        full: Option<&str>,
    ) -> Result<CompItem, GrammarError> {
        if kind == CompKind::Unknown && full.is_some() {
            return Err(GrammarError::InvalidArgument(
                "unknown completions carry no full token",
            ));
        }
        if kind != CompKind::Unknown && full.is_none() {
            return Err(GrammarError::InvalidArgument(
                "full and partial completions need a full token",
            ));
        }

        // The completion tail only exists when the full token extends
        // what was typed.
        let completion = match (start, full) {
            (Some(start), Some(full)) => full.strip_prefix(start).map(str::to_string),
            _ => None,
        };

        Ok(CompItem {
            kind,
            node: node.clone(),
            start: start.map(str::to_string),
            full: full.map(str::to_string),
            completion,
            display: full.map(str::to_string),
            attrs: IndexMap::new(),
        })
    }

    pub fn kind(&self) -> CompKind {
        self.kind
    }

    /// The grammar node this candidate originates from.
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// The partial token as seen in the input.
    pub fn start(&self) -> Option<&str> {
        self.start.as_deref()
    }

    /// The full replacement token. Absent for unknown candidates.
    pub fn full(&self) -> Option<&str> {
        self.full.as_deref()
    }

    /// The characters to append to the typed token, when the full token
    /// extends it.
    pub fn completion(&self) -> Option<&str> {
        self.completion.as_deref()
    }

    /// What a completer should display; defaults to the full token.
    pub fn display(&self) -> Option<&str> {
        self.display.as_deref()
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(key.into(), value.into());
    }

    pub fn set_display(&mut self, display: impl Into<String>) -> Result<(), GrammarError> {
        if self.kind == CompKind::Unknown {
            return Err(GrammarError::InvalidArgument(
                "unknown completions have no display",
            ));
        }
        self.display = Some(display.into());
        Ok(())
    }

    pub fn set_full(&mut self, full: impl Into<String>) -> Result<(), GrammarError> {
        if self.kind == CompKind::Unknown {
            return Err(GrammarError::InvalidArgument(
                "unknown completions have no full token",
            ));
        }
        self.full = Some(full.into());
        Ok(())
    }

    pub fn set_completion(&mut self, completion: impl Into<String>) -> Result<(), GrammarError> {
        if self.kind == CompKind::Unknown {
            return Err(GrammarError::InvalidArgument(
                "unknown completions have no completion tail",
            ));
        }
        self.completion = Some(completion.into());
        Ok(())
    }
}

/// A set of candidates sharing a producing context: the grammar node and
/// the parse state at the moment the group was opened.
pub struct CompGroup {
    node: Node,
    state: Option<ParseNode>,
    items: Vec<CompItem>,
    attrs: IndexMap<String, String>,
}

impl CompGroup {
    pub fn node(&self) -> &Node {
        &self.node
    }

    /// Snapshot of the parse state the group was created under.
    pub fn state(&self) -> Option<&ParseNode> {
        self.state.as_ref()
    }

    pub fn items(&self) -> &[CompItem] {
        &self.items
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(key.into(), value.into());
    }
}

/// The completion container.
pub struct Completions {
    groups: Vec<CompGroup>,
    count_full: usize,
    count_partial: usize,
    count_unknown: usize,
    cur_state: Option<ParseNode>,
    cur_group: Option<usize>,
    limits: Rc<Cell<LimitTracker>>,
    attrs: IndexMap<String, String>,
}

impl Completions {
    pub(crate) fn new(limit: usize) -> Completions {
        Completions {
            groups: Vec::new(),
            count_full: 0,
            count_partial: 0,
            count_unknown: 0,
            cur_state: None,
            cur_group: None,
            limits: Rc::new(Cell::new(LimitTracker::new(limit))),
            attrs: IndexMap::new(),
        }
    }

    /// Number of candidates matching the mask. O(1).
    pub fn count(&self, mask: CompMask) -> usize {
        let mut count = 0;
        if mask.contains(CompKind::Full) {
            count += self.count_full;
        }
        if mask.contains(CompKind::Partial) {
            count += self.count_partial;
        }
        if mask.contains(CompKind::Unknown) {
            count += self.count_unknown;
        }
        count
    }

    /// Iterate candidates matching the mask, preserving group insertion
    /// order and item insertion order within each group.
    pub fn iter(&self, mask: CompMask) -> impl Iterator<Item = &CompItem> + '_ {
        self.groups
            .iter()
            .flat_map(|group| group.items.iter())
            .filter(move |item| mask.contains(item.kind))
    }

    /// The groups, in insertion order.
    pub fn groups(&self) -> &[CompGroup] {
        &self.groups
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.get(key).map(String::as_str)
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attrs.insert(key.into(), value.into());
    }

    /// Append a candidate produced by `node`, opening a new group under
    /// the current parse state if none is open.
    pub fn add_item(
        &mut self,
        node: &Node,
        kind: CompKind,
        start: Option<&str>,
        full: Option<&str>,
    ) -> Result<&mut CompItem, GrammarError> {
        let item = CompItem::new(kind, node, start, full)?;

        match kind {
            CompKind::Full => self.count_full += 1,
            CompKind::Partial => self.count_partial += 1,
            CompKind::Unknown => self.count_unknown += 1,
        }

        let group_index = match self.cur_group {
            Some(index) => index,
            None => {
                let group = CompGroup {
                    node: node.clone(),
                    state: self.cur_state.as_ref().map(ParseNode::duplicate),
                    items: Vec::new(),
                    attrs: IndexMap::new(),
                };
                self.groups.push(group);
                let index = self.groups.len() - 1;
                self.cur_group = Some(index);
                index
            }
        };

        let group = &mut self.groups[group_index];
        group.items.push(item);
        Ok(group
            .items
            .last_mut()
            .unwrap_or_else(|| unreachable!("an item was just pushed")))
    }

    /// The tentative parse state threaded by [`complete_child`]. Node
    /// complete functions use it to try matches ahead of the completion
    /// point.
    pub fn parse_state(&self) -> ParseNode {
        self.cur_state
            .clone()
            .expect("completion always runs under a parse state")
    }

    /// Watermark for [`Completions::items_since`]: the current number of
    /// groups.
    pub(crate) fn group_watermark(&self) -> usize {
        self.groups.len()
    }

    /// Mutable access to all items added after a watermark. New items can
    /// only land in groups opened after it, because every child scope
    /// starts a fresh group.
    pub(crate) fn items_since(
        &mut self,
        watermark: usize,
    ) -> impl Iterator<Item = &mut CompItem> + '_ {
        self.groups[watermark..]
            .iter_mut()
            .flat_map(|group| group.items.iter_mut())
    }

    fn limits(&self) -> Rc<Cell<LimitTracker>> {
        self.limits.clone()
    }

    /// Recursion usage observed while completing.
    pub fn recursion(&self) -> LimitTracker {
        self.limits.get()
    }

    pub fn dump(&self) -> String {
        let mut out = String::new();
        if self.count(CompMask::ALL) == 0 {
            out.push_str("no completion\n");
            return out;
        }
        let _ = writeln!(
            out,
            "completion: count={} full={} partial={} unknown={}",
            self.count(CompMask::ALL),
            self.count_full,
            self.count_partial,
            self.count_unknown,
        );
        for group in &self.groups {
            let _ = write!(out, "node_type={}", group.node.type_name());
            if let Some(id) = group.node.id() {
                let _ = write!(out, " id={id}");
            }
            out.push('\n');
            for item in &group.items {
                let kind = match item.kind {
                    CompKind::Full => "full",
                    CompKind::Partial => "partial",
                    CompKind::Unknown => "unknown",
                };
                let _ = writeln!(
                    out,
                    "  type={} str=<{}> comp=<{}> disp=<{}>",
                    kind,
                    item.full().unwrap_or(""),
                    item.completion().unwrap_or(""),
                    item.display().unwrap_or(""),
                );
            }
        }
        out
    }
}

impl fmt::Debug for Completions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dump().trim_end())
    }
}

/// The completion protocol entry point used by compound nodes.
///
/// Saves the current parse state and group, prepares a child state linked
/// under the current one, invokes the type's complete function, then
/// restores the previous context. Tentative matches made by the child
/// must have been rolled back by the time it returns. Custom node
/// types call this to complete their children.
pub fn complete_child(
    node: &Node,
    comp: &mut Completions,
    tokens: &[String],
) -> Result<(), GrammarError> {
    let limits = comp.limits();
    let mut tracker = limits.get();
    tracker.consume();
    limits.set(tracker);
    if tracker.limited() {
        let mut tracker = limits.get();
        tracker.release();
        limits.set(tracker);
        return Err(GrammarError::RecursionLimit(tracker.limit));
    }

    let parent = comp.cur_state.clone();
    let child = ParseNode::new_detached(node, comp.limits());
    if let Some(parent) = &parent {
        parent.link_child(child.clone());
    }
    let saved_group = comp.cur_group.take();
    comp.cur_state = Some(child.clone());

    let outcome = node.invoke_complete(comp, tokens);

    if let Some(parent) = &parent {
        parent.unlink_child(&child);
    }
    debug_assert!(
        child.child_count() == 0,
        "a complete function left a tentative match linked"
    );
    comp.cur_state = parent;
    comp.cur_group = saved_group;

    let mut tracker = limits.get();
    tracker.release();
    limits.set(tracker);

    outcome
}

/// The generic completion for nodes that can consume a token here but
/// cannot enumerate candidates: one unknown item when a single token is
/// being completed, nothing otherwise.
pub fn complete_unknown(
    node: &Node,
    comp: &mut Completions,
    tokens: &[String],
) -> Result<(), GrammarError> {
    if tokens.len() != 1 {
        return Ok(());
    }
    comp.add_item(node, CompKind::Unknown, None, None)?;
    Ok(())
}

pub(crate) fn complete_tokens(
    node: &Node,
    tokens: &[String],
    limit: usize,
) -> Result<Completions, GrammarError> {
    log::debug!("complete {:?} with {} token(s)", node, tokens.len());
    let mut comp = Completions::new(limit);
    complete_child(node, &mut comp, tokens)?;
    Ok(comp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::{alt, int, literal};

    #[test]
    fn counters_match_iteration() {
        let grammar = alt([
            literal("foo"),
            literal("freeze"),
            int(0, 10, 10).expect("int node"),
        ]);
        let comp = grammar.complete(&["f"]).expect("complete");
        assert_eq!(comp.count(CompMask::FULL), 2);
        assert_eq!(comp.count(CompMask::UNKNOWN), 1);
        assert_eq!(comp.count(CompMask::ALL), 3);
        assert_eq!(comp.iter(CompMask::FULL).count(), 2);
        assert_eq!(comp.iter(CompMask::FULL | CompMask::UNKNOWN).count(), 3);
    }

    #[test]
    fn groups_remember_their_producing_node() {
        let grammar = alt([
            literal("xx").with_id("id_x"),
            literal("yy").with_id("id_y"),
        ]);
        let comp = grammar.complete(&[""]).expect("complete");
        let ids: Vec<_> = comp
            .groups()
            .iter()
            .filter_map(|group| group.node().id())
            .collect();
        assert_eq!(ids, ["id_x", "id_y"]);

        let nodes: Vec<_> = comp
            .iter(CompMask::ALL)
            .filter_map(|item| item.node().id())
            .collect();
        assert_eq!(nodes, ["id_x", "id_y"]);
    }

    #[test]
    fn groups_snapshot_the_parse_state() {
        let grammar = alt([literal("xx")]);
        let comp = grammar.complete(&["x"]).expect("complete");
        let group = &comp.groups()[0];
        let state = group.state().expect("a parse state snapshot");
        // The snapshot chain leads from the item's node up to the root
        // grammar node.
        let root = state.root();
        assert!(root
            .node()
            .is_some_and(|node| node.type_name() == "or"));
    }

    #[test]
    fn unknown_items_carry_no_full_token() {
        let node = literal("x");
        let mut comp = Completions::new(16);
        assert!(comp
            .add_item(&node, CompKind::Unknown, None, Some("nope"))
            .is_err());
        assert!(comp.add_item(&node, CompKind::Full, None, None).is_err());
    }

    #[test]
    fn completion_tail_requires_a_matching_prefix() {
        let node = literal("x");
        let mut comp = Completions::new(16);
        let item = comp
            .add_item(&node, CompKind::Full, Some("ba"), Some("bar"))
            .expect("add item");
        assert_eq!(item.completion(), Some("r"));

        let item = comp
            .add_item(&node, CompKind::Full, Some("zz"), Some("bar"))
            .expect("add item");
        assert_eq!(item.completion(), None);
    }

    #[test]
    fn repeated_calls_are_idempotent() {
        let grammar = alt([literal("foo"), literal("bar")]);
        let first = grammar.complete(&["f"]).expect("complete").dump();
        let second = grammar.complete(&["f"]).expect("complete").dump();
        assert_eq!(first, second);
    }
}

impl Node {
    /// Compute the completions of a token vector against this grammar.
    pub fn complete<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Completions, GrammarError> {
        self.complete_with_limit(tokens, DEFAULT_RECURSION_LIMIT)
    }

    /// Like [`Node::complete`], with an explicit recursion limit.
    pub fn complete_with_limit<S: AsRef<str>>(
        &self,
        tokens: &[S],
        limit: usize,
    ) -> Result<Completions, GrammarError> {
        let tokens: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
        complete_tokens(self, &tokens, limit)
    }

    /// Complete a whole command line passed as a single token. This is
    /// the entry point for grammars rooted in a lexer node.
    pub fn complete_line(&self, line: &str) -> Result<Completions, GrammarError> {
        self.complete(&[line])
    }
}

/// Expand every token that is an unambiguous prefix of exactly one full
/// completion into that full token. Used by the shell lexer's expand
/// mode so abbreviated commands parse.
pub(crate) fn expand_tokens(
    node: &Node,
    tokens: &[String],
    limit: usize,
) -> Result<Vec<String>, GrammarError> {
    let mut expanded: Vec<String> = Vec::new();
    for token in tokens {
        let mut probe = expanded.clone();
        probe.push(token.clone());
        let comp = complete_tokens(node, &probe, limit)?;
        let mut fulls = comp.iter(CompMask::FULL);
        let replacement = match (fulls.next(), fulls.next()) {
            (Some(item), None) => item
                .full()
                .filter(|full| full.starts_with(token.as_str()))
                .map(str::to_string),
            _ => None,
        };
        expanded.push(replacement.unwrap_or_else(|| token.clone()));
    }
    Ok(expanded)
}
