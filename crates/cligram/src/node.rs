//! The grammar node: a shared, polymorphic parser unit.
//!
//! A [`Node`] is a cheap-to-clone handle; cloning shares the underlying
//! node, and the node is destroyed when the last handle is dropped. Each
//! node carries a static [`NodeType`] descriptor identifying its variant,
//! an optional identifier, descriptive attributes, an optional applied
//! configuration, and the type-private state implementing the parse and
//! complete operations.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::fmt::Write as _;
use std::rc::Rc;

use indexmap::IndexMap;

use crate::complete::Completions;
use crate::config::{self, ConfigValue, Schema};
use crate::error::GrammarError;
use crate::parse::{ParseNode, ParseResult};

/// A static descriptor identifying a node variant.
///
/// The descriptor carries the type name (unique in the registry), the
/// configuration schema, and the constructor for the type-private state.
/// Polymorphism stays a tagged interface: there is exactly one descriptor
/// per variant, and nodes point at it.
pub struct NodeType {
    /// Unique name of the variant, e.g. `"seq"` or `"str"`.
    pub name: &'static str,
    /// Schema of the configuration dict accepted by this variant. Empty
    /// means the variant is not configurable through [`Node::set_config`].
    pub schema: &'static Schema,
    /// Constructor for the type-private state.
    pub new_ops: fn() -> Box<dyn NodeOps>,
}

impl fmt::Debug for NodeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NodeType").field("name", &self.name).finish()
    }
}

/// The operations of a node variant, implemented on its private state.
///
/// `parse` and `complete` follow the protocols described at the crate
/// root: `parse` consumes leading tokens or refuses, `complete` appends
/// candidate items to the container. `set_config` rebuilds the private
/// state from a validated configuration; if it fails, the previous state
/// must be left intact.
pub trait NodeOps: Any {
    fn parse(
        &self,
        node: &Node,
        state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError>;

    fn complete(
        &self,
        node: &Node,
        comp: &mut Completions,
        tokens: &[String],
    ) -> Result<(), GrammarError> {
        crate::complete::complete_unknown(node, comp, tokens)
    }

    fn set_config(&mut self, _config: &ConfigValue) -> Result<(), GrammarError> {
        Err(GrammarError::InvalidArgument(
            "this node type takes no configuration",
        ))
    }

    /// The children held by this node, in order. Generic traversal (dump,
    /// find, cycle checks) relies on this and must work for every type.
    fn children(&self) -> Vec<Node> {
        Vec::new()
    }

    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

struct NodeInner {
    kind: &'static NodeType,
    id: RefCell<Option<String>>,
    desc: RefCell<Option<String>>,
    attrs: RefCell<IndexMap<String, String>>,
    config: RefCell<Option<ConfigValue>>,
    ops: RefCell<Box<dyn NodeOps>>,
}

/// A shared handle to a grammar node.
#[derive(Clone)]
pub struct Node {
    inner: Rc<NodeInner>,
}

impl Node {
    /// Create an uninitialized node of the given type, with no identifier.
    pub fn from_type(kind: &'static NodeType) -> Node {
        Node {
            inner: Rc::new(NodeInner {
                kind,
                id: RefCell::new(None),
                desc: RefCell::new(None),
                attrs: RefCell::new(IndexMap::new()),
                config: RefCell::new(None),
                ops: RefCell::new((kind.new_ops)()),
            }),
        }
    }

    /// Create an uninitialized node by registered type name.
    pub fn from_type_name(name: &str) -> Result<Node, GrammarError> {
        let kind = crate::registry::lookup(name)
            .ok_or_else(|| GrammarError::UnknownNodeType(name.to_string()))?;
        Ok(Node::from_type(kind))
    }

    /// Set the node identifier, builder style.
    pub fn with_id(self, id: impl Into<String>) -> Node {
        *self.inner.id.borrow_mut() = Some(id.into());
        self
    }

    /// Set the node description, builder style.
    pub fn with_desc(self, desc: impl Into<String>) -> Node {
        *self.inner.desc.borrow_mut() = Some(desc.into());
        self
    }

    /// The type descriptor of this node.
    pub fn node_type(&self) -> &'static NodeType {
        self.inner.kind
    }

    /// The type name of this node, e.g. `"seq"`.
    pub fn type_name(&self) -> &'static str {
        self.inner.kind.name
    }

    /// The identifier, or `None` for an anonymous node.
    pub fn id(&self) -> Option<String> {
        self.inner.id.borrow().clone()
    }

    /// The description, falling back to the type name.
    pub fn desc(&self) -> String {
        self.inner
            .desc
            .borrow()
            .clone()
            .unwrap_or_else(|| self.type_name().to_string())
    }

    /// Read an attribute.
    pub fn attr(&self, key: &str) -> Option<String> {
        self.inner.attrs.borrow().get(key).cloned()
    }

    /// Set an attribute, keeping insertion order.
    pub fn set_attr(&self, key: impl Into<String>, value: impl Into<String>) {
        self.inner.attrs.borrow_mut().insert(key.into(), value.into());
    }

    /// All attributes, in insertion order.
    pub fn attrs(&self) -> IndexMap<String, String> {
        self.inner.attrs.borrow().clone()
    }

    /// Identity comparison: do both handles designate the same node?
    pub fn same(&self, other: &Node) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// The applied configuration, if any.
    pub fn config(&self) -> Option<ConfigValue> {
        self.inner.config.borrow().clone()
    }

    /// Validate `config` against the type schema and apply it.
    ///
    /// The private state is rebuilt atomically: on any failure the node
    /// keeps its previous configuration and state. A configuration that
    /// directly references the node itself is refused; cycles must be
    /// expressed through a `bypass` node.
    pub fn set_config(&self, config: ConfigValue) -> Result<(), GrammarError> {
        if self.inner.kind.schema.is_empty() {
            return Err(GrammarError::InvalidArgument(
                "this node type takes no configuration",
            ));
        }
        config::validate(self.inner.kind.schema, &config)?;
        if config.references(self) {
            return Err(GrammarError::SelfReference);
        }
        self.inner.ops.borrow_mut().set_config(&config)?;
        *self.inner.config.borrow_mut() = Some(config);
        Ok(())
    }

    /// Number of children held by this node.
    pub fn children_count(&self) -> usize {
        self.inner.ops.borrow().children().len()
    }

    /// The `i`th child, if any.
    pub fn child_at(&self, i: usize) -> Option<Node> {
        self.inner.ops.borrow().children().get(i).cloned()
    }

    /// All children, in order.
    pub fn children(&self) -> Vec<Node> {
        self.inner.ops.borrow().children()
    }

    /// Depth-first search for a node with the given identifier, starting
    /// at (and including) this node. Cycles are not re-entered.
    pub fn find(&self, id: &str) -> Option<Node> {
        let mut seen = Vec::new();
        self.find_inner(id, &mut seen)
    }

    fn find_inner(&self, id: &str, seen: &mut Vec<*const ()>) -> Option<Node> {
        let ptr = Rc::as_ptr(&self.inner) as *const ();
        if seen.contains(&ptr) {
            return None;
        }
        seen.push(ptr);

        if self.id().as_deref() == Some(id) {
            return Some(self.clone());
        }
        for child in self.children() {
            if let Some(found) = child.find_inner(id, seen) {
                return Some(found);
            }
        }
        None
    }

    /// Render the node tree as an indented listing, one node per line.
    /// Nodes already printed are marked as back edges and not re-entered.
    pub fn dump(&self) -> String {
        let mut out = String::new();
        let mut seen = Vec::new();
        self.dump_inner(&mut out, 0, &mut seen);
        out
    }

    fn dump_inner(&self, out: &mut String, depth: usize, seen: &mut Vec<*const ()>) {
        for _ in 0..depth {
            out.push_str("  ");
        }
        let _ = write!(out, "{}", self.type_name());
        if let Some(id) = self.id() {
            let _ = write!(out, " id={id}");
        }
        let ptr = Rc::as_ptr(&self.inner) as *const ();
        if seen.contains(&ptr) {
            out.push_str(" (back edge)\n");
            return;
        }
        seen.push(ptr);
        out.push('\n');
        for child in self.children() {
            child.dump_inner(out, depth + 1, seen);
        }
    }

    /// Run a closure against the private state, downcast to `T`.
    ///
    /// Fails with an invalid-argument error when the node is not of the
    /// expected type — the contract check behind every type-specific
    /// helper.
    pub(crate) fn with_ops<T, R>(
        &self,
        f: impl FnOnce(&T) -> R,
    ) -> Result<R, GrammarError>
    where
        T: NodeOps,
    {
        let ops = self.inner.ops.borrow();
        let ops = ops
            .as_any()
            .downcast_ref::<T>()
            .ok_or(GrammarError::InvalidArgument("wrong node type"))?;
        Ok(f(ops))
    }

    /// Mutable variant of [`Node::with_ops`].
    pub(crate) fn with_ops_mut<T, R>(
        &self,
        f: impl FnOnce(&mut T) -> R,
    ) -> Result<R, GrammarError>
    where
        T: NodeOps,
    {
        let mut ops = self.inner.ops.borrow_mut();
        let ops = ops
            .as_any_mut()
            .downcast_mut::<T>()
            .ok_or(GrammarError::InvalidArgument("wrong node type"))?;
        Ok(f(ops))
    }

    /// Dispatch the parse operation of this node's type.
    pub(crate) fn invoke_parse(
        &self,
        state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        self.inner.ops.borrow().parse(self, state, tokens)
    }

    /// Dispatch the complete operation of this node's type.
    pub(crate) fn invoke_complete(
        &self,
        comp: &mut Completions,
        tokens: &[String],
    ) -> Result<(), GrammarError> {
        self.inner.ops.borrow().complete(self, comp, tokens)
    }
}

/// A non-owning handle to a node.
///
/// This is how a `bypass` node holds its child: the reference is not
/// traversed when ownership is released, so cyclic grammars can be torn
/// down. The enclosing grammar keeps the child alive.
#[derive(Clone)]
pub struct WeakNode {
    inner: std::rc::Weak<NodeInner>,
}

impl WeakNode {
    pub fn upgrade(&self) -> Option<Node> {
        self.inner.upgrade().map(|inner| Node { inner })
    }
}

impl Node {
    /// Downgrade to a non-owning handle.
    pub fn downgrade(&self) -> WeakNode {
        WeakNode {
            inner: Rc::downgrade(&self.inner),
        }
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node({}", self.type_name())?;
        if let Some(id) = self.id() {
            write!(f, ", id={id:?}")?;
        }
        write!(f, ")")
    }
}

#[cfg(test)]
mod tests {
    use crate::nodes::{alt, literal, seq};

    #[test]
    fn identity_is_per_node() {
        let a = literal("foo");
        let b = literal("foo");
        let a2 = a.clone();
        assert!(a.same(&a2));
        assert!(!a.same(&b));
    }

    #[test]
    fn find_locates_nested_ids() {
        let g = seq([
            literal("foo").with_id("head"),
            alt([literal("a").with_id("left"), literal("b")]),
        ]);
        assert!(g.find("head").is_some());
        assert!(g.find("left").is_some());
        assert!(g.find("missing").is_none());
    }

    #[test]
    fn dump_lists_the_tree() {
        let g = seq([literal("foo"), literal("bar").with_id("tail")]);
        let dump = g.dump();
        assert!(dump.starts_with("seq\n"));
        assert!(dump.contains("  str\n"));
        assert!(dump.contains("  str id=tail\n"));
    }

    #[test]
    fn attributes_keep_insertion_order() {
        let n = literal("foo");
        n.set_attr("help", "the foo token");
        n.set_attr("tag", "demo");
        let keys: Vec<_> = n.attrs().keys().cloned().collect();
        assert_eq!(keys, ["help", "tag"]);
    }
}
