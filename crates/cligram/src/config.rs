//! Structured node configuration and its schema language.
//!
//! Every configurable node type publishes a static [`Schema`]: an ordered
//! list of entries describing the keys it accepts. Applying a
//! configuration validates the value against that schema first, then hands
//! it to the type's rebuild hook; on any failure the node keeps its
//! previous state.

use indexmap::IndexMap;

use crate::error::GrammarError;
use crate::node::Node;

/// The type tag of a configuration value or schema entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigKind {
    Bool,
    I64,
    U64,
    String,
    Node,
    List,
    Dict,
}

/// A typed configuration value.
///
/// Configurations are trees: a node's configuration is a `Dict` whose
/// entries are validated against the node type's schema. `List` values
/// are homogeneous, described by a single-element subschema.
#[derive(Debug, Clone)]
pub enum ConfigValue {
    Bool(bool),
    I64(i64),
    U64(u64),
    String(String),
    Node(Node),
    List(Vec<ConfigValue>),
    Dict(IndexMap<String, ConfigValue>),
}

impl ConfigValue {
    pub fn kind(&self) -> ConfigKind {
        match self {
            ConfigValue::Bool(_) => ConfigKind::Bool,
            ConfigValue::I64(_) => ConfigKind::I64,
            ConfigValue::U64(_) => ConfigKind::U64,
            ConfigValue::String(_) => ConfigKind::String,
            ConfigValue::Node(_) => ConfigKind::Node,
            ConfigValue::List(_) => ConfigKind::List,
            ConfigValue::Dict(_) => ConfigKind::Dict,
        }
    }

    /// Build a `Dict` value from key/value pairs, keeping insertion order.
    pub fn dict<I>(entries: I) -> ConfigValue
    where
        I: IntoIterator<Item = (&'static str, ConfigValue)>,
    {
        ConfigValue::Dict(
            entries
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect(),
        )
    }

    /// Build a `List` of `Node` values from a collection of nodes.
    pub fn node_list<I>(children: I) -> ConfigValue
    where
        I: IntoIterator<Item = Node>,
    {
        ConfigValue::List(children.into_iter().map(ConfigValue::Node).collect())
    }

    /// Look up an entry of a `Dict` value.
    pub fn get(&self, key: &str) -> Option<&ConfigValue> {
        match self {
            ConfigValue::Dict(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            ConfigValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            ConfigValue::I64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_u64(&self) -> Option<u64> {
        match self {
            ConfigValue::U64(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_node(&self) -> Option<&Node> {
        match self {
            ConfigValue::Node(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[ConfigValue]> {
        match self {
            ConfigValue::List(items) => Some(items),
            _ => None,
        }
    }

    /// Collect the nodes of a `List`-of-`Node` entry into a table.
    pub(crate) fn node_table(&self) -> Result<Vec<Node>, GrammarError> {
        let items = self
            .as_list()
            .ok_or_else(|| GrammarError::config("expected a list of nodes"))?;
        items
            .iter()
            .map(|item| {
                item.as_node()
                    .cloned()
                    .ok_or_else(|| GrammarError::config("expected a node in the list"))
            })
            .collect()
    }

    /// Does this configuration reference `node` directly?
    ///
    /// Used to refuse straight self-loops when a configuration is applied:
    /// a cycle must go through a bypass node instead.
    pub(crate) fn references(&self, node: &Node) -> bool {
        match self {
            ConfigValue::Node(n) => n.same(node),
            ConfigValue::List(items) => items.iter().any(|item| item.references(node)),
            ConfigValue::Dict(map) => map.values().any(|item| item.references(node)),
            _ => false,
        }
    }
}

/// One entry of a node type's configuration schema.
///
/// `key` is `None` for the anonymous element schema of a `List` entry.
#[derive(Debug, Clone, Copy)]
pub struct SchemaEntry {
    pub key: Option<&'static str>,
    pub desc: &'static str,
    pub kind: ConfigKind,
    pub subschema: &'static [SchemaEntry],
    pub required: bool,
}

impl SchemaEntry {
    pub const fn new(key: &'static str, desc: &'static str, kind: ConfigKind) -> Self {
        SchemaEntry {
            key: Some(key),
            desc,
            kind,
            subschema: &[],
            required: false,
        }
    }

    pub const fn required(key: &'static str, desc: &'static str, kind: ConfigKind) -> Self {
        SchemaEntry {
            key: Some(key),
            desc,
            kind,
            subschema: &[],
            required: true,
        }
    }

    pub const fn list(
        key: &'static str,
        desc: &'static str,
        subschema: &'static [SchemaEntry],
    ) -> Self {
        SchemaEntry {
            key: Some(key),
            desc,
            kind: ConfigKind::List,
            subschema,
            required: false,
        }
    }

    pub const fn element(desc: &'static str, kind: ConfigKind) -> Self {
        SchemaEntry {
            key: None,
            desc,
            kind,
            subschema: &[],
            required: false,
        }
    }
}

/// An ordered list of schema entries describing a `Dict` configuration.
pub type Schema = [SchemaEntry];

/// Validate `config` against `schema`, structurally and recursively.
///
/// Unknown keys are rejected, as are missing required keys and values of
/// the wrong kind.
pub fn validate(schema: &Schema, config: &ConfigValue) -> Result<(), GrammarError> {
    let dict = match config {
        ConfigValue::Dict(map) => map,
        other => {
            return Err(GrammarError::config(format!(
                "expected a dict configuration, got {:?}",
                other.kind()
            )))
        }
    };

    for (key, value) in dict {
        let entry = schema
            .iter()
            .find(|entry| entry.key == Some(key.as_str()))
            .ok_or_else(|| GrammarError::config(format!("unknown configuration key `{key}`")))?;
        validate_value(entry, value)?;
    }

    for entry in schema {
        if entry.required {
            let key = entry.key.unwrap_or("");
            if !dict.contains_key(key) {
                return Err(GrammarError::config(format!(
                    "missing required configuration key `{key}`"
                )));
            }
        }
    }

    Ok(())
}

fn validate_value(entry: &SchemaEntry, value: &ConfigValue) -> Result<(), GrammarError> {
    if value.kind() != entry.kind {
        return Err(GrammarError::config(format!(
            "configuration key `{}` expects {:?}, got {:?}",
            entry.key.unwrap_or("<element>"),
            entry.kind,
            value.kind()
        )));
    }

    match value {
        ConfigValue::List(items) => {
            let element = entry.subschema.first().ok_or_else(|| {
                GrammarError::config("list entry is missing its element subschema")
            })?;
            for item in items {
                validate_value(element, item)?;
            }
        }
        ConfigValue::Dict(_) => {
            validate(entry.subschema, value)?;
        }
        _ => {}
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::nodes::literal;

    const SCHEMA: &Schema = &[
        SchemaEntry::required("string", "the literal to match", ConfigKind::String),
        SchemaEntry::new("fold", "case-insensitive matching", ConfigKind::Bool),
        SchemaEntry::list(
            "children",
            "child nodes",
            &[SchemaEntry::element("a child node", ConfigKind::Node)],
        ),
    ];

    #[test]
    fn accepts_known_keys() {
        let config = ConfigValue::dict([
            ("string", ConfigValue::String("foo".into())),
            ("fold", ConfigValue::Bool(true)),
            ("children", ConfigValue::node_list([literal("x")])),
        ]);
        assert!(validate(SCHEMA, &config).is_ok());
    }

    #[test]
    fn rejects_unknown_key() {
        let config = ConfigValue::dict([
            ("string", ConfigValue::String("foo".into())),
            ("nope", ConfigValue::Bool(false)),
        ]);
        assert!(validate(SCHEMA, &config).is_err());
    }

    #[test]
    fn rejects_missing_required_key() {
        let config = ConfigValue::dict([("fold", ConfigValue::Bool(false))]);
        assert!(validate(SCHEMA, &config).is_err());
    }

    #[test]
    fn rejects_wrong_kind() {
        let config = ConfigValue::dict([("string", ConfigValue::I64(3))]);
        assert!(validate(SCHEMA, &config).is_err());
    }

    #[test]
    fn validates_list_elements() {
        let config = ConfigValue::dict([
            ("string", ConfigValue::String("foo".into())),
            (
                "children",
                ConfigValue::List(vec![ConfigValue::Bool(true)]),
            ),
        ]);
        assert!(validate(SCHEMA, &config).is_err());
    }
}
