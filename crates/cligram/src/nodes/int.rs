//! `int` / `uint`: match an integer within bounds.

use std::any::Any;

use crate::config::{ConfigKind, ConfigValue, Schema, SchemaEntry};
use crate::error::GrammarError;
use crate::node::{Node, NodeOps, NodeType};
use crate::parse::{ParseNode, ParseResult};

const INT_SCHEMA: &Schema = &[
    SchemaEntry::required("min", "Minimum accepted value, included.", ConfigKind::I64),
    SchemaEntry::required("max", "Maximum accepted value, included.", ConfigKind::I64),
    SchemaEntry::new("base", "Numeric base; 0 guesses from the prefix.", ConfigKind::U64),
];

const UINT_SCHEMA: &Schema = &[
    SchemaEntry::required("min", "Minimum accepted value, included.", ConfigKind::U64),
    SchemaEntry::required("max", "Maximum accepted value, included.", ConfigKind::U64),
    SchemaEntry::new("base", "Numeric base; 0 guesses from the prefix.", ConfigKind::U64),
];

pub(crate) static INT_TYPE: NodeType = NodeType {
    name: "int",
    schema: INT_SCHEMA,
    new_ops: new_int_ops,
};

pub(crate) static UINT_TYPE: NodeType = NodeType {
    name: "uint",
    schema: UINT_SCHEMA,
    new_ops: new_uint_ops,
};

fn new_int_ops() -> Box<dyn NodeOps> {
    Box::<IntOps>::default()
}

fn new_uint_ops() -> Box<dyn NodeOps> {
    Box::<UintOps>::default()
}

/// Split the base prefix off an integer token. Base 0 guesses: `0x`/`0X`
/// is hexadecimal, a leading `0` followed by digits is octal, anything
/// else decimal.
fn split_base(digits: &str, base: u32) -> (u32, &str) {
    if base != 0 {
        return (base, digits);
    }
    if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        (16, hex)
    } else if digits.len() > 1 && digits.starts_with('0') {
        (8, &digits[1..])
    } else {
        (10, digits)
    }
}

fn parse_i64(token: &str, base: u32) -> Option<i64> {
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token.strip_prefix('+').unwrap_or(token)),
    };
    let (base, digits) = split_base(digits, base);
    let value = i64::from_str_radix(digits, base).ok()?;
    if negative {
        value.checked_neg()
    } else {
        Some(value)
    }
}

fn parse_u64(token: &str, base: u32) -> Option<u64> {
    let digits = token.strip_prefix('+').unwrap_or(token);
    let (base, digits) = split_base(digits, base);
    u64::from_str_radix(digits, base).ok()
}

#[derive(Default)]
struct IntOps {
    min: i64,
    max: i64,
    base: u32,
}

impl NodeOps for IntOps {
    fn parse(
        &self,
        _node: &Node,
        _state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        let Some(token) = tokens.first() else {
            return Ok(ParseResult::NoMatch);
        };
        match parse_i64(token, self.base) {
            Some(value) if value >= self.min && value <= self.max => Ok(ParseResult::Match(1)),
            _ => Ok(ParseResult::NoMatch),
        }
    }

    fn set_config(&mut self, config: &ConfigValue) -> Result<(), GrammarError> {
        let min = config.get("min").and_then(ConfigValue::as_i64);
        let max = config.get("max").and_then(ConfigValue::as_i64);
        let (Some(min), Some(max)) = (min, max) else {
            return Err(GrammarError::config("int node needs `min` and `max`"));
        };
        if min > max {
            return Err(GrammarError::config("int node has min > max"));
        }
        self.min = min;
        self.max = max;
        self.base = config
            .get("base")
            .and_then(ConfigValue::as_u64)
            .unwrap_or(0) as u32;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[derive(Default)]
struct UintOps {
    min: u64,
    max: u64,
    base: u32,
}

impl NodeOps for UintOps {
    fn parse(
        &self,
        _node: &Node,
        _state: &ParseNode,
        tokens: &[String],
    ) -> Result<ParseResult, GrammarError> {
        let Some(token) = tokens.first() else {
            return Ok(ParseResult::NoMatch);
        };
        match parse_u64(token, self.base) {
            Some(value) if value >= self.min && value <= self.max => Ok(ParseResult::Match(1)),
            _ => Ok(ParseResult::NoMatch),
        }
    }

    fn set_config(&mut self, config: &ConfigValue) -> Result<(), GrammarError> {
        let min = config.get("min").and_then(ConfigValue::as_u64);
        let max = config.get("max").and_then(ConfigValue::as_u64);
        let (Some(min), Some(max)) = (min, max) else {
            return Err(GrammarError::config("uint node needs `min` and `max`"));
        };
        if min > max {
            return Err(GrammarError::config("uint node has min > max"));
        }
        self.min = min;
        self.max = max;
        self.base = config
            .get("base")
            .and_then(ConfigValue::as_u64)
            .unwrap_or(0) as u32;
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A node matching a signed integer in `[min, max]`. Base 0 guesses the
/// base from the token prefix.
pub fn int(min: i64, max: i64, base: u32) -> Result<Node, GrammarError> {
    let node = Node::from_type(&INT_TYPE);
    node.set_config(ConfigValue::dict([
        ("min", ConfigValue::I64(min)),
        ("max", ConfigValue::I64(max)),
        ("base", ConfigValue::U64(base.into())),
    ]))?;
    Ok(node)
}

/// A node matching an unsigned integer in `[min, max]`.
pub fn uint(min: u64, max: u64, base: u32) -> Result<Node, GrammarError> {
    let node = Node::from_type(&UINT_TYPE);
    node.set_config(ConfigValue::dict([
        ("min", ConfigValue::U64(min)),
        ("max", ConfigValue::U64(max)),
        ("base", ConfigValue::U64(base.into())),
    ]))?;
    Ok(node)
}

/// Extract the value of a token matched by an `int` node, checking the
/// node's bounds.
pub fn int_value(node: &Node, token: &str) -> Result<i64, GrammarError> {
    node.with_ops(|ops: &IntOps| {
        parse_i64(token, ops.base)
            .filter(|value| *value >= ops.min && *value <= ops.max)
            .ok_or_else(|| GrammarError::config(format!("`{token}` is not an accepted integer")))
    })?
}

/// Extract the value of a token matched by a `uint` node, checking the
/// node's bounds.
pub fn uint_value(node: &Node, token: &str) -> Result<u64, GrammarError> {
    node.with_ops(|ops: &UintOps| {
        parse_u64(token, ops.base)
            .filter(|value| *value >= ops.min && *value <= ops.max)
            .ok_or_else(|| GrammarError::config(format!("`{token}` is not an accepted integer")))
    })?
}
