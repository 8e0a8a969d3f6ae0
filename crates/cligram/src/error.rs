use std::fmt;

/// An error raised while building, configuring, parsing or completing a
/// grammar.
///
/// A grammar node that simply refuses its input is *not* an error: parse
/// operations report that through [`ParseResult::NoMatch`] and completion
/// operations by adding no candidate. `GrammarError` is reserved for the
/// cases where something is actually wrong — an invalid configuration, a
/// broken contract, an exhausted resource — and the operation as a whole
/// must unwind.
///
/// [`ParseResult::NoMatch`]: crate::ParseResult::NoMatch
#[derive(Debug, thiserror::Error)]
#[non_exhaustive]
pub enum GrammarError {
    /// A configuration value was rejected by the node type's schema, or
    /// the node type cannot rebuild its state from it.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A helper was called on the wrong node type, or with an argument
    /// that violates its contract.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// A node type with this name is already registered.
    #[error("node type `{0}` is already registered")]
    DuplicateNodeType(String),

    /// No node type with this name is registered.
    #[error("unknown node type `{0}`")]
    UnknownNodeType(String),

    /// A node was configured as its own direct child. Cycles must route
    /// through a `bypass` node so that ownership stays acyclic.
    #[error("a node cannot be its own child; route the cycle through a bypass node")]
    SelfReference,

    /// The parse or completion descended deeper than the configured
    /// limit. Raised instead of overflowing the stack on cyclic or
    /// pathological grammars.
    #[error("recursion limit of {0} exceeded")]
    RecursionLimit(usize),

    /// A quoted section of the input was never closed. Shell-lexer
    /// parsing treats this as a refusal; everything else reports it.
    #[error("unterminated quote in input")]
    UnterminatedQuote,

    /// No lexer pattern matched the input at this byte offset.
    #[error("no token pattern matches the input at byte {offset}")]
    LexicalMismatch {
        /// Byte position in the source text where tokenization stopped.
        offset: usize,
    },

    /// A regular expression failed to compile.
    #[error(transparent)]
    Regex(#[from] regex::Error),

    /// An expression evaluation callback failed.
    #[error("expression evaluation failed: {0}")]
    Eval(String),
}

impl GrammarError {
    pub(crate) fn config(message: impl fmt::Display) -> Self {
        GrammarError::InvalidConfig(message.to_string())
    }

    pub(crate) fn eval(message: impl fmt::Display) -> Self {
        GrammarError::Eval(message.to_string())
    }
}
