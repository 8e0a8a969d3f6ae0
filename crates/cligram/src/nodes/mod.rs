//! The node variants: leaves and compounds.
//!
//! Each module defines one variant: its static [`NodeType`] descriptor,
//! its private state implementing [`crate::node::NodeOps`], and its
//! public constructor(s).

mod alt;
mod bypass;
mod cmd;
mod dynamic;
mod empty;
mod expr;
mod file;
mod int;
mod literal;
mod many;
mod none;
mod once;
mod option;
mod re_lex;
mod regex;
mod seq;
mod sh_lex;
mod space;
mod subset;

pub use alt::{alt, alt_add};
pub use bypass::{bypass, bypass_set_child};
pub use cmd::cmd;
pub use dynamic::dynamic;
pub use empty::empty;
pub use expr::{
    expr, expr_add_bin_op, expr_add_parens, expr_add_post_op, expr_add_pre_op, expr_set_val,
    ExprEvaluator,
};
pub use expr::eval as expr_eval;
pub use file::file;
pub use int::{int, int_value, uint, uint_value};
pub use literal::literal;
pub use many::many;
pub use none::none;
pub use once::{once, once_set_child};
pub use option::{option, option_set_child};
pub use re_lex::{re_lex, re_lex_add};
pub use self::regex::re;
pub use seq::{seq, seq_add};
pub use sh_lex::{sh_lex, sh_lex_expand};
pub use space::space;
pub use subset::{subset, subset_add};

use crate::node::NodeType;

/// All built-in node types, in registration order.
static BUILTIN_TYPES: [&'static NodeType; 20] = [
    &literal::STR_TYPE,
    &int::INT_TYPE,
    &int::UINT_TYPE,
    &regex::RE_TYPE,
    &space::SPACE_TYPE,
    &empty::EMPTY_TYPE,
    &none::NONE_TYPE,
    &file::FILE_TYPE,
    &seq::SEQ_TYPE,
    &alt::OR_TYPE,
    &many::MANY_TYPE,
    &option::OPTION_TYPE,
    &once::ONCE_TYPE,
    &subset::SUBSET_TYPE,
    &bypass::BYPASS_TYPE,
    &sh_lex::SH_LEX_TYPE,
    &re_lex::RE_LEX_TYPE,
    &expr::EXPR_TYPE,
    &cmd::CMD_TYPE,
    &dynamic::DYNAMIC_TYPE,
];

pub(crate) fn builtin_types() -> &'static [&'static NodeType] {
    &BUILTIN_TYPES
}
