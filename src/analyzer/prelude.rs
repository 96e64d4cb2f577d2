use std::sync::Arc;

pub use super::attribute::{Attribute, Shape, Value};
pub use super::combinators::Switch;
pub use super::context::ActionContext;
pub use super::core::{Commit, Node, Parser};
pub use super::rule::{Grammar, GrammarBuilder, RuleDecl, RuleHandle};
pub use super::symbols::Symbols;

use super::combinators::{Alternation, Sequence, Skip};
use super::context::ActionContext as Ctx;
use super::numeric::{FloatParser, IntParser, UIntParser};
use super::primitives::{
    Attr, BoolParser, CharClass, CharParser, Eoi, Eps, Literal, Whitespace, WhitespaceKind,
};

pub fn eps() -> Node {
    Node::new(Eps::new(None))
}

/// Zero-width match that succeeds while `predicate` holds.
pub fn eps_if<F>(predicate: F) -> Node
where
    F: Fn(&Ctx<'_, '_>) -> bool + Send + Sync + 'static,
{
    Node::new(Eps::new(Some(Arc::new(predicate))))
}

pub fn eoi() -> Node {
    Node::new(Eoi)
}

pub fn attr<T: Attribute>(value: T) -> Node {
    Node::new(Attr::new(value.into_value(), T::shape()))
}

pub fn any_char() -> Node {
    Node::new(CharParser::any())
}

pub fn char_(c: char) -> Node {
    Node::new(CharParser::exact(c))
}

pub fn char_range(lo: char, hi: char) -> Node {
    Node::new(CharParser::range(lo, hi))
}

pub fn char_set(chars: &str) -> Node {
    Node::new(CharParser::set(chars))
}

pub fn char_sorted(chars: &[char]) -> Node {
    Node::new(CharParser::sorted(chars))
}

pub fn lit(text: &str) -> Node {
    Node::new(Literal::new(text, false))
}

pub fn lit_char(c: char) -> Node {
    Node::new(CharParser::literal(c))
}

pub fn string(text: &str) -> Node {
    Node::new(Literal::new(text, true))
}

pub fn ws() -> Node {
    Node::new(Whitespace::new(WhitespaceKind::Ws))
}

pub fn eol() -> Node {
    Node::new(Whitespace::new(WhitespaceKind::Eol))
}

pub fn blank() -> Node {
    Node::new(Whitespace::new(WhitespaceKind::Blank))
}

pub fn bool_() -> Node {
    Node::new(BoolParser)
}

pub fn alnum() -> Node {
    Node::new(CharParser::class(CharClass::Alnum))
}

pub fn alpha() -> Node {
    Node::new(CharParser::class(CharClass::Alpha))
}

/// Blank character with a `char` attribute; see [`blank`] for the
/// attribute-less whitespace parser.
pub fn blank_char() -> Node {
    Node::new(CharParser::class(CharClass::Blank))
}

pub fn cntrl() -> Node {
    Node::new(CharParser::class(CharClass::Cntrl))
}

pub fn digit() -> Node {
    Node::new(CharParser::class(CharClass::Digit))
}

pub fn hex_digit() -> Node {
    Node::new(CharParser::class(CharClass::HexDigit))
}

pub fn lower() -> Node {
    Node::new(CharParser::class(CharClass::Lower))
}

pub fn upper() -> Node {
    Node::new(CharParser::class(CharClass::Upper))
}

pub fn punct() -> Node {
    Node::new(CharParser::class(CharClass::Punct))
}

pub fn space() -> Node {
    Node::new(CharParser::class(CharClass::Space))
}

pub fn uint(radix: u32) -> Node {
    Node::new(UIntParser::new(radix))
}

pub fn uint_() -> Node {
    uint(10)
}

pub fn bin() -> Node {
    uint(2)
}

pub fn oct() -> Node {
    uint(8)
}

pub fn hex() -> Node {
    uint(16)
}

pub fn int(radix: u32) -> Node {
    Node::new(IntParser::new(radix))
}

pub fn int_() -> Node {
    int(10)
}

pub fn float() -> Node {
    Node::new(FloatParser)
}

pub fn seq(nodes: Vec<Node>) -> Node {
    Node::new(Sequence::new(nodes.into_iter().map(|n| (None, n)).collect()))
}

pub fn alt(nodes: Vec<Node>) -> Node {
    Node::new(Alternation::new(nodes))
}

pub fn opt(node: impl Into<Node>) -> Node {
    node.into().opt()
}

pub fn zero_plus(node: impl Into<Node>) -> Node {
    node.into().zero_plus()
}

pub fn one_plus(node: impl Into<Node>) -> Node {
    node.into().one_plus()
}

pub fn repeat(count: usize, node: impl Into<Node>) -> Node {
    node.into().repeat(count)
}

pub fn repeat_range(min: usize, max: usize, node: impl Into<Node>) -> Node {
    node.into().repeat_range(min, max)
}

pub fn delimited_seq(node: impl Into<Node>, delimiter: impl Into<Node>) -> Node {
    node.into().separated_by(delimiter)
}

pub fn lexeme(node: impl Into<Node>) -> Node {
    node.into().lexeme()
}

pub fn no_case(node: impl Into<Node>) -> Node {
    node.into().no_case()
}

pub fn skip(node: impl Into<Node>, skipper: impl Into<Node>) -> Node {
    node.into().skip(skipper)
}

/// Re-enables the skipper suspended by an enclosing `lexeme`.
pub fn resume_skip(node: impl Into<Node>) -> Node {
    Node::new(Skip::new(node.into(), None))
}

pub fn raw(node: impl Into<Node>) -> Node {
    node.into().raw()
}

pub fn string_view(node: impl Into<Node>) -> Node {
    node.into().string_view()
}

pub fn omit(node: impl Into<Node>) -> Node {
    node.into().omit()
}

pub fn switch_<T: Attribute>(on: T) -> Switch {
    Switch::new(on)
}
