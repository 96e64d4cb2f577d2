//! # Primitive Parsers
//!
//! Terminals matching single code points, literal text, whitespace and
//! boolean literals, plus the zero-width `eps`, `eoi` and `attr`.

use std::sync::Arc;

use strum::Display;

use super::attribute::{Shape, Value, BOOL, CHAR, NOTHING, STR};
use super::context::{ActionContext, Context};
use super::core::{NodeKind, ParseResult, Parser};
use super::input::{collect_text, fold_case};
use super::rule::Validation;
use crate::error::GrammarError;

/// Semantic predicate evaluated without consuming input.
pub type Predicate = Arc<dyn Fn(&ActionContext<'_, '_>) -> bool + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum CharClass {
    Alnum,
    Alpha,
    Blank,
    Cntrl,
    Digit,
    HexDigit,
    Lower,
    Upper,
    Punct,
    Space,
}

fn is_line_break(c: char) -> bool {
    matches!(
        c,
        '\n' | '\r' | '\u{0B}' | '\u{0C}' | '\u{85}' | '\u{2028}' | '\u{2029}'
    )
}

fn is_blank(c: char) -> bool {
    c.is_whitespace() && !is_line_break(c)
}

impl CharClass {
    pub fn matches(self, c: char, no_case: bool) -> bool {
        match self {
            CharClass::Alnum => c.is_alphanumeric(),
            CharClass::Alpha => c.is_alphabetic(),
            CharClass::Blank => is_blank(c),
            CharClass::Cntrl => c.is_control(),
            CharClass::Digit => c.is_ascii_digit(),
            CharClass::HexDigit => c.is_ascii_hexdigit(),
            CharClass::Lower | CharClass::Upper if no_case => c.is_lowercase() || c.is_uppercase(),
            CharClass::Lower => c.is_lowercase(),
            CharClass::Upper => c.is_uppercase(),
            CharClass::Punct => {
                c.is_ascii_punctuation()
                    || (!c.is_ascii() && !c.is_alphanumeric() && !c.is_whitespace() && !c.is_control())
            }
            CharClass::Space => c.is_whitespace(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum CharMatcher {
    Any,
    Exact(char),
    Range(char, char),
    Set(Vec<char>),
    /// Sorted and deduplicated; searched with binary search.
    Sorted(Vec<char>),
    Class(CharClass),
}

/// Matches one code point.
pub struct CharParser {
    matcher: CharMatcher,
    /// `false` for literal characters, which produce no attribute.
    attribute: bool,
}

impl CharParser {
    fn with(matcher: CharMatcher, attribute: bool) -> Self {
        Self { matcher, attribute }
    }

    pub fn any() -> Self {
        Self::with(CharMatcher::Any, true)
    }

    pub fn exact(c: char) -> Self {
        Self::with(CharMatcher::Exact(c), true)
    }

    pub fn literal(c: char) -> Self {
        Self::with(CharMatcher::Exact(c), false)
    }

    pub fn range(lo: char, hi: char) -> Self {
        Self::with(CharMatcher::Range(lo, hi), true)
    }

    pub fn set(chars: &str) -> Self {
        Self::with(CharMatcher::Set(chars.chars().collect()), true)
    }

    pub fn sorted(chars: &[char]) -> Self {
        let mut chars = chars.to_vec();
        chars.sort_unstable();
        chars.dedup();
        Self::with(CharMatcher::Sorted(chars), true)
    }

    pub fn class(class: CharClass) -> Self {
        Self::with(CharMatcher::Class(class), true)
    }

    fn accepts(&self, ctx: &Context<'_>, c: char) -> bool {
        let no_case = ctx.no_case();
        match &self.matcher {
            CharMatcher::Any => true,
            CharMatcher::Exact(expected) => ctx.chars_match(*expected, c),
            CharMatcher::Range(lo, hi) => {
                (*lo..=*hi).contains(&c)
                    || (no_case && (fold_case(*lo)..=fold_case(*hi)).contains(&fold_case(c)))
            }
            CharMatcher::Set(chars) => chars.iter().any(|&expected| ctx.chars_match(expected, c)),
            CharMatcher::Sorted(chars) => {
                chars.binary_search(&c).is_ok()
                    || (no_case && chars.iter().any(|&expected| fold_case(expected) == fold_case(c)))
            }
            CharMatcher::Class(class) => class.matches(c, no_case),
        }
    }
}

impl Parser for CharParser {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        match ctx.next_char(pos) {
            Some((c, next)) if self.accepts(ctx, c) => {
                let value = if self.attribute { Value::Char(c) } else { Value::None };
                Ok((next, value))
            }
            _ => Err(ctx.fail(self.describe(), pos)),
        }
    }

    fn kind(&self) -> NodeKind {
        if self.attribute {
            NodeKind::Char
        } else {
            NodeKind::Literal
        }
    }

    fn shape(&self) -> &Shape {
        if self.attribute {
            &CHAR
        } else {
            &NOTHING
        }
    }

    fn describe(&self) -> String {
        match &self.matcher {
            CharMatcher::Any => "char_".to_string(),
            CharMatcher::Exact(c) => format!("{c:?}"),
            CharMatcher::Range(lo, hi) => format!("char_({lo:?}, {hi:?})"),
            CharMatcher::Set(chars) => format!("char_({:?})", chars.iter().collect::<String>()),
            CharMatcher::Sorted(chars) => format!("char_({:?})", chars.iter().collect::<String>()),
            CharMatcher::Class(class) => class.to_string(),
        }
    }

    fn validate(&self, _scope: &mut Validation<'_>) -> Result<(), GrammarError> {
        match self.matcher {
            CharMatcher::Range(lo, hi) if lo > hi => Err(GrammarError::InvalidCharRange { lo, hi }),
            _ => Ok(()),
        }
    }
}

/// Matches a fixed string. `string` produces the matched text; `lit`
/// produces nothing.
pub struct Literal {
    text: String,
    attribute: bool,
}

impl Literal {
    pub fn new(text: &str, attribute: bool) -> Self {
        Self {
            text: text.to_string(),
            attribute,
        }
    }
}

impl Parser for Literal {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let next = ctx
            .match_text(&self.text, pos)
            .ok_or_else(|| ctx.fail(self.describe(), pos))?;
        let value = if self.attribute {
            Value::Str(collect_text(ctx.input(), pos..next))
        } else {
            Value::None
        };
        Ok((next, value))
    }

    fn kind(&self) -> NodeKind {
        if self.attribute {
            NodeKind::String
        } else {
            NodeKind::Literal
        }
    }

    fn shape(&self) -> &Shape {
        if self.attribute {
            &STR
        } else {
            &NOTHING
        }
    }

    fn describe(&self) -> String {
        format!("{:?}", self.text)
    }

    fn validate(&self, _scope: &mut Validation<'_>) -> Result<(), GrammarError> {
        if self.text.is_empty() {
            return Err(GrammarError::EmptyLiteral);
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum WhitespaceKind {
    /// Any line break or blank.
    Ws,
    /// A line break; `\r\n` counts as one.
    Eol,
    /// Whitespace that is not a line break.
    Blank,
}

pub struct Whitespace {
    kind: WhitespaceKind,
}

impl Whitespace {
    pub fn new(kind: WhitespaceKind) -> Self {
        Self { kind }
    }
}

impl Parser for Whitespace {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let matched = match ctx.next_char(pos) {
            Some(('\r', next)) if self.kind != WhitespaceKind::Blank => match ctx.next_char(next) {
                Some(('\n', after)) => Some(after),
                _ => Some(next),
            },
            Some((c, next)) => {
                let ok = match self.kind {
                    WhitespaceKind::Ws => c.is_whitespace(),
                    WhitespaceKind::Eol => is_line_break(c),
                    WhitespaceKind::Blank => is_blank(c),
                };
                ok.then_some(next)
            }
            None => None,
        };
        match matched {
            Some(next) => Ok((next, Value::None)),
            None => Err(ctx.fail(self.describe(), pos)),
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Whitespace
    }

    fn shape(&self) -> &Shape {
        &NOTHING
    }

    fn describe(&self) -> String {
        self.kind.to_string()
    }
}

/// Matches `true` or `false`.
pub struct BoolParser;

impl Parser for BoolParser {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        if let Some(next) = ctx.match_text("true", pos) {
            return Ok((next, Value::Bool(true)));
        }
        if let Some(next) = ctx.match_text("false", pos) {
            return Ok((next, Value::Bool(false)));
        }
        Err(ctx.fail(self.describe(), pos))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Bool
    }

    fn shape(&self) -> &Shape {
        &BOOL
    }

    fn describe(&self) -> String {
        "bool_".to_string()
    }
}

/// Always succeeds without consuming input, unless its predicate says no.
pub struct Eps {
    predicate: Option<Predicate>,
}

impl Eps {
    pub fn new(predicate: Option<Predicate>) -> Self {
        Self { predicate }
    }
}

impl Parser for Eps {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        if let Some(predicate) = &self.predicate {
            let view = ActionContext::new(ctx, Value::None, pos..pos);
            if !predicate(&view) {
                return Err(ctx.fail(self.describe(), pos));
            }
        }
        Ok((pos, Value::None))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Eps
    }

    fn shape(&self) -> &Shape {
        &NOTHING
    }

    fn describe(&self) -> String {
        match self.predicate {
            Some(_) => "eps(<predicate>)".to_string(),
            None => "eps".to_string(),
        }
    }
}

pub struct Eoi;

impl Parser for Eoi {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        if ctx.at_end(pos) {
            Ok((pos, Value::None))
        } else {
            Err(ctx.fail(self.describe(), pos))
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Eoi
    }

    fn shape(&self) -> &Shape {
        &NOTHING
    }

    fn describe(&self) -> String {
        "end of input".to_string()
    }
}

/// Produces a fixed value without consuming input.
pub struct Attr {
    value: Value,
    shape: Shape,
}

impl Attr {
    pub fn new(value: Value, shape: Shape) -> Self {
        Self { value, shape }
    }
}

impl Parser for Attr {
    fn parse(&self, _ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        Ok((pos, self.value.clone()))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Attr
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn describe(&self) -> String {
        format!("attr({})", self.value)
    }
}
