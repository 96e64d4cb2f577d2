//! # Attribute Shapes and Values
//!
//! Every grammar node carries a [`Shape`] computed once, at construction, from
//! the shapes of its children. Parsing produces a [`Value`] conforming to that
//! shape.
//!
//! ## Resolution
//!
//! * `Nothing` disappears from sequences; a sequence of only `Nothing` is `Nothing`.
//! * A sequence with at least one attribute is a `Tuple` of the remaining shapes,
//!   in order. A single survivor stays a one-element tuple; it collapses only
//!   when assigned to a non-tuple destination.
//! * Alternations are `Variant`s over the branches that produce an attribute,
//!   in declared order, duplicates included. A single such branch still gives
//!   a one-member variant.
//! * If any branch of an alternation is `Nothing`, the variant is wrapped in an
//!   `Optional`; a win by that branch yields the empty optional.
//! * Optionals and repeats wrap their child, unless the child is `Nothing`.
//!
//! [`resolve`] is the single entry point: node constructors hand it their kind
//! and child shapes.
//!
//! ## Assignment
//!
//! [`Shape::assignable_to`] and [`Value::coerce_to`] implement the same
//! conversion table: variants and one-element tuples unwrap, text-like values
//! concatenate into strings, integers widen to floats and bare values wrap into
//! optionals.

use std::fmt;
use std::ops::Range;

use super::core::NodeKind;

/// The static description of what a grammar node produces.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Shape {
    Nothing,
    Char,
    Str,
    Bool,
    Int,
    UInt,
    Float,
    /// Half-open offset range into the input.
    Range,
    Tuple(Vec<Shape>),
    Variant(Vec<Shape>),
    Optional(Box<Shape>),
    Seq(Box<Shape>),
}

pub(crate) static NOTHING: Shape = Shape::Nothing;
pub(crate) static CHAR: Shape = Shape::Char;
pub(crate) static STR: Shape = Shape::Str;
pub(crate) static BOOL: Shape = Shape::Bool;
pub(crate) static INT: Shape = Shape::Int;
pub(crate) static UINT: Shape = Shape::UInt;
pub(crate) static FLOAT: Shape = Shape::Float;

/// A produced attribute.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Value {
    #[default]
    None,
    Char(char),
    Str(String),
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Range(Range<usize>),
    Tuple(Vec<Value>),
    Variant { branch: usize, value: Box<Value> },
    Optional(Option<Box<Value>>),
    Seq(Vec<Value>),
}

impl Shape {
    /// Shape of a sequence whose elements produce `parts`.
    pub fn sequence(parts: impl IntoIterator<Item = Shape>) -> Shape {
        let kept: Vec<Shape> = parts.into_iter().filter(|s| !s.is_nothing()).collect();
        if kept.is_empty() {
            Shape::Nothing
        } else {
            Shape::Tuple(kept)
        }
    }

    /// Shape of an ordered choice over `branches`.
    pub fn alternation(branches: impl IntoIterator<Item = Shape>) -> Shape {
        let mut has_nothing = false;
        let mut members = Vec::new();
        for branch in branches {
            match branch {
                Shape::Nothing => has_nothing = true,
                other => members.push(other),
            }
        }
        match (members.is_empty(), has_nothing) {
            (true, _) => Shape::Nothing,
            (false, false) => Shape::Variant(members),
            (false, true) => Shape::Optional(Box::new(Shape::Variant(members))),
        }
    }

    /// Position of each branch inside the variant built by [`Shape::alternation`];
    /// `None` for branches without an attribute.
    pub(crate) fn union_slots<'s>(branches: impl IntoIterator<Item = &'s Shape>) -> Vec<Option<usize>> {
        let mut next = 0;
        branches
            .into_iter()
            .map(|shape| {
                if shape.is_nothing() {
                    None
                } else {
                    next += 1;
                    Some(next - 1)
                }
            })
            .collect()
    }

    /// Value of an alternation whose branch in `slot` matched with `value`.
    pub(crate) fn tag_branch(&self, slot: Option<usize>, value: Value) -> Value {
        let tagged = slot.map(|branch| Value::Variant {
            branch,
            value: Box::new(value),
        });
        match (self, tagged) {
            (Shape::Optional(_), tagged) => Value::Optional(tagged.map(Box::new)),
            (Shape::Variant(_), Some(tagged)) => tagged,
            _ => Value::None,
        }
    }

    pub fn optional(inner: Shape) -> Shape {
        match inner {
            Shape::Nothing => Shape::Nothing,
            other => Shape::Optional(Box::new(other)),
        }
    }

    pub fn repeated(inner: Shape) -> Shape {
        match inner {
            Shape::Nothing => Shape::Nothing,
            other => Shape::Seq(Box::new(other)),
        }
    }

    pub fn is_nothing(&self) -> bool {
        matches!(self, Shape::Nothing)
    }

    /// Whether every value of this shape has a textual rendering.
    pub fn is_text(&self) -> bool {
        match self {
            Shape::Nothing | Shape::Char | Shape::Str => true,
            Shape::Seq(inner) | Shape::Optional(inner) => inner.is_text(),
            Shape::Tuple(items) | Shape::Variant(items) => items.iter().all(Shape::is_text),
            _ => false,
        }
    }

    /// The value a destination of this shape starts out with.
    pub fn default_value(&self) -> Value {
        match self {
            Shape::Nothing => Value::None,
            Shape::Char => Value::Char('\0'),
            Shape::Str => Value::Str(String::new()),
            Shape::Bool => Value::Bool(false),
            Shape::Int => Value::Int(0),
            Shape::UInt => Value::UInt(0),
            Shape::Float => Value::Float(0.0),
            Shape::Range => Value::Range(0..0),
            Shape::Tuple(items) => Value::Tuple(items.iter().map(Shape::default_value).collect()),
            Shape::Variant(branches) => match branches.first() {
                Some(first) => Value::Variant {
                    branch: 0,
                    value: Box::new(first.default_value()),
                },
                None => Value::None,
            },
            Shape::Optional(_) => Value::Optional(None),
            Shape::Seq(_) => Value::Seq(Vec::new()),
        }
    }

    /// Whether a value of `self` can be stored in a destination of `target`.
    pub fn assignable_to(&self, target: &Shape) -> bool {
        if self == target {
            return true;
        }
        match (self, target) {
            (Shape::Nothing, _) | (_, Shape::Nothing) => true,
            (Shape::Tuple(items), Shape::Tuple(targets)) => {
                items.len() == targets.len()
                    && items.iter().zip(targets).all(|(s, t)| s.assignable_to(t))
            }
            (_, Shape::Str) if self.is_text() => true,
            (Shape::Variant(branches), _) => branches.iter().all(|b| b.assignable_to(target)),
            (Shape::Tuple(items), _) if items.len() == 1 => items[0].assignable_to(target),
            (Shape::Int, Shape::UInt) | (Shape::UInt, Shape::Int) => true,
            (Shape::Int | Shape::UInt, Shape::Float) => true,
            (Shape::Optional(inner), Shape::Optional(t)) => inner.assignable_to(t),
            (_, Shape::Optional(t)) => self.assignable_to(t),
            (Shape::Seq(inner), Shape::Seq(t)) => inner.assignable_to(t),
            (_, Shape::Variant(targets)) => targets.iter().any(|t| self.assignable_to(t)),
            _ => false,
        }
    }
}

/// Composes the shape of a node from its kind and its children's shapes.
///
/// Computed once per node, at construction.
///
/// # Arguments
///
/// * `kind` - The kind of the node being built
/// * `children` - The shapes that feed the attribute: every element of a
///   sequence, every branch of an alternation or switch, the body of a wrapper,
///   or the declared payload of `attr`, symbol tables and rule references.
///   Leaves take none.
///
/// # Returns
///
/// * `Shape` - The attribute shape of the node
pub fn resolve(kind: NodeKind, children: &[Shape]) -> Shape {
    let first = || children.first().cloned().unwrap_or(Shape::Nothing);
    match kind {
        NodeKind::Sequence => Shape::sequence(children.iter().cloned()),
        NodeKind::Alternation | NodeKind::Switch => Shape::alternation(children.iter().cloned()),
        NodeKind::Optional => Shape::optional(first()),
        NodeKind::Repeat => Shape::repeated(first()),
        NodeKind::Lexeme
        | NodeKind::NoCase
        | NodeKind::Skip
        | NodeKind::Action
        | NodeKind::Rule
        | NodeKind::Symbols
        | NodeKind::Attr => first(),
        NodeKind::Raw => Shape::Range,
        NodeKind::StringView | NodeKind::String => Shape::Str,
        NodeKind::Char => Shape::Char,
        NodeKind::Bool => Shape::Bool,
        NodeKind::UInt => Shape::UInt,
        NodeKind::Int => Shape::Int,
        NodeKind::Float => Shape::Float,
        NodeKind::Expect
        | NodeKind::Omit
        | NodeKind::Literal
        | NodeKind::Whitespace
        | NodeKind::Eps
        | NodeKind::Eoi => Shape::Nothing,
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn list(f: &mut fmt::Formatter<'_>, name: &str, items: &[Shape]) -> fmt::Result {
            write!(f, "{name}<")?;
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    write!(f, ", ")?;
                }
                write!(f, "{item}")?;
            }
            write!(f, ">")
        }

        match self {
            Shape::Nothing => write!(f, "nothing"),
            Shape::Char => write!(f, "char"),
            Shape::Str => write!(f, "string"),
            Shape::Bool => write!(f, "bool"),
            Shape::Int => write!(f, "int"),
            Shape::UInt => write!(f, "uint"),
            Shape::Float => write!(f, "float"),
            Shape::Range => write!(f, "range"),
            Shape::Tuple(items) => list(f, "tuple", items),
            Shape::Variant(items) => list(f, "variant", items),
            Shape::Optional(inner) => write!(f, "optional<{inner}>"),
            Shape::Seq(inner) => write!(f, "seq<{inner}>"),
        }
    }
}

impl Value {
    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Concatenated text of a text-like value.
    pub fn into_text(self) -> Option<String> {
        match self {
            Value::None | Value::Optional(None) => Some(String::new()),
            Value::Char(c) => Some(c.to_string()),
            Value::Str(s) => Some(s),
            Value::Optional(Some(inner)) => inner.into_text(),
            Value::Variant { value, .. } => value.into_text(),
            Value::Seq(items) | Value::Tuple(items) => {
                let mut text = String::new();
                for item in items {
                    text.push_str(&item.into_text()?);
                }
                Some(text)
            }
            _ => None,
        }
    }

    /// Converts the value for storage in a destination of `target`.
    ///
    /// Returns `None` when the conversion table has no entry for the pair.
    pub fn coerce_to(self, target: &Shape) -> Option<Value> {
        match (self, target) {
            (_, Shape::Nothing) => Some(Value::None),
            (Value::None, t) => Some(t.default_value()),
            (Value::Tuple(items), Shape::Tuple(targets)) if items.len() == targets.len() => items
                .into_iter()
                .zip(targets)
                .map(|(v, t)| v.coerce_to(t))
                .collect::<Option<Vec<_>>>()
                .map(Value::Tuple),
            (Value::Variant { branch, value }, Shape::Variant(targets)) => {
                if let Some(t) = targets.get(branch) {
                    if let Some(v) = value.clone().coerce_to(t) {
                        return Some(Value::Variant {
                            branch,
                            value: Box::new(v),
                        });
                    }
                }
                retag(*value, targets)
            }
            (Value::Variant { value, .. }, t) => value.coerce_to(t),
            (v, Shape::Str) => v.into_text().map(Value::Str),
            (Value::Char(c), Shape::Char) => Some(Value::Char(c)),
            (Value::Bool(b), Shape::Bool) => Some(Value::Bool(b)),
            (Value::Int(i), Shape::Int) => Some(Value::Int(i)),
            (Value::UInt(u), Shape::Int) => i64::try_from(u).ok().map(Value::Int),
            (Value::UInt(u), Shape::UInt) => Some(Value::UInt(u)),
            (Value::Int(i), Shape::UInt) => u64::try_from(i).ok().map(Value::UInt),
            (Value::Float(x), Shape::Float) => Some(Value::Float(x)),
            (Value::Int(i), Shape::Float) => Some(Value::Float(i as f64)),
            (Value::UInt(u), Shape::Float) => Some(Value::Float(u as f64)),
            (Value::Range(r), Shape::Range) => Some(Value::Range(r)),
            (Value::Optional(inner), Shape::Optional(t)) => match inner {
                Some(v) => v
                    .coerce_to(t)
                    .map(|v| Value::Optional(Some(Box::new(v)))),
                None => Some(Value::Optional(None)),
            },
            (Value::Seq(items), Shape::Seq(t)) => items
                .into_iter()
                .map(|v| v.coerce_to(t))
                .collect::<Option<Vec<_>>>()
                .map(Value::Seq),
            (Value::Tuple(mut items), t) if items.len() == 1 => items.pop()?.coerce_to(t),
            (v, Shape::Optional(t)) => v.coerce_to(t).map(|v| Value::Optional(Some(Box::new(v)))),
            (v, Shape::Variant(targets)) => retag(v, targets),
            _ => None,
        }
    }
}

fn retag(value: Value, targets: &[Shape]) -> Option<Value> {
    targets.iter().enumerate().find_map(|(branch, t)| {
        value.clone().coerce_to(t).map(|v| Value::Variant {
            branch,
            value: Box::new(v),
        })
    })
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => write!(f, "()"),
            Value::Char(c) => write!(f, "{c:?}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(i) => write!(f, "{i}"),
            Value::UInt(u) => write!(f, "{u}"),
            Value::Float(x) => write!(f, "{x}"),
            Value::Range(r) => write!(f, "{}..{}", r.start, r.end),
            Value::Tuple(items) | Value::Seq(items) => {
                let open = if matches!(self, Value::Tuple(_)) { "(" } else { "[" };
                let close = if open == "(" { ")" } else { "]" };
                write!(f, "{open}")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "{close}")
            }
            Value::Variant { branch, value } => write!(f, "#{branch}:{value}"),
            Value::Optional(None) => write!(f, "none"),
            Value::Optional(Some(v)) => write!(f, "some({v})"),
        }
    }
}

/// Rust types that have a fixed [`Shape`] and convert to and from [`Value`].
pub trait Attribute: Sized + Send + Sync + 'static {
    fn shape() -> Shape;
    fn into_value(self) -> Value;
    fn from_value(value: Value) -> Option<Self>;
}

impl<T: Attribute> From<T> for Value {
    fn from(value: T) -> Self {
        value.into_value()
    }
}

impl Attribute for char {
    fn shape() -> Shape {
        Shape::Char
    }
    fn into_value(self) -> Value {
        Value::Char(self)
    }
    fn from_value(value: Value) -> Option<Self> {
        match value.coerce_to(&Shape::Char)? {
            Value::Char(c) => Some(c),
            _ => None,
        }
    }
}

impl Attribute for String {
    fn shape() -> Shape {
        Shape::Str
    }
    fn into_value(self) -> Value {
        Value::Str(self)
    }
    fn from_value(value: Value) -> Option<Self> {
        value.into_text()
    }
}

impl Attribute for bool {
    fn shape() -> Shape {
        Shape::Bool
    }
    fn into_value(self) -> Value {
        Value::Bool(self)
    }
    fn from_value(value: Value) -> Option<Self> {
        match value.coerce_to(&Shape::Bool)? {
            Value::Bool(b) => Some(b),
            _ => None,
        }
    }
}

impl Attribute for i64 {
    fn shape() -> Shape {
        Shape::Int
    }
    fn into_value(self) -> Value {
        Value::Int(self)
    }
    fn from_value(value: Value) -> Option<Self> {
        match value.coerce_to(&Shape::Int)? {
            Value::Int(i) => Some(i),
            _ => None,
        }
    }
}

impl Attribute for i32 {
    fn shape() -> Shape {
        Shape::Int
    }
    fn into_value(self) -> Value {
        Value::Int(self.into())
    }
    fn from_value(value: Value) -> Option<Self> {
        i64::from_value(value).and_then(|i| i32::try_from(i).ok())
    }
}

impl Attribute for u64 {
    fn shape() -> Shape {
        Shape::UInt
    }
    fn into_value(self) -> Value {
        Value::UInt(self)
    }
    fn from_value(value: Value) -> Option<Self> {
        match value.coerce_to(&Shape::UInt)? {
            Value::UInt(u) => Some(u),
            _ => None,
        }
    }
}

impl Attribute for u32 {
    fn shape() -> Shape {
        Shape::UInt
    }
    fn into_value(self) -> Value {
        Value::UInt(self.into())
    }
    fn from_value(value: Value) -> Option<Self> {
        u64::from_value(value).and_then(|u| u32::try_from(u).ok())
    }
}

impl Attribute for f64 {
    fn shape() -> Shape {
        Shape::Float
    }
    fn into_value(self) -> Value {
        Value::Float(self)
    }
    fn from_value(value: Value) -> Option<Self> {
        match value.coerce_to(&Shape::Float)? {
            Value::Float(x) => Some(x),
            _ => None,
        }
    }
}

impl Attribute for Range<usize> {
    fn shape() -> Shape {
        Shape::Range
    }
    fn into_value(self) -> Value {
        Value::Range(self)
    }
    fn from_value(value: Value) -> Option<Self> {
        match value.coerce_to(&Shape::Range)? {
            Value::Range(r) => Some(r),
            _ => None,
        }
    }
}

impl<T: Attribute> Attribute for Option<T> {
    fn shape() -> Shape {
        Shape::Optional(Box::new(T::shape()))
    }
    fn into_value(self) -> Value {
        Value::Optional(self.map(|v| Box::new(v.into_value())))
    }
    fn from_value(value: Value) -> Option<Self> {
        match value.coerce_to(&Self::shape())? {
            Value::Optional(None) => Some(None),
            Value::Optional(Some(v)) => T::from_value(*v).map(Some),
            _ => None,
        }
    }
}

impl<T: Attribute> Attribute for Vec<T> {
    fn shape() -> Shape {
        Shape::Seq(Box::new(T::shape()))
    }
    fn into_value(self) -> Value {
        Value::Seq(self.into_iter().map(Attribute::into_value).collect())
    }
    fn from_value(value: Value) -> Option<Self> {
        match value.coerce_to(&Self::shape())? {
            Value::Seq(items) => items.into_iter().map(T::from_value).collect(),
            _ => None,
        }
    }
}

impl<A: Attribute, B: Attribute> Attribute for (A, B) {
    fn shape() -> Shape {
        Shape::Tuple(vec![A::shape(), B::shape()])
    }
    fn into_value(self) -> Value {
        Value::Tuple(vec![self.0.into_value(), self.1.into_value()])
    }
    fn from_value(value: Value) -> Option<Self> {
        match value.coerce_to(&Self::shape())? {
            Value::Tuple(items) => {
                let mut items = items.into_iter();
                Some((A::from_value(items.next()?)?, B::from_value(items.next()?)?))
            }
            _ => None,
        }
    }
}

impl<A: Attribute, B: Attribute, C: Attribute> Attribute for (A, B, C) {
    fn shape() -> Shape {
        Shape::Tuple(vec![A::shape(), B::shape(), C::shape()])
    }
    fn into_value(self) -> Value {
        Value::Tuple(vec![
            self.0.into_value(),
            self.1.into_value(),
            self.2.into_value(),
        ])
    }
    fn from_value(value: Value) -> Option<Self> {
        match value.coerce_to(&Self::shape())? {
            Value::Tuple(items) => {
                let mut items = items.into_iter();
                Some((
                    A::from_value(items.next()?)?,
                    B::from_value(items.next()?)?,
                    C::from_value(items.next()?)?,
                ))
            }
            _ => None,
        }
    }
}
