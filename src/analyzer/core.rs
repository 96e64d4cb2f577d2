//! # Core Parser Definitions
//!
//! Every grammar node implements [`Parser`]. Nodes are immutable after
//! construction and shared through [`Node`], a cheap reference-counted handle,
//! so one node can appear in many places of one or several grammars.
//!
//! ## Composition
//!
//! `Node` offers builder methods and operators:
//!
//! * `a >> b` sequence, flattened with neighbouring sequences
//! * `a | b` ordered choice, flattened with neighbouring choices
//! * `-a` optional
//! * `!a` negative lookahead
//! * `a % d` one or more `a` separated by `d`

use std::fmt;
use std::ops::{BitOr, Neg, Not, Rem, Shr};
use std::sync::Arc;

use strum::Display;
use thiserror::Error;

use super::attribute::{Shape, Value};
use super::combinators::{
    Action, Alternation, Expect, Lexeme, NoCase, Omit, Optional, Raw, Repeat, Sequence, Skip,
    StringView,
};
use super::context::{ActionContext, Context};
use super::primitives::{CharParser, Literal};
use super::rule::Validation;
use crate::error::GrammarError;

pub type ParseResult<O> = Result<(usize, O), ParseError>;

/// Scope of a commit marker placed between two sequence elements.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum Commit {
    /// Failure after the marker fails the nearest enclosing alternation.
    Alternative,
    /// Failure after the marker fails the whole parse.
    Parse,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display)]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    Sequence,
    Alternation,
    Optional,
    Repeat,
    Expect,
    Lexeme,
    NoCase,
    Skip,
    Raw,
    StringView,
    Omit,
    Action,
    Switch,
    Rule,
    Symbols,
    Char,
    String,
    Literal,
    Whitespace,
    Bool,
    UInt,
    Int,
    Float,
    Eps,
    Eoi,
    Attr,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ParseError {
    #[error("Unexpected input: expected {expected} at position {position}")]
    Unexpected { expected: String, position: usize },
    #[error("Unexpected EOF: expected {expected} at position {position}")]
    UnexpectedEOF { expected: String, position: usize },
    #[error("No alternative matched at position {position}")]
    NoAlternative { position: usize },
    #[error("Rejected by semantic action at position {position}")]
    Rejected { position: usize },
    #[error("Expected {expected} here at position {position}")]
    Expectation {
        expected: String,
        position: usize,
        scope: Commit,
    },
    #[error("Rule nesting exceeded {limit} at position {position}")]
    DepthExceeded { limit: usize, position: usize },
    #[error("Symbol table payload is {found}, not {expected}")]
    SymbolTypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl ParseError {
    pub fn get_position(&self) -> usize {
        match self {
            ParseError::Unexpected { position, .. }
            | ParseError::UnexpectedEOF { position, .. }
            | ParseError::NoAlternative { position }
            | ParseError::Rejected { position }
            | ParseError::Expectation { position, .. }
            | ParseError::DepthExceeded { position, .. } => *position,
            ParseError::SymbolTypeMismatch { .. } => 0,
        }
    }

    /// Fatal errors end the whole parse; nothing backtracks over them.
    pub fn is_fatal(&self) -> bool {
        match self {
            ParseError::Expectation { scope, .. } => *scope == Commit::Parse,
            ParseError::DepthExceeded { .. } | ParseError::SymbolTypeMismatch { .. } => true,
            _ => false,
        }
    }

    /// Errors that stop backtracking in the current alternation or beyond.
    pub fn is_committed(&self) -> bool {
        matches!(self, ParseError::Expectation { .. }) || self.is_fatal()
    }
}

/// A grammar node.
///
/// Implementations hold no per-parse state; everything that changes during a
/// parse lives in the [`Context`].
pub trait Parser: Send + Sync {
    /// Matches the node at `pos`.
    ///
    /// # Arguments
    ///
    /// * `ctx` - The state of the running parse
    /// * `pos` - The input position to start from
    ///
    /// # Returns
    ///
    /// * `ParseResult<Value>` - The position after the match and the produced
    ///   attribute, or the reason the node did not match. A failed node leaves
    ///   nothing to undo; the caller resumes from its own position.
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value>;

    fn kind(&self) -> NodeKind;

    /// Attribute shape, computed when the node was built.
    fn shape(&self) -> &Shape;

    /// Short human-readable form used in "expected ..." messages.
    fn describe(&self) -> String;

    fn children(&self) -> Vec<&Node> {
        Vec::new()
    }

    /// Construction-time checks run when a grammar is built.
    fn validate(&self, _scope: &mut Validation<'_>) -> Result<(), GrammarError> {
        Ok(())
    }

    fn as_sequence(&self) -> Option<&Sequence> {
        None
    }

    fn as_alternation(&self) -> Option<&Alternation> {
        None
    }
}

/// Shared handle to a grammar node. Cloning shares the node.
#[derive(Clone)]
pub struct Node(Arc<dyn Parser>);

impl Node {
    pub fn new<P: Parser + 'static>(parser: P) -> Self {
        Node(Arc::new(parser))
    }

    pub fn ptr_eq(&self, other: &Node) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    /// Identity of the shared node, stable for its lifetime.
    pub(crate) fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }

    pub fn then(self, next: impl Into<Node>) -> Node {
        Sequence::join(self, next.into(), None)
    }

    /// Sequence continuation whose failure is committed to `scope`.
    pub fn then_commit(self, next: impl Into<Node>, scope: Commit) -> Node {
        Sequence::join(self, next.into(), Some(scope))
    }

    /// `self` followed by `next`, where failing `next` fails the whole parse.
    pub fn expect_then(self, next: impl Into<Node>) -> Node {
        self.then_commit(next, Commit::Parse)
    }

    pub fn or(self, other: impl Into<Node>) -> Node {
        Alternation::join(self, other.into())
    }

    pub fn opt(self) -> Node {
        Node::new(Optional::new(self))
    }

    pub fn zero_plus(self) -> Node {
        Node::new(Repeat::new(self, 0, None, None))
    }

    pub fn one_plus(self) -> Node {
        Node::new(Repeat::new(self, 1, None, None))
    }

    pub fn repeat(self, count: usize) -> Node {
        Node::new(Repeat::new(self, count, Some(count), None))
    }

    pub fn repeat_range(self, min: usize, max: usize) -> Node {
        Node::new(Repeat::new(self, min, Some(max), None))
    }

    pub fn separated_by(self, delimiter: impl Into<Node>) -> Node {
        Node::new(Repeat::new(self, 1, None, Some(delimiter.into())))
    }

    pub fn action<F>(self, action: F) -> Node
    where
        F: Fn(&mut ActionContext<'_, '_>) + Send + Sync + 'static,
    {
        Node::new(Action::new(self, Arc::new(action)))
    }

    pub fn omit(self) -> Node {
        Node::new(Omit::new(self))
    }

    pub fn raw(self) -> Node {
        Node::new(Raw::new(self))
    }

    pub fn string_view(self) -> Node {
        Node::new(StringView::new(self))
    }

    pub fn lexeme(self) -> Node {
        Node::new(Lexeme::new(self))
    }

    pub fn no_case(self) -> Node {
        Node::new(NoCase::new(self))
    }

    pub fn skip(self, skipper: impl Into<Node>) -> Node {
        Node::new(Skip::new(self, Some(skipper.into())))
    }

    pub fn and_pred(self) -> Node {
        Node::new(Expect::new(self, false))
    }

    pub fn not_pred(self) -> Node {
        Node::new(Expect::new(self, true))
    }
}

impl Parser for Node {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        self.0.parse(ctx, pos)
    }

    fn kind(&self) -> NodeKind {
        self.0.kind()
    }

    fn shape(&self) -> &Shape {
        self.0.shape()
    }

    fn describe(&self) -> String {
        self.0.describe()
    }

    fn children(&self) -> Vec<&Node> {
        self.0.children()
    }

    fn validate(&self, scope: &mut Validation<'_>) -> Result<(), GrammarError> {
        self.0.validate(scope)
    }

    fn as_sequence(&self) -> Option<&Sequence> {
        self.0.as_sequence()
    }

    fn as_alternation(&self) -> Option<&Alternation> {
        self.0.as_alternation()
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind(), self.describe())
    }
}

impl From<char> for Node {
    fn from(c: char) -> Self {
        Node::new(CharParser::literal(c))
    }
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::new(Literal::new(text, false))
    }
}

impl<R: Into<Node>> Shr<R> for Node {
    type Output = Node;

    fn shr(self, rhs: R) -> Node {
        self.then(rhs)
    }
}

impl<R: Into<Node>> BitOr<R> for Node {
    type Output = Node;

    fn bitor(self, rhs: R) -> Node {
        self.or(rhs)
    }
}

impl<R: Into<Node>> Rem<R> for Node {
    type Output = Node;

    fn rem(self, rhs: R) -> Node {
        self.separated_by(rhs)
    }
}

impl Neg for Node {
    type Output = Node;

    fn neg(self) -> Node {
        self.opt()
    }
}

impl Not for Node {
    type Output = Node;

    fn not(self) -> Node {
        self.not_pred()
    }
}
