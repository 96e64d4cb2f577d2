//! # Combinators
//!
//! Nodes that compose other nodes: sequence, alternation, optional, repeats,
//! lookahead, directive wrappers (lexeme, no_case, skip, raw, string_view,
//! omit), semantic actions and switch.
//!
//! Backtracking is positional: every node receives its entry position by
//! value, and a failed child simply leaves the caller holding that position.

use std::sync::Arc;

use super::attribute::{resolve, Shape, Value};
use super::context::{ActionContext, Context};
use super::core::{Commit, Node, NodeKind, ParseError, ParseResult, Parser};
use super::input::collect_text;
use super::rule::Validation;
use crate::error::GrammarError;

pub type SemanticAction = Arc<dyn Fn(&mut ActionContext<'_, '_>) + Send + Sync>;

/// Produces the switch discriminant from the current context.
pub type Discriminant = Arc<dyn Fn(&ActionContext<'_, '_>) -> Value + Send + Sync>;

fn describe_list(nodes: impl Iterator<Item = String>, separator: &str) -> String {
    nodes.collect::<Vec<_>>().join(separator)
}

fn shapes<'n>(nodes: impl Iterator<Item = &'n Node>) -> Vec<Shape> {
    nodes.map(|node| node.shape().clone()).collect()
}

/// Matches its elements one after another.
///
/// The skipper runs before every element. Each element may carry a commit
/// marker; from the first marked element on, an ordinary failure is turned
/// into a committed one with that marker's scope.
///
/// The attribute is a tuple of the element attributes, without the
/// attribute-less ones.
pub struct Sequence {
    elements: Vec<(Option<Commit>, Node)>,
    shape: Shape,
}

impl Sequence {
    /// Creates a sequence.
    ///
    /// # Arguments
    ///
    /// * `elements` - The elements in match order, each with an optional
    ///   commit marker placed before it
    ///
    /// # Returns
    ///
    /// * `Sequence` - The sequence node, its shape already resolved
    pub fn new(elements: Vec<(Option<Commit>, Node)>) -> Self {
        let shape = resolve(NodeKind::Sequence, &shapes(elements.iter().map(|(_, node)| node)));
        Self { elements, shape }
    }

    pub(crate) fn join(left: Node, right: Node, commit: Option<Commit>) -> Node {
        let mut elements = match left.as_sequence() {
            Some(seq) => seq.elements.clone(),
            None => vec![(None, left)],
        };
        match right.as_sequence() {
            Some(seq) => {
                for (i, (marker, node)) in seq.elements.iter().enumerate() {
                    let marker = if i == 0 { commit.or(*marker) } else { *marker };
                    elements.push((marker, node.clone()));
                }
            }
            None => elements.push((commit, right)),
        }
        Node::new(Sequence::new(elements))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}

/// Wraps a failure that happened past a commit marker.
fn committed_failure(
    err: ParseError,
    committed: Option<Commit>,
    element: &Node,
    position: usize,
) -> ParseError {
    match (committed, err) {
        (Some(Commit::Parse), ParseError::Expectation { expected, position, .. }) => {
            ParseError::Expectation {
                expected,
                position,
                scope: Commit::Parse,
            }
        }
        (_, err) if err.is_committed() => err,
        (Some(scope), _) => ParseError::Expectation {
            expected: element.describe(),
            position,
            scope,
        },
        (None, err) => err,
    }
}

impl Parser for Sequence {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let mut current = pos;
        let mut values = Vec::new();
        let mut committed: Option<Commit> = None;

        for (marker, element) in &self.elements {
            committed = match (committed, *marker) {
                (Some(Commit::Parse), _) | (_, Some(Commit::Parse)) => Some(Commit::Parse),
                (previous, marker) => marker.or(previous),
            };
            let start = ctx.skip(current)?;
            match element.parse(ctx, start) {
                Ok((next, value)) => {
                    if !element.shape().is_nothing() {
                        values.push(value);
                    }
                    current = next;
                }
                Err(err) => return Err(committed_failure(err, committed, element, start)),
            }
        }

        let value = if self.shape.is_nothing() {
            Value::None
        } else {
            Value::Tuple(values)
        };
        Ok((current, value))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Sequence
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn describe(&self) -> String {
        describe_list(
            self.elements.iter().map(|(marker, node)| match marker {
                Some(Commit::Parse) => format!("> {}", node.describe()),
                Some(Commit::Alternative) => format!(">= {}", node.describe()),
                None => node.describe(),
            }),
            " >> ",
        )
    }

    fn children(&self) -> Vec<&Node> {
        self.elements.iter().map(|(_, node)| node).collect()
    }

    fn as_sequence(&self) -> Option<&Sequence> {
        Some(self)
    }
}

/// Ordered choice: the first branch that matches wins.
///
/// Every branch starts at the alternation's own entry position. A branch that
/// fails past an alternative-scoped commit stops the search.
pub struct Alternation {
    branches: Vec<Node>,
    slots: Vec<Option<usize>>,
    shape: Shape,
}

impl Alternation {
    /// Creates an alternation over `branches`, tried in order.
    pub fn new(branches: Vec<Node>) -> Self {
        let branch_shapes = shapes(branches.iter());
        let shape = resolve(NodeKind::Alternation, &branch_shapes);
        let slots = Shape::union_slots(&branch_shapes);
        Self {
            branches,
            slots,
            shape,
        }
    }

    pub(crate) fn join(left: Node, right: Node) -> Node {
        let mut branches = match left.as_alternation() {
            Some(alt) => alt.branches.clone(),
            None => vec![left],
        };
        match right.as_alternation() {
            Some(alt) => branches.extend(alt.branches.iter().cloned()),
            None => branches.push(right),
        }
        Node::new(Alternation::new(branches))
    }
}

impl Parser for Alternation {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        for (branch, node) in self.branches.iter().enumerate() {
            match node.parse(ctx, pos) {
                Ok((next, value)) => {
                    let slot = self.slots.get(branch).copied().flatten();
                    return Ok((next, self.shape.tag_branch(slot, value)));
                }
                Err(err) if err.is_fatal() => return Err(err),
                Err(ParseError::Expectation {
                    expected, position, ..
                }) => {
                    tracing::debug!(target: "attrparse::parse", branch, position, "Committed branch failed");
                    return Err(ParseError::Unexpected { expected, position });
                }
                Err(_) => continue,
            }
        }
        Err(ParseError::NoAlternative { position: pos })
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Alternation
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn describe(&self) -> String {
        describe_list(self.branches.iter().map(|node| node.describe()), " | ")
    }

    fn children(&self) -> Vec<&Node> {
        self.branches.iter().collect()
    }

    fn as_alternation(&self) -> Option<&Alternation> {
        Some(self)
    }
}

/// Zero or one match of its child. Never fails on an ordinary failure.
pub struct Optional {
    child: Node,
    shape: Shape,
}

impl Optional {
    pub fn new(child: Node) -> Self {
        let shape = resolve(NodeKind::Optional, &[child.shape().clone()]);
        Self { child, shape }
    }
}

impl Parser for Optional {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        match self.child.parse(ctx, pos) {
            Ok((next, value)) if !self.shape.is_nothing() => {
                Ok((next, Value::Optional(Some(Box::new(value)))))
            }
            Ok((next, _)) => Ok((next, Value::None)),
            Err(err) if err.is_committed() => Err(err),
            Err(err) => {
                tracing::trace!(target: "attrparse::parse", error = ?err, position = pos, "Optional parser did not match");
                let value = if self.shape.is_nothing() {
                    Value::None
                } else {
                    Value::Optional(None)
                };
                Ok((pos, value))
            }
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Optional
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn describe(&self) -> String {
        format!("-({})", self.child.describe())
    }

    fn children(&self) -> Vec<&Node> {
        vec![&self.child]
    }
}

/// Bounded, unbounded and delimited repetition.
pub struct Repeat {
    child: Node,
    min: usize,
    max: Option<usize>,
    delimiter: Option<Node>,
    shape: Shape,
}

impl Repeat {
    /// Creates a repeat.
    ///
    /// # Arguments
    ///
    /// * `child` - The repeated body
    /// * `min` - Matches needed for success
    /// * `max` - Upper bound on matches, `None` for unbounded
    /// * `delimiter` - Parser required between two matches; its attribute is dropped
    ///
    /// # Returns
    ///
    /// * `Repeat` - The repeat node. Bounds are checked when the grammar is built.
    pub fn new(child: Node, min: usize, max: Option<usize>, delimiter: Option<Node>) -> Self {
        let shape = resolve(NodeKind::Repeat, &[child.shape().clone()]);
        Self {
            child,
            min,
            max,
            delimiter,
            shape,
        }
    }
}

impl Parser for Repeat {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let mut items = Vec::new();
        let mut count = 0;
        let mut current = pos;
        let mut last_error = None;

        while self.max.map_or(true, |max| count < max) {
            let mut probe = current;
            if count > 0 {
                if let Some(delimiter) = &self.delimiter {
                    let start = ctx.skip(probe)?;
                    match delimiter.parse(ctx, start) {
                        Ok((next, _)) => probe = next,
                        Err(err) if err.is_committed() => return Err(err),
                        Err(err) => {
                            last_error = Some(err);
                            break;
                        }
                    }
                }
            }

            let start = ctx.skip(probe)?;
            match self.child.parse(ctx, start) {
                Ok((next, value)) => {
                    if !self.shape.is_nothing() {
                        items.push(value);
                    }
                    count += 1;
                    let stalled = next == current;
                    current = next;
                    if stalled && count >= self.min {
                        tracing::trace!(target: "attrparse::repeat", position = current, count, "Repeat made no progress");
                        break;
                    }
                }
                Err(err) if err.is_committed() => return Err(err),
                Err(err) => {
                    tracing::trace!(target: "attrparse::repeat", error = ?err, position = start, count, "Repeat stopped");
                    last_error = Some(err);
                    break;
                }
            }
        }

        if count < self.min {
            return Err(last_error.unwrap_or_else(|| ctx.fail(self.child.describe(), current)));
        }

        let value = if self.shape.is_nothing() {
            Value::None
        } else {
            Value::Seq(items)
        };
        Ok((current, value))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Repeat
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn describe(&self) -> String {
        let child = self.child.describe();
        match (&self.delimiter, self.min, self.max) {
            (Some(delimiter), _, _) => format!("({child}) % ({})", delimiter.describe()),
            (None, 0, None) => format!("*({child})"),
            (None, 1, None) => format!("+({child})"),
            (None, min, Some(max)) if min == max => format!("repeat({min})[{child}]"),
            (None, min, Some(max)) => format!("repeat({min}, {max})[{child}]"),
            (None, min, None) => format!("repeat({min}, inf)[{child}]"),
        }
    }

    fn children(&self) -> Vec<&Node> {
        let mut children = vec![&self.child];
        if let Some(delimiter) = &self.delimiter {
            children.push(delimiter);
        }
        children
    }

    fn validate(&self, _scope: &mut Validation<'_>) -> Result<(), GrammarError> {
        match self.max {
            Some(max) if max < self.min => Err(GrammarError::InvalidRepeatBounds { min: self.min, max }),
            _ => Ok(()),
        }
    }
}

/// Lookahead; consumes nothing. With `negate` set it succeeds exactly when
/// the child fails.
pub struct Expect {
    child: Node,
    negate: bool,
    shape: Shape,
}

impl Expect {
    pub fn new(child: Node, negate: bool) -> Self {
        let shape = resolve(NodeKind::Expect, &[child.shape().clone()]);
        Self { child, negate, shape }
    }
}

impl Parser for Expect {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        match (self.child.parse(ctx, pos), self.negate) {
            (Ok(_), false) => Ok((pos, Value::None)),
            (Ok(_), true) => Err(ctx.fail(self.describe(), pos)),
            (Err(err), _) if err.is_committed() => Err(err),
            (Err(_), true) => Ok((pos, Value::None)),
            (Err(_), false) => Err(ctx.fail(self.child.describe(), pos)),
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Expect
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn describe(&self) -> String {
        let prefix = if self.negate { "!" } else { "&" };
        format!("{prefix}({})", self.child.describe())
    }

    fn children(&self) -> Vec<&Node> {
        vec![&self.child]
    }
}

/// Disables the skipper inside its child.
pub struct Lexeme {
    child: Node,
    shape: Shape,
}

impl Lexeme {
    pub fn new(child: Node) -> Self {
        let shape = resolve(NodeKind::Lexeme, &[child.shape().clone()]);
        Self { child, shape }
    }
}

impl Parser for Lexeme {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let previous = ctx.set_skipping(false);
        let result = self.child.parse(ctx, pos);
        ctx.set_skipping(previous);
        result
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Lexeme
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn describe(&self) -> String {
        format!("lexeme[{}]", self.child.describe())
    }

    fn children(&self) -> Vec<&Node> {
        vec![&self.child]
    }
}

/// Enables case-insensitive matching inside its child.
pub struct NoCase {
    child: Node,
    shape: Shape,
}

impl NoCase {
    pub fn new(child: Node) -> Self {
        let shape = resolve(NodeKind::NoCase, &[child.shape().clone()]);
        Self { child, shape }
    }
}

impl Parser for NoCase {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let previous = ctx.set_no_case(true);
        let result = self.child.parse(ctx, pos);
        ctx.set_no_case(previous);
        result
    }

    fn kind(&self) -> NodeKind {
        NodeKind::NoCase
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn describe(&self) -> String {
        format!("no_case[{}]", self.child.describe())
    }

    fn children(&self) -> Vec<&Node> {
        vec![&self.child]
    }
}

/// Installs `skipper` inside its child. Without a skipper it re-enables the
/// one suspended by an enclosing `lexeme`.
pub struct Skip {
    child: Node,
    skipper: Option<Node>,
    shape: Shape,
}

impl Skip {
    pub fn new(child: Node, skipper: Option<Node>) -> Self {
        let shape = resolve(NodeKind::Skip, &[child.shape().clone()]);
        Self {
            child,
            skipper,
            shape,
        }
    }
}

impl Parser for Skip {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let previous_skipper = self
            .skipper
            .as_ref()
            .map(|skipper| ctx.replace_skipper(Some(skipper.clone())));
        let previous_skipping = ctx.set_skipping(true);

        let result = self.child.parse(ctx, pos);

        ctx.set_skipping(previous_skipping);
        if let Some(previous) = previous_skipper {
            ctx.replace_skipper(previous);
        }
        result
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Skip
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn describe(&self) -> String {
        match &self.skipper {
            Some(skipper) => format!("skip({})[{}]", skipper.describe(), self.child.describe()),
            None => format!("skip[{}]", self.child.describe()),
        }
    }

    fn children(&self) -> Vec<&Node> {
        let mut children = vec![&self.child];
        if let Some(skipper) = &self.skipper {
            children.push(skipper);
        }
        children
    }
}

/// Produces the matched offset range instead of the child's attribute.
pub struct Raw {
    child: Node,
    shape: Shape,
}

impl Raw {
    pub fn new(child: Node) -> Self {
        let shape = resolve(NodeKind::Raw, &[child.shape().clone()]);
        Self { child, shape }
    }
}

impl Parser for Raw {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let (next, _) = self.child.parse(ctx, pos)?;
        Ok((next, Value::Range(pos..next)))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Raw
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn describe(&self) -> String {
        format!("raw[{}]", self.child.describe())
    }

    fn children(&self) -> Vec<&Node> {
        vec![&self.child]
    }
}

/// Produces the matched text. Needs contiguous input.
pub struct StringView {
    child: Node,
    shape: Shape,
}

impl StringView {
    pub fn new(child: Node) -> Self {
        let shape = resolve(NodeKind::StringView, &[child.shape().clone()]);
        Self { child, shape }
    }
}

impl Parser for StringView {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let (next, _) = self.child.parse(ctx, pos)?;
        let input = ctx.input();
        let text = match input.text(pos..next) {
            Some(text) => text.to_string(),
            None => collect_text(input, pos..next),
        };
        Ok((next, Value::Str(text)))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::StringView
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn describe(&self) -> String {
        format!("string_view[{}]", self.child.describe())
    }

    fn children(&self) -> Vec<&Node> {
        vec![&self.child]
    }

    fn validate(&self, scope: &mut Validation<'_>) -> Result<(), GrammarError> {
        scope.require_contiguous();
        Ok(())
    }
}

/// Matches its child and drops the attribute.
pub struct Omit {
    child: Node,
    shape: Shape,
}

impl Omit {
    pub fn new(child: Node) -> Self {
        let shape = resolve(NodeKind::Omit, &[child.shape().clone()]);
        Self { child, shape }
    }
}

impl Parser for Omit {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let (next, _) = self.child.parse(ctx, pos)?;
        Ok((next, Value::None))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Omit
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn describe(&self) -> String {
        format!("omit[{}]", self.child.describe())
    }

    fn children(&self) -> Vec<&Node> {
        vec![&self.child]
    }
}

/// Runs a semantic action after its child succeeds.
///
/// The action sees the child's attribute through [`ActionContext::attr`] and
/// may replace it or reject the match.
pub struct Action {
    child: Node,
    action: SemanticAction,
    shape: Shape,
}

impl Action {
    pub fn new(child: Node, action: SemanticAction) -> Self {
        let shape = resolve(NodeKind::Action, &[child.shape().clone()]);
        Self {
            child,
            action,
            shape,
        }
    }
}

impl Parser for Action {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let (next, value) = self.child.parse(ctx, pos)?;
        let mut action_ctx = ActionContext::new(ctx, value, pos..next);
        (self.action)(&mut action_ctx);
        match action_ctx.finish() {
            (true, value) => Ok((next, value)),
            (false, _) => {
                tracing::trace!(target: "attrparse::parse", position = pos, "Semantic action rejected match");
                Err(ParseError::Rejected { position: pos })
            }
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Action
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn describe(&self) -> String {
        self.child.describe()
    }

    fn children(&self) -> Vec<&Node> {
        vec![&self.child]
    }
}

enum SwitchOn {
    Fixed(Value),
    Computed(Discriminant),
}

/// Picks the first case whose key equals the discriminant.
pub struct Switch {
    on: SwitchOn,
    cases: Vec<(Value, Node)>,
    slots: Vec<Option<usize>>,
    shape: Shape,
}

impl Switch {
    pub fn new(on: impl Into<Value>) -> Self {
        Self::with_on(SwitchOn::Fixed(on.into()), Vec::new())
    }

    pub fn computed<F>(on: F) -> Self
    where
        F: Fn(&ActionContext<'_, '_>) -> Value + Send + Sync + 'static,
    {
        Self::with_on(SwitchOn::Computed(Arc::new(on)), Vec::new())
    }

    fn with_on(on: SwitchOn, cases: Vec<(Value, Node)>) -> Self {
        let case_shapes = shapes(cases.iter().map(|(_, node)| node));
        let shape = resolve(NodeKind::Switch, &case_shapes);
        let slots = Shape::union_slots(&case_shapes);
        Self {
            on,
            cases,
            slots,
            shape,
        }
    }

    pub fn case(self, key: impl Into<Value>, node: impl Into<Node>) -> Self {
        let mut cases = self.cases;
        cases.push((key.into(), node.into()));
        Self::with_on(self.on, cases)
    }

    fn discriminant(&self, ctx: &mut Context<'_>, pos: usize) -> Value {
        match &self.on {
            SwitchOn::Fixed(value) => value.clone(),
            SwitchOn::Computed(on) => {
                let view = ActionContext::new(ctx, Value::None, pos..pos);
                on(&view)
            }
        }
    }
}

impl From<Switch> for Node {
    fn from(switch: Switch) -> Self {
        Node::new(switch)
    }
}

impl Parser for Switch {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let key = self.discriminant(ctx, pos);
        let Some((branch, node)) = self
            .cases
            .iter()
            .enumerate()
            .find_map(|(i, (case, node))| (*case == key).then_some((i, node)))
        else {
            return Err(ctx.fail(format!("switch case for {key}"), pos));
        };
        let (next, value) = node.parse(ctx, pos)?;
        let slot = self.slots.get(branch).copied().flatten();
        Ok((next, self.shape.tag_branch(slot, value)))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Switch
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn describe(&self) -> String {
        format!(
            "switch({})",
            describe_list(self.cases.iter().map(|(key, node)| format!("{key} => {}", node.describe())), ", ")
        )
    }

    fn children(&self) -> Vec<&Node> {
        self.cases.iter().map(|(_, node)| node).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::prelude::*;
    use crate::analyzer::rule::Grammar;
    use crate::parse::{parse, prefix_parse, Parse};

    fn run(node: Node, input: &str) -> Option<Value> {
        let grammar = Grammar::new(node).unwrap();
        parse(input, &grammar).unwrap()
    }

    #[test]
    fn test_sequence_collects_attributes() {
        let node = char_('a') >> lit(",") >> uint_();
        assert_eq!(
            node.shape(),
            &Shape::Tuple(vec![Shape::Char, Shape::UInt])
        );
        assert_eq!(
            run(node, "a,12"),
            Some(Value::Tuple(vec![Value::Char('a'), Value::UInt(12)]))
        );
    }

    #[test]
    fn test_sequence_flattens() {
        let node = (char_('a') >> char_('b')) >> (char_('c') >> char_('d'));
        assert_eq!(node.as_sequence().map(Sequence::len), Some(4));
    }

    #[test]
    fn test_alternation_first_match_wins() {
        let node = string("ab") | string("abc");
        let grammar = Grammar::new(node).unwrap();
        let mut pos = 0;
        let value = prefix_parse("abc", &mut pos, &grammar).unwrap();
        assert_eq!(pos, 2);
        assert_eq!(
            value,
            Some(Value::Variant {
                branch: 0,
                value: Box::new(Value::Str("ab".to_string()))
            })
        );
    }

    #[test]
    fn test_optional_never_fails() {
        assert_eq!(
            run(-char_('x') >> char_('y'), "y"),
            Some(Value::Tuple(vec![Value::Optional(None), Value::Char('y')]))
        );
    }

    #[test]
    fn test_repeat_bounds() {
        let node = digit().repeat_range(2, 3);
        assert_eq!(run(node.clone(), "1"), None);
        assert_eq!(
            run(node.clone(), "123"),
            Some(Value::Seq(vec![Value::Char('1'), Value::Char('2'), Value::Char('3')]))
        );
        assert_eq!(run(node, "1234"), None);
    }

    #[test]
    fn test_delimited_repeat_leaves_trailing_delimiter() {
        let node = uint_() % ',';
        let grammar = Grammar::new(node).unwrap();
        let mut pos = 0;
        let value = prefix_parse("1,2,", &mut pos, &grammar).unwrap();
        assert_eq!(pos, 3);
        assert_eq!(value, Some(Value::Seq(vec![Value::UInt(1), Value::UInt(2)])));
    }

    #[test]
    fn test_repeat_stops_without_progress() {
        assert_eq!(run(eps().zero_plus() >> char_('a'), "a"), Some(Value::Tuple(vec![Value::Char('a')])));
    }

    #[test]
    fn test_lookahead_consumes_nothing() {
        let node = char_('a').and_pred() >> any_char();
        assert_eq!(run(node, "a"), Some(Value::Tuple(vec![Value::Char('a')])));
        let node = !char_('a') >> any_char();
        assert_eq!(run(node.clone(), "a"), None);
        assert_eq!(run(node, "b"), Some(Value::Tuple(vec![Value::Char('b')])));
    }

    #[test]
    fn test_raw_and_string_view() {
        assert_eq!(run(digit().one_plus().raw(), "123"), Some(Value::Range(0..3)));
        assert_eq!(
            run(digit().one_plus().string_view(), "123"),
            Some(Value::Str("123".to_string()))
        );
    }

    #[test]
    fn test_omit_drops_attribute() {
        let node = digit().one_plus().omit() >> char_('x');
        assert_eq!(node.shape(), &Shape::Tuple(vec![Shape::Char]));
        assert_eq!(run(node, "12x"), Some(Value::Tuple(vec![Value::Char('x')])));
    }

    #[test]
    fn test_switch_picks_case() {
        let node: Node = Switch::new(2u64)
            .case(1u64, string("one"))
            .case(2u64, string("two"))
            .into();
        assert_eq!(
            run(node.clone(), "two"),
            Some(Value::Variant {
                branch: 1,
                value: Box::new(Value::Str("two".to_string()))
            })
        );
        assert_eq!(run(node, "one"), None);
    }

    #[test]
    fn test_commit_alternative_fails_the_alternation() {
        let committed = char_('a').then_commit(char_('b'), Commit::Alternative);
        let node = (committed | (char_('a') >> char_('c'))) | string("ac");
        // the first branch commits after 'a', so neither the second branch
        // nor anything else in the same alternation is tried
        assert_eq!(run(node, "ac"), None);

        let inner = char_('a').then_commit(char_('b'), Commit::Alternative) | char_('z');
        let outer = Node::new(Alternation::new(vec![inner, string("ac")]));
        assert!(run(outer, "ac").is_some());
    }

    #[test]
    fn test_attribute_less_branch_makes_the_choice_optional() {
        let node = string("abc") | eps();
        assert_eq!(
            node.shape(),
            &Shape::Optional(Box::new(Shape::Variant(vec![Shape::Str])))
        );
        assert_eq!(
            run(node.clone(), "abc"),
            Some(Value::Optional(Some(Box::new(Value::Variant {
                branch: 0,
                value: Box::new(Value::Str("abc".to_string()))
            }))))
        );
        assert_eq!(run(node, ""), Some(Value::Optional(None)));
    }

    #[test]
    fn test_union_members_are_numbered_without_attribute_less_branches() {
        let node = lit("#") | uint_() | lit("@") | alpha();
        assert_eq!(
            node.shape(),
            &Shape::Optional(Box::new(Shape::Variant(vec![Shape::UInt, Shape::Char])))
        );
        assert_eq!(
            run(node.clone(), "q"),
            Some(Value::Optional(Some(Box::new(Value::Variant {
                branch: 1,
                value: Box::new(Value::Char('q'))
            }))))
        );
        assert_eq!(run(node, "@"), Some(Value::Optional(None)));

        let single = string("x") | string("y").omit();
        assert_eq!(
            single.shape(),
            &Shape::Optional(Box::new(Shape::Variant(vec![Shape::Str])))
        );
    }

    #[test]
    fn test_switch_with_attribute_less_case() {
        let node: Node = Switch::new(1u64)
            .case(0u64, string("zero"))
            .case(1u64, lit("one"))
            .into();
        assert_eq!(
            node.shape(),
            &Shape::Optional(Box::new(Shape::Variant(vec![Shape::Str])))
        );
        assert_eq!(run(node, "one"), Some(Value::Optional(None)));
    }

    #[test]
    fn test_leaf_shapes_agree_with_resolve() {
        let leaves = [
            char_('a'),
            any_char(),
            lit("a"),
            string("a"),
            ws(),
            eol(),
            bool_(),
            uint_(),
            int_(),
            float(),
            eps(),
            eoi(),
        ];
        for leaf in leaves {
            assert_eq!(&resolve(leaf.kind(), &[]), leaf.shape(), "{leaf:?}");
        }
    }

    #[test]
    fn test_skip_directive_applies_only_inside() {
        let node = skip(char_('a') >> char_('b'), ws()) >> char_('c');
        assert!(run(node.clone(), "a   bc").is_some());
        assert_eq!(run(node, "a b c"), None);
    }

    #[test]
    fn test_skip_directive_restores_outer_skipper() {
        let grammar = Grammar::new(
            -skip(char_('x') >> char_('y'), lit("_")) >> char_('a') >> char_('b'),
        )
        .unwrap();
        let run_ws = |input: &str| Parse::new(&grammar).skipper(ws()).run(&input).unwrap();

        // the inner skipper is gone after the directive succeeded
        assert!(run_ws("x_y a b").is_some());
        assert_eq!(run_ws("x_y_a b"), None);
        // and after it failed
        assert!(run_ws(" a  b").is_some());
    }

    #[test]
    fn test_resume_skip_inside_lexeme() {
        let grammar = Grammar::new(lexeme(
            char_('a') >> resume_skip(char_('b') >> char_('c')) >> char_('d'),
        ))
        .unwrap();
        let run_ws = |input: &str| Parse::new(&grammar).skipper(ws()).run(&input).unwrap();

        assert!(run_ws("ab  cd").is_some());
        assert_eq!(run_ws("ab c d"), None);
        assert_eq!(run_ws("a b c d"), None);
    }
}
