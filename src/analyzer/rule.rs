//! # Rules and Grammars
//!
//! Rules are named, possibly recursive grammar nodes. A [`GrammarBuilder`]
//! hands out [`RuleHandle`]s on declaration; a handle can be referenced from
//! any node before the rule is defined, which is how recursion is expressed.
//! `build` checks that every rule is defined exactly once and validates every
//! reachable node, producing an immutable [`Grammar`].
//!
//! ## Invocation
//!
//! Each rule invocation pushes a frame carrying the rule's locals and
//! parameters. The rule's result is the value an action assigned through
//! `val`, or else its definition's attribute converted to the declared shape.
//! A value that does not convert, such as a negative integer for an unsigned
//! rule, fails the match.

use std::collections::HashSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::attribute::{Attribute, Shape, Value};
use super::context::{ActionContext, Context, RuleFrame};
use super::core::{Node, NodeKind, ParseError, ParseResult, Parser};
use crate::error::GrammarError;

static NEXT_BUILDER_ID: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RuleId(usize);

impl RuleId {
    pub fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct BuilderId(u64);

/// Receives the values of callback rules during a callback parse.
pub trait CallbackSink {
    fn deliver(&mut self, rule: RuleId, name: &str, value: Value);
}

impl<F: FnMut(RuleId, &str, Value)> CallbackSink for F {
    fn deliver(&mut self, rule: RuleId, name: &str, value: Value) {
        self(rule, name, value)
    }
}

/// Everything known about a rule before it is defined.
#[derive(Debug, Clone)]
pub struct RuleDecl {
    name: String,
    shape: Shape,
    locals: Value,
    param_count: usize,
    callback: bool,
}

impl RuleDecl {
    pub fn new(name: impl Into<String>, shape: Shape) -> Self {
        Self {
            name: name.into(),
            shape,
            locals: Value::None,
            param_count: 0,
            callback: false,
        }
    }

    /// Rule whose attribute is `T`.
    pub fn typed<T: Attribute>(name: impl Into<String>) -> Self {
        Self::new(name, T::shape())
    }

    /// Rule without an attribute.
    pub fn untyped(name: impl Into<String>) -> Self {
        Self::new(name, Shape::Nothing)
    }

    /// Initial value of the locals slot, copied into every invocation.
    pub fn locals(mut self, initial: impl Into<Value>) -> Self {
        self.locals = initial.into();
        self
    }

    pub fn params(mut self, count: usize) -> Self {
        self.param_count = count;
        self
    }

    /// Deliver this rule's value to the callback sink in callback parses.
    pub fn callback(mut self) -> Self {
        self.callback = true;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }
}

type ComputedParams = Arc<dyn Fn(&ActionContext<'_, '_>) -> Vec<Value> + Send + Sync>;

#[derive(Clone)]
enum ParamSource {
    Fixed(Vec<Value>),
    Computed(ComputedParams),
}

#[derive(Clone)]
pub struct RuleHandle {
    id: RuleId,
    builder: BuilderId,
    name: Arc<str>,
    shape: Shape,
}

impl RuleHandle {
    pub fn id(&self) -> RuleId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn node(&self) -> Node {
        self.reference(ParamSource::Fixed(Vec::new()))
    }

    /// Reference passing fixed parameters.
    pub fn with(&self, params: Vec<Value>) -> Node {
        self.reference(ParamSource::Fixed(params))
    }

    /// Reference computing its parameters from the caller's context.
    pub fn with_computed<F>(&self, params: F) -> Node
    where
        F: Fn(&ActionContext<'_, '_>) -> Vec<Value> + Send + Sync + 'static,
    {
        self.reference(ParamSource::Computed(Arc::new(params)))
    }

    fn reference(&self, params: ParamSource) -> Node {
        Node::new(RuleRef {
            id: self.id,
            builder: self.builder,
            name: Arc::clone(&self.name),
            shape: self.shape.clone(),
            params,
        })
    }
}

impl From<&RuleHandle> for Node {
    fn from(rule: &RuleHandle) -> Self {
        rule.node()
    }
}

impl fmt::Debug for RuleHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RuleHandle({}#{})", self.name, self.id.0)
    }
}

pub struct RuleRef {
    id: RuleId,
    builder: BuilderId,
    name: Arc<str>,
    shape: Shape,
    params: ParamSource,
}

impl Parser for RuleRef {
    fn parse(&self, ctx: &mut Context<'_>, pos: usize) -> ParseResult<Value> {
        let grammar = ctx.grammar();
        let Some(entry) = grammar.entry(self.id) else {
            return Err(ctx.fail(format!("rule '{}'", self.name), pos));
        };

        ctx.enter_rule(pos)?;
        let params = match &self.params {
            ParamSource::Fixed(params) => params.clone(),
            ParamSource::Computed(compute) => {
                let view = ActionContext::new(ctx, Value::None, pos..pos);
                compute(&view)
            }
        };
        let trace = ctx.options().trace;
        if trace {
            tracing::debug!(target: "attrparse::rule", rule = %self.name, position = pos, "Entering rule");
        }

        ctx.push_frame(RuleFrame::new(self.id, entry.decl.locals.clone(), params));
        let result = entry.definition.parse(ctx, pos);
        let frame = ctx.pop_frame();
        ctx.leave_rule();

        match result {
            Ok((next, value)) => {
                let value = match frame.val {
                    Some(assigned) => assigned,
                    None => match value.coerce_to(&self.shape) {
                        Some(value) => value,
                        None => {
                            tracing::warn!(target: "attrparse::rule", rule = %self.name, position = pos, "Attribute did not convert to the declared shape");
                            return Err(ctx.fail(self.name.to_string(), pos));
                        }
                    },
                };
                if trace {
                    tracing::debug!(target: "attrparse::rule", rule = %self.name, position = next, value = %value, "Rule matched");
                }
                if entry.decl.callback && ctx.has_callbacks() {
                    ctx.deliver(self.id, &self.name, value);
                    return Ok((next, Value::None));
                }
                Ok((next, value))
            }
            Err(err) if err.is_committed() => {
                if trace {
                    tracing::debug!(target: "attrparse::rule", rule = %self.name, error = %err, "Rule failed past a commit point");
                }
                Err(err)
            }
            Err(err) => {
                if trace {
                    tracing::debug!(target: "attrparse::rule", rule = %self.name, error = %err, "Rule failed");
                }
                Err(ctx.fail(self.name.to_string(), pos))
            }
        }
    }

    fn kind(&self) -> NodeKind {
        NodeKind::Rule
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn describe(&self) -> String {
        self.name.to_string()
    }

    fn validate(&self, scope: &mut Validation<'_>) -> Result<(), GrammarError> {
        scope.check_rule(self)
    }
}

/// Walk state for grammar validation.
pub struct Validation<'g> {
    builder: BuilderId,
    decls: Vec<&'g RuleDecl>,
    contiguous: bool,
    visited: HashSet<usize>,
}

impl<'g> Validation<'g> {
    fn new(builder: BuilderId, decls: Vec<&'g RuleDecl>) -> Self {
        Self {
            builder,
            decls,
            contiguous: false,
            visited: HashSet::new(),
        }
    }

    /// Marks the grammar as needing contiguous text input.
    pub fn require_contiguous(&mut self) {
        self.contiguous = true;
    }

    fn check_rule(&self, rule: &RuleRef) -> Result<(), GrammarError> {
        let decl = match self.decls.get(rule.id.0) {
            Some(decl) if rule.builder == self.builder => decl,
            _ => {
                return Err(GrammarError::ForeignRule {
                    name: rule.name.to_string(),
                })
            }
        };
        if let ParamSource::Fixed(params) = &rule.params {
            if params.len() != decl.param_count {
                return Err(GrammarError::ParamCount {
                    rule: decl.name.clone(),
                    expected: decl.param_count,
                    found: params.len(),
                });
            }
        }
        Ok(())
    }

    fn walk(&mut self, node: &Node) -> Result<(), GrammarError> {
        if !self.visited.insert(node.addr()) {
            return Ok(());
        }
        node.validate(self)?;
        for child in node.children() {
            self.walk(child)?;
        }
        Ok(())
    }
}

pub(crate) struct RuleEntry {
    pub(crate) decl: RuleDecl,
    pub(crate) definition: Node,
}

pub struct GrammarBuilder {
    id: BuilderId,
    decls: Vec<RuleDecl>,
    definitions: Vec<Option<Node>>,
}

impl Default for GrammarBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl GrammarBuilder {
    pub fn new() -> Self {
        Self {
            id: BuilderId(NEXT_BUILDER_ID.fetch_add(1, Ordering::Relaxed)),
            decls: Vec::new(),
            definitions: Vec::new(),
        }
    }

    pub fn declare(&mut self, decl: RuleDecl) -> RuleHandle {
        let id = RuleId(self.decls.len());
        let handle = RuleHandle {
            id,
            builder: self.id,
            name: Arc::from(decl.name.as_str()),
            shape: decl.shape.clone(),
        };
        self.decls.push(decl);
        self.definitions.push(None);
        handle
    }

    /// Binds `rule` to `definition`. Each rule is defined exactly once.
    pub fn define(&mut self, rule: &RuleHandle, definition: impl Into<Node>) -> Result<(), GrammarError> {
        let definition = definition.into();
        if rule.builder != self.id {
            return Err(GrammarError::ForeignRule {
                name: rule.name.to_string(),
            });
        }
        let (Some(decl), Some(slot)) = (self.decls.get(rule.id.0), self.definitions.get_mut(rule.id.0)) else {
            return Err(GrammarError::ForeignRule {
                name: rule.name.to_string(),
            });
        };
        if slot.is_some() {
            return Err(GrammarError::RuleAlreadyDefined {
                name: decl.name.clone(),
            });
        }
        if !definition.shape().assignable_to(&decl.shape) {
            return Err(GrammarError::IncompatibleRuleAttribute {
                rule: decl.name.clone(),
                declared: decl.shape.to_string(),
                found: definition.shape().to_string(),
            });
        }
        *slot = Some(definition);
        Ok(())
    }

    pub fn build(self, root: impl Into<Node>) -> Result<Grammar, GrammarError> {
        let root = root.into();
        let mut rules = Vec::with_capacity(self.decls.len());
        for (decl, definition) in self.decls.into_iter().zip(self.definitions) {
            let Some(definition) = definition else {
                return Err(GrammarError::UnboundRule { name: decl.name });
            };
            rules.push(RuleEntry { decl, definition });
        }

        let contiguous = {
            let mut scope = Validation::new(self.id, rules.iter().map(|r| &r.decl).collect());
            scope.walk(&root)?;
            for rule in &rules {
                scope.walk(&rule.definition)?;
            }
            scope.contiguous
        };

        tracing::debug!(target: "attrparse::parse", rules = rules.len(), contiguous, "Grammar built");
        Ok(Grammar {
            id: self.id,
            root,
            rules,
            contiguous,
        })
    }
}

/// An immutable, validated grammar. Safe to share between threads.
pub struct Grammar {
    id: BuilderId,
    root: Node,
    rules: Vec<RuleEntry>,
    contiguous: bool,
}

impl Grammar {
    /// Grammar without rules of its own.
    pub fn new(root: impl Into<Node>) -> Result<Self, GrammarError> {
        GrammarBuilder::new().build(root)
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    pub fn rule_name(&self, rule: RuleId) -> Option<&str> {
        self.rules.get(rule.0).map(|r| r.decl.name.as_str())
    }

    pub fn rule_shape(&self, rule: RuleId) -> Option<&Shape> {
        self.rules.get(rule.0).map(|r| &r.decl.shape)
    }

    /// Whether parsing needs contiguous text input (`string_view` is used).
    pub fn requires_contiguous(&self) -> bool {
        self.contiguous
    }

    pub(crate) fn entry(&self, rule: RuleId) -> Option<&RuleEntry> {
        self.rules.get(rule.0)
    }

    /// Validates a skipper supplied at parse time against this grammar.
    /// Returns whether the skipper needs contiguous input.
    pub(crate) fn validate_skipper(&self, skipper: &Node) -> Result<bool, GrammarError> {
        let mut scope = Validation::new(self.id, self.rules.iter().map(|r| &r.decl).collect());
        scope.walk(skipper)?;
        Ok(scope.contiguous)
    }
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("root", &self.root)
            .field(
                "rules",
                &self.rules.iter().map(|r| r.decl.name.as_str()).collect::<Vec<_>>(),
            )
            .finish()
    }
}
