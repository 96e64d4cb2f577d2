//! # Parse Context
//!
//! [`Context`] is the state threaded through one parse: the input, the rule
//! frames of the active rule invocations, caller-supplied globals, the error
//! handler, the symbol journal and the current skipper. It is created when a
//! parse starts and dropped when it returns, which is also what reverts every
//! symbol-table change made by semantic actions.
//!
//! [`ActionContext`] is the view handed to semantic actions, predicates,
//! switch discriminants and computed rule parameters.

use std::any::Any;
use std::ops::Range;

use super::attribute::{Attribute, Value};
use super::core::{Node, ParseError, Parser};
use super::error_handling::{dispatch, ErrorHandler, Location, Severity, TracingErrorHandler};
use super::input::{fold_case, Input};
use super::journal::SymbolJournal;
use super::rule::{CallbackSink, Grammar, RuleId};
use super::symbols::Symbols;
use crate::config::ParseOptions;

/// Per-invocation state of a rule.
#[derive(Debug, Clone, Default)]
pub struct RuleFrame {
    pub(crate) rule: Option<RuleId>,
    pub(crate) locals: Value,
    pub(crate) params: Vec<Value>,
    /// Set once an action assigns the rule's own value.
    pub(crate) val: Option<Value>,
}

impl RuleFrame {
    pub(crate) fn new(rule: RuleId, locals: Value, params: Vec<Value>) -> Self {
        Self {
            rule: Some(rule),
            locals,
            params,
            val: None,
        }
    }
}

enum HandlerSlot<'a> {
    Borrowed(&'a mut dyn ErrorHandler),
    Default(TracingErrorHandler),
}

impl<'a> HandlerSlot<'a> {
    fn get(&mut self) -> &mut (dyn ErrorHandler + 'a) {
        match self {
            HandlerSlot::Borrowed(handler) => &mut **handler,
            HandlerSlot::Default(handler) => handler,
        }
    }
}

pub(crate) struct ContextParts<'a> {
    pub input: &'a dyn Input,
    pub grammar: &'a Grammar,
    pub options: ParseOptions,
    pub globals: Option<&'a mut (dyn Any + 'static)>,
    pub handler: Option<&'a mut dyn ErrorHandler>,
    pub callbacks: Option<&'a mut dyn CallbackSink>,
    pub skipper: Option<Node>,
}

/// State of one running parse.
///
/// Nodes read the input and the active modes (skipper, `no_case`) through it,
/// and rule references push and pop their frames on it. Dropping it discards
/// the per-parse symbol changes.
pub struct Context<'a> {
    input: &'a dyn Input,
    grammar: &'a Grammar,
    options: ParseOptions,
    root: RuleFrame,
    frames: Vec<RuleFrame>,
    globals: Option<&'a mut (dyn Any + 'static)>,
    handler: HandlerSlot<'a>,
    callbacks: Option<&'a mut dyn CallbackSink>,
    journal: SymbolJournal,
    skipper: Option<Node>,
    skipping: bool,
    no_case: bool,
    depth: usize,
}

impl<'a> Context<'a> {
    pub(crate) fn new(parts: ContextParts<'a>) -> Self {
        let handler = match parts.handler {
            Some(handler) => HandlerSlot::Borrowed(handler),
            None => HandlerSlot::Default(TracingErrorHandler),
        };
        Self {
            input: parts.input,
            grammar: parts.grammar,
            options: parts.options,
            root: RuleFrame::default(),
            frames: Vec::new(),
            globals: parts.globals,
            handler,
            callbacks: parts.callbacks,
            journal: SymbolJournal::new(),
            skipper: parts.skipper,
            skipping: true,
            no_case: false,
            depth: 0,
        }
    }

    pub fn input(&self) -> &'a dyn Input {
        self.input
    }

    pub fn grammar(&self) -> &'a Grammar {
        self.grammar
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn end(&self) -> usize {
        self.input.end()
    }

    pub fn next_char(&self, pos: usize) -> Option<(char, usize)> {
        self.input.next_char(pos)
    }

    pub fn at_end(&self, pos: usize) -> bool {
        self.input.next_char(pos).is_none()
    }

    /// Ordinary failure at `pos`, distinguishing the end of input.
    pub fn fail(&self, expected: impl Into<String>, pos: usize) -> ParseError {
        let expected = expected.into();
        if self.at_end(pos) {
            ParseError::UnexpectedEOF {
                expected,
                position: pos,
            }
        } else {
            ParseError::Unexpected {
                expected,
                position: pos,
            }
        }
    }

    pub fn no_case(&self) -> bool {
        self.no_case
    }

    /// Sets case-insensitive matching and returns the previous setting.
    pub fn set_no_case(&mut self, no_case: bool) -> bool {
        std::mem::replace(&mut self.no_case, no_case)
    }

    pub fn fold(&self, c: char) -> char {
        if self.no_case {
            fold_case(c)
        } else {
            c
        }
    }

    pub fn chars_match(&self, expected: char, found: char) -> bool {
        expected == found || (self.no_case && fold_case(expected) == fold_case(found))
    }

    /// Matches `text` at `pos`, returning the position after it.
    pub fn match_text(&self, text: &str, pos: usize) -> Option<usize> {
        let mut current = pos;
        for expected in text.chars() {
            let (found, next) = self.next_char(current)?;
            if !self.chars_match(expected, found) {
                return None;
            }
            current = next;
        }
        Some(current)
    }

    /// Replaces the active skipper and returns the previous one.
    pub fn replace_skipper(&mut self, skipper: Option<Node>) -> Option<Node> {
        std::mem::replace(&mut self.skipper, skipper)
    }

    /// Turns skipping on or off without touching the installed skipper.
    /// Returns the previous setting.
    pub fn set_skipping(&mut self, skipping: bool) -> bool {
        std::mem::replace(&mut self.skipping, skipping)
    }

    /// Applies the active skipper repeatedly from `pos`.
    ///
    /// Skipping is disabled while the skipper itself runs.
    pub fn skip(&mut self, pos: usize) -> Result<usize, ParseError> {
        if !self.skipping {
            return Ok(pos);
        }
        let Some(skipper) = self.skipper.take() else {
            return Ok(pos);
        };
        let mut current = pos;
        let outcome = loop {
            match skipper.parse(self, current) {
                Ok((next, _)) if next > current => current = next,
                Ok(_) => break Ok(current),
                Err(err) if err.is_fatal() => break Err(err),
                Err(_) => break Ok(current),
            }
        };
        self.skipper = Some(skipper);
        outcome
    }

    pub(crate) fn enter_rule(&mut self, pos: usize) -> Result<(), ParseError> {
        if self.depth >= self.options.max_depth {
            return Err(ParseError::DepthExceeded {
                limit: self.options.max_depth,
                position: pos,
            });
        }
        self.depth += 1;
        Ok(())
    }

    pub(crate) fn leave_rule(&mut self) {
        self.depth = self.depth.saturating_sub(1);
    }

    pub(crate) fn push_frame(&mut self, frame: RuleFrame) {
        self.frames.push(frame);
    }

    pub(crate) fn pop_frame(&mut self) -> RuleFrame {
        self.frames.pop().unwrap_or_default()
    }

    pub(crate) fn frame(&self) -> &RuleFrame {
        self.frames.last().unwrap_or(&self.root)
    }

    pub(crate) fn frame_mut(&mut self) -> &mut RuleFrame {
        match self.frames.last_mut() {
            Some(frame) => frame,
            None => &mut self.root,
        }
    }

    /// Value assigned by an action outside of any rule.
    pub(crate) fn take_root_val(&mut self) -> Option<Value> {
        self.root.val.take()
    }

    pub(crate) fn journal(&self) -> &SymbolJournal {
        &self.journal
    }

    pub(crate) fn journal_mut(&mut self) -> &mut SymbolJournal {
        &mut self.journal
    }

    pub(crate) fn has_callbacks(&self) -> bool {
        self.callbacks.is_some()
    }

    pub(crate) fn deliver(&mut self, rule: RuleId, name: &str, value: Value) {
        if let Some(sink) = self.callbacks.as_deref_mut() {
            sink.deliver(rule, name, value);
        }
    }

    pub(crate) fn report(&mut self, severity: Severity, offset: usize, message: &str) {
        let location = Location::locate(self.input, offset);
        dispatch(self.handler.get(), severity, location, message);
    }

    /// Ends the parse, discarding the symbol journal. Returns how many tables
    /// had per-parse changes.
    pub(crate) fn finish(self) -> usize {
        self.journal.len()
    }
}

/// What a semantic action sees when it runs.
pub struct ActionContext<'c, 'a> {
    ctx: &'c mut Context<'a>,
    attr: Value,
    span: Range<usize>,
    pass: bool,
}

impl<'c, 'a> ActionContext<'c, 'a> {
    pub(crate) fn new(ctx: &'c mut Context<'a>, attr: Value, span: Range<usize>) -> Self {
        Self {
            ctx,
            attr,
            span,
            pass: true,
        }
    }

    pub(crate) fn finish(self) -> (bool, Value) {
        (self.pass, self.attr)
    }

    /// The enclosing rule's value, if an action assigned one.
    pub fn val(&self) -> Option<&Value> {
        self.ctx.frame().val.as_ref()
    }

    /// The enclosing rule's value, initialised to the default of its declared
    /// attribute on first access.
    pub fn val_mut(&mut self) -> &mut Value {
        if self.ctx.frame().val.is_none() {
            let grammar = self.ctx.grammar();
            let initial = match self.ctx.frame().rule {
                Some(rule) => grammar.rule_shape(rule).map(|s| s.default_value()),
                None => Some(grammar.root().shape().default_value()),
            };
            self.ctx.frame_mut().val = Some(initial.unwrap_or_default());
        }
        self.ctx.frame_mut().val.get_or_insert_with(Value::default)
    }

    pub fn set_val(&mut self, value: impl Into<Value>) {
        self.ctx.frame_mut().val = Some(value.into());
    }

    /// Attribute of the parser this action is attached to.
    pub fn attr(&self) -> &Value {
        &self.attr
    }

    pub fn attr_mut(&mut self) -> &mut Value {
        &mut self.attr
    }

    pub fn attr_as<T: Attribute>(&self) -> Option<T> {
        T::from_value(self.attr.clone())
    }

    pub fn set_attr(&mut self, value: impl Into<Value>) {
        self.attr = value.into();
    }

    /// Span matched by the parser this action is attached to.
    pub fn where_(&self) -> Range<usize> {
        self.span.clone()
    }

    pub fn matched_text(&self) -> Option<&str> {
        self.ctx.input().text(self.span.clone())
    }

    pub fn begin(&self) -> usize {
        0
    }

    pub fn end(&self) -> usize {
        self.ctx.end()
    }

    pub fn pass(&self) -> bool {
        self.pass
    }

    /// Setting `false` makes the attached parser fail after the action.
    pub fn set_pass(&mut self, pass: bool) {
        self.pass = pass;
    }

    pub fn locals(&self) -> &Value {
        &self.ctx.frame().locals
    }

    pub fn locals_mut(&mut self) -> &mut Value {
        &mut self.ctx.frame_mut().locals
    }

    pub fn params(&self) -> &[Value] {
        &self.ctx.frame().params
    }

    pub fn param_as<T: Attribute>(&self, index: usize) -> Option<T> {
        self.params().get(index).cloned().and_then(T::from_value)
    }

    pub fn globals<G: Any>(&self) -> Option<&G> {
        self.ctx.globals.as_deref()?.downcast_ref::<G>()
    }

    pub fn globals_mut<G: Any>(&mut self) -> Option<&mut G> {
        self.ctx.globals.as_deref_mut()?.downcast_mut::<G>()
    }

    pub fn error_handler(&mut self) -> &mut (dyn ErrorHandler + 'a) {
        self.ctx.handler.get()
    }

    pub fn report_error(&mut self, message: &str) {
        self.ctx.report(Severity::Error, self.span.start, message);
    }

    pub fn report_error_at(&mut self, offset: usize, message: &str) {
        self.ctx.report(Severity::Error, offset, message);
    }

    pub fn report_warning(&mut self, message: &str) {
        self.ctx.report(Severity::Warning, self.span.start, message);
    }

    pub fn report_warning_at(&mut self, offset: usize, message: &str) {
        self.ctx.report(Severity::Warning, offset, message);
    }

    /// Adds `key` to `table` for the rest of this parse only.
    pub fn insert_symbol<T: Attribute + Clone>(&mut self, table: &Symbols<T>, key: &str, value: T) {
        let result = table.insert_for_parse(self.ctx, key, value);
        self.check_symbols(result);
    }

    /// Hides `key` from `table` for the rest of this parse only.
    pub fn remove_symbol<T: Attribute + Clone>(&mut self, table: &Symbols<T>, key: &str) {
        let result = table.remove_for_parse(self.ctx, key);
        self.check_symbols(result);
    }

    /// Hides every entry of `table` for the rest of this parse only.
    pub fn clear_symbols<T: Attribute + Clone>(&mut self, table: &Symbols<T>) {
        let result = table.clear_for_parse(self.ctx);
        self.check_symbols(result);
    }

    /// Looks `key` up in `table` as the current parse sees it.
    pub fn find_symbol<T: Attribute + Clone>(&mut self, table: &Symbols<T>, key: &str) -> Option<T> {
        match table.find_for_parse(self.ctx, key) {
            Ok(found) => found,
            Err(err) => {
                self.check_symbols::<()>(Err(err));
                None
            }
        }
    }

    fn check_symbols<R>(&mut self, result: Result<R, ParseError>) {
        if let Err(err) = result {
            tracing::error!(target: "attrparse::symbols", error = ?err, position = self.span.start, "Symbol table payload mismatch");
            let message = err.to_string();
            self.report_error(&message);
            self.pass = false;
        }
    }
}
