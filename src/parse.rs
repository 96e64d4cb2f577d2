//! # Parse Entry Points
//!
//! Every top-level call creates a fresh [`Context`], runs the grammar's root
//! node and drops the context again, which discards all per-parse symbol
//! table changes.
//!
//! ## Modes
//!
//! * full match: the whole input must be consumed, after trailing skipping
//! * prefix: matches from a start position and reports where it stopped
//! * callback: callback rules hand their values to a [`CallbackSink`]
//!
//! A failed match is `Ok(None)`. `Err` is reserved for contract violations
//! found before parsing starts.

use std::any::Any;

use crate::analyzer::attribute::{Attribute, Value};
use crate::analyzer::context::{Context, ContextParts};
use crate::analyzer::core::{Node, ParseError, Parser};
use crate::analyzer::error_handling::{ErrorHandler, Severity};
use crate::analyzer::input::Input;
use crate::analyzer::rule::{CallbackSink, Grammar};
use crate::config::ParseOptions;
use crate::error::GrammarError;
use crate::Result;

/// Configurable top-level parse.
pub struct Parse<'p> {
    grammar: &'p Grammar,
    skipper: Option<Node>,
    globals: Option<&'p mut (dyn Any + 'static)>,
    handler: Option<&'p mut dyn ErrorHandler>,
    callbacks: Option<&'p mut dyn CallbackSink>,
    options: ParseOptions,
}

impl<'p> Parse<'p> {
    pub fn new(grammar: &'p Grammar) -> Self {
        Self {
            grammar,
            skipper: None,
            globals: None,
            handler: None,
            callbacks: None,
            options: ParseOptions::default(),
        }
    }

    /// Parser run between sequence elements and repeat iterations.
    pub fn skipper(mut self, skipper: impl Into<Node>) -> Self {
        self.skipper = Some(skipper.into());
        self
    }

    pub fn globals<G: Any>(mut self, globals: &'p mut G) -> Self {
        self.globals = Some(globals);
        self
    }

    pub fn error_handler(mut self, handler: &'p mut dyn ErrorHandler) -> Self {
        self.handler = Some(handler);
        self
    }

    pub fn callbacks(mut self, sink: &'p mut dyn CallbackSink) -> Self {
        self.callbacks = Some(sink);
        self
    }

    pub fn options(mut self, options: ParseOptions) -> Self {
        self.options = options;
        self
    }

    /// Matches the whole input.
    pub fn run<I: Input>(self, input: &'p I) -> Result<Option<Value>> {
        let outcome = self.execute(input, 0, true)?;
        Ok(outcome.map(|(_, value)| value))
    }

    /// Matches from `*pos`. On success `*pos` moves past the match; on
    /// failure it is left untouched.
    pub fn run_prefix<I: Input>(self, input: &'p I, pos: &mut usize) -> Result<Option<Value>> {
        match self.execute(input, *pos, false)? {
            Some((next, value)) => {
                *pos = next;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    fn execute(self, input: &'p dyn Input, start: usize, full: bool) -> Result<Option<(usize, Value)>> {
        let mut contiguous = self.grammar.requires_contiguous();
        if let Some(skipper) = &self.skipper {
            contiguous |= self.grammar.validate_skipper(skipper)?;
        }
        if contiguous && !input.is_contiguous() {
            return Err(GrammarError::NonContiguousView.into());
        }

        let report_failures = self.options.report_failures;
        let mut ctx = Context::new(ContextParts {
            input,
            grammar: self.grammar,
            options: self.options,
            globals: self.globals,
            handler: self.handler,
            callbacks: self.callbacks,
            skipper: self.skipper,
        });

        let span = tracing::debug_span!(target: "attrparse::parse", "parse", start, full);
        let _guard = span.enter();

        let outcome = match run_root(&mut ctx, self.grammar.root(), start, full) {
            Ok((next, value)) if !full || next == ctx.end() => {
                let value = ctx.take_root_val().unwrap_or(value);
                tracing::debug!(target: "attrparse::parse", end = next, "Parse succeeded");
                Some((next, value))
            }
            Ok((next, _)) => {
                tracing::debug!(target: "attrparse::parse", position = next, "Input not fully consumed");
                if report_failures {
                    ctx.report(Severity::Error, next, "expected end of input here");
                }
                None
            }
            Err(err) => {
                tracing::debug!(target: "attrparse::parse", error = %err, "Parse failed");
                if err.is_fatal() || report_failures {
                    ctx.report(Severity::Error, err.get_position(), &failure_message(&err));
                }
                None
            }
        };

        let reverted = ctx.finish();
        if reverted > 0 {
            tracing::debug!(target: "attrparse::symbols", tables = reverted, "Per-parse symbol changes discarded");
        }
        Ok(outcome)
    }
}

fn run_root(ctx: &mut Context<'_>, root: &Node, start: usize, full: bool) -> std::result::Result<(usize, Value), ParseError> {
    let pos = ctx.skip(start)?;
    let (next, value) = root.parse(ctx, pos)?;
    let next = if full { ctx.skip(next)? } else { next };
    Ok((next, value))
}

fn failure_message(err: &ParseError) -> String {
    match err {
        ParseError::Expectation { expected, .. } => format!("expected {expected} here"),
        ParseError::UnexpectedEOF { expected, .. } => format!("expected {expected} here (end of input)"),
        ParseError::Unexpected { expected, .. } => format!("expected {expected} here"),
        other => other.to_string(),
    }
}

/// Full-input match without a skipper.
pub fn parse<I: Input>(input: I, grammar: &Grammar) -> Result<Option<Value>> {
    Parse::new(grammar).run(&input)
}

/// Full-input match converted to a Rust type. Conversion failure reads as a
/// failed match.
pub fn parse_as<T: Attribute, I: Input>(input: I, grammar: &Grammar) -> Result<Option<T>> {
    Ok(parse(input, grammar)?.and_then(T::from_value))
}

pub fn matches<I: Input>(input: I, grammar: &Grammar) -> Result<bool> {
    Ok(parse(input, grammar)?.is_some())
}

pub fn prefix_parse<I: Input>(input: I, pos: &mut usize, grammar: &Grammar) -> Result<Option<Value>> {
    Parse::new(grammar).run_prefix(&input, pos)
}

/// Full-input match delivering callback rule values to `sink`.
pub fn callback_parse<I: Input>(input: I, grammar: &Grammar, sink: &mut dyn CallbackSink) -> Result<bool> {
    Ok(Parse::new(grammar).callbacks(sink).run(&input)?.is_some())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::error_handling::CollectingErrorHandler;
    use crate::analyzer::input::{CodePoints, NullTerminated};
    use crate::analyzer::prelude::*;
    use crate::Error;

    #[test]
    fn test_full_match_requires_whole_input() {
        let grammar = Grammar::new(char_('a')).unwrap();
        assert_eq!(parse("a", &grammar).unwrap(), Some(Value::Char('a')));
        assert_eq!(parse("ab", &grammar).unwrap(), None);
    }

    #[test]
    fn test_prefix_moves_position_only_on_success() {
        let grammar = Grammar::new(string("ab")).unwrap();
        let mut pos = 0;
        assert!(prefix_parse("abab", &mut pos, &grammar).unwrap().is_some());
        assert_eq!(pos, 2);
        assert!(prefix_parse("abab", &mut pos, &grammar).unwrap().is_some());
        assert_eq!(pos, 4);
        assert!(prefix_parse("abab", &mut pos, &grammar).unwrap().is_none());
        assert_eq!(pos, 4);
    }

    #[test]
    fn test_skipper_runs_before_and_after() {
        let grammar = Grammar::new(char_('a') >> char_('b')).unwrap();
        let value = Parse::new(&grammar).skipper(ws()).run(&"  a \n b  ").unwrap();
        assert_eq!(value, Some(Value::Tuple(vec![Value::Char('a'), Value::Char('b')])));
    }

    #[test]
    fn test_lexeme_suppresses_skipper() {
        let grammar = Grammar::new(lexeme(char_('a') >> char_('b'))).unwrap();
        assert!(Parse::new(&grammar).skipper(ws()).run(&" ab ").unwrap().is_some());
        assert!(Parse::new(&grammar).skipper(ws()).run(&"a b").unwrap().is_none());
    }

    #[test]
    fn test_null_terminated_input() {
        let grammar = Grammar::new(string("ab")).unwrap();
        let input = NullTerminated::new("ab\0junk");
        assert_eq!(parse(input, &grammar).unwrap(), Some(Value::Str("ab".to_string())));
    }

    #[test]
    fn test_string_view_needs_contiguous_input() {
        let grammar = Grammar::new(alpha().one_plus().string_view()).unwrap();
        let chars: Vec<char> = "abc".chars().collect();
        assert!(matches!(
            parse(CodePoints::new(&chars), &grammar),
            Err(Error::Grammar(GrammarError::NonContiguousView))
        ));
        assert_eq!(parse("abc", &grammar).unwrap(), Some(Value::Str("abc".to_string())));
    }

    #[test]
    fn test_expectation_is_reported_once() {
        let grammar = Grammar::new(char_('a').expect_then(char_('b')) | string("ac")).unwrap();
        let mut handler = CollectingErrorHandler::new();
        let result = Parse::new(&grammar).error_handler(&mut handler).run(&"ac").unwrap();
        assert_eq!(result, None);
        assert_eq!(handler.errors().len(), 1);
        assert_eq!(handler.errors()[0].message, "expected 'b' here");
        assert_eq!(handler.errors()[0].location.column, 2);
    }

    #[test]
    fn test_ordinary_failures_are_silent_by_default() {
        let grammar = Grammar::new(char_('a')).unwrap();
        let mut handler = CollectingErrorHandler::new();
        assert_eq!(Parse::new(&grammar).error_handler(&mut handler).run(&"b").unwrap(), None);
        assert!(!handler.has_errors());

        let mut handler = CollectingErrorHandler::new();
        let options = ParseOptions::default().with_report_failures(true);
        Parse::new(&grammar)
            .options(options)
            .error_handler(&mut handler)
            .run(&"b")
            .unwrap();
        assert!(handler.has_errors());
    }

    #[test]
    fn test_globals_are_visible_to_actions() {
        let grammar = Grammar::new(
            char_('x')
                .action(|ctx| {
                    if let Some(count) = ctx.globals_mut::<usize>() {
                        *count += 1;
                    }
                })
                .zero_plus(),
        )
        .unwrap();
        let mut count = 0usize;
        let result = Parse::new(&grammar).globals(&mut count).run(&"xxx").unwrap();
        assert!(result.is_some());
        assert_eq!(count, 3);
    }

    #[test]
    fn test_val_outside_rules_overrides_result() {
        let grammar = Grammar::new(uint_().action(|ctx| {
            let doubled = ctx.attr_as::<u64>().unwrap_or_default() * 2;
            ctx.set_val(doubled);
        }))
        .unwrap();
        assert_eq!(parse_as::<u64, _>("21", &grammar).unwrap(), Some(42));
    }
}
