mod common;

use attrparse::analyzer::error_handling::format_diagnostic;
use attrparse::prelude::*;
use attrparse::{CollectingErrorHandler, Commit, Parse, ParseOptions, Severity};
use pretty_assertions::assert_eq;

fn assignment() -> Grammar {
    let name = lexeme(alpha().one_plus());
    Grammar::new(name.expect_then(lit("=")).then(int_()) >> lit(";")).unwrap()
}

#[test]
fn test_expectation_failure_is_reported_at_its_position() {
    let grammar = assignment();
    let mut handler = CollectingErrorHandler::new();
    let input = "abc\n  x 12;";
    let result = Parse::new(&grammar)
        .skipper(ws())
        .error_handler(&mut handler)
        .run(&input)
        .unwrap();

    assert_eq!(result, None);
    assert_eq!(handler.errors().len(), 1);
    let diagnostic = &handler.errors()[0];
    assert_eq!(diagnostic.severity, Severity::Error);
    assert_eq!(diagnostic.message, "expected \"=\" here");
    assert_eq!((diagnostic.location.line, diagnostic.location.column), (2, 3));
    assert_eq!(diagnostic.to_string(), "2:3: error: expected \"=\" here");

    let rendered = format_diagnostic(&input, diagnostic);
    assert!(rendered.contains("  x 12;"));
    assert!(rendered.contains("  ^"));
}

#[test]
fn test_successful_parse_reports_nothing() {
    let grammar = assignment();
    let mut handler = CollectingErrorHandler::new();
    let result = Parse::new(&grammar)
        .skipper(ws())
        .error_handler(&mut handler)
        .run(&"abc = 12 ;")
        .unwrap();
    assert_eq!(
        result.and_then(<(String, i64)>::from_value),
        Some(("abc".to_string(), 12))
    );
    assert!(!handler.has_errors());
    assert!(!handler.has_warnings());
}

#[test]
fn test_warning_on_successful_match() {
    let grammar = Grammar::new(int_().action(|ctx| {
        if ctx.attr_as::<i64>().is_some_and(|v| v > 100) {
            ctx.report_warning("suspiciously large value");
        }
    }))
    .unwrap();
    let mut handler = CollectingErrorHandler::new();
    let result = Parse::new(&grammar).error_handler(&mut handler).run(&"500").unwrap();
    assert_eq!(result, Some(Value::Int(500)));
    assert_eq!(handler.warnings().len(), 1);
    assert_eq!(handler.warnings()[0].location.offset, 0);
    assert!(!handler.has_errors());
}

#[test]
fn test_alternative_commit_lets_outer_choice_recover() {
    let keyword_call = string("call").then_commit(char_('('), Commit::Alternative);
    let inner = keyword_call | string("callx");
    let grammar = Grammar::new(alt(vec![inner, string("call)")])).unwrap();
    let mut handler = CollectingErrorHandler::new();

    let result = Parse::new(&grammar).error_handler(&mut handler).run(&"call)").unwrap();
    assert!(result.is_some());
    // the committed branch stops its own alternation before "callx" is tried
    let result = Parse::new(&grammar).error_handler(&mut handler).run(&"callx").unwrap();
    assert_eq!(result, None);
    assert!(!handler.has_errors());
}

#[test]
fn test_parse_commit_suppresses_every_alternative() {
    let grammar = Grammar::new(string("call").expect_then(char_('(')) | string("callback")).unwrap();
    let mut handler = CollectingErrorHandler::new();
    let result = Parse::new(&grammar).error_handler(&mut handler).run(&"callback").unwrap();
    assert_eq!(result, None);
    assert_eq!(handler.errors().len(), 1);
    assert_eq!(handler.errors()[0].location.offset, 4);
}

#[test]
fn test_report_failures_option() {
    let grammar = Grammar::new(string("ok")).unwrap();

    let mut quiet = CollectingErrorHandler::new();
    Parse::new(&grammar).error_handler(&mut quiet).run(&"no").unwrap();
    assert!(!quiet.has_errors());

    let options = ParseOptions::from_json(r#"{ "report_failures": true }"#).unwrap();
    let mut loud = CollectingErrorHandler::new();
    Parse::new(&grammar)
        .options(options)
        .error_handler(&mut loud)
        .run(&"no")
        .unwrap();
    assert_eq!(loud.errors().len(), 1);
    assert_eq!(loud.errors()[0].message, "expected \"ok\" here");
}
