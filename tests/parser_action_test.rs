mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use attrparse::prelude::*;
use attrparse::{parse, parse_as, prefix_parse};
use pretty_assertions::assert_eq;

#[test]
fn test_abc_or_def() {
    let grammar = Grammar::new(string("abc") | string("def")).unwrap();

    assert_eq!(parse("xyz", &grammar).unwrap(), None);
    assert_eq!(parse_as::<String, _>("abc", &grammar).unwrap(), Some("abc".to_string()));
    assert_eq!(parse_as::<String, _>("def", &grammar).unwrap(), Some("def".to_string()));
}

#[test]
fn test_failing_action_falls_through() {
    let grammar = Grammar::new(string("abc").action(|ctx| ctx.set_pass(false)) | string("def")).unwrap();

    assert_eq!(parse("abc", &grammar).unwrap(), None);
    assert_eq!(
        parse("def", &grammar).unwrap(),
        Some(Value::Variant {
            branch: 1,
            value: Box::new(Value::Str("def".to_string()))
        })
    );
}

fn append(ctx: &mut ActionContext<'_, '_>) {
    let text = ctx.attr_as::<String>().unwrap_or_default();
    if let Value::Str(acc) = ctx.locals_mut() {
        acc.push_str(&text);
    }
}

#[test]
fn test_locals_accumulate_matched_text() {
    let mut builder = GrammarBuilder::new();
    let joined = builder.declare(RuleDecl::typed::<String>("joined").locals(String::new()));
    let body = (-string("abc").action(append) >> -string("def").action(append)).action(|ctx| {
        let acc = ctx.locals().clone();
        ctx.set_val(acc);
    });
    builder.define(&joined, body).unwrap();
    let grammar = builder.build(&joined).unwrap();

    for (input, expected) in [("", ""), ("abcdef", "abcdef"), ("def", "def"), ("abc", "abc")] {
        assert_eq!(
            parse_as::<String, _>(input, &grammar).unwrap(),
            Some(expected.to_string()),
            "input {input:?}"
        );
    }
}

#[test]
fn test_uint_with_leading_zero() {
    let grammar = Grammar::new(uint_()).unwrap();
    assert_eq!(parse_as::<u64, _>("042", &grammar).unwrap(), Some(42));
}

#[test]
fn test_actions_run_on_partial_matches() {
    let counter = Arc::new(AtomicUsize::new(0));

    let seen = Arc::clone(&counter);
    let grammar = Grammar::new(char_('a').action(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    }))
    .unwrap();
    assert_eq!(parse("xyz", &grammar).unwrap(), None);
    assert_eq!(counter.load(Ordering::SeqCst), 0);

    let seen = Arc::clone(&counter);
    let grammar = Grammar::new(char_('x').action(move |_| {
        seen.fetch_add(1, Ordering::SeqCst);
    }))
    .unwrap();
    // the action fires even though the full match fails afterwards
    assert_eq!(parse("xyz", &grammar).unwrap(), None);
    assert_eq!(counter.load(Ordering::SeqCst), 1);

    let mut pos = 0;
    assert_eq!(prefix_parse("xyz", &mut pos, &grammar).unwrap(), Some(Value::Char('x')));
    assert_eq!(pos, 1);
    assert_eq!(counter.load(Ordering::SeqCst), 2);
}

#[test]
fn test_attr_and_eps_predicates() {
    let grammar = Grammar::new(eps_if(|ctx| ctx.end() > 2) >> string("abc") >> attr(7u64)).unwrap();
    assert_eq!(
        parse("abc", &grammar).unwrap(),
        Some(Value::Tuple(vec![Value::Str("abc".to_string()), Value::UInt(7)]))
    );

    let grammar = Grammar::new(eps_if(|ctx| ctx.end() > 5) >> string("abc")).unwrap();
    assert_eq!(parse("abc", &grammar).unwrap(), None);
}

#[test]
fn test_no_case_literals() {
    let grammar = Grammar::new(no_case(string("select")) >> lit(" ") >> bool_()).unwrap();
    assert_eq!(
        parse("SeLeCt true", &grammar).unwrap(),
        Some(Value::Tuple(vec![Value::Str("SeLeCt".to_string()), Value::Bool(true)]))
    );
}

#[test]
fn test_switch_on_computed_value() {
    let switch = Switch::computed(|ctx| Value::UInt(ctx.end() as u64))
        .case(1u64, char_('x'))
        .case(2u64, string("yy"));
    let grammar = Grammar::new(switch).unwrap();
    assert!(attrparse::matches("x", &grammar).unwrap());
    assert!(attrparse::matches("yy", &grammar).unwrap());
    assert!(!attrparse::matches("xx", &grammar).unwrap());
}
