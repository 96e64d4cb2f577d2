mod common;

use attrparse::prelude::*;
use attrparse::{matches, parse, parse_as, prefix_parse, CodePoints, Error, GrammarError, NullTerminated};
use pretty_assertions::assert_eq;

#[test]
fn test_null_terminated_stops_at_sentinel() {
    let grammar = Grammar::new(alpha().one_plus()).unwrap();
    assert_eq!(
        parse_as::<String, _>(NullTerminated::new("word\0trailing"), &grammar).unwrap(),
        Some("word".to_string())
    );
    assert!(matches(NullTerminated::new("word"), &grammar).unwrap());
}

#[test]
fn test_code_points_input() {
    let chars: Vec<char> = "héllo wörld".chars().collect();
    let grammar = Grammar::new(alpha().one_plus() % lit(" ")).unwrap();
    assert_eq!(
        parse_as::<Vec<String>, _>(CodePoints::new(&chars), &grammar).unwrap(),
        Some(vec!["héllo".to_string(), "wörld".to_string()])
    );
}

#[test]
fn test_raw_reports_offsets_on_any_input() {
    let chars: Vec<char> = "aaab".chars().collect();
    let grammar = Grammar::new(char_('a').one_plus().raw()).unwrap();
    let mut pos = 0;
    assert_eq!(
        prefix_parse(CodePoints::new(&chars), &mut pos, &grammar).unwrap(),
        Some(Value::Range(0..3))
    );
    assert_eq!(pos, 3);
}

#[test]
fn test_string_view_rejects_non_contiguous_input() {
    let chars: Vec<char> = "abc".chars().collect();
    let grammar = Grammar::new(alpha().one_plus().string_view()).unwrap();
    assert!(grammar.requires_contiguous());
    assert!(matches!(
        parse(CodePoints::new(&chars), &grammar),
        Err(Error::Grammar(GrammarError::NonContiguousView))
    ));
    assert_eq!(
        parse(String::from("abc"), &grammar).unwrap(),
        Some(Value::Str("abc".to_string()))
    );
}

#[test]
fn test_unicode_no_case() {
    let grammar = Grammar::new(no_case(lit("straße")) >> eoi()).unwrap();
    assert!(matches("STRAßE", &grammar).unwrap());
    assert!(!matches("strasse", &grammar).unwrap());
}
