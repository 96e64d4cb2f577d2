mod common;

use attrparse::prelude::*;
use attrparse::{parse, parse_as};
use pretty_assertions::assert_eq;

#[test]
fn test_parse_local_insert_is_reverted() {
    let table = Symbols::with_entries([("a", 1i64)]);
    let writer = table.clone();
    let grammar = Grammar::new(
        eps().action(move |ctx| ctx.insert_symbol(&writer, "b", 2)) >> table.node(),
    )
    .unwrap();

    assert_eq!(parse_as::<i64, _>("b", &grammar).unwrap(), Some(2));
    assert_eq!(table.get("b"), None);
    assert_eq!(table.len(), 1);

    let lookup = Grammar::new(table.node()).unwrap();
    assert_eq!(parse("b", &lookup).unwrap(), None);
    assert_eq!(parse_as::<i64, _>("a", &lookup).unwrap(), Some(1));
}

#[test]
fn test_reverted_after_failed_parse() {
    let table: Symbols<String> = Symbols::new();
    table.insert("let", "keyword".to_string());
    let writer = table.clone();
    let grammar = Grammar::new(
        lit("+").action(move |ctx| ctx.insert_symbol(&writer, "var", "name".to_string()))
            >> table.node()
            >> lit("!"),
    )
    .unwrap();

    assert_eq!(parse("+var", &grammar).unwrap(), None);
    assert_eq!(table.get("var"), None);
    assert_eq!(table.len(), 1);
}

#[test]
fn test_declared_names_are_found_later_in_the_same_parse() {
    let names: Symbols<u64> = Symbols::new();
    let declare = names.clone();
    let declaration = (lit("let ") >> alpha().one_plus()).action(move |ctx| {
        let name = ctx.attr_as::<String>().unwrap_or_default();
        let next = ctx.find_symbol(&declare, &name).map_or(0, |n| n + 1);
        ctx.insert_symbol(&declare, &name, next);
    });
    let usage = lit("use ") >> names.node();
    let grammar = Grammar::new((declaration | usage) % lit(";")).unwrap();

    let value = parse("let x;use x;let y;use y", &grammar).unwrap();
    assert!(value.is_some());
    assert!(parse("let x;use y", &grammar).unwrap().is_none());
    assert!(names.is_empty());
}

#[test]
fn test_remove_and_clear_are_scoped_to_the_parse() {
    let table = Symbols::with_entries([("on", true), ("off", false)]);
    let remover = table.clone();
    let clearer = table.clone();
    let grammar = Grammar::new(
        (lit("-") >> alpha().one_plus())
            .action(move |ctx| {
                let key = ctx.attr_as::<String>().unwrap_or_default();
                ctx.remove_symbol(&remover, &key);
            })
            .omit()
            >> lit("|")
            >> lit("*").action(move |ctx| ctx.clear_symbols(&clearer)).opt()
            >> table.node(),
    )
    .unwrap();

    assert_eq!(parse("-on|on", &grammar).unwrap(), None);
    assert_eq!(
        parse("-on|off", &grammar).unwrap(),
        Some(Value::Tuple(vec![Value::Bool(false)]))
    );
    assert_eq!(
        parse("-off|on", &grammar).unwrap(),
        Some(Value::Tuple(vec![Value::Bool(true)]))
    );
    assert_eq!(parse("-off|*on", &grammar).unwrap(), None);
    assert_eq!(table.len(), 2);
    assert_eq!(table.get("on"), Some(true));
}
