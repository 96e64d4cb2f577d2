mod common;

use attrparse::prelude::*;
use attrparse::{parse, prefix_parse, Parse};
use proptest::prelude::*;

fn words() -> impl Strategy<Value = Vec<String>> {
    prop::collection::vec("[a-c]{1,3}", 1..5)
}

proptest! {
    #[test]
    fn alternation_takes_first_matching_branch(branches in words(), input in "[a-c]{0,4}") {
        let grammar = Grammar::new(alt(branches.iter().map(|b| string(b)).collect())).unwrap();
        let mut pos = 0;
        let result = prefix_parse(input.as_str(), &mut pos, &grammar).unwrap();

        match branches.iter().position(|b| input.starts_with(b.as_str())) {
            Some(first) => {
                prop_assert_eq!(pos, branches[first].len());
                prop_assert_eq!(
                    result,
                    Some(Value::Variant { branch: first, value: Box::new(Value::Str(branches[first].clone())) })
                );
            }
            None => {
                prop_assert_eq!(pos, 0);
                prop_assert_eq!(result, None);
            }
        }
    }

    #[test]
    fn optional_never_fails(word in "[a-c]{1,3}", input in "[a-c]{0,4}") {
        let plain = Grammar::new(string(&word)).unwrap();
        let optional = Grammar::new(-string(&word)).unwrap();

        let mut plain_pos = 0;
        let plain_result = prefix_parse(input.as_str(), &mut plain_pos, &plain).unwrap();
        let mut pos = 0;
        let result = prefix_parse(input.as_str(), &mut pos, &optional).unwrap();

        prop_assert_eq!(pos, plain_pos);
        let expected = Value::Optional(plain_result.map(Box::new));
        prop_assert_eq!(result, Some(expected));
    }

    #[test]
    fn lexeme_matches_like_unskipped_parser(input in "[ab ]{0,6}") {
        let body = char_('a') >> char_('b');
        let bare = Grammar::new(body.clone()).unwrap();
        let skipped = Grammar::new(lexeme(body)).unwrap();

        let trimmed = input.trim_matches(' ');
        let expected = parse(trimmed, &bare).unwrap().is_some();
        let found = Parse::new(&skipped).skipper(ws()).run(&input.as_str()).unwrap().is_some();
        prop_assert_eq!(found, expected);
    }

    #[test]
    fn sequence_has_one_component_per_attribute(values in prop::collection::vec(0u64..1000, 1..6)) {
        let parts: Vec<Node> = values.iter().map(|_| uint_()).collect();
        let mut node = eps() >> parts[0].clone();
        for part in &parts[1..] {
            node = node >> lit(",") >> part.clone();
        }
        let grammar = Grammar::new(node).unwrap();
        let input = values.iter().map(u64::to_string).collect::<Vec<_>>().join(",");

        let expected = Value::Tuple(values.iter().map(|v| Value::UInt(*v)).collect());
        prop_assert_eq!(parse(input.as_str(), &grammar).unwrap(), Some(expected));
    }

    #[test]
    fn symbol_changes_never_outlive_a_parse(keys in prop::collection::vec("[a-z]{1,4}", 1..6), input in "[a-z]{0,4}") {
        let table: Symbols<u64> = Symbols::new();
        table.insert("base", 0);
        let writer = table.clone();
        let added = keys.clone();
        let grammar = Grammar::new(
            eps().action(move |ctx| {
                for (i, key) in added.iter().enumerate() {
                    ctx.insert_symbol(&writer, key, i as u64 + 1);
                }
                ctx.remove_symbol(&writer, "base");
            }) >> table.node(),
        )
        .unwrap();

        let _ = parse(input.as_str(), &grammar).unwrap();
        prop_assert_eq!(table.len(), 1);
        prop_assert_eq!(table.get("base"), Some(0));
        for key in keys.iter().filter(|k| k.as_str() != "base") {
            prop_assert_eq!(table.get(key), None);
        }
    }
}
