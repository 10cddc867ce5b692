//! Subfield codec and composite field behavior.

use isisdm::subfield::{parse, serialize, Subfield};
use isisdm::{CompositeField, IsisError, SubfieldKeys};
use proptest::prelude::*;
use serde_json::json;

fn pairs(subfields: &[Subfield]) -> Vec<(char, String)> {
    subfields.iter().map(|s| (s.key, s.value.clone())).collect()
}

#[test]
fn test_tenniel_illustrator() {
    assert_eq!(
        pairs(&parse("John Tenniel^rillustrator", None)),
        vec![('_', "John Tenniel".to_string()), ('r', "illustrator".to_string())]
    );
}

#[test]
fn test_empty_subfields_between_markers() {
    assert_eq!(
        pairs(&parse("aa^1^2c", None)),
        vec![('_', "aa".to_string()), ('1', String::new()), ('2', "c".to_string())]
    );
}

#[test]
fn test_empty_input_for_any_key_set() {
    for keys in ["", "r", "abc123"] {
        let keys = SubfieldKeys::new(keys).unwrap();
        assert_eq!(parse("", Some(&keys)), vec![Subfield::main("")]);
    }
    assert_eq!(parse("", None), vec![Subfield::main("")]);
}

#[test]
fn test_marker_case_is_ignored() {
    assert_eq!(parse("X^Rfoo", None), parse("X^rfoo", None));

    let keys = SubfieldKeys::new("R").unwrap();
    assert_eq!(parse("X^Rfoo", Some(&keys)), parse("X^rfoo", Some(&keys)));
}

#[test]
fn test_unrecognized_key_passthrough() {
    let keys = SubfieldKeys::new("r").unwrap();
    assert_eq!(parse("X^zfoo", Some(&keys)), vec![Subfield::main("X^zfoo")]);
    assert_eq!(
        pairs(&parse("X^zfoo^rbar", Some(&keys))),
        vec![('_', "X^zfoo".to_string()), ('r', "bar".to_string())]
    );
}

#[test]
fn test_doubled_delimiter_is_not_a_marker() {
    let once = parse("Tenniel^^rillustrator", None);
    assert_eq!(once, vec![Subfield::main("Tenniel^^ rillustrator")]);
    assert_eq!(parse(&serialize(&once), None), once);
}

#[test]
fn test_composite_lookup() {
    let keys = SubfieldKeys::new("fl").unwrap();
    let author = CompositeField::parse("^lGrier^fDavid^xignored", Some(&keys));

    assert_eq!(author.get('l').unwrap(), "Grier");
    assert_eq!(author.get('f').unwrap(), "David^xignored");
    assert!(matches!(author.get('x'), Err(IsisError::KeyNotFound('x'))));
    assert_eq!(author.get_opt('x'), None);
    assert_eq!(author.keys().collect::<Vec<_>>(), vec!['_', 'l', 'f']);
}

#[test]
fn test_composite_from_pairs_matches_parse() {
    let parsed = CompositeField::parse("Main^aone^btwo", None);
    let built = CompositeField::from_pairs([("_", "Main"), ("a", "one"), ("b", "two")]).unwrap();
    assert_eq!(parsed, built);
    assert_eq!(built.to_pairs(), parsed.to_pairs());
    assert_eq!(built.to_string(), "Main^aone^btwo");
}

#[test]
fn test_composite_from_malformed_structure() {
    for bad in [
        json!([["_", "x"], ["a"]]),
        json!([["_", "x"], ["a", 1]]),
        json!([["a", "x"]]),
        json!([["_", "x"], ["ab", "y"]]),
        json!(42),
    ] {
        assert!(
            matches!(CompositeField::from_value(&bad, None), Err(IsisError::InvalidInput(_))),
            "{bad} should be rejected"
        );
    }
}

#[test]
fn test_composite_storage_form() {
    let field = CompositeField::parse("Revista^v12^n3", None);
    let value = field.to_value();
    assert_eq!(value, json!([["_", "Revista"], ["v", "12"], ["n", "3"]]));
    assert_eq!(CompositeField::from_value(&value, None).unwrap(), field);
}

fn segment() -> impl Strategy<Value = String> {
    "[A-Za-z0-9,.]([A-Za-z0-9 ,.]{0,10}[A-Za-z0-9,.])?".prop_map(String::from)
}

fn subfield() -> impl Strategy<Value = (char, String)> {
    (
        prop::sample::select("abcdefghijklmnopqrstuvwxyz0123456789".chars().collect::<Vec<_>>()),
        prop::option::of(segment()).prop_map(Option::unwrap_or_default),
    )
}

proptest! {
    #[test]
    fn prop_serialize_inverts_parse(
        main in prop::option::of(segment()).prop_map(Option::unwrap_or_default),
        rest in prop::collection::vec(subfield(), 0..6),
    ) {
        let mut raw = main.clone();
        for (key, value) in &rest {
            raw.push('^');
            raw.push(*key);
            raw.push_str(value);
        }

        let parsed = parse(&raw, None);
        prop_assert_eq!(serialize(&parsed), raw);
        prop_assert_eq!(parsed.len(), rest.len() + 1);
        prop_assert_eq!(&parsed[0], &Subfield::main(main));
    }

    #[test]
    fn prop_serialize_inverts_parse_with_key_set(
        keys in "[a-f0-3]{0,4}",
        main in prop::option::of(segment()).prop_map(Option::unwrap_or_default),
        rest in prop::collection::vec(
            (
                prop::sample::select("abcdefxyz0123".chars().collect::<Vec<_>>()),
                prop::option::of(segment()).prop_map(Option::unwrap_or_default),
            ),
            0..6,
        ),
    ) {
        let keys = SubfieldKeys::new(&keys).unwrap();
        let mut raw = main;
        for (key, value) in &rest {
            raw.push('^');
            raw.push(*key);
            raw.push_str(value);
        }

        let parsed = parse(&raw, Some(&keys));
        prop_assert_eq!(serialize(&parsed), raw);
        prop_assert!(parsed[1..].iter().all(|s| keys.contains(s.key)));
        if !keys.is_empty() {
            let recognized = rest.iter().filter(|(key, _)| keys.contains(*key)).count();
            prop_assert_eq!(parsed.len(), recognized + 1);
        }
    }

    #[test]
    fn prop_doubled_delimiters_are_stable(
        left in segment(),
        right in segment(),
        key in "[a-z0-9]",
    ) {
        let raw = format!("{left}^^{key}{right}");
        let once = parse(&raw, None);
        let twice = parse(&serialize(&once), None);
        prop_assert_eq!(once, twice);
    }

    #[test]
    fn prop_first_subfield_is_main(raw in ".{0,40}") {
        let parsed = parse(&raw, None);
        prop_assert!(!parsed.is_empty());
        prop_assert!(parsed[0].is_main());
        prop_assert!(parsed[1..].iter().all(|s| !s.is_main()));
    }
}
