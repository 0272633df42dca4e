use super::*;
use common::EngineError;
use pretty_assertions::assert_eq;

#[test]
fn tokenizes_words_keywords_and_parens() {
    let tokens = tokenize("cat AND (dog OR NOT mouse)").unwrap();
    assert_eq!(
        tokens,
        vec![
            QueryToken::Word("cat".into()),
            QueryToken::And,
            QueryToken::LParen,
            QueryToken::Word("dog".into()),
            QueryToken::Or,
            QueryToken::Not,
            QueryToken::Word("mouse".into()),
            QueryToken::RParen,
            QueryToken::Eof,
        ]
    );
}

#[test]
fn keywords_are_case_insensitive() {
    let tokens = tokenize("a and B oR c nOt d").unwrap();
    assert_eq!(
        tokens,
        vec![
            QueryToken::Word("a".into()),
            QueryToken::And,
            QueryToken::Word("B".into()),
            QueryToken::Or,
            QueryToken::Word("c".into()),
            QueryToken::Not,
            QueryToken::Word("d".into()),
            QueryToken::Eof,
        ]
    );
}

#[test]
fn empty_input_is_just_eof() {
    assert_eq!(tokenize("   ").unwrap(), vec![QueryToken::Eof]);
}

#[test]
fn invalid_character_aborts_with_position() {
    let err = tokenize("cat & dog").unwrap_err();
    match err {
        EngineError::Parse { pos, .. } => assert_eq!(pos, 4),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn digits_are_invalid() {
    assert!(tokenize("cat2").is_err());
}

#[test]
fn parses_precedence_or_under_and() {
    // AND binds tighter than OR.
    let ast = parse_query("cat AND dog OR NOT mouse").unwrap();
    let expected = or(
        and(word("cat"), word("dog")),
        not(word("mouse")),
    );
    assert_eq!(ast, expected);
}

#[test]
fn parens_override_precedence() {
    let ast = parse_query("cat AND (dog OR mouse)").unwrap();
    let expected = and(word("cat"), or(word("dog"), word("mouse")));
    assert_eq!(ast, expected);
}

#[test]
fn binary_operators_are_left_associative() {
    let ast = parse_query("a OR b OR c").unwrap();
    let expected = or(or(word("a"), word("b")), word("c"));
    assert_eq!(ast, expected);
    // Commutative equality would also accept the mirror image; pin the
    // exact shape through Display.
    assert_eq!(ast.to_string(), "((a OR b) OR c)");
}

#[test]
fn not_is_right_associative_and_stacks() {
    let ast = parse_query("NOT NOT a").unwrap();
    assert_eq!(ast, not(not(word("a"))));
}

#[test]
fn dangling_operator_is_a_parse_error() {
    let err = parse_query("cat AND").unwrap_err();
    assert!(matches!(err, EngineError::Parse { .. }));
}

#[test]
fn unbalanced_parens_are_a_parse_error() {
    assert!(parse_query("(cat OR dog").is_err());
    assert!(parse_query("cat OR dog)").is_err());
}

#[test]
fn trailing_garbage_is_a_parse_error() {
    let err = parse_query("cat dog").unwrap_err();
    match err {
        EngineError::Parse { pos, .. } => assert_eq!(pos, 1),
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn empty_query_is_a_parse_error() {
    assert!(parse_query("").is_err());
}

#[test]
fn and_or_equality_is_commutative() {
    assert_eq!(and(word("a"), word("b")), and(word("b"), word("a")));
    assert_eq!(or(word("a"), word("b")), or(word("b"), word("a")));
    assert_ne!(and(word("a"), word("b")), or(word("a"), word("b")));
}

#[test]
fn commutative_pairs_hash_equally() {
    use std::collections::HashSet;
    let mut set = HashSet::new();
    set.insert(and(word("a"), word("b")));
    assert!(set.contains(&and(word("b"), word("a"))));
}

#[test]
fn metrics_count_and_height() {
    let ast = parse_query("cat AND dog OR NOT mouse").unwrap();
    assert_eq!(ast.node_count(), 6);
    assert_eq!(ast.height(), 2);
    assert_eq!(word("x").node_count(), 1);
    assert_eq!(word("x").height(), 0);
}

#[test]
fn display_round_trips_through_the_parser() {
    let ast = parse_query("(a OR b) AND NOT c").unwrap();
    let reparsed = parse_query(&ast.to_string()).unwrap();
    assert_eq!(ast, reparsed);
}

#[test]
fn pretty_rendering_is_indented() {
    let ast = parse_query("a AND b").unwrap();
    assert_eq!(ast.pretty(), "AND(\n  WORD(a)\n  WORD(b)\n)");
}
