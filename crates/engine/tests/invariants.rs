//! Cross-cutting invariants exercised through the public surface.

use query::{and, not, or, parse_query, word, Simplifier};
use testsupport::prelude::*;
use testsupport::{int_field, TestDb};

#[test]
fn storage_round_trip_preserves_rows_and_order() {
    let fixture = TestDb::new(7, 3);
    let foo = fixture.foo();

    for i in 0..50 {
        foo.insert([("a", Value::Int(i)), ("b", Value::Int(100 - i))])
            .unwrap();
    }
    foo.flush().unwrap();

    let first = foo.collect().unwrap();
    let second = foo.collect().unwrap();
    assert_eq!(first, second);
    assert_eq!(first.len(), 50);
    for (i, record) in first.iter().enumerate() {
        assert_eq!(int_field(record, "foo.a"), i as i64);
    }
}

#[test]
fn inner_join_cardinality_is_the_sum_of_key_products() {
    let fixture = TestDb::new(100, 4);
    let foo = fixture.foo();
    let bar = fixture.bar();

    // Key 1 appears 2×3 times, key 2 appears 1×1, key 3 left-only.
    for (a, b) in [(1, 1), (2, 1), (3, 2), (4, 3)] {
        foo.insert([("a", Value::Int(a)), ("b", Value::Int(b))])
            .unwrap();
    }
    for (c, d) in [(1, 10), (1, 20), (1, 30), (2, 40)] {
        bar.insert([("c", Value::Int(c)), ("d", Value::Int(d))])
            .unwrap();
    }

    let inner = select_from(foo.clone())
        .join(bar.clone(), foo.column("b").unwrap(), bar.column("c").unwrap())
        .execute()
        .unwrap();
    assert_eq!(inner.collect().unwrap().len(), 2 * 3 + 1);

    let left = select_from(foo.clone())
        .left_join(bar.clone(), foo.column("b").unwrap(), bar.column("c").unwrap())
        .execute()
        .unwrap();
    let left_rows = left.collect().unwrap();
    assert!(left_rows.len() >= 4);

    let full = select_from(foo.clone())
        .full_join(bar.clone(), foo.column("b").unwrap(), bar.column("c").unwrap())
        .execute()
        .unwrap();
    let full_rows = full.collect().unwrap();
    assert!(full_rows.len() >= 4);
    // The unmatched left row carries nulls on the right side.
    let unmatched: Vec<_> = full_rows
        .iter()
        .filter(|r| r.field("bar.c").unwrap() == &Value::Null)
        .collect();
    assert_eq!(unmatched.len(), 1);
    assert_eq!(int_field(unmatched[0], "foo.b"), 3);
}

#[test]
fn group_by_partitions_the_input() {
    let fixture = TestDb::new(100, 4);
    let foo = fixture.foo();

    for i in 0..30 {
        foo.insert([("a", Value::Int(i)), ("b", Value::Int(i % 4))])
            .unwrap();
    }

    let grouped = select_from(foo.clone())
        .group_by([foo.column("b").unwrap()])
        .aggregate([count().alias("n")])
        .execute()
        .unwrap();

    let rows = grouped.collect().unwrap();
    assert_eq!(rows.len(), 4);
    let total: i64 = rows.iter().map(|r| int_field(r, "n")).sum();
    assert_eq!(total, 30);
}

#[test]
fn de_morgan_round_trip_converges() {
    for seed in [1u64, 7, 23, 99] {
        let simplifier = Simplifier::with_seed(seed);
        let lhs = simplifier.simplify(&not(or(word("A"), word("B"))));
        let rhs = simplifier.simplify(&and(not(word("A")), not(word("B"))));
        assert_eq!(lhs, rhs, "seed {seed}");
    }
}

#[test]
fn simplifier_never_increases_the_test_queries() {
    let queries = [
        "A AND (A OR B)",
        "A AND NOT A",
        "NOT NOT A",
        "(A OR B) AND (A OR NOT B)",
        "(A AND B) OR (A AND C)",
        "A OR A OR A OR A",
        "NOT (A OR B) AND NOT (A OR B)",
    ];
    for input in queries {
        let ast = parse_query(input).unwrap();
        let simplified = Simplifier::with_seed(13).simplify(&ast);
        assert!(
            simplified.node_count() <= ast.node_count(),
            "{input} grew: {simplified}"
        );
    }
}

#[test]
fn filter_over_missing_field_fails_before_iteration() {
    let fixture = TestDb::new(10, 2);
    let foo = fixture.foo();
    foo.insert([("a", Value::Int(1)), ("b", Value::Int(2))])
        .unwrap();

    let err = select_from(foo.clone())
        .filter(raw("ghost").gt(0))
        .execute()
        .unwrap_err();
    assert!(matches!(err, EngineError::SchemaMismatch(_)));
}

#[test]
fn renders_a_readable_table() {
    let fixture = TestDb::new(10, 2);
    let foo = fixture.foo();
    foo.insert([("a", Value::Int(1)), ("b", Value::Int(2))])
        .unwrap();

    let rendered = foo.render(None).unwrap();
    assert!(rendered.contains("foo.a"));
    assert!(rendered.contains('1'));
}
