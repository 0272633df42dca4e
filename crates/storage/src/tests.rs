use super::*;
use expr::{column, raw};
use hashbrown::HashMap as FieldMap;
use std::rc::Rc;
use tempfile::tempdir;
use types::{ColumnType, Value};

fn schema() -> Rc<ColumnSet> {
    Rc::new(ColumnSet::new(vec![
        column("foo", "a", ColumnType::Int),
        column("foo", "b", ColumnType::Int),
    ]))
}

fn row(schema: &Rc<ColumnSet>, a: i64, b: i64) -> Record {
    let mut values = FieldMap::new();
    values.insert("foo.a".to_string(), Value::Int(a));
    values.insert("foo.b".to_string(), Value::Int(b));
    Record::new(Rc::clone(schema), values)
}

fn config(page_size: usize, cache_size: usize) -> common::Config {
    common::Config::builder()
        .page_size(page_size)
        .cache_size(cache_size)
        .build()
}

#[test]
fn insert_fills_pages_in_order() {
    let dir = tempdir().unwrap();
    let schema = schema();
    let mut storage = FilePageStorage::open("foo", Rc::clone(&schema), dir.path(), &config(4, 2));

    for i in 0..10 {
        storage.insert(row(&schema, i, 2 * i)).unwrap();
    }
    storage.dump_all().unwrap();

    // 10 rows at 4 per page: pages 1, 2, 3.
    assert_eq!(storage.page_numbers(), vec![1, 2, 3]);
    for number in [1u32, 2, 3] {
        assert!(Page::file_path("foo", number, dir.path()).exists());
    }
    assert!(!Page::file_path("foo", 4, dir.path()).exists());
    assert!(storage.resident_pages() <= 2);
    assert!(storage.cache_is_consistent());
}

#[test]
fn round_trip_preserves_rows_and_order() {
    let dir = tempdir().unwrap();
    let schema = schema();
    {
        let mut storage =
            FilePageStorage::open("foo", Rc::clone(&schema), dir.path(), &config(3, 2));
        for i in 0..7 {
            storage.insert(row(&schema, i, i * i)).unwrap();
        }
        storage.dump_all().unwrap();
    }

    // A fresh store discovers the pages and yields the same rows.
    let mut storage = FilePageStorage::open("foo", Rc::clone(&schema), dir.path(), &config(3, 2));
    let mut all = Vec::new();
    for number in storage.page_numbers() {
        all.extend(storage.page_records(number).unwrap());
    }
    assert_eq!(all.len(), 7);
    for (i, record) in all.iter().enumerate() {
        assert_eq!(record.field("foo.a").unwrap(), &Value::Int(i as i64));
        assert_eq!(
            record.field("foo.b").unwrap(),
            &Value::Int((i * i) as i64)
        );
    }
}

#[test]
fn cache_never_exceeds_capacity_and_flushes_evicted() {
    let dir = tempdir().unwrap();
    let schema = schema();
    let mut storage = FilePageStorage::open("foo", Rc::clone(&schema), dir.path(), &config(2, 2));

    // 8 rows at 2 per page: 4 pages through a 2-page cache.
    for i in 0..8 {
        storage.insert(row(&schema, i, i)).unwrap();
        assert!(storage.resident_pages() <= 2);
        assert!(storage.cache_is_consistent());
    }

    // Pages 1 and 2 were evicted along the way; their data must be on
    // disk already, without an explicit dump.
    let mut fresh = FilePageStorage::open("foo", Rc::clone(&schema), dir.path(), &config(2, 2));
    assert_eq!(fresh.page_records(1).unwrap().len(), 2);
    assert_eq!(fresh.page_records(2).unwrap().len(), 2);
}

#[test]
fn typed_coercion_on_load() {
    let dir = tempdir().unwrap();
    let schema = Rc::new(ColumnSet::new(vec![
        column("t", "n", ColumnType::Int),
        column("t", "x", ColumnType::Float),
        column("t", "s", ColumnType::Str),
        column("t", "v", ColumnType::List),
    ]));

    {
        let mut storage = FilePageStorage::open("t", Rc::clone(&schema), dir.path(), &config(10, 2));
        let mut values = FieldMap::new();
        values.insert("t.n".to_string(), Value::Int(7));
        values.insert("t.x".to_string(), Value::Float(2.5));
        values.insert("t.s".to_string(), Value::Str("hi, \"you\"".into()));
        values.insert(
            "t.v".to_string(),
            Value::List(vec![Value::Float(1.0), Value::Float(2.5)]),
        );
        storage.insert(Record::new(Rc::clone(&schema), values)).unwrap();
        storage.dump_all().unwrap();
    }

    let mut storage = FilePageStorage::open("t", Rc::clone(&schema), dir.path(), &config(10, 2));
    let records = storage.page_records(1).unwrap();
    assert_eq!(records.len(), 1);
    let r = &records[0];
    assert_eq!(r.field("t.n").unwrap(), &Value::Int(7));
    assert_eq!(r.field("t.x").unwrap(), &Value::Float(2.5));
    assert_eq!(r.field("t.s").unwrap(), &Value::Str("hi, \"you\"".into()));
    assert_eq!(
        r.field("t.v").unwrap(),
        &Value::List(vec![Value::Float(1.0), Value::Float(2.5)])
    );
}

#[test]
fn null_cells_round_trip_as_null() {
    let dir = tempdir().unwrap();
    let schema = schema();
    {
        let mut storage =
            FilePageStorage::open("foo", Rc::clone(&schema), dir.path(), &config(10, 2));
        let mut values = FieldMap::new();
        values.insert("foo.a".to_string(), Value::Int(1));
        values.insert("foo.b".to_string(), Value::Null);
        storage.insert(Record::new(Rc::clone(&schema), values)).unwrap();
        storage.dump_all().unwrap();
    }

    let mut storage = FilePageStorage::open("foo", Rc::clone(&schema), dir.path(), &config(10, 2));
    let records = storage.page_records(1).unwrap();
    assert_eq!(records[0].field("foo.b").unwrap(), &Value::Null);
}

#[test]
fn corrupt_page_reads_as_empty_by_default() {
    let dir = tempdir().unwrap();
    let schema = schema();
    std::fs::write(dir.path().join("foo_1.csv"), "\"foo.a\",\"foo.b\"\n\"x\",\"y\"\n").unwrap();

    let mut storage = FilePageStorage::open("foo", Rc::clone(&schema), dir.path(), &config(4, 2));
    assert_eq!(storage.page_numbers(), vec![1]);
    assert!(storage.page_records(1).unwrap().is_empty());
}

#[test]
fn corrupt_page_propagates_in_strict_mode() {
    let dir = tempdir().unwrap();
    let schema = schema();
    std::fs::write(dir.path().join("foo_1.csv"), "\"foo.a\",\"foo.b\"\n\"x\",\"y\"\n").unwrap();

    let strict = common::Config::builder()
        .page_size(4)
        .cache_size(2)
        .strict_reads(true)
        .build();
    let mut storage = FilePageStorage::open("foo", Rc::clone(&schema), dir.path(), &strict);
    assert!(storage.page_records(1).is_err());
}

#[test]
fn page_files_are_fully_quoted_with_header() {
    let dir = tempdir().unwrap();
    let schema = schema();
    let mut storage = FilePageStorage::open("foo", Rc::clone(&schema), dir.path(), &config(4, 2));
    storage.insert(row(&schema, 1, 2)).unwrap();
    storage.dump_all().unwrap();

    let content = std::fs::read_to_string(dir.path().join("foo_1.csv")).unwrap();
    let mut lines = content.lines();
    assert_eq!(lines.next().unwrap(), "\"foo.a\",\"foo.b\"");
    assert_eq!(lines.next().unwrap(), "\"1\",\"2\"");
}

#[test]
fn discovery_ignores_foreign_files() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("bar_1.csv"), "x\n").unwrap();
    std::fs::write(dir.path().join("foo_x.csv"), "x\n").unwrap();
    std::fs::write(dir.path().join("foo_2.txt"), "x\n").unwrap();
    std::fs::write(dir.path().join("foo_3.csv"), "\"foo.a\",\"foo.b\"\n").unwrap();

    let storage = FilePageStorage::open("foo", schema(), dir.path(), &config(4, 2));
    assert_eq!(storage.page_numbers(), vec![3]);
}

#[test]
fn non_column_schema_entries_stay_raw_strings() {
    let dir = tempdir().unwrap();
    let schema = Rc::new(ColumnSet::new(vec![raw("k")]));
    {
        let mut storage = FilePageStorage::open("kv", Rc::clone(&schema), dir.path(), &config(4, 2));
        let mut values = FieldMap::new();
        values.insert("k".to_string(), Value::Str("17".into()));
        storage.insert(Record::new(Rc::clone(&schema), values)).unwrap();
        storage.dump_all().unwrap();
    }

    let mut storage = FilePageStorage::open("kv", Rc::clone(&schema), dir.path(), &config(4, 2));
    let records = storage.page_records(1).unwrap();
    assert_eq!(records[0].field("k").unwrap(), &Value::Str("17".into()));
}
