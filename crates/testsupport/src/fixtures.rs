use common::Config;
use engine::Database;
use expr::Record;
use std::rc::Rc;
use table::Table;
use tempfile::TempDir;
use types::{ColumnType, Value};

/// A database over a temporary directory. The directory lives as long as
/// the fixture, so tables can be reopened within one test.
pub struct TestDb {
    pub db: Database,
    _dir: TempDir,
}

impl TestDb {
    pub fn new(page_size: usize, cache_size: usize) -> TestDb {
        let dir = TempDir::new().expect("create temp dir");
        let config = Config::builder()
            .data_dir(dir.path().to_path_buf())
            .page_size(page_size)
            .cache_size(cache_size)
            .build();
        TestDb {
            db: Database::new(config),
            _dir: dir,
        }
    }

    /// `foo(a, b)` with integer columns.
    pub fn foo(&self) -> Rc<Table> {
        self.db
            .create_table("foo", [("a", ColumnType::Int), ("b", ColumnType::Int)])
            .expect("create foo")
    }

    /// `bar(c, d)` with integer columns.
    pub fn bar(&self) -> Rc<Table> {
        self.db
            .create_table("bar", [("c", ColumnType::Int), ("d", ColumnType::Int)])
            .expect("create bar")
    }
}

/// Read an integer field or panic with a readable message.
pub fn int_field(record: &Record, name: &str) -> i64 {
    match record.field(name) {
        Ok(Value::Int(i)) => *i,
        other => panic!("field '{name}' is not an int: {other:?}"),
    }
}

/// Read any field's value.
pub fn value_field(record: &Record, name: &str) -> Value {
    record
        .field(name)
        .unwrap_or_else(|e| panic!("field '{name}': {e}"))
        .clone()
}
