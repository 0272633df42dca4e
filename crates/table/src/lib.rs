//! Tables: named, typed-column record sets bound to paginated storage.
//!
//! A table owns its [`FilePageStorage`]; iterating the table streams
//! records from the store page by page. Inserts are normalized against
//! the schema (missing fields become null) and routed to storage. The
//! table flushes its storage when dropped; a failure there is logged,
//! never propagated.


use common::{Config, EngineError, EngineResult};
use expr::{column, ColumnSet, Expr, Record};
use hashbrown::HashMap;
use recordset::{Cursor, RecordSet};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;
use storage::FilePageStorage;
use tracing::error;
use types::{ColumnType, Value};

#[derive(Debug)]
pub struct Table {
    name: String,
    schema: Rc<ColumnSet>,
    storage: RefCell<FilePageStorage>,
}

impl Table {
    /// Create a table named `name` with the given typed columns, storing
    /// its pages under `dir`. Column names must be unique.
    pub fn create(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = (impl Into<String>, ColumnType)>,
        dir: impl Into<PathBuf>,
        config: &Config,
    ) -> EngineResult<Rc<Table>> {
        let name = name.into();

        let mut own_names: Vec<String> = Vec::new();
        let mut exprs = Vec::new();
        for (col_name, ty) in columns {
            let col_name = col_name.into();
            if own_names.contains(&col_name) {
                return Err(EngineError::SchemaMismatch(format!(
                    "duplicate column '{col_name}' in table '{name}'"
                )));
            }
            exprs.push(column(&name, &col_name, ty));
            own_names.push(col_name);
        }

        let schema = Rc::new(ColumnSet::new(exprs));
        let storage = FilePageStorage::open(&name, Rc::clone(&schema), dir, config);
        Ok(Rc::new(Table {
            name,
            schema,
            storage: RefCell::new(storage),
        }))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The expression for one of this table's columns, by its bare name.
    pub fn column(&self, name: &str) -> EngineResult<Expr> {
        let qualified = format!("{}.{name}", self.name);
        self.schema
            .get(&qualified)
            .cloned()
            .ok_or(EngineError::UnknownField(qualified))
    }

    /// Append a row. Values may be keyed by bare or qualified column
    /// name; fields the row does not mention are stored as null.
    pub fn insert(
        &self,
        values: impl IntoIterator<Item = (impl Into<String>, Value)>,
    ) -> EngineResult<()> {
        let mut provided: HashMap<String, Value> =
            values.into_iter().map(|(k, v)| (k.into(), v)).collect();

        let mut row = HashMap::with_capacity(self.schema.len());
        for expr in self.schema.iter() {
            let qualified = expr.name();
            let bare = qualified
                .rsplit_once('.')
                .map(|(_, bare)| bare.to_string())
                .unwrap_or_else(|| qualified.clone());
            let value = provided
                .remove(&qualified)
                .or_else(|| provided.remove(&bare))
                .unwrap_or(Value::Null);
            row.insert(qualified, value);
        }

        self.storage
            .borrow_mut()
            .insert(Record::new(Rc::clone(&self.schema), row))
    }

    /// Append a record produced elsewhere, normalized to this schema.
    pub fn insert_record(&self, record: &Record) -> EngineResult<()> {
        let pairs: Vec<(String, Value)> = record
            .schema()
            .iter()
            .filter_map(|e| {
                let name = e.name();
                record.get(&name).cloned().map(|v| (name, v))
            })
            .collect();
        self.insert(pairs)
    }

    /// Flush every resident dirty page to disk.
    pub fn flush(&self) -> EngineResult<()> {
        self.storage.borrow_mut().dump_all()
    }

    /// Resident page count, for cache-discipline assertions.
    pub fn resident_pages(&self) -> usize {
        self.storage.borrow().resident_pages()
    }
}

impl RecordSet for Table {
    fn schema(&self) -> &ColumnSet {
        &self.schema
    }

    fn scan(&self) -> EngineResult<Box<dyn Cursor + '_>> {
        let order = self.storage.borrow().page_numbers();
        Ok(Box::new(TableCursor {
            storage: &self.storage,
            order,
            next_page: 0,
            buffer: VecDeque::new(),
            flushed: false,
        }))
    }
}

impl Drop for Table {
    fn drop(&mut self) {
        if let Err(e) = self.storage.borrow_mut().dump_all() {
            error!(table = %self.name, error = %e, "flush on drop failed");
        }
    }
}

/// Streams records page by page in page-number order; after the last
/// page the store's dirty pages are flushed.
struct TableCursor<'a> {
    storage: &'a RefCell<FilePageStorage>,
    order: Vec<u32>,
    next_page: usize,
    buffer: VecDeque<Record>,
    flushed: bool,
}

impl Cursor for TableCursor<'_> {
    fn next(&mut self) -> EngineResult<Option<Record>> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                return Ok(Some(record));
            }
            if self.next_page >= self.order.len() {
                if !self.flushed {
                    self.flushed = true;
                    self.storage.borrow_mut().dump_all()?;
                }
                return Ok(None);
            }
            let number = self.order[self.next_page];
            self.next_page += 1;
            self.buffer = self.storage.borrow_mut().page_records(number)?.into();
        }
    }
}

/// Fluent single-row insert.
///
/// ```no_run
/// # use table::{Table, insert_into};
/// # use common::Config;
/// # use types::{ColumnType, Value};
/// # let t = Table::create("t", [("a", ColumnType::Int)], "./data/t", &Config::default()).unwrap();
/// insert_into(&t).set("a", Value::Int(1)).execute().unwrap();
/// ```
pub struct Insert<'a> {
    table: &'a Table,
    values: Vec<(String, Value)>,
}

/// Start an insert into `table`.
pub fn insert_into(table: &Table) -> Insert<'_> {
    Insert {
        table,
        values: Vec::new(),
    }
}

impl Insert<'_> {
    pub fn set(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.values.push((name.into(), value.into()));
        self
    }

    pub fn execute(self) -> EngineResult<()> {
        self.table.insert(self.values)
    }
}
