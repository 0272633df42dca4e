use common::{EngineError, EngineResult};
use expr::{ColumnSet, Expr, Record};
use hashbrown::HashMap;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::warn;
use types::{ColumnType, Value};

/// A fixed-capacity batch of rows persisted as one CSV file.
///
/// On disk: a header line of column names followed by fully quoted data
/// rows. A clean page's file is exactly that content; flushing a dirty
/// page overwrites the file.
#[derive(Debug)]
pub struct Page {
    number: u32,
    capacity: usize,
    path: PathBuf,
    schema: Rc<ColumnSet>,
    rows: Vec<Record>,
    dirty: bool,
}

impl Page {
    pub fn new(
        table: &str,
        number: u32,
        capacity: usize,
        dir: &Path,
        schema: Rc<ColumnSet>,
    ) -> Page {
        Page {
            number,
            capacity,
            path: Self::file_path(table, number, dir),
            schema,
            rows: Vec::new(),
            dirty: false,
        }
    }

    pub fn file_path(table: &str, number: u32, dir: &Path) -> PathBuf {
        dir.join(format!("{table}_{number}.csv"))
    }

    pub fn number(&self) -> u32 {
        self.number
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn is_full(&self) -> bool {
        self.rows.len() >= self.capacity
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn records(&self) -> &[Record] {
        &self.rows
    }

    pub fn append(&mut self, record: Record) {
        self.rows.push(record);
        self.dirty = true;
    }

    /// Read the page file, coercing cells with the declared column types.
    ///
    /// A missing file is a brand-new page. Other failures follow the
    /// configured policy: propagated in strict mode, otherwise logged and
    /// treated as an empty page (tolerates partially written files).
    pub fn load(&mut self, strict: bool) -> EngineResult<()> {
        match self.read_rows() {
            Ok(rows) => {
                self.rows = rows;
                self.dirty = false;
                Ok(())
            }
            Err(EngineError::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                self.rows = Vec::new();
                self.dirty = false;
                Ok(())
            }
            Err(e) if !strict => {
                warn!(page = %self.path.display(), error = %e, "unreadable page treated as empty");
                self.rows = Vec::new();
                self.dirty = false;
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    fn read_rows(&self) -> EngineResult<Vec<Record>> {
        let schema = &self.schema;
        let file = std::fs::File::open(&self.path)?;
        let mut reader = csv::Reader::from_reader(file);
        let headers = reader
            .headers()
            .map_err(|e| EngineError::Storage(format!("{}: bad header: {e}", self.path.display())))?
            .clone();

        let mut rows = Vec::new();
        for result in reader.records() {
            let raw = result.map_err(|e| {
                EngineError::Storage(format!("{}: bad row: {e}", self.path.display()))
            })?;
            let by_name: HashMap<&str, &str> = headers.iter().zip(raw.iter()).collect();

            let mut values = HashMap::with_capacity(schema.len());
            for expr in schema.iter() {
                let name = expr.name();
                let cell = by_name.get(name.as_str()).copied().ok_or_else(|| {
                    EngineError::Storage(format!(
                        "{}: missing column '{name}'",
                        self.path.display()
                    ))
                })?;
                values.insert(name, decode_cell(expr, cell, &self.path)?);
            }
            rows.push(Record::new(Rc::clone(schema), values));
        }
        Ok(rows)
    }

    /// Write the page out if dirty. Write failures always propagate.
    pub fn flush(&mut self) -> EngineResult<()> {
        if !self.dirty {
            return Ok(());
        }

        let schema_names = self.schema.names();

        let mut writer = csv::WriterBuilder::new()
            .quote_style(csv::QuoteStyle::Always)
            .from_path(&self.path)
            .map_err(|e| EngineError::Storage(format!("{}: {e}", self.path.display())))?;

        writer
            .write_record(&schema_names)
            .map_err(|e| EngineError::Storage(format!("{}: {e}", self.path.display())))?;

        for row in &self.rows {
            let cells: Vec<String> = schema_names
                .iter()
                .map(|name| encode_cell(row.get(name).unwrap_or(&Value::Null)))
                .collect();
            writer
                .write_record(&cells)
                .map_err(|e| EngineError::Storage(format!("{}: {e}", self.path.display())))?;
        }
        writer
            .flush()
            .map_err(|e| EngineError::Storage(format!("{}: {e}", self.path.display())))?;

        self.dirty = false;
        Ok(())
    }
}

/// Textual form of a value in a CSV cell. Lists and maps are stored as
/// JSON literals so they survive the round trip.
pub fn encode_cell(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::Str(s) => s.clone(),
        Value::Int(i) => i.to_string(),
        Value::Float(f) => f.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::List(_) | Value::Map(_) => {
            serde_json::to_string(&value_to_json(value)).unwrap_or_default()
        }
    }
}

fn decode_cell(expr: &Expr, cell: &str, path: &Path) -> EngineResult<Value> {
    let ty = match expr {
        Expr::Column { ty, .. } => *ty,
        // Non-column schema entries keep the raw string form.
        _ => return Ok(Value::Str(cell.to_string())),
    };

    if cell.is_empty() {
        return Ok(Value::Null);
    }

    let parse_err = |what: &str| {
        EngineError::Storage(format!(
            "{}: cell '{cell}' is not a valid {what} for column '{}'",
            path.display(),
            expr.name()
        ))
    };

    match ty {
        ColumnType::Int => cell
            .parse::<i64>()
            .map(Value::Int)
            .map_err(|_| parse_err("int")),
        ColumnType::Float => cell
            .parse::<f64>()
            .map(Value::Float)
            .map_err(|_| parse_err("float")),
        ColumnType::Str => Ok(Value::Str(cell.to_string())),
        ColumnType::List => serde_json::from_str::<serde_json::Value>(cell)
            .map(|json| json_to_value(&json))
            .map_err(|_| parse_err("list literal")),
    }
}

fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Int(i) => serde_json::Value::from(*i),
        Value::Float(f) => serde_json::Value::from(*f),
        Value::Str(s) => serde_json::Value::from(s.clone()),
        Value::Bool(b) => serde_json::Value::from(*b),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Map(entries) => serde_json::Value::Object(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), value_to_json(v)))
                .collect(),
        ),
        Value::Null => serde_json::Value::Null,
    }
}

fn json_to_value(json: &serde_json::Value) -> Value {
    match json {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(*b),
        serde_json::Value::Number(n) => match n.as_i64() {
            Some(i) => Value::Int(i),
            None => Value::Float(n.as_f64().unwrap_or(f64::NAN)),
        },
        serde_json::Value::String(s) => Value::Str(s.clone()),
        serde_json::Value::Array(items) => Value::List(items.iter().map(json_to_value).collect()),
        serde_json::Value::Object(entries) => Value::Map(
            entries
                .iter()
                .map(|(k, v)| (k.clone(), json_to_value(v)))
                .collect(),
        ),
    }
}
