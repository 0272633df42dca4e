//! Join: hash, conditional and cross joins with inner/outer flavors.

use crate::{Cursor, RecordSet, RecordSetExt, SharedRecordSet};
use common::{EngineError, EngineResult};
use expr::{ColumnSet, CompiledExpr, Expr, Record};
use hashbrown::{HashMap, HashSet};
use std::collections::VecDeque;
use std::rc::Rc;
use types::Value;

/// Join flavor. Equi- and conditional joins support all but `Cross`;
/// `Cross` is the plain Cartesian product.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinKind {
    Inner,
    Left,
    Right,
    Full,
    Cross,
}

impl JoinKind {
    fn wants_unmatched_left(self) -> bool {
        matches!(self, JoinKind::Left | JoinKind::Full)
    }

    fn wants_unmatched_right(self) -> bool {
        matches!(self, JoinKind::Right | JoinKind::Full)
    }
}

#[derive(Debug)]
enum JoinMode {
    /// Keys on both sides: build a hash table from the right side, probe
    /// with each left row.
    Hash {
        left_key: CompiledExpr,
        right_key: CompiledExpr,
    },
    /// An arbitrary predicate over the merged row: nested-loops scan.
    Conditional { condition: CompiledExpr },
    Cross,
}

/// Merges two record sets. The output row carries every left-side field
/// followed by every right-side field; name collisions resolve through
/// the canonical table-qualified column names.
#[derive(Debug)]
pub struct Join {
    left: SharedRecordSet,
    right: SharedRecordSet,
    schema: Rc<ColumnSet>,
    left_names: Vec<String>,
    right_names: Vec<String>,
    mode: JoinMode,
    kind: JoinKind,
}

impl Join {
    pub fn new(
        left: SharedRecordSet,
        right: SharedRecordSet,
        left_key: Option<Expr>,
        right_key: Option<Expr>,
        condition: Option<Expr>,
        kind: JoinKind,
    ) -> EngineResult<Join> {
        let mode = match (kind, left_key, right_key, condition) {
            (JoinKind::Cross, _, _, _) => JoinMode::Cross,
            (_, Some(lk), Some(rk), _) => JoinMode::Hash {
                left_key: lk.compile(),
                right_key: rk.compile(),
            },
            (_, _, _, Some(on)) => JoinMode::Conditional {
                condition: on.compile(),
            },
            _ => {
                return Err(EngineError::SchemaMismatch(
                    "join requires both keys, a condition, or the cross kind".into(),
                ))
            }
        };

        let schema = Rc::new(left.schema().merged(right.schema()));
        let left_names = left.schema().names();
        let right_names = right.schema().names();
        Ok(Join {
            left,
            right,
            schema,
            left_names,
            right_names,
            mode,
            kind,
        })
    }

    /// Merge a pair of rows; a `None` side contributes nulls.
    fn make_record(
        &self,
        left: Option<&Record>,
        right: Option<&Record>,
    ) -> EngineResult<Record> {
        let mut values = HashMap::with_capacity(self.left_names.len() + self.right_names.len());
        for name in &self.left_names {
            let value = match left {
                Some(record) => record.field(name)?.clone(),
                None => Value::Null,
            };
            values.insert(name.clone(), value);
        }
        for name in &self.right_names {
            let value = match right {
                Some(record) => record.field(name)?.clone(),
                None => Value::Null,
            };
            values.insert(name.clone(), value);
        }
        Ok(Record::new(Rc::clone(&self.schema), values))
    }
}

impl RecordSet for Join {
    fn schema(&self) -> &ColumnSet {
        &self.schema
    }

    fn scan(&self) -> EngineResult<Box<dyn Cursor + '_>> {
        // The right side is materialized once; outer-join bookkeeping
        // tracks matches by its row index.
        let right_rows = self.right.collect()?;

        let table = match &self.mode {
            JoinMode::Hash { right_key, .. } => {
                let mut table: HashMap<Value, Vec<usize>> = HashMap::new();
                for (idx, row) in right_rows.iter().enumerate() {
                    table.entry(right_key.eval(row)?).or_default().push(idx);
                }
                Some(table)
            }
            _ => None,
        };

        Ok(Box::new(JoinCursor {
            join: self,
            left_cursor: self.left.scan()?,
            right_rows,
            hash_table: table,
            matched_right: HashSet::new(),
            pending: VecDeque::new(),
            left_exhausted: false,
            tail_emitted: false,
        }))
    }
}

struct JoinCursor<'a> {
    join: &'a Join,
    left_cursor: Box<dyn Cursor + 'a>,
    right_rows: Vec<Record>,
    hash_table: Option<HashMap<Value, Vec<usize>>>,
    matched_right: HashSet<usize>,
    pending: VecDeque<Record>,
    left_exhausted: bool,
    tail_emitted: bool,
}

impl JoinCursor<'_> {
    /// Produce every output row for one left row into the pending queue.
    fn process_left(&mut self, left: &Record) -> EngineResult<()> {
        let join = self.join;
        match &join.mode {
            JoinMode::Cross => {
                for right in &self.right_rows {
                    self.pending.push_back(join.make_record(Some(left), Some(right))?);
                }
            }
            JoinMode::Hash { left_key, .. } => {
                let key = left_key.eval(left)?;
                let matches = self
                    .hash_table
                    .as_ref()
                    .and_then(|table| table.get(&key))
                    .cloned()
                    .unwrap_or_default();
                if matches.is_empty() {
                    if join.kind.wants_unmatched_left() {
                        self.pending.push_back(join.make_record(Some(left), None)?);
                    }
                } else {
                    for idx in matches {
                        self.matched_right.insert(idx);
                        self.pending
                            .push_back(join.make_record(Some(left), Some(&self.right_rows[idx]))?);
                    }
                }
            }
            JoinMode::Conditional { condition } => {
                let mut match_found = false;
                for (idx, right) in self.right_rows.iter().enumerate() {
                    let candidate = join.make_record(Some(left), Some(right))?;
                    if condition.eval(&candidate)?.is_truthy() {
                        match_found = true;
                        self.matched_right.insert(idx);
                        self.pending.push_back(candidate);
                    }
                }
                if !match_found && join.kind.wants_unmatched_left() {
                    self.pending.push_back(join.make_record(Some(left), None)?);
                }
            }
        }
        Ok(())
    }

    /// Emit right rows that never matched, for right and full joins.
    fn emit_unmatched_right(&mut self) -> EngineResult<()> {
        if !self.join.kind.wants_unmatched_right() {
            return Ok(());
        }
        for (idx, right) in self.right_rows.iter().enumerate() {
            if !self.matched_right.contains(&idx) {
                self.pending
                    .push_back(self.join.make_record(None, Some(right))?);
            }
        }
        Ok(())
    }
}

impl Cursor for JoinCursor<'_> {
    fn next(&mut self) -> EngineResult<Option<Record>> {
        loop {
            if let Some(record) = self.pending.pop_front() {
                return Ok(Some(record));
            }
            if self.left_exhausted {
                if self.tail_emitted {
                    return Ok(None);
                }
                self.tail_emitted = true;
                self.emit_unmatched_right()?;
                continue;
            }
            match self.left_cursor.next()? {
                Some(left) => self.process_left(&left)?,
                None => self.left_exhausted = true,
            }
        }
    }
}
