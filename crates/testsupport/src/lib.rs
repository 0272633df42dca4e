//! Shared fixtures for cross-crate tests.

mod fixtures;

pub use fixtures::*;

/// Convenient re-exports for test files.
pub mod prelude {
    pub use crate::fixtures::*;
    pub use common::{Config, EngineError, EngineResult};
    pub use expr::{count, dict, list, lit, raw, sum, Expr};
    pub use recordset::{asc, desc, select_from, JoinKind, RecordSetExt, RecordSetOps};
    pub use types::{ColumnType, Value};
}
