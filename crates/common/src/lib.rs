#[cfg(test)]
mod tests;

pub mod pretty;

use serde::{Deserialize, Serialize};
use std::{io, path::PathBuf};
use thiserror::Error;
use types::ValueError;

/// Canonical error type shared across the engine's subsystems.
#[derive(Error, Debug)]
pub enum EngineError {
    /// A predicate or ordering references a field the upstream column set
    /// does not produce. Raised when the operator is built, not when it
    /// iterates.
    #[error("schema mismatch: {0}")]
    SchemaMismatch(String),
    /// An operation was applied to values it does not support during
    /// evaluation of the named expression.
    #[error("type mismatch in '{expr}': {source}")]
    TypeMismatch {
        expr: String,
        #[source]
        source: ValueError,
    },
    /// Record lookup failed under both the aliased and the original name.
    #[error("unknown field '{0}'")]
    UnknownField(String),
    /// The Boolean tokenizer or parser rejected the input. `pos` is the
    /// 0-based character position (tokenizer) or token index (parser).
    #[error("parse error at position {pos}: {message}")]
    Parse { pos: usize, message: String },
    #[error("storage: {0}")]
    Storage(String),
    /// An aggregation over an empty input whose identity is undefined for
    /// the operand type.
    #[error("empty aggregation: {0}")]
    AggregationEmpty(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl EngineError {
    pub fn type_mismatch(expr: impl Into<String>, source: ValueError) -> Self {
        EngineError::TypeMismatch {
            expr: expr.into(),
            source,
        }
    }

    pub fn parse(pos: usize, message: impl Into<String>) -> Self {
        EngineError::Parse {
            pos,
            message: message.into(),
        }
    }
}

/// Result alias that carries an `EngineError`.
pub type EngineResult<T> = Result<T, EngineError>;

/// Runtime configuration for the engine.
///
/// # Example
/// ```
/// use common::Config;
/// use std::path::PathBuf;
///
/// let config = Config::builder()
///     .data_dir(PathBuf::from("./my_db"))
///     .page_size(100)
///     .cache_size(4)
///     .build();
/// ```
#[derive(Clone, Debug, Serialize, Deserialize, bon::Builder)]
pub struct Config {
    /// Directory under which each table keeps its page files.
    #[builder(default = PathBuf::from("./data"))]
    pub data_dir: PathBuf,
    /// Rows per page file.
    #[builder(default = 1000)]
    pub page_size: usize,
    /// Number of pages a table keeps resident.
    #[builder(default = 10)]
    pub cache_size: usize,
    /// Propagate read-side page I/O errors instead of treating the page
    /// as empty.
    #[builder(default = false)]
    pub strict_reads: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./data"),
            page_size: 1000,
            cache_size: 10,
            strict_reads: false,
        }
    }
}

/// Convenient re-exports for downstream crates.
pub mod prelude {
    pub use crate::{Config, EngineError, EngineResult};
    pub use types::{ColumnType, Value};
}
