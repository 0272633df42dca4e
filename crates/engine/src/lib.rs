//! Top-level facade: a configured database of tables plus the Boolean
//! search pipeline over an inverted index.
//!
//! Nothing here is global state: the [`Database`] owns its [`Config`]
//! and hands out tables, the [`SearchEngine`] takes its indexes by
//! constructor. The pipeline a query runs through is
//!
//! ```text
//! &str → tokens → AST → simplified AST → plan → set of page URLs
//! ```
//!
//! # Example
//!
//! ```no_run
//! use engine::{Database, SearchEngine};
//! use common::Config;
//! use search::{InMemoryPageIndex, InMemoryTokenIndex};
//! use types::{ColumnType, Value};
//!
//! let db = Database::new(Config::default());
//! let pages = db
//!     .create_table("pages", [("url", ColumnType::Str)])
//!     .unwrap();
//! pages.insert([("url", Value::Str("http://a".into()))]).unwrap();
//!
//! let mut engine = SearchEngine::new(
//!     Box::new(InMemoryTokenIndex::new()),
//!     Box::new(InMemoryPageIndex::new()),
//! );
//! engine.index_page("http://a", "pages/a.html", ["cat", "dog"]);
//! let hits = engine.search("cat AND NOT mouse");
//! assert!(hits.contains("http://a"));
//! ```


/// One-stop imports for applications built on the engine.
pub mod prelude {
    pub use crate::{Database, SearchEngine};
    pub use common::{Config, EngineError, EngineResult};
    pub use expr::{count, count_of, dict, func, list, lit, raw, sum, Expr};
    pub use recordset::{
        asc, desc, select_from, JoinKind, RecordSet, RecordSetExt, RecordSetOps, SharedRecordSet,
    };
    pub use search::{InMemoryPageIndex, InMemoryTokenIndex, PageIndex, Token, TokenIndex};
    pub use table::{insert_into, Insert, Table};
    pub use types::{ColumnType, Value};
}

use common::{Config, EngineResult};
use query::{parse_query, QueryNode, Simplifier};
use search::{plan, PageIndex, PlanExecutor, PlanNode, Token, TokenIndex};
use std::collections::HashSet;
use std::rc::Rc;
use table::Table;
use tracing::warn;
use types::ColumnType;

/// Table factory bound to one configuration. Each table stores its pages
/// in its own subdirectory of `data_dir`.
pub struct Database {
    config: Config,
}

impl Database {
    pub fn new(config: Config) -> Self {
        Database { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn create_table(
        &self,
        name: &str,
        columns: impl IntoIterator<Item = (impl Into<String>, ColumnType)>,
    ) -> EngineResult<Rc<Table>> {
        Table::create(name, columns, self.config.data_dir.join(name), &self.config)
    }
}

/// Boolean retrieval over a token index and a page index.
pub struct SearchEngine {
    token_index: Box<dyn TokenIndex>,
    page_index: Box<dyn PageIndex>,
    simplifier: Simplifier,
}

impl SearchEngine {
    pub fn new(token_index: Box<dyn TokenIndex>, page_index: Box<dyn PageIndex>) -> Self {
        SearchEngine {
            token_index,
            page_index,
            simplifier: Simplifier::new(),
        }
    }

    /// Replace the default simplifier (seeded runs for tests).
    pub fn with_simplifier(mut self, simplifier: Simplifier) -> Self {
        self.simplifier = simplifier;
        self
    }

    /// Register a page and the tokens it contains.
    pub fn index_page<'a>(
        &mut self,
        url: &str,
        file_path: &str,
        tokens: impl IntoIterator<Item = &'a str>,
    ) {
        self.page_index.add_entry(url, file_path);
        for token in tokens {
            self.token_index.add_entry(&Token::new(token), url);
        }
    }

    /// Run a query through parse → simplify → plan → execute.
    pub fn try_search(&self, input: &str) -> EngineResult<HashSet<String>> {
        let ast = parse_query(input)?;
        Ok(self.run(&ast))
    }

    /// Like [`SearchEngine::try_search`], but malformed queries are
    /// logged and answered with the empty set.
    pub fn search(&self, input: &str) -> HashSet<String> {
        match parse_query(input) {
            Ok(ast) => self.run(&ast),
            Err(e) => {
                warn!(query = input, error = %e, "query rejected");
                self.run(&QueryNode::Empty)
            }
        }
    }

    fn run(&self, ast: &QueryNode) -> HashSet<String> {
        let simplified = self.simplifier.simplify(ast);
        let plan = plan(&simplified);
        self.executor().execute(&plan)
    }

    /// The physical plan a query would run, rendered for inspection.
    pub fn explain(&self, input: &str) -> EngineResult<String> {
        let ast = parse_query(input)?;
        let simplified = self.simplifier.simplify(&ast);
        Ok(plan(&simplified).to_string())
    }

    /// Plan a query without executing it.
    pub fn plan_for(&self, input: &str) -> EngineResult<PlanNode> {
        let ast = parse_query(input)?;
        Ok(plan(&self.simplifier.simplify(&ast)))
    }

    fn executor(&self) -> PlanExecutor<'_> {
        PlanExecutor::new(&*self.token_index, &*self.page_index)
    }
}
