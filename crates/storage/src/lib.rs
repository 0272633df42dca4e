//! Paginated CSV-backed table storage.
//!
//! A table's rows live in fixed-capacity pages, one CSV file per page
//! (`{table}_{number}.csv`, 1-based). Pages are loaded lazily, kept in a
//! bounded FIFO cache and written back when dirty — on eviction, on
//! [`FilePageStorage::dump_all`], and after a full scan.
//!
//! The cache is deliberately FIFO rather than LRU: access does not
//! reorder the queue. Load patterns are near-append or full-scan, so
//! recency tracking buys nothing here.

mod page;
#[cfg(test)]
mod tests;

pub use page::Page;

use common::{Config, EngineResult};
use expr::{ColumnSet, Record};
use hashbrown::HashMap;
use std::collections::VecDeque;
use std::path::PathBuf;
use std::rc::Rc;
use tracing::warn;

/// One table's page store: page discovery, the FIFO page cache, insert
/// placement and full scans.
///
/// Invariants: at most `cache_size` pages are resident, the resident set
/// equals the queue contents, and a dirty page is never dropped without a
/// write.
#[derive(Debug)]
pub struct FilePageStorage {
    table: String,
    schema: Rc<ColumnSet>,
    dir: PathBuf,
    page_size: usize,
    cache_size: usize,
    strict_reads: bool,
    page_numbers: Vec<u32>,
    pages: HashMap<u32, Page>,
    cache_queue: VecDeque<u32>,
    row_counts: HashMap<u32, usize>,
}

impl FilePageStorage {
    /// Open (or create) the store for `table` under `dir`. Existing page
    /// files are discovered by name; directory creation is best-effort.
    ///
    /// # Panics
    ///
    /// Panics if `page_size` or `cache_size` is 0.
    pub fn open(
        table: impl Into<String>,
        schema: Rc<ColumnSet>,
        dir: impl Into<PathBuf>,
        config: &Config,
    ) -> Self {
        assert!(config.page_size > 0, "page_size must be > 0");
        assert!(config.cache_size > 0, "cache_size must be > 0");
        let table = table.into();
        let dir = dir.into();

        if let Err(e) = std::fs::create_dir_all(&dir) {
            warn!(table = %table, dir = %dir.display(), error = %e, "could not create storage dir");
        }

        let mut storage = FilePageStorage {
            table,
            schema,
            dir,
            page_size: config.page_size,
            cache_size: config.cache_size,
            strict_reads: config.strict_reads,
            page_numbers: Vec::new(),
            pages: HashMap::new(),
            cache_queue: VecDeque::new(),
            row_counts: HashMap::new(),
        };
        storage.discover_pages();
        storage
    }

    /// Scan the storage directory for `{table}_{number}.csv` files.
    fn discover_pages(&mut self) {
        let prefix = format!("{}_", self.table);
        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(table = %self.table, error = %e, "could not list storage dir");
                return;
            }
        };

        let mut numbers: Vec<u32> = entries
            .filter_map(|entry| entry.ok())
            .filter_map(|entry| entry.file_name().into_string().ok())
            .filter_map(|name| {
                name.strip_prefix(&prefix)?
                    .strip_suffix(".csv")?
                    .parse::<u32>()
                    .ok()
            })
            .collect();
        numbers.sort_unstable();
        self.page_numbers = numbers;
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> &Rc<ColumnSet> {
        &self.schema
    }

    /// All known page numbers, ascending. Scan order.
    pub fn page_numbers(&self) -> Vec<u32> {
        let mut numbers = self.page_numbers.clone();
        numbers.sort_unstable();
        numbers
    }

    /// Number of pages currently resident in the cache.
    pub fn resident_pages(&self) -> usize {
        self.pages.len()
    }

    /// True when the resident set and the FIFO queue agree (cache
    /// discipline invariant; exercised by tests).
    pub fn cache_is_consistent(&self) -> bool {
        self.pages.len() == self.cache_queue.len()
            && self.cache_queue.iter().all(|n| self.pages.contains_key(n))
    }

    /// Fetch a page through the cache. A miss with a full queue evicts
    /// the oldest resident page, flushing it when dirty.
    fn page(&mut self, number: u32) -> EngineResult<&mut Page> {
        if !self.page_numbers.contains(&number) {
            self.page_numbers.push(number);
        }

        if !self.cache_queue.contains(&number) {
            if self.cache_queue.len() >= self.cache_size {
                if let Some(oldest) = self.cache_queue.pop_front() {
                    if let Some(mut page) = self.pages.remove(&oldest) {
                        page.flush()?;
                    }
                }
            }
            self.cache_queue.push_back(number);
        }

        if !self.pages.contains_key(&number) {
            let mut page = Page::new(
                &self.table,
                number,
                self.page_size,
                &self.dir,
                Rc::clone(&self.schema),
            );
            page.load(self.strict_reads)?;
            self.row_counts.insert(number, page.len());
            self.pages.insert(number, page);
        }

        Ok(self.pages.get_mut(&number).expect("page just ensured"))
    }

    /// Rows across all pages, resident or not. Counts for non-resident
    /// pages are read from disk once and memoized.
    fn total_rows(&mut self) -> usize {
        let numbers = self.page_numbers();
        let mut total = 0;
        for number in numbers {
            if let Some(page) = self.pages.get(&number) {
                total += page.len();
                continue;
            }
            if let Some(count) = self.row_counts.get(&number) {
                total += count;
                continue;
            }
            let count = self.count_on_disk(number);
            self.row_counts.insert(number, count);
            total += count;
        }
        total
    }

    /// Count data rows of an on-disk page without caching it. Unreadable
    /// files count as empty, mirroring the read-side failure model.
    fn count_on_disk(&self, number: u32) -> usize {
        let path = Page::file_path(&self.table, number, &self.dir);
        match csv::Reader::from_path(&path) {
            Ok(mut reader) => reader.records().filter(|r| r.is_ok()).count(),
            Err(_) => 0,
        }
    }

    /// Place a row into the first page with free capacity, creating pages
    /// as required. The row must already be normalized to the schema.
    pub fn insert(&mut self, record: Record) -> EngineResult<()> {
        let total = self.total_rows();
        let mut number = (total / self.page_size) as u32 + 1;
        loop {
            let full = self.page(number)?.is_full();
            if !full {
                break;
            }
            number += 1;
        }
        self.page(number)?.append(record);
        *self.row_counts.entry(number).or_insert(0) += 1;
        Ok(())
    }

    /// Clone out one page's records (loading it through the cache).
    pub fn page_records(&mut self, number: u32) -> EngineResult<Vec<Record>> {
        Ok(self.page(number)?.records().to_vec())
    }

    /// Flush every resident dirty page.
    pub fn dump_all(&mut self) -> EngineResult<()> {
        let resident: Vec<u32> = self.cache_queue.iter().copied().collect();
        for number in resident {
            if let Some(page) = self.pages.get_mut(&number) {
                page.flush()?;
            }
        }
        Ok(())
    }
}
