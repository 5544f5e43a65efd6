use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info};

/// Counters for one or more query runs
#[derive(Debug, Clone)]
pub struct QueryMetrics {
    term_rows: Arc<AtomicU64>,
    rows_scanned: Arc<AtomicU64>,
    parallel_scans: Arc<AtomicU64>,

    matches: Arc<AtomicU64>,
    not_found: Arc<AtomicU64>,
    duplicates: Arc<AtomicU64>,
    empty_rows: Arc<AtomicU64>,
}

impl QueryMetrics {
    /// Creates a new QueryMetrics instance
    pub fn new() -> Self {
        Self {
            term_rows: Arc::new(AtomicU64::new(0)),
            rows_scanned: Arc::new(AtomicU64::new(0)),
            parallel_scans: Arc::new(AtomicU64::new(0)),
            matches: Arc::new(AtomicU64::new(0)),
            not_found: Arc::new(AtomicU64::new(0)),
            duplicates: Arc::new(AtomicU64::new(0)),
            empty_rows: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Records one scan of the target for a term row
    pub fn record_scan(&self, rows: u64, parallel: bool) {
        self.term_rows.fetch_add(1, Ordering::Relaxed);
        let total = self.rows_scanned.fetch_add(rows, Ordering::Relaxed) + rows;
        if parallel {
            self.parallel_scans.fetch_add(1, Ordering::Relaxed);
        }
        debug!("Scanned {} rows, total scanned: {}", rows, total);
    }

    pub fn record_matches(&self, count: u64) {
        self.matches.fetch_add(count, Ordering::Relaxed);
    }

    pub fn record_not_found(&self) {
        self.not_found.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_duplicates(&self, count: u64) {
        self.duplicates.fetch_add(count, Ordering::Relaxed);
    }

    /// Records a blank term row, which never triggers a scan
    pub fn record_empty_row(&self) {
        self.term_rows.fetch_add(1, Ordering::Relaxed);
        self.empty_rows.fetch_add(1, Ordering::Relaxed);
    }

    /// Gets a snapshot of the counters
    pub fn get_stats(&self) -> QueryStats {
        QueryStats {
            term_rows: self.term_rows.load(Ordering::Relaxed),
            rows_scanned: self.rows_scanned.load(Ordering::Relaxed),
            parallel_scans: self.parallel_scans.load(Ordering::Relaxed),
            matches: self.matches.load(Ordering::Relaxed),
            not_found: self.not_found.load(Ordering::Relaxed),
            duplicates: self.duplicates.load(Ordering::Relaxed),
            empty_rows: self.empty_rows.load(Ordering::Relaxed),
        }
    }

    /// Logs the current counters
    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            "Query stats:\n\
             Term rows: {} ({} blank)\n\
             Rows scanned: {} ({} parallel scans)\n\
             Matches/not found/duplicates: {}/{}/{}",
            stats.term_rows,
            stats.empty_rows,
            stats.rows_scanned,
            stats.parallel_scans,
            stats.matches,
            stats.not_found,
            stats.duplicates
        );
    }
}

impl Default for QueryMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of [`QueryMetrics`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct QueryStats {
    pub term_rows: u64,
    pub rows_scanned: u64,
    pub parallel_scans: u64,
    pub matches: u64,
    pub not_found: u64,
    pub duplicates: u64,
    pub empty_rows: u64,
}
