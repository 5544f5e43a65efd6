use rayon::prelude::*;
use std::collections::HashSet;
use tracing::trace;

use super::aligner::TermRow;
use super::criteria::ActiveCriterion;
use super::predicate::TermMatcher;
use crate::dataset::{CellValue, Row};
use crate::metrics::QueryMetrics;
use crate::results::ResultRow;

/// Targets at least this large are scanned on the rayon pool
pub const PARALLEL_SCAN_THRESHOLD: usize = 4096;
const MIN_PARALLEL_CHUNK: usize = 256;

/// Target rows already emitted during one run, identified by their index
/// in the target dataset. Two rows with identical contents stay distinct.
#[derive(Debug, Clone, Default)]
pub struct EmittedRows {
    seen: HashSet<usize>,
}

impl EmittedRows {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `index`; returns false if it was already emitted
    pub fn insert(&mut self, index: usize) -> bool {
        self.seen.insert(index)
    }

    pub fn contains(&self, index: usize) -> bool {
        self.seen.contains(&index)
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }

    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }
}

/// What one term row produced
#[derive(Debug, Clone, PartialEq)]
pub struct TermRowOutcome {
    /// Matches and duplicate markers in target order, or a single
    /// not-found row
    pub rows: Vec<ResultRow>,
    /// No matched row had been emitted before
    pub duplicate_free: bool,
}

/// Scans a target row collection for the rows satisfying a term row
#[derive(Debug)]
pub struct RowMatcher<'a> {
    active: &'a [ActiveCriterion],
    target: &'a [Row],
    threads: usize,
    metrics: QueryMetrics,
}

impl<'a> RowMatcher<'a> {
    pub fn new(active: &'a [ActiveCriterion], target: &'a [Row]) -> Self {
        Self {
            active,
            target,
            threads: 1,
            metrics: QueryMetrics::new(),
        }
    }

    /// Allows large scans to use up to `threads` workers
    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads.max(1);
        self
    }

    pub fn with_metrics(mut self, metrics: QueryMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    pub fn metrics(&self) -> &QueryMetrics {
        &self.metrics
    }

    fn compile(&self, term_row: &TermRow) -> Vec<(&'a str, TermMatcher)> {
        term_row
            .constraints()
            .filter_map(|(column, term)| {
                self.active
                    .iter()
                    .find(|a| a.column == column)
                    .map(|a| (a.column.as_str(), TermMatcher::new(a.criterion.operator, term)))
            })
            .collect()
    }

    fn uses_parallel_scan(&self) -> bool {
        self.threads > 1 && self.target.len() >= PARALLEL_SCAN_THRESHOLD
    }

    /// Indices of target rows satisfying every constraint, in target order
    pub fn find_indices(&self, term_row: &TermRow) -> Vec<usize> {
        let compiled = self.compile(term_row);
        let satisfies = |row: &Row| {
            compiled.iter().all(|(column, matcher)| match row.get(column) {
                Some(value) => matcher.is_match(value),
                None => matcher.is_match(&CellValue::Empty),
            })
        };

        let parallel = self.uses_parallel_scan();
        let indices: Vec<usize> = if parallel {
            let chunk = (self.target.len() / self.threads).max(MIN_PARALLEL_CHUNK);
            self.target
                .par_iter()
                .with_min_len(chunk)
                .enumerate()
                .filter(|(_, row)| satisfies(row))
                .map(|(i, _)| i)
                .collect()
        } else {
            self.target
                .iter()
                .enumerate()
                .filter(|(_, row)| satisfies(row))
                .map(|(i, _)| i)
                .collect()
        };

        self.metrics.record_scan(self.target.len() as u64, parallel);
        indices
    }

    /// Matches one term row, emitting a duplicate marker for any target row
    /// already in `emitted` and a single not-found row when nothing matches.
    ///
    /// A term row without constraints matches every target row; callers
    /// handle blank term rows before getting here.
    pub fn match_term_row(&self, term_row: &TermRow, emitted: &mut EmittedRows) -> TermRowOutcome {
        let indices = self.find_indices(term_row);
        trace!(
            "Term row {} matched {} rows",
            term_row.position(),
            indices.len()
        );

        if indices.is_empty() {
            self.metrics.record_not_found();
            let terms: Row = term_row.iter().collect();
            return TermRowOutcome {
                rows: vec![ResultRow::not_found(term_row.position(), terms)],
                duplicate_free: true,
            };
        }

        let mut rows = Vec::with_capacity(indices.len());
        let mut duplicates = 0u64;
        for index in indices {
            let source = self.target[index].clone();
            if emitted.insert(index) {
                rows.push(ResultRow::matched(term_row.position(), index, source));
            } else {
                duplicates += 1;
                rows.push(ResultRow::duplicate(term_row.position(), index, source));
            }
        }
        self.metrics.record_matches(rows.len() as u64 - duplicates);
        self.metrics.record_duplicates(duplicates);

        TermRowOutcome {
            rows,
            duplicate_free: duplicates == 0,
        }
    }
}

/// Single-threaded convenience wrapper around [`RowMatcher::match_term_row`]
pub fn match_term_row(
    term_row: &TermRow,
    active: &[ActiveCriterion],
    target: &[Row],
    emitted: &mut EmittedRows,
) -> TermRowOutcome {
    RowMatcher::new(active, target).match_term_row(term_row, emitted)
}
