use std::num::NonZeroUsize;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, info};

use super::aligner::align;
use super::criteria::QuerySpec;
use super::matcher::{EmittedRows, RowMatcher};
use super::synthesizer::{synthesize, TermRowResult};
use super::terms::TermSplit;
use crate::config::QueryConfig;
use crate::dataset::Dataset;
use crate::errors::{QueryError, QueryResult};
use crate::metrics::QueryMetrics;
use crate::results::{QueryOutput, ResultRow};

/// Per-run options
#[derive(Debug, Clone, PartialEq)]
pub struct QueryOptions {
    pub include_empty_rows: bool,
    pub term_split: TermSplit,
    pub thread_count: NonZeroUsize,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            include_empty_rows: true,
            term_split: TermSplit::Compact,
            thread_count: NonZeroUsize::MIN,
        }
    }
}

impl From<&QueryConfig> for QueryOptions {
    fn from(config: &QueryConfig) -> Self {
        Self {
            include_empty_rows: config.include_empty_rows,
            term_split: config.term_split,
            thread_count: config.thread_count,
        }
    }
}

/// Runs one query against `target`.
///
/// Result rows keep term-row input order; within a term row, target order.
/// Each call starts from a fresh set of emitted rows, so repeated runs over
/// an unchanged target give identical output.
pub fn run_query(
    spec: &QuerySpec,
    target: Option<&Dataset>,
    options: &QueryOptions,
) -> QueryResult<QueryOutput> {
    run_query_with_cancel(spec, target, options, &AtomicBool::new(false))
}

/// Like [`run_query`], checking `cancel` between term rows
pub fn run_query_with_cancel(
    spec: &QuerySpec,
    target: Option<&Dataset>,
    options: &QueryOptions,
    cancel: &AtomicBool,
) -> QueryResult<QueryOutput> {
    if !spec.has_search_columns() {
        debug!("No search columns selected");
        return Err(QueryError::invalid_query("no active search columns"));
    }

    let active = spec.active_criteria();
    if active.is_empty() && !options.include_empty_rows {
        debug!("All search criteria are blank");
        return Err(QueryError::invalid_query("no active search criteria"));
    }

    let target = match target {
        Some(dataset) if !dataset.is_empty() => dataset,
        _ => return Err(QueryError::no_target_data("target dataset is missing or empty")),
    };

    let term_rows = align(&active, options.term_split);
    info!(
        "Running query: {} active columns, {} term rows, {} target rows",
        active.len(),
        term_rows.len(),
        target.len()
    );

    if term_rows.is_empty() {
        if !options.include_empty_rows {
            return Err(QueryError::invalid_query("no search terms"));
        }
        debug!("No terms after parsing, reporting a single blank position");
        let mut output = QueryOutput::new();
        output.term_rows = 1;
        output.push(ResultRow::empty(0));
        return Ok(output);
    }

    let metrics = QueryMetrics::new();
    let matcher = RowMatcher::new(&active, &target.rows)
        .with_threads(options.thread_count.get())
        .with_metrics(metrics.clone());
    let mut emitted = EmittedRows::new();
    let mut results = Vec::with_capacity(term_rows.len());

    for term_row in &term_rows {
        if cancel.load(Ordering::Relaxed) {
            info!("Query cancelled at term row {}", term_row.position());
            return Err(QueryError::Cancelled);
        }
        if term_row.is_empty() {
            metrics.record_empty_row();
            results.push(TermRowResult::Blank {
                position: term_row.position(),
            });
        } else {
            let outcome = matcher.match_term_row(term_row, &mut emitted);
            results.push(TermRowResult::Matched(outcome));
        }
    }

    let output = synthesize(results, options.include_empty_rows);
    metrics.log_stats();
    info!(
        "Query complete. {} matches, {} not found, {} duplicates, {} empty",
        output.matches, output.not_found, output.duplicates, output.empty
    );

    Ok(output)
}
