/// The query matching engine.
///
/// Data flows leaf to root:
///
/// 1. [`terms`] cuts each criterion's raw text into terms.
/// 2. [`aligner`] lines the per-column term lists up by position into
///    term rows. A shorter list puts no constraint on later positions.
/// 3. [`matcher`] scans the target rows for each term row (AND across
///    columns), marking rows already emitted as duplicates and reporting a
///    not-found row when nothing matches.
/// 4. [`synthesizer`] flattens it all into one ordered, tagged sequence.
///
/// [`engine`] wires the steps together and validates the query first.
/// [`link`] is separate: it looks up related rows in the companion dataset
/// for one selected result row.
///
/// ```rust,ignore
/// let spec = QuerySpec::new().with_criterion("Name", "Alice\nCarol", SearchOperator::Equals);
/// let output = run_query(&spec, Some(&dataset), &QueryOptions::default())?;
/// for row in output.iter() {
///     // row.kind is Match, NotFound, Empty or Duplicate
/// }
/// ```
pub mod aligner;
pub mod criteria;
pub mod engine;
pub mod link;
pub mod matcher;
pub mod predicate;
pub mod synthesizer;
pub mod terms;

pub use aligner::{align, TermRow};
pub use criteria::{ActiveCriterion, QuerySpec, SearchCriterion};
pub use engine::{run_query, run_query_with_cancel, QueryOptions};
pub use link::{resolve_links, resolve_row_links, LinkLookup};
pub use matcher::{match_term_row, EmittedRows, RowMatcher, TermRowOutcome};
pub use predicate::{matches, SearchOperator, TermMatcher};
pub use synthesizer::{synthesize, TermRowResult};
pub use terms::{parse_terms, split_positions, TermSplit};
