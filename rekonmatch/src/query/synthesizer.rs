use super::matcher::TermRowOutcome;
use crate::results::{QueryOutput, ResultRow};

/// What happened at one term-row position
#[derive(Debug, Clone, PartialEq)]
pub enum TermRowResult {
    /// All terms at this position were blank; no scan was made
    Blank { position: usize },
    /// The matcher ran for this position
    Matched(TermRowOutcome),
}

/// Flattens per-position results into one ordered result sequence.
///
/// Positions keep their input order. Blank positions become a single empty
/// marker when `include_empty_rows` is set and are dropped otherwise.
pub fn synthesize<I>(results: I, include_empty_rows: bool) -> QueryOutput
where
    I: IntoIterator<Item = TermRowResult>,
{
    let mut output = QueryOutput::new();
    for result in results {
        output.term_rows += 1;
        match result {
            TermRowResult::Blank { position } => {
                if include_empty_rows {
                    output.push(ResultRow::empty(position));
                }
            }
            TermRowResult::Matched(outcome) => output.extend(outcome.rows),
        }
    }
    output
}
