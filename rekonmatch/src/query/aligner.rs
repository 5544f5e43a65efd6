use tracing::debug;

use super::criteria::ActiveCriterion;
use super::terms::TermSplit;

/// The terms at one input position, one per active column. An empty
/// string means the column puts no constraint on this position.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TermRow {
    position: usize,
    terms: Vec<(String, String)>,
}

impl TermRow {
    pub fn new(position: usize, terms: Vec<(String, String)>) -> Self {
        Self { position, terms }
    }

    /// Zero-based input position
    pub fn position(&self) -> usize {
        self.position
    }

    pub fn term(&self, column: &str) -> Option<&str> {
        self.terms
            .iter()
            .find(|(c, _)| c == column)
            .map(|(_, t)| t.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.terms.iter().map(|(c, t)| (c.as_str(), t.as_str()))
    }

    /// Columns that actually constrain this position
    pub fn constraints(&self) -> impl Iterator<Item = (&str, &str)> {
        self.iter().filter(|(_, t)| !t.is_empty())
    }

    /// Every column's term is blank at this position
    pub fn is_empty(&self) -> bool {
        self.terms.iter().all(|(_, t)| t.is_empty())
    }
}

/// Lines up the term lists of all active criteria by position.
///
/// Produces as many term rows as the longest list. A column whose list is
/// shorter contributes an empty term (no constraint) past its end; the last
/// term is never repeated.
pub fn align(active: &[ActiveCriterion], split: TermSplit) -> Vec<TermRow> {
    let lists: Vec<(&str, Vec<String>)> = active
        .iter()
        .map(|a| (a.column.as_str(), split.split(&a.criterion.value)))
        .collect();

    let depth = lists.iter().map(|(_, terms)| terms.len()).max().unwrap_or(0);
    debug!(
        "Aligned {} criteria into {} term rows ({} split)",
        lists.len(),
        depth,
        split
    );

    (0..depth)
        .map(|i| {
            let terms = lists
                .iter()
                .map(|(column, terms)| {
                    let term = terms.get(i).cloned().unwrap_or_default();
                    (column.to_string(), term)
                })
                .collect();
            TermRow::new(i, terms)
        })
        .collect()
}
