use tracing::{debug, trace};

use crate::dataset::{Dataset, Row};
use crate::results::ResultRow;

/// Rows of the companion dataset related to one selected row
#[derive(Debug, Clone, PartialEq)]
pub struct LinkLookup<'a> {
    /// The key value that was looked up, in its string form
    pub value: String,
    /// Matching companion rows, in dataset order
    pub rows: Vec<&'a Row>,
}

impl LinkLookup<'_> {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }
}

/// Finds the rows of `target` whose `target_key` equals the selected
/// result row's `source_key`, ignoring case.
///
/// Returns `None` when the lookup does not apply: the row is a marker
/// (not-found, empty or duplicate), a key column is blank, or the row has
/// no value for the key.
pub fn resolve_links<'a>(
    source: &ResultRow,
    source_key: &str,
    target: &'a Dataset,
    target_key: &str,
) -> Option<LinkLookup<'a>> {
    if !source.is_match() {
        debug!("Link lookup skipped for {} row", source.kind.label());
        return None;
    }
    resolve_row_links(&source.values, source_key, target, target_key)
}

/// [`resolve_links`] for a plain dataset row
pub fn resolve_row_links<'a>(
    source: &Row,
    source_key: &str,
    target: &'a Dataset,
    target_key: &str,
) -> Option<LinkLookup<'a>> {
    if source_key.trim().is_empty() || target_key.trim().is_empty() {
        debug!("Link lookup skipped, link columns not configured");
        return None;
    }

    let value = source.get(source_key)?.as_text();
    let needle = value.to_lowercase();

    let rows: Vec<&Row> = target
        .rows
        .iter()
        .filter(|row| row.text(target_key).to_lowercase() == needle)
        .collect();
    trace!(
        "Link {}={:?} -> {} rows via {}",
        source_key,
        value,
        rows.len(),
        target_key
    );

    Some(LinkLookup { value, rows })
}
