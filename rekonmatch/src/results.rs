/// Result types produced by a query run.
///
/// Every emitted row is either a genuine match or carries exactly one
/// marker: not-found, empty or duplicate. Keeping the marker in a single
/// `RowKind` makes "two tags at once" unrepresentable.
use serde::ser::{Serialize, SerializeMap, Serializer};

use crate::dataset::{CellValue, Row};

/// What a result row stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RowKind {
    /// A target row satisfying the term row
    Match,
    /// A term row with no matching target row; values echo the terms
    NotFound,
    /// A term row whose terms were all blank
    Empty,
    /// A target row already emitted for an earlier term row
    Duplicate,
}

impl RowKind {
    /// Flag name used when serializing a tagged row
    pub fn flag(self) -> Option<&'static str> {
        match self {
            RowKind::Match => None,
            RowKind::NotFound => Some("isNotFound"),
            RowKind::Empty => Some("isEmpty"),
            RowKind::Duplicate => Some("isDuplicate"),
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            RowKind::Match => "match",
            RowKind::NotFound => "not-found",
            RowKind::Empty => "empty",
            RowKind::Duplicate => "duplicate",
        }
    }
}

/// One row of a result sequence
#[derive(Debug, Clone, PartialEq)]
pub struct ResultRow {
    pub kind: RowKind,
    /// Column values. For matches and duplicates, the target row; for
    /// not-found rows, the terms; empty for empty rows.
    pub values: Row,
    /// Index of the target row this came from, if any
    pub source_index: Option<usize>,
    /// Input position of the term row that produced this row
    pub term_position: usize,
}

impl ResultRow {
    pub fn matched(term_position: usize, source_index: usize, row: Row) -> Self {
        Self {
            kind: RowKind::Match,
            values: row,
            source_index: Some(source_index),
            term_position,
        }
    }

    pub fn duplicate(term_position: usize, source_index: usize, row: Row) -> Self {
        Self {
            kind: RowKind::Duplicate,
            values: row,
            source_index: Some(source_index),
            term_position,
        }
    }

    pub fn not_found(term_position: usize, terms: Row) -> Self {
        Self {
            kind: RowKind::NotFound,
            values: terms,
            source_index: None,
            term_position,
        }
    }

    pub fn empty(term_position: usize) -> Self {
        Self {
            kind: RowKind::Empty,
            values: Row::new(),
            source_index: None,
            term_position,
        }
    }

    pub fn is_match(&self) -> bool {
        self.kind == RowKind::Match
    }

    pub fn is_not_found(&self) -> bool {
        self.kind == RowKind::NotFound
    }

    pub fn is_empty(&self) -> bool {
        self.kind == RowKind::Empty
    }

    pub fn is_duplicate(&self) -> bool {
        self.kind == RowKind::Duplicate
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.values.get(column)
    }
}

// Serialized as a flat object: the marker flag (if any) followed by the values,
// e.g. {"isNotFound":true,"Name":"Carol"}.
impl Serialize for ResultRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let flag = self.kind.flag();
        let mut map = serializer.serialize_map(Some(self.values.len() + flag.is_some() as usize))?;
        if let Some(flag) = flag {
            map.serialize_entry(flag, &true)?;
        }
        for (column, value) in self.values.iter() {
            map.serialize_entry(column, value)?;
        }
        map.end()
    }
}

/// The ordered result sequence of one run plus summary counters
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryOutput {
    pub rows: Vec<ResultRow>,
    /// Number of term rows the criteria were aligned into
    pub term_rows: usize,
    pub matches: usize,
    pub not_found: usize,
    pub duplicates: usize,
    pub empty: usize,
}

impl QueryOutput {
    pub fn new() -> Self {
        Default::default()
    }

    /// Appends a row and updates the counters
    pub fn push(&mut self, row: ResultRow) {
        match row.kind {
            RowKind::Match => self.matches += 1,
            RowKind::NotFound => self.not_found += 1,
            RowKind::Empty => self.empty += 1,
            RowKind::Duplicate => self.duplicates += 1,
        }
        self.rows.push(row);
    }

    pub fn extend(&mut self, rows: impl IntoIterator<Item = ResultRow>) {
        for row in rows {
            self.push(row);
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter()
    }

    /// Only the untagged rows
    pub fn genuine_matches(&self) -> impl Iterator<Item = &ResultRow> {
        self.rows.iter().filter(|r| r.is_match())
    }
}
