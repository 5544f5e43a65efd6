use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use calamine::{open_workbook_auto, Data, Reader};
use tracing::{debug, info};

use crate::errors::{QueryError, QueryResult};

/// A single cell. Decoders hand over strings, numbers or booleans; the
/// matching engine only ever looks at the string form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(untagged)]
pub enum CellValue {
    Bool(bool),
    Integer(i64),
    Number(f64),
    Text(String),
    #[default]
    Empty,
}

impl CellValue {
    pub fn is_empty(&self) -> bool {
        match self {
            CellValue::Empty => true,
            CellValue::Text(s) => s.is_empty(),
            _ => false,
        }
    }

    /// String form used for comparisons
    pub fn as_text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for CellValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellValue::Bool(b) => write!(f, "{}", b),
            CellValue::Integer(i) => write!(f, "{}", i),
            CellValue::Number(n) => write!(f, "{}", n),
            CellValue::Text(s) => f.write_str(s),
            CellValue::Empty => Ok(()),
        }
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value.to_string())
        }
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        if value.is_empty() {
            CellValue::Empty
        } else {
            CellValue::Text(value)
        }
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        CellValue::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        CellValue::Number(value)
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        CellValue::Bool(value)
    }
}

/// One record, keyed by column name. Cells keep the order they were
/// inserted in, which for loaded rows is the header order.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row {
    cells: IndexMap<String, CellValue>,
}

impl Row {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, column: &str) -> Option<&CellValue> {
        self.cells.get(column)
    }

    /// String form of a column, with a missing column reading as ""
    pub fn text(&self, column: &str) -> String {
        self.cells
            .get(column)
            .map(CellValue::as_text)
            .unwrap_or_default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<CellValue>) {
        self.cells.insert(column.into(), value.into());
    }

    pub fn get_mut(&mut self, column: &str) -> Option<&mut CellValue> {
        self.cells.get_mut(column)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &CellValue)> {
        self.cells.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = (&String, &mut CellValue)> {
        self.cells.iter_mut()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// A copy holding only `columns`, in that order. Columns the row lacks
    /// are skipped.
    pub fn select(&self, columns: &[String]) -> Row {
        columns
            .iter()
            .filter_map(|column| {
                self.cells
                    .get(column)
                    .map(|value| (column.clone(), value.clone()))
            })
            .collect()
    }
}

impl<K, V> FromIterator<(K, V)> for Row
where
    K: Into<String>,
    V: Into<CellValue>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut row = Row::new();
        for (column, value) in iter {
            row.insert(column, value);
        }
        row
    }
}

/// Which of the two loaded datasets an operation refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Primary,
    Secondary,
}

impl Side {
    /// The companion side used for link lookups
    pub fn other(self) -> Side {
        match self {
            Side::Primary => Side::Secondary,
            Side::Secondary => Side::Primary,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Side::Primary => "primary",
            Side::Secondary => "secondary",
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "primary" | "p" => Ok(Side::Primary),
            "secondary" | "s" => Ok(Side::Secondary),
            other => Err(QueryError::config_error(format!(
                "Unknown dataset side '{}', expected primary or secondary",
                other
            ))),
        }
    }
}

/// Header list plus rows loaded from one source
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub headers: Vec<String>,
    pub rows: Vec<Row>,
}

impl Dataset {
    pub fn new(headers: Vec<String>, rows: Vec<Row>) -> Self {
        Self { headers, rows }
    }

    /// Builds a dataset from positional records. Short records are padded
    /// with empty cells; cells past the last header are dropped.
    pub fn from_records<I, R, V>(headers: Vec<String>, records: I) -> Self
    where
        I: IntoIterator<Item = R>,
        R: IntoIterator<Item = V>,
        V: Into<CellValue>,
    {
        let rows = records
            .into_iter()
            .map(|record| {
                let mut values = record.into_iter();
                headers
                    .iter()
                    .map(|header| {
                        let value: CellValue = values.next().map(Into::into).unwrap_or_default();
                        (header.clone(), value)
                    })
                    .collect::<Row>()
            })
            .collect();
        Self { headers, rows }
    }

    /// Decodes CSV input. The first record is the header row.
    pub fn from_csv_reader<R: Read>(reader: R, source: &str) -> QueryResult<Self> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(reader);

        let mut records = csv_reader.records();
        let headers: Vec<String> = match records.next() {
            Some(record) => record?.iter().map(str::to_string).collect(),
            None => return Err(QueryError::empty_dataset(source)),
        };
        if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
            return Err(QueryError::empty_dataset(source));
        }

        let mut body = Vec::new();
        for record in records {
            let record = record?;
            body.push(record.iter().map(str::to_string).collect::<Vec<_>>());
        }

        let dataset = Self::from_records(headers, body);
        debug!(
            "Decoded {} with {} columns and {} rows",
            source,
            dataset.headers.len(),
            dataset.rows.len()
        );
        Ok(dataset)
    }

    /// Opens and decodes a CSV file
    pub fn from_csv_path(path: &Path) -> QueryResult<Self> {
        let file = File::open(path)?;
        let dataset = Self::from_csv_reader(file, &path.display().to_string())?;
        info!(
            "Loaded {} ({} rows)",
            path.display(),
            dataset.rows.len()
        );
        Ok(dataset)
    }

    /// Reads the first sheet of a spreadsheet workbook. The first row holds
    /// the headers; every later row becomes a record.
    pub fn from_workbook_path(path: &Path) -> QueryResult<Self> {
        let source = path.display().to_string();
        let mut workbook = open_workbook_auto(path)?;
        let range = workbook
            .worksheet_range_at(0)
            .ok_or_else(|| QueryError::empty_dataset(&source))??;

        let mut rows = range.rows();
        let headers: Vec<String> = match rows.next() {
            Some(cells) => cells.iter().map(|cell| cell.to_string()).collect(),
            None => return Err(QueryError::empty_dataset(&source)),
        };
        if headers.iter().all(|h| h.is_empty()) {
            return Err(QueryError::empty_dataset(&source));
        }

        let body: Vec<Vec<CellValue>> = rows
            .map(|cells| cells.iter().map(workbook_cell).collect())
            .collect();
        let dataset = Self::from_records(headers, body);
        info!("Loaded {} ({} rows)", source, dataset.rows.len());
        Ok(dataset)
    }

    /// Picks a decoder from the file extension. Anything that is not a
    /// known workbook format is read as CSV.
    pub fn from_path(path: &Path) -> QueryResult<Self> {
        if is_workbook(path) {
            Self::from_workbook_path(path)
        } else {
            Self::from_csv_path(path)
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.headers.iter().any(|h| h == column)
    }
}

const WORKBOOK_EXTENSIONS: &[&str] = &["xlsx", "xlsm", "xlsb", "xls", "ods"];

fn is_workbook(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| {
            WORKBOOK_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
        .unwrap_or(false)
}

fn workbook_cell(cell: &Data) -> CellValue {
    match cell {
        Data::Empty => CellValue::Empty,
        Data::String(s) => CellValue::from(s.as_str()),
        Data::Int(i) => CellValue::Integer(*i),
        Data::Float(f) => CellValue::Number(*f),
        Data::Bool(b) => CellValue::Bool(*b),
        Data::Error(e) => CellValue::Text(format!("{e:?}")),
        other => CellValue::from(other.to_string()),
    }
}
