use anyhow::Result;
use rekonmatch::query::{
    resolve_links, run_query, QueryOptions, QuerySpec, SearchOperator, TermSplit,
};
use rekonmatch::{CellValue, Dataset, QueryError, Row, RowKind};
use std::fs;
use tempfile::tempdir;

fn people() -> Dataset {
    Dataset::from_records(
        vec!["Name".to_string(), "City".to_string()],
        vec![vec!["Alice", "NY"], vec!["Bob", "LA"]],
    )
}

fn row(pairs: &[(&str, &str)]) -> Row {
    pairs.iter().map(|(k, v)| (*k, *v)).collect()
}

#[test]
fn test_equals_with_missing_term() -> Result<()> {
    let spec = QuerySpec::new().with_criterion("Name", "Alice\nCarol", SearchOperator::Equals);
    let output = run_query(&spec, Some(&people()), &QueryOptions::default())?;

    assert_eq!(output.len(), 2);
    assert_eq!(output.rows[0].kind, RowKind::Match);
    assert_eq!(output.rows[0].values, row(&[("Name", "Alice"), ("City", "NY")]));
    assert_eq!(output.rows[1].kind, RowKind::NotFound);
    assert_eq!(output.rows[1].values, row(&[("Name", "Carol")]));
    Ok(())
}

#[test]
fn test_contains_partial_term() -> Result<()> {
    let spec = QuerySpec::new().with_criterion("Name", "Ali", SearchOperator::Contains);
    let output = run_query(&spec, Some(&people()), &QueryOptions::default())?;

    assert_eq!(output.len(), 1);
    assert!(output.rows[0].is_match());
    assert_eq!(output.rows[0].values, row(&[("Name", "Alice"), ("City", "NY")]));
    Ok(())
}

#[test]
fn test_repeated_term_yields_duplicate_marker() -> Result<()> {
    let spec = QuerySpec::new()
        .with_criterion("Name", "Alice\nAlice", SearchOperator::Equals)
        .with_criterion("City", "", SearchOperator::Contains);
    let output = run_query(&spec, Some(&people()), &QueryOptions::default())?;

    assert_eq!(output.len(), 2);
    assert!(output.rows[0].is_match());
    assert!(output.rows[1].is_duplicate());
    assert_eq!(output.rows[1].values, row(&[("Name", "Alice"), ("City", "NY")]));
    assert_eq!(output.duplicates, 1);
    Ok(())
}

#[test]
fn test_blank_criterion_with_empty_rows() -> Result<()> {
    let spec = QuerySpec::new().with_criterion("Name", "   \n  ", SearchOperator::Contains);
    let output = run_query(&spec, Some(&people()), &QueryOptions::default())?;

    assert_eq!(output.len(), 1);
    assert!(output.rows[0].is_empty());
    assert_eq!(output.matches, 0);
    Ok(())
}

#[test]
fn test_link_lookup_ignores_case() -> Result<()> {
    let companion = Dataset::new(
        vec!["Key".to_string(), "V".to_string()],
        vec![
            vec![("Key", CellValue::from("x1")), ("V", CellValue::Integer(1))]
                .into_iter()
                .collect(),
            vec![("Key", CellValue::from("Y2")), ("V", CellValue::Integer(2))]
                .into_iter()
                .collect(),
        ],
    );
    let source = Dataset::from_records(vec!["Key".to_string()], vec![vec!["X1"]]);
    let spec = QuerySpec::new().with_criterion("Key", "X1", SearchOperator::Equals);
    let output = run_query(&spec, Some(&source), &QueryOptions::default())?;

    let lookup = resolve_links(&output.rows[0], "Key", &companion, "Key").unwrap();
    assert_eq!(lookup.rows.len(), 1);
    assert_eq!(lookup.rows[0].get("V"), Some(&CellValue::Integer(1)));
    assert_eq!(lookup.rows[0].text("Key"), "x1");
    Ok(())
}

#[test]
fn test_first_occurrence_is_plain_match() -> Result<()> {
    let target = Dataset::from_records(
        vec!["Code".to_string()],
        vec![vec!["A1"], vec!["A2"], vec!["B1"]],
    );
    // "A" hits rows 0 and 1, "a2" hits row 1 again, "1" hits rows 0 and 2
    let spec = QuerySpec::new().with_criterion("Code", "A, a2, 1", SearchOperator::Contains);
    let output = run_query(&spec, Some(&target), &QueryOptions::default())?;

    let seen: Vec<_> = output
        .iter()
        .map(|r| (r.term_position, r.source_index.unwrap(), r.kind))
        .collect();
    assert_eq!(
        seen,
        vec![
            (0, 0, RowKind::Match),
            (0, 1, RowKind::Match),
            (1, 1, RowKind::Duplicate),
            (2, 0, RowKind::Duplicate),
            (2, 2, RowKind::Match),
        ]
    );
    Ok(())
}

#[test]
fn test_runs_are_independent() -> Result<()> {
    let spec = QuerySpec::new().with_criterion("Name", "a, b, alice", SearchOperator::Contains);
    let target = people();
    let options = QueryOptions::default();

    let first = run_query(&spec, Some(&target), &options)?;
    let second = run_query(&spec, Some(&target), &options)?;
    assert_eq!(first, second);
    Ok(())
}

#[test]
fn test_term_order_is_primary_sort_key() -> Result<()> {
    let spec = QuerySpec::new().with_criterion("Name", "Bob\nAlice", SearchOperator::Equals);
    let output = run_query(&spec, Some(&people()), &QueryOptions::default())?;
    let names: Vec<_> = output.iter().map(|r| r.values.text("Name")).collect();
    assert_eq!(names, vec!["Bob", "Alice"]);
    Ok(())
}

#[test]
fn test_csv_file_end_to_end() -> Result<()> {
    let dir = tempdir()?;
    let path = dir.path().join("ledger.csv");
    fs::write(
        &path,
        "Invoice,Amount,Customer\nINV-001,100,Acme\nINV-002,250,Globex\nINV-003,75,acme corp\n",
    )?;
    let ledger = Dataset::from_csv_path(&path)?;

    let spec = QuerySpec::new()
        .with_criterion("Customer", "acme\n\nglobex", SearchOperator::StartsWith);
    let options = QueryOptions {
        term_split: TermSplit::Positional,
        ..Default::default()
    };
    let output = run_query(&spec, Some(&ledger), &options)?;

    let invoices: Vec<_> = output
        .iter()
        .map(|r| (r.kind, r.values.text("Invoice")))
        .collect();
    assert_eq!(
        invoices,
        vec![
            (RowKind::Match, "INV-001".to_string()),
            (RowKind::Match, "INV-003".to_string()),
            (RowKind::Empty, String::new()),
            (RowKind::Match, "INV-002".to_string()),
        ]
    );
    Ok(())
}

#[test]
fn test_error_conditions_are_distinct() {
    let spec = QuerySpec::new().with_criterion("Name", "Alice", SearchOperator::Equals);
    assert!(matches!(
        run_query(&spec, None, &QueryOptions::default()),
        Err(QueryError::NoTargetData(_))
    ));
    assert!(matches!(
        run_query(&QuerySpec::new(), Some(&people()), &QueryOptions::default()),
        Err(QueryError::InvalidQuery(_))
    ));
}
