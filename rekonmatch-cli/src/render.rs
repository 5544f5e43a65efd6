use colored::{ColoredString, Colorize};
use rekonmatch::query::LinkLookup;
use rekonmatch::{QueryOutput, ResultRow, Row, RowKind};
use serde_json::json;

const DUPLICATE_NOTE: &str = "Result already shown";

fn status(kind: RowKind) -> ColoredString {
    match kind {
        RowKind::Match => kind.label().green(),
        RowKind::NotFound => kind.label().red(),
        RowKind::Duplicate => kind.label().yellow(),
        RowKind::Empty => kind.label().dimmed(),
    }
}

fn cells(row: &Row, headers: &[String]) -> String {
    headers
        .iter()
        .map(|header| row.get(header).map(|v| v.to_string()).unwrap_or_default())
        .collect::<Vec<_>>()
        .join("\t")
}

/// Prints result rows as tab-separated lines with a leading status column,
/// followed by any linked rows and a summary.
pub fn print_rows(
    output: &QueryOutput,
    headers: &[String],
    links: Option<&[Option<LinkLookup<'_>>]>,
    companion_headers: &[String],
) {
    println!("status\t{}", headers.join("\t"));

    for (i, row) in output.iter().enumerate() {
        let line = cells(&row.values, headers);
        if row.is_duplicate() {
            println!("{}\t{}\t{}", status(row.kind), line, DUPLICATE_NOTE.dimmed());
        } else {
            println!("{}\t{}", status(row.kind), line);
        }

        let Some(Some(lookup)) = links.and_then(|links| links.get(i)) else {
            continue;
        };
        if lookup.is_empty() {
            println!("  {} no linked rows for '{}'", "->".blue(), lookup.value);
        }
        for linked in &lookup.rows {
            println!("  {} {}", "->".blue(), cells(linked, companion_headers));
        }
    }

    println!(
        "\nFound {} matches, {} not found, {} duplicates, {} empty across {} term rows",
        output.matches, output.not_found, output.duplicates, output.empty, output.term_rows
    );
}

/// Prints result rows as a JSON array holding only `headers`, in that
/// order. With links, each element carries the row and the rows linked to
/// it.
pub fn print_json(
    output: &QueryOutput,
    headers: &[String],
    links: Option<&[Option<LinkLookup<'_>>]>,
    companion_headers: &[String],
) -> serde_json::Result<()> {
    let shown = |row: &ResultRow| ResultRow {
        values: row.values.select(headers),
        ..row.clone()
    };
    let text = match links {
        None => {
            let rows: Vec<_> = output.iter().map(shown).collect();
            serde_json::to_string_pretty(&rows)?
        }
        Some(links) => {
            let rows: Vec<_> = output
                .iter()
                .zip(links)
                .map(|(row, lookup)| {
                    linked_json(&shown(row), lookup.as_ref(), companion_headers)
                })
                .collect();
            serde_json::to_string_pretty(&rows)?
        }
    };
    println!("{}", text);
    Ok(())
}

fn linked_json(
    row: &ResultRow,
    lookup: Option<&LinkLookup<'_>>,
    companion_headers: &[String],
) -> serde_json::Value {
    let linked = lookup.map(|lookup| {
        lookup
            .rows
            .iter()
            .map(|linked| linked.select(companion_headers))
            .collect::<Vec<Row>>()
    });
    json!({
        "row": row,
        "linked": linked,
    })
}
