use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::errors::QueryError;

/// How a raw criterion string is cut into terms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TermSplit {
    /// Split on commas and line breaks, trim, drop blank pieces
    #[default]
    Compact,
    /// Split on line breaks only and keep blank lines, so that a pasted
    /// column keeps its row positions
    Positional,
}

impl TermSplit {
    pub fn split(self, raw: &str) -> Vec<String> {
        match self {
            TermSplit::Compact => parse_terms(raw),
            TermSplit::Positional => split_positions(raw),
        }
    }
}

impl fmt::Display for TermSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TermSplit::Compact => f.write_str("compact"),
            TermSplit::Positional => f.write_str("positional"),
        }
    }
}

impl FromStr for TermSplit {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "compact" => Ok(TermSplit::Compact),
            "positional" | "lines" => Ok(TermSplit::Positional),
            other => Err(QueryError::config_error(format!(
                "Unknown term split mode '{}', expected compact or positional",
                other
            ))),
        }
    }
}

/// Splits a raw criterion on every comma or line break, trims each piece
/// and discards the empty ones. Order of appearance is preserved.
pub fn parse_terms(raw: &str) -> Vec<String> {
    raw.split(|c| c == ',' || c == '\n' || c == '\r')
        .map(str::trim)
        .filter(|term| !term.is_empty())
        .map(str::to_string)
        .collect()
}

/// Splits a raw criterion into one trimmed term per line. Blank lines stay
/// in place as empty terms. A single trailing line break does not open a
/// new position.
pub fn split_positions(raw: &str) -> Vec<String> {
    if raw.is_empty() {
        return Vec::new();
    }
    let normalized = raw.replace("\r\n", "\n").replace('\r', "\n");
    let body = normalized.strip_suffix('\n').unwrap_or(&normalized);
    body.split('\n').map(|line| line.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_terms_commas_and_newlines() {
        assert_eq!(
            parse_terms("Alice, Bob\nCarol\r\n  Dave  "),
            vec!["Alice", "Bob", "Carol", "Dave"]
        );
    }

    #[test]
    fn test_parse_terms_drops_blank_pieces() {
        assert_eq!(parse_terms(",,\n  \n,x,"), vec!["x"]);
        assert!(parse_terms("").is_empty());
        assert!(parse_terms("   \n  ").is_empty());
    }

    #[test]
    fn test_parse_terms_keeps_repeats_in_order() {
        assert_eq!(parse_terms("b,a,b"), vec!["b", "a", "b"]);
    }

    #[test]
    fn test_split_positions_keeps_blank_lines() {
        assert_eq!(split_positions("A\n\nC"), vec!["A", "", "C"]);
        assert_eq!(split_positions("A\r\n  \r\nC\n"), vec!["A", "", "C"]);
        assert_eq!(split_positions("x, y"), vec!["x, y"]);
        assert!(split_positions("").is_empty());
    }

    #[test]
    fn test_split_mode_parsing() {
        assert_eq!("Compact".parse::<TermSplit>().unwrap(), TermSplit::Compact);
        assert_eq!("lines".parse::<TermSplit>().unwrap(), TermSplit::Positional);
        assert!("words".parse::<TermSplit>().is_err());
    }
}
