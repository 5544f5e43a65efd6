use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::fmt;
use std::str::FromStr;
use tracing::warn;

use crate::dataset::CellValue;

/// Comparison applied between a cell and a term
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SearchOperator {
    #[default]
    Contains,
    Equals,
    StartsWith,
    EndsWith,
    /// Anything we do not recognise. Never matches.
    #[serde(other)]
    Unsupported,
}

impl SearchOperator {
    pub fn as_str(self) -> &'static str {
        match self {
            SearchOperator::Contains => "contains",
            SearchOperator::Equals => "equals",
            SearchOperator::StartsWith => "startsWith",
            SearchOperator::EndsWith => "endsWith",
            SearchOperator::Unsupported => "unsupported",
        }
    }

    /// Recognised operator names, ignoring case, `-` and `_`. `None` for
    /// anything else.
    pub fn from_name(name: &str) -> Option<Self> {
        let normalized: String = name
            .trim()
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .collect::<String>()
            .to_lowercase();
        match normalized.as_str() {
            "contains" => Some(SearchOperator::Contains),
            "equals" | "eq" | "=" => Some(SearchOperator::Equals),
            "startswith" | "prefix" => Some(SearchOperator::StartsWith),
            "endswith" | "suffix" => Some(SearchOperator::EndsWith),
            _ => None,
        }
    }
}

impl fmt::Display for SearchOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SearchOperator {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from_name(s).unwrap_or_else(|| {
            warn!("Unsupported search operator '{}', it will never match", s);
            SearchOperator::Unsupported
        }))
    }
}

/// Case-insensitive test of one cell against one operator and term.
/// A blank term never matches.
pub fn matches(cell: &CellValue, operator: SearchOperator, term: &str) -> bool {
    TermMatcher::new(operator, term).is_match(cell)
}

/// A term prepared for repeated comparisons: lowercased once up front
#[derive(Debug, Clone)]
pub struct TermMatcher {
    operator: SearchOperator,
    needle: String,
}

impl TermMatcher {
    pub fn new(operator: SearchOperator, term: &str) -> Self {
        Self {
            operator,
            needle: term.to_lowercase(),
        }
    }

    pub fn operator(&self) -> SearchOperator {
        self.operator
    }

    pub fn is_match(&self, cell: &CellValue) -> bool {
        self.is_match_str(&cell.as_text())
    }

    pub fn is_match_str(&self, value: &str) -> bool {
        if self.needle.is_empty() {
            return false;
        }
        let value = value.to_lowercase();
        match self.operator {
            SearchOperator::Contains => value.contains(&self.needle),
            SearchOperator::Equals => value == self.needle,
            SearchOperator::StartsWith => value.starts_with(&self.needle),
            SearchOperator::EndsWith => value.ends_with(&self.needle),
            SearchOperator::Unsupported => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPERATORS: [SearchOperator; 4] = [
        SearchOperator::Contains,
        SearchOperator::Equals,
        SearchOperator::StartsWith,
        SearchOperator::EndsWith,
    ];

    #[test]
    fn test_term_matches_itself_under_every_operator() {
        for term in ["Alice", "x", "Ünïcode", "12.5"] {
            for op in OPERATORS {
                assert!(matches(&CellValue::from(term), op, term), "{} {}", op, term);
            }
        }
    }

    #[test]
    fn test_blank_term_never_matches() {
        for op in OPERATORS {
            assert!(!matches(&CellValue::from("anything"), op, ""));
            assert!(!matches(&CellValue::Empty, op, ""));
        }
    }

    #[test]
    fn test_operator_semantics() {
        let cell = CellValue::from("Jakarta Selatan");
        assert!(matches(&cell, SearchOperator::Contains, "karta"));
        assert!(matches(&cell, SearchOperator::Equals, "JAKARTA selatan"));
        assert!(!matches(&cell, SearchOperator::Equals, "Jakarta"));
        assert!(matches(&cell, SearchOperator::StartsWith, "jak"));
        assert!(!matches(&cell, SearchOperator::StartsWith, "selatan"));
        assert!(matches(&cell, SearchOperator::EndsWith, "SELATAN"));
        assert!(!matches(&cell, SearchOperator::Unsupported, "jakarta"));
    }

    #[test]
    fn test_numeric_cells_compare_as_text() {
        assert!(matches(&CellValue::Integer(12345), SearchOperator::StartsWith, "123"));
        assert!(matches(&CellValue::Number(2.5), SearchOperator::Equals, "2.5"));
        assert!(matches(&CellValue::Bool(true), SearchOperator::Equals, "TRUE"));
    }

    #[test]
    fn test_operator_parsing() {
        assert_eq!("equals".parse::<SearchOperator>().unwrap(), SearchOperator::Equals);
        assert_eq!(
            "starts-with".parse::<SearchOperator>().unwrap(),
            SearchOperator::StartsWith
        );
        assert_eq!(
            "endsWith".parse::<SearchOperator>().unwrap(),
            SearchOperator::EndsWith
        );
        assert_eq!(
            "regex".parse::<SearchOperator>().unwrap(),
            SearchOperator::Unsupported
        );
        assert_eq!(SearchOperator::from_name("Prefix"), Some(SearchOperator::StartsWith));
        assert_eq!(SearchOperator::from_name("ID"), None);
    }

    #[test]
    fn test_operator_serde_names() {
        let json = serde_json::to_string(&SearchOperator::StartsWith).unwrap();
        assert_eq!(json, "\"startsWith\"");
        let op: SearchOperator = serde_json::from_str("\"fuzzy\"").unwrap();
        assert_eq!(op, SearchOperator::Unsupported);
    }
}
