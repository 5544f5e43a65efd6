use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::predicate::SearchOperator;

/// One column's raw multi-term input plus its operator
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchCriterion {
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub operator: SearchOperator,
}

impl SearchCriterion {
    pub fn new(value: impl Into<String>, operator: SearchOperator) -> Self {
        Self {
            value: value.into(),
            operator,
        }
    }

    pub fn is_blank(&self) -> bool {
        self.value.trim().is_empty()
    }
}

/// A criterion that takes part in a run, paired with its column
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveCriterion {
    pub column: String,
    pub criterion: SearchCriterion,
}

/// The search columns chosen for one dataset and their criteria.
///
/// A column only participates when it is in `search_columns` and its
/// criterion is not blank.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct QuerySpec {
    #[serde(default)]
    pub search_columns: Vec<String>,
    #[serde(default)]
    pub criteria: BTreeMap<String, SearchCriterion>,
}

impl QuerySpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder helper: enables `column` and sets its criterion
    pub fn with_criterion(
        mut self,
        column: impl Into<String>,
        value: impl Into<String>,
        operator: SearchOperator,
    ) -> Self {
        let column = column.into();
        self.set_search_column(&column, true);
        self.criteria
            .insert(column, SearchCriterion::new(value, operator));
        self
    }

    /// Adds or removes a search column. Enabling a column gives it a blank
    /// `contains` criterion; disabling drops its criterion.
    pub fn set_search_column(&mut self, column: &str, enabled: bool) {
        if enabled {
            if !self.search_columns.iter().any(|c| c == column) {
                self.search_columns.push(column.to_string());
            }
            self.criteria.entry(column.to_string()).or_default();
        } else {
            self.search_columns.retain(|c| c != column);
            self.criteria.remove(column);
        }
    }

    pub fn set_value(&mut self, column: &str, value: impl Into<String>) {
        self.criteria.entry(column.to_string()).or_default().value = value.into();
    }

    pub fn set_operator(&mut self, column: &str, operator: SearchOperator) {
        self.criteria.entry(column.to_string()).or_default().operator = operator;
    }

    pub fn has_search_columns(&self) -> bool {
        !self.search_columns.is_empty()
    }

    /// Criteria that take part in a run, in search-column order
    pub fn active_criteria(&self) -> Vec<ActiveCriterion> {
        self.search_columns
            .iter()
            .filter_map(|column| {
                self.criteria
                    .get(column)
                    .filter(|criterion| !criterion.is_blank())
                    .map(|criterion| ActiveCriterion {
                        column: column.clone(),
                        criterion: criterion.clone(),
                    })
            })
            .collect()
    }

    /// True when there is nothing to search for
    pub fn is_invalid(&self) -> bool {
        self.active_criteria().is_empty()
    }
}
