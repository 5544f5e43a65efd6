use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::dataset::{Dataset, Side};
use crate::errors::{QueryError, QueryResult};
use crate::numeric::convert_scientific;
use crate::query::{
    resolve_links, run_query, LinkLookup, QueryOptions, QuerySpec, SearchOperator,
};
use crate::results::{QueryOutput, ResultRow};

/// A dataset together with the name of the file it came from
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct StoredDataset {
    pub file_name: String,
    pub dataset: Dataset,
}

impl StoredDataset {
    pub fn new(file_name: impl Into<String>, dataset: Dataset) -> Self {
        Self {
            file_name: file_name.into(),
            dataset,
        }
    }
}

/// Query, link and display settings for one side
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SideSettings {
    #[serde(default)]
    pub query: QuerySpec,
    /// Column used to link rows on this side to the other side
    #[serde(default)]
    pub link_column: String,
    /// Columns shown for result rows, in display order
    #[serde(default)]
    pub display_columns: Vec<String>,
    /// Named display column selections
    #[serde(default)]
    pub templates: BTreeMap<String, Vec<String>>,
}

impl SideSettings {
    /// Fresh settings for a newly loaded dataset. Every header is shown;
    /// saved templates are kept.
    fn for_headers(headers: &[String], templates: BTreeMap<String, Vec<String>>) -> Self {
        Self {
            display_columns: headers.to_vec(),
            templates,
            ..Default::default()
        }
    }
}

/// Direction for reordering a display column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveDirection {
    Up,
    Down,
}

/// The persistable part of a session
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default)]
    pub primary: SideSettings,
    #[serde(default)]
    pub secondary: SideSettings,
}

impl SessionSettings {
    pub fn side(&self, side: Side) -> &SideSettings {
        match side {
            Side::Primary => &self.primary,
            Side::Secondary => &self.secondary,
        }
    }

    pub fn side_mut(&mut self, side: Side) -> &mut SideSettings {
        match side {
            Side::Primary => &mut self.primary,
            Side::Secondary => &mut self.secondary,
        }
    }
}

/// Everything one user works with: the two datasets, the query set up for
/// each, and the link columns between them.
///
/// The matching functions take their inputs from here explicitly; nothing
/// is held in globals.
#[derive(Debug, Clone, Default)]
pub struct Session {
    primary: Option<StoredDataset>,
    secondary: Option<StoredDataset>,
    settings: SessionSettings,
    options: QueryOptions,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// Rebuilds a session from persisted parts
    pub fn from_parts(
        primary: Option<StoredDataset>,
        secondary: Option<StoredDataset>,
        settings: SessionSettings,
    ) -> Self {
        Self {
            primary,
            secondary,
            settings,
            options: QueryOptions::default(),
        }
    }

    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    pub fn options_mut(&mut self) -> &mut QueryOptions {
        &mut self.options
    }

    pub fn settings(&self) -> &SessionSettings {
        &self.settings
    }

    pub fn dataset(&self, side: Side) -> Option<&StoredDataset> {
        match side {
            Side::Primary => self.primary.as_ref(),
            Side::Secondary => self.secondary.as_ref(),
        }
    }

    fn dataset_mut(&mut self, side: Side) -> &mut Option<StoredDataset> {
        match side {
            Side::Primary => &mut self.primary,
            Side::Secondary => &mut self.secondary,
        }
    }

    /// Replaces one side's dataset and clears that side's query and link
    /// column, which referred to the old headers. Every new header becomes
    /// a display column.
    pub fn load(&mut self, side: Side, stored: StoredDataset) {
        info!(
            "Loaded {} as {} dataset ({} rows)",
            stored.file_name,
            side,
            stored.dataset.len()
        );
        let settings = self.settings.side_mut(side);
        let templates = std::mem::take(&mut settings.templates);
        *settings = SideSettings::for_headers(&stored.dataset.headers, templates);
        *self.dataset_mut(side) = Some(stored);
    }

    pub fn toggle_search_column(&mut self, side: Side, column: &str, enabled: bool) {
        self.settings
            .side_mut(side)
            .query
            .set_search_column(column, enabled);
    }

    pub fn set_criterion_value(&mut self, side: Side, column: &str, value: impl Into<String>) {
        self.settings.side_mut(side).query.set_value(column, value);
    }

    pub fn set_criterion_operator(&mut self, side: Side, column: &str, operator: SearchOperator) {
        self.settings
            .side_mut(side)
            .query
            .set_operator(column, operator);
    }

    /// Drops every search column and criterion of one side
    pub fn clear_query(&mut self, side: Side) {
        self.settings.side_mut(side).query = QuerySpec::new();
    }

    pub fn set_link_column(&mut self, side: Side, column: impl Into<String>) {
        self.settings.side_mut(side).link_column = column.into();
    }

    pub fn link_column(&self, side: Side) -> &str {
        &self.settings.side(side).link_column
    }

    pub fn display_columns(&self, side: Side) -> &[String] {
        &self.settings.side(side).display_columns
    }

    /// Adds a column to the end of the display list, or removes it
    pub fn toggle_display_column(&mut self, side: Side, column: &str, enabled: bool) {
        let columns = &mut self.settings.side_mut(side).display_columns;
        let present = columns.iter().any(|c| c == column);
        if enabled && !present {
            columns.push(column.to_string());
        } else if !enabled {
            columns.retain(|c| c != column);
        }
    }

    /// Shows every header of the side's dataset, or none
    pub fn select_all_display_columns(&mut self, side: Side, selected: bool) {
        let columns = if selected {
            self.dataset(side)
                .map(|stored| stored.dataset.headers.clone())
                .unwrap_or_default()
        } else {
            Vec::new()
        };
        self.settings.side_mut(side).display_columns = columns;
    }

    /// Replaces the display list. Every column must exist in the side's
    /// dataset.
    pub fn set_display_columns(&mut self, side: Side, columns: Vec<String>) -> QueryResult<()> {
        if let Some(stored) = self.dataset(side) {
            if let Some(unknown) = columns.iter().find(|c| !stored.dataset.has_column(c)) {
                return Err(QueryError::config_error(format!(
                    "Unknown column '{}' in the {} dataset",
                    unknown, side
                )));
            }
        }
        self.settings.side_mut(side).display_columns = columns;
        Ok(())
    }

    /// Swaps the display column at `index` with its neighbour. Returns
    /// false when there is no neighbour in that direction.
    pub fn move_display_column(
        &mut self,
        side: Side,
        index: usize,
        direction: MoveDirection,
    ) -> bool {
        let columns = &mut self.settings.side_mut(side).display_columns;
        let target = match direction {
            MoveDirection::Up => index.checked_sub(1),
            MoveDirection::Down => index.checked_add(1),
        };
        match target {
            Some(target) if index < columns.len() && target < columns.len() => {
                columns.swap(index, target);
                true
            }
            _ => false,
        }
    }

    pub fn templates(&self, side: Side) -> &BTreeMap<String, Vec<String>> {
        &self.settings.side(side).templates
    }

    /// Stores the current display columns under `name`, replacing any
    /// template of the same name.
    pub fn save_template(&mut self, side: Side, name: &str) -> QueryResult<()> {
        let name = name.trim();
        if name.is_empty() {
            return Err(QueryError::config_error("Template name must not be empty"));
        }
        let settings = self.settings.side_mut(side);
        let columns = settings.display_columns.clone();
        debug!("Saving template '{}' with {} columns", name, columns.len());
        settings.templates.insert(name.to_string(), columns);
        Ok(())
    }

    /// Makes a saved template the current display list
    pub fn load_template(&mut self, side: Side, name: &str) -> QueryResult<()> {
        let settings = self.settings.side_mut(side);
        let columns = settings
            .templates
            .get(name.trim())
            .cloned()
            .ok_or_else(|| QueryError::config_error(format!("No template named '{}'", name)))?;
        settings.display_columns = columns;
        Ok(())
    }

    /// Returns false when no template had that name
    pub fn delete_template(&mut self, side: Side, name: &str) -> bool {
        let removed = self
            .settings
            .side_mut(side)
            .templates
            .remove(name.trim())
            .is_some();
        if !removed {
            warn!("No {} template named '{}' to delete", side, name);
        }
        removed
    }

    pub fn set_include_empty_rows(&mut self, include: bool) {
        self.options.include_empty_rows = include;
    }

    pub fn is_query_invalid(&self, side: Side) -> bool {
        self.settings.side(side).query.is_invalid()
    }

    /// Both datasets are loaded, so rows can be linked across
    pub fn is_linking_enabled(&self) -> bool {
        self.primary.is_some() && self.secondary.is_some()
    }

    /// Runs the query configured for `side` against that side's dataset
    pub fn run_query(&self, side: Side) -> QueryResult<QueryOutput> {
        let target = self.dataset(side).map(|stored| &stored.dataset);
        run_query(&self.settings.side(side).query, target, &self.options)
    }

    /// Looks up the rows of the other side related to `row`, a result row
    /// from `side`. `Ok(None)` when the lookup does not apply.
    pub fn resolve_links(
        &self,
        side: Side,
        row: &ResultRow,
    ) -> QueryResult<Option<LinkLookup<'_>>> {
        let source_key = self.link_column(side);
        let target_key = self.link_column(side.other());
        if !row.is_match() || source_key.trim().is_empty() || target_key.trim().is_empty() {
            debug!("Link lookup does not apply");
            return Ok(None);
        }

        let companion = self
            .dataset(side.other())
            .ok_or_else(|| QueryError::no_target_data(format!("{} dataset", side.other())))?;
        Ok(resolve_links(row, source_key, &companion.dataset, target_key))
    }

    /// Swaps the roles of the two datasets. Link columns travel with their
    /// datasets; both queries are cleared and each side shows every header
    /// of its new dataset. Templates stay with their side.
    pub fn swap(&mut self) -> QueryResult<()> {
        if !self.is_linking_enabled() {
            return Err(QueryError::no_target_data(
                "both datasets are required to swap",
            ));
        }
        std::mem::swap(&mut self.primary, &mut self.secondary);
        let headers = |stored: &Option<StoredDataset>| {
            stored
                .as_ref()
                .map(|stored| stored.dataset.headers.clone())
                .unwrap_or_default()
        };
        let primary_headers = headers(&self.primary);
        let secondary_headers = headers(&self.secondary);
        let primary_link = std::mem::take(&mut self.settings.primary.link_column);
        let secondary_link = std::mem::take(&mut self.settings.secondary.link_column);
        let primary_templates = std::mem::take(&mut self.settings.primary.templates);
        let secondary_templates = std::mem::take(&mut self.settings.secondary.templates);

        self.settings = SessionSettings {
            primary: SideSettings {
                link_column: secondary_link,
                ..SideSettings::for_headers(&primary_headers, primary_templates)
            },
            secondary: SideSettings {
                link_column: primary_link,
                ..SideSettings::for_headers(&secondary_headers, secondary_templates)
            },
        };
        info!("Swapped primary and secondary datasets");
        Ok(())
    }

    /// Drops both datasets and all settings
    pub fn reset(&mut self) {
        self.primary = None;
        self.secondary = None;
        self.settings = SessionSettings::default();
    }

    /// Expands exponent-notation numbers in `columns` of one side's dataset
    /// (every column when empty). Returns the number of cells changed.
    pub fn convert_scientific(&mut self, side: Side, columns: &[String]) -> QueryResult<usize> {
        let stored = self
            .dataset_mut(side)
            .as_mut()
            .ok_or_else(|| QueryError::no_target_data(format!("{} dataset", side)))?;
        Ok(convert_scientific(&mut stored.dataset, columns))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(name: &str, headers: &[&str], rows: Vec<Vec<&str>>) -> StoredDataset {
        StoredDataset::new(
            name,
            Dataset::from_records(headers.iter().map(|h| h.to_string()).collect(), rows),
        )
    }

    fn loaded_session() -> Session {
        let mut session = Session::new();
        session.load(
            Side::Primary,
            stored(
                "orders.csv",
                &["Order", "Customer"],
                vec![vec!["A-1", "C1"], vec!["A-2", "C2"]],
            ),
        );
        session.load(
            Side::Secondary,
            stored(
                "customers.csv",
                &["Id", "Name"],
                vec![vec!["c1", "Alice"], vec!["C2", "Bob"], vec!["c1", "Alice (old)"]],
            ),
        );
        session
    }

    #[test]
    fn test_query_and_link() {
        let mut session = loaded_session();
        session.toggle_search_column(Side::Primary, "Order", true);
        session.set_criterion_value(Side::Primary, "Order", "A-1");
        session.set_criterion_operator(Side::Primary, "Order", SearchOperator::Equals);
        session.set_link_column(Side::Primary, "Customer");
        session.set_link_column(Side::Secondary, "Id");

        let output = session.run_query(Side::Primary).unwrap();
        assert_eq!(output.len(), 1);

        let lookup = session
            .resolve_links(Side::Primary, &output.rows[0])
            .unwrap()
            .unwrap();
        let names: Vec<_> = lookup.rows.iter().map(|r| r.text("Name")).collect();
        assert_eq!(names, vec!["Alice", "Alice (old)"]);

        session.clear_query(Side::Primary);
        assert!(session.is_query_invalid(Side::Primary));
        assert_eq!(session.link_column(Side::Primary), "Customer");
    }

    #[test]
    fn test_link_without_columns_does_not_apply() {
        let session = loaded_session();
        let row = ResultRow::matched(0, 0, [("Customer", "C1")].into_iter().collect());
        assert!(session.resolve_links(Side::Primary, &row).unwrap().is_none());
    }

    #[test]
    fn test_link_without_companion_is_no_target_data() {
        let mut session = Session::new();
        session.load(
            Side::Primary,
            stored("orders.csv", &["Customer"], vec![vec!["C1"]]),
        );
        session.set_link_column(Side::Primary, "Customer");
        session.set_link_column(Side::Secondary, "Id");
        let row = ResultRow::matched(0, 0, [("Customer", "C1")].into_iter().collect());
        assert!(matches!(
            session.resolve_links(Side::Primary, &row),
            Err(QueryError::NoTargetData(_))
        ));
    }

    #[test]
    fn test_load_resets_side_settings() {
        let mut session = loaded_session();
        session.toggle_search_column(Side::Secondary, "Name", true);
        session.set_link_column(Side::Secondary, "Id");
        session.set_link_column(Side::Primary, "Customer");

        session.save_template(Side::Secondary, "ids").unwrap();

        session.load(Side::Secondary, stored("new.csv", &["Id", "Code"], vec![vec!["x"]]));
        let settings = &session.settings().secondary;
        assert!(!settings.query.has_search_columns());
        assert_eq!(settings.link_column, "");
        assert_eq!(settings.display_columns, vec!["Id", "Code"]);
        assert!(settings.templates.contains_key("ids"));
        assert_eq!(session.link_column(Side::Primary), "Customer");
    }

    #[test]
    fn test_display_columns() {
        let mut session = loaded_session();
        assert_eq!(session.display_columns(Side::Primary), ["Order", "Customer"]);

        session.toggle_display_column(Side::Primary, "Order", false);
        assert_eq!(session.display_columns(Side::Primary), ["Customer"]);
        session.toggle_display_column(Side::Primary, "Order", true);
        session.toggle_display_column(Side::Primary, "Order", true);
        assert_eq!(session.display_columns(Side::Primary), ["Customer", "Order"]);

        assert!(session.move_display_column(Side::Primary, 1, MoveDirection::Up));
        assert_eq!(session.display_columns(Side::Primary), ["Order", "Customer"]);
        assert!(!session.move_display_column(Side::Primary, 0, MoveDirection::Up));
        assert!(!session.move_display_column(Side::Primary, 1, MoveDirection::Down));
        assert!(!session.move_display_column(Side::Primary, 5, MoveDirection::Up));

        session.select_all_display_columns(Side::Primary, false);
        assert!(session.display_columns(Side::Primary).is_empty());
        session.select_all_display_columns(Side::Primary, true);
        assert_eq!(session.display_columns(Side::Primary), ["Order", "Customer"]);

        session
            .set_display_columns(Side::Secondary, vec!["Name".to_string()])
            .unwrap();
        assert_eq!(session.display_columns(Side::Secondary), ["Name"]);
        assert!(matches!(
            session.set_display_columns(Side::Secondary, vec!["Missing".to_string()]),
            Err(QueryError::ConfigError(_))
        ));
        assert_eq!(session.display_columns(Side::Secondary), ["Name"]);
    }

    #[test]
    fn test_templates() {
        let mut session = loaded_session();
        session
            .set_display_columns(Side::Primary, vec!["Customer".to_string()])
            .unwrap();
        session.save_template(Side::Primary, " short ").unwrap();
        assert!(matches!(
            session.save_template(Side::Primary, "  "),
            Err(QueryError::ConfigError(_))
        ));

        session.select_all_display_columns(Side::Primary, true);
        session.load_template(Side::Primary, "short").unwrap();
        assert_eq!(session.display_columns(Side::Primary), ["Customer"]);
        assert!(session.load_template(Side::Primary, "wide").is_err());
        assert!(session.templates(Side::Secondary).is_empty());

        assert!(session.delete_template(Side::Primary, "short"));
        assert!(!session.delete_template(Side::Primary, "short"));
        assert!(session.templates(Side::Primary).is_empty());
    }

    #[test]
    fn test_swap() {
        let mut session = loaded_session();
        session.set_link_column(Side::Primary, "Customer");
        session.set_link_column(Side::Secondary, "Id");
        session.toggle_search_column(Side::Primary, "Order", true);

        session.swap().unwrap();
        assert_eq!(
            session.dataset(Side::Primary).unwrap().file_name,
            "customers.csv"
        );
        assert_eq!(session.link_column(Side::Primary), "Id");
        assert_eq!(session.link_column(Side::Secondary), "Customer");
        assert!(!session.settings().secondary.query.has_search_columns());
        assert_eq!(session.display_columns(Side::Primary), ["Id", "Name"]);
        assert_eq!(session.display_columns(Side::Secondary), ["Order", "Customer"]);

        let mut lonely = Session::new();
        lonely.load(Side::Primary, stored("a.csv", &["A"], vec![]));
        assert!(lonely.swap().is_err());
    }

    #[test]
    fn test_reset_and_convert() {
        let mut session = Session::new();
        assert!(session.convert_scientific(Side::Primary, &[]).is_err());

        session.load(
            Side::Primary,
            stored("acct.csv", &["Account"], vec![vec!["1.2E+3"]]),
        );
        assert_eq!(session.convert_scientific(Side::Primary, &[]).unwrap(), 1);

        session.save_template(Side::Primary, "all").unwrap();
        session.reset();
        assert!(session.dataset(Side::Primary).is_none());
        assert!(session.templates(Side::Primary).is_empty());
        assert!(!session.is_linking_enabled());
    }
}
