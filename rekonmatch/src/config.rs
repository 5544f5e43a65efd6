use config::{Config as ConfigBuilder, File};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use crate::errors::{QueryError, QueryResult};
use crate::query::TermSplit;

/// Settings shared by every query run.
///
/// # Configuration Locations
///
/// Loaded in order of precedence (later wins):
/// 1. Global `$CONFIG_DIR/rekonmatch/config.yaml`
/// 2. Local `.rekonmatch.yaml` in the current directory
/// 3. A file given with `--config`
///
/// Command-line flags override all of them, see [`QueryConfig::merge_with_cli`].
///
/// # Configuration Format
///
/// ```yaml
/// # Emit a marker row for term positions where every term is blank
/// include_empty_rows: true
///
/// # compact: split on commas and line breaks, drop blanks
/// # positional: one term per line, blank lines kept
/// term_split: compact
///
/// # Worker threads for scanning large datasets (default: CPU cores)
/// thread_count: 4
///
/// # Log level (trace, debug, info, warn, error)
/// log_level: "warn"
///
/// # Where datasets and settings are stored (default: detected upward)
/// workspace_dir: "/data/reconciliation"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Emit a marker row for blank term positions
    pub include_empty_rows: bool,

    /// How raw criteria are split into terms
    pub term_split: TermSplit,

    /// Number of threads used for large scans
    pub thread_count: NonZeroUsize,

    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Root directory of the workspace holding stored datasets
    pub workspace_dir: Option<PathBuf>,
}

fn default_thread_count() -> NonZeroUsize {
    NonZeroUsize::new(num_cpus::get()).unwrap_or(NonZeroUsize::MIN)
}

fn default_log_level() -> String {
    "warn".to_string()
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            include_empty_rows: true,
            term_split: TermSplit::default(),
            thread_count: default_thread_count(),
            log_level: default_log_level(),
            workspace_dir: None,
        }
    }
}

/// Values given on the command line; `None` leaves the file value alone
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub include_empty_rows: Option<bool>,
    pub term_split: Option<TermSplit>,
    pub thread_count: Option<NonZeroUsize>,
    pub log_level: Option<String>,
    pub workspace_dir: Option<PathBuf>,
}

impl QueryConfig {
    /// Loads configuration from the default locations
    pub fn load() -> QueryResult<Self> {
        Self::load_from(None)
    }

    /// Loads configuration, layering `config_path` over the default locations
    pub fn load_from(config_path: Option<&Path>) -> QueryResult<Self> {
        if let Some(path) = config_path {
            if !path.exists() {
                return Err(QueryError::config_error(format!(
                    "Config file not found: {}",
                    path.display()
                )));
            }
        }

        let mut builder = ConfigBuilder::builder();

        let config_files = [
            dirs::config_dir().map(|p| p.join("rekonmatch/config.yaml")),
            Some(PathBuf::from(".rekonmatch.yaml")),
            config_path.map(PathBuf::from),
        ];

        for path in config_files.iter().flatten() {
            if path.exists() {
                builder = builder.add_source(File::from(path.as_path()));
            }
        }

        Ok(builder.build()?.try_deserialize()?)
    }

    /// Merges CLI arguments with configuration file values
    pub fn merge_with_cli(mut self, cli: ConfigOverrides) -> Self {
        if let Some(include) = cli.include_empty_rows {
            self.include_empty_rows = include;
        }
        if let Some(split) = cli.term_split {
            self.term_split = split;
        }
        if let Some(threads) = cli.thread_count {
            self.thread_count = threads;
        }
        if let Some(level) = cli.log_level {
            self.log_level = level;
        }
        if cli.workspace_dir.is_some() {
            self.workspace_dir = cli.workspace_dir;
        }
        self
    }

    /// Writes this configuration as YAML, in the format [`QueryConfig::load_from`] reads
    pub fn save_to(&self, path: &Path) -> QueryResult<()> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Installs the global tracing subscriber. `RUST_LOG` wins over
    /// `log_level`. Calling it twice is harmless.
    pub fn init_tracing(&self) {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&self.log_level));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
}
