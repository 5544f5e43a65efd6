use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::dataset::Side;
use crate::errors::{QueryError, QueryResult};
use crate::session::{Session, SessionSettings, StoredDataset};

const WORKSPACE_DIR: &str = ".rekonmatch";
const SETTINGS_FILE: &str = "settings.json";
const MAX_UPWARD_STEPS: usize = 20;

/// On-disk home of the two datasets and the session settings.
///
/// Layout under `<root>/.rekonmatch/`:
/// - `primary.json`, `secondary.json`: one [`StoredDataset`] each
/// - `settings.json`: the [`SessionSettings`]
#[derive(Debug, Clone)]
pub struct Workspace {
    root: PathBuf,
}

impl Workspace {
    /// Uses `root` as is, without touching the disk
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Creates the workspace directory under `root`
    pub fn init(root: &Path) -> QueryResult<Self> {
        let workspace = Self::open(root);
        fs::create_dir_all(workspace.dir())?;
        debug!("Initialized workspace at {}", workspace.dir().display());
        Ok(workspace)
    }

    /// Opens the nearest workspace at or above `starting_dir`, or
    /// `starting_dir` itself if none exists yet
    pub fn detect(starting_dir: &Path) -> Self {
        Self::open(detect_workspace_root(starting_dir))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn dir(&self) -> PathBuf {
        self.root.join(WORKSPACE_DIR)
    }

    pub fn exists(&self) -> bool {
        self.dir().is_dir()
    }

    fn dataset_path(&self, side: Side) -> PathBuf {
        self.dir().join(format!("{}.json", side))
    }

    fn settings_path(&self) -> PathBuf {
        self.dir().join(SETTINGS_FILE)
    }

    fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> QueryResult<()> {
        fs::create_dir_all(self.dir())?;
        let json = serde_json::to_string(value)?;
        fs::write(path, json)?;
        Ok(())
    }

    fn read_json<T: DeserializeOwned>(&self, path: &Path) -> QueryResult<Option<T>> {
        if !path.exists() {
            return Ok(None);
        }
        let json = fs::read_to_string(path)?;
        serde_json::from_str(&json)
            .map(Some)
            .map_err(|e| QueryError::corrupt_workspace(path, e))
    }

    pub fn save_dataset(&self, side: Side, stored: &StoredDataset) -> QueryResult<()> {
        let path = self.dataset_path(side);
        self.write_json(&path, stored)?;
        info!(
            "Stored {} as {} dataset ({} rows)",
            stored.file_name,
            side,
            stored.dataset.len()
        );
        Ok(())
    }

    pub fn load_dataset(&self, side: Side) -> QueryResult<Option<StoredDataset>> {
        self.read_json(&self.dataset_path(side))
    }

    pub fn remove_dataset(&self, side: Side) -> QueryResult<()> {
        let path = self.dataset_path(side);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }

    pub fn save_settings(&self, settings: &SessionSettings) -> QueryResult<()> {
        self.write_json(&self.settings_path(), settings)
    }

    /// Reads the settings, falling back to defaults when they are missing
    /// or unreadable
    pub fn load_settings(&self) -> QueryResult<SessionSettings> {
        match self.read_json(&self.settings_path()) {
            Ok(settings) => Ok(settings.unwrap_or_default()),
            Err(QueryError::CorruptWorkspace { path, source }) => {
                warn!(
                    "Ignoring unreadable settings {}: {}",
                    path.display(),
                    source
                );
                Ok(SessionSettings::default())
            }
            Err(e) => Err(e),
        }
    }

    /// Restores a full session from disk
    pub fn load_session(&self) -> QueryResult<Session> {
        Ok(Session::from_parts(
            self.load_dataset(Side::Primary)?,
            self.load_dataset(Side::Secondary)?,
            self.load_settings()?,
        ))
    }

    /// Writes every part of `session` back, removing datasets it no
    /// longer holds
    pub fn save_session(&self, session: &Session) -> QueryResult<()> {
        for side in [Side::Primary, Side::Secondary] {
            match session.dataset(side) {
                Some(stored) => self.save_dataset(side, stored)?,
                None => self.remove_dataset(side)?,
            }
        }
        self.save_settings(session.settings())
    }

    /// Deletes everything stored in the workspace
    pub fn clear(&self) -> QueryResult<()> {
        let dir = self.dir();
        if dir.exists() {
            fs::remove_dir_all(&dir)?;
            info!("Cleared workspace {}", dir.display());
        }
        Ok(())
    }
}

/// Canonicalizes a path when possible, for stable comparisons
fn unify_path(original: &Path) -> PathBuf {
    original
        .canonicalize()
        .unwrap_or_else(|_| original.to_path_buf())
}

/// Walks upward from `starting_dir` looking for a workspace directory.
/// Returns `starting_dir` when none is found.
pub fn detect_workspace_root(starting_dir: &Path) -> PathBuf {
    let mut current = unify_path(starting_dir);

    for _ in 0..MAX_UPWARD_STEPS {
        if current.join(WORKSPACE_DIR).is_dir() {
            return current;
        }
        if !current.pop() {
            break;
        }
    }

    unify_path(starting_dir)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::Dataset;
    use crate::query::SearchOperator;
    use tempfile::TempDir;

    fn sample(name: &str) -> StoredDataset {
        StoredDataset::new(
            name,
            Dataset::from_records(vec!["Key".to_string()], vec![vec!["k1"], vec!["k2"]]),
        )
    }

    #[test]
    fn test_workspace_detection() -> QueryResult<()> {
        let temp = TempDir::new()?;
        let root = temp.path();

        let nested = root.join("a").join("b").join("c");
        fs::create_dir_all(&nested)?;

        // No workspace exists yet, should use nested as root
        assert_eq!(detect_workspace_root(&nested), unify_path(&nested));

        let workspace_root = root.join("a");
        Workspace::init(&workspace_root)?;

        assert_eq!(detect_workspace_root(&nested), unify_path(&workspace_root));
        Ok(())
    }

    #[test]
    fn test_dataset_round_trip() -> QueryResult<()> {
        let temp = TempDir::new()?;
        let workspace = Workspace::init(temp.path())?;

        assert!(workspace.load_dataset(Side::Primary)?.is_none());
        workspace.save_dataset(Side::Primary, &sample("keys.csv"))?;
        let loaded = workspace.load_dataset(Side::Primary)?.unwrap();
        assert_eq!(loaded, sample("keys.csv"));

        workspace.remove_dataset(Side::Primary)?;
        assert!(workspace.load_dataset(Side::Primary)?.is_none());
        Ok(())
    }

    #[test]
    fn test_session_round_trip() -> QueryResult<()> {
        let temp = TempDir::new()?;
        let workspace = Workspace::init(temp.path())?;

        let mut session = Session::new();
        session.load(Side::Primary, sample("p.csv"));
        session.load(Side::Secondary, sample("s.csv"));
        session.toggle_search_column(Side::Primary, "Key", true);
        session.set_criterion_value(Side::Primary, "Key", "k1");
        session.set_criterion_operator(Side::Primary, "Key", SearchOperator::Equals);
        session.set_link_column(Side::Secondary, "Key");
        session.save_template(Side::Primary, "keys")?;
        workspace.save_session(&session)?;

        let restored = workspace.load_session()?;
        assert_eq!(restored.settings(), session.settings());
        assert!(restored.templates(Side::Primary).contains_key("keys"));
        assert_eq!(restored.dataset(Side::Secondary).unwrap().file_name, "s.csv");
        assert_eq!(restored.run_query(Side::Primary)?.matches, 1);
        Ok(())
    }

    #[test]
    fn test_corrupt_settings_fall_back_to_defaults() -> QueryResult<()> {
        let temp = TempDir::new()?;
        let workspace = Workspace::init(temp.path())?;
        fs::write(workspace.dir().join(SETTINGS_FILE), "{not json")?;
        assert_eq!(workspace.load_settings()?, SessionSettings::default());

        fs::write(workspace.dir().join("primary.json"), "[]")?;
        assert!(matches!(
            workspace.load_dataset(Side::Primary),
            Err(QueryError::CorruptWorkspace { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_clear() -> QueryResult<()> {
        let temp = TempDir::new()?;
        let workspace = Workspace::init(temp.path())?;
        workspace.save_dataset(Side::Secondary, &sample("s.csv"))?;
        workspace.clear()?;
        assert!(!workspace.exists());
        assert!(workspace.load_session()?.dataset(Side::Secondary).is_none());
        Ok(())
    }
}
