//! Completed-notebook tracking.
//!
//! The set of notebooks already written is persisted as a YAML mapping of
//! normalized title to `true`:
//!
//! ```yaml
//! other-book-notebook: true
//! some-book: true
//! ```
//!
//! The whole file is read at the start of a run and rewritten once at the
//! end of a successful one.

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::error::{Error, Result};
use crate::title::NormalizedKey;

/// Name of the data directory under the home directory.
pub const DATA_DIR_NAME: &str = "kindle-notes";

/// Name of the completed-notebooks file inside the data directory.
pub const COMPLETED_FILE_NAME: &str = "completed-notebooks.yaml";

/// What [`CompletedNotebooks::initialize`] had to create.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SetupOutcome {
    /// The data directory was created.
    pub created_dir: bool,
    /// The completed-notebooks file was created.
    pub created_file: bool,
}

/// Notebooks written by earlier runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedNotebooks {
    path: PathBuf,
    keys: BTreeSet<NormalizedKey>,
}

impl CompletedNotebooks {
    /// Reads the snapshot at `path`. An empty file is an empty set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingDirectory`] or [`Error::MissingFile`] when
    /// the data directory or the file does not exist, and an I/O or YAML
    /// error if the file cannot be read.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty())
            && !dir.is_dir()
        {
            return Err(Error::MissingDirectory(dir.to_path_buf()));
        }
        if !path.is_file() {
            return Err(Error::MissingFile(path));
        }

        let yaml = fs::read_to_string(&path)?;
        let keys = if yaml.trim().is_empty() {
            BTreeSet::new()
        } else {
            let entries: Option<BTreeMap<NormalizedKey, serde_yaml::Value>> =
                serde_yaml::from_str(&yaml)?;
            entries.unwrap_or_default().into_keys().collect()
        };

        debug!(path = %path.display(), count = keys.len(), "loaded completed notebooks");
        Ok(Self { path, keys })
    }

    /// Creates the data directory and an empty snapshot if missing.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if either cannot be created.
    pub fn initialize(dir: &Path) -> Result<SetupOutcome> {
        let mut outcome = SetupOutcome::default();
        if !dir.is_dir() {
            fs::create_dir_all(dir)?;
            outcome.created_dir = true;
        }
        let file = dir.join(COMPLETED_FILE_NAME);
        if !file.is_file() {
            fs::write(&file, "")?;
            outcome.created_file = true;
        }
        Ok(outcome)
    }

    /// Location of the snapshot.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// True when `key` was completed by this or an earlier run.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.keys.contains(key)
    }

    /// Marks `key` completed in memory. Returns `false` if it already was.
    pub fn mark_completed(&mut self, key: NormalizedKey) -> bool {
        self.keys.insert(key)
    }

    /// Completed keys in sorted order.
    pub fn iter(&self) -> impl Iterator<Item = &NormalizedKey> {
        self.keys.iter()
    }

    /// Number of completed notebooks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when nothing has been completed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Rewrites the snapshot with the whole set.
    ///
    /// The file is written next to the target and renamed over it, so a
    /// failed save leaves the previous snapshot intact.
    ///
    /// # Errors
    ///
    /// Returns an I/O or YAML error.
    pub fn save(&self) -> Result<()> {
        let entries: BTreeMap<&str, bool> = self.keys.iter().map(|k| (k.as_str(), true)).collect();
        let yaml = if entries.is_empty() {
            String::new()
        } else {
            serde_yaml::to_string(&entries)?
        };

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, yaml)?;
        fs::rename(&tmp, &self.path)?;

        debug!(path = %self.path.display(), count = self.keys.len(), "saved completed notebooks");
        Ok(())
    }
}
