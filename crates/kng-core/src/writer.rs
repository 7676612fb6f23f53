//! Plain-text notebook output.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::note::Notebook;
use crate::title::NormalizedKey;

/// File extension of notebook artifacts.
pub const NOTEBOOK_EXTENSION: &str = "txt";

/// Writes each notebook to `<dir>/<normalized-title>.txt`.
#[derive(Debug, Clone)]
pub struct NotebookWriter {
    dir: PathBuf,
}

impl NotebookWriter {
    /// Creates a writer targeting `dir`.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Output directory.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Artifact path for a normalized title.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsafeTitle`] unless the key is a plain file stem,
    /// so the path always stays directly inside [`NotebookWriter::dir`].
    pub fn path_for(&self, key: &NormalizedKey) -> Result<PathBuf> {
        if !key.is_file_stem() {
            return Err(Error::UnsafeTitle(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.{NOTEBOOK_EXTENSION}")))
    }

    /// Renders every entry as a four-line record followed by a blank line.
    #[must_use]
    pub fn render(notebook: &Notebook) -> String {
        let mut out = String::new();
        for note in notebook.entries() {
            let _ = write!(
                out,
                "Annotation: {}\nLocation: {}\nType: {}\nStarred: {}\n\n",
                note.annotation, note.location, note.kind, note.starred
            );
        }
        out
    }

    /// Creates or truncates the notebook's file. Returns bytes written.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsafeTitle`] for a title that is not a plain file
    /// stem, or any I/O error from writing the file.
    pub fn write(&self, notebook: &Notebook) -> Result<usize> {
        let path = self.path_for(notebook.title())?;
        let text = Self::render(notebook);
        fs::write(path, &text)?;
        Ok(text.len())
    }
}
