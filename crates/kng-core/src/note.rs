//! Note and notebook model.

use std::fmt;

use crate::title::NormalizedKey;

/// Kind of a note as labelled in the export's type column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NoteKind {
    /// A marked passage.
    Highlight,
    /// Free-text annotation.
    Note,
    /// Any other label, kept verbatim.
    Other(String),
}

impl NoteKind {
    /// Maps a type column value to a kind. Matching is exact.
    #[must_use]
    pub fn parse(label: &str) -> Self {
        match label {
            "Highlight" => Self::Highlight,
            "Note" => Self::Note,
            other => Self::Other(other.to_string()),
        }
    }

    /// The label as it appears in the export.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Highlight => "Highlight",
            Self::Note => "Note",
            Self::Other(label) => label,
        }
    }
}

impl fmt::Display for NoteKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One exported highlight or note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Note {
    /// Highlight or note.
    pub kind: NoteKind,
    /// Vendor-formatted position, e.g. `Page 12`.
    pub location: String,
    /// Highlighted text or note body; may be empty.
    pub annotation: String,
    /// Whether the reader starred the entry.
    pub starred: bool,
}

/// All notes for one title gathered during a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notebook {
    title: NormalizedKey,
    entries: Vec<Note>,
}

impl Notebook {
    /// Creates an empty notebook.
    #[must_use]
    pub const fn new(title: NormalizedKey) -> Self {
        Self {
            title,
            entries: Vec::new(),
        }
    }

    /// The normalized title.
    #[must_use]
    pub const fn title(&self) -> &NormalizedKey {
        &self.title
    }

    /// Entries in encounter order.
    #[must_use]
    pub fn entries(&self) -> &[Note] {
        &self.entries
    }

    /// Appends notes after the existing entries.
    pub fn extend(&mut self, notes: impl IntoIterator<Item = Note>) {
        self.entries.extend(notes);
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when there are no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::title::normalize;

    #[test]
    fn test_kind_parse() {
        assert_eq!(NoteKind::parse("Highlight"), NoteKind::Highlight);
        assert_eq!(NoteKind::parse("Note"), NoteKind::Note);
        assert_eq!(
            NoteKind::parse("Highlight (Yellow)"),
            NoteKind::Other("Highlight (Yellow)".to_string())
        );
        assert_eq!(NoteKind::parse("highlight").as_str(), "highlight");
    }

    #[test]
    fn test_notebook_accumulates_in_order() {
        let note = |location: &str| Note {
            kind: NoteKind::Highlight,
            location: location.to_string(),
            annotation: String::new(),
            starred: false,
        };

        let mut notebook = Notebook::new(normalize("Some Book"));
        assert!(notebook.is_empty());
        notebook.extend([note("Page 1")]);
        notebook.extend([note("Page 7"), note("Page 3")]);

        let locations: Vec<&str> = notebook.entries().iter().map(|n| n.location.as_str()).collect();
        assert_eq!(locations, vec!["Page 1", "Page 7", "Page 3"]);
        assert_eq!(notebook.title().as_str(), "some-book");
        assert_eq!(notebook.len(), 3);
    }
}
