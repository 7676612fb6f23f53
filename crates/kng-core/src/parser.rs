//! Parser for the vendor's CSV notebook export.
//!
//! The export starts with a block of non-tabular lines (title, author, a
//! store link) followed by a CSV table whose first row labels the columns:
//!
//! ```text
//! <8 preamble lines>
//! Annotation Type,Location,Starred?,Annotation
//! Highlight,"Page 1",,"This is cool"
//! Note,"Page 2",*,"Important idea"
//! ```
//!
//! The shape is fixed by one export format version, so every constant is a
//! parameter of [`NoteParser`].

use tracing::debug;

use crate::note::{Note, NoteKind};

/// Lines before the CSV table.
pub const DEFAULT_PREAMBLE_LINES: usize = 8;

/// Fields in every record.
pub const DEFAULT_FIELDS_PER_RECORD: usize = 4;

/// Starred-column value that marks a starred entry.
pub const DEFAULT_STARRED_MARKER: &str = "*";

/// Errors for a single notebook export.
///
/// Both variants carry the notes parsed before the failure.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// A record had the wrong number of fields.
    #[error("{title}: record on line {line} has {found} fields, expected {expected}")]
    FieldCount {
        /// Title of the notebook being parsed.
        title: String,
        /// Line of the record in the original attachment, 1-based.
        line: u64,
        /// Configured field count.
        expected: usize,
        /// Field count of the offending record.
        found: usize,
        /// Notes before the offending record.
        parsed: Vec<Note>,
    },

    /// The table is not valid CSV.
    #[error("{title}: malformed CSV: {source}")]
    Csv {
        /// Title of the notebook being parsed.
        title: String,
        /// Underlying reader error.
        #[source]
        source: csv::Error,
        /// Notes before the malformed record.
        parsed: Vec<Note>,
    },
}

impl ParseError {
    /// Notes successfully parsed before the failure.
    #[must_use]
    pub fn parsed(&self) -> &[Note] {
        match self {
            Self::FieldCount { parsed, .. } | Self::Csv { parsed, .. } => parsed,
        }
    }
}

/// Column positions within a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Columns {
    /// Note type column.
    pub kind: usize,
    /// Location column.
    pub location: usize,
    /// Starred marker column.
    pub starred: usize,
    /// Annotation text column.
    pub annotation: usize,
}

impl Default for Columns {
    fn default() -> Self {
        Self {
            kind: 0,
            location: 1,
            starred: 2,
            annotation: 3,
        }
    }
}

/// Turns an export attachment into notes.
///
/// ```
/// use kng_core::NoteParser;
///
/// let export = "a\nb\nc\nd\ne\nf\ng\nh\nType,Location,Starred,Annotation\nNote,Page 2,*,Idea\n";
/// let notes = NoteParser::new().parse("demo", export.as_bytes()).unwrap();
/// assert_eq!(notes.len(), 1);
/// assert!(notes[0].starred);
/// ```
#[derive(Debug, Clone)]
pub struct NoteParser {
    preamble_lines: usize,
    fields_per_record: usize,
    starred_marker: String,
    columns: Columns,
}

impl Default for NoteParser {
    fn default() -> Self {
        Self {
            preamble_lines: DEFAULT_PREAMBLE_LINES,
            fields_per_record: DEFAULT_FIELDS_PER_RECORD,
            starred_marker: DEFAULT_STARRED_MARKER.to_string(),
            columns: Columns::default(),
        }
    }
}

impl NoteParser {
    /// Creates a parser for the current export format.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets how many leading lines to discard.
    #[must_use]
    pub const fn preamble_lines(mut self, lines: usize) -> Self {
        self.preamble_lines = lines;
        self
    }

    /// Sets the required field count per record.
    #[must_use]
    pub const fn fields_per_record(mut self, fields: usize) -> Self {
        self.fields_per_record = fields;
        self
    }

    /// Sets the exact starred-column value meaning "starred".
    #[must_use]
    pub fn starred_marker(mut self, marker: impl Into<String>) -> Self {
        self.starred_marker = marker.into();
        self
    }

    /// Sets the column positions. Positions outside the record read as empty.
    #[must_use]
    pub const fn columns(mut self, columns: Columns) -> Self {
        self.columns = columns;
        self
    }

    /// Parses an export, returning its data rows as notes in order.
    ///
    /// The first record after the preamble is the label row and is skipped
    /// without inspection. Nothing after the preamble is an empty notebook.
    ///
    /// # Errors
    ///
    /// Returns [`ParseError::FieldCount`] for a record with the wrong field
    /// count and [`ParseError::Csv`] for unreadable CSV.
    pub fn parse(&self, title: &str, content: &[u8]) -> Result<Vec<Note>, ParseError> {
        let table = content
            .split(|&b| b == b'\n')
            .skip(self.preamble_lines)
            .collect::<Vec<_>>()
            .join(&b'\n');

        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(table.as_slice());

        let mut notes = Vec::new();
        for (index, record) in reader.records().enumerate() {
            let record = match record {
                Ok(record) => record,
                Err(source) => {
                    return Err(ParseError::Csv {
                        title: title.to_string(),
                        source,
                        parsed: notes,
                    });
                }
            };

            if record.len() != self.fields_per_record {
                let line = record.position().map_or(0, csv::Position::line);
                return Err(ParseError::FieldCount {
                    title: title.to_string(),
                    line: line + self.preamble_lines as u64,
                    expected: self.fields_per_record,
                    found: record.len(),
                    parsed: notes,
                });
            }

            if index == 0 {
                continue;
            }

            let field = |column: usize| record.get(column).unwrap_or_default();
            notes.push(Note {
                kind: NoteKind::parse(field(self.columns.kind)),
                location: field(self.columns.location).to_string(),
                annotation: field(self.columns.annotation).to_string(),
                starred: field(self.columns.starred) == self.starred_marker,
            });
        }

        debug!(title, notes = notes.len(), "parsed export");
        Ok(notes)
    }
}
