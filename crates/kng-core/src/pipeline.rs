//! The harvest run.
//!
//! 1. load the completed set (fails before any network I/O if setup was
//!    never run)
//! 2. search the mailbox and stream matching messages
//! 3. decode each message and parse its export attachments, skipping titles
//!    that are already completed
//! 4. once the stream is drained, write every collected notebook
//! 5. log out and save the completed set
//!
//! Any mailbox or write failure aborts the run before step 5, so the
//! completed set on disk only ever grows after a clean run. Nothing is
//! written before the stream is drained, so a fetch failure also leaves no
//! notebook files behind.
//!
//! A title that is not a plain file name, or whose export does not parse, is
//! abandoned for this run only: it is counted as failed and never marked
//! completed.

use std::collections::{HashMap, HashSet};

use kng_imap::{FetchAttribute, SearchCriteria};
use kng_mime::Message;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::dedup::CompletedNotebooks;
use crate::error::Result;
use crate::extract::AttachmentExtractor;
use crate::fetcher::{MailFetcher, RawMessage};
use crate::mailbox::{ImapMailbox, Mailbox};
use crate::note::{Note, Notebook};
use crate::parser::NoteParser;
use crate::title::NormalizedKey;
use crate::writer::NotebookWriter;

/// Counters for a finished run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Messages received from the mailbox.
    pub messages: usize,
    /// Notebooks written.
    pub written: usize,
    /// Titles skipped because they were already completed.
    pub skipped: usize,
    /// Titles abandoned because an export did not parse or the title is
    /// not a usable file name.
    pub failed: usize,
}

/// Notebooks collected from the stream, in first-encounter order.
#[derive(Debug, Default)]
struct Collected {
    notebooks: Vec<Notebook>,
    index: HashMap<NormalizedKey, usize>,
    abandoned: HashSet<NormalizedKey>,
    already_seen: HashSet<NormalizedKey>,
}

impl Collected {
    fn add(&mut self, title: NormalizedKey, notes: Vec<Note>) {
        if self.abandoned.contains(&title) {
            return;
        }
        let position = if let Some(&position) = self.index.get(&title) {
            position
        } else {
            self.notebooks.push(Notebook::new(title.clone()));
            self.index.insert(title.clone(), self.notebooks.len() - 1);
            self.notebooks.len() - 1
        };
        debug!(%title, notes = notes.len(), "adding to notebook");
        self.notebooks[position].extend(notes);
    }

    fn abandon(&mut self, title: NormalizedKey) -> bool {
        self.abandoned.insert(title)
    }

    fn into_writable(self) -> impl Iterator<Item = Notebook> {
        let abandoned = self.abandoned;
        self.notebooks
            .into_iter()
            .filter(move |notebook| !abandoned.contains(notebook.title()))
    }
}

/// Runs the harvest against one mailbox session.
#[derive(Debug)]
pub struct Harvester {
    search: SearchCriteria,
    fetch_buffer: usize,
    extractor: AttachmentExtractor,
    parser: NoteParser,
    completed: CompletedNotebooks,
    writer: NotebookWriter,
}

impl Harvester {
    /// Prepares a run from configuration.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::MissingDirectory`] or
    /// [`crate::Error::MissingFile`] if setup has not been run, or an error
    /// reading the completed set.
    pub fn new(config: &Config) -> Result<Self> {
        let completed = CompletedNotebooks::load(config.completed_path()?)?;
        Ok(Self {
            search: SearchCriteria::body(config.search.clone()),
            fetch_buffer: config.fetch_buffer,
            extractor: AttachmentExtractor::new().subject_prefix(config.subject_prefix.clone()),
            parser: NoteParser::new(),
            completed,
            writer: NotebookWriter::new(config.output_dir.clone()),
        })
    }

    /// Replaces the note parser, e.g. for a different export layout.
    #[must_use]
    pub fn with_parser(mut self, parser: NoteParser) -> Self {
        self.parser = parser;
        self
    }

    /// The completed set as loaded.
    #[must_use]
    pub const fn completed(&self) -> &CompletedNotebooks {
        &self.completed
    }

    /// Harvests every matching message, then logs out.
    ///
    /// # Errors
    ///
    /// Returns an error if search or fetch fails, a notebook cannot be
    /// written, or the completed set cannot be saved. In each case the
    /// completed set on disk is left unchanged.
    pub async fn run<M: Mailbox>(mut self, mailbox: M) -> Result<RunSummary> {
        let mut fetcher = MailFetcher::new(mailbox).buffer(self.fetch_buffer);
        let ids = fetcher.search(&self.search).await?;
        let mut stream = fetcher.fetch(ids, FetchAttribute::body());

        let mut summary = RunSummary::default();
        let mut collected = Collected::default();
        while let Some(item) = stream.next().await {
            let raw = item?;
            summary.messages += 1;
            self.process(&raw, &mut collected, &mut summary);
        }
        let mailbox = stream.finish().await?;

        for notebook in collected.into_writable() {
            let bytes = self.writer.write(&notebook)?;
            info!(
                title = %notebook.title(),
                entries = notebook.len(),
                bytes,
                "wrote notebook"
            );
            self.completed.mark_completed(notebook.title().clone());
            summary.written += 1;
        }

        if let Err(e) = mailbox.logout().await {
            warn!(error = %e, "logout failed");
        }
        self.completed.save()?;

        info!(
            messages = summary.messages,
            written = summary.written,
            skipped = summary.skipped,
            failed = summary.failed,
            "run complete"
        );
        Ok(summary)
    }

    fn process(&self, raw: &RawMessage, collected: &mut Collected, summary: &mut RunSummary) {
        let message = match Message::parse(&raw.body) {
            Ok(message) => message,
            Err(e) => {
                warn!(id = raw.id, error = %e, "cannot decode message, skipping");
                return;
            }
        };

        for attachment in self.extractor.attachments(&message) {
            let title = attachment.title;
            if self.completed.contains(title.as_str()) {
                if collected.already_seen.insert(title.clone()) {
                    info!(%title, "already seen");
                    summary.skipped += 1;
                }
                continue;
            }
            if !title.is_file_stem() {
                warn!(%title, "title is not a usable file name, skipping");
                if collected.abandon(title) {
                    summary.failed += 1;
                }
                continue;
            }

            match self.parser.parse(title.as_str(), &attachment.body) {
                Ok(notes) => collected.add(title, notes),
                Err(e) => {
                    warn!(error = %e, parsed = e.parsed().len(), "cannot parse notebook, skipping");
                    if collected.abandon(title) {
                        summary.failed += 1;
                    }
                }
            }
        }
    }
}

/// Connects with `config` and runs a full harvest.
///
/// Credentials and the completed set are checked before connecting, so a
/// missing setting or data directory is reported without touching the
/// network.
///
/// # Errors
///
/// See [`Config::validate`], [`Harvester::new`], [`ImapMailbox::connect`]
/// and [`Harvester::run`].
pub async fn run(config: &Config) -> Result<RunSummary> {
    config.validate()?;
    let harvester = Harvester::new(config)?;
    let mailbox = ImapMailbox::connect(config).await?;
    harvester.run(mailbox).await
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::note::NoteKind;
    use crate::title::normalize;

    fn note(location: &str) -> Note {
        Note {
            kind: NoteKind::Highlight,
            location: location.to_string(),
            annotation: String::new(),
            starred: false,
        }
    }

    #[test]
    fn test_collected_merges_by_title_in_encounter_order() {
        let mut collected = Collected::default();
        collected.add(normalize("B Book"), vec![note("1")]);
        collected.add(normalize("A Book"), vec![note("2")]);
        collected.add(normalize("B Book"), vec![note("3")]);

        let notebooks: Vec<Notebook> = collected.into_writable().collect();
        assert_eq!(notebooks.len(), 2);
        assert_eq!(notebooks[0].title().as_str(), "b-book");
        assert_eq!(notebooks[0].len(), 2);
        assert_eq!(notebooks[1].title().as_str(), "a-book");
    }

    #[test]
    fn test_abandoned_title_not_written() {
        let mut collected = Collected::default();
        collected.add(normalize("A Book"), vec![note("1")]);
        assert!(collected.abandon(normalize("A Book")));
        assert!(!collected.abandon(normalize("A Book")));
        collected.add(normalize("A Book"), vec![note("2")]);

        assert_eq!(collected.into_writable().count(), 0);
    }
}
