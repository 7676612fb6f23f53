//! End-to-end harvest runs against an in-memory mailbox.

#![allow(clippy::unwrap_used)]

use std::fs;
use std::path::PathBuf;

use async_trait::async_trait;
use kng_core::{
    Config, Error, Harvester, Mailbox, MessageSink, RawMessage, Result, RunSummary,
};
use kng_imap::{FetchAttribute, SearchCriteria};
use tempfile::TempDir;

const PREAMBLE: &str = "Your Kindle Notes For:\nA Title\nby Someone\nFree Kindle instant preview:\nhttps://a.co/x\n----\n\n,,,\n";

/// Serves a fixed set of messages, optionally failing mid-fetch.
#[derive(Debug, Default)]
struct MemoryMailbox {
    messages: Vec<(u32, Vec<u8>)>,
    fail_after: Option<usize>,
}

impl MemoryMailbox {
    fn new(messages: Vec<Vec<u8>>) -> Self {
        Self {
            messages: (1..).zip(messages).collect(),
            fail_after: None,
        }
    }
}

#[async_trait]
impl Mailbox for MemoryMailbox {
    async fn search(&mut self, _criteria: &SearchCriteria) -> Result<Vec<u32>> {
        Ok(self.messages.iter().map(|(id, _)| *id).collect())
    }

    async fn fetch(
        &mut self,
        ids: &[u32],
        _section: &FetchAttribute,
        sink: &MessageSink,
    ) -> Result<()> {
        for (sent, (id, body)) in self.messages.iter().filter(|(id, _)| ids.contains(id)).enumerate() {
            if self.fail_after == Some(sent) {
                return Err(kng_imap::Error::Bye("connection reset".to_string()).into());
            }
            let message = RawMessage {
                id: *id,
                body: body.clone(),
            };
            if !sink.deliver(message).await {
                break;
            }
        }
        Ok(())
    }

    async fn logout(self) -> Result<()> {
        Ok(())
    }
}

fn kindle_mail(title: &str, rows: &str) -> Vec<u8> {
    let export = format!("{PREAMBLE}Annotation Type,Location,Starred?,Annotation\n{rows}");
    format!(
        "From: Amazon Kindle <no-reply@amazon.com>\r\n\
         Subject: Your Kindle Notes From {title}\r\n\
         MIME-Version: 1.0\r\n\
         Content-Type: multipart/mixed; boundary=\"outer\"\r\n\
         \r\n\
         --outer\r\n\
         Content-Type: text/plain; charset=utf-8\r\n\
         \r\n\
         Your notes are attached.\r\n\
         --outer\r\n\
         Content-Type: text/csv; charset=utf-8; name=\"{title}.csv\"\r\n\
         Content-Disposition: attachment; filename=\"{title}.csv\"\r\n\
         \r\n\
         {export}\r\n\
         --outer--\r\n"
    )
    .into_bytes()
}

struct Workspace {
    _root: TempDir,
    config: Config,
}

impl Workspace {
    fn new(completed: &str) -> Self {
        let root = tempfile::tempdir().unwrap();
        let data = root.path().join("kindle-notes");
        let out = root.path().join("out");
        fs::create_dir_all(&data).unwrap();
        fs::create_dir_all(&out).unwrap();
        fs::write(data.join("completed-notebooks.yaml"), completed).unwrap();

        let config = Config {
            email: "reader@example.com".to_string(),
            password: "secret".to_string(),
            output_dir: out,
            data_dir: Some(data),
            ..Config::default()
        };
        Self {
            _root: root,
            config,
        }
    }

    fn output(&self, name: &str) -> PathBuf {
        self.config.output_dir.join(name)
    }

    fn outputs(&self) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(&self.config.output_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        names.sort();
        names
    }

    fn completed(&self) -> String {
        fs::read_to_string(self.config.completed_path().unwrap()).unwrap()
    }

    async fn run(&self, mailbox: MemoryMailbox) -> Result<RunSummary> {
        Harvester::new(&self.config)?.run(mailbox).await
    }
}

fn two_books() -> MemoryMailbox {
    MemoryMailbox::new(vec![
        kindle_mail("Some Book", "Highlight,Page 3,,Old news\n"),
        kindle_mail(
            "Other Book Notebook",
            "Highlight,\"Page 1\",,\"This is cool\"\nNote,\"Page 2\",*,\"Important idea\"\n",
        ),
    ])
}

#[tokio::test]
async fn test_only_new_notebook_written() {
    let workspace = Workspace::new("some-book: true\n");
    let summary = workspace.run(two_books()).await.unwrap();

    assert_eq!(
        summary,
        RunSummary {
            messages: 2,
            written: 1,
            skipped: 1,
            failed: 0,
        }
    );
    assert!(!workspace.output("some-book.txt").exists());
    assert_eq!(
        fs::read_to_string(workspace.output("other-book-notebook.txt")).unwrap(),
        "Annotation: This is cool\nLocation: Page 1\nType: Highlight\nStarred: false\n\n\
         Annotation: Important idea\nLocation: Page 2\nType: Note\nStarred: true\n\n"
    );
    assert_eq!(
        workspace.completed(),
        "other-book-notebook: true\nsome-book: true\n"
    );
}

#[tokio::test]
async fn test_rerun_is_noop() {
    let workspace = Workspace::new("some-book: true\n");
    workspace.run(two_books()).await.unwrap();
    let artifact = workspace.output("other-book-notebook.txt");
    fs::write(&artifact, "edited by hand").unwrap();
    let snapshot = workspace.completed();

    let summary = workspace.run(two_books()).await.unwrap();
    assert_eq!(summary.written, 0);
    assert_eq!(summary.skipped, 2);
    assert_eq!(fs::read_to_string(&artifact).unwrap(), "edited by hand");
    assert_eq!(workspace.completed(), snapshot);
}

#[tokio::test]
async fn test_bad_export_skipped_run_continues() {
    let workspace = Workspace::new("");
    let mailbox = MemoryMailbox::new(vec![
        kindle_mail("Broken Book", "Highlight,Page 1,,fine\nNote,Page 2,oops\n"),
        kindle_mail("Good Book", "Note,Page 9,*,kept\n"),
    ]);

    let summary = workspace.run(mailbox).await.unwrap();
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.written, 1);
    assert!(!workspace.output("broken-book.txt").exists());
    assert!(workspace.output("good-book.txt").exists());
    assert_eq!(workspace.completed(), "good-book: true\n");
}

#[tokio::test]
async fn test_same_title_in_two_messages_merged() {
    let workspace = Workspace::new("");
    let mailbox = MemoryMailbox::new(vec![
        kindle_mail("Split Book", "Highlight,Page 1,,first\n"),
        kindle_mail("Split Book", "Highlight,Page 2,,second\n"),
    ]);

    let summary = workspace.run(mailbox).await.unwrap();
    assert_eq!(summary.written, 1);
    let text = fs::read_to_string(workspace.output("split-book.txt")).unwrap();
    let first = text.find("first").unwrap();
    let second = text.find("second").unwrap();
    assert!(first < second);
}

#[tokio::test]
async fn test_unrelated_mail_ignored() {
    let workspace = Workspace::new("");
    let mailbox = MemoryMailbox::new(vec![
        b"Subject: Deals of the day\r\n\r\nBuy things.\r\n".to_vec(),
        b"Subject: Your Kindle Notes\r\nContent-Type: multipart/mixed\r\n\r\nno boundary\r\n".to_vec(),
    ]);

    let summary = workspace.run(mailbox).await.unwrap();
    assert_eq!(summary.messages, 2);
    assert_eq!(summary.written, 0);
    assert_eq!(workspace.completed(), "");
}

#[tokio::test]
async fn test_fetch_failure_saves_nothing() {
    let workspace = Workspace::new("some-book: true\n");
    let mut mailbox = two_books();
    mailbox.messages.push((3, kindle_mail("Third Book", "Note,Page 1,,x\n")));
    mailbox.fail_after = Some(2);

    let err = workspace.run(mailbox).await.unwrap_err();
    assert!(matches!(err, Error::Imap(kng_imap::Error::Bye(_))));
    assert_eq!(workspace.completed(), "some-book: true\n");
    assert!(workspace.outputs().is_empty());
}

#[tokio::test]
async fn test_title_cannot_escape_output_dir() {
    let workspace = Workspace::new("");
    let mailbox = MemoryMailbox::new(vec![
        kindle_mail("../escaped", "Highlight,Page 1,,out\n"),
        kindle_mail("/absolute", "Highlight,Page 1,,out\n"),
        kindle_mail("Good Book", "Note,Page 9,*,kept\n"),
    ]);

    let summary = workspace.run(mailbox).await.unwrap();
    assert_eq!(
        summary,
        RunSummary {
            messages: 3,
            written: 1,
            skipped: 0,
            failed: 2,
        }
    );
    let root = workspace.config.output_dir.parent().unwrap();
    assert!(!root.join("escaped.txt").exists());
    assert_eq!(workspace.outputs(), vec!["good-book.txt".to_string()]);
    assert_eq!(workspace.completed(), "good-book: true\n");
}

#[tokio::test]
async fn test_title_with_slash_does_not_block_others() {
    let workspace = Workspace::new("");
    let mailbox = MemoryMailbox::new(vec![
        kindle_mail("Good Book", "Note,Page 9,*,kept\n"),
        kindle_mail("Either/Or", "Highlight,Page 1,,choice\n"),
    ]);

    let summary = workspace.run(mailbox).await.unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(workspace.completed(), "good-book: true\n");

    let again = workspace.run(MemoryMailbox::new(vec![
        kindle_mail("Good Book", "Note,Page 9,*,kept\n"),
    ]));
    assert_eq!(again.await.unwrap().skipped, 1);
}

#[tokio::test]
async fn test_attachment_without_disposition_harvested() {
    let workspace = Workspace::new("");
    let export = format!("{PREAMBLE}Annotation Type,Location,Starred?,Annotation\nNote,Page 4,*,found\n");
    let mail = format!(
        "Subject: Your Kindle Notes From Book\r\n\
         Content-Type: multipart/mixed; boundary=\"b\"\r\n\
         \r\n\
         --b\r\n\
         Content-Type: application/octet-stream; name=\"Book.csv\"\r\n\
         \r\n\
         {export}\r\n\
         --b--\r\n"
    );

    let summary = workspace.run(MemoryMailbox::new(vec![mail.into_bytes()])).await.unwrap();
    assert_eq!(summary.written, 1);
    assert_eq!(
        fs::read_to_string(workspace.output("book.txt")).unwrap(),
        "Annotation: found\nLocation: Page 4\nType: Note\nStarred: true\n\n"
    );
    assert_eq!(workspace.completed(), "book: true\n");
}

#[tokio::test]
async fn test_missing_setup_fails_before_fetch() {
    let root = tempfile::tempdir().unwrap();
    let config = Config {
        email: "reader@example.com".to_string(),
        password: "secret".to_string(),
        data_dir: Some(root.path().join("kindle-notes")),
        ..Config::default()
    };

    let err = Harvester::new(&config).unwrap_err();
    assert!(matches!(err, Error::MissingDirectory(_)));
    assert!(err.to_string().contains("kng setup"));
}
