//! Mailbox session abstraction.
//!
//! The pipeline only needs search, fetch and logout on an already selected
//! mailbox. [`ImapMailbox`] provides them over a live IMAP connection.

use std::time::Duration;

use async_trait::async_trait;
use kng_imap::{
    Client, FetchAttribute, ImapStream, SearchCriteria, Selected, SequenceSet,
};
use tokio::io::{AsyncRead, AsyncWrite};
use tracing::{debug, info};

use crate::config::Config;
use crate::error::Result;
use crate::fetcher::{MessageSink, RawMessage};

/// A logged-in session on a selected mailbox.
#[async_trait]
pub trait Mailbox: Send + Sized + 'static {
    /// Returns the ids of messages matching `criteria`, in any order.
    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>>;

    /// Fetches `section` of every message in `ids`, delivering each message
    /// to `sink` as it arrives.
    async fn fetch(&mut self, ids: &[u32], section: &FetchAttribute, sink: &MessageSink)
    -> Result<()>;

    /// Ends the session.
    async fn logout(self) -> Result<()>;
}

/// IMAP connection with the configured mailbox selected.
#[derive(Debug)]
pub struct ImapMailbox<S = ImapStream> {
    client: Client<S, Selected>,
}

impl ImapMailbox {
    /// Connects to the configured server, logs in and selects the mailbox.
    ///
    /// # Errors
    ///
    /// Returns an error if the server is unknown, or if connecting, login
    /// or select fails.
    pub async fn connect(config: &Config) -> Result<Self> {
        let imap = config.imap_config()?;
        info!(host = %imap.host, port = imap.port, "Attempting to connect...");
        let stream = kng_imap::connection::connect(&imap).await?;
        Self::open(stream, imap.io_timeout, config).await
    }
}

impl<S> ImapMailbox<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    /// Runs the session handshake over an established stream.
    ///
    /// # Errors
    ///
    /// Returns an error if the greeting, login or select fails.
    pub async fn open(stream: S, io_timeout: Duration, config: &Config) -> Result<Self> {
        let client = Client::from_stream(stream, io_timeout).await?;
        info!("Connected");

        let client = client.login(&config.email, &config.password).await?;
        info!(user = %config.email, "Logged in");

        let (client, status) = client.select(&config.mailbox).await?;
        debug!(mailbox = %config.mailbox, exists = status.exists, "mailbox selected");

        Ok(Self { client })
    }
}

#[async_trait]
impl<S> Mailbox for ImapMailbox<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>> {
        let ids = self.client.search(criteria).await?;
        Ok(ids.into_iter().map(|seq| seq.get()).collect())
    }

    async fn fetch(
        &mut self,
        ids: &[u32],
        section: &FetchAttribute,
        sink: &MessageSink,
    ) -> Result<()> {
        let Some(sequence) = SequenceSet::from_ids(ids.iter().copied()) else {
            return Ok(());
        };

        let mut stream = self
            .client
            .fetch_stream(&sequence, std::slice::from_ref(section))
            .await?;

        while let Some(message) = stream.next().await? {
            let id = message.seq.get();
            let Some(body) = message.into_body() else {
                debug!(id, "no body returned, skipping");
                continue;
            };
            if !sink.deliver(RawMessage { id, body }).await {
                debug!(id, "consumer gone, abandoning fetch");
                break;
            }
        }
        Ok(())
    }

    async fn logout(self) -> Result<()> {
        self.client.logout().await?;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tokio::sync::mpsc;
    use tokio_test::io::{Builder, Mock};

    use super::*;

    fn config() -> Config {
        Config {
            email: "reader@example.com".to_string(),
            password: "secret".to_string(),
            ..Config::default()
        }
    }

    fn handshake() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"* OK IMAP4rev1 ready\r\n")
            .write(b"A0001 LOGIN reader@example.com secret\r\n")
            .read(b"A0001 OK logged in\r\n")
            .write(b"A0002 SELECT INBOX\r\n")
            .read(b"* 12 EXISTS\r\n")
            .read(b"A0002 OK [READ-WRITE] selected\r\n");
        builder
    }

    async fn open(mock: Mock) -> ImapMailbox<Mock> {
        ImapMailbox::open(mock, Duration::from_secs(5), &config()).await.unwrap()
    }

    #[tokio::test]
    async fn test_search_uses_body_criteria() {
        let mock = handshake()
            .write(b"A0003 SEARCH BODY \"FROM no-reply@amazon.com\"\r\n")
            .read(b"* SEARCH 9 4\r\n")
            .read(b"A0003 OK done\r\n")
            .build();
        let mut mailbox = open(mock).await;

        let ids = mailbox
            .search(&SearchCriteria::body("FROM no-reply@amazon.com"))
            .await
            .unwrap();
        assert_eq!(ids, vec![4, 9]);
    }

    #[tokio::test]
    async fn test_fetch_delivers_bodies() {
        let mock = handshake()
            .write(b"A0003 FETCH 4,9 BODY.PEEK[]\r\n")
            .read(b"* 4 FETCH (BODY[] {5}\r\nfirst)\r\n")
            .read(b"* 9 FETCH (BODY[] {6}\r\nsecond)\r\n")
            .read(b"A0003 OK done\r\n")
            .build();
        let mut mailbox = open(mock).await;

        let (tx, mut rx) = mpsc::channel(10);
        let sink = MessageSink::new(tx);
        mailbox.fetch(&[4, 9], &FetchAttribute::body_peek(), &sink).await.unwrap();
        drop(sink);

        let first = rx.recv().await.unwrap().unwrap();
        assert_eq!(first, RawMessage { id: 4, body: b"first".to_vec() });
        let second = rx.recv().await.unwrap().unwrap();
        assert_eq!(second.body, b"second");
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_fetch_empty_ids_sends_nothing() {
        let mut mailbox = open(handshake().build()).await;
        let (tx, mut rx) = mpsc::channel(1);
        let sink = MessageSink::new(tx);

        mailbox.fetch(&[], &FetchAttribute::body(), &sink).await.unwrap();
        drop(sink);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn test_login_rejected() {
        let mock = Builder::new()
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN reader@example.com secret\r\n")
            .read(b"A0001 NO [AUTHENTICATIONFAILED] invalid credentials\r\n")
            .build();
        let err = ImapMailbox::open(mock, Duration::from_secs(5), &config()).await.unwrap_err();
        assert!(matches!(err, crate::Error::Imap(kng_imap::Error::No(_))));
    }
}
