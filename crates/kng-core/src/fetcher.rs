//! Mail fetcher.
//!
//! Searches the mailbox, then streams matching messages through a bounded
//! channel:
//!
//! 1. `search` returns ascending message ids
//! 2. `fetch` spawns one producer task that runs the mailbox FETCH and sends
//!    each message into the channel, blocking while the channel is full
//! 3. the caller consumes messages from [`FetchStream::next`] while later
//!    ones are still on the wire
//! 4. a producer failure is sent in-band as the final item
//!
//! Dropping the stream aborts the producer.

use kng_imap::{FetchAttribute, SearchCriteria};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::mailbox::Mailbox;

/// Default capacity of the message channel.
pub const DEFAULT_FETCH_BUFFER: usize = 10;

/// A fetched message, still MIME-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawMessage {
    /// Mailbox id the message was fetched under.
    pub id: u32,
    /// Full RFC 5322 message.
    pub body: Vec<u8>,
}

/// Producer side of the message channel, handed to [`Mailbox::fetch`].
#[derive(Debug)]
pub struct MessageSink {
    tx: mpsc::Sender<Result<RawMessage>>,
}

impl MessageSink {
    pub(crate) const fn new(tx: mpsc::Sender<Result<RawMessage>>) -> Self {
        Self { tx }
    }

    /// Queues a message, waiting while the channel is full.
    ///
    /// Returns `false` once the consumer has gone away; the mailbox should
    /// stop fetching.
    pub async fn deliver(&self, message: RawMessage) -> bool {
        self.tx.send(Ok(message)).await.is_ok()
    }

    async fn fail(&self, error: Error) {
        if self.tx.send(Err(error)).await.is_err() {
            debug!("fetch failed after the consumer went away");
        }
    }
}

/// Drives search and fetch against one mailbox session.
#[derive(Debug)]
pub struct MailFetcher<M> {
    mailbox: M,
    buffer: usize,
}

impl<M: Mailbox> MailFetcher<M> {
    /// Creates a fetcher with the default channel capacity.
    pub const fn new(mailbox: M) -> Self {
        Self {
            mailbox,
            buffer: DEFAULT_FETCH_BUFFER,
        }
    }

    /// Sets the channel capacity. Zero is treated as one.
    #[must_use]
    pub fn buffer(mut self, capacity: usize) -> Self {
        self.buffer = capacity.max(1);
        self
    }

    /// Searches the mailbox, returning ids in ascending order.
    ///
    /// # Errors
    ///
    /// Returns an error if the mailbox search fails.
    pub async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<u32>> {
        let mut ids = self.mailbox.search(criteria).await?;
        ids.sort_unstable();
        ids.dedup();
        info!(count = ids.len(), "found matching messages");
        Ok(ids)
    }

    /// Starts fetching `ids` in the background.
    ///
    /// An empty id list issues no FETCH and yields an exhausted stream.
    pub fn fetch(self, ids: Vec<u32>, section: FetchAttribute) -> FetchStream<M> {
        let (tx, rx) = mpsc::channel(self.buffer);
        let mut mailbox = self.mailbox;

        let handle = tokio::spawn(async move {
            if ids.is_empty() {
                return mailbox;
            }
            let sink = MessageSink::new(tx);
            if let Err(e) = mailbox.fetch(&ids, &section, &sink).await {
                sink.fail(e).await;
            }
            mailbox
        });

        FetchStream {
            rx,
            handle: Some(handle),
        }
    }
}

/// Consumer side of a background fetch.
#[derive(Debug)]
pub struct FetchStream<M> {
    rx: mpsc::Receiver<Result<RawMessage>>,
    handle: Option<JoinHandle<M>>,
}

impl<M> FetchStream<M> {
    /// Waits for the next message.
    ///
    /// Returns `None` once the producer is done. A fetch failure is yielded
    /// as `Some(Err(..))` and is always the last item.
    pub async fn next(&mut self) -> Option<Result<RawMessage>> {
        self.rx.recv().await
    }

    /// Stops the producer and hands the mailbox session back.
    ///
    /// Messages not yet consumed are discarded.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FetchAborted`] if the producer task panicked or was
    /// cancelled.
    pub async fn finish(mut self) -> Result<M> {
        self.rx.close();
        let handle = self
            .handle
            .take()
            .ok_or_else(|| Error::FetchAborted("producer already joined".to_string()))?;
        handle.await.map_err(|e| Error::FetchAborted(e.to_string()))
    }
}

impl<M> Drop for FetchStream<M> {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}
