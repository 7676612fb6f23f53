//! Implementation for the selected state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::fetch::FetchStream;
use super::states::Selected;
use crate::Result;
use crate::command::{Command, FetchAttribute, SearchCriteria};
use crate::parser::{FetchedMessage, Response, UntaggedResponse};
use crate::types::{SeqNum, SequenceSet};

impl<S> Client<S, Selected>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the selected mailbox name.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        self.state.mailbox()
    }

    /// Searches for messages matching the given criteria.
    ///
    /// Returns sequence numbers in ascending order.
    pub async fn search(&mut self, criteria: &SearchCriteria) -> Result<Vec<SeqNum>> {
        let command = Command::Search {
            criteria: criteria.clone(),
        };
        let responses = self.execute(&command).await?;

        let mut results: Vec<SeqNum> = responses
            .into_iter()
            .filter_map(|response| match response {
                Response::Untagged(UntaggedResponse::Search(ids)) => Some(ids),
                _ => None,
            })
            .flatten()
            .collect();
        results.sort_unstable();
        results.dedup();

        Ok(results)
    }

    /// Fetches message data, buffering every message before returning.
    pub async fn fetch(
        &mut self,
        sequence: &SequenceSet,
        items: &[FetchAttribute],
    ) -> Result<Vec<FetchedMessage>> {
        let command = Command::Fetch {
            sequence: sequence.clone(),
            items: items.to_vec(),
        };
        let responses = self.execute(&command).await?;

        Ok(responses
            .into_iter()
            .filter_map(|response| match response {
                Response::Untagged(UntaggedResponse::Fetch { seq, items }) => {
                    Some(FetchedMessage { seq, items })
                }
                _ => None,
            })
            .collect())
    }

    /// Starts a FETCH and yields messages one at a time as they arrive.
    ///
    /// The connection is borrowed until the returned stream is exhausted.
    pub async fn fetch_stream(
        &mut self,
        sequence: &SequenceSet,
        items: &[FetchAttribute],
    ) -> Result<FetchStream<'_, S>> {
        let command = Command::Fetch {
            sequence: sequence.clone(),
            items: items.to_vec(),
        };
        let tag = self.send(&command).await?;
        Ok(FetchStream::new(self, tag))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use tokio_test::io::{Builder, Mock};

    use super::*;
    use crate::Error;

    async fn selected(mock: Mock) -> Client<Mock, Selected> {
        let client = Client::from_stream(mock, Duration::from_secs(5)).await.unwrap();
        let client = client.login("u", "p").await.unwrap();
        client.select("INBOX").await.unwrap().0
    }

    fn session() -> Builder {
        let mut builder = Builder::new();
        builder
            .read(b"* OK ready\r\n")
            .write(b"A0001 LOGIN u p\r\n")
            .read(b"A0001 OK done\r\n")
            .write(b"A0002 SELECT INBOX\r\n")
            .read(b"* 3 EXISTS\r\n")
            .read(b"A0002 OK selected\r\n");
        builder
    }

    #[tokio::test]
    async fn test_search_sorted() {
        let mock = session()
            .write(b"A0003 SEARCH BODY \"FROM no-reply@amazon.com\"\r\n")
            .read(b"* SEARCH 9 2 5\r\n")
            .read(b"A0003 OK SEARCH completed\r\n")
            .build();
        let mut client = selected(mock).await;

        let ids = client
            .search(&SearchCriteria::body("FROM no-reply@amazon.com"))
            .await
            .unwrap();
        let ids: Vec<u32> = ids.into_iter().map(SeqNum::get).collect();
        assert_eq!(ids, vec![2, 5, 9]);
    }

    #[tokio::test]
    async fn test_search_bad() {
        let mock = session()
            .write(b"A0003 SEARCH ALL\r\n")
            .read(b"A0003 BAD Could not parse command\r\n")
            .build();
        let mut client = selected(mock).await;

        assert!(matches!(
            client.search(&SearchCriteria::All).await,
            Err(Error::Bad(_))
        ));
    }

    #[tokio::test]
    async fn test_fetch_buffered() {
        let mock = session()
            .write(b"A0003 FETCH 1:2 BODY[]\r\n")
            .read(b"* 1 FETCH (BODY[] {3}\r\none)\r\n")
            .read(b"* 2 FETCH (BODY[] {3}\r\ntwo)\r\n")
            .read(b"A0003 OK FETCH completed\r\n")
            .build();
        let mut client = selected(mock).await;

        let messages = client
            .fetch(&SequenceSet::range(1, 2).unwrap(), &[FetchAttribute::body()])
            .await
            .unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[1].body(), Some(&b"two"[..]));
    }
}
