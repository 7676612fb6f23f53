//! Streaming FETCH.
//!
//! Yields each message as soon as its FETCH response has been read, so a
//! caller can start working on the first message while later ones are still
//! on the wire.

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::states::Selected;
use super::{Client, status_result};
use crate::Result;
use crate::parser::{FetchItem, FetchedMessage, Response, UntaggedResponse};

/// Message stream for an in-flight FETCH command.
///
/// Only FETCH responses that carry a body section are yielded; unsolicited
/// flag updates and other untagged data are skipped.
pub struct FetchStream<'a, S> {
    client: &'a mut Client<S, Selected>,
    tag: String,
    done: bool,
}

impl<'a, S> FetchStream<'a, S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub(super) fn new(client: &'a mut Client<S, Selected>, tag: String) -> Self {
        Self {
            client,
            tag,
            done: false,
        }
    }

    /// Returns the next fetched message, or `None` once the command completed.
    ///
    /// # Errors
    ///
    /// Returns an error on I/O failure, timeout, unparseable data, or when
    /// the command completes with NO or BAD.
    pub async fn next(&mut self) -> Result<Option<FetchedMessage>> {
        while !self.done {
            match self.client.read_one().await? {
                Response::Untagged(UntaggedResponse::Fetch { seq, items }) => {
                    if items.iter().any(|i| matches!(i, FetchItem::Body { .. })) {
                        return Ok(Some(FetchedMessage { seq, items }));
                    }
                    debug!(%seq, "skipping FETCH response without a body");
                }
                Response::Tagged {
                    tag, status, text, ..
                } if tag.as_str() == self.tag => {
                    self.done = true;
                    status_result(status, &text)?;
                }
                _ => {}
            }
        }
        Ok(None)
    }

    /// Returns true once the tagged completion has been read.
    #[must_use]
    pub const fn is_complete(&self) -> bool {
        self.done
    }
}
