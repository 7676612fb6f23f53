//! Type-state IMAP client connection.
//!
//! Uses the type-state pattern to enforce valid state transitions at compile time.
//! The IMAP connection states are:
//!
//! - `NotAuthenticated`: Initial state after connection
//! - `Authenticated`: After successful LOGIN
//! - `Selected`: After successful SELECT
//!
//! Each state only exposes methods that are valid for that state.

#![allow(clippy::missing_errors_doc)]

mod authenticated;
mod fetch;
mod not_authenticated;
mod selected;
mod states;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::trace;

pub use self::fetch::FetchStream;
pub use self::states::{Authenticated, NotAuthenticated, Selected};
use super::framed::FramedStream;
use crate::command::{Command, TagGenerator};
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::Status;
use crate::{Error, Result};

/// IMAP client connection with type-state.
///
/// The type parameter `State` tracks the connection state at compile time.
pub struct Client<S, State> {
    pub(crate) stream: FramedStream<S>,
    pub(crate) tag_gen: TagGenerator,
    pub(crate) capabilities: Vec<String>,
    pub(crate) state: State,
}

// Manual Debug implementation since FramedStream doesn't implement Debug
impl<S, State: std::fmt::Debug> std::fmt::Debug for Client<S, State> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("tag_gen", &self.tag_gen)
            .field("capabilities", &self.capabilities)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

/// Shared implementation for all states.
impl<S, State> Client<S, State>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Returns the server capabilities seen so far.
    #[must_use]
    pub fn capabilities(&self) -> &[String] {
        &self.capabilities
    }

    /// Checks if the server advertised a capability (case-insensitive).
    #[must_use]
    pub fn has_capability(&self, cap: &str) -> bool {
        self.capabilities.iter().any(|c| c.eq_ignore_ascii_case(cap))
    }

    /// Sends a NOOP command to keep the connection alive.
    pub async fn noop(&mut self) -> Result<()> {
        self.execute(&Command::Noop).await.map(drop)
    }

    /// Sends a CAPABILITY command and updates the stored capabilities.
    pub async fn capability(&mut self) -> Result<Vec<String>> {
        let responses = self.execute(&Command::Capability).await?;
        self.absorb_capabilities(&responses);
        Ok(self.capabilities.clone())
    }

    /// Gracefully disconnects from the server.
    ///
    /// The server's BYE is expected here, and a connection closed right after
    /// it counts as a clean logout.
    pub async fn logout(mut self) -> Result<()> {
        let tag = self.send(&Command::Logout).await?;
        let mut saw_bye = false;

        loop {
            let bytes = match self.stream.read_response().await {
                Ok(bytes) => bytes,
                Err(Error::Io(_)) if saw_bye => return Ok(()),
                Err(e) => return Err(e),
            };
            match ResponseParser::parse(&bytes)? {
                Response::Tagged {
                    tag: t,
                    status,
                    text,
                    ..
                } if t.as_str() == tag => return status_result(status, &text),
                Response::Untagged(UntaggedResponse::Status {
                    status: Status::Bye,
                    ..
                }) => saw_bye = true,
                _ => {}
            }
        }
    }

    /// Moves the connection into another state.
    pub(crate) fn transition<Next>(self, state: Next) -> Client<S, Next> {
        Client {
            stream: self.stream,
            tag_gen: self.tag_gen,
            capabilities: self.capabilities,
            state,
        }
    }

    /// Writes a command and reads every response up to its tagged completion,
    /// failing unless the completion is OK.
    pub(crate) async fn execute(&mut self, command: &Command) -> Result<Vec<Response>> {
        let tag = self.send(command).await?;
        let responses = self.read_until_tagged(&tag).await?;
        Self::check_tagged_ok(&responses, &tag)?;
        Ok(responses)
    }

    /// Writes a command and returns its tag.
    pub(crate) async fn send(&mut self, command: &Command) -> Result<String> {
        let tag = self.tag_gen.next();
        trace!(command = %command.redacted(&tag), "sending");
        self.stream.write_command(&command.serialize(&tag)).await?;
        Ok(tag)
    }

    /// Reads and parses responses until the tagged response for `tag`.
    pub(crate) async fn read_until_tagged(&mut self, tag: &str) -> Result<Vec<Response>> {
        let mut responses = Vec::new();
        loop {
            let response = self.read_one().await?;
            let done = matches!(&response, Response::Tagged { tag: t, .. } if t.as_str() == tag);
            responses.push(response);
            if done {
                return Ok(responses);
            }
        }
    }

    /// Reads a single response, turning an untagged BYE into an error.
    pub(crate) async fn read_one(&mut self) -> Result<Response> {
        let bytes = self.stream.read_response().await?;
        let response = ResponseParser::parse(&bytes)?;
        if let Response::Untagged(UntaggedResponse::Status {
            status: Status::Bye,
            text,
            ..
        }) = &response
        {
            return Err(Error::Bye(text.clone()));
        }
        Ok(response)
    }

    /// Checks that the tagged response is OK.
    pub(crate) fn check_tagged_ok(responses: &[Response], tag: &str) -> Result<()> {
        for response in responses.iter().rev() {
            if let Response::Tagged {
                tag: resp_tag,
                status,
                text,
                ..
            } = response
                && resp_tag.as_str() == tag
            {
                return status_result(*status, text);
            }
        }

        Err(Error::Protocol("missing tagged response".to_string()))
    }

    fn absorb_capabilities(&mut self, responses: &[Response]) {
        for response in responses {
            if let Response::Untagged(UntaggedResponse::Capability(caps)) = response {
                self.capabilities.clone_from(caps);
            }
        }
    }
}

/// Maps a completion status to a result.
pub(crate) fn status_result(status: Status, text: &str) -> Result<()> {
    match status {
        Status::Ok | Status::PreAuth => Ok(()),
        Status::No => Err(Error::No(text.to_string())),
        Status::Bad => Err(Error::Bad(text.to_string())),
        Status::Bye => Err(Error::Bye(text.to_string())),
    }
}

impl<S> Client<S, NotAuthenticated> {
    pub(crate) fn new(stream: FramedStream<S>, capabilities: Vec<String>) -> Self {
        Self {
            stream,
            tag_gen: TagGenerator::default(),
            capabilities,
            state: NotAuthenticated,
        }
    }
}
