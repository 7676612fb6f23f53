//! Implementation for the not-authenticated state.

use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite};
use tracing::debug;

use super::Client;
use super::states::{Authenticated, NotAuthenticated};
use crate::command::Command;
use crate::connection::framed::FramedStream;
use crate::parser::{Response, ResponseParser, UntaggedResponse};
use crate::types::Status;
use crate::{Error, Result};

impl<S> Client<S, NotAuthenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a new client from a connected stream.
    ///
    /// Reads the server greeting, picking up capabilities if the greeting
    /// advertises them. Every later server response must arrive within
    /// `io_timeout`.
    pub async fn from_stream(stream: S, io_timeout: Duration) -> Result<Self> {
        Self::from_framed(FramedStream::with_timeout(stream, io_timeout)).await
    }

    /// Creates a new client from an already framed stream.
    pub async fn from_framed(mut framed: FramedStream<S>) -> Result<Self> {
        let greeting = framed.read_response().await?;

        let mut capabilities = Vec::new();
        match ResponseParser::parse(&greeting)? {
            Response::Untagged(UntaggedResponse::Status {
                status: Status::Ok | Status::PreAuth,
                code,
                text,
            }) => {
                debug!(greeting = %text, "server ready");
                if let Some(list) = code.as_deref().and_then(|c| c.strip_prefix("CAPABILITY ")) {
                    capabilities = list.split_whitespace().map(str::to_string).collect();
                }
            }
            Response::Untagged(UntaggedResponse::Status {
                status: Status::Bye,
                text,
                ..
            }) => return Err(Error::Bye(text)),
            other => {
                return Err(Error::Protocol(format!("unexpected greeting: {other:?}")));
            }
        }

        Ok(Self::new(framed, capabilities))
    }

    /// Authenticates with the server using LOGIN.
    ///
    /// Consumes self and returns an authenticated client on success.
    pub async fn login(
        mut self,
        username: &str,
        password: &str,
    ) -> Result<Client<S, Authenticated>> {
        let command = Command::Login {
            username: username.to_string(),
            password: password.to_string(),
        };

        let responses = self.execute(&command).await?;
        self.absorb_capabilities(&responses);

        Ok(self.transition(Authenticated))
    }
}
