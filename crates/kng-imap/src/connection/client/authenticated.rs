//! Implementation for the authenticated state.

use tokio::io::{AsyncRead, AsyncWrite};

use super::Client;
use super::states::{Authenticated, Selected};
use crate::Result;
use crate::command::Command;
use crate::parser::{Response, UntaggedResponse};
use crate::types::MailboxStatus;

impl<S> Client<S, Authenticated>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    /// Selects a mailbox, moving to the selected state.
    pub async fn select(mut self, mailbox: &str) -> Result<(Client<S, Selected>, MailboxStatus)> {
        let command = Command::Select {
            mailbox: mailbox.to_string(),
        };

        let responses = self.execute(&command).await?;
        let status = parse_mailbox_status(&responses);

        Ok((self.transition(Selected::new(mailbox, status)), status))
    }
}

/// Collects EXISTS/RECENT counts from SELECT responses.
fn parse_mailbox_status(responses: &[Response]) -> MailboxStatus {
    let mut status = MailboxStatus::default();
    for response in responses {
        match response {
            Response::Untagged(UntaggedResponse::Exists(n)) => status.exists = *n,
            Response::Untagged(UntaggedResponse::Recent(n)) => status.recent = *n,
            _ => {}
        }
    }
    status
}
