//! Type-state markers for IMAP client connection states.
//!
//! `Selected` carries runtime state about the currently selected mailbox;
//! the other states are plain markers.

use std::sync::Arc;

use crate::types::MailboxStatus;

/// Marker type for the not-authenticated state.
///
/// In this state, only LOGIN (and LOGOUT) are valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct NotAuthenticated;

/// Marker type for the authenticated state.
///
/// In this state, mailbox selection is valid.
#[derive(Debug, Clone, Copy, Default)]
pub struct Authenticated;

/// State for a selected mailbox.
#[derive(Debug, Clone)]
pub struct Selected {
    /// The selected mailbox name.
    pub(crate) mailbox: Arc<str>,
    /// Mailbox status from the SELECT response.
    pub(crate) status: MailboxStatus,
}

impl Selected {
    /// Creates a new Selected state.
    #[must_use]
    pub fn new(mailbox: impl Into<Arc<str>>, status: MailboxStatus) -> Self {
        Self {
            mailbox: mailbox.into(),
            status,
        }
    }

    /// Returns the name of the selected mailbox.
    #[must_use]
    pub fn mailbox(&self) -> &str {
        &self.mailbox
    }

    /// Returns the mailbox status snapshot from SELECT.
    #[must_use]
    pub const fn status(&self) -> &MailboxStatus {
        &self.status
    }
}
