//! # Operator Notices
//!
//! Banners for forced cache and config operations travel from the
//! runtime to the host over a bounded crossbeam channel.
//!
//! ```text
//! ┌──────────────┐  try_send   ┌─────────┐  drain   ┌──────────┐
//! │  Provider /  │───────────> │ channel │────────> │   Host   │
//! │  Commands    │             └─────────┘          │ (chat,   │
//! └──────────────┘                                  │  stdout) │
//!                                                   └──────────┘
//! ```
//!
//! Sending never blocks. A full or disconnected channel drops the notice.

use std::fmt;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::trace;

/// Default channel capacity.
pub const NOTICE_CAPACITY: usize = 256;

/// One operator-visible message.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum OperatorNotice {
    /// A forced operation began.
    Started(String),
    /// A forced operation completed.
    Finished(String),
    /// Informational line.
    Info(String),
}

impl fmt::Display for OperatorNotice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Started(text) => write!(f, "[strata] {text}..."),
            Self::Finished(text) => write!(f, "[strata] {text} done"),
            Self::Info(text) => write!(f, "[strata] {text}"),
        }
    }
}

/// Producer handle, cloned into the provider.
#[derive(Clone)]
pub struct NoticeSender {
    sender: Sender<OperatorNotice>,
}

impl NoticeSender {
    /// Sends a notice without blocking. Returns `false` if it was dropped.
    #[inline]
    pub fn send(&self, notice: OperatorNotice) -> bool {
        match self.sender.try_send(notice) {
            Ok(()) => true,
            Err(TrySendError::Full(notice) | TrySendError::Disconnected(notice)) => {
                trace!(%notice, "operator notice dropped");
                false
            }
        }
    }
}

/// Consumer handle, held by the host.
#[derive(Clone)]
pub struct NoticeReceiver {
    receiver: Receiver<OperatorNotice>,
}

impl NoticeReceiver {
    /// Takes every pending notice.
    #[must_use]
    pub fn drain(&self) -> Vec<OperatorNotice> {
        self.receiver.try_iter().collect()
    }

    /// Number of pending notices.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.receiver.len()
    }
}

/// Creates a connected sender/receiver pair.
#[must_use]
pub fn notice_channel(capacity: usize) -> (NoticeSender, NoticeReceiver) {
    let (sender, receiver) = bounded(capacity);
    (NoticeSender { sender }, NoticeReceiver { receiver })
}
