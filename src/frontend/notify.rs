//! Notification channel.
//!
//! Request failures and partial failures are reported here, never inline.
//! Any number of [`Notifier`] handles feed one [`NotificationCenter`] that
//! the shell drains once per frame.

use chrono::{DateTime, Utc};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

use crate::error::{ErrorClass, StudioError};

/// Channel capacity for notifications.
const NOTICE_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// A transient, user-visible message.
#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub title: String,
    pub detail: Option<String>,
    pub at: DateTime<Utc>,
}

impl Notice {
    pub fn new(level: NoticeLevel, title: impl Into<String>) -> Self {
        Self {
            level,
            title: title.into(),
            detail: None,
            at: Utc::now(),
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Notice for a failed operation.
    pub fn from_error(title: impl Into<String>, error: &StudioError) -> Self {
        let level = match error.class() {
            ErrorClass::PartialFailure | ErrorClass::Conflict => NoticeLevel::Warning,
            _ => NoticeLevel::Error,
        };
        Self::new(level, title).with_detail(error.to_string())
    }
}

/// Sending half. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: Sender<Notice>,
}

impl Notifier {
    /// Queue a notice. When the queue is full the notice is dropped and
    /// logged instead.
    pub fn notify(&self, notice: Notice) {
        match self.tx.try_send(notice) {
            Ok(()) => {}
            Err(TrySendError::Full(notice)) => {
                warn!(title = %notice.title, "Notification queue full, dropped notice");
            }
            Err(TrySendError::Disconnected(_)) => {}
        }
    }

    pub fn info(&self, title: impl Into<String>) {
        self.notify(Notice::new(NoticeLevel::Info, title));
    }

    pub fn success(&self, title: impl Into<String>) {
        self.notify(Notice::new(NoticeLevel::Success, title));
    }

    pub fn error(&self, title: impl Into<String>, error: &StudioError) {
        self.notify(Notice::from_error(title, error));
    }
}

/// Receiving half, owned by the shell.
#[derive(Debug)]
pub struct NotificationCenter {
    rx: Receiver<Notice>,
    tx: Sender<Notice>,
}

impl Default for NotificationCenter {
    fn default() -> Self {
        Self::new()
    }
}

impl NotificationCenter {
    pub fn new() -> Self {
        let (tx, rx) = bounded(NOTICE_CHANNEL_CAPACITY);
        Self { rx, tx }
    }

    pub fn notifier(&self) -> Notifier {
        Notifier {
            tx: self.tx.clone(),
        }
    }

    /// Drain all pending notices.
    pub fn drain(&self) -> Vec<Notice> {
        self.rx.try_iter().collect()
    }

    pub fn try_recv(&self) -> Option<Notice> {
        self.rx.try_recv().ok()
    }

    pub fn pending(&self) -> usize {
        self.rx.len()
    }
}
