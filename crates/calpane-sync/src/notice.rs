//! Transient status notices.
//!
//! A small publish/subscribe channel for the status banner of a calendar
//! view. [`Notice::Start`] shows a message, [`Notice::Stop`] hides whatever
//! is showing. Publishing never blocks and never fails; notices sent while
//! nobody listens are dropped.

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::trace;

use crate::config::NoticeConfig;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Success,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Info => "info",
            Self::Success => "success",
            Self::Warning => "warning",
            Self::Error => "error",
        };
        f.write_str(s)
    }
}

/// A banner update.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum Notice {
    /// Show a message.
    Start { severity: Severity, message: String },
    /// Hide the current message.
    Stop,
}

impl Notice {
    pub fn is_error(&self) -> bool {
        matches!(
            self,
            Self::Start {
                severity: Severity::Error,
                ..
            }
        )
    }
}

/// Broadcast channel of [`Notice`]s. Cheap to clone.
#[derive(Debug, Clone)]
pub struct NoticeBus {
    tx: broadcast::Sender<Notice>,
}

impl Default for NoticeBus {
    fn default() -> Self {
        Self::new(NoticeConfig::default())
    }
}

impl NoticeBus {
    /// Creates a bus with the configured buffer.
    pub fn new(config: NoticeConfig) -> Self {
        let (tx, _) = broadcast::channel(config.capacity.max(1));
        Self { tx }
    }

    /// Subscribes to notices published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Publishes a notice to every current subscriber.
    pub fn publish(&self, notice: Notice) {
        if self.tx.send(notice).is_err() {
            trace!("notice dropped, no subscribers");
        }
    }

    /// Shows a message.
    pub fn start(&self, severity: Severity, message: impl Into<String>) {
        self.publish(Notice::Start {
            severity,
            message: message.into(),
        });
    }

    /// Hides the current message.
    pub fn stop(&self) {
        self.publish(Notice::Stop);
    }

    /// Hides the current message after `delay`.
    ///
    /// The stop is unconditional: if a newer message is showing by then, it
    /// is hidden too.
    pub fn stop_after(&self, delay: Duration) -> JoinHandle<()> {
        let bus = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            bus.stop();
        })
    }
}
