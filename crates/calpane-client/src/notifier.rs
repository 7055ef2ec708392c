//! Notice forwarding.
//!
//! The CLI has no banner to show notices in. [`NoticeForwarder`] drains a
//! view's notice channel into the log and, when enabled, sends error notices
//! to the desktop notification daemon.

use std::time::Duration;

use calpane_sync::{Notice, Severity};
use notify_rust::Notification;
use tokio::sync::broadcast::{self, error::RecvError};
use tokio::task::JoinHandle;
use tracing::{debug, info, trace, warn};

/// Forwards notices until the channel closes.
#[derive(Debug, Clone)]
pub struct NoticeForwarder {
    app_name: String,
    desktop: bool,
    timeout: Duration,
}

impl NoticeForwarder {
    pub fn new(desktop: bool) -> Self {
        Self {
            app_name: "calpane".to_string(),
            desktop,
            timeout: Duration::from_secs(5),
        }
    }

    /// Spawns the forwarding task. The task returns how many notices it saw.
    pub fn spawn(self, mut rx: broadcast::Receiver<Notice>) -> JoinHandle<usize> {
        tokio::spawn(async move {
            let mut seen = 0;
            loop {
                match rx.recv().await {
                    Ok(notice) => {
                        seen += 1;
                        self.forward(notice);
                    }
                    Err(RecvError::Lagged(skipped)) => {
                        warn!(skipped, "notice forwarder lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
            debug!(seen, "notice channel closed");
            seen
        })
    }

    fn forward(&self, notice: Notice) {
        match notice {
            Notice::Start { severity, message } => {
                match severity {
                    Severity::Error | Severity::Warning => warn!(%severity, %message, "notice"),
                    Severity::Info | Severity::Success => info!(%severity, %message, "notice"),
                }
                if let Some(notification) = self.desktop_notification(severity, &message) {
                    match notification.show() {
                        Ok(_) => debug!("desktop notification sent"),
                        Err(e) => warn!(error = %e, "failed to send desktop notification"),
                    }
                }
            }
            Notice::Stop => trace!("notice cleared"),
        }
    }

    /// Builds the desktop notification for a notice, if one should be sent.
    pub fn desktop_notification(&self, severity: Severity, message: &str) -> Option<Notification> {
        if !self.desktop || severity != Severity::Error {
            return None;
        }
        let mut notification = Notification::new();
        notification
            .appname(&self.app_name)
            .summary("Calendar error")
            .body(message)
            .timeout(self.timeout);
        Some(notification)
    }
}

/// Waits up to `grace` for a forwarder to deliver what was already published.
///
/// The forwarder ends once every sender of the channel is gone, so callers
/// drop their view first. Delayed `Stop` notices keep a sender alive; when
/// `grace` runs out first the task is left to the runtime and `None` is
/// returned.
pub async fn drain(forwarder: JoinHandle<usize>, grace: Duration) -> Option<usize> {
    match tokio::time::timeout(grace, forwarder).await {
        Ok(Ok(seen)) => Some(seen),
        Ok(Err(e)) => {
            warn!(error = %e, "notice forwarder failed");
            None
        }
        Err(_) => {
            debug!(?grace, "notice forwarder still waiting for delayed notices");
            None
        }
    }
}
