// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Notifier capability and the built-in adapters.

use crate::PluginError;
use async_trait::async_trait;
use fleet_core::{OrchestratorEvent, Priority};
use std::time::Duration;

#[async_trait]
pub trait NotifierPlugin: Send + Sync {
    async fn notify(&self, event: &OrchestratorEvent) -> Result<(), PluginError>;
}

/// Notifier that drops everything. Default wiring for unrouted priorities.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopNotifier;

#[async_trait]
impl NotifierPlugin for NoopNotifier {
    async fn notify(&self, _event: &OrchestratorEvent) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Desktop bubbles through the OS notification center (notify-rust).
///
/// Urgent bubbles stay on screen until dismissed; everything else expires
/// after [`BUBBLE_TIMEOUT`].
#[derive(Clone, Copy, Debug, Default)]
pub struct DesktopNotifier;

/// How long a non-urgent bubble stays visible.
const BUBBLE_TIMEOUT: Duration = Duration::from_secs(10);

impl DesktopNotifier {
    pub fn new() -> Self {
        // macOS resolves the sending application via an AppleScript lookup
        // on first use, which hangs in a headless daemon without Automation
        // permissions. Naming a bundle id up front skips the lookup.
        #[cfg(target_os = "macos")]
        let _ = mac_notification_sys::set_application("com.apple.Terminal");
        Self
    }
}

/// Title and body for one bubble.
///
/// The title leads with the session (or project) so an operator watching a
/// stack of notifications can tell which agent wants them; the body pairs
/// the wire event name with the human message.
fn render(event: &OrchestratorEvent) -> (String, String) {
    let subject = match (&event.session_id, &event.project_id) {
        (Some(session), _) => session.to_string(),
        (None, Some(project)) => format!("project {}", project),
        (None, None) => "fleet".to_string(),
    };
    let title = match event.priority {
        Priority::Urgent => format!("{} needs attention", subject),
        Priority::Action => format!("{} is ready", subject),
        Priority::Warning => format!("{}: warning", subject),
        Priority::Info => subject,
    };
    let body = format!("{}\n{}", event.event_type, event.message);
    (title, body)
}

#[async_trait]
impl NotifierPlugin for DesktopNotifier {
    async fn notify(&self, event: &OrchestratorEvent) -> Result<(), PluginError> {
        let (title, body) = render(event);
        let sticky = event.priority == Priority::Urgent;

        // show() talks to the notification service synchronously, so it runs
        // on the blocking pool. Failures are reported to the caller, which
        // treats notifier errors as non-fatal.
        let shown = tokio::task::spawn_blocking(move || {
            let mut bubble = notify_rust::Notification::new();
            bubble.summary(&title).body(&body);
            if !sticky {
                bubble.timeout(BUBBLE_TIMEOUT);
            }
            bubble.show().map(|_| ())
        })
        .await;

        match shown {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(PluginError::OperationFailed(format!(
                "desktop notification: {}",
                e
            ))),
            Err(e) => Err(PluginError::OperationFailed(format!(
                "notification task: {}",
                e
            ))),
        }
    }
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
