// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Humanward notification routing.

use crate::engine::LifecycleEngine;
use fleet_core::{Clock, OrchestratorEvent, Priority};

impl<C: Clock> LifecycleEngine<C> {
    /// Deliver an event to every notifier routed for `priority`, falling
    /// back to the default notifier list. Notifier failures are swallowed;
    /// there is no further fallback.
    pub(crate) async fn notify_human(&self, event: &OrchestratorEvent, priority: Priority) {
        tracing::info!(
            priority = %priority,
            event = %event.log_summary(),
            "notifying: {}",
            event.message
        );

        let event = event.clone().with_priority(priority);
        for name in self.config.notifiers_for(priority) {
            let Some(notifier) = self.registry.notifier(name) else {
                tracing::warn!(notifier = %name, "notifier not registered, skipping");
                continue;
            };
            if let Err(e) = notifier.notify(&event).await {
                tracing::warn!(notifier = %name, error = %e, "notifier failed");
            }
        }
    }
}
