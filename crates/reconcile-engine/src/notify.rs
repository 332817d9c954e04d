//! Notification synchronizer: one bell entry per invitation.
//!
//! Invoked on every authenticated page load. Creates the
//! invitation-kind notifications that are missing, or, once counts
//! have converged, resets the most recent read one back to unread so
//! the latest invitation is surfaced on each sign-in. Failures are
//! logged and swallowed; notification sync never blocks sign-in or
//! rendering.

use crate::error::ReconcileResult;
use crate::retry::RetryPolicy;
use link_store::{
    LinkStore, NewNotification, NotificationKind, NotificationStatus,
};
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Body text for a synthesized invitation notification.
const INVITATION_CONTENT: &str = "You have been invited to participate in an event";

/// Keeps invitation notifications 1:1 with invitations.
pub struct NotificationSynchronizer<'a, S: LinkStore> {
    store: &'a S,
    retry: RetryPolicy,
}

impl<'a, S: LinkStore> NotificationSynchronizer<'a, S> {
    pub fn new(store: &'a S, retry: RetryPolicy) -> Self {
        Self { store, retry }
    }

    /// Synchronizes invitation notifications for a supplier email.
    ///
    /// Converges after the first call per session; subsequent calls
    /// are cheap no-ops apart from the unread reset.
    pub async fn sync(&self, email: &str) {
        if let Err(err) = self.try_sync(email).await {
            warn!(email = %email, error = %err, "notification sync failed");
        }
    }

    async fn try_sync(&self, email: &str) -> ReconcileResult<()> {
        let invitations = self
            .retry
            .run(|| self.store.invitations_for_email(email))
            .await?;
        let notifications = self
            .retry
            .run(|| self.store.invitation_notifications_for_email(email))
            .await?;

        if notifications.len() < invitations.len() {
            let covered: HashSet<&str> =
                notifications.iter().map(|n| n.event_id.as_str()).collect();
            // Deduplicate invitations per event so duplicate invite
            // attempts never produce duplicate bell entries.
            let mut handled: HashSet<&str> = HashSet::new();
            let mut created = 0;
            for invitation in invitations
                .iter()
                .filter(|i| !covered.contains(i.event_id.as_str()))
            {
                if !handled.insert(invitation.event_id.as_str()) {
                    continue;
                }
                let result = self
                    .retry
                    .run(|| {
                        self.store.insert_notification(NewNotification {
                            supplier_email: email.to_string(),
                            event_id: invitation.event_id.clone(),
                            admin_user_id: invitation.invited_by_admin_id.clone(),
                            kind: NotificationKind::Invitation,
                            status: NotificationStatus::Unread,
                            content: INVITATION_CONTENT.to_string(),
                        })
                    })
                    .await;
                match result {
                    Ok(()) => created += 1,
                    Err(err) => {
                        warn!(
                            email = %email,
                            event_id = %invitation.event_id,
                            error = %err,
                            "notification insert failed, skipping"
                        );
                    }
                }
            }
            info!(email = %email, created, "created missing invitation notifications");
            return Ok(());
        }

        // Counts converged: surface the latest invitation again by
        // resetting the most recent read notification.
        let stale = notifications
            .iter()
            .filter(|n| n.status == NotificationStatus::Read)
            .max_by_key(|n| n.created_at);
        if let Some(notification) = stale {
            self.retry
                .run(|| {
                    self.store
                        .set_notification_status(&notification.id, NotificationStatus::Unread)
                })
                .await?;
            debug!(email = %email, notification_id = %notification.id, "reset stale notification to unread");
        }

        Ok(())
    }
}
