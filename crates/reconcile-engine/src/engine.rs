//! Sign-in orchestration: backfill, resolve, notify, compose.
//!
//! Each step degrades independently; a failed step is logged and the
//! pipeline continues with what it has. Callers never see an error
//! from a sign-in pass, only a report of what converged.

use crate::backfill::{BackfillReport, MembershipBackfill};
use crate::identity::SupplierIdentity;
use crate::notify::NotificationSynchronizer;
use crate::resolver::{EventFallbackPolicy, InviteResolver, ResolveReport};
use crate::retry::RetryPolicy;
use crate::view::{EventView, EventViewComposer};
use link_store::LinkStore;
use tracing::warn;

/// Engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    /// Policy for invitations whose event cannot be resolved.
    pub fallback_policy: EventFallbackPolicy,
    /// Retry policy for store calls in the resolver and notification
    /// synchronizer.
    pub retry: RetryPolicy,
}

/// What one sign-in pass accomplished.
///
/// A `None` report means that step failed and was skipped; the other
/// steps still ran.
#[derive(Debug, Clone)]
pub struct SignInReport {
    pub backfill: Option<BackfillReport>,
    pub resolve: Option<ResolveReport>,
    /// The composed event list; empty when composition failed.
    pub events: Vec<EventView>,
}

/// The reconciliation engine for one store.
pub struct ReconcileEngine<S: LinkStore> {
    store: S,
    config: EngineConfig,
}

impl<S: LinkStore> ReconcileEngine<S> {
    pub fn new(store: S, config: EngineConfig) -> Self {
        Self { store, config }
    }

    /// The underlying store, for callers that wire realtime
    /// subscriptions or need direct reads.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Runs the full reconciliation pass for an authenticated
    /// supplier: backfill memberships, resolve pending invites, sync
    /// notifications, compose the event view.
    ///
    /// Safe to call on every sign-in, sign-up, and page mount;
    /// repeated calls converge without side effects.
    pub async fn on_supplier_sign_in(&self, identity: &SupplierIdentity) -> SignInReport {
        let backfill = match MembershipBackfill::new(&self.store).run(identity).await {
            Ok(report) => Some(report),
            Err(err) => {
                warn!(email = %identity.email, error = %err, "membership backfill failed");
                None
            }
        };

        let resolver = InviteResolver::new(
            &self.store,
            self.config.fallback_policy,
            self.config.retry.clone(),
        );
        let resolve = match resolver.resolve(identity).await {
            Ok(report) => Some(report),
            Err(err) => {
                warn!(email = %identity.email, error = %err, "invite resolution failed");
                None
            }
        };

        self.sync_notifications(&identity.email).await;
        let events = self.compose_view(identity).await;

        SignInReport {
            backfill,
            resolve,
            events,
        }
    }

    /// Re-composes the supplier's event list, degrading to empty on
    /// failure. Invoked on page mount and by realtime re-triggers.
    pub async fn compose_view(&self, identity: &SupplierIdentity) -> Vec<EventView> {
        match EventViewComposer::new(&self.store).compose(identity).await {
            Ok(views) => views,
            Err(err) => {
                warn!(email = %identity.email, error = %err, "event view composition failed");
                Vec::new()
            }
        }
    }

    /// Re-runs the notification synchronizer. Failures are swallowed
    /// inside the synchronizer.
    pub async fn sync_notifications(&self, email: &str) {
        NotificationSynchronizer::new(&self.store, self.config.retry.clone())
            .sync(email)
            .await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backfill::BackfillOutcome;
    use chrono::Utc;
    use link_store::{EventRow, Invitation, InvitationStatus, MemoryStore};

    fn seeded_store() -> MemoryStore {
        let store = MemoryStore::new();
        store.seed_event(EventRow {
            id: "evt-1".to_string(),
            name: "Spring Fair".to_string(),
            description: None,
            start_date: Some(Utc::now()),
            end_date: None,
            location: None,
            admin_id: Some("admin-1".to_string()),
            budget: None,
            event_type: None,
            sub_type: None,
            status: None,
            created_at: Some(Utc::now()),
        });
        store.seed_invitation(Invitation {
            id: "inv-1".to_string(),
            event_id: "evt-1".to_string(),
            supplier_email: "s@x.com".to_string(),
            invited_by_admin_id: Some("admin-1".to_string()),
            status: InvitationStatus::Pending,
            created_at: Utc::now(),
        });
        store
    }

    #[tokio::test]
    async fn sign_in_converges_all_three_records() {
        let store = seeded_store();
        let engine = ReconcileEngine::new(store.clone(), EngineConfig::default());

        let identity = SupplierIdentity::new("user-1", "s@x.com");
        let report = engine.on_supplier_sign_in(&identity).await;

        assert_eq!(
            report.backfill.unwrap().outcome,
            BackfillOutcome::SynthesizedFromInvites
        );
        assert_eq!(report.resolve.unwrap().processed, 1);
        assert_eq!(report.events.len(), 1);
        assert_eq!(report.events[0].id, "evt-1");

        assert_eq!(store.invitations()[0].status, InvitationStatus::Accepted);
        assert_eq!(store.memberships().len(), 1);
        assert_eq!(store.notifications().len(), 1);
    }

    #[tokio::test]
    async fn one_pass_accepts_every_invitation_backfill_materialized() {
        let store = MemoryStore::new();
        for n in 1..=3 {
            store.seed_event(EventRow {
                id: format!("evt-{n}"),
                name: format!("Event {n}"),
                description: None,
                start_date: None,
                end_date: None,
                location: None,
                admin_id: None,
                budget: None,
                event_type: None,
                sub_type: None,
                status: None,
                created_at: Some(Utc::now()),
            });
            store.seed_invitation(Invitation {
                id: format!("inv-{n}"),
                event_id: format!("evt-{n}"),
                supplier_email: "s@x.com".to_string(),
                invited_by_admin_id: None,
                status: InvitationStatus::Pending,
                created_at: Utc::now(),
            });
        }

        let engine = ReconcileEngine::new(store.clone(), EngineConfig::default());
        engine
            .on_supplier_sign_in(&SupplierIdentity::new("user-1", "s@x.com"))
            .await;

        // The backfill creates the bound memberships first; the
        // resolver must still drive every invitation to accepted in
        // the same pass.
        assert_eq!(store.memberships().len(), 3);
        assert!(store
            .invitations()
            .iter()
            .all(|i| i.status == InvitationStatus::Accepted));
    }

    #[tokio::test]
    async fn sign_in_is_idempotent() {
        let store = seeded_store();
        let engine = ReconcileEngine::new(store.clone(), EngineConfig::default());
        let identity = SupplierIdentity::new("user-1", "s@x.com");

        engine.on_supplier_sign_in(&identity).await;
        let second = engine.on_supplier_sign_in(&identity).await;

        assert_eq!(store.memberships().len(), 1);
        assert_eq!(store.notifications().len(), 1);
        assert_eq!(second.events.len(), 1);
    }

    #[tokio::test]
    async fn sign_in_with_empty_store_reports_nothing_to_do() {
        let engine = ReconcileEngine::new(MemoryStore::new(), EngineConfig::default());
        let identity = SupplierIdentity::new("user-1", "s@x.com");

        let report = engine.on_supplier_sign_in(&identity).await;

        assert_eq!(report.backfill.unwrap().outcome, BackfillOutcome::NothingToDo);
        assert_eq!(report.resolve.unwrap().processed, 0);
        assert!(report.events.is_empty());
    }
}
