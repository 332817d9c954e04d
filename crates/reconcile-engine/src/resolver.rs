//! Invite resolver: turns pending invitations into memberships.
//!
//! For each pending invitation the resolver repairs the event
//! reference if needed (exact id, then id-prefix, then the configured
//! fallback), upserts the membership idempotently, and drives the
//! invitation to accepted whether the membership was freshly created
//! or already in place. A single invitation's failure is logged and
//! skipped; it never aborts the rest of the batch.

use crate::error::ReconcileResult;
use crate::identity::SupplierIdentity;
use crate::retry::RetryPolicy;
use link_store::{
    EventRow, Invitation, LinkStore, MembershipConflictKey, NewMembership, UpsertOutcome,
};
use tracing::{debug, info, warn};

/// What to do when an invitation's event cannot be resolved at all.
///
/// The legacy behavior attached the supplier to the most recently
/// created event in the system rather than dead-ending the link; that
/// heuristic can bind a supplier to an unrelated event, so it is an
/// explicit, named policy here rather than an implicit fallback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EventFallbackPolicy {
    /// Leave the invitation unlinked and report it as skipped.
    #[default]
    SkipUnresolved,
    /// Attach to the most recently created event as a last resort.
    UseMostRecentEvent,
}

/// Outcome of one resolver pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolveReport {
    /// Invitations examined (not necessarily mutated).
    pub processed: usize,
}

/// Resolves pending invitations for one supplier.
pub struct InviteResolver<'a, S: LinkStore> {
    store: &'a S,
    policy: EventFallbackPolicy,
    retry: RetryPolicy,
}

impl<'a, S: LinkStore> InviteResolver<'a, S> {
    pub fn new(store: &'a S, policy: EventFallbackPolicy, retry: RetryPolicy) -> Self {
        Self {
            store,
            policy,
            retry,
        }
    }

    /// Resolves every pending invitation for the supplier.
    ///
    /// Idempotent: a second pass over the same state examines the
    /// same invitations and changes nothing.
    pub async fn resolve(&self, identity: &SupplierIdentity) -> ReconcileResult<ResolveReport> {
        let invitations = self
            .retry
            .run(|| self.store.pending_invitations_for_email(&identity.email))
            .await?;

        let processed = invitations.len();
        for invitation in invitations {
            if let Err(err) = self.resolve_one(identity, &invitation).await {
                warn!(
                    invitation_id = %invitation.id,
                    event_id = %invitation.event_id,
                    error = %err,
                    "invitation resolution failed, skipping"
                );
            }
        }

        debug!(email = %identity.email, processed, "invite resolution pass complete");
        Ok(ResolveReport { processed })
    }

    async fn resolve_one(
        &self,
        identity: &SupplierIdentity,
        invitation: &Invitation,
    ) -> ReconcileResult<()> {
        let Some(event) = self.resolve_event(&invitation.event_id).await? else {
            info!(
                invitation_id = %invitation.id,
                event_id = %invitation.event_id,
                "invitation event unresolved, left unlinked"
            );
            return Ok(());
        };

        // The membership may already exist, created by an earlier
        // pass or by the backfill. The invitation in hand is still
        // pending, so the accept transition must happen either way;
        // marking accepted is idempotent and never regresses.
        if self
            .retry
            .run(|| self.store.membership_for_user(&event.id, &identity.user_id))
            .await?
            .is_some()
        {
            debug!(invitation_id = %invitation.id, event_id = %event.id, "membership already present");
            self.retry
                .run(|| self.store.mark_invitation_accepted(&invitation.id))
                .await?;
            return Ok(());
        }

        let outcome = self
            .retry
            .run(|| {
                self.store.upsert_membership(
                    NewMembership {
                        event_id: event.id.clone(),
                        supplier_user_id: Some(identity.user_id.clone()),
                        supplier_email: identity.email.clone(),
                    },
                    MembershipConflictKey::EventAndUser,
                )
            })
            .await?;

        // A lost upsert race still means the membership exists, so
        // the accept transition happens for either outcome.
        self.retry
            .run(|| self.store.mark_invitation_accepted(&invitation.id))
            .await?;
        let created = outcome == UpsertOutcome::Created;
        info!(
            invitation_id = %invitation.id,
            event_id = %event.id,
            created,
            "invitation accepted"
        );

        Ok(())
    }

    /// Event resolution chain: exact id, then prefix on the leading
    /// id segment, then the configured fallback.
    async fn resolve_event(&self, event_id: &str) -> ReconcileResult<Option<EventRow>> {
        if let Some(event) = self.retry.run(|| self.store.event_by_id(event_id)).await? {
            return Ok(Some(event));
        }

        if let Some((head, _)) = event_id.split_once('-') {
            if let Some(event) = self.retry.run(|| self.store.event_by_id_prefix(head)).await? {
                debug!(requested = event_id, resolved = %event.id, "event resolved by id prefix");
                return Ok(Some(event));
            }
        }

        match self.policy {
            EventFallbackPolicy::SkipUnresolved => Ok(None),
            EventFallbackPolicy::UseMostRecentEvent => {
                let event = self.retry.run(|| self.store.most_recent_event()).await?;
                if let Some(event) = &event {
                    warn!(requested = event_id, resolved = %event.id, "event resolved by most-recent fallback");
                }
                Ok(event)
            }
        }
    }
}
