//! Membership backfill for newly authenticated suppliers.
//!
//! Binds membership rows that were created before the supplier had a
//! user id, or synthesizes memberships from pending invites when no
//! membership exists yet. Safe to run on every sign-in and sign-up;
//! repeated calls reach the same fixed point.

use crate::error::ReconcileResult;
use crate::identity::SupplierIdentity;
use link_store::{Invitation, LinkStore, MembershipConflictKey, NewMembership, UpsertOutcome};
use tracing::{debug, info, warn};

/// What a backfill pass did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillOutcome {
    /// Existing unbound membership rows were bound to the user id.
    BoundExisting,
    /// No membership existed; rows were synthesized from pending
    /// invites.
    SynthesizedFromInvites,
    /// No unbound memberships and no pending invites. Not an error.
    NothingToDo,
}

/// Report from one backfill pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BackfillReport {
    pub outcome: BackfillOutcome,
    /// Rows bound or created.
    pub updated: usize,
}

/// Binds or synthesizes membership rows for a supplier.
pub struct MembershipBackfill<'a, S: LinkStore> {
    store: &'a S,
}

impl<'a, S: LinkStore> MembershipBackfill<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Runs one backfill pass for the supplier.
    pub async fn run(&self, identity: &SupplierIdentity) -> ReconcileResult<BackfillReport> {
        let bound = self
            .store
            .bind_memberships(&identity.email, &identity.user_id)
            .await?;
        if bound > 0 {
            info!(email = %identity.email, bound, "bound unbound membership rows");
            return Ok(BackfillReport {
                outcome: BackfillOutcome::BoundExisting,
                updated: bound,
            });
        }

        let invitations = self
            .store
            .pending_invitations_for_email(&identity.email)
            .await?;
        if invitations.is_empty() {
            debug!(email = %identity.email, "membership backfill: nothing to do");
            return Ok(BackfillReport {
                outcome: BackfillOutcome::NothingToDo,
                updated: 0,
            });
        }

        let mut created = 0;
        for invitation in invitations {
            match self.synthesize_one(identity, &invitation).await {
                Ok(true) => created += 1,
                Ok(false) => {}
                Err(err) => {
                    warn!(
                        invitation_id = %invitation.id,
                        event_id = %invitation.event_id,
                        error = %err,
                        "membership synthesis failed, skipping"
                    );
                }
            }
        }

        info!(email = %identity.email, created, "synthesized memberships from pending invites");
        Ok(BackfillReport {
            outcome: BackfillOutcome::SynthesizedFromInvites,
            updated: created,
        })
    }

    /// Materializes one membership from a pending invitation.
    ///
    /// Only invitations whose event id resolves exactly are
    /// materialized here; a dangling reference would persist a
    /// membership pointing at a missing event, so those invitations
    /// are left pending for the invite resolver's repair chain.
    async fn synthesize_one(
        &self,
        identity: &SupplierIdentity,
        invitation: &Invitation,
    ) -> ReconcileResult<bool> {
        if self.store.event_by_id(&invitation.event_id).await?.is_none() {
            debug!(
                invitation_id = %invitation.id,
                event_id = %invitation.event_id,
                "event reference does not resolve exactly, left for the resolver"
            );
            return Ok(false);
        }

        let outcome = self
            .store
            .upsert_membership(
                NewMembership {
                    event_id: invitation.event_id.clone(),
                    supplier_user_id: Some(identity.user_id.clone()),
                    supplier_email: identity.email.clone(),
                },
                MembershipConflictKey::EventAndEmail,
            )
            .await?;
        Ok(outcome == UpsertOutcome::Created)
    }
}
