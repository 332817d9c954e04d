//! The `LinkStore` trait: the operations the reconciliation engine
//! needs from the persistent store.
//!
//! The engine is generic over this trait so every test can run
//! against [`crate::MemoryStore`] while production wires in
//! [`crate::SupabaseStore`].

use crate::error::StoreResult;
use crate::types::{
    EventRow, Invitation, Membership, MembershipConflictKey, NewMembership, NewNotification,
    Notification, NotificationStatus,
};

/// Outcome of an idempotent upsert.
///
/// A duplicate-key conflict on an idempotent write means the desired
/// end state already holds, so it is reported here rather than as an
/// error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// A new row was written.
    Created,
    /// A row with the declared conflict key already existed.
    AlreadyExists,
}

/// Query/mutate surface over the supplier-event link tables.
///
/// Email-keyed lookups match case-insensitively; callers still
/// normalize (trim + lowercase) before querying so that written rows
/// converge on one canonical form.
pub trait LinkStore: Send + Sync {
    // --- invitations ---

    /// All invitations for a supplier email, any status.
    async fn invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>>;

    /// Invitations for a supplier email with `status = pending`.
    async fn pending_invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>>;

    /// Transitions an invitation to `accepted`. Idempotent: accepting
    /// an already-accepted invitation is a no-op.
    async fn mark_invitation_accepted(&self, invitation_id: &str) -> StoreResult<()>;

    // --- events ---

    /// Exact event lookup by id.
    async fn event_by_id(&self, event_id: &str) -> StoreResult<Option<EventRow>>;

    /// Batch event lookup; missing ids are simply absent from the
    /// result.
    async fn events_by_ids(&self, ids: &[String]) -> StoreResult<Vec<EventRow>>;

    /// First event whose id starts with `prefix`, if any.
    async fn event_by_id_prefix(&self, prefix: &str) -> StoreResult<Option<EventRow>>;

    /// The most recently created event in the system, if any.
    async fn most_recent_event(&self) -> StoreResult<Option<EventRow>>;

    // --- memberships ---

    /// Membership keyed by `(event_id, supplier_user_id)`.
    async fn membership_for_user(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<Membership>>;

    /// Memberships for a supplier email (bound or not).
    async fn memberships_by_email(&self, email: &str) -> StoreResult<Vec<Membership>>;

    /// Memberships bound to a supplier user id.
    async fn memberships_by_user(&self, user_id: &str) -> StoreResult<Vec<Membership>>;

    /// Upserts a membership with the declared conflict key, ignoring
    /// duplicates.
    async fn upsert_membership(
        &self,
        row: NewMembership,
        conflict: MembershipConflictKey,
    ) -> StoreResult<UpsertOutcome>;

    /// Bulk-binds unbound memberships (`supplier_user_id is null`)
    /// for an email to the given user id. Returns the number of rows
    /// updated.
    async fn bind_memberships(&self, email: &str, user_id: &str) -> StoreResult<usize>;

    // --- notifications ---

    /// Invitation-kind notifications for a supplier email.
    async fn invitation_notifications_for_email(
        &self,
        email: &str,
    ) -> StoreResult<Vec<Notification>>;

    /// Inserts a notification row.
    async fn insert_notification(&self, row: NewNotification) -> StoreResult<()>;

    /// Flips a notification's read status.
    async fn set_notification_status(
        &self,
        notification_id: &str,
        status: NotificationStatus,
    ) -> StoreResult<()>;

    // --- profiles ---

    /// Display name for an admin profile, if the profile exists and
    /// has one.
    async fn profile_display_name(&self, admin_id: &str) -> StoreResult<Option<String>>;
}
