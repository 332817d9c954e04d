//! Row types for the supplier-event link tables.
//!
//! Field names serialize to the snake_case column names used by the
//! store schema. Timestamps are `DateTime<Utc>` and travel as
//! ISO-8601 strings on the wire.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Lifecycle state of an invitation.
///
/// An invitation transitions `pending -> accepted` exactly once; the
/// transition is idempotent if replayed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InvitationStatus {
    Pending,
    Accepted,
}

/// Record of an admin inviting a supplier to an event.
///
/// Created by an admin action; mutated only by the invite resolver
/// (pending -> accepted) or an explicit accept action. Never deleted
/// by this core.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    pub event_id: String,
    pub supplier_email: String,
    pub invited_by_admin_id: Option<String>,
    pub status: InvitationStatus,
    pub created_at: DateTime<Utc>,
}

/// Record that a supplier is attached to an event.
///
/// `supplier_user_id` stays null until the supplier authenticates;
/// the membership backfill binds it exactly once.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Membership {
    pub id: String,
    pub event_id: String,
    pub supplier_user_id: Option<String>,
    pub supplier_email: String,
    pub created_at: DateTime<Utc>,
}

/// Insert payload for a membership row.
#[derive(Debug, Clone, Serialize)]
pub struct NewMembership {
    pub event_id: String,
    pub supplier_user_id: Option<String>,
    pub supplier_email: String,
}

/// Uniqueness key declared on a membership upsert.
///
/// Memberships are unique per `(event_id, supplier_user_id)` once
/// bound and per `(event_id, supplier_email)` before binding; the
/// writing code path declares which key it is converging on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MembershipConflictKey {
    EventAndUser,
    EventAndEmail,
}

impl MembershipConflictKey {
    /// The PostgREST `on_conflict` column list for this key.
    pub fn on_conflict(self) -> &'static str {
        match self {
            Self::EventAndUser => "event_id,supplier_user_id",
            Self::EventAndEmail => "event_id,supplier_email",
        }
    }
}

/// Category of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    Invitation,
    Application,
    ApplicationAccepted,
    Message,
    Test,
}

/// Read state of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Unread,
    Read,
}

/// A notification surfaced to a supplier.
///
/// Invitation-kind notifications are kept 1:1 with invitations per
/// `(event_id, supplier_email)` by the notification synchronizer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: String,
    pub supplier_email: String,
    pub event_id: String,
    pub admin_user_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
    pub content: String,
}

/// Insert payload for a notification row.
#[derive(Debug, Clone, Serialize)]
pub struct NewNotification {
    pub supplier_email: String,
    pub event_id: String,
    pub admin_user_id: Option<String>,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub status: NotificationStatus,
    pub content: String,
}

/// Canonical event record, owned by the admin side.
///
/// This core only reads events; when the canonical record is missing
/// the view composer synthesizes a placeholder instead.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventRow {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub admin_id: Option<String>,
    pub budget: Option<f64>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub sub_type: Option<String>,
    pub status: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
}

/// Minimal profile row, consulted only to resolve an admin display
/// name for placeholder events.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: String,
    pub display_name: Option<String>,
}
