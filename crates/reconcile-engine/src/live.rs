//! Live patching of a composed event view list.
//!
//! Realtime change payloads are applied to the in-memory list by id,
//! without a re-fetch. Entries never silently disappear: a membership
//! delete flips the entry back to a revoked placeholder instead of
//! removing it.

use crate::view::{EventView, DEFAULT_ORGANIZER_NAME};
use link_store::{ChangeEvent, ChangeKind, Invitation, InvitationStatus, Membership, Table};
use serde::de::DeserializeOwned;
use tracing::debug;

/// What applying one change did to the feed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FeedUpdate {
    /// A new placeholder entry was appended. The caller should re-run
    /// the notification synchronizer for this supplier.
    Appended,
    /// An existing entry's status fields were patched in place.
    Patched,
    /// An existing entry was flipped to a revoked placeholder.
    Revoked,
    /// The change did not affect the feed.
    Ignored,
}

/// A composed event list kept current by realtime changes.
pub struct LiveEventFeed {
    views: Vec<EventView>,
}

impl LiveEventFeed {
    /// Wraps a freshly composed view list.
    pub fn new(views: Vec<EventView>) -> Self {
        Self { views }
    }

    pub fn views(&self) -> &[EventView] {
        &self.views
    }

    pub fn into_views(self) -> Vec<EventView> {
        self.views
    }

    /// Applies one change payload to the feed.
    ///
    /// Patches never change the list length or the order of other
    /// entries; only an invitation insert appends.
    pub fn apply(&mut self, change: &ChangeEvent) -> FeedUpdate {
        match (change.table, change.kind) {
            (Table::Invitations, ChangeKind::Insert) => self.apply_invitation_insert(change),
            (Table::Invitations, ChangeKind::Update) => self.apply_invitation_update(change),
            (Table::Memberships, ChangeKind::Insert | ChangeKind::Update) => {
                self.apply_membership_upsert(change)
            }
            (Table::Memberships, ChangeKind::Delete) => self.apply_membership_delete(change),
            _ => FeedUpdate::Ignored,
        }
    }

    fn apply_invitation_insert(&mut self, change: &ChangeEvent) -> FeedUpdate {
        let Some(invitation) = parse_row::<Invitation>(change.new.as_ref()) else {
            return FeedUpdate::Ignored;
        };
        if self.views.iter().any(|v| v.id == invitation.event_id) {
            return FeedUpdate::Ignored;
        }
        self.views.push(EventView::placeholder_for_invitation(
            &invitation,
            DEFAULT_ORGANIZER_NAME.to_string(),
        ));
        debug!(event_id = %invitation.event_id, "appended placeholder for live invitation");
        FeedUpdate::Appended
    }

    fn apply_invitation_update(&mut self, change: &ChangeEvent) -> FeedUpdate {
        let Some(invitation) = parse_row::<Invitation>(change.new.as_ref()) else {
            return FeedUpdate::Ignored;
        };
        let Some(view) = self.views.iter_mut().find(|v| v.id == invitation.event_id) else {
            return FeedUpdate::Ignored;
        };
        view.status = match invitation.status {
            InvitationStatus::Pending => "pending".to_string(),
            InvitationStatus::Accepted => "accepted".to_string(),
        };
        FeedUpdate::Patched
    }

    fn apply_membership_upsert(&mut self, change: &ChangeEvent) -> FeedUpdate {
        let Some(membership) = parse_row::<Membership>(change.new.as_ref()) else {
            return FeedUpdate::Ignored;
        };
        let Some(view) = self.views.iter_mut().find(|v| v.id == membership.event_id) else {
            return FeedUpdate::Ignored;
        };
        view.is_placeholder = false;
        view.status = "accepted".to_string();
        FeedUpdate::Patched
    }

    fn apply_membership_delete(&mut self, change: &ChangeEvent) -> FeedUpdate {
        // Deletes carry the row in the old payload.
        let Some(membership) = parse_row::<Membership>(change.old.as_ref()) else {
            return FeedUpdate::Ignored;
        };
        let Some(view) = self.views.iter_mut().find(|v| v.id == membership.event_id) else {
            return FeedUpdate::Ignored;
        };
        view.is_placeholder = true;
        view.status = "revoked".to_string();
        FeedUpdate::Revoked
    }
}

fn parse_row<T: DeserializeOwned>(payload: Option<&serde_json::Value>) -> Option<T> {
    let value = payload?;
    match serde_json::from_value(value.clone()) {
        Ok(row) => Some(row),
        Err(err) => {
            debug!(error = %err, "live change payload did not match row shape");
            None
        }
    }
}
