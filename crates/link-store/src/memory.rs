//! In-memory implementation of [`LinkStore`] for tests.
//!
//! Mirrors the conflict semantics of the real store (declared
//! conflict keys, duplicates reported as `AlreadyExists`, null user
//! ids never conflicting) and publishes a [`ChangeEvent`] to its
//! [`ChangeHub`] after every mutation, so realtime paths can be
//! exercised without a network.

use crate::change::{ChangeEvent, ChangeHub, ChangeKind, Table};
use crate::error::StoreResult;
use crate::store::{LinkStore, UpsertOutcome};
use crate::types::{
    EventRow, Invitation, InvitationStatus, Membership, MembershipConflictKey, NewMembership,
    NewNotification, Notification, NotificationKind, NotificationStatus, Profile,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::{Arc, Mutex};
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    invitations: Vec<Invitation>,
    memberships: Vec<Membership>,
    notifications: Vec<Notification>,
    events: Vec<EventRow>,
    profiles: Vec<Profile>,
}

/// In-memory link store.
///
/// Cloning shares the underlying tables and hub, so a test can keep a
/// handle for assertions while the engine owns another.
#[derive(Clone, Default)]
pub struct MemoryStore {
    tables: Arc<Mutex<Tables>>,
    hub: ChangeHub,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// The change hub mutations publish to.
    pub fn hub(&self) -> &ChangeHub {
        &self.hub
    }

    // --- seeding and assertion helpers ---

    pub fn seed_event(&self, event: EventRow) {
        self.tables
            .lock()
            .expect("lock poisoned")
            .events
            .push(event);
    }

    pub fn seed_profile(&self, profile: Profile) {
        self.tables
            .lock()
            .expect("lock poisoned")
            .profiles
            .push(profile);
    }

    /// Inserts an invitation row and publishes the insert, the way an
    /// admin action would.
    pub fn seed_invitation(&self, invitation: Invitation) {
        let event = insert_event(Table::Invitations, &invitation);
        self.tables
            .lock()
            .expect("lock poisoned")
            .invitations
            .push(invitation);
        self.publish(event);
    }

    pub fn seed_membership(&self, membership: Membership) {
        let event = insert_event(Table::Memberships, &membership);
        self.tables
            .lock()
            .expect("lock poisoned")
            .memberships
            .push(membership);
        self.publish(event);
    }

    /// Deletes a membership row, publishing the delete. Models the
    /// admin-side revoke action this core only observes.
    pub fn delete_membership(&self, membership_id: &str) {
        let removed = {
            let mut tables = self.tables.lock().expect("lock poisoned");
            let index = tables
                .memberships
                .iter()
                .position(|m| m.id == membership_id);
            index.map(|i| tables.memberships.remove(i))
        };
        if let Some(row) = removed {
            self.publish(Some(ChangeEvent {
                kind: ChangeKind::Delete,
                table: Table::Memberships,
                new: None,
                old: serde_json::to_value(&row).ok(),
            }));
        }
    }

    pub fn invitations(&self) -> Vec<Invitation> {
        self.tables.lock().expect("lock poisoned").invitations.clone()
    }

    pub fn memberships(&self) -> Vec<Membership> {
        self.tables.lock().expect("lock poisoned").memberships.clone()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.tables
            .lock()
            .expect("lock poisoned")
            .notifications
            .clone()
    }

    // Events are published after the table lock is released so a
    // callback may re-enter the store.
    fn publish(&self, event: Option<ChangeEvent>) {
        if let Some(event) = event {
            self.hub.publish(&event);
        }
    }
}

fn insert_event(table: Table, row: &impl Serialize) -> Option<ChangeEvent> {
    Some(ChangeEvent {
        kind: ChangeKind::Insert,
        table,
        new: serde_json::to_value(row).ok(),
        old: None,
    })
}

fn update_event(table: Table, old: &impl Serialize, new: &impl Serialize) -> Option<ChangeEvent> {
    Some(ChangeEvent {
        kind: ChangeKind::Update,
        table,
        new: serde_json::to_value(new).ok(),
        old: serde_json::to_value(old).ok(),
    })
}

fn email_matches(stored: &str, queried: &str) -> bool {
    stored.trim().eq_ignore_ascii_case(queried.trim())
}

impl LinkStore for MemoryStore {
    async fn invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>> {
        let tables = self.tables.lock().expect("lock poisoned");
        Ok(tables
            .invitations
            .iter()
            .filter(|i| email_matches(&i.supplier_email, email))
            .cloned()
            .collect())
    }

    async fn pending_invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>> {
        let tables = self.tables.lock().expect("lock poisoned");
        Ok(tables
            .invitations
            .iter()
            .filter(|i| {
                i.status == InvitationStatus::Pending && email_matches(&i.supplier_email, email)
            })
            .cloned()
            .collect())
    }

    async fn mark_invitation_accepted(&self, invitation_id: &str) -> StoreResult<()> {
        let event = {
            let mut tables = self.tables.lock().expect("lock poisoned");
            match tables
                .invitations
                .iter_mut()
                .find(|i| i.id == invitation_id)
            {
                Some(invitation) if invitation.status != InvitationStatus::Accepted => {
                    let old = invitation.clone();
                    invitation.status = InvitationStatus::Accepted;
                    update_event(Table::Invitations, &old, &invitation.clone())
                }
                _ => None,
            }
        };
        self.publish(event);
        Ok(())
    }

    async fn event_by_id(&self, event_id: &str) -> StoreResult<Option<EventRow>> {
        let tables = self.tables.lock().expect("lock poisoned");
        Ok(tables.events.iter().find(|e| e.id == event_id).cloned())
    }

    async fn events_by_ids(&self, ids: &[String]) -> StoreResult<Vec<EventRow>> {
        let tables = self.tables.lock().expect("lock poisoned");
        Ok(tables
            .events
            .iter()
            .filter(|e| ids.contains(&e.id))
            .cloned()
            .collect())
    }

    async fn event_by_id_prefix(&self, prefix: &str) -> StoreResult<Option<EventRow>> {
        let tables = self.tables.lock().expect("lock poisoned");
        let mut hits: Vec<&EventRow> = tables
            .events
            .iter()
            .filter(|e| e.id.starts_with(prefix))
            .collect();
        hits.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(hits.first().map(|e| (*e).clone()))
    }

    async fn most_recent_event(&self) -> StoreResult<Option<EventRow>> {
        let tables = self.tables.lock().expect("lock poisoned");
        Ok(tables
            .events
            .iter()
            .max_by_key(|e| e.created_at)
            .cloned())
    }

    async fn membership_for_user(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<Membership>> {
        let tables = self.tables.lock().expect("lock poisoned");
        Ok(tables
            .memberships
            .iter()
            .find(|m| m.event_id == event_id && m.supplier_user_id.as_deref() == Some(user_id))
            .cloned())
    }

    async fn memberships_by_email(&self, email: &str) -> StoreResult<Vec<Membership>> {
        let tables = self.tables.lock().expect("lock poisoned");
        Ok(tables
            .memberships
            .iter()
            .filter(|m| email_matches(&m.supplier_email, email))
            .cloned()
            .collect())
    }

    async fn memberships_by_user(&self, user_id: &str) -> StoreResult<Vec<Membership>> {
        let tables = self.tables.lock().expect("lock poisoned");
        Ok(tables
            .memberships
            .iter()
            .filter(|m| m.supplier_user_id.as_deref() == Some(user_id))
            .cloned()
            .collect())
    }

    async fn upsert_membership(
        &self,
        row: NewMembership,
        conflict: MembershipConflictKey,
    ) -> StoreResult<UpsertOutcome> {
        let (outcome, event) = {
            let mut tables = self.tables.lock().expect("lock poisoned");
            let exists = tables.memberships.iter().any(|m| match conflict {
                // Null user ids never conflict, matching the store's
                // unique-index semantics.
                MembershipConflictKey::EventAndUser => {
                    row.supplier_user_id.is_some()
                        && m.event_id == row.event_id
                        && m.supplier_user_id == row.supplier_user_id
                }
                MembershipConflictKey::EventAndEmail => {
                    m.event_id == row.event_id
                        && email_matches(&m.supplier_email, &row.supplier_email)
                }
            });
            if exists {
                (UpsertOutcome::AlreadyExists, None)
            } else {
                let membership = Membership {
                    id: Uuid::new_v4().to_string(),
                    event_id: row.event_id,
                    supplier_user_id: row.supplier_user_id,
                    supplier_email: row.supplier_email,
                    created_at: Utc::now(),
                };
                let event = insert_event(Table::Memberships, &membership);
                tables.memberships.push(membership);
                (UpsertOutcome::Created, event)
            }
        };
        self.publish(event);
        Ok(outcome)
    }

    async fn bind_memberships(&self, email: &str, user_id: &str) -> StoreResult<usize> {
        let (count, events) = {
            let mut tables = self.tables.lock().expect("lock poisoned");
            let mut events = Vec::new();
            for membership in tables
                .memberships
                .iter_mut()
                .filter(|m| m.supplier_user_id.is_none() && email_matches(&m.supplier_email, email))
            {
                let old = membership.clone();
                membership.supplier_user_id = Some(user_id.to_string());
                events.push(update_event(Table::Memberships, &old, &membership.clone()));
            }
            (events.len(), events)
        };
        for event in events {
            self.publish(event);
        }
        Ok(count)
    }

    async fn invitation_notifications_for_email(
        &self,
        email: &str,
    ) -> StoreResult<Vec<Notification>> {
        let tables = self.tables.lock().expect("lock poisoned");
        Ok(tables
            .notifications
            .iter()
            .filter(|n| {
                n.kind == NotificationKind::Invitation && email_matches(&n.supplier_email, email)
            })
            .cloned()
            .collect())
    }

    async fn insert_notification(&self, row: NewNotification) -> StoreResult<()> {
        let notification = Notification {
            id: Uuid::new_v4().to_string(),
            supplier_email: row.supplier_email,
            event_id: row.event_id,
            admin_user_id: row.admin_user_id,
            kind: row.kind,
            status: row.status,
            created_at: Utc::now(),
            content: row.content,
        };
        let event = insert_event(Table::Notifications, &notification);
        self.tables
            .lock()
            .expect("lock poisoned")
            .notifications
            .push(notification);
        self.publish(event);
        Ok(())
    }

    async fn set_notification_status(
        &self,
        notification_id: &str,
        status: NotificationStatus,
    ) -> StoreResult<()> {
        let event = {
            let mut tables = self.tables.lock().expect("lock poisoned");
            match tables
                .notifications
                .iter_mut()
                .find(|n| n.id == notification_id)
            {
                Some(notification) if notification.status != status => {
                    let old = notification.clone();
                    notification.status = status;
                    update_event(Table::Notifications, &old, &notification.clone())
                }
                _ => None,
            }
        };
        self.publish(event);
        Ok(())
    }

    async fn profile_display_name(&self, admin_id: &str) -> StoreResult<Option<String>> {
        let tables = self.tables.lock().expect("lock poisoned");
        Ok(tables
            .profiles
            .iter()
            .find(|p| p.id == admin_id)
            .and_then(|p| p.display_name.clone()))
    }
}
