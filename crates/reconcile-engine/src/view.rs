//! Event view composer: one normalized, deduplicated, sorted list.
//!
//! Candidate event ids are collected from invitations and from
//! memberships (by email and by user id), canonical event rows are
//! batch-fetched, and every id without a canonical row gets a
//! synthesized placeholder so an invitation never disappears from the
//! display just because the event record is missing. The presentation
//! layer consumes [`EventView`] without branching on source table.

use crate::error::ReconcileResult;
use crate::identity::SupplierIdentity;
use chrono::{DateTime, Utc};
use link_store::{EventRow, Invitation, InvitationStatus, LinkStore, Membership};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Organizer name used when the admin profile cannot be resolved.
pub const DEFAULT_ORGANIZER_NAME: &str = "Event Organizer";

/// Display name for a placeholder event.
const PLACEHOLDER_EVENT_NAME: &str = "Upcoming event";

/// A displayable event, canonical or synthesized.
///
/// `status` is the supplier's link status for the event (`pending`,
/// `accepted`, or `revoked` after a realtime membership delete);
/// `event_status` carries the canonical event's own lifecycle field
/// when the row exists.
#[derive(Debug, Clone, Serialize)]
pub struct EventView {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub start_date: Option<DateTime<Utc>>,
    pub end_date: Option<DateTime<Utc>>,
    pub location: Option<String>,
    pub admin_id: Option<String>,
    pub budget: Option<f64>,
    pub event_type: Option<String>,
    pub sub_type: Option<String>,
    pub event_status: Option<String>,
    pub status: String,
    pub is_placeholder: bool,
    pub organizer_name: String,
    pub created_at: Option<DateTime<Utc>>,
}

impl EventView {
    fn from_event(event: &EventRow, status: String, organizer_name: String) -> Self {
        Self {
            id: event.id.clone(),
            name: event.name.clone(),
            description: event.description.clone(),
            start_date: event.start_date,
            end_date: event.end_date,
            location: event.location.clone(),
            admin_id: event.admin_id.clone(),
            budget: event.budget,
            event_type: event.event_type.clone(),
            sub_type: event.sub_type.clone(),
            event_status: event.status.clone(),
            status,
            is_placeholder: false,
            organizer_name,
            created_at: event.created_at,
        }
    }

    /// Synthesizes a placeholder view from an invitation, used both
    /// by the composer and by live inserts arriving over realtime.
    pub fn placeholder_for_invitation(invitation: &Invitation, organizer_name: String) -> Self {
        Self {
            id: invitation.event_id.clone(),
            name: PLACEHOLDER_EVENT_NAME.to_string(),
            description: None,
            start_date: None,
            end_date: None,
            location: None,
            admin_id: invitation.invited_by_admin_id.clone(),
            budget: None,
            event_type: None,
            sub_type: None,
            event_status: None,
            status: link_status_for_invitation(invitation.status),
            is_placeholder: true,
            organizer_name,
            created_at: Some(invitation.created_at),
        }
    }

    fn placeholder_for_membership(membership: &Membership, organizer_name: String) -> Self {
        Self {
            id: membership.event_id.clone(),
            name: PLACEHOLDER_EVENT_NAME.to_string(),
            description: None,
            start_date: None,
            end_date: None,
            location: None,
            admin_id: None,
            budget: None,
            event_type: None,
            sub_type: None,
            event_status: None,
            status: "accepted".to_string(),
            is_placeholder: true,
            organizer_name,
            created_at: Some(membership.created_at),
        }
    }

    fn sort_key(&self) -> Option<DateTime<Utc>> {
        self.start_date.or(self.created_at)
    }
}

fn link_status_for_invitation(status: InvitationStatus) -> String {
    match status {
        InvitationStatus::Pending => "pending".to_string(),
        InvitationStatus::Accepted => "accepted".to_string(),
    }
}

/// Sorts views descending by start date, falling back to creation
/// date; dateless entries sink to the end. The sort is stable, so
/// ties keep their fetch order.
pub(crate) fn sort_views(views: &mut [EventView]) {
    views.sort_by(|a, b| match (a.sort_key(), b.sort_key()) {
        (Some(left), Some(right)) => right.cmp(&left),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    });
}

/// Composes the supplier's event list from all three sources.
pub struct EventViewComposer<'a, S: LinkStore> {
    store: &'a S,
}

impl<'a, S: LinkStore> EventViewComposer<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Builds the deduplicated, sorted event list for a supplier.
    ///
    /// Deterministic: given the same underlying rows the output order
    /// and placeholder content are reproducible.
    pub async fn compose(&self, identity: &SupplierIdentity) -> ReconcileResult<Vec<EventView>> {
        let invitations = self.store.invitations_for_email(&identity.email).await?;
        let by_email = self.store.memberships_by_email(&identity.email).await?;
        let by_user = self.store.memberships_by_user(&identity.user_id).await?;

        // Union in first-seen order so ties sort reproducibly.
        let mut ids: Vec<String> = Vec::new();
        let mut seen: HashSet<&str> = HashSet::new();
        for id in invitations
            .iter()
            .map(|i| i.event_id.as_str())
            .chain(by_email.iter().map(|m| m.event_id.as_str()))
            .chain(by_user.iter().map(|m| m.event_id.as_str()))
        {
            if seen.insert(id) {
                ids.push(id.to_string());
            }
        }

        let events = self.store.events_by_ids(&ids).await?;
        let events_by_id: HashMap<&str, &EventRow> =
            events.iter().map(|e| (e.id.as_str(), e)).collect();

        let mut invitation_by_event: HashMap<&str, &Invitation> = HashMap::new();
        for invitation in &invitations {
            invitation_by_event
                .entry(invitation.event_id.as_str())
                .or_insert(invitation);
        }
        let membership_events: HashSet<&str> = by_email
            .iter()
            .chain(by_user.iter())
            .map(|m| m.event_id.as_str())
            .collect();
        let membership_by_event: HashMap<&str, &Membership> = by_email
            .iter()
            .chain(by_user.iter())
            .map(|m| (m.event_id.as_str(), m))
            .collect();

        let mut organizer_cache: HashMap<String, String> = HashMap::new();
        let mut views = Vec::with_capacity(ids.len());
        for id in &ids {
            let invitation = invitation_by_event.get(id.as_str()).copied();
            let status = if membership_events.contains(id.as_str()) {
                "accepted".to_string()
            } else if let Some(invitation) = invitation {
                link_status_for_invitation(invitation.status)
            } else {
                "pending".to_string()
            };

            let view = if let Some(event) = events_by_id.get(id.as_str()) {
                let organizer = self
                    .organizer_name(event.admin_id.as_deref(), &mut organizer_cache)
                    .await;
                EventView::from_event(event, status, organizer)
            } else if let Some(invitation) = invitation {
                let organizer = self
                    .organizer_name(invitation.invited_by_admin_id.as_deref(), &mut organizer_cache)
                    .await;
                let mut view = EventView::placeholder_for_invitation(invitation, organizer);
                view.status = status;
                view
            } else if let Some(membership) = membership_by_event.get(id.as_str()) {
                EventView::placeholder_for_membership(
                    membership,
                    DEFAULT_ORGANIZER_NAME.to_string(),
                )
            } else {
                continue;
            };
            views.push(view);
        }

        sort_views(&mut views);
        debug!(email = %identity.email, count = views.len(), "composed supplier event views");
        Ok(views)
    }

    /// Best-effort admin display name; any failure falls back to the
    /// default.
    async fn organizer_name(
        &self,
        admin_id: Option<&str>,
        cache: &mut HashMap<String, String>,
    ) -> String {
        let Some(admin_id) = admin_id else {
            return DEFAULT_ORGANIZER_NAME.to_string();
        };
        if let Some(name) = cache.get(admin_id) {
            return name.clone();
        }
        let name = match self.store.profile_display_name(admin_id).await {
            Ok(Some(name)) => name,
            Ok(None) => DEFAULT_ORGANIZER_NAME.to_string(),
            Err(err) => {
                debug!(admin_id, error = %err, "profile lookup failed, using default organizer name");
                DEFAULT_ORGANIZER_NAME.to_string()
            }
        };
        cache.insert(admin_id.to_string(), name.clone());
        name
    }
}
