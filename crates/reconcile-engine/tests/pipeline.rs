//! End-to-end reconciliation passes against the in-memory store.

use chrono::{Duration, TimeZone, Utc};
use link_store::{
    ChangeFilter, EventRow, Invitation, InvitationStatus, MemoryStore, Membership,
    NotificationStatus, Profile, Table,
};
use reconcile_engine::{
    EngineConfig, EventFallbackPolicy, FeedUpdate, LiveEventFeed, ReconcileEngine,
    SupplierIdentity,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};

const EMAIL: &str = "supplier@venue.test";
const USER: &str = "user-1";

fn event(id: &str, name: &str, start_offset_days: i64) -> EventRow {
    let base = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();
    EventRow {
        id: id.to_string(),
        name: name.to_string(),
        description: None,
        start_date: Some(base + Duration::days(start_offset_days)),
        end_date: None,
        location: None,
        admin_id: Some("admin-1".to_string()),
        budget: None,
        event_type: None,
        sub_type: None,
        status: None,
        created_at: Some(base),
    }
}

fn invitation(id: &str, event_id: &str) -> Invitation {
    Invitation {
        id: id.to_string(),
        event_id: event_id.to_string(),
        supplier_email: EMAIL.to_string(),
        invited_by_admin_id: Some("admin-1".to_string()),
        status: InvitationStatus::Pending,
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn sign_in_resolves_known_events_and_skips_unresolved_ones() {
    let store = MemoryStore::new();
    store.seed_event(event("evt-1", "Garden Wedding", 0));
    store.seed_invitation(invitation("inv-1", "evt-1"));
    // No event with this id or id prefix exists anywhere.
    store.seed_invitation(invitation("inv-2", "ghost-42"));

    let engine = ReconcileEngine::new(store.clone(), EngineConfig::default());
    let report = engine
        .on_supplier_sign_in(&SupplierIdentity::new(USER, EMAIL))
        .await;

    assert_eq!(report.resolve.unwrap().processed, 2);

    let invitations = store.invitations();
    let inv1 = invitations.iter().find(|i| i.id == "inv-1").unwrap();
    assert_eq!(inv1.status, InvitationStatus::Accepted);
    let inv2 = invitations.iter().find(|i| i.id == "inv-2").unwrap();
    assert_eq!(inv2.status, InvitationStatus::Pending);

    let memberships = store.memberships();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].event_id, "evt-1");
    assert_eq!(memberships[0].supplier_user_id.as_deref(), Some(USER));

    // The unresolved invitation still surfaces as a placeholder.
    let ghost = report.events.iter().find(|v| v.id == "ghost-42").unwrap();
    assert!(ghost.is_placeholder);
    assert_eq!(ghost.status, "pending");
    let known = report.events.iter().find(|v| v.id == "evt-1").unwrap();
    assert!(!known.is_placeholder);
    assert_eq!(known.status, "accepted");
}

#[tokio::test]
async fn repeated_sign_ins_change_nothing() {
    let store = MemoryStore::new();
    store.seed_event(event("evt-1", "Garden Wedding", 0));
    store.seed_invitation(invitation("inv-1", "evt-1"));

    let engine = ReconcileEngine::new(store.clone(), EngineConfig::default());
    let identity = SupplierIdentity::new(USER, EMAIL);

    engine.on_supplier_sign_in(&identity).await;
    let memberships_after_first = store.memberships();
    let notifications_after_first = store.notifications();

    engine.on_supplier_sign_in(&identity).await;
    engine.on_supplier_sign_in(&identity).await;

    assert_eq!(store.memberships().len(), memberships_after_first.len());
    assert_eq!(
        store.notifications().len(),
        notifications_after_first.len()
    );
    assert_eq!(
        store.memberships()[0].id,
        memberships_after_first[0].id
    );
}

#[tokio::test]
async fn many_pending_invites_converge_to_bound_memberships() {
    let store = MemoryStore::new();
    for n in 1..=5 {
        store.seed_event(event(&format!("evt-{n}"), "Fair", n));
        store.seed_invitation(invitation(&format!("inv-{n}"), &format!("evt-{n}")));
    }

    let engine = ReconcileEngine::new(store.clone(), EngineConfig::default());
    engine
        .on_supplier_sign_in(&SupplierIdentity::new(USER, EMAIL))
        .await;

    let memberships = store.memberships();
    assert_eq!(memberships.len(), 5);
    assert!(memberships
        .iter()
        .all(|m| m.supplier_user_id.as_deref() == Some(USER)));
    assert!(store
        .invitations()
        .iter()
        .all(|i| i.status == InvitationStatus::Accepted));
}

#[tokio::test]
async fn sign_in_binds_preexisting_unbound_memberships() {
    let store = MemoryStore::new();
    store.seed_event(event("evt-1", "Garden Wedding", 0));
    store.seed_membership(Membership {
        id: "m-1".to_string(),
        event_id: "evt-1".to_string(),
        supplier_user_id: None,
        supplier_email: EMAIL.to_string(),
        created_at: Utc::now(),
    });

    let engine = ReconcileEngine::new(store.clone(), EngineConfig::default());
    engine
        .on_supplier_sign_in(&SupplierIdentity::new(USER, EMAIL))
        .await;

    let memberships = store.memberships();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].supplier_user_id.as_deref(), Some(USER));
}

#[tokio::test]
async fn truncated_event_id_resolves_by_prefix() {
    let store = MemoryStore::new();
    store.seed_event(event("abc-999", "Spring Fair", 0));
    store.seed_invitation(invitation("inv-1", "abc-123"));

    let engine = ReconcileEngine::new(store.clone(), EngineConfig::default());
    engine
        .on_supplier_sign_in(&SupplierIdentity::new(USER, EMAIL))
        .await;

    let memberships = store.memberships();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].event_id, "abc-999");
    assert_eq!(store.invitations()[0].status, InvitationStatus::Accepted);
}

#[tokio::test]
async fn most_recent_fallback_links_to_newest_event() {
    let store = MemoryStore::new();
    let mut newest = event("party-2", "Newest", 1);
    newest.created_at = Some(Utc.with_ymd_and_hms(2025, 7, 1, 0, 0, 0).unwrap());
    store.seed_event(event("party-1", "Older", 0));
    store.seed_event(newest);
    store.seed_invitation(invitation("inv-1", "ghost-42"));

    let config = EngineConfig {
        fallback_policy: EventFallbackPolicy::UseMostRecentEvent,
        ..EngineConfig::default()
    };
    let engine = ReconcileEngine::new(store.clone(), config);
    engine
        .on_supplier_sign_in(&SupplierIdentity::new(USER, EMAIL))
        .await;

    let memberships = store.memberships();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0].event_id, "party-2");
}

#[tokio::test]
async fn notification_set_matches_invitation_set_after_sign_in() {
    let store = MemoryStore::new();
    store.seed_event(event("evt-1", "Garden Wedding", 0));
    store.seed_invitation(invitation("inv-1", "evt-1"));
    store.seed_invitation(invitation("inv-2", "ghost-42"));

    let engine = ReconcileEngine::new(store.clone(), EngineConfig::default());
    engine
        .on_supplier_sign_in(&SupplierIdentity::new(USER, EMAIL))
        .await;
    engine
        .on_supplier_sign_in(&SupplierIdentity::new(USER, EMAIL))
        .await;

    let invited: HashSet<String> = store
        .invitations()
        .iter()
        .map(|i| i.event_id.clone())
        .collect();
    let notified: HashSet<String> = store
        .notifications()
        .iter()
        .map(|n| n.event_id.clone())
        .collect();
    assert_eq!(invited, notified);
    assert!(store
        .notifications()
        .iter()
        .all(|n| n.status == NotificationStatus::Unread));
}

#[tokio::test]
async fn view_deduplicates_across_invitation_and_membership_sources() {
    let store = MemoryStore::new();
    store.seed_event(event("evt-1", "Garden Wedding", 0));
    store.seed_profile(Profile {
        id: "admin-1".to_string(),
        display_name: Some("Alex".to_string()),
    });
    // Same event reachable through an invitation, an email-keyed
    // membership, and a user-keyed membership.
    store.seed_invitation(invitation("inv-1", "evt-1"));
    store.seed_membership(Membership {
        id: "m-1".to_string(),
        event_id: "evt-1".to_string(),
        supplier_user_id: Some(USER.to_string()),
        supplier_email: EMAIL.to_string(),
        created_at: Utc::now(),
    });

    let engine = ReconcileEngine::new(store.clone(), EngineConfig::default());
    let views = engine
        .compose_view(&SupplierIdentity::new(USER, EMAIL))
        .await;

    assert_eq!(views.len(), 1);
    assert_eq!(views[0].id, "evt-1");
    assert_eq!(views[0].status, "accepted");
}

#[tokio::test]
async fn realtime_changes_patch_a_live_feed() {
    let store = MemoryStore::new();
    store.seed_event(event("evt-1", "Garden Wedding", 0));
    store.seed_invitation(invitation("inv-1", "evt-1"));

    let engine = ReconcileEngine::new(store.clone(), EngineConfig::default());
    let identity = SupplierIdentity::new(USER, EMAIL);
    let report = engine.on_supplier_sign_in(&identity).await;

    let feed = Arc::new(Mutex::new(LiveEventFeed::new(report.events)));
    let updates = Arc::new(Mutex::new(Vec::new()));

    let feed_for_invites = feed.clone();
    let updates_for_invites = updates.clone();
    let _invite_sub = store.hub().subscribe(
        Table::Invitations,
        ChangeFilter::all(),
        move |change| {
            let update = feed_for_invites.lock().unwrap().apply(change);
            updates_for_invites.lock().unwrap().push(update);
        },
    );
    let feed_for_members = feed.clone();
    let updates_for_members = updates.clone();
    let _member_sub = store.hub().subscribe(
        Table::Memberships,
        ChangeFilter::all(),
        move |change| {
            let update = feed_for_members.lock().unwrap().apply(change);
            updates_for_members.lock().unwrap().push(update);
        },
    );

    // An admin creates a new event and invites this supplier to it.
    store.seed_event(event("party-7", "Autumn Gala", 3));
    store.seed_invitation(invitation("inv-2", "party-7"));
    assert_eq!(*updates.lock().unwrap(), vec![FeedUpdate::Appended]);
    {
        let feed = feed.lock().unwrap();
        let appended = feed.views().iter().find(|v| v.id == "party-7").unwrap();
        assert!(appended.is_placeholder);
        assert_eq!(appended.status, "pending");
    }

    // The next reconciliation pass accepts it; the feed patches the
    // existing entry in place instead of appending again.
    let before = feed.lock().unwrap().views().len();
    engine.on_supplier_sign_in(&identity).await;
    let feed = feed.lock().unwrap();
    assert_eq!(feed.views().len(), before);
    let patched = feed.views().iter().find(|v| v.id == "party-7").unwrap();
    assert_eq!(patched.status, "accepted");
    assert!(!patched.is_placeholder);
}

#[tokio::test]
async fn membership_revocation_flips_feed_entry_to_placeholder() {
    let store = MemoryStore::new();
    store.seed_event(event("evt-1", "Garden Wedding", 0));
    store.seed_invitation(invitation("inv-1", "evt-1"));

    let engine = ReconcileEngine::new(store.clone(), EngineConfig::default());
    let identity = SupplierIdentity::new(USER, EMAIL);
    let report = engine.on_supplier_sign_in(&identity).await;
    let membership_id = store.memberships()[0].id.clone();

    let feed = Arc::new(Mutex::new(LiveEventFeed::new(report.events)));
    let feed_for_sub = feed.clone();
    let _sub = store.hub().subscribe(
        Table::Memberships,
        ChangeFilter::all(),
        move |change| {
            feed_for_sub.lock().unwrap().apply(change);
        },
    );

    store.delete_membership(&membership_id);

    let feed = feed.lock().unwrap();
    assert_eq!(feed.views().len(), 1);
    assert_eq!(feed.views()[0].status, "revoked");
    assert!(feed.views()[0].is_placeholder);
}
