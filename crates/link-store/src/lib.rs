//! # link-store
//!
//! Uniform query/upsert/subscribe adapter over the supplier-event link
//! tables (invitations, memberships, notifications, events, profiles).
//!
//! The reconciliation engine never talks to the persistent store
//! directly; it goes through the [`LinkStore`] trait. Two
//! implementations are provided:
//!
//! - [`SupabaseStore`] - PostgREST-backed store for production use
//! - [`MemoryStore`] - in-memory store for tests, wired to a
//!   [`ChangeHub`] so realtime paths are testable end to end
//!
//! ## Concurrency contract
//!
//! Multiple entry points (sign-in, sign-up, page mount, realtime
//! replay) may race to create the same membership or notification.
//! The store is the concurrency primitive: every write that can race
//! goes through [`LinkStore::upsert_membership`] with a declared
//! conflict key, and a duplicate-key outcome is reported as
//! [`UpsertOutcome::AlreadyExists`], never as an error.

#![allow(async_fn_in_trait)]

mod change;
mod error;
mod filter;
mod memory;
mod store;
mod supabase;
mod types;

pub use change::{ChangeEvent, ChangeFilter, ChangeHub, ChangeKind, Subscription, Table};
pub use error::{StoreError, StoreResult};
pub use filter::{Filter, Order, Query};
pub use memory::MemoryStore;
pub use store::{LinkStore, UpsertOutcome};
pub use supabase::{AuthContext, SupabaseStore};
pub use types::{
    EventRow, Invitation, InvitationStatus, Membership, MembershipConflictKey, NewMembership,
    NewNotification, Notification, NotificationKind, NotificationStatus, Profile,
};
