//! Change events and the subscribe surface.
//!
//! The realtime transport delivers insert/update/delete payloads for
//! a table, optionally narrowed by a `column=eq.value` filter. The
//! hub here is deliberately small: a subscription is an owned handle,
//! and dropping it unregisters the callback. There is no global
//! registry of channels; whoever subscribes owns the release.
//!
//! # Design Principles
//!
//! - Events are published after the underlying write has committed
//! - Callbacks run synchronously on the publisher's thread
//! - A dropped [`Subscription`] never fires again

use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use crate::error::{StoreError, StoreResult};

/// Tables the reconciliation core observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Table {
    Invitations,
    Memberships,
    Notifications,
    Events,
    Profiles,
}

impl Table {
    /// The table's name in the store schema.
    pub fn name(self) -> &'static str {
        match self {
            Self::Invitations => "event_invitations",
            Self::Memberships => "event_suppliers",
            Self::Notifications => "notifications",
            Self::Events => "events",
            Self::Profiles => "profiles",
        }
    }
}

impl fmt::Display for Table {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Kind of row change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
}

/// A row change delivered to subscribers.
///
/// `new` is present for inserts and updates; `old` is present for
/// updates and deletes. Payloads are JSON rows in the table's wire
/// shape.
#[derive(Debug, Clone)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub table: Table,
    pub new: Option<serde_json::Value>,
    pub old: Option<serde_json::Value>,
}

impl ChangeEvent {
    /// The value of `column` in the new payload, falling back to the
    /// old payload for deletes.
    pub fn column_value(&self, column: &str) -> Option<&serde_json::Value> {
        self.new
            .as_ref()
            .and_then(|row| row.get(column))
            .or_else(|| self.old.as_ref().and_then(|row| row.get(column)))
    }
}

/// A parsed `column=eq.value` row filter.
///
/// An empty expression matches every row of the subscribed table.
#[derive(Debug, Clone, Default)]
pub struct ChangeFilter {
    predicate: Option<(String, String)>,
}

impl ChangeFilter {
    /// Matches all rows.
    pub fn all() -> Self {
        Self::default()
    }

    /// Matches rows where `column` equals `value`.
    pub fn eq(column: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            predicate: Some((column.into(), value.into())),
        }
    }

    /// Parses a filter expression such as `supplier_email=eq.s@x.com`.
    ///
    /// The empty string parses to a match-all filter. Only the `eq`
    /// operator is supported; anything else is rejected.
    pub fn parse(expression: &str) -> StoreResult<Self> {
        if expression.is_empty() {
            return Ok(Self::all());
        }
        let (column, rest) = expression
            .split_once('=')
            .ok_or_else(|| StoreError::Filter(expression.to_string()))?;
        let value = rest
            .strip_prefix("eq.")
            .ok_or_else(|| StoreError::Filter(expression.to_string()))?;
        if column.is_empty() {
            return Err(StoreError::Filter(expression.to_string()));
        }
        Ok(Self::eq(column, value))
    }

    /// Whether this filter matches the given event's row payload.
    pub fn matches(&self, event: &ChangeEvent) -> bool {
        match &self.predicate {
            None => true,
            Some((column, value)) => event
                .column_value(column)
                .and_then(|v| v.as_str())
                .is_some_and(|v| v == value),
        }
    }
}

type Callback = Box<dyn Fn(&ChangeEvent) + Send + Sync>;

struct Entry {
    table: Table,
    filter: ChangeFilter,
    callback: Callback,
}

struct HubInner {
    next_id: AtomicU64,
    entries: RwLock<HashMap<u64, Entry>>,
}

/// In-process change dispatcher.
///
/// [`MemoryStore`](crate::MemoryStore) publishes here after every
/// mutation; production deployments bridge the external realtime
/// transport into the same publish call.
#[derive(Clone)]
pub struct ChangeHub {
    inner: Arc<HubInner>,
}

impl Default for ChangeHub {
    fn default() -> Self {
        Self::new()
    }
}

impl ChangeHub {
    /// Creates an empty hub with no subscribers.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(HubInner {
                next_id: AtomicU64::new(0),
                entries: RwLock::new(HashMap::new()),
            }),
        }
    }

    /// Registers a callback for changes on `table` matching `filter`.
    ///
    /// The returned [`Subscription`] owns the registration; dropping
    /// it unregisters the callback.
    pub fn subscribe<F>(&self, table: Table, filter: ChangeFilter, callback: F) -> Subscription
    where
        F: Fn(&ChangeEvent) + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.entries.write().expect("lock poisoned").insert(
            id,
            Entry {
                table,
                filter,
                callback: Box::new(callback),
            },
        );
        Subscription {
            id,
            hub: Arc::downgrade(&self.inner),
        }
    }

    /// Delivers an event to every matching subscriber.
    pub fn publish(&self, event: &ChangeEvent) {
        let entries = self.inner.entries.read().expect("lock poisoned");
        for entry in entries.values() {
            if entry.table == event.table && entry.filter.matches(event) {
                (entry.callback)(event);
            }
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.inner.entries.read().expect("lock poisoned").len()
    }
}

/// Owned handle to a change subscription.
///
/// Dropping the handle unregisters the callback, so a component that
/// subscribes on mount releases its channel on teardown without any
/// extra bookkeeping.
pub struct Subscription {
    id: u64,
    hub: Weak<HubInner>,
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.hub.upgrade() {
            inner.entries.write().expect("lock poisoned").remove(&self.id);
        }
    }
}
