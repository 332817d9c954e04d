//! # reconcile-engine
//!
//! The reconciliation engine that links suppliers to the events they
//! are invited to. Three independently-writable records - an
//! invitation, a membership row, and a notification - are created and
//! updated by different actors at different times; this crate
//! converges them to a consistent fixed point despite out-of-order
//! writes, missing foreign keys, and duplicate invitation attempts.
//!
//! ## Non-negotiable Principles
//!
//! - **Every mutation is replayable** - entry points race, so writes
//!   go through idempotent upserts with declared conflict keys
//! - **One invitation's failure never aborts the rest** - per-item
//!   isolation in every batch
//! - **Nothing here is fatal** - the worst outcome of a failure is an
//!   empty or stale list, never a crash propagated to the caller
//! - **Display never dead-ends** - when the canonical event record is
//!   missing, a placeholder view is synthesized instead
//!
//! ## Control Flow
//!
//! ```text
//! supplier sign-in
//!   -> membership backfill   (bind or synthesize membership rows)
//!   -> invite resolver       (pending invites -> memberships, accept)
//!   -> notification sync     (one unread bell entry per invitation)
//!   -> event view composer   (canonical + placeholder, deduped, sorted)
//!
//! realtime change -> live feed patch (by id, no re-fetch)
//! ```
//!
//! ## Example
//!
//! ```rust
//! use link_store::MemoryStore;
//! use reconcile_engine::{EngineConfig, ReconcileEngine, SupplierIdentity};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store = MemoryStore::new();
//! let engine = ReconcileEngine::new(store, EngineConfig::default());
//!
//! let identity = SupplierIdentity::new("user-1", "  S@X.com ");
//! let report = engine.on_supplier_sign_in(&identity).await;
//! assert!(report.events.is_empty());
//! # }
//! ```

mod backfill;
mod engine;
mod error;
mod identity;
mod live;
mod notify;
mod resolver;
mod retry;
mod view;

pub use backfill::{BackfillOutcome, BackfillReport, MembershipBackfill};
pub use engine::{EngineConfig, ReconcileEngine, SignInReport};
pub use error::{ReconcileError, ReconcileResult};
pub use identity::SupplierIdentity;
pub use live::{FeedUpdate, LiveEventFeed};
pub use notify::NotificationSynchronizer;
pub use resolver::{EventFallbackPolicy, InviteResolver, ResolveReport};
pub use retry::RetryPolicy;
pub use view::{EventView, EventViewComposer, DEFAULT_ORGANIZER_NAME};
