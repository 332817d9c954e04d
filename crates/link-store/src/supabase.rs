//! PostgREST-backed implementation of [`LinkStore`].
//!
//! A thin wrapper over `reqwest` that renders [`Query`] filters into
//! PostgREST query strings and maps duplicate-key conflicts on
//! idempotent upserts to [`UpsertOutcome::AlreadyExists`].

use crate::error::{StoreError, StoreResult};
use crate::filter::{Filter, Query};
use crate::store::{LinkStore, UpsertOutcome};
use crate::types::{
    EventRow, Invitation, Membership, MembershipConflictKey, NewMembership, NewNotification,
    Notification, NotificationStatus, Profile,
};
use serde::de::DeserializeOwned;
use tokio::sync::RwLock;
use tracing::{debug, error};

const INVITATION_COLUMNS: &str = "id,event_id,supplier_email,invited_by_admin_id,status,created_at";
const MEMBERSHIP_COLUMNS: &str = "id,event_id,supplier_user_id,supplier_email,created_at";
const EVENT_COLUMNS: &str =
    "id,name,description,start_date,end_date,location,admin_id,budget,type,sub_type,status,created_at";
const NOTIFICATION_COLUMNS: &str =
    "id,supplier_email,event_id,admin_user_id,type,status,created_at,content";
const PROFILE_COLUMNS: &str = "id,display_name";

/// Longest response body carried into an error message.
const ERROR_BODY_LIMIT: usize = 200;

/// Authentication context for store requests.
///
/// Set after the supplier authenticates; without it every request
/// fails with a configuration error and callers degrade.
#[derive(Clone)]
pub struct AuthContext {
    /// JWT access token for the authenticated supplier.
    pub access_token: String,
}

/// PostgREST store client.
pub struct SupabaseStore {
    http_client: reqwest::Client,
    api_url: String,
    anon_key: String,
    context: RwLock<Option<AuthContext>>,
}

impl SupabaseStore {
    /// Creates a new store client.
    ///
    /// # Arguments
    /// * `api_url` - The project API URL (e.g., `https://xyz.supabase.co`)
    /// * `anon_key` - The anonymous API key
    ///
    /// Fails with [`StoreError::Config`] when `api_url` is not a
    /// valid absolute URL.
    pub fn new(api_url: impl Into<String>, anon_key: impl Into<String>) -> StoreResult<Self> {
        let api_url = api_url.into();
        url::Url::parse(&api_url)
            .map_err(|e| StoreError::Config(format!("invalid API URL {}: {}", api_url, e)))?;
        Ok(Self {
            http_client: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
            context: RwLock::new(None),
        })
    }

    /// Sets the auth context used for subsequent requests.
    pub async fn set_context(&self, context: AuthContext) {
        let mut guard = self.context.write().await;
        *guard = Some(context);
    }

    /// Clears the auth context, e.g. on sign-out.
    pub async fn clear_context(&self) {
        let mut guard = self.context.write().await;
        *guard = None;
    }

    /// Builds the REST API URL for a table.
    fn rest_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.api_url, table)
    }

    fn table_url(&self, table: &str, columns: &str, query: &Query) -> String {
        let mut url = format!("{}?select={}", self.rest_url(table), columns);
        let rendered = query.render();
        if !rendered.is_empty() {
            url.push('&');
            url.push_str(&rendered);
        }
        url
    }

    async fn access_token(&self) -> StoreResult<String> {
        self.context
            .read()
            .await
            .as_ref()
            .map(|ctx| ctx.access_token.clone())
            .ok_or_else(|| StoreError::Config("no auth context set".to_string()))
    }

    async fn fetch_rows<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        query: &Query,
    ) -> StoreResult<Vec<T>> {
        let url = self.table_url(table, columns, query);
        let token = self.access_token().await?;
        debug!(table, url = %url, "fetching rows");

        let response = self
            .http_client
            .get(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
            .header("Accept", "application/json")
            .send()
            .await?;

        let response = expect_success(response, table, "select").await?;
        Ok(response.json().await?)
    }

    async fn fetch_one<T: DeserializeOwned>(
        &self,
        table: &str,
        columns: &str,
        query: Query,
    ) -> StoreResult<Option<T>> {
        let rows: Vec<T> = self.fetch_rows(table, columns, &query.limit(1)).await?;
        Ok(rows.into_iter().next())
    }

    /// Patches rows matched by `query`, returning how many changed.
    async fn update_rows(
        &self,
        table: &str,
        query: &Query,
        patch: serde_json::Value,
    ) -> StoreResult<usize> {
        let url = format!("{}?{}", self.rest_url(table), query.render());
        let token = self.access_token().await?;
        debug!(table, url = %url, "updating rows");

        let response = self
            .http_client
            .patch(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=representation")
            .json(&patch)
            .send()
            .await?;

        let response = expect_success(response, table, "update").await?;
        let rows: Vec<serde_json::Value> = response.json().await?;
        Ok(rows.len())
    }

    async fn insert_row(&self, table: &str, row: serde_json::Value) -> StoreResult<()> {
        let url = self.rest_url(table);
        let token = self.access_token().await?;
        debug!(table, "inserting row");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .header("Prefer", "return=minimal")
            .json(&row)
            .send()
            .await?;

        expect_success(response, table, "insert").await?;
        Ok(())
    }

    /// Upserts a row with a declared conflict target, ignoring
    /// duplicates.
    ///
    /// With `resolution=ignore-duplicates` plus
    /// `return=representation`, PostgREST returns the inserted rows
    /// only; an empty array means the row already existed.
    async fn upsert_row(
        &self,
        table: &str,
        on_conflict: &str,
        row: serde_json::Value,
    ) -> StoreResult<UpsertOutcome> {
        let url = format!("{}?on_conflict={}", self.rest_url(table), on_conflict);
        let token = self.access_token().await?;
        debug!(table, on_conflict, "upserting row");

        let response = self
            .http_client
            .post(&url)
            .header("apikey", &self.anon_key)
            .header("Authorization", format!("Bearer {}", token))
            .header("Content-Type", "application/json")
            .header("Prefer", "resolution=ignore-duplicates,return=representation")
            .json(&row)
            .send()
            .await?;

        // Stores without the conflict-resolution preference answer a
        // plain duplicate-key error instead; that still means the
        // desired end state holds.
        if response.status() == reqwest::StatusCode::CONFLICT {
            debug!(table, on_conflict, "upsert hit existing row");
            return Ok(UpsertOutcome::AlreadyExists);
        }

        let response = expect_success(response, table, "upsert").await?;
        let rows: Vec<serde_json::Value> = response.json().await?;
        if rows.is_empty() {
            Ok(UpsertOutcome::AlreadyExists)
        } else {
            Ok(UpsertOutcome::Created)
        }
    }
}

/// Fails non-success responses with a truncated body in the error.
async fn expect_success(
    response: reqwest::Response,
    table: &str,
    action: &'static str,
) -> StoreResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    let message = truncate_body(&body);
    error!(status = %status, table, action, message = %message, "store request failed");
    Err(StoreError::Api {
        status: status.as_u16(),
        message,
    })
}

fn truncate_body(body: &str) -> String {
    if body.len() <= ERROR_BODY_LIMIT {
        return body.to_string();
    }
    let mut cut = ERROR_BODY_LIMIT;
    while !body.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}...", &body[..cut])
}

impl LinkStore for SupabaseStore {
    async fn invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>> {
        let query = Query::new().filter(Filter::eq_fold("supplier_email", email));
        self.fetch_rows("event_invitations", INVITATION_COLUMNS, &query)
            .await
    }

    async fn pending_invitations_for_email(&self, email: &str) -> StoreResult<Vec<Invitation>> {
        let query = Query::new()
            .filter(Filter::eq_fold("supplier_email", email))
            .filter(Filter::eq("status", "pending"));
        self.fetch_rows("event_invitations", INVITATION_COLUMNS, &query)
            .await
    }

    async fn mark_invitation_accepted(&self, invitation_id: &str) -> StoreResult<()> {
        let query = Query::new().filter(Filter::eq("id", invitation_id));
        self.update_rows(
            "event_invitations",
            &query,
            serde_json::json!({ "status": "accepted" }),
        )
        .await?;
        Ok(())
    }

    async fn event_by_id(&self, event_id: &str) -> StoreResult<Option<EventRow>> {
        let query = Query::new().filter(Filter::eq("id", event_id));
        self.fetch_one("events", EVENT_COLUMNS, query).await
    }

    async fn events_by_ids(&self, ids: &[String]) -> StoreResult<Vec<EventRow>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let query = Query::new().filter(Filter::in_list("id", ids.to_vec()));
        self.fetch_rows("events", EVENT_COLUMNS, &query).await
    }

    async fn event_by_id_prefix(&self, prefix: &str) -> StoreResult<Option<EventRow>> {
        // Ordered so "first hit" is deterministic across calls.
        let query = Query::new()
            .filter(Filter::like_prefix("id", prefix))
            .order_asc("id");
        self.fetch_one("events", EVENT_COLUMNS, query).await
    }

    async fn most_recent_event(&self) -> StoreResult<Option<EventRow>> {
        let query = Query::new().order_desc("created_at");
        self.fetch_one("events", EVENT_COLUMNS, query).await
    }

    async fn membership_for_user(
        &self,
        event_id: &str,
        user_id: &str,
    ) -> StoreResult<Option<Membership>> {
        let query = Query::new()
            .filter(Filter::eq("event_id", event_id))
            .filter(Filter::eq("supplier_user_id", user_id));
        self.fetch_one("event_suppliers", MEMBERSHIP_COLUMNS, query)
            .await
    }

    async fn memberships_by_email(&self, email: &str) -> StoreResult<Vec<Membership>> {
        let query = Query::new().filter(Filter::eq_fold("supplier_email", email));
        self.fetch_rows("event_suppliers", MEMBERSHIP_COLUMNS, &query)
            .await
    }

    async fn memberships_by_user(&self, user_id: &str) -> StoreResult<Vec<Membership>> {
        let query = Query::new().filter(Filter::eq("supplier_user_id", user_id));
        self.fetch_rows("event_suppliers", MEMBERSHIP_COLUMNS, &query)
            .await
    }

    async fn upsert_membership(
        &self,
        row: NewMembership,
        conflict: MembershipConflictKey,
    ) -> StoreResult<UpsertOutcome> {
        self.upsert_row(
            "event_suppliers",
            conflict.on_conflict(),
            serde_json::to_value(&row)?,
        )
        .await
    }

    async fn bind_memberships(&self, email: &str, user_id: &str) -> StoreResult<usize> {
        let query = Query::new()
            .filter(Filter::eq_fold("supplier_email", email))
            .filter(Filter::is_null("supplier_user_id"));
        self.update_rows(
            "event_suppliers",
            &query,
            serde_json::json!({ "supplier_user_id": user_id }),
        )
        .await
    }

    async fn invitation_notifications_for_email(
        &self,
        email: &str,
    ) -> StoreResult<Vec<Notification>> {
        let query = Query::new()
            .filter(Filter::eq_fold("supplier_email", email))
            .filter(Filter::eq("type", "invitation"));
        self.fetch_rows("notifications", NOTIFICATION_COLUMNS, &query)
            .await
    }

    async fn insert_notification(&self, row: NewNotification) -> StoreResult<()> {
        self.insert_row("notifications", serde_json::to_value(&row)?)
            .await
    }

    async fn set_notification_status(
        &self,
        notification_id: &str,
        status: NotificationStatus,
    ) -> StoreResult<()> {
        let query = Query::new().filter(Filter::eq("id", notification_id));
        self.update_rows(
            "notifications",
            &query,
            serde_json::json!({ "status": serde_json::to_value(status)? }),
        )
        .await?;
        Ok(())
    }

    async fn profile_display_name(&self, admin_id: &str) -> StoreResult<Option<String>> {
        let query = Query::new().filter(Filter::eq("id", admin_id));
        let profile: Option<Profile> = self.fetch_one("profiles", PROFILE_COLUMNS, query).await?;
        Ok(profile.and_then(|p| p.display_name))
    }
}
