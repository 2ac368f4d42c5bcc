//! Row and insert models for the mirror schema.
//!
//! Each mirrored entity family has a `*Row` struct (Queryable, field order
//! matching `schema.rs`) and a `New*` struct (Insertable) used by the store
//! for upserts. External platform identifiers are opaque strings.

use crate::schema::{
    channels, message_edits, messages, servers, threads, users, webhook_dead_letters,
    webhook_deliveries, webhook_subscriptions,
};
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};

/// Lifecycle status of a mirrored thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreadStatus {
    /// Open for new messages.
    Open,
    /// Marked resolved by a moderator.
    Resolved,
    /// Locked against new messages.
    Locked,
}

impl ThreadStatus {
    /// Stable textual form stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreadStatus::Open => "open",
            ThreadStatus::Resolved => "resolved",
            ThreadStatus::Locked => "locked",
        }
    }

    /// Parse the stored textual form, defaulting to `Open` on unknown input.
    pub fn parse(s: &str) -> Self {
        match s {
            "resolved" => ThreadStatus::Resolved,
            "locked" => ThreadStatus::Locked,
            _ => ThreadStatus::Open,
        }
    }
}

/// Visibility of a mirrored thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Visibility {
    /// Visible to all readers.
    Public,
    /// Restricted to participants.
    Private,
}

impl Visibility {
    /// Stable textual form stored in the `visibility` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            Visibility::Public => "public",
            Visibility::Private => "private",
        }
    }

    /// Parse the stored textual form, defaulting to `Public` on unknown input.
    pub fn parse(s: &str) -> Self {
        match s {
            "private" => Visibility::Private,
            _ => Visibility::Public,
        }
    }
}

/// What triggered a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncKind {
    /// First-ever sync of a server.
    Initial,
    /// Ongoing live-event catch-up.
    Incremental,
    /// Bulk historical import.
    Backfill,
    /// Operator-triggered run.
    Manual,
}

impl SyncKind {
    /// Stable textual form stored in the `kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncKind::Initial => "initial",
            SyncKind::Incremental => "incremental",
            SyncKind::Backfill => "backfill",
            SyncKind::Manual => "manual",
        }
    }
}

/// Terminal (or initial) state of a sync run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncStatus {
    /// Run opened, not yet finished.
    Started,
    /// Run finished cleanly.
    Completed,
    /// Run aborted on a fatal error.
    Failed,
}

impl SyncStatus {
    /// Stable textual form stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncStatus::Started => "started",
            SyncStatus::Completed => "completed",
            SyncStatus::Failed => "failed",
        }
    }
}

/// Outcome of a webhook delivery attempt series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryStatus {
    /// Created, attempts in flight.
    Pending,
    /// A 2xx response was received.
    Success,
    /// All attempts exhausted.
    Failed,
}

impl DeliveryStatus {
    /// Stable textual form stored in the `status` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryStatus::Pending => "pending",
            DeliveryStatus::Success => "success",
            DeliveryStatus::Failed => "failed",
        }
    }
}

/// A mirrored server row.
#[derive(Debug, Clone, Queryable)]
pub struct ServerRow {
    /// External platform identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Icon asset reference.
    pub icon: Option<String>,
    /// External id of the owning user.
    pub owner_id: Option<String>,
    /// Server description.
    pub description: Option<String>,
    /// Member count as last reported by the platform.
    pub member_count: Option<i32>,
    /// First mirrored.
    pub created_at: DateTime<Utc>,
    /// Last merged.
    pub updated_at: DateTime<Utc>,
}

/// Insertable server record.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = servers)]
pub struct NewServer {
    /// External platform identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Icon asset reference.
    pub icon: Option<String>,
    /// External id of the owning user.
    pub owner_id: Option<String>,
    /// Server description.
    pub description: Option<String>,
    /// Member count as last reported by the platform.
    pub member_count: Option<i32>,
}

/// Insertable user record.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = users)]
pub struct NewUser {
    /// External platform identifier.
    pub id: String,
    /// Login name.
    pub username: String,
    /// Preferred display name.
    pub display_name: Option<String>,
    /// Avatar asset reference.
    pub avatar: Option<String>,
    /// Whether the account is automated.
    pub bot: bool,
}

/// A mirrored channel row.
#[derive(Debug, Clone, Queryable)]
pub struct ChannelRow {
    /// External platform identifier.
    pub id: String,
    /// Owning server.
    pub server_id: String,
    /// Channel name.
    pub name: Option<String>,
    /// Channel kind (`text`, `forum`, ...).
    pub kind: String,
    /// Topic line.
    pub topic: Option<String>,
    /// Sort position within the server.
    pub position: Option<i32>,
    /// Parent category id.
    pub parent_id: Option<String>,
    /// First mirrored.
    pub created_at: DateTime<Utc>,
    /// Last merged.
    pub updated_at: DateTime<Utc>,
}

/// Insertable channel record.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = channels)]
pub struct NewChannel {
    /// External platform identifier.
    pub id: String,
    /// Owning server.
    pub server_id: String,
    /// Channel name.
    pub name: Option<String>,
    /// Channel kind (`text`, `forum`, ...).
    pub kind: String,
    /// Topic line.
    pub topic: Option<String>,
    /// Sort position within the server.
    pub position: Option<i32>,
    /// Parent category id.
    pub parent_id: Option<String>,
}

/// A mirrored thread row.
#[derive(Debug, Clone, Queryable)]
pub struct ThreadRow {
    /// External platform identifier.
    pub id: String,
    /// Owning server.
    pub server_id: String,
    /// Owning channel.
    pub channel_id: String,
    /// Thread author.
    pub author_id: String,
    /// Thread title.
    pub title: String,
    /// URL-safe slug, unique per server.
    pub slug: String,
    /// Lifecycle status, see [`ThreadStatus`].
    pub status: String,
    /// Visibility, see [`Visibility`].
    pub visibility: String,
    /// Non-deleted messages in the thread.
    pub message_count: i32,
    /// Distinct users who posted in the thread.
    pub participant_count: i32,
    /// Whether the thread is archived upstream.
    pub archived: bool,
    /// Whether the thread is locked upstream.
    pub locked: bool,
    /// Whether the thread is pinned upstream.
    pub pinned: bool,
    /// When the thread was archived.
    pub archived_at: Option<DateTime<Utc>>,
    /// Most recent message activity (forward-only).
    pub last_activity_at: DateTime<Utc>,
    /// First mirrored.
    pub created_at: DateTime<Utc>,
    /// Last merged.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl ThreadRow {
    /// Typed view of the `status` column.
    pub fn thread_status(&self) -> ThreadStatus {
        ThreadStatus::parse(&self.status)
    }

    /// Typed view of the `visibility` column.
    pub fn thread_visibility(&self) -> Visibility {
        Visibility::parse(&self.visibility)
    }
}

/// Insertable thread record.
///
/// Counters are intentionally absent: they start at their column defaults and
/// are only mutated through the store's counter operations.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = threads)]
pub struct NewThread {
    /// External platform identifier.
    pub id: String,
    /// Owning server.
    pub server_id: String,
    /// Owning channel.
    pub channel_id: String,
    /// Thread author.
    pub author_id: String,
    /// Thread title.
    pub title: String,
    /// URL-safe slug, unique per server.
    pub slug: String,
    /// Lifecycle status, see [`ThreadStatus`].
    pub status: String,
    /// Visibility, see [`Visibility`].
    pub visibility: String,
    /// Whether the thread is archived upstream.
    pub archived: bool,
    /// Whether the thread is locked upstream.
    pub locked: bool,
    /// Whether the thread is pinned upstream.
    pub pinned: bool,
    /// When the thread was archived.
    pub archived_at: Option<DateTime<Utc>>,
    /// Most recent message activity.
    pub last_activity_at: DateTime<Utc>,
    /// Created upstream.
    pub created_at: DateTime<Utc>,
}

/// A mirrored message row.
#[derive(Debug, Clone, Queryable)]
pub struct MessageRow {
    /// External platform identifier.
    pub id: String,
    /// Owning thread, absent for unthreaded channel messages.
    pub thread_id: Option<String>,
    /// Owning channel.
    pub channel_id: String,
    /// Owning server.
    pub server_id: String,
    /// Message author.
    pub author_id: String,
    /// Raw message text.
    pub content: String,
    /// Pre-rendered HTML.
    pub content_html: String,
    /// Message this one replies to.
    pub reply_to_id: Option<String>,
    /// Whether the message has ever been edited.
    pub edited: bool,
    /// Number of applied edits.
    pub edit_count: i32,
    /// Total reactions across all emoji.
    pub reaction_count: i32,
    /// Embed blobs, stored verbatim.
    pub embeds: Option<serde_json::Value>,
    /// Interactive component blobs, stored verbatim.
    pub components: Option<serde_json::Value>,
    /// Sticker blobs, stored verbatim.
    pub stickers: Option<serde_json::Value>,
    /// Mentioned user ids.
    pub mention_ids: Option<serde_json::Value>,
    /// Created upstream.
    pub created_at: DateTime<Utc>,
    /// Last merged.
    pub updated_at: DateTime<Utc>,
    /// Soft-delete marker.
    pub deleted_at: Option<DateTime<Utc>>,
}

/// Insertable message record.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = messages)]
pub struct NewMessage {
    /// External platform identifier.
    pub id: String,
    /// Owning thread, absent for unthreaded channel messages.
    pub thread_id: Option<String>,
    /// Owning channel.
    pub channel_id: String,
    /// Owning server.
    pub server_id: String,
    /// Message author.
    pub author_id: String,
    /// Raw message text.
    pub content: String,
    /// Pre-rendered HTML.
    pub content_html: String,
    /// Message this one replies to.
    pub reply_to_id: Option<String>,
    /// Embed blobs, stored verbatim.
    pub embeds: Option<serde_json::Value>,
    /// Interactive component blobs, stored verbatim.
    pub components: Option<serde_json::Value>,
    /// Sticker blobs, stored verbatim.
    pub stickers: Option<serde_json::Value>,
    /// Mentioned user ids.
    pub mention_ids: Option<serde_json::Value>,
    /// Created upstream.
    pub created_at: DateTime<Utc>,
}

/// Append-only edit history row.
#[derive(Debug, Clone, Queryable)]
pub struct MessageEditRow {
    /// Serial row id.
    pub id: i32,
    /// Edited message.
    pub message_id: String,
    /// Content before the edit.
    pub previous_content: String,
    /// When the edit happened upstream.
    pub edited_at: DateTime<Utc>,
}

/// Insertable edit history record.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = message_edits)]
pub struct NewMessageEdit {
    /// Edited message.
    pub message_id: String,
    /// Content before the edit.
    pub previous_content: String,
    /// When the edit happened upstream.
    pub edited_at: DateTime<Utc>,
}

/// Per-(thread, user) participation rollup.
#[derive(Debug, Clone, Queryable)]
pub struct ThreadParticipantRow {
    /// Thread the user posted in.
    pub thread_id: String,
    /// Posting user.
    pub user_id: String,
    /// Messages the user posted in the thread.
    pub message_count: i32,
    /// Most recent post (forward-only).
    pub last_message_at: DateTime<Utc>,
}

/// Append-only sync run record.
#[derive(Debug, Clone, Queryable)]
pub struct SyncLogRow {
    /// Serial row id.
    pub id: i32,
    /// Server the run covered.
    pub server_id: String,
    /// What triggered the run, see [`SyncKind`].
    pub kind: String,
    /// Run state, see [`SyncStatus`].
    pub status: String,
    /// Entities written during the run.
    pub items_synced: i32,
    /// Fatal error for failed runs.
    pub error_message: Option<String>,
    /// Run opened.
    pub started_at: DateTime<Utc>,
    /// Run closed (completed or failed).
    pub completed_at: Option<DateTime<Utc>>,
}

/// A registered webhook subscriber.
#[derive(Debug, Clone, Queryable)]
pub struct SubscriptionRow {
    /// Serial row id.
    pub id: i32,
    /// Server the subscriber watches.
    pub server_id: String,
    /// Endpoint URL to POST to.
    pub url: String,
    /// Shared HMAC secret.
    pub secret: String,
    /// Event types wanted; `*` means all.
    pub events: Vec<String>,
    /// Whether the subscriber receives notifications.
    pub active: bool,
    /// Consecutive dead-lettered notifications.
    pub failure_count: i32,
    /// Last successful delivery.
    pub last_triggered_at: Option<DateTime<Utc>>,
    /// Registered.
    pub created_at: DateTime<Utc>,
    /// Last modified.
    pub updated_at: DateTime<Utc>,
}

impl SubscriptionRow {
    /// Whether this subscriber wants the given event type.
    ///
    /// A literal `*` entry subscribes to every event.
    pub fn wants(&self, event: &str) -> bool {
        self.events.iter().any(|e| e == "*" || e == event)
    }
}

/// Insertable subscriber registration.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = webhook_subscriptions)]
pub struct NewSubscription {
    /// Server the subscriber watches.
    pub server_id: String,
    /// Endpoint URL to POST to.
    pub url: String,
    /// Shared HMAC secret.
    pub secret: String,
    /// Event types wanted; `*` means all.
    pub events: Vec<String>,
}

/// One attempted notification send.
#[derive(Debug, Clone, Queryable)]
pub struct DeliveryRow {
    /// Serial row id.
    pub id: i32,
    /// Receiving subscriber.
    pub subscription_id: i32,
    /// Event type delivered.
    pub event_type: String,
    /// Serialized notification body.
    pub payload: String,
    /// Outcome, see [`DeliveryStatus`].
    pub status: String,
    /// HTTP status of the final attempt.
    pub response_code: Option<i32>,
    /// Attempts made.
    pub attempt_count: i32,
    /// Delivery opened.
    pub created_at: DateTime<Utc>,
    /// Delivery finalized.
    pub completed_at: Option<DateTime<Utc>>,
}

/// Insertable delivery record.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = webhook_deliveries)]
pub struct NewDelivery {
    /// Receiving subscriber.
    pub subscription_id: i32,
    /// Event type delivered.
    pub event_type: String,
    /// Serialized notification body.
    pub payload: String,
    /// Initial status, see [`DeliveryStatus`].
    pub status: String,
}

/// A notification that exhausted all delivery retries.
#[derive(Debug, Clone, Queryable)]
pub struct DeadLetterRow {
    /// Serial row id.
    pub id: i32,
    /// Subscriber the delivery was meant for.
    pub subscription_id: i32,
    /// Event type of the failed notification.
    pub event_type: String,
    /// Serialized notification body, kept for replay.
    pub payload: String,
    /// Error from the final attempt.
    pub last_error: String,
    /// HTTP status of the final attempt.
    pub last_status_code: Option<i32>,
    /// Attempts made before giving up.
    pub attempt_count: i32,
    /// Dead-lettered.
    pub created_at: DateTime<Utc>,
    /// When the letter was replayed.
    pub replayed_at: Option<DateTime<Utc>>,
    /// Operator who triggered the replay.
    pub replayed_by: Option<String>,
}

/// Insertable dead letter record.
#[derive(Debug, Clone, Insertable)]
#[diesel(table_name = webhook_dead_letters)]
pub struct NewDeadLetter {
    /// Subscriber the delivery was meant for.
    pub subscription_id: i32,
    /// Event type of the failed notification.
    pub event_type: String,
    /// Serialized notification body, kept for replay.
    pub payload: String,
    /// Error from the final attempt.
    pub last_error: String,
    /// HTTP status of the final attempt.
    pub last_status_code: Option<i32>,
    /// Attempts made before giving up.
    pub attempt_count: i32,
}
