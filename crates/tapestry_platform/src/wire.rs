//! Serde models for the platform's REST read API and event feed.
//!
//! Field names follow the platform's camelCase JSON. Identifiers are opaque
//! strings; nothing here assumes anything about their internal structure.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A platform user, embedded as the author of threads and messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireUser {
    /// Platform identifier.
    pub id: String,
    /// Login name.
    pub username: String,
    /// Preferred display name.
    #[serde(default)]
    pub display_name: Option<String>,
    /// Avatar asset reference.
    #[serde(default)]
    pub avatar: Option<String>,
    /// Whether the account is automated.
    #[serde(default)]
    pub bot: bool,
}

/// A channel as returned by the channel listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireChannel {
    /// Platform identifier.
    pub id: String,
    /// Owning server.
    pub server_id: String,
    /// Channel name.
    #[serde(default)]
    pub name: Option<String>,
    /// Channel kind (`text`, `forum`, ...).
    #[serde(default = "default_channel_kind")]
    pub kind: String,
    /// Topic line.
    #[serde(default)]
    pub topic: Option<String>,
    /// Sort position within the server.
    #[serde(default)]
    pub position: Option<i32>,
    /// Parent category id.
    #[serde(default)]
    pub parent_id: Option<String>,
    /// Whether the channel can hold threads; backfill skips the rest.
    #[serde(default)]
    pub supports_threads: bool,
}

fn default_channel_kind() -> String {
    "text".to_string()
}

/// A thread as returned by the thread listing endpoints and thread lifecycle
/// events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireThread {
    /// Platform identifier.
    pub id: String,
    /// Owning server.
    pub server_id: String,
    /// Owning channel.
    pub channel_id: String,
    /// Thread author.
    pub author: WireUser,
    /// Thread title.
    pub title: String,
    /// Lifecycle status; absent means open.
    #[serde(default)]
    pub status: Option<String>,
    /// Visibility; absent means public.
    #[serde(default)]
    pub visibility: Option<String>,
    /// Whether the thread is archived.
    #[serde(default)]
    pub archived: bool,
    /// Whether the thread is locked.
    #[serde(default)]
    pub locked: bool,
    /// Whether the thread is pinned.
    #[serde(default)]
    pub pinned: bool,
    /// When the thread was archived.
    #[serde(default)]
    pub archived_at: Option<DateTime<Utc>>,
    /// Created on the platform.
    pub created_at: DateTime<Utc>,
}

/// A message as returned by the message listing endpoint and message
/// lifecycle events.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireMessage {
    /// Platform identifier.
    pub id: String,
    /// Owning thread, absent for unthreaded channel messages.
    #[serde(default)]
    pub thread_id: Option<String>,
    /// Owning channel.
    pub channel_id: String,
    /// Owning server.
    pub server_id: String,
    /// Message author.
    pub author: WireUser,
    /// Raw message text.
    pub content: String,
    /// Message this one replies to.
    #[serde(default)]
    pub reply_to_id: Option<String>,
    /// Embed blobs, passed through verbatim.
    #[serde(default)]
    pub embeds: Option<serde_json::Value>,
    /// Interactive component blobs, passed through verbatim.
    #[serde(default)]
    pub components: Option<serde_json::Value>,
    /// Sticker blobs, passed through verbatim.
    #[serde(default)]
    pub stickers: Option<serde_json::Value>,
    /// Mentioned user ids.
    #[serde(default)]
    pub mention_ids: Option<serde_json::Value>,
    /// Created on the platform.
    pub created_at: DateTime<Utc>,
    /// Last edited on the platform, for update events.
    #[serde(default)]
    pub edited_at: Option<DateTime<Utc>>,
}

/// A reaction add/remove event payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WireReaction {
    /// Message the reaction applies to.
    pub message_id: String,
    /// Owning server.
    pub server_id: String,
    /// Reaction emoji.
    pub emoji: String,
    /// Reacting user.
    pub user_id: String,
}
