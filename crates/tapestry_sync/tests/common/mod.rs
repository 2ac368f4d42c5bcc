#![allow(dead_code)]
//! In-memory test doubles for the mirror store and the notifier.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use tapestry_database::{
    ChannelRow, MessageEditRow, MessageRow, MirrorStore, NewChannel, NewMessage, NewServer,
    NewThread, NewUser, ServerRow, SyncKind, SyncLogRow, SyncStatus, ThreadParticipantRow,
    ThreadRow,
};
use tapestry_error::{DatabaseError, DatabaseErrorKind, DatabaseResult};
use tapestry_platform::{WireChannel, WireMessage, WireThread, WireUser};
use tapestry_sync::{EventKind, Notifier};

#[derive(Default)]
struct Inner {
    servers: HashMap<String, ServerRow>,
    users: HashSet<String>,
    channels: HashMap<String, ChannelRow>,
    threads: HashMap<String, ThreadRow>,
    messages: HashMap<String, MessageRow>,
    edits: Vec<MessageEditRow>,
    reactions: HashMap<(String, String), i32>,
    reactors: HashSet<(String, String, String)>,
    participants: HashMap<(String, String), ThreadParticipantRow>,
    sync_logs: Vec<SyncLogRow>,
    failing_messages: HashSet<String>,
}

/// Hash-map implementation of [`MirrorStore`] mirroring the Postgres
/// adapter's contract.
#[derive(Default)]
pub struct MemoryMirrorStore {
    inner: Mutex<Inner>,
}

impl MemoryMirrorStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make `insert_message` fail for the given id, for skip-and-continue
    /// tests.
    pub fn fail_message(&self, id: &str) {
        self.inner
            .lock()
            .unwrap()
            .failing_messages
            .insert(id.to_string());
    }

    pub fn thread(&self, id: &str) -> Option<ThreadRow> {
        self.inner.lock().unwrap().threads.get(id).cloned()
    }

    pub fn message(&self, id: &str) -> Option<MessageRow> {
        self.inner.lock().unwrap().messages.get(id).cloned()
    }

    pub fn message_count(&self) -> usize {
        self.inner.lock().unwrap().messages.len()
    }

    pub fn sync_logs(&self) -> Vec<SyncLogRow> {
        self.inner.lock().unwrap().sync_logs.clone()
    }
}

#[async_trait]
impl MirrorStore for MemoryMirrorStore {
    async fn upsert_server(&self, server: &NewServer) -> DatabaseResult<()> {
        let now = Utc::now();
        self.inner.lock().unwrap().servers.insert(
            server.id.clone(),
            ServerRow {
                id: server.id.clone(),
                name: server.name.clone(),
                icon: server.icon.clone(),
                owner_id: server.owner_id.clone(),
                description: server.description.clone(),
                member_count: server.member_count,
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn upsert_user(&self, user: &NewUser) -> DatabaseResult<()> {
        self.inner.lock().unwrap().users.insert(user.id.clone());
        Ok(())
    }

    async fn upsert_channel(&self, channel: &NewChannel) -> DatabaseResult<()> {
        let now = Utc::now();
        self.inner.lock().unwrap().channels.insert(
            channel.id.clone(),
            ChannelRow {
                id: channel.id.clone(),
                server_id: channel.server_id.clone(),
                name: channel.name.clone(),
                kind: channel.kind.clone(),
                topic: channel.topic.clone(),
                position: channel.position,
                parent_id: channel.parent_id.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(())
    }

    async fn upsert_thread(&self, thread: &NewThread) -> DatabaseResult<()> {
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        match inner.threads.get_mut(&thread.id) {
            Some(row) => {
                row.title = thread.title.clone();
                row.slug = thread.slug.clone();
                row.status = thread.status.clone();
                row.visibility = thread.visibility.clone();
                row.archived = thread.archived;
                row.locked = thread.locked;
                row.pinned = thread.pinned;
                row.archived_at = thread.archived_at;
                row.updated_at = now;
            }
            None => {
                inner.threads.insert(
                    thread.id.clone(),
                    ThreadRow {
                        id: thread.id.clone(),
                        server_id: thread.server_id.clone(),
                        channel_id: thread.channel_id.clone(),
                        author_id: thread.author_id.clone(),
                        title: thread.title.clone(),
                        slug: thread.slug.clone(),
                        status: thread.status.clone(),
                        visibility: thread.visibility.clone(),
                        message_count: 0,
                        participant_count: 0,
                        archived: thread.archived,
                        locked: thread.locked,
                        pinned: thread.pinned,
                        archived_at: thread.archived_at,
                        last_activity_at: thread.last_activity_at,
                        created_at: thread.created_at,
                        updated_at: now,
                        deleted_at: None,
                    },
                );
            }
        }
        Ok(())
    }

    async fn get_server(&self, id: &str) -> DatabaseResult<Option<ServerRow>> {
        Ok(self.inner.lock().unwrap().servers.get(id).cloned())
    }

    async fn get_channel(&self, id: &str) -> DatabaseResult<Option<ChannelRow>> {
        Ok(self.inner.lock().unwrap().channels.get(id).cloned())
    }

    async fn get_thread(&self, id: &str) -> DatabaseResult<Option<ThreadRow>> {
        Ok(self.inner.lock().unwrap().threads.get(id).cloned())
    }

    async fn get_message(&self, id: &str) -> DatabaseResult<Option<MessageRow>> {
        Ok(self.inner.lock().unwrap().messages.get(id).cloned())
    }

    async fn thread_slug_exists(&self, server_id: &str, slug: &str) -> DatabaseResult<bool> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .threads
            .values()
            .any(|t| t.server_id == server_id && t.slug == slug))
    }

    async fn insert_message(&self, message: &NewMessage) -> DatabaseResult<bool> {
        let now = Utc::now();
        let mut inner = self.inner.lock().unwrap();
        if inner.failing_messages.contains(&message.id) {
            return Err(DatabaseError::new(DatabaseErrorKind::Query(
                "injected failure".to_string(),
            )));
        }
        if inner.messages.contains_key(&message.id) {
            return Ok(false);
        }
        inner.messages.insert(
            message.id.clone(),
            MessageRow {
                id: message.id.clone(),
                thread_id: message.thread_id.clone(),
                channel_id: message.channel_id.clone(),
                server_id: message.server_id.clone(),
                author_id: message.author_id.clone(),
                content: message.content.clone(),
                content_html: message.content_html.clone(),
                reply_to_id: message.reply_to_id.clone(),
                edited: false,
                edit_count: 0,
                reaction_count: 0,
                embeds: message.embeds.clone(),
                components: message.components.clone(),
                stickers: message.stickers.clone(),
                mention_ids: message.mention_ids.clone(),
                created_at: message.created_at,
                updated_at: now,
                deleted_at: None,
            },
        );
        Ok(true)
    }

    async fn apply_edit(
        &self,
        message_id: &str,
        previous_content: &str,
        content: &str,
        content_html: &str,
        edited_at: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let edit_id = inner.edits.len() as i32 + 1;
        inner.edits.push(MessageEditRow {
            id: edit_id,
            message_id: message_id.to_string(),
            previous_content: previous_content.to_string(),
            edited_at,
        });
        if let Some(row) = inner.messages.get_mut(message_id) {
            row.content = content.to_string();
            row.content_html = content_html.to_string();
            row.edited = true;
            row.edit_count += 1;
            row.updated_at = Utc::now();
        }
        Ok(())
    }

    async fn soft_delete_message(&self, id: &str) -> DatabaseResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        let thread_id = match inner.messages.get_mut(id) {
            Some(row) if row.deleted_at.is_none() => {
                row.deleted_at = Some(Utc::now());
                row.thread_id.clone()
            }
            _ => return Ok(false),
        };
        if let Some(thread_id) = thread_id {
            if let Some(thread) = inner.threads.get_mut(&thread_id) {
                thread.message_count = (thread.message_count - 1).max(0);
            }
        }
        Ok(true)
    }

    async fn soft_delete_thread(&self, id: &str) -> DatabaseResult<bool> {
        let mut inner = self.inner.lock().unwrap();
        match inner.threads.get_mut(id) {
            Some(row) if row.deleted_at.is_none() => {
                row.deleted_at = Some(Utc::now());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn adjust_thread_message_count(
        &self,
        thread_id: &str,
        delta: i32,
    ) -> DatabaseResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(thread) = inner.threads.get_mut(thread_id) {
            thread.message_count = (thread.message_count + delta).max(0);
        }
        Ok(())
    }

    async fn touch_thread_activity(
        &self,
        thread_id: &str,
        at: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(thread) = inner.threads.get_mut(thread_id) {
            thread.last_activity_at = thread.last_activity_at.max(at);
        }
        Ok(())
    }

    async fn apply_reaction(
        &self,
        message_id: &str,
        emoji: &str,
        user_id: &str,
        added: bool,
    ) -> DatabaseResult<i32> {
        let mut inner = self.inner.lock().unwrap();
        let reactor = (
            message_id.to_string(),
            emoji.to_string(),
            user_id.to_string(),
        );
        let aggregate = (message_id.to_string(), emoji.to_string());

        if added {
            if inner.reactors.insert(reactor) {
                *inner.reactions.entry(aggregate).or_insert(0) += 1;
            }
        } else if inner.reactors.remove(&reactor) {
            if let Some(count) = inner.reactions.get_mut(&aggregate) {
                *count = (*count - 1).max(0);
            }
        }

        let total: i32 = inner
            .reactions
            .iter()
            .filter(|((m, _), _)| m == message_id)
            .map(|(_, count)| *count)
            .sum();
        if let Some(row) = inner.messages.get_mut(message_id) {
            row.reaction_count = total;
        }
        Ok(total)
    }

    async fn record_participant_message(
        &self,
        thread_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        let mut inner = self.inner.lock().unwrap();
        let key = (thread_id.to_string(), user_id.to_string());
        let first_sight = !inner.participants.contains_key(&key);
        let row = inner
            .participants
            .entry(key)
            .or_insert_with(|| ThreadParticipantRow {
                thread_id: thread_id.to_string(),
                user_id: user_id.to_string(),
                message_count: 0,
                last_message_at: at,
            });
        row.message_count += 1;
        row.last_message_at = row.last_message_at.max(at);
        if first_sight {
            if let Some(thread) = inner.threads.get_mut(thread_id) {
                thread.participant_count += 1;
            }
        }
        Ok(())
    }

    async fn get_participant(
        &self,
        thread_id: &str,
        user_id: &str,
    ) -> DatabaseResult<Option<ThreadParticipantRow>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .participants
            .get(&(thread_id.to_string(), user_id.to_string()))
            .cloned())
    }

    async fn thread_ids_for_server(&self, server_id: &str) -> DatabaseResult<Vec<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .threads
            .values()
            .filter(|t| t.server_id == server_id && t.deleted_at.is_none())
            .map(|t| t.id.clone())
            .collect())
    }

    async fn message_ids_for_thread(&self, thread_id: &str) -> DatabaseResult<Vec<String>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .messages
            .values()
            .filter(|m| m.thread_id.as_deref() == Some(thread_id) && m.deleted_at.is_none())
            .map(|m| m.id.clone())
            .collect())
    }

    async fn edits_for_message(&self, message_id: &str) -> DatabaseResult<Vec<MessageEditRow>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .edits
            .iter()
            .filter(|e| e.message_id == message_id)
            .cloned()
            .collect())
    }

    async fn open_sync_log(&self, server_id: &str, kind: SyncKind) -> DatabaseResult<i32> {
        let mut inner = self.inner.lock().unwrap();
        let id = inner.sync_logs.len() as i32 + 1;
        inner.sync_logs.push(SyncLogRow {
            id,
            server_id: server_id.to_string(),
            kind: kind.as_str().to_string(),
            status: SyncStatus::Started.as_str().to_string(),
            items_synced: 0,
            error_message: None,
            started_at: Utc::now(),
            completed_at: None,
        });
        Ok(id)
    }

    async fn close_sync_log(
        &self,
        id: i32,
        status: SyncStatus,
        items_synced: i32,
        error: Option<String>,
    ) -> DatabaseResult<()> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(row) = inner.sync_logs.iter_mut().find(|l| l.id == id) {
            row.status = status.as_str().to_string();
            row.items_synced = items_synced;
            row.error_message = error;
            row.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn recent_sync_logs(
        &self,
        server_id: Option<&str>,
        limit: i64,
    ) -> DatabaseResult<Vec<SyncLogRow>> {
        let inner = self.inner.lock().unwrap();
        let mut logs: Vec<SyncLogRow> = inner
            .sync_logs
            .iter()
            .filter(|l| server_id.is_none_or(|s| l.server_id == s))
            .cloned()
            .collect();
        logs.reverse();
        logs.truncate(limit as usize);
        Ok(logs)
    }
}

/// Notifier that records every notification it receives.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<(String, EventKind, serde_json::Value)>>,
}

impl RecordingNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<(String, EventKind, serde_json::Value)> {
        self.events.lock().unwrap().clone()
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|(_, event, _)| event.as_str())
            .collect()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, server_id: &str, event: EventKind, data: serde_json::Value) {
        self.events
            .lock()
            .unwrap()
            .push((server_id.to_string(), event, data));
    }
}

/// Fixed timestamp helper.
pub fn at(hour: u32, minute: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 14, hour, minute, 0).unwrap()
}

pub fn wire_user(id: &str) -> WireUser {
    WireUser {
        id: id.to_string(),
        username: format!("user-{id}"),
        display_name: None,
        avatar: None,
        bot: false,
    }
}

pub fn wire_channel(id: &str, server_id: &str) -> WireChannel {
    WireChannel {
        id: id.to_string(),
        server_id: server_id.to_string(),
        name: Some(format!("channel-{id}")),
        kind: "forum".to_string(),
        topic: None,
        position: None,
        parent_id: None,
        supports_threads: true,
    }
}

pub fn wire_thread(
    id: &str,
    server_id: &str,
    channel_id: &str,
    title: &str,
    created_at: DateTime<Utc>,
) -> WireThread {
    WireThread {
        id: id.to_string(),
        server_id: server_id.to_string(),
        channel_id: channel_id.to_string(),
        author: wire_user("U1"),
        title: title.to_string(),
        status: None,
        visibility: None,
        archived: false,
        locked: false,
        pinned: false,
        archived_at: None,
        created_at,
    }
}

pub fn wire_message(
    id: &str,
    server_id: &str,
    channel_id: &str,
    thread_id: Option<&str>,
    author_id: &str,
    content: &str,
    created_at: DateTime<Utc>,
) -> WireMessage {
    WireMessage {
        id: id.to_string(),
        thread_id: thread_id.map(|t| t.to_string()),
        channel_id: channel_id.to_string(),
        server_id: server_id.to_string(),
        author: wire_user(author_id),
        content: content.to_string(),
        reply_to_id: None,
        embeds: None,
        components: None,
        stickers: None,
        mention_ids: None,
        created_at,
        edited_at: None,
    }
}

/// Seed a server and one thread-capable channel.
pub async fn seed_server_and_channel(store: &MemoryMirrorStore, server_id: &str, channel_id: &str) {
    store
        .upsert_server(&NewServer {
            id: server_id.to_string(),
            name: format!("server-{server_id}"),
            icon: None,
            owner_id: None,
            description: None,
            member_count: None,
        })
        .await
        .unwrap();
    store
        .upsert_channel(&NewChannel {
            id: channel_id.to_string(),
            server_id: server_id.to_string(),
            name: Some(format!("channel-{channel_id}")),
            kind: "forum".to_string(),
            topic: None,
            position: None,
            parent_id: None,
        })
        .await
        .unwrap();
}
