//! Ingestion handlers: one per external event kind.
//!
//! Each handler normalizes a platform event into store writes and, when the
//! writes succeed and represent an externally visible change, emits exactly
//! one notification. Events for entities whose parent is not yet mirrored
//! are dropped, not queued; a parent-creation event or a backfill will bring
//! them in later.

use crate::event::{ChangeEvent, EventKind};
use crate::notify::Notifier;
use crate::render::{content_preview, render_html};
use crate::slug::resolve_slug;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use tapestry_database::{
    MirrorStore, NewChannel, NewMessage, NewThread, NewUser, ThreadStatus, Visibility,
};
use tapestry_error::SyncResult;
use tapestry_platform::{WireChannel, WireMessage, WireReaction, WireThread, WireUser};
use tracing::{debug, instrument, warn};

/// What a thread upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ThreadOutcome {
    /// The thread was not mirrored before.
    Created,
    /// The thread already existed and was merged.
    Updated,
    /// The owning channel is unknown locally; the event was dropped.
    Dropped,
}

/// Applies platform change events to the mirror store.
pub struct Ingestor {
    store: Arc<dyn MirrorStore>,
    notifier: Arc<dyn Notifier>,
}

impl Ingestor {
    /// Create an ingestor writing through the given store and announcing
    /// changes through the given notifier.
    pub fn new(store: Arc<dyn MirrorStore>, notifier: Arc<dyn Notifier>) -> Self {
        Self { store, notifier }
    }

    /// Route one live event to its handler.
    pub async fn apply(&self, event: ChangeEvent) -> SyncResult<()> {
        match event {
            ChangeEvent::MessageCreated(message) => self.message_created(&message).await,
            ChangeEvent::MessageUpdated(message) => self.message_updated(&message).await,
            ChangeEvent::MessageDeleted {
                server_id,
                message_id,
            } => self.message_deleted(&server_id, &message_id).await,
            ChangeEvent::MessageBulkDeleted {
                server_id,
                message_ids,
            } => self.message_bulk_deleted(&server_id, &message_ids).await,
            ChangeEvent::ReactionAdded(reaction) => self.reaction_added(&reaction).await,
            ChangeEvent::ReactionRemoved(reaction) => self.reaction_removed(&reaction).await,
            ChangeEvent::ThreadCreated(thread) => self.thread_created(&thread).await,
            ChangeEvent::ThreadUpdated(thread) => self.thread_updated(&thread).await,
            ChangeEvent::ThreadDeleted {
                server_id,
                thread_id,
            } => self.thread_deleted(&server_id, &thread_id).await,
        }
    }

    /// Handle a message-create event.
    #[instrument(skip(self, message), fields(message_id = %message.id, server_id = %message.server_id))]
    pub async fn message_created(&self, message: &WireMessage) -> SyncResult<()> {
        let inserted = self.store_message(message).await?;
        if !inserted {
            return Ok(());
        }

        self.notifier
            .notify(
                &message.server_id,
                EventKind::MessageCreated,
                json!({
                    "id": message.id,
                    "threadId": message.thread_id,
                    "channelId": message.channel_id,
                    "authorId": message.author.id,
                    "contentPreview": content_preview(&message.content),
                }),
            )
            .await;

        Ok(())
    }

    /// Handle a message-edit event.
    #[instrument(skip(self, message), fields(message_id = %message.id, server_id = %message.server_id))]
    pub async fn message_updated(&self, message: &WireMessage) -> SyncResult<()> {
        let Some(existing) = self.store.get_message(&message.id).await? else {
            debug!("dropping edit for unknown message");
            return Ok(());
        };

        // Replayed edit: the content is already current.
        if existing.content == message.content {
            return Ok(());
        }

        let edited_at = message.edited_at.unwrap_or_else(Utc::now);
        self.store
            .apply_edit(
                &message.id,
                &existing.content,
                &message.content,
                &render_html(&message.content),
                edited_at,
            )
            .await?;

        self.notifier
            .notify(
                &message.server_id,
                EventKind::MessageUpdated,
                json!({
                    "id": message.id,
                    "threadId": message.thread_id,
                    "channelId": message.channel_id,
                    "editCount": existing.edit_count + 1,
                }),
            )
            .await;

        Ok(())
    }

    /// Handle a message-delete event. Unknown or already-deleted ids are a
    /// no-op and emit nothing.
    #[instrument(skip(self))]
    pub async fn message_deleted(&self, server_id: &str, message_id: &str) -> SyncResult<()> {
        let transitioned = self.store.soft_delete_message(message_id).await?;
        if !transitioned {
            return Ok(());
        }

        self.notifier
            .notify(
                server_id,
                EventKind::MessageDeleted,
                json!({ "id": message_id }),
            )
            .await;

        Ok(())
    }

    /// Handle a bulk-delete event. Each id is soft-deleted independently;
    /// unknown ids are skipped and never fail the batch.
    #[instrument(skip(self, message_ids), fields(batch = message_ids.len()))]
    pub async fn message_bulk_deleted(
        &self,
        server_id: &str,
        message_ids: &[String],
    ) -> SyncResult<()> {
        let mut deleted = Vec::with_capacity(message_ids.len());

        for message_id in message_ids {
            match self.store.soft_delete_message(message_id).await {
                Ok(true) => deleted.push(message_id.clone()),
                Ok(false) => debug!(%message_id, "bulk delete: unknown message, skipping"),
                Err(e) => warn!(%message_id, error = %e, "bulk delete: item failed, skipping"),
            }
        }

        if deleted.is_empty() {
            return Ok(());
        }

        self.notifier
            .notify(
                server_id,
                EventKind::MessageBulkDeleted,
                json!({ "ids": deleted }),
            )
            .await;

        Ok(())
    }

    /// Handle a reaction-add event.
    #[instrument(skip(self, reaction), fields(message_id = %reaction.message_id))]
    pub async fn reaction_added(&self, reaction: &WireReaction) -> SyncResult<()> {
        self.apply_reaction_event(reaction, true, EventKind::ReactionAdded)
            .await
    }

    /// Handle a reaction-remove event.
    #[instrument(skip(self, reaction), fields(message_id = %reaction.message_id))]
    pub async fn reaction_removed(&self, reaction: &WireReaction) -> SyncResult<()> {
        self.apply_reaction_event(reaction, false, EventKind::ReactionRemoved)
            .await
    }

    async fn apply_reaction_event(
        &self,
        reaction: &WireReaction,
        added: bool,
        event: EventKind,
    ) -> SyncResult<()> {
        if self.store.get_message(&reaction.message_id).await?.is_none() {
            debug!("dropping reaction for unknown message");
            return Ok(());
        }

        let total = self
            .store
            .apply_reaction(
                &reaction.message_id,
                &reaction.emoji,
                &reaction.user_id,
                added,
            )
            .await?;

        self.notifier
            .notify(
                &reaction.server_id,
                event,
                json!({
                    "messageId": reaction.message_id,
                    "emoji": reaction.emoji,
                    "userId": reaction.user_id,
                    "count": total,
                }),
            )
            .await;

        Ok(())
    }

    /// Handle a thread-create event.
    #[instrument(skip(self, thread), fields(thread_id = %thread.id, server_id = %thread.server_id))]
    pub async fn thread_created(&self, thread: &WireThread) -> SyncResult<()> {
        self.thread_upserted(thread, EventKind::ThreadCreated).await
    }

    /// Handle a thread-update event. An update for an unknown thread is
    /// treated as a create; the upsert path is shared.
    #[instrument(skip(self, thread), fields(thread_id = %thread.id, server_id = %thread.server_id))]
    pub async fn thread_updated(&self, thread: &WireThread) -> SyncResult<()> {
        self.thread_upserted(thread, EventKind::ThreadUpdated).await
    }

    async fn thread_upserted(&self, thread: &WireThread, event: EventKind) -> SyncResult<()> {
        let outcome = self.store_thread(thread).await?;
        if outcome == ThreadOutcome::Dropped {
            return Ok(());
        }

        self.notifier
            .notify(
                &thread.server_id,
                event,
                json!({
                    "id": thread.id,
                    "channelId": thread.channel_id,
                    "title": thread.title,
                }),
            )
            .await;

        Ok(())
    }

    /// Handle a thread-delete event.
    #[instrument(skip(self))]
    pub async fn thread_deleted(&self, server_id: &str, thread_id: &str) -> SyncResult<()> {
        let transitioned = self.store.soft_delete_thread(thread_id).await?;
        if !transitioned {
            return Ok(());
        }

        self.notifier
            .notify(
                server_id,
                EventKind::ThreadDeleted,
                json!({ "id": thread_id }),
            )
            .await;

        Ok(())
    }

    /// Normalize and store a thread. Shared by live events and backfill so
    /// both converge to the same record.
    pub(crate) async fn store_thread(&self, thread: &WireThread) -> SyncResult<ThreadOutcome> {
        if self
            .store
            .get_channel(&thread.channel_id)
            .await?
            .is_none()
        {
            debug!(thread_id = %thread.id, channel_id = %thread.channel_id,
                "dropping thread for unknown channel");
            return Ok(ThreadOutcome::Dropped);
        }

        // Author before thread: referential invariants.
        self.store.upsert_user(&new_user(&thread.author)).await?;

        let existing = self.store.get_thread(&thread.id).await?;
        let slug = match &existing {
            Some(row) if row.title == thread.title => row.slug.clone(),
            other => {
                resolve_slug(
                    &self.store,
                    &thread.server_id,
                    &thread.title,
                    other.as_ref().map(|row| row.slug.as_str()),
                )
                .await?
            }
        };

        let status = ThreadStatus::parse(thread.status.as_deref().unwrap_or("open"));
        let visibility = Visibility::parse(thread.visibility.as_deref().unwrap_or("public"));

        self.store
            .upsert_thread(&NewThread {
                id: thread.id.clone(),
                server_id: thread.server_id.clone(),
                channel_id: thread.channel_id.clone(),
                author_id: thread.author.id.clone(),
                title: thread.title.clone(),
                slug,
                status: status.as_str().to_string(),
                visibility: visibility.as_str().to_string(),
                archived: thread.archived,
                locked: thread.locked,
                pinned: thread.pinned,
                archived_at: thread.archived_at,
                last_activity_at: thread.created_at,
                created_at: thread.created_at,
            })
            .await?;

        Ok(if existing.is_some() {
            ThreadOutcome::Updated
        } else {
            ThreadOutcome::Created
        })
    }

    /// Normalize and store a message. Returns `true` only when a new row was
    /// created, in which case the owning thread's counters were updated.
    /// Shared by live events and backfill.
    pub(crate) async fn store_message(&self, message: &WireMessage) -> SyncResult<bool> {
        match &message.thread_id {
            Some(thread_id) => {
                if self.store.get_thread(thread_id).await?.is_none() {
                    debug!(message_id = %message.id, %thread_id,
                        "dropping message for unknown thread");
                    return Ok(false);
                }
            }
            None => {
                if self
                    .store
                    .get_channel(&message.channel_id)
                    .await?
                    .is_none()
                {
                    debug!(message_id = %message.id, channel_id = %message.channel_id,
                        "dropping message for unknown channel");
                    return Ok(false);
                }
            }
        }

        self.store.upsert_user(&new_user(&message.author)).await?;

        let inserted = self
            .store
            .insert_message(&NewMessage {
                id: message.id.clone(),
                thread_id: message.thread_id.clone(),
                channel_id: message.channel_id.clone(),
                server_id: message.server_id.clone(),
                author_id: message.author.id.clone(),
                content: message.content.clone(),
                content_html: render_html(&message.content),
                reply_to_id: message.reply_to_id.clone(),
                embeds: message.embeds.clone(),
                components: message.components.clone(),
                stickers: message.stickers.clone(),
                mention_ids: message.mention_ids.clone(),
                created_at: message.created_at,
            })
            .await?;

        if inserted {
            if let Some(thread_id) = &message.thread_id {
                self.store.adjust_thread_message_count(thread_id, 1).await?;
                self.store
                    .touch_thread_activity(thread_id, message.created_at)
                    .await?;
                self.store
                    .record_participant_message(thread_id, &message.author.id, message.created_at)
                    .await?;
            }
        }

        Ok(inserted)
    }

    /// Normalize and store a channel record (backfill discovery path).
    pub(crate) async fn store_channel(&self, channel: &WireChannel) -> SyncResult<()> {
        self.store
            .upsert_channel(&NewChannel {
                id: channel.id.clone(),
                server_id: channel.server_id.clone(),
                name: channel.name.clone(),
                kind: channel.kind.clone(),
                topic: channel.topic.clone(),
                position: channel.position,
                parent_id: channel.parent_id.clone(),
            })
            .await?;
        Ok(())
    }
}

fn new_user(user: &WireUser) -> NewUser {
    NewUser {
        id: user.id.clone(),
        username: user.username.clone(),
        display_name: user.display_name.clone(),
        avatar: user.avatar.clone(),
        bot: user.bot,
    }
}
