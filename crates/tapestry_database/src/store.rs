//! Idempotent write primitives over the mirror schema.
//!
//! Ingestion handlers and the backfill engine both write through the
//! [`MirrorStore`] trait. Every operation is either a single statement or a
//! transaction, so a constraint violation never partially applies; callers
//! treat it as a hard failure for that one unit of work and move on.

use crate::models::{
    ChannelRow, MessageEditRow, MessageRow, NewChannel, NewMessage, NewMessageEdit, NewServer,
    NewThread, NewUser, ServerRow, SyncKind, SyncLogRow, SyncStatus, ThreadParticipantRow,
    ThreadRow,
};
use crate::schema::{
    channels, message_edits, message_reactions, messages, reaction_users, servers, sync_logs,
    thread_participants, threads, users,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::dsl::sql;
use diesel::pg::PgConnection;
use diesel::prelude::*;
use diesel::sql_types::{Integer, Timestamptz};
use std::sync::Arc;
use tapestry_error::DatabaseResult;
use tokio::sync::Mutex;
use tracing::instrument;

/// Write primitives over the five mirrored entity families plus counters and
/// sync-run bookkeeping.
///
/// All upserts are idempotent: repeating a call with identical input changes
/// nothing beyond the `updated_at` refresh. Counter adjustments are atomic
/// and clamped at zero on decrement.
#[async_trait]
pub trait MirrorStore: Send + Sync {
    /// Insert or merge a server record.
    async fn upsert_server(&self, server: &NewServer) -> DatabaseResult<()>;

    /// Insert or merge a user record.
    async fn upsert_user(&self, user: &NewUser) -> DatabaseResult<()>;

    /// Insert or merge a channel record.
    async fn upsert_channel(&self, channel: &NewChannel) -> DatabaseResult<()>;

    /// Insert or merge a thread record. Counters are never touched here.
    async fn upsert_thread(&self, thread: &NewThread) -> DatabaseResult<()>;

    /// Fetch a server by external id.
    async fn get_server(&self, id: &str) -> DatabaseResult<Option<ServerRow>>;

    /// Fetch a channel by external id.
    async fn get_channel(&self, id: &str) -> DatabaseResult<Option<ChannelRow>>;

    /// Fetch a thread by external id.
    async fn get_thread(&self, id: &str) -> DatabaseResult<Option<ThreadRow>>;

    /// Fetch a message by external id.
    async fn get_message(&self, id: &str) -> DatabaseResult<Option<MessageRow>>;

    /// Whether a slug is already taken within a server.
    async fn thread_slug_exists(&self, server_id: &str, slug: &str) -> DatabaseResult<bool>;

    /// Insert a message if absent. Returns `true` when a new row was created,
    /// `false` when the id was already mirrored (replayed event).
    async fn insert_message(&self, message: &NewMessage) -> DatabaseResult<bool>;

    /// Record an edit: append the previous content to the edit history, then
    /// overwrite the content and bump the edit counter.
    async fn apply_edit(
        &self,
        message_id: &str,
        previous_content: &str,
        content: &str,
        content_html: &str,
        edited_at: DateTime<Utc>,
    ) -> DatabaseResult<()>;

    /// Soft-delete a message. Returns `true` if the row transitioned to
    /// deleted (and the owning thread's counter was decremented), `false` if
    /// it was unknown or already deleted.
    async fn soft_delete_message(&self, id: &str) -> DatabaseResult<bool>;

    /// Soft-delete a thread. Returns `true` if the row transitioned.
    async fn soft_delete_thread(&self, id: &str) -> DatabaseResult<bool>;

    /// Atomically adjust a thread's message counter, clamped at zero.
    async fn adjust_thread_message_count(&self, thread_id: &str, delta: i32)
    -> DatabaseResult<()>;

    /// Move a thread's last-activity timestamp forward (never backward).
    async fn touch_thread_activity(
        &self,
        thread_id: &str,
        at: DateTime<Utc>,
    ) -> DatabaseResult<()>;

    /// Apply a reaction add or remove for one reactor, maintaining the
    /// per-(message, emoji) aggregate and the reactor side table, then
    /// recompute the message's total reaction counter. Returns the new total.
    async fn apply_reaction(
        &self,
        message_id: &str,
        emoji: &str,
        user_id: &str,
        added: bool,
    ) -> DatabaseResult<i32>;

    /// Update the per-(thread, user) participation rollup for one message
    /// create, bumping the thread's participant counter on first sight.
    async fn record_participant_message(
        &self,
        thread_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> DatabaseResult<()>;

    /// Fetch one participant rollup row.
    async fn get_participant(
        &self,
        thread_id: &str,
        user_id: &str,
    ) -> DatabaseResult<Option<ThreadParticipantRow>>;

    /// Ids of all non-deleted threads mirrored for a server.
    async fn thread_ids_for_server(&self, server_id: &str) -> DatabaseResult<Vec<String>>;

    /// Ids of all non-deleted messages in a thread.
    async fn message_ids_for_thread(&self, thread_id: &str) -> DatabaseResult<Vec<String>>;

    /// Edit history for a message, oldest first.
    async fn edits_for_message(&self, message_id: &str) -> DatabaseResult<Vec<MessageEditRow>>;

    /// Open a sync run record and return its id.
    async fn open_sync_log(&self, server_id: &str, kind: SyncKind) -> DatabaseResult<i32>;

    /// Move a sync run to its terminal status. The row is never deleted.
    async fn close_sync_log(
        &self,
        id: i32,
        status: SyncStatus,
        items_synced: i32,
        error: Option<String>,
    ) -> DatabaseResult<()>;

    /// Most recent sync runs, newest first.
    async fn recent_sync_logs(
        &self,
        server_id: Option<&str>,
        limit: i64,
    ) -> DatabaseResult<Vec<SyncLogRow>>;
}

/// PostgreSQL implementation of [`MirrorStore`] using Diesel.
///
/// # Example
/// ```no_run
/// use tapestry_database::{PostgresMirrorStore, establish_connection};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let conn = establish_connection()?;
///     let store = PostgresMirrorStore::new(conn);
///     Ok(())
/// }
/// ```
pub struct PostgresMirrorStore {
    /// Database connection wrapped in Arc<Mutex> for async safety.
    ///
    /// Note: This is a simple implementation. For production use with high
    /// concurrency, consider using a connection pool like r2d2 or deadpool.
    conn: Arc<Mutex<PgConnection>>,
}

impl PostgresMirrorStore {
    /// Create a new Postgres mirror store.
    pub fn new(conn: PgConnection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Create a store from an Arc<Mutex<PgConnection>> (for sharing connections).
    pub fn from_arc(conn: Arc<Mutex<PgConnection>>) -> Self {
        Self { conn }
    }

    /// Clone the shared connection handle.
    pub fn connection(&self) -> Arc<Mutex<PgConnection>> {
        self.conn.clone()
    }
}

#[async_trait]
impl MirrorStore for PostgresMirrorStore {
    #[instrument(skip(self), fields(server_id = %server.id))]
    async fn upsert_server(&self, server: &NewServer) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        diesel::insert_into(servers::table)
            .values(server)
            .on_conflict(servers::id)
            .do_update()
            .set((
                servers::name.eq(&server.name),
                servers::icon.eq(&server.icon),
                servers::owner_id.eq(&server.owner_id),
                servers::description.eq(&server.description),
                servers::member_count.eq(server.member_count),
                servers::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut *conn)?;

        Ok(())
    }

    #[instrument(skip(self), fields(user_id = %user.id))]
    async fn upsert_user(&self, user: &NewUser) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        diesel::insert_into(users::table)
            .values(user)
            .on_conflict(users::id)
            .do_update()
            .set((
                users::username.eq(&user.username),
                users::display_name.eq(&user.display_name),
                users::avatar.eq(&user.avatar),
                users::last_seen_at.eq(diesel::dsl::now),
                users::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut *conn)?;

        Ok(())
    }

    #[instrument(skip(self), fields(channel_id = %channel.id))]
    async fn upsert_channel(&self, channel: &NewChannel) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        diesel::insert_into(channels::table)
            .values(channel)
            .on_conflict(channels::id)
            .do_update()
            .set((
                channels::name.eq(&channel.name),
                channels::kind.eq(&channel.kind),
                channels::topic.eq(&channel.topic),
                channels::position.eq(channel.position),
                channels::parent_id.eq(&channel.parent_id),
                channels::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut *conn)?;

        Ok(())
    }

    #[instrument(skip(self), fields(thread_id = %thread.id))]
    async fn upsert_thread(&self, thread: &NewThread) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        // Counters and last_activity_at are owned by their dedicated
        // operations; the merge must not regress them.
        diesel::insert_into(threads::table)
            .values(thread)
            .on_conflict(threads::id)
            .do_update()
            .set((
                threads::title.eq(&thread.title),
                threads::slug.eq(&thread.slug),
                threads::status.eq(&thread.status),
                threads::visibility.eq(&thread.visibility),
                threads::archived.eq(thread.archived),
                threads::locked.eq(thread.locked),
                threads::pinned.eq(thread.pinned),
                threads::archived_at.eq(thread.archived_at),
                threads::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut *conn)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_server(&self, id: &str) -> DatabaseResult<Option<ServerRow>> {
        let mut conn = self.conn.lock().await;

        servers::table
            .find(id)
            .first(&mut *conn)
            .optional()
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn get_channel(&self, id: &str) -> DatabaseResult<Option<ChannelRow>> {
        let mut conn = self.conn.lock().await;

        channels::table
            .find(id)
            .first(&mut *conn)
            .optional()
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn get_thread(&self, id: &str) -> DatabaseResult<Option<ThreadRow>> {
        let mut conn = self.conn.lock().await;

        threads::table
            .find(id)
            .first(&mut *conn)
            .optional()
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn get_message(&self, id: &str) -> DatabaseResult<Option<MessageRow>> {
        let mut conn = self.conn.lock().await;

        messages::table
            .find(id)
            .first(&mut *conn)
            .optional()
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn thread_slug_exists(&self, server_id: &str, slug: &str) -> DatabaseResult<bool> {
        let mut conn = self.conn.lock().await;

        let count: i64 = threads::table
            .filter(threads::server_id.eq(server_id))
            .filter(threads::slug.eq(slug))
            .count()
            .get_result(&mut *conn)?;

        Ok(count > 0)
    }

    #[instrument(skip(self, message), fields(message_id = %message.id))]
    async fn insert_message(&self, message: &NewMessage) -> DatabaseResult<bool> {
        let mut conn = self.conn.lock().await;

        // DO NOTHING on conflict keeps replays order-tolerant: a second
        // create event for a known id must not regress later edits.
        let inserted = diesel::insert_into(messages::table)
            .values(message)
            .on_conflict(messages::id)
            .do_nothing()
            .execute(&mut *conn)?;

        Ok(inserted == 1)
    }

    #[instrument(skip(self, previous_content, content, content_html))]
    async fn apply_edit(
        &self,
        message_id: &str,
        previous_content: &str,
        content: &str,
        content_html: &str,
        edited_at: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            diesel::insert_into(message_edits::table)
                .values(&NewMessageEdit {
                    message_id: message_id.to_string(),
                    previous_content: previous_content.to_string(),
                    edited_at,
                })
                .execute(conn)?;

            diesel::update(messages::table.find(message_id))
                .set((
                    messages::content.eq(content),
                    messages::content_html.eq(content_html),
                    messages::edited.eq(true),
                    messages::edit_count.eq(messages::edit_count + 1),
                    messages::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn)?;

            Ok(())
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn soft_delete_message(&self, id: &str) -> DatabaseResult<bool> {
        let mut conn = self.conn.lock().await;

        let transitioned = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let thread_id: Option<Option<String>> = diesel::update(
                messages::table
                    .filter(messages::id.eq(id))
                    .filter(messages::deleted_at.is_null()),
            )
            .set((
                messages::deleted_at.eq(diesel::dsl::now),
                messages::updated_at.eq(diesel::dsl::now),
            ))
            .returning(messages::thread_id)
            .get_result(conn)
            .optional()?;

            match thread_id {
                None => Ok(false),
                Some(owner) => {
                    if let Some(thread_id) = owner {
                        diesel::update(threads::table.find(&thread_id))
                            .set((
                                threads::message_count.eq(sql::<Integer>(
                                    "GREATEST(message_count - 1, 0)",
                                )),
                                threads::updated_at.eq(diesel::dsl::now),
                            ))
                            .execute(conn)?;
                    }
                    Ok(true)
                }
            }
        })?;

        Ok(transitioned)
    }

    #[instrument(skip(self))]
    async fn soft_delete_thread(&self, id: &str) -> DatabaseResult<bool> {
        let mut conn = self.conn.lock().await;

        let updated = diesel::update(
            threads::table
                .filter(threads::id.eq(id))
                .filter(threads::deleted_at.is_null()),
        )
        .set((
            threads::deleted_at.eq(diesel::dsl::now),
            threads::updated_at.eq(diesel::dsl::now),
        ))
        .execute(&mut *conn)?;

        Ok(updated == 1)
    }

    #[instrument(skip(self))]
    async fn adjust_thread_message_count(
        &self,
        thread_id: &str,
        delta: i32,
    ) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        diesel::update(threads::table.find(thread_id))
            .set((
                threads::message_count.eq(sql::<Integer>("GREATEST(message_count + ")
                    .bind::<Integer, _>(delta)
                    .sql(", 0)")),
                threads::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut *conn)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn touch_thread_activity(
        &self,
        thread_id: &str,
        at: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        diesel::update(threads::table.find(thread_id))
            .set(
                threads::last_activity_at.eq(sql::<Timestamptz>("GREATEST(last_activity_at, ")
                    .bind::<Timestamptz, _>(at)
                    .sql(")")),
            )
            .execute(&mut *conn)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn apply_reaction(
        &self,
        message_id: &str,
        emoji: &str,
        user_id: &str,
        added: bool,
    ) -> DatabaseResult<i32> {
        let mut conn = self.conn.lock().await;

        let total = conn.transaction::<_, diesel::result::Error, _>(|conn| {
            if added {
                let new_reactor = diesel::insert_into(reaction_users::table)
                    .values((
                        reaction_users::message_id.eq(message_id),
                        reaction_users::emoji.eq(emoji),
                        reaction_users::user_id.eq(user_id),
                    ))
                    .on_conflict((
                        reaction_users::message_id,
                        reaction_users::emoji,
                        reaction_users::user_id,
                    ))
                    .do_nothing()
                    .execute(conn)?;

                if new_reactor == 1 {
                    diesel::insert_into(message_reactions::table)
                        .values((
                            message_reactions::message_id.eq(message_id),
                            message_reactions::emoji.eq(emoji),
                            message_reactions::count.eq(1),
                        ))
                        .on_conflict((
                            message_reactions::message_id,
                            message_reactions::emoji,
                        ))
                        .do_update()
                        .set((
                            message_reactions::count.eq(message_reactions::count + 1),
                            message_reactions::updated_at.eq(diesel::dsl::now),
                        ))
                        .execute(conn)?;
                }
            } else {
                let removed = diesel::delete(
                    reaction_users::table
                        .filter(reaction_users::message_id.eq(message_id))
                        .filter(reaction_users::emoji.eq(emoji))
                        .filter(reaction_users::user_id.eq(user_id)),
                )
                .execute(conn)?;

                if removed == 1 {
                    diesel::update(
                        message_reactions::table
                            .filter(message_reactions::message_id.eq(message_id))
                            .filter(message_reactions::emoji.eq(emoji)),
                    )
                    .set((
                        message_reactions::count.eq(sql::<Integer>("GREATEST(count - 1, 0)")),
                        message_reactions::updated_at.eq(diesel::dsl::now),
                    ))
                    .execute(conn)?;
                }
            }

            // The message total is always the sum of the aggregate rows.
            let total: Option<i64> = message_reactions::table
                .filter(message_reactions::message_id.eq(message_id))
                .select(diesel::dsl::sum(message_reactions::count))
                .first(conn)?;
            let total = total.unwrap_or(0) as i32;

            diesel::update(messages::table.find(message_id))
                .set((
                    messages::reaction_count.eq(total),
                    messages::updated_at.eq(diesel::dsl::now),
                ))
                .execute(conn)?;

            Ok(total)
        })?;

        Ok(total)
    }

    #[instrument(skip(self))]
    async fn record_participant_message(
        &self,
        thread_id: &str,
        user_id: &str,
        at: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        conn.transaction::<_, diesel::result::Error, _>(|conn| {
            let first_message = diesel::insert_into(thread_participants::table)
                .values((
                    thread_participants::thread_id.eq(thread_id),
                    thread_participants::user_id.eq(user_id),
                    thread_participants::message_count.eq(1),
                    thread_participants::last_message_at.eq(at),
                ))
                .on_conflict((
                    thread_participants::thread_id,
                    thread_participants::user_id,
                ))
                .do_nothing()
                .execute(conn)?;

            if first_message == 1 {
                diesel::update(threads::table.find(thread_id))
                    .set(threads::participant_count.eq(threads::participant_count + 1))
                    .execute(conn)?;
            } else {
                diesel::update(
                    thread_participants::table
                        .filter(thread_participants::thread_id.eq(thread_id))
                        .filter(thread_participants::user_id.eq(user_id)),
                )
                .set((
                    thread_participants::message_count
                        .eq(thread_participants::message_count + 1),
                    thread_participants::last_message_at.eq(sql::<Timestamptz>(
                        "GREATEST(last_message_at, ",
                    )
                    .bind::<Timestamptz, _>(at)
                    .sql(")")),
                ))
                .execute(conn)?;
            }

            Ok(())
        })?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn get_participant(
        &self,
        thread_id: &str,
        user_id: &str,
    ) -> DatabaseResult<Option<ThreadParticipantRow>> {
        let mut conn = self.conn.lock().await;

        thread_participants::table
            .filter(thread_participants::thread_id.eq(thread_id))
            .filter(thread_participants::user_id.eq(user_id))
            .first(&mut *conn)
            .optional()
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn thread_ids_for_server(&self, server_id: &str) -> DatabaseResult<Vec<String>> {
        let mut conn = self.conn.lock().await;

        threads::table
            .filter(threads::server_id.eq(server_id))
            .filter(threads::deleted_at.is_null())
            .select(threads::id)
            .order(threads::created_at.asc())
            .load(&mut *conn)
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn message_ids_for_thread(&self, thread_id: &str) -> DatabaseResult<Vec<String>> {
        let mut conn = self.conn.lock().await;

        messages::table
            .filter(messages::thread_id.eq(thread_id))
            .filter(messages::deleted_at.is_null())
            .select(messages::id)
            .order(messages::created_at.asc())
            .load(&mut *conn)
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn edits_for_message(&self, message_id: &str) -> DatabaseResult<Vec<MessageEditRow>> {
        let mut conn = self.conn.lock().await;

        message_edits::table
            .filter(message_edits::message_id.eq(message_id))
            .order(message_edits::edited_at.asc())
            .load(&mut *conn)
            .map_err(Into::into)
    }

    #[instrument(skip(self))]
    async fn open_sync_log(&self, server_id: &str, kind: SyncKind) -> DatabaseResult<i32> {
        let mut conn = self.conn.lock().await;

        diesel::insert_into(sync_logs::table)
            .values((
                sync_logs::server_id.eq(server_id),
                sync_logs::kind.eq(kind.as_str()),
                sync_logs::status.eq(SyncStatus::Started.as_str()),
            ))
            .returning(sync_logs::id)
            .get_result(&mut *conn)
            .map_err(Into::into)
    }

    #[instrument(skip(self, error))]
    async fn close_sync_log(
        &self,
        id: i32,
        status: SyncStatus,
        items_synced: i32,
        error: Option<String>,
    ) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        diesel::update(sync_logs::table.find(id))
            .set((
                sync_logs::status.eq(status.as_str()),
                sync_logs::items_synced.eq(items_synced),
                sync_logs::error_message.eq(error),
                sync_logs::completed_at.eq(diesel::dsl::now),
            ))
            .execute(&mut *conn)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn recent_sync_logs(
        &self,
        server_id: Option<&str>,
        limit: i64,
    ) -> DatabaseResult<Vec<SyncLogRow>> {
        let mut conn = self.conn.lock().await;

        let mut query = sync_logs::table.into_boxed();
        if let Some(server_id) = server_id {
            query = query.filter(sync_logs::server_id.eq(server_id.to_string()));
        }

        query
            .order(sync_logs::started_at.desc())
            .limit(limit)
            .load(&mut *conn)
            .map_err(Into::into)
    }
}
