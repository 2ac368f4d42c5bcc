//! Persistence for subscriber registrations, delivery attempts, and dead
//! letters.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use diesel::prelude::*;
use std::sync::Arc;
use tapestry_database::schema::{webhook_dead_letters, webhook_deliveries, webhook_subscriptions};
use tapestry_database::{
    DeadLetterRow, DeliveryStatus, NewDeadLetter, NewDelivery, NewSubscription, SubscriptionRow,
};
use tapestry_error::DatabaseResult;
use tokio::sync::Mutex;
use tracing::instrument;

/// Storage operations the dispatcher needs.
///
/// Split out as a trait so delivery logic is testable against an in-memory
/// implementation.
#[async_trait]
pub trait WebhookStore: Send + Sync {
    /// Register a new subscriber. Returns the stored row.
    async fn create_subscription(&self, sub: &NewSubscription) -> DatabaseResult<SubscriptionRow>;

    /// Fetch one subscriber registration.
    async fn get_subscription(&self, id: i32) -> DatabaseResult<Option<SubscriptionRow>>;

    /// Active subscribers of a server whose event filter matches `event`.
    async fn subscriptions_for_event(
        &self,
        server_id: &str,
        event: &str,
    ) -> DatabaseResult<Vec<SubscriptionRow>>;

    /// Record the start of a delivery. Returns the delivery row id.
    async fn create_delivery(&self, delivery: &NewDelivery) -> DatabaseResult<i32>;

    /// Move a delivery to its terminal status.
    async fn finish_delivery(
        &self,
        id: i32,
        status: DeliveryStatus,
        response_code: Option<i32>,
        attempt_count: i32,
    ) -> DatabaseResult<()>;

    /// File a notification that exhausted its retries. Returns the dead
    /// letter id.
    async fn insert_dead_letter(&self, letter: &NewDeadLetter) -> DatabaseResult<i32>;

    /// Fetch one dead letter.
    async fn get_dead_letter(&self, id: i32) -> DatabaseResult<Option<DeadLetterRow>>;

    /// Stamp a dead letter as replayed. Replay is single-shot; callers check
    /// the stamp before sending.
    async fn mark_replayed(&self, id: i32, actor: &str, at: DateTime<Utc>)
    -> DatabaseResult<()>;

    /// Bump a subscriber's consecutive failure counter. Returns the new
    /// count.
    async fn record_failure(&self, subscription_id: i32) -> DatabaseResult<i32>;

    /// Clear a subscriber's consecutive failure counter after a success.
    async fn reset_failures(&self, subscription_id: i32) -> DatabaseResult<()>;

    /// Suspend a subscriber. Suspended subscribers receive nothing until
    /// reactivated out of band.
    async fn deactivate(&self, subscription_id: i32) -> DatabaseResult<()>;

    /// Record the last successful delivery time.
    async fn touch_triggered(&self, subscription_id: i32, at: DateTime<Utc>)
    -> DatabaseResult<()>;
}

/// PostgreSQL-backed [`WebhookStore`].
pub struct PostgresWebhookStore {
    conn: Arc<Mutex<PgConnection>>,
}

impl PostgresWebhookStore {
    /// Create a new Postgres webhook store.
    pub fn new(conn: PgConnection) -> Self {
        Self {
            conn: Arc::new(Mutex::new(conn)),
        }
    }

    /// Create a store from an Arc<Mutex<PgConnection>> (for sharing connections).
    pub fn from_arc(conn: Arc<Mutex<PgConnection>>) -> Self {
        Self { conn }
    }
}

#[async_trait]
impl WebhookStore for PostgresWebhookStore {
    #[instrument(skip(self, sub), fields(server_id = %sub.server_id, url = %sub.url))]
    async fn create_subscription(&self, sub: &NewSubscription) -> DatabaseResult<SubscriptionRow> {
        let mut conn = self.conn.lock().await;

        let row = diesel::insert_into(webhook_subscriptions::table)
            .values(sub)
            .get_result::<SubscriptionRow>(&mut *conn)?;

        Ok(row)
    }

    #[instrument(skip(self))]
    async fn get_subscription(&self, id: i32) -> DatabaseResult<Option<SubscriptionRow>> {
        let mut conn = self.conn.lock().await;

        let row = webhook_subscriptions::table
            .find(id)
            .first::<SubscriptionRow>(&mut *conn)
            .optional()?;

        Ok(row)
    }

    #[instrument(skip(self))]
    async fn subscriptions_for_event(
        &self,
        server_id: &str,
        event: &str,
    ) -> DatabaseResult<Vec<SubscriptionRow>> {
        let mut conn = self.conn.lock().await;

        // The event filter match (including the `*` wildcard) happens here
        // rather than in SQL; subscriber counts per server are small.
        let rows = webhook_subscriptions::table
            .filter(webhook_subscriptions::server_id.eq(server_id))
            .filter(webhook_subscriptions::active.eq(true))
            .load::<SubscriptionRow>(&mut *conn)?;

        Ok(rows.into_iter().filter(|sub| sub.wants(event)).collect())
    }

    #[instrument(skip(self, delivery), fields(subscription_id = delivery.subscription_id))]
    async fn create_delivery(&self, delivery: &NewDelivery) -> DatabaseResult<i32> {
        let mut conn = self.conn.lock().await;

        let id = diesel::insert_into(webhook_deliveries::table)
            .values(delivery)
            .returning(webhook_deliveries::id)
            .get_result::<i32>(&mut *conn)?;

        Ok(id)
    }

    #[instrument(skip(self))]
    async fn finish_delivery(
        &self,
        id: i32,
        status: DeliveryStatus,
        response_code: Option<i32>,
        attempt_count: i32,
    ) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        diesel::update(webhook_deliveries::table.find(id))
            .set((
                webhook_deliveries::status.eq(status.as_str()),
                webhook_deliveries::response_code.eq(response_code),
                webhook_deliveries::attempt_count.eq(attempt_count),
                webhook_deliveries::completed_at.eq(diesel::dsl::now),
            ))
            .execute(&mut *conn)?;

        Ok(())
    }

    #[instrument(skip(self, letter), fields(subscription_id = letter.subscription_id))]
    async fn insert_dead_letter(&self, letter: &NewDeadLetter) -> DatabaseResult<i32> {
        let mut conn = self.conn.lock().await;

        let id = diesel::insert_into(webhook_dead_letters::table)
            .values(letter)
            .returning(webhook_dead_letters::id)
            .get_result::<i32>(&mut *conn)?;

        Ok(id)
    }

    #[instrument(skip(self))]
    async fn get_dead_letter(&self, id: i32) -> DatabaseResult<Option<DeadLetterRow>> {
        let mut conn = self.conn.lock().await;

        let row = webhook_dead_letters::table
            .find(id)
            .first::<DeadLetterRow>(&mut *conn)
            .optional()?;

        Ok(row)
    }

    #[instrument(skip(self))]
    async fn mark_replayed(
        &self,
        id: i32,
        actor: &str,
        at: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        diesel::update(webhook_dead_letters::table.find(id))
            .set((
                webhook_dead_letters::replayed_at.eq(at),
                webhook_dead_letters::replayed_by.eq(actor),
            ))
            .execute(&mut *conn)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn record_failure(&self, subscription_id: i32) -> DatabaseResult<i32> {
        let mut conn = self.conn.lock().await;

        let count = diesel::update(webhook_subscriptions::table.find(subscription_id))
            .set((
                webhook_subscriptions::failure_count
                    .eq(webhook_subscriptions::failure_count + 1),
                webhook_subscriptions::updated_at.eq(diesel::dsl::now),
            ))
            .returning(webhook_subscriptions::failure_count)
            .get_result::<i32>(&mut *conn)?;

        Ok(count)
    }

    #[instrument(skip(self))]
    async fn reset_failures(&self, subscription_id: i32) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        diesel::update(webhook_subscriptions::table.find(subscription_id))
            .set((
                webhook_subscriptions::failure_count.eq(0),
                webhook_subscriptions::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut *conn)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn deactivate(&self, subscription_id: i32) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        diesel::update(webhook_subscriptions::table.find(subscription_id))
            .set((
                webhook_subscriptions::active.eq(false),
                webhook_subscriptions::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut *conn)?;

        Ok(())
    }

    #[instrument(skip(self))]
    async fn touch_triggered(
        &self,
        subscription_id: i32,
        at: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        let mut conn = self.conn.lock().await;

        diesel::update(webhook_subscriptions::table.find(subscription_id))
            .set((
                webhook_subscriptions::last_triggered_at.eq(at),
                webhook_subscriptions::updated_at.eq(diesel::dsl::now),
            ))
            .execute(&mut *conn)?;

        Ok(())
    }
}
