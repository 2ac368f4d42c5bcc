//! Delivery engine: fans a notification out to matching subscribers with
//! bounded concurrency, retries with exponential backoff, dead letters, and
//! automatic suspension of persistently failing endpoints.

use crate::payload::NotificationPayload;
use crate::sign::{DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER, signature_header};
use crate::store::WebhookStore;
use async_trait::async_trait;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tapestry_database::{DeliveryStatus, NewDeadLetter, NewDelivery, SubscriptionRow};
use tapestry_error::{WebhookError, WebhookErrorKind, WebhookResult};
use tapestry_sync::{EventKind, Notifier};
use tokio::sync::{Semaphore, watch};
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Delivery tuning knobs.
#[derive(Debug, Clone, Copy)]
pub struct DispatcherConfig {
    /// Send attempts per notification before dead-lettering.
    pub max_attempts: u32,
    /// Delay after the first failed attempt; doubles per attempt.
    pub base_delay: Duration,
    /// Per-request timeout.
    pub request_timeout: Duration,
    /// Consecutive dead-lettered notifications before a subscriber is
    /// suspended.
    pub failure_threshold: i32,
    /// Maximum concurrent in-flight deliveries across all subscribers.
    pub max_in_flight: usize,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            max_attempts: 5,
            base_delay: Duration::from_secs(1),
            request_timeout: Duration::from_secs(30),
            failure_threshold: 10,
            max_in_flight: 32,
        }
    }
}

/// Delay after the `attempt`-th failed send (1-based): base, 2x, 4x, ...
pub fn backoff_delay(attempt: u32, base: Duration) -> Duration {
    base * 2u32.saturating_pow(attempt.saturating_sub(1))
}

/// Fans notifications out to webhook subscribers.
///
/// [`dispatch`](WebhookDispatcher::dispatch) returns as soon as the payload
/// is serialized and one background task per matching subscriber is spawned;
/// ingestion never waits on subscriber endpoints.
pub struct WebhookDispatcher {
    store: Arc<dyn WebhookStore>,
    client: reqwest::Client,
    config: DispatcherConfig,
    in_flight: Arc<Semaphore>,
    shutdown_tx: watch::Sender<bool>,
    shutdown_rx: watch::Receiver<bool>,
}

impl WebhookDispatcher {
    /// Create a dispatcher over the given store.
    pub fn new(store: Arc<dyn WebhookStore>, config: DispatcherConfig) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        Self {
            store,
            client: reqwest::Client::new(),
            config,
            in_flight: Arc::new(Semaphore::new(config.max_in_flight)),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Ask in-flight deliveries to stop at the next backoff boundary.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    /// Fan one notification out to every matching active subscriber.
    ///
    /// The payload is serialized exactly once; each subscriber's background
    /// task signs the same bytes with its own secret.
    #[instrument(skip(self, data), fields(%event))]
    pub async fn dispatch(
        &self,
        server_id: &str,
        event: EventKind,
        data: serde_json::Value,
    ) -> WebhookResult<()> {
        let subscribers = self
            .store
            .subscriptions_for_event(server_id, event.as_str())
            .await?;
        if subscribers.is_empty() {
            debug!("no matching subscribers");
            return Ok(());
        }

        let payload = NotificationPayload::new(server_id, event, data);
        let body: Arc<str> = serde_json::to_string(&payload)
            .map_err(|e| WebhookError::new(WebhookErrorKind::Serialization(e.to_string())))?
            .into();

        for subscriber in subscribers {
            let worker = self.worker();
            let body = body.clone();
            let in_flight = self.in_flight.clone();

            // The permit is acquired inside the task: a saturated delivery
            // pool queues the task without blocking the caller.
            tokio::spawn(async move {
                let Ok(_permit) = in_flight.acquire_owned().await else {
                    // Semaphore closed only during teardown.
                    return;
                };
                worker.deliver(&subscriber, event.as_str(), &body).await;
            });
        }

        Ok(())
    }

    /// Re-send a dead-lettered notification once, with a fresh signature and
    /// delivery id.
    ///
    /// Replay is single-shot: the letter is stamped as replayed whether or
    /// not the subscriber accepts it this time, and a second replay request
    /// fails with [`WebhookErrorKind::AlreadyReplayed`]. A successful replay
    /// does not reset the subscriber's consecutive failure counter; only
    /// regular deliveries do.
    ///
    /// Returns `true` when the subscriber accepted the payload.
    #[instrument(skip(self))]
    pub async fn replay(&self, dead_letter_id: i32, actor: &str) -> WebhookResult<bool> {
        let letter = self
            .store
            .get_dead_letter(dead_letter_id)
            .await?
            .ok_or_else(|| {
                WebhookError::new(WebhookErrorKind::DeadLetterNotFound(dead_letter_id))
            })?;

        if letter.replayed_at.is_some() {
            return Err(WebhookError::new(WebhookErrorKind::AlreadyReplayed(
                dead_letter_id,
            )));
        }

        let subscriber = self
            .store
            .get_subscription(letter.subscription_id)
            .await?
            .ok_or_else(|| {
                WebhookError::new(WebhookErrorKind::SubscriptionNotFound(
                    letter.subscription_id,
                ))
            })?;

        let worker = self.worker();
        let outcome = worker
            .send_once(&subscriber, &letter.event_type, &letter.payload)
            .await;

        self.store
            .mark_replayed(dead_letter_id, actor, Utc::now())
            .await?;

        let delivery_id = self
            .store
            .create_delivery(&NewDelivery {
                subscription_id: subscriber.id,
                event_type: letter.event_type.clone(),
                payload: letter.payload.clone(),
                status: DeliveryStatus::Pending.as_str().to_string(),
            })
            .await?;

        match outcome {
            Ok(code) => {
                self.store
                    .finish_delivery(delivery_id, DeliveryStatus::Success, Some(code as i32), 1)
                    .await?;
                info!(dead_letter_id, "replay delivered");
                Ok(true)
            }
            Err((reason, code)) => {
                self.store
                    .finish_delivery(delivery_id, DeliveryStatus::Failed, code, 1)
                    .await?;
                warn!(dead_letter_id, %reason, "replay failed");
                Ok(false)
            }
        }
    }

    fn worker(&self) -> DeliveryWorker {
        DeliveryWorker {
            store: self.store.clone(),
            client: self.client.clone(),
            config: self.config,
            shutdown: self.shutdown_rx.clone(),
        }
    }
}

#[async_trait]
impl Notifier for WebhookDispatcher {
    async fn notify(&self, server_id: &str, event: EventKind, data: serde_json::Value) {
        // Notification failures never propagate to ingestion.
        if let Err(e) = self.dispatch(server_id, event, data).await {
            warn!(%event, error = %e, "notification dispatch failed");
        }
    }
}

/// State one spawned delivery task needs.
struct DeliveryWorker {
    store: Arc<dyn WebhookStore>,
    client: reqwest::Client,
    config: DispatcherConfig,
    shutdown: watch::Receiver<bool>,
}

impl DeliveryWorker {
    /// Run the full retry loop for one subscriber and one payload.
    async fn deliver(mut self, subscriber: &SubscriptionRow, event: &str, body: &str) {
        let delivery_id = match self
            .store
            .create_delivery(&NewDelivery {
                subscription_id: subscriber.id,
                event_type: event.to_string(),
                payload: body.to_string(),
                status: DeliveryStatus::Pending.as_str().to_string(),
            })
            .await
        {
            Ok(id) => id,
            Err(e) => {
                warn!(subscription_id = subscriber.id, error = %e,
                    "could not record delivery, dropping");
                return;
            }
        };

        let mut last_error = String::new();
        let mut last_status: Option<i32> = None;

        for attempt in 1..=self.config.max_attempts {
            match self.send_once(subscriber, event, body).await {
                Ok(code) => {
                    self.finish(delivery_id, DeliveryStatus::Success, Some(code as i32), attempt)
                        .await;
                    if let Err(e) = self.store.reset_failures(subscriber.id).await {
                        warn!(subscription_id = subscriber.id, error = %e,
                            "failed to reset failure counter");
                    }
                    if let Err(e) = self.store.touch_triggered(subscriber.id, Utc::now()).await {
                        warn!(subscription_id = subscriber.id, error = %e,
                            "failed to record trigger time");
                    }
                    debug!(subscription_id = subscriber.id, attempt, "delivered");
                    return;
                }
                Err((reason, code)) => {
                    warn!(subscription_id = subscriber.id, attempt, %reason, "delivery attempt failed");
                    last_error = reason;
                    last_status = code;
                }
            }

            if attempt < self.config.max_attempts {
                let delay = backoff_delay(attempt, self.config.base_delay);
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    changed = self.shutdown.changed() => {
                        if changed.is_err() || *self.shutdown.borrow() {
                            self.finish(delivery_id, DeliveryStatus::Failed, last_status, attempt)
                                .await;
                            debug!(subscription_id = subscriber.id, "delivery abandoned on shutdown");
                            return;
                        }
                    }
                }
            }
        }

        self.finish(
            delivery_id,
            DeliveryStatus::Failed,
            last_status,
            self.config.max_attempts,
        )
        .await;
        self.dead_letter(subscriber, event, body, last_error, last_status)
            .await;
    }

    /// Exhausted retries: file a dead letter and bump the failure counter,
    /// suspending the subscriber past the threshold.
    async fn dead_letter(
        &self,
        subscriber: &SubscriptionRow,
        event: &str,
        body: &str,
        last_error: String,
        last_status: Option<i32>,
    ) {
        if let Err(e) = self
            .store
            .insert_dead_letter(&NewDeadLetter {
                subscription_id: subscriber.id,
                event_type: event.to_string(),
                payload: body.to_string(),
                last_error,
                last_status_code: last_status,
                attempt_count: self.config.max_attempts as i32,
            })
            .await
        {
            warn!(subscription_id = subscriber.id, error = %e, "failed to file dead letter");
        }

        match self.store.record_failure(subscriber.id).await {
            Ok(failures) if failures >= self.config.failure_threshold => {
                if let Err(e) = self.store.deactivate(subscriber.id).await {
                    warn!(subscription_id = subscriber.id, error = %e,
                        "failed to suspend subscriber");
                } else {
                    warn!(
                        subscription_id = subscriber.id,
                        failures, "subscriber suspended after consecutive failures"
                    );
                }
            }
            Ok(failures) => {
                info!(
                    subscription_id = subscriber.id,
                    failures, "notification dead-lettered"
                );
            }
            Err(e) => {
                warn!(subscription_id = subscriber.id, error = %e,
                    "failed to record delivery failure");
            }
        }
    }

    /// One signed POST. A 2xx response is success; anything else, including
    /// transport errors and timeouts, is a failed attempt.
    async fn send_once(
        &self,
        subscriber: &SubscriptionRow,
        event: &str,
        body: &str,
    ) -> Result<u16, (String, Option<i32>)> {
        let result = self
            .client
            .post(&subscriber.url)
            .timeout(self.config.request_timeout)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .header(SIGNATURE_HEADER, signature_header(&subscriber.secret, body))
            .header(EVENT_HEADER, event)
            .header(DELIVERY_HEADER, Uuid::new_v4().to_string())
            .body(body.to_string())
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => Ok(response.status().as_u16()),
            Ok(response) => Err((
                format!("subscriber returned {}", response.status()),
                Some(response.status().as_u16() as i32),
            )),
            Err(e) => Err((e.to_string(), None)),
        }
    }

    async fn finish(
        &self,
        delivery_id: i32,
        status: DeliveryStatus,
        response_code: Option<i32>,
        attempts: u32,
    ) {
        if let Err(e) = self
            .store
            .finish_delivery(delivery_id, status, response_code, attempts as i32)
            .await
        {
            warn!(delivery_id, error = %e, "failed to finalize delivery record");
        }
    }
}
