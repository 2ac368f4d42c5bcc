#![allow(dead_code)]
//! In-memory webhook store and a minimal stub HTTP endpoint.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tapestry_database::{
    DeadLetterRow, DeliveryRow, DeliveryStatus, NewDeadLetter, NewDelivery, NewSubscription,
    SubscriptionRow,
};
use tapestry_error::DatabaseResult;
use tapestry_webhook::WebhookStore;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;

#[derive(Default)]
struct Inner {
    subscriptions: HashMap<i32, SubscriptionRow>,
    deliveries: HashMap<i32, DeliveryRow>,
    dead_letters: HashMap<i32, DeadLetterRow>,
    next_subscription: i32,
    next_delivery: i32,
    next_dead_letter: i32,
}

/// Hash-map implementation of [`WebhookStore`].
#[derive(Default)]
pub struct MemoryWebhookStore {
    inner: Mutex<Inner>,
}

impl MemoryWebhookStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_subscription(
        &self,
        server_id: &str,
        url: &str,
        secret: &str,
        events: &[&str],
    ) -> i32 {
        let mut inner = self.inner.lock().unwrap();
        inner.next_subscription += 1;
        let id = inner.next_subscription;
        let now = Utc::now();
        inner.subscriptions.insert(
            id,
            SubscriptionRow {
                id,
                server_id: server_id.to_string(),
                url: url.to_string(),
                secret: secret.to_string(),
                events: events.iter().map(|e| e.to_string()).collect(),
                active: true,
                failure_count: 0,
                last_triggered_at: None,
                created_at: now,
                updated_at: now,
            },
        );
        id
    }

    pub fn set_failure_count(&self, id: i32, count: i32) {
        if let Some(sub) = self.inner.lock().unwrap().subscriptions.get_mut(&id) {
            sub.failure_count = count;
        }
    }

    pub fn add_dead_letter(&self, subscription_id: i32, event: &str, payload: &str) -> i32 {
        let mut inner = self.inner.lock().unwrap();
        inner.next_dead_letter += 1;
        let id = inner.next_dead_letter;
        inner.dead_letters.insert(
            id,
            DeadLetterRow {
                id,
                subscription_id,
                event_type: event.to_string(),
                payload: payload.to_string(),
                last_error: "subscriber returned 500".to_string(),
                last_status_code: Some(500),
                attempt_count: 5,
                created_at: Utc::now(),
                replayed_at: None,
                replayed_by: None,
            },
        );
        id
    }

    pub fn subscription(&self, id: i32) -> Option<SubscriptionRow> {
        self.inner.lock().unwrap().subscriptions.get(&id).cloned()
    }

    pub fn deliveries(&self) -> Vec<DeliveryRow> {
        let mut rows: Vec<_> = self
            .inner
            .lock()
            .unwrap()
            .deliveries
            .values()
            .cloned()
            .collect();
        rows.sort_by_key(|d| d.id);
        rows
    }

    pub fn dead_letters(&self) -> Vec<DeadLetterRow> {
        let mut rows: Vec<_> = self
            .inner
            .lock()
            .unwrap()
            .dead_letters
            .values()
            .cloned()
            .collect();
        rows.sort_by_key(|d| d.id);
        rows
    }
}

#[async_trait]
impl WebhookStore for MemoryWebhookStore {
    async fn create_subscription(&self, sub: &NewSubscription) -> DatabaseResult<SubscriptionRow> {
        let id = self.add_subscription(
            &sub.server_id,
            &sub.url,
            &sub.secret,
            &sub.events.iter().map(|e| e.as_str()).collect::<Vec<_>>(),
        );
        Ok(self.subscription(id).unwrap())
    }

    async fn get_subscription(&self, id: i32) -> DatabaseResult<Option<SubscriptionRow>> {
        Ok(self.subscription(id))
    }

    async fn subscriptions_for_event(
        &self,
        server_id: &str,
        event: &str,
    ) -> DatabaseResult<Vec<SubscriptionRow>> {
        Ok(self
            .inner
            .lock()
            .unwrap()
            .subscriptions
            .values()
            .filter(|s| s.server_id == server_id && s.active && s.wants(event))
            .cloned()
            .collect())
    }

    async fn create_delivery(&self, delivery: &NewDelivery) -> DatabaseResult<i32> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_delivery += 1;
        let id = inner.next_delivery;
        inner.deliveries.insert(
            id,
            DeliveryRow {
                id,
                subscription_id: delivery.subscription_id,
                event_type: delivery.event_type.clone(),
                payload: delivery.payload.clone(),
                status: delivery.status.clone(),
                response_code: None,
                attempt_count: 0,
                created_at: Utc::now(),
                completed_at: None,
            },
        );
        Ok(id)
    }

    async fn finish_delivery(
        &self,
        id: i32,
        status: DeliveryStatus,
        response_code: Option<i32>,
        attempt_count: i32,
    ) -> DatabaseResult<()> {
        if let Some(row) = self.inner.lock().unwrap().deliveries.get_mut(&id) {
            row.status = status.as_str().to_string();
            row.response_code = response_code;
            row.attempt_count = attempt_count;
            row.completed_at = Some(Utc::now());
        }
        Ok(())
    }

    async fn insert_dead_letter(&self, letter: &NewDeadLetter) -> DatabaseResult<i32> {
        let mut inner = self.inner.lock().unwrap();
        inner.next_dead_letter += 1;
        let id = inner.next_dead_letter;
        inner.dead_letters.insert(
            id,
            DeadLetterRow {
                id,
                subscription_id: letter.subscription_id,
                event_type: letter.event_type.clone(),
                payload: letter.payload.clone(),
                last_error: letter.last_error.clone(),
                last_status_code: letter.last_status_code,
                attempt_count: letter.attempt_count,
                created_at: Utc::now(),
                replayed_at: None,
                replayed_by: None,
            },
        );
        Ok(id)
    }

    async fn get_dead_letter(&self, id: i32) -> DatabaseResult<Option<DeadLetterRow>> {
        Ok(self.inner.lock().unwrap().dead_letters.get(&id).cloned())
    }

    async fn mark_replayed(
        &self,
        id: i32,
        actor: &str,
        at: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        if let Some(row) = self.inner.lock().unwrap().dead_letters.get_mut(&id) {
            row.replayed_at = Some(at);
            row.replayed_by = Some(actor.to_string());
        }
        Ok(())
    }

    async fn record_failure(&self, subscription_id: i32) -> DatabaseResult<i32> {
        let mut inner = self.inner.lock().unwrap();
        let sub = inner.subscriptions.get_mut(&subscription_id).unwrap();
        sub.failure_count += 1;
        Ok(sub.failure_count)
    }

    async fn reset_failures(&self, subscription_id: i32) -> DatabaseResult<()> {
        if let Some(sub) = self.inner.lock().unwrap().subscriptions.get_mut(&subscription_id) {
            sub.failure_count = 0;
        }
        Ok(())
    }

    async fn deactivate(&self, subscription_id: i32) -> DatabaseResult<()> {
        if let Some(sub) = self.inner.lock().unwrap().subscriptions.get_mut(&subscription_id) {
            sub.active = false;
        }
        Ok(())
    }

    async fn touch_triggered(
        &self,
        subscription_id: i32,
        at: DateTime<Utc>,
    ) -> DatabaseResult<()> {
        if let Some(sub) = self.inner.lock().unwrap().subscriptions.get_mut(&subscription_id) {
            sub.last_triggered_at = Some(at);
        }
        Ok(())
    }
}

/// One request a stub endpoint received.
#[derive(Debug, Clone)]
pub struct Received {
    pub headers: HashMap<String, String>,
    pub body: String,
}

/// Minimal HTTP endpoint answering each request with the next status in
/// `statuses` (the last one repeats).
pub struct StubServer {
    pub url: String,
    requests: Arc<Mutex<Vec<Received>>>,
}

impl StubServer {
    pub async fn start(statuses: Vec<u16>) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let requests: Arc<Mutex<Vec<Received>>> = Arc::default();

        let recorded = requests.clone();
        tokio::spawn(async move {
            let mut served = 0usize;
            loop {
                let Ok((mut socket, _)) = listener.accept().await else {
                    return;
                };

                let mut buf = Vec::new();
                let mut chunk = [0u8; 1024];
                let request = loop {
                    let Ok(n) = socket.read(&mut chunk).await else {
                        break None;
                    };
                    if n == 0 {
                        break None;
                    }
                    buf.extend_from_slice(&chunk[..n]);
                    if let Some(parsed) = parse_request(&buf) {
                        break Some(parsed);
                    }
                };

                let Some(received) = request else { continue };
                recorded.lock().unwrap().push(received);

                let status = statuses[served.min(statuses.len() - 1)];
                served += 1;
                let response =
                    format!("HTTP/1.1 {status} X\r\ncontent-length: 0\r\nconnection: close\r\n\r\n");
                let _ = socket.write_all(response.as_bytes()).await;
                let _ = socket.shutdown().await;
            }
        });

        Self {
            url: format!("http://{addr}/hook"),
            requests,
        }
    }

    pub fn requests(&self) -> Vec<Received> {
        self.requests.lock().unwrap().clone()
    }
}

/// Parse a complete HTTP/1.1 request out of `buf`, if all bytes arrived.
fn parse_request(buf: &[u8]) -> Option<Received> {
    let text = String::from_utf8_lossy(buf);
    let header_end = text.find("\r\n\r\n")?;
    let head = &text[..header_end];

    let mut headers = HashMap::new();
    for line in head.lines().skip(1) {
        if let Some((name, value)) = line.split_once(':') {
            headers.insert(name.trim().to_lowercase(), value.trim().to_string());
        }
    }

    let content_length: usize = headers
        .get("content-length")
        .and_then(|v| v.parse().ok())
        .unwrap_or(0);
    let body_start = header_end + 4;
    if buf.len() < body_start + content_length {
        return None;
    }
    let body = String::from_utf8_lossy(&buf[body_start..body_start + content_length]).to_string();

    Some(Received { headers, body })
}

/// Poll until `check` passes or a couple of seconds elapse.
pub async fn wait_until(check: impl Fn() -> bool) {
    for _ in 0..400 {
        if check() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not met within 2s");
}
