//! Seam between successful store writes and outbound notification.

use crate::event::EventKind;
use async_trait::async_trait;

/// Receives change notifications after a store write succeeds.
///
/// Implementations must return quickly and must never fail the caller: a
/// slow or broken notification path cannot be allowed to block or roll back
/// ingestion. The webhook dispatcher satisfies this by spawning bounded
/// background deliveries and swallowing (but logging) its own errors.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Announce one externally visible change.
    async fn notify(&self, server_id: &str, event: EventKind, data: serde_json::Value);
}

/// Notifier that drops everything; used by backfill, which deliberately
/// never announces historical records.
pub struct NoopNotifier;

#[async_trait]
impl Notifier for NoopNotifier {
    async fn notify(&self, _server_id: &str, _event: EventKind, _data: serde_json::Value) {}
}
