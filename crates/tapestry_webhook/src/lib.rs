#![forbid(unsafe_code)]
#![warn(missing_docs)]
//! Signed webhook fanout for the chat mirror.
//!
//! When ingestion records an externally visible change, the
//! [`WebhookDispatcher`] signs the notification payload per subscriber and
//! POSTs it with bounded concurrency, retrying with exponential backoff.
//! Exhausted notifications land in a dead letter table and can be replayed
//! once by an operator; subscribers that keep failing are suspended
//! automatically.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tapestry_sync::EventKind;
//! use tapestry_webhook::{DispatcherConfig, PostgresWebhookStore, WebhookDispatcher};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let conn = tapestry_database::establish_connection()?;
//! let store = Arc::new(PostgresWebhookStore::new(conn));
//! let dispatcher = WebhookDispatcher::new(store, DispatcherConfig::default());
//! dispatcher
//!     .dispatch(
//!         "S1",
//!         EventKind::MessageCreated,
//!         serde_json::json!({"id": "M1"}),
//!     )
//!     .await?;
//! # Ok(())
//! # }
//! ```

mod dispatcher;
mod payload;
mod sign;
mod store;

pub use dispatcher::{DispatcherConfig, WebhookDispatcher, backoff_delay};
pub use payload::NotificationPayload;
pub use sign::{
    DELIVERY_HEADER, EVENT_HEADER, SIGNATURE_HEADER, signature_header, verify_signature,
};
pub use store::{PostgresWebhookStore, WebhookStore};
