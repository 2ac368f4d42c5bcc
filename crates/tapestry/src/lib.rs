#![forbid(unsafe_code)]
#![warn(missing_docs)]
//! Facade crate for the tapestry chat mirror.
//!
//! Re-exports the pieces the binary (and embedding applications) wire
//! together: the mirror store, the platform client, ingestion and backfill,
//! and the webhook dispatcher.

mod cli;
mod config;

pub use cli::{Cli, Commands};
pub use config::{PlatformConfig, TapestryConfig, WebhookConfig};

pub use tapestry_database::{
    MirrorStore, PostgresMirrorStore, establish_connection, run_migrations,
};
pub use tapestry_platform::{HttpPlatformClient, PlatformGateway};
pub use tapestry_sync::{BackfillEngine, BackfillMode, ChangeEvent, EventKind, Ingestor, Notifier};
pub use tapestry_webhook::{
    DispatcherConfig, PostgresWebhookStore, WebhookDispatcher, WebhookStore,
};
