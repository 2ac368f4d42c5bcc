#![forbid(unsafe_code)]
#![warn(missing_docs)]
//! Ingestion and backfill for the chat mirror.
//!
//! Live change events and bulk backfill share one normalization path into
//! the mirror store. Live ingestion announces externally visible changes
//! through a [`Notifier`]; backfill uses a no-op notifier and records its
//! runs in the sync log.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tapestry_database::PostgresMirrorStore;
//! use tapestry_platform::HttpPlatformClient;
//! use tapestry_sync::{BackfillEngine, BackfillMode};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let conn = tapestry_database::establish_connection()?;
//! let store = Arc::new(PostgresMirrorStore::new(conn));
//! let gateway = Arc::new(HttpPlatformClient::new(
//!     "https://chat.example.com/api",
//!     "token",
//! )?);
//! let engine = BackfillEngine::new(gateway, store);
//! let report = engine.run("S1", BackfillMode::Full).await?;
//! println!("mirrored {} messages", report.messages);
//! # Ok(())
//! # }
//! ```

mod backfill;
mod event;
mod ingest;
mod notify;
mod render;
mod slug;

pub use backfill::{BackfillEngine, BackfillMode, SyncReport};
pub use event::{ChangeEvent, EventKind};
pub use ingest::Ingestor;
pub use notify::{NoopNotifier, Notifier};
pub use render::{content_preview, escape_html, render_html};
pub use slug::{resolve_slug, slugify};
