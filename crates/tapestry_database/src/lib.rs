#![forbid(unsafe_code)]
#![warn(missing_docs)]
//! PostgreSQL mirror store for Tapestry.
//!
//! This crate provides the diesel schema, row models, and the store layer
//! used by ingestion and backfill: a [`MirrorStore`] trait with a
//! [`PostgresMirrorStore`] implementation.
//!
//! # Example
//!
//! ```rust,ignore
//! use tapestry_database::{establish_connection, PostgresMirrorStore, MirrorStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let conn = establish_connection()?;
//! let store = PostgresMirrorStore::new(conn);
//! // Use store.upsert_thread(), store.insert_message(), etc.
//! # Ok(())
//! # }
//! ```

mod connection;
mod models;
mod store;

// Public module for repository implementations in dependent crates
pub mod schema;

pub use connection::{MIGRATIONS, establish_connection, run_migrations};
pub use models::{
    ChannelRow, DeadLetterRow, DeliveryRow, DeliveryStatus, MessageEditRow, MessageRow,
    NewChannel, NewDeadLetter, NewDelivery, NewMessage, NewMessageEdit, NewServer,
    NewSubscription, NewThread, NewUser, ServerRow, SubscriptionRow, SyncKind, SyncLogRow,
    SyncStatus, ThreadParticipantRow, ThreadRow, ThreadStatus, Visibility,
};
pub use store::{MirrorStore, PostgresMirrorStore};
