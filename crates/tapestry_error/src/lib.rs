//! Error types for the Tapestry chat mirror.
//!
//! This crate provides the foundation error types used throughout the
//! Tapestry workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use tapestry_error::{TapestryResult, ConfigError};
//!
//! fn load() -> TapestryResult<String> {
//!     Err(ConfigError::new("missing platform token"))?
//! }
//!
//! match load() {
//!     Ok(v) => println!("loaded: {}", v),
//!     Err(e) => eprintln!("error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod config;
#[cfg(feature = "database")]
mod database;
mod error;
mod platform;
mod sync;
mod webhook;

pub use config::ConfigError;
#[cfg(feature = "database")]
pub use database::{DatabaseError, DatabaseErrorKind, DatabaseResult};
pub use error::{TapestryError, TapestryErrorKind, TapestryResult};
pub use platform::{PlatformError, PlatformErrorKind, PlatformResult};
pub use sync::{SyncError, SyncErrorKind, SyncResult};
pub use webhook::{WebhookError, WebhookErrorKind, WebhookResult};
