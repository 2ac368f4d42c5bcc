//! Ingestion and backfill error types.

use crate::PlatformError;

/// Sync error variants.
///
/// Covers both live event ingestion and bulk backfill runs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum SyncErrorKind {
    /// The external platform could not be read.
    #[display("Platform error: {}", _0)]
    Platform(String),

    /// A store write failed.
    #[display("Store error: {}", _0)]
    Store(String),

    /// A backfill run was requested for a server with no mirrored record.
    #[display("Unknown server: {}", _0)]
    UnknownServer(String),

    /// The sync run itself could not be recorded.
    #[display("Sync log error: {}", _0)]
    SyncLog(String),
}

/// Sync error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Sync Error: {} at line {} in {}", kind, line, file)]
pub struct SyncError {
    /// The kind of error that occurred
    pub kind: SyncErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl SyncError {
    /// Create a new SyncError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: SyncErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Result type for sync operations.
pub type SyncResult<T> = std::result::Result<T, SyncError>;

impl From<PlatformError> for SyncError {
    #[track_caller]
    fn from(err: PlatformError) -> Self {
        SyncError::new(SyncErrorKind::Platform(err.to_string()))
    }
}

#[cfg(feature = "database")]
impl From<crate::DatabaseError> for SyncError {
    #[track_caller]
    fn from(err: crate::DatabaseError) -> Self {
        SyncError::new(SyncErrorKind::Store(err.to_string()))
    }
}
