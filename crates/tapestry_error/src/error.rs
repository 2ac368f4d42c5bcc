//! Top-level error wrapper types.

use crate::{ConfigError, PlatformError, SyncError, WebhookError};

#[cfg(feature = "database")]
use crate::DatabaseError;

/// Foundation error enum for the Tapestry workspace.
///
/// # Examples
///
/// ```
/// use tapestry_error::{TapestryError, ConfigError};
///
/// let cfg_err = ConfigError::new("missing token");
/// let err: TapestryError = cfg_err.into();
/// assert!(format!("{}", err).contains("Configuration Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum TapestryErrorKind {
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// External platform API error
    #[from(PlatformError)]
    Platform(PlatformError),
    /// Ingestion/backfill error
    #[from(SyncError)]
    Sync(SyncError),
    /// Webhook delivery error
    #[from(WebhookError)]
    Webhook(WebhookError),
    /// Database error
    #[cfg(feature = "database")]
    #[from(DatabaseError)]
    Database(DatabaseError),
}

/// Tapestry error with kind discrimination.
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Tapestry Error: {}", _0)]
pub struct TapestryError(Box<TapestryErrorKind>);

impl TapestryError {
    /// Create a new error from a kind.
    pub fn new(kind: TapestryErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &TapestryErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to TapestryErrorKind
impl<T> From<T> for TapestryError
where
    T: Into<TapestryErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Tapestry operations.
///
/// # Examples
///
/// ```
/// use tapestry_error::{TapestryResult, ConfigError};
///
/// fn load_config() -> TapestryResult<()> {
///     Err(ConfigError::new("no config file"))?
/// }
/// ```
pub type TapestryResult<T> = std::result::Result<T, TapestryError>;
