//! Webhook delivery error types.

/// Webhook error variants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum WebhookErrorKind {
    /// Delivery bookkeeping could not be persisted.
    #[display("Webhook store error: {}", _0)]
    Store(String),

    /// Payload could not be serialized.
    #[display("Payload serialization error: {}", _0)]
    Serialization(String),

    /// No dead letter exists with the given id.
    #[display("Dead letter not found: {}", _0)]
    DeadLetterNotFound(i32),

    /// The dead letter was already replayed; replay is single-shot.
    #[display("Dead letter {} already replayed", _0)]
    AlreadyReplayed(i32),

    /// The subscriber registration backing a delivery is gone.
    #[display("Subscription not found: {}", _0)]
    SubscriptionNotFound(i32),
}

/// Webhook error with source location tracking.
///
/// # Examples
///
/// ```
/// use tapestry_error::{WebhookError, WebhookErrorKind};
///
/// let err = WebhookError::new(WebhookErrorKind::AlreadyReplayed(7));
/// assert!(format!("{}", err).contains("already replayed"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Webhook Error: {} at line {} in {}", kind, line, file)]
pub struct WebhookError {
    /// The kind of error that occurred
    pub kind: WebhookErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl WebhookError {
    /// Create a new WebhookError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: WebhookErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Result type for webhook operations.
pub type WebhookResult<T> = std::result::Result<T, WebhookError>;

#[cfg(feature = "database")]
impl From<crate::DatabaseError> for WebhookError {
    #[track_caller]
    fn from(err: crate::DatabaseError) -> Self {
        WebhookError::new(WebhookErrorKind::Store(err.to_string()))
    }
}
