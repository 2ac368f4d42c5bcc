//! External platform API error types.

/// Platform API error variants.
///
/// Represents failures while reading from the external chat platform's
/// paginated REST API.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum PlatformErrorKind {
    /// Transport-level failure (connect, timeout, TLS).
    #[display("Platform request failed: {}", _0)]
    Request(String),

    /// Authentication rejected by the platform.
    #[display("Platform authentication failed")]
    Unauthorized,

    /// The platform throttled the request.
    #[display("Platform rate limit hit")]
    RateLimited,

    /// Requested entity does not exist upstream.
    #[display("Platform entity not found: {}", _0)]
    NotFound(String),

    /// Unexpected HTTP status.
    #[display("Platform returned status {}", _0)]
    Status(u16),

    /// Response body could not be decoded.
    #[display("Platform response decode error: {}", _0)]
    Decode(String),
}

/// Platform error with source location tracking.
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Platform Error: {} at line {} in {}", kind, line, file)]
pub struct PlatformError {
    /// The kind of error that occurred
    pub kind: PlatformErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl PlatformError {
    /// Create a new PlatformError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: PlatformErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Result type for platform API operations.
pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

#[cfg(feature = "http")]
impl From<reqwest::Error> for PlatformError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            PlatformError::new(PlatformErrorKind::Decode(err.to_string()))
        } else {
            PlatformError::new(PlatformErrorKind::Request(err.to_string()))
        }
    }
}
