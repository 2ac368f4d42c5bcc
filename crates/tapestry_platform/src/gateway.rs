//! The read interface the backfill engine consumes.

use crate::wire::{WireChannel, WireMessage, WireThread};
use async_trait::async_trait;
use tapestry_error::PlatformResult;

/// Default (and maximum) page size for listing endpoints.
pub const PAGE_SIZE: usize = 100;

/// Paginated read access to the external platform.
///
/// All listing calls take an opaque `before` cursor returned by the platform;
/// `None` starts from the newest items. A page shorter than [`PAGE_SIZE`]
/// means pagination is exhausted.
#[async_trait]
pub trait PlatformGateway: Send + Sync {
    /// Channels of a server that are capable of holding threads.
    async fn list_thread_channels(&self, server_id: &str) -> PlatformResult<Vec<WireChannel>>;

    /// One page of active (non-archived) threads in a channel.
    async fn list_active_threads(
        &self,
        channel_id: &str,
        before: Option<&str>,
    ) -> PlatformResult<Vec<WireThread>>;

    /// One page of archived threads in a channel.
    async fn list_archived_threads(
        &self,
        channel_id: &str,
        before: Option<&str>,
    ) -> PlatformResult<Vec<WireThread>>;

    /// One page of messages in a thread, newest first, older than `before`.
    async fn list_messages(
        &self,
        thread_id: &str,
        before: Option<&str>,
    ) -> PlatformResult<Vec<WireMessage>>;

    /// Page size this gateway returns; short pages terminate pagination.
    fn page_size(&self) -> usize {
        PAGE_SIZE
    }
}
