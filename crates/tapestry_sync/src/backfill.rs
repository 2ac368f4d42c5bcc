//! Bulk backfill of a server's history through the platform's read API.
//!
//! Backfill walks channels, then threads, then messages, writing through the
//! same normalization path as live ingestion so both converge to identical
//! records. It never notifies subscribers: historical records are not news.

use crate::ingest::Ingestor;
use crate::notify::NoopNotifier;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tapestry_database::{MirrorStore, SyncKind, SyncStatus};
use tapestry_error::{SyncError, SyncErrorKind, SyncResult};
use tapestry_platform::PlatformGateway;
use tracing::{info, instrument, warn};

/// How far back a backfill run reaches.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackfillMode {
    /// Walk every thread to its first message.
    Full,
    /// Stop paging a thread once messages older than the cutoff appear.
    Bounded {
        /// Oldest message creation time to mirror.
        cutoff: DateTime<Utc>,
    },
}

/// Counters for one completed backfill run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Sync log row recording this run.
    pub sync_log_id: i32,
    /// Channels discovered and upserted.
    pub channels: usize,
    /// Threads upserted (active and archived).
    pub threads: usize,
    /// Messages newly mirrored. Replays of already-mirrored ids don't count.
    pub messages: usize,
}

impl SyncReport {
    fn items(&self) -> i32 {
        (self.channels + self.threads + self.messages) as i32
    }
}

/// Walks a server's full history into the mirror store.
pub struct BackfillEngine {
    gateway: Arc<dyn PlatformGateway>,
    store: Arc<dyn MirrorStore>,
    ingestor: Ingestor,
}

impl BackfillEngine {
    /// Create an engine reading from `gateway` and writing through `store`.
    pub fn new(gateway: Arc<dyn PlatformGateway>, store: Arc<dyn MirrorStore>) -> Self {
        let ingestor = Ingestor::new(store.clone(), Arc::new(NoopNotifier));
        Self {
            gateway,
            store,
            ingestor,
        }
    }

    /// Run a backfill for one server.
    ///
    /// The run is recorded in the sync log: opened as started, closed as
    /// completed or failed. A gateway read failure aborts the run; a failure
    /// to store an individual item is logged and skipped.
    #[instrument(skip(self), fields(%server_id))]
    pub async fn run(&self, server_id: &str, mode: BackfillMode) -> SyncResult<SyncReport> {
        if self.store.get_server(server_id).await?.is_none() {
            return Err(SyncError::new(SyncErrorKind::UnknownServer(
                server_id.to_string(),
            )));
        }

        let sync_log_id = self.store.open_sync_log(server_id, SyncKind::Backfill).await?;
        let mut report = SyncReport {
            sync_log_id,
            ..SyncReport::default()
        };

        match self.sync_server(server_id, mode, &mut report).await {
            Ok(()) => {
                self.store
                    .close_sync_log(sync_log_id, SyncStatus::Completed, report.items(), None)
                    .await?;
                info!(
                    channels = report.channels,
                    threads = report.threads,
                    messages = report.messages,
                    "backfill completed"
                );
                Ok(report)
            }
            Err(e) => {
                if let Err(close_err) = self
                    .store
                    .close_sync_log(
                        sync_log_id,
                        SyncStatus::Failed,
                        report.items(),
                        Some(e.to_string()),
                    )
                    .await
                {
                    warn!(error = %close_err, "failed to record backfill failure");
                }
                Err(e)
            }
        }
    }

    async fn sync_server(
        &self,
        server_id: &str,
        mode: BackfillMode,
        report: &mut SyncReport,
    ) -> SyncResult<()> {
        let channels = self.gateway.list_thread_channels(server_id).await?;

        for channel in &channels {
            match self.ingestor.store_channel(channel).await {
                Ok(()) => report.channels += 1,
                Err(e) => {
                    warn!(channel_id = %channel.id, error = %e, "skipping channel");
                    continue;
                }
            }

            self.sync_channel_threads(&channel.id, mode, report, false)
                .await?;
            self.sync_channel_threads(&channel.id, mode, report, true)
                .await?;
        }

        Ok(())
    }

    async fn sync_channel_threads(
        &self,
        channel_id: &str,
        mode: BackfillMode,
        report: &mut SyncReport,
        archived: bool,
    ) -> SyncResult<()> {
        let page_size = self.gateway.page_size();
        let mut before: Option<String> = None;

        loop {
            let page = if archived {
                self.gateway
                    .list_archived_threads(channel_id, before.as_deref())
                    .await?
            } else {
                self.gateway
                    .list_active_threads(channel_id, before.as_deref())
                    .await?
            };
            let exhausted = page.len() < page_size;

            for thread in &page {
                match self.ingestor.store_thread(thread).await {
                    Ok(_) => report.threads += 1,
                    Err(e) => {
                        warn!(thread_id = %thread.id, error = %e, "skipping thread");
                        continue;
                    }
                }

                self.sync_thread_messages(&thread.id, mode, report).await?;
            }

            before = page.last().map(|thread| thread.id.clone());
            if exhausted {
                return Ok(());
            }
        }
    }

    async fn sync_thread_messages(
        &self,
        thread_id: &str,
        mode: BackfillMode,
        report: &mut SyncReport,
    ) -> SyncResult<()> {
        let page_size = self.gateway.page_size();
        let mut before: Option<String> = None;

        loop {
            let page = self
                .gateway
                .list_messages(thread_id, before.as_deref())
                .await?;
            let exhausted = page.len() < page_size;

            for message in &page {
                // Pages run newest to oldest, so the first message past the
                // cutoff ends the thread.
                if let BackfillMode::Bounded { cutoff } = mode {
                    if message.created_at < cutoff {
                        return Ok(());
                    }
                }

                match self.ingestor.store_message(message).await {
                    Ok(true) => report.messages += 1,
                    Ok(false) => {}
                    Err(e) => {
                        warn!(message_id = %message.id, error = %e, "skipping message")
                    }
                }
            }

            before = page.last().map(|message| message.id.clone());
            if exhausted {
                return Ok(());
            }
        }
    }
}
