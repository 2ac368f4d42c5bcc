//! Change event types flowing from the platform's live feed.

use serde::{Deserialize, Serialize};
use tapestry_platform::{WireMessage, WireReaction, WireThread};

/// Notification event names, as sent to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A new message was mirrored.
    MessageCreated,
    /// A mirrored message's content changed.
    MessageUpdated,
    /// A mirrored message was soft-deleted.
    MessageDeleted,
    /// Several messages were soft-deleted at once.
    MessageBulkDeleted,
    /// A reaction was added to a message.
    ReactionAdded,
    /// A reaction was removed from a message.
    ReactionRemoved,
    /// A new thread was mirrored.
    ThreadCreated,
    /// A mirrored thread's metadata changed.
    ThreadUpdated,
    /// A mirrored thread was soft-deleted.
    ThreadDeleted,
}

impl EventKind {
    /// Wire name of the event, used in payloads and subscription filters.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::MessageCreated => "message.created",
            EventKind::MessageUpdated => "message.updated",
            EventKind::MessageDeleted => "message.deleted",
            EventKind::MessageBulkDeleted => "message.bulk_deleted",
            EventKind::ReactionAdded => "reaction.added",
            EventKind::ReactionRemoved => "reaction.removed",
            EventKind::ThreadCreated => "thread.created",
            EventKind::ThreadUpdated => "thread.updated",
            EventKind::ThreadDeleted => "thread.deleted",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One event from the platform's live change feed.
///
/// Delivery is at-least-once and without strict global ordering; every
/// handler is written to tolerate replays and late arrivals.
#[derive(Debug, Clone)]
pub enum ChangeEvent {
    /// A message was posted.
    MessageCreated(WireMessage),
    /// A message was edited.
    MessageUpdated(WireMessage),
    /// A message was deleted.
    MessageDeleted {
        /// Owning server.
        server_id: String,
        /// External message id.
        message_id: String,
    },
    /// A batch of messages was deleted.
    MessageBulkDeleted {
        /// Owning server.
        server_id: String,
        /// External message ids; unknown ids are skipped individually.
        message_ids: Vec<String>,
    },
    /// A reaction was added.
    ReactionAdded(WireReaction),
    /// A reaction was removed.
    ReactionRemoved(WireReaction),
    /// A thread was created.
    ThreadCreated(WireThread),
    /// A thread's metadata changed.
    ThreadUpdated(WireThread),
    /// A thread was deleted.
    ThreadDeleted {
        /// Owning server.
        server_id: String,
        /// External thread id.
        thread_id: String,
    },
}
