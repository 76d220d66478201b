use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Server event normalised for display in a feed or toast.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationRecord {
    pub id: String,
    pub user_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub title: String,
    pub message: String,
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
    pub created_at: DateTime<Utc>,
}

/// Changes published by [`NotificationStore`](crate::notifications::NotificationStore).
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationEvent {
    /// The collection was replaced by a history batch of `count` records.
    HistoryLoaded { count: usize },
    /// A real-time notification was added (or replaced one with the same id).
    Received(NotificationRecord),
    Read { id: String },
    AllRead,
    Cleared,
}

/// Connection state of the notification channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionStatus {
    Idle,
    Connecting,
    Connected,
    /// Waiting before the next connection attempt.
    Reconnecting,
    /// Reconnection attempts exhausted or no credential available.
    Failed,
    Closed,
}
