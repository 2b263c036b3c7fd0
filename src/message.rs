//! Message types and status bookkeeping for the queue tables.
//!
//! Messages are enqueued by an external producer and worked off by external
//! consumers; this crate only rereads them. A message's lifecycle is tracked
//! in a separate status table, one row per transition, and the latest row is
//! treated as the current status.
//!
//! # Message Lifecycle
//!
//! 1. Messages are stored with a `New` status row
//! 2. Workers move them through `InProgress` to `Complete`
//! 3. Failures surface as `RetryRequired` or `Error`
//! 4. Cleanup marks consumed messages `ToBeDeleted`
//!
//! The reprocessing engine only ever writes `Complete`; every other
//! transition belongs to the external queue workers.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::prelude::FromRow;

/// Lifecycle stage of a queued message.
///
/// The numeric codes are stable and shared with the external queue workers;
/// they are what the status table actually stores. Codes outside the known
/// set are rendered as `?` rather than rejected.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
pub enum MessageStatus {
    #[serde(rename = "new")]
    #[strum(serialize = "New")]
    New = 0,
    #[serde(rename = "in_progress")]
    #[strum(serialize = "In progress")]
    InProgress = 1,
    #[serde(rename = "complete")]
    #[strum(serialize = "Completed")]
    Complete = 2,
    #[serde(rename = "retry_required")]
    #[strum(serialize = "Retry required")]
    RetryRequired = 3,
    #[serde(rename = "error")]
    #[strum(serialize = "Error")]
    Error = 4,
    #[serde(rename = "to_be_deleted")]
    #[strum(serialize = "To be deleted")]
    ToBeDeleted = 5,
}

impl MessageStatus {
    pub fn code(self) -> i64 {
        self as i64
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            0 => Some(Self::New),
            1 => Some(Self::InProgress),
            2 => Some(Self::Complete),
            3 => Some(Self::RetryRequired),
            4 => Some(Self::Error),
            5 => Some(Self::ToBeDeleted),
            _ => None,
        }
    }

    /// Display label for a raw status code, `?` for anything unrecognized.
    pub fn label(code: i64) -> String {
        match Self::from_code(code) {
            Some(status) => status.to_string(),
            None => "?".to_owned(),
        }
    }
}

/// A stored queue message.
///
/// Read-only from the engine's perspective: the id joins against the status
/// table and the body is an opaque serialized payload owned by the producer.
#[derive(Serialize, Deserialize, FromRow, Debug, Clone)]
pub struct QueueMessage {
    pub id: i64,
    pub topic_name: String,
    pub body: String,
}

/// One row of the status report join.
///
/// Left-join semantics: a message that never got a status row still appears,
/// with no status and no timestamp.
#[derive(Serialize, Deserialize, FromRow, Debug)]
pub struct StatusRow {
    pub id: i64,
    pub topic_name: String,
    pub status: Option<i64>,
    pub updated_at: Option<DateTime<Utc>>,
}

/// Filter criteria for a replay or report run.
///
/// Both filters AND together; with neither set, every stored message is
/// selected. Empty strings count as absent, and the id filter is bound into
/// the query as-is, so unknown or non-numeric ids simply match nothing.
#[derive(Debug, Clone, Default)]
pub struct ReplaySelection {
    pub message_id: Option<String>,
    pub topic_name: Option<String>,
    pub force: bool,
}

impl ReplaySelection {
    pub fn new(message_id: Option<String>, topic_name: Option<String>, force: bool) -> Self {
        Self {
            message_id: message_id.filter(|id| !id.is_empty()),
            topic_name: topic_name.filter(|topic| !topic.is_empty()),
            force,
        }
    }

    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_topic(topic: impl Into<String>) -> Self {
        Self::new(None, Some(topic.into()), false)
    }

    pub fn for_message(id: impl Into<String>) -> Self {
        Self::new(Some(id.into()), None, false)
    }

    pub fn forced(mut self) -> Self {
        self.force = true;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_labels() {
        let test_cases = vec![
            (0, "New"),
            (1, "In progress"),
            (2, "Completed"),
            (3, "Retry required"),
            (4, "Error"),
            (5, "To be deleted"),
            (99, "?"),
            (-1, "?"),
        ];

        for (code, expected) in test_cases {
            assert_eq!(MessageStatus::label(code), expected, "code {}", code);
        }
    }

    #[test]
    fn test_status_codes_roundtrip() {
        for status in [
            MessageStatus::New,
            MessageStatus::InProgress,
            MessageStatus::Complete,
            MessageStatus::RetryRequired,
            MessageStatus::Error,
            MessageStatus::ToBeDeleted,
        ] {
            assert_eq!(MessageStatus::from_code(status.code()), Some(status));
        }
    }

    #[test]
    fn test_empty_filters_are_absent() {
        let selection = ReplaySelection::new(Some("".to_owned()), Some("".to_owned()), false);
        assert!(selection.message_id.is_none());
        assert!(selection.topic_name.is_none());

        let selection = ReplaySelection::new(Some("42".to_owned()), None, true);
        assert_eq!(selection.message_id.as_deref(), Some("42"));
        assert!(selection.force);
    }
}
