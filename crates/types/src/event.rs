//! Progress events pushed over the realtime channel.

use serde::{Deserialize, Serialize};

/// Kind of a progress event. Serialized as the `type` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    Progress,
    #[serde(rename = "verbose")]
    VerboseLog,
    Error,
}

/// One event on the broadcast channel.
///
/// `progress` is a percentage in `0..=100` and is only present for
/// `progress` and `verbose` events.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub progress: Option<u8>,
}

impl ProgressEvent {
    pub fn progress(message: impl Into<String>, percent: u8) -> Self {
        Self {
            kind: EventKind::Progress,
            message: message.into(),
            progress: Some(percent.min(100)),
        }
    }

    pub fn verbose(message: impl Into<String>, percent: u8) -> Self {
        Self {
            kind: EventKind::VerboseLog,
            message: message.into(),
            progress: Some(percent.min(100)),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            kind: EventKind::Error,
            message: message.into(),
            progress: None,
        }
    }

    /// True for the `progress 100` event that closes a successful job.
    pub fn is_terminal_success(&self) -> bool {
        self.kind == EventKind::Progress && self.progress == Some(100)
    }
}
