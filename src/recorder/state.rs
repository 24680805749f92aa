//! Recording state management
//!
//! Defines the recording state machine and session tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Current state of the capture engine's video path
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordingState {
    /// No recording in progress
    Idle,
    /// Currently recording
    Recording,
}

impl Default for RecordingState {
    fn default() -> Self {
        Self::Idle
    }
}

/// Information about one start-to-stop recording
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordingSession {
    pub id: Uuid,

    /// Container type the recorder produces
    pub mime_type: String,

    pub started_at: DateTime<Utc>,

    /// Set once the recorder has finalized
    pub ended_at: Option<DateTime<Utc>>,
}

impl RecordingSession {
    /// Create a new session starting now
    pub fn new(mime_type: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            mime_type: mime_type.to_string(),
            started_at: Utc::now(),
            ended_at: None,
        }
    }

    /// End the session
    pub fn end(&mut self) {
        self.ended_at = Some(Utc::now());
    }

    /// Elapsed time in milliseconds, up to now while still running
    pub fn duration_ms(&self) -> i64 {
        let end = self.ended_at.unwrap_or_else(Utc::now);
        (end - self.started_at).num_milliseconds().max(0)
    }
}
