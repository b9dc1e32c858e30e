use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::answers::Answers;

/// Who produced a transcript entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    Bot,
    User,
}

/// One exchanged message. Entries are append-only: once written they are
/// never reordered or mutated, and `index` increases monotonically.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub index: u64,
    pub speaker: Speaker,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Whether the user has allowed the use of their location.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LocationPermission {
    Granted,
    Denied,
    #[default]
    NotAsked,
}

/// One user's progress through a flow: accumulated answers, the transcript,
/// and the current position in the step graph.
///
/// The serialized shape is the persisted contract:
/// `{ answers, transcript, current_step_id, history }` (plus identity).
/// `loading` and `location_permission` are transient and skipped.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: String,
    pub flow_id: String,
    pub current_step_id: String,
    #[serde(default)]
    pub answers: Answers,
    #[serde(default)]
    pub transcript: Vec<TranscriptEntry>,
    /// Previously visited step ids, most recent last. Drives pointer
    /// rollback; transcript and answers are never rolled back with it.
    #[serde(default)]
    pub history: Vec<String>,
    #[serde(skip)]
    pub loading: bool,
    #[serde(skip)]
    pub location_permission: LocationPermission,
}

impl Session {
    /// A fresh session positioned at the given step with nothing collected.
    pub fn new(
        id: impl Into<String>,
        flow_id: impl Into<String>,
        entry_step_id: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            flow_id: flow_id.into(),
            current_step_id: entry_step_id.into(),
            answers: Answers::default(),
            transcript: Vec::new(),
            history: Vec::new(),
            loading: false,
            location_permission: LocationPermission::NotAsked,
        }
    }

    pub fn push_bot(&mut self, text: impl Into<String>) {
        self.push(Speaker::Bot, text.into());
    }

    pub fn push_user(&mut self, text: impl Into<String>) {
        self.push(Speaker::User, text.into());
    }

    fn push(&mut self, speaker: Speaker, text: String) {
        let index = self.transcript.len() as u64;
        self.transcript.push(TranscriptEntry {
            index,
            speaker,
            text,
            timestamp: Utc::now(),
        });
    }
}
