//! Progress record model for storage and API.

use serde::{Deserialize, Serialize};
#[cfg(feature = "binding-generation")]
use ts_rs::TS;

/// One participant's progress through the event.
///
/// Stored under its data token in the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressRecord {
    /// Discord user ID
    pub user_id: String,
    /// Display name at creation time (never refreshed)
    pub username: String,
    /// Avatar URL derived at login
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
    /// Current step, starting at 1
    pub step: u32,
    /// Set once the participant passes the final step
    pub completed: bool,
    /// Reward code, shown to the participant once completed
    pub gift_code: String,
    /// Creation time (RFC3339)
    #[serde(default)]
    pub created_at: String,
    /// First completion time (RFC3339)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

/// Where a participant stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    InProgress { step: u32 },
    Completed { step: u32 },
}

/// What the next advancement does to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// Move from one step to the next.
    Advance { from: u32, to: u32 },
    /// Mark the record completed (step stays where it is).
    Complete,
}

impl ProgressRecord {
    /// A fresh record at step 1.
    pub fn new(
        user_id: impl Into<String>,
        username: impl Into<String>,
        avatar_url: impl Into<String>,
        gift_code: impl Into<String>,
        created_at: impl Into<String>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            username: username.into(),
            avatar_url: avatar_url.into(),
            step: 1,
            completed: false,
            gift_code: gift_code.into(),
            created_at: created_at.into(),
            completed_at: None,
        }
    }

    pub fn progress(&self) -> Progress {
        if self.completed {
            Progress::Completed { step: self.step }
        } else {
            Progress::InProgress { step: self.step }
        }
    }

    /// Next transition for an event of `step_count` steps.
    ///
    /// Reaching the last step does not complete the record; the advancement
    /// made while standing on it does.
    pub fn transition(&self, step_count: u32) -> Transition {
        if self.step >= step_count {
            Transition::Complete
        } else {
            Transition::Advance {
                from: self.step,
                to: self.step + 1,
            }
        }
    }

    /// Mark completed, keeping the first completion time.
    pub fn mark_completed(&mut self, now: &str) {
        self.completed = true;
        if self.completed_at.is_none() {
            self.completed_at = Some(now.to_string());
        }
    }
}

/// Record as returned by the API. The gift code stays hidden until completion.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
#[cfg_attr(feature = "binding-generation", derive(TS))]
#[cfg_attr(
    feature = "binding-generation",
    ts(export, export_to = "web/src/lib/generated/")
)]
pub struct RecordView {
    pub user_id: String,
    pub username: String,
    #[serde(rename = "avatarURL")]
    pub avatar_url: String,
    pub step: u32,
    pub completed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gift_code: Option<String>,
    pub created_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
}

impl From<ProgressRecord> for RecordView {
    fn from(record: ProgressRecord) -> Self {
        let gift_code = record.completed.then_some(record.gift_code);
        Self {
            user_id: record.user_id,
            username: record.username,
            avatar_url: record.avatar_url,
            step: record.step,
            completed: record.completed,
            gift_code,
            created_at: record.created_at,
            completed_at: record.completed_at,
        }
    }
}
