use serde::{Deserialize, Serialize};

/// Wire value the backend reports once a task has finished successfully.
pub const STATUS_DONE: &str = "完成";

/// Wire value the backend reports once a task has failed.
pub const STATUS_FAILED: &str = "失败";

/// Full status snapshot for one task, as returned by every status poll.
/// The backend always sends the whole snapshot, so updates are a full
/// replace, never a partial merge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskSnapshot {
    pub status: String,
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mindmap: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskPhase {
    InProgress,
    Done,
    Failed,
}

impl TaskSnapshot {
    /// Map the open-ended wire status onto the two terminal values. The
    /// status vocabulary is a contract with the backend: anything besides
    /// these two strings counts as still in progress, whatever its text.
    pub fn phase(&self) -> TaskPhase {
        match self.status.as_str() {
            STATUS_DONE => TaskPhase::Done,
            STATUS_FAILED => TaskPhase::Failed,
            _ => TaskPhase::InProgress,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.phase() != TaskPhase::InProgress
    }
}
