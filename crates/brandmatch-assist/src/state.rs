use brandmatch_core::TaskKey;
use serde::Serialize;

use crate::error::FailureKind;

/// Lifecycle of one generation task. A retry from `Succeeded` or `Failed`
/// goes back to `Generating`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TaskState {
    #[default]
    Idle,
    Generating,
    Succeeded {
        content: String,
    },
    Failed {
        kind: FailureKind,
        message: String,
    },
}

impl TaskState {
    #[must_use]
    pub fn is_generating(&self) -> bool {
        matches!(self, TaskState::Generating)
    }

    #[must_use]
    pub fn content(&self) -> Option<&str> {
        match self {
            TaskState::Succeeded { content } => Some(content),
            _ => None,
        }
    }
}

/// Broadcast to subscribers whenever a key changes state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaskUpdate {
    pub key: TaskKey,
    pub state: TaskState,
}
