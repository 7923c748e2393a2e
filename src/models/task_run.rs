//! Task run models for scheduler cycle tracking.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Status of one scheduler cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Running,
    Success,
    Error,
    Cancelled,
}

impl TaskStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Success => "success",
            Self::Error => "error",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Running)
    }
}

/// Error detail attached to a failed or partially failed run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskError {
    pub message: String,
    pub code: String,
}

/// One execution of the scheduler's collection cycle.
///
/// Created at trigger time, transitions exactly once to a terminal state
/// and is never reopened; a retry is a new run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRun {
    pub id: Uuid,
    pub task_name: String,
    pub status: TaskStatus,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<u64>,
    /// Records produced across the fan-out.
    pub processed_items: u64,
    /// Scrapers that completed with records.
    pub succeeded_jobs: u32,
    /// Scrapers that failed (navigation exhaustion, session loss, panic).
    pub failed_jobs: u32,
    pub error: Option<TaskError>,
}

impl TaskRun {
    /// Start a new run in the `running` state.
    pub fn start(task_name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            task_name: task_name.into(),
            status: TaskStatus::Running,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            processed_items: 0,
            succeeded_jobs: 0,
            failed_jobs: 0,
            error: None,
        }
    }

    /// Transition to a terminal state. Later calls on an already-terminal
    /// run are ignored so a run can never reopen.
    pub fn finish(&mut self, status: TaskStatus, error: Option<TaskError>) {
        if self.status.is_terminal() {
            return;
        }
        let completed = Utc::now();
        self.status = status;
        self.completed_at = Some(completed);
        self.duration_ms = Some(
            (completed - self.started_at)
                .num_milliseconds()
                .max(0) as u64,
        );
        self.error = error;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_transitions_once() {
        let mut run = TaskRun::start("scrape-cycle");
        assert_eq!(run.status, TaskStatus::Running);

        run.finish(TaskStatus::Success, None);
        assert_eq!(run.status, TaskStatus::Success);
        assert!(run.completed_at.is_some());
        assert!(run.duration_ms.is_some());

        // A terminal run never reopens or changes status.
        run.finish(
            TaskStatus::Error,
            Some(TaskError {
                message: "late".into(),
                code: "LATE".into(),
            }),
        );
        assert_eq!(run.status, TaskStatus::Success);
        assert!(run.error.is_none());
    }
}
