//! Data models for gamepulse.

mod game;
mod task_run;

pub use game::{normalize_name, GameRecord, GameType, Rating};
pub use task_run::{TaskError, TaskRun, TaskStatus};
