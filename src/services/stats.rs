use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::{DayWindow, TaskStats};
use crate::state::AppState;

/// Dashboard counters for the caller's tasks, with "today" taken as the UTC day containing `now`.
pub async fn stats(state: &AppState, caller_id: Uuid, now: DateTime<Utc>) -> Result<TaskStats, AppError> {
    state
        .tasks
        .task_stats(caller_id, DayWindow::containing(now))
        .await
}
