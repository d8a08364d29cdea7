use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use super::task::{Task, TaskPriority, TaskStatus};

/// Dashboard counters for one user's tasks. Every field is present, zero when empty.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct TaskStats {
    pub total: i64,
    pub pending: i64,
    pub in_progress: i64,
    pub completed: i64,
    pub low_priority: i64,
    pub medium_priority: i64,
    pub high_priority: i64,
    pub due_today: i64,
    pub overdue: i64,
}

/// The half-open interval `[start, end)` covering one UTC calendar day.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DayWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl DayWindow {
    pub fn containing(now: DateTime<Utc>) -> Self {
        let start = Utc.from_utc_datetime(&now.date_naive().and_time(NaiveTime::MIN));
        Self {
            start,
            end: start + Duration::days(1),
        }
    }
}

impl TaskStats {
    /// Counts one task into the totals.
    pub fn record(&mut self, task: &Task, today: &DayWindow) {
        self.total += 1;

        match task.status {
            TaskStatus::Pending => self.pending += 1,
            TaskStatus::InProgress => self.in_progress += 1,
            TaskStatus::Completed => self.completed += 1,
        }

        match task.priority {
            TaskPriority::Low => self.low_priority += 1,
            TaskPriority::Medium => self.medium_priority += 1,
            TaskPriority::High => self.high_priority += 1,
        }

        if let Some(due) = task.due_date {
            if due >= today.start && due < today.end {
                self.due_today += 1;
            } else if due < today.start && task.status != TaskStatus::Completed {
                self.overdue += 1;
            }
        }
    }

    pub fn tally<'a>(tasks: impl IntoIterator<Item = &'a Task>, today: &DayWindow) -> Self {
        tasks.into_iter().fold(Self::default(), |mut stats, task| {
            stats.record(task, today);
            stats
        })
    }
}
