use uuid::Uuid;
use validator::Validate;

use crate::error::AppError;
use crate::models::{Task, TaskInput, TaskQuery, TaskUpdate};
use crate::response::Pagination;
use crate::state::AppState;

pub const TASK_NOT_FOUND: &str = "Task not found";

/// Result of looking a task up on behalf of a caller.
#[derive(Debug, Clone, PartialEq)]
pub enum Ownership {
    Owned(Task),
    NotOwned,
    Missing,
}

/// What the caller is trying to do, used to word the 403 message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskAction {
    Access,
    Update,
    Delete,
}

impl TaskAction {
    fn verb(self) -> &'static str {
        match self {
            TaskAction::Access => "access",
            TaskAction::Update => "update",
            TaskAction::Delete => "delete",
        }
    }
}

impl Ownership {
    /// Turns the lookup into the owned task, or 404 / 403.
    pub fn authorize(self, action: TaskAction) -> Result<Task, AppError> {
        match self {
            Ownership::Owned(task) => Ok(task),
            Ownership::NotOwned => Err(AppError::Forbidden(format!(
                "Not authorized to {} this task",
                action.verb()
            ))),
            Ownership::Missing => Err(AppError::NotFound(TASK_NOT_FOUND.into())),
        }
    }
}

/// Path ids that are not UUIDs cannot name a task, so they are plain 404s.
pub fn parse_task_id(raw: &str) -> Result<Uuid, AppError> {
    Uuid::parse_str(raw.trim()).map_err(|_| AppError::NotFound(TASK_NOT_FOUND.into()))
}

/// Existence is checked before ownership so that 404 and 403 stay distinct.
pub async fn load(state: &AppState, caller_id: Uuid, task_id: Uuid) -> Result<Ownership, AppError> {
    Ok(match state.tasks.find_task(task_id).await? {
        None => Ownership::Missing,
        Some(task) if task.owner_id == caller_id => Ownership::Owned(task),
        Some(task) => {
            log::warn!(
                "user {} attempted to reach task {} owned by {}",
                caller_id,
                task.id,
                task.owner_id
            );
            Ownership::NotOwned
        }
    })
}

/// One page of the caller's tasks.
#[derive(Debug, Clone)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub pagination: Pagination,
}

pub async fn list(state: &AppState, caller_id: Uuid, query: &TaskQuery) -> Result<TaskPage, AppError> {
    let (filter, sort, page) = query.parse();

    let (tasks, total) = futures::try_join!(
        state
            .tasks
            .list_tasks(caller_id, &filter, sort, page.offset(), page.limit),
        state.tasks.count_tasks(caller_id, &filter),
    )?;

    Ok(TaskPage {
        tasks,
        pagination: Pagination::new(page, total),
    })
}

pub async fn get(state: &AppState, caller_id: Uuid, task_id: Uuid) -> Result<Task, AppError> {
    load(state, caller_id, task_id)
        .await?
        .authorize(TaskAction::Access)
}

/// Creates a task owned by the caller. The body has no way to name another owner.
pub async fn create(state: &AppState, caller_id: Uuid, input: TaskInput) -> Result<Task, AppError> {
    let input = input.normalized();
    input.validate()?;

    let task = state.tasks.insert_task(&Task::new(input, caller_id)).await?;
    log::info!("user {} created task {}", caller_id, task.id);
    Ok(task)
}

/// Applies only the supplied fields. Concurrent updates are last-write-wins.
pub async fn update(
    state: &AppState,
    caller_id: Uuid,
    task_id: Uuid,
    update: TaskUpdate,
) -> Result<Task, AppError> {
    let update = update.normalized();
    let mut task = load(state, caller_id, task_id)
        .await?
        .authorize(TaskAction::Update)?;
    update.validate()?;

    task.apply(update);
    state
        .tasks
        .save_task(&task)
        .await?
        .ok_or_else(|| AppError::NotFound(TASK_NOT_FOUND.into()))
}

pub async fn delete(state: &AppState, caller_id: Uuid, task_id: Uuid) -> Result<(), AppError> {
    load(state, caller_id, task_id)
        .await?
        .authorize(TaskAction::Delete)?;

    if !state.tasks.delete_task(task_id).await? {
        return Err(AppError::NotFound(TASK_NOT_FOUND.into()));
    }
    log::info!("user {} deleted task {}", caller_id, task_id);
    Ok(())
}
