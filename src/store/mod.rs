//! Persistence interfaces.
//!
//! The services only talk to `UserStore` and `TaskStore`; `PgStore` backs them
//! with Postgres and `MemoryStore` keeps everything in process (tests, and local
//! runs without `DATABASE_URL`).

pub mod memory;
pub mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

use crate::auth::password::PasswordHash;
use crate::error::AppError;
use crate::models::{
    DayWindow, NewUser, ProfileChanges, Task, TaskFilter, TaskSort, TaskStats, User,
    UserCredentials,
};

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Storage for accounts. Emails are expected to be normalised by the caller.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Creates the account. Fails with `Conflict` when the email is already registered.
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError>;

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError>;

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, AppError>;

    async fn find_credentials(&self, id: Uuid) -> Result<Option<UserCredentials>, AppError>;

    /// Whether any account other than `excluding` uses `email`.
    async fn email_in_use(&self, email: &str, excluding: Option<Uuid>) -> Result<bool, AppError>;

    /// Applies the supplied profile fields. Returns `None` if the account is gone.
    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, AppError>;

    /// Replaces the stored hash. Returns `false` if the account is gone.
    async fn update_password(&self, id: Uuid, hash: &PasswordHash) -> Result<bool, AppError>;
}

/// Storage for tasks. Listing, counting and aggregation are always owner-scoped.
#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn insert_task(&self, task: &Task) -> Result<Task, AppError>;

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, AppError>;

    /// Overwrites the mutable fields of an existing task (last write wins).
    /// Returns `None` if the task was deleted in the meantime.
    async fn save_task(&self, task: &Task) -> Result<Option<Task>, AppError>;

    async fn delete_task(&self, id: Uuid) -> Result<bool, AppError>;

    async fn list_tasks(
        &self,
        owner_id: Uuid,
        filter: &TaskFilter,
        sort: TaskSort,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Task>, AppError>;

    async fn count_tasks(&self, owner_id: Uuid, filter: &TaskFilter) -> Result<u64, AppError>;

    async fn task_stats(&self, owner_id: Uuid, today: DayWindow) -> Result<TaskStats, AppError>;
}
