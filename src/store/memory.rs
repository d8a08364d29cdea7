use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{TaskStore, UserStore};
use crate::auth::password::PasswordHash;
use crate::error::AppError;
use crate::models::{
    DayWindow, NewUser, ProfileChanges, Task, TaskFilter, TaskSort, TaskStats, User,
    UserCredentials,
};
use crate::services::accounts::{EMAIL_ALREADY_REGISTERED, EMAIL_IN_USE};

/// Process-local store backed by two hash maps behind async read/write locks.
#[derive(Debug, Default)]
pub struct MemoryStore {
    users: RwLock<HashMap<Uuid, UserCredentials>>,
    tasks: RwLock<HashMap<Uuid, Task>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn email_taken(users: &HashMap<Uuid, UserCredentials>, email: &str, excluding: Option<Uuid>) -> bool {
    users
        .values()
        .any(|c| c.user.email == email && Some(c.user.id) != excluding)
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, new_user: NewUser) -> Result<User, AppError> {
        let mut users = self.users.write().await;
        if email_taken(&users, &new_user.email, None) {
            return Err(AppError::Conflict(EMAIL_ALREADY_REGISTERED.into()));
        }

        let now = Utc::now();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            avatar: String::new(),
            bio: String::new(),
            created_at: now,
            updated_at: now,
        };
        users.insert(
            user.id,
            UserCredentials {
                user: user.clone(),
                password_hash: new_user.password_hash.as_str().to_string(),
            },
        );
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        Ok(self.users.read().await.get(&id).map(|c| c.user.clone()))
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, AppError> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|c| c.user.email == email)
            .cloned())
    }

    async fn find_credentials(&self, id: Uuid) -> Result<Option<UserCredentials>, AppError> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn email_in_use(&self, email: &str, excluding: Option<Uuid>) -> Result<bool, AppError> {
        Ok(email_taken(&*self.users.read().await, email, excluding))
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, AppError> {
        let mut users = self.users.write().await;
        if let Some(email) = &changes.email {
            if email_taken(&users, email, Some(id)) {
                return Err(AppError::Conflict(EMAIL_IN_USE.into()));
            }
        }

        Ok(users.get_mut(&id).map(|credentials| {
            changes.apply_to(&mut credentials.user);
            credentials.user.updated_at = Utc::now();
            credentials.user.clone()
        }))
    }

    async fn update_password(&self, id: Uuid, hash: &PasswordHash) -> Result<bool, AppError> {
        let mut users = self.users.write().await;
        Ok(match users.get_mut(&id) {
            Some(credentials) => {
                credentials.password_hash = hash.as_str().to_string();
                credentials.user.updated_at = Utc::now();
                true
            }
            None => false,
        })
    }
}

#[async_trait]
impl TaskStore for MemoryStore {
    async fn insert_task(&self, task: &Task) -> Result<Task, AppError> {
        self.tasks.write().await.insert(task.id, task.clone());
        Ok(task.clone())
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        Ok(self.tasks.read().await.get(&id).cloned())
    }

    async fn save_task(&self, task: &Task) -> Result<Option<Task>, AppError> {
        let mut tasks = self.tasks.write().await;
        Ok(tasks.get_mut(&task.id).map(|stored| {
            let owner_id = stored.owner_id;
            let created_at = stored.created_at;
            *stored = Task {
                owner_id,
                created_at,
                ..task.clone()
            };
            stored.clone()
        }))
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, AppError> {
        Ok(self.tasks.write().await.remove(&id).is_some())
    }

    async fn list_tasks(
        &self,
        owner_id: Uuid,
        filter: &TaskFilter,
        sort: TaskSort,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Task>, AppError> {
        let tasks = self.tasks.read().await;
        let mut matching: Vec<&Task> = tasks
            .values()
            .filter(|t| t.owner_id == owner_id && filter.matches(t))
            .collect();
        matching.sort_by(|a, b| sort.compare(a, b));

        Ok(matching
            .into_iter()
            .skip(usize::try_from(offset).unwrap_or(usize::MAX))
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn count_tasks(&self, owner_id: Uuid, filter: &TaskFilter) -> Result<u64, AppError> {
        let tasks = self.tasks.read().await;
        Ok(tasks
            .values()
            .filter(|t| t.owner_id == owner_id && filter.matches(t))
            .count() as u64)
    }

    async fn task_stats(&self, owner_id: Uuid, today: DayWindow) -> Result<TaskStats, AppError> {
        let tasks = self.tasks.read().await;
        Ok(TaskStats::tally(
            tasks.values().filter(|t| t.owner_id == owner_id),
            &today,
        ))
    }
}
