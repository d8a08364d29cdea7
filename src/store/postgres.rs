use async_trait::async_trait;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

use super::{TaskStore, UserStore};
use crate::auth::password::PasswordHash;
use crate::error::AppError;
use crate::models::{
    DayWindow, NewUser, ProfileChanges, SortField, SortOrder, Task, TaskFilter, TaskSort,
    TaskStats, User, UserCredentials,
};
use crate::services::accounts::{EMAIL_ALREADY_REGISTERED, EMAIL_IN_USE};

const USER_COLUMNS: &str = "id, name, email, avatar, bio, created_at, updated_at";
const TASK_COLUMNS: &str =
    "id, owner_id, title, description, status, priority, due_date, tags, created_at, updated_at";

/// Postgres-backed store. The schema lives in `migrations/`.
#[derive(Debug, Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a pool and brings the schema up to date.
    pub async fn connect(database_url: &str) -> Result<Self, AppError> {
        let pool = PgPoolOptions::new()
            .max_connections(10)
            .connect(database_url)
            .await?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .map_err(|e| AppError::DatabaseError(format!("Migration failed: {}", e)))?;

        log::info!("Connected to Postgres and applied migrations");
        Ok(Self::new(pool))
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

/// Reports a unique-index violation as `Conflict(message)`. The only unique
/// index is on the user email, and the right wording depends on the caller.
fn unique_violation_as(message: &'static str) -> impl FnOnce(sqlx::Error) -> AppError {
    move |error| match &error {
        sqlx::Error::Database(db_error) if db_error.is_unique_violation() => {
            AppError::Conflict(message.into())
        }
        _ => AppError::from(error),
    }
}

/// Escapes `%`, `_` and `\` so the search term is matched literally by `ILIKE`.
fn escape_like(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Appends the owner scope and the optional filters as a `WHERE` clause.
fn push_scope(builder: &mut QueryBuilder<'_, Postgres>, owner_id: Uuid, filter: &TaskFilter) {
    builder.push(" WHERE owner_id = ").push_bind(owner_id);

    if let Some(status) = filter.status {
        builder.push(" AND status = ").push_bind(status);
    }
    if let Some(priority) = filter.priority {
        builder.push(" AND priority = ").push_bind(priority);
    }
    if let Some(search) = &filter.search {
        let pattern = format!("%{}%", escape_like(search));
        builder
            .push(" AND (title ILIKE ")
            .push_bind(pattern.clone())
            .push(" OR description ILIKE ")
            .push_bind(pattern)
            .push(")");
    }
}

/// `ORDER BY` for an allow-listed sort. Column names never come from user input.
fn order_by(sort: TaskSort) -> String {
    let (direction, nulls) = match sort.order {
        SortOrder::Ascending => ("ASC", "FIRST"),
        SortOrder::Descending => ("DESC", "LAST"),
    };
    match sort.field {
        SortField::CreatedAt => format!(" ORDER BY created_at {d}, id {d}", d = direction),
        field => format!(
            " ORDER BY {col} {d} NULLS {n}, created_at {d}, id {d}",
            col = field.column(),
            d = direction,
            n = nulls
        ),
    }
}

#[async_trait]
impl UserStore for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, AppError> {
        let sql = format!(
            "INSERT INTO users (id, name, email, password_hash) VALUES ($1, $2, $3, $4) RETURNING {}",
            USER_COLUMNS
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(Uuid::new_v4())
            .bind(&user.name)
            .bind(&user.email)
            .bind(user.password_hash.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(unique_violation_as(EMAIL_ALREADY_REGISTERED))?;
        Ok(user)
    }

    async fn find_user(&self, id: Uuid) -> Result<Option<User>, AppError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        Ok(sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_credentials_by_email(
        &self,
        email: &str,
    ) -> Result<Option<UserCredentials>, AppError> {
        let sql = format!(
            "SELECT {}, password_hash FROM users WHERE LOWER(email) = LOWER($1)",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, UserCredentials>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn find_credentials(&self, id: Uuid) -> Result<Option<UserCredentials>, AppError> {
        let sql = format!(
            "SELECT {}, password_hash FROM users WHERE id = $1",
            USER_COLUMNS
        );
        Ok(sqlx::query_as::<_, UserCredentials>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn email_in_use(&self, email: &str, excluding: Option<Uuid>) -> Result<bool, AppError> {
        Ok(sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS (SELECT 1 FROM users WHERE LOWER(email) = LOWER($1) AND ($2::uuid IS NULL OR id <> $2))",
        )
        .bind(email)
        .bind(excluding)
        .fetch_one(&self.pool)
        .await?)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: &ProfileChanges,
    ) -> Result<Option<User>, AppError> {
        let sql = format!(
            "UPDATE users SET name = COALESCE($2, name), email = COALESCE($3, email), \
             avatar = COALESCE($4, avatar), bio = COALESCE($5, bio), updated_at = NOW() \
             WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.name.as_deref())
            .bind(changes.email.as_deref())
            .bind(changes.avatar.as_deref())
            .bind(changes.bio.as_deref())
            .fetch_optional(&self.pool)
            .await
            .map_err(unique_violation_as(EMAIL_IN_USE))
    }

    async fn update_password(&self, id: Uuid, hash: &PasswordHash) -> Result<bool, AppError> {
        let result =
            sqlx::query("UPDATE users SET password_hash = $2, updated_at = NOW() WHERE id = $1")
                .bind(id)
                .bind(hash.as_str())
                .execute(&self.pool)
                .await?;
        Ok(result.rows_affected() > 0)
    }
}

#[async_trait]
impl TaskStore for PgStore {
    async fn insert_task(&self, task: &Task) -> Result<Task, AppError> {
        let sql = format!(
            "INSERT INTO tasks ({cols}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) RETURNING {cols}",
            cols = TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(task.id)
            .bind(task.owner_id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.status)
            .bind(task.priority)
            .bind(task.due_date)
            .bind(&task.tags)
            .bind(task.created_at)
            .bind(task.updated_at)
            .fetch_one(&self.pool)
            .await?)
    }

    async fn find_task(&self, id: Uuid) -> Result<Option<Task>, AppError> {
        let sql = format!("SELECT {} FROM tasks WHERE id = $1", TASK_COLUMNS);
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn save_task(&self, task: &Task) -> Result<Option<Task>, AppError> {
        // owner_id is not in the SET list: ownership cannot change through an update.
        let sql = format!(
            "UPDATE tasks SET title = $2, description = $3, status = $4, priority = $5, \
             due_date = $6, tags = $7, updated_at = $8 WHERE id = $1 RETURNING {}",
            TASK_COLUMNS
        );
        Ok(sqlx::query_as::<_, Task>(&sql)
            .bind(task.id)
            .bind(&task.title)
            .bind(&task.description)
            .bind(task.status)
            .bind(task.priority)
            .bind(task.due_date)
            .bind(&task.tags)
            .bind(task.updated_at)
            .fetch_optional(&self.pool)
            .await?)
    }

    async fn delete_task(&self, id: Uuid) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list_tasks(
        &self,
        owner_id: Uuid,
        filter: &TaskFilter,
        sort: TaskSort,
        offset: u64,
        limit: u32,
    ) -> Result<Vec<Task>, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new(format!("SELECT {} FROM tasks", TASK_COLUMNS));
        push_scope(&mut builder, owner_id, filter);
        builder.push(order_by(sort));
        builder
            .push(" LIMIT ")
            .push_bind(i64::from(limit))
            .push(" OFFSET ")
            .push_bind(i64::try_from(offset).unwrap_or(i64::MAX));

        Ok(builder
            .build_query_as::<Task>()
            .fetch_all(&self.pool)
            .await?)
    }

    async fn count_tasks(&self, owner_id: Uuid, filter: &TaskFilter) -> Result<u64, AppError> {
        let mut builder = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM tasks");
        push_scope(&mut builder, owner_id, filter);

        let count = builder
            .build_query_scalar::<i64>()
            .fetch_one(&self.pool)
            .await?;
        Ok(count.max(0) as u64)
    }

    async fn task_stats(&self, owner_id: Uuid, today: DayWindow) -> Result<TaskStats, AppError> {
        Ok(sqlx::query_as::<_, TaskStats>(
            "SELECT \
                COUNT(*) AS total, \
                COUNT(*) FILTER (WHERE status = 'pending') AS pending, \
                COUNT(*) FILTER (WHERE status = 'in-progress') AS in_progress, \
                COUNT(*) FILTER (WHERE status = 'completed') AS completed, \
                COUNT(*) FILTER (WHERE priority = 'low') AS low_priority, \
                COUNT(*) FILTER (WHERE priority = 'medium') AS medium_priority, \
                COUNT(*) FILTER (WHERE priority = 'high') AS high_priority, \
                COUNT(*) FILTER (WHERE due_date >= $2 AND due_date < $3) AS due_today, \
                COUNT(*) FILTER (WHERE due_date < $2 AND status <> 'completed') AS overdue \
             FROM tasks WHERE owner_id = $1",
        )
        .bind(owner_id)
        .bind(today.start)
        .bind(today.end)
        .fetch_one(&self.pool)
        .await?)
    }
}
