use crate::{
    auth::AuthenticatedUser,
    error::AppError,
    models::{TaskInput, TaskQuery, TaskUpdate},
    response::ApiResponse,
    services::{
        stats,
        tasks::{self, parse_task_id},
    },
    state::AppState,
};
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};
use chrono::Utc;

/// Retrieves a page of the authenticated user's tasks.
///
/// ## Query Parameters:
/// - `search` (optional): Case-insensitive substring of the title or description.
/// - `status` (optional): `pending`, `in-progress` or `completed`. Other values are ignored.
/// - `priority` (optional): `low`, `medium` or `high`. Other values are ignored.
/// - `sort` (optional): `createdAt`, `updatedAt`, `dueDate`, `title`, `status` or
///   `priority`, with a leading `-` for descending. Defaults to `-createdAt`.
/// - `page`, `limit` (optional): Positive integers, defaulting to 1 and 10. `limit` is capped at 100.
///
/// ## Responses:
/// - `200 OK`: `{ success, data: Task[], pagination: { current, pages, total, limit } }`.
/// - `401 Unauthorized`: If the request lacks a valid authentication token.
#[get("")]
pub async fn get_tasks(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    query_params: web::Query<TaskQuery>,
) -> Result<impl Responder, AppError> {
    let page = tasks::list(&state, user.id(), &query_params).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::data(page.tasks).with_pagination(page.pagination)))
}

/// Creates a new task owned by the authenticated user.
///
/// ## Request Body:
/// - `title`: 1-100 characters (required).
/// - `description` (optional): Up to 500 characters.
/// - `status`, `priority` (optional): Default to `pending` and `medium`.
/// - `dueDate` (optional): RFC 3339 timestamp.
/// - `tags` (optional): List of strings.
///
/// Any owner field in the body is ignored.
///
/// ## Responses:
/// - `201 Created`: The new task.
/// - `400 Bad Request`: Validation failed.
#[post("")]
pub async fn create_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_data: web::Json<TaskInput>,
) -> Result<impl Responder, AppError> {
    let task = tasks::create(&state, user.id(), task_data.into_inner()).await?;

    Ok(HttpResponse::Created()
        .json(ApiResponse::data(task).with_message("Task created successfully")))
}

/// Counts the authenticated user's tasks by status, by priority, due today, and overdue.
#[get("/stats")]
pub async fn task_stats(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
) -> Result<impl Responder, AppError> {
    let stats = stats::stats(&state, user.id(), Utc::now()).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(stats)))
}

/// Retrieves a specific task by its ID.
///
/// ## Responses:
/// - `200 OK`: The task.
/// - `403 Forbidden`: The task belongs to another user.
/// - `404 Not Found`: No task has that id, or the id is not a UUID.
#[get("/{id}")]
pub async fn get_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let task_id = parse_task_id(&task_id)?;
    let task = tasks::get(&state, user.id(), task_id).await?;
    Ok(HttpResponse::Ok().json(ApiResponse::data(task)))
}

/// Updates the supplied fields of a task the caller owns.
///
/// Send `"dueDate": null` to clear the due date.
#[put("/{id}")]
pub async fn update_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<String>,
    task_data: web::Json<TaskUpdate>,
) -> Result<impl Responder, AppError> {
    let task_id = parse_task_id(&task_id)?;
    let task = tasks::update(&state, user.id(), task_id, task_data.into_inner()).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::data(task).with_message("Task updated successfully")))
}

#[delete("/{id}")]
pub async fn delete_task(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    task_id: web::Path<String>,
) -> Result<impl Responder, AppError> {
    let task_id = parse_task_id(&task_id)?;
    tasks::delete(&state, user.id(), task_id).await?;

    Ok(HttpResponse::Ok().json(ApiResponse::message("Task deleted successfully")))
}
