pub mod auth;
pub mod health;
pub mod tasks;

use actix_web::error::{JsonPayloadError, QueryPayloadError};
use actix_web::{web, HttpRequest};

use crate::auth::AuthMiddleware;
use crate::error::AppError;

/// Largest accepted JSON body.
pub const JSON_LIMIT: usize = 10 * 1024 * 1024;

/// Registers every route under `/api`, the body/query error handlers, and the
/// JSON 404 fallback. `/auth` and `/tasks` sit behind `AuthMiddleware`; the
/// middleware itself lets login and register through.
pub fn config(cfg: &mut web::ServiceConfig) {
    cfg.app_data(json_config())
        .app_data(query_config())
        .service(
            web::scope("/api")
                .service(health::health)
                .service(
                    web::scope("/auth")
                        .wrap(AuthMiddleware)
                        .service(auth::register)
                        .service(auth::login)
                        .service(auth::me)
                        .service(auth::update_profile)
                        .service(auth::change_password),
                )
                .service(
                    web::scope("/tasks")
                        .wrap(AuthMiddleware)
                        // Before "/{id}" so that "stats" is not taken for a task id.
                        .service(tasks::task_stats)
                        .service(tasks::get_tasks)
                        .service(tasks::create_task)
                        .service(tasks::get_task)
                        .service(tasks::update_task)
                        .service(tasks::delete_task),
                ),
        )
        .default_service(web::route().to(not_found));
}

fn json_config() -> web::JsonConfig {
    web::JsonConfig::default()
        .limit(JSON_LIMIT)
        .error_handler(|err, _req| {
            let message = match &err {
                JsonPayloadError::ContentType => "Content type must be application/json".to_string(),
                JsonPayloadError::Deserialize(e) => format!("Invalid request body: {}", e),
                JsonPayloadError::Overflow { .. } | JsonPayloadError::OverflowKnownLength { .. } => {
                    "Request body is too large".to_string()
                }
                other => other.to_string(),
            };
            AppError::BadRequest(message).into()
        })
}

fn query_config() -> web::QueryConfig {
    web::QueryConfig::default().error_handler(|err: QueryPayloadError, _req| {
        AppError::BadRequest(format!("Invalid query string: {}", err)).into()
    })
}

/// Fallback for anything no route matched.
pub async fn not_found(req: HttpRequest) -> Result<actix_web::HttpResponse, AppError> {
    Err(AppError::NotFound(format!("Route {} not found", req.path())))
}
