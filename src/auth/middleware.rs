use std::rc::Rc;

use actix_web::{
    body::EitherBody,
    dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform},
    http::header,
    web, Error, HttpMessage,
};
use futures::future::{ready, LocalBoxFuture, Ready};

use crate::error::AppError;
use crate::models::User;
use crate::state::AppState;

/// Paths under a guarded scope that are reachable without a token.
const PUBLIC_PATHS: [&str; 3] = ["/api/auth/login", "/api/auth/register", "/api/health"];

/// Request guard for protected routes.
///
/// Takes the bearer token from the `Authorization` header, verifies it, and
/// resolves the embedded user id against the user store. On success the
/// [`User`] is placed in the request extensions for
/// [`AuthenticatedUser`](super::AuthenticatedUser) to pick up. Rejections are
/// answered here with the usual JSON error body; the wrapped service never runs.
/// Requests that match no route pass through untouched.
pub struct AuthMiddleware;

impl<S, B> Transform<S, ServiceRequest> for AuthMiddleware
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Transform = AuthMiddlewareService<S>;
    type InitError = ();
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(AuthMiddlewareService {
            service: Rc::new(service),
        }))
    }
}

pub struct AuthMiddlewareService<S> {
    service: Rc<S>,
}

fn bearer_token(req: &ServiceRequest) -> Option<String> {
    req.headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_owned)
}

/// `NoToken -> TokenPresent -> Verified -> UserResolved`, failing at any step.
async fn authenticate(req: &ServiceRequest) -> Result<User, AppError> {
    let state = req
        .app_data::<web::Data<AppState>>()
        .ok_or_else(|| AppError::InternalServerError("AppState is not registered".into()))?;

    let token = bearer_token(req).ok_or_else(|| {
        log::debug!("rejecting {}: no bearer token", req.path());
        AppError::Unauthorized("Not authorized, no token provided".into())
    })?;

    let user_id = state.tokens.verify(&token).map_err(|e| {
        log::warn!("rejecting {}: {}", req.path(), e);
        AppError::from(e)
    })?;

    state.users.find_user(user_id).await?.ok_or_else(|| {
        log::warn!("token subject {} no longer exists", user_id);
        AppError::Unauthorized("User belonging to this token no longer exists".into())
    })
}

impl<S, B> Service<ServiceRequest> for AuthMiddlewareService<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<EitherBody<B>>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = Rc::clone(&self.service);

        Box::pin(async move {
            // Paths no route matches fall through to the JSON 404 fallback.
            let routed = req.match_pattern().is_some();
            if routed && !PUBLIC_PATHS.contains(&req.path()) {
                match authenticate(&req).await {
                    Ok(user) => {
                        req.extensions_mut().insert(user);
                    }
                    Err(e) => return Ok(req.error_response(e).map_into_right_body()),
                }
            }

            service
                .call(req)
                .await
                .map(ServiceResponse::map_into_left_body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthenticatedUser;
    use crate::config::Config;
    use crate::models::NewUser;
    use actix_web::{get, http::StatusCode, test, App, HttpResponse, Responder};
    use chrono::{Duration, Utc};
    use uuid::Uuid;

    #[get("/api/whoami")]
    async fn whoami(user: AuthenticatedUser) -> impl Responder {
        HttpResponse::Ok().body(user.0.email)
    }

    #[get("/api/health")]
    async fn health() -> impl Responder {
        HttpResponse::Ok().finish()
    }

    async fn state_with_user() -> (AppState, Uuid) {
        let state = AppState::in_memory(&Config::for_tests("middleware_secret"));
        let user = state
            .users
            .insert_user(NewUser {
                name: "Jane".into(),
                email: "jane@example.com".into(),
                password_hash: state.passwords.hash("secret123").await.unwrap(),
            })
            .await
            .unwrap();
        (state, user.id)
    }

    async fn message_for(
        app: &impl Service<
            actix_http::Request,
            Response = ServiceResponse<impl actix_web::body::MessageBody>,
            Error = Error,
        >,
        authorization: Option<String>,
    ) -> (StatusCode, String) {
        let mut req = test::TestRequest::get().uri("/api/whoami");
        if let Some(value) = authorization {
            req = req.insert_header((header::AUTHORIZATION, value));
        }
        let resp = test::call_service(app, req.to_request()).await;
        let status = resp.status();
        let body = test::read_body(resp).await;
        let message = match serde_json::from_slice::<serde_json::Value>(&body) {
            Ok(json) => json["message"].as_str().unwrap_or_default().to_string(),
            Err(_) => String::from_utf8_lossy(&body).into_owned(),
        };
        (status, message)
    }

    #[actix_rt::test]
    async fn test_guard_states() {
        let (state, user_id) = state_with_user().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state.clone()))
                .wrap(AuthMiddleware)
                .service(whoami)
                .service(health),
        )
        .await;

        // Public path needs no token.
        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/api/health").to_request()).await;
        assert_eq!(resp.status(), StatusCode::OK);

        assert_eq!(
            message_for(&app, None).await,
            (StatusCode::UNAUTHORIZED, "Not authorized, no token provided".to_string())
        );
        assert_eq!(
            message_for(&app, Some("Basic amFuZTpzZWNyZXQ=".into())).await,
            (StatusCode::UNAUTHORIZED, "Not authorized, no token provided".to_string())
        );
        assert_eq!(
            message_for(&app, Some("Bearer not.a.token".into())).await,
            (StatusCode::UNAUTHORIZED, "Not authorized, token failed verification".to_string())
        );

        let stale = state
            .tokens
            .issue_at(user_id, Utc::now() - Duration::days(30))
            .unwrap();
        assert_eq!(
            message_for(&app, Some(format!("Bearer {}", stale))).await,
            (StatusCode::UNAUTHORIZED, "Token has expired, please login again".to_string())
        );

        let orphan = state.tokens.issue(Uuid::new_v4()).unwrap();
        assert_eq!(
            message_for(&app, Some(format!("Bearer {}", orphan))).await,
            (
                StatusCode::UNAUTHORIZED,
                "User belonging to this token no longer exists".to_string()
            )
        );

        let token = state.tokens.issue(user_id).unwrap();
        assert_eq!(
            message_for(&app, Some(format!("Bearer {}", token))).await,
            (StatusCode::OK, "jane@example.com".to_string())
        );
    }

    #[actix_rt::test]
    async fn test_unmatched_path_is_not_guarded() {
        let (state, _) = state_with_user().await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .wrap(AuthMiddleware)
                .service(whoami)
                .default_service(web::route().to(|| async { HttpResponse::NotFound().finish() })),
        )
        .await;

        let resp =
            test::call_service(&app, test::TestRequest::get().uri("/api/nope").to_request()).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
