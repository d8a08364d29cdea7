use actix_web::{get, web, HttpResponse, Responder};
use chrono::Utc;
use serde_json::json;

use crate::state::AppState;

/// Health check endpoint
///
/// Reports that the server is up, which environment it runs in, and the current time.
#[get("/health")]
pub async fn health(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Server is running",
        "environment": state.environment,
        "timestamp": Utc::now()
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use actix_web::test;

    #[actix_web::test]
    async fn test_health_endpoint() {
        let state = AppState::in_memory(&Config::for_tests("health_secret"));
        let app = test::init_service(
            actix_web::App::new()
                .app_data(web::Data::new(state))
                .service(web::scope("/api").service(health)),
        )
        .await;

        let req = test::TestRequest::get().uri("/api/health").to_request();
        let resp = test::call_service(&app, req).await;

        assert!(resp.status().is_success());

        let body = test::read_body(resp).await;
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

        assert_eq!(json["success"], true);
        assert_eq!(json["message"], "Server is running");
        assert_eq!(json["environment"], "test");
        assert!(json["timestamp"].is_string());
    }
}
