use actix_web::dev::{Service, ServiceResponse};
use actix_web::http::{header, StatusCode};
use actix_web::{test, web, App};
use chrono::{Duration, SecondsFormat, Utc};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use taskboard::{routes, AppState, Config};

async fn call(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
    >,
    req: test::TestRequest,
) -> (StatusCode, Value) {
    let resp = test::call_service(app, req.to_request()).await;
    let status = resp.status();
    let body = test::read_body(resp).await;
    (status, serde_json::from_slice(&body).unwrap())
}

async fn register(
    app: &impl Service<
        actix_http::Request,
        Response = ServiceResponse<impl actix_web::body::MessageBody>,
        Error = actix_web::Error,
    >,
    email: &str,
) -> (header::HeaderName, String) {
    let (status, body) = call(
        app,
        test::TestRequest::post()
            .uri("/api/auth/register")
            .set_json(json!({ "name": "Stats Tester", "email": email, "password": "Password123!" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    (
        header::AUTHORIZATION,
        format!("Bearer {}", body["token"].as_str().unwrap()),
    )
}

#[actix_rt::test]
async fn test_stats_counts() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::in_memory(&Config::for_tests(
                "integration_stats_secret",
            ))))
            .configure(routes::config),
    )
    .await;
    let alice = register(&app, "alice@example.com").await;
    let bob = register(&app, "bob@example.com").await;

    // Empty accounts report zeros, not missing fields.
    let (status, body) = call(
        &app,
        test::TestRequest::get()
            .uri("/api/tasks/stats")
            .insert_header(alice.clone()),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["data"],
        json!({
            "total": 0,
            "pending": 0,
            "inProgress": 0,
            "completed": 0,
            "lowPriority": 0,
            "mediumPriority": 0,
            "highPriority": 0,
            "dueToday": 0,
            "overdue": 0
        })
    );

    let now = Utc::now();
    let today = now
        .date_naive()
        .and_hms_opt(12, 0, 0)
        .unwrap()
        .and_utc()
        .to_rfc3339_opts(SecondsFormat::Secs, true);
    let last_week = (now - Duration::days(7)).to_rfc3339_opts(SecondsFormat::Secs, true);
    let next_week = (now + Duration::days(7)).to_rfc3339_opts(SecondsFormat::Secs, true);

    for payload in [
        json!({ "title": "late", "status": "pending", "priority": "high", "dueDate": last_week }),
        json!({ "title": "late but done", "status": "completed", "priority": "low", "dueDate": last_week }),
        json!({ "title": "today", "status": "in-progress", "priority": "medium", "dueDate": today }),
        json!({ "title": "later", "status": "pending", "priority": "medium", "dueDate": next_week }),
        json!({ "title": "someday" }),
    ] {
        let (status, _) = call(
            &app,
            test::TestRequest::post()
                .uri("/api/tasks")
                .insert_header(alice.clone())
                .set_json(payload),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
    }
    let (status, _) = call(
        &app,
        test::TestRequest::post()
            .uri("/api/tasks")
            .insert_header(bob.clone())
            .set_json(json!({ "title": "bob's", "dueDate": last_week })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (_, body) = call(
        &app,
        test::TestRequest::get()
            .uri("/api/tasks/stats")
            .insert_header(alice),
    )
    .await;
    assert_eq!(
        body,
        json!({
            "success": true,
            "data": {
                "total": 5,
                "pending": 3,
                "inProgress": 1,
                "completed": 1,
                "lowPriority": 1,
                "mediumPriority": 3,
                "highPriority": 1,
                "dueToday": 1,
                "overdue": 1
            }
        })
    );

    let (_, body) = call(
        &app,
        test::TestRequest::get()
            .uri("/api/tasks/stats")
            .insert_header(bob),
    )
    .await;
    assert_eq!(body["data"]["total"], 1);
    assert_eq!(body["data"]["overdue"], 1);
}

#[actix_rt::test]
async fn test_stats_count_bare_due_dates() {
    let app = test::init_service(
        App::new()
            .app_data(web::Data::new(AppState::in_memory(&Config::for_tests(
                "integration_stats_secret",
            ))))
            .configure(routes::config),
    )
    .await;
    let carol = register(&app, "carol@example.com").await;
    let today = Utc::now().date_naive().format("%Y-%m-%d").to_string();

    // Dates as a browser date input submits them.
    let (status, body) = call(
        &app,
        test::TestRequest::post()
            .uri("/api/tasks")
            .insert_header(carol.clone())
            .set_json(json!({ "title": "Dentist", "dueDate": "2024-06-01" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    assert_eq!(body["data"]["dueDate"], "2024-06-01T00:00:00Z");

    let (status, body) = call(
        &app,
        test::TestRequest::post()
            .uri("/api/tasks")
            .insert_header(carol.clone())
            .set_json(json!({ "title": "Groceries", "dueDate": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "body: {}", body);
    assert_eq!(body["data"]["dueDate"], Value::Null);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = call(
        &app,
        test::TestRequest::put()
            .uri(&format!("/api/tasks/{}", id))
            .insert_header(carol.clone())
            .set_json(json!({ "dueDate": today })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "body: {}", body);

    let (_, body) = call(
        &app,
        test::TestRequest::get()
            .uri("/api/tasks/stats")
            .insert_header(carol),
    )
    .await;
    assert_eq!(body["data"]["total"], 2);
    assert_eq!(body["data"]["overdue"], 1);
    assert_eq!(body["data"]["dueToday"], 1);
}
