use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::{get, post},
    Router,
};
use chrono::{DateTime, Duration, Utc};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

async fn setup_pool() -> Option<PgPool> {
    dotenvy::dotenv().ok();
    if env::var("DATABASE_URL").is_err() {
        eprintln!("DATABASE_URL not set; skipping database-backed test");
        return None;
    }
    env::set_var("SERVER_ADDRESS", "127.0.0.1:0");
    env::set_var("JWT_SECRET", "test_secret_key");
    env::set_var("SCHEDULING_RPS", "1000");
    env::set_var("INTERNAL_RPS", "1000");

    scheduling_backend::config::init_config().ok();
    let pool = scheduling_backend::database::pool::create_pool()
        .await
        .expect("pool");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("migrations");
    Some(pool)
}

fn scheduling_router(pool: PgPool) -> Router {
    let app_state = scheduling_backend::AppState::new(pool);
    Router::new()
        .route(
            "/api/scheduling/meetings",
            get(scheduling_backend::routes::meeting_routes::list_meetings)
                .post(scheduling_backend::routes::meeting_routes::create_meeting),
        )
        .route(
            "/api/scheduling/meetings/:id",
            get(scheduling_backend::routes::meeting_routes::get_meeting)
                .patch(scheduling_backend::routes::meeting_routes::update_meeting),
        )
        .route(
            "/api/scheduling/meetings/:id/cancel",
            post(scheduling_backend::routes::meeting_routes::cancel_meeting),
        )
        .route(
            "/api/scheduling/notifications",
            get(scheduling_backend::routes::notification_routes::list_notifications),
        )
        .route(
            "/api/scheduling/notifications/unread-count",
            get(scheduling_backend::routes::notification_routes::unread_count),
        )
        .layer(axum::middleware::from_fn(
            scheduling_backend::middleware::auth::require_party_auth,
        ))
        .layer(axum::middleware::from_fn_with_state(
            scheduling_backend::middleware::rate_limit::new_rps_state(1000),
            scheduling_backend::middleware::rate_limit::rps_middleware,
        ))
        .with_state(app_state)
}

fn bearer(user_id: Uuid, role: &str) -> String {
    let config = scheduling_backend::config::get_config();
    let claims = scheduling_backend::middleware::auth::Claims {
        sub: user_id.to_string(),
        exp: (Utc::now() + Duration::hours(1)).timestamp() as usize,
        role: Some(role.to_string()),
    };
    let token = jsonwebtoken::encode(
        &jsonwebtoken::Header::default(),
        &claims,
        &jsonwebtoken::EncodingKey::from_secret(config.jwt_secret.as_bytes()),
    )
    .expect("token");
    format!("Bearer {}", token)
}

fn authed(method: &str, uri: &str, auth: &str, body: Option<JsonValue>) -> Request<Body> {
    let builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("authorization", auth);
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn body_json(resp: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn parsed(value: &JsonValue) -> DateTime<Utc> {
    serde_json::from_value(value.clone()).expect("timestamp")
}

fn ts(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .expect("rfc3339")
        .with_timezone(&Utc)
}

async fn seed_user(pool: &PgPool, role: &str, name: &str) -> Uuid {
    let id = Uuid::new_v4();
    sqlx::query("INSERT INTO users (id, name, email, role, is_active) VALUES ($1, $2, $3, $4, TRUE)")
        .bind(id)
        .bind(name)
        .bind(format!("{}_{}@example.com", role, id))
        .bind(role)
        .execute(pool)
        .await
        .expect("seed user");
    id
}

async fn seed_job(pool: &PgPool, company_id: Uuid, title: &str) -> i64 {
    sqlx::query_scalar::<_, i64>("INSERT INTO jobs (company_id, title) VALUES ($1, $2) RETURNING id")
        .bind(company_id)
        .bind(title)
        .fetch_one(pool)
        .await
        .expect("seed job")
}

#[tokio::test]
async fn meeting_flow_end_to_end() {
    let Some(pool) = setup_pool().await else { return };
    let app = scheduling_router(pool.clone());

    let cand = seed_user(&pool, "candidate", "Alice Dole").await;
    let comp = seed_user(&pool, "company", "Initech Hiring").await;
    let job_id = seed_job(&pool, comp, "Backend Engineer").await;

    let cand_auth = bearer(cand, "candidate");
    let comp_auth = bearer(comp, "company");

    let t1 = "2026-09-01T10:00:00Z";
    let t2 = "2026-09-02T10:00:00Z";
    let t3 = "2026-09-03T16:00:00Z";

    // Company requests the meeting; its own side comes from the session.
    let resp = app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/scheduling/meetings",
            &comp_auth,
            Some(json!({
                "candidate_id": cand,
                "job_id": job_id,
                "scheduled_at": t1,
                "interview_type": "online",
                "location": "https://meet.example.com/abc"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "requested");
    assert_eq!(body["is_rescheduled"], false);
    assert_eq!(body["job_title"], "Backend Engineer");
    assert_eq!(body["candidate"]["name"], "Alice Dole");
    assert_eq!(body["company"]["name"], "Initech Hiring");
    let meeting_uri = format!("/api/scheduling/meetings/{}", body["id"].as_str().unwrap());

    // Creation itself sends nothing.
    let resp = app
        .clone()
        .oneshot(authed(
            "GET",
            "/api/scheduling/notifications/unread-count",
            &cand_auth,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["unread_count"], 0);

    // Company moves the time: candidate is told, first time is preserved.
    let resp = app
        .clone()
        .oneshot(authed(
            "PATCH",
            &meeting_uri,
            &comp_auth,
            Some(json!({ "scheduled_at": t2 })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["is_rescheduled"], true);
    assert_eq!(parsed(&body["scheduled_at"]), ts(t2));
    assert_eq!(parsed(&body["original_scheduled_at"]), ts(t1));
    assert!(body["rescheduled_at"].is_string());

    let resp = app
        .clone()
        .oneshot(authed(
            "GET",
            "/api/scheduling/notifications",
            &cand_auth,
            None,
        ))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["type"], "meeting_rescheduled");
    assert_eq!(
        parsed(&body["items"][0]["data"]["previous_scheduled_at"]),
        ts(t1)
    );
    assert!(body["items"][0]["message"]
        .as_str()
        .unwrap()
        .contains("2026-09-02 10:00 UTC"));

    // Candidate moves it again: company is told, original stays t1.
    let resp = app
        .clone()
        .oneshot(authed(
            "PATCH",
            &meeting_uri,
            &cand_auth,
            Some(json!({
                "scheduled_at": t3,
                "reschedule_reason": "Exam clash"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(parsed(&body["original_scheduled_at"]), ts(t1));
    assert_eq!(parsed(&body["scheduled_at"]), ts(t3));
    assert_eq!(body["reschedule_reason"], "Exam clash");

    let resp = app
        .clone()
        .oneshot(authed(
            "GET",
            "/api/scheduling/notifications/unread-count",
            &comp_auth,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["unread_count"], 1);

    // A bare status change is applied but never announced.
    let resp = app
        .clone()
        .oneshot(authed(
            "PATCH",
            &meeting_uri,
            &cand_auth,
            Some(json!({ "status": "accepted" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_json(resp).await["status"], "accepted");

    let resp = app
        .clone()
        .oneshot(authed(
            "GET",
            "/api/scheduling/notifications/unread-count",
            &comp_auth,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["unread_count"], 1);

    // Scoped listing with filters.
    let resp = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/api/scheduling/meetings?status=accepted&job_id={}", job_id),
            &cand_auth,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["total"], 1);
    assert_eq!(body["items"][0]["status"], "accepted");

    let resp = app
        .clone()
        .oneshot(authed("GET", &meeting_uri, &cand_auth, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Company cancels with a reason; candidate is told.
    let resp = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("{}/cancel", meeting_uri),
            &comp_auth,
            Some(json!({ "reason": "conflict" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "cancelled");
    assert_eq!(body["notes"], "conflict");

    let resp = app
        .clone()
        .oneshot(authed(
            "GET",
            "/api/scheduling/notifications",
            &cand_auth,
            None,
        ))
        .await
        .unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["total"], 2);
    assert_eq!(body["items"][0]["type"], "meeting_cancelled");
    assert!(body["items"][0]["message"]
        .as_str()
        .unwrap()
        .contains("conflict"));

    // Cancelling twice is a conflict.
    let resp = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("{}/cancel", meeting_uri),
            &cand_auth,
            Some(json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn first_scheduling_out_of_tbd_is_quiet() {
    let Some(pool) = setup_pool().await else { return };
    let app = scheduling_router(pool.clone());

    let cand = seed_user(&pool, "candidate", "Cara Untimed").await;
    let comp = seed_user(&pool, "company", "Later Inc").await;
    let comp_auth = bearer(comp, "company");
    let cand_auth = bearer(cand, "candidate");

    let resp = app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/scheduling/meetings",
            &comp_auth,
            Some(json!({ "candidate_id": cand })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    assert!(body["scheduled_at"].is_null());
    let meeting_uri = format!("/api/scheduling/meetings/{}", body["id"].as_str().unwrap());

    let resp = app
        .clone()
        .oneshot(authed(
            "PATCH",
            &meeting_uri,
            &comp_auth,
            Some(json!({ "scheduled_at": "2026-09-10T09:00:00Z" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["is_rescheduled"], false);
    assert!(body["original_scheduled_at"].is_null());

    let resp = app
        .clone()
        .oneshot(authed(
            "GET",
            "/api/scheduling/notifications/unread-count",
            &cand_auth,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(body_json(resp).await["unread_count"], 0);
}

#[tokio::test]
async fn access_control_and_validation() {
    let Some(pool) = setup_pool().await else { return };
    let app = scheduling_router(pool.clone());

    let cand = seed_user(&pool, "candidate", "Bob Vance").await;
    let comp = seed_user(&pool, "company", "Vance Refrigeration").await;
    let other_company = seed_user(&pool, "company", "Acme Talent").await;
    let outsider = seed_user(&pool, "candidate", "Nosy Parker").await;

    let comp_auth = bearer(comp, "company");
    let cand_auth = bearer(cand, "candidate");

    let resp = app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/scheduling/meetings",
            &comp_auth,
            Some(json!({
                "candidate_id": cand,
                "scheduled_at": "2026-09-01T10:00:00Z"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);
    let body = body_json(resp).await;
    let meeting_uri = format!("/api/scheduling/meetings/{}", body["id"].as_str().unwrap());

    // No token at all.
    let req = Request::builder()
        .method("GET")
        .uri(&meeting_uri)
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // A token that does not verify.
    let resp = app
        .clone()
        .oneshot(authed("GET", &meeting_uri, "Bearer not.a.jwt", None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // A third party, authenticated but uninvolved.
    let outsider_auth = bearer(outsider, "candidate");
    let resp = app
        .clone()
        .oneshot(authed("GET", &meeting_uri, &outsider_auth, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .clone()
        .oneshot(authed(
            "PATCH",
            &meeting_uri,
            &outsider_auth,
            Some(json!({ "status": "rejected" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let resp = app
        .clone()
        .oneshot(authed(
            "POST",
            &format!("{}/cancel", meeting_uri),
            &outsider_auth,
            Some(json!({})),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    // Admins may read any meeting.
    let admin_auth = bearer(Uuid::new_v4(), "admin");
    let resp = app
        .clone()
        .oneshot(authed("GET", &meeting_uri, &admin_auth, None))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    // Unknown meeting id.
    let resp = app
        .clone()
        .oneshot(authed(
            "GET",
            &format!("/api/scheduling/meetings/{}", Uuid::new_v4()),
            &comp_auth,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Candidate creating without naming the company.
    let resp = app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/scheduling/meetings",
            &cand_auth,
            Some(json!({ "scheduled_at": "2026-09-01T10:00:00Z" })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Counter-party id that exists but has the wrong role.
    let resp = app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/scheduling/meetings",
            &comp_auth,
            Some(json!({ "candidate_id": other_company })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // Counter-party id that does not exist at all.
    let resp = app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/scheduling/meetings",
            &comp_auth,
            Some(json!({ "candidate_id": Uuid::new_v4() })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // A date that is not a date.
    let resp = app
        .clone()
        .oneshot(authed(
            "POST",
            "/api/scheduling/meetings",
            &comp_auth,
            Some(json!({
                "candidate_id": cand,
                "scheduled_at": "tomorrow-ish"
            })),
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNPROCESSABLE_ENTITY);

    // Same for query-string dates.
    let resp = app
        .clone()
        .oneshot(authed(
            "GET",
            "/api/scheduling/meetings?scheduled_from=banana",
            &comp_auth,
            None,
        ))
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
}
