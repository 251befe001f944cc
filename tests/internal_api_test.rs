use std::env;

use axum::{
    body::{to_bytes, Body},
    http::{Request, StatusCode},
    routing::get,
    Router,
};
use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use tower::ServiceExt;
use uuid::Uuid;

use scheduling_backend::{
    dto::meeting_dto::CreateMeetingPayload,
    middleware::auth::Identity,
    models::{meeting::InterviewType, user::Role},
    AppState,
};

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

fn internal_router(app_state: AppState) -> Router {
    Router::new()
        .route(
            "/api/internal/jobs/:job_id/applicants",
            get(scheduling_backend::routes::applicant_routes::list_job_applicants),
        )
        .layer(axum::middleware::from_fn_with_state(
            scheduling_backend::middleware::rate_limit::new_rps_state(1000),
            scheduling_backend::middleware::rate_limit::rps_middleware,
        ))
        .with_state(app_state)
}

async fn body_json(resp: axum::response::Response) -> JsonValue {
    let bytes = to_bytes(resp.into_body(), 1024 * 1024).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

async fn get_applicants(app: &Router, job_id: i64) -> (StatusCode, JsonValue) {
    let req = Request::builder()
        .method("GET")
        .uri(format!("/api/internal/jobs/{}/applicants", job_id))
        .body(Body::empty())
        .unwrap();
    let resp = app.clone().oneshot(req).await.unwrap();
    let status = resp.status();
    (status, body_json(resp).await)
}

fn row_for<'a>(items: &'a [JsonValue], candidate_id: Uuid) -> &'a JsonValue {
    items
        .iter()
        .find(|row| row["candidate"]["id"] == json!(candidate_id))
        .expect("applicant row")
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

async fn seed_application(pool: &PgPool, job_id: i64, candidate_id: Uuid) {
    sqlx::query("INSERT INTO applications (job_id, candidate_id) VALUES ($1, $2)")
        .bind(job_id)
        .bind(candidate_id)
        .execute(pool)
        .await
        .expect("seed application");
}

#[tokio::test]
async fn applicants_carry_their_own_interview_only() {
    let Some(pool) = setup_pool().await else { return };
    let app_state = AppState::new(pool.clone());
    let app = internal_router(app_state.clone());

    let company = seed_user(&pool, "company", "Globex Recruiting").await;
    let nina = seed_user(&pool, "candidate", "Nina Applicant").await;
    let quiet = seed_user(&pool, "candidate", "Quiet Applicant").await;
    let data_job = seed_job(&pool, company, "Data Engineer").await;
    let support_job = seed_job(&pool, company, "Support Engineer").await;

    // Nina applied to both jobs, but only the data role has an interview.
    seed_application(&pool, data_job, nina).await;
    seed_application(&pool, support_job, nina).await;
    seed_application(&pool, data_job, quiet).await;

    let scheduled: DateTime<Utc> = "2026-09-01T10:00:00Z".parse().expect("rfc3339");
    let identity = Identity {
        user_id: company,
        role: Role::Company,
    };
    let meeting = app_state
        .meeting_service
        .create(
            &identity,
            CreateMeetingPayload {
                candidate_id: Some(nina),
                company_id: None,
                scheduled_at: Some(scheduled),
                interview_type: Some(InterviewType::Online),
                location: None,
                job_id: Some(data_job),
                job_title: None,
                notes: None,
            },
        )
        .await
        .expect("meeting");

    let (status, body) = get_applicants(&app, data_job).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 2);

    let nina_row = row_for(items, nina);
    assert_eq!(nina_row["candidate"]["name"], "Nina Applicant");
    assert_eq!(nina_row["status"], "submitted");
    assert_eq!(nina_row["interview"]["id"], json!(meeting.id));
    assert_eq!(nina_row["interview"]["status"], "requested");
    assert_eq!(nina_row["interview"]["is_rescheduled"], false);

    let quiet_row = row_for(items, quiet);
    assert!(quiet_row["interview"].is_null());

    // The same candidate's other application stays bare: the interview
    // belongs to (data_job, nina), not to nina everywhere.
    let (status, body) = get_applicants(&app, support_job).await;
    assert_eq!(status, StatusCode::OK);
    let items = body["items"].as_array().unwrap();
    assert_eq!(items.len(), 1);
    assert!(row_for(items, nina)["interview"].is_null());

    // A job nobody applied to is an empty list, not an error.
    let (status, body) = get_applicants(&app, 999_999_999).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["items"].as_array().unwrap().len(), 0);
}
