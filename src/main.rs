use axum::{
    routing::{get, post},
    Router,
};
use scheduling_backend::{
    config::{get_config, init_config},
    database::pool::create_pool,
    routes, AppState,
};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();
    init_config()?;
    let config = get_config();

    let pool = create_pool().await?;
    sqlx::migrate!("./migrations").run(&pool).await?;

    let app_state = AppState::new(pool);

    let base_routes = Router::new().route("/health", get(routes::health::health));

    // Party-facing surface. Everything here requires a bearer token and
    // shares one rate-limit window.
    let scheduling_api = Router::new()
        .route(
            "/api/scheduling/meetings",
            get(routes::meeting_routes::list_meetings).post(routes::meeting_routes::create_meeting),
        )
        .route(
            "/api/scheduling/meetings/:id",
            get(routes::meeting_routes::get_meeting).patch(routes::meeting_routes::update_meeting),
        )
        .route(
            "/api/scheduling/meetings/:id/cancel",
            post(routes::meeting_routes::cancel_meeting),
        )
        .route(
            "/api/scheduling/notifications",
            get(routes::notification_routes::list_notifications),
        )
        .route(
            "/api/scheduling/notifications/unread-count",
            get(routes::notification_routes::unread_count),
        )
        .route(
            "/api/scheduling/notifications/read-all",
            post(routes::notification_routes::mark_all_notifications_read),
        )
        .route(
            "/api/scheduling/notifications/:id/read",
            post(routes::notification_routes::mark_notification_read),
        )
        .route(
            "/api/scheduling/notifications/:id",
            axum::routing::delete(routes::notification_routes::delete_notification),
        )
        .layer(axum::middleware::from_fn(
            scheduling_backend::middleware::auth::require_party_auth,
        ))
        .layer(axum::middleware::from_fn_with_state(
            scheduling_backend::middleware::rate_limit::new_rps_state(config.scheduling_rps),
            scheduling_backend::middleware::rate_limit::rps_middleware,
        ));

    // Trusted service-to-service surface, no bearer auth.
    let internal_api = Router::new()
        .route(
            "/api/internal/jobs/:job_id/applicants",
            get(routes::applicant_routes::list_job_applicants),
        )
        .layer(axum::middleware::from_fn_with_state(
            scheduling_backend::middleware::rate_limit::new_rps_state(config.internal_rps),
            scheduling_backend::middleware::rate_limit::rps_middleware,
        ));

    let app = base_routes
        .merge(scheduling_api)
        .merge(internal_api)
        .with_state(app_state)
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http());

    let addr: SocketAddr = config.server_address.parse()?;
    info!("Scheduling service listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
