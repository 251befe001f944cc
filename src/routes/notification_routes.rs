use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use serde_json::json;
use uuid::Uuid;

use crate::{
    dto::notification_dto::{
        NotificationListQuery, NotificationListResponse, NotificationResponse,
    },
    error::Result,
    middleware::auth::Identity,
    AppState,
};

#[axum::debug_handler]
pub async fn list_notifications(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<NotificationListQuery>,
) -> Result<impl IntoResponse> {
    let list = state
        .notification_service
        .list_for(identity.user_id, query)
        .await?;
    Ok(Json(NotificationListResponse::from(list)))
}

#[axum::debug_handler]
pub async fn unread_count(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse> {
    let count = state
        .notification_service
        .unread_count(identity.user_id)
        .await?;
    Ok(Json(json!({ "unread_count": count })))
}

#[axum::debug_handler]
pub async fn mark_notification_read(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let notification = state
        .notification_service
        .mark_read(identity.user_id, id)
        .await?;
    Ok(Json(NotificationResponse::from(notification)))
}

#[axum::debug_handler]
pub async fn mark_all_notifications_read(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
) -> Result<impl IntoResponse> {
    let marked = state
        .notification_service
        .mark_all_read(identity.user_id)
        .await?;
    Ok(Json(json!({ "marked_read": marked })))
}

#[axum::debug_handler]
pub async fn delete_notification(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    state
        .notification_service
        .delete(identity.user_id, id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}
