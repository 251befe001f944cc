use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Json},
    Extension,
};
use uuid::Uuid;
use validator::Validate;

use crate::{
    dto::meeting_dto::{
        CancelMeetingPayload, CreateMeetingPayload, MeetingListQuery, MeetingListResponse,
        MeetingResponse, UpdateMeetingPayload,
    },
    error::Result,
    middleware::auth::Identity,
    services::meeting_service::MeetingList,
    AppState,
};

#[utoipa::path(
    post,
    path = "/api/scheduling/meetings",
    request_body = CreateMeetingPayload,
    responses(
        (status = 201, description = "Meeting requested", body = Json<MeetingResponse>),
        (status = 400, description = "Invalid payload or unknown party")
    )
)]
#[axum::debug_handler]
pub async fn create_meeting(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Json(payload): Json<CreateMeetingPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let meeting = state.meeting_service.create(&identity, payload).await?;
    let view: MeetingResponse = state.meeting_service.view(meeting).await?;
    Ok((StatusCode::CREATED, Json(view)))
}

#[utoipa::path(
    get,
    path = "/api/scheduling/meetings",
    params(
        ("page" = Option<i64>, Query, description = "Page number"),
        ("per_page" = Option<i64>, Query, description = "Items per page"),
        ("status" = Option<String>, Query, description = "Filter by status"),
        ("job_id" = Option<i64>, Query, description = "Filter by job"),
        ("scheduled_from" = Option<String>, Query, description = "Scheduled at or after (RFC 3339)"),
        ("scheduled_to" = Option<String>, Query, description = "Scheduled at or before (RFC 3339)")
    ),
    responses(
        (status = 200, description = "Meetings visible to the caller", body = Json<MeetingListResponse>)
    )
)]
#[axum::debug_handler]
pub async fn list_meetings(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Query(query): Query<MeetingListQuery>,
) -> Result<impl IntoResponse> {
    let MeetingList {
        items,
        total,
        page,
        per_page,
        total_pages,
    } = state.meeting_service.list(&identity, query).await?;
    let items = state.meeting_service.views(items).await?;

    Ok(Json(MeetingListResponse {
        items,
        total,
        page,
        per_page,
        total_pages,
    }))
}

#[utoipa::path(
    get,
    path = "/api/scheduling/meetings/{id}",
    params(
        ("id" = Uuid, Path, description = "Meeting ID")
    ),
    responses(
        (status = 200, description = "Meeting detail", body = Json<MeetingResponse>),
        (status = 403, description = "Caller is not a party"),
        (status = 404, description = "Meeting not found")
    )
)]
#[axum::debug_handler]
pub async fn get_meeting(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
) -> Result<impl IntoResponse> {
    let meeting = state.meeting_service.get_for(&identity, id).await?;
    let view: MeetingResponse = state.meeting_service.view(meeting).await?;
    Ok(Json(view))
}

#[utoipa::path(
    patch,
    path = "/api/scheduling/meetings/{id}",
    params(
        ("id" = Uuid, Path, description = "Meeting ID")
    ),
    request_body = UpdateMeetingPayload,
    responses(
        (status = 200, description = "Meeting updated", body = Json<MeetingResponse>),
        (status = 400, description = "Invalid payload"),
        (status = 403, description = "Caller is not a party"),
        (status = 404, description = "Meeting not found")
    )
)]
#[axum::debug_handler]
pub async fn update_meeting(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    Json(payload): Json<UpdateMeetingPayload>,
) -> Result<impl IntoResponse> {
    payload.validate()?;
    let meeting = state.meeting_service.update(&identity, id, payload).await?;
    let view: MeetingResponse = state.meeting_service.view(meeting).await?;
    Ok(Json(view))
}

#[utoipa::path(
    post,
    path = "/api/scheduling/meetings/{id}/cancel",
    params(
        ("id" = Uuid, Path, description = "Meeting ID")
    ),
    request_body = CancelMeetingPayload,
    responses(
        (status = 200, description = "Meeting cancelled", body = Json<MeetingResponse>),
        (status = 403, description = "Caller is not a party"),
        (status = 404, description = "Meeting not found"),
        (status = 422, description = "Meeting already finished or cancelled")
    )
)]
#[axum::debug_handler]
pub async fn cancel_meeting(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    Path(id): Path<Uuid>,
    payload: Option<Json<CancelMeetingPayload>>,
) -> Result<impl IntoResponse> {
    let reason = match payload {
        Some(Json(payload)) => {
            payload.validate()?;
            payload.reason
        }
        None => None,
    };

    let meeting = state
        .meeting_service
        .cancel(&identity, id, reason.as_deref())
        .await?;
    let view: MeetingResponse = state.meeting_service.view(meeting).await?;
    Ok(Json(view))
}
