use axum::{
    extract::{Path, State},
    response::{IntoResponse, Json},
};
use uuid::Uuid;

use crate::{
    dto::applicant_dto::{ApplicantListResponse, ApplicantResponse},
    error::Result,
    AppState,
};

/// Applicant list for a job with each row's interview attached by
/// (job_id, candidate_id) match.
#[axum::debug_handler]
pub async fn list_job_applicants(
    State(state): State<AppState>,
    Path(job_id): Path<i64>,
) -> Result<impl IntoResponse> {
    let applications = state
        .correlation_service
        .applications_for_job(job_id)
        .await?;
    let decorated = state
        .correlation_service
        .attach_interviews(job_id, applications)
        .await?;

    let candidate_ids: Vec<Uuid> = decorated
        .iter()
        .map(|entry| entry.application.candidate_id)
        .collect();
    let users = state.directory_service.users_by_ids(&candidate_ids).await?;

    let items = decorated
        .into_iter()
        .map(|entry| ApplicantResponse::from_parts(entry, &users))
        .collect();

    Ok(Json(ApplicantListResponse { items }))
}
