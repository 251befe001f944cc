use chrono::{DateTime, Utc};
use serde_json::{json, Value as JsonValue};
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::meeting_dto::{CreateMeetingPayload, MeetingListQuery, UpdateMeetingPayload};
use crate::error::{Error, Result};
use crate::middleware::auth::Identity;
use crate::models::meeting::{Meeting, MeetingStatus, NewMeeting};
use crate::models::user::Role;
use crate::utils::time;

pub const RESCHEDULED_EVENT: &str = "meeting_rescheduled";
pub const CANCELLED_EVENT: &str = "meeting_cancelled";

#[derive(Clone)]
pub struct MeetingService {
    pool: PgPool,
    notifications: super::notification_service::NotificationService,
    directory: super::directory_service::DirectoryService,
}

pub struct MeetingList {
    pub items: Vec<Meeting>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

/// A pending in-app notification for the counter-party of a change.
#[derive(Debug, Clone)]
pub struct Notice {
    pub recipient: Uuid,
    pub notification_type: &'static str,
    pub title: String,
    pub message: String,
    pub data: JsonValue,
}

/// Result of planning a mutation: the meeting as it should be persisted,
/// plus whatever side effects the change earned.
#[derive(Debug, Clone)]
pub struct UpdateOutcome {
    pub meeting: Meeting,
    pub notice: Option<Notice>,
    pub status_change: Option<(MeetingStatus, MeetingStatus)>,
}

/// Fills in the caller's own side of the table from the session. Admins
/// must name both parties explicitly.
pub fn resolve_parties(
    identity: &Identity,
    candidate_id: Option<Uuid>,
    company_id: Option<Uuid>,
) -> Result<(Uuid, Uuid)> {
    let (candidate_id, company_id) = match identity.role {
        Role::Candidate => (Some(identity.user_id), company_id),
        Role::Company => (candidate_id, Some(identity.user_id)),
        Role::Admin => (candidate_id, company_id),
    };

    match (candidate_id, company_id) {
        (Some(candidate), Some(company)) => Ok((candidate, company)),
        (None, _) => Err(Error::BadRequest("candidate_id is required".to_string())),
        (_, None) => Err(Error::BadRequest("company_id is required".to_string())),
    }
}

/// The party id a change is attributed to. Admins act for the company side,
/// so their changes notify the candidate.
fn effective_actor(meeting: &Meeting, identity: &Identity) -> Result<Uuid> {
    if identity.role == Role::Admin {
        return Ok(meeting.company_id);
    }
    if meeting.is_party(identity.user_id) {
        return Ok(identity.user_id);
    }
    Err(Error::Forbidden(
        "Not a party to this meeting".to_string(),
    ))
}

/// Applies an update payload to a meeting without touching storage.
///
/// A reschedule is a supplied `scheduled_at` that differs from a previously
/// set one. First agreement on a time (out of TBD) does not count, and a
/// reschedule is the only change that owes the counter-party a notice.
pub fn plan_update(
    meeting: &Meeting,
    identity: &Identity,
    payload: &UpdateMeetingPayload,
    now: DateTime<Utc>,
) -> Result<UpdateOutcome> {
    let actor = effective_actor(meeting, identity)?;
    let previous_time = meeting.scheduled_at;

    let mut updated = meeting.clone();
    let mut rescheduled = false;

    if let Some(new_time) = payload.scheduled_at {
        if let Some(current) = meeting.scheduled_at {
            if new_time != current {
                if !updated.is_rescheduled {
                    // Write-once: later reschedules keep the first agreed time.
                    updated.original_scheduled_at = Some(current);
                }
                updated.is_rescheduled = true;
                updated.rescheduled_at = Some(now);
                rescheduled = true;
            }
        }
        updated.scheduled_at = Some(new_time);
    }

    let mut status_change = None;
    if let Some(status) = payload.status {
        if status != meeting.status {
            status_change = Some((meeting.status, status));
        }
        updated.status = status;
    }
    if let Some(kind) = payload.interview_type {
        updated.interview_type = kind;
    }
    if let Some(ref location) = payload.location {
        updated.location = Some(location.clone());
    }
    if let Some(ref title) = payload.job_title {
        updated.job_title = Some(title.clone());
    }
    if let Some(ref notes) = payload.notes {
        updated.notes = Some(notes.clone());
    }
    if let Some(ref reason) = payload.reschedule_reason {
        updated.reschedule_reason = Some(reason.clone());
    }
    updated.updated_at = now;

    let notice = if rescheduled {
        Some(reschedule_notice(
            &updated,
            previous_time,
            updated.counter_party_of(actor),
        ))
    } else {
        None
    };

    Ok(UpdateOutcome {
        meeting: updated,
        notice,
        status_change,
    })
}

/// Cancellation of an active meeting. Always owes the counter-party a
/// notice; cancelled and completed meetings cannot be cancelled again.
pub fn plan_cancel(
    meeting: &Meeting,
    identity: &Identity,
    reason: Option<&str>,
    now: DateTime<Utc>,
) -> Result<UpdateOutcome> {
    let actor = effective_actor(meeting, identity)?;

    match meeting.status {
        MeetingStatus::Cancelled => {
            return Err(Error::Conflict(
                "Meeting is already cancelled".to_string(),
            ))
        }
        MeetingStatus::Completed => {
            return Err(Error::Conflict(
                "A completed meeting cannot be cancelled".to_string(),
            ))
        }
        _ => {}
    }

    let mut updated = meeting.clone();
    updated.status = MeetingStatus::Cancelled;
    if let Some(reason) = reason {
        updated.notes = Some(reason.to_string());
    }
    updated.updated_at = now;

    let notice = cancellation_notice(&updated, reason, updated.counter_party_of(actor));

    Ok(UpdateOutcome {
        meeting: updated,
        notice: Some(notice),
        status_change: Some((meeting.status, MeetingStatus::Cancelled)),
    })
}

pub fn reschedule_notice(
    meeting: &Meeting,
    previous: Option<DateTime<Utc>>,
    recipient: Uuid,
) -> Notice {
    let when = meeting
        .scheduled_at
        .map(time::format_instant)
        .unwrap_or_else(|| "a new time".to_string());
    let message = match meeting.job_title.as_deref() {
        Some(title) => format!("The interview for \"{}\" has been moved to {}.", title, when),
        None => format!("The interview has been moved to {}.", when),
    };

    Notice {
        recipient,
        notification_type: RESCHEDULED_EVENT,
        title: "Interview rescheduled".to_string(),
        message,
        data: json!({
            "meeting_id": meeting.id,
            "job_id": meeting.job_id,
            "job_title": meeting.job_title,
            "scheduled_at": meeting.scheduled_at,
            "previous_scheduled_at": previous,
            "reschedule_reason": meeting.reschedule_reason,
        }),
    }
}

pub fn cancellation_notice(meeting: &Meeting, reason: Option<&str>, recipient: Uuid) -> Notice {
    let message = match (meeting.job_title.as_deref(), reason) {
        (Some(title), Some(reason)) => {
            format!("The interview for \"{}\" was cancelled: {}", title, reason)
        }
        (Some(title), None) => format!("The interview for \"{}\" was cancelled.", title),
        (None, Some(reason)) => format!("The interview was cancelled: {}", reason),
        (None, None) => "The interview was cancelled.".to_string(),
    };

    Notice {
        recipient,
        notification_type: CANCELLED_EVENT,
        title: "Interview cancelled".to_string(),
        message,
        data: json!({
            "meeting_id": meeting.id,
            "job_id": meeting.job_id,
            "job_title": meeting.job_title,
            "scheduled_at": meeting.scheduled_at,
            "reason": reason,
        }),
    }
}

impl MeetingService {
    pub fn new(
        pool: PgPool,
        notifications: super::notification_service::NotificationService,
        directory: super::directory_service::DirectoryService,
    ) -> Self {
        Self {
            pool,
            notifications,
            directory,
        }
    }

    pub async fn create(&self, identity: &Identity, payload: CreateMeetingPayload) -> Result<Meeting> {
        let (candidate_id, company_id) =
            resolve_parties(identity, payload.candidate_id, payload.company_id)?;

        self.directory.require_party(candidate_id, Role::Candidate).await?;
        self.directory.require_party(company_id, Role::Company).await?;

        let mut job_title = payload.job_title;
        if let Some(job_id) = payload.job_id {
            let job = self
                .directory
                .find_job(job_id)
                .await?
                .ok_or_else(|| Error::BadRequest(format!("Unknown job id {}", job_id)))?;
            // Snapshot the title so the meeting keeps it if the job goes away.
            if job_title.is_none() {
                job_title = Some(job.title);
            }
        }

        let meeting = Meeting::request(
            NewMeeting {
                candidate_id,
                company_id,
                job_id: payload.job_id,
                job_title,
                scheduled_at: payload.scheduled_at,
                interview_type: payload.interview_type.unwrap_or_default(),
                location: payload.location,
                notes: payload.notes,
            },
            time::now(),
        );

        let created = sqlx::query_as::<_, Meeting>(
            r#"
            INSERT INTO meetings (
                id, candidate_id, company_id, job_id, job_title, scheduled_at,
                interview_type, location, status, notes, is_rescheduled,
                original_scheduled_at, rescheduled_at, reschedule_reason,
                created_at, updated_at
            ) VALUES (
                $1, $2, $3, $4, $5, $6,
                $7, $8, $9, $10, $11,
                $12, $13, $14,
                $15, $16
            )
            RETURNING *
            "#,
        )
        .bind(meeting.id)
        .bind(meeting.candidate_id)
        .bind(meeting.company_id)
        .bind(meeting.job_id)
        .bind(&meeting.job_title)
        .bind(meeting.scheduled_at)
        .bind(meeting.interview_type)
        .bind(&meeting.location)
        .bind(meeting.status)
        .bind(&meeting.notes)
        .bind(meeting.is_rescheduled)
        .bind(meeting.original_scheduled_at)
        .bind(meeting.rescheduled_at)
        .bind(&meeting.reschedule_reason)
        .bind(meeting.created_at)
        .bind(meeting.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(created)
    }

    pub async fn get_for(&self, identity: &Identity, id: Uuid) -> Result<Meeting> {
        let meeting = self.fetch(id).await?;

        if identity.role != Role::Admin && !meeting.is_party(identity.user_id) {
            return Err(Error::Forbidden(
                "Not a party to this meeting".to_string(),
            ));
        }

        Ok(meeting)
    }

    /// Meetings visible to the caller, newest first. Candidates and
    /// companies only ever see their own side; admins see everything.
    pub async fn list(&self, identity: &Identity, query: MeetingListQuery) -> Result<MeetingList> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;

        let (candidate_scope, company_scope) = match identity.role {
            Role::Candidate => (Some(identity.user_id), None),
            Role::Company => (None, Some(identity.user_id)),
            Role::Admin => (None, None),
        };

        let items = sqlx::query_as::<_, Meeting>(
            r#"
            SELECT * FROM meetings
            WHERE ($1::uuid IS NULL OR candidate_id = $1)
              AND ($2::uuid IS NULL OR company_id = $2)
              AND ($3::meeting_status IS NULL OR status = $3)
              AND ($4::bigint IS NULL OR job_id = $4)
              AND ($5::timestamptz IS NULL OR scheduled_at >= $5)
              AND ($6::timestamptz IS NULL OR scheduled_at <= $6)
            ORDER BY created_at DESC
            LIMIT $7 OFFSET $8
            "#,
        )
        .bind(candidate_scope)
        .bind(company_scope)
        .bind(query.status)
        .bind(query.job_id)
        .bind(query.scheduled_from)
        .bind(query.scheduled_to)
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM meetings
            WHERE ($1::uuid IS NULL OR candidate_id = $1)
              AND ($2::uuid IS NULL OR company_id = $2)
              AND ($3::meeting_status IS NULL OR status = $3)
              AND ($4::bigint IS NULL OR job_id = $4)
              AND ($5::timestamptz IS NULL OR scheduled_at >= $5)
              AND ($6::timestamptz IS NULL OR scheduled_at <= $6)
            "#,
        )
        .bind(candidate_scope)
        .bind(company_scope)
        .bind(query.status)
        .bind(query.job_id)
        .bind(query.scheduled_from)
        .bind(query.scheduled_to)
        .fetch_one(&self.pool)
        .await?;

        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;

        Ok(MeetingList {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn update(
        &self,
        identity: &Identity,
        id: Uuid,
        payload: UpdateMeetingPayload,
    ) -> Result<Meeting> {
        let meeting = self.fetch(id).await?;
        let outcome = plan_update(&meeting, identity, &payload, time::now())?;
        let persisted = self.persist(&outcome.meeting).await?;

        if let Some((from, to)) = outcome.status_change {
            tracing::info!(
                "Meeting {} moved from {:?} to {:?}",
                persisted.id,
                from,
                to
            );
        }
        self.dispatch(persisted.id, outcome.notice).await;

        Ok(persisted)
    }

    pub async fn cancel(&self, identity: &Identity, id: Uuid, reason: Option<&str>) -> Result<Meeting> {
        let meeting = self.fetch(id).await?;
        let outcome = plan_cancel(&meeting, identity, reason, time::now())?;
        let persisted = self.persist(&outcome.meeting).await?;

        if let Some((from, to)) = outcome.status_change {
            tracing::info!(
                "Meeting {} moved from {:?} to {:?}",
                persisted.id,
                from,
                to
            );
        }
        self.dispatch(persisted.id, outcome.notice).await;

        Ok(persisted)
    }

    async fn fetch(&self, id: Uuid) -> Result<Meeting> {
        let meeting = sqlx::query_as::<_, Meeting>("SELECT * FROM meetings WHERE id = $1")
            .bind(id)
            .fetch_one(&self.pool)
            .await?;

        Ok(meeting)
    }

    /// Writes back every mutable column. Party ids, job linkage and
    /// `created_at` never change after creation.
    async fn persist(&self, meeting: &Meeting) -> Result<Meeting> {
        let updated = sqlx::query_as::<_, Meeting>(
            r#"
            UPDATE meetings SET
                scheduled_at = $2,
                interview_type = $3,
                location = $4,
                job_title = $5,
                status = $6,
                notes = $7,
                is_rescheduled = $8,
                original_scheduled_at = $9,
                rescheduled_at = $10,
                reschedule_reason = $11,
                updated_at = $12
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(meeting.id)
        .bind(meeting.scheduled_at)
        .bind(meeting.interview_type)
        .bind(&meeting.location)
        .bind(&meeting.job_title)
        .bind(meeting.status)
        .bind(&meeting.notes)
        .bind(meeting.is_rescheduled)
        .bind(meeting.original_scheduled_at)
        .bind(meeting.rescheduled_at)
        .bind(&meeting.reschedule_reason)
        .bind(meeting.updated_at)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    /// The meeting row is the source of truth; a failed notification write
    /// is logged and dropped, never rolled back into the mutation.
    async fn dispatch(&self, meeting_id: Uuid, notice: Option<Notice>) {
        let Some(notice) = notice else { return };

        if let Err(e) = self
            .notifications
            .notify(
                notice.recipient,
                notice.notification_type,
                &notice.title,
                &notice.message,
                notice.data,
            )
            .await
        {
            tracing::error!(
                "Failed to record counter-party notification for meeting {}: {:?}",
                meeting_id,
                e
            );
        }
    }

    pub async fn view(&self, meeting: Meeting) -> Result<crate::dto::meeting_dto::MeetingResponse> {
        let parties = self
            .directory
            .users_by_ids(&[meeting.candidate_id, meeting.company_id])
            .await?;

        Ok(crate::dto::meeting_dto::MeetingResponse::from_parts(
            meeting, &parties,
        ))
    }

    pub async fn views(
        &self,
        meetings: Vec<Meeting>,
    ) -> Result<Vec<crate::dto::meeting_dto::MeetingResponse>> {
        let mut ids: Vec<Uuid> = Vec::with_capacity(meetings.len() * 2);
        for meeting in &meetings {
            ids.push(meeting.candidate_id);
            ids.push(meeting.company_id);
        }
        ids.sort_unstable();
        ids.dedup();

        let parties = self.directory.users_by_ids(&ids).await?;

        Ok(meetings
            .into_iter()
            .map(|meeting| crate::dto::meeting_dto::MeetingResponse::from_parts(meeting, &parties))
            .collect())
    }
}
