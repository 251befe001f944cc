use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

use crate::models::meeting::{InterviewType, Meeting, MeetingStatus};
use crate::models::user::User;

/// Party ids may be omitted by non-admin callers; the session fills in the
/// caller's own side.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CreateMeetingPayload {
    pub candidate_id: Option<Uuid>,
    pub company_id: Option<Uuid>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub interview_type: Option<InterviewType>,
    #[validate(length(min = 1))]
    pub location: Option<String>,
    pub job_id: Option<i64>,
    #[validate(length(min = 1))]
    pub job_title: Option<String>,
    pub notes: Option<String>,
}

/// Absent fields keep their stored value. `scheduled_at` can only be moved,
/// never cleared.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct UpdateMeetingPayload {
    pub status: Option<MeetingStatus>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub interview_type: Option<InterviewType>,
    #[validate(length(min = 1))]
    pub location: Option<String>,
    #[validate(length(min = 1))]
    pub job_title: Option<String>,
    pub notes: Option<String>,
    #[validate(length(min = 1))]
    pub reschedule_reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct CancelMeetingPayload {
    #[validate(length(min = 1))]
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct MeetingListQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
    pub status: Option<MeetingStatus>,
    pub job_id: Option<i64>,
    pub scheduled_from: Option<DateTime<Utc>>,
    pub scheduled_to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartySummary {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingResponse {
    pub id: Uuid,
    pub candidate: Option<PartySummary>,
    pub company: Option<PartySummary>,
    pub status: MeetingStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub interview_type: InterviewType,
    pub location: Option<String>,
    pub job_id: Option<i64>,
    pub job_title: Option<String>,
    pub notes: Option<String>,
    pub is_rescheduled: bool,
    pub original_scheduled_at: Option<DateTime<Utc>>,
    pub rescheduled_at: Option<DateTime<Utc>>,
    pub reschedule_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MeetingListResponse {
    pub items: Vec<MeetingResponse>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl From<User> for PartySummary {
    fn from(value: User) -> Self {
        Self {
            id: value.id,
            name: value.name,
            email: value.email,
            role: value.role,
        }
    }
}

impl MeetingResponse {
    pub fn from_parts(meeting: Meeting, parties: &HashMap<Uuid, User>) -> Self {
        let candidate = parties
            .get(&meeting.candidate_id)
            .cloned()
            .map(PartySummary::from);
        let company = parties
            .get(&meeting.company_id)
            .cloned()
            .map(PartySummary::from);

        Self {
            id: meeting.id,
            candidate,
            company,
            status: meeting.status,
            scheduled_at: meeting.scheduled_at,
            interview_type: meeting.interview_type,
            location: meeting.location,
            job_id: meeting.job_id,
            job_title: meeting.job_title,
            notes: meeting.notes,
            is_rescheduled: meeting.is_rescheduled,
            original_scheduled_at: meeting.original_scheduled_at,
            rescheduled_at: meeting.rescheduled_at,
            reschedule_reason: meeting.reschedule_reason,
            created_at: meeting.created_at,
            updated_at: meeting.updated_at,
        }
    }
}
