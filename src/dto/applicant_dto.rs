use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::dto::meeting_dto::PartySummary;
use crate::models::meeting::{InterviewType, Meeting, MeetingStatus};
use crate::models::user::User;
use crate::services::correlation_service::ApplicationWithInterview;

/// Interview fields surfaced on an applicant row. Stays `None` when no
/// meeting matches the application's (job, candidate) pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterviewSummary {
    pub id: Uuid,
    pub status: MeetingStatus,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub interview_type: InterviewType,
    pub location: Option<String>,
    pub is_rescheduled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicantResponse {
    pub application_id: i64,
    pub job_id: i64,
    pub candidate: Option<PartySummary>,
    pub status: String,
    pub applied_at: Option<DateTime<Utc>>,
    pub interview: Option<InterviewSummary>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicantListResponse {
    pub items: Vec<ApplicantResponse>,
}

impl From<Meeting> for InterviewSummary {
    fn from(value: Meeting) -> Self {
        Self {
            id: value.id,
            status: value.status,
            scheduled_at: value.scheduled_at,
            interview_type: value.interview_type,
            location: value.location,
            is_rescheduled: value.is_rescheduled,
        }
    }
}

impl ApplicantResponse {
    pub fn from_parts(entry: ApplicationWithInterview, users: &HashMap<Uuid, User>) -> Self {
        let candidate = users
            .get(&entry.application.candidate_id)
            .cloned()
            .map(PartySummary::from);

        Self {
            application_id: entry.application.id,
            job_id: entry.application.job_id,
            candidate,
            status: entry.application.status,
            applied_at: entry.application.created_at,
            interview: entry.interview.map(InterviewSummary::from),
        }
    }
}
