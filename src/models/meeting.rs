use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "meeting_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MeetingStatus {
    Requested,
    Accepted,
    Rejected,
    Completed,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "interview_type", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum InterviewType {
    #[default]
    Physical,
    Online,
    Phone,
}

/// An interview meeting between a candidate and a company.
///
/// `job_id` and `job_title` are kept independently so the title survives
/// job edits and deletion. Once `is_rescheduled` flips to true it never
/// goes back, and `original_scheduled_at` keeps the very first agreed time.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Meeting {
    pub id: Uuid,
    pub candidate_id: Uuid,
    pub company_id: Uuid,
    pub job_id: Option<i64>,
    pub job_title: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub interview_type: InterviewType,
    pub location: Option<String>,
    pub status: MeetingStatus,
    pub notes: Option<String>,
    pub is_rescheduled: bool,
    pub original_scheduled_at: Option<DateTime<Utc>>,
    pub rescheduled_at: Option<DateTime<Utc>>,
    pub reschedule_reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewMeeting {
    pub candidate_id: Uuid,
    pub company_id: Uuid,
    pub job_id: Option<i64>,
    pub job_title: Option<String>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub interview_type: InterviewType,
    pub location: Option<String>,
    pub notes: Option<String>,
}

impl Meeting {
    /// A freshly requested meeting. `scheduled_at` may stay empty until the
    /// parties settle on a time.
    pub fn request(new: NewMeeting, now: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            candidate_id: new.candidate_id,
            company_id: new.company_id,
            job_id: new.job_id,
            job_title: new.job_title,
            scheduled_at: new.scheduled_at,
            interview_type: new.interview_type,
            location: new.location,
            status: MeetingStatus::Requested,
            notes: new.notes,
            is_rescheduled: false,
            original_scheduled_at: None,
            rescheduled_at: None,
            reschedule_reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_party(&self, user_id: Uuid) -> bool {
        self.candidate_id == user_id || self.company_id == user_id
    }

    /// The other side of the table. Callers must pass one of the two parties.
    pub fn counter_party_of(&self, user_id: Uuid) -> Uuid {
        if user_id == self.candidate_id {
            self.company_id
        } else {
            self.candidate_id
        }
    }
}
