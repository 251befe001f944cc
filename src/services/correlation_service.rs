use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use crate::models::application::Application;
use crate::models::meeting::Meeting;

/// Applications carry no meeting foreign key. Interviews are matched to
/// applications by (job_id, candidate_id) at read time.
#[derive(Clone)]
pub struct CorrelationService {
    pool: PgPool,
}

/// An application row decorated with its interview, when one exists.
#[derive(Debug, Clone)]
pub struct ApplicationWithInterview {
    pub application: Application,
    pub interview: Option<Meeting>,
}

/// Meetings keyed by (job, candidate). Meetings without a job id can never
/// match an application and are skipped. A candidate normally holds one
/// meeting per job; if duplicates exist the kept row is unspecified.
pub fn index_meetings(meetings: Vec<Meeting>) -> HashMap<(i64, Uuid), Meeting> {
    let mut index = HashMap::with_capacity(meetings.len());
    for meeting in meetings {
        if let Some(job_id) = meeting.job_id {
            index.insert((job_id, meeting.candidate_id), meeting);
        }
    }
    index
}

/// Pairs each application with the meeting matching its exact
/// (job_id, candidate_id). No match leaves `interview` empty.
pub fn attach(
    applications: Vec<Application>,
    index: &HashMap<(i64, Uuid), Meeting>,
) -> Vec<ApplicationWithInterview> {
    applications
        .into_iter()
        .map(|application| {
            let interview = index
                .get(&(application.job_id, application.candidate_id))
                .cloned();
            ApplicationWithInterview {
                application,
                interview,
            }
        })
        .collect()
}

impl CorrelationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn applications_for_job(&self, job_id: i64) -> Result<Vec<Application>> {
        let applications = sqlx::query_as::<_, Application>(
            r#"
            SELECT * FROM applications
            WHERE job_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(applications)
    }

    /// One meetings query per request, indexed in memory.
    pub async fn attach_interviews(
        &self,
        job_id: i64,
        applications: Vec<Application>,
    ) -> Result<Vec<ApplicationWithInterview>> {
        let meetings = sqlx::query_as::<_, Meeting>("SELECT * FROM meetings WHERE job_id = $1")
            .bind(job_id)
            .fetch_all(&self.pool)
            .await?;

        Ok(attach(applications, &index_meetings(meetings)))
    }
}
