use std::collections::HashMap;

use sqlx::PgPool;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::job::Job;
use crate::models::user::{Role, User};

/// Read-only lookups into the marketplace account and job tables. Scheduling
/// never writes these rows.
#[derive(Clone)]
pub struct DirectoryService {
    pool: PgPool,
}

impl DirectoryService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn find_user(&self, id: Uuid) -> Result<Option<User>> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(user)
    }

    /// Resolves a party id and checks it carries the expected role.
    pub async fn require_party(&self, id: Uuid, role: Role) -> Result<User> {
        match self.find_user(id).await? {
            None => Err(Error::BadRequest(format!("Unknown {} id {}", role, id))),
            Some(user) if user.role != role.as_str() => {
                Err(Error::BadRequest(format!("User {} is not a {}", id, role)))
            }
            Some(user) if !user.is_active => {
                Err(Error::BadRequest(format!("User {} is deactivated", id)))
            }
            Some(user) => Ok(user),
        }
    }

    pub async fn find_job(&self, id: i64) -> Result<Option<Job>> {
        let job = sqlx::query_as::<_, Job>("SELECT * FROM jobs WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(job)
    }

    /// Batch lookup used when decorating responses with party details.
    /// Missing ids are simply absent from the map.
    pub async fn users_by_ids(&self, ids: &[Uuid]) -> Result<HashMap<Uuid, User>> {
        if ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ANY($1)")
            .bind(ids.to_vec())
            .fetch_all(&self.pool)
            .await?;

        Ok(rows.into_iter().map(|user| (user.id, user)).collect())
    }
}
