use serde_json::Value as JsonValue;
use sqlx::PgPool;
use uuid::Uuid;

use crate::dto::notification_dto::NotificationListQuery;
use crate::error::{Error, Result};
use crate::models::notification::Notification;

#[derive(Clone)]
pub struct NotificationService {
    pool: PgPool,
}

pub struct NotificationList {
    pub items: Vec<Notification>,
    pub total: i64,
    pub page: i64,
    pub per_page: i64,
    pub total_pages: i64,
}

impl NotificationService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Records an in-app notification for one recipient.
    pub async fn notify(
        &self,
        user_id: Uuid,
        notification_type: &str,
        title: &str,
        message: &str,
        data: JsonValue,
    ) -> Result<Notification> {
        let notification = sqlx::query_as::<_, Notification>(
            r#"
            INSERT INTO notifications (user_id, notification_type, title, message, data)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING *
            "#,
        )
        .bind(user_id)
        .bind(notification_type)
        .bind(title)
        .bind(message)
        .bind(data)
        .fetch_one(&self.pool)
        .await?;

        Ok(notification)
    }

    pub async fn list_for(
        &self,
        user_id: Uuid,
        query: NotificationListQuery,
    ) -> Result<NotificationList> {
        let page = query.page.unwrap_or(1).max(1);
        let per_page = query.per_page.unwrap_or(20).clamp(1, 100);
        let offset = (page - 1) * per_page;
        let unread_only = query.unread_only.unwrap_or(false);

        let items = sqlx::query_as::<_, Notification>(
            r#"
            SELECT * FROM notifications
            WHERE user_id = $1
              AND (NOT $2 OR read_at IS NULL)
              AND ($3::text IS NULL OR notification_type = $3)
            ORDER BY created_at DESC
            LIMIT $4 OFFSET $5
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(query.notification_type.clone())
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE user_id = $1
              AND (NOT $2 OR read_at IS NULL)
              AND ($3::text IS NULL OR notification_type = $3)
            "#,
        )
        .bind(user_id)
        .bind(unread_only)
        .bind(query.notification_type)
        .fetch_one(&self.pool)
        .await?;

        let total_pages = ((total as f64) / (per_page as f64)).ceil() as i64;

        Ok(NotificationList {
            items,
            total,
            page,
            per_page,
            total_pages,
        })
    }

    pub async fn unread_count(&self, user_id: Uuid) -> Result<i64> {
        let count: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM notifications
            WHERE user_id = $1 AND read_at IS NULL
            "#,
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(count)
    }

    /// Marking an already-read notification again is a no-op, not an error.
    pub async fn mark_read(&self, user_id: Uuid, id: Uuid) -> Result<Notification> {
        let notification =
            sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if notification.user_id != user_id {
            return Err(Error::Forbidden(
                "Notification belongs to another user".to_string(),
            ));
        }

        if notification.read_at.is_some() {
            return Ok(notification);
        }

        let updated = sqlx::query_as::<_, Notification>(
            r#"
            UPDATE notifications
            SET read_at = NOW()
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        Ok(updated)
    }

    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64> {
        let result = sqlx::query(
            r#"
            UPDATE notifications
            SET read_at = NOW()
            WHERE user_id = $1 AND read_at IS NULL
            "#,
        )
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn delete(&self, user_id: Uuid, id: Uuid) -> Result<()> {
        let notification =
            sqlx::query_as::<_, Notification>("SELECT * FROM notifications WHERE id = $1")
                .bind(id)
                .fetch_one(&self.pool)
                .await?;

        if notification.user_id != user_id {
            return Err(Error::Forbidden(
                "Notification belongs to another user".to_string(),
            ));
        }

        sqlx::query("DELETE FROM notifications WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(())
    }
}
