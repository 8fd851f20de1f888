use async_trait::async_trait;
use sqlx::{Pool, Postgres};
use tracing::instrument;

use crate::entities::{ContentItem, NewContentItem, NewNotification, Notification, NotificationKind};
use crate::repositories::{ContentRepository, RepositoryError};
use crate::site::Permalink;

const CONTENT_COLUMNS: &str =
    "id, title, slug, body_html, status, pingback_enabled, categories, creation_date";
const NOTIFICATION_COLUMNS: &str =
    "id, content_id, kind, source_url, display_name, excerpt, registered_at";

/// Postgres-backed content and notification storage.
#[derive(Clone)]
pub struct PgContentRepository {
    pool: Pool<Postgres>,
}

impl PgContentRepository {
    pub fn new(pool: Pool<Postgres>) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ContentRepository for PgContentRepository {
    #[instrument(skip(self))]
    async fn get_content_by_permalink(
        &self,
        permalink: &Permalink,
    ) -> Result<Option<ContentItem>, RepositoryError> {
        let item = sqlx::query_as::<_, ContentItem>(&format!(
            r#"
            SELECT {CONTENT_COLUMNS}
            FROM content_items
            WHERE slug = $1
              AND (creation_date AT TIME ZONE 'UTC')::date = $2
              AND status = 'published'
            "#
        ))
        .bind(&permalink.slug)
        .bind(permalink.date)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    async fn get_content(&self, id: i64) -> Result<Option<ContentItem>, RepositoryError> {
        let item = sqlx::query_as::<_, ContentItem>(&format!(
            "SELECT {CONTENT_COLUMNS} FROM content_items WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(item)
    }

    async fn create_content(&self, item: NewContentItem) -> Result<ContentItem, RepositoryError> {
        let item = sqlx::query_as::<_, ContentItem>(&format!(
            r#"
            INSERT INTO content_items
                  (title, slug, body_html, status, pingback_enabled, categories, creation_date)
            VALUES ($1,    $2,   $3,        $4,     $5,               $6,         $7)
            RETURNING {CONTENT_COLUMNS}
            "#
        ))
        .bind(item.title)
        .bind(item.slug)
        .bind(item.body_html)
        .bind(item.status)
        .bind(item.pingback_enabled)
        .bind(item.categories)
        .bind(item.creation_date)
        .fetch_one(&self.pool)
        .await?;

        Ok(item)
    }

    #[instrument(skip(self, notification), fields(content_id = notification.content_id, source = %notification.source_url))]
    async fn register_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError> {
        // the unique index makes the duplicate check and the insert one statement
        let inserted = sqlx::query_as::<_, Notification>(&format!(
            r#"
            INSERT INTO notifications (content_id, kind, source_url, display_name, excerpt)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (content_id, kind, source_url) DO NOTHING
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(notification.content_id)
        .bind(notification.kind)
        .bind(&notification.source_url)
        .bind(&notification.display_name)
        .bind(&notification.excerpt)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(ref db) if db.is_foreign_key_violation() => {
                RepositoryError::MissingContent(notification.content_id)
            }
            other => RepositoryError::Database(other),
        })?;

        inserted.ok_or(RepositoryError::Duplicate {
            content_id: notification.content_id,
            source_url: notification.source_url,
        })
    }

    async fn list_notifications(
        &self,
        content_id: i64,
        kind: Option<NotificationKind>,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let notifications = sqlx::query_as::<_, Notification>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE content_id = $1
              AND ($2::notification_kind IS NULL OR kind = $2)
            ORDER BY registered_at, seq
            "#
        ))
        .bind(content_id)
        .bind(kind)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").fetch_one(&self.pool).await?;
        Ok(())
    }
}
