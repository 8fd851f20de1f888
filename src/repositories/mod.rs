pub mod content;
pub mod memory;

pub use content::PgContentRepository;
pub use memory::MemoryContentRepository;

use async_trait::async_trait;
use thiserror::Error;

use crate::entities::{ContentItem, NewContentItem, NewNotification, Notification, NotificationKind};
use crate::site::Permalink;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("notification already registered for content {content_id} from {source_url}")]
    Duplicate { content_id: i64, source_url: String },

    #[error("content {0} does not exist")]
    MissingContent(i64),

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Storage the pingback core reads content from and records notifications in.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// Published item addressed by a date-and-slug permalink.
    async fn get_content_by_permalink(
        &self,
        permalink: &Permalink,
    ) -> Result<Option<ContentItem>, RepositoryError>;

    async fn get_content(&self, id: i64) -> Result<Option<ContentItem>, RepositoryError>;

    async fn create_content(&self, item: NewContentItem) -> Result<ContentItem, RepositoryError>;

    /// Insert a notification unless one exists for the same
    /// `(content_id, kind, source_url)`, in which case `Duplicate` is returned
    /// and the stored one is left untouched.
    async fn register_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError>;

    /// Notifications of an item, oldest first.
    async fn list_notifications(
        &self,
        content_id: i64,
        kind: Option<NotificationKind>,
    ) -> Result<Vec<Notification>, RepositoryError>;

    async fn health_check(&self) -> Result<(), RepositoryError>;
}
