use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// --- PostgreSQL Enums ---
#[derive(sqlx::Type, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[sqlx(type_name = "content_status", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum ContentStatus {
    Draft,
    Hidden,
    Published,
}

#[derive(sqlx::Type, Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[sqlx(type_name = "notification_kind", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum NotificationKind {
    Pingback,
    Trackback,
}

/// --- Tables ---

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct ContentItem {
    pub id: i64,
    pub title: String,
    pub slug: String,
    pub body_html: String,
    pub status: ContentStatus,
    pub pingback_enabled: bool,
    pub categories: Vec<String>, // category titles, sent to ping directories
    pub creation_date: DateTime<Utc>,
}

impl ContentItem {
    pub fn is_published(&self) -> bool {
        self.status == ContentStatus::Published
    }
}

#[derive(Debug, Clone, PartialEq, FromRow)]
pub struct Notification {
    pub id: Uuid,
    pub content_id: i64, // FK -> content_items.id
    pub kind: NotificationKind,
    pub source_url: String,
    pub display_name: String,
    pub excerpt: String,
    pub registered_at: DateTime<Utc>,
}

/// --- Inserts ---

#[derive(Debug, Clone)]
pub struct NewContentItem {
    pub title: String,
    pub slug: String,
    pub body_html: String,
    pub status: ContentStatus,
    pub pingback_enabled: bool,
    pub categories: Vec<String>,
    pub creation_date: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewNotification {
    pub content_id: i64,
    pub kind: NotificationKind,
    pub source_url: String,
    pub display_name: String,
    pub excerpt: String,
}
