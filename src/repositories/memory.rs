use async_trait::async_trait;
use chrono::Utc;
use dashmap::{DashMap, mapref::entry::Entry};
use std::sync::{
    Arc,
    atomic::{AtomicI64, AtomicU64, Ordering},
};
use uuid::Uuid;

use crate::entities::{ContentItem, NewContentItem, NewNotification, Notification, NotificationKind};
use crate::repositories::{ContentRepository, RepositoryError};
use crate::site::Permalink;

type NotificationKey = (i64, NotificationKind, String);

/// Process-local storage, used when no database is configured and in tests.
#[derive(Clone, Default)]
pub struct MemoryContentRepository {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    items: DashMap<i64, ContentItem>,
    notifications: DashMap<NotificationKey, (u64, Notification)>,
    next_id: AtomicI64,
    next_seq: AtomicU64,
}

impl MemoryContentRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ContentRepository for MemoryContentRepository {
    async fn get_content_by_permalink(
        &self,
        permalink: &Permalink,
    ) -> Result<Option<ContentItem>, RepositoryError> {
        Ok(self
            .inner
            .items
            .iter()
            .find(|entry| {
                let item = entry.value();
                item.is_published()
                    && item.slug == permalink.slug
                    && item.creation_date.date_naive() == permalink.date
            })
            .map(|entry| entry.value().clone()))
    }

    async fn get_content(&self, id: i64) -> Result<Option<ContentItem>, RepositoryError> {
        Ok(self.inner.items.get(&id).map(|entry| entry.value().clone()))
    }

    async fn create_content(&self, item: NewContentItem) -> Result<ContentItem, RepositoryError> {
        let id = self.inner.next_id.fetch_add(1, Ordering::SeqCst) + 1;
        let item = ContentItem {
            id,
            title: item.title,
            slug: item.slug,
            body_html: item.body_html,
            status: item.status,
            pingback_enabled: item.pingback_enabled,
            categories: item.categories,
            creation_date: item.creation_date,
        };
        self.inner.items.insert(id, item.clone());
        Ok(item)
    }

    async fn register_notification(
        &self,
        notification: NewNotification,
    ) -> Result<Notification, RepositoryError> {
        if !self.inner.items.contains_key(&notification.content_id) {
            return Err(RepositoryError::MissingContent(notification.content_id));
        }

        let key = (
            notification.content_id,
            notification.kind,
            notification.source_url.clone(),
        );
        // the shard lock held by the entry makes check-and-insert atomic
        match self.inner.notifications.entry(key) {
            Entry::Occupied(_) => Err(RepositoryError::Duplicate {
                content_id: notification.content_id,
                source_url: notification.source_url,
            }),
            Entry::Vacant(slot) => {
                let stored = Notification {
                    id: Uuid::new_v4(),
                    content_id: notification.content_id,
                    kind: notification.kind,
                    source_url: notification.source_url,
                    display_name: notification.display_name,
                    excerpt: notification.excerpt,
                    registered_at: Utc::now(),
                };
                let seq = self.inner.next_seq.fetch_add(1, Ordering::SeqCst);
                slot.insert((seq, stored.clone()));
                Ok(stored)
            }
        }
    }

    async fn list_notifications(
        &self,
        content_id: i64,
        kind: Option<NotificationKind>,
    ) -> Result<Vec<Notification>, RepositoryError> {
        let mut matching: Vec<(u64, Notification)> = self
            .inner
            .notifications
            .iter()
            .filter(|entry| {
                let (id, entry_kind, _) = entry.key();
                *id == content_id && kind.is_none_or(|kind| kind == *entry_kind)
            })
            .map(|entry| entry.value().clone())
            .collect();
        matching.sort_by_key(|(seq, notification)| (notification.registered_at, *seq));

        Ok(matching
            .into_iter()
            .map(|(_, notification)| notification)
            .collect())
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        Ok(())
    }
}
