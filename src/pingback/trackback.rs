//! Form-encoded trackbacks, the older sibling of pingbacks.

use quick_xml::escape::escape;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;
use tracing::{error, info, instrument};
use url::Url;

use crate::entities::{ContentItem, NewNotification, Notification, NotificationKind};
use crate::repositories::{ContentRepository, RepositoryError};
use crate::site::Site;

/// Fields of a trackback ping; every one of them may be absent.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TrackbackForm {
    pub url: Option<String>,
    pub title: Option<String>,
    pub excerpt: Option<String>,
    pub blog_name: Option<String>,
}

#[derive(Debug, Error)]
pub enum TrackbackError {
    #[error("content {0} not found")]
    NotFound(i64),

    /// Not a trackback at all; callers send the client to the item.
    #[error("no url given")]
    MissingUrl { permalink: Url },

    #[error("Trackback is not enabled for {0}")]
    Disabled(String),

    #[error("Trackback is already registered")]
    AlreadyRegistered,

    #[error("internal error: {0}")]
    Internal(String),
}

#[derive(Clone)]
pub struct TrackbackService {
    site: Arc<Site>,
    repository: Arc<dyn ContentRepository>,
}

impl TrackbackService {
    pub fn new(site: Arc<Site>, repository: Arc<dyn ContentRepository>) -> Self {
        Self { site, repository }
    }

    /// Permalink of a published item.
    pub async fn permalink(&self, content_id: i64) -> Result<Url, TrackbackError> {
        let item = self.published(content_id).await?;
        Ok(self.site.permalink(&item))
    }

    #[instrument(skip(self, form), fields(url = form.url.as_deref().unwrap_or_default()))]
    pub async fn receive(
        &self,
        content_id: i64,
        form: TrackbackForm,
    ) -> Result<Notification, TrackbackError> {
        let item = self.published(content_id).await?;

        let Some(url) = non_empty(form.url) else {
            return Err(TrackbackError::MissingUrl {
                permalink: self.site.permalink(&item),
            });
        };
        if !item.pingback_enabled {
            return Err(TrackbackError::Disabled(item.title));
        }

        let title = non_empty(form.title).unwrap_or_else(|| url.clone());
        let excerpt = non_empty(form.excerpt).unwrap_or_else(|| title.clone());
        let blog_name = non_empty(form.blog_name).unwrap_or_else(|| title.clone());

        let notification = self
            .repository
            .register_notification(NewNotification {
                content_id: item.id,
                kind: NotificationKind::Trackback,
                source_url: url,
                display_name: blog_name,
                excerpt,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Duplicate { .. } => TrackbackError::AlreadyRegistered,
                other => {
                    error!(error = %other, "trackback registration failed");
                    TrackbackError::Internal(other.to_string())
                }
            })?;

        info!(content_id, "trackback registered");
        Ok(notification)
    }

    async fn published(&self, content_id: i64) -> Result<ContentItem, TrackbackError> {
        match self.repository.get_content(content_id).await {
            Ok(Some(item)) if item.is_published() => Ok(item),
            Ok(_) => Err(TrackbackError::NotFound(content_id)),
            Err(e) => Err(TrackbackError::Internal(e.to_string())),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Trackback reply document; `error` carries the failure message, if any.
pub fn response_xml(error: Option<&str>) -> String {
    let mut out = String::from(r#"<?xml version="1.0" encoding="utf-8"?><response>"#);
    match error {
        None => out.push_str("<error>0</error>"),
        Some(message) => {
            out.push_str("<error>1</error><message>");
            out.push_str(&escape(message));
            out.push_str("</message>");
        }
    }
    out.push_str("</response>");
    out
}
