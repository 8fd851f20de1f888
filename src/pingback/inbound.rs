//! Receiving side of the pingback protocol.

use std::sync::Arc;
use tracing::{debug, error, info, instrument};
use url::Url;

use crate::entities::{ContentItem, NewNotification, NotificationKind};
use crate::extractor::{SourceDocument, excerpt};
use crate::fetcher::Fetch;
use crate::pingback::PingbackError;
use crate::repositories::{ContentRepository, RepositoryError};
use crate::site::{Route, Site};

/// Validates pingbacks against the site's content and records them.
#[derive(Clone)]
pub struct PingbackService {
    site: Arc<Site>,
    fetcher: Arc<dyn Fetch>,
    repository: Arc<dyn ContentRepository>,
    excerpt_length: usize,
}

impl PingbackService {
    pub fn new(
        site: Arc<Site>,
        fetcher: Arc<dyn Fetch>,
        repository: Arc<dyn ContentRepository>,
        excerpt_length: usize,
    ) -> Self {
        Self {
            site,
            fetcher,
            repository,
            excerpt_length,
        }
    }

    /// `pingback.ping`: register that `source` links to `target`.
    ///
    /// Checks run in protocol order and the first failing one decides the
    /// error: well-formed URLs, reachable source, link present, known
    /// target, pingbacks accepted, not yet registered.
    #[instrument(skip(self), fields(source = %source, target = %target))]
    pub async fn ping(&self, source: &str, target: &str) -> Result<String, PingbackError> {
        let result = self.try_ping(source.trim(), target.trim()).await;
        match &result {
            Ok(_) => info!("pingback registered"),
            Err(PingbackError::Internal(reason)) => error!(%reason, "pingback failed"),
            Err(e) => debug!(code = e.code(), "pingback rejected"),
        }
        result
    }

    async fn try_ping(&self, source: &str, target: &str) -> Result<String, PingbackError> {
        let source_url = parse_http_url(source)?;
        let target_url = parse_http_url(target)?;
        if source_url == target_url {
            return Err(PingbackError::MalformedInput);
        }

        let response = self.fetcher.fetch(&source_url).await.map_err(|e| {
            debug!(error = %e, "source fetch failed");
            PingbackError::SourceUnreachable
        })?;
        let body = response.text().await.map_err(|e| {
            debug!(error = %e, "source body unreadable");
            PingbackError::SourceUnreachable
        })?;

        let (display_name, excerpt) = self.inspect_source(&body, &source_url, &target_url)?;
        let item = self.resolve_target(&target_url).await?;

        self.repository
            .register_notification(NewNotification {
                content_id: item.id,
                kind: NotificationKind::Pingback,
                source_url: source_url.to_string(),
                display_name,
                excerpt,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Duplicate { .. } => PingbackError::AlreadyRegistered,
                other => PingbackError::Internal(other.to_string()),
            })?;

        Ok(format!("Pingback from {source} to {target} registered."))
    }

    /// Display name and excerpt of a source that links to `target`.
    fn inspect_source(
        &self,
        body: &str,
        source: &Url,
        target: &Url,
    ) -> Result<(String, String), PingbackError> {
        let document = SourceDocument::parse(body, source.clone());
        if !document.links_to(target) {
            return Err(PingbackError::LinkNotFound);
        }
        let display_name = document.title().unwrap_or_else(|| source.to_string());
        Ok((display_name, excerpt(&document, target, self.excerpt_length)))
    }

    /// `pingback.extensions.getPingbacks`: sources that pinged `target`,
    /// oldest first.
    #[instrument(skip(self), fields(target = %target))]
    pub async fn get_pingbacks(&self, target: &str) -> Result<Vec<String>, PingbackError> {
        let target_url = parse_http_url(target.trim())?;
        let item = self.resolve_target(&target_url).await?;

        let notifications = self
            .repository
            .list_notifications(item.id, Some(NotificationKind::Pingback))
            .await
            .map_err(internal)?;

        let mut sources = Vec::with_capacity(notifications.len());
        for notification in notifications {
            sources.push(self.canonical_source(notification.source_url).await?);
        }
        Ok(sources)
    }

    /// Content item a target URL names, if it accepts pingbacks.
    async fn resolve_target(&self, target: &Url) -> Result<ContentItem, PingbackError> {
        let permalink = match self.site.resolve(target) {
            Route::Foreign | Route::NotFound => return Err(PingbackError::UnknownTarget),
            Route::Listing => return Err(PingbackError::TargetNotPingable),
            Route::Detail(permalink) => permalink,
        };

        match self
            .repository
            .get_content_by_permalink(&permalink)
            .await
            .map_err(internal)?
        {
            None => Err(PingbackError::UnknownTarget),
            Some(item) if !item.pingback_enabled => Err(PingbackError::TargetNotPingable),
            Some(item) => Ok(item),
        }
    }

    /// Permalink of the source when it is one of our own published items.
    async fn canonical_source(&self, source_url: String) -> Result<String, PingbackError> {
        let Ok(url) = Url::parse(&source_url) else {
            return Ok(source_url);
        };
        let Route::Detail(permalink) = self.site.resolve(&url) else {
            return Ok(source_url);
        };
        Ok(
            match self
                .repository
                .get_content_by_permalink(&permalink)
                .await
                .map_err(internal)?
            {
                Some(item) => self.site.permalink(&item).to_string(),
                None => source_url,
            },
        )
    }
}

fn parse_http_url(raw: &str) -> Result<Url, PingbackError> {
    Url::parse(raw)
        .ok()
        .filter(|url| matches!(url.scheme(), "http" | "https") && url.has_host())
        .ok_or(PingbackError::MalformedInput)
}

fn internal(e: RepositoryError) -> PingbackError {
    PingbackError::Internal(e.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ContentStatus, Notification};
    use crate::fetcher::{FetchError, MockFetch, PageResponse};
    use crate::repositories::MockContentRepository;
    use chrono::{TimeZone, Utc};
    use reqwest::{
        StatusCode,
        header::{HeaderMap, HeaderValue},
    };
    use uuid::Uuid;

    const TARGET: &str = "http://localhost:8000/2010/01/01/my-first-nodetype/";
    const SOURCE: &str = "http://localhost:8000/2010/01/01/my-second-nodetype/";

    fn site() -> Arc<Site> {
        Arc::new(Site::new(
            Url::parse("http://localhost:8000/").unwrap(),
            "Gstudio",
            "feeds/",
        ))
    }

    fn first_item(pingback_enabled: bool) -> ContentItem {
        ContentItem {
            id: 1,
            title: "My first nodetype".into(),
            slug: "my-first-nodetype".into(),
            body_html: "My first content".into(),
            status: ContentStatus::Published,
            pingback_enabled,
            categories: vec![],
            creation_date: Utc.with_ymd_and_hms(2010, 1, 1, 0, 0, 0).unwrap(),
        }
    }

    /// Serves one page at `SOURCE` linking to `TARGET`; nothing else exists.
    fn source_web() -> Arc<MockFetch> {
        let mut fetcher = MockFetch::new();
        fetcher.expect_fetch().returning(|url| {
            if url.as_str() != SOURCE {
                return Err(FetchError::Http {
                    status: StatusCode::NOT_FOUND,
                });
            }
            let mut headers = HeaderMap::new();
            headers.insert("content-type", HeaderValue::from_static("text/html"));
            Ok(PageResponse::from_bytes(
                url.clone(),
                StatusCode::OK,
                headers,
                format!(
                    r#"<html><head><title> My second nodetype </title></head><body>
                    <p>My second content with link to <a href="{TARGET}">first nodetype</a>.</p>
                    </body></html>"#
                ),
            ))
        });
        Arc::new(fetcher)
    }

    fn service(repository: MockContentRepository) -> PingbackService {
        PingbackService::new(site(), source_web(), Arc::new(repository), 300)
    }

    fn notification(source_url: &str) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            content_id: 1,
            kind: NotificationKind::Pingback,
            source_url: source_url.into(),
            display_name: String::new(),
            excerpt: String::new(),
            registered_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn malformed_input_is_code_zero() {
        let service = service(MockContentRepository::new());
        for (source, target) in [
            ("toto", "titi"),
            ("http://localhost:8000/", "http://localhost:8000/"),
            (SOURCE, "toto"),
            ("ftp://localhost:8000/file", TARGET),
            ("mailto:me@example.com", TARGET),
        ] {
            assert_eq!(
                service.ping(source, target).await,
                Err(PingbackError::MalformedInput),
                "{source} -> {target}"
            );
        }
    }

    #[tokio::test]
    async fn unreachable_source_is_code_sixteen() {
        let service = service(MockContentRepository::new());
        assert_eq!(
            service.ping("http://example.com/", TARGET).await,
            Err(PingbackError::SourceUnreachable)
        );
    }

    #[tokio::test]
    async fn source_without_link_is_code_seventeen() {
        let service = service(MockContentRepository::new());
        assert_eq!(
            service.ping(SOURCE, "http://localhost:8000/error-404/").await,
            Err(PingbackError::LinkNotFound)
        );
    }

    #[tokio::test]
    async fn disabled_target_is_code_thirty_three() {
        let mut repository = MockContentRepository::new();
        repository
            .expect_get_content_by_permalink()
            .returning(|_| Ok(Some(first_item(false))));
        repository.expect_register_notification().never();

        let service = service(repository);
        assert_eq!(
            service.ping(SOURCE, TARGET).await,
            Err(PingbackError::TargetNotPingable)
        );
    }

    #[tokio::test]
    async fn missing_target_item_is_code_thirty_two() {
        let mut repository = MockContentRepository::new();
        repository
            .expect_get_content_by_permalink()
            .returning(|_| Ok(None));

        let service = service(repository);
        assert_eq!(
            service.ping(SOURCE, TARGET).await,
            Err(PingbackError::UnknownTarget)
        );
    }

    #[tokio::test]
    async fn registers_with_title_and_excerpt() {
        let mut repository = MockContentRepository::new();
        repository
            .expect_get_content_by_permalink()
            .returning(|_| Ok(Some(first_item(true))));
        repository
            .expect_register_notification()
            .withf(|new| {
                new.content_id == 1
                    && new.kind == NotificationKind::Pingback
                    && new.source_url == SOURCE
                    && new.display_name == "My second nodetype"
                    && new.excerpt == "My second content with link to first nodetype."
            })
            .times(1)
            .returning(|_| Ok(notification(SOURCE)));

        let service = service(repository);
        assert_eq!(
            service.ping(SOURCE, TARGET).await,
            Ok(format!("Pingback from {SOURCE} to {TARGET} registered."))
        );
    }

    #[tokio::test]
    async fn duplicates_and_storage_failures_map_to_codes() {
        let mut repository = MockContentRepository::new();
        repository
            .expect_get_content_by_permalink()
            .returning(|_| Ok(Some(first_item(true))));
        let mut calls = 0;
        repository.expect_register_notification().returning(move |new| {
            calls += 1;
            if calls == 1 {
                Err(RepositoryError::Duplicate {
                    content_id: new.content_id,
                    source_url: new.source_url,
                })
            } else {
                Err(RepositoryError::Database(sqlx::Error::PoolTimedOut))
            }
        });

        let service = service(repository);
        let duplicate = service.ping(SOURCE, TARGET).await.unwrap_err();
        assert_eq!(duplicate.code(), 48);
        let failed = service.ping(SOURCE, TARGET).await.unwrap_err();
        assert!(matches!(failed, PingbackError::Internal(_)));
        assert_eq!(failed.code(), 0);
    }

    #[tokio::test]
    async fn get_pingbacks_resolves_known_sources() {
        let mut repository = MockContentRepository::new();
        repository
            .expect_get_content_by_permalink()
            .returning(|permalink| {
                Ok(match permalink.slug.as_str() {
                    "my-first-nodetype" => Some(first_item(true)),
                    "my-second-nodetype" => Some(ContentItem {
                        id: 2,
                        slug: "my-second-nodetype".into(),
                        ..first_item(true)
                    }),
                    _ => None,
                })
            });
        repository
            .expect_list_notifications()
            .withf(|content_id, kind| *content_id == 1 && *kind == Some(NotificationKind::Pingback))
            .returning(|_, _| {
                Ok(vec![
                    notification(SOURCE),
                    notification("http://example.com/blog/1/"),
                ])
            });

        let service = service(repository);
        assert_eq!(
            service.get_pingbacks(TARGET).await,
            Ok(vec![SOURCE.to_string(), "http://example.com/blog/1/".to_string()])
        );
        assert_eq!(
            service.get_pingbacks("http://example.com/").await,
            Err(PingbackError::UnknownTarget)
        );
        assert_eq!(
            service.get_pingbacks("http://localhost:8000/error-404/").await,
            Err(PingbackError::UnknownTarget)
        );
        assert_eq!(
            service.get_pingbacks("http://localhost:8000/2010/").await,
            Err(PingbackError::TargetNotPingable)
        );
        assert_eq!(
            service.get_pingbacks("titi").await,
            Err(PingbackError::MalformedInput)
        );
    }
}
