#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    Router,
    body::{Body, to_bytes},
    http::{Request, Response, header::CONTENT_TYPE},
};
use chrono::{TimeZone, Utc};
use reqwest::{
    StatusCode,
    header::{HeaderMap, HeaderName, HeaderValue},
};
use std::{
    collections::HashMap,
    sync::{Arc, Mutex},
};
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;
use url::Url;

use pingback::{
    app_state::AppState,
    entities::{ContentItem, ContentStatus, NewContentItem},
    fetcher::{Fetch, FetchError, PageResponse},
    handlers::router,
    middleware::RateLimit,
    pingback::{ExternalUrlsPinger, PingDispatcher, PingWorker},
    repositories::{ContentRepository, MemoryContentRepository},
    site::Site,
    xmlrpc::{MethodCall, RpcError, Value, XmlRpcTransport},
};

pub const SITE_URL: &str = "http://localhost:8000/";
pub const EXCERPT_LENGTH: usize = 50;

pub fn site() -> Arc<Site> {
    Arc::new(Site::new(Url::parse(SITE_URL).unwrap(), "Gstudio", "feeds/"))
}

/// Canned pages served from memory; unknown URLs fail to connect.
#[derive(Default, Clone)]
pub struct StubWeb {
    pages: HashMap<Url, (HeaderMap, String)>,
}

impl StubWeb {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn html(self, url: &str, body: &str) -> Self {
        self.page(url, &[("content-type", "text/html; charset=utf-8")], body)
    }

    pub fn page(mut self, url: &str, headers: &[(&str, &str)], body: &str) -> Self {
        let mut map = HeaderMap::new();
        for &(name, value) in headers {
            map.insert(
                HeaderName::from_bytes(name.as_bytes()).unwrap(),
                HeaderValue::from_str(value).unwrap(),
            );
        }
        self.pages
            .insert(Url::parse(url).unwrap(), (map, body.to_string()));
        self
    }
}

#[async_trait]
impl Fetch for StubWeb {
    async fn fetch(&self, url: &Url) -> Result<PageResponse, FetchError> {
        match self.pages.get(url) {
            Some((headers, body)) => Ok(PageResponse::from_bytes(
                url.clone(),
                StatusCode::OK,
                headers.clone(),
                body.clone(),
            )),
            None => Err(FetchError::Connect(format!("{url} is offline"))),
        }
    }
}

/// Transport that answers every call with the same value and remembers it.
pub struct RecordingTransport {
    reply: Value,
    calls: Mutex<Vec<(Url, MethodCall)>>,
}

impl RecordingTransport {
    pub fn replying(reply: Value) -> Arc<Self> {
        Arc::new(Self {
            reply,
            calls: Mutex::new(Vec::new()),
        })
    }

    pub fn calls(&self) -> Vec<(Url, MethodCall)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl XmlRpcTransport for RecordingTransport {
    async fn call(&self, endpoint: &Url, call: &MethodCall) -> Result<Value, RpcError> {
        self.calls
            .lock()
            .unwrap()
            .push((endpoint.clone(), call.clone()));
        Ok(self.reply.clone())
    }
}

pub struct TestApp {
    pub router: Router,
    pub repository: Arc<MemoryContentRepository>,
    pub transport: Arc<RecordingTransport>,
    pub shutdown: CancellationToken,
}

impl TestApp {
    /// Full router over in-memory storage and a stubbed web.
    pub fn new(web: StubWeb) -> Self {
        let site = site();
        let repository = Arc::new(MemoryContentRepository::new());
        let fetcher: Arc<dyn Fetch> = Arc::new(web);
        let transport = RecordingTransport::replying(Value::from("Pingback registered."));

        let external = ExternalUrlsPinger::new(site.clone(), fetcher.clone(), transport.clone());
        let worker = PingWorker::new(repository.clone(), external, Vec::new());
        let shutdown = CancellationToken::new();
        let (dispatcher, _handle) = PingDispatcher::spawn(worker, 8, shutdown.clone());

        let state = AppState::new(site, repository.clone(), fetcher, dispatcher, EXCERPT_LENGTH);
        Self {
            router: router(state, RateLimit::per_minute(1_000)),
            repository,
            transport,
            shutdown,
        }
    }

    pub async fn send(&self, request: Request<Body>) -> Response<Body> {
        self.router.clone().oneshot(request).await.unwrap()
    }

    pub async fn xmlrpc(&self, document: String) -> (StatusCode, String) {
        let response = self
            .send(
                Request::post("/xmlrpc/")
                    .header(CONTENT_TYPE, "text/xml")
                    .body(Body::from(document))
                    .unwrap(),
            )
            .await;
        let status = response.status();
        (status, body_text(response).await)
    }
}

impl Drop for TestApp {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn create_item(
    repository: &MemoryContentRepository,
    slug: &str,
    body_html: &str,
    pingback_enabled: bool,
) -> ContentItem {
    repository
        .create_content(NewContentItem {
            title: slug.replace('-', " "),
            slug: slug.to_string(),
            body_html: body_html.to_string(),
            status: ContentStatus::Published,
            pingback_enabled,
            categories: vec!["Tests".to_string()],
            creation_date: Utc.with_ymd_and_hms(2010, 1, 1, 12, 0, 0).unwrap(),
        })
        .await
        .unwrap()
}

pub fn permalink(slug: &str) -> String {
    format!("{SITE_URL}2010/01/01/{slug}/")
}
