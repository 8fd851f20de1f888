//! Finding the pingback endpoint a remote resource advertises.

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};
use url::Url;

use crate::extractor::pingback_link;
use crate::fetcher::{Fetch, FetchError, PageResponse};

pub const PINGBACK_HEADER: &str = "X-Pingback";

/// What the status line and headers alone tell us.
#[derive(Debug, PartialEq, Eq)]
enum HeadDecision {
    /// Binary or untyped resource; the body is not worth downloading.
    Skip,
    Endpoint(String),
    ReadBody,
}

fn inspect_head(response: &PageResponse) -> HeadDecision {
    if !response.is_textual() {
        return HeadDecision::Skip;
    }
    match response.header(PINGBACK_HEADER).map(str::trim) {
        Some(endpoint) if !endpoint.is_empty() => HeadDecision::Endpoint(endpoint.to_string()),
        _ => HeadDecision::ReadBody,
    }
}

#[derive(Clone)]
pub struct EndpointDiscoverer {
    fetcher: Arc<dyn Fetch>,
}

impl EndpointDiscoverer {
    pub fn new(fetcher: Arc<dyn Fetch>) -> Self {
        Self { fetcher }
    }

    /// Endpoint exactly as advertised by `url`, relative or not.
    pub async fn advertised(&self, url: &Url) -> Option<String> {
        self.lookup(url).await.map(|(_, endpoint)| endpoint)
    }

    /// Absolute endpoint of `url`, resolved against the address it was served from.
    pub async fn discover(&self, url: &Url) -> Option<Url> {
        let (served_from, endpoint) = self.lookup(url).await?;
        match served_from.join(&endpoint) {
            Ok(endpoint) => Some(endpoint),
            Err(e) => {
                debug!(%url, %endpoint, error = %e, "advertised endpoint is not a url");
                None
            }
        }
    }

    /// Endpoints of every URL that advertises one, checked one after another.
    pub async fn discover_all<I>(&self, urls: I) -> BTreeMap<Url, Url>
    where
        I: IntoIterator<Item = Url>,
    {
        let mut endpoints = BTreeMap::new();
        for url in urls {
            if let Some(endpoint) = self.discover(&url).await {
                endpoints.insert(url, endpoint);
            }
        }
        endpoints
    }

    #[instrument(skip(self), fields(url = %url))]
    async fn lookup(&self, url: &Url) -> Option<(Url, String)> {
        match self.try_lookup(url).await {
            Ok(found) => found,
            Err(e) => {
                debug!(error = %e, timeout = e.is_timeout(), "endpoint discovery failed");
                None
            }
        }
    }

    async fn try_lookup(&self, url: &Url) -> Result<Option<(Url, String)>, FetchError> {
        let response = self.fetcher.fetch(url).await?;
        let served_from = response.url_final.clone();

        match inspect_head(&response) {
            HeadDecision::Skip => {
                debug!(content_type = ?response.content_type(), "not a textual resource");
                Ok(None)
            }
            HeadDecision::Endpoint(endpoint) => Ok(Some((served_from, endpoint))),
            HeadDecision::ReadBody => {
                let body = response.text().await?;
                Ok(pingback_link(&body).map(|endpoint| (served_from, endpoint)))
            }
        }
    }
}
