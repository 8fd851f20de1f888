use crate::fetcher::{
    Fetch,
    errors::FetchError,
    types::{MAX_BODY_SIZE, PageResponse},
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use reqwest::{Client, ClientBuilder};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

const USER_AGENT: &str = concat!("Pingback/", env!("CARGO_PKG_VERSION"));
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: usize = 10;

static HTTP_CLIENT: Lazy<Client> =
    Lazy::new(|| build_client(DEFAULT_TIMEOUT).expect("Failed to build HTTP client"));

fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    ClientBuilder::new()
        .connect_timeout(timeout.min(Duration::from_secs(5)))
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
        .default_headers({
            let mut headers = reqwest::header::HeaderMap::new();
            headers.insert(
                reqwest::header::ACCEPT,
                reqwest::header::HeaderValue::from_static(
                    "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
                ),
            );
            headers
        })
        .build()
}

/// HTTP implementation of [`Fetch`] and of the XML-RPC transport.
#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Fetcher with its own client and request timeout.
    pub fn new(timeout: Duration) -> Result<Self, FetchError> {
        let client = build_client(timeout).map_err(FetchError::from_reqwest_error)?;
        Ok(Self { client })
    }

    /// Fetcher backed by the process-wide default client.
    pub fn shared() -> Self {
        Self {
            client: HTTP_CLIENT.clone(),
        }
    }

    pub fn client(&self) -> &Client {
        &self.client
    }
}

impl Default for HttpFetcher {
    fn default() -> Self {
        Self::shared()
    }
}

#[async_trait]
impl Fetch for HttpFetcher {
    #[instrument(skip_all, fields(url = %url))]
    async fn fetch(&self, url: &Url) -> Result<PageResponse, FetchError> {
        if !matches!(url.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(url.scheme().to_string()));
        }

        let response = self
            .client
            .get(url.clone())
            .send()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        // Check content length before anyone downloads the body
        if let Some(content_length) = response.content_length()
            && content_length > MAX_BODY_SIZE
        {
            return Err(FetchError::BodyTooLarge(content_length));
        }

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http { status });
        }

        debug!(final_url = %response.url(), %status, "fetched headers");
        Ok(PageResponse::from_response(response))
    }
}
