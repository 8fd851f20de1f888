pub mod client;
pub mod errors;
pub mod pipeline;
pub mod types;

pub use client::HttpFetcher;
pub use errors::FetchError;
pub use types::PageResponse;

use async_trait::async_trait;
use url::Url;

/// Capability to retrieve a remote resource.
///
/// Implementations return once status and headers are known; callers decide
/// whether the body is worth downloading via [`PageResponse::text`].
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Fetch: Send + Sync {
    async fn fetch(&self, url: &Url) -> Result<PageResponse, FetchError>;
}
