use bytes::{Bytes, BytesMut};
use chrono::{DateTime, Utc};
use reqwest::{StatusCode, header::HeaderMap};
use url::Url;

use crate::fetcher::{errors::FetchError, pipeline};

/// Upper bound on bodies we are willing to buffer.
pub const MAX_BODY_SIZE: u64 = 5 * 1024 * 1024; // 5MB

/// A fetched resource whose headers are available immediately and whose
/// body is only downloaded when [`PageResponse::text`] is called.
#[derive(Debug)]
pub struct PageResponse {
    pub url_final: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub fetched_at: DateTime<Utc>,
    body: Body,
}

#[derive(Debug)]
enum Body {
    Pending(reqwest::Response),
    Buffered(Bytes),
}

impl PageResponse {
    /// Wrap a live response; the body stays on the wire until requested.
    pub(crate) fn from_response(response: reqwest::Response) -> Self {
        Self {
            url_final: response.url().clone(),
            status: response.status(),
            headers: response.headers().clone(),
            fetched_at: Utc::now(),
            body: Body::Pending(response),
        }
    }

    /// Build a response from an already available body (tests, caches).
    pub fn from_bytes(
        url_final: Url,
        status: StatusCode,
        headers: HeaderMap,
        body: impl Into<Bytes>,
    ) -> Self {
        Self {
            url_final,
            status,
            headers,
            fetched_at: Utc::now(),
            body: Body::Buffered(body.into()),
        }
    }

    /// Header value by name. `HeaderMap` lookups are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|value| value.to_str().ok())
    }

    pub fn content_type(&self) -> Option<&str> {
        self.header(reqwest::header::CONTENT_TYPE.as_str())
    }

    /// Whether the declared content type is something we can parse as markup.
    /// A missing content type is treated as binary.
    pub fn is_textual(&self) -> bool {
        self.content_type().is_some_and(|ct| {
            let ct = ct.to_ascii_lowercase();
            ct.contains("text") || ct.contains("html") || ct.contains("xml")
        })
    }

    /// Download (if needed) and decode the body to UTF-8.
    pub async fn text(self) -> Result<String, FetchError> {
        let content_type = self.content_type().map(str::to_owned);
        let bytes = match self.body {
            Body::Buffered(bytes) => bytes,
            Body::Pending(response) => read_capped(response).await?,
        };

        if bytes.len() as u64 > MAX_BODY_SIZE {
            return Err(FetchError::BodyTooLarge(bytes.len() as u64));
        }

        Ok(pipeline::decode_body(content_type.as_deref(), &bytes))
    }
}

/// Stream the body, giving up as soon as it outgrows [`MAX_BODY_SIZE`].
/// Chunked responses carry no Content-Length to reject them up front.
async fn read_capped(mut response: reqwest::Response) -> Result<Bytes, FetchError> {
    let mut body = BytesMut::new();
    while let Some(chunk) = response
        .chunk()
        .await
        .map_err(FetchError::from_reqwest_error)?
    {
        let read = (body.len() + chunk.len()) as u64;
        if read > MAX_BODY_SIZE {
            return Err(FetchError::BodyTooLarge(read));
        }
        body.extend_from_slice(&chunk);
    }
    Ok(body.freeze())
}
