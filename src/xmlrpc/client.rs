use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use tracing::{debug, instrument};
use url::Url;

use crate::fetcher::{FetchError, HttpFetcher, PageResponse, types::MAX_BODY_SIZE};
use crate::xmlrpc::{MethodCall, RpcError, Value, XmlRpcTransport, parse_method_response};

/// XML-RPC over HTTP `POST`, sharing the fetcher's client and limits.
#[async_trait]
impl XmlRpcTransport for HttpFetcher {
    #[instrument(skip_all, fields(endpoint = %endpoint, method = %call.method_name))]
    async fn call(&self, endpoint: &Url, call: &MethodCall) -> Result<Value, RpcError> {
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(FetchError::UnsupportedScheme(endpoint.scheme().to_string()).into());
        }

        let response = self
            .client()
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "text/xml")
            .body(call.to_xml())
            .send()
            .await
            .map_err(FetchError::from_reqwest_error)?;

        if let Some(content_length) = response.content_length()
            && content_length > MAX_BODY_SIZE
        {
            return Err(FetchError::BodyTooLarge(content_length).into());
        }

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Http { status }.into());
        }

        let body = PageResponse::from_response(response).text().await?;
        debug!(%status, bytes = body.len(), "xml-rpc response received");
        parse_method_response(&body)
    }
}
