//! Pingbacks sent for the external links of published content.

use serde::Serialize;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{info, instrument, warn};
use url::Url;

use crate::entities::ContentItem;
use crate::extractor::LinkExtractor;
use crate::fetcher::Fetch;
use crate::pingback::discovery::EndpointDiscoverer;
use crate::site::Site;
use crate::xmlrpc::{MethodCall, Value, XmlRpcTransport};

/// Result of one delivery attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PingOutcome {
    pub target: Url,
    pub endpoint: Url,
    pub message: String,
    pub is_error: bool,
}

#[derive(Clone)]
pub struct ExternalUrlsPinger {
    site: Arc<Site>,
    discoverer: EndpointDiscoverer,
    transport: Arc<dyn XmlRpcTransport>,
}

impl ExternalUrlsPinger {
    pub fn new(
        site: Arc<Site>,
        fetcher: Arc<dyn Fetch>,
        transport: Arc<dyn XmlRpcTransport>,
    ) -> Self {
        Self {
            site,
            discoverer: EndpointDiscoverer::new(fetcher),
            transport,
        }
    }

    /// External links of `item`, absolute, deduplicated in first-seen order.
    pub fn find_external_urls(&self, item: &ContentItem) -> Vec<Url> {
        let permalink = self.site.permalink(item);
        let extractor = LinkExtractor::parse(&item.body_html);

        let mut seen = HashSet::new();
        extractor
            .hrefs()
            .filter(|href| self.site.is_external(href))
            .filter_map(|href| permalink.join(href).ok())
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }

    /// Ping every external link of `item` that advertises an endpoint.
    #[instrument(skip_all, fields(content_id = item.id))]
    pub async fn ping_item(&self, item: &ContentItem) -> Vec<PingOutcome> {
        let source = self.site.permalink(item);
        let targets = self.find_external_urls(item);
        let endpoints = self.discoverer.discover_all(targets.iter().cloned()).await;
        info!(
            links = targets.len(),
            endpoints = endpoints.len(),
            "sending pingbacks"
        );

        let mut outcomes = Vec::with_capacity(endpoints.len());
        for target in &targets {
            if let Some(endpoint) = endpoints.get(target) {
                outcomes.push(self.pingback_url(&source, target, endpoint).await);
            }
        }
        outcomes
    }

    /// Deliver `pingback.ping(source, target)` to `endpoint`.
    #[instrument(skip(self), fields(source = %source, target = %target, endpoint = %endpoint))]
    pub async fn pingback_url(&self, source: &Url, target: &Url, endpoint: &Url) -> PingOutcome {
        let call = MethodCall::new(
            "pingback.ping",
            vec![Value::from(source.as_str()), Value::from(target.as_str())],
        );

        let (message, is_error) = match self.transport.call(endpoint, &call).await {
            Ok(Value::String(reply)) => (reply, false),
            Ok(Value::Int(code)) => (format!("{target} refused the pingback (code {code})."), true),
            Ok(other) => {
                warn!(reply = ?other, "unexpected pingback reply");
                (format!("{target} cannot be pinged."), true)
            }
            Err(e) => {
                warn!(error = %e, "pingback delivery failed");
                (format!("{target} cannot be pinged."), true)
            }
        };

        info!(is_error, %message, "pingback sent");
        PingOutcome {
            target: target.clone(),
            endpoint: endpoint.clone(),
            message,
            is_error,
        }
    }
}
