//! `weblogUpdates` pings to blog directories such as Ping-o-Matic.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, instrument};
use url::Url;

use crate::entities::ContentItem;
use crate::site::Site;
use crate::xmlrpc::{MethodCall, Value, XmlRpcTransport};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DirectoryPingResult {
    pub message: String,
    pub flerror: bool,
}

impl DirectoryPingResult {
    fn from_reply(reply: &Value) -> Option<Self> {
        let flerror = reply.member("flerror").and_then(Value::as_bool)?;
        let message = reply.member("message").and_then(Value::as_str)?;
        Some(Self {
            message: message.to_string(),
            flerror,
        })
    }
}

/// Notifies one directory about each item of a batch.
#[derive(Clone)]
pub struct DirectoryPinger {
    /// Directory address as configured; reported back verbatim.
    directory: String,
    endpoint: Option<Url>,
    site: Arc<Site>,
    transport: Arc<dyn XmlRpcTransport>,
}

impl DirectoryPinger {
    pub fn new(
        directory: impl Into<String>,
        site: Arc<Site>,
        transport: Arc<dyn XmlRpcTransport>,
    ) -> Self {
        let directory = directory.into();
        Self {
            endpoint: Url::parse(&directory).ok(),
            directory,
            site,
            transport,
        }
    }

    pub fn directory(&self) -> &str {
        &self.directory
    }

    pub async fn ping_items(&self, items: &[ContentItem]) -> Vec<DirectoryPingResult> {
        let mut results = Vec::with_capacity(items.len());
        for item in items {
            results.push(self.ping_item(item).await);
        }
        results
    }

    /// `extendedPing` first, plain `ping` when that is not answered properly.
    #[instrument(skip_all, fields(directory = %self.directory, content_id = item.id))]
    pub async fn ping_item(&self, item: &ContentItem) -> DirectoryPingResult {
        let name = Value::from(self.site.name());
        let blog_url = Value::from(self.site.blog_url().as_str());
        let permalink = Value::from(self.site.permalink(item).as_str());
        let categories = Value::from(item.categories.join("|"));

        let extended = MethodCall::new(
            "weblogUpdates.extendedPing",
            vec![
                name.clone(),
                blog_url.clone(),
                permalink.clone(),
                Value::from(self.site.feed_url().as_str()),
                categories.clone(),
            ],
        );
        if let Some(result) = self.call(&extended).await {
            return result;
        }

        let simple = MethodCall::new(
            "weblogUpdates.ping",
            vec![name, blog_url, permalink, categories],
        );
        self.call(&simple).await.unwrap_or_else(|| {
            info!("directory gave no usable answer");
            DirectoryPingResult {
                message: format!("{} is an invalid directory.", self.directory),
                flerror: true,
            }
        })
    }

    async fn call(&self, call: &MethodCall) -> Option<DirectoryPingResult> {
        let Some(endpoint) = &self.endpoint else {
            debug!(method = %call.method_name, "directory address is not a url");
            return None;
        };
        match self.transport.call(endpoint, call).await {
            Ok(reply) => {
                let result = DirectoryPingResult::from_reply(&reply);
                match &result {
                    Some(result) => info!(
                        method = %call.method_name,
                        flerror = result.flerror,
                        message = %result.message,
                        "directory answered"
                    ),
                    None => debug!(method = %call.method_name, ?reply, "non-conformant reply"),
                }
                result
            }
            Err(e) => {
                debug!(method = %call.method_name, error = %e, "directory call failed");
                None
            }
        }
    }
}
