pub mod client;
pub mod codec;
pub mod value;

pub use codec::{MethodCall, fault_xml, parse_method_response, response_xml};
pub use value::Value;

use async_trait::async_trait;
use thiserror::Error;
use url::Url;

use crate::fetcher::FetchError;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error("transport failed: {0}")]
    Transport(#[from] FetchError),

    #[error("malformed xml-rpc document: {0}")]
    Parse(String),

    #[error("fault {code}: {message}")]
    Fault { code: i32, message: String },
}

/// Capability to invoke a remote XML-RPC method.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait XmlRpcTransport: Send + Sync {
    async fn call(&self, endpoint: &Url, call: &MethodCall) -> Result<Value, RpcError>;
}
