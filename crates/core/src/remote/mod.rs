pub mod api;
pub mod error;
pub mod http;

#[cfg(test)]
pub(crate) mod fake;

use serde_json::Value;
use std::fmt;

pub use api::MarketApi;
pub use error::RemoteFailure;
pub use http::HttpRemote;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Method {
    Get,
    Post,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Delete => "DELETE",
        })
    }
}

/// The one capability the core needs from the outside world: issue a request against the
/// backend and get JSON back. `path` includes any query string.
///
/// Non-2xx responses are reported as an `anyhow::Error` wrapping [`RemoteFailure`].
#[async_trait::async_trait]
pub trait RemoteDataPort: Send + Sync {
    async fn request(&self, method: Method, path: &str, body: Option<Value>)
        -> anyhow::Result<Value>;
}
