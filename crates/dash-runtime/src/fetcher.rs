//! Transport seam for source downloads.

use std::future::Future;
use std::time::Duration;

use dash_core::error::{DashError, Result};
use reqwest::Client;

/// Connection timeout for the production client. The overall per-fetch
/// deadline is applied by the cache.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Something that can download the body of a URL as text.
pub trait Fetcher: Send + Sync + 'static {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String>> + Send;
}

/// [`Fetcher`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("campaign-dash/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| DashError::Fetch {
                url: String::new(),
                message: format!("could not build HTTP client: {e}"),
            })?;
        Ok(Self { client })
    }

    /// Use an existing client, e.g. one with a proxy configured.
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

impl Fetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> impl Future<Output = Result<String>> + Send {
        async move {
            tracing::debug!(%url, "fetching source");
            let response = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| transport_error(url, e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(DashError::HttpStatus {
                    url: url.to_string(),
                    status: status.as_u16(),
                });
            }

            response.text().await.map_err(|e| transport_error(url, e))
        }
    }
}

fn transport_error(url: &str, e: reqwest::Error) -> DashError {
    DashError::Fetch {
        url: url.to_string(),
        message: e.to_string(),
    }
}
