use std::time::{Duration, Instant};

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::api::Endpoint;
use crate::config::UpstreamConfig;
use crate::error::UpstreamError;

/// Transport for the upstream catalog API. Returns the raw body of a
/// successful response; any non-2xx status is an error. No retries.
#[async_trait]
pub trait Upstream: Send + Sync {
    async fn get(&self, endpoint: &Endpoint) -> Result<String, UpstreamError>;
}

/// reqwest-backed [`Upstream`].
pub struct UpstreamClient {
    client: Client,
    base_url: String,
    slow_warn: Duration,
}

impl UpstreamClient {
    pub fn new(cfg: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let client = Client::builder()
            .user_agent(cfg.user_agent.as_str())
            .timeout(cfg.timeout())
            .build()?;
        Ok(Self::with_client(client, &cfg.base_url)?)
    }

    /// Use a preconfigured client; `base_url` must be absolute.
    pub fn with_client(client: Client, base_url: &str) -> Result<Self, url::ParseError> {
        Url::parse(base_url)?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            slow_warn: Duration::from_secs(5),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub(crate) fn url(&self, endpoint: &Endpoint) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&format!("{}{}", self.base_url, endpoint.path()))?;
        url.query_pairs_mut().extend_pairs(endpoint.query());
        Ok(url)
    }

    fn warn_if_slow(&self, start: Instant, endpoint: &Endpoint) {
        let elapsed = start.elapsed();
        if elapsed > self.slow_warn {
            tracing::warn!(endpoint = endpoint.name(), ?elapsed, "slow upstream response");
        }
    }
}

#[async_trait]
impl Upstream for UpstreamClient {
    async fn get(&self, endpoint: &Endpoint) -> Result<String, UpstreamError> {
        let url = self.url(endpoint)?;
        tracing::debug!(%url, "upstream request");
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()
            .await;
        self.warn_if_slow(start, endpoint);
        let response = response?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(UpstreamError::Api { status_code: status.as_u16(), message });
        }
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Resolution;

    #[test]
    fn urls_join_base_path_and_query() {
        let c = UpstreamClient::with_client(Client::new(), "https://api.example.test/api/").unwrap();
        assert_eq!(c.base_url(), "https://api.example.test/api");

        let u = c.url(&Endpoint::Search { query: "kimi no na wa".into() }).unwrap();
        assert_eq!(u.as_str(), "https://api.example.test/api/anime/search?query=kimi+no+na+wa");

        let u = c
            .url(&Endpoint::Video { chapter: "x-episode-1".into(), resolution: Resolution::P1080 })
            .unwrap();
        assert_eq!(u.path(), "/api/anime/getvideo");
        assert_eq!(u.query(), Some("chapterUrlId=x-episode-1&reso=1080p"));
    }

    #[test]
    fn relative_base_is_rejected() {
        assert!(UpstreamClient::with_client(Client::new(), "/api/anime").is_err());
    }
}
