/// HTTP client for the Triage v0 API.
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use tracing::debug;

use crate::error::{ClientError, ClientResult};
use crate::models::{FeedPage, FeedSubset, StaticReport};

/// Production endpoint.
pub const BASE_URL: &str = "https://api.tria.ge/v0";

/// Largest page size the feed endpoint accepts.
pub const MAX_PAGE_SIZE: u32 = 200;

/// Every request is cut off after this long.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Authenticated client over the Triage REST endpoints.
///
/// Holds a single configured [`reqwest::Client`]; every request carries the
/// bearer access key and the configured User-Agent.
#[derive(Debug)]
pub struct TriageClient {
    http: reqwest::Client,
    base_url: String,
}

impl TriageClient {
    /// Build a client for the production API.
    ///
    /// Fails with [`ClientError::MissingAccessKey`] when the key is empty,
    /// before any network I/O happens.
    pub fn new(access_key: &str, user_agent: &str) -> ClientResult<Self> {
        Self::with_base_url(access_key, user_agent, BASE_URL)
    }

    /// Build a client against a custom endpoint (tests, self-hosted instances).
    pub fn with_base_url(
        access_key: &str,
        user_agent: &str,
        base_url: &str,
    ) -> ClientResult<Self> {
        if access_key.is_empty() {
            return Err(ClientError::MissingAccessKey);
        }
        let mut headers = HeaderMap::new();
        let bearer = HeaderValue::from_str(&format!("Bearer {access_key}"))
            .map_err(|e| ClientError::Config(format!("invalid access key: {e}")))?;
        headers.insert(AUTHORIZATION, bearer);

        let http = reqwest::Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(REQUEST_TIMEOUT)
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Endpoint this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Fetch one page of the sample feed.
    pub async fn feed_page(
        &self,
        subset: FeedSubset,
        limit: u32,
        offset: Option<&str>,
    ) -> ClientResult<FeedPage> {
        let mut query: Vec<(&str, String)> = vec![
            ("subset", subset.as_query().to_string()),
            ("limit", limit.to_string()),
        ];
        if let Some(offset) = offset {
            query.push(("offset", offset.to_string()));
        }
        let url = format!("{}/samples", self.base_url);
        debug!("GET {} subset={} limit={}", url, subset.as_query(), limit);
        let response = self.http.get(&url).query(&query).send().await?;
        let response = Self::check(response, "samples feed").await?;
        Ok(response.json().await?)
    }

    /// Fetch the static analysis report for a sample.
    pub async fn static_report(&self, sample_id: &str) -> ClientResult<StaticReport> {
        let url = format!("{}/samples/{}/reports/static", self.base_url, sample_id);
        debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        let response = Self::check(response, sample_id).await?;
        Ok(response.json().await?)
    }

    /// Fetch the raw bytes of the originally submitted sample.
    pub async fn download(&self, sample_id: &str) -> ClientResult<Vec<u8>> {
        let url = format!("{}/samples/{}/sample", self.base_url, sample_id);
        debug!("GET {}", url);
        let response = self.http.get(&url).send().await?;
        let response = Self::check(response, sample_id).await?;
        Ok(response.bytes().await?.to_vec())
    }

    /// Turn a non-success response into a typed error, keeping the body text.
    async fn check(
        response: reqwest::Response,
        subject: &str,
    ) -> ClientResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::from_status(status.as_u16(), body, subject))
    }
}
