//! GitHub REST client
//!
//! Key design: rate limiting is the only failure that is retried. A 403/429
//! without remaining quota waits until the provider's reset time plus a
//! buffer and re-issues the identical request, at most
//! `max_rate_limit_retries` times. Everything else is returned to the caller.

use crate::auth::GitHubCredentials;
use crate::pacing::{rate_limit_wait, Clock, Sleeper, SystemClock, TokioSleeper};
use crate::types::{HttpResponse, PullDetail, PullSummary, SearchResults};
use async_trait::async_trait;
use remedy_core::{GitHubConfig, RemedyError, RepoSpec, Result};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;

/// Page size for the list endpoint (GitHub maximum)
pub const PER_PAGE: u32 = 100;

const GITHUB_ACCEPT: &str = "application/vnd.github+json";
const GITHUB_API_VERSION: &str = "2022-11-28";

/// Issues a single GET and reports the raw outcome
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// `reqwest`-backed transport with the credential baked into default headers
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(config: &GitHubConfig, credentials: &GitHubCredentials) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(GITHUB_ACCEPT));
        headers.insert(
            "x-github-api-version",
            HeaderValue::from_static(GITHUB_API_VERSION),
        );
        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&credentials.bearer())
                .map_err(|e| RemedyError::Auth(format!("Invalid token header: {}", e)))?,
        );
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|e| RemedyError::Config(format!("Invalid user agent: {}", e)))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| RemedyError::Http(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        tracing::debug!("GET {}", url);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| RemedyError::Http(format!("Failed to send request: {}", e)))?;

        let status = response.status().as_u16();
        let header = |name: &str| {
            response
                .headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };
        let rate_limit_reset = header("x-ratelimit-reset").and_then(|s| s.parse::<i64>().ok());
        let rate_limit_remaining =
            header("x-ratelimit-remaining").and_then(|s| s.parse::<u64>().ok());

        let body = response
            .text()
            .await
            .map_err(|e| RemedyError::Http(format!("Failed to read response: {}", e)))?;

        Ok(HttpResponse {
            status,
            rate_limit_reset,
            rate_limit_remaining,
            body,
        })
    }
}

/// GitHub API client with bounded rate-limit retry
pub struct GitHubClient {
    transport: Arc<dyn Transport>,
    clock: Arc<dyn Clock>,
    sleeper: Arc<dyn Sleeper>,
    api_base: String,
    rate_limit_buffer_secs: u64,
    max_rate_limit_retries: u32,
    request_delay: Duration,
}

impl GitHubClient {
    /// Create a client talking to the real API
    pub fn new(config: &GitHubConfig, credentials: &GitHubCredentials) -> Result<Self> {
        let transport = ReqwestTransport::new(config, credentials)?;
        Ok(Self::with_transport(config, Arc::new(transport)))
    }

    /// Create a client over an arbitrary transport, using the wall clock
    pub fn with_transport(config: &GitHubConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            transport,
            clock: Arc::new(SystemClock),
            sleeper: Arc::new(TokioSleeper),
            api_base: config.api_base.trim_end_matches('/').to_string(),
            rate_limit_buffer_secs: config.rate_limit_buffer_secs,
            max_rate_limit_retries: config.max_rate_limit_retries,
            request_delay: Duration::from_millis(config.request_delay_ms),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn api_base(&self) -> &str {
        &self.api_base
    }

    /// GET with rate-limit handling; any non-rate-limited response is returned as-is
    pub async fn get(&self, url: &str) -> Result<HttpResponse> {
        let mut retries = 0;

        loop {
            let response = self.transport.get(url).await?;

            if !response.is_rate_limited() {
                return Ok(response);
            }

            if retries >= self.max_rate_limit_retries {
                tracing::error!(
                    "Rate limit persisted after {} retries for {}",
                    retries,
                    url
                );
                return Err(RemedyError::RateLimited {
                    retries,
                    url: url.to_string(),
                });
            }

            retries += 1;
            let wait = rate_limit_wait(
                self.clock.now(),
                response.rate_limit_reset,
                self.rate_limit_buffer_secs,
            );

            tracing::warn!(
                "Rate limited ({}). Waiting {} seconds before retry {}/{}",
                response.status,
                wait.as_secs(),
                retries,
                self.max_rate_limit_retries
            );

            self.sleeper.sleep(wait).await;
        }
    }

    /// GET and decode a 200 response; other statuses become `RemedyError::Provider`
    pub async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self.get(url).await?;

        if response.status != 200 {
            return Err(RemedyError::Provider {
                status: response.status,
                url: url.to_string(),
            });
        }

        Ok(serde_json::from_str(&response.body)?)
    }

    pub fn list_url(&self, repo: &RepoSpec, page: u32) -> String {
        format!(
            "{}/repos/{}/{}/pulls?state=closed&sort=created&direction=desc&page={}&per_page={}",
            self.api_base, repo.owner, repo.name, page, PER_PAGE
        )
    }

    pub fn pull_url(&self, repo: &RepoSpec, number: u64) -> String {
        format!(
            "{}/repos/{}/{}/pulls/{}",
            self.api_base, repo.owner, repo.name, number
        )
    }

    pub fn search_url(&self, repo: &RepoSpec, number: u64) -> String {
        format!(
            "{}/search/issues?q=repo:{}/{}+type:pr+in:body+%23{}&sort=created&order=desc",
            self.api_base, repo.owner, repo.name, number
        )
    }

    /// One page of closed PRs, newest first
    pub async fn list_closed_pulls(&self, repo: &RepoSpec, page: u32) -> Result<Vec<PullSummary>> {
        self.get_json(&self.list_url(repo, page)).await
    }

    pub async fn get_pull(&self, repo: &RepoSpec, number: u64) -> Result<PullDetail> {
        self.get_json(&self.pull_url(repo, number)).await
    }

    /// PRs whose body references `#number`
    pub async fn search_references(&self, repo: &RepoSpec, number: u64) -> Result<SearchResults> {
        self.get_json(&self.search_url(repo, number)).await
    }

    /// Politeness delay between accepted PRs
    pub async fn pause(&self) {
        self.sleeper.sleep(self.request_delay).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};
    use std::collections::VecDeque;
    use std::sync::Mutex;

    struct ScriptedTransport {
        responses: Mutex<VecDeque<HttpResponse>>,
        calls: Mutex<Vec<String>>,
    }

    impl ScriptedTransport {
        fn new(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Transport for ScriptedTransport {
        async fn get(&self, url: &str) -> Result<HttpResponse> {
            self.calls.lock().unwrap().push(url.to_string());
            Ok(self
                .responses
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| HttpResponse::status(404)))
        }
    }

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Default)]
    struct RecordingSleeper {
        sleeps: Mutex<Vec<Duration>>,
    }

    #[async_trait]
    impl Sleeper for RecordingSleeper {
        async fn sleep(&self, duration: Duration) {
            self.sleeps.lock().unwrap().push(duration);
        }
    }

    fn rate_limited(reset: i64) -> HttpResponse {
        HttpResponse {
            status: 403,
            rate_limit_reset: Some(reset),
            rate_limit_remaining: Some(0),
            body: r#"{"message": "API rate limit exceeded"}"#.to_string(),
        }
    }

    fn client(
        transport: Arc<ScriptedTransport>,
        sleeper: Arc<RecordingSleeper>,
    ) -> GitHubClient {
        let config = GitHubConfig::default();
        GitHubClient::with_transport(&config, transport)
            .with_clock(Arc::new(FixedClock(
                Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
            )))
            .with_sleeper(sleeper)
    }

    #[tokio::test]
    async fn test_rate_limit_waits_then_retries_same_request() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            rate_limited(1_700_000_030),
            HttpResponse::ok(r#"[{"number": 1}]"#),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client(transport.clone(), sleeper.clone());

        let repo = RepoSpec::new("eslint", "eslint");
        let prs = client.list_closed_pulls(&repo, 1).await.unwrap();
        assert_eq!(prs.len(), 1);

        assert_eq!(*sleeper.sleeps.lock().unwrap(), vec![Duration::from_secs(35)]);
        let calls = transport.calls.lock().unwrap();
        assert_eq!(calls.len(), 2);
        assert_eq!(calls[0], calls[1]);
    }

    #[tokio::test]
    async fn test_rate_limit_retries_are_bounded() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            rate_limited(1_700_000_010),
            rate_limited(1_700_000_010),
            rate_limited(1_700_000_010),
            rate_limited(1_700_000_010),
            HttpResponse::ok("[]"),
        ]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client(transport.clone(), sleeper.clone());

        let repo = RepoSpec::new("eslint", "eslint");
        let err = client.list_closed_pulls(&repo, 1).await.unwrap_err();
        assert!(matches!(err, RemedyError::RateLimited { retries: 3, .. }));
        assert_eq!(sleeper.sleeps.lock().unwrap().len(), 3);
        assert_eq!(transport.calls.lock().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn test_forbidden_with_quota_is_not_retried() {
        let mut forbidden = HttpResponse::status(403);
        forbidden.rate_limit_remaining = Some(4999);
        let transport = Arc::new(ScriptedTransport::new(vec![forbidden]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client(transport.clone(), sleeper.clone());

        let err = client
            .get_pull(&RepoSpec::new("a", "b"), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, RemedyError::Provider { status: 403, .. }));
        assert!(sleeper.sleeps.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_non_200_is_provider_error() {
        let transport = Arc::new(ScriptedTransport::new(vec![HttpResponse::status(502)]));
        let sleeper = Arc::new(RecordingSleeper::default());
        let client = client(transport, sleeper);

        let err = client
            .get_pull(&RepoSpec::new("a", "b"), 5)
            .await
            .unwrap_err();
        assert!(matches!(err, RemedyError::Provider { status: 502, .. }));
    }

    #[test]
    fn test_urls() {
        let config = GitHubConfig {
            api_base: "https://api.github.com/".to_string(),
            ..GitHubConfig::default()
        };
        let client = GitHubClient::with_transport(
            &config,
            Arc::new(ScriptedTransport::new(Vec::new())),
        );
        let repo = RepoSpec::new("nodejs", "node");

        assert_eq!(
            client.list_url(&repo, 2),
            "https://api.github.com/repos/nodejs/node/pulls?state=closed&sort=created&direction=desc&page=2&per_page=100"
        );
        assert_eq!(
            client.pull_url(&repo, 99),
            "https://api.github.com/repos/nodejs/node/pulls/99"
        );
        assert!(client.search_url(&repo, 99).contains("in:body+%2399"));
    }
}
