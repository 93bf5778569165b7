//! HTTP client for the GitHub Actions REST API.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::StatusCode;
use runwatch_engine::SnapshotProvider;
use runwatch_types::{Job, JobList, Run, RunList};
use serde::de::DeserializeOwned;

use crate::error::GithubError;

/// Default API root.
pub const DEFAULT_API_URL: &str = "https://api.github.com";

/// Most items GitHub returns on one page.
const MAX_PAGE: u32 = 100;

/// Bytes of an error body kept in [`GithubError::Status`].
const ERROR_BODY_LIMIT: usize = 200;

/// Connection settings for [`GithubClient`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GithubSettings {
    /// API root, without trailing slash.
    pub api_url: String,
    /// Number of most recently updated runs requested per poll (1..=100).
    pub window: u32,
    /// Limit on establishing a connection.
    pub connect_timeout: Duration,
    /// Limit on a whole request, including reading the body.
    pub request_timeout: Duration,
}

impl Default for GithubSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            window: 10,
            connect_timeout: Duration::from_secs(10),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// Authenticated GitHub Actions client.
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    window: u32,
}

impl GithubClient {
    /// Builds a client that authenticates every request with `token`.
    ///
    /// # Errors
    ///
    /// Returns `GithubError::InvalidToken` if the token cannot be sent as a
    /// header, or `GithubError::Request` if the TLS backend cannot be
    /// initialised.
    pub fn new(token: &str, settings: GithubSettings) -> Result<Self, GithubError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        headers.insert("X-GitHub-Api-Version", HeaderValue::from_static("2022-11-28"));

        let mut auth = HeaderValue::from_str(&format!("Bearer {token}"))
            .map_err(|_| GithubError::InvalidToken)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .user_agent(concat!("runwatch/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;

        Ok(Self {
            http,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            window: settings.window.clamp(1, MAX_PAGE),
        })
    }

    /// Number of runs requested per listing.
    pub fn window(&self) -> u32 {
        self.window
    }

    fn runs_url(&self, repo: &str) -> String {
        format!(
            "{}/repos/{repo}/actions/runs?per_page={}&sort=updated",
            self.api_url, self.window
        )
    }

    fn jobs_url(&self, repo: &str, run_id: u64) -> String {
        format!(
            "{}/repos/{repo}/actions/runs/{run_id}/jobs?per_page={MAX_PAGE}",
            self.api_url
        )
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T, GithubError> {
        tracing::trace!(url, "GET");
        let response = self.http.get(url).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if status != StatusCode::OK {
            return Err(GithubError::Status {
                status: status.as_u16(),
                body: truncate(&body, ERROR_BODY_LIMIT),
            });
        }

        Ok(serde_json::from_str(&body)?)
    }
}

impl SnapshotProvider for GithubClient {
    type Error = GithubError;

    async fn fetch_runs(&self, repo: &str) -> Result<Vec<Run>, GithubError> {
        let list: RunList = self.get_json(&self.runs_url(repo)).await?;
        Ok(list.workflow_runs)
    }

    async fn fetch_jobs(&self, repo: &str, run_id: u64) -> Result<Vec<Job>, GithubError> {
        let list: JobList = self.get_json(&self.jobs_url(repo, run_id)).await?;
        Ok(list.jobs)
    }
}

fn truncate(body: &str, limit: usize) -> String {
    match body.char_indices().nth(limit) {
        Some((idx, _)) => format!("{}...", &body[..idx]),
        None => body.to_string(),
    }
}
