//! Single-attempt HTTP fetches with a tagged outcome instead of errors.
//!
//! Expected conditions (bad status, unparseable body, timeouts) are values,
//! not exceptions: the per-item ingest loop logs them and moves on, and a
//! later run retries via the checkpoint. No retries happen here.

use std::fmt;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{Client, StatusCode};
use serde_json::Value;
use url::Url;

/// Why a fetch attempt produced no usable payload.
#[derive(Debug, Clone)]
pub enum FetchFailure {
    /// Network-level problem: connect error, timeout, TLS.
    Transport(String),
    /// Non-success HTTP status other than 429.
    Status(u16),
    /// The API told us to slow down (HTTP 429).
    RateLimited,
    /// 2xx response whose body was not the JSON we expect.
    Malformed(String),
}

impl fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchFailure::Transport(msg) => write!(f, "transport error: {msg}"),
            FetchFailure::Status(code) => write!(f, "non-success status: {code}"),
            FetchFailure::RateLimited => write!(f, "rate limited (429)"),
            FetchFailure::Malformed(msg) => write!(f, "unparseable body: {msg}"),
        }
    }
}

/// Tagged outcome of one fetch attempt. Never partially populated.
#[derive(Debug, Clone)]
pub enum FetchOutcome {
    Success(Value),
    /// Well-formed response with no usable data (collection-specific call).
    Empty,
    Failure(FetchFailure),
}

/// Thin reqwest wrapper issuing exactly one bounded request per call.
#[derive(Clone)]
pub struct FetchClient {
    http: Client,
}

impl FetchClient {
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .context("building http client")?;
        Ok(Self { http })
    }

    /// One GET, one attempt. HTTP-level and body-level problems map to
    /// `Failure`; callers classify domain-level emptiness themselves.
    pub async fn get_json(&self, url: Url, query: &[(&str, String)]) -> FetchOutcome {
        let resp = match self.http.get(url).query(query).send().await {
            Ok(resp) => resp,
            Err(err) => {
                return FetchOutcome::Failure(FetchFailure::Transport(err.to_string()));
            }
        };
        let status = resp.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            return FetchOutcome::Failure(FetchFailure::RateLimited);
        }
        if !status.is_success() {
            return FetchOutcome::Failure(FetchFailure::Status(status.as_u16()));
        }
        match resp.json::<Value>().await {
            Ok(payload) => FetchOutcome::Success(payload),
            Err(err) => FetchOutcome::Failure(FetchFailure::Malformed(err.to_string())),
        }
    }
}
