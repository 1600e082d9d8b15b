//! HTTP schedule source

use std::time::{Duration, Instant};

use async_trait::async_trait;
use bytes::Bytes;
use reqwest::StatusCode;
use reqwest::header::LAST_MODIFIED;

use crate::error::{Error, Result};
use crate::ingest::ScheduleSource;

/// The upstream server rejects non-browser agents
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

pub const HEAD_TIMEOUT: Duration = Duration::from_secs(10);
pub const GET_TIMEOUT: Duration = Duration::from_secs(60);

/// Fetches schedule files over HTTP(S)
#[derive(Debug, Clone)]
pub struct HttpSource {
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(BROWSER_USER_AGENT)
            .build()
            .map_err(|e| Error::Fetch {
                url: String::new(),
                message: e.to_string(),
            })?;
        Ok(HttpSource { client })
    }
}

fn fetch_error(url: &str, err: impl std::fmt::Display) -> Error {
    Error::Fetch {
        url: url.to_string(),
        message: err.to_string(),
    }
}

#[async_trait]
impl ScheduleSource for HttpSource {
    async fn last_modified(&self, url: &str) -> Result<Option<String>> {
        let start = Instant::now();
        let response = self
            .client
            .head(url)
            .timeout(HEAD_TIMEOUT)
            .send()
            .await
            .map_err(|e| fetch_error(url, e))?;

        if response.status() != StatusCode::OK {
            tracing::warn!(url, status = %response.status(), elapsed = ?start.elapsed(), "HEAD rejected");
            return Ok(None);
        }

        let last_modified = response
            .headers()
            .get(LAST_MODIFIED)
            .and_then(|value| value.to_str().ok())
            .filter(|value| !value.is_empty())
            .map(str::to_string);
        tracing::debug!(url, ?last_modified, elapsed = ?start.elapsed(), "HEAD");
        Ok(last_modified)
    }

    async fn fetch(&self, url: &str) -> Result<Bytes> {
        let response = self
            .client
            .get(url)
            .timeout(GET_TIMEOUT)
            .send()
            .await
            .map_err(|e| fetch_error(url, e))?;

        if response.status() != StatusCode::OK {
            return Err(fetch_error(url, format!("bad status code: {}", response.status())));
        }
        response.bytes().await.map_err(|e| fetch_error(url, e))
    }
}
