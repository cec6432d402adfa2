// src/services/fetcher.rs

//! Schedule page fetcher.
//!
//! Issues one bounded GET against the upstream page and, when that fails,
//! walks the configured relay endpoints in order until one of them
//! returns a plausible document.

use std::time::Duration;

use reqwest::Client;
use reqwest::header::{ACCEPT, CACHE_CONTROL};

use crate::error::{FetchError, Result};
use crate::models::{AlternativePath, FetcherConfig};
use crate::utils::http::create_async_client;

/// Name reported for the direct attempt.
pub const DIRECT_PATH: &str = "direct";

/// Service for downloading the schedule page.
pub struct ScheduleFetcher {
    client: Client,
    url: String,
    timeout: Duration,
    min_body_chars: usize,
    alternatives: Vec<AlternativePath>,
}

impl ScheduleFetcher {
    /// Create a fetcher from configuration.
    pub fn new(config: &FetcherConfig) -> Result<Self> {
        let alternatives = if config.try_alternatives {
            config.alternatives.clone()
        } else {
            Vec::new()
        };

        Ok(Self {
            client: create_async_client(config)?,
            url: config.url.clone(),
            timeout: config.timeout(),
            min_body_chars: config.min_body_chars,
            alternatives,
        })
    }

    /// Override the per-attempt deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Upstream URL this fetcher targets.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Fetch the raw page text.
    ///
    /// With no alternatives configured the direct error is returned as-is.
    /// Otherwise every failure is collected and reported together.
    pub async fn fetch(&self) -> std::result::Result<String, FetchError> {
        log::info!("Fetching schedule from {}", self.url);

        let direct_err = match self.fetch_url(&self.url).await {
            Ok(html) => return Ok(html),
            Err(e) => e,
        };
        log::warn!("Direct fetch failed ({}): {}", direct_err.kind(), direct_err);

        if self.alternatives.is_empty() {
            return Err(direct_err);
        }

        let mut attempts = vec![(DIRECT_PATH.to_string(), direct_err)];
        for alt in &self.alternatives {
            let target = alt.resolve(&self.url);
            log::info!("Trying alternative path '{}'", alt.name);
            match self.fetch_url(&target).await {
                Ok(html) => {
                    log::info!("Alternative path '{}' succeeded", alt.name);
                    return Ok(html);
                }
                Err(e) => {
                    log::warn!("Alternative path '{}' failed: {}", alt.name, e);
                    attempts.push((alt.name.clone(), e));
                }
            }
        }

        Err(FetchError::AllAlternativesExhausted { attempts })
    }

    /// One bounded attempt against a single URL.
    async fn fetch_url(&self, url: &str) -> std::result::Result<String, FetchError> {
        let request = async {
            let response = self
                .client
                .get(url)
                .header(ACCEPT, "text/html")
                .header(CACHE_CONTROL, "no-store")
                .send()
                .await
                .map_err(|e| self.transport_error(e))?;

            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::HttpStatus {
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or("").to_string(),
                });
            }

            response.text().await.map_err(|e| self.transport_error(e))
        };

        // Dropping the request future on expiry cancels the in-flight call.
        let html = tokio::time::timeout(self.timeout, request)
            .await
            .map_err(|_| self.timeout_error())??;

        let len = html.chars().count();
        log::debug!("Received {} chars from {}", len, url);
        if len < self.min_body_chars {
            return Err(FetchError::TooSmall {
                len,
                min: self.min_body_chars,
            });
        }

        Ok(html)
    }

    fn transport_error(&self, e: reqwest::Error) -> FetchError {
        if e.is_timeout() {
            self.timeout_error()
        } else {
            FetchError::Transport(e.to_string())
        }
    }

    fn timeout_error(&self) -> FetchError {
        FetchError::Timeout {
            secs: self.timeout.as_secs(),
        }
    }
}
