// src/utils/http.rs

//! HTTP client utilities.

use reqwest::Client;

use crate::error::Result;
use crate::models::FetcherConfig;

/// Create a configured asynchronous HTTP client.
///
/// The per-attempt deadline is enforced by the fetcher itself, so the
/// client only carries the connect timeout.
pub fn create_async_client(config: &FetcherConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .connect_timeout(config.timeout())
        .build()?;
    Ok(client)
}
