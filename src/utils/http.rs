// src/utils/http.rs

//! HTTP client utilities.

use reqwest::Client;

use crate::error::Result;
use crate::models::CrawlerConfig;

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<Client> {
    let client = Client::builder()
        .user_agent(&config.user_agent)
        .timeout(config.fetch_timeout())
        .build()?;
    Ok(client)
}
