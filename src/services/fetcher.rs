// src/services/fetcher.rs

//! reqwest-backed page fetcher.

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::CONTENT_TYPE;

use crate::error::{FetchError, Result};
use crate::models::CrawlerConfig;
use crate::utils::http::create_async_client;

use super::Fetcher;

/// Fetches pages over HTTP(S) and classifies failures.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    pub fn from_config(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self::new(create_async_client(config)?))
    }

    fn is_html(content_type: Option<&str>) -> bool {
        match content_type {
            // Servers that omit the header get the benefit of the doubt.
            None => true,
            Some(value) => {
                let value = value.to_ascii_lowercase();
                value.starts_with("text/html") || value.starts_with("application/xhtml")
            }
        }
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> std::result::Result<String, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::request(url, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::status(url, status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok());
        if !Self::is_html(content_type) {
            return Err(FetchError::content(
                url,
                format!("unsupported content type {}", content_type.unwrap_or("")),
            ));
        }

        response.text().await.map_err(|e| FetchError::request(url, e))
    }
}
