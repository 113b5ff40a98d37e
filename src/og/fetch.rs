use std::time::Duration;

use reqwest::Client;
use spdlog::{info, warn};
use thiserror::Error;

use crate::og::scrape::scrape;
use crate::og::{FetchFuture, OgData, OgFetcher};

pub const DEFAULT_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_USER_AGENT: &str = "bot";
const MAX_BODY_BYTES: usize = 2 * 1024 * 1024;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("timeout")]
    Timeout,
    #[error("HTTP {0}")]
    Status(u16),
    #[error("{0}")]
    Network(#[from] reqwest::Error),
}

pub struct HttpOgFetcher {
    client: Client,
    timeout: Duration,
}

impl HttpOgFetcher {
    pub fn new(timeout: Duration, user_agent: &str) -> reqwest::Result<Self> {
        let client = Client::builder().user_agent(user_agent).build()?;
        Ok(HttpOgFetcher { client, timeout })
    }

    async fn fetch_html(&self, url: &str) -> Result<String, FetchError> {
        let request = async {
            let mut response = self.client.get(url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(FetchError::Status(status.as_u16()));
            }
            // Anything past MAX_BODY_BYTES is never read
            let mut body = Vec::new();
            while let Some(chunk) = response.chunk().await? {
                let room = MAX_BODY_BYTES - body.len();
                if chunk.len() >= room {
                    body.extend_from_slice(&chunk[..room]);
                    break;
                }
                body.extend_from_slice(&chunk);
            }
            Ok::<String, FetchError>(String::from_utf8_lossy(&body).into_owned())
        };

        match tokio::time::timeout(self.timeout, request).await {
            Ok(result) => result,
            Err(_elapsed) => Err(FetchError::Timeout),
        }
    }
}

impl OgFetcher for HttpOgFetcher {
    fn fetch<'a>(&'a self, url: &'a str) -> FetchFuture<'a> {
        Box::pin(async move {
            match self.fetch_html(url).await {
                Ok(html) => {
                    info!("Fetched OG metadata for {}", url);
                    scrape(&html, url)
                }
                Err(e) => {
                    warn!("Error fetching OG metadata for {}: {}", url, e);
                    OgData::failed(url, e.to_string())
                }
            }
        })
    }
}
