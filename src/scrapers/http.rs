use crate::config::ClientConfig;
use crate::error::Result;
use crate::models::QueryParameters;
use crate::scrapers::traits::Transport;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tracing::{debug, warn};

/// `reqwest`-backed transport
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Self::with_config(&ClientConfig::default())
    }

    pub fn with_config(config: &ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .user_agent(config.user_agent.as_str())
            .build()?;

        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get_json(&self, url: &str, params: &QueryParameters) -> Result<Value> {
        debug!("GET {} ({} params)", url, params.len());

        let response = self
            .client
            .get(url)
            .query(&params.to_pairs())
            .send()
            .await?;

        if !response.status().is_success() {
            warn!("{} returned status: {}", url, response.status());
        }
        let body = response.error_for_status()?.text().await?;
        debug!("Downloaded {} bytes", body.len());

        decode(&body)
    }
}

/// Parse a response body, failing with [`ScrapeError::Json`] on anything else
pub fn decode(body: &str) -> Result<Value> {
    Ok(serde_json::from_str(body)?)
}
