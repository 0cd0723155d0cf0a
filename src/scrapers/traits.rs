use crate::error::Result;
use crate::models::{DatasetIdentity, QueryParameters, Table};
use async_trait::async_trait;
use serde_json::Value;

/// One HTTP GET returning a parsed JSON body.
///
/// Errors from the transport or the JSON decode are returned as-is; nothing
/// at this layer retries.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get_json(&self, url: &str, params: &QueryParameters) -> Result<Value>;
}

/// Source that hands back a whole sheet across as many pages as it takes
#[async_trait]
pub trait PaginatedFetcher: Send + Sync {
    async fn fetch_all(&self, service: &str, sheet: &str, server_id: &str) -> Result<Table>;
}

/// Common contract for concrete dashboard scrapers
#[async_trait]
pub trait ScraperTrait: Send + Sync {
    /// Pull the raw rows from the source
    async fn fetch(&self) -> Result<Table>;

    /// Reshape raw rows into the staging layout
    fn normalize(&self, raw: Table) -> Result<Table>;

    fn identity(&self) -> &DatasetIdentity;

    /// Get the name of the scraper source
    fn source_name(&self) -> &'static str;
}
