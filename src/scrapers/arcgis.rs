use crate::config::ClientConfig;
use crate::error::{Result, ScrapeError};
use crate::models::{QueryParameters, Table};
use crate::scrapers::traits::{PaginatedFetcher, Transport};
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Query parameters sent when none are given at construction
pub fn default_params() -> QueryParameters {
    QueryParameters::new()
        .with("f", "json")
        .with("where", "1=1")
        .with("outFields", "*")
        .with("returnGeometry", "false")
}

/// Fetch helper for ArcGIS FeatureServer dashboards.
///
/// The service name, sheet number and server id are found by watching the
/// network tab of the browser's developer tools while the dashboard loads.
pub struct ArcGis {
    arcgis_id: String,
    params: QueryParameters,
    max_pages: usize,
    transport: Arc<dyn Transport>,
}

impl ArcGis {
    pub fn new(arcgis_id: &str, transport: Arc<dyn Transport>) -> Self {
        Self::with_config(arcgis_id, transport, &ClientConfig::default())
    }

    /// Page budget taken from `config`
    pub fn with_config(
        arcgis_id: &str,
        transport: Arc<dyn Transport>,
        config: &ClientConfig,
    ) -> Self {
        Self {
            arcgis_id: arcgis_id.to_string(),
            params: default_params(),
            max_pages: config.max_pages,
            transport,
        }
    }

    /// Replace the default query parameters
    pub fn with_params(self, params: QueryParameters) -> Self {
        Self { params, ..self }
    }

    /// Cap on pages fetched by [`ArcGis::fetch_all`]
    pub fn with_max_pages(self, max_pages: usize) -> Self {
        Self { max_pages, ..self }
    }

    pub fn params(&self) -> &QueryParameters {
        &self.params
    }

    pub fn query_url(&self, service: &str, sheet: &str, server_id: &str) -> String {
        format!(
            "https://services{}.arcgis.com/{}/ArcGIS/rest/services/{}/FeatureServer/{}/query",
            server_id, self.arcgis_id, service, sheet
        )
    }

    /// Issue one query and return the raw response body
    pub async fn fetch_page(
        &self,
        service: &str,
        sheet: &str,
        server_id: &str,
        params: &QueryParameters,
    ) -> Result<Value> {
        let url = self.query_url(service, sheet, server_id);
        self.transport.get_json(&url, params).await
    }

    /// All data from a single request; pagination is left to the caller
    pub async fn fetch_sheet(
        &self,
        service: &str,
        sheet: &str,
        server_id: &str,
        params: &QueryParameters,
    ) -> Result<Table> {
        let body = self.fetch_page(service, sheet, server_id, params).await?;
        features_to_table(&body)
    }
}

#[async_trait]
impl PaginatedFetcher for ArcGis {
    async fn fetch_all(&self, service: &str, sheet: &str, server_id: &str) -> Result<Table> {
        info!("Fetching ArcGIS sheet {}/{} from server {}", service, sheet, server_id);

        // Work on a copy so the configured defaults never pick up an offset
        let mut params = self.params.clone();

        let body = self.fetch_page(service, sheet, server_id, &params).await?;
        let mut total_offset = features(&body)?.len();
        let mut pages = vec![features_to_table(&body)?];
        let mut more = exceeded_transfer_limit(&body);

        while more {
            if pages.len() >= self.max_pages {
                warn!(
                    "{} still truncated after {} pages ({} records)",
                    service,
                    pages.len(),
                    total_offset
                );
                return Err(ScrapeError::PaginationExceeded { pages: pages.len() });
            }

            params.set("resultOffset", total_offset);
            debug!("Requesting {} from offset {}", service, total_offset);

            let body = self.fetch_page(service, sheet, server_id, &params).await?;
            total_offset += features(&body)?.len();
            pages.push(features_to_table(&body)?);
            more = exceeded_transfer_limit(&body);
        }

        info!("Fetched {} records in {} pages", total_offset, pages.len());
        Ok(Table::concat(pages))
    }
}

fn features(body: &Value) -> Result<&Vec<Value>> {
    body.get("features")
        .and_then(Value::as_array)
        .ok_or_else(|| ScrapeError::UnexpectedResponse("missing `features` array".into()))
}

/// One row per feature, taken from its `attributes` object
pub fn features_to_table(body: &Value) -> Result<Table> {
    let rows = features(body)?
        .iter()
        .map(|feature| {
            feature
                .get("attributes")
                .and_then(Value::as_object)
                .cloned()
                .ok_or_else(|| {
                    ScrapeError::UnexpectedResponse("feature without `attributes` object".into())
                })
        })
        .collect::<Result<Vec<Map<String, Value>>>>()?;

    Ok(Table::from_records(rows))
}

/// `exceededTransferLimit` read with JSON truthiness; absent means false
fn exceeded_transfer_limit(body: &Value) -> bool {
    match body.get("exceededTransferLimit") {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::Number(n)) => n.as_f64().map_or(false, |n| n != 0.0),
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(Value::Object(o)) => !o.is_empty(),
    }
}

/// Calendar date (UTC) of an ArcGIS epoch millisecond timestamp
pub fn esri_ts_to_date(ts: i64) -> Result<NaiveDate> {
    DateTime::<Utc>::from_timestamp_millis(ts)
        .map(|dt| dt.date_naive())
        .ok_or(ScrapeError::InvalidTimestamp(ts))
}
